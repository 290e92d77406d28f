//! Border Band Detector
//!
//! 太い罫線（中太・太線・二重線）で区切られた料金バンド（列の連続範囲）を検出します。
//!
//! マーカー行（`OT`、`PRIVATE`、`UPGRADE`を含むセル）の各マーカー列から左右に走査し、
//! 太い罫線の位置までを1つのバンドとします。

use serde::Serialize;

use crate::grid::Grid;

/// 罫線で区切られた列範囲（両端を含む）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Band {
    pub start_col: usize,
    pub end_col: usize,
}

/// マーカーセルかどうか
pub fn is_marker(text: &str) -> bool {
    let upper = text.trim().to_uppercase();
    upper == "OT" || upper == "PRIVATE" || upper.contains("UPGRADE")
}

/// 行内のマーカー列
pub fn marker_columns(grid: &Grid, row: usize) -> Vec<usize> {
    grid.row(row)
        .iter()
        .enumerate()
        .filter(|(_, cell)| is_marker(&cell.text))
        .map(|(col, _)| col)
        .collect()
}

/// セクション内のマーカー行を選択
///
/// マーカーを3つ以上含む最初の行、なければ最も多く含む行、
/// どちらもなければセクションの先頭行を返します。
///
/// # 引数
///
/// * `start` - セクションの先頭行
/// * `end` - セクションの最終行（含む）
pub fn find_marker_row(grid: &Grid, start: usize, end: usize) -> usize {
    let last = end.min(grid.row_count().saturating_sub(1));
    let mut best: Option<(usize, usize)> = None;

    for row in start..=last {
        let count = marker_columns(grid, row).len();
        if count >= 3 {
            return row;
        }
        if count > best.map_or(0, |(_, n)| n) {
            best = Some((row, count));
        }
    }

    best.map_or(start, |(row, _)| row)
}

/// `CABIN` / `ROOM`の見出し行かどうか
fn is_cabin_header(grid: &Grid, row: usize) -> bool {
    grid.text(row, 0).to_uppercase().contains("CABIN")
        && grid.text(row, 1).to_uppercase().contains("ROOM")
}

/// 罫線を読み取る行を選択
///
/// セクション内の`CABIN` / `ROOM`見出し行、なければマーカー行の前後5行、
/// それもなければマーカー行自身を返します。
pub fn find_border_row(grid: &Grid, start: usize, end: usize, marker_row: usize) -> usize {
    let rows = grid.row_count();
    if let Some(row) = (start..=end.min(rows.saturating_sub(1))).find(|&r| is_cabin_header(grid, r)) {
        return row;
    }

    let window_start = marker_row.saturating_sub(5);
    let window_end = (marker_row + 6).min(rows);
    (window_start..window_end)
        .find(|&r| is_cabin_header(grid, r))
        .unwrap_or(marker_row)
}

/// マーカー列から左右に走査してバンドを求める
///
/// 左方向は現在セルの左罫線または左隣セルの右罫線、右方向は現在セルの右罫線
/// または右隣セルの左罫線が太線である位置で止まります。
/// どちらかの方向で太線が見つからない場合は`None`です。
pub fn band_for_marker(grid: &Grid, row: usize, col: usize) -> Option<Band> {
    let width = grid.width();

    let start_col = (0..=col).rev().find(|&j| {
        grid.cell(row, j).borders.left.is_bold()
            || (j > 0 && grid.cell(row, j - 1).borders.right.is_bold())
    })?;

    let end_col = (col..width).find(|&j| {
        grid.cell(row, j).borders.right.is_bold()
            || (j + 1 < width && grid.cell(row, j + 1).borders.left.is_bold())
    })?;

    (end_col >= start_col).then_some(Band { start_col, end_col })
}

/// マーカー列ごとのバンドを検出（重複は除去）
pub fn detect_bands(grid: &Grid, border_row: usize, marker_cols: &[usize]) -> Vec<Band> {
    let mut bands: Vec<Band> = marker_cols
        .iter()
        .filter_map(|&col| band_for_marker(grid, border_row, col))
        .collect();
    bands.sort();
    bands.dedup();
    bands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;
    use crate::types::{BorderStyle, Borders};

    fn bordered(left: BorderStyle, right: BorderStyle) -> Cell {
        Cell::empty().with_borders(Borders {
            left,
            right,
            ..Borders::default()
        })
    }

    fn marker_grid() -> Grid {
        let mut grid = Grid::from_text_rows(
            "Booking Chart 2025",
            &[vec!["", "", "OT", "", "", "PRIVATE", "", "Upgrade deluxe"]],
        );
        grid.set_cell(1, 2, bordered(BorderStyle::Medium, BorderStyle::None));
        grid.set_cell(1, 4, bordered(BorderStyle::None, BorderStyle::Thick));
        grid.set_cell(1, 6, bordered(BorderStyle::Double, BorderStyle::None));
        grid.set_cell(1, 7, bordered(BorderStyle::None, BorderStyle::Medium));
        grid
    }

    #[test]
    fn test_is_marker() {
        assert!(is_marker(" ot "));
        assert!(is_marker("PRIVATE"));
        assert!(is_marker("upgrade to master"));
        assert!(!is_marker("OTHER"));
        assert!(!is_marker("PRIVATE TRIP"));
    }

    #[test]
    fn test_band_walks_to_bold_borders() {
        let grid = marker_grid();
        assert_eq!(
            band_for_marker(&grid, 1, 2),
            Some(Band {
                start_col: 2,
                end_col: 4
            })
        );
        // 右隣セルの左罫線で止まる
        assert_eq!(
            band_for_marker(&grid, 1, 5),
            Some(Band {
                start_col: 5,
                end_col: 5
            })
        );
        assert_eq!(
            band_for_marker(&grid, 1, 7),
            Some(Band {
                start_col: 6,
                end_col: 7
            })
        );
    }

    #[test]
    fn test_thin_borders_do_not_delimit_bands() {
        let mut grid = Grid::from_text_rows("Sheet1", &[vec!["", "OT", ""]]);
        grid.set_cell(0, 1, bordered(BorderStyle::Thin, BorderStyle::Thin));
        assert_eq!(band_for_marker(&grid, 0, 1), None);
    }

    #[test]
    fn test_detect_bands_deduplicates() {
        let grid = marker_grid();
        let markers = marker_columns(&grid, 0);
        assert_eq!(markers, vec![2, 5, 7]);

        let mut grid = grid;
        grid.set_cell(0, 3, Cell::new("OT"));
        let bands = detect_bands(&grid, 1, &marker_columns(&grid, 0));
        assert_eq!(bands.len(), 3);
    }

    #[test]
    fn test_marker_row_selection() {
        let grid = Grid::from_text_rows(
            "Sheet1",
            &[
                vec!["KANHA LOKA", "", ""],
                vec!["", "OT", ""],
                vec!["OT", "PRIVATE", "OT"],
                vec!["OT", "OT", "OT"],
            ],
        );
        assert_eq!(find_marker_row(&grid, 0, 3), 2);
        assert_eq!(find_marker_row(&grid, 0, 1), 1);
        assert_eq!(find_marker_row(&grid, 0, 0), 0);
    }

    #[test]
    fn test_border_row_prefers_cabin_header() {
        let grid = Grid::from_text_rows(
            "Sheet1",
            &[
                vec!["KANHA LOKA", ""],
                vec!["", "OT"],
                vec!["CABIN NO", "ROOM TYPE"],
                vec!["1", "Master"],
            ],
        );
        assert_eq!(find_border_row(&grid, 0, 3, 1), 2);
        assert_eq!(find_border_row(&grid, 3, 3, 3), 2);

        let plain = Grid::from_text_rows("Sheet1", &[vec!["", "OT"], vec!["1", "Master"]]);
        assert_eq!(find_border_row(&plain, 0, 1, 0), 0);
    }
}
