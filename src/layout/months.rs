//! Month Span Detector
//!
//! 月名辞書（英語・インドネシア語）と、月ヘッダー行の検出、
//! 月→列範囲（`MonthSpan`）の構築を提供します。

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::grid::Grid;

/// 月名キーと月番号の対応表
const MONTH_KEYS: &[(&str, u32)] = &[
    ("JAN", 1),
    ("JANUARY", 1),
    ("JANUARI", 1),
    ("FEB", 2),
    ("FEBRUARY", 2),
    ("FEBRUARI", 2),
    ("FEBUARI", 2),
    ("MAR", 3),
    ("MARCH", 3),
    ("MARET", 3),
    ("APR", 4),
    ("APL", 4),
    ("APRIL", 4),
    ("MAY", 5),
    ("MEI", 5),
    ("JUN", 6),
    ("JUNE", 6),
    ("JUNI", 6),
    ("JUL", 7),
    ("JULY", 7),
    ("JULI", 7),
    ("AUG", 8),
    ("AUGUST", 8),
    ("AGT", 8),
    ("AGUSTUS", 8),
    ("SEP", 9),
    ("SEPT", 9),
    ("SEPTEMBER", 9),
    ("OCT", 10),
    ("OCTOBER", 10),
    ("OKT", 10),
    ("OKTOBER", 10),
    ("NOV", 11),
    ("NOVEMBER", 11),
    ("DEC", 12),
    ("DECEMBER", 12),
    ("DES", 12),
    ("DESEMBER", 12),
];

lazy_static! {
    // 長いキーを先に並べ、同じ位置では最長一致を優先する
    static ref MONTH_WORD: Regex = {
        let mut keys: Vec<&str> = MONTH_KEYS.iter().map(|(key, _)| *key).collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        Regex::new(&format!(r"(?i)\b({})\b", keys.join("|"))).unwrap()
    };
}

/// 月名キーを月番号に変換（完全一致、大文字小文字を区別しない）
///
/// 英語とインドネシア語の表記、およびその略記（`"Sept"`, `"Agustus"`, `"AGT"`）を受け付けます。
pub fn lookup(word: &str) -> Option<u32> {
    let key = word.trim().to_uppercase();
    MONTH_KEYS
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, month)| *month)
}

/// 単語の先頭に含まれる月名キーを探す（最長一致）
///
/// "SEPTEMBRE"や"OKTOBRE"のように辞書にない表記揺れでも、先頭が月名キーであれば一致します。
pub fn lookup_prefix(word: &str) -> Option<u32> {
    let upper = word.trim().to_uppercase();
    MONTH_KEYS
        .iter()
        .filter(|(key, _)| upper.starts_with(key))
        .max_by_key(|(key, _)| key.len())
        .map(|(_, month)| *month)
}

/// テキスト中に単語として現れる最初の月名
pub fn month_in_text(text: &str) -> Option<u32> {
    MONTH_WORD
        .find(text)
        .and_then(|m| lookup(m.as_str()))
}

/// テキスト中に単語として現れるすべての月名
fn months_in_text(text: &str) -> impl Iterator<Item = u32> + '_ {
    MONTH_WORD.find_iter(text).filter_map(|m| lookup(m.as_str()))
}

/// 行が月ヘッダー行（異なる月名を2つ以上含む）かどうか
pub fn is_month_header_row(grid: &Grid, row: usize) -> bool {
    let mut found = BTreeSet::new();
    for cell in grid.row(row) {
        found.extend(months_in_text(&cell.text));
        if found.len() >= 2 {
            return true;
        }
    }
    false
}

/// `from`行以降で最初の月ヘッダー行を探す
pub fn find_month_header_row(grid: &Grid, from: usize) -> Option<usize> {
    (from..grid.row_count()).find(|&row| is_month_header_row(grid, row))
}

/// 月と列範囲の対応
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthSpan {
    /// 月（1〜12）
    pub month: u32,
    /// 開始列
    pub start_col: usize,
    /// 終了列（範囲に含む）
    pub end_col: usize,
}

impl MonthSpan {
    /// 列が範囲内にあるかどうか
    pub fn contains(&self, col: usize) -> bool {
        col >= self.start_col && col <= self.end_col
    }
}

/// ヘッダー行から月ごとの列範囲を構築
///
/// 各月名セルから次の月名セルの直前までを1つの範囲とします。最後の範囲はグリッドの右端まで
/// （`tail`列ぶん延長）続きます。ヘッダーセルの結合範囲がこの境界を越える場合は
/// 結合範囲の終端を採用します。
///
/// # 引数
///
/// * `grid` - 対象グリッド
/// * `row` - 月ヘッダー行
/// * `tail` - 最後の範囲を行末からさらに延長する列数
///
/// # 戻り値
///
/// 列順にソートされた、重なりのない`MonthSpan`のリスト
pub fn collect_month_spans(grid: &Grid, row: usize, tail: usize) -> Vec<MonthSpan> {
    let cells = grid.row(row);
    let headers: Vec<(usize, u32)> = cells
        .iter()
        .enumerate()
        .filter_map(|(col, cell)| month_in_text(&cell.text).map(|month| (col, month)))
        .collect();

    let mut spans = Vec::with_capacity(headers.len());
    for (idx, &(col, month)) in headers.iter().enumerate() {
        let next = match headers.get(idx + 1) {
            Some(&(next_col, _)) => next_col,
            None => grid.width() + tail,
        };
        let mut end_col = col.max(next.saturating_sub(1));

        if let Some(merge) = grid.merge_at(row, col) {
            let merge_end = (merge.col_end as usize).saturating_sub(1);
            if merge_end > end_col {
                end_col = merge_end;
            }
        }

        spans.push(MonthSpan {
            month,
            start_col: col,
            end_col,
        });
    }
    spans
}

/// 列が属する月
pub fn month_for_col(spans: &[MonthSpan], col: usize) -> Option<u32> {
    spans.iter().find(|span| span.contains(col)).map(|span| span.month)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;
    use crate::types::MergeRange;

    #[test]
    fn test_lookup_english_and_indonesian() {
        assert_eq!(lookup("JAN"), Some(1));
        assert_eq!(lookup("Februari"), Some(2));
        assert_eq!(lookup("FEBUARI"), Some(2));
        assert_eq!(lookup("apl"), Some(4));
        assert_eq!(lookup("MEI"), Some(5));
        assert_eq!(lookup("AGT"), Some(8));
        assert_eq!(lookup("Okt"), Some(10));
        assert_eq!(lookup("DES"), Some(12));
        assert_eq!(lookup("MONDAY"), None);
    }

    #[test]
    fn test_lookup_prefix_prefers_longest_key() {
        assert_eq!(lookup_prefix("SEPTEMBER"), Some(9));
        assert_eq!(lookup_prefix("DESEMBER"), Some(12));
        assert_eq!(lookup_prefix("JUNE"), Some(6));
        assert_eq!(lookup_prefix("XMAS"), None);
    }

    #[test]
    fn test_month_in_text_requires_whole_word() {
        assert_eq!(month_in_text("SEPTEMBER 2025"), Some(9));
        assert_eq!(month_in_text("open trip - Juli"), Some(7));
        assert_eq!(month_in_text("MARKET"), None);
        assert_eq!(month_in_text("DECK PLAN"), None);
    }

    #[test]
    fn test_header_row_needs_two_distinct_months() {
        let grid = Grid::from_text_rows(
            "Sheet1",
            &[
                vec!["ROOM", "JULY", "", "JULY"],
                vec!["ROOM", "JULY", "", "AUGUST"],
                vec!["JUNI - JULI", "", "", ""],
            ],
        );
        assert!(!is_month_header_row(&grid, 0));
        assert!(is_month_header_row(&grid, 1));
        assert!(is_month_header_row(&grid, 2));
        assert_eq!(find_month_header_row(&grid, 0), Some(1));
        assert_eq!(find_month_header_row(&grid, 2), Some(2));
        assert_eq!(find_month_header_row(&grid, 3), None);
    }

    #[test]
    fn test_collect_month_spans_uses_next_header_boundary() {
        let grid = Grid::from_text_rows(
            "Sheet1",
            &[vec!["", "", "SEPTEMBER", "", "", "OKTOBER", "", ""]],
        );
        let spans = collect_month_spans(&grid, 0, 0);
        assert_eq!(
            spans,
            vec![
                MonthSpan {
                    month: 9,
                    start_col: 2,
                    end_col: 4
                },
                MonthSpan {
                    month: 10,
                    start_col: 5,
                    end_col: 7
                },
            ]
        );
        assert_eq!(month_for_col(&spans, 4), Some(9));
        assert_eq!(month_for_col(&spans, 1), None);
    }

    #[test]
    fn test_collect_month_spans_extends_final_span_by_tail() {
        let grid = Grid::from_text_rows("Sheet1", &[vec!["MAY", "", "JUN"]]);
        let spans = collect_month_spans(&grid, 0, 50);
        assert_eq!(spans[1].end_col, 52);
    }

    #[test]
    fn test_final_span_reaches_grid_width_on_short_header_row() {
        let mut grid = Grid::from_text_rows("Sheet1", &[vec!["MAY", "", "JUN"]]);
        grid.set_cell(1, 9, Cell::new("x"));
        assert_eq!(grid.row(0).len(), 3);

        let spans = collect_month_spans(&grid, 0, 0);
        assert_eq!(spans[1].end_col, 9);
    }

    #[test]
    fn test_header_merge_is_authoritative_when_longer() {
        let mut grid = Grid::from_text_rows("Sheet1", &[vec!["AUG", "", "", "", "", "", ""]]);
        grid.add_merge(MergeRange::new(0, 1, 0, 5)).unwrap();
        // 行末より短い結合範囲は境界を縮めない
        let spans = collect_month_spans(&grid, 0, 0);
        assert_eq!(spans[0].end_col, 6);

        let mut grid = Grid::from_text_rows("Sheet1", &[vec!["AUG", "", "", "SEP"]]);
        grid.add_merge(MergeRange::new(0, 1, 3, 8)).unwrap();
        let spans = collect_month_spans(&grid, 0, 0);
        assert_eq!(spans[1].end_col, 7);
    }
}
