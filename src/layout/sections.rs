//! Section Detectors
//!
//! 日番号行、船舶セクション、出発日行、見出し行、カレンダーの月見出しを検出します。

use chrono::NaiveDate;

use crate::dates::{header_year, leading_day, parse_departure};
use crate::grid::Grid;
use crate::layout::months::month_in_text;

/// 月ヘッダー行の直後4行から日番号行を探す
///
/// 1〜31の日番号で始まるセルを10個以上含む最初の行を返します。
pub fn find_day_row(grid: &Grid, header_row: usize) -> Option<usize> {
    let last = (header_row + 5).min(grid.row_count());
    (header_row + 1..last).find(|&row| {
        grid.row(row)
            .iter()
            .filter(|cell| leading_day(&cell.text).is_some())
            .count()
            >= 10
    })
}

/// 船舶セクション（両端の行を含む）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoatSection {
    pub start_row: usize,
    pub end_row: usize,
}

/// 英字のみを大文字で残す
fn alpha_upper(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_uppercase)
        .collect()
}

/// 船舶セクションを探す
///
/// セルの英字部分にいずれかのラベルを含む最初の行がセクションの開始です。
/// 先頭2列のいずれかが`prefix`で始まる行、または先頭10列が空白の行が8行続いた時点で
/// セクションは終了します。
///
/// # 引数
///
/// * `labels` - セクションラベル（同義語を含む）
/// * `prefix` - 次のセクションの見出しの接頭辞（例: `"KANHA "`）
pub fn find_boat_section(grid: &Grid, labels: &[String], prefix: &str) -> Option<BoatSection> {
    let targets: Vec<String> = labels
        .iter()
        .map(|label| alpha_upper(label))
        .filter(|label| !label.is_empty())
        .collect();
    if targets.is_empty() {
        return None;
    }
    let prefix = prefix.to_uppercase();

    let start_row = (0..grid.row_count()).find(|&row| {
        grid.row(row).iter().any(|cell| {
            let normalized = alpha_upper(&cell.text);
            targets.iter().any(|target| normalized.contains(target.as_str()))
        })
    })?;

    let mut end = start_row + 1;
    let mut blank_streak = 0;
    while end < grid.row_count() {
        let starts_next = !prefix.is_empty()
            && (grid.text(end, 0).to_uppercase().starts_with(&prefix)
                || grid.text(end, 1).to_uppercase().starts_with(&prefix));
        if starts_next {
            break;
        }
        if grid.is_row_blank(end, 10) {
            blank_streak += 1;
            if blank_streak >= 8 {
                break;
            }
        } else {
            blank_streak = 0;
        }
        end += 1;
    }

    Some(BoatSection {
        start_row,
        end_row: end - 1,
    })
}

/// 出発日行
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepartureRow {
    pub row: usize,
    /// 左側ラベルの出発日
    pub left: Option<NaiveDate>,
    /// 右側ラベルの出発日
    pub right: Option<NaiveDate>,
}

/// 左右のラベル列のいずれかが出発日として解釈できる行をすべて探す
pub fn find_departure_rows(
    grid: &Grid,
    left_col: usize,
    right_col: usize,
    year: i32,
) -> Vec<DepartureRow> {
    (0..grid.row_count())
        .filter_map(|row| {
            let left = parse_departure(grid.text(row, left_col), year);
            let right = parse_departure(grid.text(row, right_col), year);
            (left.is_some() || right.is_some()).then_some(DepartureRow { row, left, right })
        })
        .collect()
}

/// 指定列の文字列が見出しと一致する行をすべて探す（大文字小文字を区別しない）
pub fn find_header_rows(grid: &Grid, col: usize, heading: &str) -> Vec<usize> {
    (0..grid.row_count())
        .filter(|&row| grid.text(row, col).eq_ignore_ascii_case(heading.trim()))
        .collect()
}

/// カレンダーの月見出しセル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarHeader {
    pub row: usize,
    pub col: usize,
    pub month: u32,
    /// 見出しに書かれた年（例: `"JANUARY 2026"`）
    pub year: Option<i32>,
}

/// 月名を含むすべてのセルをカレンダーの月見出しとして列挙
pub fn find_calendar_headers(grid: &Grid) -> Vec<CalendarHeader> {
    let mut headers = Vec::new();
    for row in 0..grid.row_count() {
        for (col, cell) in grid.row(row).iter().enumerate() {
            if let Some(month) = month_in_text(&cell.text) {
                headers.push(CalendarHeader {
                    row,
                    col,
                    month,
                    year: header_year(&cell.text),
                });
            }
        }
    }
    headers
}
