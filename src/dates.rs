//! Date Resolver Module
//!
//! 日番号と推定された月・年からカレンダー日付を解決し、
//! 自由記述の日付範囲トークンを半開区間`[start, end)`に変換するモジュール。
//!
//! # 対応するトークン
//!
//! - 単独の日番号: `"12"`
//! - 月を外部から与える範囲: `"12-14"`, `"30-1"`
//! - 月ラベル付きの2行範囲: `"Sept\n12-14"`, `"May-Jun\n30-01"`
//! - 出発日ラベル: `"APRIL 12TH"`

use chrono::{Datelike, Duration, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CabinError;
use crate::layout::months;

lazy_static! {
    static ref LEADING_DAY: Regex = Regex::new(r"^(\d{1,2})").unwrap();
    static ref DEPARTURE: Regex = Regex::new(r"([A-Z]+)\s+(\d{1,2})").unwrap();
    static ref YEAR: Regex = Regex::new(r"\b(\d{4})\b").unwrap();
}

/// 半開区間の日付範囲 `[start, end)`
///
/// `(start, end)`の順で順序付けされます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DateRange {
    /// 開始日（含む）
    pub start: NaiveDate,
    /// 終了日（含まない）
    pub end: NaiveDate,
}

impl DateRange {
    /// 日付範囲を生成
    ///
    /// # 戻り値
    ///
    /// * `Some(DateRange)` - `start < end`の場合
    /// * `None` - 空または逆転した範囲の場合
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// 日付が範囲内にあるかどうか（`start <= date < end`）
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// 半開区間`[start, end)`と重なるかどうか
    ///
    /// `end <= self.start`または`start >= self.end`のとき重なりません。
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        !(end <= self.start || start >= self.end)
    }
}

/// 年・月・日からカレンダー日付を解決（存在しない日付は`None`）
pub fn resolve_day(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

/// 1〜2桁の数字のみからなるセルを日番号として解釈
pub fn parse_day_cell(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() || text.len() > 2 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// 先頭の1〜2桁の数字を日番号（1〜31）として解釈（例: `"12 Mon"` -> 12）
pub fn leading_day(text: &str) -> Option<u32> {
    LEADING_DAY
        .captures(text.trim())
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .filter(|day| (1..=31).contains(day))
}

/// 翌月（12月の場合は翌年1月）
pub fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// 月の日数
fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next) = next_month(year, month);
    NaiveDate::from_ymd_opt(next_year, next, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

/// 日番号を月の範囲（1〜月末）に丸める
fn clamp_day(year: i32, month: u32, day: u32) -> u32 {
    day.clamp(1, days_in_month(year, month))
}

/// `"D1-D2"`形式の日番号ペアを解析
fn split_day_pair(token: &str) -> Result<(u32, u32), CabinError> {
    let compact: String = token
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '–' || c == '—' { '-' } else { c })
        .collect();

    let mut parts = compact.split('-');
    let (first, second) = match (parts.next(), parts.next(), parts.next()) {
        (Some(first), Some(second), None) => (first, second),
        _ => return Err(CabinError::malformed(token, "expected a 'D1-D2' day pair")),
    };

    let parse = |part: &str| {
        part.parse::<u32>()
            .map_err(|_| CabinError::malformed(token, format!("'{}' is not a day number", part)))
    };
    Ok((parse(first)?, parse(second)?))
}

/// 外部から月を与える日付範囲トークンを解析（例: `"12-14"`）
///
/// 開始日は`(year, month, D1)`です。`D2 < D1`の場合、終了日は翌月（12月なら翌年1月）に
/// 繰り越します。終了日は`(end_year, end_month, D2)`の翌日（含まない）です。
///
/// # 引数
///
/// * `token` - `"D1-D2"`形式のトークン（ダッシュ前後の空白は無視）
/// * `month` - 開始月
/// * `year` - 開始年
///
/// # 戻り値
///
/// * `Ok(DateRange)` - 解析に成功した場合
/// * `Err(CabinError::MalformedToken)` - 形式が不正、または存在しない日付の場合
///
/// # 使用例
///
/// ```rust
/// use cabincal::parse_bare_range;
/// use chrono::NaiveDate;
///
/// let range = parse_bare_range("30-1", 4, 2025).unwrap();
/// assert_eq!(range.start, NaiveDate::from_ymd_opt(2025, 4, 30).unwrap());
/// assert_eq!(range.end, NaiveDate::from_ymd_opt(2025, 5, 2).unwrap());
/// ```
pub fn parse_bare_range(token: &str, month: u32, year: i32) -> Result<DateRange, CabinError> {
    let (d1, d2) = split_day_pair(token)?;

    let start = resolve_day(year, month, d1).ok_or_else(|| {
        CabinError::malformed(token, format!("{}-{:02}-{:02} is not a date", year, month, d1))
    })?;

    let (end_year, end_month) = if d2 < d1 {
        next_month(year, month)
    } else {
        (year, month)
    };
    let last = resolve_day(end_year, end_month, d2).ok_or_else(|| {
        CabinError::malformed(
            token,
            format!("{}-{:02}-{:02} is not a date", end_year, end_month, d2),
        )
    })?;

    DateRange::new(start, last + Duration::days(1))
        .ok_or_else(|| CabinError::malformed(token, "range ends before it starts"))
}

/// 月ラベル付きの2行日付範囲トークンを解析（例: `"Sept\n12-14"`, `"May-Jun\n30-01"`）
///
/// 1行目は月ラベル（`"May-Jun"`のような月ペアも可）、2行目は日番号ペアです。
/// 日番号は月の日数に丸められます。`D2 < D1`の場合、終了日はラベルの終了月
/// （単独ラベルでは翌月）に置かれます。終了月が開始月より前の場合は翌年として扱います。
pub fn parse_two_line_range(token: &str, year: i32) -> Result<DateRange, CabinError> {
    let lines: Vec<&str> = token
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let (label, days) = match lines.as_slice() {
        [label, days] => (*label, *days),
        _ => return Err(CabinError::malformed(token, "expected 'Month\\nD1-D2'")),
    };

    let month_of = |name: &str| {
        months::lookup(name)
            .ok_or_else(|| CabinError::malformed(token, format!("unknown month '{}'", name.trim())))
    };
    let (start_month, label_end_month) = match label.split_once('-') {
        Some((first, second)) => (month_of(first)?, Some(month_of(second)?)),
        None => (month_of(label)?, None),
    };

    let (d1, d2) = split_day_pair(days)?;
    let end_month = if d2 < d1 {
        label_end_month.unwrap_or_else(|| next_month(year, start_month).1)
    } else {
        start_month
    };
    let end_year = if end_month < start_month { year + 1 } else { year };

    let start = resolve_day(year, start_month, clamp_day(year, start_month, d1))
        .ok_or_else(|| CabinError::malformed(token, "start day does not resolve"))?;
    let last = resolve_day(end_year, end_month, clamp_day(end_year, end_month, d2))
        .ok_or_else(|| CabinError::malformed(token, "end day does not resolve"))?;

    DateRange::new(start, last + Duration::days(1))
        .ok_or_else(|| CabinError::malformed(token, "range ends before it starts"))
}

/// 出発日ラベルを解析（例: `"APRIL 12TH"`, `"Mei 3"`）
///
/// 月名で始まる単語と、それに続く1〜2桁の日番号を探します。
pub fn parse_departure(text: &str, year: i32) -> Option<NaiveDate> {
    let upper = text.trim().to_uppercase();
    DEPARTURE.captures_iter(&upper).find_map(|caps| {
        let month = months::lookup_prefix(&caps[1])?;
        let day = caps[2].parse::<u32>().ok()?;
        resolve_day(year, month, day)
    })
}

/// テキスト中の4桁の年（1900〜2100）
pub fn header_year(text: &str) -> Option<i32> {
    YEAR.captures_iter(text)
        .filter_map(|caps| caps[1].parse::<i32>().ok())
        .find(|year| (1900..=2100).contains(year))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bare_range_same_month() {
        let range = parse_bare_range("12-14", 9, 2025).unwrap();
        assert_eq!(range.start, date(2025, 9, 12));
        assert_eq!(range.end, date(2025, 9, 15));
    }

    #[test]
    fn test_bare_range_rolls_into_next_month() {
        let range = parse_bare_range("30-1", 4, 2025).unwrap();
        assert_eq!(range.start, date(2025, 4, 30));
        assert_eq!(range.end, date(2025, 5, 2));
    }

    #[test]
    fn test_bare_range_rolls_into_next_year() {
        let range = parse_bare_range("30 - 2", 12, 2025).unwrap();
        assert_eq!(range.start, date(2025, 12, 30));
        assert_eq!(range.end, date(2026, 1, 3));
    }

    #[test]
    fn test_bare_range_rejects_malformed_tokens() {
        assert!(matches!(
            parse_bare_range("12-x", 9, 2025),
            Err(CabinError::MalformedToken { .. })
        ));
        assert!(parse_bare_range("12", 9, 2025).is_err());
        assert!(parse_bare_range("1-2-3", 9, 2025).is_err());
        assert!(parse_bare_range("31-2", 9, 2025).is_err());
        assert!(parse_bare_range("29-31", 4, 2025).is_err());
    }

    #[test]
    fn test_two_line_range_single_label() {
        let range = parse_two_line_range("Sept \n12-14", 2025).unwrap();
        assert_eq!(range.start, date(2025, 9, 12));
        assert_eq!(range.end, date(2025, 9, 15));

        let range = parse_two_line_range("APL\n29-2", 2025).unwrap();
        assert_eq!(range.start, date(2025, 4, 29));
        assert_eq!(range.end, date(2025, 5, 3));
    }

    #[test]
    fn test_two_line_range_cross_month_label() {
        let range = parse_two_line_range("May-Jun\n30-01", 2025).unwrap();
        assert_eq!(range.start, date(2025, 5, 30));
        assert_eq!(range.end, date(2025, 6, 2));
    }

    #[test]
    fn test_two_line_range_crosses_year_and_clamps_days() {
        let range = parse_two_line_range("Des-Jan\n31-2", 2025).unwrap();
        assert_eq!(range.start, date(2025, 12, 31));
        assert_eq!(range.end, date(2026, 1, 3));

        let range = parse_two_line_range("Feb\n27-30", 2025).unwrap();
        assert_eq!(range.end, date(2025, 3, 1));
    }

    #[test]
    fn test_two_line_range_rejects_other_shapes() {
        assert!(parse_two_line_range("12-14", 2025).is_err());
        assert!(parse_two_line_range("Foo\n12-14", 2025).is_err());
        assert!(parse_two_line_range("Sept\n12-14\nextra", 2025).is_err());
    }

    #[test]
    fn test_parse_departure() {
        assert_eq!(parse_departure("APRIL 12TH", 2025), Some(date(2025, 4, 12)));
        assert_eq!(parse_departure("Departure: May 3rd", 2025), Some(date(2025, 5, 3)));
        assert_eq!(parse_departure("DESEMBER 1", 2025), Some(date(2025, 12, 1)));
        assert_eq!(parse_departure("FEBRUARY 30", 2025), None);
        assert_eq!(parse_departure("ROOM TYPE", 2025), None);
    }

    #[test]
    fn test_day_cells() {
        assert_eq!(parse_day_cell(" 7 "), Some(7));
        assert_eq!(parse_day_cell("123"), None);
        assert_eq!(parse_day_cell("7a"), None);
        assert_eq!(leading_day("12 Mon"), Some(12));
        assert_eq!(leading_day("45"), None);
        assert_eq!(leading_day("Mon"), None);
        assert_eq!(resolve_day(2025, 2, 29), None);
    }

    #[test]
    fn test_header_year() {
        assert_eq!(header_year("JANUARY 2026"), Some(2026));
        assert_eq!(header_year("JANUARY"), None);
        assert_eq!(header_year("ROOM 1234"), None);
    }

    #[test]
    fn test_date_range_overlap_is_half_open() {
        let range = DateRange::new(date(2025, 9, 12), date(2025, 9, 15)).unwrap();
        assert!(range.overlaps(date(2025, 9, 14), date(2025, 9, 16)));
        assert!(!range.overlaps(date(2025, 9, 15), date(2025, 9, 18)));
        assert!(!range.overlaps(date(2025, 9, 1), date(2025, 9, 12)));
        assert!(range.contains(date(2025, 9, 12)));
        assert!(!range.contains(date(2025, 9, 15)));
        assert!(DateRange::new(date(2025, 9, 12), date(2025, 9, 12)).is_none());
    }
}
