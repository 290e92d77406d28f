//! Availability Query Engine
//!
//! 正規化済みの部屋データに対して、日付範囲の空き状況を問い合わせるモジュール。
//!
//! 占有範囲形式の部屋は常に半開区間`[start, end)`で判定します。
//! 空き日付形式の部屋の終了日の扱いは`EndBound`で選択します。

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::{EndBound, QueryMode};
use crate::builder::VesselReport;
use crate::dates::DateRange;
use crate::error::CabinError;
use crate::normalize::RoomState;

/// 部屋が`[start, end)`の全期間で空いているかどうか
///
/// 占有範囲のいずれかが`[start, end)`と重なる場合は`false`を返します。
///
/// # 使用例
///
/// ```rust
/// use std::collections::BTreeSet;
/// use chrono::NaiveDate;
/// use cabincal::{is_free_for_range, DateRange};
///
/// let d = |day| NaiveDate::from_ymd_opt(2025, 9, day).unwrap();
/// let occupied: BTreeSet<_> = [DateRange::new(d(12), d(15)).unwrap()].into();
///
/// assert!(is_free_for_range(d(1), d(12), &occupied));
/// assert!(!is_free_for_range(d(14), d(20), &occupied));
/// assert!(is_free_for_range(d(15), d(20), &occupied));
/// ```
pub fn is_free_for_range(start: NaiveDate, end: NaiveDate, occupied: &BTreeSet<DateRange>) -> bool {
    !occupied.iter().any(|range| range.overlaps(start, end))
}

/// 予約可能な出発日を列挙
///
/// `start <= d < end`を満たす候補日`d`のうち、どの占有範囲にも含まれないものを
/// 昇順で返します。
///
/// # 引数
///
/// * `start` / `end` - クエリ範囲（`end`は含まない）
/// * `occupied` - 部屋の占有範囲
/// * `candidates` - シートから得られた出発日候補
pub fn find_available_start_dates(
    start: NaiveDate,
    end: NaiveDate,
    occupied: &BTreeSet<DateRange>,
    candidates: &BTreeSet<NaiveDate>,
) -> Vec<NaiveDate> {
    candidates
        .range(start..)
        .take_while(|date| **date < end)
        .filter(|date| !occupied.iter().any(|range| range.contains(**date)))
        .copied()
        .collect()
}

/// 空き日付のうちクエリ範囲に入るものを昇順で返す
pub fn available_dates_in(
    start: NaiveDate,
    end: NaiveDate,
    dates: &BTreeSet<NaiveDate>,
    bound: EndBound,
) -> Vec<NaiveDate> {
    dates
        .range(start..)
        .take_while(|date| bound.admits(**date, start, end))
        .copied()
        .collect()
}

/// `YYYY/MM/DD`形式の日付を解析
///
/// # 戻り値
///
/// * `Ok(NaiveDate)` - 解析に成功した場合
/// * `Err(CabinError::Config)` - 形式が不正、または存在しない日付の場合
pub fn parse_query_date(text: &str) -> Result<NaiveDate, CabinError> {
    let text = text.trim();
    if text.len() != 10 {
        return Err(CabinError::Config(format!(
            "Dates must be YYYY/MM/DD, got '{}'",
            text
        )));
    }
    NaiveDate::parse_from_str(text, "%Y/%m/%d")
        .map_err(|e| CabinError::Config(format!("Invalid date '{}': {}", text, e)))
}

/// 空き状況の問い合わせ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityQuery {
    /// 開始日（含む）
    pub start: NaiveDate,
    /// 終了日
    pub end: NaiveDate,
    /// 対象の船舶（空の場合はすべて、大文字小文字を区別しない）
    #[serde(default)]
    pub vessels: Vec<String>,
    /// 結果形式
    #[serde(default)]
    pub mode: QueryMode,
}

impl AvailabilityQuery {
    /// クエリを生成
    ///
    /// # 戻り値
    ///
    /// * `Ok(AvailabilityQuery)` - `start < end`の場合
    /// * `Err(CabinError::Config)` - 範囲が空または逆転している場合
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CabinError> {
        if start >= end {
            return Err(CabinError::Config(format!(
                "Invalid query range: start ({}) must be before end ({})",
                start, end
            )));
        }
        Ok(Self {
            start,
            end,
            vessels: Vec::new(),
            mode: QueryMode::default(),
        })
    }

    /// `YYYY/MM/DD`形式の文字列からクエリを生成
    pub fn parse(start: &str, end: &str) -> Result<Self, CabinError> {
        Self::new(parse_query_date(start)?, parse_query_date(end)?)
    }

    /// 対象の船舶を追加
    pub fn with_vessel(mut self, vessel: impl Into<String>) -> Self {
        self.vessels.push(vessel.into());
        self
    }

    /// 結果形式を指定
    pub fn with_mode(mut self, mode: QueryMode) -> Self {
        self.mode = mode;
        self
    }

    fn includes_vessel(&self, name: &str) -> bool {
        self.vessels.is_empty() || self.vessels.iter().any(|v| v.trim().eq_ignore_ascii_case(name))
    }
}

/// 予約可能な（部屋, 出発日）の組
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityResult {
    /// 出発日
    pub start_date: NaiveDate,
    pub boat_name: String,
    pub boat_link: Option<String>,
    pub room_name: String,
    pub room_link: Option<String>,
}

/// 結果を`(出発日, 船舶名, 部屋名)`で安定ソート（名前は大文字小文字を区別しない）
pub fn sort_results(results: &mut [AvailabilityResult]) {
    results.sort_by(compare_results);
}

fn compare_results(a: &AvailabilityResult, b: &AvailabilityResult) -> Ordering {
    a.start_date
        .cmp(&b.start_date)
        .then_with(|| a.boat_name.to_lowercase().cmp(&b.boat_name.to_lowercase()))
        .then_with(|| a.room_name.to_lowercase().cmp(&b.room_name.to_lowercase()))
}

/// 船舶ごとの抽出結果に対してクエリを評価
///
/// # 引数
///
/// * `query` - 問い合わせ
/// * `vessels` - 船舶ごとの抽出結果（抽出に失敗した船舶は部屋を持たない）
/// * `bound` - 空き日付形式の部屋に対する終了日の扱い
///
/// # 戻り値
///
/// ソート済みの`AvailabilityResult`のリスト
pub fn evaluate(query: &AvailabilityQuery, vessels: &[VesselReport], bound: EndBound) -> Vec<AvailabilityResult> {
    let mut results = Vec::new();

    for vessel in vessels.iter().filter(|v| query.includes_vessel(&v.boat_name)) {
        let candidates = &vessel.extraction.candidate_start_dates;

        for room in &vessel.extraction.rooms {
            let dates = match (&room.state, query.mode) {
                (RoomState::Occupied(occupied), QueryMode::StartDates) => {
                    find_available_start_dates(query.start, query.end, occupied, candidates)
                }
                (RoomState::Occupied(occupied), QueryMode::WholeRange) => {
                    if is_free_for_range(query.start, query.end, occupied) {
                        vec![query.start]
                    } else {
                        Vec::new()
                    }
                }
                (RoomState::AvailableDates(available), QueryMode::StartDates) => {
                    available_dates_in(query.start, query.end, available, bound)
                }
                (RoomState::AvailableDates(available), QueryMode::WholeRange) => {
                    // 範囲内に出発日が1つでもあれば空きとみなす
                    if available_dates_in(query.start, query.end, available, bound).is_empty() {
                        Vec::new()
                    } else {
                        vec![query.start]
                    }
                }
            };

            results.extend(dates.into_iter().map(|start_date| AvailabilityResult {
                start_date,
                boat_name: room.boat_name.clone(),
                boat_link: vessel.boat_link.clone(),
                room_name: room.room_name.clone(),
                room_link: room.room_link.clone(),
            }));
        }
    }

    sort_results(&mut results);
    results
}
