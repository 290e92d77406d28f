//! Aggregator Module
//!
//! セル単位の判定（ベッド、共用ユニット、結合ブロック内の行など）を
//! 部屋×日付ごとの1つの判定にまとめるモジュール。
//!
//! 合意方針は`ConsensusPolicy`トレイトで差し替え可能です。
//!
//! - `AnyAvailable`: 1つでも空きがあれば空き（複数ベッドの部屋、バンド行の部屋）
//! - `AllAvailable`: すべて空きの場合のみ空き（結合セル、キーワードブロック）

use std::collections::{BTreeMap, BTreeSet};

use crate::classify::{ColorClassifier, Verdict};
use crate::dates::DateRange;
use crate::grid::Grid;

/// 集約前の判定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSignal<S> {
    /// 部屋の識別子
    pub room_key: String,
    /// 日付または日付範囲
    pub slot: S,
    /// セル単位の判定
    pub verdict: Verdict,
}

impl<S> RoomSignal<S> {
    pub fn new(room_key: impl Into<String>, slot: S, verdict: Verdict) -> Self {
        Self {
            room_key: room_key.into(),
            slot,
            verdict,
        }
    }
}

/// 合意方針
pub trait ConsensusPolicy: Send + Sync {
    /// 方針名（ログ出力用）
    fn name(&self) -> &'static str;

    /// 複数の判定を1つにまとめる
    fn combine(&self, verdicts: &[Verdict]) -> Verdict;
}

/// 1つでも空きがあれば空き
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyAvailable;

impl ConsensusPolicy for AnyAvailable {
    fn name(&self) -> &'static str {
        "any-available"
    }

    fn combine(&self, verdicts: &[Verdict]) -> Verdict {
        Verdict::from_available(verdicts.iter().any(|v| v.is_available()))
    }
}

/// すべて空きの場合のみ空き
#[derive(Debug, Clone, Copy, Default)]
pub struct AllAvailable;

impl ConsensusPolicy for AllAvailable {
    fn name(&self) -> &'static str {
        "all-available"
    }

    fn combine(&self, verdicts: &[Verdict]) -> Verdict {
        Verdict::from_available(!verdicts.is_empty() && verdicts.iter().all(|v| v.is_available()))
    }
}

/// 部屋×スロットごとに判定を集約
///
/// # 引数
///
/// * `signals` - 集約前の判定
/// * `policy` - 合意方針
///
/// # 戻り値
///
/// 部屋 -> スロット -> 集約後の判定
pub fn aggregate<S, I>(signals: I, policy: &dyn ConsensusPolicy) -> BTreeMap<String, BTreeMap<S, Verdict>>
where
    S: Ord,
    I: IntoIterator<Item = RoomSignal<S>>,
{
    let mut grouped: BTreeMap<String, BTreeMap<S, Vec<Verdict>>> = BTreeMap::new();
    for signal in signals {
        grouped
            .entry(signal.room_key)
            .or_default()
            .entry(signal.slot)
            .or_default()
            .push(signal.verdict);
    }

    grouped
        .into_iter()
        .map(|(room, slots)| {
            let combined = slots
                .into_iter()
                .map(|(slot, verdicts)| (slot, policy.combine(&verdicts)))
                .collect();
            (room, combined)
        })
        .collect()
}

/// 共用ユニットの占有範囲を親の部屋にまとめる
///
/// 各子ユニットの占有範囲を判定に読み替えて`policy`で集約し、
/// 占有と判定された範囲を返します。
pub fn rollup_occupied(
    children: &[&BTreeSet<DateRange>],
    policy: &dyn ConsensusPolicy,
) -> BTreeSet<DateRange> {
    let all: BTreeSet<DateRange> = children.iter().flat_map(|set| set.iter().copied()).collect();

    all.into_iter()
        .filter(|range| {
            let verdicts: Vec<Verdict> = children
                .iter()
                .map(|child| Verdict::from_available(!child.contains(range)))
                .collect();
            !policy.combine(&verdicts).is_available()
        })
        .collect()
}

/// 共用ユニット（`Bern (sharing) 1..N`など）を親の部屋にまとめる
///
/// 親の部屋は、すべての子ユニットが占有されている範囲のみ占有です。
pub fn umbrella_rollup(children: &[&BTreeSet<DateRange>]) -> BTreeSet<DateRange> {
    rollup_occupied(children, &AnyAvailable)
}

/// 結合範囲を考慮してセルの背景色を判定
///
/// セルが結合範囲内にある場合、結合ブロック内のすべてのセルを評価し、
/// 1つでも空きでないセルがあればブロック全体を占有とします。
pub fn resolve_merged(grid: &Grid, row: usize, col: usize, classifier: &ColorClassifier) -> Verdict {
    match grid.merge_at(row, col) {
        Some(merge) => {
            let verdicts: Vec<Verdict> = merge
                .coords()
                .map(|coord| classifier.classify(grid.background(coord.row as usize, coord.col as usize)))
                .collect();
            AllAvailable.combine(&verdicts)
        }
        None => classifier.classify(grid.background(row, col)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;
    use crate::types::{Color, MergeRange};
    use chrono::NaiveDate;

    fn range(start: u32, end: u32) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2025, 9, start).unwrap(),
            NaiveDate::from_ymd_opt(2025, 9, end).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_multi_bed_room_available_when_one_bed_free() {
        let r = range(12, 15);
        let signals = vec![
            RoomSignal::new("Master", r, Verdict::Occupied),
            RoomSignal::new("Master", r, Verdict::Available),
        ];
        let result = aggregate(signals, &AnyAvailable);
        assert_eq!(result["Master"][&r], Verdict::Available);
    }

    #[test]
    fn test_multi_bed_room_occupied_when_all_beds_taken() {
        let r = range(12, 15);
        let signals = vec![
            RoomSignal::new("Master", r, Verdict::Occupied),
            RoomSignal::new("Master", r, Verdict::Occupied),
        ];
        let result = aggregate(signals, &AnyAvailable);
        assert_eq!(result["Master"][&r], Verdict::Occupied);
    }

    #[test]
    fn test_all_available_policy() {
        assert_eq!(
            AllAvailable.combine(&[Verdict::Available, Verdict::Occupied]),
            Verdict::Occupied
        );
        assert_eq!(
            AllAvailable.combine(&[Verdict::Available, Verdict::Available]),
            Verdict::Available
        );
        assert_eq!(AllAvailable.combine(&[]), Verdict::Occupied);
        assert_eq!(AnyAvailable.combine(&[]), Verdict::Occupied);
    }

    #[test]
    fn test_umbrella_rollup_requires_all_children() {
        let a: BTreeSet<_> = [range(1, 4), range(12, 15)].into_iter().collect();
        let b: BTreeSet<_> = [range(12, 15)].into_iter().collect();
        let c: BTreeSet<_> = [range(1, 4), range(12, 15)].into_iter().collect();

        let parent = umbrella_rollup(&[&a, &b, &c]);
        assert_eq!(parent, [range(12, 15)].into_iter().collect());
        assert!(umbrella_rollup(&[]).is_empty());
    }

    #[test]
    fn test_merged_block_with_non_available_second_row_is_occupied() {
        let mut grid = Grid::new("Sheet1");
        grid.set_cell(0, 0, Cell::new("x").with_background(Color::WHITE));
        grid.set_cell(1, 0, Cell::empty().with_background(Color::rgb(1.0, 0.0, 0.0)));
        grid.add_merge(MergeRange::new(0, 2, 0, 1)).unwrap();

        let classifier = ColorClassifier::table();
        assert_eq!(resolve_merged(&grid, 0, 0, &classifier), Verdict::Occupied);
        assert_eq!(resolve_merged(&grid, 1, 0, &classifier), Verdict::Occupied);
    }

    #[test]
    fn test_unmerged_cell_uses_own_color() {
        let mut grid = Grid::new("Sheet1");
        grid.set_cell(0, 0, Cell::new("x").with_background(Color::WHITE));
        grid.set_cell(1, 0, Cell::empty().with_background(Color::rgb(1.0, 0.0, 0.0)));

        let classifier = ColorClassifier::table();
        assert_eq!(resolve_merged(&grid, 0, 0, &classifier), Verdict::Available);
        assert_eq!(resolve_merged(&grid, 1, 0, &classifier), Verdict::Occupied);
    }
}
