//! Range Table Family
//!
//! 固定位置の日付範囲行と、その下に並ぶ部屋行からなる表。
//! 日付範囲は`"Sept\n12-14"`のような2行形式のトークンで、部屋行のセルが白以外で
//! 塗られていればその範囲は占有されています。
//!
//! 共用ユニット（`Bern (sharing) 1..4`など）は親の部屋（`Bern`）にまとめられ、
//! 親はすべてのユニットが占有されている範囲のみ占有となります。

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::aggregate::{resolve_merged, umbrella_rollup};
use crate::classify::{ColorClassifier, Verdict};
use crate::dates::{parse_two_line_range, DateRange};
use crate::error::CabinError;
use crate::families::{ExtractContext, Extraction, LayoutFamily};
use crate::grid::Grid;
use crate::normalize::{normalize, RoomRecord, RoomState};

/// シート上のラベルと部屋名の対応
///
/// 大文字化したラベルが`label`と一致するか、`label`で始まる場合に対応します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelMapping {
    pub label: String,
    pub room: String,
}

impl LabelMapping {
    pub fn new(label: impl Into<String>, room: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            room: room.into(),
        }
    }
}

/// 共用ユニットのまとめ方
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Umbrella {
    /// 親の部屋名（例: `"Bern"`）
    pub parent: String,
    /// 子ユニットの部屋名の接頭辞（例: `"Bern (sharing)"`）
    pub child_prefix: String,
}

/// 2行形式の日付範囲を持つ固定行の表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeTable {
    /// 日付範囲行
    pub date_row: usize,
    /// 日付範囲行の直後に続く部屋行の数
    pub room_rows: usize,
    /// ラベル列
    pub label_col: usize,
    /// 最初のデータ列
    pub first_data_col: usize,
    /// 部屋行のラベルに含まれる語（空の場合は制限なし）
    pub label_filter: String,
    /// ラベル対応表（空の場合はラベルをそのまま部屋名とする）
    pub labels: Vec<LabelMapping>,
    /// 共用ユニットのまとめ方
    pub umbrella: Option<Umbrella>,
    /// 塗りつぶしなしのセルの判定
    pub missing: Verdict,
}

impl Default for RangeTable {
    fn default() -> Self {
        Self {
            date_row: 28,
            room_rows: 9,
            label_col: 0,
            first_data_col: 2,
            label_filter: "ROOM".to_string(),
            labels: Vec::new(),
            umbrella: None,
            missing: Verdict::Available,
        }
    }
}

impl RangeTable {
    /// ラベルを部屋名に変換（対応しない場合は`None`）
    fn room_name(&self, label: &str) -> Option<String> {
        let upper = label.trim().to_uppercase();
        if upper.is_empty() {
            return None;
        }
        if !self.label_filter.is_empty() && !upper.contains(&self.label_filter.to_uppercase()) {
            return None;
        }
        if self.labels.is_empty() {
            return Some(label.trim().to_string());
        }

        self.labels
            .iter()
            .find(|mapping| mapping.label.trim().to_uppercase() == upper)
            .or_else(|| {
                self.labels
                    .iter()
                    .find(|mapping| upper.starts_with(&mapping.label.trim().to_uppercase()))
            })
            .map(|mapping| mapping.room.clone())
    }

    /// 日付範囲行を解析
    fn date_ranges(&self, grid: &Grid, year: i32) -> Vec<(usize, DateRange)> {
        grid.row(self.date_row)
            .iter()
            .enumerate()
            .skip(self.first_data_col)
            .filter(|(_, cell)| !cell.is_blank())
            .filter_map(|(col, cell)| match parse_two_line_range(&cell.text, year) {
                Ok(range) => Some((col, range)),
                Err(err) => {
                    tracing::trace!(sheet = grid.title(), col, "{}", err);
                    None
                }
            })
            .collect()
    }
}

impl LayoutFamily for RangeTable {
    fn name(&self) -> &'static str {
        "range-table"
    }

    fn extract(&self, grid: &Grid, ctx: &ExtractContext<'_>) -> Result<Extraction, CabinError> {
        if grid.row_count() <= self.date_row {
            return Err(CabinError::layout(
                grid.title(),
                format!("date row {} is beyond the last row", self.date_row + 1),
            ));
        }

        let ranges = self.date_ranges(grid, ctx.season_year);
        if ranges.is_empty() {
            return Err(CabinError::layout(
                grid.title(),
                format!("no date ranges in row {}", self.date_row + 1),
            ));
        }

        let classifier = ColorClassifier::table().with_missing(self.missing);
        let first_room = self.date_row + 1;
        let last_room = (first_room + self.room_rows).min(grid.row_count());

        // 部屋名 -> 占有範囲（ラベル順を保持）
        let mut rooms: Vec<(String, BTreeSet<DateRange>)> = Vec::new();
        for row in first_room..last_room {
            let Some(name) = self.room_name(grid.text(row, self.label_col)) else {
                continue;
            };

            let occupied: BTreeSet<DateRange> = ranges
                .iter()
                .filter(|(col, _)| !resolve_merged(grid, row, *col, &classifier).is_available())
                .map(|(_, range)| *range)
                .collect();

            match rooms.iter_mut().find(|(existing, _)| *existing == name) {
                Some((_, set)) => set.extend(occupied),
                None => rooms.push((name, occupied)),
            }
        }

        if let Some(umbrella) = &self.umbrella {
            let prefix = umbrella.child_prefix.to_uppercase();
            let (children, mut others): (Vec<_>, Vec<_>) = rooms
                .into_iter()
                .partition(|(name, _)| name.to_uppercase().starts_with(&prefix));

            if !children.is_empty() {
                let sets: Vec<&BTreeSet<DateRange>> = children.iter().map(|(_, set)| set).collect();
                let parent = umbrella_rollup(&sets);
                match others.iter_mut().find(|(name, _)| *name == umbrella.parent) {
                    Some((_, set)) => set.extend(parent),
                    None => others.push((umbrella.parent.clone(), parent)),
                }
            }
            rooms = others;
        }

        tracing::debug!(
            sheet = grid.title(),
            rooms = rooms.len(),
            ranges = ranges.len(),
            "range table extracted"
        );

        let records = rooms
            .into_iter()
            .map(|(name, occupied)| RoomRecord::new(name, RoomState::Occupied(occupied)))
            .collect();

        Ok(Extraction {
            rooms: normalize(ctx.boat, records, &[]),
            candidate_start_dates: ranges.iter().map(|(_, range)| range.start).collect(),
        })
    }
}
