//! Bed Table Family
//!
//! 月ヘッダー行と、その直下の範囲トークン行（`"4-6"`, `"30-1"`）を持ち、
//! 部屋ごとにベッドの数だけ行が並ぶ表。
//!
//! 月はヘッダーの月名セルから右方向に引き継がれます。部屋はいずれかのベッドが
//! 空いていれば空きで、すべてのベッドが占有されている範囲のみ占有となります。

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate, resolve_merged, AnyAvailable, RoomSignal};
use crate::classify::{ColorClassifier, Verdict};
use crate::dates::DateRange;
use crate::error::CabinError;
use crate::families::{bare_ranges, ExtractContext, Extraction, LayoutFamily};
use crate::grid::Grid;
use crate::layout::months::{collect_month_spans, find_month_header_row};
use crate::layout::rows::{fixed_offset_rows, FixedBlock};
use crate::normalize::{normalize, RoomRecord, RoomState};

/// ベッド単位の行を持つ表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BedTable {
    /// 月ヘッダー行（省略時は最初の月ヘッダー行を検出）
    pub header_row: Option<usize>,
    /// 最初のデータ列
    pub first_data_col: usize,
    /// 部屋ごとのベッド行（範囲トークン行の直後から順に割り当て）
    pub blocks: Vec<FixedBlock>,
    /// 塗りつぶしなしのセルの判定
    pub missing: Verdict,
}

impl Default for BedTable {
    fn default() -> Self {
        Self {
            header_row: None,
            first_data_col: 2,
            blocks: Vec::new(),
            missing: Verdict::Available,
        }
    }
}

impl LayoutFamily for BedTable {
    fn name(&self) -> &'static str {
        "bed-table"
    }

    fn extract(&self, grid: &Grid, ctx: &ExtractContext<'_>) -> Result<Extraction, CabinError> {
        if self.blocks.is_empty() {
            return Err(CabinError::layout(grid.title(), "no bed blocks configured"));
        }

        let header_row = match self.header_row {
            Some(row) if row < grid.row_count() => row,
            Some(row) => {
                return Err(CabinError::layout(
                    grid.title(),
                    format!("header row {} is beyond the last row", row + 1),
                ))
            }
            None => find_month_header_row(grid, 0)
                .ok_or_else(|| CabinError::layout(grid.title(), "no month header row"))?,
        };
        let range_row = header_row + 1;

        // 月ヘッダー行より範囲行が長い場合に備え、最後の月を範囲行の末尾まで延長する
        let spans = collect_month_spans(grid, header_row, grid.width());
        if spans.is_empty() {
            return Err(CabinError::layout(grid.title(), "no month names in header row"));
        }

        let ranges = bare_ranges(grid, range_row, &spans, self.first_data_col, ctx.season_year);
        let classifier = &ColorClassifier::table().with_missing(self.missing);
        let rooms = fixed_offset_rows(range_row + 1, grid.row_count(), &self.blocks);

        let mut records = Vec::with_capacity(rooms.len());
        for room in &rooms {
            let signals = room.rows.iter().flat_map(|&row| {
                ranges.iter().map(move |(col, range)| {
                    RoomSignal::new(room.room.as_str(), *range, resolve_merged(grid, row, *col, classifier))
                })
            });
            let verdicts = aggregate(signals, &AnyAvailable);

            let occupied: BTreeSet<DateRange> = verdicts
                .get(&room.room)
                .map(|slots| {
                    slots
                        .iter()
                        .filter(|(_, verdict)| !verdict.is_available())
                        .map(|(range, _)| *range)
                        .collect()
                })
                .unwrap_or_default();

            records.push(
                RoomRecord::new(room.room.clone(), RoomState::Occupied(occupied))
                    .with_catalog_room(room.room.clone()),
            );
        }

        tracing::debug!(
            sheet = grid.title(),
            header_row,
            rooms = records.len(),
            ranges = ranges.len(),
            "bed table extracted"
        );

        Ok(Extraction {
            rooms: normalize(ctx.boat, records, &[]),
            candidate_start_dates: ranges.iter().map(|(_, range)| range.start).collect(),
        })
    }
}
