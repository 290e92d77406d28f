//! Range Rows Family
//!
//! 月ヘッダー行と範囲トークン行のブロックが縦に繰り返され、各ブロックの下に
//! 部屋ごとに1行が並ぶシート。部屋名はシート上のラベルをそのまま使い、
//! リンクはカタログ上の同じ位置の部屋から取ります。

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::WorksheetSelector;
use crate::classify::{ColorClassifier, Verdict};
use crate::error::CabinError;
use crate::families::{bare_ranges, ExtractContext, Extraction, LayoutFamily};
use crate::grid::Grid;
use crate::layout::months::{collect_month_spans, find_month_header_row};
use crate::layout::rows::label_runs;
use crate::normalize::{normalize, RoomRecord, RoomState};

/// ヘッダーブロックごとに部屋行が並ぶシート
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeRows {
    /// ラベル列
    pub label_col: usize,
    /// 最後の月の範囲を行末から延長する列数
    pub tail: usize,
    /// 塗りつぶしなしのセルの判定
    pub missing: Verdict,
}

impl Default for RangeRows {
    fn default() -> Self {
        Self {
            label_col: 1,
            tail: 50,
            missing: Verdict::Occupied,
        }
    }
}

impl LayoutFamily for RangeRows {
    fn name(&self) -> &'static str {
        "range-rows"
    }

    fn default_worksheets(&self) -> WorksheetSelector {
        WorksheetSelector::All
    }

    fn extract(&self, grid: &Grid, ctx: &ExtractContext<'_>) -> Result<Extraction, CabinError> {
        let classifier = ColorClassifier::table().with_missing(self.missing);
        let mut records = Vec::new();
        let mut candidates = BTreeSet::new();
        let mut blocks = 0;

        let mut next = find_month_header_row(grid, 0);
        while let Some(header_row) = next {
            let range_row = header_row + 1;
            let following = find_month_header_row(grid, range_row + 1);
            let block_end = following.unwrap_or(grid.row_count());

            let spans = collect_month_spans(grid, header_row, self.tail);
            let ranges = bare_ranges(grid, range_row, &spans, 0, ctx.season_year);
            candidates.extend(ranges.iter().map(|(_, range)| range.start));

            for (position, (label, row)) in label_runs(grid, self.label_col, range_row + 1, block_end)
                .into_iter()
                .enumerate()
            {
                let available: BTreeSet<NaiveDate> = ranges
                    .iter()
                    .filter(|(col, _)| classifier.classify(grid.background(row, *col)).is_available())
                    .map(|(_, range)| range.start)
                    .collect();

                let mut record = RoomRecord::new(label, RoomState::AvailableDates(available));
                if let Some(room) = ctx.boat.room_at(position) {
                    record = record.with_catalog_room(room.name.clone());
                }
                records.push(record);
            }

            blocks += 1;
            next = following;
        }

        if blocks == 0 {
            return Err(CabinError::layout(grid.title(), "no month header row"));
        }

        tracing::debug!(
            sheet = grid.title(),
            blocks,
            rooms = records.len(),
            "range rows extracted"
        );

        Ok(Extraction {
            rooms: normalize(ctx.boat, records, &[]),
            candidate_start_dates: candidates,
        })
    }
}
