//! Range Blocks Family
//!
//! 年ごとのワークシートに、月ヘッダー行と範囲トークン行、その下に部屋ごとの
//! 3行ブロック（部屋名・説明・料金など）が並ぶシート。
//!
//! 部屋はラベル列のキーワード（既定ではカタログの部屋名の先頭単語）で見つけます。
//! ブロック内のすべての行が白の場合のみ、その範囲の開始日が空きとなります。

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::{AllAvailable, ConsensusPolicy};
use crate::api::WorksheetSelector;
use crate::classify::{ColorClassifier, Verdict};
use crate::error::CabinError;
use crate::families::{bare_ranges, first_word_keywords, ExtractContext, Extraction, LayoutFamily};
use crate::grid::Grid;
use crate::layout::months::{collect_month_spans, find_month_header_row};
use crate::layout::rows::keyword_blocks;
use crate::normalize::{normalize, RoomRecord, RoomState};

/// キーワードと部屋名の組
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomKeyword {
    pub keyword: String,
    pub room: String,
}

/// キーワードで見つける固定行数ブロックの表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeBlocks {
    /// ラベル列
    pub label_col: usize,
    /// 1部屋あたりの行数
    pub block_rows: usize,
    /// 走査を始める最小の行
    pub first_row: usize,
    /// 走査を終える行（含まない）
    pub last_row: usize,
    /// キーワード（空の場合はカタログの部屋名の先頭単語）
    pub keywords: Vec<RoomKeyword>,
    /// 塗りつぶしなしのセルの判定
    pub missing: Verdict,
}

impl Default for RangeBlocks {
    fn default() -> Self {
        Self {
            label_col: 1,
            block_rows: 3,
            first_row: 11,
            last_row: 26,
            keywords: Vec::new(),
            missing: Verdict::Occupied,
        }
    }
}

impl LayoutFamily for RangeBlocks {
    fn name(&self) -> &'static str {
        "range-blocks"
    }

    fn default_worksheets(&self) -> WorksheetSelector {
        WorksheetSelector::YearTitled
    }

    fn extract(&self, grid: &Grid, ctx: &ExtractContext<'_>) -> Result<Extraction, CabinError> {
        let header_row = find_month_header_row(grid, 0)
            .ok_or_else(|| CabinError::layout(grid.title(), "no month header row"))?;
        let range_row = header_row + 1;
        let spans = collect_month_spans(grid, header_row, 0);
        let ranges = bare_ranges(grid, range_row, &spans, 0, ctx.season_year);

        let keywords: Vec<(String, String)> = if self.keywords.is_empty() {
            first_word_keywords(ctx.boat)
        } else {
            self.keywords
                .iter()
                .map(|k| (k.keyword.trim().to_uppercase(), k.room.clone()))
                .collect()
        };
        if keywords.is_empty() {
            return Err(CabinError::layout(grid.title(), "no room keywords"));
        }

        let start = (range_row + 1).max(self.first_row);
        let end = grid.row_count().min(self.last_row);
        let blocks = keyword_blocks(grid, self.label_col, start, end, &keywords, self.block_rows);

        let classifier = ColorClassifier::table().with_missing(self.missing);
        let mut records = Vec::with_capacity(blocks.len());
        for block in &blocks {
            let available: BTreeSet<NaiveDate> = ranges
                .iter()
                .filter(|(col, _)| {
                    let verdicts: Vec<Verdict> = block
                        .rows
                        .iter()
                        .map(|&row| classifier.classify(grid.background(row, *col)))
                        .collect();
                    AllAvailable.combine(&verdicts).is_available()
                })
                .map(|(_, range)| range.start)
                .collect();

            records.push(
                RoomRecord::new(block.room.clone(), RoomState::AvailableDates(available))
                    .with_catalog_room(block.room.clone()),
            );
        }

        tracing::debug!(
            sheet = grid.title(),
            header_row,
            rooms = records.len(),
            ranges = ranges.len(),
            "range blocks extracted"
        );

        Ok(Extraction {
            rooms: normalize(ctx.boat, records, &[]),
            candidate_start_dates: ranges.iter().map(|(_, range)| range.start).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BoatEntry, RoomEntry};
    use crate::grid::Cell;
    use crate::types::Color;

    fn boat() -> BoatEntry {
        let mut boat = BoatEntry::new("Barakati");
        boat.rooms = vec![
            RoomEntry::new("Wakatobi", Some("https://example.com/wakatobi")),
            RoomEntry::new("Wolio", None),
        ];
        boat
    }

    /// 月ヘッダー行0、範囲行1、部屋ブロックは行2から
    fn grid() -> Grid {
        let mut grid = Grid::from_text_rows(
            "2025",
            &[
                vec!["", "", "JULY", "", "AUGUST"],
                vec!["", "", "5-8", "20-23", "2-5"],
                vec!["", "Wakatobi room (double)", "", "", ""],
                vec!["", "IDR 4.000.000", "", "", ""],
                vec!["", "", "", "", ""],
                vec!["", "Wolio", "", "", ""],
                vec!["", "", "", "", ""],
                vec!["", "", "", "", ""],
            ],
        );
        for row in 2..8 {
            for col in 2..5 {
                let text = grid.cell(row, col).text.clone();
                grid.set_cell(row, col, Cell::new(text).with_background(Color::WHITE));
            }
        }
        grid
    }

    fn layout() -> RangeBlocks {
        RangeBlocks {
            first_row: 0,
            ..RangeBlocks::default()
        }
    }

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    #[test]
    fn test_every_block_row_must_be_white() {
        let mut grid = grid();
        // Wakatobiの説明行だけ8/2-5を赤にする
        grid.set_cell(3, 4, Cell::empty().with_background(Color::rgb(1.0, 0.0, 0.0)));

        let boat = boat();
        let extraction = layout().extract(&grid, &ExtractContext::new(&boat, 2025)).unwrap();

        assert_eq!(extraction.rooms.len(), 2);
        let wakatobi = &extraction.rooms[0];
        assert_eq!(wakatobi.room_name, "Wakatobi");
        assert_eq!(wakatobi.room_link.as_deref(), Some("https://example.com/wakatobi"));
        assert_eq!(
            wakatobi.state,
            RoomState::AvailableDates([d(7, 5), d(7, 20)].into_iter().collect())
        );
        assert_eq!(
            extraction.rooms[1].state,
            RoomState::AvailableDates([d(7, 5), d(7, 20), d(8, 2)].into_iter().collect())
        );
    }

    #[test]
    fn test_missing_color_is_not_available() {
        let mut grid = grid();
        grid.set_cell(6, 2, Cell::empty());

        let boat = boat();
        let extraction = layout().extract(&grid, &ExtractContext::new(&boat, 2025)).unwrap();
        assert_eq!(
            extraction.rooms[1].state,
            RoomState::AvailableDates([d(7, 20), d(8, 2)].into_iter().collect())
        );
    }

    #[test]
    fn test_scan_window_respects_first_row() {
        let boat = boat();
        let extraction = RangeBlocks::default()
            .extract(&grid(), &ExtractContext::new(&boat, 2025))
            .unwrap();
        assert!(extraction.rooms.is_empty());
        assert_eq!(extraction.candidate_start_dates.len(), 3);
    }

    #[test]
    fn test_explicit_keywords() {
        let layout = RangeBlocks {
            keywords: vec![RoomKeyword {
                keyword: "wolio".to_string(),
                room: "Wolio".to_string(),
            }],
            ..layout()
        };
        let boat = boat();
        let extraction = layout.extract(&grid(), &ExtractContext::new(&boat, 2025)).unwrap();
        assert_eq!(extraction.rooms.len(), 1);
        assert_eq!(extraction.rooms[0].room_name, "Wolio");
    }
}
