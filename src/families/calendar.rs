//! Color Calendar Family
//!
//! 月ごとのカレンダーブロック（月名の見出し、曜日行、6行の日付行）が並ぶシート。
//! 目標色で塗られた日付が空きで、船舶全体を表す1件の部屋として出力します。
//!
//! ブロックの列は、固定のスロット定義、見出しセルの結合範囲、見出し位置からの
//! オフセットの順に決定します。

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::classify::{ColorClassifier, TargetColor, Verdict};
use crate::dates::{parse_day_cell, resolve_day};
use crate::error::CabinError;
use crate::families::{ExtractContext, Extraction, LayoutFamily};
use crate::grid::Grid;
use crate::layout::sections::{find_calendar_headers, CalendarHeader};
use crate::normalize::{normalize, RoomRecord, RoomState};

/// 見出し位置に応じた固定の列範囲
///
/// 見出しの列が`max_header_col`以下（`None`の場合は常に）であれば、
/// `start_col..end_col`（`end_col`は含まない）をブロックの列とします。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarSlot {
    #[serde(default)]
    pub max_header_col: Option<usize>,
    pub start_col: usize,
    pub end_col: usize,
}

/// 月ごとのカレンダーブロックを持つシート
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorCalendar {
    /// 空きを表す色
    pub target: TargetColor,
    /// 固定の列範囲（先に一致したものを採用）
    pub slots: Vec<CalendarSlot>,
    /// 見出し列からブロック先頭列までのオフセット
    pub lead: i64,
    /// ブロックの列数
    pub width: usize,
    /// 見出しの2行下から数えた日付行の数
    pub date_rows: usize,
    /// 出力する部屋名
    pub room: String,
    /// 塗りつぶしなしのセルの判定
    pub missing: Verdict,
}

impl Default for ColorCalendar {
    fn default() -> Self {
        Self {
            target: TargetColor::White,
            slots: Vec::new(),
            lead: -1,
            width: 7,
            date_rows: 6,
            room: "All Rooms".to_string(),
            missing: Verdict::Occupied,
        }
    }
}

impl ColorCalendar {
    /// 見出しに対応するブロックの列範囲（終端は含まない）
    fn block_columns(&self, grid: &Grid, header: &CalendarHeader) -> (usize, usize) {
        if let Some(slot) = self
            .slots
            .iter()
            .find(|slot| slot.max_header_col.map_or(true, |max| header.col <= max))
        {
            return (slot.start_col, slot.end_col);
        }

        if let Some(merge) = grid.merge_at(header.row, header.col) {
            if merge.col_span() > 1 {
                return (merge.col_start as usize, merge.col_end as usize);
            }
        }

        let start = (header.col as i64 + self.lead).max(0) as usize;
        (start, start + self.width)
    }
}

impl LayoutFamily for ColorCalendar {
    fn name(&self) -> &'static str {
        "color-calendar"
    }

    fn extract(&self, grid: &Grid, ctx: &ExtractContext<'_>) -> Result<Extraction, CabinError> {
        let headers = find_calendar_headers(grid);
        if headers.is_empty() {
            return Err(CabinError::layout(grid.title(), "no calendar month headers"));
        }

        let classifier = ColorClassifier::calendar(self.target.color()).with_missing(self.missing);
        let mut evaluated: BTreeSet<NaiveDate> = BTreeSet::new();
        let mut available: BTreeSet<NaiveDate> = BTreeSet::new();

        for header in &headers {
            let year = header.year.unwrap_or(ctx.season_year);
            let (start_col, end_col) = self.block_columns(grid, header);
            let first_row = header.row + 2;
            let last_row = (first_row + self.date_rows).min(grid.row_count());

            for row in first_row..last_row {
                for col in start_col..end_col {
                    let Some(day) = parse_day_cell(grid.text(row, col)) else {
                        continue;
                    };
                    let Some(date) = resolve_day(year, header.month, day) else {
                        tracing::trace!(sheet = grid.title(), row, col, day, "day does not resolve");
                        continue;
                    };

                    evaluated.insert(date);
                    if classifier.classify(grid.background(row, col)).is_available() {
                        available.insert(date);
                    }
                }
            }
        }

        tracing::debug!(
            sheet = grid.title(),
            blocks = headers.len(),
            evaluated = evaluated.len(),
            available = available.len(),
            "calendar extracted"
        );

        let records = if available.is_empty() {
            Vec::new()
        } else {
            vec![RoomRecord::new(self.room.clone(), RoomState::AvailableDates(available))]
        };

        Ok(Extraction {
            rooms: normalize(ctx.boat, records, &[]),
            candidate_start_dates: evaluated,
        })
    }
}
