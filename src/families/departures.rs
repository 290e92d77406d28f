//! Departure Sections Family
//!
//! 出発日ラベル（`"APRIL 12TH"`）ごとにセクションが並ぶシート。
//! 各セクションは`ROOM TYPE`見出しの下に部屋ごとの固定行数ブロックを持ち、
//! 左右2つの出発日が横に並びます（左: ラベル列0 / ステータス列2、右: ラベル列11 / ステータス列13）。
//!
//! ステータス列の文字列が`BOOKED`でない行が1つでもあれば、その出発日は空きです。

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::aggregate::{aggregate, AnyAvailable, RoomSignal};
use crate::api::WorksheetSelector;
use crate::classify::{classify_status, Verdict};
use crate::error::CabinError;
use crate::families::{ExtractContext, Extraction, LayoutFamily};
use crate::grid::Grid;
use crate::layout::rows::{fixed_offset_rows, FixedBlock};
use crate::layout::sections::{find_departure_rows, find_header_rows};
use crate::normalize::{normalize, LabelAlias, RoomRecord, RoomState};

/// 出発日ごとのセクションを持つシート
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepartureSections {
    /// 左側の出発日ラベル列
    pub left_col: usize,
    /// 右側の出発日ラベル列
    pub right_col: usize,
    /// ラベル列からステータス列までのオフセット
    pub status_offset: usize,
    /// 部屋ブロックの見出し
    pub heading: String,
    /// 部屋ごとの行数（見出しの直後から順に割り当て）
    pub blocks: Vec<FixedBlock>,
    /// 対象とするワークシート名の接頭辞
    pub worksheet_prefix: Option<String>,
    /// 部屋名の別名
    pub aliases: Vec<LabelAlias>,
}

impl Default for DepartureSections {
    fn default() -> Self {
        Self {
            left_col: 0,
            right_col: 11,
            status_offset: 2,
            heading: "ROOM TYPE".to_string(),
            blocks: Vec::new(),
            worksheet_prefix: None,
            aliases: Vec::new(),
        }
    }
}

impl LayoutFamily for DepartureSections {
    fn name(&self) -> &'static str {
        "departure-sections"
    }

    fn default_worksheets(&self) -> WorksheetSelector {
        match &self.worksheet_prefix {
            Some(prefix) => WorksheetSelector::Prefix(prefix.clone()),
            None => WorksheetSelector::All,
        }
    }

    fn extract(&self, grid: &Grid, ctx: &ExtractContext<'_>) -> Result<Extraction, CabinError> {
        if self.blocks.is_empty() {
            return Err(CabinError::layout(grid.title(), "no room blocks configured"));
        }

        let departures = find_departure_rows(grid, self.left_col, self.right_col, ctx.season_year);
        if departures.is_empty() {
            return Err(CabinError::layout(grid.title(), "no departure labels"));
        }
        let headers = find_header_rows(grid, self.left_col, &self.heading);

        let mut signals: Vec<RoomSignal<NaiveDate>> = Vec::new();
        let mut candidates = BTreeSet::new();

        for (idx, departure) in departures.iter().enumerate() {
            let section_end = departures
                .get(idx + 1)
                .map_or(grid.row_count(), |next| next.row);
            let Some(&header) = headers
                .iter()
                .find(|&&row| row > departure.row && row < section_end)
            else {
                tracing::trace!(sheet = grid.title(), row = departure.row, "departure without heading");
                continue;
            };

            let rooms = fixed_offset_rows(header + 1, section_end, &self.blocks);
            let sides = [
                (departure.left, self.left_col),
                (departure.right, self.right_col),
            ];
            for (date, label_col) in sides {
                let Some(date) = date else { continue };
                candidates.insert(date);
                let status_col = label_col + self.status_offset;

                for room in &rooms {
                    for &row in &room.rows {
                        let verdict = classify_status(grid.resolved_text(row, status_col));
                        signals.push(RoomSignal::new(room.room.as_str(), date, verdict));
                    }
                }
            }
        }

        let verdicts = aggregate(signals, &AnyAvailable);

        // ブロック定義の順序で出力する
        let mut records = Vec::new();
        for block in &self.blocks {
            let Some(slots) = verdicts.get(&block.room) else {
                continue;
            };
            if records.iter().any(|r: &RoomRecord| r.name == block.room) {
                continue;
            }
            records.push(RoomRecord::new(
                block.room.clone(),
                RoomState::AvailableDates(available_dates(slots)),
            ));
        }

        tracing::debug!(
            sheet = grid.title(),
            departures = departures.len(),
            rooms = records.len(),
            "departure sections extracted"
        );

        Ok(Extraction {
            rooms: normalize(ctx.boat, records, &self.aliases),
            candidate_start_dates: candidates,
        })
    }
}

fn available_dates(slots: &BTreeMap<NaiveDate, Verdict>) -> BTreeSet<NaiveDate> {
    slots
        .iter()
        .filter(|(_, verdict)| verdict.is_available())
        .map(|(date, _)| *date)
        .collect()
}
