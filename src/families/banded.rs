//! Banded Chart Family
//!
//! 複数の船舶セクションが縦に並ぶ予約チャート（`Booking Chart {year}`）。
//! 料金バンドは太い罫線で区切られた列範囲で、各バンドの先頭列が出発日を表します。
//! 部屋は船舶セクション内の継続グループ（キャビン番号 + 部屋ラベル）です。

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::WorksheetSelector;
use crate::classify::{ColorClassifier, Verdict};
use crate::dates::{leading_day, resolve_day};
use crate::error::CabinError;
use crate::families::{ExtractContext, Extraction, LayoutFamily};
use crate::grid::Grid;
use crate::layout::bands::{detect_bands, find_border_row, find_marker_row, marker_columns};
use crate::layout::months::{collect_month_spans, find_month_header_row, month_for_col, MonthSpan};
use crate::layout::rows::continuation_groups;
use crate::layout::sections::{find_boat_section, find_day_row};
use crate::normalize::{normalize, LabelAlias, RoomRecord, RoomState};

/// 罫線バンドで出発日を区切る予約チャート
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BandedChart {
    /// セクションラベル（空の場合は船舶名）
    pub section_labels: Vec<String>,
    /// 次のセクションの見出しの接頭辞
    pub section_prefix: String,
    /// キャビン番号の列
    pub id_col: usize,
    /// 部屋ラベルの列
    pub label_col: usize,
    /// 最後の月の範囲を行末から延長する列数
    pub tail: usize,
    /// 部屋ラベルの別名（リンク解決用）
    pub aliases: Vec<LabelAlias>,
    /// 塗りつぶしなしのセルの判定
    pub missing: Verdict,
}

impl Default for BandedChart {
    fn default() -> Self {
        Self {
            section_labels: Vec::new(),
            section_prefix: "KANHA ".to_string(),
            id_col: 0,
            label_col: 1,
            tail: 50,
            aliases: Vec::new(),
            missing: Verdict::Available,
        }
    }
}

impl BandedChart {
    fn labels(&self, ctx: &ExtractContext<'_>) -> Vec<String> {
        if self.section_labels.is_empty() {
            vec![ctx.boat.name.to_uppercase()]
        } else {
            self.section_labels.clone()
        }
    }

    /// バンド先頭列の日付
    ///
    /// 日番号行を優先し、読めない場合は日番号行の前後3行（日番号行がない場合は
    /// 月ヘッダーの直後4行）から最初に読める日番号を使います。
    fn band_date(
        grid: &Grid,
        header_row: usize,
        day_row: Option<usize>,
        spans: &[MonthSpan],
        col: usize,
        year: i32,
    ) -> Option<NaiveDate> {
        let month = month_for_col(spans, col)?;

        let direct = day_row.and_then(|row| leading_day(grid.text(row, col)));
        let day = direct.or_else(|| {
            let (from, to) = match day_row {
                Some(row) => (row.saturating_sub(3), row + 3),
                None => (header_row + 1, header_row + 4),
            };
            (from..=to.min(grid.row_count().saturating_sub(1)))
                .find_map(|row| leading_day(grid.text(row, col)))
        })?;

        resolve_day(year, month, day)
    }
}

impl LayoutFamily for BandedChart {
    fn name(&self) -> &'static str {
        "banded-chart"
    }

    fn default_worksheets(&self) -> WorksheetSelector {
        WorksheetSelector::SeasonChart
    }

    fn extract(&self, grid: &Grid, ctx: &ExtractContext<'_>) -> Result<Extraction, CabinError> {
        let header_row = find_month_header_row(grid, 0)
            .ok_or_else(|| CabinError::layout(grid.title(), "no month header row"))?;
        let day_row = find_day_row(grid, header_row);
        let spans = collect_month_spans(grid, header_row, self.tail);

        let labels = self.labels(ctx);
        let section = find_boat_section(grid, &labels, &self.section_prefix).ok_or_else(|| {
            CabinError::layout(grid.title(), format!("no section labelled {}", labels.join(" / ")))
        })?;

        let marker_row = find_marker_row(grid, section.start_row, section.end_row);
        let border_row = find_border_row(grid, section.start_row, section.end_row, marker_row);
        let bands = detect_bands(grid, border_row, &marker_columns(grid, marker_row));
        if bands.is_empty() {
            return Err(CabinError::layout(grid.title(), "no bordered bands in section"));
        }

        let dated: Vec<(usize, NaiveDate)> = bands
            .iter()
            .filter_map(|band| {
                let date = Self::band_date(grid, header_row, day_row, &spans, band.start_col, ctx.season_year);
                if date.is_none() {
                    tracing::trace!(sheet = grid.title(), col = band.start_col, "band without date");
                }
                date.map(|date| (band.start_col, date))
            })
            .collect();

        let classifier = ColorClassifier::banded().with_missing(self.missing);
        let groups = continuation_groups(
            grid,
            self.id_col,
            self.label_col,
            section.start_row + 1,
            section.end_row + 1,
        );

        let mut records = Vec::with_capacity(groups.len());
        for group in &groups {
            let available: BTreeSet<NaiveDate> = dated
                .iter()
                .filter(|(col, _)| {
                    group
                        .rows
                        .iter()
                        .any(|&row| classifier.classify(grid.background(row, *col)).is_available())
                })
                .map(|(_, date)| *date)
                .collect();

            let sheet_link = group
                .rows
                .first()
                .and_then(|&row| grid.cell(row, self.label_col).hyperlink.clone());
            records.push(
                RoomRecord::new(group.label.clone(), RoomState::AvailableDates(available))
                    .with_sheet_link(sheet_link),
            );
        }

        tracing::debug!(
            sheet = grid.title(),
            section_start = section.start_row,
            section_end = section.end_row,
            bands = bands.len(),
            groups = groups.len(),
            "banded chart extracted"
        );

        Ok(Extraction {
            rooms: normalize(ctx.boat, records, &self.aliases),
            candidate_start_dates: dated.into_iter().map(|(_, date)| date).collect(),
        })
    }
}
