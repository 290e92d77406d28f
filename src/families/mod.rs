//! Layout Families
//!
//! スプレッドシートの記述慣習ごとの抽出処理を提供するモジュール。
//!
//! 各ファミリーは`LayoutFamily`トレイトを実装し、1枚のグリッドから部屋ごとの
//! 空き状況（`Extraction`）を抽出します。船舶ごとにどのファミリーを使うかは
//! カタログの`layout`（`LayoutSpec`）で宣言します。
//!
//! | ファミリー | 出力 | 部屋 | 日付 |
//! |---|---|---|---|
//! | `range-table` | 占有範囲 | 固定行 + ラベル対応表 | 2行形式の範囲トークン |
//! | `bed-table` | 占有範囲 | 固定ベッドブロック | 月ヘッダー + 範囲トークン |
//! | `color-calendar` | 空き日付 | 全室1件 | カレンダーの月ブロック |
//! | `range-blocks` | 空き日付 | キーワード一致の3行ブロック | 月ヘッダー + 範囲トークン |
//! | `range-rows` | 空き日付 | ヘッダー下のラベル行 | 月ヘッダー + 範囲トークン |
//! | `departure-sections` | 空き日付 | `ROOM TYPE`下の固定ブロック | 出発日ラベル |
//! | `banded-chart` | 空き日付 | 船舶セクション内の継続グループ | 月ヘッダー + 日番号行 |

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::WorksheetSelector;
use crate::catalog::BoatEntry;
use crate::dates::{parse_bare_range, DateRange};
use crate::error::CabinError;
use crate::grid::Grid;
use crate::layout::months::{month_for_col, MonthSpan};
use crate::normalize::{merge_duplicates, RoomAvailability};

pub mod banded;
pub mod bed_table;
pub mod calendar;
pub mod departures;
pub mod range_blocks;
pub mod range_rows;
pub mod range_table;

pub use banded::BandedChart;
pub use bed_table::BedTable;
pub use calendar::{CalendarSlot, ColorCalendar};
pub use departures::DepartureSections;
pub use range_blocks::{RangeBlocks, RoomKeyword};
pub use range_rows::RangeRows;
pub use range_table::{LabelMapping, RangeTable, Umbrella};

/// 抽出時に参照する船舶の情報
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext<'a> {
    /// 船舶のカタログエントリ
    pub boat: &'a BoatEntry,
    /// シーズン年（日付トークンに年が書かれていない場合に使用）
    pub season_year: i32,
}

impl<'a> ExtractContext<'a> {
    pub fn new(boat: &'a BoatEntry, season_year: i32) -> Self {
        Self { boat, season_year }
    }
}

/// 1枚（または複数枚）のワークシートからの抽出結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// 正規化済みの部屋の空き状況
    pub rooms: Vec<RoomAvailability>,
    /// クエリの出発日候補
    ///
    /// 占有範囲形式のファミリーは解析したすべての範囲の開始日、
    /// 空き日付形式のファミリーは評価したすべての日付を報告します。
    pub candidate_start_dates: BTreeSet<NaiveDate>,
}

impl Extraction {
    /// 別の抽出結果をまとめる（同じ部屋は和集合）
    pub fn merge(&mut self, other: Extraction) {
        let mut rooms = std::mem::take(&mut self.rooms);
        rooms.extend(other.rooms);
        self.rooms = merge_duplicates(rooms);
        self.candidate_start_dates.extend(other.candidate_start_dates);
    }

    /// 部屋が1件もないかどうか
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

/// レイアウトファミリー
///
/// 実装は状態を持たない設定値で、複数スレッドから同時に呼び出されます。
pub trait LayoutFamily: Send + Sync {
    /// ファミリー名（ログ出力用）
    fn name(&self) -> &'static str;

    /// カタログで指定がない場合のワークシート選択方式
    fn default_worksheets(&self) -> WorksheetSelector {
        WorksheetSelector::First
    }

    /// グリッドから空き状況を抽出
    ///
    /// # 戻り値
    ///
    /// * `Ok(Extraction)` - 抽出に成功した場合（部屋が0件の場合を含む）
    /// * `Err(CabinError::LayoutNotRecognized)` - 必要な目印が見つからない場合
    fn extract(&self, grid: &Grid, ctx: &ExtractContext<'_>) -> Result<Extraction, CabinError>;
}

/// カタログで宣言するレイアウト定義
///
/// ```toml
/// layout = { family = "range-blocks", block_rows = 3 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "kebab-case")]
pub enum LayoutSpec {
    RangeTable(RangeTable),
    BedTable(BedTable),
    ColorCalendar(ColorCalendar),
    RangeBlocks(RangeBlocks),
    RangeRows(RangeRows),
    DepartureSections(DepartureSections),
    BandedChart(BandedChart),
}

impl LayoutSpec {
    /// 宣言に対応するファミリー実装
    pub fn family(&self) -> Arc<dyn LayoutFamily> {
        match self {
            LayoutSpec::RangeTable(family) => Arc::new(family.clone()),
            LayoutSpec::BedTable(family) => Arc::new(family.clone()),
            LayoutSpec::ColorCalendar(family) => Arc::new(family.clone()),
            LayoutSpec::RangeBlocks(family) => Arc::new(family.clone()),
            LayoutSpec::RangeRows(family) => Arc::new(family.clone()),
            LayoutSpec::DepartureSections(family) => Arc::new(family.clone()),
            LayoutSpec::BandedChart(family) => Arc::new(family.clone()),
        }
    }
}

/// 範囲トークン行を解析し、`(列, 日付範囲)`の組を返す
///
/// 月は`spans`から、年は`year`から補います。`-`を含まないセル、月が決まらない列、
/// 解析できないトークンはスキップされます。
pub(crate) fn bare_ranges(
    grid: &Grid,
    row: usize,
    spans: &[MonthSpan],
    first_col: usize,
    year: i32,
) -> Vec<(usize, DateRange)> {
    let mut ranges = Vec::new();
    for (col, cell) in grid.row(row).iter().enumerate().skip(first_col) {
        let token = cell.text.trim();
        if token.is_empty() || !token.contains('-') {
            continue;
        }
        let Some(month) = month_for_col(spans, col) else {
            tracing::trace!(sheet = grid.title(), row, col, token, "no month for range token");
            continue;
        };
        match parse_bare_range(token, month, year) {
            Ok(range) => ranges.push((col, range)),
            Err(err) => tracing::trace!(sheet = grid.title(), row, col, "{}", err),
        }
    }
    ranges
}

/// カタログの部屋名の先頭単語（大文字）と部屋名の組
pub(crate) fn first_word_keywords(boat: &BoatEntry) -> Vec<(String, String)> {
    boat.rooms
        .iter()
        .filter_map(|room| {
            room.name
                .split_whitespace()
                .next()
                .map(|word| (word.to_uppercase(), room.name.clone()))
        })
        .collect()
}
