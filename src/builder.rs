//! Builder Module
//!
//! Fluent Builder APIを提供し、`AvailabilityEngine`インスタンスを段階的に構築する。

use std::sync::Arc;

use chrono::Datelike;
use rayon::prelude::*;
use serde::Serialize;

use crate::api::EndBound;
use crate::catalog::{BoatEntry, Catalog};
use crate::error::CabinError;
use crate::families::{ExtractContext, Extraction, LayoutFamily};
use crate::query::{evaluate, AvailabilityQuery, AvailabilityResult};
use crate::registry::FamilyRegistry;
use crate::source::{DocumentRef, SourceProvider};

/// シーズン年として受け付ける範囲
const SEASON_YEARS: std::ops::RangeInclusive<i32> = 1900..=9999;

/// エンジンの設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct EngineConfig {
    /// シーズン年（年を含まない日付トークンに適用）
    pub season_year: i32,

    /// 空き日付形式の部屋に対する終了日の扱い
    pub end_bound: EndBound,

    /// 船舶を並列に処理するか
    pub parallel: bool,

    /// 処理対象の船舶（Noneの場合はすべて）
    pub vessels: Option<Vec<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            season_year: chrono::Local::now().year(),
            end_bound: EndBound::Exclusive,
            parallel: false,
            vessels: None,
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// `AvailabilityEngine`インスタンスを段階的に構築するためのビルダーです。
/// カタログとソースプロバイダ以外の設定項目にはデフォルト値が設定されています。
///
/// # 使用例
///
/// ```rust,no_run
/// use cabincal::{Catalog, EngineBuilder, XlsxDirectoryProvider};
///
/// # fn main() -> Result<(), cabincal::CabinError> {
/// let engine = EngineBuilder::new()
///     .with_catalog(Catalog::from_file("catalog.toml")?)
///     .with_provider(XlsxDirectoryProvider::new("calendars"))
///     .with_season_year(2025)
///     .parallel(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct EngineBuilder {
    /// 内部設定（構築中）
    config: EngineConfig,
    catalog: Option<Catalog>,
    provider: Option<Arc<dyn SourceProvider>>,
    /// カタログの宣言を上書きするファミリー
    overrides: Vec<(String, Arc<dyn LayoutFamily>)>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - シーズン年: 現在の年
    /// - 終了日の扱い: `EndBound::Exclusive`
    /// - 並列処理: 無効
    /// - 対象の船舶: カタログのすべての船舶
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            catalog: None,
            provider: None,
            overrides: Vec::new(),
        }
    }

    /// 船舶カタログを指定する
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// スプレッドシートのソースプロバイダを指定する
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use cabincal::{EngineBuilder, InMemoryProvider};
    ///
    /// let builder = EngineBuilder::new().with_provider(InMemoryProvider::new());
    /// ```
    pub fn with_provider<P: SourceProvider + 'static>(mut self, provider: P) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// 共有されたソースプロバイダを指定する
    pub fn with_shared_provider(mut self, provider: Arc<dyn SourceProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// シーズン年を指定する
    ///
    /// # 引数
    ///
    /// * `year: i32`: 1900〜9999の範囲外の場合、`build()`時に`CabinError::Config`を返す
    pub fn with_season_year(mut self, year: i32) -> Self {
        self.config.season_year = year;
        self
    }

    /// 空き日付形式の部屋に対する終了日の扱いを指定する
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use cabincal::{EndBound, EngineBuilder};
    ///
    /// // 終了日当日の出発も結果に含める
    /// let builder = EngineBuilder::new().with_end_bound(EndBound::Inclusive);
    /// ```
    pub fn with_end_bound(mut self, bound: EndBound) -> Self {
        self.config.end_bound = bound;
        self
    }

    /// 船舶を並列に処理するかを指定する
    ///
    /// 各ワーカーは独自にソースを開くため、船舶間で可変状態を共有しません。
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.config.parallel = enabled;
        self
    }

    /// 処理対象の船舶を限定する
    pub fn with_vessels<I, S>(mut self, vessels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.vessels = Some(vessels.into_iter().map(Into::into).collect());
        self
    }

    /// 船舶のレイアウトファミリーを上書きする
    pub fn with_family(mut self, vessel: impl Into<String>, family: Arc<dyn LayoutFamily>) -> Self {
        self.overrides.push((vessel.into(), family));
        self
    }

    /// 設定を検証し、`AvailabilityEngine`インスタンスを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(AvailabilityEngine)`: 設定が有効な場合
    /// * `Err(CabinError::Config)`: 設定が無効な場合
    ///
    /// # 発生し得るエラー
    ///
    /// * `CabinError::Config(String)`:
    ///   * シーズン年が範囲外
    ///   * ソースプロバイダが指定されていない
    ///   * 対象の船舶がカタログに存在しない
    /// * `CabinError::Catalog(String)`: カタログの検証に失敗した場合
    pub fn build(self) -> Result<AvailabilityEngine, CabinError> {
        // 1. シーズン年の検証
        if !SEASON_YEARS.contains(&self.config.season_year) {
            return Err(CabinError::Config(format!(
                "Invalid season year: {} (expected {}..={})",
                self.config.season_year,
                SEASON_YEARS.start(),
                SEASON_YEARS.end()
            )));
        }

        // 2. カタログの検証
        let catalog = self.catalog.unwrap_or_default();
        catalog.validate()?;

        // 3. ソースプロバイダ
        let provider = self
            .provider
            .ok_or_else(|| CabinError::Config("No source provider configured".to_string()))?;

        // 4. 対象の船舶がカタログに存在するか
        if let Some(vessels) = &self.config.vessels {
            if let Some(unknown) = vessels.iter().find(|v| catalog.boat(v).is_none()) {
                return Err(CabinError::Config(format!("Unknown vessel '{}'", unknown.trim())));
            }
        }

        let mut registry = FamilyRegistry::from_catalog(&catalog);
        for (vessel, family) in self.overrides {
            registry.register(&vessel, family);
        }

        Ok(AvailabilityEngine {
            config: self.config,
            catalog,
            provider,
            registry,
        })
    }
}

/// 船舶ごとの抽出結果の分類（診断用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "kebab-case")]
pub enum VesselOutcome {
    /// 抽出に成功した
    Extracted {
        /// 抽出したワークシート数
        worksheets: usize,
        /// 部屋数
        rooms: usize,
    },

    /// データソースまたはレイアウトが設定されていない（ソースにはアクセスしない）
    NotConfigured(String),

    /// 既知のレイアウトを検出できなかった
    LayoutNotRecognized(String),

    /// スプレッドシートの取得または読み込みに失敗した
    FetchFailed(String),
}

impl VesselOutcome {
    fn from_error(err: &CabinError) -> Self {
        let message = err.to_string();
        match err {
            CabinError::ConfigMismatch { .. } => VesselOutcome::NotConfigured(message),
            CabinError::LayoutNotRecognized { .. } | CabinError::MalformedToken { .. } => {
                VesselOutcome::LayoutNotRecognized(message)
            }
            _ => VesselOutcome::FetchFailed(message),
        }
    }

    /// 抽出に成功したかどうか
    pub fn is_extracted(&self) -> bool {
        matches!(self, VesselOutcome::Extracted { .. })
    }
}

/// 1船舶分の抽出結果
///
/// 抽出に失敗した船舶は空の`extraction`を持ちます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VesselReport {
    pub boat_name: String,
    pub boat_link: Option<String>,
    pub outcome: VesselOutcome,
    pub extraction: Extraction,
}

/// 空き状況エンジンのファサード
///
/// 呼び出しのたびにソースを読み直します。結果はキャッシュしません。
///
/// # 使用例
///
/// ```rust,no_run
/// use cabincal::{AvailabilityQuery, Catalog, EngineBuilder, XlsxDirectoryProvider};
///
/// # fn main() -> Result<(), cabincal::CabinError> {
/// let engine = EngineBuilder::new()
///     .with_catalog(Catalog::from_file("catalog.toml")?)
///     .with_provider(XlsxDirectoryProvider::new("calendars"))
///     .build()?;
///
/// let query = AvailabilityQuery::parse("2025/09/01", "2025/09/30")?;
/// for result in engine.query(&query) {
///     println!("{} {} {}", result.start_date, result.boat_name, result.room_name);
/// }
/// # Ok(())
/// # }
/// ```
pub struct AvailabilityEngine {
    config: EngineConfig,
    catalog: Catalog,
    provider: Arc<dyn SourceProvider>,
    registry: FamilyRegistry,
}

impl AvailabilityEngine {
    /// カタログ
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// シーズン年
    pub fn season_year(&self) -> i32 {
        self.config.season_year
    }

    /// すべての対象船舶を抽出する
    ///
    /// 船舶ごとの失敗はその船舶の`VesselOutcome`に記録され、他の船舶の処理は継続します。
    /// 結果はカタログ順に並びます。
    pub fn refresh(&self) -> Vec<VesselReport> {
        self.refresh_vessels(None)
    }

    /// 空き状況を問い合わせる
    ///
    /// クエリの船舶指定に該当する船舶だけを抽出してから評価します。
    pub fn query(&self, query: &AvailabilityQuery) -> Vec<AvailabilityResult> {
        let filter = (!query.vessels.is_empty()).then_some(query.vessels.as_slice());
        let reports = self.refresh_vessels(filter);
        evaluate(query, &reports, self.config.end_bound)
    }

    /// 1船舶分の抽出を実行する
    ///
    /// # 戻り値
    ///
    /// * `Ok(Extraction)` - 抽出に成功した場合（ワークシート数を含む）
    /// * `Err(CabinError::ConfigMismatch)` - レイアウトまたはシートのリンクが未設定の場合
    /// * `Err(CabinError::UpstreamFetch)` - ソースの取得に失敗した場合
    /// * `Err(CabinError)` - どのワークシートからも抽出できなかった場合（最後のワークシートのエラー）
    pub fn extract_vessel(&self, boat: &BoatEntry) -> Result<(Extraction, usize), CabinError> {
        // 1. 設定の確認（ソースにはアクセスしない）
        let family = self.registry.get(&boat.name).ok_or_else(|| CabinError::ConfigMismatch {
            vessel: boat.name.clone(),
            message: "no layout family declared".to_string(),
        })?;
        let document = boat
            .sheet_link
            .as_deref()
            .and_then(DocumentRef::from_link)
            .ok_or_else(|| CabinError::ConfigMismatch {
                vessel: boat.name.clone(),
                message: "no sheet link".to_string(),
            })?;

        // 2. ワークシートの選択
        let mut source = self.provider.open(&document)?;
        let titles = source.worksheet_titles().map_err(|e| upstream(&document, e))?;
        let selector = boat
            .worksheets
            .clone()
            .unwrap_or_else(|| family.default_worksheets());
        let selected = selector.select(&titles, self.config.season_year)?;

        // 3. ワークシートごとの抽出
        let ctx = ExtractContext::new(boat, self.config.season_year);
        let mut extraction = Extraction::default();
        let mut extracted = 0;
        let mut last_error = None;

        for title in &selected {
            let grid = match source.fetch_grid(title) {
                Ok(grid) => grid,
                Err(err) => {
                    tracing::debug!(vessel = %boat.name, sheet = %title, error = %err, "worksheet unreadable");
                    last_error = Some(upstream(&document, err));
                    continue;
                }
            };
            match family.extract(&grid, &ctx) {
                Ok(sheet) => {
                    tracing::debug!(
                        vessel = %boat.name,
                        sheet = %title,
                        family = family.name(),
                        rooms = sheet.rooms.len(),
                        "worksheet extracted"
                    );
                    extraction.merge(sheet);
                    extracted += 1;
                }
                Err(err) => {
                    tracing::debug!(vessel = %boat.name, sheet = %title, error = %err, "worksheet skipped");
                    last_error = Some(err);
                }
            }
        }

        match (extracted, last_error) {
            (0, Some(err)) => Err(err),
            _ => Ok((extraction, extracted)),
        }
    }

    fn refresh_vessels(&self, filter: Option<&[String]>) -> Vec<VesselReport> {
        let boats: Vec<&BoatEntry> = self
            .catalog
            .boats
            .iter()
            .filter(|boat| matches_filter(self.config.vessels.as_deref(), &boat.name))
            .filter(|boat| matches_filter(filter, &boat.name))
            .collect();

        if self.config.parallel {
            boats.par_iter().map(|boat| self.report(boat)).collect()
        } else {
            boats.iter().map(|boat| self.report(boat)).collect()
        }
    }

    fn report(&self, boat: &BoatEntry) -> VesselReport {
        let (outcome, extraction) = match self.extract_vessel(boat) {
            Ok((extraction, worksheets)) => (
                VesselOutcome::Extracted {
                    worksheets,
                    rooms: extraction.rooms.len(),
                },
                extraction,
            ),
            Err(err) => {
                tracing::warn!(vessel = %boat.name, error = %err, "vessel extraction failed");
                (VesselOutcome::from_error(&err), Extraction::default())
            }
        };

        VesselReport {
            boat_name: boat.name.clone(),
            boat_link: boat.boat_link.clone(),
            outcome,
            extraction,
        }
    }
}

impl std::fmt::Debug for AvailabilityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityEngine")
            .field("config", &self.config)
            .field("vessels", &self.catalog.boats.len())
            .field("registry", &self.registry)
            .finish()
    }
}

fn matches_filter(filter: Option<&[String]>, name: &str) -> bool {
    filter.map_or(true, |names| names.iter().any(|n| n.trim().eq_ignore_ascii_case(name.trim())))
}

/// ソースの読み込みエラーを`UpstreamFetch`に変換（セキュリティ違反はそのまま）
fn upstream(document: &DocumentRef, err: CabinError) -> CabinError {
    match err {
        CabinError::UpstreamFetch { .. } | CabinError::SecurityViolation(_) => err,
        other => CabinError::UpstreamFetch {
            document: document.id().to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Cell, Grid};
    use crate::source::{InMemoryProvider, SheetSource};
    use crate::types::Color;

    const CATALOG: &str = r#"
        [[boat]]
        name = "El Rora"
        sheet_link = "https://docs.google.com/spreadsheets/d/elrora/edit"
        layout = { family = "range-rows" }

        [[boat.room]]
        name = "Love"

        [[boat]]
        name = "Broken"
        sheet_link = "broken"
        layout = { family = "range-rows" }

        [[boat]]
        name = "Unlinked"
        layout = { family = "range-rows" }
    "#;

    fn el_rora_sheet() -> Grid {
        let mut grid = Grid::from_text_rows(
            "2025",
            &[
                vec!["", "", "SEPTEMBER", "OKTOBER"],
                vec!["", "", "12-14", "3-5"],
                vec!["", "Love", "", ""],
            ],
        );
        grid.set_cell(2, 2, Cell::empty().with_background(Color::WHITE));
        grid.set_cell(2, 3, Cell::empty().with_background(Color::WHITE));
        grid
    }

    fn engine(parallel: bool) -> AvailabilityEngine {
        let provider = InMemoryProvider::new()
            .with_document("elrora", vec![el_rora_sheet()])
            .with_document("broken", vec![Grid::from_text_rows("2025", &[vec!["nothing here"]])]);

        EngineBuilder::new()
            .with_catalog(Catalog::from_toml_str(CATALOG).unwrap())
            .with_provider(provider)
            .with_season_year(2025)
            .parallel(parallel)
            .build()
            .unwrap()
    }

    /// 指定したワークシートの読み込みだけが失敗するソース
    struct PartlyUnreadable {
        unreadable: Vec<&'static str>,
    }

    impl SheetSource for PartlyUnreadable {
        fn worksheet_titles(&mut self) -> Result<Vec<String>, CabinError> {
            Ok(vec!["2025".to_string(), "2026".to_string()])
        }

        fn fetch_grid(&mut self, title: &str) -> Result<Grid, CabinError> {
            if self.unreadable.contains(&title) {
                return Err(CabinError::SecurityViolation(format!(
                    "Worksheet '{}' exceeds maximum dimensions",
                    title
                )));
            }
            Ok(el_rora_sheet())
        }
    }

    struct PartlyUnreadableProvider(Vec<&'static str>);

    impl SourceProvider for PartlyUnreadableProvider {
        fn open(&self, _document: &DocumentRef) -> Result<Box<dyn SheetSource>, CabinError> {
            Ok(Box::new(PartlyUnreadable {
                unreadable: self.0.clone(),
            }))
        }
    }

    fn el_rora_engine(unreadable: Vec<&'static str>) -> AvailabilityEngine {
        EngineBuilder::new()
            .with_catalog(Catalog::from_toml_str(CATALOG).unwrap())
            .with_provider(PartlyUnreadableProvider(unreadable))
            .with_season_year(2025)
            .with_vessels(["El Rora"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_unreadable_worksheet_is_skipped() {
        let reports = el_rora_engine(vec!["2026"]).refresh();
        assert_eq!(reports.len(), 1);
        assert_eq!(
            reports[0].outcome,
            VesselOutcome::Extracted {
                worksheets: 1,
                rooms: 1
            }
        );
        assert!(!reports[0].extraction.is_empty());
    }

    #[test]
    fn test_all_worksheets_unreadable_is_fetch_failure() {
        let reports = el_rora_engine(vec!["2025", "2026"]).refresh();
        assert_eq!(reports.len(), 1);
        match &reports[0].outcome {
            VesselOutcome::FetchFailed(msg) => assert!(msg.contains("'2026'")),
            other => panic!("Expected FetchFailed, got {:?}", other),
        }
        assert!(reports[0].extraction.is_empty());
    }

    #[test]
    fn test_build_validates_season_year() {
        let result = EngineBuilder::new()
            .with_provider(InMemoryProvider::new())
            .with_season_year(-1)
            .build();
        assert!(matches!(result, Err(CabinError::Config(_))));
    }

    #[test]
    fn test_build_requires_provider() {
        let result = EngineBuilder::new().with_season_year(2025).build();
        assert!(matches!(result, Err(CabinError::Config(msg)) if msg.contains("provider")));
    }

    #[test]
    fn test_build_rejects_unknown_vessel() {
        let result = EngineBuilder::new()
            .with_catalog(Catalog::from_toml_str(CATALOG).unwrap())
            .with_provider(InMemoryProvider::new())
            .with_vessels(["El Rora", "Phantom"])
            .build();
        assert!(matches!(result, Err(CabinError::Config(msg)) if msg.contains("Phantom")));
    }

    #[test]
    fn test_refresh_isolates_vessel_failures() {
        for parallel in [false, true] {
            let reports = engine(parallel).refresh();
            assert_eq!(reports.len(), 3);

            assert_eq!(reports[0].boat_name, "El Rora");
            assert!(reports[0].outcome.is_extracted());
            assert!(!reports[0].extraction.is_empty());

            assert!(matches!(reports[1].outcome, VesselOutcome::LayoutNotRecognized(_)));
            assert!(reports[1].extraction.is_empty());

            assert!(matches!(reports[2].outcome, VesselOutcome::NotConfigured(_)));
            assert!(reports[2].extraction.is_empty());
        }
    }

    #[test]
    fn test_missing_document_is_fetch_failure() {
        let engine = EngineBuilder::new()
            .with_catalog(Catalog::from_toml_str(CATALOG).unwrap())
            .with_provider(InMemoryProvider::new())
            .with_vessels(["El Rora"])
            .build()
            .unwrap();

        let reports = engine.refresh();
        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0].outcome, VesselOutcome::FetchFailed(_)));
    }

    #[test]
    fn test_query_filters_vessels() {
        let engine = engine(false);
        let query = AvailabilityQuery::parse("2025/09/01", "2025/10/31")
            .unwrap()
            .with_vessel("el rora");
        let results = engine.query(&query);

        let dates: Vec<_> = results.iter().map(|r| r.start_date.to_string()).collect();
        assert_eq!(dates, vec!["2025-09-12", "2025-10-03"]);
        assert!(results.iter().all(|r| r.boat_name == "El Rora" && r.room_name == "Love"));
    }
}
