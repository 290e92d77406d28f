//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。
//!
//! 抽出処理のエラーは船舶単位で捕捉され、クエリエンジンまで到達することはありません。
//! 詳細は`AvailabilityEngine::refresh()`を参照してください。

use thiserror::Error;

/// cabincalクレート全体で使用するエラー型
///
/// ワークブックの読み込み、レイアウト推定、日付解決、設定の検証中に発生する
/// すべてのエラーを統一的に扱うために使用されます。
///
/// # エラーの種類
///
/// - `Io` / `Parse` / `Utf8` / `Zip` / `Xml` / `ParseInt`: XLSXソースの読み込みエラー
/// - `Config` / `Catalog`: 設定・カタログの検証エラー
/// - `LayoutNotRecognized`: ワークシートから既知のレイアウトを検出できなかった
/// - `MalformedToken`: 日付トークンを解釈できなかった（該当セルのみスキップ）
/// - `UpstreamFetch`: スプレッドシートの取得に失敗した
/// - `ConfigMismatch`: 船舶にデータソースが設定されていない
///
/// # 使用例
///
/// ```rust,no_run
/// use cabincal::{Catalog, CabinError};
///
/// fn load(path: &str) -> Result<Catalog, CabinError> {
///     let catalog = Catalog::from_file(path)?;  // Io / Catalogエラーが自動的に伝播する
///     Ok(catalog)
/// }
/// ```
#[derive(Error, Debug)]
pub enum CabinError {
    /// I/O操作中に発生したエラー
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// calamineがワークブックを解析する際に発生したエラー
    #[error("Failed to parse workbook: {0}")]
    Parse(#[from] calamine::Error),

    /// XML解析時のUTF-8変換エラー
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// XLSXファイル（ZIPアーカイブ）の解析エラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// XLSX内部のXMLパーツの解析エラー
    #[error("XML parse error: {0}")]
    Xml(String),

    /// 数値の解析エラー
    #[error("Number parse error: {0}")]
    ParseInt(#[from] std::num::ParseIntError),

    /// カタログファイル（TOML / JSON）の解析エラー
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// 設定の検証に失敗したエラー
    ///
    /// `EngineBuilder::build()`時の検証や、重なり合う結合範囲の追加などで発生します。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use cabincal::{Catalog, CabinError, EngineBuilder};
    ///
    /// let result = EngineBuilder::new()
    ///     .with_catalog(Catalog::default())
    ///     .with_season_year(-1)  // 無効な年
    ///     .build();
    ///
    /// match result {
    ///     Err(CabinError::Config(msg)) => {
    ///         println!("設定エラー: {}", msg);
    ///     }
    ///     _ => {}
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// ワークシートから既知のレイアウトを検出できなかったエラー
    ///
    /// 月ヘッダー行、日付範囲行、罫線バンド、船舶セクションなどが見つからない場合に
    /// 発生します。該当する船舶の結果は空になります。
    #[error("Layout not recognized in sheet '{sheet}': {message}")]
    LayoutNotRecognized {
        /// ワークシート名
        sheet: String,
        /// 詳細メッセージ
        message: String,
    },

    /// 日付トークンを解釈できなかったエラー
    ///
    /// 抽出処理ではセル単位でスキップされ、他のセルの処理は継続します。
    #[error("Malformed token '{token}': {message}")]
    MalformedToken {
        /// 元のトークン
        token: String,
        /// 詳細メッセージ
        message: String,
    },

    /// スプレッドシートの取得に失敗したエラー
    #[error("Failed to fetch document '{document}': {message}")]
    UpstreamFetch {
        /// ドキュメントID
        document: String,
        /// 詳細メッセージ
        message: String,
    },

    /// 船舶にデータソースまたはレイアウトが設定されていないエラー
    ///
    /// ソースへのアクセスは一切行われません。
    #[error("Vessel '{vessel}' is not configured: {message}")]
    ConfigMismatch {
        /// 船舶名
        vessel: String,
        /// 詳細メッセージ
        message: String,
    },

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb攻撃、パストラバーサル攻撃、ファイルサイズ制限などの
    /// セキュリティ制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

impl CabinError {
    /// `MalformedToken`を生成するヘルパー
    pub(crate) fn malformed(token: &str, message: impl Into<String>) -> Self {
        CabinError::MalformedToken {
            token: token.to_string(),
            message: message.into(),
        }
    }

    /// `LayoutNotRecognized`を生成するヘルパー
    pub(crate) fn layout(sheet: &str, message: impl Into<String>) -> Self {
        CabinError::LayoutNotRecognized {
            sheet: sheet.to_string(),
            message: message.into(),
        }
    }
}

impl From<toml::de::Error> for CabinError {
    fn from(err: toml::de::Error) -> Self {
        CabinError::Catalog(format!("TOML parsing error: {}", err))
    }
}

impl From<quick_xml::Error> for CabinError {
    fn from(err: quick_xml::Error) -> Self {
        CabinError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for CabinError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        CabinError::Xml(format!("XML attribute error: {}", err))
    }
}

impl From<zip::result::ZipError> for CabinError {
    fn from(err: zip::result::ZipError) -> Self {
        CabinError::Zip(err.to_string())
    }
}

impl From<serde_json::Error> for CabinError {
    fn from(err: serde_json::Error) -> Self {
        CabinError::Catalog(format!("JSON parsing error: {}", err))
    }
}
