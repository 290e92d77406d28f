//! Spreadsheet Sources
//!
//! スプレッドシートの取得先を抽象化するモジュール。
//!
//! `SourceProvider`がドキュメントIDからワークブックを開き、`SheetSource`が
//! ワークシート名の一覧と各ワークシートの`Grid`を返します。
//! ホスト型スプレッドシートAPIのクライアントは、これらのトレイトを実装することで
//! 組み込めます。

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CabinError;
use crate::grid::Grid;
use crate::parser::XlsxSource;
use crate::security::SecurityConfig;

lazy_static! {
    static ref DOCUMENT_LINK: Regex = Regex::new(r"/spreadsheets/d/([a-zA-Z0-9_-]+)").unwrap();
    static ref BARE_ID: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// スプレッドシートのドキュメント参照
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    id: String,
}

impl DocumentRef {
    /// ドキュメントIDから生成
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// リンク（またはIDそのもの）からドキュメント参照を生成
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use cabincal::DocumentRef;
    ///
    /// let doc = DocumentRef::from_link(
    ///     "https://docs.google.com/spreadsheets/d/1AbC-d_9/edit#gid=0",
    /// ).unwrap();
    /// assert_eq!(doc.id(), "1AbC-d_9");
    ///
    /// assert_eq!(DocumentRef::from_link("1AbC-d_9").unwrap().id(), "1AbC-d_9");
    /// assert!(DocumentRef::from_link("https://example.com/calendar").is_none());
    /// ```
    pub fn from_link(link: &str) -> Option<Self> {
        let link = link.trim();
        if let Some(caps) = DOCUMENT_LINK.captures(link) {
            return Some(Self::new(&caps[1]));
        }
        BARE_ID.is_match(link).then(|| Self::new(link))
    }

    /// ドキュメントID
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// 開かれたワークブック
///
/// 読み込みは同期的で、呼び出しごとにソースを読み直します。
pub trait SheetSource: Send {
    /// ワークシート名の一覧（ブック内の順序）
    fn worksheet_titles(&mut self) -> Result<Vec<String>, CabinError>;

    /// ワークシートを`Grid`として取得
    fn fetch_grid(&mut self, title: &str) -> Result<Grid, CabinError>;
}

/// ドキュメントIDからワークブックを開くプロバイダ
///
/// 船舶ごとの処理は並列に実行される場合があるため、`Send + Sync`が必要です。
pub trait SourceProvider: Send + Sync {
    /// ドキュメントを開く
    ///
    /// # 戻り値
    ///
    /// * `Ok(Box<dyn SheetSource>)` - ドキュメントを開けた場合
    /// * `Err(CabinError::UpstreamFetch)` - ドキュメントが存在しない、または読み込めない場合
    fn open(&self, document: &DocumentRef) -> Result<Box<dyn SheetSource>, CabinError>;
}

/// メモリ上のグリッドからなるワークブック
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    grids: Vec<Grid>,
}

impl InMemorySource {
    pub fn new(grids: Vec<Grid>) -> Self {
        Self { grids }
    }
}

impl SheetSource for InMemorySource {
    fn worksheet_titles(&mut self) -> Result<Vec<String>, CabinError> {
        Ok(self.grids.iter().map(|grid| grid.title().to_string()).collect())
    }

    fn fetch_grid(&mut self, title: &str) -> Result<Grid, CabinError> {
        self.grids
            .iter()
            .find(|grid| grid.title() == title)
            .cloned()
            .ok_or_else(|| CabinError::layout(title, "worksheet not found"))
    }
}

/// 取得済みのグリッドを返すプロバイダ
///
/// JSONからの読み込みにも対応します（ドキュメントID -> グリッドの配列）。
///
/// ```json
/// { "1AbC": [ { "title": "2025", "rows": [[{ "text": "JULY" }]] } ] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemoryProvider {
    documents: HashMap<String, Vec<Grid>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// ドキュメントを登録
    pub fn insert(&mut self, id: impl Into<String>, grids: Vec<Grid>) {
        self.documents.insert(id.into(), grids);
    }

    /// ドキュメントを登録（ビルダー形式）
    pub fn with_document(mut self, id: impl Into<String>, grids: Vec<Grid>) -> Self {
        self.insert(id, grids);
        self
    }

    /// JSON文字列から読み込む
    pub fn from_json_str(content: &str) -> Result<Self, CabinError> {
        Ok(serde_json::from_str(content)?)
    }

    /// JSONファイルから読み込む
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CabinError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        Ok(serde_json::from_reader(reader)?)
    }
}

impl SourceProvider for InMemoryProvider {
    fn open(&self, document: &DocumentRef) -> Result<Box<dyn SheetSource>, CabinError> {
        let grids = self
            .documents
            .get(document.id())
            .ok_or_else(|| CabinError::UpstreamFetch {
                document: document.id().to_string(),
                message: "document not found".to_string(),
            })?;
        Ok(Box::new(InMemorySource::new(grids.clone())))
    }
}

/// ディレクトリ内の`<id>.xlsx`を開くプロバイダ
#[derive(Debug, Clone)]
pub struct XlsxDirectoryProvider {
    root: PathBuf,
    security: SecurityConfig,
}

impl XlsxDirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            security: SecurityConfig::default(),
        }
    }

    /// セキュリティ設定を変更
    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    /// ドキュメントIDに対応するファイルパス
    pub fn path_for(&self, document: &DocumentRef) -> PathBuf {
        self.root.join(format!("{}.xlsx", document.id()))
    }
}

impl SourceProvider for XlsxDirectoryProvider {
    fn open(&self, document: &DocumentRef) -> Result<Box<dyn SheetSource>, CabinError> {
        let path = self.path_for(document);
        let fetch_error = |message: String| CabinError::UpstreamFetch {
            document: document.id().to_string(),
            message,
        };

        let file = File::open(&path).map_err(|e| fetch_error(format!("{}: {}", path.display(), e)))?;
        match XlsxSource::open_with_security(file, &self.security) {
            Ok(source) => Ok(Box::new(source)),
            // セキュリティ違反はそのまま報告する
            Err(err @ CabinError::SecurityViolation(_)) => Err(err),
            Err(err) => Err(fetch_error(err.to_string())),
        }
    }
}
