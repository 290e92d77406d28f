//! Vessel Catalog
//!
//! 船舶・部屋の名前とリンク、スプレッドシートのリンク、レイアウト定義を保持する
//! 静的カタログ。TOMLファイルから読み込みます。
//!
//! ```toml
//! [[boat]]
//! name = "El Rora"
//! boat_link = "https://example.com/el-rora"
//! sheet_link = "https://docs.google.com/spreadsheets/d/abc123/edit"
//! layout = { family = "range-rows" }
//!
//! [[boat.room]]
//! name = "Love"
//! link = "https://example.com/el-rora/love"
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::api::WorksheetSelector;
use crate::error::CabinError;
use crate::families::LayoutSpec;

/// カタログ上の部屋
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomEntry {
    pub name: String,
    #[serde(default)]
    pub link: Option<String>,
}

impl RoomEntry {
    pub fn new(name: impl Into<String>, link: Option<&str>) -> Self {
        Self {
            name: name.into(),
            link: link.map(str::to_string),
        }
    }
}

/// カタログ上の船舶
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoatEntry {
    /// 船舶名
    pub name: String,

    /// 船舶のリンク
    #[serde(default)]
    pub boat_link: Option<String>,

    /// 空き状況スプレッドシートのリンク（またはドキュメントID）
    #[serde(default)]
    pub sheet_link: Option<String>,

    /// 部屋の一覧（カタログ順）
    #[serde(rename = "room", default)]
    pub rooms: Vec<RoomEntry>,

    /// レイアウト定義
    #[serde(default)]
    pub layout: Option<LayoutSpec>,

    /// ワークシートの選択方式（省略時はレイアウトファミリーの既定値）
    #[serde(default)]
    pub worksheets: Option<WorksheetSelector>,
}

impl BoatEntry {
    /// 名前のみの船舶エントリを生成
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            boat_link: None,
            sheet_link: None,
            rooms: Vec::new(),
            layout: None,
            worksheets: None,
        }
    }

    /// 部屋名からリンクを取得
    ///
    /// 完全一致を優先し、なければ大文字小文字を区別せずに比較します。
    pub fn room_link(&self, room: &str) -> Option<&str> {
        let room = room.trim();
        self.rooms
            .iter()
            .find(|entry| entry.name == room)
            .or_else(|| self.rooms.iter().find(|entry| entry.name.eq_ignore_ascii_case(room)))
            .and_then(|entry| entry.link.as_deref())
    }

    /// カタログ順で`index`番目の部屋
    pub fn room_at(&self, index: usize) -> Option<&RoomEntry> {
        self.rooms.get(index)
    }
}

/// 船舶カタログ
///
/// # 使用例
///
/// ```rust
/// use cabincal::Catalog;
///
/// let catalog = Catalog::from_toml_str(r#"
///     [[boat]]
///     name = "Barakati"
///     boat_link = "https://example.com/barakati"
///
///     [[boat.room]]
///     name = "Wakatobi"
///     link = "https://example.com/barakati/wakatobi"
/// "#).unwrap();
///
/// assert_eq!(catalog.boat_link("Barakati"), Some("https://example.com/barakati"));
/// assert_eq!(
///     catalog.room_link("Barakati", "wakatobi"),
///     Some("https://example.com/barakati/wakatobi")
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(rename = "boat", default)]
    pub boats: Vec<BoatEntry>,
}

impl Catalog {
    /// TOMLファイルから読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CabinError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// TOML文字列から読み込む
    ///
    /// # 戻り値
    ///
    /// * `Ok(Catalog)` - 読み込みと検証に成功した場合
    /// * `Err(CabinError::Catalog)` - TOMLが不正、または船舶名が空・重複している場合
    pub fn from_toml_str(content: &str) -> Result<Self, CabinError> {
        let catalog: Catalog = toml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// カタログの内容を検証
    pub fn validate(&self) -> Result<(), CabinError> {
        let mut seen = BTreeSet::new();
        for boat in &self.boats {
            let name = boat.name.trim();
            if name.is_empty() {
                return Err(CabinError::Catalog("boat name must not be empty".to_string()));
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(CabinError::Catalog(format!("duplicate boat '{}'", name)));
            }
            if boat.rooms.iter().any(|room| room.name.trim().is_empty()) {
                return Err(CabinError::Catalog(format!(
                    "boat '{}' has a room without a name",
                    name
                )));
            }
        }
        Ok(())
    }

    /// 船舶エントリを取得（大文字小文字を区別しない）
    pub fn boat(&self, name: &str) -> Option<&BoatEntry> {
        let name = name.trim();
        self.boats
            .iter()
            .find(|boat| boat.name == name)
            .or_else(|| self.boats.iter().find(|boat| boat.name.eq_ignore_ascii_case(name)))
    }

    /// 船舶のリンク
    pub fn boat_link(&self, boat: &str) -> Option<&str> {
        self.boat(boat).and_then(|entry| entry.boat_link.as_deref())
    }

    /// 部屋のリンク
    pub fn room_link(&self, boat: &str, room: &str) -> Option<&str> {
        self.boat(boat).and_then(|entry| entry.room_link(room))
    }

    /// 船舶名の一覧（カタログ順）
    pub fn boat_names(&self) -> impl Iterator<Item = &str> {
        self.boats.iter().map(|boat| boat.name.as_str())
    }
}
