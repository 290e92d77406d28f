//! Normalizer Module
//!
//! レイアウトファミリーが抽出した部屋ごとの判定を、クエリエンジンが扱う
//! `RoomAvailability`に変換するモジュール。
//!
//! 部屋の状態は「占有範囲」または「空き日付」のどちらか一方で、両方を持つことは
//! ありません（`RoomState`列挙型で構造的に保証されます）。

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::catalog::BoatEntry;
use crate::dates::DateRange;

/// 部屋の状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoomState {
    /// 占有されている日付範囲（重複なし、ソート済み、半開区間）
    Occupied(BTreeSet<DateRange>),

    /// 空いている日付（重複なし、ソート済み）
    AvailableDates(BTreeSet<NaiveDate>),
}

impl RoomState {
    /// 空の占有範囲
    pub fn occupied() -> Self {
        RoomState::Occupied(BTreeSet::new())
    }

    /// 空の空き日付
    pub fn available_dates() -> Self {
        RoomState::AvailableDates(BTreeSet::new())
    }

    /// 同じ種類の状態を和集合でまとめる
    ///
    /// 種類が異なる場合は何もせず`false`を返します。
    pub fn union(&mut self, other: &RoomState) -> bool {
        match (self, other) {
            (RoomState::Occupied(mine), RoomState::Occupied(theirs)) => {
                mine.extend(theirs.iter().copied());
                true
            }
            (RoomState::AvailableDates(mine), RoomState::AvailableDates(theirs)) => {
                mine.extend(theirs.iter().copied());
                true
            }
            _ => false,
        }
    }

    fn same_kind(&self, other: &RoomState) -> bool {
        matches!(
            (self, other),
            (RoomState::Occupied(_), RoomState::Occupied(_))
                | (RoomState::AvailableDates(_), RoomState::AvailableDates(_))
        )
    }
}

/// 正規化済みの部屋の空き状況
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomAvailability {
    /// 船舶名
    pub boat_name: String,
    /// 部屋名
    pub room_name: String,
    /// 部屋のリンク
    pub room_link: Option<String>,
    /// 部屋の状態
    pub state: RoomState,
}

/// レイアウトファミリーの抽出結果（正規化前の1部屋分）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRecord {
    /// 出力する部屋名
    pub name: String,
    /// 対応するカタログ上の部屋名（位置や固定表で対応が分かっている場合）
    pub catalog_room: Option<String>,
    /// シートのセルに埋め込まれたハイパーリンク
    pub sheet_link: Option<String>,
    /// 部屋の状態
    pub state: RoomState,
}

impl RoomRecord {
    pub fn new(name: impl Into<String>, state: RoomState) -> Self {
        Self {
            name: name.into(),
            catalog_room: None,
            sheet_link: None,
            state,
        }
    }

    /// カタログ上の部屋名を設定
    pub fn with_catalog_room(mut self, room: impl Into<String>) -> Self {
        self.catalog_room = Some(room.into());
        self
    }

    /// シートのハイパーリンクを設定（空文字列は無視）
    pub fn with_sheet_link(mut self, link: Option<String>) -> Self {
        self.sheet_link = link.filter(|l| !l.trim().is_empty());
        self
    }
}

/// ラベルの別名
///
/// 大文字化したシート上のラベルが`contains`のすべての部分文字列を含む場合、
/// カタログの部屋`room`に対応付けます。
///
/// ```toml
/// [[boat.layout.aliases]]
/// contains = ["MASTER", "OCEAN VIEW"]
/// room = "Master"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelAlias {
    pub contains: Vec<String>,
    pub room: String,
}

impl LabelAlias {
    pub fn new(contains: &[&str], room: impl Into<String>) -> Self {
        Self {
            contains: contains.iter().map(|s| s.to_string()).collect(),
            room: room.into(),
        }
    }

    /// ラベルが別名に一致するかどうか
    pub fn matches(&self, label: &str) -> bool {
        let upper = label.to_uppercase();
        !self.contains.is_empty()
            && self
                .contains
                .iter()
                .all(|needle| upper.contains(&needle.to_uppercase()))
    }
}

/// 別名の一覧からラベルに一致する部屋名を探す
pub fn alias_for<'a>(aliases: &'a [LabelAlias], label: &str) -> Option<&'a str> {
    aliases
        .iter()
        .find(|alias| alias.matches(label))
        .map(|alias| alias.room.as_str())
}

/// 部屋のリンクを解決
///
/// 優先順位:
///
/// 1. シートに埋め込まれたハイパーリンク
/// 2. ファミリーが指定したカタログ上の部屋名
/// 3. 部屋名の完全一致
/// 4. 部屋名の大文字小文字を区別しない一致
/// 5. ラベルの別名
pub fn resolve_link(boat: &BoatEntry, record: &RoomRecord, aliases: &[LabelAlias]) -> Option<String> {
    if let Some(link) = &record.sheet_link {
        return Some(link.clone());
    }

    let by_name = |name: &str| boat.room_link(name).map(str::to_string);

    record
        .catalog_room
        .as_deref()
        .and_then(by_name)
        .or_else(|| by_name(&record.name))
        .or_else(|| alias_for(aliases, &record.name).and_then(by_name))
}

/// 同じ部屋名・同じ種類の状態を和集合でまとめる（出現順を保持）
///
/// リンクは最初に見つかったものを採用します。
pub fn merge_duplicates(rooms: Vec<RoomAvailability>) -> Vec<RoomAvailability> {
    let mut merged: Vec<RoomAvailability> = Vec::with_capacity(rooms.len());

    for room in rooms {
        let existing = merged.iter_mut().find(|m| {
            m.boat_name == room.boat_name
                && m.room_name == room.room_name
                && m.state.same_kind(&room.state)
        });
        match existing {
            Some(existing) => {
                existing.state.union(&room.state);
                if existing.room_link.is_none() {
                    existing.room_link = room.room_link;
                }
            }
            None => merged.push(room),
        }
    }
    merged
}

/// 抽出結果を正規化
///
/// # 引数
///
/// * `boat` - 船舶のカタログエントリ
/// * `records` - レイアウトファミリーの抽出結果
/// * `aliases` - ファミリーのラベル別名
///
/// # 戻り値
///
/// 部屋名ごとにまとめられた`RoomAvailability`のリスト
pub fn normalize(boat: &BoatEntry, records: Vec<RoomRecord>, aliases: &[LabelAlias]) -> Vec<RoomAvailability> {
    let rooms = records
        .into_iter()
        .map(|record| RoomAvailability {
            boat_name: boat.name.clone(),
            room_link: resolve_link(boat, &record, aliases),
            room_name: record.name,
            state: record.state,
        })
        .collect();
    merge_duplicates(rooms)
}
