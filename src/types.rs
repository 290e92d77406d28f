//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。
//! セル座標、背景色、罫線スタイル、結合範囲など、グリッドを構成する値型を提供します。

use serde::{Deserialize, Serialize};

/// セル座標（0始まり）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// 新しい座標を生成
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1形式の文字列に変換（例: (0, 0) -> "A1"）
    #[allow(clippy::wrong_self_convention)]
    pub fn to_a1_notation(&self) -> String {
        let col_str = Self::col_index_to_letter(self.col);
        format!("{}{}", col_str, self.row + 1)
    }

    /// A1形式の文字列から座標を解析（例: "B3" -> (2, 1)）
    ///
    /// `$`による絶対参照は無視します。範囲指定（"A1:C3"）の場合は左上セルを返します。
    pub fn from_a1_notation(reference: &str) -> Option<Self> {
        let first = reference.split(':').next()?.trim();
        let mut col: u32 = 0;
        let mut row_str = String::new();
        let mut seen_letter = false;

        for ch in first.chars() {
            if ch == '$' {
                continue;
            }
            if ch.is_ascii_alphabetic() && row_str.is_empty() {
                seen_letter = true;
                let val = (ch.to_ascii_uppercase() as u32) - ('A' as u32) + 1;
                col = col.checked_mul(26)?.checked_add(val)?;
            } else if ch.is_ascii_digit() {
                row_str.push(ch);
            } else {
                return None;
            }
        }

        if !seen_letter || row_str.is_empty() {
            return None;
        }

        let row = row_str.parse::<u32>().ok()?.checked_sub(1)?;
        Some(Self::new(row, col - 1))
    }

    /// 列インデックスを文字列に変換（0 -> "A", 25 -> "Z", 26 -> "AA"）
    fn col_index_to_letter(mut col: u32) -> String {
        let mut result = String::new();
        loop {
            let remainder = col % 26;
            result.insert(0, (b'A' + remainder as u8) as char);
            if col < 26 {
                break;
            }
            col = col / 26 - 1;
        }
        result
    }
}

/// セルの背景色
///
/// RGB成分は`[0, 1]`の範囲で保持します。スプレッドシートAPIの色表現と
/// XLSXのARGB表記（`FF00FFFF`）のどちらからでも構築できます。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    /// RGB成分（各0.0〜1.0）
    Rgb { r: f64, g: f64, b: f64 },
    /// レガシーパレットのインデックス（64 = システム前景、65 = システム背景）
    Indexed(u32),
    /// テーマカラーのインデックス
    Theme(u32),
}

impl Color {
    /// 白 `{1, 1, 1}`
    pub const WHITE: Color = Color::Rgb {
        r: 1.0,
        g: 1.0,
        b: 1.0,
    };

    /// シアン `{0, 1, 1}`
    pub const CYAN: Color = Color::Rgb {
        r: 0.0,
        g: 1.0,
        b: 1.0,
    };

    /// 黒 `{0, 0, 0}`
    pub const BLACK: Color = Color::Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    /// RGB成分から色を生成
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Color::Rgb { r, g, b }
    }

    /// ARGB / RGB 16進表記から色を生成（例: "FF00FFFF", "00FFFF"）
    ///
    /// # 戻り値
    ///
    /// * `Some(Color)` - 6桁または8桁の16進表記の場合
    /// * `None` - 形式が不正な場合
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        let rgb = match hex.len() {
            8 => &hex[2..],
            6 => hex,
            _ => return None,
        };

        let component = |range: std::ops::Range<usize>| -> Option<f64> {
            u8::from_str_radix(rgb.get(range)?, 16)
                .ok()
                .map(|v| f64::from(v) / 255.0)
        };

        Some(Color::Rgb {
            r: component(0..2)?,
            g: component(2..4)?,
            b: component(4..6)?,
        })
    }
}

/// 罫線スタイル
///
/// OOXMLの`style`属性値に対応します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderStyle {
    #[default]
    None,
    Hair,
    Thin,
    Dotted,
    Dashed,
    DashDot,
    DashDotDot,
    SlantDashDot,
    Medium,
    MediumDashed,
    MediumDashDot,
    MediumDashDotDot,
    Thick,
    Double,
}

impl BorderStyle {
    /// OOXMLの`style`属性値から変換（未知の値は`None`）
    pub fn from_ooxml(value: &str) -> Self {
        match value {
            "hair" => BorderStyle::Hair,
            "thin" => BorderStyle::Thin,
            "dotted" => BorderStyle::Dotted,
            "dashed" => BorderStyle::Dashed,
            "dashDot" => BorderStyle::DashDot,
            "dashDotDot" => BorderStyle::DashDotDot,
            "slantDashDot" => BorderStyle::SlantDashDot,
            "medium" => BorderStyle::Medium,
            "mediumDashed" => BorderStyle::MediumDashed,
            "mediumDashDot" => BorderStyle::MediumDashDot,
            "mediumDashDotDot" => BorderStyle::MediumDashDotDot,
            "thick" => BorderStyle::Thick,
            "double" => BorderStyle::Double,
            _ => BorderStyle::None,
        }
    }

    /// 太線（実線の中太・太線、または二重線）かどうか
    pub fn is_bold(&self) -> bool {
        matches!(
            self,
            BorderStyle::Medium | BorderStyle::Thick | BorderStyle::Double
        )
    }
}

/// セル四辺の罫線
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Borders {
    pub left: BorderStyle,
    pub right: BorderStyle,
    pub top: BorderStyle,
    pub bottom: BorderStyle,
}

/// セル結合範囲（終端は排他的）
///
/// `row_end` / `col_end` は範囲に含まれません。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MergeRange {
    pub row_start: u32,
    pub row_end: u32,
    pub col_start: u32,
    pub col_end: u32,
}

impl MergeRange {
    /// 排他的な終端を持つ範囲を生成
    pub fn new(row_start: u32, row_end: u32, col_start: u32, col_end: u32) -> Self {
        Self {
            row_start,
            row_end,
            col_start,
            col_end,
        }
    }

    /// 左上・右下セル（いずれも範囲に含む）から生成
    pub fn from_inclusive(start: (u32, u32), end: (u32, u32)) -> Self {
        Self::new(start.0, end.0 + 1, start.1, end.1 + 1)
    }

    /// 親セル（左上セル）の座標
    pub fn anchor(&self) -> CellCoord {
        CellCoord::new(self.row_start, self.col_start)
    }

    /// 指定された座標が結合範囲内にあるかを判定
    pub fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.row_start && row < self.row_end && col >= self.col_start && col < self.col_end
    }

    /// 他の結合範囲と重なるかを判定
    pub fn overlaps(&self, other: &MergeRange) -> bool {
        self.row_start < other.row_end
            && other.row_start < self.row_end
            && self.col_start < other.col_end
            && other.col_start < self.col_end
    }

    /// 範囲に含まれるすべての座標
    pub fn coords(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (self.row_start..self.row_end)
            .flat_map(move |row| (self.col_start..self.col_end).map(move |col| CellCoord::new(row, col)))
    }

    /// 結合セルの行数
    pub fn row_span(&self) -> u32 {
        self.row_end.saturating_sub(self.row_start)
    }

    /// 結合セルの列数
    pub fn col_span(&self) -> u32 {
        self.col_end.saturating_sub(self.col_start)
    }

    /// 空の範囲（行または列が0）かどうか
    pub fn is_empty(&self) -> bool {
        self.row_span() == 0 || self.col_span() == 0
    }
}
