//! Color Classifier Module
//!
//! セルの背景色やステータス文字列を「空き / 予約済み」の判定に変換するモジュール。
//!
//! 背景色は各レイアウトファミリーの目標色と完全一致した場合のみ空きと判定されます。
//! 塗りつぶしがないセルの扱いはファミリーごとに異なります。
//!
//! - 表形式（日付範囲の表）: 塗りつぶしなし = 空き（既定の白）
//! - カレンダー形式: 塗りつぶしなし = 空きではない（未確認）

use serde::{Deserialize, Serialize};

use crate::types::Color;

/// セル単位の判定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Verdict {
    Available,
    Occupied,
}

impl Verdict {
    /// 空きかどうか
    pub fn is_available(self) -> bool {
        self == Verdict::Available
    }

    /// 真偽値から判定を生成
    pub fn from_available(available: bool) -> Self {
        if available {
            Verdict::Available
        } else {
            Verdict::Occupied
        }
    }
}

/// 目標色
///
/// カタログのレイアウト定義で指定します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetColor {
    /// 白 `{1, 1, 1}`
    #[default]
    White,
    /// シアン `{0, 1, 1}`
    Cyan,
}

impl TargetColor {
    /// 対応する色
    pub fn color(self) -> Color {
        match self {
            TargetColor::White => Color::WHITE,
            TargetColor::Cyan => Color::CYAN,
        }
    }
}

/// 背景色の分類器
///
/// # 使用例
///
/// ```rust
/// use cabincal::{Color, ColorClassifier, Verdict};
///
/// let table = ColorClassifier::table();
/// assert_eq!(table.classify(None), Verdict::Available);
///
/// let calendar = ColorClassifier::calendar(Color::CYAN);
/// assert_eq!(calendar.classify(None), Verdict::Occupied);
/// assert_eq!(calendar.classify(Some(&Color::CYAN)), Verdict::Available);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ColorClassifier {
    target: Color,
    also_available: Vec<Color>,
    missing: Verdict,
}

impl ColorClassifier {
    /// 目標色と、塗りつぶしなしの場合の判定を指定して生成
    pub fn new(target: Color, missing: Verdict) -> Self {
        Self {
            target,
            also_available: Vec::new(),
            missing,
        }
    }

    /// 表形式ファミリー用（白 = 空き、塗りつぶしなし = 空き）
    pub fn table() -> Self {
        Self::new(Color::WHITE, Verdict::Available)
    }

    /// カレンダー形式ファミリー用（目標色 = 空き、塗りつぶしなし = 空きではない）
    pub fn calendar(target: Color) -> Self {
        Self::new(target, Verdict::Occupied)
    }

    /// 罫線バンド形式ファミリー用
    ///
    /// 白に加えて、黒（塗りつぶしなしの出力）とシステム背景のパレット番号64/65も
    /// 空きとして扱います。塗りつぶしなし = 空き。
    pub fn banded() -> Self {
        Self {
            target: Color::WHITE,
            also_available: vec![Color::BLACK, Color::Indexed(64), Color::Indexed(65)],
            missing: Verdict::Available,
        }
    }

    /// 塗りつぶしなしの場合の判定を変更
    pub fn with_missing(mut self, missing: Verdict) -> Self {
        self.missing = missing;
        self
    }

    /// 塗りつぶしなしの場合の判定
    pub fn missing(&self) -> Verdict {
        self.missing
    }

    /// 背景色を判定
    ///
    /// テーマカラーは解決しないため、目標色とは一致しません。
    pub fn classify(&self, color: Option<&Color>) -> Verdict {
        match color {
            None => self.missing,
            Some(color) => Verdict::from_available(
                *color == self.target || self.also_available.contains(color),
            ),
        }
    }
}

/// ステータス文字列を判定
///
/// 空文字列、`AVAILABLE`、および`BOOKED` / `FULLY BOOKED`以外の文字列は空きです。
pub fn classify_status(text: &str) -> Verdict {
    let status = text.trim().to_uppercase();
    Verdict::from_available(status != "BOOKED" && status != "FULLY BOOKED")
}
