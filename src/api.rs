//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use serde::{Deserialize, Serialize};

use crate::error::CabinError;

/// ワークシートの選択方式
///
/// 船舶ごとに、ドキュメント内のどのワークシートを抽出対象とするかを指定します。
/// カタログ（TOML）では次のように記述します。
///
/// ```toml
/// worksheets = "year-titled"
/// worksheets = { title = "OPEN TRIP" }
/// worksheets = { prefix = "LOMBOK-" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub enum WorksheetSelector {
    /// 最初のワークシートのみ
    First,

    /// 名前で指定（前後の空白は無視）
    Title(String),

    /// 4桁の数字だけのタイトル（例: `"2025"`）をすべて選択
    ///
    /// 該当するワークシートがない場合は最初のワークシートを使用します。
    YearTitled,

    /// すべてのワークシート
    All,

    /// タイトルが指定の接頭辞で始まるワークシート（大文字小文字を区別しない）
    Prefix(String),

    /// シーズンの予約表（`"Booking Chart {year}"`）
    SeasonChart,
}

impl WorksheetSelector {
    /// ワークシートを選択
    ///
    /// # 引数
    ///
    /// * `titles` - ドキュメント内のワークシート名（順序通り）
    /// * `season_year` - シーズン年（`SeasonChart`で使用）
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<String>)` - 選択されたワークシート名
    /// * `Err(CabinError::LayoutNotRecognized)` - 該当するワークシートがない場合
    pub fn select(&self, titles: &[String], season_year: i32) -> Result<Vec<String>, CabinError> {
        let selected: Vec<String> = match self {
            WorksheetSelector::First => titles.iter().take(1).cloned().collect(),

            WorksheetSelector::Title(name) => titles
                .iter()
                .filter(|title| title.trim() == name.trim())
                .take(1)
                .cloned()
                .collect(),

            WorksheetSelector::YearTitled => {
                let years: Vec<String> = titles
                    .iter()
                    .filter(|title| {
                        let title = title.trim();
                        title.len() == 4 && title.bytes().all(|b| b.is_ascii_digit())
                    })
                    .cloned()
                    .collect();
                if years.is_empty() {
                    titles.iter().take(1).cloned().collect()
                } else {
                    years
                }
            }

            WorksheetSelector::All => titles.to_vec(),

            WorksheetSelector::Prefix(prefix) => {
                let prefix = prefix.trim().to_uppercase();
                titles
                    .iter()
                    .filter(|title| title.trim().to_uppercase().starts_with(&prefix))
                    .cloned()
                    .collect()
            }

            WorksheetSelector::SeasonChart => {
                let wanted = format!("Booking Chart {}", season_year);
                titles
                    .iter()
                    .filter(|title| title.trim() == wanted)
                    .take(1)
                    .cloned()
                    .collect()
            }
        };

        if selected.is_empty() {
            return Err(CabinError::LayoutNotRecognized {
                sheet: String::new(),
                message: format!("no worksheet matches selector {:?}", self),
            });
        }
        Ok(selected)
    }
}

/// 空き日付形式の部屋に対するクエリ終了日の扱い
///
/// 占有範囲形式の部屋は常に`[start, end)`（終了日を含まない）で判定されます。
/// 空き日付形式の部屋については、終了日を含めるかどうかを選択できます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndBound {
    /// `start <= d < end`（占有範囲形式と同じ半開区間）
    #[default]
    Exclusive,

    /// `start <= d <= end`（終了日を含む）
    Inclusive,
}

impl EndBound {
    /// 日付がクエリ範囲内にあるかどうか
    pub fn admits(self, date: chrono::NaiveDate, start: chrono::NaiveDate, end: chrono::NaiveDate) -> bool {
        match self {
            EndBound::Exclusive => start <= date && date < end,
            EndBound::Inclusive => start <= date && date <= end,
        }
    }
}

/// クエリの結果形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryMode {
    /// 予約可能な出発日ごとに1件の結果を返す
    #[default]
    StartDates,

    /// 範囲全体が空いている部屋を1件ずつ返す（結果の開始日はクエリの開始日）
    WholeRange,
}

/// 結果の出力形式（CLI用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum OutputFormat {
    /// Markdownテーブル
    #[default]
    Markdown,

    /// JSON配列
    Json,
}
