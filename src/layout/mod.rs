//! Layout Detectors
//!
//! グリッドから構造的な目印（月ヘッダー行、月→列範囲、日番号行、部屋ラベルの行、
//! 罫線バンド、船舶セクション、出発日セクション）を見つけるための共有ユーティリティ。
//! 各レイアウトファミリーはこれらを組み合わせて抽出処理を構成します。

pub mod bands;
pub mod months;
pub mod rows;
pub mod sections;

pub use rows::FixedBlock;
