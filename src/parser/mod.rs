//! Parser Module
//!
//! XLSXワークブックを`Grid`に変換するソース実装。
//! calamineで値と結合範囲を、quick-xml + zipで背景色・罫線・ハイパーリンクを取得します。

mod metadata;
mod workbook;

pub use workbook::XlsxSource;
