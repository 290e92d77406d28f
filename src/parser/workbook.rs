//! Workbook Parser Module
//!
//! calamineで値と結合範囲を、XMLメタデータパーサーで背景色・罫線・ハイパーリンクを
//! 読み取り、ワークシートを`Grid`に変換します。

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use zip::ZipArchive;

use crate::error::CabinError;
use crate::grid::{Cell, Grid};
use crate::parser::metadata::XlsxMetadataParser;
use crate::security::SecurityConfig;
use crate::source::SheetSource;
use crate::types::{CellCoord, MergeRange};

/// XLSXワークブックのソース
///
/// 公開カレンダーを`.xlsx`としてエクスポートしたファイルを読み込みます。
///
/// # 使用例
///
/// ```rust,no_run
/// use cabincal::{SheetSource, XlsxSource};
///
/// let mut source = XlsxSource::open_path("calendars/barakati.xlsx")?;
/// for title in source.worksheet_titles()? {
///     let grid = source.fetch_grid(&title)?;
///     println!("{}: {} rows", title, grid.row_count());
/// }
/// # Ok::<(), cabincal::CabinError>(())
/// ```
pub struct XlsxSource {
    /// calamineのワークブック（値と結合範囲）
    workbook: Xlsx<Cursor<Vec<u8>>>,
    /// ZIPアーカイブ（書式情報の読み込み用）
    archive: ZipArchive<Cursor<Vec<u8>>>,
    /// スタイルとワークシートパスの対応
    metadata: XlsxMetadataParser,
    /// 結合範囲を読み込み済みかどうか
    merges_loaded: bool,
    /// ワークシートの行数・列数の上限に使用
    security: SecurityConfig,
}

impl XlsxSource {
    /// リーダーからワークブックを開く（既定のセキュリティ設定）
    pub fn open<R: Read>(reader: R) -> Result<Self, CabinError> {
        Self::open_with_security(reader, &SecurityConfig::default())
    }

    /// ファイルパスからワークブックを開く
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, CabinError> {
        let file = File::open(path.as_ref())?;
        Self::open(file)
    }

    /// セキュリティ設定を指定してワークブックを開く
    ///
    /// # 引数
    ///
    /// * `reader` - XLSXファイルを読み込むためのリーダー
    /// * `security` - 入力サイズとZIPアーカイブの制限
    ///
    /// # 戻り値
    ///
    /// * `Ok(XlsxSource)` - ワークブックとメタデータの読み込みに成功した場合
    /// * `Err(CabinError::SecurityViolation)` - セキュリティ制限に違反した場合
    /// * `Err(CabinError)` - ZIP / XML / calamineの解析エラー
    pub fn open_with_security<R: Read>(reader: R, security: &SecurityConfig) -> Result<Self, CabinError> {
        let buffer = security.read_input(reader)?;

        // 1. ZIPアーカイブの検証とメタデータの解析
        let mut archive = ZipArchive::new(Cursor::new(buffer.clone()))?;
        security.check_archive(&mut archive)?;
        let metadata = XlsxMetadataParser::new(&mut archive)?;

        // 2. calamineでワークブックを開く
        let workbook: Xlsx<_> =
            open_workbook_from_rs(Cursor::new(buffer)).map_err(|e: calamine::XlsxError| CabinError::Parse(e.into()))?;

        Ok(Self {
            workbook,
            archive,
            metadata,
            merges_loaded: false,
            security: security.clone(),
        })
    }

    /// ワークシートの結合範囲を取得
    fn merges(&mut self, title: &str) -> Result<Vec<MergeRange>, CabinError> {
        if !self.merges_loaded {
            self.workbook
                .load_merged_regions()
                .map_err(|e| CabinError::Parse(e.into()))?;
            self.merges_loaded = true;
        }

        let merges = match self.workbook.worksheet_merge_cells(title) {
            Some(Ok(regions)) => regions
                .iter()
                .map(|dims| MergeRange::from_inclusive(dims.start, dims.end))
                .collect(),
            Some(Err(e)) => return Err(CabinError::Parse(e.into())),
            None => Vec::new(),
        };
        Ok(merges)
    }
}

/// セルの値を表示文字列に変換
fn display_text(value: &Data) -> String {
    match value {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
        Data::Empty => String::new(),
    }
}

impl SheetSource for XlsxSource {
    fn worksheet_titles(&mut self) -> Result<Vec<String>, CabinError> {
        Ok(self.workbook.sheet_names())
    }

    fn fetch_grid(&mut self, title: &str) -> Result<Grid, CabinError> {
        // 1. 値の取得（範囲の開始位置を加算してシート座標に戻す）
        let range = self
            .workbook
            .worksheet_range(title)
            .map_err(|e| CabinError::Parse(e.into()))?;
        let (row_offset, col_offset) = range.start().unwrap_or((0, 0));

        let mut cells: BTreeMap<(u32, u32), Cell> = BTreeMap::new();
        for (row_idx, row) in range.rows().enumerate() {
            for (col_idx, value) in row.iter().enumerate() {
                let text = display_text(value);
                if text.is_empty() {
                    continue;
                }
                let coord = (row_offset + row_idx as u32, col_offset + col_idx as u32);
                cells.insert(coord, Cell::new(text));
            }
        }

        // 2. 書式情報（背景色・罫線・ハイパーリンク）
        let formatting = self.metadata.sheet_formatting(&mut self.archive, title)?;
        for (&coord, &style) in &formatting.styles {
            let background = self.metadata.fill(style);
            let borders = self.metadata.borders(style);
            if background.is_none() && borders == Default::default() {
                continue;
            }
            let cell = cells.entry(coord).or_default();
            cell.background = background;
            cell.borders = borders;
        }
        for (coord, url) in formatting.hyperlinks {
            cells.entry(coord).or_default().hyperlink = Some(url);
        }

        // 3. 結合範囲
        let merges = self.merges(title)?;

        tracing::debug!(
            sheet = title,
            cells = cells.len(),
            merges = merges.len(),
            "worksheet loaded"
        );

        let cells = cells
            .into_iter()
            .map(|((row, col), cell)| (CellCoord::new(row, col), cell))
            .collect();
        Grid::build(title, cells, merges, &self.security)
    }
}
