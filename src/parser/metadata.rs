//! XML Metadata Parser Module
//!
//! XLSX内部のXMLファイルから、calamineで取得できない情報を抽出するモジュール。
//! 背景色（fills）、罫線（borders）、セルごとのスタイル番号、ハイパーリンク、
//! ワークシート名とXMLパーツの対応を提供します。

use std::collections::HashMap;
use std::io::{Read, Seek};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::CabinError;
use crate::security::validate_zip_path;
use crate::types::{BorderStyle, Borders, CellCoord, Color};

/// セルスタイル情報（cellXfs要素）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct CellXf {
    pub fill_id: Option<u32>,
    pub border_id: Option<u32>,
}

/// ワークシート1枚分の書式情報
#[derive(Debug, Clone, Default)]
pub(crate) struct SheetFormatting {
    /// セル座標 -> cellXfsのインデックス
    pub styles: HashMap<(u32, u32), u32>,
    /// セル座標 -> ハイパーリンクURL
    pub hyperlinks: HashMap<(u32, u32), String>,
}

/// XLSXメタデータパーサー
///
/// `xl/styles.xml`と`xl/workbook.xml`（およびそのリレーションシップ）を解析し、
/// ワークシートごとの書式情報を必要に応じて読み込みます。
#[derive(Debug, Clone, Default)]
pub(crate) struct XlsxMetadataParser {
    /// fillId -> 背景色（塗りつぶしなしは`None`）
    fills: Vec<Option<Color>>,
    /// borderId -> 四辺の罫線
    borders: Vec<Borders>,
    /// styleId -> CellXf
    cell_xfs: Vec<CellXf>,
    /// ワークシート名 -> ZIP内のXMLパス
    sheet_paths: HashMap<String, String>,
}

/// ZIPエントリをメモリに読み込む（存在しない場合は`None`）
fn read_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: &str,
) -> Result<Option<Vec<u8>>, CabinError> {
    validate_zip_path(path)
        .map_err(|e| CabinError::SecurityViolation(format!("Invalid ZIP path: {}", e)))?;
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut content = Vec::new();
    file.read_to_end(&mut content)?;
    Ok(Some(content))
}

/// 属性値を取得（エスケープ解除済み）
fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, CabinError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            let value = std::str::from_utf8(&attr.value).map_err(quick_xml::Error::from)?;
            let value = quick_xml::escape::unescape(value).map_err(quick_xml::Error::from)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// 数値の属性値を取得
fn numeric_attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<u32>, CabinError> {
    match attribute(e, key)? {
        Some(value) => Ok(Some(value.trim().parse()?)),
        None => Ok(None),
    }
}

/// `<fgColor>` / `<color>`要素から色を取得
fn color_element(e: &BytesStart<'_>) -> Result<Option<Color>, CabinError> {
    if let Some(rgb) = attribute(e, b"rgb")? {
        return Ok(Color::from_hex(&rgb));
    }
    if let Some(indexed) = numeric_attribute(e, b"indexed")? {
        return Ok(Some(Color::Indexed(indexed)));
    }
    if let Some(theme) = numeric_attribute(e, b"theme")? {
        return Ok(Some(Color::Theme(theme)));
    }
    Ok(None)
}

/// リレーションシップのターゲットをZIP内の絶対パスに変換
///
/// `base_dir`は`xl`や`xl/worksheets`のような、リレーションシップの基準ディレクトリです。
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

impl XlsxMetadataParser {
    /// XLSXファイル（ZIPアーカイブ）からスタイルとワークシートの対応を解析
    ///
    /// # 引数
    ///
    /// * `archive` - セキュリティ検証済みのZIPアーカイブ
    ///
    /// # 戻り値
    ///
    /// * `Ok(XlsxMetadataParser)` - 解析に成功した場合
    /// * `Err(CabinError)` - XMLの解析エラーが発生した場合
    pub fn new<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Self, CabinError> {
        let mut parser = Self::default();

        // 1. xl/styles.xml を解析
        if let Some(xml) = read_entry(archive, "xl/styles.xml")? {
            parser.parse_styles(&xml)?;
        }

        // 2. xl/workbook.xml とリレーションシップからワークシートのパスを解析
        let rels = match read_entry(archive, "xl/_rels/workbook.xml.rels")? {
            Some(xml) => Self::parse_relationships(&xml)?,
            None => HashMap::new(),
        };
        if let Some(xml) = read_entry(archive, "xl/workbook.xml")? {
            parser.sheet_paths = Self::parse_workbook(&xml, &rels)?;
        }

        Ok(parser)
    }

    /// スタイル番号から背景色を取得
    pub fn fill(&self, style_id: u32) -> Option<Color> {
        let xf = self.cell_xfs.get(style_id as usize)?;
        self.fills.get(xf.fill_id? as usize).copied().flatten()
    }

    /// スタイル番号から罫線を取得
    pub fn borders(&self, style_id: u32) -> Borders {
        self.cell_xfs
            .get(style_id as usize)
            .and_then(|xf| xf.border_id)
            .and_then(|id| self.borders.get(id as usize))
            .copied()
            .unwrap_or_default()
    }

    /// ワークシートの書式情報を読み込む
    ///
    /// ワークシートのパスが不明な場合は空の書式情報を返します。
    pub fn sheet_formatting<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        sheet_name: &str,
    ) -> Result<SheetFormatting, CabinError> {
        let Some(path) = self.sheet_paths.get(sheet_name) else {
            tracing::debug!(sheet = sheet_name, "worksheet part not found, no formatting");
            return Ok(SheetFormatting::default());
        };
        let Some(xml) = read_entry(archive, path)? else {
            return Ok(SheetFormatting::default());
        };

        // "xl/worksheets/sheet1.xml" -> "xl/worksheets/_rels/sheet1.xml.rels"
        let (dir, file) = path.rsplit_once('/').unwrap_or(("", path.as_str()));
        let rels_path = format!("{}/_rels/{}.rels", dir, file);
        let rels = match read_entry(archive, &rels_path)? {
            Some(rels_xml) => Self::parse_relationships(&rels_xml)?,
            None => HashMap::new(),
        };

        Self::parse_worksheet_xml(&xml, &rels)
    }

    /// xl/styles.xml の解析（プライベート）
    ///
    /// `<fills>`、`<borders>`、`<cellXfs>`を解析します。
    fn parse_styles(&mut self, xml: &[u8]) -> Result<(), CabinError> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut in_fills = false;
        let mut in_borders = false;
        let mut in_cell_xfs = false;

        let mut current_fill: Option<Color> = None;
        let mut solid = false;
        let mut current_border = Borders::default();

        loop {
            let event = reader.read_event_into(&mut buf)?;
            let is_empty = matches!(event, Event::Empty(_));
            match event {
                Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                    b"fills" => in_fills = true,
                    b"fill" if in_fills => {
                        current_fill = None;
                        solid = false;
                        if is_empty {
                            self.fills.push(None);
                        }
                    }
                    b"patternFill" if in_fills => {
                        let pattern = attribute(&e, b"patternType")?;
                        solid = !matches!(pattern.as_deref(), None | Some("none") | Some("gray125"));
                    }
                    b"fgColor" if in_fills && solid => {
                        current_fill = color_element(&e)?;
                    }
                    b"borders" => in_borders = true,
                    b"border" if in_borders => {
                        current_border = Borders::default();
                        if is_empty {
                            self.borders.push(current_border);
                        }
                    }
                    name @ (b"left" | b"right" | b"top" | b"bottom" | b"start" | b"end") if in_borders => {
                        let style = attribute(&e, b"style")?
                            .map(|s| BorderStyle::from_ooxml(&s))
                            .unwrap_or_default();
                        let target = match name {
                            b"left" | b"start" => &mut current_border.left,
                            b"right" | b"end" => &mut current_border.right,
                            b"top" => &mut current_border.top,
                            _ => &mut current_border.bottom,
                        };
                        *target = style;
                    }
                    b"cellXfs" => in_cell_xfs = true,
                    b"xf" if in_cell_xfs => {
                        // <xf numFmtId="0" fontId="0" fillId="2" borderId="1"/>
                        self.cell_xfs.push(CellXf {
                            fill_id: numeric_attribute(&e, b"fillId")?,
                            border_id: numeric_attribute(&e, b"borderId")?,
                        });
                    }
                    _ => {}
                },
                Event::End(e) => match e.name().as_ref() {
                    b"fills" => in_fills = false,
                    b"fill" if in_fills => self.fills.push(current_fill.take()),
                    b"borders" => in_borders = false,
                    b"border" if in_borders => self.borders.push(current_border),
                    b"cellXfs" => in_cell_xfs = false,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(())
    }

    /// リレーションシップファイルを解析（Id -> Target）
    fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, CabinError> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut relationships = HashMap::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Relationship" => {
                    if let (Some(id), Some(target)) = (attribute(&e, b"Id")?, attribute(&e, b"Target")?) {
                        relationships.insert(id, target);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(relationships)
    }

    /// xl/workbook.xml の解析（プライベート）
    ///
    /// `<sheet name="..." r:id="rId1"/>`とリレーションシップから、
    /// ワークシート名とXMLパスの対応を構築します。
    fn parse_workbook(
        xml: &[u8],
        rels: &HashMap<String, String>,
    ) -> Result<HashMap<String, String>, CabinError> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut paths = HashMap::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"sheet" => {
                    let name = attribute(&e, b"name")?;
                    let rel_id = attribute(&e, b"r:id")?;
                    if let (Some(name), Some(target)) = (name, rel_id.and_then(|id| rels.get(&id))) {
                        paths.insert(name, resolve_target("xl", target));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(paths)
    }

    /// ワークシートXMLからセルのスタイル番号とハイパーリンクを解析
    fn parse_worksheet_xml(
        xml: &[u8],
        rels: &HashMap<String, String>,
    ) -> Result<SheetFormatting, CabinError> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut formatting = SheetFormatting::default();
        let mut in_hyperlinks = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                    b"c" => {
                        // <c r="A1" s="3" t="s">
                        let coord = attribute(&e, b"r")?.and_then(|r| CellCoord::from_a1_notation(&r));
                        let style = numeric_attribute(&e, b"s")?;
                        if let (Some(coord), Some(style)) = (coord, style) {
                            formatting.styles.insert((coord.row, coord.col), style);
                        }
                    }
                    b"hyperlinks" => in_hyperlinks = true,
                    b"hyperlink" if in_hyperlinks => {
                        // <hyperlink ref="B2" r:id="rId1"/>（シート内リンクは対象外）
                        let coord = attribute(&e, b"ref")?.and_then(|r| CellCoord::from_a1_notation(&r));
                        let url = attribute(&e, b"r:id")?.and_then(|id| rels.get(&id).cloned());
                        if let (Some(coord), Some(url)) = (coord, url) {
                            if !url.is_empty() {
                                formatting.hyperlinks.insert((coord.row, coord.col), url);
                            }
                        }
                    }
                    _ => {}
                },
                Event::End(e) if e.name().as_ref() == b"hyperlinks" => in_hyperlinks = false,
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(formatting)
    }
}
