//! Report Rendering
//!
//! クエリ結果と船舶ごとの抽出結果をMarkdownテーブルまたはJSONとして出力するモジュール。
//!
//! Markdownテーブルは表示幅（全角文字は2）で列を揃えます。

use std::io::Write;

use serde_json::json;
use unicode_width::UnicodeWidthStr;

use crate::api::OutputFormat;
use crate::builder::{VesselOutcome, VesselReport};
use crate::error::CabinError;
use crate::query::AvailabilityResult;

/// 出力フォーマッター
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormatter {
    Markdown,
    Json,
}

impl ReportFormatter {
    /// 出力フォーマットからフォーマッターを生成
    pub fn from_format(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Markdown => ReportFormatter::Markdown,
            OutputFormat::Json => ReportFormatter::Json,
        }
    }

    /// クエリ結果を出力する
    ///
    /// # 引数
    ///
    /// * `results` - ソート済みのクエリ結果
    /// * `writer` - 出力先のライター
    pub fn render_results<W: Write>(&self, results: &[AvailabilityResult], writer: &mut W) -> Result<(), CabinError> {
        match self {
            ReportFormatter::Markdown => {
                let rows: Vec<Vec<String>> = results
                    .iter()
                    .map(|r| {
                        vec![
                            r.start_date.format("%Y/%m/%d").to_string(),
                            r.boat_name.clone(),
                            r.room_name.clone(),
                            r.room_link.clone().or_else(|| r.boat_link.clone()).unwrap_or_default(),
                        ]
                    })
                    .collect();
                write_table(writer, &["Start", "Boat", "Room", "Link"], &rows)
            }
            ReportFormatter::Json => {
                let values: Vec<_> = results
                    .iter()
                    .map(|r| {
                        json!({
                            "start": r.start_date.format("%Y/%m/%d").to_string(),
                            "boat_name": r.boat_name,
                            "boat_link": r.boat_link,
                            "room_name": r.room_name,
                            "room_link": r.room_link,
                        })
                    })
                    .collect();
                write_json(writer, &json!(values))
            }
        }
    }

    /// 船舶ごとの抽出結果を出力する
    pub fn render_reports<W: Write>(&self, reports: &[VesselReport], writer: &mut W) -> Result<(), CabinError> {
        match self {
            ReportFormatter::Markdown => {
                let rows: Vec<Vec<String>> = reports
                    .iter()
                    .map(|report| {
                        let (status, detail) = describe(&report.outcome);
                        vec![
                            report.boat_name.clone(),
                            status.to_string(),
                            report.extraction.rooms.len().to_string(),
                            detail,
                        ]
                    })
                    .collect();
                write_table(writer, &["Vessel", "Status", "Rooms", "Detail"], &rows)
            }
            ReportFormatter::Json => {
                let values: Vec<_> = reports
                    .iter()
                    .map(|report| {
                        json!({
                            "boat_name": report.boat_name,
                            "outcome": report.outcome,
                            "rooms": report.extraction.rooms,
                        })
                    })
                    .collect();
                write_json(writer, &json!(values))
            }
        }
    }
}

fn describe(outcome: &VesselOutcome) -> (&'static str, String) {
    match outcome {
        VesselOutcome::Extracted { worksheets, .. } => ("extracted", format!("{} worksheet(s)", worksheets)),
        VesselOutcome::NotConfigured(msg) => ("not-configured", msg.clone()),
        VesselOutcome::LayoutNotRecognized(msg) => ("layout-not-recognized", msg.clone()),
        VesselOutcome::FetchFailed(msg) => ("fetch-failed", msg.clone()),
    }
}

fn write_json<W: Write>(writer: &mut W, value: &serde_json::Value) -> Result<(), CabinError> {
    serde_json::to_writer_pretty(&mut *writer, value)
        .map_err(|e| CabinError::Config(format!("JSON serialization error: {}", e)))?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// セル内容のエスケープ（`|`と改行）
fn escape_cell(text: &str) -> String {
    text.trim().replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// Markdownテーブルとして出力
///
/// 列幅は各列の最大表示幅（最小3）に揃えます。
fn write_table<W: Write>(writer: &mut W, header: &[&str], rows: &[Vec<String>]) -> Result<(), CabinError> {
    let header: Vec<String> = header.iter().map(|h| escape_cell(h)).collect();
    let rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|cell| escape_cell(cell)).collect())
        .collect();

    // 1. 列幅の計算
    let mut widths = vec![3; header.len()];
    for row in std::iter::once(&header).chain(rows.iter()) {
        for (col, cell) in row.iter().enumerate() {
            widths[col] = widths[col].max(cell.width());
        }
    }

    // 2. ヘッダーと区切り行
    write_row(writer, &header, &widths)?;
    let separator: String = widths.iter().map(|w| format!("{}|", "-".repeat(w + 2))).collect();
    writeln!(writer, "|{}", separator)?;

    // 3. 各行
    for row in &rows {
        write_row(writer, row, &widths)?;
    }

    writer.flush()?;
    Ok(())
}

fn write_row<W: Write>(writer: &mut W, cells: &[String], widths: &[usize]) -> Result<(), CabinError> {
    write!(writer, "|")?;
    for (cell, &width) in cells.iter().zip(widths) {
        let padding = width.saturating_sub(cell.width());
        write!(writer, " {}{} |", cell, " ".repeat(padding))?;
    }
    writeln!(writer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::families::Extraction;
    use chrono::NaiveDate;

    fn results() -> Vec<AvailabilityResult> {
        vec![AvailabilityResult {
            start_date: NaiveDate::from_ymd_opt(2025, 9, 12).unwrap(),
            boat_name: "Kanha Loka".to_string(),
            boat_link: Some("https://example.com/loka".to_string()),
            room_name: "Master|Suite".to_string(),
            room_link: None,
        }]
    }

    #[test]
    fn test_markdown_table() {
        let mut out = Vec::new();
        ReportFormatter::Markdown.render_results(&results(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("| Start      | Boat       |"));
        assert!(lines[1].starts_with("|------------|"));
        assert!(lines[2].contains("Master\\|Suite"));
        assert!(lines[2].contains("https://example.com/loka"));
    }

    #[test]
    fn test_markdown_pads_by_display_width() {
        let mut out = Vec::new();
        let rows = vec![vec!["船室".to_string()], vec!["abcd".to_string()]];
        write_table(&mut out, &["Room"], &rows).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[2], "| 船室 |");
        assert_eq!(lines[3], "| abcd |");
    }

    #[test]
    fn test_json_results() {
        let mut out = Vec::new();
        ReportFormatter::Json.render_results(&results(), &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["start"], "2025/09/12");
        assert_eq!(value[0]["room_link"], serde_json::Value::Null);
    }

    #[test]
    fn test_reports_table() {
        let reports = vec![VesselReport {
            boat_name: "Barakati".to_string(),
            boat_link: None,
            outcome: VesselOutcome::FetchFailed("timeout".to_string()),
            extraction: Extraction::default(),
        }];
        let mut out = Vec::new();
        ReportFormatter::Markdown.render_reports(&reports, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("| Barakati | fetch-failed | 0     | timeout |"));

        let mut out = Vec::new();
        ReportFormatter::Json.render_reports(&reports, &mut out).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["outcome"]["status"], "fetch-failed");
    }
}
