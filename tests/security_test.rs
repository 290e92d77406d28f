//! Security Tests
//!
//! ワークブック読み込み時のセキュリティ制限を検証します。
//! ZIP bomb攻撃、パストラバーサル攻撃、過大な入力ファイルへの対策が
//! `XlsxSource`と`XlsxDirectoryProvider`の両方で働くことを確認します。

use std::io::{Cursor, Write};

use cabincal::{CabinError, DocumentRef, SecurityConfig, SourceProvider, XlsxDirectoryProvider, XlsxSource};
use rust_xlsxwriter::Workbook;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// 指定したエントリを持つZIPアーカイブを作成
fn zip_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip_data = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut zip_data));
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, content) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
    }
    zip_data
}

fn small_workbook() -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "JULY").unwrap();
    workbook.save_to_buffer().unwrap()
}

fn violation(result: Result<XlsxSource, CabinError>) -> String {
    match result {
        Err(CabinError::SecurityViolation(msg)) => msg,
        Err(e) => panic!("Expected SecurityViolation error, got {:?}", e),
        Ok(_) => panic!("Expected SecurityViolation error, got a workbook"),
    }
}

/// シート末尾（XFD1048576）に書式付きセルがあるワークシートは拒否される
#[test]
fn test_worksheet_dimension_limit() {
    use cabincal::SheetSource;
    use rust_xlsxwriter::{Format, FormatBorder};

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet().set_name("2025").unwrap();
    sheet.write_string(0, 0, "JULY").unwrap();
    sheet
        .write_blank(1_048_575, 16_383, &Format::new().set_border(FormatBorder::Thin))
        .unwrap();
    let bytes = workbook.save_to_buffer().unwrap();

    let mut source = XlsxSource::open(Cursor::new(bytes)).unwrap();
    match source.fetch_grid("2025") {
        Err(CabinError::SecurityViolation(msg)) => {
            assert!(msg.contains("exceeds maximum dimensions"), "unexpected message: {}", msg);
        }
        Err(e) => panic!("Expected SecurityViolation error, got {:?}", e),
        Ok(grid) => panic!("Expected SecurityViolation error, got {} rows", grid.row_count()),
    }
}

/// ZIP bomb攻撃のテスト: 大量のファイルを含むZIPアーカイブ
#[test]
fn test_zip_bomb_too_many_files() {
    let names: Vec<String> = (0..6).map(|i| format!("xl/file{}.xml", i)).collect();
    let entries: Vec<(&str, &[u8])> = names.iter().map(|name| (name.as_str(), &b"test"[..])).collect();

    let security = SecurityConfig {
        max_file_count: 5,
        ..SecurityConfig::default()
    };
    let msg = violation(XlsxSource::open_with_security(Cursor::new(zip_with(&entries)), &security));
    assert!(msg.contains("too many files"));
}

/// ZIP bomb攻撃のテスト: 単一ファイルの展開後サイズ
#[test]
fn test_zip_bomb_large_entry() {
    let payload = vec![b'x'; 4096];
    let security = SecurityConfig {
        max_file_size: 1024,
        ..SecurityConfig::default()
    };
    let msg = violation(XlsxSource::open_with_security(
        Cursor::new(zip_with(&[("xl/sharedStrings.xml", &payload)])),
        &security,
    ));
    assert!(msg.contains("exceeds maximum size"));
}

/// ZIP bomb攻撃のテスト: 展開後の合計サイズ
#[test]
fn test_zip_bomb_total_decompressed_size() {
    let payload = vec![b'x'; 600];
    let security = SecurityConfig {
        max_decompressed_size: 1000,
        ..SecurityConfig::default()
    };
    let msg = violation(XlsxSource::open_with_security(
        Cursor::new(zip_with(&[("xl/a.xml", &payload), ("xl/b.xml", &payload)])),
        &security,
    ));
    assert!(msg.contains("decompressed size"));
}

/// パストラバーサル攻撃のテスト: `..`を含むパス
#[test]
fn test_path_traversal_dotdot() {
    let result = XlsxSource::open(Cursor::new(zip_with(&[("../etc/passwd", b"test")])));

    // ZIPライブラリがエントリ名を拒否した場合もZipエラーとして許容
    match result {
        Err(CabinError::SecurityViolation(msg)) => {
            assert!(msg.contains("Path traversal") || msg.contains("Invalid ZIP path"));
        }
        Err(CabinError::Zip(_)) => {}
        Err(e) => panic!("Unexpected error: {:?}", e),
        Ok(_) => panic!("Expected an error for a traversal path"),
    }
}

/// パストラバーサル攻撃のテスト: 絶対パス
#[test]
fn test_path_traversal_absolute_path() {
    let result = XlsxSource::open(Cursor::new(zip_with(&[("/etc/passwd", b"test")])));

    match result {
        Err(CabinError::SecurityViolation(msg)) => {
            assert!(msg.contains("Absolute path") || msg.contains("Invalid ZIP path"));
        }
        Err(CabinError::Zip(_)) | Err(CabinError::Parse(_)) | Err(CabinError::Xml(_)) => {}
        Err(e) => panic!("Unexpected error: {:?}", e),
        Ok(_) => panic!("Expected an error for an absolute path"),
    }
}

/// 入力サイズ制限のテスト
#[test]
fn test_input_file_size_limit() {
    let security = SecurityConfig {
        max_input_file_size: 512,
        ..SecurityConfig::default()
    };
    let msg = violation(XlsxSource::open_with_security(Cursor::new(vec![0u8; 513]), &security));
    assert!(msg.contains("Input file size"));
}

/// 正常なワークブックは制限内で読み込める
#[test]
fn test_valid_workbook_within_limits() {
    let bytes = small_workbook();
    let security = SecurityConfig {
        max_input_file_size: bytes.len() as u64,
        max_file_count: 32,
        ..SecurityConfig::default()
    };
    let mut source = XlsxSource::open_with_security(Cursor::new(bytes), &security).unwrap();

    use cabincal::SheetSource;
    let titles = source.worksheet_titles().unwrap();
    assert_eq!(titles, vec!["Sheet1"]);
    assert_eq!(source.fetch_grid("Sheet1").unwrap().text(0, 0), "JULY");
}

/// ディレクトリプロバイダーはセキュリティ違反をそのまま返す
#[test]
fn test_directory_provider_keeps_security_violation() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("kanha-2025.xlsx"), small_workbook()).unwrap();

    let provider = XlsxDirectoryProvider::new(dir.path()).with_security(SecurityConfig {
        max_input_file_size: 16,
        ..SecurityConfig::default()
    });
    match provider.open(&DocumentRef::new("kanha-2025")) {
        Err(CabinError::SecurityViolation(msg)) => assert!(msg.contains("Input file size")),
        Err(e) => panic!("Expected SecurityViolation error, got {:?}", e),
        Ok(_) => panic!("Expected SecurityViolation error"),
    }

    let provider = XlsxDirectoryProvider::new(dir.path());
    assert!(provider.open(&DocumentRef::new("kanha-2025")).is_ok());
}
