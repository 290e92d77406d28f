//! Security Module
//!
//! XLSXソースの読み込み時に適用するセキュリティ制限を実装するモジュール。
//! ZIP bomb攻撃、パストラバーサル攻撃、過大な入力ファイルへの対策を提供します。

use std::io::{Read, Seek};

use zip::ZipArchive;

use crate::error::CabinError;

/// セキュリティ設定
///
/// ワークブック読み込み時のセキュリティ制限を定義します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    /// 展開後の最大サイズ（バイト）
    /// デフォルト: 1GB (1_073_741_824 bytes)
    pub max_decompressed_size: u64,
    /// ZIPアーカイブ内の最大ファイル数
    /// デフォルト: 10000
    pub max_file_count: usize,
    /// 単一ファイルの最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_file_size: u64,
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 2GB (2_147_483_648 bytes)
    pub max_input_file_size: u64,
    /// ワークシートの最大行数
    /// デフォルト: 100000
    pub max_sheet_rows: u64,
    /// ワークシートの最大列数
    /// デフォルト: 4096
    pub max_sheet_cols: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_decompressed_size: 1_073_741_824, // 1GB
            max_file_count: 10_000,
            max_file_size: 104_857_600,         // 100MB
            max_input_file_size: 2_147_483_648, // 2GB
            max_sheet_rows: 100_000,
            max_sheet_cols: 4_096,
        }
    }
}

impl SecurityConfig {
    /// 入力全体を読み込み、入力サイズの上限を検証
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<u8>)` - 読み込んだバイト列
    /// * `Err(CabinError::SecurityViolation)` - 入力サイズが上限を超えた場合
    pub fn read_input<R: Read>(&self, reader: R) -> Result<Vec<u8>, CabinError> {
        let mut buffer = Vec::new();
        // 上限 + 1バイトまでしか読まない
        let bytes_read = reader
            .take(self.max_input_file_size.saturating_add(1))
            .read_to_end(&mut buffer)?;

        if bytes_read as u64 > self.max_input_file_size {
            return Err(CabinError::SecurityViolation(format!(
                "Input file size exceeds maximum: more than {} bytes",
                self.max_input_file_size
            )));
        }
        Ok(buffer)
    }

    /// ZIPアーカイブのエントリ数・パス・サイズを検証
    ///
    /// # 戻り値
    ///
    /// * `Ok(())` - すべての制限を満たす場合
    /// * `Err(CabinError::SecurityViolation)` - いずれかの制限に違反した場合
    pub fn check_archive<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<(), CabinError> {
        if archive.len() > self.max_file_count {
            return Err(CabinError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} (max: {})",
                archive.len(),
                self.max_file_count
            )));
        }

        let mut total_decompressed_size = 0u64;
        for i in 0..archive.len() {
            let file = archive.by_index(i)?;

            let file_name = file.name();
            validate_zip_path(file_name)
                .map_err(|e| CabinError::SecurityViolation(format!("Invalid ZIP path: {}", e)))?;

            let file_size = file.size();
            if file_size > self.max_file_size {
                return Err(CabinError::SecurityViolation(format!(
                    "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                    file_name, file_size, self.max_file_size
                )));
            }

            total_decompressed_size = total_decompressed_size.checked_add(file_size).ok_or_else(|| {
                CabinError::SecurityViolation("Total decompressed size calculation overflow".to_string())
            })?;

            if total_decompressed_size > self.max_decompressed_size {
                return Err(CabinError::SecurityViolation(format!(
                    "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                    total_decompressed_size, self.max_decompressed_size
                )));
            }
        }
        Ok(())
    }

    /// ワークシートの行数・列数の上限を検証
    ///
    /// グリッドを確保する前に呼び出します。
    ///
    /// # 引数
    ///
    /// * `title` - ワークシート名
    /// * `rows` - 必要な行数
    /// * `cols` - 必要な列数
    pub fn check_sheet_dimensions(&self, title: &str, rows: u64, cols: u64) -> Result<(), CabinError> {
        if rows > self.max_sheet_rows || cols > self.max_sheet_cols {
            return Err(CabinError::SecurityViolation(format!(
                "Worksheet '{}' exceeds maximum dimensions: {} rows x {} columns (max: {} x {})",
                title, rows, cols, self.max_sheet_rows, self.max_sheet_cols
            )));
        }
        Ok(())
    }
}

/// ファイルパスの検証
///
/// パストラバーサル攻撃を防ぐため、ZIPエントリのパスを検証します。
///
/// # 戻り値
///
/// * `Ok(())` - パスが安全な場合
/// * `Err(String)` - パスが危険な場合（`..`や絶対パスを含む）
pub(crate) fn validate_zip_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("Empty path is not allowed".to_string());
    }

    // Windows形式の`C:\`やUnix形式の`/`で始まるパス
    if path.starts_with('/') || path.starts_with("C:\\") || path.starts_with("c:\\") {
        return Err(format!("Absolute path is not allowed: {}", path));
    }

    if path.contains("..") {
        return Err(format!("Path traversal detected: {}", path));
    }

    if path.contains('\\') {
        return Err(format!("Backslash in path is not allowed: {}", path));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;

    fn archive_with(entries: &[(&str, &[u8])]) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in entries {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(content).unwrap();
        }
        let cursor = writer.finish().unwrap();
        ZipArchive::new(cursor).unwrap()
    }

    #[test]
    fn test_validate_zip_path_valid() {
        assert!(validate_zip_path("xl/workbook.xml").is_ok());
        assert!(validate_zip_path("xl/worksheets/sheet1.xml").is_ok());
        assert!(validate_zip_path("xl/styles.xml").is_ok());
    }

    #[test]
    fn test_validate_zip_path_rejects_unsafe_paths() {
        assert!(validate_zip_path("").is_err());
        assert!(validate_zip_path("/etc/passwd").is_err());
        assert!(validate_zip_path("C:\\Windows\\system32").is_err());
        assert!(validate_zip_path("xl/../../etc/passwd").is_err());
        assert!(validate_zip_path("xl\\workbook.xml").is_err());
    }

    #[test]
    fn test_read_input_limit() {
        let config = SecurityConfig {
            max_input_file_size: 4,
            ..SecurityConfig::default()
        };
        assert_eq!(config.read_input(&b"abcd"[..]).unwrap(), b"abcd");
        assert!(matches!(
            config.read_input(&b"abcde"[..]),
            Err(CabinError::SecurityViolation(_))
        ));
    }

    #[test]
    fn test_check_archive_file_count() {
        let mut archive = archive_with(&[("a.xml", b"1"), ("b.xml", b"2")]);
        let config = SecurityConfig {
            max_file_count: 1,
            ..SecurityConfig::default()
        };
        assert!(matches!(
            config.check_archive(&mut archive),
            Err(CabinError::SecurityViolation(_))
        ));
        assert!(SecurityConfig::default().check_archive(&mut archive).is_ok());
    }

    #[test]
    fn test_check_archive_sizes() {
        let mut archive = archive_with(&[("a.xml", b"12345"), ("b.xml", b"12345")]);

        let per_file = SecurityConfig {
            max_file_size: 4,
            ..SecurityConfig::default()
        };
        assert!(per_file.check_archive(&mut archive).is_err());

        let total = SecurityConfig {
            max_decompressed_size: 8,
            ..SecurityConfig::default()
        };
        let err = total.check_archive(&mut archive).unwrap_err();
        assert!(err.to_string().contains("Total decompressed size"));
    }

    #[test]
    fn test_check_sheet_dimensions() {
        let config = SecurityConfig::default();
        assert!(config.check_sheet_dimensions("2025", 100_000, 4_096).is_ok());
        assert!(config.check_sheet_dimensions("2025", 0, 0).is_ok());

        let err = config.check_sheet_dimensions("2025", 1_048_576, 16_384).unwrap_err();
        assert!(err.to_string().contains("exceeds maximum dimensions"));

        let narrow = SecurityConfig {
            max_sheet_cols: 26,
            ..SecurityConfig::default()
        };
        assert!(matches!(
            narrow.check_sheet_dimensions("2025", 10, 27),
            Err(CabinError::SecurityViolation(_))
        ));
    }

    #[test]
    fn test_check_archive_rejects_traversal_entry() {
        let mut archive = archive_with(&[("../evil.xml", b"x")]);
        let err = SecurityConfig::default().check_archive(&mut archive).unwrap_err();
        assert!(err.to_string().contains("Path traversal"));
    }
}
