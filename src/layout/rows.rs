//! Room Row Discovery
//!
//! 部屋ラベルの行（または行グループ）を見つける戦略群。
//!
//! - 固定オフセット表: 先頭行から既知の行数ずつ部屋を割り当てる
//! - キーワード一致表: ラベル列でキーワードを探し、一致したら固定行数のブロックを確保する
//! - 継続グループ: 番号とラベルを持つ行でグループを開始し、空白または同じラベルの行で延長する
//! - ラベル連続行: 空白でないラベル行を、空白2行が続くまで集める

use serde::{Deserialize, Serialize};

use crate::grid::Grid;

/// 部屋名と行数の組（固定オフセット表の1ブロック）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedBlock {
    /// 部屋名
    pub room: String,
    /// ブロックの行数
    pub rows: usize,
}

impl FixedBlock {
    pub fn new(room: impl Into<String>, rows: usize) -> Self {
        Self {
            room: room.into(),
            rows,
        }
    }
}

/// 部屋と、その部屋に属する行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRows {
    /// 部屋名（またはシート上のラベル）
    pub room: String,
    /// 行インデックス（昇順）
    pub rows: Vec<usize>,
}

/// 固定オフセット表: `start`行から順にブロックを割り当てる
///
/// ブロックは`end`（含まない）で切り詰められ、`start`が`end`に達した時点で終了します。
pub fn fixed_offset_rows(start: usize, end: usize, blocks: &[FixedBlock]) -> Vec<RoomRows> {
    let mut result = Vec::new();
    let mut offset = start;

    for block in blocks {
        if offset >= end {
            break;
        }
        let block_end = (offset + block.rows).min(end);
        result.push(RoomRows {
            room: block.room.clone(),
            rows: (offset..block_end).collect(),
        });
        offset += block.rows;
    }
    result
}

/// キーワード一致表: ラベル列を走査し、キーワードを含む行から`block_rows`行を確保する
///
/// # 引数
///
/// * `label_col` - ラベル列
/// * `start` / `end` - 走査範囲（`end`は含まない）
/// * `keywords` - `(キーワード, 部屋名)`の組（キーワードは大文字、先に一致したものを採用）
/// * `block_rows` - 1部屋あたりの行数
pub fn keyword_blocks(
    grid: &Grid,
    label_col: usize,
    start: usize,
    end: usize,
    keywords: &[(String, String)],
    block_rows: usize,
) -> Vec<RoomRows> {
    let mut result = Vec::new();
    let block_rows = block_rows.max(1);
    let mut row = start;

    while row + block_rows <= end {
        let label = grid.text(row, label_col).to_uppercase();
        let matched = if label.is_empty() {
            None
        } else {
            keywords.iter().find(|(keyword, _)| label.contains(keyword.as_str()))
        };

        match matched {
            Some((_, room)) => {
                result.push(RoomRows {
                    room: room.clone(),
                    rows: (row..row + block_rows).collect(),
                });
                row += block_rows;
            }
            None => row += 1,
        }
    }
    result
}

/// 継続グループ（キャビン番号 + 部屋ラベル）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationGroup {
    /// 部屋ラベル
    pub label: String,
    /// キャビン番号
    pub cabin: u32,
    /// グループに属する行
    pub rows: Vec<usize>,
}

/// 継続グループを検出
///
/// `id_col`が数字で`label_col`が空白でない行がグループを開始します。
/// 後続の行は、ラベルが空白または同一であれば同じグループに属し、
/// 異なるラベルが現れるとグループは終了します。同じ`(ラベル, 番号)`が再び
/// 現れた場合は既存のグループに追加されます。
///
/// # 引数
///
/// * `start` / `end` - 走査範囲（`end`は含まない）
pub fn continuation_groups(
    grid: &Grid,
    id_col: usize,
    label_col: usize,
    start: usize,
    end: usize,
) -> Vec<ContinuationGroup> {
    let mut groups: Vec<ContinuationGroup> = Vec::new();
    let mut current: Option<usize> = None;

    for row in start..end.min(grid.row_count()) {
        let id_text = grid.text(row, id_col);
        let label = grid.text(row, label_col);
        let cabin = if !id_text.is_empty() && id_text.bytes().all(|b| b.is_ascii_digit()) {
            id_text.parse::<u32>().ok()
        } else {
            None
        };

        match cabin {
            Some(cabin) if !label.is_empty() => {
                let idx = match groups
                    .iter()
                    .position(|g| g.cabin == cabin && g.label == label)
                {
                    Some(idx) => idx,
                    None => {
                        groups.push(ContinuationGroup {
                            label: label.to_string(),
                            cabin,
                            rows: Vec::new(),
                        });
                        groups.len() - 1
                    }
                };
                groups[idx].rows.push(row);
                current = Some(idx);
            }
            Some(_) => {}
            None => {
                if let Some(idx) = current {
                    if label.is_empty() || label == groups[idx].label {
                        groups[idx].rows.push(row);
                    } else {
                        current = None;
                    }
                }
            }
        }
    }
    groups
}

/// ラベル連続行を検出
///
/// `start`行から`end`（含まない）まで、空白でないラベルを集めます。
/// 空白ラベルが2行続いた時点で終了します。
pub fn label_runs(grid: &Grid, label_col: usize, start: usize, end: usize) -> Vec<(String, usize)> {
    let mut result = Vec::new();
    let mut blank_streak = 0;

    for row in start..end.min(grid.row_count()) {
        let label = grid.text(row, label_col);
        if label.is_empty() {
            blank_streak += 1;
            if blank_streak >= 2 {
                break;
            }
        } else {
            blank_streak = 0;
            result.push((label.to_string(), row));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_offset_rows_clamp_at_end() {
        let blocks = vec![
            FixedBlock::new("Luxury Cabin", 4),
            FixedBlock::new("Grand Deluxe", 4),
            FixedBlock::new("Deluxe Twin", 4),
        ];
        let rooms = fixed_offset_rows(10, 16, &blocks);
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].rows, vec![10, 11, 12, 13]);
        assert_eq!(rooms[1].rows, vec![14, 15]);
    }

    #[test]
    fn test_keyword_blocks_skip_unrelated_rows() {
        let grid = Grid::from_text_rows(
            "2025",
            &[
                vec!["", "Wakatobi room - double bed"],
                vec!["", "IDR 3.500.000"],
                vec!["", ""],
                vec!["", "price list"],
                vec!["", "WOLIO"],
                vec!["", ""],
                vec!["", ""],
            ],
        );
        let keywords = vec![
            ("WAKATOBI".to_string(), "Wakatobi".to_string()),
            ("WOLIO".to_string(), "Wolio".to_string()),
        ];
        let rooms = keyword_blocks(&grid, 1, 0, 7, &keywords, 3);
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].room, "Wakatobi");
        assert_eq!(rooms[0].rows, vec![0, 1, 2]);
        assert_eq!(rooms[1].rows, vec![4, 5, 6]);
    }

    #[test]
    fn test_keyword_block_needs_room_for_whole_block() {
        let grid = Grid::from_text_rows("2025", &[vec!["", ""], vec!["", "WOLIO"], vec!["", ""]]);
        let keywords = vec![("WOLIO".to_string(), "Wolio".to_string())];
        assert!(keyword_blocks(&grid, 1, 0, 3, &keywords, 3).is_empty());
    }

    #[test]
    fn test_continuation_groups() {
        let grid = Grid::from_text_rows(
            "Booking Chart 2025",
            &[
                vec!["1", "Master Ocean View"],
                vec!["", ""],
                vec!["", "Master Ocean View"],
                vec!["2", "Deluxe Ocean View"],
                vec!["", "Notes"],
                vec!["", ""],
                vec!["3", "Share 8 pax"],
                vec!["", ""],
            ],
        );
        let groups = continuation_groups(&grid, 0, 1, 0, 8);
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].rows, vec![0, 1, 2]);
        assert_eq!(groups[1].cabin, 2);
        // 異なるラベルでグループが終了し、後続の空白行は取り込まれない
        assert_eq!(groups[1].rows, vec![3]);
        assert_eq!(groups[2].rows, vec![6, 7]);
    }

    #[test]
    fn test_repeated_group_key_appends() {
        let grid = Grid::from_text_rows(
            "Sheet1",
            &[vec!["1", "Master"], vec!["2", "Deluxe"], vec!["1", "Master"]],
        );
        let groups = continuation_groups(&grid, 0, 1, 0, 3);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].rows, vec![0, 2]);
    }

    #[test]
    fn test_label_runs_stop_after_two_blanks() {
        let grid = Grid::from_text_rows(
            "Sheet1",
            &[
                vec!["", "Love"],
                vec!["", ""],
                vec!["", "Joy"],
                vec!["", ""],
                vec!["", ""],
                vec!["", "Footer"],
            ],
        );
        let runs = label_runs(&grid, 1, 0, 6);
        assert_eq!(runs, vec![("Love".to_string(), 0), ("Joy".to_string(), 2)]);
    }
}
