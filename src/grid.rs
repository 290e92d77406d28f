//! Grid Module
//!
//! 1枚のワークシートを正規化したグリッド構造を提供するモジュール。
//! セルのテキスト・背景色・罫線・ハイパーリンクと、結合範囲を保持します。
//!
//! 結合範囲の子セルは元データのまま（通常は空文字列）保持し、親セルの値が必要な場合は
//! `Grid::resolved_text()`で参照します（データ重複フィル戦略）。

use serde::{Deserialize, Serialize};

use crate::error::CabinError;
use crate::security::SecurityConfig;
use crate::types::{Borders, CellCoord, Color, MergeRange};

/// グリッドの1セル
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cell {
    /// 表示文字列
    pub text: String,

    /// 背景色（塗りつぶしなしの場合は`None`）
    pub background: Option<Color>,

    /// 四辺の罫線
    pub borders: Borders,

    /// セルに埋め込まれたハイパーリンク
    pub hyperlink: Option<String>,
}

impl Cell {
    /// テキストのみのセルを生成
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// 空セルを生成
    pub fn empty() -> Self {
        Self::default()
    }

    /// 背景色を設定
    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    /// 罫線を設定
    pub fn with_borders(mut self, borders: Borders) -> Self {
        self.borders = borders;
        self
    }

    /// ハイパーリンクを設定
    pub fn with_hyperlink(mut self, url: impl Into<String>) -> Self {
        self.hyperlink = Some(url.into());
        self
    }

    /// 空白（前後の空白を除いて空文字列）かどうか
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// 正規化されたワークシート
///
/// 行ごとの長さは揃っていなくてもかまいません（範囲外のセルは空セルとして扱います）。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    title: String,
    #[serde(default)]
    rows: Vec<Vec<Cell>>,
    #[serde(default)]
    merges: Vec<MergeRange>,
}

static EMPTY_CELL: Cell = Cell {
    text: String::new(),
    background: None,
    borders: Borders {
        left: crate::types::BorderStyle::None,
        right: crate::types::BorderStyle::None,
        top: crate::types::BorderStyle::None,
        bottom: crate::types::BorderStyle::None,
    },
    hyperlink: None,
};

impl Grid {
    /// 空のグリッドを生成
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            rows: Vec::new(),
            merges: Vec::new(),
        }
    }

    /// 行データからグリッドを生成
    pub fn from_rows(title: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            title: title.into(),
            rows,
            merges: Vec::new(),
        }
    }

    /// テキストのみの行データからグリッドを生成
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use cabincal::Grid;
    ///
    /// let grid = Grid::from_text_rows("Sheet1", &[vec!["JAN", "FEB"], vec!["1-3", "4-6"]]);
    /// assert_eq!(grid.text(1, 1), "4-6");
    /// ```
    pub fn from_text_rows<S: AsRef<str>>(title: impl Into<String>, rows: &[Vec<S>]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|text| Cell::new(text.as_ref())).collect())
            .collect();
        Self::from_rows(title, rows)
    }

    /// スパースなセルデータと結合範囲からグリッドを構築
    ///
    /// 各行は、その行で最も右にある実セルまでの長さだけを確保します。
    ///
    /// # 引数
    ///
    /// * `title` - ワークシート名
    /// * `cells` - 座標とセルのペア（順不同）
    /// * `merges` - 結合範囲
    /// * `security` - ワークシートの最大行数・最大列数
    ///
    /// # 戻り値
    ///
    /// * `Ok(Grid)` - 構築に成功した場合
    /// * `Err(CabinError::SecurityViolation)` - セルまたは結合範囲が最大行数・最大列数を超える場合
    /// * `Err(CabinError::Config)` - 結合範囲が重なっている場合
    pub fn build(
        title: impl Into<String>,
        cells: Vec<(CellCoord, Cell)>,
        merges: Vec<MergeRange>,
        security: &SecurityConfig,
    ) -> Result<Self, CabinError> {
        let title = title.into();

        // 1. グリッドサイズの決定と検証
        let (rows, cols) = Self::determine_grid_size(&cells, &merges);
        security.check_sheet_dimensions(&title, rows, cols)?;

        // 2. 行ごとの長さを決定してから配置
        let mut row_widths = vec![0usize; rows as usize];
        for (coord, _) in &cells {
            let width = &mut row_widths[coord.row as usize];
            *width = (*width).max(coord.col as usize + 1);
        }
        let mut grid_rows: Vec<Vec<Cell>> = row_widths
            .into_iter()
            .map(|width| vec![Cell::empty(); width])
            .collect();
        for (coord, cell) in cells {
            grid_rows[coord.row as usize][coord.col as usize] = cell;
        }

        // 3. 結合範囲を登録（重なりを検証）
        let mut grid = Self::from_rows(title, grid_rows);
        for merge in merges {
            grid.add_merge(merge)?;
        }

        Ok(grid)
    }

    /// グリッドサイズを決定（内部ヘルパー）
    ///
    /// すべてのセル座標と結合範囲から最大行・列を算出します。
    fn determine_grid_size(cells: &[(CellCoord, Cell)], merges: &[MergeRange]) -> (u64, u64) {
        let mut rows = 0u64;
        let mut cols = 0u64;

        for (coord, _) in cells {
            rows = rows.max(u64::from(coord.row) + 1);
            cols = cols.max(u64::from(coord.col) + 1);
        }
        for merge in merges {
            rows = rows.max(u64::from(merge.row_end));
            cols = cols.max(u64::from(merge.col_end));
        }

        (rows, cols)
    }

    /// セルを配置（必要に応じてグリッドを拡張）
    pub fn set_cell(&mut self, row: usize, col: usize, cell: Cell) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let target = &mut self.rows[row];
        if target.len() <= col {
            target.resize_with(col + 1, Cell::empty);
        }
        target[col] = cell;
    }

    /// 結合範囲を追加
    ///
    /// 既存の結合範囲と重なる場合、または空の範囲の場合は`CabinError::Config`を返します。
    pub fn add_merge(&mut self, merge: MergeRange) -> Result<(), CabinError> {
        if merge.is_empty() {
            return Err(CabinError::Config(format!(
                "Empty merge range at {} in sheet '{}'",
                merge.anchor().to_a1_notation(),
                self.title
            )));
        }
        if let Some(existing) = self.merges.iter().find(|m| m.overlaps(&merge)) {
            return Err(CabinError::Config(format!(
                "Merge range at {} overlaps merge at {} in sheet '{}'",
                merge.anchor().to_a1_notation(),
                existing.anchor().to_a1_notation(),
                self.title
            )));
        }
        self.merges.push(merge);
        Ok(())
    }

    /// ワークシート名
    pub fn title(&self) -> &str {
        &self.title
    }

    /// 行数
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 列数（最も長い行の長さ、または結合範囲の右端）
    pub fn width(&self) -> usize {
        let cells = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        let merges = self.merges.iter().map(|m| m.col_end as usize).max().unwrap_or(0);
        cells.max(merges)
    }

    /// 1行分のセル
    pub fn row(&self, row: usize) -> &[Cell] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// セルを取得（範囲外の場合は空セル）
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// セルのテキスト（前後の空白を除去）
    pub fn text(&self, row: usize, col: usize) -> &str {
        self.cell(row, col).text.trim()
    }

    /// セルの背景色
    pub fn background(&self, row: usize, col: usize) -> Option<&Color> {
        self.cell(row, col).background.as_ref()
    }

    /// 結合範囲の一覧
    pub fn merges(&self) -> &[MergeRange] {
        &self.merges
    }

    /// 指定セルを含む結合範囲
    pub fn merge_at(&self, row: usize, col: usize) -> Option<&MergeRange> {
        let (row, col) = (row as u32, col as u32);
        self.merges.iter().find(|m| m.contains(row, col))
    }

    /// 結合範囲を考慮したテキスト
    ///
    /// 結合範囲の子セルの場合は親セル（左上セル）のテキストを返します。
    pub fn resolved_text(&self, row: usize, col: usize) -> &str {
        match self.merge_at(row, col) {
            Some(merge) => {
                let anchor = merge.anchor();
                self.text(anchor.row as usize, anchor.col as usize)
            }
            None => self.text(row, col),
        }
    }

    /// 先頭`cols`列がすべて空白の行かどうか
    pub fn is_row_blank(&self, row: usize, cols: usize) -> bool {
        self.row(row).iter().take(cols).all(Cell::is_blank)
    }
}
