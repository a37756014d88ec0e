//! # Tables
//!
//! Fixed-size row-major grids for one form section, before (`RawTable`) and
//! after (`Table`) numeric post-processing. Dimensions never change after
//! construction; `vstack` builds a new grid rather than growing one.

use serde::Serialize;

use crate::errors::{DigitizerError, DigitizerResult};

/// Confidence of a cell that never received a detection
pub const NO_CONFIDENCE: f32 = -1.0;

/// Flat, bounds-checked, row-major matrix
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    rows: usize,
    cols: usize,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Create a grid with every cell set to `fill`
    pub fn filled(rows: usize, cols: usize, fill: T) -> Self {
        Self {
            rows,
            cols,
            cells: vec![fill; rows * cols],
        }
    }

    /// Concatenate grids vertically, in order. All parts must share a column count.
    pub fn vstack(parts: &[&Grid<T>]) -> DigitizerResult<Self> {
        let cols = parts.first().map_or(0, |g| g.cols);
        if let Some(mismatch) = parts.iter().find(|g| g.cols != cols) {
            return Err(DigitizerError::Config(format!(
                "Cannot stack grids with {} and {} columns",
                cols, mismatch.cols
            )));
        }
        let cells: Vec<T> = parts.iter().flat_map(|g| g.cells.iter().cloned()).collect();
        Ok(Self {
            rows: parts.iter().map(|g| g.rows).sum(),
            cols,
            cells,
        })
    }
}

impl<T> Grid<T> {
    /// Build a grid from rows of equal length
    pub fn from_rows(rows: Vec<Vec<T>>) -> DigitizerResult<Self> {
        let row_count = rows.len();
        let cols = rows.first().map_or(0, |r| r.len());
        if rows.iter().any(|r| r.len() != cols) {
            return Err(DigitizerError::InvalidInput(
                "All grid rows must have the same length".to_string(),
            ));
        }
        Ok(Self {
            rows: row_count,
            cols,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.rows && col < self.cols).then(|| row * self.cols + col)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        self.index(row, col).map(|i| &self.cells[i])
    }

    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut T> {
        self.index(row, col).map(move |i| &mut self.cells[i])
    }

    /// One row as a slice
    pub fn row(&self, row: usize) -> Option<&[T]> {
        (row < self.rows).then(|| &self.cells[row * self.cols..(row + 1) * self.cols])
    }

    /// Iterate rows as slices
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        // chunks(0) panics; a grid with no columns has no rows to yield
        self.cells.chunks(self.cols.max(1)).take(self.rows)
    }

    /// Apply `f` to every cell, keeping dimensions
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
        Grid {
            rows: self.rows,
            cols: self.cols,
            cells: self.cells.iter().map(f).collect(),
        }
    }

    /// Apply `f(row, col, cell)` to every cell, keeping dimensions
    pub fn map_indexed<U>(&self, mut f: impl FnMut(usize, usize, &T) -> U) -> Grid<U> {
        let cols = self.cols.max(1);
        Grid {
            rows: self.rows,
            cols: self.cols,
            cells: self
                .cells
                .iter()
                .enumerate()
                .map(|(i, cell)| f(i / cols, i % cols, cell))
                .collect(),
        }
    }

    /// Copy out as nested vectors
    pub fn to_rows(&self) -> Vec<Vec<T>>
    where
        T: Clone,
    {
        self.iter_rows().map(|r| r.to_vec()).collect()
    }
}

/// A cell during mapping, before numeric conversion
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    /// Never received a detection
    Empty,
    /// Unparsed token with its detection confidence
    Detected { text: String, confidence: f32 },
}

impl RawCell {
    /// True when the cell holds a digit-parseable token
    pub fn holds_digit(&self) -> bool {
        match self {
            RawCell::Empty => false,
            RawCell::Detected { text, .. } => crate::detection::is_digit_token(text),
        }
    }
}

/// Grid of raw cells for one section
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub section: String,
    pub grid: Grid<RawCell>,
}

impl RawTable {
    /// Create a fully empty table
    pub fn empty(section: &str, rows: usize, cols: usize) -> Self {
        Self {
            section: section.to_string(),
            grid: Grid::filled(rows, cols, RawCell::Empty),
        }
    }
}

/// Numeric cell after post-processing
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cell {
    pub value: u64,
    pub confidence: f32,
}

impl Cell {
    pub fn new(value: u64, confidence: f32) -> Self {
        Self { value, confidence }
    }

    /// Zero-valued cell that never received a detection
    pub fn empty() -> Self {
        Self::new(0, NO_CONFIDENCE)
    }
}

/// Numeric table for one section
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub section: String,
    pub grid: Grid<Cell>,
}

impl Table {
    pub fn new(section: &str, grid: Grid<Cell>) -> Self {
        Self {
            section: section.to_string(),
            grid,
        }
    }

    /// Build a table from parallel value and confidence rows
    pub fn from_values(
        section: &str,
        values: Vec<Vec<u64>>,
        confidences: Vec<Vec<f32>>,
    ) -> DigitizerResult<Self> {
        if values.len() != confidences.len()
            || values.iter().zip(&confidences).any(|(v, c)| v.len() != c.len())
        {
            return Err(DigitizerError::InvalidInput(
                "Value and confidence grids must have the same shape".to_string(),
            ));
        }
        let rows = values
            .into_iter()
            .zip(confidences)
            .map(|(v, c)| v.into_iter().zip(c).map(|(v, c)| Cell::new(v, c)).collect())
            .collect();
        Ok(Self::new(section, Grid::from_rows(rows)?))
    }

    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols()
    }

    pub fn value(&self, row: usize, col: usize) -> Option<u64> {
        self.grid.get(row, col).map(|c| c.value)
    }

    pub fn confidence(&self, row: usize, col: usize) -> Option<f32> {
        self.grid.get(row, col).map(|c| c.confidence)
    }

    /// Integer grid as nested vectors
    pub fn values(&self) -> Vec<Vec<u64>> {
        self.grid.map(|c| c.value).to_rows()
    }

    /// Confidence grid as nested vectors
    pub fn confidences(&self) -> Vec<Vec<f32>> {
        self.grid.map(|c| c.confidence).to_rows()
    }
}
