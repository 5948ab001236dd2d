//! Fixed-shape subdivision × crop container.
//!
//! Storage is row-major: row `s` holds every crop of subdivision `s`. The same
//! order is used by the flat decision vector of the price-responsive model.

use crate::{AgroError, AgroResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl AllocationMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Build from row-major data; fails if `data.len() != rows * cols`.
    pub fn from_row_major(rows: usize, cols: usize, data: Vec<f64>) -> AgroResult<Self> {
        if data.len() != rows * cols {
            return Err(AgroError::Validation(format!(
                "matrix data has {} entries, expected {} ({} x {})",
                data.len(),
                rows * cols,
                rows,
                cols
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Build from nested rows; every row must have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> AgroResult<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(AgroError::Validation(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    cols
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[self.index(row, col)]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        let idx = self.index(row, col);
        self.data[idx] = value;
    }

    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Σ over crops, one entry per subdivision.
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.rows).map(|r| self.row(r).iter().sum()).collect()
    }

    /// Σ over subdivisions, one entry per crop.
    pub fn col_sums(&self) -> Vec<f64> {
        let mut sums = vec![0.0; self.cols];
        for r in 0..self.rows {
            for (sum, value) in sums.iter_mut().zip(self.row(r)) {
                *sum += value;
            }
        }
        sums
    }

    /// Multiply every entry by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|v| v * factor).collect(),
        }
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        assert!(
            row < self.rows && col < self.cols,
            "index ({row}, {col}) out of bounds for {}x{} matrix",
            self.rows,
            self.cols
        );
        row * self.cols + col
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_follow_row_major_layout() {
        let m = AllocationMatrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();
        assert_eq!(m.rows(), 2);
        assert_eq!(m.cols(), 3);
        assert_eq!(m.get(1, 0), 4.0);
        assert_eq!(m.row_sums(), vec![6.0, 15.0]);
        assert_eq!(m.col_sums(), vec![5.0, 7.0, 9.0]);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = AllocationMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(matches!(err, AgroError::Validation(_)));
    }

    #[test]
    fn row_major_length_is_checked() {
        assert!(AllocationMatrix::from_row_major(2, 2, vec![1.0; 3]).is_err());
        assert!(AllocationMatrix::from_row_major(2, 2, vec![1.0; 4]).is_ok());
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn out_of_bounds_access_panics() {
        let m = AllocationMatrix::zeros(1, 1);
        m.get(0, 1);
    }
}
