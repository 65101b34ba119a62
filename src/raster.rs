use nalgebra::{DMatrix, Scalar};

use crate::error::{ModelError, ModelResult};

// A scalar value per grid cell
pub type Field = DMatrix<f64>;

// An integer code per grid cell (land-use, farmer/crop, drain direction)
pub type CodeField = DMatrix<u32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub rows: usize,
    pub cols: usize,
}

impl GridShape {
    pub fn new(rows: usize, cols: usize) -> Self {
        GridShape { rows, cols }
    }

    pub fn of<T: Scalar>(field: &DMatrix<T>) -> Self {
        GridShape::new(field.nrows(), field.ncols())
    }

    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Column-major, matching nalgebra's storage order
    pub fn index(&self, row: usize, col: usize) -> usize {
        col * self.rows + row
    }

    pub fn row_col(&self, idx: usize) -> (usize, usize) {
        (idx % self.rows, idx / self.rows)
    }

    pub fn zeros(&self) -> Field {
        Field::zeros(self.rows, self.cols)
    }

    pub fn constant(&self, value: f64) -> Field {
        Field::from_element(self.rows, self.cols, value)
    }

    // Build a field by evaluating `f` at every linear cell index
    pub fn field_from_fn(&self, mut f: impl FnMut(usize) -> f64) -> Field {
        let mut field = self.zeros();
        for (idx, value) in field.iter_mut().enumerate() {
            *value = f(idx);
        }
        field
    }

    // Neighbour of `idx` offset by (`dr`, `dc`), if it lies on the grid
    pub fn offset(&self, idx: usize, dr: isize, dc: isize) -> Option<usize> {
        let (r, c) = self.row_col(idx);
        let nr = r as isize + dr;
        let nc = c as isize + dc;
        if nr < 0 || nc < 0 || nr >= self.rows as isize || nc >= self.cols as isize {
            None
        } else {
            Some(self.index(nr as usize, nc as usize))
        }
    }

    pub fn check<T: Scalar>(&self, name: &str, field: &DMatrix<T>) -> ModelResult<()> {
        if field.nrows() != self.rows || field.ncols() != self.cols {
            return Err(ModelError::ShapeMismatch {
                name: name.to_string(),
                expected: (self.rows, self.cols),
                found: (field.nrows(), field.ncols()),
            });
        }
        Ok(())
    }
}
