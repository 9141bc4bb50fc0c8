use std::ops::Deref;

use ndarray::Array2;

/// A non-empty square matrix with finite entries.
///
/// Flow and distance matrices of a QAP instance are both represented by this
/// type. Validation happens once, at construction, so everything downstream
/// can index freely.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareMatrix(Array2<f64>);

impl SquareMatrix {
    /// Wraps an existing array.
    ///
    /// # Errors
    ///
    /// Returns an error if the array is empty, not square, or contains a
    /// `NaN` or infinite entry.
    pub fn new(array: Array2<f64>) -> Result<Self, MatrixError> {
        let (rows, cols) = array.dim();
        if rows == 0 || cols == 0 {
            return Err(MatrixError::Empty);
        }
        if rows != cols {
            return Err(MatrixError::NotSquare { rows, cols });
        }
        if let Some(((row, col), _)) = array.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(MatrixError::NonFinite { row, col });
        }
        Ok(Self(array))
    }

    /// Builds a matrix from a list of rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the rows have differing lengths, or for any of the
    /// reasons listed on [`SquareMatrix::new`].
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, MatrixError> {
        let n_rows = rows.len();
        let expected = rows.first().map_or(0, Vec::len);
        if let Some((row, found)) = rows
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|&(_, len)| len != expected)
        {
            return Err(MatrixError::Ragged {
                row,
                expected,
                found,
            });
        }

        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let array = Array2::from_shape_vec((n_rows, expected), flat)
            .map_err(|_| MatrixError::Empty)?;
        Self::new(array)
    }

    /// The number of rows (equal to the number of columns).
    #[must_use]
    pub fn size(&self) -> usize {
        self.0.nrows()
    }

    /// Returns the rows as nested vectors.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.0.rows().into_iter().map(|row| row.to_vec()).collect()
    }
}

impl Deref for SquareMatrix {
    type Target = Array2<f64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<Array2<f64>> for SquareMatrix {
    type Error = MatrixError;

    fn try_from(value: Array2<f64>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<Vec<Vec<f64>>> for SquareMatrix {
    type Error = MatrixError;

    fn try_from(value: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Self::from_rows(value)
    }
}

/// Checks that a flow and a distance matrix describe the same number of
/// facilities and locations.
///
/// # Errors
///
/// Returns [`MatrixError::SizeMismatch`] if the sizes differ.
pub fn ensure_same_size(flow: &SquareMatrix, dist: &SquareMatrix) -> Result<(), MatrixError> {
    if flow.size() == dist.size() {
        Ok(())
    } else {
        Err(MatrixError::SizeMismatch {
            flow: flow.size(),
            dist: dist.size(),
        })
    }
}

/// The Kronecker product of two matrices.
///
/// For an outer matrix of shape `p x q` and an inner one of shape `r x s` the
/// result has shape `pr x qs`, with entry
/// `[i*r + m, j*s + n] = outer[i, j] * inner[m, n]`.
#[must_use]
pub fn kron(outer: &Array2<f64>, inner: &Array2<f64>) -> Array2<f64> {
    let (outer_rows, outer_cols) = outer.dim();
    let (block_rows, block_cols) = inner.dim();
    let mut out = Array2::zeros((outer_rows * block_rows, outer_cols * block_cols));
    for ((row, col), &weight) in outer.indexed_iter() {
        if weight == 0.0 {
            continue;
        }
        let rows = row * block_rows..(row + 1) * block_rows;
        let cols = col * block_cols..(col + 1) * block_cols;
        out.slice_mut(ndarray::s![rows, cols])
            .assign(&(inner * weight));
    }
    out
}

/// Errors raised while validating a matrix.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MatrixError {
    /// The matrix has no entries.
    #[error("matrix must not be empty")]
    Empty,

    /// A row has a different length to the first row.
    #[error("row {row} has {found} entries, expected {expected}")]
    Ragged {
        /// Index of the offending row.
        row: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },

    /// The matrix is not square.
    #[error("matrix must be square (rows = columns), found {rows}x{cols}")]
    NotSquare {
        /// Number of rows.
        rows: usize,
        /// Number of columns.
        cols: usize,
    },

    /// An entry is `NaN` or infinite.
    #[error("entry ({row}, {col}) is not a finite number")]
    NonFinite {
        /// Row of the offending entry.
        row: usize,
        /// Column of the offending entry.
        col: usize,
    },

    /// The flow and distance matrices have different sizes.
    #[error("flow matrix is {flow}x{flow} but distance matrix is {dist}x{dist}")]
    SizeMismatch {
        /// Size of the flow matrix.
        flow: usize,
        /// Size of the distance matrix.
        dist: usize,
    },
}
