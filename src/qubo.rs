//! Quadratic unconstrained binary optimisation (QUBO) models.
//!
//! A [`Qubo`] is a dense coefficient matrix `Q` over `n` binary variables. The
//! energy of a state `x` is `sum_{i,j} Q[i,j] x_i x_j`: both triangles count,
//! and since `x_i^2 = x_i` the diagonal holds the linear biases.
//!
//! Constraints are encoded as penalty terms. Each penalty contributes a
//! constant that the matrix cannot express. It is tracked separately as the
//! [`Qubo::offset`], so `energy(x) + offset` is the true objective.

use ndarray::Array2;
use tracing::instrument;

use crate::domain::{matrix::kron, MatrixError, SquareMatrix};

/// A dense QUBO model.
#[derive(Debug, Clone, PartialEq)]
pub struct Qubo {
    matrix: Array2<f64>,
    offset: f64,
}

impl Qubo {
    /// A model over `n` variables with every coefficient zero.
    #[must_use]
    pub fn zeros(n: usize) -> Self {
        Self {
            matrix: Array2::zeros((n, n)),
            offset: 0.0,
        }
    }

    /// Wraps an existing square coefficient matrix.
    ///
    /// # Errors
    ///
    /// Returns [`MatrixError::NotSquare`] if the matrix is not square.
    pub fn from_matrix(matrix: Array2<f64>) -> Result<Self, MatrixError> {
        let (rows, cols) = matrix.dim();
        if rows != cols {
            return Err(MatrixError::NotSquare { rows, cols });
        }
        Ok(Self {
            matrix,
            offset: 0.0,
        })
    }

    /// A model whose matrix is the Kronecker product `a ⊗ b`.
    #[must_use]
    pub fn kronecker(a: &SquareMatrix, b: &SquareMatrix) -> Self {
        Self {
            matrix: kron(a, b),
            offset: 0.0,
        }
    }

    /// The number of binary variables.
    #[must_use]
    pub fn num_variables(&self) -> usize {
        self.matrix.nrows()
    }

    /// The coefficient matrix.
    #[must_use]
    pub const fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    /// The constant the matrix omits.
    #[must_use]
    pub const fn offset(&self) -> f64 {
        self.offset
    }

    /// Adds `bias` to the linear (diagonal) term of `var`.
    ///
    /// # Panics
    ///
    /// Panics if `var` is out of range.
    pub fn add_linear(&mut self, var: usize, bias: f64) {
        self.matrix[[var, var]] += bias;
    }

    /// Penalises any state where the variables in `group` do not contain
    /// exactly one `1`.
    ///
    /// Expands `penalty * (sum x - 1)^2`. Every variable gets `-penalty` on
    /// its diagonal. Every unordered pair gets `+penalty` on both `Q[a, b]`
    /// and `Q[b, a]`. The constant `+penalty` goes to the offset. A
    /// one-hot group therefore contributes exactly zero to the objective.
    ///
    /// # Panics
    ///
    /// Panics if a variable is out of range.
    pub fn add_one_hot_penalty(&mut self, group: &[usize], penalty: f64) {
        for (i, &a) in group.iter().enumerate() {
            self.matrix[[a, a]] -= penalty;
            for &b in &group[i + 1..] {
                self.matrix[[a, b]] += penalty;
                self.matrix[[b, a]] += penalty;
            }
        }
        self.offset += penalty;
    }

    /// The energy of `state`, excluding the offset.
    ///
    /// # Panics
    ///
    /// Panics if `state` does not have one entry per variable.
    #[must_use]
    pub fn energy(&self, state: &[u8]) -> f64 {
        assert_eq!(
            state.len(),
            self.num_variables(),
            "state length must match the number of variables"
        );
        let active: Vec<usize> = state
            .iter()
            .enumerate()
            .filter(|&(_, &bit)| bit != 0)
            .map(|(i, _)| i)
            .collect();
        active
            .iter()
            .map(|&i| active.iter().map(|&j| self.matrix[[i, j]]).sum::<f64>())
            .sum()
    }

    /// The energy of `state` including the offset.
    #[must_use]
    pub fn objective(&self, state: &[u8]) -> f64 {
        self.energy(state) + self.offset
    }

    /// The symmetric interaction matrix used by samplers.
    ///
    /// Off-diagonal entries are `Q[i, j] + Q[j, i]`; the diagonal keeps the
    /// linear biases. Flipping `x_k` then changes the energy by
    /// `(1 - 2 x_k) * (C[k, k] + sum_{j != k} C[k, j] x_j)`.
    #[instrument(level = "trace", skip(self))]
    #[must_use]
    pub fn interactions(&self) -> Array2<f64> {
        let mut couplings = &self.matrix + &self.matrix.t();
        for (k, value) in couplings.diag_mut().iter_mut().enumerate() {
            *value = self.matrix[[k, k]];
        }
        couplings
    }
}
