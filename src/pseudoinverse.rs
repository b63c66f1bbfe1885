//! Numerically damped matrix inverses based on the singular value decomposition.
//!
//! Singular values at or below the threshold are dropped rather than inverted, so the
//! inverse stays bounded when the Jacobian approaches a singularity. These routines run
//! inside the control loop and never panic: invalid input produces a zero matrix of the
//! expected shape and an error event.

extern crate nalgebra as na;

use na::DMatrix;
use na::linalg::SVD;
use tracing::error;
use crate::control_error::ControlError;

/// Singular values at or below this are treated as zero.
pub const SINGULAR_VALUE_THRESHOLD: f64 = 1e-6;

/// Pseudoinverse `A⁺ = V Σ⁺ Uᵗ` with the default damping threshold.
pub fn pseudo_inverse(a: &DMatrix<f64>) -> DMatrix<f64> {
    pseudo_inverse_with_threshold(a, SINGULAR_VALUE_THRESHOLD)
}

/// Pseudoinverse where only singular values strictly above `threshold` are inverted.
/// Returns a zero matrix of the transposed shape if the input contains non-finite
/// values or the threshold is negative.
pub fn pseudo_inverse_with_threshold(a: &DMatrix<f64>, threshold: f64) -> DMatrix<f64> {
    let zero = DMatrix::zeros(a.ncols(), a.nrows());
    if a.is_empty() {
        return zero;
    }
    if !a.iter().all(|x| x.is_finite()) {
        error!("pseudo_inverse: matrix contains non-finite values, returning zero");
        return zero;
    }

    let svd = SVD::new(a.clone(), true, true);
    match svd.pseudo_inverse(threshold) {
        Ok(inverse) => inverse,
        Err(msg) => {
            error!("pseudo_inverse: {}", msg);
            zero
        }
    }
}

/// Weighted pseudoinverse `A⁺_W = W⁻¹Aᵗ(A W⁻¹ Aᵗ)⁺`.
///
/// # Arguments
///
/// * `a` - An m x n matrix, typically the Jacobian
/// * `w` - An n x n weighting matrix. Larger entries resist motion of that column more.
/// * `threshold` - Damping threshold for both inverses
///
/// # Returns
///
/// The n x m weighted inverse or an error if `w` is not square or does not match `a`.
pub fn try_weighted_pseudo_inverse(a: &DMatrix<f64>, w: &DMatrix<f64>, threshold: f64)
                                   -> Result<DMatrix<f64>, ControlError> {
    if !w.is_square() {
        return Err(ControlError::NonSquareMatrix { rows: w.nrows(), cols: w.ncols() });
    }
    if a.ncols() != w.nrows() {
        return Err(ControlError::IncompatibleShapes { columns: a.ncols(), weighting_rows: w.nrows() });
    }

    let inv_w = pseudo_inverse_with_threshold(w, threshold);
    let inv_w_at = inv_w * a.transpose(); // Reused on both sides
    let inner = a * &inv_w_at;
    Ok(inv_w_at * pseudo_inverse_with_threshold(&inner, threshold))
}

/// Fail-soft version of [`try_weighted_pseudo_inverse`] with the default threshold:
/// a shape error is logged and an n x m zero matrix is returned instead.
pub fn weighted_pseudo_inverse(a: &DMatrix<f64>, w: &DMatrix<f64>) -> DMatrix<f64> {
    weighted_pseudo_inverse_with_threshold(a, w, SINGULAR_VALUE_THRESHOLD)
}

pub fn weighted_pseudo_inverse_with_threshold(a: &DMatrix<f64>, w: &DMatrix<f64>, threshold: f64)
                                              -> DMatrix<f64> {
    match try_weighted_pseudo_inverse(a, w, threshold) {
        Ok(inverse) => inverse,
        Err(err) => {
            error!("Cannot compute the weighted inverse: {}", err);
            DMatrix::zeros(a.ncols(), a.nrows())
        }
    }
}
