//! Small numeric helpers shared across the crate.

use crate::imports::*;

/// Returns true if `a` and `b` agree to within `epsilon`, comparing
/// relatively for large values and absolutely near zero.
pub fn almost_eq(a: f64, b: f64, epsilon: Option<f64>) -> bool {
    let epsilon = epsilon.unwrap_or(1e-8);
    ((a - b) / (a + b)).abs() < epsilon || (a - b).abs() < epsilon
}

/// Locates the lower index of the grid interval containing `target`.
///
/// `arr` must be sorted ascending with at least two elements. A `target`
/// equal to the last grid point maps to the final interval so that callers
/// can always form `[i, i + 1]`.
pub fn find_nearest_index(arr: &[f64], target: f64) -> anyhow::Result<usize> {
    ensure!(
        arr.len() >= 2,
        "interval lookup requires at least 2 grid points, got {}",
        arr.len()
    );
    if &target == arr.last().unwrap() {
        return Ok(arr.len() - 2);
    }

    let mut low = 0;
    let mut high = arr.len() - 1;

    while low < high {
        let mid = low + (high - low) / 2;

        if arr[mid] >= target {
            high = mid;
        } else {
            low = mid + 1;
        }
    }

    if low > 0 && arr[low] >= target {
        Ok(low - 1)
    } else {
        Ok(low)
    }
}
