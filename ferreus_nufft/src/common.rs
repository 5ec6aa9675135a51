/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines shared helpers for random point and strength generation and error measurement.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use faer::Mat;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

fn rng_from_seed(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Generate a matrix of random points in `[-pi, pi)^d`.
///
/// # Parameters
/// - `n`: Number of points to generate (rows in the output matrix).
/// - `d`: Number of spatial dimensions per point (columns in the output matrix).
/// - `seed`: Optional random seed.
///   - If `Some(seed)` is provided, the same sequence of points will be generated
///     deterministically across runs and platforms (useful for reproducible tests).
///   - If `None`, the generator is seeded from the operating system's randomness source.
///
/// # Example
/// ```
/// use ferreus_nufft::generate_random_points;
///
/// // Generate 100 reproducible 3D points
/// let pts = generate_random_points(100, 3, Some(42));
/// assert_eq!(pts.ncols(), 3);
/// ```
pub fn generate_random_points(n: usize, d: usize, seed: Option<u64>) -> Mat<f64> {
    let mut rng = rng_from_seed(seed);
    Mat::from_fn(n, d, |_, _| rng.random_range(-PI..PI))
}

/// Generate `n` complex values with real and imaginary parts in `[-1, 1)`.
pub fn generate_random_strengths(n: usize, seed: Option<u64>) -> Vec<Complex64> {
    let mut rng = rng_from_seed(seed);
    (0..n)
        .map(|_| Complex64::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)))
        .collect()
}

/// Relative l2 error `||approx - exact|| / ||exact||`.
///
/// Returns the absolute error when `exact` is zero.
pub fn relative_error(approx: &[Complex64], exact: &[Complex64]) -> f64 {
    let diff: f64 = approx
        .iter()
        .zip(exact.iter())
        .map(|(a, e)| (a - e).norm_sqr())
        .sum();
    let norm: f64 = exact.iter().map(|e| e.norm_sqr()).sum();

    match norm > 0.0 {
        true => (diff / norm).sqrt(),
        false => diff.sqrt(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_generation_is_reproducible_and_in_range() {
        let a = generate_random_points(50, 2, Some(9));
        let b = generate_random_points(50, 2, Some(9));
        assert_eq!(a, b);
        for j in 0..50 {
            for d in 0..2 {
                assert!(a[(j, d)] >= -PI && a[(j, d)] < PI);
            }
        }
    }

    #[test]
    fn relative_error_of_identical_vectors_is_zero() {
        let v = generate_random_strengths(10, Some(1));
        assert_eq!(relative_error(&v, &v), 0.0);
        let doubled: Vec<Complex64> = v.iter().map(|x| x * 2.0).collect();
        assert!((relative_error(&doubled, &v) - 1.0).abs() < 1e-14);
    }
}
