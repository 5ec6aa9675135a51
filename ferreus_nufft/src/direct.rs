/////////////////////////////////////////////////////////////////////////////////////////////
//
// Evaluates type 1 and type 2 non-uniform discrete Fourier transforms by direct summation.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Direct `O(M N)` evaluation of the sums a [`Plan`](crate::Plan) approximates.
//!
//! Useful as a reference for small problems and for measuring accuracy.

use crate::config::CoordinateConvention;
use faer::Mat;
use num_complex::Complex64;
use rayon::prelude::*;

/// Phase per unit mode of every coordinate, `sign * x` or `sign * 2 pi x / nf`.
fn phase_scales(
    points: &Mat<f64>,
    iflag: i32,
    convention: CoordinateConvention,
    fine_grid_sizes: [usize; 3],
) -> Mat<f64> {
    let sign = if iflag >= 0 { 1.0 } else { -1.0 };
    Mat::from_fn(points.nrows(), points.ncols(), |j, d| match convention {
        CoordinateConvention::MinusPiToPi => sign * points[(j, d)],
        CoordinateConvention::ZeroToN => {
            sign * std::f64::consts::TAU * points[(j, d)] / fine_grid_sizes[d] as f64
        }
    })
}

/// Integer modes of one transform, increasing from `-(m/2)` with x fastest.
fn mode_list(mode_counts: &[usize]) -> Vec<[i64; 3]> {
    let mut counts = [1usize; 3];
    counts[..mode_counts.len()].copy_from_slice(mode_counts);
    let total: usize = counts.iter().product();
    let first = counts.map(|m| -((m / 2) as i64));

    (0..total)
        .map(|i| {
            let k1 = i % counts[0];
            let k2 = (i / counts[0]) % counts[1];
            let k3 = i / (counts[0] * counts[1]);
            [first[0] + k1 as i64, first[1] + k2 as i64, first[2] + k3 as i64]
        })
        .collect()
}

#[inline(always)]
fn phase(scales: &Mat<f64>, j: usize, k: &[i64; 3]) -> f64 {
    (0..scales.ncols()).map(|d| k[d] as f64 * scales[(j, d)]).sum()
}

/// `f[k] = sum_j c_j exp(sign(iflag) i k . x_j)` by direct summation.
///
/// `fine_grid_sizes` is only used for [`CoordinateConvention::ZeroToN`]
/// coordinates, which are measured in fine grid units.
pub fn direct_type1(
    points: &Mat<f64>,
    strengths: &[Complex64],
    mode_counts: &[usize],
    iflag: i32,
    convention: CoordinateConvention,
    fine_grid_sizes: [usize; 3],
) -> Vec<Complex64> {
    let scales = phase_scales(points, iflag, convention, fine_grid_sizes);
    mode_list(mode_counts)
        .par_iter()
        .map(|k| {
            strengths
                .iter()
                .enumerate()
                .map(|(j, c)| c * Complex64::from_polar(1.0, phase(&scales, j, k)))
                .sum::<Complex64>()
        })
        .collect()
}

/// `c_j = sum_k f[k] exp(sign(iflag) i k . x_j)` by direct summation.
pub fn direct_type2(
    points: &Mat<f64>,
    modes: &[Complex64],
    mode_counts: &[usize],
    iflag: i32,
    convention: CoordinateConvention,
    fine_grid_sizes: [usize; 3],
) -> Vec<Complex64> {
    let scales = phase_scales(points, iflag, convention, fine_grid_sizes);
    let ks = mode_list(mode_counts);
    (0..points.nrows())
        .into_par_iter()
        .map(|j| {
            ks.iter()
                .zip(modes.iter())
                .map(|(k, f)| f * Complex64::from_polar(1.0, phase(&scales, j, k)))
                .sum::<Complex64>()
        })
        .collect()
}
