/////////////////////////////////////////////////////////////////////////////////////////////
//
// Computes kernel Fourier coefficients and moves values between fine grids and mode arrays.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{config::CoordinateConvention, device::DeviceBuffer, errors::ResourceError};
use ferreus_nufft_utils::{gauss_legendre, kernels::EsKernel};
use ferreus_spreadinterp::GridShape;
use num_complex::Complex64;
use rayon::prelude::*;

/// Fourier series coefficients of the kernel, `phi_hat(k)` for `k` in `0..=nf/2`.
///
/// Computed by Gauss-Legendre quadrature over the kernel support using
/// `2 + 3 w / 2` positive nodes. The coefficients are real and even in `k`.
pub fn kernel_fourier_series(nf: usize, kernel: &EsKernel) -> Vec<f64> {
    let half_width = kernel.params().halfwidth;
    let q = (2.0 + 3.0 * half_width) as usize;
    let (nodes, weights) = gauss_legendre(2 * q);

    let positive: Vec<(f64, f64)> = nodes
        .iter()
        .zip(weights.iter())
        .filter(|(z, _)| **z > 0.0)
        .map(|(z, w)| {
            let t = half_width * z;
            (t, 2.0 * half_width * w * kernel.phi(t))
        })
        .collect();

    (0..=nf / 2)
        .into_par_iter()
        .map(|k| {
            let omega = std::f64::consts::TAU * k as f64 / nf as f64;
            positive
                .iter()
                .map(|(t, scaled)| scaled * (omega * t).cos())
                .sum::<f64>()
        })
        .collect()
}

/// Per dimension lookup of a mode: fine grid index and correction factor.
#[derive(Debug, Clone)]
struct ModeAxis {
    grid_index: DeviceBuffer<usize>,
    factor: DeviceBuffer<f64>,
}

/// Applies or removes the kernel's Fourier weights between a fine grid and mode array.
#[derive(Debug, Clone)]
pub struct Deconvolver {
    mode_counts: [usize; 3],
    shape: GridShape,
    fwker: Vec<DeviceBuffer<f64>>,
    axes: [ModeAxis; 3],
}

impl Deconvolver {
    pub fn new(
        mode_counts: [usize; 3],
        shape: GridShape,
        kernel: &EsKernel,
        convention: CoordinateConvention,
    ) -> Result<Self, ResourceError> {
        let nf = shape.nf();
        let active = shape.dimensions().count();

        let fwker: Vec<DeviceBuffer<f64>> = (0..active)
            .map(|d| {
                DeviceBuffer::from_vec("kernel fourier series", kernel_fourier_series(nf[d], kernel))
            })
            .collect();

        let axis = |d: usize| match d < active {
            true => mode_axis(mode_counts[d], nf[d], fwker[d].as_slice(), convention),
            false => Ok(ModeAxis {
                grid_index: DeviceBuffer::from_vec("mode index", vec![0]),
                factor: DeviceBuffer::from_vec("deconvolution factor", vec![1.0]),
            }),
        };
        let axes = [axis(0)?, axis(1)?, axis(2)?];

        Ok(Deconvolver {
            mode_counts,
            shape,
            fwker,
            axes,
        })
    }

    /// Kernel Fourier series of dimension `d`. Empty once released.
    pub fn fwker(&self, d: usize) -> &[f64] {
        self.fwker.get(d).map_or(&[], |series| series.as_slice())
    }

    /// Frees the kernel series and mode tables. Afterwards no modes are written.
    pub fn release(&mut self) {
        self.fwker = Vec::new();
        for axis in self.axes.iter_mut() {
            axis.grid_index.release();
            axis.factor.release();
        }
        self.mode_counts = [0; 3];
    }

    /// Number of modes per transform.
    pub fn num_modes(&self) -> usize {
        self.mode_counts.iter().product()
    }

    /// Type 1: `fk[k] = fw[k mod nf] * eps(k) / phi_hat(k)` for one transform.
    pub fn deconvolve(&self, fw: &[Complex64], fk: &mut [Complex64]) {
        let m1 = self.mode_counts[0];
        if m1 == 0 {
            return;
        }
        let [ax, ay, az] = self
            .axes
            .each_ref()
            .map(|a| (a.grid_index.as_slice(), a.factor.as_slice()));
        let mt = self.mode_counts[1];

        fk.par_chunks_mut(m1).enumerate().for_each(|(row, out)| {
            let (k2, k3) = (row % mt, row / mt);
            let cross = ay.1[k2] * az.1[k3];
            let base = self
                .shape
                .linear_index([0, ay.0[k2], az.0[k3]]);
            for (k1, value) in out.iter_mut().enumerate() {
                *value = fw[base + ax.0[k1]] * (ax.1[k1] * cross);
            }
        });
    }

    /// Type 2: zeroes `fw`, then writes `fw[k mod nf] = fk[k] * eps(k) / phi_hat(k)` for one transform.
    pub fn reconvolve(&self, fk: &[Complex64], fw: &mut [Complex64]) {
        fw.par_iter_mut()
            .for_each(|value| *value = Complex64::new(0.0, 0.0));

        let m1 = self.mode_counts[0];
        if m1 == 0 {
            return;
        }
        let [ax, ay, az] = self
            .axes
            .each_ref()
            .map(|a| (a.grid_index.as_slice(), a.factor.as_slice()));
        let mt = self.mode_counts[1];

        // Distinct modes land on distinct cells since m <= nf.
        for (row, input) in fk.chunks(m1).enumerate() {
            let (k2, k3) = (row % mt, row / mt);
            let cross = ay.1[k2] * az.1[k3];
            let base = self
                .shape
                .linear_index([0, ay.0[k2], az.0[k3]]);
            for (k1, value) in input.iter().enumerate() {
                fw[base + ax.0[k1]] = value * (ax.1[k1] * cross);
            }
        }
    }
}

/// Modes `k` in `-(m/2)..=(m-1)/2`, increasing.
fn mode_axis(
    m: usize,
    nf: usize,
    fwker: &[f64],
    convention: CoordinateConvention,
) -> Result<ModeAxis, ResourceError> {
    let mut grid_index = DeviceBuffer::filled("mode index", m, 0usize)?;
    let mut factor = DeviceBuffer::filled("deconvolution factor", m, 0.0f64)?;

    let first = -((m / 2) as i64);
    for i in 0..m {
        let k = first + i as i64;
        let sign = match convention {
            CoordinateConvention::MinusPiToPi if k.rem_euclid(2) == 1 => -1.0,
            _ => 1.0,
        };
        grid_index.as_mut_slice()[i] = k.rem_euclid(nf as i64) as usize;
        factor.as_mut_slice()[i] = sign / fwker[k.unsigned_abs() as usize];
    }

    Ok(ModeAxis { grid_index, factor })
}
