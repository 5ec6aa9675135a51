/////////////////////////////////////////////////////////////////////////////////////////////
//
// Wraps rustfft into a batched, multi-dimensional, unnormalised in-place FFT over fine grids.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use ferreus_spreadinterp::GridShape;
use num_complex::Complex64;
use rayon::prelude::*;
use rustfft::{Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

/// Errors raised by the FFT layer.
#[derive(Debug, Clone, PartialEq)]
pub enum FftError {
    /// The buffer does not hold a whole number of grids of the planned size.
    ShapeMismatch { expected: usize, actual: usize },

    /// An axis of the planned grid has zero length.
    EmptyAxis { dimension: usize },

    /// Working memory for the strided axes could not be allocated.
    Allocation { elements: usize },
}

impl fmt::Display for FftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FftError::ShapeMismatch { expected, actual } => write!(
                f,
                "buffer of {} values is not a whole number of {}-cell grids",
                actual, expected
            ),
            FftError::EmptyAxis { dimension } => {
                write!(f, "axis {} of the FFT grid has zero length", dimension)
            }
            FftError::Allocation { elements } => {
                write!(f, "failed to allocate {} FFT work values", elements)
            }
        }
    }
}

impl std::error::Error for FftError {}

/// Sign of the exponent in the transform, `exp(sign * 2 pi i k n / N)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FftSign {
    Positive,
    Negative,
}

impl FftSign {
    /// `iflag >= 0` maps to the positive exponent.
    pub fn from_iflag(iflag: i32) -> Self {
        match iflag >= 0 {
            true => FftSign::Positive,
            false => FftSign::Negative,
        }
    }
}

/// An unnormalised FFT over every grid of a contiguous batch, x fastest.
pub struct FftPlan {
    shape: GridShape,
    axes: Vec<Arc<dyn Fft<f64>>>,
}

impl fmt::Debug for FftPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftPlan")
            .field("shape", &self.shape)
            .field("axes", &self.axes.len())
            .finish()
    }
}

impl FftPlan {
    pub fn new(shape: GridShape, sign: FftSign) -> Result<Self, FftError> {
        let nf = shape.nf();
        let mut planner = FftPlanner::<f64>::new();

        let axes = (0..shape.dimensions().count())
            .map(|d| {
                if nf[d] == 0 {
                    return Err(FftError::EmptyAxis { dimension: d });
                }
                Ok(match sign {
                    FftSign::Positive => planner.plan_fft_inverse(nf[d]),
                    FftSign::Negative => planner.plan_fft_forward(nf[d]),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FftPlan { shape, axes })
    }

    pub fn shape(&self) -> &GridShape {
        &self.shape
    }

    /// Drops the per-axis plans and their twiddle tables.
    pub fn release(&mut self) {
        self.axes = Vec::new();
    }

    pub fn is_released(&self) -> bool {
        self.axes.is_empty()
    }

    /// Transforms every grid in `data` in place.
    pub fn execute(&self, data: &mut [Complex64]) -> Result<(), FftError> {
        let grid_len = self.shape.len();
        if grid_len == 0 || data.len() % grid_len != 0 {
            return Err(FftError::ShapeMismatch {
                expected: grid_len,
                actual: data.len(),
            });
        }

        let nf = self.shape.nf();
        for grid in data.chunks_mut(grid_len) {
            for (d, fft) in self.axes.iter().enumerate() {
                let inner: usize = nf[..d].iter().product();
                transform_axis(grid, fft, inner, nf[d])?;
            }
        }

        Ok(())
    }
}

/// Transforms the axis of length `len` and stride `inner` for every block of `len * inner` values.
fn transform_axis(
    grid: &mut [Complex64],
    fft: &Arc<dyn Fft<f64>>,
    inner: usize,
    len: usize,
) -> Result<(), FftError> {
    let scratch_len = fft.get_inplace_scratch_len();

    if inner == 1 {
        grid.par_chunks_mut(len).for_each_init(
            || vec![Complex64::new(0.0, 0.0); scratch_len],
            |scratch, line| fft.process_with_scratch(line, scratch),
        );
        return Ok(());
    }

    let block_len = len * inner;
    let mut lines: Vec<Complex64> = Vec::new();
    lines
        .try_reserve_exact(block_len)
        .map_err(|_| FftError::Allocation {
            elements: block_len,
        })?;
    lines.resize(block_len, Complex64::new(0.0, 0.0));

    for block in grid.chunks_mut(block_len) {
        // Gather each strided line into contiguous storage.
        lines.par_chunks_mut(len).enumerate().for_each(|(i, line)| {
            for (k, value) in line.iter_mut().enumerate() {
                *value = block[k * inner + i];
            }
        });

        lines.par_chunks_mut(len).for_each_init(
            || vec![Complex64::new(0.0, 0.0); scratch_len],
            |scratch, line| fft.process_with_scratch(line, scratch),
        );

        block.par_chunks_mut(inner).enumerate().for_each(|(k, row)| {
            for (i, value) in row.iter_mut().enumerate() {
                *value = lines[i * len + k];
            }
        });
    }

    Ok(())
}
