/////////////////////////////////////////////////////////////////////////////////////////////
//
// Declares the spreading kernel trait and construction from shared kernel parameters.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::kernel_helpers::EsKernelParams;

/// Evaluates a separable, compactly supported spreading kernel in one dimension.
///
/// The kernel is supported on `[-width/2, width/2]` in fine grid units. A point
/// at rescaled coordinate `X` touches the `width` grid cells starting at
/// `i0 = ceil(X - width/2)`, and `x1 = i0 - X` is the offset of the first of them.
pub trait SpreadKernel: Send + Sync {
    /// Kernel width in fine grid points.
    fn width(&self) -> usize;

    /// Evaluates the kernel at a single offset.
    fn evaluate(&self, x: f64) -> f64;

    /// Writes the weights `phi(x1 + l)` for `l` in `0..width()` into `weights`.
    #[inline(always)]
    fn evaluate_footprint(&self, x1: f64, weights: &mut [f64]) {
        for (l, weight) in weights.iter_mut().take(self.width()).enumerate() {
            *weight = self.evaluate(x1 + l as f64);
        }
    }
}

/// Converts a shared [`EsKernelParams`] configuration into a concrete kernel type.
pub trait KernelFromParams: Sized {
    /// Constructs `Self` from a set of kernel shape parameters.
    fn from_params(p: &EsKernelParams) -> Self;
}
