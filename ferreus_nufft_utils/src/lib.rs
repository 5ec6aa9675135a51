/////////////////////////////////////////////////////////////////////////////////////////////
//
// Re-exports spreading kernels, constants, and helper functions used across the ferreus_nufft crates.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Utilities for the `ferreus_nufft` and `ferreus_spreadinterp` crates
//!
//! Provides the exponential of semicircle (ES) spreading kernel, its piecewise
//! polynomial (Horner) approximation, and the small numerical helpers both
//! crates share.
//!
//! ```
//! use ferreus_nufft_utils::{EsKernelParams, KernelFromParams, SpreadKernel, kernels::EsKernel};
//!
//! let params = EsKernelParams::for_tolerance(1e-6, 2.0).unwrap();
//! let kernel = EsKernel::from_params(&params);
//!
//! let mut weights = vec![0.0; kernel.width()];
//! kernel.evaluate_footprint(-params.halfwidth + 0.5, &mut weights);
//! assert!(weights.iter().all(|w| *w >= 0.0));
//! ```
pub mod constants;
mod es_kernel;
mod horner;
mod kernel_helpers;
mod traits;
mod utils;

/// Spreading kernels implementing [`SpreadKernel`].
pub mod kernels {
    pub use super::es_kernel::*;
    pub use super::horner::*;
}

use es_kernel::EsKernel;

pub use {
    kernel_helpers::{EsKernelParams, EsKernelParamsBuilder, KernelParamsError},
    traits::{KernelFromParams, SpreadKernel},
    utils::{exclusive_prefix_sum, gauss_legendre, next235even},
};
