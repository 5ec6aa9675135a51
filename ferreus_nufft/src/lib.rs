/////////////////////////////////////////////////////////////////////////////////////////////
//
// Exposes the public API and high-level documentation for batched non-uniform FFTs.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Batched non-uniform fast Fourier transforms (NUFFT)
//!
//! Computes, for `M` non-uniform points `x_j` and a rectangular block of
//! integer modes `k`,
//!
//! - **Type 1** (non-uniform to uniform): `f[k] = sum_j c_j exp(+/- i k . x_j)`
//! - **Type 2** (uniform to non-uniform): `c_j = sum_k f[k] exp(+/- i k . x_j)`
//!
//! to a requested relative tolerance in `O(N log N + M w^d)` work, where `w`
//! is the width of the spreading kernel. A direct evaluation costs `O(N M)`.
//!
//! Each transform runs in three stages:
//!
//! - **Spreading** (type 1) or **interpolation** (type 2) between the points
//!   and an upsampled fine grid through the exponential of semicircle kernel,
//!   via the [`ferreus_spreadinterp`] crate. Points are sorted into bins and
//!   split into bounded subproblems so clustered data stays load balanced.
//! - **FFT** of the fine grid, via [`rustfft`].
//! - **Deconvolution** by the kernel's Fourier series, selecting the requested
//!   modes.
//!
//! Check out the examples directory in the repository for more examples of usage.
//!
//! # Features
//! - 1D, 2D and 3D transforms with batches of transforms sharing one point set
//! - Coordinates in `[-pi, pi)` or in fine grid units
//! - Direct or piecewise polynomial (Horner) kernel evaluation
//! - Worker pool "streams" that batches are distributed across
//! - Versioned JSON persistence of plan options
//!
//! # Examples
//!
//! ```
//! use ferreus_nufft::{
//!     Options, Plan, direct_type1, generate_random_points, generate_random_strengths,
//!     relative_error, config::CoordinateConvention,
//! };
//!
//! let num_points = 200;
//! let modes = [24, 16];
//! let tolerance = 1e-6;
//!
//! let points = generate_random_points(num_points, modes.len(), Some(42));
//! let strengths = generate_random_strengths(num_points, Some(7));
//!
//! // Plan a single type 1 transform with a positive exponent
//! let options = Options::from_tolerance(tolerance, 2.0).unwrap();
//! let mut plan = Plan::builder(num_points, &modes, options).iflag(1).build().unwrap();
//!
//! plan.set_points(&points).unwrap();
//! let fk = plan.execute_type1(&strengths).unwrap();
//!
//! // Compare against direct summation
//! let exact = direct_type1(
//!     &points,
//!     &strengths,
//!     &modes,
//!     1,
//!     CoordinateConvention::MinusPiToPi,
//!     plan.fine_grid_sizes(),
//! );
//! assert!(relative_error(&fk, &exact) < 10.0 * tolerance);
//! ```
//!
//! # References
//! 1.  A. H. Barnett, J. F. Magland, and L. af Klinteberg. A parallel non-uniform fast
//!     Fourier transform library based on an "exponential of semicircle" kernel.
//!     SIAM J. Sci. Comput., 41(5):C479–C504, 2019.
//! 2.  Y. Shih, G. Wright, J. Andén, J. Blaschke, and A. H. Barnett. cuFINUFFT: a
//!     load-balanced GPU library for general-purpose nonuniform FFTs. IPDPSW, 2021.
pub mod config;

pub mod progress;

mod common;

mod deconvolve;

mod device;

mod direct;

mod errors;

mod fft;

mod pipeline;

mod plan;

pub use {
    common::{generate_random_points, generate_random_strengths, relative_error},
    config::{
        CoordinateConvention, Options, OptionsBuilder, OptionsIOError, SpreadDirection,
        SpreadMethod,
    },
    deconvolve::kernel_fourier_series,
    direct::{direct_type1, direct_type2},
    errors::{
        ConfigurationError, ExecutionError, GeometryError, NufftError, ResourceError, StateError,
    },
    fft::{FftError, FftSign},
    plan::{MAX_NF, Plan, PlanBuilder, PlanState},
};
