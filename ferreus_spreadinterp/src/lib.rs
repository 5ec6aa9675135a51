/////////////////////////////////////////////////////////////////////////////////////////////
//
// Exposes the public API for the bin-sorted spreading and interpolation crate.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! # Spreading and interpolation of non-uniform points
//!
//! This crate is the data-parallel core of the `ferreus_nufft` crate. It
//! moves values between `M` non-uniform points and a uniform fine grid through
//! a compactly supported kernel:
//!
//! - **Spreading** (scatter): `grid[X] += sum_j c_j * phi(X - x_j)`
//! - **Interpolation** (gather): `c_j = sum_X grid[X] * phi(X - x_j)`
//!
//! Points are rescaled onto the grid, counting-sorted into rectangular bins and
//! split into subproblems of bounded size, so that clustered point sets still
//! spread evenly across workers. Each subproblem accumulates into a private tile
//! and flushes it into the shared grid with atomic adds.
//!
//! # Features:
//! - 1D, 2D and 3D grids with periodic wraparound
//! - Subproblem (tiled) and point-driven work decomposition
//! - Any kernel implementing [`SpreadKernel`](ferreus_nufft_utils::SpreadKernel)
//!
//! # Example: Spreading a single point
//!
//! ```
//! use ferreus_spreadinterp::{
//!     AtomicGrid, BinLayout, BinSort, Dimensions, GridShape, NonUniformPoints, RescaleMode,
//!     SpreadStrategy, Spreader, Subproblems,
//! };
//! use ferreus_nufft_utils::{EsKernelParams, KernelFromParams, kernels::EsKernel};
//! use faer::Mat;
//! use num_complex::Complex64;
//!
//! let params = EsKernelParams::for_tolerance(1e-6, 2.0).unwrap();
//! let shape = GridShape::new(Dimensions::One, &[64]);
//! let layout = BinLayout::new(&shape, [32, 32, 16], params.nspread).unwrap();
//!
//! let raw = Mat::from_fn(1, 1, |_, _| 10.0);
//! let points = NonUniformPoints::from_points(&raw, &shape, RescaleMode::ZeroToN).unwrap();
//! let sort = BinSort::new(&points, &layout).unwrap();
//! let subproblems = Subproblems::new(&sort, 1024).unwrap();
//!
//! let spreader = Spreader::new(
//!     EsKernel::from_params(&params),
//!     shape,
//!     layout,
//!     SpreadStrategy::Subproblem,
//! );
//!
//! let grid = AtomicGrid::new(shape.len()).unwrap();
//! spreader
//!     .spread(&points, &sort, &subproblems, &[Complex64::new(1.0, 0.0)], grid.slot(0, shape.len()))
//!     .unwrap();
//!
//! let mut values = vec![Complex64::new(0.0, 0.0); shape.len()];
//! grid.write_into(&mut values);
//! assert!((values[10].re - 1.0).abs() < 1e-12);
//! ```
mod atomic_grid;
mod binning;
mod spreadinterp;
mod subproblems;

pub use {
    atomic_grid::{AtomicGrid, AtomicGridSlot},
    binning::{BinLayout, BinSort, NonUniformPoints, rescale},
    spreadinterp::{Dimensions, GridShape, RescaleMode, SpreadError, SpreadStrategy, Spreader},
    subproblems::Subproblems,
};
