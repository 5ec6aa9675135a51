/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines limits and calibrated shape constants for the exponential of semicircle kernel.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

/// Largest supported kernel width, in fine grid points.
pub const MAX_NSPREAD: usize = 16;

/// Smallest kernel width that still resolves the kernel's support.
pub const MIN_NSPREAD: usize = 2;

/// Highest polynomial degree tabulated per unit interval for Horner evaluation.
pub const MAX_HORNER_DEGREE: usize = 19;

/// Number of extra polynomial degrees beyond the kernel width used when
/// tabulating the piecewise Horner approximation.
pub const HORNER_DEGREE_PADDING: usize = 3;

/// Upsampling factor for which the kernel shape has been calibrated.
pub const DEFAULT_UPSAMPLING_FACTOR: f64 = 2.0;

/// Calibrated `beta / nspread` ratios for the default upsampling factor.
///
/// Indexed by kernel width, widths beyond the table use [`BETA_OVER_NS_DEFAULT`].
pub const BETA_OVER_NS_SMALL_WIDTHS: [(usize, f64); 3] = [(2, 2.20), (3, 2.26), (4, 2.38)];

/// `beta / nspread` used for all widths not present in [`BETA_OVER_NS_SMALL_WIDTHS`].
pub const BETA_OVER_NS_DEFAULT: f64 = 2.30;

/// Shape factor applied to `beta` for non-default upsampling factors.
pub const BETA_NON_DEFAULT_SCALING: f64 = 0.97;
