/////////////////////////////////////////////////////////////////////////////////////////////
//
// Provides parameter and builder types for configuring the exponential of semicircle kernel.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::constants::{
    BETA_NON_DEFAULT_SCALING, BETA_OVER_NS_DEFAULT, BETA_OVER_NS_SMALL_WIDTHS,
    DEFAULT_UPSAMPLING_FACTOR, MAX_NSPREAD, MIN_NSPREAD,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relative slack allowed when comparing `halfwidth` and `c` against `nspread`.
const SHAPE_RELATIVE_TOLERANCE: f64 = 1e-12;

/// Errors raised while deriving or validating kernel shape parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelParamsError {
    /// The requested tolerance is zero, negative or not finite.
    ToleranceNotPositive { tolerance: f64 },

    /// The requested tolerance needs a kernel wider than [`MAX_NSPREAD`].
    ToleranceUnattainable {
        tolerance: f64,
        required_width: usize,
    },

    /// The upsampling factor must be finite and strictly greater than one.
    InvalidUpsamplingFactor { upsampling_factor: f64 },

    /// The kernel width lies outside `[MIN_NSPREAD, MAX_NSPREAD]`.
    InvalidWidth { nspread: usize },

    /// One of `beta`, `halfwidth` or `c` is not a positive finite number.
    InvalidShape { name: &'static str, value: f64 },

    /// `halfwidth` is not `nspread / 2`, or `c` is not `1 / halfwidth^2`.
    InconsistentShape {
        nspread: usize,
        halfwidth: f64,
        c: f64,
    },
}

impl fmt::Display for KernelParamsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelParamsError::ToleranceNotPositive { tolerance } => {
                write!(f, "tolerance must be positive and finite, got {}", tolerance)
            }
            KernelParamsError::ToleranceUnattainable {
                tolerance,
                required_width,
            } => write!(
                f,
                "tolerance {:e} requires a kernel width of {} but the maximum is {}",
                tolerance, required_width, MAX_NSPREAD
            ),
            KernelParamsError::InvalidUpsamplingFactor { upsampling_factor } => write!(
                f,
                "upsampling factor must be greater than 1, got {}",
                upsampling_factor
            ),
            KernelParamsError::InvalidWidth { nspread } => write!(
                f,
                "kernel width {} is outside the supported range [{}, {}]",
                nspread, MIN_NSPREAD, MAX_NSPREAD
            ),
            KernelParamsError::InvalidShape { name, value } => {
                write!(f, "kernel shape parameter {} must be positive, got {}", name, value)
            }
            KernelParamsError::InconsistentShape {
                nspread,
                halfwidth,
                c,
            } => write!(
                f,
                "kernel of width {} needs halfwidth {} and c {}, got halfwidth {} and c {}",
                nspread,
                *nspread as f64 / 2.0,
                4.0 / (nspread * nspread) as f64,
                halfwidth,
                c
            ),
        }
    }
}

impl std::error::Error for KernelParamsError {}

/// Shape parameters of the exponential of semicircle (ES) kernel
///
/// `phi(x) = exp(beta * (sqrt(1 - c * x^2) - 1))` for `|x| < halfwidth`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EsKernelParams {
    /// Kernel width in fine grid points.
    pub nspread: usize,

    /// Exponential shape parameter.
    pub beta: f64,

    /// Half of the kernel support, `nspread / 2`.
    pub halfwidth: f64,

    /// Normalisation constant of the semicircle, `4 / nspread^2`.
    pub c: f64,
}

impl EsKernelParams {
    /// Begins building an [`EsKernelParams`] instance for the given width.
    pub fn builder(nspread: usize) -> EsKernelParamsBuilder {
        EsKernelParamsBuilder {
            nspread,
            beta: BETA_OVER_NS_DEFAULT * nspread as f64,
            halfwidth: nspread as f64 / 2.0,
            c: 4.0 / (nspread * nspread) as f64,
        }
    }

    /// Derives the kernel width and shape required to reach `tolerance` at the
    /// given upsampling factor.
    pub fn for_tolerance(tolerance: f64, upsampling_factor: f64) -> Result<Self, KernelParamsError> {
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(KernelParamsError::ToleranceNotPositive { tolerance });
        }
        if !(upsampling_factor.is_finite() && upsampling_factor > 1.0) {
            return Err(KernelParamsError::InvalidUpsamplingFactor { upsampling_factor });
        }

        let default_sigma = upsampling_factor == DEFAULT_UPSAMPLING_FACTOR;

        let width = match default_sigma {
            true => (-(tolerance / 10.0).log10()).ceil(),
            false => {
                (-tolerance.ln() / (std::f64::consts::PI * (1.0 - 1.0 / upsampling_factor).sqrt()))
                    .ceil()
            }
        };

        let nspread = (width.max(MIN_NSPREAD as f64)) as usize;

        if nspread > MAX_NSPREAD {
            return Err(KernelParamsError::ToleranceUnattainable {
                tolerance,
                required_width: nspread,
            });
        }

        let beta = match default_sigma {
            true => {
                let beta_over_ns = BETA_OVER_NS_SMALL_WIDTHS
                    .iter()
                    .find(|(w, _)| *w == nspread)
                    .map(|(_, b)| *b)
                    .unwrap_or(BETA_OVER_NS_DEFAULT);
                beta_over_ns * nspread as f64
            }
            false => {
                BETA_NON_DEFAULT_SCALING
                    * std::f64::consts::PI
                    * nspread as f64
                    * (1.0 - 1.0 / (2.0 * upsampling_factor))
            }
        };

        EsKernelParams::builder(nspread).beta(beta).build()
    }

    /// Checks that the parameters describe a usable kernel.
    pub fn validate(&self) -> Result<(), KernelParamsError> {
        if self.nspread < MIN_NSPREAD || self.nspread > MAX_NSPREAD {
            return Err(KernelParamsError::InvalidWidth {
                nspread: self.nspread,
            });
        }
        for (name, value) in [("beta", self.beta), ("halfwidth", self.halfwidth), ("c", self.c)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(KernelParamsError::InvalidShape { name, value });
            }
        }

        // Footprints and Horner tables both span exactly nspread cells.
        let expected_halfwidth = self.nspread as f64 / 2.0;
        let halfwidth_matches = (self.halfwidth - expected_halfwidth).abs()
            <= SHAPE_RELATIVE_TOLERANCE * expected_halfwidth;
        let c_matches =
            (self.c * self.halfwidth * self.halfwidth - 1.0).abs() <= SHAPE_RELATIVE_TOLERANCE;
        if !(halfwidth_matches && c_matches) {
            return Err(KernelParamsError::InconsistentShape {
                nspread: self.nspread,
                halfwidth: self.halfwidth,
                c: self.c,
            });
        }
        Ok(())
    }
}

/// Builder for [`EsKernelParams`] that starts from the standard shape for a width.
#[derive(Debug, Clone, Copy)]
pub struct EsKernelParamsBuilder {
    nspread: usize,
    beta: f64,
    halfwidth: f64,
    c: f64,
}

impl EsKernelParamsBuilder {
    /// Sets the `beta` parameter on the builder.
    pub fn beta(mut self, v: f64) -> Self {
        self.beta = v;
        self
    }

    /// Sets the `halfwidth` parameter on the builder.
    pub fn halfwidth(mut self, v: f64) -> Self {
        self.halfwidth = v;
        self
    }

    /// Sets the `c` parameter on the builder.
    pub fn c(mut self, v: f64) -> Self {
        self.c = v;
        self
    }

    /// Finalises the builder into a validated [`EsKernelParams`] value.
    pub fn build(self) -> Result<EsKernelParams, KernelParamsError> {
        let params = EsKernelParams {
            nspread: self.nspread,
            beta: self.beta,
            halfwidth: self.halfwidth,
            c: self.c,
        };
        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_follows_digits_of_accuracy_at_default_upsampling() {
        let params = EsKernelParams::for_tolerance(1e-6, 2.0).unwrap();
        assert_eq!(params.nspread, 7);
        assert!((params.beta - 2.30 * 7.0).abs() < 1e-12);
        assert!((params.halfwidth - 3.5).abs() < 1e-12);
        assert!((params.c - 4.0 / 49.0).abs() < 1e-15);

        let loose = EsKernelParams::for_tolerance(0.5, 2.0).unwrap();
        assert_eq!(loose.nspread, 2);
        assert!((loose.beta - 2.20 * 2.0).abs() < 1e-12);
    }

    #[test]
    fn non_default_upsampling_uses_analytic_beta() {
        let params = EsKernelParams::for_tolerance(1e-6, 1.25).unwrap();
        let expected_width = (-(1e-6f64).ln() / (std::f64::consts::PI * (0.2f64).sqrt())).ceil();
        assert_eq!(params.nspread, expected_width as usize);
        let expected_beta = 0.97 * std::f64::consts::PI * expected_width * (1.0 - 1.0 / 2.5);
        assert!((params.beta - expected_beta).abs() < 1e-12);
    }

    #[test]
    fn zero_and_unattainable_tolerances_are_rejected() {
        assert_eq!(
            EsKernelParams::for_tolerance(0.0, 2.0),
            Err(KernelParamsError::ToleranceNotPositive { tolerance: 0.0 })
        );
        assert!(matches!(
            EsKernelParams::for_tolerance(1e-17, 2.0),
            Err(KernelParamsError::ToleranceUnattainable { required_width: 17, .. })
        ));
        assert!(matches!(
            EsKernelParams::for_tolerance(1e-6, 1.0),
            Err(KernelParamsError::InvalidUpsamplingFactor { .. })
        ));
    }

    #[test]
    fn builder_rejects_out_of_range_widths() {
        assert!(EsKernelParams::builder(1).build().is_err());
        assert!(EsKernelParams::builder(17).build().is_err());
        assert!(EsKernelParams::builder(16).build().is_ok());
        assert!(EsKernelParams::builder(8).beta(-1.0).build().is_err());
    }

    #[test]
    fn shape_must_match_width() {
        let mut params = EsKernelParams::for_tolerance(1e-6, 2.0).unwrap();
        params.nspread = 3;
        assert!(matches!(
            params.validate(),
            Err(KernelParamsError::InconsistentShape { nspread: 3, .. })
        ));

        assert!(matches!(
            EsKernelParams::builder(8).halfwidth(3.0).build(),
            Err(KernelParamsError::InconsistentShape { .. })
        ));
        assert!(matches!(
            EsKernelParams::builder(8).c(0.5).build(),
            Err(KernelParamsError::InconsistentShape { .. })
        ));

        // Round trips through decimal text stay within the slack.
        let params = EsKernelParams::builder(7).build().unwrap();
        let c: f64 = format!("{}", params.c).parse().unwrap();
        assert!(EsKernelParams::builder(7).c(c).build().is_ok());
    }
}
