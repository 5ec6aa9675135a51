/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements direct evaluation of the exponential of semicircle spreading kernel.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{KernelFromParams, SpreadKernel, kernel_helpers::EsKernelParams};

/// Exponential of semicircle kernel evaluated directly from its shape parameters.
#[derive(Clone, Debug, Copy)]
pub struct EsKernel {
    nspread: usize,
    beta: f64,
    halfwidth: f64,
    c: f64,
}

impl EsKernel {
    /// `phi(x) = exp(beta * (sqrt(1 - c x^2) - 1))` inside the support, zero outside.
    #[inline(always)]
    pub fn phi(&self, x: f64) -> f64 {
        match x.abs() >= self.halfwidth {
            true => 0.0,
            false => (self.beta * ((1.0 - self.c * x * x).sqrt() - 1.0)).exp(),
        }
    }

    pub fn params(&self) -> EsKernelParams {
        EsKernelParams {
            nspread: self.nspread,
            beta: self.beta,
            halfwidth: self.halfwidth,
            c: self.c,
        }
    }
}

impl SpreadKernel for EsKernel {
    #[inline(always)]
    fn width(&self) -> usize {
        self.nspread
    }

    #[inline(always)]
    fn evaluate(&self, x: f64) -> f64 {
        self.phi(x)
    }
}

impl KernelFromParams for EsKernel {
    #[inline(always)]
    fn from_params(p: &EsKernelParams) -> Self {
        EsKernel {
            nspread: p.nspread,
            beta: p.beta,
            halfwidth: p.halfwidth,
            c: p.c,
        }
    }
}
