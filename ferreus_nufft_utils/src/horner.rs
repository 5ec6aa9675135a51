/////////////////////////////////////////////////////////////////////////////////////////////
//
// Builds piecewise polynomial approximations of the spreading kernel for Horner evaluation.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{
    EsKernel, KernelFromParams, SpreadKernel,
    constants::{HORNER_DEGREE_PADDING, MAX_HORNER_DEGREE},
    kernel_helpers::EsKernelParams,
};
use faer::Mat;

/// Generates the `n` Chebyshev nodes of the first kind on `[-1, 1]`.
fn generate_chebyshev_nodes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|j| (std::f64::consts::PI * (j as f64 + 0.5) / n as f64).cos())
        .collect()
}

/// Calculates T_k(t_i) for every node and every degree below `num_columns`.
///
/// Uses the recurrence relation:
///  T_0(x) = 1 \n
///  T_1(x) = x \n
///  T_{n+1}(x) = 2xT_n(x) - T_{n-1}(x) for n > 1
fn evaluate_chebyshev_polynomials(num_columns: usize, nodes: &[f64]) -> Mat<f64> {
    let mut tn_x = Mat::<f64>::zeros(nodes.len(), num_columns);

    for i in 0..nodes.len() {
        for j in 0..num_columns {
            let value = if j == 0 {
                1.0
            } else if j == 1 {
                nodes[i]
            } else {
                2.0 * nodes[i] * tn_x.get(i, j - 1) - tn_x.get(i, j - 2)
            };
            tn_x[(i, j)] = value;
        }
    }

    tn_x
}

/// Monomial coefficients of T_0 .. T_{degree}, row k holding T_k.
fn chebyshev_to_monomial(degree: usize) -> Mat<f64> {
    let n = degree + 1;
    let mut basis = Mat::<f64>::zeros(n, n);

    basis[(0, 0)] = 1.0;
    if n > 1 {
        basis[(1, 1)] = 1.0;
    }
    for k in 2..n {
        for p in 0..n {
            let shifted = if p > 0 { 2.0 * basis[(k - 1, p - 1)] } else { 0.0 };
            basis[(k, p)] = shifted - basis[(k - 2, p)];
        }
    }

    basis
}

/// Piecewise polynomial approximation of the ES kernel.
///
/// The support is split into `nspread` unit intervals. With a footprint offset
/// `x1` in `[-w/2, -w/2 + 1)` every interval shares the local variable
/// `t = 2 (x1 + w/2) - 1`, so one pass of Horner's rule per interval yields
/// the whole footprint without any transcendental calls.
#[derive(Clone, Debug)]
pub struct HornerKernel {
    nspread: usize,
    degree: usize,
    halfwidth: f64,
    /// Monomial coefficients, interval-major: `coefficients[l * (degree + 1) + k]`.
    coefficients: Vec<f64>,
}

impl HornerKernel {
    pub fn degree(&self) -> usize {
        self.degree
    }

    #[inline(always)]
    fn evaluate_interval(&self, interval: usize, t: f64) -> f64 {
        let stride = self.degree + 1;
        let coefficients = &self.coefficients[interval * stride..(interval + 1) * stride];
        coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, coefficient| acc * t + coefficient)
    }
}

impl SpreadKernel for HornerKernel {
    #[inline(always)]
    fn width(&self) -> usize {
        self.nspread
    }

    fn evaluate(&self, x: f64) -> f64 {
        let shifted = x + self.halfwidth;
        if !(shifted >= 0.0 && shifted < self.nspread as f64) {
            return 0.0;
        }
        let interval = shifted.floor() as usize;
        let t = 2.0 * (shifted - interval as f64) - 1.0;
        self.evaluate_interval(interval, t)
    }

    #[inline(always)]
    fn evaluate_footprint(&self, x1: f64, weights: &mut [f64]) {
        let t = 2.0 * (x1 + self.halfwidth) - 1.0;
        for (l, weight) in weights.iter_mut().take(self.nspread).enumerate() {
            *weight = self.evaluate_interval(l, t);
        }
    }
}

impl KernelFromParams for HornerKernel {
    fn from_params(p: &EsKernelParams) -> Self {
        let exact = EsKernel::from_params(p);
        let nspread = p.nspread;
        let degree = (nspread + HORNER_DEGREE_PADDING).min(MAX_HORNER_DEGREE);
        let num_nodes = degree + 1;

        let nodes = generate_chebyshev_nodes(num_nodes);
        let tn_x = evaluate_chebyshev_polynomials(num_nodes, &nodes);

        // Kernel samples at the Chebyshev nodes of each unit interval.
        let samples = Mat::<f64>::from_fn(num_nodes, nspread, |i, l| {
            exact.phi(-p.halfwidth + 0.5 * (nodes[i] + 1.0) + l as f64)
        });

        let mut chebyshev_coefficients = tn_x.transpose() * samples.as_ref();
        let scale = 2.0 / num_nodes as f64;
        for l in 0..nspread {
            for k in 0..num_nodes {
                chebyshev_coefficients[(k, l)] *= scale;
            }
            chebyshev_coefficients[(0, l)] *= 0.5;
        }

        let basis = chebyshev_to_monomial(degree);
        let monomial = basis.transpose() * chebyshev_coefficients.as_ref();

        let mut coefficients = Vec::with_capacity(nspread * num_nodes);
        for l in 0..nspread {
            for k in 0..num_nodes {
                coefficients.push(monomial[(k, l)]);
            }
        }

        HornerKernel {
            nspread,
            degree,
            halfwidth: p.halfwidth,
            coefficients,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn chebyshev_basis_matches_closed_form() {
        let basis = chebyshev_to_monomial(3);
        // T_3 = 4x^3 - 3x
        assert_eq!(basis[(3, 0)], 0.0);
        assert_eq!(basis[(3, 1)], -3.0);
        assert_eq!(basis[(3, 2)], 0.0);
        assert_eq!(basis[(3, 3)], 4.0);
    }

    #[test]
    fn horner_footprint_tracks_exact_kernel() {
        let mut rng = StdRng::seed_from_u64(42);

        for tolerance in [1e-2, 1e-5, 1e-9, 1e-14] {
            let params = EsKernelParams::for_tolerance(tolerance, 2.0).unwrap();
            let exact = EsKernel::from_params(&params);
            let horner = HornerKernel::from_params(&params);

            let mut exact_weights = vec![0.0; params.nspread];
            let mut horner_weights = vec![0.0; params.nspread];

            for _ in 0..200 {
                let x1 = -params.halfwidth + rng.random_range(0.0..1.0);
                exact.evaluate_footprint(x1, &mut exact_weights);
                horner.evaluate_footprint(x1, &mut horner_weights);

                for (e, h) in exact_weights.iter().zip(horner_weights.iter()) {
                    assert!(
                        (e - h).abs() < (10.0 * tolerance).max(1e-11),
                        "w = {}: exact {} vs horner {}",
                        params.nspread,
                        e,
                        h
                    );
                }
            }
        }
    }

    #[test]
    fn pointwise_evaluation_agrees_with_footprint() {
        let params = EsKernelParams::for_tolerance(1e-7, 2.0).unwrap();
        let horner = HornerKernel::from_params(&params);
        let x1 = -params.halfwidth + 0.25;
        let mut weights = vec![0.0; params.nspread];
        horner.evaluate_footprint(x1, &mut weights);

        for (l, w) in weights.iter().enumerate() {
            assert!((horner.evaluate(x1 + l as f64) - w).abs() < 1e-14);
        }
        assert_eq!(horner.evaluate(params.halfwidth + 0.5), 0.0);
    }
}
