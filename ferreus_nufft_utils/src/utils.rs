/////////////////////////////////////////////////////////////////////////////////////////////
//
// Supplies grid sizing, quadrature and prefix sum helpers shared by the NUFFT crates.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

/// Returns the smallest even integer `>= n` whose only prime factors are 2, 3 and 5.
///
/// # Examples
///
/// ```
/// use ferreus_nufft_utils::next235even;
///
/// assert_eq!(next235even(0), 2);
/// assert_eq!(next235even(7), 8);
/// assert_eq!(next235even(13), 16);
/// assert_eq!(next235even(61), 64);
/// assert_eq!(next235even(98), 100);
/// ```
#[inline(always)]
pub fn next235even(n: usize) -> usize {
    if n <= 2 {
        return 2;
    }

    let mut candidate = n + (n % 2);

    loop {
        let mut remainder = candidate;
        for factor in [2, 3, 5] {
            while remainder % factor == 0 {
                remainder /= factor;
            }
        }
        if remainder == 1 {
            return candidate;
        }
        candidate += 2;
    }
}

/// Computes the `n` point Gauss-Legendre quadrature rule on `[-1, 1]`.
///
/// Returns `(nodes, weights)` with nodes in descending order. The nodes are
/// located by Newton iteration on the three term Legendre recurrence.
///
/// # Examples
///
/// ```
/// use ferreus_nufft_utils::gauss_legendre;
///
/// let (nodes, weights) = gauss_legendre(5);
///
/// // Integrates x^4 exactly.
/// let integral: f64 = nodes.iter().zip(weights.iter()).map(|(x, w)| w * x.powi(4)).sum();
/// assert!((integral - 0.4).abs() < 1e-14);
/// ```
pub fn gauss_legendre(n: usize) -> (Vec<f64>, Vec<f64>) {
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];

    let half = (n + 1) / 2;

    for i in 0..half {
        let mut x = (std::f64::consts::PI * (i as f64 + 0.75) / (n as f64 + 0.5)).cos();
        let mut derivative = 0.0;

        for _ in 0..100 {
            let (p_n, p_n_minus_1) = legendre_pair(n, x);
            derivative = n as f64 * (x * p_n - p_n_minus_1) / (x * x - 1.0);
            let step = p_n / derivative;
            x -= step;
            if step.abs() < 1e-16 {
                break;
            }
        }

        let (p_n, p_n_minus_1) = legendre_pair(n, x);
        if p_n.abs() > 0.0 {
            derivative = n as f64 * (x * p_n - p_n_minus_1) / (x * x - 1.0);
        }

        let weight = 2.0 / ((1.0 - x * x) * derivative * derivative);

        nodes[i] = x;
        weights[i] = weight;
        nodes[n - 1 - i] = -x;
        weights[n - 1 - i] = weight;
    }

    (nodes, weights)
}

/// Evaluates `(P_n(x), P_{n-1}(x))` via the Bonnet recurrence.
#[inline(always)]
fn legendre_pair(n: usize, x: f64) -> (f64, f64) {
    let mut p_prev = 1.0;
    let mut p = x;
    if n == 0 {
        return (1.0, 0.0);
    }
    for k in 2..=n {
        let p_next = ((2 * k - 1) as f64 * x * p - (k - 1) as f64 * p_prev) / k as f64;
        p_prev = p;
        p = p_next;
    }
    (p, p_prev)
}

/// Returns the exclusive prefix sum of `counts`.
///
/// # Examples
///
/// ```
/// use ferreus_nufft_utils::exclusive_prefix_sum;
///
/// assert_eq!(exclusive_prefix_sum(&[3, 0, 2, 5]), vec![0, 3, 3, 5]);
/// ```
#[inline(always)]
pub fn exclusive_prefix_sum(counts: &[usize]) -> Vec<usize> {
    counts
        .iter()
        .scan(0usize, |running, &count| {
            let start = *running;
            *running += count;
            Some(start)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next235even_only_returns_smooth_even_numbers() {
        for n in 0..2000 {
            let m = next235even(n);
            assert!(m >= n && m % 2 == 0);

            let mut r = m;
            for f in [2, 3, 5] {
                while r % f == 0 {
                    r /= f;
                }
            }
            assert_eq!(r, 1);

            // No smaller admissible candidate was skipped.
            for smaller in (n.max(2)..m).filter(|s| s % 2 == 0) {
                let mut r = smaller;
                for f in [2, 3, 5] {
                    while r % f == 0 {
                        r /= f;
                    }
                }
                assert_ne!(r, 1);
            }
        }
    }

    #[test]
    fn gauss_legendre_weights_sum_to_interval_length() {
        for n in [1, 2, 7, 20, 50] {
            let (nodes, weights) = gauss_legendre(n);
            let total: f64 = weights.iter().sum();
            assert!((total - 2.0).abs() < 1e-13, "n = {}", n);
            assert!(nodes.iter().all(|x| x.abs() < 1.0));
        }

        let (nodes, weights) = gauss_legendre(20);
        let integral: f64 = nodes
            .iter()
            .zip(weights.iter())
            .map(|(x, w)| w * (3.0 * x).cos())
            .sum();
        let exact = 2.0 * (3.0f64).sin() / 3.0;
        assert!((integral - exact).abs() < 1e-14);
    }
}
