/////////////////////////////////////////////////////////////////////////////////////////////
//
// Rescales non-uniform points onto the fine grid and counting-sorts them into bins.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::spreadinterp::{GridShape, RescaleMode, SpreadError};
use faer::Mat;
use ferreus_nufft_utils::exclusive_prefix_sum;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Maps a raw coordinate onto fine grid units `[0, n]`.
///
/// Coordinates up to one period outside the convention's range are folded
/// back in. Anything further out stays outside `[0, n]`.
///
/// # Examples
///
/// ```
/// use ferreus_spreadinterp::{RescaleMode, rescale};
/// use std::f64::consts::PI;
///
/// assert_eq!(rescale(0.0, 64, RescaleMode::MinusPiToPi), 32.0);
/// assert!(rescale(-PI, 64, RescaleMode::MinusPiToPi).abs() < 1e-12);
/// assert_eq!(rescale(-3.0, 64, RescaleMode::ZeroToN), 61.0);
/// assert_eq!(rescale(70.0, 64, RescaleMode::ZeroToN), 6.0);
/// ```
#[inline(always)]
pub fn rescale(x: f64, n: usize, mode: RescaleMode) -> f64 {
    let n = n as f64;
    match mode {
        RescaleMode::MinusPiToPi => {
            let shift = if x < -std::f64::consts::PI {
                1.5
            } else if x > std::f64::consts::PI {
                -0.5
            } else {
                0.5
            };
            (x / std::f64::consts::TAU + shift) * n
        }
        RescaleMode::ZeroToN => {
            if x < 0.0 {
                x + n
            } else if x > n {
                x - n
            } else {
                x
            }
        }
    }
}

/// Non-uniform points rescaled to fine grid units, one buffer per active dimension.
#[derive(Debug, Clone, Default)]
pub struct NonUniformPoints {
    coords: [Vec<f64>; 3],
    num_points: usize,
}

impl NonUniformPoints {
    /// Rescales `points` (rows are points, columns are dimensions) onto `shape`.
    pub fn from_points(
        points: &Mat<f64>,
        shape: &GridShape,
        mode: RescaleMode,
    ) -> Result<Self, SpreadError> {
        let active = shape.dimensions().count();
        if points.ncols() != active {
            return Err(SpreadError::DimensionMismatch {
                expected: active,
                actual: points.ncols(),
            });
        }

        let nf = shape.nf();
        let mut coords: [Vec<f64>; 3] = Default::default();

        for d in 0..active {
            let column: Vec<Result<f64, SpreadError>> = (0..points.nrows())
                .into_par_iter()
                .map(|j| {
                    let x = points[(j, d)];
                    if !x.is_finite() {
                        return Err(SpreadError::NonFiniteCoordinate {
                            point_index: j,
                            dimension: d,
                        });
                    }
                    let rescaled = rescale(x, nf[d], mode);
                    if !(rescaled >= 0.0 && rescaled <= nf[d] as f64) {
                        return Err(SpreadError::PointOutOfRange {
                            point_index: j,
                            dimension: d,
                            value: x,
                        });
                    }
                    Ok(rescaled)
                })
                .collect();

            let mut rescaled = Vec::with_capacity(points.nrows());
            for r in column {
                rescaled.push(r?);
            }
            coords[d] = rescaled;
        }

        Ok(NonUniformPoints {
            coords,
            num_points: points.nrows(),
        })
    }

    pub fn len(&self) -> usize {
        self.num_points
    }

    pub fn is_empty(&self) -> bool {
        self.num_points == 0
    }

    /// Rescaled coordinates of point `j`. Inactive dimensions read as 0.
    #[inline(always)]
    pub fn coordinate(&self, j: usize) -> [f64; 3] {
        let mut coordinate = [0.0; 3];
        for (d, column) in self.coords.iter().enumerate() {
            if let Some(x) = column.get(j) {
                coordinate[d] = *x;
            }
        }
        coordinate
    }

    /// Rescaled coordinates along dimension `d`.
    pub fn axis(&self, d: usize) -> &[f64] {
        &self.coords[d]
    }
}

/// Partition of the fine grid into rectangular bins.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct BinLayout {
    bin_sizes: [usize; 3],
    num_bins: [usize; 3],
}

impl BinLayout {
    /// Lays out bins of the requested sizes over `shape`.
    ///
    /// Every active bin side must be at least the kernel width. Inactive
    /// dimensions hold a single bin of size 1.
    pub fn new(
        shape: &GridShape,
        requested_sizes: [usize; 3],
        nspread: usize,
    ) -> Result<Self, SpreadError> {
        let active = shape.dimensions().count();
        let nf = shape.nf();

        let mut bin_sizes = [1usize; 3];
        let mut num_bins = [1usize; 3];

        for d in 0..active {
            if requested_sizes[d] < nspread {
                return Err(SpreadError::BinSizeTooSmall {
                    dimension: d,
                    bin_size: requested_sizes[d],
                    nspread,
                });
            }
            bin_sizes[d] = requested_sizes[d];
            num_bins[d] = nf[d].div_ceil(bin_sizes[d]).max(1);
        }

        Ok(BinLayout {
            bin_sizes,
            num_bins,
        })
    }

    pub fn bin_sizes(&self) -> [usize; 3] {
        self.bin_sizes
    }

    pub fn num_bins(&self) -> [usize; 3] {
        self.num_bins
    }

    pub fn total_bins(&self) -> usize {
        self.num_bins.iter().product()
    }

    /// Bin holding a rescaled coordinate.
    ///
    /// Bins are half-open. The coordinate `X == N` and anything past the
    /// last bin are clamped into the last bin.
    #[inline(always)]
    pub fn bin_of(&self, coordinate: [f64; 3]) -> usize {
        let mut b = [0usize; 3];
        for d in 0..3 {
            let index = (coordinate[d] / self.bin_sizes[d] as f64).floor() as usize;
            b[d] = index.min(self.num_bins[d] - 1);
        }
        b[0] + self.num_bins[0] * (b[1] + self.num_bins[1] * b[2])
    }

    /// Per dimension coordinates of linear bin `bin`.
    #[inline(always)]
    pub fn bin_coordinates(&self, bin: usize) -> [usize; 3] {
        let x = bin % self.num_bins[0];
        let rest = bin / self.num_bins[0];
        [x, rest % self.num_bins[1], rest / self.num_bins[1]]
    }
}

/// Counting sort of points into bins.
///
/// After construction, `binsize` sums to the number of points, `binstartpts`
/// is its exclusive prefix sum, and for every point `j`
/// `idxnupts[binstartpts[bin_index[j]] + sortidx[j]] == j`.
#[derive(Debug, Clone, Default)]
pub struct BinSort {
    bin_index: Vec<usize>,
    sortidx: Vec<u32>,
    binsize: Vec<usize>,
    binstartpts: Vec<usize>,
    idxnupts: Vec<usize>,
}

impl BinSort {
    pub fn new(points: &NonUniformPoints, layout: &BinLayout) -> Result<Self, SpreadError> {
        let num_points = points.len();
        if num_points > u32::MAX as usize {
            return Err(SpreadError::TooManyPoints { num_points });
        }

        let counters: Vec<AtomicU32> = (0..layout.total_bins())
            .map(|_| AtomicU32::new(0))
            .collect();

        // Bin id plus rank within the bin from the bin's atomic counter.
        let (bin_index, sortidx): (Vec<usize>, Vec<u32>) = (0..num_points)
            .into_par_iter()
            .map(|j| {
                let bin = layout.bin_of(points.coordinate(j));
                let rank = counters[bin].fetch_add(1, Ordering::Relaxed);
                (bin, rank)
            })
            .unzip();

        let binsize: Vec<usize> = counters
            .into_iter()
            .map(|c| c.into_inner() as usize)
            .collect();
        let binstartpts = exclusive_prefix_sum(&binsize);

        let scattered: Vec<AtomicUsize> = (0..num_points).map(|_| AtomicUsize::new(0)).collect();
        (0..num_points).into_par_iter().for_each(|j| {
            let position = binstartpts[bin_index[j]] + sortidx[j] as usize;
            scattered[position].store(j, Ordering::Relaxed);
        });
        let idxnupts = scattered.into_iter().map(|p| p.into_inner()).collect();

        Ok(BinSort {
            bin_index,
            sortidx,
            binsize,
            binstartpts,
            idxnupts,
        })
    }

    /// Bin of every point, in original order.
    pub fn bin_index(&self) -> &[usize] {
        &self.bin_index
    }

    /// Rank of every point within its bin, in original order.
    pub fn sortidx(&self) -> &[u32] {
        &self.sortidx
    }

    /// Number of points in each bin.
    pub fn binsize(&self) -> &[usize] {
        &self.binsize
    }

    /// Exclusive prefix sum of [`binsize`](Self::binsize).
    pub fn binstartpts(&self) -> &[usize] {
        &self.binstartpts
    }

    /// Original point index at each sorted position.
    pub fn idxnupts(&self) -> &[usize] {
        &self.idxnupts
    }

    /// Sorted position of original point `j`.
    #[inline(always)]
    pub fn sorted_position(&self, j: usize) -> usize {
        self.binstartpts[self.bin_index[j]] + self.sortidx[j] as usize
    }

    pub fn num_points(&self) -> usize {
        self.idxnupts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadinterp::Dimensions;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::{PI, TAU};

    fn random_points(n: usize, d: usize, low: f64, high: f64, seed: u64) -> Mat<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        Mat::from_fn(n, d, |_, _| rng.random_range(low..high))
    }

    #[test]
    fn rescale_folds_one_period_and_keeps_fixed_points() {
        let n = 100;
        assert!((rescale(PI, n, RescaleMode::MinusPiToPi) - 100.0).abs() < 1e-12);
        assert!((rescale(-2.0 * PI, n, RescaleMode::MinusPiToPi) - 50.0).abs() < 1e-12);
        assert!((rescale(2.0 * PI, n, RescaleMode::MinusPiToPi) - 50.0).abs() < 1e-12);
        assert_eq!(rescale(100.0, n, RescaleMode::ZeroToN), 100.0);
        assert_eq!(rescale(0.0, n, RescaleMode::ZeroToN), 0.0);
        assert!(rescale(-150.0, n, RescaleMode::ZeroToN) < 0.0);
    }

    #[test]
    fn bin_sort_is_a_consistent_permutation() {
        let shape = GridShape::new(Dimensions::Two, &[96, 64]);
        let layout = BinLayout::new(&shape, [32, 32, 16], 8).unwrap();
        let raw = random_points(5000, 2, -PI, PI, 42);
        let points = NonUniformPoints::from_points(&raw, &shape, RescaleMode::MinusPiToPi).unwrap();
        let sort = BinSort::new(&points, &layout).unwrap();

        assert_eq!(layout.total_bins(), 6);
        assert_eq!(sort.binsize().iter().sum::<usize>(), 5000);
        assert_eq!(sort.binstartpts(), exclusive_prefix_sum(sort.binsize()).as_slice());

        let mut seen = vec![false; 5000];
        for (p, &j) in sort.idxnupts().iter().enumerate() {
            assert!(!seen[j]);
            seen[j] = true;
            assert_eq!(sort.sorted_position(j), p);
        }

        // Every sorted range holds only points of its bin.
        for b in 0..layout.total_bins() {
            let start = sort.binstartpts()[b];
            for &j in &sort.idxnupts()[start..start + sort.binsize()[b]] {
                assert_eq!(sort.bin_index()[j], b);
            }
        }
    }

    #[test]
    fn both_conventions_give_identical_bins() {
        let shape = GridShape::new(Dimensions::Three, &[40, 36, 50]);
        let layout = BinLayout::new(&shape, [16, 16, 16], 6).unwrap();
        let raw = random_points(800, 3, -PI, PI, 7);

        let grid_units = Mat::from_fn(800, 3, |i, j| {
            rescale(raw[(i, j)], shape.nf()[j], RescaleMode::MinusPiToPi)
        });

        let from_pi = NonUniformPoints::from_points(&raw, &shape, RescaleMode::MinusPiToPi).unwrap();
        let from_n = NonUniformPoints::from_points(&grid_units, &shape, RescaleMode::ZeroToN).unwrap();

        let sort_pi = BinSort::new(&from_pi, &layout).unwrap();
        let sort_n = BinSort::new(&from_n, &layout).unwrap();
        assert_eq!(sort_pi.bin_index(), sort_n.bin_index());
        assert_eq!(sort_pi.binsize(), sort_n.binsize());
    }

    #[test]
    fn upper_boundary_lands_in_last_bin() {
        let shape = GridShape::new(Dimensions::One, &[64]);
        let layout = BinLayout::new(&shape, [32, 32, 16], 4).unwrap();
        let raw = Mat::from_fn(3, 1, |i, _| [0.0, 63.5, 64.0][i]);
        let points = NonUniformPoints::from_points(&raw, &shape, RescaleMode::ZeroToN).unwrap();
        let sort = BinSort::new(&points, &layout).unwrap();
        assert_eq!(sort.bin_index(), &[0, 1, 1]);
    }

    #[test]
    fn interior_bin_edges_belong_to_the_upper_bin() {
        let shape = GridShape::new(Dimensions::One, &[64]);
        let layout = BinLayout::new(&shape, [16, 16, 16], 4).unwrap();
        let edges = [0.0, 16.0, 24.0, 32.0, 40.0, 48.0, 64.0];

        // These coordinates convert exactly between the two conventions.
        let grid_units = Mat::from_fn(edges.len(), 1, |i, _| edges[i]);
        let radians = Mat::from_fn(edges.len(), 1, |i, _| (edges[i] / 64.0 - 0.5) * TAU);

        let from_n = NonUniformPoints::from_points(&grid_units, &shape, RescaleMode::ZeroToN).unwrap();
        let from_pi = NonUniformPoints::from_points(&radians, &shape, RescaleMode::MinusPiToPi).unwrap();
        assert_eq!(from_pi.axis(0), &edges);

        for points in [&from_n, &from_pi] {
            let sort = BinSort::new(points, &layout).unwrap();
            assert_eq!(sort.bin_index(), &[0, 1, 1, 2, 2, 3, 3]);
            assert_eq!(sort.binsize(), &[1, 2, 2, 2]);
            assert_eq!(sort.binsize().iter().sum::<usize>(), edges.len());
        }
    }

    #[test]
    fn bad_geometry_is_rejected() {
        let shape = GridShape::new(Dimensions::One, &[64]);

        let far = Mat::from_fn(2, 1, |i, _| [0.0, -4.0 * PI][i]);
        assert!(matches!(
            NonUniformPoints::from_points(&far, &shape, RescaleMode::MinusPiToPi),
            Err(SpreadError::PointOutOfRange { point_index: 1, .. })
        ));

        let nan = Mat::from_fn(1, 1, |_, _| f64::NAN);
        assert!(matches!(
            NonUniformPoints::from_points(&nan, &shape, RescaleMode::ZeroToN),
            Err(SpreadError::NonFiniteCoordinate { .. })
        ));

        let wrong_dims = Mat::<f64>::zeros(4, 2);
        assert!(matches!(
            NonUniformPoints::from_points(&wrong_dims, &shape, RescaleMode::ZeroToN),
            Err(SpreadError::DimensionMismatch { expected: 1, actual: 2 })
        ));

        assert!(matches!(
            BinLayout::new(&shape, [4, 4, 4], 8),
            Err(SpreadError::BinSizeTooSmall { .. })
        ));
    }
}
