/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements the spreading (scatter) and interpolation (gather) engine over bin-sorted subproblems.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{
    atomic_grid::AtomicGridSlot,
    binning::{BinLayout, BinSort, NonUniformPoints},
    subproblems::Subproblems,
};
use ferreus_nufft_utils::{SpreadKernel, constants::MAX_NSPREAD};
use itertools::iproduct;
use num_complex::Complex64;
use rayon::prelude::*;
use std::fmt;

/// Errors that can occur while binning, spreading or interpolating.
#[derive(Debug, Clone, PartialEq)]
pub enum SpreadError {
    /// The point set has a different number of columns than the grid has dimensions.
    DimensionMismatch { expected: usize, actual: usize },

    /// A coordinate is NaN or infinite.
    NonFiniteCoordinate { point_index: usize, dimension: usize },

    /// A coordinate lies more than one period outside its convention's range.
    PointOutOfRange {
        point_index: usize,
        dimension: usize,
        value: f64,
    },

    /// A kernel footprint fell outside its subproblem's tile.
    FootprintOutsideTile { point_index: usize },

    /// More points than a bin counter can represent.
    TooManyPoints { num_points: usize },

    /// A bin side is narrower than the kernel.
    BinSizeTooSmall {
        dimension: usize,
        bin_size: usize,
        nspread: usize,
    },

    /// Subproblems must hold at least one point.
    ZeroSubproblemSize,

    /// A strength, grid or output buffer has the wrong length.
    BufferLength {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The accumulation grid could not be allocated.
    GridAllocation { cells: usize },
}

impl fmt::Display for SpreadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpreadError::DimensionMismatch { expected, actual } => write!(
                f,
                "point set has {} coordinate columns but the grid is {}-dimensional",
                actual, expected
            ),
            SpreadError::NonFiniteCoordinate {
                point_index,
                dimension,
            } => write!(
                f,
                "coordinate {} of point {} is not finite",
                dimension, point_index
            ),
            SpreadError::PointOutOfRange {
                point_index,
                dimension,
                value,
            } => write!(
                f,
                "coordinate {} of point {} ({}) lies more than one period outside the grid",
                dimension, point_index, value
            ),
            SpreadError::FootprintOutsideTile { point_index } => write!(
                f,
                "kernel footprint of point {} falls outside its subproblem tile",
                point_index
            ),
            SpreadError::TooManyPoints { num_points } => write!(
                f,
                "{} points exceed the bin counter capacity of {}",
                num_points,
                u32::MAX
            ),
            SpreadError::BinSizeTooSmall {
                dimension,
                bin_size,
                nspread,
            } => write!(
                f,
                "bin size {} in dimension {} is smaller than the kernel width {}",
                bin_size, dimension, nspread
            ),
            SpreadError::ZeroSubproblemSize => {
                write!(f, "maximum subproblem size must be at least 1")
            }
            SpreadError::BufferLength {
                name,
                expected,
                actual,
            } => write!(
                f,
                "{} buffer holds {} values, expected {}",
                name, actual, expected
            ),
            SpreadError::GridAllocation { cells } => {
                write!(f, "failed to allocate an accumulation grid of {} cells", cells)
            }
        }
    }
}

impl std::error::Error for SpreadError {}

/// Supported spatial dimensions of the fine grid.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Dimensions {
    One = 1,
    Two = 2,
    Three = 3,
}

impl Dimensions {
    /// Maps a number of mode counts or coordinate columns onto a dimension.
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(Dimensions::One),
            2 => Some(Dimensions::Two),
            3 => Some(Dimensions::Three),
            _ => None,
        }
    }

    #[inline(always)]
    pub fn count(&self) -> usize {
        *self as usize
    }
}

/// How raw point coordinates map onto fine grid units.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RescaleMode {
    /// Coordinates already in fine grid units, `[0, N)`.
    ZeroToN,

    /// Coordinates in `[-pi, pi)`.
    MinusPiToPi,
}

/// Work decomposition used by the engine.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SpreadStrategy {
    /// Bin-local tiles processed one subproblem per work item.
    Subproblem,

    /// One work item per bin-sorted point, reading and writing the global grid directly.
    NuptsDriven,
}

/// Sizes of the fine grid. Inactive dimensions have size 1.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GridShape {
    dimensions: Dimensions,
    nf: [usize; 3],
}

impl GridShape {
    /// Builds a shape from the fine grid size of each active dimension.
    pub fn new(dimensions: Dimensions, fine_sizes: &[usize]) -> Self {
        let mut nf = [1usize; 3];
        for (d, size) in fine_sizes.iter().take(dimensions.count()).enumerate() {
            nf[d] = *size;
        }
        GridShape { dimensions, nf }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Fine grid sizes `[nf1, nf2, nf3]`.
    pub fn nf(&self) -> [usize; 3] {
        self.nf
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.nf.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear index of a cell, x fastest.
    #[inline(always)]
    pub fn linear_index(&self, cell: [usize; 3]) -> usize {
        cell[0] + self.nf[0] * (cell[1] + self.nf[1] * cell[2])
    }

    /// Linear index of an unwrapped cell, wrapping each coordinate periodically.
    #[inline(always)]
    fn wrapped_index(&self, cell: [i64; 3]) -> usize {
        let wrapped = [
            cell[0].rem_euclid(self.nf[0] as i64) as usize,
            cell[1].rem_euclid(self.nf[1] as i64) as usize,
            cell[2].rem_euclid(self.nf[2] as i64) as usize,
        ];
        self.linear_index(wrapped)
    }
}

/// Kernel weights of one point in each dimension.
struct Footprint {
    start: [i64; 3],
    widths: [usize; 3],
    weights: [[f64; MAX_NSPREAD]; 3],
}

/// A bin's working window of the fine grid, widened by the kernel half width.
struct Tile {
    origin: [i64; 3],
    sizes: [usize; 3],
}

impl Tile {
    #[inline(always)]
    fn len(&self) -> usize {
        self.sizes.iter().product()
    }

    /// Offset of a footprint within the tile, if the footprint fits.
    #[inline(always)]
    fn local_start(&self, footprint: &Footprint) -> Option<[usize; 3]> {
        let mut local = [0usize; 3];
        for d in 0..3 {
            let offset = footprint.start[d] - self.origin[d];
            if offset < 0 || offset as usize + footprint.widths[d] > self.sizes[d] {
                return None;
            }
            local[d] = offset as usize;
        }
        Some(local)
    }

    #[inline(always)]
    fn index(&self, local: [usize; 3]) -> usize {
        local[0] + self.sizes[0] * (local[1] + self.sizes[1] * local[2])
    }
}

/// Spreads strengths at non-uniform points onto a fine grid, or interpolates
/// a fine grid back onto the points, using kernel `K`.
///
/// All work is issued with rayon and runs on whichever pool the caller
/// installs.
#[derive(Debug, Clone)]
pub struct Spreader<K: SpreadKernel> {
    kernel: K,
    shape: GridShape,
    layout: BinLayout,
    strategy: SpreadStrategy,
}

impl<K: SpreadKernel> Spreader<K> {
    pub fn new(kernel: K, shape: GridShape, layout: BinLayout, strategy: SpreadStrategy) -> Self {
        Spreader {
            kernel,
            shape,
            layout,
            strategy,
        }
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn shape(&self) -> &GridShape {
        &self.shape
    }

    pub fn layout(&self) -> &BinLayout {
        &self.layout
    }

    pub fn strategy(&self) -> SpreadStrategy {
        self.strategy
    }

    /// Number of padding cells added to each side of a bin to form its tile.
    #[inline(always)]
    pub fn tile_padding(&self) -> usize {
        self.kernel.width().div_ceil(2)
    }

    /// Adds `sum_j strengths[j] * phi(X - x_j)` into `grid`.
    ///
    /// `strengths` is in original point order. Contributions are accumulated
    /// atomically, so the result is independent of scheduling up to rounding.
    pub fn spread(
        &self,
        points: &NonUniformPoints,
        sort: &BinSort,
        subproblems: &Subproblems,
        strengths: &[Complex64],
        grid: AtomicGridSlot<'_>,
    ) -> Result<(), SpreadError> {
        check_length("strength", points.len(), strengths.len())?;
        check_length("grid", self.shape.len(), grid.len())?;

        match self.strategy {
            SpreadStrategy::Subproblem => (0..subproblems.total())
                .into_par_iter()
                .try_for_each_init(Vec::new, |tile_values, s| {
                    self.spread_subproblem(s, points, sort, subproblems, strengths, tile_values, grid)
                }),
            SpreadStrategy::NuptsDriven => {
                sort.idxnupts().par_iter().for_each(|&j| {
                    let footprint = self.footprint(points.coordinate(j));
                    let value = strengths[j];
                    for (dz, dy, dx) in iproduct!(
                        0..footprint.widths[2],
                        0..footprint.widths[1],
                        0..footprint.widths[0]
                    ) {
                        let weight = footprint.weights[0][dx]
                            * footprint.weights[1][dy]
                            * footprint.weights[2][dz];
                        let index = self.shape.wrapped_index([
                            footprint.start[0] + dx as i64,
                            footprint.start[1] + dy as i64,
                            footprint.start[2] + dz as i64,
                        ]);
                        grid.add(index, value * weight);
                    }
                });
                Ok(())
            }
        }
    }

    /// Writes `out[j] = sum_X grid[X] * phi(X - x_j)` in original point order.
    pub fn interpolate(
        &self,
        points: &NonUniformPoints,
        sort: &BinSort,
        subproblems: &Subproblems,
        grid: &[Complex64],
        out: &mut [Complex64],
    ) -> Result<(), SpreadError> {
        check_length("output", points.len(), out.len())?;
        check_length("grid", self.shape.len(), grid.len())?;

        let mut sorted = vec![Complex64::new(0.0, 0.0); points.len()];

        match self.strategy {
            SpreadStrategy::Subproblem => {
                // Subproblem ranges partition the sorted positions in order.
                let mut chunks = Vec::with_capacity(subproblems.total());
                let mut rest: &mut [Complex64] = &mut sorted;
                for s in 0..subproblems.total() {
                    let (head, tail) =
                        std::mem::take(&mut rest).split_at_mut(subproblems.range(s).len());
                    chunks.push((s, head));
                    rest = tail;
                }

                chunks
                    .into_par_iter()
                    .try_for_each_init(Vec::new, |tile_values, (s, chunk)| {
                        self.interpolate_subproblem(
                            s,
                            points,
                            sort,
                            subproblems,
                            grid,
                            tile_values,
                            chunk,
                        )
                    })?;
            }
            SpreadStrategy::NuptsDriven => {
                sorted.par_iter_mut().enumerate().for_each(|(p, value)| {
                    let j = sort.idxnupts()[p];
                    let footprint = self.footprint(points.coordinate(j));
                    let mut sum = Complex64::new(0.0, 0.0);
                    for (dz, dy, dx) in iproduct!(
                        0..footprint.widths[2],
                        0..footprint.widths[1],
                        0..footprint.widths[0]
                    ) {
                        let weight = footprint.weights[0][dx]
                            * footprint.weights[1][dy]
                            * footprint.weights[2][dz];
                        let index = self.shape.wrapped_index([
                            footprint.start[0] + dx as i64,
                            footprint.start[1] + dy as i64,
                            footprint.start[2] + dz as i64,
                        ]);
                        sum += grid[index] * weight;
                    }
                    *value = sum;
                });
            }
        }

        out.par_iter_mut()
            .enumerate()
            .for_each(|(j, value)| *value = sorted[sort.sorted_position(j)]);

        Ok(())
    }

    /// Kernel weights and first touched cell of a point, per dimension.
    #[inline(always)]
    fn footprint(&self, coordinate: [f64; 3]) -> Footprint {
        let width = self.kernel.width();
        let halfwidth = width as f64 / 2.0;
        let active = self.shape.dimensions().count();

        let mut footprint = Footprint {
            start: [0; 3],
            widths: [1; 3],
            weights: [[0.0; MAX_NSPREAD]; 3],
        };

        for d in 0..3 {
            if d < active {
                let i0 = (coordinate[d] - halfwidth).ceil();
                let x1 = i0 - coordinate[d];
                footprint.start[d] = i0 as i64;
                footprint.widths[d] = width;
                self.kernel
                    .evaluate_footprint(x1, &mut footprint.weights[d][..width]);
            } else {
                footprint.weights[d][0] = 1.0;
            }
        }

        footprint
    }

    fn tile_for_bin(&self, bin: usize) -> Tile {
        let bin_coordinates = self.layout.bin_coordinates(bin);
        let bin_sizes = self.layout.bin_sizes();
        let active = self.shape.dimensions().count();
        let pad = self.tile_padding();

        let mut tile = Tile {
            origin: [0; 3],
            sizes: [1; 3],
        };
        for d in 0..active {
            tile.origin[d] = (bin_coordinates[d] * bin_sizes[d]) as i64 - pad as i64;
            tile.sizes[d] = bin_sizes[d] + 2 * pad;
        }
        tile
    }

    #[allow(clippy::too_many_arguments)]
    fn spread_subproblem(
        &self,
        s: usize,
        points: &NonUniformPoints,
        sort: &BinSort,
        subproblems: &Subproblems,
        strengths: &[Complex64],
        tile_values: &mut Vec<Complex64>,
        grid: AtomicGridSlot<'_>,
    ) -> Result<(), SpreadError> {
        let tile = self.tile_for_bin(subproblems.subprob_to_bin()[s]);
        tile_values.clear();
        tile_values.resize(tile.len(), Complex64::new(0.0, 0.0));

        for &j in &sort.idxnupts()[subproblems.range(s)] {
            let footprint = self.footprint(points.coordinate(j));
            let local = tile
                .local_start(&footprint)
                .ok_or(SpreadError::FootprintOutsideTile { point_index: j })?;
            let value = strengths[j];

            for (dz, dy, dx) in iproduct!(
                0..footprint.widths[2],
                0..footprint.widths[1],
                0..footprint.widths[0]
            ) {
                let weight =
                    footprint.weights[0][dx] * footprint.weights[1][dy] * footprint.weights[2][dz];
                tile_values[tile.index([local[0] + dx, local[1] + dy, local[2] + dz])] +=
                    value * weight;
            }
        }

        for (tz, ty, tx) in iproduct!(0..tile.sizes[2], 0..tile.sizes[1], 0..tile.sizes[0]) {
            let value = tile_values[tile.index([tx, ty, tz])];
            if value.re == 0.0 && value.im == 0.0 {
                continue;
            }
            let index = self.shape.wrapped_index([
                tile.origin[0] + tx as i64,
                tile.origin[1] + ty as i64,
                tile.origin[2] + tz as i64,
            ]);
            grid.add(index, value);
        }

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn interpolate_subproblem(
        &self,
        s: usize,
        points: &NonUniformPoints,
        sort: &BinSort,
        subproblems: &Subproblems,
        grid: &[Complex64],
        tile_values: &mut Vec<Complex64>,
        out: &mut [Complex64],
    ) -> Result<(), SpreadError> {
        let tile = self.tile_for_bin(subproblems.subprob_to_bin()[s]);
        tile_values.clear();
        tile_values.reserve(tile.len());

        for (tz, ty, tx) in iproduct!(0..tile.sizes[2], 0..tile.sizes[1], 0..tile.sizes[0]) {
            tile_values.push(
                grid[self.shape.wrapped_index([
                    tile.origin[0] + tx as i64,
                    tile.origin[1] + ty as i64,
                    tile.origin[2] + tz as i64,
                ])],
            );
        }

        for (value, &j) in out
            .iter_mut()
            .zip(sort.idxnupts()[subproblems.range(s)].iter())
        {
            let footprint = self.footprint(points.coordinate(j));
            let local = tile
                .local_start(&footprint)
                .ok_or(SpreadError::FootprintOutsideTile { point_index: j })?;

            let mut sum = Complex64::new(0.0, 0.0);
            for (dz, dy, dx) in iproduct!(
                0..footprint.widths[2],
                0..footprint.widths[1],
                0..footprint.widths[0]
            ) {
                let weight =
                    footprint.weights[0][dx] * footprint.weights[1][dy] * footprint.weights[2][dz];
                sum += tile_values[tile.index([local[0] + dx, local[1] + dy, local[2] + dz])]
                    * weight;
            }
            *value = sum;
        }

        Ok(())
    }
}

#[inline(always)]
fn check_length(name: &'static str, expected: usize, actual: usize) -> Result<(), SpreadError> {
    match expected == actual {
        true => Ok(()),
        false => Err(SpreadError::BufferLength {
            name,
            expected,
            actual,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atomic_grid::AtomicGrid;
    use faer::Mat;
    use ferreus_nufft_utils::{
        EsKernelParams, KernelFromParams,
        kernels::{EsKernel, HornerKernel},
    };
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::PI;

    struct Setup {
        shape: GridShape,
        layout: BinLayout,
        points: NonUniformPoints,
        sort: BinSort,
        subproblems: Subproblems,
    }

    fn setup(
        nf: &[usize],
        raw: &Mat<f64>,
        bin_sizes: [usize; 3],
        max_subproblem_size: usize,
        nspread: usize,
    ) -> Setup {
        let shape = GridShape::new(Dimensions::from_count(nf.len()).unwrap(), nf);
        let layout = BinLayout::new(&shape, bin_sizes, nspread).unwrap();
        let points = NonUniformPoints::from_points(raw, &shape, RescaleMode::MinusPiToPi).unwrap();
        let sort = BinSort::new(&points, &layout).unwrap();
        let subproblems = Subproblems::new(&sort, max_subproblem_size).unwrap();
        Setup {
            shape,
            layout,
            points,
            sort,
            subproblems,
        }
    }

    fn random_strengths(n: usize, seed: u64) -> Vec<Complex64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| Complex64::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)))
            .collect()
    }

    /// Periodic distance from cell `g` to coordinate `x`, in `[-n/2, n/2)`.
    fn periodic_offset(g: usize, x: f64, n: usize) -> f64 {
        let n = n as f64;
        (g as f64 - x + 0.5 * n).rem_euclid(n) - 0.5 * n
    }

    fn brute_force_spread(s: &Setup, kernel: &EsKernel, strengths: &[Complex64]) -> Vec<Complex64> {
        let nf = s.shape.nf();
        let active = s.shape.dimensions().count();
        let mut grid = vec![Complex64::new(0.0, 0.0); s.shape.len()];
        for j in 0..s.points.len() {
            let x = s.points.coordinate(j);
            for (gz, gy, gx) in iproduct!(0..nf[2], 0..nf[1], 0..nf[0]) {
                let cell = [gx, gy, gz];
                let mut weight = 1.0;
                for d in 0..active {
                    weight *= kernel.phi(periodic_offset(cell[d], x[d], nf[d]));
                }
                grid[s.shape.linear_index(cell)] += strengths[j] * weight;
            }
        }
        grid
    }

    fn run_spread<K: SpreadKernel>(
        s: &Setup,
        kernel: K,
        strategy: SpreadStrategy,
        strengths: &[Complex64],
    ) -> Vec<Complex64> {
        let spreader = Spreader::new(kernel, s.shape, s.layout, strategy);
        let grid = AtomicGrid::new(s.shape.len()).unwrap();
        spreader
            .spread(&s.points, &s.sort, &s.subproblems, strengths, grid.slot(0, s.shape.len()))
            .unwrap();
        let mut out = vec![Complex64::new(0.0, 0.0); s.shape.len()];
        grid.write_into(&mut out);
        out
    }

    fn max_abs_difference(a: &[Complex64], b: &[Complex64]) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y).norm())
            .fold(0.0, f64::max)
    }

    #[test]
    fn spreading_matches_brute_force_in_every_dimension() {
        let params = EsKernelParams::for_tolerance(1e-6, 2.0).unwrap();
        let kernel = EsKernel::from_params(&params);

        for (nf, seed) in [(vec![50usize], 1u64), (vec![24, 30], 2), (vec![16, 18, 20], 3)] {
            let mut rng = StdRng::seed_from_u64(seed);
            let raw = Mat::from_fn(300, nf.len(), |_, _| rng.random_range(-PI..PI));
            let s = setup(&nf, &raw, [8, 8, 8], 7, params.nspread);
            let strengths = random_strengths(300, seed);

            let expected = brute_force_spread(&s, &kernel, &strengths);
            for strategy in [SpreadStrategy::Subproblem, SpreadStrategy::NuptsDriven] {
                let actual = run_spread(&s, kernel, strategy, &strengths);
                assert!(
                    max_abs_difference(&expected, &actual) < 1e-12,
                    "nf = {:?}, strategy = {:?}",
                    nf,
                    strategy
                );
            }
        }
    }

    #[test]
    fn tiles_wider_than_the_grid_still_wrap_correctly() {
        let params = EsKernelParams::for_tolerance(1e-9, 2.0).unwrap();
        let kernel = EsKernel::from_params(&params);
        let raw = Mat::from_fn(40, 2, |i, j| -PI + 0.157 * (i + 3 * j) as f64);
        let s = setup(&[20, 22], &raw, [32, 32, 16], 1024, params.nspread);
        let strengths = random_strengths(40, 11);

        let expected = brute_force_spread(&s, &kernel, &strengths);
        let actual = run_spread(&s, kernel, SpreadStrategy::Subproblem, &strengths);
        assert!(max_abs_difference(&expected, &actual) < 1e-12);
    }

    #[test]
    fn interpolation_is_the_adjoint_of_spreading() {
        let params = EsKernelParams::for_tolerance(1e-7, 2.0).unwrap();
        let mut rng = StdRng::seed_from_u64(99);
        let raw = Mat::from_fn(500, 2, |_, _| rng.random_range(-PI..PI));
        let s = setup(&[36, 40], &raw, [12, 10, 1], 33, params.nspread);

        let strengths = random_strengths(500, 5);
        let grid_values = random_strengths(s.shape.len(), 6);

        for strategy in [SpreadStrategy::Subproblem, SpreadStrategy::NuptsDriven] {
            let spreader = Spreader::new(HornerKernel::from_params(&params), s.shape, s.layout, strategy);

            let spread = run_spread(&s, HornerKernel::from_params(&params), strategy, &strengths);

            let mut interpolated = vec![Complex64::new(0.0, 0.0); 500];
            spreader
                .interpolate(&s.points, &s.sort, &s.subproblems, &grid_values, &mut interpolated)
                .unwrap();

            // <S c, g> == <c, S^T g> for a real kernel.
            let lhs: Complex64 = spread.iter().zip(grid_values.iter()).map(|(a, b)| a * b).sum();
            let rhs: Complex64 = strengths
                .iter()
                .zip(interpolated.iter())
                .map(|(a, b)| a * b)
                .sum();
            assert!((lhs - rhs).norm() < 1e-10 * lhs.norm().max(1.0));
        }
    }

    #[test]
    fn both_strategies_interpolate_identically() {
        let params = EsKernelParams::for_tolerance(1e-5, 2.0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        // Points clustered near one corner.
        let raw = Mat::from_fn(400, 3, |_, _| rng.random_range(-PI..-2.5));
        let s = setup(&[16, 16, 16], &raw, [8, 8, 8], 16, params.nspread);
        let grid_values = random_strengths(s.shape.len(), 8);

        let mut results = Vec::new();
        for strategy in [SpreadStrategy::Subproblem, SpreadStrategy::NuptsDriven] {
            let spreader = Spreader::new(EsKernel::from_params(&params), s.shape, s.layout, strategy);
            let mut out = vec![Complex64::new(0.0, 0.0); 400];
            spreader
                .interpolate(&s.points, &s.sort, &s.subproblems, &grid_values, &mut out)
                .unwrap();
            results.push(out);
        }
        assert!(max_abs_difference(&results[0], &results[1]) < 1e-12);
    }

    #[test]
    fn points_on_bin_edges_spread_and_interpolate_consistently() {
        let params = EsKernelParams::for_tolerance(1e-6, 2.0).unwrap();
        let kernel = EsKernel::from_params(&params);
        let nf = [64usize, 48];

        // Edges of the 16-cell bins in both dimensions, then a few interior points.
        let mut rng = StdRng::seed_from_u64(21);
        let mut coordinates = Vec::new();
        for (gx, gy) in iproduct!((0..=64).step_by(16), (0..=48).step_by(16)) {
            coordinates.push([gx as f64, gy as f64]);
        }
        for _ in 0..30 {
            coordinates.push([rng.random_range(0.0..64.0), rng.random_range(0.0..48.0)]);
        }
        let n = coordinates.len();
        let raw = Mat::from_fn(n, 2, |i, d| (coordinates[i][d] / nf[d] as f64 - 0.5) * 2.0 * PI);

        let s = setup(&nf, &raw, [16, 16, 1], 5, params.nspread);
        assert_eq!(s.sort.binsize().iter().sum::<usize>(), n);

        let strengths = random_strengths(n, 4);
        let expected = brute_force_spread(&s, &kernel, &strengths);
        let grid_values = random_strengths(s.shape.len(), 9);

        let mut interpolated = Vec::new();
        for strategy in [SpreadStrategy::Subproblem, SpreadStrategy::NuptsDriven] {
            let actual = run_spread(&s, kernel, strategy, &strengths);
            assert!(
                max_abs_difference(&expected, &actual) < 1e-12,
                "strategy = {:?}",
                strategy
            );

            let spreader = Spreader::new(kernel, s.shape, s.layout, strategy);
            let mut out = vec![Complex64::new(0.0, 0.0); n];
            spreader
                .interpolate(&s.points, &s.sort, &s.subproblems, &grid_values, &mut out)
                .unwrap();
            interpolated.push(out);
        }
        assert!(max_abs_difference(&interpolated[0], &interpolated[1]) < 1e-12);
    }

    #[test]
    fn mismatched_buffers_are_rejected() {
        let params = EsKernelParams::for_tolerance(1e-4, 2.0).unwrap();
        let raw = Mat::from_fn(4, 1, |i, _| 0.1 * i as f64);
        let s = setup(&[32], &raw, [16, 16, 16], 8, params.nspread);
        let spreader = Spreader::new(
            EsKernel::from_params(&params),
            s.shape,
            s.layout,
            SpreadStrategy::Subproblem,
        );
        let grid = AtomicGrid::new(32).unwrap();

        let result = spreader.spread(
            &s.points,
            &s.sort,
            &s.subproblems,
            &[Complex64::new(1.0, 0.0); 3],
            grid.slot(0, 32),
        );
        assert_eq!(
            result,
            Err(SpreadError::BufferLength {
                name: "strength",
                expected: 4,
                actual: 3
            })
        );
    }
}
