/////////////////////////////////////////////////////////////////////////////////////////////
//
// Splits bin-sorted points into bounded, contiguous subproblems for load balancing.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{binning::BinSort, spreadinterp::SpreadError};
use ferreus_nufft_utils::exclusive_prefix_sum;
use rayon::prelude::*;
use std::ops::Range;

/// Decomposition of every non-empty bin into subproblems of at most
/// `max_subproblem_size` points.
#[derive(Debug, Clone, Default)]
pub struct Subproblems {
    numsubprob: Vec<usize>,
    subprobstartpts: Vec<usize>,
    subprob_to_bin: Vec<usize>,
    ranges: Vec<Range<usize>>,
}

impl Subproblems {
    pub fn new(sort: &BinSort, max_subproblem_size: usize) -> Result<Self, SpreadError> {
        if max_subproblem_size == 0 {
            return Err(SpreadError::ZeroSubproblemSize);
        }

        let binsize = sort.binsize();
        let binstartpts = sort.binstartpts();

        let numsubprob: Vec<usize> = binsize
            .par_iter()
            .map(|&count| count.div_ceil(max_subproblem_size))
            .collect();

        let mut subprobstartpts = exclusive_prefix_sum(&numsubprob);
        subprobstartpts.push(numsubprob.iter().sum());

        let (subprob_to_bin, ranges): (Vec<usize>, Vec<Range<usize>>) = numsubprob
            .par_iter()
            .enumerate()
            .flat_map_iter(|(bin, &count)| {
                let bin_start = binstartpts[bin];
                let bin_end = bin_start + binsize[bin];
                (0..count).map(move |i| {
                    let start = bin_start + i * max_subproblem_size;
                    (bin, start..(start + max_subproblem_size).min(bin_end))
                })
            })
            .unzip();

        Ok(Subproblems {
            numsubprob,
            subprobstartpts,
            subprob_to_bin,
            ranges,
        })
    }

    /// Total number of subproblems across all bins.
    pub fn total(&self) -> usize {
        self.subprob_to_bin.len()
    }

    /// Number of subproblems contributed by each bin.
    pub fn numsubprob(&self) -> &[usize] {
        &self.numsubprob
    }

    /// Exclusive prefix sum of [`numsubprob`](Self::numsubprob), with the total appended.
    pub fn subprobstartpts(&self) -> &[usize] {
        &self.subprobstartpts
    }

    /// Bin owning each subproblem.
    pub fn subprob_to_bin(&self) -> &[usize] {
        &self.subprob_to_bin
    }

    /// Sorted point positions covered by subproblem `s`.
    #[inline(always)]
    pub fn range(&self, s: usize) -> Range<usize> {
        self.ranges[s].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        binning::{BinLayout, NonUniformPoints},
        spreadinterp::{Dimensions, GridShape, RescaleMode},
    };
    use faer::Mat;

    fn clustered_sort(num_points: usize) -> BinSort {
        let shape = GridShape::new(Dimensions::One, &[128]);
        let layout = BinLayout::new(&shape, [32, 32, 16], 4).unwrap();
        // Three quarters of the points share the first bin.
        let raw = Mat::from_fn(num_points, 1, |i, _| match i % 4 {
            0 => 100.0 + (i % 7) as f64,
            _ => 1.0 + (i % 29) as f64,
        });
        let points = NonUniformPoints::from_points(&raw, &shape, RescaleMode::ZeroToN).unwrap();
        BinSort::new(&points, &layout).unwrap()
    }

    #[test]
    fn subproblems_partition_sorted_positions_in_order() {
        let sort = clustered_sort(1000);
        let subproblems = Subproblems::new(&sort, 64).unwrap();

        assert_eq!(sort.binsize(), &[750, 0, 0, 250]);
        assert_eq!(subproblems.numsubprob(), &[12, 0, 0, 4]);
        assert_eq!(subproblems.subprobstartpts(), &[0, 12, 12, 12, 16]);
        assert_eq!(subproblems.total(), subproblems.numsubprob().iter().sum::<usize>());

        let mut next = 0;
        for s in 0..subproblems.total() {
            let range = subproblems.range(s);
            assert_eq!(range.start, next);
            assert!(!range.is_empty() && range.len() <= 64);
            next = range.end;

            let bin = subproblems.subprob_to_bin()[s];
            assert!(sort.binsize()[bin] > 0);
            for &j in &sort.idxnupts()[range] {
                assert_eq!(sort.bin_index()[j], bin);
            }
        }
        assert_eq!(next, 1000);
    }

    #[test]
    fn empty_and_single_point_sets() {
        let empty = clustered_sort(0);
        let subproblems = Subproblems::new(&empty, 16).unwrap();
        assert_eq!(subproblems.total(), 0);
        assert_eq!(subproblems.subprobstartpts(), &[0, 0, 0, 0, 0]);

        let single = clustered_sort(1);
        let subproblems = Subproblems::new(&single, 16).unwrap();
        assert_eq!(subproblems.total(), 1);
        assert_eq!(subproblems.range(0), 0..1);

        assert_eq!(
            Subproblems::new(&single, 0).unwrap_err(),
            SpreadError::ZeroSubproblemSize
        );
    }
}
