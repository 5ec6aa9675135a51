/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements a fixed-size complex grid accumulated through atomic floating-point adds.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::spreadinterp::SpreadError;
use num_complex::Complex64;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

/// Adds `value` to the `f64` stored as raw bits in `cell` with a compare-and-swap loop.
#[inline(always)]
fn atomic_add_f64(cell: &AtomicU64, value: f64) {
    let mut current = cell.load(Ordering::Relaxed);
    loop {
        let updated = (f64::from_bits(current) + value).to_bits();
        match cell.compare_exchange_weak(current, updated, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => break,
            Err(actual) => current = actual,
        }
    }
}

/// Complex accumulation buffer holding one or more fine grids back to back.
///
/// Each complex cell is stored as two `AtomicU64` words (real, imaginary) so
/// concurrent spreading work units can add into shared cells without locks.
#[derive(Debug)]
pub struct AtomicGrid {
    cells: Vec<AtomicU64>,
}

impl AtomicGrid {
    /// Allocates a zeroed grid of `num_cells` complex values.
    pub fn new(num_cells: usize) -> Result<Self, SpreadError> {
        let words = num_cells
            .checked_mul(2)
            .ok_or(SpreadError::GridAllocation { cells: num_cells })?;

        let mut cells = Vec::new();
        cells
            .try_reserve_exact(words)
            .map_err(|_| SpreadError::GridAllocation { cells: num_cells })?;
        cells.extend((0..words).map(|_| AtomicU64::new(0)));

        Ok(AtomicGrid { cells })
    }

    /// Number of complex cells.
    pub fn len(&self) -> usize {
        self.cells.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Sets every cell back to zero.
    pub fn reset(&self) {
        self.cells
            .par_iter()
            .for_each(|cell| cell.store(0, Ordering::Relaxed));
    }

    /// Frees the storage, leaving an empty grid.
    pub fn release(&mut self) {
        self.cells = Vec::new();
    }

    /// Borrows the `index`-th block of `slot_len` complex cells.
    pub fn slot(&self, index: usize, slot_len: usize) -> AtomicGridSlot<'_> {
        AtomicGridSlot {
            cells: &self.cells[2 * index * slot_len..2 * (index + 1) * slot_len],
        }
    }

    /// Copies the first `out.len()` accumulated cells into `out`.
    pub fn write_into(&self, out: &mut [Complex64]) {
        out.par_iter_mut().enumerate().for_each(|(i, value)| {
            *value = Complex64::new(
                f64::from_bits(self.cells[2 * i].load(Ordering::Relaxed)),
                f64::from_bits(self.cells[2 * i + 1].load(Ordering::Relaxed)),
            );
        });
    }
}

/// A borrowed window of an [`AtomicGrid`] holding exactly one fine grid.
#[derive(Debug, Clone, Copy)]
pub struct AtomicGridSlot<'a> {
    cells: &'a [AtomicU64],
}

impl AtomicGridSlot<'_> {
    pub fn len(&self) -> usize {
        self.cells.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Atomically adds `value` into complex cell `index`.
    #[inline(always)]
    pub fn add(&self, index: usize, value: Complex64) {
        atomic_add_f64(&self.cells[2 * index], value.re);
        atomic_add_f64(&self.cells[2 * index + 1], value.im);
    }

    /// Reads complex cell `index`.
    #[inline(always)]
    pub fn get(&self, index: usize) -> Complex64 {
        Complex64::new(
            f64::from_bits(self.cells[2 * index].load(Ordering::Relaxed)),
            f64::from_bits(self.cells[2 * index + 1].load(Ordering::Relaxed)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrent_adds_accumulate_every_contribution() {
        let grid = AtomicGrid::new(8).unwrap();
        let slot = grid.slot(0, 8);

        (0..10_000usize).into_par_iter().for_each(|i| {
            slot.add(i % 8, Complex64::new(1.0, -0.5));
        });

        let mut out = vec![Complex64::new(0.0, 0.0); 8];
        grid.write_into(&mut out);
        for value in out {
            assert_eq!(value, Complex64::new(1250.0, -625.0));
        }

        grid.reset();
        assert_eq!(slot.get(3), Complex64::new(0.0, 0.0));
    }

    #[test]
    fn slots_do_not_overlap() {
        let grid = AtomicGrid::new(6).unwrap();
        grid.slot(1, 3).add(0, Complex64::new(2.0, 0.0));
        assert_eq!(grid.slot(0, 3).get(0), Complex64::new(0.0, 0.0));
        assert_eq!(grid.slot(1, 3).get(0), Complex64::new(2.0, 0.0));

        let mut out = vec![Complex64::new(0.0, 0.0); 6];
        grid.write_into(&mut out);
        assert_eq!(out[3], Complex64::new(2.0, 0.0));
    }
}
