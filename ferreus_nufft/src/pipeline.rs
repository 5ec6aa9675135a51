/////////////////////////////////////////////////////////////////////////////////////////////
//
// Runs batched type 1 and type 2 transforms through spread, FFT and deconvolution stages.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{
    config::SpreadDirection,
    device::DeviceBuffer,
    errors::{ConfigurationError, ExecutionError, NufftError, StateError},
    plan::{BoundPoints, Plan, PlanState},
    progress::{PipelineStage, ProgressMsg},
};
use num_complex::Complex64;
use std::time::Instant;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

impl Plan {
    /// Type 1 (non-uniform to uniform):
    /// `f[k] = sum_j c_j exp(sign(iflag) i k . x_j)` for every transform of the batch.
    ///
    /// `strengths` holds `ntransf` blocks of `num_points` values. Returns
    /// `ntransf` blocks of `num_modes()` values, modes increasing from
    /// `-(m/2)` with x fastest.
    ///
    /// ### Errors
    /// - [`StateError`] if points are not bound or the plan is destroyed.
    /// - [`ConfigurationError::DirectionMismatch`] if the plan interpolates.
    /// - [`ExecutionError::BufferLength`] if `strengths` has the wrong length.
    pub fn execute_type1(&mut self, strengths: &[Complex64]) -> Result<Vec<Complex64>, NufftError> {
        self.check_execute(SpreadDirection::Spread)?;
        check_buffer("strength", self.point_batch_len, strengths.len())?;

        let mut fk = DeviceBuffer::filled("mode output", self.mode_batch_len, ZERO)?;
        if self.num_points == 0 || self.num_modes() == 0 {
            return Ok(fk.into_vec());
        }

        self.state = PlanState::Executing;
        let result = self.run_type1(strengths, fk.as_mut_slice());
        self.state = PlanState::PointsBound;

        result.map(|_| fk.into_vec())
    }

    /// Type 2 (uniform to non-uniform):
    /// `c_j = sum_k f[k] exp(sign(iflag) i k . x_j)` for every transform of the batch.
    ///
    /// `modes` holds `ntransf` blocks of `num_modes()` values in the layout
    /// returned by [`execute_type1`](Plan::execute_type1). Returns `ntransf`
    /// blocks of `num_points` values in original point order.
    ///
    /// ### Errors
    /// - [`StateError`] if points are not bound or the plan is destroyed.
    /// - [`ConfigurationError::DirectionMismatch`] if the plan spreads.
    /// - [`ExecutionError::BufferLength`] if `modes` has the wrong length.
    pub fn execute_type2(&mut self, modes: &[Complex64]) -> Result<Vec<Complex64>, NufftError> {
        self.check_execute(SpreadDirection::Interpolate)?;
        check_buffer("mode", self.mode_batch_len, modes.len())?;

        let mut c = DeviceBuffer::filled("point output", self.point_batch_len, ZERO)?;
        if self.num_points == 0 || self.num_modes() == 0 {
            return Ok(c.into_vec());
        }

        self.state = PlanState::Executing;
        let result = self.run_type2(modes, c.as_mut_slice());
        self.state = PlanState::PointsBound;

        result.map(|_| c.into_vec())
    }

    fn check_execute(&self, requested: SpreadDirection) -> Result<(), NufftError> {
        match self.state {
            PlanState::Destroyed => return Err(StateError::Destroyed.into()),
            PlanState::Configured => return Err(StateError::PointsNotBound.into()),
            PlanState::PointsBound | PlanState::Executing => {}
        }
        let planned = self.options.spread_direction;
        if planned != requested {
            return Err(ConfigurationError::DirectionMismatch { planned, requested }.into());
        }
        Ok(())
    }

    fn bound(&self) -> Result<&BoundPoints, NufftError> {
        self.bound
            .as_ref()
            .ok_or(StateError::PointsNotBound.into())
    }

    fn run_type1(&mut self, strengths: &[Complex64], fk: &mut [Complex64]) -> Result<(), NufftError> {
        let num_points = self.num_points;
        let num_modes = self.num_modes();
        let grid_len = self.shape.len();
        self.bound()?;

        for (batch, first) in (0..self.ntransf).step_by(self.ntransf_fft_batch).enumerate() {
            let slots = self.ntransf_fft_batch.min(self.ntransf - first);

            let start = Instant::now();
            self.accumulator.reset();
            {
                let (spreader, accumulator) = (&self.spreader, &self.accumulator);
                let bound = self.bound()?;
                let results = self.streams.run_slots(slots, |slot| {
                    let c = &strengths[(first + slot) * num_points..][..num_points];
                    spreader.spread(bound, c, accumulator.slot(slot, grid_len))
                });
                for result in results {
                    result?;
                }
            }
            self.stage_completed(PipelineStage::Spread, batch, start);

            let start = Instant::now();
            let fw = &mut self.fw.as_mut_slice()[..slots * grid_len];
            self.accumulator.write_into(fw);
            self.fft.execute(fw)?;
            self.stage_completed(PipelineStage::Fft, batch, start);

            let start = Instant::now();
            let fw = &self.fw.as_slice()[..slots * grid_len];
            for (slot, grid) in fw.chunks(grid_len).enumerate() {
                let out = &mut fk[(first + slot) * num_modes..][..num_modes];
                self.deconvolver.deconvolve(grid, out);
            }
            self.stage_completed(PipelineStage::Deconvolve, batch, start);
        }

        Ok(())
    }

    fn run_type2(&mut self, modes: &[Complex64], c: &mut [Complex64]) -> Result<(), NufftError> {
        let num_points = self.num_points;
        let num_modes = self.num_modes();
        let grid_len = self.shape.len();
        self.bound()?;

        for (batch, first) in (0..self.ntransf).step_by(self.ntransf_fft_batch).enumerate() {
            let slots = self.ntransf_fft_batch.min(self.ntransf - first);

            let start = Instant::now();
            let fw = &mut self.fw.as_mut_slice()[..slots * grid_len];
            for (slot, grid) in fw.chunks_mut(grid_len).enumerate() {
                let input = &modes[(first + slot) * num_modes..][..num_modes];
                self.deconvolver.reconvolve(input, grid);
            }
            self.stage_completed(PipelineStage::Reconvolve, batch, start);

            let start = Instant::now();
            let fw = &mut self.fw.as_mut_slice()[..slots * grid_len];
            self.fft.execute(fw)?;
            self.stage_completed(PipelineStage::Fft, batch, start);

            let start = Instant::now();
            {
                let spreader = &self.spreader;
                let fw = &self.fw.as_slice()[..slots * grid_len];
                let bound = self.bound()?;
                let results = self.streams.run_slots(slots, |slot| {
                    let mut out = vec![ZERO; num_points];
                    spreader
                        .interpolate(bound, &fw[slot * grid_len..][..grid_len], &mut out)
                        .map(|_| out)
                });
                for (slot, result) in results.into_iter().enumerate() {
                    c[(first + slot) * num_points..][..num_points].copy_from_slice(&result?);
                }
            }
            self.stage_completed(PipelineStage::Interpolate, batch, start);
        }

        Ok(())
    }

    fn stage_completed(&self, stage: PipelineStage, batch: usize, start: Instant) {
        self.emit(ProgressMsg::StageCompleted {
            stage,
            batch,
            elapsed: start.elapsed(),
        });
    }
}

fn check_buffer(name: &'static str, expected: usize, actual: usize) -> Result<(), ExecutionError> {
    match expected == actual {
        true => Ok(()),
        false => Err(ExecutionError::BufferLength {
            name,
            expected,
            actual,
        }),
    }
}
