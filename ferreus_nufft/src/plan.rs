/////////////////////////////////////////////////////////////////////////////////////////////
//
// Implements NUFFT plan creation, point binding, and teardown.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::{
    config::{Options, SpreadDirection},
    deconvolve::Deconvolver,
    device::{DeviceBuffer, StreamSet},
    errors::{ConfigurationError, GeometryError, NufftError, ResourceError, StateError},
    fft::{FftPlan, FftSign},
    progress::{PipelineStage, ProgressMsg, ProgressSink},
};
use faer::Mat;
use ferreus_nufft_utils::{
    KernelFromParams, next235even,
    kernels::{EsKernel, HornerKernel},
};
use ferreus_spreadinterp::{
    AtomicGrid, AtomicGridSlot, BinLayout, BinSort, Dimensions, GridShape, NonUniformPoints,
    SpreadError, Spreader, Subproblems,
};
use num_complex::Complex64;
use std::sync::Arc;
use std::time::Instant;

/// Largest supported total fine grid size.
pub const MAX_NF: u128 = 100_000_000_000;

/// Lifecycle state of a [`Plan`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlanState {
    /// Options validated and buffers allocated, no points yet.
    Configured,

    /// Points sorted into bins and subproblems, ready to execute.
    PointsBound,

    /// A transform is running.
    Executing,

    /// Buffers released, every further call fails.
    Destroyed,
}

/// Spreader specialised for the kernel strategy chosen at plan creation.
#[derive(Debug)]
pub(crate) enum SpreaderKind {
    Direct(Spreader<EsKernel>),
    Horner(Spreader<HornerKernel>),
}

impl SpreaderKind {
    fn layout(&self) -> &BinLayout {
        match self {
            SpreaderKind::Direct(s) => s.layout(),
            SpreaderKind::Horner(s) => s.layout(),
        }
    }

    pub(crate) fn spread(
        &self,
        bound: &BoundPoints,
        strengths: &[Complex64],
        grid: AtomicGridSlot<'_>,
    ) -> Result<(), SpreadError> {
        let (p, s, sub) = (&bound.points, &bound.sort, &bound.subproblems);
        match self {
            SpreaderKind::Direct(spreader) => spreader.spread(p, s, sub, strengths, grid),
            SpreaderKind::Horner(spreader) => spreader.spread(p, s, sub, strengths, grid),
        }
    }

    pub(crate) fn interpolate(
        &self,
        bound: &BoundPoints,
        grid: &[Complex64],
        out: &mut [Complex64],
    ) -> Result<(), SpreadError> {
        let (p, s, sub) = (&bound.points, &bound.sort, &bound.subproblems);
        match self {
            SpreaderKind::Direct(spreader) => spreader.interpolate(p, s, sub, grid, out),
            SpreaderKind::Horner(spreader) => spreader.interpolate(p, s, sub, grid, out),
        }
    }
}

/// Rescaled points with their bin sort and subproblem decomposition.
#[derive(Debug)]
pub(crate) struct BoundPoints {
    pub(crate) points: NonUniformPoints,
    pub(crate) sort: BinSort,
    pub(crate) subproblems: Subproblems,
}

/// Convenience builder for constructing a [`Plan`].
///
/// The builder should be called via the [`Plan::builder`] method.
pub struct PlanBuilder {
    num_points: usize,
    mode_counts: Vec<usize>,
    options: Options,
    ntransf: usize,
    ntransf_fft_batch: usize,
    iflag: i32,
    progress_callback: Option<Arc<dyn ProgressSink>>,
}

impl PlanBuilder {
    /// Number of transforms run by each execute call. Defaults to 1.
    pub fn ntransf(mut self, ntransf: usize) -> Self {
        self.ntransf = ntransf;
        self
    }

    /// Number of transforms sharing one FFT call. `0` uses `ntransf`.
    pub fn ntransf_fft_batch(mut self, ntransf_fft_batch: usize) -> Self {
        self.ntransf_fft_batch = ntransf_fft_batch;
        self
    }

    /// Sign of the exponent. Defaults to `1`.
    pub fn iflag(mut self, iflag: i32) -> Self {
        self.iflag = iflag;
        self
    }

    /// Optional callback for reporting plan progress and stage timings.
    pub fn progress_callback(mut self, progress_callback: Arc<dyn ProgressSink>) -> Self {
        self.progress_callback = Some(progress_callback);
        self
    }

    /// Builds and returns the configured [`Plan`].
    pub fn build(self) -> Result<Plan, NufftError> {
        Plan::create(
            self.num_points,
            &self.mode_counts,
            self.ntransf,
            self.ntransf_fft_batch,
            self.iflag,
            self.options,
            self.progress_callback,
        )
    }
}

/// A reusable plan for batches of type 1 or type 2 NUFFTs of a fixed size.
///
/// A plan fixes the number of points, the mode counts, the number of
/// transforms per execute call and the spread direction. Points are bound once
/// with [`set_points`](Plan::set_points) and may then be transformed any number
/// of times.
#[derive(Debug)]
pub struct Plan {
    pub(crate) num_points: usize,
    pub(crate) mode_counts: [usize; 3],
    pub(crate) dimensions: Dimensions,
    pub(crate) ntransf: usize,
    pub(crate) ntransf_fft_batch: usize,
    /// `ntransf * num_points`, checked at creation.
    pub(crate) point_batch_len: usize,
    /// `ntransf * num_modes`, checked at creation.
    pub(crate) mode_batch_len: usize,
    pub(crate) iflag: i32,
    pub(crate) options: Options,
    pub(crate) shape: GridShape,
    pub(crate) spreader: SpreaderKind,
    pub(crate) deconvolver: Deconvolver,
    pub(crate) fft: FftPlan,
    pub(crate) streams: StreamSet,
    pub(crate) fw: DeviceBuffer<Complex64>,
    pub(crate) accumulator: AtomicGrid,
    pub(crate) bound: Option<BoundPoints>,
    pub(crate) state: PlanState,
    pub(crate) progress_callback: Option<Arc<dyn ProgressSink>>,
}

impl Plan {
    /// Creates a plan for `ntransf` transforms of `num_points` points onto
    /// `mode_counts` modes. The length of `mode_counts` selects 1, 2 or 3
    /// dimensions.
    pub fn new(
        num_points: usize,
        mode_counts: &[usize],
        ntransf: usize,
        ntransf_fft_batch: usize,
        iflag: i32,
        options: Options,
    ) -> Result<Self, NufftError> {
        Plan::create(
            num_points,
            mode_counts,
            ntransf,
            ntransf_fft_batch,
            iflag,
            options,
            None,
        )
    }

    /// Returns a new [`PlanBuilder`] running one transform with `iflag = 1`.
    pub fn builder(num_points: usize, mode_counts: &[usize], options: Options) -> PlanBuilder {
        PlanBuilder {
            num_points,
            mode_counts: mode_counts.to_vec(),
            options,
            ntransf: 1,
            ntransf_fft_batch: 0,
            iflag: 1,
            progress_callback: None,
        }
    }

    fn create(
        num_points: usize,
        mode_counts: &[usize],
        ntransf: usize,
        ntransf_fft_batch: usize,
        iflag: i32,
        options: Options,
        progress_callback: Option<Arc<dyn ProgressSink>>,
    ) -> Result<Self, NufftError> {
        options.validate()?;

        let dimensions = Dimensions::from_count(mode_counts.len()).ok_or(
            ConfigurationError::UnsupportedDimensions {
                num_mode_counts: mode_counts.len(),
            },
        )?;
        if ntransf == 0 {
            return Err(ConfigurationError::ZeroTransforms.into());
        }
        if num_points > u32::MAX as usize {
            return Err(ConfigurationError::TooManyPoints { num_points }.into());
        }
        let requested_fft_batch = ntransf_fft_batch;
        let ntransf_fft_batch = match ntransf_fft_batch {
            0 => ntransf,
            b => b.min(ntransf),
        };

        let mut modes = [1usize; 3];
        modes[..mode_counts.len()].copy_from_slice(mode_counts);

        let fine_sizes = fine_grid_sizes(&modes[..dimensions.count()], &options)?;
        let shape = GridShape::new(dimensions, &fine_sizes);

        let num_modes = modes
            .iter()
            .try_fold(1usize, |acc, &m| acc.checked_mul(m))
            .ok_or(ResourceError::Allocation {
                buffer: "mode output",
                elements: usize::MAX,
            })?;
        let point_batch_len = checked_len(ntransf, num_points, "point output")?;
        let mode_batch_len = checked_len(ntransf, num_modes, "mode output")?;

        let params = options.kernel_params();
        let layout = BinLayout::new(&shape, options.bin_sizes(), params.nspread)?;
        let strategy = options.spread_method.into();
        let spreader = match options.use_horner {
            true => SpreaderKind::Horner(Spreader::new(
                HornerKernel::from_params(&params),
                shape,
                layout,
                strategy,
            )),
            false => SpreaderKind::Direct(Spreader::new(
                EsKernel::from_params(&params),
                shape,
                layout,
                strategy,
            )),
        };

        let deconvolver = Deconvolver::new(
            modes,
            shape,
            &EsKernel::from_params(&params),
            options.coordinate_convention,
        )?;

        let fft = FftPlan::new(shape, FftSign::from_iflag(iflag))?;
        let streams = StreamSet::new(options.num_streams)?;

        let batch_len = checked_len(ntransf_fft_batch, shape.len(), "fine grid")?;
        let fw = DeviceBuffer::filled("fine grid", batch_len, Complex64::new(0.0, 0.0))?;
        let accumulator = match options.spread_direction {
            SpreadDirection::Spread => AtomicGrid::new(batch_len)?,
            SpreadDirection::Interpolate => AtomicGrid::new(0)?,
        };

        if let Some(sink) = &progress_callback {
            if requested_fft_batch > ntransf {
                sink.emit(ProgressMsg::Message {
                    message: format!(
                        "ntransf_fft_batch {} exceeds ntransf, clamped to {}",
                        requested_fft_batch, ntransf
                    ),
                });
            }
            sink.emit(ProgressMsg::PlanCreated {
                fine_grid_sizes: shape.nf(),
                nspread: params.nspread,
                ntransf,
                ntransf_fft_batch,
            });
        }

        Ok(Plan {
            num_points,
            mode_counts: modes,
            dimensions,
            ntransf,
            ntransf_fft_batch,
            point_batch_len,
            mode_batch_len,
            iflag,
            options,
            shape,
            spreader,
            deconvolver,
            fft,
            streams,
            fw,
            accumulator,
            bound: None,
            state: PlanState::Configured,
            progress_callback,
        })
    }

    /// Binds the non-uniform points (rows are points, columns are dimensions).
    ///
    /// Points are rescaled, sorted into bins and split into subproblems. A plan
    /// accepts exactly one call; use [`rebind_points`](Plan::rebind_points) to
    /// replace a bound point set.
    pub fn set_points(&mut self, points: &Mat<f64>) -> Result<(), NufftError> {
        match self.state {
            PlanState::Destroyed => return Err(StateError::Destroyed.into()),
            PlanState::PointsBound | PlanState::Executing => {
                return Err(StateError::PointsAlreadyBound.into());
            }
            PlanState::Configured => {}
        }

        self.bound = Some(self.bind(points)?);
        self.state = PlanState::PointsBound;
        Ok(())
    }

    /// Replaces the bound points with a new set of the same size.
    ///
    /// The new binning is built in full before the old one is dropped, so a
    /// failure leaves the previous binding untouched.
    pub fn rebind_points(&mut self, points: &Mat<f64>) -> Result<(), NufftError> {
        if self.state == PlanState::Destroyed {
            return Err(StateError::Destroyed.into());
        }

        let bound = self.bind(points)?;
        self.bound = Some(bound);
        self.state = PlanState::PointsBound;
        Ok(())
    }

    fn bind(&self, points: &Mat<f64>) -> Result<BoundPoints, NufftError> {
        if points.nrows() != self.num_points {
            return Err(GeometryError::PointCountMismatch {
                expected: self.num_points,
                actual: points.nrows(),
            }
            .into());
        }

        let start = Instant::now();
        let points = NonUniformPoints::from_points(
            points,
            &self.shape,
            self.options.coordinate_convention.into(),
        )?;
        let sort_start = Instant::now();
        let sort = BinSort::new(&points, self.spreader.layout())?;
        self.emit(ProgressMsg::StageCompleted {
            stage: PipelineStage::BinSort,
            batch: 0,
            elapsed: sort_start.elapsed(),
        });
        let subproblems = Subproblems::new(&sort, self.options.max_subproblem_size)?;

        if let Some(sink) = &self.progress_callback {
            sink.emit(ProgressMsg::PointsBound {
                num_points: self.num_points,
                num_bins: self.spreader.layout().total_bins(),
                num_subproblems: subproblems.total(),
                elapsed: start.elapsed(),
            });
        }

        Ok(BoundPoints {
            points,
            sort,
            subproblems,
        })
    }

    /// Releases every buffer, the FFT plan and the worker pools.
    ///
    /// Further calls on the plan fail with [`StateError::Destroyed`].
    pub fn destroy(&mut self) -> Result<(), NufftError> {
        if self.state == PlanState::Destroyed {
            return Err(StateError::Destroyed.into());
        }

        self.fw.release();
        self.accumulator.release();
        self.bound = None;
        self.deconvolver.release();
        self.fft.release();
        self.streams.release();
        self.state = PlanState::Destroyed;
        Ok(())
    }

    pub fn state(&self) -> PlanState {
        self.state
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Fine grid sizes `[nf1, nf2, nf3]`, 1 in unused dimensions.
    pub fn fine_grid_sizes(&self) -> [usize; 3] {
        self.shape.nf()
    }

    /// Mode counts `[ms, mt, mu]`, 1 in unused dimensions.
    pub fn mode_counts(&self) -> [usize; 3] {
        self.mode_counts
    }

    /// Number of modes per transform.
    pub fn num_modes(&self) -> usize {
        self.mode_counts.iter().product()
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions.count()
    }

    pub fn ntransf(&self) -> usize {
        self.ntransf
    }

    pub fn ntransf_fft_batch(&self) -> usize {
        self.ntransf_fft_batch
    }

    pub fn iflag(&self) -> i32 {
        self.iflag
    }

    /// Bin layout used to sort the points.
    pub fn bin_layout(&self) -> &BinLayout {
        self.spreader.layout()
    }

    /// Binning arrays of the bound points, if any.
    pub fn bin_sort(&self) -> Option<&BinSort> {
        self.bound.as_ref().map(|b| &b.sort)
    }

    /// Subproblem decomposition of the bound points, if any.
    pub fn subproblems(&self) -> Option<&Subproblems> {
        self.bound.as_ref().map(|b| &b.subproblems)
    }

    /// Kernel Fourier series of dimension `d`, `phi_hat(k)` for `k` in `0..=nf/2`.
    pub fn kernel_fourier_series(&self, d: usize) -> &[f64] {
        self.deconvolver.fwker(d)
    }

    pub(crate) fn emit(&self, msg: ProgressMsg) {
        if let Some(sink) = &self.progress_callback {
            sink.emit(msg);
        }
    }
}

/// `nf = next235even(max(sigma * m, 2 w))` per dimension.
fn fine_grid_sizes(modes: &[usize], options: &Options) -> Result<Vec<usize>, NufftError> {
    let mut sizes = Vec::with_capacity(modes.len());
    for &m in modes {
        let upsampled = options.upsampling_factor * m as f64;
        // Any single axis beyond the total limit fails before rounding up.
        if upsampled > MAX_NF as f64 {
            return Err(ResourceError::FineGridTooLarge {
                total: upsampled as u128,
                max: MAX_NF,
            }
            .into());
        }
        sizes.push(next235even((upsampled as usize).max(2 * options.nspread)));
    }

    let total: u128 = sizes.iter().map(|&n| n as u128).product();
    if total > MAX_NF {
        return Err(ResourceError::FineGridTooLarge { total, max: MAX_NF }.into());
    }
    Ok(sizes)
}

fn checked_len(count: usize, len: usize, buffer: &'static str) -> Result<usize, ResourceError> {
    count
        .checked_mul(len)
        .ok_or(ResourceError::Allocation {
            buffer,
            elements: usize::MAX,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::CoordinateConvention, common::generate_random_points};
    use ferreus_nufft_utils::KernelParamsError;

    fn options(tolerance: f64) -> Options {
        Options::from_tolerance(tolerance, 2.0).unwrap()
    }

    #[test]
    fn fine_grid_sizes_follow_upsampling_rule() {
        let plan = Plan::new(10, &[50, 7], 1, 0, 1, options(1e-6)).unwrap();
        // 2 * 7 = 14 is not 5-smooth and even, so it rounds up.
        assert_eq!(plan.fine_grid_sizes(), [100, 16, 1]);
        assert_eq!(plan.num_modes(), 350);
        assert_eq!(plan.state(), PlanState::Configured);
    }

    #[test]
    fn oversized_grids_are_resource_errors() {
        let result = Plan::new(10, &[100_000, 100_000, 100_000], 1, 0, 1, options(1e-3));
        assert!(matches!(
            result,
            Err(NufftError::Resource(ResourceError::FineGridTooLarge { .. }))
        ));
    }

    #[test]
    fn invalid_construction_arguments_are_rejected() {
        assert!(matches!(
            Plan::new(10, &[8, 8, 8, 8], 1, 0, 1, options(1e-6)),
            Err(NufftError::Configuration(
                ConfigurationError::UnsupportedDimensions { num_mode_counts: 4 }
            ))
        ));
        assert!(matches!(
            Plan::new(10, &[8], 0, 0, 1, options(1e-6)),
            Err(NufftError::Configuration(ConfigurationError::ZeroTransforms))
        ));

        let narrow_bins = Options::builder(1e-6).bin_sizes(4, 32, 16).build().unwrap();
        assert!(matches!(
            Plan::new(10, &[32], 1, 0, 1, narrow_bins),
            Err(NufftError::Configuration(
                ConfigurationError::BinSizeTooSmall { dimension: 0, .. }
            ))
        ));

        // Inactive dimensions do not need wide bins.
        let narrow_z = Options::builder(1e-6).bin_sizes(32, 32, 1).build().unwrap();
        assert!(Plan::new(10, &[32, 32], 1, 0, 1, narrow_z).is_ok());
    }

    #[test]
    fn fft_batch_size_is_clamped() {
        let plan = Plan::new(10, &[16], 3, 0, 1, options(1e-6)).unwrap();
        assert_eq!(plan.ntransf_fft_batch(), 3);
        let plan = Plan::new(10, &[16], 3, 8, 1, options(1e-6)).unwrap();
        assert_eq!(plan.ntransf_fft_batch(), 3);
        let plan = Plan::new(10, &[16], 3, 2, 1, options(1e-6)).unwrap();
        assert_eq!(plan.ntransf_fft_batch(), 2);
    }

    #[test]
    fn binding_satisfies_sort_invariants() {
        let num_points = 2000;
        let points = generate_random_points(num_points, 2, Some(7));
        let mut plan = Plan::new(num_points, &[40, 30], 1, 0, -1, options(1e-5)).unwrap();
        plan.set_points(&points).unwrap();
        assert_eq!(plan.state(), PlanState::PointsBound);

        let sort = plan.bin_sort().unwrap();
        assert_eq!(sort.binsize().iter().sum::<usize>(), num_points);
        for j in 0..num_points {
            assert_eq!(sort.idxnupts()[sort.sorted_position(j)], j);
        }

        let subproblems = plan.subproblems().unwrap();
        assert_eq!(subproblems.numsubprob().iter().sum::<usize>(), subproblems.total());
    }

    #[test]
    fn equivalent_conventions_give_identical_bins() {
        let num_points = 500;
        let points = generate_random_points(num_points, 3, Some(11));

        let mut minus_pi = Plan::new(num_points, &[20, 24, 18], 1, 0, 1, options(1e-4)).unwrap();
        minus_pi.set_points(&points).unwrap();

        let nf = minus_pi.fine_grid_sizes();
        let grid_units = Mat::from_fn(num_points, 3, |j, d| {
            (points[(j, d)] / std::f64::consts::TAU + 0.5) * nf[d] as f64
        });
        let zero_to_n_options = Options::builder(1e-4)
            .coordinate_convention(CoordinateConvention::ZeroToN)
            .build()
            .unwrap();
        let mut zero_to_n = Plan::new(num_points, &[20, 24, 18], 1, 0, 1, zero_to_n_options).unwrap();
        zero_to_n.set_points(&grid_units).unwrap();

        assert_eq!(
            minus_pi.bin_sort().unwrap().bin_index(),
            zero_to_n.bin_sort().unwrap().bin_index()
        );
    }

    #[test]
    fn lifecycle_errors() {
        let points = generate_random_points(5, 1, Some(3));
        let mut plan = Plan::new(5, &[16], 1, 0, 1, options(1e-6)).unwrap();

        assert!(matches!(
            plan.execute_type1(&[Complex64::new(1.0, 0.0); 5]),
            Err(NufftError::State(StateError::PointsNotBound))
        ));

        plan.set_points(&points).unwrap();
        assert!(matches!(
            plan.set_points(&points),
            Err(NufftError::State(StateError::PointsAlreadyBound))
        ));
        plan.rebind_points(&points).unwrap();

        let wrong = generate_random_points(6, 1, Some(3));
        assert!(matches!(
            plan.rebind_points(&wrong),
            Err(NufftError::Geometry(GeometryError::PointCountMismatch { expected: 5, actual: 6 }))
        ));
        assert_eq!(plan.state(), PlanState::PointsBound);

        plan.destroy().unwrap();
        assert_eq!(plan.state(), PlanState::Destroyed);
        assert!(matches!(
            plan.destroy(),
            Err(NufftError::State(StateError::Destroyed))
        ));
        assert!(matches!(
            plan.execute_type1(&[Complex64::new(1.0, 0.0); 5]),
            Err(NufftError::State(StateError::Destroyed))
        ));
    }

    #[test]
    fn out_of_range_points_are_geometry_errors() {
        let mut plan = Plan::new(2, &[16], 1, 0, 1, options(1e-6)).unwrap();
        let points = Mat::from_fn(2, 1, |j, _| if j == 0 { 0.0 } else { 20.0 });
        assert!(matches!(
            plan.set_points(&points),
            Err(NufftError::Geometry(GeometryError::PointOutOfRange { point_index: 1, .. }))
        ));
        assert_eq!(plan.state(), PlanState::Configured);
    }

    #[test]
    fn progress_sink_receives_lifecycle_events() {
        use crate::progress::closure_sink;
        use std::sync::Mutex;

        let events = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::clone(&events);
        let (sink, handle) = closure_sink(64, move |msg| {
            let name = match msg {
                ProgressMsg::PlanCreated { .. } => "created",
                ProgressMsg::PointsBound { .. } => "bound",
                ProgressMsg::StageCompleted { .. } => "stage",
                ProgressMsg::Message { .. } => "message",
            };
            store.lock().unwrap().push(name);
        });

        let points = generate_random_points(20, 1, Some(5));
        let options = Options::builder(1e-6)
            .spread_direction(SpreadDirection::Spread)
            .build()
            .unwrap();
        let mut plan = Plan::builder(20, &[12], options)
            .progress_callback(sink)
            .build()
            .unwrap();
        plan.set_points(&points).unwrap();
        drop(plan);
        handle.join().unwrap();

        let events = events.lock().unwrap();
        assert_eq!(events[0], "created");
        assert_eq!(events[1], "stage");
        assert_eq!(events[2], "bound");
    }

    #[test]
    fn edited_options_are_checked_at_creation() {
        let mut zero_tolerance = options(1e-6);
        zero_tolerance.tolerance = 0.0;
        assert!(matches!(
            Plan::new(10, &[16], 1, 0, 1, zero_tolerance),
            Err(NufftError::Configuration(ConfigurationError::Kernel(
                KernelParamsError::ToleranceNotPositive { .. }
            )))
        ));

        // A width the kernel shape was not built for.
        let mut narrow = options(1e-6);
        narrow.nspread = 3;
        assert!(matches!(
            Plan::new(50, &[16], 1, 0, 1, narrow),
            Err(NufftError::Configuration(ConfigurationError::Kernel(
                KernelParamsError::InconsistentShape { nspread: 3, .. }
            )))
        ));
    }

    #[test]
    fn batch_lengths_that_overflow_are_rejected() {
        assert!(matches!(
            Plan::new(4, &[8], usize::MAX / 2, 1, 1, options(1e-6)),
            Err(NufftError::Resource(ResourceError::Allocation {
                buffer: "point output",
                ..
            }))
        ));
        assert!(matches!(
            Plan::new(0, &[64, 64], usize::MAX / 1024, 1, 1, options(1e-6)),
            Err(NufftError::Resource(ResourceError::Allocation {
                buffer: "mode output",
                ..
            }))
        ));

        let plan = Plan::new(4, &[8, 6], 3, 1, 1, options(1e-6)).unwrap();
        assert_eq!(plan.point_batch_len, 12);
        assert_eq!(plan.mode_batch_len, 144);
    }

    #[test]
    fn huge_mode_counts_fail_before_rounding() {
        let cases: [&[usize]; 2] = [&[usize::MAX], &[usize::MAX / 2, 4]];
        for modes in cases {
            assert!(matches!(
                Plan::new(10, modes, 1, 0, 1, options(1e-3)),
                Err(NufftError::Resource(ResourceError::FineGridTooLarge { .. }))
            ));
        }
    }

    #[test]
    fn destroy_releases_compute_resources() {
        let options = Options::builder(1e-6).num_streams(3).build().unwrap();
        let mut plan = Plan::new(5, &[16], 1, 0, 1, options).unwrap();
        plan.set_points(&generate_random_points(5, 1, Some(9))).unwrap();
        assert!(!plan.kernel_fourier_series(0).is_empty());

        plan.destroy().unwrap();
        assert!(plan.kernel_fourier_series(0).is_empty());
        assert!(plan.fft.is_released());
        assert!(plan.streams.is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn destroy_stops_stream_threads() {
        use crate::device::wait_for_threads;

        let options = Options::builder(1e-6).num_streams(3).build().unwrap();
        let mut plan = Plan::new(5, &[16], 1, 0, 1, options).unwrap();
        let prefix = plan.streams.thread_prefix();
        assert!(wait_for_threads(&prefix, |n| n >= 3));

        plan.destroy().unwrap();
        assert!(wait_for_threads(&prefix, |n| n == 0));
    }
}
