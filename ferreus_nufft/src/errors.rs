/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines the error taxonomy returned by NUFFT plans and its conversions from engine errors.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Error types returned by [`Plan`](crate::Plan) operations.

use crate::{config::SpreadDirection, fft::FftError};
use ferreus_nufft_utils::KernelParamsError;
use ferreus_spreadinterp::SpreadError;
use std::error::Error;
use std::fmt;

/// Top level error returned by every fallible plan operation.
#[derive(Debug)]
pub enum NufftError {
    /// Invalid options, sizes or transform parameters.
    Configuration(ConfigurationError),

    /// Invalid point geometry.
    Geometry(GeometryError),

    /// A buffer, grid or worker pool could not be created.
    Resource(ResourceError),

    /// A failure while a transform was running.
    Execution(ExecutionError),

    /// An operation was called in the wrong plan state.
    State(StateError),
}

impl fmt::Display for NufftError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NufftError::Configuration(e) => write!(f, "configuration error: {}", e),
            NufftError::Geometry(e) => write!(f, "geometry error: {}", e),
            NufftError::Resource(e) => write!(f, "resource error: {}", e),
            NufftError::Execution(e) => write!(f, "execution error: {}", e),
            NufftError::State(e) => write!(f, "state error: {}", e),
        }
    }
}

impl Error for NufftError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NufftError::Configuration(e) => Some(e),
            NufftError::Geometry(e) => Some(e),
            NufftError::Resource(e) => Some(e),
            NufftError::Execution(e) => Some(e),
            NufftError::State(e) => Some(e),
        }
    }
}

/// Invalid options, sizes or transform parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// The kernel cannot be configured, typically an impossible tolerance.
    Kernel(KernelParamsError),

    /// Only 1, 2 or 3 mode counts are supported.
    UnsupportedDimensions { num_mode_counts: usize },

    /// A plan must run at least one transform.
    ZeroTransforms,

    /// A plan must own at least one stream.
    ZeroStreams,

    /// Subproblems must hold at least one point.
    ZeroSubproblemSize,

    /// A bin side is narrower than the kernel.
    BinSizeTooSmall {
        dimension: usize,
        bin_size: usize,
        nspread: usize,
    },

    /// More points than the bin counters can represent.
    TooManyPoints { num_points: usize },

    /// The transform type does not match the plan's spread direction.
    DirectionMismatch {
        planned: SpreadDirection,
        requested: SpreadDirection,
    },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::Kernel(e) => write!(f, "{}", e),
            ConfigurationError::UnsupportedDimensions { num_mode_counts } => write!(
                f,
                "{} mode counts given, only 1, 2 or 3 dimensions are supported",
                num_mode_counts
            ),
            ConfigurationError::ZeroTransforms => {
                write!(f, "the number of transforms must be at least 1")
            }
            ConfigurationError::ZeroStreams => {
                write!(f, "the number of streams must be at least 1")
            }
            ConfigurationError::ZeroSubproblemSize => {
                write!(f, "maximum subproblem size must be at least 1")
            }
            ConfigurationError::BinSizeTooSmall {
                dimension,
                bin_size,
                nspread,
            } => write!(
                f,
                "bin size {} in dimension {} is smaller than the kernel width {}",
                bin_size, dimension, nspread
            ),
            ConfigurationError::TooManyPoints { num_points } => write!(
                f,
                "{} points exceed the supported maximum of {}",
                num_points,
                u32::MAX
            ),
            ConfigurationError::DirectionMismatch { planned, requested } => write!(
                f,
                "plan was configured for {:?} but a {:?} transform was requested",
                planned, requested
            ),
        }
    }
}

impl Error for ConfigurationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigurationError::Kernel(e) => Some(e),
            _ => None,
        }
    }
}

/// Invalid point geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// The point matrix has the wrong number of columns.
    DimensionMismatch { expected: usize, actual: usize },

    /// The point matrix has a different number of rows than the plan.
    PointCountMismatch { expected: usize, actual: usize },

    /// A coordinate is NaN or infinite.
    NonFiniteCoordinate { point_index: usize, dimension: usize },

    /// A coordinate lies more than one period outside its convention's range.
    PointOutOfRange {
        point_index: usize,
        dimension: usize,
        value: f64,
    },

    /// A kernel footprint fell outside its subproblem tile.
    FootprintOutsideTile { point_index: usize },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::DimensionMismatch { expected, actual } => write!(
                f,
                "points have {} coordinate columns, expected {}",
                actual, expected
            ),
            GeometryError::PointCountMismatch { expected, actual } => write!(
                f,
                "{} points were given to a plan created for {}",
                actual, expected
            ),
            GeometryError::NonFiniteCoordinate {
                point_index,
                dimension,
            } => write!(
                f,
                "coordinate {} of point {} is not finite",
                dimension, point_index
            ),
            GeometryError::PointOutOfRange {
                point_index,
                dimension,
                value,
            } => write!(
                f,
                "coordinate {} of point {} ({}) is more than one period outside the valid range",
                dimension, point_index, value
            ),
            GeometryError::FootprintOutsideTile { point_index } => write!(
                f,
                "kernel footprint of point {} falls outside its subproblem tile",
                point_index
            ),
        }
    }
}

impl Error for GeometryError {}

/// A buffer, grid or worker pool could not be created.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// The fine grid exceeds the supported total size.
    FineGridTooLarge { total: u128, max: u128 },

    /// A device buffer allocation failed.
    Allocation { buffer: &'static str, elements: usize },

    /// A stream worker pool could not be started.
    StreamCreation { stream: usize, message: String },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::FineGridTooLarge { total, max } => write!(
                f,
                "fine grid of {} cells exceeds the maximum of {}",
                total, max
            ),
            ResourceError::Allocation { buffer, elements } => write!(
                f,
                "failed to allocate {} buffer of {} elements",
                buffer, elements
            ),
            ResourceError::StreamCreation { stream, message } => {
                write!(f, "failed to start stream {}: {}", stream, message)
            }
        }
    }
}

impl Error for ResourceError {}

/// A failure while a transform was running.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// An input buffer has the wrong length.
    BufferLength {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The FFT layer rejected a request.
    Fft(FftError),
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::BufferLength {
                name,
                expected,
                actual,
            } => write!(
                f,
                "{} buffer holds {} values, expected {}",
                name, actual, expected
            ),
            ExecutionError::Fft(e) => write!(f, "FFT failed: {}", e),
        }
    }
}

impl Error for ExecutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ExecutionError::Fft(e) => Some(e),
            _ => None,
        }
    }
}

/// An operation was called in the wrong plan state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// Execute was called before `set_points`.
    PointsNotBound,

    /// `set_points` was called twice; use `rebind_points` instead.
    PointsAlreadyBound,

    /// The plan has been destroyed.
    Destroyed,
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::PointsNotBound => {
                write!(f, "non-uniform points must be set before executing")
            }
            StateError::PointsAlreadyBound => write!(
                f,
                "non-uniform points are already set, use rebind_points to replace them"
            ),
            StateError::Destroyed => write!(f, "the plan has been destroyed"),
        }
    }
}

impl Error for StateError {}

impl From<ConfigurationError> for NufftError {
    fn from(e: ConfigurationError) -> Self {
        NufftError::Configuration(e)
    }
}

impl From<GeometryError> for NufftError {
    fn from(e: GeometryError) -> Self {
        NufftError::Geometry(e)
    }
}

impl From<ResourceError> for NufftError {
    fn from(e: ResourceError) -> Self {
        NufftError::Resource(e)
    }
}

impl From<ExecutionError> for NufftError {
    fn from(e: ExecutionError) -> Self {
        NufftError::Execution(e)
    }
}

impl From<StateError> for NufftError {
    fn from(e: StateError) -> Self {
        NufftError::State(e)
    }
}

impl From<KernelParamsError> for NufftError {
    fn from(e: KernelParamsError) -> Self {
        NufftError::Configuration(ConfigurationError::Kernel(e))
    }
}

impl From<SpreadError> for NufftError {
    fn from(e: SpreadError) -> Self {
        match e {
            SpreadError::DimensionMismatch { expected, actual } => {
                GeometryError::DimensionMismatch { expected, actual }.into()
            }
            SpreadError::NonFiniteCoordinate {
                point_index,
                dimension,
            } => GeometryError::NonFiniteCoordinate {
                point_index,
                dimension,
            }
            .into(),
            SpreadError::PointOutOfRange {
                point_index,
                dimension,
                value,
            } => GeometryError::PointOutOfRange {
                point_index,
                dimension,
                value,
            }
            .into(),
            SpreadError::FootprintOutsideTile { point_index } => {
                GeometryError::FootprintOutsideTile { point_index }.into()
            }
            SpreadError::TooManyPoints { num_points } => {
                ConfigurationError::TooManyPoints { num_points }.into()
            }
            SpreadError::BinSizeTooSmall {
                dimension,
                bin_size,
                nspread,
            } => ConfigurationError::BinSizeTooSmall {
                dimension,
                bin_size,
                nspread,
            }
            .into(),
            SpreadError::ZeroSubproblemSize => ConfigurationError::ZeroSubproblemSize.into(),
            SpreadError::BufferLength {
                name,
                expected,
                actual,
            } => ExecutionError::BufferLength {
                name,
                expected,
                actual,
            }
            .into(),
            SpreadError::GridAllocation { cells } => ResourceError::Allocation {
                buffer: "accumulation grid",
                elements: cells,
            }
            .into(),
        }
    }
}

impl From<FftError> for NufftError {
    fn from(e: FftError) -> Self {
        match e {
            FftError::Allocation { elements } => ResourceError::Allocation {
                buffer: "FFT scratch",
                elements,
            }
            .into(),
            FftError::ShapeMismatch { .. } | FftError::EmptyAxis { .. } => {
                ExecutionError::Fft(e).into()
            }
        }
    }
}
