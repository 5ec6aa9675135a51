/////////////////////////////////////////////////////////////////////////////////////////////
//
// Declares plan options, their tolerance-driven defaults, and versioned JSON persistence.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Declares plan options, their tolerance-driven defaults, and versioned JSON persistence.
use crate::errors::{ConfigurationError, NufftError};
use ferreus_nufft_utils::{
    EsKernelParams, KernelParamsError, constants::DEFAULT_UPSAMPLING_FACTOR,
};
use ferreus_spreadinterp::{RescaleMode, SpreadStrategy};
use serde::{Deserialize, Serialize};
use std::{
    error::Error,
    fmt,
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

/// Direction values move between the non-uniform points and the fine grid.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SpreadDirection {
    /// Non-uniform points to the uniform grid (type 1).
    Spread,

    /// Uniform grid to the non-uniform points (type 2).
    Interpolate,
}

/// Range in which the caller supplies point coordinates.
///
/// Serialised as `0` for [`ZeroToN`](CoordinateConvention::ZeroToN) and `1`
/// for [`MinusPiToPi`](CoordinateConvention::MinusPiToPi).
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(into = "u8", try_from = "u8")]
pub enum CoordinateConvention {
    /// Coordinates in fine grid units, `[0, nf)`.
    ZeroToN,

    /// Coordinates in `[-pi, pi)`.
    MinusPiToPi,
}

impl From<CoordinateConvention> for u8 {
    fn from(value: CoordinateConvention) -> u8 {
        match value {
            CoordinateConvention::ZeroToN => 0,
            CoordinateConvention::MinusPiToPi => 1,
        }
    }
}

impl TryFrom<u8> for CoordinateConvention {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CoordinateConvention::ZeroToN),
            1 => Ok(CoordinateConvention::MinusPiToPi),
            other => Err(format!("unknown coordinate convention {}", other)),
        }
    }
}

impl From<CoordinateConvention> for RescaleMode {
    fn from(value: CoordinateConvention) -> RescaleMode {
        match value {
            CoordinateConvention::ZeroToN => RescaleMode::ZeroToN,
            CoordinateConvention::MinusPiToPi => RescaleMode::MinusPiToPi,
        }
    }
}

/// Work decomposition used for spreading and interpolation.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum SpreadMethod {
    /// Bin-local tiles, one subproblem per work unit.
    Subproblem,

    /// One work unit per bin-sorted point, touching the global grid directly.
    NuptsDriven,
}

impl From<SpreadMethod> for SpreadStrategy {
    fn from(value: SpreadMethod) -> SpreadStrategy {
        match value {
            SpreadMethod::Subproblem => SpreadStrategy::Subproblem,
            SpreadMethod::NuptsDriven => SpreadStrategy::NuptsDriven,
        }
    }
}

/// Options fixed for the lifetime of a [`Plan`](crate::Plan).
///
/// ### Default Values
/// Kernel fields are derived from `tolerance` and `upsampling_factor`, see
/// [`EsKernelParams::for_tolerance`]. The remaining defaults are:
/// - `spread_direction`: `Spread`
/// - `coordinate_convention`: `MinusPiToPi`
/// - `bin_size_x`, `bin_size_y`: `32`
/// - `bin_size_z`: `16`
/// - `max_subproblem_size`: `1024`
/// - `num_streams`: `1`
/// - `use_horner`: `true` when `upsampling_factor == 2`, otherwise `false`
/// - `spread_method`: `Subproblem`
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct Options {
    /// Kernel width in fine grid points.
    pub nspread: usize,

    /// Whether plans built from these options run type 1 or type 2 transforms.
    pub spread_direction: SpreadDirection,

    /// Range of the input coordinates.
    pub coordinate_convention: CoordinateConvention,

    /// Ratio of fine grid size to mode count (sigma).
    pub upsampling_factor: f64,

    /// Exponential shape parameter of the ES kernel.
    pub es_beta: f64,

    /// Half of the ES kernel support.
    pub es_halfwidth: f64,

    /// Semicircle normalisation of the ES kernel.
    pub es_c: f64,

    /// Bin width along x, in fine grid points.
    pub bin_size_x: usize,

    /// Bin width along y, in fine grid points.
    pub bin_size_y: usize,

    /// Bin width along z, in fine grid points.
    pub bin_size_z: usize,

    /// Largest number of points handled by one subproblem.
    pub max_subproblem_size: usize,

    /// Number of worker pools transforms of a batch are distributed across.
    pub num_streams: usize,

    /// Evaluate the kernel from piecewise polynomials instead of directly.
    pub use_horner: bool,

    /// Work decomposition for spreading and interpolation.
    pub spread_method: SpreadMethod,

    /// Requested relative accuracy the kernel was derived from.
    pub tolerance: f64,
}

impl Options {
    /// Options with every default derived from `tolerance` at the given upsampling factor.
    pub fn from_tolerance(tolerance: f64, upsampling_factor: f64) -> Result<Self, NufftError> {
        Options::builder(tolerance)
            .upsampling_factor(upsampling_factor)
            .build()
    }

    /// Returns a new [`OptionsBuilder`] targeting `tolerance`.
    pub fn builder(tolerance: f64) -> OptionsBuilder {
        OptionsBuilder::new(tolerance)
    }

    /// Kernel shape described by these options.
    pub fn kernel_params(&self) -> EsKernelParams {
        EsKernelParams {
            nspread: self.nspread,
            beta: self.es_beta,
            halfwidth: self.es_halfwidth,
            c: self.es_c,
        }
    }

    /// Bin sizes `[x, y, z]`.
    pub fn bin_sizes(&self) -> [usize; 3] {
        [self.bin_size_x, self.bin_size_y, self.bin_size_z]
    }

    /// Checks the options can configure a plan.
    ///
    /// Bin sizes are checked against the kernel width when a plan is created,
    /// since only the dimensions in use matter.
    pub fn validate(&self) -> Result<(), NufftError> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(KernelParamsError::ToleranceNotPositive {
                tolerance: self.tolerance,
            }
            .into());
        }
        self.kernel_params().validate()?;
        if self.num_streams == 0 {
            return Err(ConfigurationError::ZeroStreams.into());
        }
        if self.max_subproblem_size == 0 {
            return Err(ConfigurationError::ZeroSubproblemSize.into());
        }
        if !(self.upsampling_factor.is_finite() && self.upsampling_factor > 1.0) {
            return Err(KernelParamsError::InvalidUpsamplingFactor {
                upsampling_factor: self.upsampling_factor,
            }
            .into());
        }
        Ok(())
    }

    /// Save these options to a **JSON envelope** `{ format, version, options }`.
    ///
    /// ### Errors
    /// - Returns `OptionsIOError::{Create, Serialize, Flush}` on I/O or serialization
    ///   failures.
    pub fn save_options<P: AsRef<Path>>(&self, path: P) -> OptionsIOResult<()> {
        let path_ref = path.as_ref();
        let file = File::create(path_ref).map_err(|e| OptionsIOError::Create {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        let mut w = BufWriter::new(file);

        let env = JsonEnvelopeRef {
            format: JSON_FORMAT_NAME,
            version: JSON_VERSION,
            options: self,
        };

        serde_json::to_writer_pretty(&mut w, &env).map_err(|e| OptionsIOError::Serialize {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        w.flush().map_err(|e| OptionsIOError::Flush {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        Ok(())
    }

    /// Load options from a versioned **JSON envelope**, validating format & version.
    ///
    /// ### Errors
    /// - Returns `OptionsIOError::{Open, Parse, FormatMismatch, VersionMismatch}` as appropriate.
    pub fn load_options<P: AsRef<Path>>(path: P) -> OptionsIOResult<Self> {
        let path_ref = path.as_ref();

        let file = File::open(path_ref).map_err(|e| OptionsIOError::Open {
            path: path_ref.to_path_buf(),
            source: e,
        })?;
        let reader = BufReader::new(file);

        let env: JsonEnvelopeOwned<Self> =
            serde_json::from_reader(reader).map_err(|e| OptionsIOError::Parse {
                path: path_ref.to_path_buf(),
                source: e,
            })?;

        if env.format != JSON_FORMAT_NAME {
            return Err(OptionsIOError::FormatMismatch {
                path: path_ref.to_path_buf(),
                found: env.format,
                expected: JSON_FORMAT_NAME,
            });
        }

        if env.version != JSON_VERSION {
            return Err(OptionsIOError::VersionMismatch {
                path: path_ref.to_path_buf(),
                found: env.version,
                expected: JSON_VERSION,
            });
        }

        Ok(env.options)
    }
}

/// A convenience builder for constructing an [`Options`] instance.
///
/// The builder should be called via the [`Options::builder`] method.
#[derive(Debug, Clone)]
pub struct OptionsBuilder {
    tolerance: f64,
    upsampling_factor: f64,
    spread_direction: SpreadDirection,
    coordinate_convention: CoordinateConvention,
    bin_sizes: [usize; 3],
    max_subproblem_size: usize,
    num_streams: usize,
    use_horner: Option<bool>,
    spread_method: SpreadMethod,
}

impl OptionsBuilder {
    fn new(tolerance: f64) -> Self {
        Self {
            tolerance,
            upsampling_factor: DEFAULT_UPSAMPLING_FACTOR,
            spread_direction: SpreadDirection::Spread,
            coordinate_convention: CoordinateConvention::MinusPiToPi,
            bin_sizes: [32, 32, 16],
            max_subproblem_size: 1024,
            num_streams: 1,
            use_horner: None,
            spread_method: SpreadMethod::Subproblem,
        }
    }

    /// Sets the upsampling factor.
    pub fn upsampling_factor(mut self, upsampling_factor: f64) -> Self {
        self.upsampling_factor = upsampling_factor;
        self
    }

    /// Sets the spread direction.
    pub fn spread_direction(mut self, spread_direction: SpreadDirection) -> Self {
        self.spread_direction = spread_direction;
        self
    }

    /// Sets the coordinate convention.
    pub fn coordinate_convention(mut self, coordinate_convention: CoordinateConvention) -> Self {
        self.coordinate_convention = coordinate_convention;
        self
    }

    /// Sets the bin sizes along x, y and z.
    pub fn bin_sizes(mut self, x: usize, y: usize, z: usize) -> Self {
        self.bin_sizes = [x, y, z];
        self
    }

    /// Sets the maximum number of points per subproblem.
    pub fn max_subproblem_size(mut self, max_subproblem_size: usize) -> Self {
        self.max_subproblem_size = max_subproblem_size;
        self
    }

    /// Sets the number of streams.
    pub fn num_streams(mut self, num_streams: usize) -> Self {
        self.num_streams = num_streams;
        self
    }

    /// Enables or disables piecewise polynomial kernel evaluation.
    pub fn use_horner(mut self, use_horner: bool) -> Self {
        self.use_horner = Some(use_horner);
        self
    }

    /// Sets the spreading work decomposition.
    pub fn spread_method(mut self, spread_method: SpreadMethod) -> Self {
        self.spread_method = spread_method;
        self
    }

    /// Derives the kernel and builds a validated [`Options`] instance.
    pub fn build(self) -> Result<Options, NufftError> {
        let kernel = EsKernelParams::for_tolerance(self.tolerance, self.upsampling_factor)?;

        let options = Options {
            nspread: kernel.nspread,
            spread_direction: self.spread_direction,
            coordinate_convention: self.coordinate_convention,
            upsampling_factor: self.upsampling_factor,
            es_beta: kernel.beta,
            es_halfwidth: kernel.halfwidth,
            es_c: kernel.c,
            bin_size_x: self.bin_sizes[0],
            bin_size_y: self.bin_sizes[1],
            bin_size_z: self.bin_sizes[2],
            max_subproblem_size: self.max_subproblem_size,
            num_streams: self.num_streams,
            use_horner: self
                .use_horner
                .unwrap_or(self.upsampling_factor == DEFAULT_UPSAMPLING_FACTOR),
            spread_method: self.spread_method,
            tolerance: self.tolerance,
        };

        options.validate()?;
        Ok(options)
    }
}

const JSON_FORMAT_NAME: &str = "ferreus_nufft.options.json";
const JSON_VERSION: u32 = 1;

/// Borrowing envelope for SAVE.
#[derive(Serialize)]
struct JsonEnvelopeRef<'a, T: ?Sized> {
    format: &'static str,
    version: u32,
    options: &'a T,
}

/// Owning envelope for LOAD.
#[derive(Deserialize)]
struct JsonEnvelopeOwned<T> {
    format: String,
    version: u32,
    options: T,
}

type OptionsIOResult<T> = std::result::Result<T, OptionsIOError>;

/// Errors that can occur when saving or loading [`Options`].
#[derive(Debug)]
pub enum OptionsIOError {
    /// Failed to create the target file.
    Create { path: PathBuf, source: io::Error },
    /// Failed to open an existing options file.
    Open { path: PathBuf, source: io::Error },
    /// Failed to flush buffered output when finishing a write.
    Flush { path: PathBuf, source: io::Error },
    /// Error serializing the options to JSON.
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// Error parsing JSON when reading options from disk.
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// The JSON `format` field does not match.
    FormatMismatch {
        path: PathBuf,
        found: String,
        expected: &'static str,
    },
    /// The JSON `version` field does not match the supported version.
    VersionMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
}

impl fmt::Display for OptionsIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionsIOError::Create { path, source } => {
                write!(f, "creating {}: {}", path.display(), source)
            }
            OptionsIOError::Open { path, source } => {
                write!(f, "opening {}: {}", path.display(), source)
            }
            OptionsIOError::Flush { path, source } => {
                write!(f, "flushing {}: {}", path.display(), source)
            }
            OptionsIOError::Serialize { path, source } => {
                write!(f, "serializing JSON to {}: {}", path.display(), source)
            }
            OptionsIOError::Parse { path, source } => {
                write!(f, "parsing JSON in {}: {}", path.display(), source)
            }
            OptionsIOError::FormatMismatch {
                path,
                found,
                expected,
            } => write!(
                f,
                "unsupported format {:?} (expected {:?}) in {}",
                found,
                expected,
                path.display()
            ),
            OptionsIOError::VersionMismatch {
                path,
                found,
                expected,
            } => write!(
                f,
                "unsupported version {} (expected {}) in {}",
                found,
                expected,
                path.display()
            ),
        }
    }
}

impl Error for OptionsIOError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            OptionsIOError::Create { source, .. }
            | OptionsIOError::Open { source, .. }
            | OptionsIOError::Flush { source, .. } => Some(source),
            OptionsIOError::Serialize { source, .. } | OptionsIOError::Parse { source, .. } => {
                Some(source)
            }
            OptionsIOError::FormatMismatch { .. } | OptionsIOError::VersionMismatch { .. } => None,
        }
    }
}
