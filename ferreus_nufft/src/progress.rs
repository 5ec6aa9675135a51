/////////////////////////////////////////////////////////////////////////////////////////////
//
// Defines progress reporting messages, sinks, and helper functions for plan lifecycles.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

//! Progress reporting primitives for plan creation, point binding and execution.

use std::fmt::Debug;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

/// Stage of the transform pipeline a timing refers to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PipelineStage {
    BinSort,
    Spread,
    Fft,
    Deconvolve,
    Reconvolve,
    Interpolate,
}

/// Progress events emitted by a [`Plan`](crate::Plan).
#[derive(Debug, Clone)]
pub enum ProgressMsg {
    /// Event indicating a plan finished allocating its fine grids.
    PlanCreated {
        fine_grid_sizes: [usize; 3],
        nspread: usize,
        ntransf: usize,
        ntransf_fft_batch: usize,
    },

    /// Event indicating non-uniform points were sorted into bins and subproblems.
    PointsBound {
        num_points: usize,
        num_bins: usize,
        num_subproblems: usize,
        elapsed: Duration,
    },

    /// Event indicating a pipeline stage finished for one batch of transforms.
    StageCompleted {
        stage: PipelineStage,
        batch: usize,
        elapsed: Duration,
    },

    /// Arbitrary informational message.
    Message { message: String },
}

/// Sink that consumes progress messages.
pub trait ProgressSink: Send + Sync + Debug {
    fn emit(&self, msg: ProgressMsg);
}

/// Progress sink that forwards messages over a channel.
#[derive(Debug)]
pub struct ClosureSink {
    tx: mpsc::SyncSender<ProgressMsg>,
}

impl ProgressSink for ClosureSink {
    #[inline]
    fn emit(&self, msg: ProgressMsg) {
        let _ = self.tx.try_send(msg);
    }
}

/// Spawns a listener thread that runs a handler closure for each progress message.
///
/// The thread exits once every clone of the returned sink has been dropped.
pub fn closure_sink<F>(
    buffer: usize,
    mut handler: F,
) -> (Arc<dyn ProgressSink>, thread::JoinHandle<()>)
where
    F: FnMut(ProgressMsg) + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel::<ProgressMsg>(buffer.max(1));
    let sink: Arc<dyn ProgressSink> = Arc::new(ClosureSink { tx });

    let handle = thread::spawn(move || {
        while let Ok(msg) = rx.recv() {
            handler(msg);
        }
    });

    (sink, handle)
}
