/////////////////////////////////////////////////////////////////////////////////////////////
//
// Owns plan buffers and the worker pools ("streams") transforms are issued onto.
//
// Created on: 16 Oct 2026     Author: Daniel Owen
//
// Copyright (c) 2026, Maptek Pty Ltd. All rights reserved. Licensed under the MIT License.
//
/////////////////////////////////////////////////////////////////////////////////////////////

use crate::errors::ResourceError;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_STREAM_SET: AtomicUsize = AtomicUsize::new(0);

/// A labelled, fallibly allocated buffer owned by a plan.
#[derive(Debug, Clone)]
pub struct DeviceBuffer<T> {
    label: &'static str,
    data: Vec<T>,
}

impl<T: Clone> DeviceBuffer<T> {
    /// Allocates `len` copies of `value`, reporting failure instead of aborting.
    pub fn filled(label: &'static str, len: usize, value: T) -> Result<Self, ResourceError> {
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| ResourceError::Allocation {
                buffer: label,
                elements: len,
            })?;
        data.resize(len, value);
        Ok(DeviceBuffer { label, data })
    }

    /// Wraps an already computed vector.
    pub fn from_vec(label: &'static str, data: Vec<T>) -> Self {
        DeviceBuffer { label, data }
    }
}

impl<T> DeviceBuffer<T> {
    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Hands the storage to the caller.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Frees the storage, leaving an empty buffer.
    pub fn release(&mut self) {
        self.data = Vec::new();
    }
}

/// Independent worker pools. Slots of a batch are assigned round-robin.
///
/// Worker threads are named `nufft-<set>-<stream>-<thread>`.
#[derive(Debug)]
pub struct StreamSet {
    id: usize,
    pools: Vec<ThreadPool>,
}

impl StreamSet {
    /// Creates `num_streams` pools sharing the available threads.
    pub fn new(num_streams: usize) -> Result<Self, ResourceError> {
        let threads = (rayon::current_num_threads() / num_streams.max(1)).max(1);
        let id = NEXT_STREAM_SET.fetch_add(1, Ordering::Relaxed);

        let pools = (0..num_streams)
            .map(|stream| {
                ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(move |i| format!("nufft-{}-{}-{}", id, stream, i))
                    .build()
                    .map_err(|e| ResourceError::StreamCreation {
                        stream,
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StreamSet { id, pools })
    }

    /// Prefix shared by the names of this set's worker threads.
    pub fn thread_prefix(&self) -> String {
        format!("nufft-{}-", self.id)
    }

    /// Shuts down every pool. Later slots run on the calling thread.
    pub fn release(&mut self) {
        self.pools = Vec::new();
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Runs `f(slot)` for every slot in `0..num_slots`, slot `s` on stream
    /// `s % len()`. Returns once every slot has finished, results in slot order.
    pub fn run_slots<T, F>(&self, num_slots: usize, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync,
    {
        if self.pools.is_empty() {
            return (0..num_slots).map(&f).collect();
        }

        let f = &f;
        let mut results: Vec<(usize, T)> = std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .pools
                .iter()
                .enumerate()
                .map(|(stream, pool)| {
                    let num_streams = self.pools.len();
                    scope.spawn(move || {
                        (stream..num_slots)
                            .step_by(num_streams)
                            .map(|slot| (slot, pool.install(|| f(slot))))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(results) => results,
                    Err(payload) => std::panic::resume_unwind(payload),
                })
                .collect()
        });

        results.sort_by_key(|(slot, _)| *slot);
        results.into_iter().map(|(_, value)| value).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_run_once_and_return_in_order() {
        let streams = StreamSet::new(3).unwrap();
        assert_eq!(streams.len(), 3);
        let out = streams.run_slots(8, |slot| slot * slot);
        assert_eq!(out, vec![0, 1, 4, 9, 16, 25, 36, 49]);
    }

    #[test]
    fn filled_buffers_can_be_released() {
        let mut buffer = DeviceBuffer::filled("test", 4, 1.0f64).unwrap();
        assert_eq!(buffer.label(), "test");
        assert_eq!(buffer.as_slice(), &[1.0; 4]);
        buffer.release();
        assert!(buffer.is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn release_stops_worker_threads() {
        let mut streams = StreamSet::new(2).unwrap();
        let prefix = streams.thread_prefix();
        assert!(wait_for_threads(&prefix, |n| n > 0));

        streams.release();
        assert!(streams.is_empty());
        assert!(wait_for_threads(&prefix, |n| n == 0));

        // Released sets still complete work on the calling thread.
        assert_eq!(streams.run_slots(3, |slot| slot + 1), vec![1, 2, 3]);
    }
}

/// Number of live threads of this process whose name starts with `prefix`.
#[cfg(all(test, target_os = "linux"))]
pub(crate) fn live_threads(prefix: &str) -> usize {
    std::fs::read_dir("/proc/self/task")
        .map(|tasks| {
            tasks
                .filter_map(|task| task.ok())
                .filter_map(|task| std::fs::read_to_string(task.path().join("comm")).ok())
                .filter(|name| name.starts_with(prefix))
                .count()
        })
        .unwrap_or(0)
}

/// Polls [`live_threads`] for up to five seconds until `done` holds.
#[cfg(all(test, target_os = "linux"))]
pub(crate) fn wait_for_threads(prefix: &str, done: impl Fn(usize) -> bool) -> bool {
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        if done(live_threads(prefix)) {
            return true;
        }
        if std::time::Instant::now() > deadline {
            return false;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
}
