// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! A backend that encodes nothing and records everything.
//!
//! [`RecordingEncoder`] and [`RecordingEngine`] append to a shared [`CommandLog`], so a test
//! can hand both to a device and a batch and afterwards inspect the exact sequence of flushes,
//! barriers and resolves.  The log can also be told to start failing, to exercise error paths.

use crate::batch::{CommandEncoder, EncodeError, PipeControl};
use crate::cache;
use crate::imp::ResolveEngine;
use crate::resolve::ResolveRequest;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One recorded command.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    CacheFlush {
        bits: PipeControl,
        reason: &'static str,
    },
    EndOfPipeSync {
        bits: PipeControl,
        reason: &'static str,
    },
    Resolve(ResolveRequest),
    Submit,
}

#[derive(Debug, Default)]
struct Inner {
    commands: Vec<Recorded>,
    /// Commands left before encoding starts to fail.
    budget: Option<usize>,
}

/// The shared record.  Clones observe the same log.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    inner: Arc<Mutex<Inner>>,
}

impl CommandLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, command: Recorded) -> Result<(), EncodeError> {
        let mut inner = self.lock();
        match &mut inner.budget {
            Some(0) => return Err(EncodeError::OutOfSpace),
            Some(left) => *left -= 1,
            None => {}
        }
        inner.commands.push(command);
        Ok(())
    }

    /// Lets the next `commands` commands succeed and fails every one after them with
    /// [`EncodeError::OutOfSpace`].
    pub fn fail_after(&self, commands: usize) {
        self.lock().budget = Some(commands);
    }

    /// Stops injecting failures.
    pub fn stop_failing(&self) {
        self.lock().budget = None;
    }

    pub fn commands(&self) -> Vec<Recorded> {
        self.lock().commands.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().commands.is_empty()
    }

    pub fn clear(&self) {
        self.lock().commands.clear();
    }

    /// Every resolve, ambiguate and fast clear, in order.
    pub fn resolves(&self) -> Vec<ResolveRequest> {
        self.lock()
            .commands
            .iter()
            .filter_map(|c| match c {
                Recorded::Resolve(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of flushes the cache tracker issued.
    ///
    /// The tracker emits its flushes in pairs; this counts the invalidating half.
    pub fn cache_tracker_flushes(&self) -> usize {
        self.lock()
            .commands
            .iter()
            .filter(|c| {
                matches!(c, Recorded::CacheFlush { bits, reason }
                    if *reason == cache::FLUSH_REASON
                        && bits.contains(PipeControl::TEXTURE_CACHE_INVALIDATE))
            })
            .count()
    }

    /// Every synchronization command, flushes and end-of-pipe syncs alike, with its reason.
    pub fn barriers(&self) -> Vec<(PipeControl, &'static str)> {
        self.lock()
            .commands
            .iter()
            .filter_map(|c| match c {
                Recorded::CacheFlush { bits, reason } | Recorded::EndOfPipeSync { bits, reason } => {
                    Some((*bits, *reason))
                }
                _ => None,
            })
            .collect()
    }
}

/// A [`CommandEncoder`] writing to a [`CommandLog`].
#[derive(Debug, Clone)]
pub struct RecordingEncoder {
    log: CommandLog,
}

impl RecordingEncoder {
    pub fn new(log: CommandLog) -> Self {
        RecordingEncoder { log }
    }
}

impl CommandEncoder for RecordingEncoder {
    fn emit_cache_flush(
        &mut self,
        bits: PipeControl,
        reason: &'static str,
    ) -> Result<(), EncodeError> {
        self.log.push(Recorded::CacheFlush { bits, reason })
    }

    fn emit_end_of_pipe_sync(
        &mut self,
        bits: PipeControl,
        reason: &'static str,
    ) -> Result<(), EncodeError> {
        self.log.push(Recorded::EndOfPipeSync { bits, reason })
    }

    fn submit(&mut self) -> Result<(), EncodeError> {
        self.log.push(Recorded::Submit)
    }
}

/// A [`ResolveEngine`] writing to a [`CommandLog`].
#[derive(Debug, Clone)]
pub struct RecordingEngine {
    log: CommandLog,
}

impl RecordingEngine {
    pub fn new(log: CommandLog) -> Self {
        RecordingEngine { log }
    }
}

impl ResolveEngine for RecordingEngine {
    fn execute(
        &mut self,
        _encoder: &mut dyn CommandEncoder,
        request: &ResolveRequest,
    ) -> Result<(), EncodeError> {
        self.log.push(Recorded::Resolve(request.clone()))
    }
}
