// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Command batches.
//!
//! A [`Batch`] is the unit of submission: an encoder the hardware commands go into, plus the
//! [`CacheTracker`] whose membership sets are only meaningful until the batch reaches the
//! device.  Encoding itself is somebody else's job; this crate only needs the two commands
//! described by [`CommandEncoder`].

use crate::cache::CacheTracker;
use crate::resource::BufferId;
use crate::resource::aux_usage::AuxUsage;
use crate::resource::surface::Format;
use bitflags::bitflags;

bitflags! {
    /// Cache flush, invalidate and stall bits for a pipeline synchronization command.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct PipeControl: u32 {
        const RENDER_TARGET_FLUSH = 1 << 0;
        const DEPTH_CACHE_FLUSH = 1 << 1;
        const DEPTH_STALL = 1 << 2;
        const CS_STALL = 1 << 3;
        const TEXTURE_CACHE_INVALIDATE = 1 << 4;
        const CONST_CACHE_INVALIDATE = 1 << 5;
    }
}

/// Failure to encode a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum EncodeError {
    #[error("batch is out of command space")]
    OutOfSpace,
    #[error("out of memory while encoding")]
    OutOfMemory,
    #[error("device lost")]
    DeviceLost,
}

/// The command stream of one batch.
///
/// Implementations append hardware commands; nothing executes until [`CommandEncoder::submit`].
pub trait CommandEncoder {
    /// Emits one flush/invalidate command affecting the caches in `bits`.
    fn emit_cache_flush(&mut self, bits: PipeControl, reason: &'static str)
    -> Result<(), EncodeError>;

    /// Emits an end-of-pipe synchronization: all prior work completes (and the caches in
    /// `bits` are flushed) before any later work starts.
    fn emit_end_of_pipe_sync(
        &mut self,
        bits: PipeControl,
        reason: &'static str,
    ) -> Result<(), EncodeError>;

    /// Hands the encoded commands to the device and starts a new, empty stream.
    fn submit(&mut self) -> Result<(), EncodeError>;
}

/// One in-flight command batch.
pub struct Batch {
    debug_label: String,
    encoder: Box<dyn CommandEncoder>,
    cache: CacheTracker,
}

impl std::fmt::Debug for Batch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch")
            .field("debug_label", &self.debug_label)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl Batch {
    pub fn new(debug_label: impl Into<String>, encoder: Box<dyn CommandEncoder>) -> Self {
        Batch {
            debug_label: debug_label.into(),
            encoder,
            cache: CacheTracker::new(),
        }
    }

    pub fn debug_label(&self) -> &str {
        &self.debug_label
    }

    pub fn encoder(&mut self) -> &mut dyn CommandEncoder {
        self.encoder.as_mut()
    }

    pub fn cache(&self) -> &CacheTracker {
        &self.cache
    }

    /// See [`CacheTracker::flush_for_read`].
    pub fn flush_for_read(&mut self, buffer: BufferId) -> Result<bool, EncodeError> {
        self.cache.flush_for_read(self.encoder.as_mut(), buffer)
    }

    /// See [`CacheTracker::flush_for_render`].
    pub fn flush_for_render(
        &mut self,
        buffer: BufferId,
        format: Format,
        aux_usage: AuxUsage,
    ) -> Result<bool, EncodeError> {
        self.cache
            .flush_for_render(self.encoder.as_mut(), buffer, format, aux_usage)
    }

    /// See [`CacheTracker::flush_for_depth`].
    pub fn flush_for_depth(&mut self, buffer: BufferId) -> Result<bool, EncodeError> {
        self.cache.flush_for_depth(self.encoder.as_mut(), buffer)
    }

    /// See [`CacheTracker::record_render`].
    pub fn record_render(
        &mut self,
        buffer: BufferId,
        format: Format,
        aux_usage: AuxUsage,
    ) -> Result<(), EncodeError> {
        self.cache
            .record_render(self.encoder.as_mut(), buffer, format, aux_usage)
    }

    /// See [`CacheTracker::record_depth`].
    pub fn record_depth(&mut self, buffer: BufferId) {
        self.cache.record_depth(buffer)
    }

    /// Submits the batch.
    ///
    /// A submission orders everything before it against everything after it, so the cache
    /// sets start over.
    pub fn submit(&mut self) -> Result<(), EncodeError> {
        logwise::info_sync!(
            "submitting batch {label}",
            label = self.debug_label.clone()
        );
        self.encoder.submit()?;
        self.cache.clear();
        Ok(())
    }

    /// Throws away the cache sets without submitting, e.g. after the batch was abandoned.
    pub fn reset(&mut self) {
        self.cache.clear();
    }
}
