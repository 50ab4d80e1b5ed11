// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Batch-scoped render/depth cache tracking.
//!
//! The render-target cache and the depth cache are not coherent with the texture and
//! constant caches, nor with each other.  When a buffer written through one of them is next
//! read, or written through the other, the dirty lines must be flushed first.
//!
//! Flushing on every access would be correct and slow.  Instead the tracker remembers which
//! buffers each cache may hold dirty data for, within the current batch, and flushes only at
//! the boundary between incompatible uses:
//!
//! | access          | flushes when the buffer is in                                   |
//! |-----------------|-----------------------------------------------------------------|
//! | read (sampler)  | either set                                                      |
//! | render target   | the depth set, or the render set under a different format/usage |
//! | depth target    | the render set                                                  |
//!
//! The caches are not addressable per buffer, so a flush is global and empties both sets.
//! Submitting the batch empties them as well.

use crate::batch::{CommandEncoder, EncodeError, PipeControl};
use crate::resource::BufferId;
use crate::resource::aux_usage::AuxUsage;
use crate::resource::surface::Format;
use std::collections::{HashMap, HashSet};

/// Reason attached to the flush commands emitted by the tracker.
pub const FLUSH_REASON: &str = "cache tracker: render-to-texture";

/// The interpretation a buffer was rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTag {
    pub format: Format,
    pub aux_usage: AuxUsage,
}

/// The two membership sets of one batch.
#[derive(Debug, Default, Clone)]
pub struct CacheTracker {
    render: HashMap<BufferId, RenderTag>,
    depth: HashSet<BufferId>,
}

impl CacheTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The tag `buffer` was last rendered with in this batch, if any.
    pub fn render_tag(&self, buffer: BufferId) -> Option<RenderTag> {
        self.render.get(&buffer).copied()
    }

    pub fn in_depth_cache(&self, buffer: BufferId) -> bool {
        self.depth.contains(&buffer)
    }

    pub fn is_empty(&self) -> bool {
        self.render.is_empty() && self.depth.is_empty()
    }

    /// Flushes the render and depth caches, invalidates the read-only caches, and forgets
    /// every membership.
    ///
    /// On failure the sets are kept; the batch is unusable anyway.
    pub fn flush_depth_and_render_caches(
        &mut self,
        encoder: &mut dyn CommandEncoder,
    ) -> Result<(), EncodeError> {
        logwise::trace_sync!(
            "flushing render and depth caches ({render} render, {depth} depth buffers tracked)",
            render = self.render.len(),
            depth = self.depth.len()
        );
        encoder.emit_cache_flush(
            PipeControl::DEPTH_CACHE_FLUSH
                | PipeControl::RENDER_TARGET_FLUSH
                | PipeControl::CS_STALL,
            FLUSH_REASON,
        )?;
        encoder.emit_cache_flush(
            PipeControl::TEXTURE_CACHE_INVALIDATE | PipeControl::CONST_CACHE_INVALIDATE,
            FLUSH_REASON,
        )?;
        self.clear();
        Ok(())
    }

    /// Prepares to read `buffer` through the texture or constant caches.
    ///
    /// Returns whether a flush was emitted.
    pub fn flush_for_read(
        &mut self,
        encoder: &mut dyn CommandEncoder,
        buffer: BufferId,
    ) -> Result<bool, EncodeError> {
        if self.render.contains_key(&buffer) || self.depth.contains(&buffer) {
            self.flush_depth_and_render_caches(encoder)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Prepares to render to `buffer` as `format` with `aux_usage`.
    ///
    /// Rendering one buffer under two interpretations at once is unsafe even without a read in
    /// between: the render cache may hold lines for both, and evicting them in the wrong order
    /// corrupts the surface.
    pub fn flush_for_render(
        &mut self,
        encoder: &mut dyn CommandEncoder,
        buffer: BufferId,
        format: Format,
        aux_usage: AuxUsage,
    ) -> Result<bool, EncodeError> {
        let mut flushed = false;
        if self.depth.contains(&buffer) {
            self.flush_depth_and_render_caches(encoder)?;
            flushed = true;
        }
        let tag = RenderTag { format, aux_usage };
        if self.render.get(&buffer).is_some_and(|old| *old != tag) {
            self.flush_depth_and_render_caches(encoder)?;
            flushed = true;
        }
        Ok(flushed)
    }

    /// Prepares to use `buffer` as a depth or stencil target.
    pub fn flush_for_depth(
        &mut self,
        encoder: &mut dyn CommandEncoder,
        buffer: BufferId,
    ) -> Result<bool, EncodeError> {
        if self.render.contains_key(&buffer) {
            self.flush_depth_and_render_caches(encoder)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Records that `buffer` was rendered as `format` with `aux_usage`.
    ///
    /// The caller must already have called [`CacheTracker::flush_for_render`] for this access.
    /// A buffer re-recorded under a different tag means that did not happen: debug builds
    /// assert, release builds flush before recording.
    pub fn record_render(
        &mut self,
        encoder: &mut dyn CommandEncoder,
        buffer: BufferId,
        format: Format,
        aux_usage: AuxUsage,
    ) -> Result<(), EncodeError> {
        let tag = RenderTag { format, aux_usage };
        if let Some(old) = self.render.get(&buffer).copied() {
            debug_assert_eq!(
                old, tag,
                "{buffer:?} re-rendered under a new tag without flush_for_render"
            );
            if old != tag {
                self.flush_depth_and_render_caches(encoder)?;
            }
        }
        self.render.insert(buffer, tag);
        Ok(())
    }

    /// Records that `buffer` was written as a depth or stencil target.
    pub fn record_depth(&mut self, buffer: BufferId) {
        self.depth.insert(buffer);
    }

    /// Forgets every membership.
    pub fn clear(&mut self) {
        self.render.clear();
        self.depth.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingEncoder {
        flushes: Vec<PipeControl>,
    }

    impl CommandEncoder for CountingEncoder {
        fn emit_cache_flush(
            &mut self,
            bits: PipeControl,
            _reason: &'static str,
        ) -> Result<(), EncodeError> {
            self.flushes.push(bits);
            Ok(())
        }
        fn emit_end_of_pipe_sync(
            &mut self,
            _bits: PipeControl,
            _reason: &'static str,
        ) -> Result<(), EncodeError> {
            unreachable!("the tracker never syncs")
        }
        fn submit(&mut self) -> Result<(), EncodeError> {
            Ok(())
        }
    }

    const B: BufferId = BufferId(7);
    const OTHER: BufferId = BufferId(8);

    #[test]
    fn read_of_untracked_buffer_is_free() {
        let mut enc = CountingEncoder::default();
        let mut tracker = CacheTracker::new();
        tracker
            .record_render(&mut enc, OTHER, Format::RGBA8UNorm, AuxUsage::CcsE)
            .unwrap();
        assert!(!tracker.flush_for_read(&mut enc, B).unwrap());
        assert!(enc.flushes.is_empty());
    }

    #[test]
    fn flush_is_global() {
        let mut enc = CountingEncoder::default();
        let mut tracker = CacheTracker::new();
        tracker
            .record_render(&mut enc, B, Format::RGBA8UNorm, AuxUsage::None)
            .unwrap();
        tracker.record_depth(OTHER);
        assert!(tracker.flush_for_read(&mut enc, B).unwrap());
        assert_eq!(
            enc.flushes,
            vec![
                PipeControl::DEPTH_CACHE_FLUSH
                    | PipeControl::RENDER_TARGET_FLUSH
                    | PipeControl::CS_STALL,
                PipeControl::TEXTURE_CACHE_INVALIDATE | PipeControl::CONST_CACHE_INVALIDATE,
            ]
        );
        //the unrelated depth buffer was dropped too
        assert!(tracker.is_empty());
        assert!(!tracker.flush_for_read(&mut enc, OTHER).unwrap());
    }

    #[test]
    fn render_with_same_tag_does_not_flush() {
        let mut enc = CountingEncoder::default();
        let mut tracker = CacheTracker::new();
        for _ in 0..4 {
            assert!(
                !tracker
                    .flush_for_render(&mut enc, B, Format::RGBA8UNorm, AuxUsage::CcsE)
                    .unwrap()
            );
            tracker
                .record_render(&mut enc, B, Format::RGBA8UNorm, AuxUsage::CcsE)
                .unwrap();
        }
        assert!(enc.flushes.is_empty());
    }

    #[test]
    fn render_with_new_tag_flushes() {
        let mut enc = CountingEncoder::default();
        let mut tracker = CacheTracker::new();
        tracker
            .record_render(&mut enc, B, Format::RGBA8UNorm, AuxUsage::CcsE)
            .unwrap();
        assert!(
            tracker
                .flush_for_render(&mut enc, B, Format::RGBA8UNorm, AuxUsage::CcsD)
                .unwrap()
        );
        assert_eq!(enc.flushes.len(), 2);
        tracker
            .record_render(&mut enc, B, Format::RGBA8UNorm, AuxUsage::CcsD)
            .unwrap();
        assert_eq!(
            tracker.render_tag(B),
            Some(RenderTag {
                format: Format::RGBA8UNorm,
                aux_usage: AuxUsage::CcsD
            })
        );
    }

    #[test]
    fn depth_and_render_interleave() {
        let mut enc = CountingEncoder::default();
        let mut tracker = CacheTracker::new();
        tracker.record_depth(B);
        assert!(!tracker.flush_for_depth(&mut enc, B).unwrap());
        assert!(
            tracker
                .flush_for_render(&mut enc, B, Format::R32Float, AuxUsage::None)
                .unwrap()
        );
        tracker
            .record_render(&mut enc, B, Format::R32Float, AuxUsage::None)
            .unwrap();
        assert!(tracker.flush_for_depth(&mut enc, B).unwrap());
        assert_eq!(enc.flushes.len(), 4);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "without flush_for_render")]
    fn retag_without_flush_asserts() {
        let mut enc = CountingEncoder::default();
        let mut tracker = CacheTracker::new();
        tracker
            .record_render(&mut enc, B, Format::RGBA8UNorm, AuxUsage::CcsE)
            .unwrap();
        let _ = tracker.record_render(&mut enc, B, Format::BGRA8UNorm, AuxUsage::CcsE);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn retag_without_flush_flushes_in_release() {
        let mut enc = CountingEncoder::default();
        let mut tracker = CacheTracker::new();
        tracker
            .record_render(&mut enc, B, Format::RGBA8UNorm, AuxUsage::CcsE)
            .unwrap();
        tracker
            .record_render(&mut enc, B, Format::BGRA8UNorm, AuxUsage::CcsE)
            .unwrap();
        assert_eq!(enc.flushes.len(), 2);
    }
}
