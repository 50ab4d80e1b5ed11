// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Resolve dispatch.
//!
//! The functions here issue one resolve/ambiguate/fast-clear pass through the device's
//! [`ResolveEngine`], bracketed by the synchronization the hardware requires.  Compression
//! state transitions are not ordered against rendering that is already in the pipe, so every
//! pass is preceded by a sync that drains prior rendering and followed by one that drains the
//! pass itself.
//!
//! Nothing here touches the aux state store.  The state machine in [`crate::aux`] commits the
//! new state only after a dispatch returns `Ok`, so the store never describes work that failed
//! to encode.

use crate::batch::{Batch, EncodeError, PipeControl};
use crate::imp::{DeviceCaps, ResolveEngine};
use crate::resource::aux_usage::{AuxKind, AuxUsage};
use crate::resource::surface::Format;
use crate::resource::{BufferId, ClearColor, Resource};
use std::fmt::{Debug, Formatter};
use std::ops::Range;

/// The pass to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuxOp {
    /// Write everything the aux surface knows back into the main surface.  Destroys
    /// compression for the affected subresources.
    FullResolve,
    /// Replace fast-clear blocks with real compressed data; compression survives.
    PartialResolve,
    /// Put the aux surface into a valid "pass-through" state without reading it.
    Ambiguate,
    /// Mark the subresources as holding the clear color.
    FastClear,
}

/// Description of one level of a resource as the resolve engine should see it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceView {
    pub buffer: BufferId,
    /// Linear equivalent of the surface format for color surfaces.
    pub format: Format,
    pub aux_usage: AuxUsage,
    pub level: u32,
    pub width: u32,
    pub height: u32,
    pub samples: u32,
    pub clear_color: ClearColor,
}

impl SurfaceView {
    pub fn for_resource(resource: &Resource, level: u32) -> Self {
        let surface = resource.surface();
        let format = if surface.format.is_color() {
            surface.format.to_linear()
        } else {
            surface.format
        };
        SurfaceView {
            buffer: resource.buffer(),
            format,
            aux_usage: resource.aux_usage(),
            level,
            width: surface.level_width(level),
            height: surface.level_height(level),
            samples: surface.samples,
            clear_color: resource.clear_color(),
        }
    }
}

/// One pass for the [`ResolveEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveRequest {
    pub view: SurfaceView,
    pub layers: Range<u32>,
    pub op: AuxOp,
}

/// Failure of a state-machine operation.
///
/// Whatever was encoded before the failure stays encoded and committed; the failing unit left
/// its state untouched.  The batch should be considered lost.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ResolveError {
    #[error("Can't encode {op:?} of {label} level {level}: {source}")]
    Resolve {
        op: AuxOp,
        label: String,
        level: u32,
        #[source]
        source: EncodeError,
    },
    /// A cache flush, copy or submission failed to encode.
    #[error("Can't encode command: {0}")]
    Encode(#[from] EncodeError),
}

/// Which synchronization brackets a pass.
#[derive(Debug, Clone, Copy)]
enum Bracket {
    /// End-of-pipe syncs with a render-target flush on both sides.
    RenderTarget {
        pre: &'static str,
        post: &'static str,
    },
    /// Depth-cache flushes and stalls around a depth pass.
    Depth,
}

/// The device, its engine and a batch, borrowed together for a run of state-machine work.
///
/// Created by [`crate::imp::Device::resolver`].  The state-machine entry points in
/// [`crate::aux`] are methods on this type.
pub struct Resolver<'a> {
    caps: &'a DeviceCaps,
    engine: &'a mut dyn ResolveEngine,
    batch: &'a mut Batch,
}

impl Debug for Resolver<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("caps", self.caps)
            .field("batch", &self.batch)
            .finish_non_exhaustive()
    }
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(
        caps: &'a DeviceCaps,
        engine: &'a mut dyn ResolveEngine,
        batch: &'a mut Batch,
    ) -> Self {
        Resolver {
            caps,
            engine,
            batch,
        }
    }

    pub fn caps(&self) -> &DeviceCaps {
        self.caps
    }

    pub fn batch(&mut self) -> &mut Batch {
        self.batch
    }

    /// Resolves one layer of a color-compressed resource.
    pub fn resolve_color(
        &mut self,
        resource: &Resource,
        level: u32,
        layer: u32,
        op: AuxOp,
    ) -> Result<(), ResolveError> {
        assert_eq!(
            resource.aux_kind(),
            Some(AuxKind::Color),
            "color resolve of {label}",
            label = resource.debug_label()
        );
        assert!(
            matches!(op, AuxOp::FullResolve | AuxOp::PartialResolve),
            "{op:?} is not a color resolve"
        );
        self.dispatch(
            resource,
            level,
            layer..layer + 1,
            op,
            Bracket::RenderTarget {
                pre: "color resolve: pre-flush",
                post: "color resolve: post-flush",
            },
        )
    }

    /// Partially resolves one layer of a multisample-compressed resource.
    pub fn resolve_multisample_partial(
        &mut self,
        resource: &Resource,
        layer: u32,
    ) -> Result<(), ResolveError> {
        assert_eq!(
            resource.aux_kind(),
            Some(AuxKind::Multisample),
            "multisample resolve of {label}",
            label = resource.debug_label()
        );
        self.dispatch(
            resource,
            0,
            layer..layer + 1,
            AuxOp::PartialResolve,
            Bracket::RenderTarget {
                pre: "mcs partial resolve: pre-flush",
                post: "mcs partial resolve: post-flush",
            },
        )
    }

    /// Runs a depth resolve or ambiguate over `layers` of `level`.
    pub fn resolve_hiz(
        &mut self,
        resource: &Resource,
        level: u32,
        layers: Range<u32>,
        op: AuxOp,
    ) -> Result<(), ResolveError> {
        assert!(
            resource.level_has_hiz(level),
            "depth op on {label} level {level} without depth compression",
            label = resource.debug_label()
        );
        assert!(
            matches!(op, AuxOp::FullResolve | AuxOp::Ambiguate),
            "{op:?} is not a depth resolve"
        );
        self.dispatch(resource, level, layers, op, Bracket::Depth)
    }

    /// Fast-clears `layers` of `level` to the resource's current clear color.
    pub fn fast_clear_surface(
        &mut self,
        resource: &Resource,
        level: u32,
        layers: Range<u32>,
    ) -> Result<(), ResolveError> {
        let bracket = match resource.aux_kind() {
            Some(AuxKind::Color) | Some(AuxKind::Multisample) => Bracket::RenderTarget {
                pre: "fast clear: pre-flush",
                post: "fast clear: post-flush",
            },
            Some(AuxKind::Depth) => {
                assert!(
                    resource.level_has_hiz(level),
                    "depth clear of {label} level {level} without depth compression",
                    label = resource.debug_label()
                );
                Bracket::Depth
            }
            None => panic!(
                "fast clear of {label}, which has no aux surface",
                label = resource.debug_label()
            ),
        };
        self.dispatch(resource, level, layers, AuxOp::FastClear, bracket)
    }

    fn dispatch(
        &mut self,
        resource: &Resource,
        level: u32,
        layers: Range<u32>,
        op: AuxOp,
        bracket: Bracket,
    ) -> Result<(), ResolveError> {
        logwise::trace_sync!(
            "{op} of {label} level {level} layers {first}..{end}",
            op = logwise::privacy::LogIt(&op),
            label = resource.debug_label().to_string(),
            level = level,
            first = layers.start,
            end = layers.end
        );
        let request = ResolveRequest {
            view: SurfaceView::for_resource(resource, level),
            layers,
            op,
        };
        let wrap = |source: EncodeError| {
            logwise::error_sync!(
                "failed to encode resolve: {err}",
                err = logwise::privacy::LogIt(&source)
            );
            ResolveError::Resolve {
                op,
                label: resource.debug_label().to_string(),
                level,
                source,
            }
        };
        self.pre_sync(bracket).map_err(wrap)?;
        {
            let _slow = (op == AuxOp::FullResolve).then(|| logwise::perfwarn_begin!("full resolve"));
            self.engine
                .execute(self.batch.encoder(), &request)
                .map_err(wrap)?;
        }
        self.post_sync(bracket).map_err(wrap)?;
        Ok(())
    }

    fn pre_sync(&mut self, bracket: Bracket) -> Result<(), EncodeError> {
        let encoder = self.batch.encoder();
        match bracket {
            Bracket::RenderTarget { pre, .. } => {
                encoder.emit_end_of_pipe_sync(PipeControl::RENDER_TARGET_FLUSH, pre)
            }
            Bracket::Depth => {
                encoder.emit_cache_flush(
                    PipeControl::DEPTH_CACHE_FLUSH | PipeControl::DEPTH_STALL | PipeControl::CS_STALL,
                    "hiz op: pre-flushes (1/2)",
                )?;
                encoder.emit_cache_flush(
                    PipeControl::RENDER_TARGET_FLUSH
                        | PipeControl::DEPTH_CACHE_FLUSH
                        | PipeControl::CS_STALL,
                    "hiz op: pre-flushes (2/2)",
                )
            }
        }
    }

    fn post_sync(&mut self, bracket: Bracket) -> Result<(), EncodeError> {
        let encoder = self.batch.encoder();
        match bracket {
            Bracket::RenderTarget { post, .. } => {
                encoder.emit_end_of_pipe_sync(PipeControl::RENDER_TARGET_FLUSH, post)
            }
            Bracket::Depth => encoder.emit_cache_flush(
                PipeControl::DEPTH_CACHE_FLUSH | PipeControl::DEPTH_STALL,
                "hiz op: post flush",
            ),
        }
    }
}
