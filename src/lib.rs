// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*! resolves_and_caches keeps a GPU driver's compressed surfaces and caches coherent.

Modern GPUs pair many surfaces with an *auxiliary surface* that makes rendering cheaper:
lossless color compression, multisample compression, hierarchical depth.  The catch is that
not every unit of the GPU can read every compressed representation, and the caches those
units go through do not see each other's writes.  A driver therefore has to answer two
questions before every draw, dispatch, blit or CPU map:

1. Is this surface in a state the consumer can read?  If not, *resolve* it first.
2. Does a cache hold dirty lines for this buffer that the consumer will not see?  If so,
   flush.

This crate answers both, with as little work as possible.

| Piece                    | Module             | Responsibility                                             |
|--------------------------|--------------------|------------------------------------------------------------|
| Resources                | [`resource`]       | Surfaces, aux configuration, per-subresource state storage |
| State machine            | [`aux`]            | Per-kind rule tables; prepare before access, finish after  |
| Resolve dispatcher       | [`resolve`]        | Issue resolves through the device with the right barriers  |
| Cache tracker            | [`cache`]          | Batch-scoped render/depth cache membership and flushes     |
| Orchestration            | [`draw`]           | Pre-/post-draw hooks driven by dirty flags                 |
| Front door               | [`context`]        | Owns device, batch, resources and draw state               |

# Backends

The hardware is reached through two traits: [`batch::CommandEncoder`] for synchronization
commands and [`imp::ResolveEngine`] for the resolve passes themselves.  Which capabilities
the hardware has is decided once, by [`imp::Generation`], into an [`imp::DeviceCaps`].

[`imp::recording`] implements both traits by recording every command, which is what the
tests use and what you want for tooling.

# Errors

Two kinds of failure exist.  A transition the rule tables do not define is a driver bug and
panics.  A command that fails to encode is a [`resolve::ResolveError`], returned with the
work already encoded left committed; treat the batch as lost.
*/

pub mod aux;
pub mod batch;
pub mod cache;
pub mod context;
pub mod dirty_tracking;
pub mod draw;
pub mod imp;
pub mod resolve;
pub mod resource;

pub use context::Context;
pub use dirty_tracking::DirtyFlags;
pub use resolve::{AuxOp, ResolveError};
pub use resource::aux_state::{AuxState, Subresource};
pub use resource::aux_usage::{AuxKind, AuxUsage, AuxUsages};
pub use resource::{AuxConfig, BufferId, ClearColor, CreateError, Resource, ResourceId};
