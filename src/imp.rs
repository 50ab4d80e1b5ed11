// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Device backends.
//!
//! The resolve logic is written once against two things a device provides: a set of
//! capabilities ([`DeviceCaps`]), fixed when the device is opened, and a [`ResolveEngine`]
//! that turns a [`ResolveRequest`] into hardware commands.  Which hardware generation we are
//! on only matters for picking the capabilities.
//!
//! [`recording`] is a backend that encodes nothing and records everything, for tests and
//! tooling.

pub mod recording;

use crate::batch::{Batch, CommandEncoder, EncodeError};
use crate::resolve::{ResolveRequest, Resolver};

/// Hardware generations we know capabilities for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Generation {
    Gen8,
    Gen9,
    Gen11,
    Gen12,
}

/// Capabilities that change the resolve decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceCaps {
    /// The sampler honors the fast-clear color when reading multisample-compressed surfaces
    /// with arbitrary clear colors.  Without it only 0/1 clear colors can be sampled.
    pub sample_mcs_with_clear: bool,
    /// The sampler can read through depth compression.
    pub sample_with_hiz: bool,
    /// Blending an sRGB render target does not apply the sRGB curve to the fast-clear color,
    /// so compression must be off when blending sRGB with a non-0/1 clear color.
    pub srgb_blend_clear_erratum: bool,
    /// Fragment shaders read framebuffer outputs through the texture unit rather than the
    /// render cache, so attachments must be prepared as textures when they are read.
    pub reads_render_target_via_texture: bool,
    /// Shader images (without atomics) can access "E" color compression.
    pub image_ccs_e: bool,
}

impl DeviceCaps {
    pub fn for_generation(generation: Generation) -> Self {
        DeviceCaps {
            sample_mcs_with_clear: generation >= Generation::Gen9,
            sample_with_hiz: generation >= Generation::Gen9,
            srgb_blend_clear_erratum: generation >= Generation::Gen9,
            reads_render_target_via_texture: generation == Generation::Gen8,
            image_ccs_e: generation >= Generation::Gen12,
        }
    }
}

/// The blit/clear engine that physically performs resolves.
///
/// One call encodes one hardware pass; it returns once the pass is encoded, long before it
/// executes.  Synchronization around the pass is the caller's business.
pub trait ResolveEngine {
    fn execute(
        &mut self,
        encoder: &mut dyn CommandEncoder,
        request: &ResolveRequest,
    ) -> Result<(), EncodeError>;
}

/// A device: capabilities plus the engine that acts on them.
pub struct Device {
    generation: Generation,
    caps: DeviceCaps,
    engine: Box<dyn ResolveEngine>,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("generation", &self.generation)
            .field("caps", &self.caps)
            .finish_non_exhaustive()
    }
}

impl Device {
    pub fn new(generation: Generation, engine: Box<dyn ResolveEngine>) -> Self {
        Self::with_caps(generation, DeviceCaps::for_generation(generation), engine)
    }

    /// A device whose capabilities differ from the generation's defaults.
    pub fn with_caps(
        generation: Generation,
        caps: DeviceCaps,
        engine: Box<dyn ResolveEngine>,
    ) -> Self {
        logwise::info_sync!(
            "opening device {generation} with {caps}",
            generation = logwise::privacy::LogIt(&generation),
            caps = logwise::privacy::LogIt(&caps)
        );
        Device {
            generation,
            caps,
            engine,
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn caps(&self) -> &DeviceCaps {
        &self.caps
    }

    /// Borrows the device together with `batch` for a sequence of state-machine operations.
    pub fn resolver<'a>(&'a mut self, batch: &'a mut Batch) -> Resolver<'a> {
        Resolver::new(&self.caps, self.engine.as_mut(), batch)
    }
}
