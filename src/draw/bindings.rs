// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! What a draw reads and writes: per-stage shader bindings and the framebuffer.

use crate::resource::ResourceId;
use crate::resource::addressing::Span;
use crate::resource::aux_usage::AuxUsage;
use crate::resource::surface::Format;

/// A texture bound for sampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerView {
    pub resource: ResourceId,
    /// The format the shader reads the texture as.  May differ from the resource's.
    pub format: Format,
    pub levels: Span,
    pub layers: Span,
}

impl SamplerView {
    /// A view of every level and layer in `format`.
    pub fn new(resource: ResourceId, format: Format) -> Self {
        SamplerView {
            resource,
            format,
            levels: Span::all(),
            layers: Span::all(),
        }
    }

    pub fn with_levels(mut self, levels: Span) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_layers(mut self, layers: Span) -> Self {
        self.layers = layers;
        self
    }
}

/// A shader image (storage texture).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageView {
    pub resource: ResourceId,
    pub format: Format,
    pub level: u32,
    pub layers: Span,
    /// The shader may write through this image.
    pub write: bool,
    /// The shader may perform atomics on this image.
    pub atomics: bool,
}

impl ImageView {
    /// A read-only view of all layers of `level`.
    pub fn new(resource: ResourceId, format: Format, level: u32) -> Self {
        ImageView {
            resource,
            format,
            level,
            layers: Span::all(),
            write: false,
            atomics: false,
        }
    }

    pub fn writable(mut self) -> Self {
        self.write = true;
        self
    }

    pub fn with_atomics(mut self) -> Self {
        self.write = true;
        self.atomics = true;
        self
    }

    pub fn with_layers(mut self, layers: Span) -> Self {
        self.layers = layers;
        self
    }
}

/// One level of a resource attached to the framebuffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceBinding {
    pub resource: ResourceId,
    pub format: Format,
    pub level: u32,
    pub layers: Span,
}

impl SurfaceBinding {
    /// All layers of `level`, in `format`.
    pub fn new(resource: ResourceId, format: Format, level: u32) -> Self {
        SurfaceBinding {
            resource,
            format,
            level,
            layers: Span::all(),
        }
    }

    pub fn with_layers(mut self, layers: Span) -> Self {
        self.layers = layers;
        self
    }
}

/// Render targets of a draw.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Framebuffer {
    pub colors: Vec<SurfaceBinding>,
    pub depth: Option<SurfaceBinding>,
    pub stencil: Option<SurfaceBinding>,
}

/// Slots bound to one shader stage.  Unbound slots are `None`.
#[derive(Debug, Clone, Default)]
pub struct ShaderBindings {
    pub(crate) sampler_views: Vec<Option<SamplerView>>,
    pub(crate) images: Vec<Option<ImageView>>,
    pub(crate) constant_buffers: Vec<Option<ResourceId>>,
    pub(crate) storage_buffers: Vec<Option<ResourceId>>,
    /// Usage each image slot was prepared with, for the matching finish after the draw.
    pub(crate) image_aux_usage: Vec<AuxUsage>,
}

fn put<T>(slots: &mut Vec<Option<T>>, slot: usize, value: Option<T>) {
    if slots.len() <= slot {
        slots.resize_with(slot + 1, || None);
    }
    slots[slot] = value;
}

impl ShaderBindings {
    pub fn sampler_views(&self) -> impl Iterator<Item = (usize, &SamplerView)> {
        bound(&self.sampler_views)
    }

    pub fn images(&self) -> impl Iterator<Item = (usize, &ImageView)> {
        bound(&self.images)
    }

    pub fn constant_buffers(&self) -> impl Iterator<Item = (usize, &ResourceId)> {
        bound(&self.constant_buffers)
    }

    pub fn storage_buffers(&self) -> impl Iterator<Item = (usize, &ResourceId)> {
        bound(&self.storage_buffers)
    }

    /// The usage image `slot` was last prepared with.
    pub fn image_aux_usage(&self, slot: usize) -> AuxUsage {
        self.image_aux_usage
            .get(slot)
            .copied()
            .unwrap_or(AuxUsage::None)
    }

    pub(crate) fn set_sampler_view(&mut self, slot: usize, view: Option<SamplerView>) {
        put(&mut self.sampler_views, slot, view);
    }

    pub(crate) fn set_image(&mut self, slot: usize, view: Option<ImageView>) {
        put(&mut self.images, slot, view);
        if self.image_aux_usage.len() < self.images.len() {
            self.image_aux_usage.resize(self.images.len(), AuxUsage::None);
        }
    }

    pub(crate) fn set_constant_buffer(&mut self, slot: usize, buffer: Option<ResourceId>) {
        put(&mut self.constant_buffers, slot, buffer);
    }

    pub(crate) fn set_storage_buffer(&mut self, slot: usize, buffer: Option<ResourceId>) {
        put(&mut self.storage_buffers, slot, buffer);
    }
}

fn bound<T>(slots: &[Option<T>]) -> impl Iterator<Item = (usize, &T)> {
    slots
        .iter()
        .enumerate()
        .filter_map(|(i, s)| s.as_ref().map(|s| (i, s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{BufferId, Resource, ResourceTable};
    use crate::resource::surface::SurfaceDesc;

    #[test]
    fn sparse_slots() {
        let mut table = ResourceTable::new();
        let id = table.insert(
            Resource::new(
                "t",
                BufferId(1),
                SurfaceDesc::texture_2d(Format::RGBA8UNorm, 4, 4, 1),
            )
            .unwrap(),
        );
        let mut bindings = ShaderBindings::default();
        bindings.set_sampler_view(3, Some(SamplerView::new(id, Format::RGBA8UNorm)));
        bindings.set_image(2, Some(ImageView::new(id, Format::RGBA8UNorm, 0).writable()));
        assert_eq!(bindings.sampler_views().map(|(i, _)| i).collect::<Vec<_>>(), vec![3]);
        assert_eq!(bindings.images().count(), 1);
        assert_eq!(bindings.image_aux_usage(2), AuxUsage::None);
        assert_eq!(bindings.image_aux_usage(9), AuxUsage::None);

        bindings.set_sampler_view(3, None);
        assert_eq!(bindings.sampler_views().count(), 0);
    }
}
