// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! A recording context: one device, one batch, the resources and the draw state.
//!
//! This is the front door for a driver.  It owns everything the state machine and the cache
//! tracker mutate, so a `&mut Context` is all the exclusivity the resolve logic needs.

use crate::aux;
use crate::batch::{Batch, CommandEncoder, EncodeError};
use crate::dirty_tracking::DirtyFlags;
use crate::draw::{self, DrawState, PredrawReport, Stage, SurfaceBinding};
use crate::imp::Device;
use crate::resolve::ResolveError;
use crate::resource::addressing::Span;
use crate::resource::{ClearColor, Resource, ResourceId, ResourceTable};

#[derive(Debug)]
pub struct Context {
    device: Device,
    batch: Batch,
    resources: ResourceTable,
    state: DrawState,
}

impl Context {
    pub fn new(device: Device, batch: Batch) -> Self {
        Context {
            device,
            batch,
            resources: ResourceTable::new(),
            state: DrawState::new(),
        }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }

    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn insert_resource(&mut self, resource: Resource) -> ResourceId {
        self.resources.insert(resource)
    }

    /// Frees a resource.  Bindings naming it must be dropped first.
    pub fn remove_resource(&mut self, id: ResourceId) -> Option<Resource> {
        self.resources.remove(id)
    }

    pub fn state(&self) -> &DrawState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut DrawState {
        &mut self.state
    }

    /// Runs the pre-draw hooks for every graphics stage and the framebuffer.
    pub fn predraw(&mut self) -> Result<PredrawReport, ResolveError> {
        let mut report = PredrawReport::new(self.state.framebuffer().colors.len());
        let mut resolver = self.device.resolver(&mut self.batch);
        for stage in Stage::GRAPHICS {
            draw::predraw_resolve_inputs(
                &mut resolver,
                &mut self.resources,
                &mut self.state,
                stage,
                true,
                &mut report,
            )?;
            draw::predraw_flush_buffers(&mut resolver, &self.resources, &self.state, stage)?;
        }
        draw::predraw_resolve_framebuffer(
            &mut resolver,
            &mut self.resources,
            &mut self.state,
            &mut report,
        )?;
        Ok(report)
    }

    /// Runs the post-draw hook and consumes the dirty flags.
    pub fn postdraw(&mut self) -> Result<(), ResolveError> {
        let mut resolver = self.device.resolver(&mut self.batch);
        draw::postdraw_update_resolve_tracking(&mut resolver, &mut self.resources, &mut self.state)?;
        self.state.clear_dirty();
        Ok(())
    }

    /// [`Context::predraw`], then `encode_draw`, then [`Context::postdraw`].
    pub fn draw<F>(&mut self, encode_draw: F) -> Result<PredrawReport, ResolveError>
    where
        F: FnOnce(&mut dyn CommandEncoder) -> Result<(), EncodeError>,
    {
        let report = self.predraw()?;
        encode_draw(self.batch.encoder())?;
        self.postdraw()?;
        Ok(report)
    }

    pub fn predispatch(&mut self) -> Result<PredrawReport, ResolveError> {
        let mut resolver = self.device.resolver(&mut self.batch);
        draw::predispatch_resolve(&mut resolver, &mut self.resources, &mut self.state)
    }

    pub fn postdispatch(&mut self) {
        draw::finish_image_writes(&mut self.resources, &mut self.state, Stage::Compute);
        self.state.clear_dirty();
    }

    /// Prepares `levels`/`layers` of a resource for CPU access.
    pub fn map(
        &mut self,
        id: ResourceId,
        levels: Span,
        layers: Span,
        write: bool,
    ) -> Result<(), ResolveError> {
        let resource = self.resources.expect_mut(id);
        let mut resolver = self.device.resolver(&mut self.batch);
        let dirty = resolver.access_raw(resource, levels, layers, write)?;
        resolver.batch().flush_for_read(resource.buffer())?;
        self.state.merge_dirty(dirty);
        Ok(())
    }

    /// Copies `src` to `dst` through the render pipeline.
    ///
    /// `copy` encodes the copy itself once both sides are prepared.  Reading and writing the
    /// same buffer disables compression on the destination.
    pub fn blit<F>(
        &mut self,
        src: SurfaceBinding,
        dst: SurfaceBinding,
        copy: F,
    ) -> Result<(), ResolveError>
    where
        F: FnOnce(&mut dyn CommandEncoder) -> Result<(), EncodeError>,
    {
        let mut dirty = DirtyFlags::empty();
        let mut resolver = self.device.resolver(&mut self.batch);

        let source = self.resources.expect_mut(src.resource);
        let src_buffer = source.buffer();
        dirty |= resolver.prepare_texture(source, src.format, Span::one(src.level), src.layers)?;
        resolver.batch().flush_for_read(src_buffer)?;

        let dest = self.resources.expect_mut(dst.resource);
        let usage = aux::render_aux_usage(
            resolver.caps(),
            dest,
            dst.format,
            false,
            dest.buffer() == src_buffer,
        );
        dirty |= resolver.prepare_render(dest, dst.level, dst.layers, usage)?;
        resolver
            .batch()
            .flush_for_render(dest.buffer(), dst.format, usage)?;

        copy(resolver.batch().encoder())?;

        dirty |= aux::finish_render(dest, dst.level, dst.layers, usage);
        resolver
            .batch()
            .record_render(dest.buffer(), dst.format, usage)?;
        // the copy replaced the fragment bindings, blend and depth setup of the next draw
        dirty |= DirtyFlags::BINDINGS_FS | DirtyFlags::BLEND_STATE | DirtyFlags::DEPTH_BUFFER;
        self.state.merge_dirty(dirty);
        Ok(())
    }

    /// Fast-clears `layers` of `level` to `color`.
    pub fn fast_clear(
        &mut self,
        id: ResourceId,
        level: u32,
        layers: Span,
        color: ClearColor,
    ) -> Result<(), ResolveError> {
        let resource = self.resources.expect_mut(id);
        let dirty = self
            .device
            .resolver(&mut self.batch)
            .fast_clear(resource, level, layers, color)?;
        self.state.merge_dirty(dirty);
        Ok(())
    }

    pub fn submit(&mut self) -> Result<(), ResolveError> {
        self.batch.submit()?;
        Ok(())
    }
}
