// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Resolve orchestration around draws and dispatches.

Before a draw, every resource it will touch is brought into a state its consumer
understands, and the caches are flushed where a buffer changes hands between incompatible
caches.  After the draw, the aux states of what it wrote are advanced and the cache tracker
is told what the render and depth caches now hold.

All of this is keyed off [`DirtyFlags`]: bindings that have not changed since the last draw
were already prepared, and preparing them again would find nothing to do.  The one
exception is cache tracking for color attachments, which must be recorded on every draw
because a flush in between may have forgotten them.

The hooks merge the dirty flags they raise into [`DrawState`] as they go, so a state change
made while preparing one stage is seen by the stages after it.  The caller clears the flags
with [`DrawState::clear_dirty`] once the post-draw hook has run.
*/

mod bindings;

pub use bindings::{Framebuffer, ImageView, SamplerView, ShaderBindings, SurfaceBinding};

use crate::aux;
use crate::dirty_tracking::DirtyFlags;
use crate::resolve::{ResolveError, Resolver};
use crate::resource::addressing::{self, Span};
use crate::resource::aux_usage::{AuxKind, AuxUsage};
use crate::resource::surface::Target;
use crate::resource::{Resource, ResourceId, ResourceTable};

/// A shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Vertex,
    TessControl,
    TessEval,
    Geometry,
    Fragment,
    Compute,
}

impl Stage {
    /// The stages of the graphics pipeline, in pipeline order.
    pub const GRAPHICS: [Stage; 5] = [
        Stage::Vertex,
        Stage::TessControl,
        Stage::TessEval,
        Stage::Geometry,
        Stage::Fragment,
    ];

    fn index(self) -> usize {
        self as usize
    }

    pub fn bindings_dirty(self) -> DirtyFlags {
        match self {
            Stage::Vertex => DirtyFlags::BINDINGS_VS,
            Stage::TessControl => DirtyFlags::BINDINGS_TCS,
            Stage::TessEval => DirtyFlags::BINDINGS_TES,
            Stage::Geometry => DirtyFlags::BINDINGS_GS,
            Stage::Fragment => DirtyFlags::BINDINGS_FS,
            Stage::Compute => DirtyFlags::BINDINGS_CS,
        }
    }

    pub fn constants_dirty(self) -> DirtyFlags {
        match self {
            Stage::Vertex => DirtyFlags::CONSTANTS_VS,
            Stage::TessControl => DirtyFlags::CONSTANTS_TCS,
            Stage::TessEval => DirtyFlags::CONSTANTS_TES,
            Stage::Geometry => DirtyFlags::CONSTANTS_GS,
            Stage::Fragment => DirtyFlags::CONSTANTS_FS,
            Stage::Compute => DirtyFlags::CONSTANTS_CS,
        }
    }
}

/// Draw-time state as the binding layer sees it.
///
/// Every setter raises the dirty flags of the state it changed.
#[derive(Debug, Clone, Default)]
pub struct DrawState {
    stages: [ShaderBindings; 6],
    framebuffer: Framebuffer,
    /// Bit `i` set when blending is enabled on color attachment `i`.
    blend_enabled: u32,
    depth_writes: bool,
    stencil_writes: bool,
    fs_reads_outputs: bool,
    /// Usage each color attachment is rendered with, decided before the draw.
    draw_aux_usage: Vec<AuxUsage>,
    dirty: DirtyFlags,
}

impl DrawState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bindings(&self, stage: Stage) -> &ShaderBindings {
        &self.stages[stage.index()]
    }

    pub fn bind_sampler_view(&mut self, stage: Stage, slot: usize, view: Option<SamplerView>) {
        self.stages[stage.index()].set_sampler_view(slot, view);
        self.dirty |= stage.bindings_dirty();
    }

    pub fn bind_image(&mut self, stage: Stage, slot: usize, view: Option<ImageView>) {
        self.stages[stage.index()].set_image(slot, view);
        self.dirty |= stage.bindings_dirty();
    }

    pub fn bind_constant_buffer(&mut self, stage: Stage, slot: usize, buffer: Option<ResourceId>) {
        self.stages[stage.index()].set_constant_buffer(slot, buffer);
        self.dirty |= stage.constants_dirty();
    }

    pub fn bind_storage_buffer(&mut self, stage: Stage, slot: usize, buffer: Option<ResourceId>) {
        self.stages[stage.index()].set_storage_buffer(slot, buffer);
        self.dirty |= stage.bindings_dirty();
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn set_framebuffer(&mut self, framebuffer: Framebuffer) {
        self.draw_aux_usage = vec![AuxUsage::None; framebuffer.colors.len()];
        self.framebuffer = framebuffer;
        self.dirty |= DirtyFlags::BINDINGS_FS | DirtyFlags::DEPTH_BUFFER;
    }

    pub fn blend_enabled(&self, attachment: usize) -> bool {
        attachment < 32 && self.blend_enabled & (1 << attachment) != 0
    }

    /// Sets blending per color attachment; bit `i` enables attachment `i`.
    pub fn set_blend_enabled(&mut self, mask: u32) {
        self.blend_enabled = mask;
        self.dirty |= DirtyFlags::BLEND_STATE;
    }

    pub fn depth_writes(&self) -> bool {
        self.depth_writes
    }

    pub fn stencil_writes(&self) -> bool {
        self.stencil_writes
    }

    pub fn set_depth_stencil_writes(&mut self, depth: bool, stencil: bool) {
        self.depth_writes = depth;
        self.stencil_writes = stencil;
        self.dirty |= DirtyFlags::WM_DEPTH_STENCIL;
    }

    /// Whether the fragment shader reads the framebuffer's current contents.
    pub fn set_fs_reads_outputs(&mut self, reads: bool) {
        self.fs_reads_outputs = reads;
        self.dirty |= DirtyFlags::BINDINGS_FS;
    }

    /// The usage color attachment `attachment` was last prepared with.
    pub fn draw_aux_usage(&self, attachment: usize) -> AuxUsage {
        self.draw_aux_usage
            .get(attachment)
            .copied()
            .unwrap_or(AuxUsage::None)
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    pub fn merge_dirty(&mut self, flags: DirtyFlags) {
        self.dirty |= flags;
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = DirtyFlags::empty();
    }
}

/// What the pre-draw hooks found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredrawReport {
    /// Per color attachment: compression disabled for this draw because a bound texture
    /// reads the same surface.
    pub aux_disabled: Vec<bool>,
    /// Number of self-dependency hazards detected.
    pub hazards: u32,
}

impl PredrawReport {
    pub fn new(attachments: usize) -> Self {
        PredrawReport {
            aux_disabled: vec![false; attachments],
            hazards: 0,
        }
    }

    pub fn aux_disabled(&self, attachment: usize) -> bool {
        self.aux_disabled.get(attachment).copied().unwrap_or(false)
    }
}

/// Disables compression on color attachments that alias `texture` within `levels`.
///
/// Rendering compressed while sampling the same surface uncompressed would read stale data.
/// Returns whether any attachment was affected.
fn disable_aliased_attachment_aux(
    resources: &ResourceTable,
    framebuffer: &Framebuffer,
    report: &mut PredrawReport,
    texture: &Resource,
    levels: Span,
    usage: &'static str,
) -> bool {
    if texture.aux_kind() != Some(AuxKind::Color) {
        return false;
    }
    let levels = addressing::level_range(texture.surface(), levels);
    let mut found = false;
    for (i, attachment) in framebuffer.colors.iter().enumerate() {
        let target = resources.expect(attachment.resource);
        if target.buffer() == texture.buffer() && levels.contains(&attachment.level) {
            report.aux_disabled[i] = true;
            found = true;
        }
    }
    if found {
        report.hazards += 1;
        logwise::warn_sync!(
            "disabling compression on a render target of {label}: also bound {usage}",
            label = texture.debug_label().to_string(),
            usage = usage.to_string()
        );
    }
    found
}

/// Rebuilds `report` from every sampler view and image bound to a graphics stage.
fn scan_attachment_hazards(
    resources: &ResourceTable,
    state: &DrawState,
    report: &mut PredrawReport,
) {
    *report = PredrawReport::new(state.framebuffer.colors.len());
    for stage in Stage::GRAPHICS {
        let bindings = state.bindings(stage);
        for (_, view) in bindings.sampler_views() {
            disable_aliased_attachment_aux(
                resources,
                &state.framebuffer,
                report,
                resources.expect(view.resource),
                view.levels,
                "for sampling",
            );
        }
        for (_, image) in bindings.images() {
            disable_aliased_attachment_aux(
                resources,
                &state.framebuffer,
                report,
                resources.expect(image.resource),
                Span::one(image.level),
                "as a shader image",
            );
        }
    }
}

/// Resolves the textures and images bound to `stage` and flushes the caches they will be
/// read through.
///
/// Runs only when the stage's bindings (or, with `consider_framebuffer`, the fragment
/// bindings) are dirty.  With `consider_framebuffer`, textures that alias a color attachment
/// disable that attachment's compression in `report` and dirty the fragment bindings so
/// [`predraw_resolve_framebuffer`] recomputes the attachment's usage.
pub fn predraw_resolve_inputs(
    resolver: &mut Resolver<'_>,
    resources: &mut ResourceTable,
    state: &mut DrawState,
    stage: Stage,
    consider_framebuffer: bool,
    report: &mut PredrawReport,
) -> Result<(), ResolveError> {
    let mut watched = stage.bindings_dirty();
    if consider_framebuffer {
        watched |= DirtyFlags::BINDINGS_FS;
    }
    if !state.dirty.intersects(watched) {
        return Ok(());
    }
    if report.aux_disabled.len() < state.framebuffer.colors.len() {
        report.aux_disabled.resize(state.framebuffer.colors.len(), false);
    }

    let views: Vec<SamplerView> = state.bindings(stage).sampler_views().map(|(_, v)| *v).collect();
    for view in views {
        if consider_framebuffer
            && disable_aliased_attachment_aux(
                resources,
                &state.framebuffer,
                report,
                resources.expect(view.resource),
                view.levels,
                "for sampling",
            )
        {
            state.merge_dirty(DirtyFlags::BINDINGS_FS);
        }
        let resource = resources.expect_mut(view.resource);
        if resource.surface().target != Target::Buffer {
            let dirty = resolver.prepare_texture(resource, view.format, view.levels, view.layers)?;
            state.merge_dirty(dirty);
        }
        resolver.batch().flush_for_read(resource.buffer())?;
    }

    let images: Vec<(usize, ImageView)> = state.bindings(stage).images().map(|(i, v)| (i, *v)).collect();
    for (slot, image) in images {
        if consider_framebuffer
            && disable_aliased_attachment_aux(
                resources,
                &state.framebuffer,
                report,
                resources.expect(image.resource),
                Span::one(image.level),
                "as a shader image",
            )
        {
            state.merge_dirty(DirtyFlags::BINDINGS_FS);
        }
        let resource = resources.expect_mut(image.resource);
        let usage = aux::image_aux_usage(resolver.caps(), resource, image.atomics);
        state.stages[stage.index()].image_aux_usage[slot] = usage;
        let dirty = resolver.prepare_access(
            resource,
            Span::one(image.level),
            image.layers,
            usage,
            false,
        )?;
        state.merge_dirty(dirty);
        resolver.batch().flush_for_read(resource.buffer())?;
    }
    Ok(())
}

/// Flushes render/depth caches for buffers `stage` reads as constants or storage.
pub fn predraw_flush_buffers(
    resolver: &mut Resolver<'_>,
    resources: &ResourceTable,
    state: &DrawState,
    stage: Stage,
) -> Result<(), ResolveError> {
    let bindings = state.bindings(stage);
    if state.dirty.intersects(stage.constants_dirty()) {
        for (_, id) in bindings.constant_buffers() {
            resolver.batch().flush_for_read(resources.expect(*id).buffer())?;
        }
    }
    if state.dirty.intersects(stage.bindings_dirty()) {
        for (_, id) in bindings.storage_buffers() {
            resolver.batch().flush_for_read(resources.expect(*id).buffer())?;
        }
    }
    Ok(())
}

/// Prepares the depth, stencil and color attachments for the draw.
///
/// Whenever the attachments' usages are recomputed, `report` is rebuilt from all bound
/// textures, so a hazard found on an earlier draw still holds when only blending changed.
pub fn predraw_resolve_framebuffer(
    resolver: &mut Resolver<'_>,
    resources: &mut ResourceTable,
    state: &mut DrawState,
    report: &mut PredrawReport,
) -> Result<(), ResolveError> {
    if state.dirty.contains(DirtyFlags::DEPTH_BUFFER) {
        if let Some(depth) = state.framebuffer.depth {
            let resource = resources.expect_mut(depth.resource);
            let dirty = resolver.prepare_depth(resource, depth.level, depth.layers)?;
            state.merge_dirty(dirty);
            resolver.batch().flush_for_depth(resource.buffer())?;
        }
        if let Some(stencil) = state.framebuffer.stencil {
            let buffer = resources.expect(stencil.resource).buffer();
            resolver.batch().flush_for_depth(buffer)?;
        }
    }

    if resolver.caps().reads_render_target_via_texture && state.fs_reads_outputs {
        for attachment in state.framebuffer.colors.clone() {
            let resource = resources.expect_mut(attachment.resource);
            let dirty = resolver.prepare_texture(
                resource,
                attachment.format,
                Span::one(attachment.level),
                attachment.layers,
            )?;
            state.merge_dirty(dirty);
        }
    }

    if state.dirty.intersects(DirtyFlags::BINDINGS_FS | DirtyFlags::BLEND_STATE) {
        scan_attachment_hazards(resources, state, report);
        for (i, attachment) in state.framebuffer.colors.clone().into_iter().enumerate() {
            let resource = resources.expect_mut(attachment.resource);
            let usage = aux::render_aux_usage(
                resolver.caps(),
                resource,
                attachment.format,
                state.blend_enabled(i),
                report.aux_disabled(i),
            );
            if state.draw_aux_usage[i] != usage {
                state.draw_aux_usage[i] = usage;
                state.merge_dirty(DirtyFlags::ALL_BINDINGS);
            }
            let dirty =
                resolver.prepare_render(resource, attachment.level, attachment.layers, usage)?;
            state.merge_dirty(dirty);
            resolver
                .batch()
                .flush_for_render(resource.buffer(), attachment.format, usage)?;
        }
    }
    Ok(())
}

/// Records what the draw wrote.
pub fn postdraw_update_resolve_tracking(
    resolver: &mut Resolver<'_>,
    resources: &mut ResourceTable,
    state: &mut DrawState,
) -> Result<(), ResolveError> {
    let may_have_resolved_depth = state
        .dirty
        .intersects(DirtyFlags::DEPTH_BUFFER | DirtyFlags::WM_DEPTH_STENCIL);

    if let Some(depth) = state.framebuffer.depth {
        let resource = resources.expect_mut(depth.resource);
        if may_have_resolved_depth {
            let dirty = aux::finish_depth(resource, depth.level, depth.layers, state.depth_writes);
            state.merge_dirty(dirty);
        }
        if state.depth_writes {
            resolver.batch().record_depth(resource.buffer());
        }
    }

    if let Some(stencil) = state.framebuffer.stencil {
        let resource = resources.expect_mut(stencil.resource);
        if may_have_resolved_depth && state.stencil_writes {
            let usage = resource.aux_usage();
            let dirty = aux::finish_write(resource, stencil.level, stencil.layers, usage);
            state.merge_dirty(dirty);
        }
        if state.stencil_writes {
            resolver.batch().record_depth(resource.buffer());
        }
    }

    let may_have_resolved_color = state
        .dirty
        .intersects(DirtyFlags::BINDINGS_FS | DirtyFlags::BLEND_STATE);
    for (i, attachment) in state.framebuffer.colors.clone().into_iter().enumerate() {
        let usage = state.draw_aux_usage(i);
        let resource = resources.expect_mut(attachment.resource);
        resolver
            .batch()
            .record_render(resource.buffer(), attachment.format, usage)?;
        if may_have_resolved_color {
            let dirty = aux::finish_render(resource, attachment.level, attachment.layers, usage);
            state.merge_dirty(dirty);
        }
    }

    for stage in Stage::GRAPHICS {
        finish_image_writes(resources, state, stage);
    }
    Ok(())
}

/// Advances aux state for every writable image bound to `stage`.
pub fn finish_image_writes(resources: &mut ResourceTable, state: &mut DrawState, stage: Stage) {
    let images: Vec<(usize, ImageView)> = state
        .bindings(stage)
        .images()
        .filter(|(_, v)| v.write)
        .map(|(i, v)| (i, *v))
        .collect();
    for (slot, image) in images {
        let usage = state.bindings(stage).image_aux_usage(slot);
        let resource = resources.expect_mut(image.resource);
        let dirty = aux::finish_write(resource, image.level, image.layers, usage);
        state.merge_dirty(dirty);
    }
}

/// The compute counterpart of the pre-draw hooks: resolves the compute stage's inputs
/// without considering the framebuffer, then flushes its buffers.
pub fn predispatch_resolve(
    resolver: &mut Resolver<'_>,
    resources: &mut ResourceTable,
    state: &mut DrawState,
) -> Result<PredrawReport, ResolveError> {
    let mut report = PredrawReport::default();
    predraw_resolve_inputs(resolver, resources, state, Stage::Compute, false, &mut report)?;
    predraw_flush_buffers(resolver, resources, state, Stage::Compute)?;
    Ok(report)
}
