// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
The aux state machine.

Every access to a resource with an auxiliary surface goes through two steps:

1. *prepare*: before the GPU touches the subresources, bring them into a state the consumer
   understands.  The consumer is described by a *target usage* (what it can decode) and
   whether it can cope with fast-clear blocks.  This may dispatch resolves.
2. *finish*: after a write, record what the write did to the aux surface.  This never
   dispatches anything.

Which transitions exist depends on the resource's [`AuxKind`]; each has its own table in a
submodule.  A transition missing from a table means an allocator or driver bug and panics.

Everything that changes state returns the [`DirtyFlags`] it invalidated: surface descriptors
are derived from aux state, so any change forces the binding layer to rebuild them.

# Entry points

The operations that may dispatch work are methods on [`Resolver`]:
[`Resolver::prepare_access`] and the convenience wrappers built on it
([`Resolver::prepare_texture`], [`Resolver::prepare_render`], [`Resolver::prepare_depth`],
[`Resolver::access_raw`], [`Resolver::fast_clear`]).  Reads and pure state updates are free
functions.
*/

mod color;
mod depth;
mod multisample;

use crate::dirty_tracking::DirtyFlags;
use crate::imp::DeviceCaps;
use crate::resolve::{ResolveError, Resolver};
use crate::resource::addressing::{self, Span};
use crate::resource::aux_state::{AuxState, Subresource};
use crate::resource::aux_usage::{AuxKind, AuxUsage};
use crate::resource::surface::Format;
use crate::resource::{ClearColor, Resource};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Prepare,
    Write,
}

impl Display for Access {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Access::Prepare => f.write_str("prepare"),
            Access::Write => f.write_str("write"),
        }
    }
}

/// A transition the rule table for `kind` does not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid {access} of {kind:?} aux in state {state:?} with usage {usage:?}")]
pub(crate) struct InvalidTransition {
    pub(crate) kind: AuxKind,
    pub(crate) access: Access,
    pub(crate) state: AuxState,
    pub(crate) usage: AuxUsage,
}

fn fatal(resource: &Resource, key: Subresource, err: InvalidTransition) -> ! {
    panic!(
        "{err} at {label} level {level} layer {layer}",
        label = resource.debug_label(),
        level = key.level,
        layer = key.layer
    )
}

/// Whether the aux surface may hold data the main surface lacks.
fn is_unresolved(state: AuxState) -> bool {
    !matches!(
        state,
        AuxState::PassThrough | AuxState::Resolved | AuxState::AuxInvalid
    )
}

/// Reads one subresource's state.
///
/// # Panics
///
/// The resource must have an aux surface at `level`: for depth, only levels with depth
/// compression; for multisample, only level 0.
pub fn get_state(resource: &Resource, level: u32, layer: u32) -> AuxState {
    resource.aux_state(Subresource::new(level, layer))
}

/// Overwrites the state of `layers` of `level` without performing any resolve.
pub fn set_state(resource: &mut Resource, level: u32, layers: Span, state: AuxState) -> DirtyFlags {
    let mut changed = false;
    for layer in addressing::layer_range(resource.surface(), level, layers) {
        changed |= resource.set_aux_state(Subresource::new(level, layer), state);
    }
    DirtyFlags::bindings_if(changed)
}

/// Advances `layers` of `level` after they were written with `written_with`.
///
/// Resources without an aux surface, and depth levels without depth compression, are not
/// tracked and return no dirty flags.
pub fn finish_write(
    resource: &mut Resource,
    level: u32,
    layers: Span,
    written_with: AuxUsage,
) -> DirtyFlags {
    let Some(kind) = resource.aux_kind() else {
        return DirtyFlags::empty();
    };
    if !resource.level_has_aux(level) {
        return DirtyFlags::empty();
    }
    let active = resource.aux_usage();
    let mut changed = false;
    for layer in addressing::layer_range(resource.surface(), level, layers) {
        let key = Subresource::new(level, layer);
        let state = resource.aux_state(key);
        let next = match kind {
            AuxKind::Color => color::finish_write(active, state, written_with),
            AuxKind::Multisample => multisample::finish_write(state, written_with),
            AuxKind::Depth => depth::finish_write(state, written_with),
        }
        .unwrap_or_else(|err| fatal(resource, key, err));
        changed |= resource.set_aux_state(key, next);
    }
    DirtyFlags::bindings_if(changed)
}

/// Same as [`finish_write`]; the name pairs with [`Resolver::prepare_render`].
pub fn finish_render(
    resource: &mut Resource,
    level: u32,
    layers: Span,
    usage: AuxUsage,
) -> DirtyFlags {
    finish_write(resource, level, layers, usage)
}

/// Advances depth state after a draw, if the draw wrote depth.
pub fn finish_depth(resource: &mut Resource, level: u32, layers: Span, written: bool) -> DirtyFlags {
    if written {
        let usage = resource.aux_usage();
        finish_write(resource, level, layers, usage)
    } else {
        DirtyFlags::empty()
    }
}

/// Whether any subresource in range may hold color data that is not in the main surface.
pub fn has_color_unresolved(resource: &Resource, levels: Span, layers: Span) -> bool {
    if !matches!(
        resource.aux_kind(),
        Some(AuxKind::Color) | Some(AuxKind::Multisample)
    ) {
        return false;
    }
    any_unresolved(resource, levels, layers)
}

/// Whether any depth-compressed subresource in range may hold depth data that is not in the
/// main surface.
pub fn has_depth_unresolved(resource: &Resource, levels: Span, layers: Span) -> bool {
    if resource.aux_kind() != Some(AuxKind::Depth) {
        return false;
    }
    any_unresolved(resource, levels, layers)
}

fn any_unresolved(resource: &Resource, levels: Span, layers: Span) -> bool {
    addressing::level_range(resource.surface(), levels)
        .filter(|level| resource.level_has_aux(*level))
        .any(|level| {
            addressing::layer_range(resource.surface(), level, layers)
                .any(|layer| is_unresolved(get_state(resource, level, layer)))
        })
}

/// The usage a texture unit reading `resource` as `view_format` should use.
///
/// Color compression is dropped once nothing is left to decompress, since reading through it
/// then only costs bandwidth.
pub fn texture_aux_usage(caps: &DeviceCaps, resource: &Resource, view_format: Format) -> AuxUsage {
    let usage = resource.aux_usage();
    match resource.aux_kind() {
        None => AuxUsage::None,
        Some(AuxKind::Multisample) => usage,
        Some(AuxKind::Color) => {
            if usage == AuxUsage::CcsE
                && resource.sampler_usages().contains_usage(usage)
                && resource.surface().format.ccs_e_compatible(view_format)
                && has_color_unresolved(resource, Span::all(), Span::all())
            {
                usage
            } else {
                AuxUsage::None
            }
        }
        Some(AuxKind::Depth) => {
            if caps.sample_with_hiz && resource.sampler_usages().contains_usage(usage) {
                usage
            } else {
                AuxUsage::None
            }
        }
    }
}

/// Whether a texture unit reading `resource` as `view_format` with `usage` decodes fast-clear
/// blocks correctly.
fn texture_fast_clear_ok(
    caps: &DeviceCaps,
    resource: &Resource,
    view_format: Format,
    usage: AuxUsage,
) -> bool {
    if usage == AuxUsage::None || view_format != resource.surface().format {
        return false;
    }
    if resource.aux_kind() == Some(AuxKind::Multisample) && !caps.sample_mcs_with_clear {
        return resource.clear_color().is_zero_one();
    }
    true
}

/// The usage a color attachment should be rendered with for one draw.
pub fn render_aux_usage(
    caps: &DeviceCaps,
    resource: &Resource,
    render_format: Format,
    blend_enabled: bool,
    aux_disabled: bool,
) -> AuxUsage {
    if aux_disabled {
        return AuxUsage::None;
    }
    let usage = resource.aux_usage();
    match resource.aux_kind() {
        Some(AuxKind::Multisample) => usage,
        Some(AuxKind::Color) => {
            if caps.srgb_blend_clear_erratum
                && blend_enabled
                && render_format.is_srgb()
                && !resource.clear_color().is_zero_one()
            {
                AuxUsage::None
            } else if usage == AuxUsage::CcsE
                && resource.surface().format.ccs_e_compatible(render_format)
            {
                AuxUsage::CcsE
            } else if render_format.supports_ccs_d()
                && resource.possible_usages().contains_usage(AuxUsage::CcsD)
            {
                AuxUsage::CcsD
            } else {
                AuxUsage::None
            }
        }
        Some(AuxKind::Depth) | None => AuxUsage::None,
    }
}

/// The usage a shader image should access `resource` with.
///
/// Only "E" color compression is understood by the data port, and not for atomics.
pub fn image_aux_usage(caps: &DeviceCaps, resource: &Resource, atomics: bool) -> AuxUsage {
    if caps.image_ccs_e && !atomics && resource.aux_usage() == AuxUsage::CcsE {
        AuxUsage::CcsE
    } else {
        AuxUsage::None
    }
}

impl Resolver<'_> {
    /// Brings every subresource in range into a state `target` can consume, dispatching
    /// whatever resolves the rule tables call for.
    ///
    /// Each subresource's new state is committed right after its resolve is encoded.  On
    /// error, subresources already handled keep their new state and the failing one keeps its
    /// old state.
    pub fn prepare_access(
        &mut self,
        resource: &mut Resource,
        levels: Span,
        layers: Span,
        target: AuxUsage,
        fast_clear_ok: bool,
    ) -> Result<DirtyFlags, ResolveError> {
        let Some(kind) = resource.aux_kind() else {
            return Ok(DirtyFlags::empty());
        };
        let active = resource.aux_usage();
        let mut dirty = DirtyFlags::empty();
        for level in addressing::level_range(resource.surface(), levels) {
            if !resource.level_has_aux(level) {
                continue;
            }
            for layer in addressing::layer_range(resource.surface(), level, layers) {
                let key = Subresource::new(level, layer);
                let state = resource.aux_state(key);
                let decision = match kind {
                    AuxKind::Color => color::prepare(active, state, target, fast_clear_ok),
                    AuxKind::Multisample => multisample::prepare(state, target, fast_clear_ok),
                    AuxKind::Depth => depth::prepare(state, target, fast_clear_ok),
                };
                let op = match decision {
                    Ok(Some(op)) => op,
                    Ok(None) => continue,
                    Err(err) => fatal(resource, key, err),
                };
                logwise::trace_sync!(
                    "{label} level {level} layer {layer}: {state} needs {op} for {target}",
                    label = resource.debug_label().to_string(),
                    level = level,
                    layer = layer,
                    state = logwise::privacy::LogIt(&state),
                    op = logwise::privacy::LogIt(&op),
                    target = logwise::privacy::LogIt(&target)
                );
                let next = match kind {
                    AuxKind::Color => {
                        self.resolve_color(resource, level, layer, op)?;
                        color::state_after(op)
                    }
                    AuxKind::Multisample => {
                        self.resolve_multisample_partial(resource, layer)?;
                        multisample::state_after(op)
                    }
                    AuxKind::Depth => {
                        self.resolve_hiz(resource, level, layer..layer + 1, op)?;
                        depth::state_after(op)
                    }
                };
                dirty |= DirtyFlags::bindings_if(resource.set_aux_state(key, next));
            }
        }
        Ok(dirty)
    }

    /// Prepares `resource` for sampling as `view_format`.
    pub fn prepare_texture(
        &mut self,
        resource: &mut Resource,
        view_format: Format,
        levels: Span,
        layers: Span,
    ) -> Result<DirtyFlags, ResolveError> {
        let usage = texture_aux_usage(self.caps(), resource, view_format);
        let fast_clear_ok = texture_fast_clear_ok(self.caps(), resource, view_format, usage);
        self.prepare_access(resource, levels, layers, usage, fast_clear_ok)
    }

    /// Prepares `layers` of `level` for rendering with `usage`, typically the result of
    /// [`render_aux_usage`].
    pub fn prepare_render(
        &mut self,
        resource: &mut Resource,
        level: u32,
        layers: Span,
        usage: AuxUsage,
    ) -> Result<DirtyFlags, ResolveError> {
        self.prepare_access(resource, Span::one(level), layers, usage, usage != AuxUsage::None)
    }

    /// Prepares `layers` of `level` for use as the depth buffer.
    pub fn prepare_depth(
        &mut self,
        resource: &mut Resource,
        level: u32,
        layers: Span,
    ) -> Result<DirtyFlags, ResolveError> {
        let usage = resource.aux_usage();
        self.prepare_access(resource, Span::one(level), layers, usage, true)
    }

    /// Prepares for access that bypasses compression entirely (CPU maps, raw copies).
    ///
    /// Multisample compression cannot be bypassed, so this panics for multisample resources.
    pub fn access_raw(
        &mut self,
        resource: &mut Resource,
        levels: Span,
        layers: Span,
        write: bool,
    ) -> Result<DirtyFlags, ResolveError> {
        let mut dirty = self.prepare_access(resource, levels, layers, AuxUsage::None, false)?;
        if write {
            for level in addressing::level_range(resource.surface(), levels) {
                dirty |= finish_write(resource, level, layers, AuxUsage::None);
            }
        }
        Ok(dirty)
    }

    /// Fast-clears `layers` of `level` to `color`.
    ///
    /// A resource has a single clear color.  When it changes, every other subresource still
    /// referencing the old one is resolved first.
    pub fn fast_clear(
        &mut self,
        resource: &mut Resource,
        level: u32,
        layers: Span,
        color: ClearColor,
    ) -> Result<DirtyFlags, ResolveError> {
        assert!(
            resource.level_has_aux(level),
            "fast clear of {label} level {level}, which has no aux surface there",
            label = resource.debug_label()
        );
        let cleared = addressing::layer_range(resource.surface(), level, layers);
        let mut dirty = DirtyFlags::empty();
        let previous = resource.clear_color();
        if previous != color {
            // "D" never resolves under its own usage, so force a full resolve
            let target = match resource.aux_usage() {
                AuxUsage::CcsD => AuxUsage::None,
                usage => usage,
            };
            let aux_levels: Vec<u32> = (0..resource.surface().levels)
                .filter(|l| resource.level_has_aux(*l))
                .collect();
            for other_level in aux_levels {
                for layer in 0..resource.surface().logical_layers(other_level) {
                    if other_level == level && cleared.contains(&layer) {
                        continue;
                    }
                    if !get_state(resource, other_level, layer).has_clear_color() {
                        continue;
                    }
                    dirty |= self.prepare_access(
                        resource,
                        Span::one(other_level),
                        Span::one(layer),
                        target,
                        false,
                    )?;
                }
            }
            resource.set_clear_color(color);
            dirty |= DirtyFlags::ALL_BINDINGS;
        }
        if let Err(err) = self.fast_clear_surface(resource, level, cleared.clone()) {
            resource.set_clear_color(previous);
            return Err(err);
        }
        dirty |= set_state(
            resource,
            level,
            Span::new(cleared.start, cleared.end - cleared.start),
            AuxState::Clear,
        );
        Ok(dirty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{Batch, EncodeError};
    use crate::imp::recording::{CommandLog, RecordingEncoder, RecordingEngine};
    use crate::imp::{Device, Generation};
    use crate::resolve::AuxOp;
    use crate::resource::surface::SurfaceDesc;
    use crate::resource::{AuxConfig, BufferId};

    fn setup() -> (Device, Batch, CommandLog) {
        let log = CommandLog::new();
        let device = Device::new(
            Generation::Gen12,
            Box::new(RecordingEngine::new(log.clone())),
        );
        let batch = Batch::new("test", Box::new(RecordingEncoder::new(log.clone())));
        (device, batch, log)
    }

    fn ccs_e() -> Resource {
        let surface = SurfaceDesc::texture_2d(Format::RGBA8UNorm, 64, 64, 2).with_array_len(3);
        Resource::with_aux("color", BufferId(1), surface, Some(AuxConfig::new(AuxUsage::CcsE)))
            .unwrap()
    }

    #[test]
    fn set_state_reports_changes_only() {
        let mut res = ccs_e();
        assert_eq!(
            set_state(&mut res, 0, Span::all(), AuxState::PassThrough),
            DirtyFlags::empty()
        );
        assert_eq!(
            set_state(&mut res, 0, Span::one(1), AuxState::Clear),
            DirtyFlags::ALL_BINDINGS
        );
        assert_eq!(get_state(&res, 0, 1), AuxState::Clear);
        assert_eq!(get_state(&res, 0, 0), AuxState::PassThrough);
        assert_eq!(get_state(&res, 1, 1), AuxState::PassThrough);
    }

    #[test]
    fn prepare_commits_per_subresource() {
        let (mut device, mut batch, log) = setup();
        let mut res = ccs_e();
        set_state(&mut res, 0, Span::all(), AuxState::CompressedClear);
        let dirty = device
            .resolver(&mut batch)
            .prepare_access(&mut res, Span::one(0), Span::new(0, 2), AuxUsage::None, false)
            .unwrap();
        assert_eq!(dirty, DirtyFlags::ALL_BINDINGS);
        assert_eq!(log.resolves().len(), 2);
        assert_eq!(get_state(&res, 0, 0), AuxState::PassThrough);
        assert_eq!(get_state(&res, 0, 1), AuxState::PassThrough);
        assert_eq!(get_state(&res, 0, 2), AuxState::CompressedClear);
    }

    #[test]
    fn failed_resolve_keeps_state() {
        let (mut device, mut batch, log) = setup();
        let mut res = ccs_e();
        set_state(&mut res, 0, Span::all(), AuxState::CompressedNoClear);
        //a color resolve is three commands; the second one fails at its pre-flush
        log.fail_after(3);
        let err = device
            .resolver(&mut batch)
            .prepare_access(&mut res, Span::one(0), Span::all(), AuxUsage::None, false)
            .unwrap_err();
        assert!(matches!(err, ResolveError::Resolve { .. }));
        assert_eq!(get_state(&res, 0, 0), AuxState::PassThrough);
        assert_eq!(get_state(&res, 0, 1), AuxState::CompressedNoClear);
    }

    #[test]
    #[should_panic(expected = "invalid prepare of Color aux in state AuxInvalid")]
    fn imported_color_must_be_cleared_first() {
        let (mut device, mut batch, _log) = setup();
        let surface = SurfaceDesc::texture_2d(Format::RGBA8UNorm, 16, 16, 1);
        let mut res = Resource::with_aux(
            "imported",
            BufferId(2),
            surface,
            Some(AuxConfig::new(AuxUsage::CcsE).imported()),
        )
        .unwrap();
        let _ = device
            .resolver(&mut batch)
            .prepare_access(&mut res, Span::all(), Span::all(), AuxUsage::CcsE, true);
    }

    #[test]
    fn texture_usage_drops_ccs_when_resolved() {
        let caps = DeviceCaps::for_generation(Generation::Gen12);
        let mut res = ccs_e();
        assert_eq!(texture_aux_usage(&caps, &res, Format::RGBA8UNorm), AuxUsage::None);
        set_state(&mut res, 1, Span::one(2), AuxState::CompressedNoClear);
        assert_eq!(texture_aux_usage(&caps, &res, Format::RGBA8UNorm), AuxUsage::CcsE);
        assert_eq!(texture_aux_usage(&caps, &res, Format::BGRA8UNorm), AuxUsage::CcsE);
        assert_eq!(texture_aux_usage(&caps, &res, Format::RGBA16Float), AuxUsage::None);
    }

    #[test]
    fn render_usage_choices() {
        let caps = DeviceCaps::for_generation(Generation::Gen9);
        let mut res = ccs_e();
        assert_eq!(
            render_aux_usage(&caps, &res, Format::RGBA8UNorm, false, false),
            AuxUsage::CcsE
        );
        assert_eq!(
            render_aux_usage(&caps, &res, Format::RGBA8UNorm, false, true),
            AuxUsage::None
        );
        assert_eq!(
            render_aux_usage(&caps, &res, Format::RGBA16Float, false, false),
            AuxUsage::CcsD
        );
        res.set_clear_color(ClearColor::Float([0.5, 0.0, 0.0, 1.0]));
        assert_eq!(
            render_aux_usage(&caps, &res, Format::RGBA8UNormSRGB, true, false),
            AuxUsage::None
        );
        assert_eq!(
            render_aux_usage(&caps, &res, Format::RGBA8UNormSRGB, false, false),
            AuxUsage::CcsE
        );
    }

    #[test]
    fn image_usage_needs_capability() {
        let res = ccs_e();
        let gen9 = DeviceCaps::for_generation(Generation::Gen9);
        let gen12 = DeviceCaps::for_generation(Generation::Gen12);
        assert_eq!(image_aux_usage(&gen9, &res, false), AuxUsage::None);
        assert_eq!(image_aux_usage(&gen12, &res, false), AuxUsage::CcsE);
        assert_eq!(image_aux_usage(&gen12, &res, true), AuxUsage::None);
    }

    #[test]
    fn raw_write_leaves_pass_through() {
        let (mut device, mut batch, log) = setup();
        let mut res = ccs_e();
        set_state(&mut res, 0, Span::all(), AuxState::Clear);
        device
            .resolver(&mut batch)
            .access_raw(&mut res, Span::all(), Span::all(), true)
            .unwrap();
        assert_eq!(log.resolves().len(), 3);
        assert!(res.aux().unwrap().state().iter().all(|(_, s)| s == AuxState::PassThrough));
        assert!(!has_color_unresolved(&res, Span::all(), Span::all()));
    }

    #[test]
    fn new_clear_color_resolves_old_clears() {
        let (mut device, mut batch, log) = setup();
        let mut res = ccs_e();
        let red = ClearColor::Float([1.0, 0.0, 0.0, 1.0]);
        let blue = ClearColor::Float([0.0, 0.0, 1.0, 1.0]);
        let mut resolver = device.resolver(&mut batch);
        resolver.fast_clear(&mut res, 0, Span::all(), red).unwrap();
        resolver.fast_clear(&mut res, 1, Span::one(0), red).unwrap();
        assert_eq!(log.resolves().len(), 2);
        assert!(log.resolves().iter().all(|r| r.op == AuxOp::FastClear));

        //same color: nothing else needs resolving
        resolver.fast_clear(&mut res, 1, Span::one(1), red).unwrap();
        assert_eq!(log.resolves().len(), 3);

        //new color: level 0 (3 layers) and level 1 layer 1 get partial resolves
        resolver.fast_clear(&mut res, 1, Span::one(0), blue).unwrap();
        let ops: Vec<AuxOp> = log.resolves().iter().map(|r| r.op).collect();
        assert_eq!(
            &ops[3..],
            &[
                AuxOp::PartialResolve,
                AuxOp::PartialResolve,
                AuxOp::PartialResolve,
                AuxOp::PartialResolve,
                AuxOp::FastClear
            ]
        );
        assert_eq!(get_state(&res, 0, 2), AuxState::CompressedNoClear);
        assert_eq!(get_state(&res, 1, 0), AuxState::Clear);
        assert_eq!(res.clear_color(), blue);
    }

    #[test]
    fn failed_fast_clear_restores_clear_color() {
        let (mut device, mut batch, log) = setup();
        let mut res = ccs_e();
        let red = ClearColor::Float([1.0, 0.0, 0.0, 1.0]);
        let blue = ClearColor::Float([0.0, 0.0, 1.0, 1.0]);
        let mut resolver = device.resolver(&mut batch);
        resolver.fast_clear(&mut res, 0, Span::all(), red).unwrap();

        //level 0's three partial resolves and the clear's pre-flush fit; the clear does not
        log.fail_after(10);
        let err = resolver
            .fast_clear(&mut res, 1, Span::one(0), blue)
            .unwrap_err();
        match err {
            ResolveError::Resolve {
                op, level, source, ..
            } => {
                assert_eq!(op, AuxOp::FastClear);
                assert_eq!(level, 1);
                assert_eq!(source, EncodeError::OutOfSpace);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(res.clear_color(), red);
        assert_eq!(get_state(&res, 1, 0), AuxState::PassThrough);
        //resolves encoded before the failure stay committed
        assert_eq!(get_state(&res, 0, 0), AuxState::CompressedNoClear);
        assert_eq!(get_state(&res, 0, 2), AuxState::CompressedNoClear);
    }

    #[test]
    fn depth_levels_without_hiz_are_skipped() {
        let (mut device, mut batch, log) = setup();
        let surface = SurfaceDesc::texture_2d(Format::Depth32Float, 64, 64, 2);
        let mut res = Resource::with_aux(
            "depth",
            BufferId(3),
            surface,
            Some(AuxConfig::new(AuxUsage::Hiz).with_hiz_levels(0b01)),
        )
        .unwrap();
        let dirty = device
            .resolver(&mut batch)
            .prepare_access(&mut res, Span::all(), Span::all(), AuxUsage::Hiz, true)
            .unwrap();
        assert_eq!(dirty, DirtyFlags::ALL_BINDINGS);
        assert_eq!(log.resolves().len(), 1);
        assert_eq!(log.resolves()[0].op, AuxOp::Ambiguate);
        assert_eq!(finish_write(&mut res, 1, Span::all(), AuxUsage::Hiz), DirtyFlags::empty());
        assert!(!has_depth_unresolved(&res, Span::all(), Span::all()));
        finish_depth(&mut res, 0, Span::all(), true);
        assert!(has_depth_unresolved(&res, Span::all(), Span::all()));
    }
}
