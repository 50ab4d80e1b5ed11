// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
mod common;

use resolves_and_caches::aux;
use resolves_and_caches::batch::PipeControl;
use resolves_and_caches::draw::{Framebuffer, SamplerView, Stage, SurfaceBinding};
use resolves_and_caches::imp::Generation;
use resolves_and_caches::resource::addressing::Span;
use resolves_and_caches::resource::surface::{Format, SurfaceDesc};
use resolves_and_caches::{
    AuxConfig, AuxOp, AuxState, AuxUsage, BufferId, ClearColor, Context, CreateError, Resource,
    ResourceId,
};

fn msaa_surface() -> SurfaceDesc {
    SurfaceDesc::texture_2d(Format::RGBA8UNorm, 64, 64, 1).with_samples(4)
}

fn msaa(ctx: &mut Context) -> ResourceId {
    ctx.insert_resource(common::with_config(
        "msaa",
        5,
        msaa_surface(),
        AuxConfig::new(AuxUsage::Mcs),
    ))
}

fn sample(ctx: &mut Context, id: ResourceId) {
    ctx.state_mut()
        .bind_sampler_view(Stage::Fragment, 0, Some(SamplerView::new(id, Format::RGBA8UNorm)));
    ctx.draw(|_| Ok(())).unwrap();
}

#[test]
fn starts_clear() {
    let (mut ctx, _log) = common::context(Generation::Gen9);
    let id = msaa(&mut ctx);
    assert_eq!(aux::get_state(ctx.resource(id).unwrap(), 0, 0), AuxState::Clear);
    assert!(aux::has_color_unresolved(
        ctx.resource(id).unwrap(),
        Span::all(),
        Span::all()
    ));
}

#[test]
fn sampling_arbitrary_clear_color_without_hardware_support() {
    let (mut ctx, log) = common::context(Generation::Gen8);
    let id = msaa(&mut ctx);

    //the initial clear is to zero, which every sampler decodes
    sample(&mut ctx, id);
    assert!(log.resolves().is_empty());

    ctx.fast_clear(id, 0, Span::all(), ClearColor::Float([0.5, 0.5, 0.5, 1.0]))
        .unwrap();
    sample(&mut ctx, id);
    let resolves = log.resolves();
    let ops: Vec<AuxOp> = resolves.iter().map(|r| r.op).collect();
    assert_eq!(ops, vec![AuxOp::FastClear, AuxOp::PartialResolve]);
    assert_eq!(resolves[1].view.samples, 4);
    assert!(
        log.barriers()
            .contains(&(PipeControl::RENDER_TARGET_FLUSH, "mcs partial resolve: pre-flush"))
    );
    assert_eq!(
        aux::get_state(ctx.resource(id).unwrap(), 0, 0),
        AuxState::CompressedNoClear
    );
}

#[test]
fn sampling_arbitrary_clear_color_with_hardware_support() {
    let (mut ctx, log) = common::context(Generation::Gen9);
    let id = msaa(&mut ctx);
    ctx.fast_clear(id, 0, Span::all(), ClearColor::Float([0.5, 0.5, 0.5, 1.0]))
        .unwrap();
    sample(&mut ctx, id);
    assert_eq!(log.resolves().len(), 1);
    assert_eq!(aux::get_state(ctx.resource(id).unwrap(), 0, 0), AuxState::Clear);
}

#[test]
fn rendering_compresses() {
    let (mut ctx, log) = common::context(Generation::Gen9);
    let id = msaa(&mut ctx);
    ctx.state_mut().set_framebuffer(Framebuffer {
        colors: vec![SurfaceBinding::new(id, Format::RGBA8UNorm, 0)],
        ..Default::default()
    });
    ctx.draw(|_| Ok(())).unwrap();
    assert_eq!(ctx.state().draw_aux_usage(0), AuxUsage::Mcs);
    assert_eq!(
        aux::get_state(ctx.resource(id).unwrap(), 0, 0),
        AuxState::CompressedClear
    );
    assert!(log.resolves().is_empty());
}

#[test]
#[should_panic(expected = "invalid prepare of Multisample aux")]
fn multisample_compression_cannot_be_bypassed() {
    let (mut ctx, _log) = common::context(Generation::Gen12);
    let id = msaa(&mut ctx);
    let _ = ctx.map(id, Span::all(), Span::all(), false);
}

#[test]
fn multisample_compression_cannot_be_imported() {
    let err = Resource::with_aux(
        "imported",
        BufferId(5),
        msaa_surface(),
        Some(AuxConfig::new(AuxUsage::Mcs).imported()),
    )
    .unwrap_err();
    assert_eq!(err, CreateError::ImportedMultisample);
}
