// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
mod common;

use resolves_and_caches::aux;
use resolves_and_caches::batch::{EncodeError, PipeControl};
use resolves_and_caches::draw::{Framebuffer, SamplerView, Stage, SurfaceBinding};
use resolves_and_caches::imp::Generation;
use resolves_and_caches::imp::recording::Recorded;
use resolves_and_caches::resource::addressing::Span;
use resolves_and_caches::resource::surface::{Format, SurfaceDesc};
use resolves_and_caches::{AuxConfig, AuxOp, AuxState, AuxUsage, ClearColor, ResolveError};

const GREY: ClearColor = ClearColor::Float([0.25, 0.5, 0.75, 1.0]);

#[test]
fn imported_surface_cleared_then_sampled_through_compatible_view() {
    let (mut ctx, log) = common::context(Generation::Gen12);
    let surface = SurfaceDesc::texture_2d(Format::RGBA8UNorm, 64, 64, 1);
    let id = ctx.insert_resource(common::with_config(
        "scene",
        1,
        surface,
        AuxConfig::new(AuxUsage::CcsE).imported(),
    ));
    assert_eq!(aux::get_state(ctx.resource(id).unwrap(), 0, 0), AuxState::AuxInvalid);

    ctx.fast_clear(id, 0, Span::all(), GREY).unwrap();
    assert_eq!(aux::get_state(ctx.resource(id).unwrap(), 0, 0), AuxState::Clear);

    //a different but compatible format cannot decode the clear color
    ctx.state_mut()
        .bind_sampler_view(Stage::Fragment, 0, Some(SamplerView::new(id, Format::BGRA8UNorm)));
    ctx.draw(|_| Ok(())).unwrap();

    let ops: Vec<AuxOp> = log.resolves().iter().map(|r| r.op).collect();
    assert_eq!(ops, vec![AuxOp::FastClear, AuxOp::PartialResolve]);
    assert_eq!(
        aux::get_state(ctx.resource(id).unwrap(), 0, 0),
        AuxState::CompressedNoClear
    );

    let partial = &log.resolves()[1];
    assert_eq!(partial.view.format, Format::RGBA8UNorm);
    assert_eq!(partial.view.aux_usage, AuxUsage::CcsE);
    assert_eq!(partial.view.clear_color, GREY);
    assert_eq!(partial.layers, 0..1);

    let commands = log.commands();
    let n = commands.len();
    assert_eq!(
        commands[n - 3],
        Recorded::EndOfPipeSync {
            bits: PipeControl::RENDER_TARGET_FLUSH,
            reason: "color resolve: pre-flush"
        }
    );
    assert!(matches!(commands[n - 2], Recorded::Resolve(_)));
    assert_eq!(
        commands[n - 1],
        Recorded::EndOfPipeSync {
            bits: PipeControl::RENDER_TARGET_FLUSH,
            reason: "color resolve: post-flush"
        }
    );

    //nothing is dirty any more: the next draw does no work
    ctx.draw(|_| Ok(())).unwrap();
    assert_eq!(log.len(), n);
}

#[test]
fn same_format_sampling_keeps_the_clear() {
    let (mut ctx, log) = common::context(Generation::Gen12);
    let id = ctx.insert_resource(common::color("t", 1, Format::RGBA8UNorm, AuxUsage::CcsE));
    ctx.fast_clear(id, 0, Span::all(), GREY).unwrap();
    ctx.state_mut()
        .bind_sampler_view(Stage::Vertex, 0, Some(SamplerView::new(id, Format::RGBA8UNorm)));
    ctx.draw(|_| Ok(())).unwrap();
    assert_eq!(log.resolves().len(), 1);
    assert_eq!(aux::get_state(ctx.resource(id).unwrap(), 0, 0), AuxState::Clear);
}

#[test]
fn rendered_then_sampled() {
    let (mut ctx, log) = common::context(Generation::Gen12);
    let id = ctx.insert_resource(common::color("rt", 1, Format::RGBA8UNorm, AuxUsage::CcsE));
    ctx.state_mut().set_framebuffer(Framebuffer {
        colors: vec![SurfaceBinding::new(id, Format::RGBA8UNorm, 0)],
        ..Default::default()
    });
    ctx.draw(|_| Ok(())).unwrap();
    assert_eq!(ctx.state().draw_aux_usage(0), AuxUsage::CcsE);
    assert_eq!(
        aux::get_state(ctx.resource(id).unwrap(), 0, 0),
        AuxState::CompressedNoClear
    );
    assert!(log.resolves().is_empty());

    //sampling what was just rendered needs the render cache flushed, not a resolve
    ctx.state_mut().set_framebuffer(Framebuffer::default());
    ctx.state_mut()
        .bind_sampler_view(Stage::Fragment, 0, Some(SamplerView::new(id, Format::RGBA8UNorm)));
    ctx.draw(|_| Ok(())).unwrap();
    assert!(log.resolves().is_empty());
    assert_eq!(log.cache_tracker_flushes(), 1);

    //an incompatible view forces the data out of compression
    ctx.state_mut()
        .bind_sampler_view(Stage::Fragment, 0, Some(SamplerView::new(id, Format::RGBA16Float)));
    ctx.draw(|_| Ok(())).unwrap();
    let ops: Vec<AuxOp> = log.resolves().iter().map(|r| r.op).collect();
    assert_eq!(ops, vec![AuxOp::FullResolve]);
    assert_eq!(aux::get_state(ctx.resource(id).unwrap(), 0, 0), AuxState::PassThrough);
    assert_eq!(log.cache_tracker_flushes(), 1);
}

#[test]
fn cpu_write_resolves_fully() {
    let (mut ctx, log) = common::context(Generation::Gen12);
    let id = ctx.insert_resource(common::color("mapped", 1, Format::RGBA8UNorm, AuxUsage::CcsE));
    ctx.fast_clear(id, 0, Span::all(), GREY).unwrap();
    ctx.map(id, Span::all(), Span::all(), true).unwrap();
    let ops: Vec<AuxOp> = log.resolves().iter().map(|r| r.op).collect();
    assert_eq!(ops, vec![AuxOp::FastClear, AuxOp::FullResolve]);
    let res = ctx.resource(id).unwrap();
    assert_eq!(aux::get_state(res, 0, 0), AuxState::PassThrough);
    assert!(!aux::has_color_unresolved(res, Span::all(), Span::all()));
}

#[test]
fn d_compression_resolves_only_for_sampling() {
    let (mut ctx, log) = common::context(Generation::Gen9);
    let id = ctx.insert_resource(common::color("d", 1, Format::RGBA8UNorm, AuxUsage::CcsD));
    ctx.fast_clear(id, 0, Span::all(), GREY).unwrap();
    ctx.state_mut().set_framebuffer(Framebuffer {
        colors: vec![SurfaceBinding::new(id, Format::RGBA8UNorm, 0)],
        ..Default::default()
    });
    ctx.draw(|_| Ok(())).unwrap();
    assert_eq!(ctx.state().draw_aux_usage(0), AuxUsage::CcsD);
    assert_eq!(aux::get_state(ctx.resource(id).unwrap(), 0, 0), AuxState::PartialClear);
    assert_eq!(log.resolves().len(), 1);

    ctx.state_mut().set_framebuffer(Framebuffer::default());
    ctx.state_mut()
        .bind_sampler_view(Stage::Fragment, 0, Some(SamplerView::new(id, Format::RGBA8UNorm)));
    ctx.draw(|_| Ok(())).unwrap();
    assert_eq!(log.resolves()[1].op, AuxOp::FullResolve);
    assert_eq!(aux::get_state(ctx.resource(id).unwrap(), 0, 0), AuxState::PassThrough);
}

#[test]
fn srgb_blend_with_arbitrary_clear_color_renders_uncompressed() {
    let (mut ctx, log) = common::context(Generation::Gen9);
    let id = ctx.insert_resource(common::color("srgb", 1, Format::RGBA8UNormSRGB, AuxUsage::CcsE));
    ctx.fast_clear(id, 0, Span::all(), GREY).unwrap();
    ctx.state_mut().set_framebuffer(Framebuffer {
        colors: vec![SurfaceBinding::new(id, Format::RGBA8UNormSRGB, 0)],
        ..Default::default()
    });
    ctx.state_mut().set_blend_enabled(0b1);
    ctx.draw(|_| Ok(())).unwrap();

    assert_eq!(ctx.state().draw_aux_usage(0), AuxUsage::None);
    let resolves = log.resolves();
    assert_eq!(resolves[1].op, AuxOp::FullResolve);
    assert_eq!(resolves[1].view.format, Format::RGBA8UNorm);
    assert_eq!(aux::get_state(ctx.resource(id).unwrap(), 0, 0), AuxState::PassThrough);
}

#[test]
fn encode_failure_stops_midway() {
    let (mut ctx, log) = common::context(Generation::Gen12);
    let surface = SurfaceDesc::texture_2d(Format::RGBA8UNorm, 64, 64, 1).with_array_len(2);
    let id = ctx.insert_resource(common::with_config(
        "layers",
        1,
        surface,
        AuxConfig::new(AuxUsage::CcsE),
    ));
    ctx.fast_clear(id, 0, Span::all(), GREY).unwrap();
    ctx.state_mut()
        .bind_sampler_view(Stage::Fragment, 0, Some(SamplerView::new(id, Format::BGRA8UNorm)));

    //the first layer's partial resolve is three commands
    log.fail_after(3);
    let err = ctx.predraw().unwrap_err();
    match err {
        ResolveError::Resolve {
            op, level, source, ..
        } => {
            assert_eq!(op, AuxOp::PartialResolve);
            assert_eq!(level, 0);
            assert_eq!(source, EncodeError::OutOfSpace);
        }
        other => panic!("unexpected {other:?}"),
    }
    let res = ctx.resource(id).unwrap();
    assert_eq!(aux::get_state(res, 0, 0), AuxState::CompressedNoClear);
    assert_eq!(aux::get_state(res, 0, 1), AuxState::Clear);
}
