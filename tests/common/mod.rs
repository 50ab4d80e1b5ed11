// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
#![allow(dead_code)]

use resolves_and_caches::batch::Batch;
use resolves_and_caches::imp::recording::{CommandLog, RecordingEncoder, RecordingEngine};
use resolves_and_caches::imp::{Device, Generation};
use resolves_and_caches::resource::surface::{Format, SurfaceDesc};
use resolves_and_caches::{AuxConfig, AuxUsage, BufferId, Context, Resource};

pub fn device(generation: Generation) -> (Device, Batch, CommandLog) {
    let log = CommandLog::new();
    let device = Device::new(generation, Box::new(RecordingEngine::new(log.clone())));
    let batch = Batch::new("test batch", Box::new(RecordingEncoder::new(log.clone())));
    (device, batch, log)
}

pub fn context(generation: Generation) -> (Context, CommandLog) {
    let (device, batch, log) = device(generation);
    (Context::new(device, batch), log)
}

/// A single-sampled 64x64 color surface.
pub fn color(label: &str, buffer: u64, format: Format, usage: AuxUsage) -> Resource {
    let surface = SurfaceDesc::texture_2d(format, 64, 64, 1);
    let aux = (usage != AuxUsage::None).then(|| AuxConfig::new(usage));
    Resource::with_aux(label, BufferId(buffer), surface, aux).unwrap()
}

pub fn with_config(label: &str, buffer: u64, surface: SurfaceDesc, config: AuxConfig) -> Resource {
    Resource::with_aux(label, BufferId(buffer), surface, Some(config)).unwrap()
}
