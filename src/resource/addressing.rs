// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Subresource addressing.
//!
//! Accesses name a contiguous run of levels and a contiguous run of layers.  Either run may
//! use the [`REMAINING`] count, meaning "from `start` to the end of the resource"; this is
//! the only case where a range is clamped.  Anything else that falls outside the resource is
//! a caller bug and asserts.

use crate::resource::surface::SurfaceDesc;
use std::ops::Range;

/// Sentinel count meaning "every remaining level/layer after the start".
pub const REMAINING: u32 = u32::MAX;
/// [`REMAINING`] when counting levels.
pub const REMAINING_LEVELS: u32 = REMAINING;
/// [`REMAINING`] when counting layers.
pub const REMAINING_LAYERS: u32 = REMAINING;

/// A contiguous run of levels or layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: u32,
    /// Number of entries, or [`REMAINING`].
    pub count: u32,
}

impl Span {
    pub const fn new(start: u32, count: u32) -> Self {
        Span { start, count }
    }

    /// Exactly one entry.
    pub const fn one(index: u32) -> Self {
        Span { start: index, count: 1 }
    }

    /// Everything.
    pub const fn all() -> Self {
        Span {
            start: 0,
            count: REMAINING,
        }
    }

    /// Everything from `start` on.
    pub const fn from(start: u32) -> Self {
        Span {
            start,
            count: REMAINING,
        }
    }

    /// Resolves the span against `available` entries.
    ///
    /// # Panics
    ///
    /// Panics when `start` is out of range, or when an explicit count runs past the end.
    pub fn resolve(self, available: u32, what: &str) -> Range<u32> {
        assert!(
            self.start < available,
            "{what} {start} out of range ({available} available)",
            start = self.start
        );
        let count = if self.count == REMAINING {
            available - self.start
        } else {
            self.count
        };
        let end = self
            .start
            .checked_add(count)
            .unwrap_or_else(|| panic!("{what} range overflows"));
        assert!(
            end <= available,
            "{what} range {start}..{end} out of range ({available} available)",
            start = self.start
        );
        self.start..end
    }
}

/// Levels covered by `levels` on `surface`.
pub fn level_range(surface: &SurfaceDesc, levels: Span) -> Range<u32> {
    levels.resolve(surface.levels, "level")
}

/// Layers covered by `layers` at `level` of `surface`.
pub fn layer_range(surface: &SurfaceDesc, level: u32, layers: Span) -> Range<u32> {
    assert!(
        level < surface.levels,
        "level {level} out of range ({available} available)",
        available = surface.levels
    );
    layers.resolve(surface.logical_layers(level), "layer")
}

/// Asserts that (`level`, `layer`) addresses a subresource of `surface`.
pub fn check_level_layer(surface: &SurfaceDesc, level: u32, layer: u32) {
    assert!(
        level < surface.levels,
        "level {level} out of range ({available} available)",
        available = surface.levels
    );
    assert!(
        layer < surface.logical_layers(level),
        "layer {layer} out of range at level {level} ({available} available)",
        available = surface.logical_layers(level)
    );
}
