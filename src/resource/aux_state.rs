// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Per-subresource auxiliary state.
//!
//! Every (level, layer) pair of a resource with an aux surface carries one [`AuxState`]
//! describing what the aux surface currently says about the main surface.  The states are
//! stored in an [`AuxStateStore`], a flat table with one entry per logical layer of every
//! level.  Levels may have different layer counts (3D surfaces shrink in depth), so the table
//! keeps a per-level offset computed once at construction; after that every lookup is a bounds
//! check and an add.
//!
//! The store is only mutated by the state machine in [`crate::aux`].

use std::fmt::{Debug, Formatter};

/// What the aux surface says about one subresource.
///
/// Which of these are legal depends on the resource's [`super::aux_usage::AuxKind`]; see the
/// rule tables in [`crate::aux`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuxState {
    /// The aux surface holds garbage and must not be consulted.
    AuxInvalid,
    /// The aux surface is present but says "look at the main surface"; either path reads the
    /// same data.
    PassThrough,
    /// The whole subresource holds the fast-clear color, which has not been written to the
    /// main surface.
    Clear,
    /// Some blocks hold the fast-clear color; others were rendered without compression.
    PartialClear,
    /// Compressed data, some of which may still be the fast-clear color.
    CompressedClear,
    /// Compressed data with no fast-clear blocks.
    CompressedNoClear,
    /// Depth only: the main surface is authoritative and the aux surface is stale but
    /// consistent.
    Resolved,
}

impl AuxState {
    /// Whether some blocks may still reference the fast-clear color.
    pub const fn has_clear_color(self) -> bool {
        matches!(
            self,
            AuxState::Clear | AuxState::PartialClear | AuxState::CompressedClear
        )
    }
}

/// Address of one subresource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subresource {
    pub level: u32,
    pub layer: u32,
}

impl Subresource {
    pub const fn new(level: u32, layer: u32) -> Self {
        Subresource { level, layer }
    }
}

/// Owned table of [`AuxState`], one entry per logical layer of each level.
#[derive(Clone, PartialEq, Eq)]
pub struct AuxStateStore {
    /// Linear index of layer 0 of each level, plus one trailing entry holding the total.
    level_offsets: Box<[usize]>,
    states: Box<[AuxState]>,
}

impl AuxStateStore {
    /// Creates a store with `layers_per_level[level]` entries for each level, all set to
    /// `initial`.
    pub(crate) fn new(layers_per_level: impl IntoIterator<Item = u32>, initial: AuxState) -> Self {
        let mut level_offsets = vec![0usize];
        let mut total = 0usize;
        for layers in layers_per_level {
            assert!(layers > 0, "every level needs at least one layer");
            total += layers as usize;
            level_offsets.push(total);
        }
        assert!(level_offsets.len() > 1, "aux state store needs at least one level");
        AuxStateStore {
            level_offsets: level_offsets.into_boxed_slice(),
            states: vec![initial; total].into_boxed_slice(),
        }
    }

    pub fn levels(&self) -> u32 {
        (self.level_offsets.len() - 1) as u32
    }

    pub fn layers(&self, level: u32) -> u32 {
        assert!(
            level < self.levels(),
            "level {level} out of range (resource has {levels})",
            levels = self.levels()
        );
        let l = level as usize;
        (self.level_offsets[l + 1] - self.level_offsets[l]) as u32
    }

    /// Total number of subresources tracked.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn index_of(&self, key: Subresource) -> usize {
        let layers = self.layers(key.level);
        assert!(
            key.layer < layers,
            "layer {layer} out of range (level {level} has {layers})",
            layer = key.layer,
            level = key.level
        );
        self.level_offsets[key.level as usize] + key.layer as usize
    }

    pub fn get(&self, key: Subresource) -> AuxState {
        self.states[self.index_of(key)]
    }

    /// Writes `state`, returning whether the stored value changed.
    pub(crate) fn set(&mut self, key: Subresource, state: AuxState) -> bool {
        let index = self.index_of(key);
        let slot = &mut self.states[index];
        if *slot == state {
            false
        } else {
            *slot = state;
            true
        }
    }

    /// Every subresource in level-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Subresource, AuxState)> + '_ {
        (0..self.levels()).flat_map(move |level| {
            (0..self.layers(level)).map(move |layer| {
                let key = Subresource::new(level, layer);
                (key, self.get(key))
            })
        })
    }
}

impl Debug for AuxStateStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut list = f.debug_list();
        for level in 0..self.levels() {
            let start = self.level_offsets[level as usize];
            let end = self.level_offsets[level as usize + 1];
            list.entry(&&self.states[start..end]);
        }
        list.finish()
    }
}
