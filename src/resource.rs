// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Resources and their auxiliary surfaces.
//!
//! A [`Resource`] is what the allocator produced: a main surface, the identity of the GPU
//! buffer backing it, and optionally one auxiliary surface ([`AuxSurface`]).  The aux surface
//! carries everything the state machine in [`crate::aux`] needs: which usages are possible at
//! all, which of those a texture unit can read, the active usage, which levels have depth
//! compression, the current fast-clear color, and the per-subresource [`AuxStateStore`].
//!
//! Everything except the state store and the clear color is fixed at construction.
//!
//! Resources live in a [`ResourceTable`] owned by the recording context and are referred to
//! by [`ResourceId`] from draw-time bindings.

pub mod addressing;
pub mod aux_state;
pub mod aux_usage;
pub mod surface;

use crate::resource::aux_state::{AuxState, AuxStateStore, Subresource};
use crate::resource::aux_usage::{AuxKind, AuxUsage, AuxUsages};
use crate::resource::surface::{SurfaceDesc, Target};
use std::collections::HashMap;

/// Identity of a GPU buffer object.
///
/// Several resources may alias one buffer (for example two views created by importing the
/// same memory), and cache tracking is per buffer, not per resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u64);

/// Handle to a resource in a [`ResourceTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(u32);

/// The value fast-cleared blocks decode to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearColor {
    Float([f32; 4]),
    UInt([u32; 4]),
}

impl Default for ClearColor {
    fn default() -> Self {
        ClearColor::Float([0.0; 4])
    }
}

impl ClearColor {
    /// Whether every channel is exactly 0 or 1.
    ///
    /// Such colors decode identically regardless of format, which some hardware paths depend
    /// on.
    pub fn is_zero_one(&self) -> bool {
        match self {
            ClearColor::Float(c) => c.iter().all(|v| *v == 0.0 || *v == 1.0),
            ClearColor::UInt(c) => c.iter().all(|v| *v == 0 || *v == 1),
        }
    }
}

/// What the allocator decided about a resource's auxiliary surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuxConfig {
    /// The active usage.  Determines the aux kind.
    pub usage: AuxUsage,
    /// Every usage the resource could legally be accessed with.
    pub possible: AuxUsages,
    /// The subset of `possible` that a texture unit can read.
    pub sampler: AuxUsages,
    /// Bit `n` set when level `n` has depth compression.  Ignored for other kinds.
    pub hiz_levels: u32,
    /// The memory came from outside and was not zero-initialized by us.
    pub imported: bool,
}

impl AuxConfig {
    /// Config with the allocator's default possible/sampler sets for `usage`.
    pub fn new(usage: AuxUsage) -> Self {
        AuxConfig {
            usage,
            possible: AuxUsages::default_possible(usage),
            sampler: AuxUsages::default_sampler(usage),
            hiz_levels: u32::MAX,
            imported: false,
        }
    }

    pub fn with_possible(mut self, possible: AuxUsages) -> Self {
        self.possible = possible;
        self
    }

    pub fn with_sampler(mut self, sampler: AuxUsages) -> Self {
        self.sampler = sampler;
        self
    }

    pub fn with_hiz_levels(mut self, mask: u32) -> Self {
        self.hiz_levels = mask;
        self
    }

    pub fn imported(mut self) -> Self {
        self.imported = true;
        self
    }

    /// The state a freshly created aux surface of this config starts in.
    fn initial_state(&self) -> AuxState {
        match self.usage.kind() {
            // zeroed CCS decodes as "look at the main surface"
            Some(AuxKind::Color) if !self.imported => AuxState::PassThrough,
            Some(AuxKind::Color) => AuxState::AuxInvalid,
            // MCS memory is initialized to the all-samples-clear encoding
            Some(AuxKind::Multisample) => AuxState::Clear,
            Some(AuxKind::Depth) | None => AuxState::AuxInvalid,
        }
    }
}

/// The auxiliary side of a resource.
#[derive(Debug, Clone)]
pub struct AuxSurface {
    usage: AuxUsage,
    kind: AuxKind,
    possible: AuxUsages,
    sampler: AuxUsages,
    hiz_levels: u32,
    clear_color: ClearColor,
    state: AuxStateStore,
}

impl AuxSurface {
    pub fn usage(&self) -> AuxUsage {
        self.usage
    }
    pub fn kind(&self) -> AuxKind {
        self.kind
    }
    pub fn possible_usages(&self) -> AuxUsages {
        self.possible
    }
    pub fn sampler_usages(&self) -> AuxUsages {
        self.sampler
    }
    pub fn clear_color(&self) -> ClearColor {
        self.clear_color
    }
    pub fn state(&self) -> &AuxStateStore {
        &self.state
    }
}

/// A GPU image (or buffer) as seen by the resolve machinery.
#[derive(Debug, Clone)]
pub struct Resource {
    debug_label: String,
    buffer: BufferId,
    surface: SurfaceDesc,
    aux: Option<AuxSurface>,
}

/// Reasons the allocator's description of a resource is rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum CreateError {
    #[error("surface has an empty extent")]
    EmptySurface,
    #[error("aux config with no aux usage")]
    NoAuxUsage,
    #[error("active usage {0:?} is not among the possible usages")]
    UsageNotPossible(AuxUsage),
    #[error("sampler usages {sampler:?} are not a subset of possible usages {possible:?}")]
    SamplerNotPossible {
        sampler: AuxUsages,
        possible: AuxUsages,
    },
    #[error("possible usages {0:?} mix compression families")]
    MixedKinds(AuxUsages),
    #[error("aux usage {usage:?} does not fit a {samples}x {target:?} surface")]
    KindMismatch {
        usage: AuxUsage,
        target: Target,
        samples: u32,
    },
    #[error("multisample compression cannot be imported")]
    ImportedMultisample,
    #[error("no level of the surface has depth compression")]
    NoHizLevels,
}

impl Resource {
    /// Creates a resource without an auxiliary surface.
    pub fn new(
        debug_label: impl Into<String>,
        buffer: BufferId,
        surface: SurfaceDesc,
    ) -> Result<Self, CreateError> {
        Self::with_aux(debug_label, buffer, surface, None)
    }

    /// Creates a resource, validating the allocator's aux decisions and seeding the state
    /// store.
    pub fn with_aux(
        debug_label: impl Into<String>,
        buffer: BufferId,
        surface: SurfaceDesc,
        aux: Option<AuxConfig>,
    ) -> Result<Self, CreateError> {
        if surface.width == 0
            || surface.height == 0
            || surface.depth == 0
            || surface.levels == 0
            || surface.array_len == 0
            || surface.samples == 0
        {
            return Err(CreateError::EmptySurface);
        }
        let debug_label = debug_label.into();
        let aux = match aux {
            None => None,
            Some(config) => Some(Self::build_aux(&surface, config)?),
        };
        logwise::info_sync!(
            "created resource {label} with aux {usage}",
            label = debug_label.clone(),
            usage = logwise::privacy::LogIt(&aux.as_ref().map(|a| a.usage))
        );
        Ok(Resource {
            debug_label,
            buffer,
            surface,
            aux,
        })
    }

    fn build_aux(surface: &SurfaceDesc, config: AuxConfig) -> Result<AuxSurface, CreateError> {
        let kind = config.usage.kind().ok_or(CreateError::NoAuxUsage)?;
        if !config.possible.contains_usage(config.usage) {
            return Err(CreateError::UsageNotPossible(config.usage));
        }
        if !config.possible.contains(config.sampler) {
            return Err(CreateError::SamplerNotPossible {
                sampler: config.sampler,
                possible: config.possible,
            });
        }
        let mixed = config
            .possible
            .iter()
            .filter_map(|bit| usage_for_bit(bit).kind())
            .any(|k| k != kind);
        if mixed {
            return Err(CreateError::MixedKinds(config.possible));
        }
        let fits = surface.target != Target::Buffer
            && match kind {
                AuxKind::Color => surface.format.is_color() && !surface.is_multisampled(),
                AuxKind::Multisample => surface.is_multisampled() && surface.levels == 1,
                AuxKind::Depth => surface.format.is_depth(),
            };
        if !fits {
            return Err(CreateError::KindMismatch {
                usage: config.usage,
                target: surface.target,
                samples: surface.samples,
            });
        }
        if kind == AuxKind::Multisample && config.imported {
            return Err(CreateError::ImportedMultisample);
        }
        let hiz_levels = if kind == AuxKind::Depth {
            let mask = config.hiz_levels & level_mask(surface.levels);
            if mask == 0 {
                return Err(CreateError::NoHizLevels);
            }
            mask
        } else {
            0
        };
        let state = AuxStateStore::new(
            (0..surface.levels).map(|level| surface.logical_layers(level)),
            config.initial_state(),
        );
        Ok(AuxSurface {
            usage: config.usage,
            kind,
            possible: config.possible,
            sampler: config.sampler,
            hiz_levels,
            clear_color: ClearColor::default(),
            state,
        })
    }

    pub fn debug_label(&self) -> &str {
        &self.debug_label
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    pub fn surface(&self) -> &SurfaceDesc {
        &self.surface
    }

    pub fn aux(&self) -> Option<&AuxSurface> {
        self.aux.as_ref()
    }

    /// The active usage, or [`AuxUsage::None`] without an aux surface.
    pub fn aux_usage(&self) -> AuxUsage {
        self.aux.as_ref().map_or(AuxUsage::None, |a| a.usage)
    }

    pub fn aux_kind(&self) -> Option<AuxKind> {
        self.aux.as_ref().map(|a| a.kind)
    }

    pub fn possible_usages(&self) -> AuxUsages {
        self.aux.as_ref().map_or(AuxUsages::NONE, |a| a.possible)
    }

    pub fn sampler_usages(&self) -> AuxUsages {
        self.aux.as_ref().map_or(AuxUsages::NONE, |a| a.sampler)
    }

    pub fn clear_color(&self) -> ClearColor {
        self.aux
            .as_ref()
            .map_or_else(ClearColor::default, |a| a.clear_color)
    }

    /// Stores a new clear color, returning whether it differed from the old one.
    pub(crate) fn set_clear_color(&mut self, color: ClearColor) -> bool {
        match self.aux.as_mut() {
            Some(aux) if aux.clear_color != color => {
                aux.clear_color = color;
                true
            }
            _ => false,
        }
    }

    /// Whether `level` has depth compression.
    pub fn level_has_hiz(&self, level: u32) -> bool {
        match &self.aux {
            Some(aux) if aux.kind == AuxKind::Depth => {
                level < 32 && aux.hiz_levels & (1 << level) != 0
            }
            _ => false,
        }
    }

    /// Whether the aux surface describes `level` at all.
    pub fn level_has_aux(&self, level: u32) -> bool {
        match self.aux_kind() {
            None => false,
            Some(AuxKind::Color) => level < self.surface.levels,
            Some(AuxKind::Multisample) => level == 0,
            Some(AuxKind::Depth) => self.level_has_hiz(level),
        }
    }

    fn checked_aux(&self, key: Subresource) {
        assert!(
            self.level_has_aux(key.level),
            "{label} has no aux surface at level {level}",
            label = self.debug_label,
            level = key.level
        );
        addressing::check_level_layer(&self.surface, key.level, key.layer);
    }

    /// Reads one subresource's state.
    ///
    /// # Panics
    ///
    /// Panics if the resource has no aux surface covering `key.level`.
    pub fn aux_state(&self, key: Subresource) -> AuxState {
        self.checked_aux(key);
        match &self.aux {
            Some(aux) => aux.state.get(key),
            None => unreachable!(),
        }
    }

    /// Overwrites one subresource's state, returning whether it changed.
    pub(crate) fn set_aux_state(&mut self, key: Subresource, state: AuxState) -> bool {
        self.checked_aux(key);
        match &mut self.aux {
            Some(aux) => aux.state.set(key, state),
            None => unreachable!(),
        }
    }
}

fn usage_for_bit(bit: AuxUsages) -> AuxUsage {
    [
        AuxUsage::None,
        AuxUsage::CcsD,
        AuxUsage::CcsE,
        AuxUsage::Mcs,
        AuxUsage::McsCcs,
        AuxUsage::Hiz,
        AuxUsage::HizCcs,
    ]
    .into_iter()
    .find(|u| u.bit() == bit)
    .unwrap_or(AuxUsage::None)
}

fn level_mask(levels: u32) -> u32 {
    if levels >= 32 {
        u32::MAX
    } else {
        (1u32 << levels) - 1
    }
}

/// The resources known to one recording context.
#[derive(Debug, Default)]
pub struct ResourceTable {
    next: u32,
    resources: HashMap<ResourceId, Resource>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, resource: Resource) -> ResourceId {
        let id = ResourceId(self.next);
        self.next += 1;
        self.resources.insert(id, resource);
        id
    }

    pub fn remove(&mut self, id: ResourceId) -> Option<Resource> {
        self.resources.remove(&id)
    }

    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(&id)
    }

    pub fn get_mut(&mut self, id: ResourceId) -> Option<&mut Resource> {
        self.resources.get_mut(&id)
    }

    /// Looks up a resource referenced by a binding.
    ///
    /// # Panics
    ///
    /// Bindings must not outlive the resources they name.
    pub(crate) fn expect(&self, id: ResourceId) -> &Resource {
        self.resources
            .get(&id)
            .unwrap_or_else(|| panic!("binding references freed resource {id:?}"))
    }

    pub(crate) fn expect_mut(&mut self, id: ResourceId) -> &mut Resource {
        self.resources
            .get_mut(&id)
            .unwrap_or_else(|| panic!("binding references freed resource {id:?}"))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}
