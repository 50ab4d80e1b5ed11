// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Compression modes ("aux usages") and the sets of them a resource may use.

use bitflags::bitflags;

/// The interpretation an access places on a resource's auxiliary surface.
///
/// A resource is allocated with one *active* usage, which fixes its [`AuxKind`].  Individual
/// accesses may request a weaker usage of the same family (or [`AuxUsage::None`]) when the
/// consumer cannot handle the active one; the state machine then resolves as needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuxUsage {
    /// Access the main surface directly; the aux surface is ignored.
    #[default]
    None,
    /// Color compression without arbitrary clear colors ("D").  Only fast clears are
    /// compressed; the sampler cannot read it.
    CcsD,
    /// Lossless color compression with fast clears ("E").
    CcsE,
    /// Multisample compression.
    Mcs,
    /// Multisample compression with an "E" color-compression layer on top.
    McsCcs,
    /// Hierarchical depth.
    Hiz,
    /// Hierarchical depth with an "E" color-compression layer on top.
    HizCcs,
}

/// Families of auxiliary surface.  Each has its own rule table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuxKind {
    Color,
    Multisample,
    Depth,
}

impl AuxUsage {
    pub const fn bit(self) -> AuxUsages {
        match self {
            AuxUsage::None => AuxUsages::NONE,
            AuxUsage::CcsD => AuxUsages::CCS_D,
            AuxUsage::CcsE => AuxUsages::CCS_E,
            AuxUsage::Mcs => AuxUsages::MCS,
            AuxUsage::McsCcs => AuxUsages::MCS_CCS,
            AuxUsage::Hiz => AuxUsages::HIZ,
            AuxUsage::HizCcs => AuxUsages::HIZ_CCS,
        }
    }

    /// The family this usage belongs to, or `None` for [`AuxUsage::None`].
    pub const fn kind(self) -> Option<AuxKind> {
        match self {
            AuxUsage::None => None,
            AuxUsage::CcsD | AuxUsage::CcsE => Some(AuxKind::Color),
            AuxUsage::Mcs | AuxUsage::McsCcs => Some(AuxKind::Multisample),
            AuxUsage::Hiz | AuxUsage::HizCcs => Some(AuxKind::Depth),
        }
    }

    pub const fn has_ccs(self) -> bool {
        matches!(
            self,
            AuxUsage::CcsD | AuxUsage::CcsE | AuxUsage::McsCcs | AuxUsage::HizCcs
        )
    }

    /// Whether the usage carries "E" color-compression semantics, either directly or as the
    /// secondary layer under MCS/HiZ.
    pub const fn has_ccs_e(self) -> bool {
        matches!(self, AuxUsage::CcsE | AuxUsage::McsCcs | AuxUsage::HizCcs)
    }

    pub const fn has_mcs(self) -> bool {
        matches!(self, AuxUsage::Mcs | AuxUsage::McsCcs)
    }

    pub const fn has_hiz(self) -> bool {
        matches!(self, AuxUsage::Hiz | AuxUsage::HizCcs)
    }
}

bitflags! {
    /// A set of [`AuxUsage`]s, used for the allocator's "possible" and "sampler" sets.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct AuxUsages: u8 {
        const NONE = 1 << 0;
        const CCS_D = 1 << 1;
        const CCS_E = 1 << 2;
        const MCS = 1 << 3;
        const MCS_CCS = 1 << 4;
        const HIZ = 1 << 5;
        const HIZ_CCS = 1 << 6;
    }
}

impl AuxUsages {
    pub fn contains_usage(self, usage: AuxUsage) -> bool {
        self.contains(usage.bit())
    }

    /// The usages an allocator typically allows for a resource whose active usage is `active`.
    pub fn default_possible(active: AuxUsage) -> AuxUsages {
        match active {
            AuxUsage::None => AuxUsages::NONE,
            AuxUsage::CcsD => AuxUsages::NONE | AuxUsages::CCS_D,
            AuxUsage::CcsE => AuxUsages::NONE | AuxUsages::CCS_D | AuxUsages::CCS_E,
            // multisampled surfaces are never accessed without their MCS
            AuxUsage::Mcs => AuxUsages::MCS,
            AuxUsage::McsCcs => AuxUsages::MCS | AuxUsages::MCS_CCS,
            AuxUsage::Hiz => AuxUsages::NONE | AuxUsages::HIZ,
            AuxUsage::HizCcs => AuxUsages::NONE | AuxUsages::HIZ | AuxUsages::HIZ_CCS,
        }
    }

    /// The usages a texture unit can typically read for a resource whose active usage is
    /// `active`.  Depth compression is opt-in per resource, so it is not included.
    pub fn default_sampler(active: AuxUsage) -> AuxUsages {
        match active {
            AuxUsage::CcsE => AuxUsages::NONE | AuxUsages::CCS_E,
            AuxUsage::Mcs => AuxUsages::MCS,
            AuxUsage::McsCcs => AuxUsages::MCS_CCS,
            _ => AuxUsages::NONE,
        }
    }
}
