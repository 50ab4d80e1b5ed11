// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Dirty tracking for draw-time state.

Surface descriptors that the binding layer uploads for a draw are derived from aux state, so
any aux state change invalidates them.  Rather than flip bits in a shared mask, the state
machine returns the groups it invalidated and the caller merges them into its own
[`DirtyFlags`].
*/

use bitflags::bitflags;

bitflags! {
    /// Groups of draw-time state that must be re-derived before the next draw.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u32 {
        const BINDINGS_VS = 1 << 0;
        const BINDINGS_TCS = 1 << 1;
        const BINDINGS_TES = 1 << 2;
        const BINDINGS_GS = 1 << 3;
        const BINDINGS_FS = 1 << 4;
        const BINDINGS_CS = 1 << 5;
        const CONSTANTS_VS = 1 << 6;
        const CONSTANTS_TCS = 1 << 7;
        const CONSTANTS_TES = 1 << 8;
        const CONSTANTS_GS = 1 << 9;
        const CONSTANTS_FS = 1 << 10;
        const CONSTANTS_CS = 1 << 11;
        const DEPTH_BUFFER = 1 << 12;
        const BLEND_STATE = 1 << 13;
        const WM_DEPTH_STENCIL = 1 << 14;

        const ALL_BINDINGS = Self::BINDINGS_VS.bits()
            | Self::BINDINGS_TCS.bits()
            | Self::BINDINGS_TES.bits()
            | Self::BINDINGS_GS.bits()
            | Self::BINDINGS_FS.bits()
            | Self::BINDINGS_CS.bits();
    }
}

impl DirtyFlags {
    /// `ALL_BINDINGS` when `changed`, empty otherwise.
    pub(crate) fn bindings_if(changed: bool) -> DirtyFlags {
        if changed {
            DirtyFlags::ALL_BINDINGS
        } else {
            DirtyFlags::empty()
        }
    }
}
