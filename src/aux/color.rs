// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Rule table for single-sampled color compression.
//!
//! A "D" resource only ever compresses fast clears, so anything it holds besides clear blocks
//! is already in the main surface.  An "E" resource compresses real data too, and a consumer
//! that does not understand "E" needs a full resolve.

use super::{Access, InvalidTransition};
use crate::resolve::AuxOp;
use crate::resource::aux_state::AuxState;
use crate::resource::aux_usage::{AuxKind, AuxUsage};

fn invalid(access: Access, state: AuxState, usage: AuxUsage) -> InvalidTransition {
    InvalidTransition {
        kind: AuxKind::Color,
        access,
        state,
        usage,
    }
}

/// The operation needed before accessing a subresource of a resource whose active usage is
/// `active` with `target`.
pub(super) fn prepare(
    active: AuxUsage,
    state: AuxState,
    target: AuxUsage,
    fast_clear_ok: bool,
) -> Result<Option<AuxOp>, InvalidTransition> {
    if !matches!(target, AuxUsage::None | AuxUsage::CcsD | AuxUsage::CcsE) {
        return Err(invalid(Access::Prepare, state, target));
    }
    match (active, state) {
        (_, AuxState::PassThrough) => Ok(None),
        (AuxUsage::CcsD, AuxState::Clear | AuxState::PartialClear) => {
            if target.has_ccs() {
                Ok(None)
            } else {
                Ok(Some(AuxOp::FullResolve))
            }
        }
        (AuxUsage::CcsE, AuxState::Clear | AuxState::PartialClear) => {
            if fast_clear_ok {
                Ok(None)
            } else if target.has_ccs_e() {
                Ok(Some(AuxOp::PartialResolve))
            } else {
                Ok(Some(AuxOp::FullResolve))
            }
        }
        (AuxUsage::CcsE, AuxState::CompressedClear) => {
            if !target.has_ccs_e() {
                Ok(Some(AuxOp::FullResolve))
            } else if !fast_clear_ok {
                Ok(Some(AuxOp::PartialResolve))
            } else {
                Ok(None)
            }
        }
        (AuxUsage::CcsE, AuxState::CompressedNoClear) => {
            if !target.has_ccs_e() {
                Ok(Some(AuxOp::FullResolve))
            } else {
                Ok(None)
            }
        }
        _ => Err(invalid(Access::Prepare, state, target)),
    }
}

/// The state a resolve leaves behind.
pub(super) fn state_after(op: AuxOp) -> AuxState {
    match op {
        AuxOp::FullResolve => AuxState::PassThrough,
        AuxOp::PartialResolve => AuxState::CompressedNoClear,
        AuxOp::Ambiguate | AuxOp::FastClear => unreachable!("{op:?} is not a color resolve"),
    }
}

/// The state after writing a subresource with `written_with`.
pub(super) fn finish_write(
    active: AuxUsage,
    state: AuxState,
    written_with: AuxUsage,
) -> Result<AuxState, InvalidTransition> {
    let err = || invalid(Access::Write, state, written_with);
    match active {
        AuxUsage::CcsE => match (state, written_with) {
            (AuxState::Clear | AuxState::PartialClear, AuxUsage::CcsE) => {
                Ok(AuxState::CompressedClear)
            }
            (AuxState::Clear | AuxState::PartialClear, AuxUsage::CcsD) => {
                Ok(AuxState::PartialClear)
            }
            (AuxState::CompressedClear | AuxState::CompressedNoClear, AuxUsage::CcsE) => Ok(state),
            (AuxState::PassThrough, AuxUsage::CcsE) => Ok(AuxState::CompressedNoClear),
            (AuxState::PassThrough, AuxUsage::CcsD | AuxUsage::None) => Ok(state),
            _ => Err(err()),
        },
        AuxUsage::CcsD => match (state, written_with) {
            (AuxState::Clear, AuxUsage::CcsD) => Ok(AuxState::PartialClear),
            (AuxState::PartialClear, AuxUsage::CcsD | AuxUsage::None) => Ok(state),
            (AuxState::PassThrough, AuxUsage::CcsD | AuxUsage::None) => Ok(state),
            _ => Err(err()),
        },
        _ => Err(err()),
    }
}
