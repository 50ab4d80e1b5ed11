// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Rule table for hierarchical depth.
//!
//! Depth has two extra states compared with color: `Resolved` (main surface authoritative,
//! HiZ stale but consistent) and a meaningful `AuxInvalid` (main surface authoritative, HiZ
//! garbage).  Writing without HiZ moves `Resolved` to `AuxInvalid`; the next HiZ access must
//! ambiguate first.

use super::{Access, InvalidTransition};
use crate::resolve::AuxOp;
use crate::resource::aux_state::AuxState;
use crate::resource::aux_usage::{AuxKind, AuxUsage};

fn invalid(access: Access, state: AuxState, usage: AuxUsage) -> InvalidTransition {
    InvalidTransition {
        kind: AuxKind::Depth,
        access,
        state,
        usage,
    }
}

pub(super) fn prepare(
    state: AuxState,
    target: AuxUsage,
    fast_clear_ok: bool,
) -> Result<Option<AuxOp>, InvalidTransition> {
    let hiz = target.has_hiz();
    match state {
        AuxState::Clear | AuxState::CompressedClear => {
            if !hiz || !fast_clear_ok {
                Ok(Some(AuxOp::FullResolve))
            } else {
                Ok(None)
            }
        }
        AuxState::CompressedNoClear => Ok((!hiz).then_some(AuxOp::FullResolve)),
        AuxState::AuxInvalid => Ok(hiz.then_some(AuxOp::Ambiguate)),
        AuxState::Resolved | AuxState::PassThrough => Ok(None),
        AuxState::PartialClear => Err(invalid(Access::Prepare, state, target)),
    }
}

pub(super) fn state_after(op: AuxOp) -> AuxState {
    match op {
        AuxOp::FullResolve => AuxState::Resolved,
        AuxOp::Ambiguate => AuxState::PassThrough,
        _ => unreachable!("{op:?} is not a depth resolve"),
    }
}

pub(super) fn finish_write(
    state: AuxState,
    written_with: AuxUsage,
) -> Result<AuxState, InvalidTransition> {
    if written_with.has_hiz() {
        match state {
            AuxState::Clear => Ok(AuxState::CompressedClear),
            AuxState::CompressedClear | AuxState::CompressedNoClear => Ok(state),
            AuxState::Resolved | AuxState::PassThrough => Ok(AuxState::CompressedNoClear),
            AuxState::AuxInvalid | AuxState::PartialClear => {
                Err(invalid(Access::Write, state, written_with))
            }
        }
    } else {
        match state {
            AuxState::Resolved => Ok(AuxState::AuxInvalid),
            AuxState::PassThrough | AuxState::AuxInvalid => Ok(state),
            _ => Err(invalid(Access::Write, state, written_with)),
        }
    }
}
