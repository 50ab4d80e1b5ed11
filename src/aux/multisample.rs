// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Rule table for multisample compression.
//!
//! Multisampled surfaces are never accessed without their MCS, so the only question is
//! whether the consumer can cope with fast-clear blocks.

use super::{Access, InvalidTransition};
use crate::resolve::AuxOp;
use crate::resource::aux_state::AuxState;
use crate::resource::aux_usage::{AuxKind, AuxUsage};

fn invalid(access: Access, state: AuxState, usage: AuxUsage) -> InvalidTransition {
    InvalidTransition {
        kind: AuxKind::Multisample,
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
    if !target.has_mcs() {
        return Err(invalid(Access::Prepare, state, target));
    }
    match state {
        AuxState::Clear | AuxState::CompressedClear if !fast_clear_ok => {
            Ok(Some(AuxOp::PartialResolve))
        }
        AuxState::Clear | AuxState::CompressedClear | AuxState::CompressedNoClear => Ok(None),
        _ => Err(invalid(Access::Prepare, state, target)),
    }
}

pub(super) fn state_after(op: AuxOp) -> AuxState {
    match op {
        AuxOp::PartialResolve => AuxState::CompressedNoClear,
        _ => unreachable!("{op:?} is not a multisample resolve"),
    }
}

pub(super) fn finish_write(
    state: AuxState,
    written_with: AuxUsage,
) -> Result<AuxState, InvalidTransition> {
    if !written_with.has_mcs() {
        return Err(invalid(Access::Write, state, written_with));
    }
    match state {
        AuxState::Clear => Ok(AuxState::CompressedClear),
        AuxState::CompressedClear | AuxState::CompressedNoClear => Ok(state),
        _ => Err(invalid(Access::Write, state, written_with)),
    }
}
