//! Switch-link protocol types.
//!
//! A link couples a source switch to a remote target: the source stores a
//! [`LinkAddress`] per target, and every edge of the source's ACTIVE flag
//! produces a [`LinkRequest`] that the service routes to the addressed
//! device. The target side answers with a [`RequestResult`] that doubles
//! as the status text shown by the linking tool.
//!
//! Mode gating is a pure function ([`RelayMode::gate`]) so the full
//! decision table is testable without any device or world in scope.

use serde::{Deserialize, Serialize};

use crate::pos::BlockPos;

/// Opaque handle of the player that initiated a request, if any.
/// Requests carrying an actor bypass device-to-device gating rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u64);

/// How a link target interprets incoming edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayMode {
    /// Target follows the source state (rising edge activates, falling
    /// edge deactivates).
    #[default]
    State,
    /// Target mirrors the complemented source state.
    StateInverted,
    /// Only rising edges are delivered.
    Activate,
    /// Only falling edges are delivered.
    Deactivate,
    /// Every edge, rising or falling, toggles the target.
    Toggle,
}

/// The edge a source reports: its ACTIVE flag went up or down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    Activate,
    Deactivate,
}

/// Action a gated request asks the target's activation handler to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchAction {
    Activate,
    Deactivate,
    Toggle,
}

impl RelayMode {
    /// Decides what (if anything) an incoming edge does to the target.
    ///
    /// `None` means the edge is consumed without touching the target
    /// (resolution reports [`RequestResult::NotMatched`]). Pulse targets
    /// never receive a deactivation: their on-timer is the only thing
    /// that ends a pulse.
    pub fn gate(
        self,
        kind: RequestKind,
        target_active: bool,
        target_is_pulse: bool,
    ) -> Option<SwitchAction> {
        let action = match (self, kind) {
            (RelayMode::State, RequestKind::Activate) => {
                (!target_active).then_some(SwitchAction::Activate)
            }
            (RelayMode::State, RequestKind::Deactivate) => {
                target_active.then_some(SwitchAction::Deactivate)
            }
            // The inverted mirror: gate on the complemented activity and
            // deliver the complemented edge.
            (RelayMode::StateInverted, RequestKind::Activate) => {
                target_active.then_some(SwitchAction::Deactivate)
            }
            (RelayMode::StateInverted, RequestKind::Deactivate) => {
                (!target_active).then_some(SwitchAction::Activate)
            }
            (RelayMode::Activate, RequestKind::Activate) => Some(SwitchAction::Activate),
            (RelayMode::Activate, RequestKind::Deactivate) => None,
            (RelayMode::Deactivate, RequestKind::Deactivate) => Some(SwitchAction::Deactivate),
            (RelayMode::Deactivate, RequestKind::Activate) => None,
            (RelayMode::Toggle, _) => Some(SwitchAction::Toggle),
        }?;
        if target_is_pulse && action == SwitchAction::Deactivate {
            return None;
        }
        Some(action)
    }
}

/// Persisted record of one link target, stored on the source device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkAddress {
    /// Target position.
    pub pos: BlockPos,
    /// Registry name of the block expected at `pos`, recorded at link
    /// time so a replaced block is detected as unavailable.
    pub block: String,
    #[serde(default)]
    pub mode: RelayMode,
}

impl LinkAddress {
    pub fn new(pos: BlockPos, block: impl Into<String>, mode: RelayMode) -> Self {
        Self {
            pos,
            block: block.into(),
            mode,
        }
    }

    /// A usable address names a block and a position. The origin doubles
    /// as the "never written" sentinel, mirroring the default record.
    pub fn is_valid(&self) -> bool {
        !self.block.is_empty() && self.pos != BlockPos::ORIGIN
    }
}

/// One in-flight edge delivery from a source to a single target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkRequest {
    pub kind: RequestKind,
    /// Position of the originating source device.
    pub source: BlockPos,
    /// Player behind the edge, if one triggered it directly.
    pub actor: Option<ActorId>,
}

impl LinkRequest {
    pub fn device(kind: RequestKind, source: BlockPos) -> Self {
        Self {
            kind,
            source,
            actor: None,
        }
    }

    pub fn player(kind: RequestKind, source: BlockPos, actor: ActorId) -> Self {
        Self {
            kind,
            source,
            actor: Some(actor),
        }
    }
}

/// Outcome of resolving one request, ordered by severity of the failure.
/// The `Display` text is what the linking-tool overlay shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestResult {
    /// Delivered and the target changed state (or re-armed its pulse).
    Ok,
    /// Delivered, but mode gating or the target's handler dropped it.
    NotMatched,
    /// The stored address itself is unusable.
    InvalidLinkData,
    /// Target is beyond the configured link range.
    TooFar,
    /// No linkable device at the address, or the block was replaced.
    TargetUnavailable,
    /// Links are disabled for this world.
    Rejected,
}

impl RequestResult {
    pub const fn is_ok(self) -> bool {
        matches!(self, RequestResult::Ok)
    }
}

impl core::fmt::Display for RequestResult {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            RequestResult::Ok => "link request applied",
            RequestResult::NotMatched => "link request not matched",
            RequestResult::InvalidLinkData => "invalid link data",
            RequestResult::TooFar => "link target too far away",
            RequestResult::TargetUnavailable => "link target unavailable",
            RequestResult::Rejected => "switch linking disabled",
        };
        write!(f, "{}", text)
    }
}
