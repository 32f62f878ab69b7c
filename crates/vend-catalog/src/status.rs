//! # Publication Status State Machine
//!
//! Models the lifecycle of a catalog entry from upload through review to
//! public visibility.
//!
//! ## States
//!
//! ```text
//!                ┌────────────── retry ──────────────┐
//!                ▼                                   │
//! (upload) pending_review ──(scan fails)──▶ scan_failed
//!                │
//!                ├─(scan passes, pin fails)─▶ ipfs_pin_failed ── retry ──▶ pending_review
//!                │
//!                ├─(scan passes, pin succeeds)─▶ approved
//!                │
//!                └─(admin review)─▶ approved | rejected
//!
//! approved ──(admin reject)──▶ rejected
//! approved | rejected | failures ──(republish)──▶ pending_review
//! any ──(owner delete)──▶ archived   (terminal)
//! ```
//!
//! The automatic sub-path (`pending_review ↔ {scan_failed, ipfs_pin_failed}
//! → approved`) is driven by the publication pipeline; the manual review
//! moves are admin actions. A republish re-enters review from any
//! non-archived state. `archived` is terminal and non-reversible through
//! the pipeline.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Publication status of a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Awaiting the scan → pin pipeline or a manual review decision.
    PendingReview,
    /// The security scan rejected the archive. Retryable.
    ScanFailed,
    /// Live in the catalog.
    Approved,
    /// Rejected by a manual review decision.
    Rejected,
    /// Soft-deleted by the owner. Terminal.
    Archived,
    /// The pin-to-content-store step failed. Retryable.
    #[serde(rename = "ipfs_pin_failed")]
    PinFailed,
}

impl EntryStatus {
    /// The persisted string form of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingReview => "pending_review",
            Self::ScanFailed => "scan_failed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Archived => "archived",
            Self::PinFailed => "ipfs_pin_failed",
        }
    }

    /// Whether this status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Archived)
    }

    /// Whether the publication pipeline may be retried from this status.
    pub fn is_retryable_failure(&self) -> bool {
        matches!(self, Self::ScanFailed | Self::PinFailed)
    }

    /// Whether the transition `self → to` is legal.
    ///
    /// The table is exhaustive over both states; adding a status forces
    /// every arm to be revisited.
    pub fn can_transition(self, to: EntryStatus) -> bool {
        use EntryStatus::*;
        match (self, to) {
            // Terminal: nothing leaves archived.
            (Archived, _) => false,
            // Everything else can be archived by the owner.
            (_, Archived) => true,
            // The pipeline and manual review both act on pending entries;
            // a republish while still pending stays pending.
            (PendingReview, PendingReview | ScanFailed | PinFailed | Approved | Rejected) => true,
            // Retry or republish from the failure states.
            (ScanFailed, PendingReview) => true,
            (PinFailed, PendingReview) => true,
            // Approved entries can be rejected by an admin or re-enter
            // review through a republish.
            (Approved, PendingReview | Rejected) => true,
            // Rejected entries re-enter review only through a republish.
            (Rejected, PendingReview) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_review" => Ok(Self::PendingReview),
            "scan_failed" => Ok(Self::ScanFailed),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "archived" => Ok(Self::Archived),
            "ipfs_pin_failed" => Ok(Self::PinFailed),
            other => Err(format!("unknown entry status {other:?}")),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [EntryStatus; 6] = [
        EntryStatus::PendingReview,
        EntryStatus::ScanFailed,
        EntryStatus::Approved,
        EntryStatus::Rejected,
        EntryStatus::Archived,
        EntryStatus::PinFailed,
    ];

    #[test]
    fn string_round_trip() {
        for status in ALL {
            let parsed: EntryStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn pin_failed_uses_ipfs_string_form() {
        assert_eq!(EntryStatus::PinFailed.as_str(), "ipfs_pin_failed");
        let json = serde_json::to_string(&EntryStatus::PinFailed).unwrap();
        assert_eq!(json, "\"ipfs_pin_failed\"");
    }

    #[test]
    fn unknown_status_fails_to_parse() {
        assert!("published".parse::<EntryStatus>().is_err());
    }

    #[test]
    fn archived_is_the_only_terminal_state() {
        for status in ALL {
            assert_eq!(status.is_terminal(), status == EntryStatus::Archived);
        }
    }

    #[test]
    fn nothing_leaves_archived() {
        for to in ALL {
            assert!(!EntryStatus::Archived.can_transition(to), "{to}");
        }
    }

    #[test]
    fn everything_else_can_be_archived() {
        for from in ALL {
            if from != EntryStatus::Archived {
                assert!(from.can_transition(EntryStatus::Archived), "{from}");
            }
        }
    }

    #[test]
    fn pipeline_outcomes_from_pending_review() {
        let from = EntryStatus::PendingReview;
        assert!(from.can_transition(EntryStatus::ScanFailed));
        assert!(from.can_transition(EntryStatus::PinFailed));
        assert!(from.can_transition(EntryStatus::Approved));
    }

    #[test]
    fn retry_paths_from_failures() {
        assert!(EntryStatus::ScanFailed.can_transition(EntryStatus::PendingReview));
        assert!(EntryStatus::PinFailed.can_transition(EntryStatus::PendingReview));
    }

    #[test]
    fn failures_cannot_jump_straight_to_approved() {
        assert!(!EntryStatus::ScanFailed.can_transition(EntryStatus::Approved));
        assert!(!EntryStatus::PinFailed.can_transition(EntryStatus::Approved));
        assert!(!EntryStatus::ScanFailed.can_transition(EntryStatus::PinFailed));
    }

    #[test]
    fn admin_moves() {
        assert!(EntryStatus::PendingReview.can_transition(EntryStatus::Rejected));
        assert!(EntryStatus::Approved.can_transition(EntryStatus::Rejected));
        assert!(!EntryStatus::Rejected.can_transition(EntryStatus::Approved));
    }

    #[test]
    fn republish_reenters_review_from_decided_states() {
        assert!(EntryStatus::Approved.can_transition(EntryStatus::PendingReview));
        assert!(EntryStatus::Rejected.can_transition(EntryStatus::PendingReview));
    }

    #[test]
    fn retryable_failure_classification() {
        assert!(EntryStatus::ScanFailed.is_retryable_failure());
        assert!(EntryStatus::PinFailed.is_retryable_failure());
        assert!(!EntryStatus::PendingReview.is_retryable_failure());
        assert!(!EntryStatus::Approved.is_retryable_failure());
    }
}
