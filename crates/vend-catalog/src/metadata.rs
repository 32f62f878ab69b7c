//! # Presentation Metadata and Mutation DTOs
//!
//! Typed metadata carried by a catalog entry, plus the three mutation
//! payloads the pipeline accepts: a creation draft, a version submission,
//! and a field patch.
//!
//! Read-only fields (id, owner, timestamps, download count, rating) do not
//! appear on [`EntryPatch`], so stripping them from client input is a
//! type-level guarantee rather than a runtime filter.

use std::collections::BTreeSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use vend_core::Version;

/// Licensing terms offered with a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicensingTerms {
    /// One end product per purchase.
    SingleUse,
    /// Multiple end products, single purchaser.
    MultiUse,
    /// Unlimited end products, single purchaser.
    Unlimited,
}

impl LicensingTerms {
    /// The persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleUse => "single_use",
            Self::MultiUse => "multi_use",
            Self::Unlimited => "unlimited",
        }
    }
}

impl FromStr for LicensingTerms {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_use" => Ok(Self::SingleUse),
            "multi_use" => Ok(Self::MultiUse),
            "unlimited" => Ok(Self::Unlimited),
            other => Err(format!("unknown licensing terms {other:?}")),
        }
    }
}

/// Which buyers can download a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTier {
    /// Downloadable by any signed-in user.
    Free,
    /// One-off purchase required.
    Paid,
    /// Included with an active subscription.
    Subscriber,
}

impl AccessTier {
    /// The persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Paid => "paid",
            Self::Subscriber => "subscriber",
        }
    }
}

impl FromStr for AccessTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Self::Free),
            "paid" => Ok(Self::Paid),
            "subscriber" => Ok(Self::Subscriber),
            other => Err(format!("unknown access tier {other:?}")),
        }
    }
}

/// Draft metadata for a brand-new entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntry {
    /// Display title; also the source of the slug.
    pub title: String,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub tech_stack: BTreeSet<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub licensing: LicensingTerms,
    pub access_tier: AccessTier,
    #[serde(default)]
    pub price_usd: Option<u32>,
    /// Explicit starting version; defaults to `1.0.0`.
    #[serde(default)]
    pub version_number: Option<Version>,
    /// Source repository linkage, when the entry is created from an
    /// installed source-host app.
    #[serde(default)]
    pub repo_owner: Option<String>,
    #[serde(default)]
    pub repo_name: Option<String>,
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

/// Payload for publishing a new version of an existing entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionSubmission {
    /// Explicit next version. Must strictly exceed the current version;
    /// absent means an automatic patch bump.
    #[serde(default)]
    pub version_number: Option<Version>,
    /// Changelog recorded on the superseded version's history entry.
    #[serde(default)]
    pub changelog: Option<String>,
    /// Metadata updates applied together with the release.
    #[serde(default)]
    pub metadata: EntryPatch,
}

/// Partial update of the mutable metadata fields.
///
/// `None` leaves a field unchanged. Fields the catalog owns (identity,
/// ownership, counters, timestamps) are absent by construction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default)]
    pub tech_stack: Option<BTreeSet<String>>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub licensing: Option<LicensingTerms>,
    #[serde(default)]
    pub access_tier: Option<AccessTier>,
    #[serde(default)]
    pub price_usd: Option<u32>,
    #[serde(default)]
    pub repo_owner: Option<String>,
    #[serde(default)]
    pub repo_name: Option<String>,
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

impl EntryPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.tagline.is_none()
            && self.description.is_none()
            && self.features.is_none()
            && self.tech_stack.is_none()
            && self.category.is_none()
            && self.licensing.is_none()
            && self.access_tier.is_none()
            && self.price_usd.is_none()
            && self.repo_owner.is_none()
            && self.repo_name.is_none()
            && self.webhook_secret.is_none()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn licensing_round_trip() {
        for terms in [
            LicensingTerms::SingleUse,
            LicensingTerms::MultiUse,
            LicensingTerms::Unlimited,
        ] {
            assert_eq!(terms.as_str().parse::<LicensingTerms>().unwrap(), terms);
        }
    }

    #[test]
    fn access_tier_round_trip() {
        for tier in [AccessTier::Free, AccessTier::Paid, AccessTier::Subscriber] {
            assert_eq!(tier.as_str().parse::<AccessTier>().unwrap(), tier);
        }
    }

    #[test]
    fn unknown_enum_strings_fail() {
        assert!("gpl".parse::<LicensingTerms>().is_err());
        assert!("vip".parse::<AccessTier>().is_err());
    }

    #[test]
    fn empty_patch_is_empty() {
        assert!(EntryPatch::default().is_empty());
        let patch = EntryPatch {
            tagline: Some("new".to_string()),
            ..EntryPatch::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn new_entry_deserializes_with_defaults() {
        let draft: NewEntry = serde_json::from_str(
            r#"{"title": "Kit", "licensing": "single_use", "access_tier": "paid"}"#,
        )
        .unwrap();
        assert_eq!(draft.title, "Kit");
        assert!(draft.version_number.is_none());
        assert!(draft.features.is_empty());
    }

    #[test]
    fn version_submission_accepts_explicit_version() {
        let sub: VersionSubmission =
            serde_json::from_str(r#"{"version_number": "2.0.0", "changelog": "Big rewrite"}"#)
                .unwrap();
        assert_eq!(sub.version_number.unwrap().to_string(), "2.0.0");
        assert_eq!(sub.changelog.as_deref(), Some("Big rewrite"));
    }
}
