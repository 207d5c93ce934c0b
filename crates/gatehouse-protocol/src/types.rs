//! Core types: identity, capabilities, and backend wire shapes.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The identity value the backend uses for anonymous visitors.
pub const GUEST_SENTINEL: &str = "Guest";

/// An opaque user reference (email or user id) plus a guest flag.
///
/// Derived once from session evidence or a successful login and never
/// mutated afterwards; a new login produces a new `Identity`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    reference: String,
    is_guest: bool,
}

impl Identity {
    /// Builds an identity from a backend reference. The reference
    /// [`GUEST_SENTINEL`] yields a guest identity.
    pub fn from_reference(reference: impl Into<String>) -> Self {
        let reference = reference.into();
        let is_guest = reference == GUEST_SENTINEL;
        Self {
            reference,
            is_guest,
        }
    }

    /// The anonymous visitor.
    pub fn guest() -> Self {
        Self::from_reference(GUEST_SENTINEL)
    }

    /// The user reference, as sent to permission and profile queries.
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Returns `true` for the anonymous guest identity.
    pub fn is_guest(&self) -> bool {
        self.is_guest
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reference)
    }
}

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// A single named permission flag.
///
/// The set is closed: the backend may send other names, but only these are
/// ever consulted. Anything else is dropped when a [`PermissionSet`] is
/// decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    Login,
    DeleteInvoice,
    SubmitInvoice,
    UpdateDraft,
    UpdateSubmitted,
    ShowDrafts,
    ShowSubmitted,
}

impl Capability {
    /// Every known capability, in declaration order.
    pub const ALL: [Capability; 7] = [
        Capability::Login,
        Capability::DeleteInvoice,
        Capability::SubmitInvoice,
        Capability::UpdateDraft,
        Capability::UpdateSubmitted,
        Capability::ShowDrafts,
        Capability::ShowSubmitted,
    ];

    /// The wire name, e.g. `can_submit_invoice`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Login => "can_login",
            Self::DeleteInvoice => "can_delete_invoice",
            Self::SubmitInvoice => "can_submit_invoice",
            Self::UpdateDraft => "can_update_draft",
            Self::UpdateSubmitted => "can_update_submitted",
            Self::ShowDrafts => "can_show_drafts",
            Self::ShowSubmitted => "can_show_submitted",
        }
    }

    /// Looks up a capability by wire name. Unknown names return `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PermissionSet
// ---------------------------------------------------------------------------

/// A value in the backend's permission map. Only a JSON `true` grants a
/// capability; `1`, `"yes"` and `null` do not.
#[derive(Deserialize)]
#[serde(untagged)]
#[allow(dead_code)]
enum WireFlag {
    Bool(bool),
    Other(serde::de::IgnoredAny),
}

/// Mapping from [`Capability`] to granted/denied.
///
/// Fail-closed: a capability that is not present reads as `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    flags: BTreeMap<Capability, bool>,
}

impl PermissionSet {
    /// An empty set: every capability is denied.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether `capability` is present and granted.
    pub fn get(&self, capability: Capability) -> bool {
        self.flags.get(&capability).copied().unwrap_or(false)
    }

    /// Records a flag, replacing any previous value.
    pub fn set(&mut self, capability: Capability, granted: bool) {
        self.flags.insert(capability, granted);
    }

    /// Capabilities explicitly granted, in declaration order.
    pub fn granted(&self) -> impl Iterator<Item = Capability> + '_ {
        self.flags.iter().filter(|(_, g)| **g).map(|(c, _)| *c)
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

impl FromIterator<(Capability, bool)> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = (Capability, bool)>>(iter: I) -> Self {
        Self {
            flags: iter.into_iter().collect(),
        }
    }
}

impl<'de> Deserialize<'de> for PermissionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = HashMap::<String, WireFlag>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .filter_map(|(name, flag)| {
                let capability = Capability::from_name(&name)?;
                Some((capability, matches!(flag, WireFlag::Bool(true))))
            })
            .collect())
    }
}

impl Serialize for PermissionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.flags.iter().map(|(c, g)| (c.as_str(), *g)))
    }
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

/// Credentials posted to the login method. Field names follow the backend.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub usr: String,
    pub pwd: String,
}

/// The backend wraps every whitelisted method's return value as
/// `{ "message": ... }`.
#[derive(Debug, Clone, Deserialize)]
pub struct MethodResponse<T> {
    pub message: Option<T>,
}

/// Document reads come back as `{ "data": ... }`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceResponse<T> {
    pub data: T,
}

/// The subset of a user document the profile lookup reads.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

/// Result of a login call at the endpoint boundary.
///
/// `evidence` is the cookie-style string the backend set with the
/// response (`user_id=...; sid=...`), ready for the session parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub success: bool,
    pub message: Option<String>,
    pub evidence: String,
}

/// Preferences bootstrapped from the identity's profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub preferred_locale: Option<String>,
    pub full_name: Option<String>,
}

impl From<UserRecord> for Profile {
    fn from(record: UserRecord) -> Self {
        Self {
            preferred_locale: record.language.filter(|l| !l.is_empty()),
            full_name: record.full_name,
        }
    }
}
