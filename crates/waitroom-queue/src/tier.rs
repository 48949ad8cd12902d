//! Queue tiers and the permission policy that assigns them.

use std::fmt;
use waitroom_core::Client;

/// Priority class of a queued client.
///
/// Tiers are scanned in declaration order: every `Bypass` entry precedes every
/// `Priority` entry, which precedes every `Normal` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Tier {
    /// Skips ahead of everyone else.
    Bypass,
    /// Ahead of normal clients.
    Priority,
    /// Default tier.
    Normal,
}

impl Tier {
    /// All tiers in scan order.
    pub const ALL: [Tier; 3] = [Tier::Bypass, Tier::Priority, Tier::Normal];

    pub(crate) fn index(self) -> usize {
        match self {
            Tier::Bypass => 0,
            Tier::Priority => 1,
            Tier::Normal => 2,
        }
    }

    /// Returns the lowercase tier name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Bypass => "bypass",
            Tier::Priority => "priority",
            Tier::Normal => "normal",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a client's permissions to the tier it joins a destination's queue in.
///
/// With the default prefix `queue`, a client holding `queue.bypass` or
/// `queue.bypass.<destination>` lands in [`Tier::Bypass`]; `queue.priority`
/// or `queue.priority.<destination>` gives [`Tier::Priority`]. The destination
/// suffix is always lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TierPolicy {
    prefix: String,
}

impl TierPolicy {
    /// Creates a policy with the default `queue` prefix.
    pub fn new() -> Self {
        Self::with_prefix("queue")
    }

    /// Creates a policy checking permissions under a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the permission prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Resolves the tier for a client joining the destination's queue.
    pub fn resolve(&self, client: &dyn Client, destination: &str) -> Tier {
        let destination = destination.to_lowercase();

        if self.holds(client, "bypass", &destination) {
            Tier::Bypass
        } else if self.holds(client, "priority", &destination) {
            Tier::Priority
        } else {
            Tier::Normal
        }
    }

    fn holds(&self, client: &dyn Client, node: &str, destination: &str) -> bool {
        client.has_permission(&format!("{}.{node}", self.prefix))
            || client.has_permission(&format!("{}.{node}.{destination}", self.prefix))
    }
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self::new()
    }
}
