//! Capability profiles and enforcement.

use crate::{Capability, CapabilityRequest, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// An immutable set of granted capabilities.
///
/// A capability is either fully granted or fully denied. Profiles are
/// attached to an engine at construction and never change afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilityProfile {
    granted: BTreeSet<Capability>,
}

/// On-disk form of a profile.
///
/// ```toml
/// [capabilities]
/// grant = ["file_read", "network_connect"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub capabilities: GrantRules,
}

/// Capabilities listed in a profile file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrantRules {
    #[serde(default)]
    pub grant: Vec<Capability>,
}

/// Result of a capability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl CapabilityProfile {
    /// The default profile: nothing granted.
    pub fn restricted() -> Self {
        Self::default()
    }

    /// Every capability granted.
    pub fn unrestricted() -> Self {
        Self::from_capabilities(Capability::ALL)
    }

    /// Build a profile from an explicit list of grants.
    pub fn from_capabilities(caps: impl IntoIterator<Item = Capability>) -> Self {
        Self {
            granted: caps.into_iter().collect(),
        }
    }

    /// Load a profile from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse a profile from a TOML string.
    pub fn parse(toml: &str) -> Result<Self> {
        let config: ProfileConfig = toml::from_str(toml).map_err(|e| Error::Parse(e.to_string()))?;
        Ok(config.into())
    }

    pub fn grants(&self, capability: Capability) -> bool {
        self.granted.contains(&capability)
    }

    pub fn is_restricted(&self) -> bool {
        self.granted.is_empty()
    }

    /// Granted capabilities in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.granted.iter().copied()
    }

    /// Check if a capability request is allowed.
    pub fn check(&self, request: &CapabilityRequest) -> Decision {
        if self.grants(request.kind) {
            return Decision::Allow;
        }
        Decision::Deny {
            reason: format!(
                "{} not granted{}",
                request.kind,
                request
                    .scope
                    .as_ref()
                    .map(|s| format!(" (scope: {s})"))
                    .unwrap_or_default()
            ),
        }
    }
}

impl From<ProfileConfig> for CapabilityProfile {
    fn from(config: ProfileConfig) -> Self {
        Self::from_capabilities(config.capabilities.grant)
    }
}

impl From<&CapabilityProfile> for ProfileConfig {
    fn from(profile: &CapabilityProfile) -> Self {
        Self {
            capabilities: GrantRules {
                grant: profile.iter().collect(),
            },
        }
    }
}
