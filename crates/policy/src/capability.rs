use serde::{Deserialize, Serialize};
use std::fmt;

/// Privileged effects a script may be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    FileRead,
    FileWrite,
    NetworkConnect,
    ProcessSpawn,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Capability; 4] = [
        Capability::FileRead,
        Capability::FileWrite,
        Capability::NetworkConnect,
        Capability::ProcessSpawn,
    ];

    /// Stable name used in error text.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::FileRead => "FileRead",
            Capability::FileWrite => "FileWrite",
            Capability::NetworkConnect => "NetworkConnect",
            Capability::ProcessSpawn => "ProcessSpawn",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A capability request with optional scope.
///
/// The scope never widens or narrows a grant; it only makes denials
/// easier to diagnose.
#[derive(Debug, Clone)]
pub struct CapabilityRequest {
    pub kind: Capability,
    pub scope: Option<String>, // e.g., path, url, command
}

impl CapabilityRequest {
    pub fn new(kind: Capability) -> Self {
        Self { kind, scope: None }
    }

    pub fn with_scope(kind: Capability, scope: impl Into<String>) -> Self {
        Self {
            kind,
            scope: Some(scope.into()),
        }
    }
}
