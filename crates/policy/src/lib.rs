//! Capability profiles for the Aether engine.
//!
//! Core principle: **All side effects require an explicit capability.**
//!
//! A [`CapabilityProfile`] is attached to an engine when it is created and
//! consulted by every privileged primitive before it acts. There is no
//! ambient or global permission state, so engines with different profiles
//! coexist safely in one process.

mod capability;
mod error;
mod profile;

pub use capability::{Capability, CapabilityRequest};
pub use error::{Error, Result};
pub use profile::{CapabilityProfile, Decision, GrantRules, ProfileConfig};
