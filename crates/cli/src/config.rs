//! Configuration loading from aether.toml.

use policy::{CapabilityProfile, GrantRules};
use runtime::{Engine, EngineOptions, Limits};
use serde::Deserialize;
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Granted capabilities. Absent means every capability.
    pub capabilities: Option<GrantRules>,

    #[serde(default)]
    pub limits: Limits,

    #[serde(default)]
    pub engine: EngineOptions,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// The profile a script run from the command line gets.
    ///
    /// `restricted` wins over the file; otherwise the file's grants apply,
    /// and without a `[capabilities]` table everything is granted.
    pub fn profile(&self, restricted: bool) -> CapabilityProfile {
        if restricted {
            return CapabilityProfile::restricted();
        }
        match &self.capabilities {
            Some(rules) => CapabilityProfile::from_capabilities(rules.grant.iter().copied()),
            None => CapabilityProfile::unrestricted(),
        }
    }

    /// Like [`Config::profile`], but a profile file given on the command
    /// line replaces the `[capabilities]` table. `restricted` still wins.
    pub fn resolve_profile(
        &self,
        restricted: bool,
        profile_file: Option<&Path>,
    ) -> policy::Result<CapabilityProfile> {
        match profile_file {
            Some(path) if !restricted => CapabilityProfile::load(path),
            _ => Ok(self.profile(restricted)),
        }
    }

    /// An engine with this file's limits and options and the given profile.
    pub fn engine(&self, profile: CapabilityProfile) -> Engine {
        Engine::builder()
            .profile(profile)
            .limits(self.limits)
            .options(self.engine)
            .build()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use policy::Capability;
    use runtime::BindingPolicy;

    #[test]
    fn test_empty_config_grants_everything() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.profile(false), CapabilityProfile::unrestricted());
        assert!(config.profile(true).is_restricted());
        assert_eq!(config.limits, Limits::default());
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
[capabilities]
grant = ["file_read", "file_write"]

[limits]
max_steps = 1000000
max_call_depth = 50

[engine]
bindings = "per_call"
optimize = false
"#,
        )
        .unwrap();

        let profile = config.profile(false);
        assert!(profile.grants(Capability::FileRead));
        assert!(profile.grants(Capability::FileWrite));
        assert!(!profile.grants(Capability::ProcessSpawn));
        assert_eq!(config.limits.max_steps, Some(1_000_000));
        assert_eq!(config.limits.max_call_depth, Some(50));
        assert_eq!(config.engine.bindings, BindingPolicy::PerCall);
        assert!(!config.engine.optimize);

        let engine = config.engine(config.profile(false));
        assert_eq!(engine.limits().max_call_depth, Some(50));
    }

    #[test]
    fn test_empty_grant_list_is_restricted() {
        let config = Config::parse("[capabilities]\ngrant = []").unwrap();
        assert!(config.profile(false).is_restricted());
    }

    #[test]
    fn test_unknown_capability_is_rejected() {
        let err = Config::parse("[capabilities]\ngrant = [\"root\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_profile_file_replaces_config_grants() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("profile.toml");
        std::fs::write(&path, "[capabilities]\ngrant = [\"network_connect\"]").unwrap();
        let config = Config::parse("[capabilities]\ngrant = [\"file_read\"]").unwrap();

        let profile = config.resolve_profile(false, Some(&path)).unwrap();
        assert!(profile.grants(Capability::NetworkConnect));
        assert!(!profile.grants(Capability::FileRead));

        assert!(config.resolve_profile(true, Some(&path)).unwrap().is_restricted());
        assert!(config.resolve_profile(false, None).unwrap().grants(Capability::FileRead));
        assert!(config.resolve_profile(false, Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("aether.toml");
        std::fs::write(&path, "[limits]\nmax_steps = 10").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.limits.max_steps, Some(10));

        let missing = Config::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io(_)));
    }
}
