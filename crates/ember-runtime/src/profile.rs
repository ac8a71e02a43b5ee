//! Host-editable composition profiles.
//!
//! A profile is the on-disk half of the builder configuration: phase
//! selection, category opt-ins, and name exclusions. Manual appends and
//! descriptor exclusions need live references, so they stay in code.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::builder::RuntimeBuilder;
use crate::phase::Phase;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionProfile {
    /// Request all three phases and their built-in categories.
    pub defaults: bool,
    /// Phases to request.
    pub phases: Vec<Phase>,
    /// Categories whose members become candidates for automatic inclusion.
    pub include_categories: Vec<String>,
    /// Exact system names excluded from automatic inclusion.
    pub exclude_names: Vec<String>,
}

impl CompositionProfile {
    /// Load a profile from disk, or return defaults if missing or invalid.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            info!(?path, "no composition profile found, using defaults");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match Self::from_toml(&content) {
                Ok(profile) => {
                    info!(?path, "loaded composition profile");
                    profile
                }
                Err(e) => {
                    warn!(?path, error = %e, "failed to parse composition profile, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(?path, error = %e, "failed to read composition profile, using defaults");
                Self::default()
            }
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Layer this profile on top of a builder's current configuration.
    pub fn apply<'a>(&self, mut builder: RuntimeBuilder<'a>) -> RuntimeBuilder<'a> {
        if self.defaults {
            builder = builder.select_all_defaults();
        }
        for &phase in &self.phases {
            builder = builder.select_phase(phase);
        }
        for category in &self.include_categories {
            builder = builder.include_category(category.clone());
        }
        for name in &self.exclude_names {
            builder = builder.exclude_name(name.clone());
        }
        builder
    }
}

#[cfg(test)]
mod tests {
    use ember_ecs::TickContext;

    use crate::catalog::{Catalog, CatalogEntry};

    use super::*;

    fn noop(_: &mut TickContext) {}

    #[test]
    fn parse_full_profile() {
        let profile = CompositionProfile::from_toml(
            r#"
            phases = ["simulate", "present"]
            include_categories = ["game.ai"]
            exclude_names = ["debug::overlay"]
            "#,
        )
        .unwrap();

        assert!(!profile.defaults);
        assert_eq!(profile.phases, vec![Phase::Simulate, Phase::Present]);
        assert_eq!(profile.include_categories, vec!["game.ai"]);
        assert_eq!(profile.exclude_names, vec!["debug::overlay"]);
    }

    #[test]
    fn missing_fields_default() {
        let profile = CompositionProfile::from_toml("defaults = true").unwrap();
        assert!(profile.defaults);
        assert!(profile.phases.is_empty());
        assert!(profile.include_categories.is_empty());
    }

    #[test]
    fn invalid_toml_is_rejected() {
        assert!(CompositionProfile::from_toml("phases = [\"warmup\"]").is_err());
    }

    #[test]
    fn profile_drives_the_builder() {
        let mut catalog = Catalog::new();
        catalog
            .register(CatalogEntry::unmanaged("ai::plan", "game.ai", noop).in_phase(Phase::Simulate))
            .register(
                CatalogEntry::unmanaged("ai::chatter", "game.ai", noop).in_phase(Phase::Simulate),
            );

        let profile = CompositionProfile::from_toml(
            r#"
            phases = ["simulate"]
            include_categories = ["game.ai"]
            exclude_names = ["ai::chatter"]
            "#,
        )
        .unwrap();

        let runtime = profile.apply(RuntimeBuilder::new(&catalog)).build().unwrap();
        assert_eq!(runtime.phases().collect::<Vec<_>>(), vec![Phase::Simulate]);
        assert_eq!(
            runtime
                .group(Phase::Simulate)
                .unwrap()
                .names()
                .collect::<Vec<_>>(),
            vec!["ai::plan"]
        );
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let profile = CompositionProfile::load(Path::new("/nonexistent/composition.toml"));
        assert!(!profile.defaults);
        assert!(profile.phases.is_empty());
    }
}
