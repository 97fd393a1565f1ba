use crate::core::decomposition::DEFAULT_LEAF_SIZE;
use crate::core::objective::IterationBudget;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidParameter {
        parameter: &'static str,
        reason: String,
    },

    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
}

/// Which caching strategy a [`super::context::CacheContext`] routes minimizations through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// Full-subtree DOF caching with a boundary-refinement pass.
    #[default]
    Subtree,
    /// L-set caching with quick, non-converged separator re-optimization.
    PartialFix,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Subtree => write!(f, "subtree"),
            StrategyKind::PartialFix => write!(f, "partial-fix"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryRefinement {
    Disabled,
    /// Capped at `refinement-iterations`.
    #[default]
    Quick,
    Full,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct CacheConfig {
    pub strategy: StrategyKind,
    pub enabled: bool,
    pub capacity: usize,
    pub leaf_size: usize,
    pub max_unit_size: usize,
    pub boundary_refinement: BoundaryRefinement,
    pub refinement_iterations: usize,
    pub separator_iterations: usize,
    pub parallel: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::Subtree,
            enabled: true,
            capacity: 100_000,
            leaf_size: DEFAULT_LEAF_SIZE,
            max_unit_size: DEFAULT_LEAF_SIZE,
            boundary_refinement: BoundaryRefinement::Quick,
            refinement_iterations: 5,
            separator_iterations: 5,
            parallel: true,
        }
    }
}

impl CacheConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        Self::parse(&content, &path.to_string_lossy())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, "<inline>")
    }

    fn parse(content: &str, origin: &str) -> Result<Self, ConfigError> {
        let config: CacheConfig = toml::from_str(content).map_err(|e| ConfigError::Toml {
            path: origin.to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "capacity",
                reason: "must hold at least one entry".to_string(),
            });
        }
        if self.leaf_size == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "leaf_size",
                reason: "leaves must hold at least one position".to_string(),
            });
        }
        if self.max_unit_size == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "max_unit_size",
                reason: "units must hold at least one position".to_string(),
            });
        }
        if self.boundary_refinement == BoundaryRefinement::Quick && self.refinement_iterations == 0
        {
            return Err(ConfigError::InvalidParameter {
                parameter: "refinement_iterations",
                reason: "quick refinement needs at least one iteration; use 'disabled' instead"
                    .to_string(),
            });
        }
        if self.separator_iterations == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "separator_iterations",
                reason: "separator refinement needs at least one iteration".to_string(),
            });
        }
        Ok(())
    }

    /// Budget of the boundary-refinement pass, or `None` when refinement is disabled.
    pub fn refinement_budget(&self) -> Option<IterationBudget> {
        match self.boundary_refinement {
            BoundaryRefinement::Disabled => None,
            BoundaryRefinement::Quick => Some(IterationBudget::Capped(self.refinement_iterations)),
            BoundaryRefinement::Full => Some(IterationBudget::Converge),
        }
    }

    pub fn separator_budget(&self) -> IterationBudget {
        IterationBudget::Capped(self.separator_iterations)
    }
}

#[derive(Default)]
pub struct CacheConfigBuilder {
    strategy: Option<StrategyKind>,
    enabled: Option<bool>,
    capacity: Option<usize>,
    leaf_size: Option<usize>,
    max_unit_size: Option<usize>,
    boundary_refinement: Option<BoundaryRefinement>,
    refinement_iterations: Option<usize>,
    separator_iterations: Option<usize>,
    parallel: Option<bool>,
}

impl CacheConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = Some(strategy);
        self
    }
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }
    pub fn leaf_size(mut self, leaf_size: usize) -> Self {
        self.leaf_size = Some(leaf_size);
        self
    }
    pub fn max_unit_size(mut self, max_unit_size: usize) -> Self {
        self.max_unit_size = Some(max_unit_size);
        self
    }
    pub fn boundary_refinement(mut self, refinement: BoundaryRefinement) -> Self {
        self.boundary_refinement = Some(refinement);
        self
    }
    pub fn refinement_iterations(mut self, iterations: usize) -> Self {
        self.refinement_iterations = Some(iterations);
        self
    }
    pub fn separator_iterations(mut self, iterations: usize) -> Self {
        self.separator_iterations = Some(iterations);
        self
    }
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    /// Fills unset fields from [`CacheConfig::default`]. An unset `max_unit_size` follows
    /// `leaf_size`.
    pub fn build(self) -> Result<CacheConfig, ConfigError> {
        let defaults = CacheConfig::default();
        let leaf_size = self.leaf_size.unwrap_or(defaults.leaf_size);
        let config = CacheConfig {
            strategy: self.strategy.unwrap_or(defaults.strategy),
            enabled: self.enabled.unwrap_or(defaults.enabled),
            capacity: self.capacity.unwrap_or(defaults.capacity),
            leaf_size,
            max_unit_size: self.max_unit_size.unwrap_or(leaf_size),
            boundary_refinement: self
                .boundary_refinement
                .unwrap_or(defaults.boundary_refinement),
            refinement_iterations: self
                .refinement_iterations
                .unwrap_or(defaults.refinement_iterations),
            separator_iterations: self
                .separator_iterations
                .unwrap_or(defaults.separator_iterations),
            parallel: self.parallel.unwrap_or(defaults.parallel),
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = CacheConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.leaf_size, 3);
        assert_eq!(config.refinement_budget(), Some(IterationBudget::Capped(5)));
        assert_eq!(config.separator_budget(), IterationBudget::Capped(5));
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = CacheConfigBuilder::new()
            .strategy(StrategyKind::PartialFix)
            .capacity(16)
            .leaf_size(4)
            .boundary_refinement(BoundaryRefinement::Full)
            .parallel(false)
            .build()
            .unwrap();
        assert_eq!(config.strategy, StrategyKind::PartialFix);
        assert_eq!(config.capacity, 16);
        assert_eq!(config.max_unit_size, 4);
        assert_eq!(config.refinement_budget(), Some(IterationBudget::Converge));
        assert!(!config.parallel);
    }

    #[test]
    fn builder_rejects_zero_capacity() {
        let result = CacheConfigBuilder::new().capacity(0).build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter {
                parameter: "capacity",
                ..
            })
        ));
    }

    #[test]
    fn quick_refinement_requires_iterations() {
        let result = CacheConfigBuilder::new()
            .boundary_refinement(BoundaryRefinement::Quick)
            .refinement_iterations(0)
            .build();
        assert!(result.is_err());

        let disabled = CacheConfigBuilder::new()
            .boundary_refinement(BoundaryRefinement::Disabled)
            .refinement_iterations(0)
            .build()
            .unwrap();
        assert_eq!(disabled.refinement_budget(), None);
    }

    #[test]
    fn from_toml_str_reads_kebab_case_keys() {
        let config = CacheConfig::from_toml_str(
            r#"
strategy = "partial-fix"
capacity = 512
boundary-refinement = "disabled"
separator-iterations = 3
"#,
        )
        .unwrap();
        assert_eq!(config.strategy, StrategyKind::PartialFix);
        assert_eq!(config.capacity, 512);
        assert_eq!(config.boundary_refinement, BoundaryRefinement::Disabled);
        assert_eq!(config.separator_iterations, 3);
        assert_eq!(config.leaf_size, 3);
    }

    #[test]
    fn from_toml_str_rejects_unknown_keys() {
        let result = CacheConfig::from_toml_str("cache-size = 10");
        assert!(matches!(result, Err(ConfigError::Toml { .. })));
    }

    #[test]
    fn from_toml_str_validates_values() {
        let result = CacheConfig::from_toml_str("leaf-size = 0");
        assert!(matches!(
            result,
            Err(ConfigError::InvalidParameter {
                parameter: "leaf_size",
                ..
            })
        ));
    }

    #[test]
    fn load_reads_config_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("cache.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "max-unit-size = 6\nparallel = false").unwrap();

        let config = CacheConfig::load(&path).unwrap();
        assert_eq!(config.max_unit_size, 6);
        assert!(!config.parallel);
    }

    #[test]
    fn load_reports_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = CacheConfig::load(&temp_dir.path().join("missing.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn strategy_kind_displays_kebab_case() {
        assert_eq!(StrategyKind::PartialFix.to_string(), "partial-fix");
        assert_eq!(StrategyKind::Subtree.to_string(), "subtree");
    }
}
