//! Generation config, loaded from RON or JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::constants::DEFAULT_SEED;
use crate::error::{ConfigError, ConfigResult};
use crate::level::Tier;
use crate::logging::TracingConfig;

/// Default chance a level carries an Extreme bulkhead
pub fn extreme_chance(tier: Tier) -> f64 {
    match tier {
        Tier::A => 0.0,
        Tier::B => 0.3,
        Tier::C => 0.5,
        Tier::D => 0.6,
        Tier::E => 0.7,
    }
}

/// Default chance a level with an Extreme bulkhead also carries Overload
pub fn overload_chance(tier: Tier) -> f64 {
    match tier {
        Tier::A | Tier::B => 0.0,
        Tier::C => 0.2,
        Tier::D => 0.35,
        Tier::E => 0.5,
    }
}

/// Per-tier overrides of the bulkhead chances
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulkheadChances {
    pub extreme: BTreeMap<Tier, f64>,
    pub overload: BTreeMap<Tier, f64>,
}

impl BulkheadChances {
    pub fn extreme(&self, tier: Tier) -> f64 {
        self.extreme
            .get(&tier)
            .copied()
            .unwrap_or_else(|| extreme_chance(tier))
    }

    pub fn overload(&self, tier: Tier) -> f64 {
        self.overload
            .get(&tier)
            .copied()
            .unwrap_or_else(|| overload_chance(tier))
    }
}

/// Everything a rundown build reads from outside
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub seed: String,
    pub levels_per_tier: BTreeMap<Tier, u32>,
    pub bulkhead_chances: BulkheadChances,
    /// Allow exits past the Main objective instead of extracting at the elevator
    pub forward_extraction: bool,
    pub logging: TracingConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED.to_string(),
            levels_per_tier: BTreeMap::from([
                (Tier::A, 2),
                (Tier::B, 3),
                (Tier::C, 3),
                (Tier::D, 2),
                (Tier::E, 1),
            ]),
            bulkhead_chances: BulkheadChances::default(),
            forward_extraction: true,
            logging: TracingConfig::default(),
        }
    }
}

impl GenerationConfig {
    /// Load from a `.ron` or `.json` file and validate
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let config: GenerationConfig = match extension.as_deref() {
            Some("ron") => ron::from_str(&text)?,
            Some("json") => serde_json::from_str(&text)?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: &str) -> Self {
        self.seed = seed.to_string();
        self
    }

    /// Levels requested for a tier; absent tiers build nothing
    pub fn levels(&self, tier: Tier) -> u32 {
        self.levels_per_tier.get(&tier).copied().unwrap_or(0)
    }

    pub fn total_levels(&self) -> u32 {
        self.levels_per_tier.values().sum()
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.seed.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "seed",
                reason: "must not be empty".to_string(),
            });
        }
        if self.total_levels() == 0 {
            return Err(ConfigError::Invalid {
                field: "levels_per_tier",
                reason: "at least one level is required".to_string(),
            });
        }
        let chances = &self.bulkhead_chances;
        let tables = [
            ("bulkhead_chances.extreme", &chances.extreme),
            ("bulkhead_chances.overload", &chances.overload),
        ];
        for (field, table) in tables {
            if let Some((tier, chance)) = table.iter().find(|(_, c)| !(0.0..=1.0).contains(*c)) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("tier {tier} chance {chance} is outside 0..=1"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use std::io::Write;

    fn write_temp(suffix: &str, body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_is_valid() {
        let config = GenerationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.total_levels(), 11);
        assert_eq!(config.bulkhead_chances.extreme(Tier::A), 0.0);
        assert_eq!(config.bulkhead_chances.overload(Tier::E), 0.5);
    }

    #[test]
    fn test_load_ron() {
        let file = write_temp(
            ".ron",
            r#"(
                seed: "weekly-7",
                levels_per_tier: { C: 2 },
                forward_extraction: false,
                logging: (level: debug),
            )"#,
        );
        let config = GenerationConfig::load(file.path()).unwrap();
        assert_eq!(config.seed, "weekly-7");
        assert_eq!(config.levels(Tier::C), 2);
        assert_eq!(config.levels(Tier::A), 0);
        assert!(!config.forward_extraction);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_load_json_with_overrides() {
        let file = write_temp(
            ".json",
            r#"{"seed": "test-1", "bulkhead_chances": {"extreme": {"B": 1.0}}}"#,
        );
        let config = GenerationConfig::load(file.path()).unwrap();
        assert_eq!(config.bulkhead_chances.extreme(Tier::B), 1.0);
        assert_eq!(config.bulkhead_chances.extreme(Tier::C), 0.5);
        assert_eq!(config.total_levels(), 11);
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let file = write_temp(".toml", "seed = 'x'");
        assert!(matches!(
            GenerationConfig::load(file.path()),
            Err(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.ron");
        assert!(matches!(GenerationConfig::load(&path), Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let empty_seed = GenerationConfig::default().with_seed("  ");
        assert!(matches!(
            empty_seed.validate(),
            Err(ConfigError::Invalid { field: "seed", .. })
        ));

        let mut chance = GenerationConfig::default();
        chance.bulkhead_chances.overload.insert(Tier::D, 1.5);
        assert!(matches!(
            chance.validate(),
            Err(ConfigError::Invalid {
                field: "bulkhead_chances.overload",
                ..
            })
        ));

        let mut nothing = GenerationConfig::default();
        nothing.levels_per_tier.clear();
        assert!(nothing.validate().is_err());
    }
}
