//! Engine tuning loaded from TOML at runtime for the gRPC server and arena CLI.
//!
//! ```toml
//! [card_sorting.weights]
//! relative_order = 0.5
//! exact_position = 0.3
//! inversion = 0.2
//!
//! [arena]
//! max_plies = 400
//! check_probability = 0.3
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::games::card_sorting::scoring::ScoringWeights;

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct CardSortingSettings {
    #[serde(default)]
    pub weights: ScoringWeights,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ArenaSettings {
    /// Plies after which a soak game is abandoned as unfinished.
    pub max_plies: usize,
    /// Chance the random card sorting bot submits once its row is full.
    pub check_probability: f64,
}

impl Default for ArenaSettings {
    fn default() -> Self {
        Self {
            max_plies: 400,
            check_probability: 0.3,
        }
    }
}

/// Top-level TOML file structure.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct EngineSettings {
    #[serde(default)]
    pub card_sorting: CardSortingSettings,
    #[serde(default)]
    pub arena: ArenaSettings,
}

impl EngineSettings {
    fn validate(&self) -> Result<(), String> {
        let w = &self.card_sorting.weights;
        let parts = [w.relative_order, w.exact_position, w.inversion];
        if parts.iter().any(|x| !x.is_finite() || *x < 0.0) {
            return Err("card_sorting.weights must be finite and non-negative".into());
        }
        if parts.iter().sum::<f64>() <= 0.0 {
            return Err("card_sorting.weights must not all be zero".into());
        }
        if !(0.0..=1.0).contains(&self.arena.check_probability) {
            return Err("arena.check_probability must be between 0 and 1".into());
        }
        Ok(())
    }
}

/// Load settings from a TOML file at the given path.
pub fn load_settings(path: &Path) -> Result<EngineSettings, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let settings: EngineSettings =
        toml::from_str(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
    settings
        .validate()
        .map_err(|e| format!("Invalid {}: {}", path.display(), e))?;
    Ok(settings)
}

/// Try to load settings from well-known paths, returning defaults if none found.
pub fn load_default_settings() -> EngineSettings {
    let candidates = [
        "engine_settings.toml",
        "../engine_settings.toml",
        "/etc/arcade/engine_settings.toml",
    ];
    for path in &candidates {
        let p = Path::new(path);
        if p.exists() {
            match load_settings(p) {
                Ok(settings) => {
                    tracing::info!(path = %p.display(), "loaded engine settings");
                    return settings;
                }
                Err(e) => {
                    tracing::warn!(path = %p.display(), error = %e, "failed to load engine settings");
                }
            }
        }
    }
    tracing::info!("no engine_settings.toml found, using built-in defaults");
    EngineSettings::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::games::card_sorting::scoring::DEFAULT_WEIGHTS;

    fn write_toml(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_file() {
        let file = write_toml(
            r#"
[card_sorting.weights]
relative_order = 0.6
exact_position = 0.2
inversion = 0.2

[arena]
max_plies = 120
"#,
        );
        let settings = load_settings(file.path()).unwrap();
        assert_eq!(settings.card_sorting.weights.relative_order, 0.6);
        assert_eq!(settings.arena.max_plies, 120);
        assert_eq!(settings.arena.check_probability, 0.3);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_toml("");
        let settings = load_settings(file.path()).unwrap();
        assert_eq!(settings, EngineSettings::default());
        assert_eq!(settings.card_sorting.weights, DEFAULT_WEIGHTS);
    }

    #[test]
    fn test_partial_weights_fill_from_defaults() {
        let file = write_toml("[card_sorting.weights]\ninversion = 0.0\n");
        let weights = load_settings(file.path()).unwrap().card_sorting.weights;
        assert_eq!(weights.relative_order, DEFAULT_WEIGHTS.relative_order);
        assert_eq!(weights.inversion, 0.0);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let file = write_toml("[card_sorting.weights]\ninversion = -1.0\n");
        let err = load_settings(file.path()).unwrap_err();
        assert!(err.contains("non-negative"), "{}", err);
    }

    #[test]
    fn test_check_probability_range() {
        let file = write_toml("[arena]\ncheck_probability = 1.5\n");
        assert!(load_settings(file.path()).unwrap_err().contains("check_probability"));
    }

    #[test]
    fn test_parse_error_names_file() {
        let file = write_toml("[arena\nmax_plies = ");
        let err = load_settings(file.path()).unwrap_err();
        assert!(err.starts_with("Failed to parse"));
        assert!(err.contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_missing_file() {
        let err = load_settings(Path::new("/nonexistent/engine_settings.toml")).unwrap_err();
        assert!(err.starts_with("Failed to read"));
    }
}
