use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{FaqError, Result};

pub const DEFAULT_THRESHOLD_INTENT: f32 = 0.2;
pub const DEFAULT_THRESHOLD_FAQ: f32 = 0.3;
pub const DEFAULT_EMBEDDING_DIM: usize = 768;
pub const DEFAULT_HYPOTHESIS_TEMPLATE: &str = "{}";
pub const DEFAULT_TEMPERATURE: f32 = 0.05;
pub const DEFAULT_REQUIRED_PASS_RATE: f32 = 0.85;

/// The two cutoffs of the matching protocol.
///
/// `intent` decides whether the classifier's label is trusted to narrow the
/// search; `faq` decides whether the best question is close enough to
/// answer, whichever candidate set was searched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub intent: f32,
    pub faq: f32,
}

impl Thresholds {
    pub fn new(intent: f32, faq: f32) -> Result<Self> {
        let t = Self { intent, faq };
        t.validate()?;
        Ok(t)
    }

    pub fn validate(&self) -> Result<()> {
        check_unit("intent", self.intent)?;
        check_unit("faq", self.faq)
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            intent: DEFAULT_THRESHOLD_INTENT,
            faq: DEFAULT_THRESHOLD_FAQ,
        }
    }
}

fn check_unit(name: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(FaqError::InvalidThreshold { name, value })
    }
}

/// Settings for [`crate::ZeroShotIntentClassifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZeroShotConfig {
    /// Text each label is wrapped in before embedding; `{}` is replaced by
    /// the label.
    pub hypothesis_template: String,
    /// Softmax temperature over label similarities. Lower is sharper.
    pub temperature: f32,
}

impl Default for ZeroShotConfig {
    fn default() -> Self {
        Self {
            hypothesis_template: DEFAULT_HYPOTHESIS_TEMPLATE.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl ZeroShotConfig {
    pub fn hypothesis(&self, label: &str) -> String {
        self.hypothesis_template.replace("{}", label)
    }
}

/// Everything tunable without recompiling, read from an optional JSON file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    pub thresholds: Thresholds,
    pub zero_shot: ZeroShotConfig,
}

impl RouterConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file =
            std::fs::File::open(path).with_context(|| format!("open {}", path.display()))?;
        let config: RouterConfig = serde_json::from_reader(file)
            .with_context(|| format!("parse router config {}", path.display()))?;
        config
            .thresholds
            .validate()
            .with_context(|| format!("invalid thresholds in {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_matching_protocol() {
        let t = Thresholds::default();
        assert_eq!(t.intent, 0.2);
        assert_eq!(t.faq, 0.3);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn thresholds_outside_unit_interval_are_rejected() {
        assert!(Thresholds::new(0.0, 1.0).is_ok());
        assert!(matches!(
            Thresholds::new(-0.1, 0.3),
            Err(FaqError::InvalidThreshold { name: "intent", .. })
        ));
        assert!(matches!(
            Thresholds::new(0.2, 1.5),
            Err(FaqError::InvalidThreshold { name: "faq", .. })
        ));
        assert!(Thresholds::new(f32::NAN, 0.3).is_err());
    }

    #[test]
    fn partial_config_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"thresholds": {{"faq": 0.5}}}}"#).unwrap();

        let config = RouterConfig::load(file.path()).unwrap();
        assert_eq!(config.thresholds.intent, DEFAULT_THRESHOLD_INTENT);
        assert_eq!(config.thresholds.faq, 0.5);
        assert_eq!(config.zero_shot, ZeroShotConfig::default());
    }

    #[test]
    fn config_file_with_bad_threshold_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"thresholds": {{"intent": 2.0}}}}"#).unwrap();
        assert!(RouterConfig::load(file.path()).is_err());
    }

    #[test]
    fn hypothesis_template_substitutes_label() {
        let cfg = ZeroShotConfig {
            hypothesis_template: "This question is about {}.".to_string(),
            ..ZeroShotConfig::default()
        };
        assert_eq!(cfg.hypothesis("clinic hours"), "This question is about clinic hours.");
        assert_eq!(ZeroShotConfig::default().hypothesis("x"), "x");
    }
}
