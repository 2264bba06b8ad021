//! Column mapping between the results table and the semantic fields
//!
//! ```toml
//! [columns]
//! score = "punt_matematicas"
//! municipality = "estu_mcpio_reside"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::normalize::EducationVariable;

/// Names of the table columns backing each semantic field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    /// Target score; any score component column works here
    pub score: String,
    pub stratum: String,
    pub education_mother: String,
    pub education_father: String,
    pub municipality: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            score: "punt_global".to_string(),
            stratum: "fami_estratovivienda".to_string(),
            education_mother: "fami_educacionmadre".to_string(),
            education_father: "fami_educacionpadre".to_string(),
            municipality: "cole_mcpio_ubicacion".to_string(),
        }
    }
}

impl ColumnMapping {
    /// Column holding the chosen education variable
    pub fn education(&self, variable: EducationVariable) -> &str {
        match variable {
            EducationVariable::Mother => &self.education_mother,
            EducationVariable::Father => &self.education_father,
        }
    }

    /// All required columns, in a stable order
    pub fn required(&self) -> [&str; 5] {
        [
            &self.score,
            &self.stratum,
            &self.education_mother,
            &self.education_father,
            &self.municipality,
        ]
    }
}

/// Engine configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub columns: ColumnMapping,
}

impl EngineConfig {
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        log::debug!("loaded column mapping from {}: {:?}", path.display(), config.columns);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_mapping() {
        let mapping = ColumnMapping::default();
        assert_eq!(mapping.score, "punt_global");
        assert_eq!(mapping.education(EducationVariable::Father), "fami_educacionpadre");
        assert_eq!(mapping.required().len(), 5);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [columns]
            score = "punt_matematicas"
            "#,
        )
        .unwrap();
        assert_eq!(config.columns.score, "punt_matematicas");
        assert_eq!(config.columns.stratum, "fami_estratovivienda");
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_invalid_toml_fails() {
        assert!(EngineConfig::from_toml("[columns\nscore = 1").is_err());
    }
}
