use crate::duplicates::DuplicateTypeArg;
use crate::error::{Result, XbrlValidationError};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Filing program whose dimension rule codes are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DisclosureSystem {
    #[default]
    Efm,
    Gfm,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ValidationOptions {
    #[serde(default = "default_true")]
    #[schemars(description = "Infer decimals from precision. Required by calculation validation.")]
    pub infer_decimals: bool,

    #[serde(default)]
    pub disclosure_system: DisclosureSystem,

    #[serde(default = "default_true")]
    pub validate_dimensions: bool,

    #[serde(default = "default_true")]
    pub validate_calculations: bool,

    #[serde(default)]
    #[schemars(description = "Check targetRole usage on hypercube-dimension arcs (SBR.NL.2.3.5.*)")]
    pub sbr_nl_rules: bool,

    #[serde(default)]
    #[schemars(description = "Document-wide duplicate fact sets to report; none disables the check")]
    pub duplicate_facts: DuplicateTypeArg,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            infer_decimals: true,
            disclosure_system: DisclosureSystem::default(),
            validate_dimensions: true,
            validate_calculations: true,
            sbr_nl_rules: false,
            duplicate_facts: DuplicateTypeArg::None,
        }
    }
}

impl ValidationOptions {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sbr_nl_rules && !self.validate_dimensions {
            return Err(XbrlValidationError::InvalidOptions(
                "sbr_nl_rules requires validate_dimensions".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_disclosure_system(mut self, disclosure_system: DisclosureSystem) -> Self {
        self.disclosure_system = disclosure_system;
        self
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ValidationOptions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let options = ValidationOptions::from_json_str("{}").unwrap();
        assert!(options.infer_decimals);
        assert!(options.validate_dimensions);
        assert!(options.validate_calculations);
        assert!(!options.sbr_nl_rules);
        assert_eq!(options.disclosure_system, DisclosureSystem::Efm);
        assert_eq!(options.duplicate_facts, DuplicateTypeArg::None);
    }

    #[test]
    fn test_duplicate_facts_option() {
        let options = ValidationOptions::from_json_str(r#"{"duplicate_facts": "all"}"#).unwrap();
        assert_eq!(options.duplicate_facts, DuplicateTypeArg::All);
        let err = ValidationOptions::from_json_str(r#"{"duplicate_facts": "some"}"#).unwrap_err();
        assert!(matches!(err, XbrlValidationError::SerializationError(_)));
    }

    #[test]
    fn test_partial_json() {
        let options =
            ValidationOptions::from_json_str(r#"{"disclosure_system": "gfm", "infer_decimals": false}"#)
                .unwrap();
        assert_eq!(options.disclosure_system, DisclosureSystem::Gfm);
        assert!(!options.infer_decimals);
        assert!(options.validate_calculations);
    }

    #[test]
    fn test_unknown_disclosure_system_is_rejected() {
        let err = ValidationOptions::from_json_str(r#"{"disclosure_system": "esef"}"#).unwrap_err();
        assert!(matches!(err, XbrlValidationError::SerializationError(_)));
    }

    #[test]
    fn test_inconsistent_options_are_rejected() {
        let err = ValidationOptions::from_json_str(
            r#"{"sbr_nl_rules": true, "validate_dimensions": false}"#,
        )
        .unwrap_err();
        assert!(matches!(err, XbrlValidationError::InvalidOptions(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = ValidationOptions::from_file("/nonexistent/options.json").unwrap_err();
        assert!(matches!(err, XbrlValidationError::IoError(_)));
    }
}
