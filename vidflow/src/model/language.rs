//! The fixed supported-language registry.
//!
//! Target languages are validated against this set before graph
//! construction, never inside stage functions.

use crate::errors::ValidationError;

/// The language transcripts are extracted in.
pub const SOURCE_LANGUAGE: &str = "en";

/// Languages the pipeline can translate into.
pub const SUPPORTED_TARGET_LANGUAGES: &[&str] = &["es", "ja", "pt"];

/// Returns true if `language` is a supported translation target.
#[must_use]
pub fn is_supported_target(language: &str) -> bool {
    SUPPORTED_TARGET_LANGUAGES.contains(&language)
}

/// The supported target set as owned strings, for error reporting.
#[must_use]
pub fn supported_targets() -> Vec<String> {
    SUPPORTED_TARGET_LANGUAGES
        .iter()
        .map(|&l| l.to_owned())
        .collect()
}

/// Validates a single target language.
pub fn validate_target(language: &str) -> Result<(), ValidationError> {
    if is_supported_target(language) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedLanguage {
            language: language.to_owned(),
            supported: supported_targets(),
        })
    }
}
