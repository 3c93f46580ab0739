//! Field validation shared by projects, batches, users and worker groups.

use crate::error::CoreError;

/// Maximum length for entity names (projects, batches, groups).
pub const MAX_NAME_LENGTH: usize = 256;

/// Validate an entity name: must be non-blank and within the length limit.
pub fn validate_name(entity: &str, name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation(format!(
            "{entity} name must not be empty"
        )));
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "{entity} name exceeds maximum length of {MAX_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_is_rejected() {
        assert!(validate_name("Project", " ").is_err());
    }

    #[test]
    fn long_name_is_rejected() {
        let name = "x".repeat(MAX_NAME_LENGTH + 1);
        assert!(validate_name("Batch", &name).is_err());
        assert!(validate_name("Batch", &name[1..]).is_ok());
    }
}
