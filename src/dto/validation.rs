//! Validation helpers for DTOs.

use validator::ValidationError;

/// Length of every game code.
pub const GAME_CODE_LEN: usize = 8;

/// Validates that a game code is exactly 8 uppercase ASCII letters or digits.
///
/// # Examples
///
/// ```ignore
/// validate_game_code("AB12CD34") // Ok
/// validate_game_code("ab12cd34") // Err - lowercase
/// validate_game_code("AB12CD3")  // Err - too short
/// ```
pub fn validate_game_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != GAME_CODE_LEN {
        let mut err = ValidationError::new("game_code_length");
        err.message = Some(
            format!(
                "Game code must be exactly {GAME_CODE_LEN} characters (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        let mut err = ValidationError::new("game_code_format");
        err.message = Some("Game code must contain only A-Z and 0-9".into());
        return Err(err);
    }

    Ok(())
}

/// Rejects empty or whitespace-only strings.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        return Err(err);
    }
    Ok(())
}
