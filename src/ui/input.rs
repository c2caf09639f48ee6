//! Local input checks, applied before any state change or network call.

use crate::error::RelayError;

/// Trim `raw` and enforce `1..=max_chars` characters.
pub fn validate_input(raw: &str, max_chars: usize) -> Result<String, RelayError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(RelayError::InvalidInput("message cannot be empty".into()));
    }
    let len = text.chars().count();
    if len > max_chars {
        return Err(RelayError::InvalidInput(format!(
            "A mensagem não pode exceder {max_chars} caracteres ({len} informados)."
        )));
    }
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_accepts_normal_text() {
        assert_eq!(validate_input("  Olá \n", 1000).unwrap(), "Olá");
    }

    #[test]
    fn rejects_blank_input() {
        assert!(matches!(validate_input(" \t\n", 1000), Err(RelayError::InvalidInput(_))));
    }

    #[test]
    fn limit_counts_characters_not_bytes() {
        let exactly = "é".repeat(1000);
        assert!(validate_input(&exactly, 1000).is_ok());
        let over = "é".repeat(1001);
        assert!(matches!(validate_input(&over, 1000), Err(RelayError::InvalidInput(msg)) if msg.contains("1000")));
    }
}
