use validator::ValidationError;

/// Length in characters, not bytes.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_characters() {
        assert_eq!(char_len("héllo"), 5);
    }

    #[test]
    fn blank_is_rejected() {
        assert!(not_blank("   ").is_err());
        assert!(not_blank("x").is_ok());
    }
}
