/// Usernames: 2-50 characters of letters, digits, `_` and `.`.
pub fn validate_username(username: &str) -> Option<String> {
    let name = username.trim();
    let len = name.chars().count();
    if len == 0 {
        Some("Username is required".to_string())
    } else if !(2..=50).contains(&len) {
        Some("Username must be between 2 and 50 characters".to_string())
    } else if !name.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '.')) {
        Some("Username may only contain letters, numbers, dots and underscores".to_string())
    } else {
        None
    }
}

/// Passwords need at least 8 characters.
pub fn validate_password(password: &str) -> Option<String> {
    match password.chars().count() {
        0 => Some("Password is required".to_string()),
        n if n < 8 => Some("Password must be at least 8 characters".to_string()),
        _ => None,
    }
}

fn too_long(value: &str, field_name: &str, max_len: usize) -> Option<String> {
    (value.chars().count() > max_len)
        .then(|| format!("{field_name} must be at most {max_len} characters"))
}

/// Non-blank text of at most `max_len` characters, measured after trimming.
pub fn validate_required(value: &str, field_name: &str, max_len: usize) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        return Some(format!("{field_name} is required"));
    }
    too_long(value, field_name, max_len)
}

/// Like [`validate_required`] but blank is accepted.
pub fn validate_optional(value: &str, field_name: &str, max_len: usize) -> Option<String> {
    too_long(value.trim(), field_name, max_len)
}

/// Collapse collected messages into one `InvalidInput` error.
pub fn into_result(errors: Vec<String>) -> Result<(), crate::errors::AppError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::errors::AppError::InvalidInput(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert!(validate_username("tec.garcia").is_none());
        assert!(validate_username("a").is_some());
        assert!(validate_username("bad name").is_some());
    }

    #[test]
    fn required_and_optional_fields() {
        assert!(validate_required("  ", "Name", 10).is_some());
        assert!(validate_required("SVB-01", "Name", 3).is_some());
        assert!(validate_optional("", "Model", 3).is_none());
        assert!(into_result(vec!["a".into(), "b".into()]).is_err_and(|e| e.to_string().contains("a; b")));
    }
}
