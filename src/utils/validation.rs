// Input checks shared by sign-up, username lookups and profile updates

pub const USERNAME_MIN_LEN: usize = 2;
pub const USERNAME_MAX_LEN: usize = 20;
pub const PASSWORD_MIN_LEN: usize = 6;

/// Returns every rule the username breaks; empty means valid.
pub fn username_errors(username: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let len = username.chars().count();

    if len < USERNAME_MIN_LEN {
        errors.push(format!("Username must be at least {} characters", USERNAME_MIN_LEN));
    }
    if len > USERNAME_MAX_LEN {
        errors.push(format!("Username must be no more than {} characters", USERNAME_MAX_LEN));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        errors.push("Username must not contain special characters".to_string());
    }

    errors
}

/// Same shape as `.+@.+\..+`: something, an `@`, something, a dot, something.
pub fn is_valid_email(email: &str) -> bool {
    let Some(at) = email.find('@') else {
        return false;
    };
    if at == 0 {
        return false;
    }
    let domain = &email[at + 1..];
    match domain.rfind('.') {
        Some(dot) => dot > 0 && dot + 1 < domain.len(),
        None => false,
    }
}

pub fn password_error(password: &str) -> Option<String> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        Some(format!("Password must be at least {} characters", PASSWORD_MIN_LEN))
    } else {
        None
    }
}
