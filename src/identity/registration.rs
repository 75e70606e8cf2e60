use serde::{Deserialize, Serialize};

use super::principal::Role;

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn parse(s: &str) -> Option<Gender> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MALE" => Some(Gender::Male),
            "FEMALE" => Some(Gender::Female),
            "OTHER" => Some(Gender::Other),
            _ => None,
        }
    }
}

/// Sign-up form payload. `role` and `gender` are optional only so an unselected
/// dropdown can be represented; validation requires both.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub role: Option<Role>,
    pub gender: Option<Gender>,
}

impl std::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("gender", &self.gender)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: impl Into<String>) -> Self { Self { field, message: message.into() } }
}

impl RegisterRequest {
    /// One error per invalid field, in form order. Empty means the payload may be sent.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errs = Vec::new();
        if self.first_name.trim().is_empty() { errs.push(FieldError::new("firstName", "First name is required")); }
        if self.last_name.trim().is_empty() { errs.push(FieldError::new("lastName", "Last name is required")); }
        if self.email.trim().is_empty() {
            errs.push(FieldError::new("email", "Email is required"));
        } else if !looks_like_email(self.email.trim()) {
            errs.push(FieldError::new("email", "Email is invalid"));
        }
        if self.password.is_empty() {
            errs.push(FieldError::new("password", "Password is required"));
        } else if self.password.chars().count() < MIN_PASSWORD_LEN {
            errs.push(FieldError::new("password", format!("Password must be at least {} characters", MIN_PASSWORD_LEN)));
        }
        if self.confirm_password != self.password {
            errs.push(FieldError::new("confirmPassword", "Passwords do not match"));
        }
        if self.role.is_none() { errs.push(FieldError::new("role", "Please select a role")); }
        if self.gender.is_none() { errs.push(FieldError::new("gender", "Please select a gender")); }
        errs
    }
}

// local@domain.tld with no whitespace; deliverability is the server's problem
fn looks_like_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) { return false; }
    let Some((local, domain)) = s.split_once('@') else { return false; };
    if local.is_empty() || domain.contains('@') { return false; }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}
