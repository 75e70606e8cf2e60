use serde::{Deserialize, Serialize};

use super::claims::TokenClaims;

pub const AUTHORITY_ADMIN: &str = "ROLE_ADMIN";
pub const AUTHORITY_MANAGER: &str = "ROLE_MANAGER";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Donor,
    Manager,
}

impl Role {
    /// Admin outranks manager; anything else is a donor.
    pub fn from_authorities<S: AsRef<str>>(authorities: &[S]) -> Role {
        let has = |name: &str| authorities.iter().any(|a| a.as_ref() == name);
        if has(AUTHORITY_ADMIN) {
            Role::Admin
        } else if has(AUTHORITY_MANAGER) {
            Role::Manager
        } else {
            Role::Donor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self { Role::Admin => "ADMIN", Role::Donor => "DONOR", Role::Manager => "MANAGER" }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ADMIN" | "ROLE_ADMIN" => Some(Role::Admin),
            "DONOR" | "ROLE_DONOR" => Some(Role::Donor),
            "MANAGER" | "ROLE_MANAGER" => Some(Role::Manager),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// Signed-in identity, always projected from the access token; never stored on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl User {
    pub fn from_claims(claims: &TokenClaims) -> Self {
        Self {
            id: claims.user_id.clone().unwrap_or_else(|| claims.sub.clone()),
            email: claims.sub.clone(),
            first_name: claims.first_name.clone().unwrap_or_default(),
            last_name: claims.last_name.clone().unwrap_or_default(),
            role: Role::from_authorities(&claims.authorities),
        }
    }

    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() { self.email.clone() } else { full.to_string() }
    }

    pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(authorities: &[&str]) -> TokenClaims {
        TokenClaims {
            sub: "a@b.com".into(),
            exp: 10,
            iat: 0,
            authorities: authorities.iter().map(|s| s.to_string()).collect(),
            first_name: None,
            last_name: None,
            user_id: None,
        }
    }

    #[test]
    fn role_mapping() {
        assert_eq!(Role::from_authorities(&["ROLE_ADMIN"]), Role::Admin);
        assert_eq!(Role::from_authorities(&["ROLE_MANAGER"]), Role::Manager);
        assert_eq!(Role::from_authorities(&["ROLE_MANAGER", "ROLE_ADMIN"]), Role::Admin);
        assert_eq!(Role::from_authorities(&["ROLE_DONOR"]), Role::Donor);
        assert_eq!(Role::from_authorities::<&str>(&[]), Role::Donor);
        assert_eq!(Role::from_authorities(&["role_admin"]), Role::Donor);
    }

    #[test]
    fn derivation_is_a_pure_function_of_claims() {
        let c = claims(&["ROLE_MANAGER"]);
        assert_eq!(User::from_claims(&c), User::from_claims(&c));
        assert_eq!(User::from_claims(&c).role, Role::Manager);
    }

    #[test]
    fn user_fields_fall_back_to_subject() {
        let u = User::from_claims(&claims(&[]));
        assert_eq!(u.id, "a@b.com");
        assert_eq!(u.email, "a@b.com");
        assert_eq!(u.display_name(), "a@b.com");
        assert!(!u.is_admin());

        let mut c = claims(&["ROLE_ADMIN"]);
        c.user_id = Some("42".into());
        c.first_name = Some("Grace".into());
        let u = User::from_claims(&c);
        assert_eq!(u.id, "42");
        assert_eq!(u.display_name(), "Grace");
        assert!(u.is_admin());
    }

    #[test]
    fn role_parse_and_wire_names() {
        assert_eq!(Role::parse("donor"), Some(Role::Donor));
        assert_eq!(Role::parse("ROLE_MANAGER"), Some(Role::Manager));
        assert_eq!(Role::parse("guest"), None);
        assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "ADMIN");
    }
}
