use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ROLE_PATIENT: &str = "patient";
pub const ROLE_DOCTOR: &str = "doctor";
pub const ROLE_ADMIN: &str = "admin";

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: u64,
    pub email: Option<String>,
    pub role: Option<String>,
    pub user_metadata: Option<serde_json::Value>,
    pub iat: Option<u64>,
}

/// The authenticated caller, as placed into request extensions by the auth
/// middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn has_role(&self, role: &str) -> bool {
        self.role.as_deref() == Some(role)
    }

    /// Subjects are UUIDs; anything else cannot own appointments.
    pub fn uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.id).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, role: Option<&str>) -> User {
        User {
            id: id.to_string(),
            email: None,
            role: role.map(str::to_string),
            metadata: None,
            created_at: None,
        }
    }

    #[test]
    fn role_check_is_exact() {
        let doctor = user("x", Some(ROLE_DOCTOR));
        assert!(doctor.has_role(ROLE_DOCTOR));
        assert!(!doctor.has_role(ROLE_PATIENT));
        assert!(!user("x", None).has_role(ROLE_DOCTOR));
    }

    #[test]
    fn uuid_parses_only_valid_subjects() {
        let id = Uuid::new_v4();
        assert_eq!(user(&id.to_string(), None).uuid(), Some(id));
        assert_eq!(user("not-a-uuid", None).uuid(), None);
    }
}
