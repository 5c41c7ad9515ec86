// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use validator::Validate;

/// Closed set of account roles.
///
/// Stored verbatim in the `users.role` column and inside JWT claims.
/// Capability checks live here so handlers never compare role strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Role {
    Admin,
    Guru,
    Siswa,
}

impl Role {
    /// Registering accounts and listing users.
    pub fn can_manage_users(self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Authoring exams and questions.
    pub fn can_manage_exams(self) -> bool {
        matches!(self, Role::Guru)
    }

    /// Reviewing submitted answers and answer keys.
    pub fn can_review_answers(self) -> bool {
        matches!(self, Role::Guru | Role::Admin)
    }

    /// Taking exams: fetching questions and submitting answers.
    pub fn can_take_exams(self) -> bool {
        matches!(self, Role::Siswa)
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Admin" => Some(Role::Admin),
            "Guru" => Some(Role::Guru),
            "Siswa" => Some(Role::Siswa),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "Admin",
            Role::Guru => "Guru",
            Role::Siswa => "Siswa",
        };
        write!(f, "{}", s)
    }
}

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique username.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub role: Role,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for registering a new user (Admin only).
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 3,
        max = 20,
        message = "Username length must be between 3 and 20 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 4,
        max = 64,
        message = "Password length must be between 4 and 64 characters."
    ))]
    pub password: String,
    /// 'Admin', 'Guru' or 'Siswa'.
    pub role: String,
}

/// DTO for logging in.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_are_disjoint_where_it_matters() {
        assert!(Role::Admin.can_manage_users());
        assert!(!Role::Guru.can_manage_users());

        assert!(Role::Guru.can_manage_exams());
        assert!(!Role::Admin.can_manage_exams());

        assert!(Role::Guru.can_review_answers());
        assert!(Role::Admin.can_review_answers());
        assert!(!Role::Siswa.can_review_answers());

        assert!(Role::Siswa.can_take_exams());
        assert!(!Role::Guru.can_take_exams());
    }

    #[test]
    fn role_parses_only_known_names() {
        assert_eq!(Role::from_str("Guru"), Some(Role::Guru));
        assert_eq!(Role::from_str("guru"), None);
        assert_eq!(Role::from_str("Teacher"), None);
    }
}
