//! Staff user domain model
//!
//! Users are keyed by their JSHSHIR; a "create" for an existing JSHSHIR
//! merges roles into the existing row instead of failing (see
//! `core::users`).

use super::ids::Jshshir;
use super::patient::Gender;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Staff job function
///
/// A user may hold several roles simultaneously; the set collapses
/// duplicates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Manager,
    Doctor,
    Nurse,
    Receptionist,
    PatronageNurse,
}

impl Role {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Receptionist => "receptionist",
            Role::PatronageNurse => "patronage_nurse",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manager" => Ok(Role::Manager),
            "doctor" => Ok(Role::Doctor),
            "nurse" => Ok(Role::Nurse),
            "receptionist" => Ok(Role::Receptionist),
            "patronage_nurse" => Ok(Role::PatronageNurse),
            other => Err(format!(
                "Invalid role '{other}'. Must be one of: manager, doctor, nurse, receptionist, patronage_nurse"
            )),
        }
    }
}

/// A staff user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub full_name: String,
    /// Unique across all users
    pub jshshir: Jshshir,
    /// Six generated digits, stored as given out (see DESIGN.md on the
    /// plaintext storage finding)
    pub password: String,
    pub roles: BTreeSet<Role>,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a user (the password is generated, not supplied)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub full_name: String,
    pub jshshir: Jshshir,
    pub roles: BTreeSet<Role>,
    pub gender: Gender,
    pub birth_date: NaiveDate,
    #[serde(default)]
    pub phone: Option<String>,
}

impl NewUser {
    /// Validates field-level constraints
    pub fn validate(&self) -> Result<(), String> {
        if self.full_name.trim().is_empty() {
            return Err("full_name must not be empty".to_string());
        }
        if self.roles.is_empty() {
            return Err("roles must not be empty".to_string());
        }
        Ok(())
    }
}

/// Partial user update
///
/// `None` leaves the field untouched. Unlike create-or-merge, a `roles`
/// value here replaces the whole set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub jshshir: Option<Jshshir>,
    #[serde(default)]
    pub roles: Option<BTreeSet<Role>>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub phone: Option<String>,
}
