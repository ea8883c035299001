//! Patient domain model
//!
//! A patient owns exactly one medical card, created together with the
//! patient row. The region/city references are weak: deleting a region or
//! city nulls them out rather than deleting the patient.

use super::ids::CardNumber;
use super::medical_card::MedicalCard;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Patient gender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => Err(format!("Invalid gender '{other}'. Must be male or female")),
        }
    }
}

/// A registered patient with their medical card attached
///
/// Reads always return the card eagerly; a patient without a card is never
/// observable through the service layer because both rows are written in a
/// single store transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub phone: Option<String>,
    /// Weak reference, nulled when the region is deleted
    pub region_id: Option<i64>,
    /// Weak reference, nulled when the city is deleted
    pub city_id: Option<i64>,
    pub address: Option<String>,
    pub medical_card: Option<MedicalCard>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPatient {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub region_id: Option<i64>,
    #[serde(default)]
    pub city_id: Option<i64>,
    #[serde(default)]
    pub address: Option<String>,
}

impl NewPatient {
    /// Validates field-level constraints (referential checks live in the
    /// service layer, where the store can be consulted)
    pub fn validate(&self) -> Result<(), String> {
        if self.first_name.trim().is_empty() {
            return Err("first_name must not be empty".to_string());
        }
        if self.last_name.trim().is_empty() {
            return Err("last_name must not be empty".to_string());
        }
        Ok(())
    }
}

/// Partial patient update
///
/// `None` means "leave the field untouched". Clearing an optional field is
/// not expressible through this type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientUpdate {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub region_id: Option<i64>,
    #[serde(default)]
    pub city_id: Option<i64>,
    #[serde(default)]
    pub address: Option<String>,
}

/// Patient search filters
///
/// A present `card_number` takes precedence over every other filter. The
/// remaining filters combine with AND; `search` matches case-insensitively
/// as a substring of the first, last or middle name.
#[derive(Debug, Clone, Default)]
pub struct PatientSearch {
    pub search: Option<String>,
    pub region_id: Option<i64>,
    pub city_id: Option<i64>,
    pub card_number: Option<CardNumber>,
}

impl PatientSearch {
    /// Drops empty-string filters so "no value" and "blank value" behave
    /// the same way
    pub fn normalized(mut self) -> Self {
        if matches!(self.search.as_deref(), Some(s) if s.trim().is_empty()) {
            self.search = None;
        }
        self
    }
}
