//! Medical card domain model

use super::ids::CardNumber;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A patient's medical card
///
/// Created exactly once, together with its owning patient, and never
/// updated afterwards. Deleted only when the patient is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalCard {
    pub id: i64,
    pub card_number: CardNumber,
    pub patient_id: i64,
    pub created_at: DateTime<Utc>,
}
