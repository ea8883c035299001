//! Domain models and types for Dmed.
//!
//! This module contains the core domain models, types, and business rules of
//! the clinical registry: patients and their medical cards, the region/city
//! location hierarchy, and staff users with role assignments.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`CardNumber`], [`Jshshir`])
//! - **Domain models** ([`Patient`], [`MedicalCard`], [`Region`], [`City`],
//!   [`User`])
//! - **Error types** ([`DmedError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! Natural keys use the newtype pattern so a card number can never be passed
//! where a JSHSHIR is expected:
//!
//! ```rust
//! use dmed::domain::{CardNumber, Jshshir};
//!
//! # fn example() -> Result<(), String> {
//! let card = CardNumber::new("AB1234")?;
//! let jshshir = Jshshir::new("12345678901234")?;
//!
//! // This won't compile - type safety prevents mixing identifiers
//! // let wrong: CardNumber = jshshir;  // Compile error!
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, DmedError>`]; each error
//! variant maps to a distinct caller-facing outcome (not-found, validation,
//! conflict, exhausted retries, store failure).

pub mod errors;
pub mod ids;
pub mod location;
pub mod medical_card;
pub mod patient;
pub mod result;
pub mod user;

// Re-export commonly used types for convenience
pub use errors::DmedError;
pub use ids::{CardNumber, Jshshir};
pub use location::{City, LocationImportRecord, LocationImportSummary, Region, RegionWithCities};
pub use medical_card::MedicalCard;
pub use patient::{Gender, NewPatient, Patient, PatientSearch, PatientUpdate};
pub use result::Result;
pub use user::{NewUser, Role, User, UserUpdate};
