//! Persistence store abstraction
//!
//! This module defines the trait that persistence backends must implement
//! for the registry services, plus the shipped implementations:
//!
//! - [`postgres`] - PostgreSQL backed store (production)
//! - [`memory`] - in-memory store (tests, demos)
//!
//! Every method is a single logical transaction: either its full effect is
//! visible afterwards or none of it is. The store is the only shared
//! mutable state in the system; services keep no writable caches.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use crate::domain::{
    CardNumber, City, Jshshir, LocationImportRecord, LocationImportSummary, NewPatient, NewUser,
    Patient, PatientSearch, PatientUpdate, Region, RegionWithCities, Result, User, UserUpdate,
};
use async_trait::async_trait;

/// Persistence store trait
///
/// Uniqueness of `card_number` and `jshshir` is enforced at this level:
/// `insert_patient_with_card` and `insert_user` report a collision as
/// [`DmedError::AlreadyExists`](crate::domain::DmedError::AlreadyExists),
/// which is the authoritative signal - callers treat any pre-insert
/// existence check purely as an optimization.
#[async_trait]
pub trait Store: Send + Sync {
    // --- Regions and cities ---

    /// List all regions in insertion order
    async fn list_regions(&self) -> Result<Vec<Region>>;

    /// Get a region by id
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if the region does not exist.
    async fn get_region(&self, id: i64) -> Result<Option<Region>>;

    /// Get a region by id with its cities eagerly loaded
    async fn get_region_with_cities(&self, id: i64) -> Result<Option<RegionWithCities>>;

    /// Get a city by id
    async fn get_city(&self, id: i64) -> Result<Option<City>>;

    /// List all cities belonging to a region
    ///
    /// Callers are expected to have verified that the region exists.
    async fn list_cities_in_region(&self, region_id: i64) -> Result<Vec<City>>;

    /// Replace the whole location hierarchy
    ///
    /// Deletes every existing region - cascading to its cities and nulling
    /// out patient references - then inserts the given records, all in one
    /// transaction. This is a full replace, not a merge.
    ///
    /// # Returns
    ///
    /// Counts of regions and cities inserted.
    async fn replace_locations(
        &self,
        records: Vec<LocationImportRecord>,
    ) -> Result<LocationImportSummary>;

    // --- Patients and medical cards ---

    /// Find patients matching the given filters, in insertion order
    ///
    /// `search` matches case-insensitively as a substring of the first,
    /// last or middle name; `region_id`/`city_id` are exact-match filters
    /// combined with AND. The `card_number` field of the filter is ignored
    /// here - precedence handling lives in the service layer.
    async fn find_patients(&self, filter: &PatientSearch) -> Result<Vec<Patient>>;

    /// Get a patient by id, medical card attached
    async fn get_patient(&self, id: i64) -> Result<Option<Patient>>;

    /// Get the patient owning the given card number
    async fn get_patient_by_card_number(&self, card_number: &CardNumber)
        -> Result<Option<Patient>>;

    /// Insert a patient and its medical card in one transaction
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` on a `card_number` collision; the caller
    /// re-draws and retries. Neither row is visible after a failure.
    async fn insert_patient_with_card(
        &self,
        patient: NewPatient,
        card_number: CardNumber,
    ) -> Result<Patient>;

    /// Apply a partial update to a patient
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the patient does not exist.
    async fn update_patient(&self, id: i64, update: PatientUpdate) -> Result<Patient>;

    /// Delete a patient, cascading to its medical card
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the patient does not exist.
    async fn delete_patient(&self, id: i64) -> Result<()>;

    /// Check whether a card number is already in use
    async fn card_number_exists(&self, card_number: &CardNumber) -> Result<bool>;

    /// List every card number in use (bulk-preload allocation strategy)
    async fn list_card_numbers(&self) -> Result<Vec<CardNumber>>;

    // --- Users ---

    /// List all users in insertion order
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Get a user by id
    async fn get_user(&self, id: i64) -> Result<Option<User>>;

    /// Get a user by JSHSHIR
    async fn get_user_by_jshshir(&self, jshshir: &Jshshir) -> Result<Option<User>>;

    /// Insert a new user with the given generated password
    ///
    /// # Errors
    ///
    /// Returns `AlreadyExists` on a `jshshir` collision; create-or-merge
    /// falls back to a role merge when it loses that race.
    async fn insert_user(&self, user: NewUser, password: String) -> Result<User>;

    /// Apply a partial update to a user
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist, `AlreadyExists` if a
    /// jshshir change collides with another user.
    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<User>;

    /// Delete a user
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the user does not exist.
    async fn delete_user(&self, id: i64) -> Result<()>;
}
