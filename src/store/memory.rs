//! In-memory store implementation
//!
//! Backs the unit and integration test suites and the demo setup. Implements
//! the same observable contract as the PostgreSQL store, including cascade
//! and set-null semantics, so service tests exercise realistic behavior
//! without a database.

use crate::domain::{
    CardNumber, City, DmedError, Jshshir, LocationImportRecord, LocationImportSummary,
    MedicalCard, NewPatient, NewUser, Patient, PatientSearch, PatientUpdate, Region,
    RegionWithCities, Result, User, UserUpdate,
};
use crate::store::Store;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// In-memory store
///
/// All tables live behind a single `RwLock`, which makes every method a
/// serialized transaction - mirroring the per-operation commit the
/// PostgreSQL store gets from the database.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    regions: BTreeMap<i64, Region>,
    cities: BTreeMap<i64, City>,
    patients: BTreeMap<i64, Patient>,
    cards: BTreeMap<i64, MedicalCard>,
    users: BTreeMap<i64, User>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn card_for_patient(&self, patient_id: i64) -> Option<MedicalCard> {
        self.cards.values().find(|c| c.patient_id == patient_id).cloned()
    }

    fn with_card(&self, patient: &Patient) -> Patient {
        let mut patient = patient.clone();
        patient.medical_card = self.card_for_patient(patient.id);
        patient
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

fn name_matches(needle: &str, patient: &Patient) -> bool {
    let needle = needle.to_lowercase();
    patient.first_name.to_lowercase().contains(&needle)
        || patient.last_name.to_lowercase().contains(&needle)
        || patient
            .middle_name
            .as_deref()
            .map(|m| m.to_lowercase().contains(&needle))
            .unwrap_or(false)
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_regions(&self) -> Result<Vec<Region>> {
        let tables = self.inner.read().await;
        Ok(tables.regions.values().cloned().collect())
    }

    async fn get_region(&self, id: i64) -> Result<Option<Region>> {
        let tables = self.inner.read().await;
        Ok(tables.regions.get(&id).cloned())
    }

    async fn get_region_with_cities(&self, id: i64) -> Result<Option<RegionWithCities>> {
        let tables = self.inner.read().await;
        Ok(tables.regions.get(&id).map(|region| RegionWithCities {
            region: region.clone(),
            cities: tables
                .cities
                .values()
                .filter(|c| c.region_id == id)
                .cloned()
                .collect(),
        }))
    }

    async fn get_city(&self, id: i64) -> Result<Option<City>> {
        let tables = self.inner.read().await;
        Ok(tables.cities.get(&id).cloned())
    }

    async fn list_cities_in_region(&self, region_id: i64) -> Result<Vec<City>> {
        let tables = self.inner.read().await;
        Ok(tables
            .cities
            .values()
            .filter(|c| c.region_id == region_id)
            .cloned()
            .collect())
    }

    async fn replace_locations(
        &self,
        records: Vec<LocationImportRecord>,
    ) -> Result<LocationImportSummary> {
        let mut tables = self.inner.write().await;

        // Full replace: drop every region and city, null out the weak
        // references from patients.
        tables.regions.clear();
        tables.cities.clear();
        for patient in tables.patients.values_mut() {
            patient.region_id = None;
            patient.city_id = None;
        }

        let mut summary = LocationImportSummary {
            regions: 0,
            cities: 0,
        };
        for record in records {
            let region_id = tables.next_id();
            tables.regions.insert(
                region_id,
                Region {
                    id: region_id,
                    name: record.region,
                },
            );
            summary.regions += 1;
            for city_name in record.cities {
                let city_id = tables.next_id();
                tables.cities.insert(
                    city_id,
                    City {
                        id: city_id,
                        name: city_name,
                        region_id,
                    },
                );
                summary.cities += 1;
            }
        }
        Ok(summary)
    }

    async fn find_patients(&self, filter: &PatientSearch) -> Result<Vec<Patient>> {
        let tables = self.inner.read().await;
        Ok(tables
            .patients
            .values()
            .filter(|p| match filter.search.as_deref() {
                Some(needle) => name_matches(needle, p),
                None => true,
            })
            .filter(|p| match filter.region_id {
                Some(region_id) => p.region_id == Some(region_id),
                None => true,
            })
            .filter(|p| match filter.city_id {
                Some(city_id) => p.city_id == Some(city_id),
                None => true,
            })
            .map(|p| tables.with_card(p))
            .collect())
    }

    async fn get_patient(&self, id: i64) -> Result<Option<Patient>> {
        let tables = self.inner.read().await;
        Ok(tables.patients.get(&id).map(|p| tables.with_card(p)))
    }

    async fn get_patient_by_card_number(
        &self,
        card_number: &CardNumber,
    ) -> Result<Option<Patient>> {
        let tables = self.inner.read().await;
        let card = tables
            .cards
            .values()
            .find(|c| &c.card_number == card_number);
        Ok(card.and_then(|c| tables.patients.get(&c.patient_id).map(|p| tables.with_card(p))))
    }

    async fn insert_patient_with_card(
        &self,
        patient: NewPatient,
        card_number: CardNumber,
    ) -> Result<Patient> {
        let mut tables = self.inner.write().await;

        // The unique constraint on card_number is authoritative; report the
        // collision so the caller can re-draw.
        if tables.cards.values().any(|c| c.card_number == card_number) {
            return Err(DmedError::already_exists(
                "MedicalCard",
                "card_number",
                card_number.as_str(),
            ));
        }

        let now = Utc::now();
        let patient_id = tables.next_id();
        let card_id = tables.next_id();
        let card = MedicalCard {
            id: card_id,
            card_number,
            patient_id,
            created_at: now,
        };
        let row = Patient {
            id: patient_id,
            first_name: patient.first_name,
            last_name: patient.last_name,
            middle_name: patient.middle_name,
            birth_date: patient.birth_date,
            gender: patient.gender,
            phone: patient.phone,
            region_id: patient.region_id,
            city_id: patient.city_id,
            address: patient.address,
            medical_card: None,
            created_at: now,
            updated_at: now,
        };
        tables.patients.insert(patient_id, row.clone());
        tables.cards.insert(card_id, card.clone());

        let mut created = row;
        created.medical_card = Some(card);
        Ok(created)
    }

    async fn update_patient(&self, id: i64, update: PatientUpdate) -> Result<Patient> {
        let mut tables = self.inner.write().await;
        let patient = tables
            .patients
            .get_mut(&id)
            .ok_or_else(|| DmedError::not_found("Patient", id))?;

        if let Some(first_name) = update.first_name {
            patient.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            patient.last_name = last_name;
        }
        if let Some(middle_name) = update.middle_name {
            patient.middle_name = Some(middle_name);
        }
        if let Some(birth_date) = update.birth_date {
            patient.birth_date = birth_date;
        }
        if let Some(gender) = update.gender {
            patient.gender = gender;
        }
        if let Some(phone) = update.phone {
            patient.phone = Some(phone);
        }
        if let Some(region_id) = update.region_id {
            patient.region_id = Some(region_id);
        }
        if let Some(city_id) = update.city_id {
            patient.city_id = Some(city_id);
        }
        if let Some(address) = update.address {
            patient.address = Some(address);
        }
        patient.updated_at = Utc::now();

        let updated = patient.clone();
        Ok(tables.with_card(&updated))
    }

    async fn delete_patient(&self, id: i64) -> Result<()> {
        let mut tables = self.inner.write().await;
        if tables.patients.remove(&id).is_none() {
            return Err(DmedError::not_found("Patient", id));
        }
        // Cascade to the medical card.
        tables.cards.retain(|_, c| c.patient_id != id);
        Ok(())
    }

    async fn card_number_exists(&self, card_number: &CardNumber) -> Result<bool> {
        let tables = self.inner.read().await;
        Ok(tables.cards.values().any(|c| &c.card_number == card_number))
    }

    async fn list_card_numbers(&self) -> Result<Vec<CardNumber>> {
        let tables = self.inner.read().await;
        Ok(tables.cards.values().map(|c| c.card_number.clone()).collect())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let tables = self.inner.read().await;
        Ok(tables.users.values().cloned().collect())
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn get_user_by_jshshir(&self, jshshir: &Jshshir) -> Result<Option<User>> {
        let tables = self.inner.read().await;
        Ok(tables.users.values().find(|u| &u.jshshir == jshshir).cloned())
    }

    async fn insert_user(&self, user: NewUser, password: String) -> Result<User> {
        let mut tables = self.inner.write().await;

        if tables.users.values().any(|u| u.jshshir == user.jshshir) {
            return Err(DmedError::already_exists(
                "User",
                "jshshir",
                user.jshshir.as_str(),
            ));
        }

        let now = Utc::now();
        let id = tables.next_id();
        let row = User {
            id,
            full_name: user.full_name,
            jshshir: user.jshshir,
            password,
            roles: user.roles,
            gender: user.gender,
            birth_date: user.birth_date,
            phone: user.phone,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, row.clone());
        Ok(row)
    }

    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<User> {
        let mut tables = self.inner.write().await;

        if let Some(ref jshshir) = update.jshshir {
            if tables
                .users
                .values()
                .any(|u| u.id != id && &u.jshshir == jshshir)
            {
                return Err(DmedError::already_exists(
                    "User",
                    "jshshir",
                    jshshir.as_str(),
                ));
            }
        }

        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| DmedError::not_found("User", id))?;

        if let Some(full_name) = update.full_name {
            user.full_name = full_name;
        }
        if let Some(jshshir) = update.jshshir {
            user.jshshir = jshshir;
        }
        if let Some(roles) = update.roles {
            user.roles = roles;
        }
        if let Some(gender) = update.gender {
            user.gender = gender;
        }
        if let Some(birth_date) = update.birth_date {
            user.birth_date = birth_date;
        }
        if let Some(phone) = update.phone {
            user.phone = Some(phone);
        }
        user.updated_at = Utc::now();

        Ok(user.clone())
    }

    async fn delete_user(&self, id: i64) -> Result<()> {
        let mut tables = self.inner.write().await;
        if tables.users.remove(&id).is_none() {
            return Err(DmedError::not_found("User", id));
        }
        Ok(())
    }
}
