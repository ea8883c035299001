//! Patient registry service
//!
//! Orchestrates the patient lifecycle: location validation, atomic
//! patient-plus-card creation with unique card number allocation, partial
//! updates, cascade delete, and filtered search.

use crate::core::identifier::{self, CARD_ALLOCATION_ATTEMPTS};
use crate::domain::{
    DmedError, NewPatient, Patient, PatientSearch, PatientUpdate, Result,
};
use crate::store::Store;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Patient registry service
pub struct PatientService {
    store: Arc<dyn Store>,
}

impl PatientService {
    /// Create a new patient service on top of a store
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Search patients with optional filters
    ///
    /// A present `card_number` takes precedence: the result is the single
    /// owning patient (or empty), and every other filter is ignored.
    pub async fn search(&self, filter: PatientSearch) -> Result<Vec<Patient>> {
        let filter = filter.normalized();
        tracing::info!(
            search = ?filter.search,
            region_id = ?filter.region_id,
            city_id = ?filter.city_id,
            card_number = ?filter.card_number,
            "Searching patients"
        );

        if let Some(ref card_number) = filter.card_number {
            return Ok(self
                .store
                .get_patient_by_card_number(card_number)
                .await?
                .map(|patient| vec![patient])
                .unwrap_or_default());
        }

        self.store.find_patients(&filter).await
    }

    /// Get a patient by id
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the patient does not exist.
    pub async fn get(&self, id: i64) -> Result<Patient> {
        self.store
            .get_patient(id)
            .await?
            .ok_or_else(|| DmedError::not_found("Patient", id))
    }

    /// Create a patient with an automatically allocated medical card
    ///
    /// Validates the region/city references, then loops: allocate a free
    /// card number (existence pre-check is an optimization), insert patient
    /// and card in one store transaction, and re-draw if the insert reports
    /// a card-number collision the pre-check missed. The patient is never
    /// visible without its card.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for bad location references,
    /// `ExhaustedRetries` when no free card number was found within the
    /// attempt budget.
    pub async fn create(&self, fields: NewPatient) -> Result<Patient> {
        tracing::info!(
            first_name = %fields.first_name,
            last_name = %fields.last_name,
            "Creating patient"
        );

        fields.validate().map_err(DmedError::Validation)?;
        self.validate_location(fields.region_id, fields.city_id, None)
            .await?;

        let mut rng = StdRng::from_entropy();
        let store = &self.store;

        for _ in 0..CARD_ALLOCATION_ATTEMPTS {
            let card_number =
                identifier::allocate_card_number(&mut rng, |candidate| async move {
                    store.card_number_exists(&candidate).await
                })
                .await?;

            match store
                .insert_patient_with_card(fields.clone(), card_number.clone())
                .await
            {
                Ok(patient) => {
                    tracing::info!(
                        patient_id = patient.id,
                        card_number = %card_number,
                        "Patient created successfully"
                    );
                    return Ok(patient);
                }
                Err(DmedError::AlreadyExists {
                    field: "card_number",
                    ..
                }) => {
                    // Lost a concurrent allocation race; the constraint is
                    // the source of truth, so draw again.
                    tracing::warn!(
                        card_number = %card_number,
                        "Card number collided at insert time, re-drawing"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(DmedError::ExhaustedRetries {
            operation: "medical card number allocation",
            attempts: CARD_ALLOCATION_ATTEMPTS,
        })
    }

    /// Apply a partial update to a patient
    ///
    /// Location validation mirrors create, except that a supplied city is
    /// checked against the update's region when present and the patient's
    /// current region otherwise.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the patient does not exist, `Validation` for
    /// bad location references.
    pub async fn update(&self, id: i64, update: PatientUpdate) -> Result<Patient> {
        tracing::info!(patient_id = id, "Updating patient");

        let patient = self.get(id).await?;
        self.validate_location(update.region_id, update.city_id, patient.region_id)
            .await?;

        let updated = self.store.update_patient(id, update).await?;
        tracing::info!(patient_id = id, "Patient updated successfully");
        Ok(updated)
    }

    /// Delete a patient; the medical card goes with it
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the patient does not exist.
    pub async fn delete(&self, id: i64) -> Result<()> {
        tracing::info!(patient_id = id, "Deleting patient");
        self.get(id).await?;
        self.store.delete_patient(id).await?;
        tracing::info!(patient_id = id, "Patient deleted successfully");
        Ok(())
    }

    /// Validate region/city references against the store
    ///
    /// A supplied city must exist and belong to the effective region - the
    /// supplied one when present, otherwise `fallback_region` (the
    /// patient's current region during updates).
    async fn validate_location(
        &self,
        region_id: Option<i64>,
        city_id: Option<i64>,
        fallback_region: Option<i64>,
    ) -> Result<()> {
        if let Some(region_id) = region_id {
            self.store.get_region(region_id).await?.ok_or_else(|| {
                DmedError::Validation(format!("Region with id={region_id} not found"))
            })?;
        }

        if let Some(city_id) = city_id {
            let city = self.store.get_city(city_id).await?.ok_or_else(|| {
                DmedError::Validation(format!("City with id={city_id} not found"))
            })?;

            if let Some(region_id) = region_id.or(fallback_region) {
                if city.region_id != region_id {
                    return Err(DmedError::Validation(format!(
                        "City with id={city_id} does not belong to region with id={region_id}"
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Gender, LocationImportRecord};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;

    fn service() -> (PatientService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (PatientService::new(store.clone()), store)
    }

    fn fields() -> NewPatient {
        NewPatient {
            first_name: "Aziza".to_string(),
            last_name: "Karimova".to_string(),
            middle_name: Some("Botirovna".to_string()),
            birth_date: NaiveDate::from_ymd_opt(1992, 11, 3).unwrap(),
            gender: Gender::Female,
            phone: Some("+998901234567".to_string()),
            region_id: None,
            city_id: None,
            address: None,
        }
    }

    async fn seed_locations(store: &MemoryStore) -> (i64, i64, i64) {
        store
            .replace_locations(vec![
                LocationImportRecord {
                    region: "Tashkent".to_string(),
                    cities: vec!["Chilonzor".to_string()],
                },
                LocationImportRecord {
                    region: "Samarkand".to_string(),
                    cities: vec!["Urgut".to_string()],
                },
            ])
            .await
            .unwrap();
        let regions = store.list_regions().await.unwrap();
        let city = store
            .list_cities_in_region(regions[0].id)
            .await
            .unwrap()
            .remove(0);
        (regions[0].id, regions[1].id, city.id)
    }

    #[tokio::test]
    async fn test_create_attaches_medical_card() {
        let (service, _) = service();
        let patient = service.create(fields()).await.unwrap();
        let card = patient.medical_card.expect("card must be attached");
        assert_eq!(card.patient_id, patient.id);
        assert_eq!(card.card_number.as_str().len(), 6);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_region() {
        let (service, _) = service();
        let mut bad = fields();
        bad.region_id = Some(999);
        let err = service.create(bad).await.unwrap_err();
        assert!(matches!(err, DmedError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_rejects_city_outside_region() {
        let (service, store) = service();
        let (_tashkent, samarkand, chilonzor) = seed_locations(&store).await;

        let mut bad = fields();
        bad.region_id = Some(samarkand);
        bad.city_id = Some(chilonzor);
        let err = service.create(bad).await.unwrap_err();
        assert!(matches!(err, DmedError::Validation(_)));
        assert!(err.to_string().contains("does not belong to region"));
    }

    #[tokio::test]
    async fn test_create_accepts_matching_region_and_city() {
        let (service, store) = service();
        let (tashkent, _samarkand, chilonzor) = seed_locations(&store).await;

        let mut good = fields();
        good.region_id = Some(tashkent);
        good.city_id = Some(chilonzor);
        let patient = service.create(good).await.unwrap();
        assert_eq!(patient.region_id, Some(tashkent));
        assert_eq!(patient.city_id, Some(chilonzor));
    }

    #[tokio::test]
    async fn test_update_validates_city_against_current_region() {
        let (service, store) = service();
        let (tashkent, samarkand, chilonzor) = seed_locations(&store).await;

        let mut with_region = fields();
        with_region.region_id = Some(samarkand);
        let patient = service.create(with_region).await.unwrap();

        // The update supplies only a city; it must be checked against the
        // patient's current region and fail.
        let err = service
            .update(
                patient.id,
                PatientUpdate {
                    city_id: Some(chilonzor),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DmedError::Validation(_)));

        // Supplying the matching region alongside the city succeeds.
        let updated = service
            .update(
                patient.id,
                PatientUpdate {
                    region_id: Some(tashkent),
                    city_id: Some(chilonzor),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.region_id, Some(tashkent));
        assert_eq!(updated.city_id, Some(chilonzor));
    }

    #[tokio::test]
    async fn test_update_missing_patient_is_not_found() {
        let (service, _) = service();
        let err = service
            .update(404, PatientUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DmedError::NotFound { resource: "Patient", id: 404 }));
    }

    #[tokio::test]
    async fn test_delete_cascades_and_reports_missing() {
        let (service, store) = service();
        let patient = service.create(fields()).await.unwrap();
        let card_number = patient.medical_card.as_ref().unwrap().card_number.clone();

        service.delete(patient.id).await.unwrap();
        assert!(!store.card_number_exists(&card_number).await.unwrap());

        let err = service.delete(patient.id).await.unwrap_err();
        assert!(matches!(err, DmedError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_search_card_number_takes_precedence() {
        let (service, _) = service();
        let p1 = service.create(fields()).await.unwrap();
        let mut other = fields();
        other.first_name = "Karim".to_string();
        other.last_name = "Toshev".to_string();
        service.create(other).await.unwrap();

        let card = p1.medical_card.as_ref().unwrap().card_number.clone();
        let found = service
            .search(PatientSearch {
                // This text matches neither patient, but the card number wins.
                search: Some("nonmatching".to_string()),
                card_number: Some(card),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, p1.id);
    }

    #[tokio::test]
    async fn test_search_unknown_card_number_is_empty() {
        let (service, _) = service();
        service.create(fields()).await.unwrap();
        let found = service
            .search(PatientSearch {
                card_number: Some("ZZ0000".parse().unwrap()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
