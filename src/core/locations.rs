//! Location directory service
//!
//! Read-mostly region/city hierarchy plus the destructive bulk import used
//! to refresh the reference data.

use crate::domain::{
    City, DmedError, LocationImportRecord, LocationImportSummary, Region, RegionWithCities,
    Result,
};
use crate::store::Store;
use std::sync::Arc;

/// Location directory service
pub struct LocationService {
    store: Arc<dyn Store>,
}

impl LocationService {
    /// Create a new location service on top of a store
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// List all regions
    pub async fn list_regions(&self) -> Result<Vec<Region>> {
        tracing::info!("Fetching all regions");
        self.store.list_regions().await
    }

    /// Get a region by id
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the region does not exist.
    pub async fn get_region(&self, id: i64) -> Result<Region> {
        self.store
            .get_region(id)
            .await?
            .ok_or_else(|| DmedError::not_found("Region", id))
    }

    /// Get a region with its cities eagerly loaded
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the region does not exist.
    pub async fn get_region_with_cities(&self, id: i64) -> Result<RegionWithCities> {
        self.store
            .get_region_with_cities(id)
            .await?
            .ok_or_else(|| DmedError::not_found("Region", id))
    }

    /// List all cities in a region
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the region does not exist.
    pub async fn list_cities(&self, region_id: i64) -> Result<Vec<City>> {
        tracing::info!(region_id, "Fetching cities for region");
        self.get_region(region_id).await?;
        self.store.list_cities_in_region(region_id).await
    }

    /// Replace the whole location hierarchy with the given records
    ///
    /// This is a destructive full replace, not a merge: every existing
    /// region and city is deleted first (patients referencing them get
    /// their references nulled), then the new set is inserted. Callers rely
    /// on stale-row removal, so this must never silently turn into a merge.
    pub async fn import(
        &self,
        records: Vec<LocationImportRecord>,
    ) -> Result<LocationImportSummary> {
        tracing::info!(records = records.len(), "Starting location import (full replace)");

        let summary = self.store.replace_locations(records).await?;

        tracing::info!(
            regions = summary.regions,
            cities = summary.cities,
            "Location import completed"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> LocationService {
        LocationService::new(Arc::new(MemoryStore::new()))
    }

    fn records() -> Vec<LocationImportRecord> {
        vec![
            LocationImportRecord {
                region: "Tashkent".to_string(),
                cities: vec!["Chilonzor".to_string(), "Yunusobod".to_string()],
            },
            LocationImportRecord {
                region: "Samarkand".to_string(),
                cities: vec!["Urgut".to_string()],
            },
        ]
    }

    #[tokio::test]
    async fn test_import_reports_counts() {
        let service = service();
        let summary = service.import(records()).await.unwrap();
        assert_eq!(summary.regions, 2);
        assert_eq!(summary.cities, 3);
    }

    #[tokio::test]
    async fn test_import_is_full_replace() {
        let service = service();
        service.import(records()).await.unwrap();
        let summary = service
            .import(vec![LocationImportRecord {
                region: "Navoi".to_string(),
                cities: vec![],
            }])
            .await
            .unwrap();

        assert_eq!(summary.regions, 1);
        let regions = service.list_regions().await.unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].name, "Navoi");
    }

    #[tokio::test]
    async fn test_cities_of_missing_region_is_not_found() {
        let service = service();
        let err = service.list_cities(12).await.unwrap_err();
        assert!(matches!(err, DmedError::NotFound { resource: "Region", id: 12 }));
    }

    #[tokio::test]
    async fn test_region_with_cities_loads_only_its_cities() {
        let service = service();
        service.import(records()).await.unwrap();
        let regions = service.list_regions().await.unwrap();

        let tashkent = service
            .get_region_with_cities(regions[0].id)
            .await
            .unwrap();
        assert_eq!(tashkent.cities.len(), 2);
        assert!(tashkent.cities.iter().all(|c| c.region_id == regions[0].id));
    }
}
