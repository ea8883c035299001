//! Region and city domain models
//!
//! Regions own their cities exclusively: deleting a region deletes its
//! cities. Patients reference both weakly.

use serde::{Deserialize, Serialize};

/// Administrative region (top level of the location hierarchy)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: i64,
    /// Unique across all regions
    pub name: String,
}

/// City within a region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: i64,
    pub name: String,
    pub region_id: i64,
}

/// Region with its cities eagerly loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionWithCities {
    #[serde(flatten)]
    pub region: Region,
    pub cities: Vec<City>,
}

/// One record of the bulk location import file
///
/// The upstream reference file misspells the region key as "reqion" in some
/// entries, so both spellings are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationImportRecord {
    #[serde(rename = "region", alias = "reqion")]
    pub region: String,
    #[serde(default)]
    pub cities: Vec<String>,
}

/// Counts reported by a completed bulk import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationImportSummary {
    pub regions: usize,
    pub cities: usize,
}
