//! Import locations command implementation
//!
//! This module implements the `import-locations` admin command: it reads a
//! JSON file of regions and their cities and replaces the whole location
//! hierarchy with it.

use crate::config::load_config;
use crate::core::LocationService;
use crate::domain::LocationImportRecord;
use crate::store::postgres::{PostgresClient, PostgresStore};
use clap::Args;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Arguments for the import-locations command
#[derive(Args, Debug)]
pub struct ImportLocationsArgs {
    /// Path to the JSON file with regions and cities
    pub file: String,

    /// Skip the destructive-operation confirmation
    #[arg(long)]
    pub yes: bool,
}

impl ImportLocationsArgs {
    /// Execute the import-locations command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(file = %self.file, "Importing locations");

        println!("🗺  Importing locations from: {}", self.file);
        println!();

        if !self.yes {
            println!("⚠️  This is a FULL REPLACE: all existing regions and cities will be");
            println!("   deleted first, and patients referencing them will lose those");
            println!("   references. Re-run with --yes to proceed.");
            return Ok(2);
        }

        // Read and parse the import file
        let path = Path::new(&self.file);
        if !path.exists() {
            println!("❌ Import file not found: {}", self.file);
            return Ok(2);
        }
        let contents = fs::read_to_string(path)?;
        let records: Vec<LocationImportRecord> = match serde_json::from_str(&contents) {
            Ok(records) => records,
            Err(e) => {
                println!("❌ Failed to parse import file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        // Load configuration
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        // Connect and make sure the schema is in place
        let client = match PostgresClient::new(config.database) {
            Ok(client) => client,
            Err(e) => {
                println!("❌ Failed to create database client");
                println!("   Error: {e}");
                return Ok(4); // Connection error exit code
            }
        };
        if let Err(e) = client.ensure_schema().await {
            println!("❌ Failed to initialize database schema");
            println!("   Error: {e}");
            return Ok(4);
        }

        let service = LocationService::new(Arc::new(PostgresStore::new(client)));
        match service.import(records).await {
            Ok(summary) => {
                println!("✅ Import successful");
                println!("   Regions: {}", summary.regions);
                println!("   Cities: {}", summary.cities);
                Ok(0)
            }
            Err(e) => {
                println!("❌ Import failed");
                println!("   Error: {e}");
                Ok(5) // Fatal error exit code
            }
        }
    }
}
