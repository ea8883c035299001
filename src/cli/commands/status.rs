//! Status command implementation
//!
//! This module implements the `status` command for displaying registry
//! row counts.

use crate::config::load_config;
use crate::core::{LocationService, PatientService, UserService};
use crate::domain::PatientSearch;
use crate::store::postgres::{PostgresClient, PostgresStore};
use clap::Args;
use std::sync::Arc;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking registry status");

        println!("📊 Registry Status");
        println!();

        // Load configuration
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        // Connect to the database
        let client = match PostgresClient::new(config.database) {
            Ok(client) => client,
            Err(e) => {
                println!("❌ Failed to create database client");
                println!("   Error: {e}");
                return Ok(4); // Connection error exit code
            }
        };
        if let Err(e) = client.test_connection().await {
            println!("❌ Failed to connect to database");
            println!("   Error: {e}");
            return Ok(4);
        }

        let store = Arc::new(PostgresStore::new(client));
        let locations = LocationService::new(store.clone());
        let patients = PatientService::new(store.clone());
        let users = UserService::new(store);

        let regions = match locations.list_regions().await {
            Ok(regions) => regions,
            Err(e) => {
                println!("❌ Failed to load regions");
                println!("   Error: {e}");
                return Ok(5); // Fatal error exit code
            }
        };
        let patient_rows = match patients.search(PatientSearch::default()).await {
            Ok(rows) => rows,
            Err(e) => {
                println!("❌ Failed to load patients");
                println!("   Error: {e}");
                return Ok(5);
            }
        };
        let user_rows = match users.list().await {
            Ok(rows) => rows,
            Err(e) => {
                println!("❌ Failed to load users");
                println!("   Error: {e}");
                return Ok(5);
            }
        };

        println!("  Regions: {}", regions.len());
        println!("  Patients: {}", patient_rows.len());
        println!("  Users: {}", user_rows.len());
        println!();
        println!("✅ Registry reachable");

        Ok(0)
    }
}
