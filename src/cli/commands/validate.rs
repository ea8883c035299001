//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Dmed configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Load configuration (validation happens on load)
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!(
            "  Allowed Origins: {}",
            if config.application.allowed_origins.is_empty() {
                "(none)".to_string()
            } else {
                config.application.allowed_origins.join(", ")
            }
        );
        println!(
            "  Database: {}",
            config
                .database
                .url
                .split('@')
                .next_back()
                .unwrap_or("***")
        );
        println!("  Max Connections: {}", config.database.max_connections);
        println!("  Admin User: {}", config.admin.username);
        println!(
            "  File Logging: {}",
            if config.logging.local_enabled {
                format!("{} ({})", config.logging.local_path, config.logging.local_rotation)
            } else {
                "disabled".to_string()
            }
        );

        Ok(0)
    }
}
