// Dmed - Clinical Registry Backend
// Copyright (c) 2025 Dmed Contributors
// Licensed under the MIT License

//! # Dmed - Clinical Registry Backend
//!
//! Dmed is the core of a clinical registry: it manages patients and their
//! medical cards, a region/city location hierarchy, and staff users with
//! role assignments.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Registering** patients with an automatically allocated, globally
//!   unique medical card number (`AB1234` style)
//! - **Validating** patient locations against the region/city hierarchy
//! - **Managing** staff users keyed by their JSHSHIR, with idempotent
//!   role merging on repeated creation
//! - **Refreshing** the location reference data through a destructive
//!   full-replace import
//!
//! ## Architecture
//!
//! Dmed follows a layered architecture:
//!
//! - [`cli`] - Administrative command-line interface
//! - [`core`] - Business logic (patients, users, locations, identifiers)
//! - [`store`] - Persistence trait with PostgreSQL and in-memory backends
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! Transport concerns (HTTP routing, JWT issuance, request schemas) live in
//! a separate boundary layer; the services here return plain domain results
//! and typed errors.
//!
//! ## Quick Start
//!
//! ```
//! use dmed::core::PatientService;
//! use dmed::domain::{Gender, NewPatient};
//! use dmed::store::MemoryStore;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> dmed::domain::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let patients = PatientService::new(store);
//!
//! let patient = patients
//!     .create(NewPatient {
//!         first_name: "Aziza".to_string(),
//!         last_name: "Karimova".to_string(),
//!         middle_name: None,
//!         birth_date: chrono::NaiveDate::from_ymd_opt(1992, 11, 3).unwrap(),
//!         gender: Gender::Female,
//!         phone: None,
//!         region_id: None,
//!         city_id: None,
//!         address: None,
//!     })
//!     .await?;
//!
//! let card = patient.medical_card.expect("created with a card");
//! assert_eq!(card.card_number.as_str().len(), 6);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Dmed uses the [`domain::DmedError`] type for all errors; each variant
//! maps to a distinct caller-facing outcome:
//!
//! ```rust,no_run
//! use dmed::domain::DmedError;
//!
//! fn example() -> Result<(), DmedError> {
//!     // Errors are automatically converted using the ? operator
//!     let config = dmed::config::load_config("dmed.toml")?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! Dmed uses structured logging with the `tracing` crate:
//!
//! ```rust,no_run
//! use tracing::{info, warn, error};
//!
//! info!("Starting import");
//! warn!(region_id = 3, "Region has no cities");
//! error!(error = "connection refused", "Store unavailable");
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
pub mod store;
