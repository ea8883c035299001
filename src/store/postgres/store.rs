//! PostgreSQL implementation of the store trait
//!
//! All uniqueness guarantees (card numbers, JSHSHIR) rest on the database
//! constraints declared in the schema migration; unique-violation errors
//! are translated into `AlreadyExists` so callers can react (re-draw a
//! card number, fall back to a role merge).

use crate::domain::{
    CardNumber, City, DmedError, Gender, Jshshir, LocationImportRecord, LocationImportSummary,
    MedicalCard, NewPatient, NewUser, Patient, PatientSearch, PatientUpdate, Region,
    RegionWithCities, Result, Role, User, UserUpdate,
};
use crate::store::postgres::client::PostgresClient;
use crate::store::Store;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::Row;

/// Columns of the patient/card join used by every patient read
const PATIENT_SELECT: &str = "\
    SELECT p.id, p.first_name, p.last_name, p.middle_name, p.birth_date, p.gender, \
           p.phone, p.region_id, p.city_id, p.address, p.created_at, p.updated_at, \
           mc.id AS card_id, mc.card_number, mc.created_at AS card_created_at \
    FROM patients p \
    LEFT JOIN medical_cards mc ON mc.patient_id = p.id";

const USER_SELECT: &str = "\
    SELECT id, full_name, jshshir, password, roles, gender, birth_date, phone, \
           created_at, updated_at \
    FROM users";

/// PostgreSQL store
pub struct PostgresStore {
    client: Arc<PostgresClient>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store
    pub fn new(client: PostgresClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Create a new PostgreSQL store with an Arc-wrapped client
    pub fn new_with_arc(client: Arc<PostgresClient>) -> Self {
        Self { client }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgresClient> {
        &self.client
    }
}

/// Translate a driver error into the domain error surface
///
/// Unique violations become `AlreadyExists`; everything else is a plain
/// `Database` failure.
fn map_write_error(
    err: tokio_postgres::Error,
    resource: &'static str,
    field: &'static str,
    value: &str,
) -> DmedError {
    if let Some(db_err) = err.as_db_error() {
        if db_err.code() == &SqlState::UNIQUE_VIOLATION {
            return DmedError::already_exists(resource, field, value);
        }
    }
    DmedError::Database(format!("Statement execution failed: {}", err))
}

fn parse_gender(value: String) -> Result<Gender> {
    value
        .parse()
        .map_err(|e: String| DmedError::Database(format!("Corrupt gender column: {e}")))
}

fn parse_roles(values: Vec<String>) -> Result<BTreeSet<Role>> {
    values
        .iter()
        .map(|r| {
            r.parse()
                .map_err(|e: String| DmedError::Database(format!("Corrupt roles column: {e}")))
        })
        .collect()
}

fn region_from_row(row: &Row) -> Region {
    Region {
        id: row.get("id"),
        name: row.get("name"),
    }
}

fn city_from_row(row: &Row) -> City {
    City {
        id: row.get("id"),
        name: row.get("name"),
        region_id: row.get("region_id"),
    }
}

fn patient_from_row(row: &Row) -> Result<Patient> {
    let card_id: Option<i64> = row.get("card_id");
    let medical_card = match card_id {
        Some(id) => {
            let number: String = row.get("card_number");
            Some(MedicalCard {
                id,
                card_number: CardNumber::new(number)
                    .map_err(|e| DmedError::Database(format!("Corrupt card_number column: {e}")))?,
                patient_id: row.get("id"),
                created_at: row.get("card_created_at"),
            })
        }
        None => None,
    };

    Ok(Patient {
        id: row.get("id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        middle_name: row.get("middle_name"),
        birth_date: row.get("birth_date"),
        gender: parse_gender(row.get("gender"))?,
        phone: row.get("phone"),
        region_id: row.get("region_id"),
        city_id: row.get("city_id"),
        address: row.get("address"),
        medical_card,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn user_from_row(row: &Row) -> Result<User> {
    let jshshir: String = row.get("jshshir");
    Ok(User {
        id: row.get("id"),
        full_name: row.get("full_name"),
        jshshir: Jshshir::new(jshshir)
            .map_err(|e| DmedError::Database(format!("Corrupt jshshir column: {e}")))?,
        password: row.get("password"),
        roles: parse_roles(row.get("roles"))?,
        gender: parse_gender(row.get("gender"))?,
        birth_date: row.get("birth_date"),
        phone: row.get("phone"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[async_trait]
impl Store for PostgresStore {
    async fn list_regions(&self) -> Result<Vec<Region>> {
        let rows = self
            .client
            .query("SELECT id, name FROM regions ORDER BY id", &[])
            .await?;
        Ok(rows.iter().map(region_from_row).collect())
    }

    async fn get_region(&self, id: i64) -> Result<Option<Region>> {
        let rows = self
            .client
            .query("SELECT id, name FROM regions WHERE id = $1", &[&id])
            .await?;
        Ok(rows.first().map(region_from_row))
    }

    async fn get_region_with_cities(&self, id: i64) -> Result<Option<RegionWithCities>> {
        let region = match self.get_region(id).await? {
            Some(region) => region,
            None => return Ok(None),
        };
        let cities = self.list_cities_in_region(id).await?;
        Ok(Some(RegionWithCities { region, cities }))
    }

    async fn get_city(&self, id: i64) -> Result<Option<City>> {
        let rows = self
            .client
            .query(
                "SELECT id, name, region_id FROM cities WHERE id = $1",
                &[&id],
            )
            .await?;
        Ok(rows.first().map(city_from_row))
    }

    async fn list_cities_in_region(&self, region_id: i64) -> Result<Vec<City>> {
        let rows = self
            .client
            .query(
                "SELECT id, name, region_id FROM cities WHERE region_id = $1 ORDER BY id",
                &[&region_id],
            )
            .await?;
        Ok(rows.iter().map(city_from_row).collect())
    }

    async fn replace_locations(
        &self,
        records: Vec<LocationImportRecord>,
    ) -> Result<LocationImportSummary> {
        let mut conn = self.client.get_connection().await?;
        self.client.apply_statement_timeout(&conn).await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| DmedError::Database(format!("Failed to open transaction: {}", e)))?;

        // Full replace: the delete cascades to cities and nulls out patient
        // references through the schema's foreign keys.
        tx.execute("DELETE FROM regions", &[])
            .await
            .map_err(|e| DmedError::Database(format!("Failed to clear regions: {}", e)))?;

        let mut summary = LocationImportSummary {
            regions: 0,
            cities: 0,
        };
        for record in records {
            let row = tx
                .query_one(
                    "INSERT INTO regions (name) VALUES ($1) RETURNING id",
                    &[&record.region],
                )
                .await
                .map_err(|e| map_write_error(e, "Region", "name", &record.region))?;
            let region_id: i64 = row.get("id");
            summary.regions += 1;

            for city_name in &record.cities {
                tx.execute(
                    "INSERT INTO cities (name, region_id) VALUES ($1, $2)",
                    &[city_name, &region_id],
                )
                .await
                .map_err(|e| DmedError::Database(format!("Failed to insert city: {}", e)))?;
                summary.cities += 1;
            }
        }

        tx.commit()
            .await
            .map_err(|e| DmedError::Database(format!("Failed to commit import: {}", e)))?;

        Ok(summary)
    }

    async fn find_patients(&self, filter: &PatientSearch) -> Result<Vec<Patient>> {
        let search_pattern = filter.search.as_ref().map(|s| format!("%{s}%"));

        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();

        if let Some(ref pattern) = search_pattern {
            params.push(pattern);
            let n = params.len();
            conditions.push(format!(
                "(p.first_name ILIKE ${n} OR p.last_name ILIKE ${n} OR p.middle_name ILIKE ${n})"
            ));
        }
        if let Some(ref region_id) = filter.region_id {
            params.push(region_id);
            conditions.push(format!("p.region_id = ${}", params.len()));
        }
        if let Some(ref city_id) = filter.city_id {
            params.push(city_id);
            conditions.push(format!("p.city_id = ${}", params.len()));
        }

        let mut query = PATIENT_SELECT.to_string();
        if !conditions.is_empty() {
            query.push_str(" WHERE ");
            query.push_str(&conditions.join(" AND "));
        }
        query.push_str(" ORDER BY p.id");

        let rows = self.client.query(&query, &params).await?;
        rows.iter().map(patient_from_row).collect()
    }

    async fn get_patient(&self, id: i64) -> Result<Option<Patient>> {
        let query = format!("{PATIENT_SELECT} WHERE p.id = $1");
        let rows = self.client.query(&query, &[&id]).await?;
        rows.first().map(patient_from_row).transpose()
    }

    async fn get_patient_by_card_number(
        &self,
        card_number: &CardNumber,
    ) -> Result<Option<Patient>> {
        let query = format!("{PATIENT_SELECT} WHERE mc.card_number = $1");
        let rows = self.client.query(&query, &[&card_number.as_str()]).await?;
        rows.first().map(patient_from_row).transpose()
    }

    async fn insert_patient_with_card(
        &self,
        patient: NewPatient,
        card_number: CardNumber,
    ) -> Result<Patient> {
        let mut conn = self.client.get_connection().await?;
        self.client.apply_statement_timeout(&conn).await?;
        let tx = conn
            .transaction()
            .await
            .map_err(|e| DmedError::Database(format!("Failed to open transaction: {}", e)))?;

        let row = tx
            .query_one(
                "INSERT INTO patients \
                     (first_name, last_name, middle_name, birth_date, gender, phone, \
                      region_id, city_id, address) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
                 RETURNING id, created_at, updated_at",
                &[
                    &patient.first_name,
                    &patient.last_name,
                    &patient.middle_name,
                    &patient.birth_date,
                    &patient.gender.as_str(),
                    &patient.phone,
                    &patient.region_id,
                    &patient.city_id,
                    &patient.address,
                ],
            )
            .await
            .map_err(|e| DmedError::Database(format!("Failed to insert patient: {}", e)))?;
        let patient_id: i64 = row.get("id");
        let created_at = row.get("created_at");
        let updated_at = row.get("updated_at");

        // A card-number collision aborts the transaction, so the patient row
        // from above never becomes visible on its own.
        let card_row = tx
            .query_one(
                "INSERT INTO medical_cards (card_number, patient_id) \
                 VALUES ($1, $2) RETURNING id, created_at",
                &[&card_number.as_str(), &patient_id],
            )
            .await
            .map_err(|e| map_write_error(e, "MedicalCard", "card_number", card_number.as_str()))?;

        tx.commit()
            .await
            .map_err(|e| DmedError::Database(format!("Failed to commit patient: {}", e)))?;

        Ok(Patient {
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
            medical_card: Some(MedicalCard {
                id: card_row.get("id"),
                card_number,
                patient_id,
                created_at: card_row.get("created_at"),
            }),
            created_at,
            updated_at,
        })
    }

    async fn update_patient(&self, id: i64, update: PatientUpdate) -> Result<Patient> {
        let mut assignments: Vec<String> = Vec::new();
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();

        let gender = update.gender.map(|g| g.as_str());

        macro_rules! assign {
            ($field:expr, $column:literal) => {
                if let Some(ref value) = $field {
                    params.push(value);
                    assignments.push(format!(concat!($column, " = ${}"), params.len()));
                }
            };
        }
        assign!(update.first_name, "first_name");
        assign!(update.last_name, "last_name");
        assign!(update.middle_name, "middle_name");
        assign!(update.birth_date, "birth_date");
        assign!(gender, "gender");
        assign!(update.phone, "phone");
        assign!(update.region_id, "region_id");
        assign!(update.city_id, "city_id");
        assign!(update.address, "address");

        if !assignments.is_empty() {
            assignments.push("updated_at = now()".to_string());
            params.push(&id);
            let query = format!(
                "UPDATE patients SET {} WHERE id = ${}",
                assignments.join(", "),
                params.len()
            );
            let affected = self.client.execute(&query, &params).await?;
            if affected == 0 {
                return Err(DmedError::not_found("Patient", id));
            }
        }

        self.get_patient(id)
            .await?
            .ok_or_else(|| DmedError::not_found("Patient", id))
    }

    async fn delete_patient(&self, id: i64) -> Result<()> {
        // The medical card goes with it through ON DELETE CASCADE.
        let affected = self
            .client
            .execute("DELETE FROM patients WHERE id = $1", &[&id])
            .await?;
        if affected == 0 {
            return Err(DmedError::not_found("Patient", id));
        }
        Ok(())
    }

    async fn card_number_exists(&self, card_number: &CardNumber) -> Result<bool> {
        let rows = self
            .client
            .query(
                "SELECT EXISTS(SELECT 1 FROM medical_cards WHERE card_number = $1)",
                &[&card_number.as_str()],
            )
            .await?;
        Ok(rows.first().map(|row| row.get(0)).unwrap_or(false))
    }

    async fn list_card_numbers(&self) -> Result<Vec<CardNumber>> {
        let rows = self
            .client
            .query("SELECT card_number FROM medical_cards", &[])
            .await?;
        rows.iter()
            .map(|row| {
                let number: String = row.get("card_number");
                CardNumber::new(number)
                    .map_err(|e| DmedError::Database(format!("Corrupt card_number column: {e}")))
            })
            .collect()
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let query = format!("{USER_SELECT} ORDER BY id");
        let rows = self.client.query(&query, &[]).await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        let query = format!("{USER_SELECT} WHERE id = $1");
        let rows = self.client.query(&query, &[&id]).await?;
        rows.first().map(user_from_row).transpose()
    }

    async fn get_user_by_jshshir(&self, jshshir: &Jshshir) -> Result<Option<User>> {
        let query = format!("{USER_SELECT} WHERE jshshir = $1");
        let rows = self.client.query(&query, &[&jshshir.as_str()]).await?;
        rows.first().map(user_from_row).transpose()
    }

    async fn insert_user(&self, user: NewUser, password: String) -> Result<User> {
        let roles: Vec<&str> = user.roles.iter().map(|r| r.as_str()).collect();
        let client = self.client.get_connection().await?;
        self.client.apply_statement_timeout(&client).await?;
        let row = client
            .query_one(
                "INSERT INTO users \
                     (full_name, jshshir, password, roles, gender, birth_date, phone) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 RETURNING id, created_at, updated_at",
                &[
                    &user.full_name,
                    &user.jshshir.as_str(),
                    &password,
                    &roles,
                    &user.gender.as_str(),
                    &user.birth_date,
                    &user.phone,
                ],
            )
            .await
            .map_err(|e| map_write_error(e, "User", "jshshir", user.jshshir.as_str()))?;

        Ok(User {
            id: row.get("id"),
            full_name: user.full_name,
            jshshir: user.jshshir,
            password,
            roles: user.roles,
            gender: user.gender,
            birth_date: user.birth_date,
            phone: user.phone,
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    async fn update_user(&self, id: i64, update: UserUpdate) -> Result<User> {
        let mut assignments: Vec<String> = Vec::new();
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::new();

        let jshshir = update.jshshir.as_ref().map(|j| j.as_str());
        let roles: Option<Vec<&str>> = update
            .roles
            .as_ref()
            .map(|set| set.iter().map(|r| r.as_str()).collect());
        let gender = update.gender.map(|g| g.as_str());

        macro_rules! assign {
            ($field:expr, $column:literal) => {
                if let Some(ref value) = $field {
                    params.push(value);
                    assignments.push(format!(concat!($column, " = ${}"), params.len()));
                }
            };
        }
        assign!(update.full_name, "full_name");
        assign!(jshshir, "jshshir");
        assign!(roles, "roles");
        assign!(gender, "gender");
        assign!(update.birth_date, "birth_date");
        assign!(update.phone, "phone");

        if !assignments.is_empty() {
            assignments.push("updated_at = now()".to_string());
            params.push(&id);
            let query = format!(
                "UPDATE users SET {} WHERE id = ${}",
                assignments.join(", "),
                params.len()
            );

            let client = self.client.get_connection().await?;
            self.client.apply_statement_timeout(&client).await?;
            let affected = client.execute(query.as_str(), &params).await.map_err(|e| {
                map_write_error(e, "User", "jshshir", jshshir.unwrap_or_default())
            })?;
            if affected == 0 {
                return Err(DmedError::not_found("User", id));
            }
        }

        self.get_user(id)
            .await?
            .ok_or_else(|| DmedError::not_found("User", id))
    }

    async fn delete_user(&self, id: i64) -> Result<()> {
        let affected = self
            .client
            .execute("DELETE FROM users WHERE id = $1", &[&id])
            .await?;
        if affected == 0 {
            return Err(DmedError::not_found("User", id));
        }
        Ok(())
    }
}
