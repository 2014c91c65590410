//! PostgreSQL-backed credential store.
//!
//! Flow Overview:
//! 1) Principals are read from `users`; the single `role` column becomes a
//!    one-element raw role list.
//! 2) Overrides are read from `role_permission_overrides` for validated role
//!    names only, so the query never sees an unknown role.

use async_trait::async_trait;
use sqlx::{Connection, PgPool, Row, postgres::PgRow};
use tracing::{Instrument, info_span};
use uuid::Uuid;

use super::{
    error::StoreError,
    overrides::OverrideRow,
    role::Role,
    store::{CredentialStore, PrincipalRecord},
};

#[derive(Clone, Debug)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn principal_from_row(row: &PgRow) -> Result<PrincipalRecord, sqlx::Error> {
    let role: Option<String> = row.try_get("role")?;
    Ok(PrincipalRecord {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        password_hash: row.try_get("password_hash")?,
        roles: role.into_iter().collect(),
        is_system_admin: row.try_get("is_system_admin")?,
    })
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_principal_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<PrincipalRecord>, StoreError> {
        let query = r"
            SELECT id, email, name, password_hash, role, is_system_admin
            FROM users
            WHERE lower(email) = lower($1)
            LIMIT 1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(identifier)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.as_ref().map(principal_from_row).transpose()?)
    }

    async fn find_principal_by_id(&self, id: Uuid) -> Result<Option<PrincipalRecord>, StoreError> {
        let query = r"
            SELECT id, email, name, password_hash, role, is_system_admin
            FROM users
            WHERE id = $1
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await?;

        Ok(row.as_ref().map(principal_from_row).transpose()?)
    }

    async fn find_overrides_by_roles(&self, roles: &[Role]) -> Result<Vec<OverrideRow>, StoreError> {
        let names: Vec<String> = roles.iter().map(|role| role.as_str().to_string()).collect();
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let query = r"
            SELECT role, module, level
            FROM role_permission_overrides
            WHERE role = ANY($1)
            ORDER BY updated_at ASC
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let rows = sqlx::query(query)
            .bind(&names)
            .fetch_all(&self.pool)
            .instrument(span)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(OverrideRow {
                    role: row.try_get("role")?,
                    module: row.try_get("module")?,
                    level: row.try_get("level")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(StoreError::from)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self.pool.acquire().instrument(acquire_span).await?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping().instrument(ping_span).await?;
        Ok(())
    }
}
