//! `PostgreSQL` user store.
//!
//! Queries are runtime-checked (`sqlx::query` + `Row::try_get`) so the crate
//! builds without a live database. JSONB columns are read leniently through
//! the core normalizers; a malformed column degrades to an empty collection
//! rather than failing the request.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use veblyss_core::{AddressBook, Cart, Email, UserId, Wishlist};

use super::{RepositoryError, UserStore};
use crate::models::user::{NewUser, UserDocument};

const USER_COLUMNS: &str = "id, name, email, password_hash, cartdata, wishlistdata, \
                            orderdata, addressdata, version, created_at, updated_at";

/// User store backed by the `storefront.user` table.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Create a new store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<UserDocument>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM storefront.user WHERE id = $1"
        ))
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(document_from_row).transpose()
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<UserDocument>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM storefront.user WHERE LOWER(email) = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(document_from_row).transpose()
    }

    async fn create(&self, user: NewUser) -> Result<UserDocument, RepositoryError> {
        let row = sqlx::query(&format!(
            r"
            INSERT INTO storefront.user (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(&user.name)
        .bind(user.email.as_str())
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        document_from_row(&row)
    }

    async fn compare_and_swap(
        &self,
        document: &UserDocument,
    ) -> Result<Option<UserDocument>, RepositoryError> {
        let row = sqlx::query(&format!(
            r"
            UPDATE storefront.user
            SET name = $3,
                email = $4,
                cartdata = $5,
                wishlistdata = $6,
                orderdata = $7,
                addressdata = $8,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(document.id.as_i64())
        .bind(document.version)
        .bind(&document.name)
        .bind(document.email.as_str())
        .bind(Json(&document.cart))
        .bind(Json(&document.wishlist))
        .bind(Json(&document.orders))
        .bind(Json(&document.addresses))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        if row.is_none() {
            tracing::debug!(
                user_id = %document.id,
                expected_version = document.version,
                "version mismatch on user write"
            );
        }

        row.as_ref().map(document_from_row).transpose()
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn map_unique_violation(e: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict("email already exists".to_owned());
    }
    RepositoryError::Database(e)
}

fn document_from_row(row: &PgRow) -> Result<UserDocument, RepositoryError> {
    let email: String = row.try_get("email")?;
    let email = Email::parse(&email).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
    })?;

    let cart: Json<Value> = row.try_get("cartdata")?;
    let wishlist: Json<Value> = row.try_get("wishlistdata")?;
    let orders: Json<Value> = row.try_get("orderdata")?;
    let addresses: Json<Value> = row.try_get("addressdata")?;

    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

    Ok(UserDocument {
        id: UserId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        email,
        password_hash: row.try_get("password_hash")?,
        cart: Cart::from_value(Some(cart.0)),
        wishlist: Wishlist::from_value(Some(wishlist.0)),
        orders: match orders.0 {
            Value::Object(map) => map,
            _ => Map::new(),
        },
        addresses: AddressBook::from_value(Some(addresses.0)),
        version: row.try_get("version")?,
        created_at,
        updated_at,
    })
}
