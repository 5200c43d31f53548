use serde::{Deserialize, Serialize};
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{FromRow, Postgres};
use uuid::Uuid;

use crate::database::errors::validation_error;
use crate::error::AppError;

pub const ATTRIBUTE_ID: &str = "id";
pub const ATTRIBUTE_CREATED_AT: &str = "created_at";
pub const ATTRIBUTE_UPDATED_AT: &str = "updated_at";
pub const ATTRIBUTE_DELETED_AT: &str = "deleted_at";

/// A column value bound into an INSERT.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Uuid(Option<Uuid>),
    Text(String),
    NullableText(Option<String>),
    BigInt(i64),
    Int(i32),
}

impl SqlValue {
    pub(crate) fn bind<'q>(
        self,
        q: Query<'q, Postgres, PgArguments>,
    ) -> Query<'q, Postgres, PgArguments> {
        match self {
            SqlValue::Uuid(v) => q.bind(v),
            SqlValue::Text(v) => q.bind(v),
            SqlValue::NullableText(v) => q.bind(v),
            SqlValue::BigInt(v) => q.bind(v),
            SqlValue::Int(v) => q.bind(v),
        }
    }
}

/// Capabilities a persisted record needs for the generic repository.
pub trait Entity: Send + Sync + Unpin + for<'r> FromRow<'r, sqlx::postgres::PgRow> {
    fn table_name(&self) -> &'static str;

    fn entity_name(&self) -> &'static str;

    /// Primary key value, `None` until defaults have been applied.
    fn id(&self) -> Option<Uuid>;

    fn primary_key(&self) -> &'static str {
        ATTRIBUTE_ID
    }

    /// Column holding the soft-delete timestamp. `None` means rows are
    /// removed for real.
    fn soft_delete_column(&self) -> Option<&'static str> {
        None
    }

    fn validate(&self) -> Result<(), AppError>;

    fn set_defaults(&mut self) -> Result<(), AppError>;

    /// Column names and values for INSERT, in matching order.
    fn columns(&self) -> Vec<(&'static str, SqlValue)>;
}

/// Identity and timestamps shared by every table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Model {
    pub id: Option<Uuid>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Model {
    pub fn id(&self) -> Option<Uuid> {
        self.id
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn updated_at(&self) -> i64 {
        self.updated_at
    }

    /// Assign a fresh ID when absent and stamp unset timestamps with now.
    /// An existing ID is never replaced.
    pub fn set_defaults(&mut self) {
        if self.id.is_none() {
            self.id = Some(Uuid::new_v4());
        }

        let now = chrono::Utc::now().timestamp();
        if self.created_at == 0 {
            self.created_at = now;
        }
        if self.updated_at == 0 {
            self.updated_at = now;
        }
    }

    pub fn validate(&self) -> Result<(), AppError> {
        validate_timestamp(ATTRIBUTE_CREATED_AT, self.created_at)?;
        validate_timestamp(ATTRIBUTE_UPDATED_AT, self.updated_at)?;
        Ok(())
    }

    pub fn columns(&self) -> Vec<(&'static str, SqlValue)> {
        vec![
            (ATTRIBUTE_ID, SqlValue::Uuid(self.id)),
            (ATTRIBUTE_CREATED_AT, SqlValue::BigInt(self.created_at)),
            (ATTRIBUTE_UPDATED_AT, SqlValue::BigInt(self.updated_at)),
        ]
    }
}

/// A Unix timestamp is valid when it has exactly ten digits or is `0`.
pub fn is_timestamp(value: i64) -> bool {
    value == 0 || (1_000_000_000..=9_999_999_999).contains(&value)
}

fn validate_timestamp(field: &str, value: i64) -> Result<(), AppError> {
    if is_timestamp(value) {
        Ok(())
    } else {
        Err(validation_error(format!("{}: not a valid input", field)))
    }
}
