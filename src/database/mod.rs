pub mod entity;
pub mod errors;
pub mod manager;
pub mod migrator;
pub mod models;
pub mod repository;

use std::sync::Arc;

use sqlx::{Postgres, Transaction};
use tokio::sync::Mutex;

pub use entity::{Entity, Model, SqlValue};
pub use manager::{open_store, DatabaseError, Db};
pub use repository::Repo;

/// Shared handle to an open transaction, carried by `RequestContext`.
/// `None` once the transaction has been committed or rolled back.
pub type TxHandle = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;
