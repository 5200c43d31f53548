use std::future::Future;
use std::sync::Arc;

use sqlx::postgres::{PgArguments, PgQueryResult};
use sqlx::query::{Query, QueryAs};
use sqlx::Postgres;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::context::RequestContext;
use crate::database::entity::Entity;
use crate::database::errors::{db_error, validation_error};
use crate::database::manager::Db;
use crate::database::TxHandle;
use crate::error::{codes, AppError};

/// Generic entity persistence over a pooled connection. Every operation runs
/// on the context's transaction when one is active, else on the pool.
#[derive(Clone, Debug)]
pub struct Repo {
    db: Db,
}

impl Repo {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Insert a new row. Defaults are applied and the entity validated first;
    /// those local failures come back unmodified.
    pub async fn create<E: Entity>(&self, ctx: &RequestContext, receiver: &mut E) -> Result<(), AppError> {
        receiver.set_defaults()?;
        receiver.validate()?;

        let columns = receiver.columns();
        let sql = insert_sql(
            receiver.table_name(),
            columns.iter().map(|(name, _)| *name),
        );

        let mut query = sqlx::query(&sql);
        for (_, value) in columns {
            query = value.bind(query);
        }

        self.execute(ctx, query).await.map_err(db_error)?;
        debug!(entity = receiver.entity_name(), id = ?receiver.id(), "entity created");
        Ok(())
    }

    /// Load the row with primary key `id` into `receiver`.
    pub async fn find_by_id<E: Entity>(
        &self,
        ctx: &RequestContext,
        receiver: &mut E,
        id: Uuid,
    ) -> Result<(), AppError> {
        let sql = format!(
            "SELECT * FROM \"{}\" WHERE \"{}\" = $1",
            receiver.table_name(),
            receiver.primary_key()
        );
        let query = sqlx::query_as::<_, E>(&sql).bind(id);

        *receiver = self.fetch_one(ctx, query).await.map_err(db_error)?;
        Ok(())
    }

    /// Delete `receiver`. Entities naming a soft-delete column get that column
    /// stamped instead of losing the row.
    pub async fn delete<E: Entity>(&self, ctx: &RequestContext, receiver: &E) -> Result<(), AppError> {
        let id = receiver
            .id()
            .ok_or_else(|| validation_error(format!("{}: cannot be blank", receiver.primary_key())))?;

        let result = match receiver.soft_delete_column() {
            Some(column) => {
                let sql = format!(
                    "UPDATE \"{}\" SET \"{}\" = $1 WHERE \"{}\" = $2",
                    receiver.table_name(),
                    column,
                    receiver.primary_key()
                );
                let query = sqlx::query(&sql)
                    .bind(chrono::Utc::now().timestamp())
                    .bind(id);
                self.execute(ctx, query).await
            }
            None => {
                let sql = format!(
                    "DELETE FROM \"{}\" WHERE \"{}\" = $1",
                    receiver.table_name(),
                    receiver.primary_key()
                );
                self.execute(ctx, sqlx::query(&sql).bind(id)).await
            }
        };

        result.map(|_| ()).map_err(db_error)
    }

    /// Run `f` inside a transaction.
    ///
    /// When `ctx` already carries a transaction, `f` joins it and nothing is
    /// opened, committed or rolled back here. Otherwise a new transaction is
    /// begun, handed to `f` through the context, and committed when `f`
    /// succeeds or rolled back when it fails. The error from `f` is returned
    /// as is; a failed commit becomes an internal `db_error`.
    pub async fn transaction<T, F, Fut>(&self, ctx: &RequestContext, f: F) -> Result<T, AppError>
    where
        F: FnOnce(RequestContext) -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        if self.is_transaction_active(ctx) {
            return f(ctx.clone()).await;
        }

        let tx = self.db.pool().begin().await.map_err(db_error)?;
        let handle: TxHandle = Arc::new(Mutex::new(Some(tx)));

        let result = f(ctx.clone().with_transaction(Arc::clone(&handle))).await;

        let tx = handle.lock().await.take();
        let Some(tx) = tx else {
            return Err(AppError::server_error(codes::DB_ERROR).wrap("transaction already completed"));
        };

        match result {
            Ok(value) => {
                tx.commit()
                    .await
                    .map_err(|e| AppError::server_error(codes::DB_ERROR).wrap(e))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "transaction rollback failed");
                }
                Err(err)
            }
        }
    }

    pub fn is_transaction_active(&self, ctx: &RequestContext) -> bool {
        ctx.transaction().is_some()
    }

    async fn execute<'q>(
        &self,
        ctx: &RequestContext,
        query: Query<'q, Postgres, PgArguments>,
    ) -> Result<PgQueryResult, sqlx::Error> {
        match ctx.transaction() {
            Some(handle) => {
                let mut guard = handle.lock().await;
                let tx = guard.as_mut().ok_or_else(transaction_closed)?;
                query.execute(&mut **tx).await
            }
            None => query.execute(self.db.pool()).await,
        }
    }

    async fn fetch_one<'q, E: Entity>(
        &self,
        ctx: &RequestContext,
        query: QueryAs<'q, Postgres, E, PgArguments>,
    ) -> Result<E, sqlx::Error> {
        match ctx.transaction() {
            Some(handle) => {
                let mut guard = handle.lock().await;
                let tx = guard.as_mut().ok_or_else(transaction_closed)?;
                query.fetch_one(&mut **tx).await
            }
            None => query.fetch_one(self.db.pool()).await,
        }
    }
}

fn transaction_closed() -> sqlx::Error {
    sqlx::Error::Protocol("transaction already completed".to_string())
}

fn insert_sql<'a>(table: &str, columns: impl Iterator<Item = &'a str>) -> String {
    let names: Vec<String> = columns.map(|c| format!("\"{}\"", c)).collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("${}", i)).collect();
    format!(
        "INSERT INTO \"{}\" ({}) VALUES ({})",
        table,
        names.join(", "),
        placeholders.join(", ")
    )
}
