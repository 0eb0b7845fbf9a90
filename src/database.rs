use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::QueryAs;
use sqlx::{FromRow, PgPool, Pool, Postgres};
use tokio::sync::OnceCell;

use crate::error::MonitorError;
use crate::models::{BalanceRow, CompletedRow, ReturnRow};
use crate::query::{LedgerColumns, SqlArg, SqlQuery};

pub type Database = Pool<Postgres>;

pub async fn create_database_pool(
    database_url: &str,
    max_connections: u32,
) -> Result<Database, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    // Test the connection
    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    log::info!("Connected to database ({} connections max)", max_connections);
    Ok(pool)
}

/// Read access to the production database. Every call is a single read.
#[async_trait]
pub trait ProductionSource: Send + Sync {
    /// Schema the production tables live in.
    fn schema(&self) -> &str;

    async fn table_exists(&self, table: &str) -> Result<bool, MonitorError>;

    /// Column names of the generic phase ledger. Never fails; falls back to
    /// the defaults when they cannot be read.
    async fn ledger_columns(&self) -> LedgerColumns;

    async fn fetch_balances(&self, query: &SqlQuery) -> Result<Vec<BalanceRow>, MonitorError>;

    async fn fetch_completed(&self, query: &SqlQuery) -> Result<Vec<CompletedRow>, MonitorError>;

    async fn fetch_returns(&self, query: &SqlQuery) -> Result<Vec<ReturnRow>, MonitorError>;
}

/// `ProductionSource` over a Postgres pool.
pub struct PgSource {
    pool: PgPool,
    schema: String,
    ledger: OnceCell<LedgerColumns>,
}

impl PgSource {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
            ledger: OnceCell::new(),
        }
    }

    async fn detect_ledger_columns(&self) -> Result<LedgerColumns, sqlx::Error> {
        let names: Vec<(String,)> = sqlx::query_as(
            "SELECT LOWER(column_name) FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = 'pasfase'",
        )
        .bind(&self.schema)
        .fetch_all(&self.pool)
        .await?;

        let columns: HashSet<String> = names.into_iter().map(|(name,)| name).collect();
        Ok(LedgerColumns::detect(&columns))
    }

    async fn fetch<O>(&self, query: &SqlQuery) -> Result<Vec<O>, MonitorError>
    where
        O: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
    {
        let rows = bind_all(sqlx::query_as::<_, O>(&query.sql), &query.args)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

fn bind_all<'q, O>(
    mut query: QueryAs<'q, Postgres, O, PgArguments>,
    args: &[SqlArg],
) -> QueryAs<'q, Postgres, O, PgArguments> {
    for arg in args {
        query = match arg {
            SqlArg::Int(v) => query.bind(*v),
            SqlArg::Text(v) => query.bind(v.clone()),
            SqlArg::Date(v) => query.bind(*v),
            SqlArg::IntList(v) => query.bind(v.clone()),
            SqlArg::TextList(v) => query.bind(v.clone()),
        };
    }
    query
}

#[async_trait]
impl ProductionSource for PgSource {
    fn schema(&self) -> &str {
        &self.schema
    }

    async fn table_exists(&self, table: &str) -> Result<bool, MonitorError> {
        let exists: (bool,) = sqlx::query_as(
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = $1 AND table_name = $2)",
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists.0)
    }

    async fn ledger_columns(&self) -> LedgerColumns {
        if let Some(columns) = self.ledger.get() {
            return *columns;
        }
        match self.detect_ledger_columns().await {
            Ok(columns) => *self.ledger.get_or_init(|| async { columns }).await,
            Err(e) => {
                log::warn!("Could not read pasfase columns, using defaults: {}", e);
                LedgerColumns::default()
            }
        }
    }

    async fn fetch_balances(&self, query: &SqlQuery) -> Result<Vec<BalanceRow>, MonitorError> {
        self.fetch(query).await
    }

    async fn fetch_completed(&self, query: &SqlQuery) -> Result<Vec<CompletedRow>, MonitorError> {
        self.fetch(query).await
    }

    async fn fetch_returns(&self, query: &SqlQuery) -> Result<Vec<ReturnRow>, MonitorError> {
        self.fetch(query).await
    }
}
