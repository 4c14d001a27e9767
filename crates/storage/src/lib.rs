use std::{str::FromStr, time::Duration};

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Row, SqliteConnection, SqlitePool,
};
use thiserror::Error;

use comissoes_core::{Commission, DashboardSummary, NewCommission};

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    ///
    /// Every pooled connection is opened with foreign keys enabled, WAL
    /// journaling and a busy timeout, and the database file is created when
    /// it does not exist yet.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(StorageError::Connect)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(StorageError::Connect)?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle to the commission records.
    pub fn commissions(&self) -> CommissionRepository {
        CommissionRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes every pooled connection. Subsequent queries fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
}

/// Repository responsible for the `comissao` table.
#[derive(Clone)]
pub struct CommissionRepository {
    pool: SqlitePool,
}

impl CommissionRepository {
    /// Stores a validated sale and returns it with its assigned id.
    ///
    /// The insert runs in its own transaction; on failure nothing is written.
    pub async fn insert(&self, record: NewCommission) -> Result<Commission, CommissionRepoError> {
        let sold_at = record.sold_at_or(Utc::now());
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO comissao \
             (vendedor, produto, valor_venda, comissao_calculada, data_venda) \
             VALUES (?, ?, ?, ?, ?) \
             RETURNING id",
        )
        .bind(&record.salesperson)
        .bind(&record.product)
        .bind(record.sale_value)
        .bind(record.commission_value)
        .bind(to_rfc3339(sold_at))
        .fetch_one(&mut *tx)
        .await
        .map_err(CommissionRepoError::from_insert)?;

        let id: i64 = row.get("id");
        tx.commit().await?;

        Ok(record.into_commission(id, sold_at))
    }

    /// Lists every stored record in insertion order.
    pub async fn list_all(&self) -> Result<Vec<Commission>, CommissionRepoError> {
        let rows = sqlx::query_as::<_, CommissionRow>(
            "SELECT id, vendedor, produto, valor_venda, comissao_calculada, data_venda \
             FROM comissao ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CommissionRow::into_domain).collect())
    }

    /// Deletes the record with the given id, returning whether one was removed.
    pub async fn delete_by_id(&self, id: i64) -> Result<bool, CommissionRepoError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM comissao WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sums `valor_venda` over every record, returning zero when the table is empty.
    pub async fn sum_sale_values(&self) -> Result<f64, CommissionRepoError> {
        let mut conn = self.pool.acquire().await?;
        sum_column(&mut conn, SumColumn::SaleValue).await
    }

    /// Sums `comissao_calculada` over every record, returning zero when the table is empty.
    pub async fn sum_commission_values(&self) -> Result<f64, CommissionRepoError> {
        let mut conn = self.pool.acquire().await?;
        sum_column(&mut conn, SumColumn::CommissionValue).await
    }

    /// Counts the stored records.
    pub async fn count_records(&self) -> Result<i64, CommissionRepoError> {
        let mut conn = self.pool.acquire().await?;
        count_rows(&mut conn).await
    }

    /// Computes all dashboard aggregates from a single read snapshot.
    pub async fn totals(&self) -> Result<DashboardSummary, CommissionRepoError> {
        let mut tx = self.pool.begin().await?;
        let total_sales = sum_column(&mut tx, SumColumn::SaleValue).await?;
        let total_commissions = sum_column(&mut tx, SumColumn::CommissionValue).await?;
        let sale_count = count_rows(&mut tx).await?;
        tx.commit().await?;

        Ok(DashboardSummary {
            total_sales,
            total_commissions,
            sale_count,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum SumColumn {
    SaleValue,
    CommissionValue,
}

impl SumColumn {
    fn query(self) -> &'static str {
        match self {
            Self::SaleValue => "SELECT COALESCE(SUM(valor_venda), 0.0) AS total FROM comissao",
            Self::CommissionValue => {
                "SELECT COALESCE(SUM(comissao_calculada), 0.0) AS total FROM comissao"
            }
        }
    }
}

async fn sum_column(
    conn: &mut SqliteConnection,
    column: SumColumn,
) -> Result<f64, CommissionRepoError> {
    let row = sqlx::query(column.query()).fetch_one(conn).await?;
    Ok(row.get::<f64, _>("total"))
}

async fn count_rows(conn: &mut SqliteConnection) -> Result<i64, CommissionRepoError> {
    let row = sqlx::query("SELECT COUNT(id) AS total FROM comissao")
        .fetch_one(conn)
        .await?;
    Ok(row.get::<i64, _>("total"))
}

/// Raw `comissao` row.
#[derive(Debug, sqlx::FromRow)]
pub struct CommissionRow {
    pub id: i64,
    pub vendedor: String,
    pub produto: String,
    pub valor_venda: f64,
    pub comissao_calculada: f64,
    pub data_venda: DateTime<Utc>,
}

impl CommissionRow {
    /// Converts the database row into the domain record.
    pub fn into_domain(self) -> Commission {
        Commission {
            id: self.id,
            salesperson: self.vendedor,
            product: self.produto,
            sale_value: self.valor_venda,
            commission_value: self.comissao_calculada,
            sold_at: self.data_venda,
        }
    }
}

/// Errors returned by [`CommissionRepository`].
#[derive(Debug, Error)]
pub enum CommissionRepoError {
    #[error("constraint violation: {0}")]
    Constraint(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CommissionRepoError {
    fn from_insert(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                // SQLITE_CONSTRAINT and its extended codes (CHECK 275, NOTNULL 1299, ...).
                let is_constraint = db_err
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| code & 0xff == 19)
                    .unwrap_or(false);
                if is_constraint {
                    Self::Constraint(db_err.message().to_string())
                } else {
                    Self::Database(sqlx::Error::Database(db_err))
                }
            }
            other => Self::Database(other),
        }
    }
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use comissoes_core::compute_commission;
    use tempfile::TempDir;

    async fn setup_db() -> (Database, TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("comissoes.db").display());
        let db = Database::connect(&url).await.expect("connect");
        db.run_migrations().await.expect("migrations");
        (db, dir)
    }

    fn draft(salesperson: &str, product: &str, sale_value: f64) -> NewCommission {
        NewCommission {
            salesperson: salesperson.to_string(),
            product: product.to_string(),
            sale_value,
            commission_value: compute_commission(sale_value),
            sold_at: None,
        }
    }

    #[tokio::test]
    async fn migrations_apply() {
        let (db, _dir) = setup_db().await;
        let tables: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'comissao'",
        )
        .fetch_one(db.pool())
        .await
        .expect("fetch tables");
        assert_eq!(tables.0, 1);

        db.run_migrations().await.expect("migrations are idempotent");
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamp() {
        let (db, _dir) = setup_db().await;
        let repo = db.commissions();
        let before = Utc::now().timestamp();

        let stored = repo
            .insert(draft("Carlos Silva", "Notebook Gamer", 5000.0))
            .await
            .expect("insert");

        assert!(stored.id > 0);
        assert_eq!(stored.commission_value, compute_commission(5000.0));
        assert!(stored.sold_at.timestamp() >= before);
        assert_eq!(stored.sold_at.timestamp_subsec_nanos(), 0);
    }

    #[tokio::test]
    async fn insert_keeps_supplied_timestamp() {
        let (db, _dir) = setup_db().await;
        let sold_at = Utc.with_ymd_and_hms(2023, 12, 24, 18, 0, 0).unwrap();
        let mut record = draft("Ana", "Teclado", 300.0);
        record.sold_at = Some(sold_at);

        let stored = db.commissions().insert(record).await.expect("insert");
        assert_eq!(stored.sold_at, sold_at);

        let listed = db.commissions().list_all().await.expect("list");
        assert_eq!(listed, vec![stored]);
    }

    #[tokio::test]
    async fn list_is_empty_then_in_insertion_order() {
        let (db, _dir) = setup_db().await;
        let repo = db.commissions();
        assert!(repo.list_all().await.expect("list").is_empty());

        let first = repo.insert(draft("A", "P1", 10.0)).await.expect("first");
        let second = repo.insert(draft("B", "P2", 20.0)).await.expect("second");

        let listed = repo.list_all().await.expect("list");
        assert_eq!(listed, vec![first, second]);
    }

    #[tokio::test]
    async fn delete_reports_whether_row_existed() {
        let (db, _dir) = setup_db().await;
        let repo = db.commissions();
        let stored = repo.insert(draft("A", "P", 10.0)).await.expect("insert");

        assert!(!repo.delete_by_id(stored.id + 100).await.expect("delete missing"));
        assert_eq!(repo.count_records().await.expect("count"), 1);

        assert!(repo.delete_by_id(stored.id).await.expect("delete"));
        assert!(!repo.delete_by_id(stored.id).await.expect("delete twice"));
        assert_eq!(repo.count_records().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let (db, _dir) = setup_db().await;
        let repo = db.commissions();
        let first = repo.insert(draft("A", "P", 1.0)).await.expect("first");
        let second = repo.insert(draft("A", "P", 2.0)).await.expect("second");
        repo.delete_by_id(second.id).await.expect("delete");

        let third = repo.insert(draft("A", "P", 3.0)).await.expect("third");
        assert!(third.id > second.id);
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn aggregates_are_zero_on_empty_table() {
        let (db, _dir) = setup_db().await;
        let repo = db.commissions();
        assert_eq!(repo.sum_sale_values().await.expect("sum"), 0.0);
        assert_eq!(repo.sum_commission_values().await.expect("sum"), 0.0);
        assert_eq!(repo.count_records().await.expect("count"), 0);
        assert_eq!(repo.totals().await.expect("totals"), DashboardSummary::default());
    }

    #[tokio::test]
    async fn aggregates_sum_stored_values() {
        let (db, _dir) = setup_db().await;
        let repo = db.commissions();
        repo.insert(draft("A", "P", 5000.0)).await.expect("insert");
        repo.insert(draft("B", "Q", 1000.0)).await.expect("insert");

        assert!((repo.sum_sale_values().await.expect("sum") - 6000.0).abs() < 1e-9);
        assert!((repo.sum_commission_values().await.expect("sum") - 300.0).abs() < 1e-9);
        assert_eq!(repo.count_records().await.expect("count"), 2);

        let totals = repo.totals().await.expect("totals");
        assert!((totals.total_sales - 6000.0).abs() < 1e-9);
        assert!((totals.total_commissions - 300.0).abs() < 1e-9);
        assert_eq!(totals.sale_count, 2);
    }

    #[tokio::test]
    async fn check_constraint_violation_is_reported() {
        let (db, _dir) = setup_db().await;
        let repo = db.commissions();

        let err = repo
            .insert(draft("A", "P", -5.0))
            .await
            .expect_err("negative value violates check");
        assert!(matches!(err, CommissionRepoError::Constraint(_)));
        assert_eq!(repo.count_records().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn records_survive_reconnect() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!("sqlite://{}", dir.path().join("durable.db").display());

        let db = Database::connect(&url).await.expect("connect");
        db.run_migrations().await.expect("migrations");
        let stored = db
            .commissions()
            .insert(draft("A", "P", 42.0))
            .await
            .expect("insert");
        db.close().await;

        let reopened = Database::connect(&url).await.expect("reconnect");
        reopened.run_migrations().await.expect("migrations");
        let listed = reopened.commissions().list_all().await.expect("list");
        assert_eq!(listed, vec![stored]);
    }

    #[tokio::test]
    async fn closed_pool_surfaces_database_error() {
        let (db, _dir) = setup_db().await;
        db.close().await;

        let err = db
            .commissions()
            .insert(draft("A", "P", 1.0))
            .await
            .expect_err("closed pool");
        assert!(matches!(err, CommissionRepoError::Database(_)));
    }
}
