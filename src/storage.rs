//! SQLite storage layer for SnakeSafe.
//!
//! Four tables: `users` (operators), `hospitals` and `rescuers` (the facility
//! directory), and `requests` (public help requests). Writes that come from a
//! request handler run inside a transaction; dropping it without commit rolls
//! back.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{Sqlite, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, Transaction};

use crate::model::{Facility, FacilityKind, HelpRequest, NewFacility, NewHelpRequest, Operator};

pub type StorageResult<T> = Result<T, sqlx::Error>;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    /// Create a new storage instance and initialize the schema.
    ///
    /// # Arguments
    ///
    /// * `database_url` - SQLite connection string (e.g., "sqlite:snakesafe.db" or "sqlite::memory:")
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let mut options = SqlitePoolOptions::new().max_connections(5);

        // Every in-memory connection is its own database: keep exactly one
        // open for the life of the pool.
        if database_url.contains(":memory:") {
            options = options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = options.connect(database_url).await?;

        let storage = Self { pool };
        storage.initialize_schema().await?;

        Ok(storage)
    }

    /// Create the database schema if it doesn't exist.
    async fn initialize_schema(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        for kind in [FacilityKind::Hospital, FacilityKind::Rescuer] {
            let ddl = format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    phone TEXT NOT NULL,
                    latitude REAL NOT NULL,
                    longitude REAL NOT NULL
                )
                "#,
                kind.table()
            );
            sqlx::query(&ddl).execute(&self.pool).await?;
        }

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS requests (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                phone TEXT NOT NULL,
                snake_species TEXT,
                location TEXT,
                request_type TEXT NOT NULL DEFAULT 'hospital',
                latitude REAL,
                longitude REAL,
                ts INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Start a transaction for a batch of writes.
    ///
    /// With an in-memory database the transaction holds the only connection,
    /// so no other `Storage` call may run until it is committed or dropped.
    pub async fn begin(&self) -> StorageResult<Transaction<'static, Sqlite>> {
        self.pool.begin().await
    }

    // ------------------------------------------------------------------------
    // Facility directory
    // ------------------------------------------------------------------------

    /// All facilities of one kind, in insertion order.
    pub async fn list_facilities(&self, kind: FacilityKind) -> StorageResult<Vec<Facility>> {
        let sql = format!(
            "SELECT id, name, phone, latitude, longitude FROM {} ORDER BY id",
            kind.table()
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|r| -> StorageResult<Facility> {
                Ok(Facility {
                    id: r.try_get("id")?,
                    name: r.try_get("name")?,
                    phone: r.try_get("phone")?,
                    latitude: r.try_get("latitude")?,
                    longitude: r.try_get("longitude")?,
                })
            })
            .collect()
    }

    pub async fn count_facilities(&self, kind: FacilityKind) -> StorageResult<i64> {
        let sql = format!("SELECT COUNT(*) AS total FROM {}", kind.table());
        let row = sqlx::query(&sql).fetch_one(&self.pool).await?;
        row.try_get("total")
    }

    // ------------------------------------------------------------------------
    // Help requests
    // ------------------------------------------------------------------------

    /// Persist a help request and return its id.
    pub async fn insert_help_request(&self, request: &NewHelpRequest) -> StorageResult<i64> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO requests
                (name, phone, snake_species, location, request_type, latitude, longitude, ts)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.name)
        .bind(&request.phone)
        .bind(&request.snake_species)
        .bind(&request.location)
        .bind(request.request_type.as_str())
        .bind(request.latitude)
        .bind(request.longitude)
        .bind(request.timestamp.timestamp())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.last_insert_rowid())
    }

    /// All help requests, oldest first.
    pub async fn list_help_requests(&self) -> StorageResult<Vec<HelpRequest>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, phone, snake_species, location, request_type, latitude, longitude, ts
            FROM requests
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(help_request_from_row).collect()
    }

    pub async fn get_help_request(&self, id: i64) -> StorageResult<Option<HelpRequest>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, phone, snake_species, location, request_type, latitude, longitude, ts
            FROM requests
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(help_request_from_row).transpose()
    }

    /// Delete a help request.
    ///
    /// Returns `false` and changes nothing if no request has this id.
    pub async fn delete_help_request(&self, id: i64) -> StorageResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM requests WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    pub async fn count_help_requests(&self) -> StorageResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM requests")
            .fetch_one(&self.pool)
            .await?;
        row.try_get("total")
    }

    // ------------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------------

    pub async fn find_operator_by_username(&self, username: &str) -> StorageResult<Option<Operator>> {
        let row = sqlx::query("SELECT id, username, password_hash FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(operator_from_row).transpose()
    }

    pub async fn find_operator_by_id(&self, id: i64) -> StorageResult<Option<Operator>> {
        let row = sqlx::query("SELECT id, username, password_hash FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(operator_from_row).transpose()
    }
}

// ----------------------------------------------------------------------------
// Seeding writes, run inside a caller's transaction
// ----------------------------------------------------------------------------

/// Insert a facility unless one of the same kind and name already exists.
///
/// Returns `true` if a row was inserted.
pub async fn insert_facility_if_absent(
    conn: &mut SqliteConnection,
    kind: FacilityKind,
    facility: &NewFacility,
) -> StorageResult<bool> {
    let sql = format!(
        r#"
        INSERT INTO {table} (name, phone, latitude, longitude)
        SELECT ?, ?, ?, ?
        WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE name = ?)
        "#,
        table = kind.table()
    );

    let result = sqlx::query(&sql)
        .bind(facility.name)
        .bind(facility.phone)
        .bind(facility.latitude)
        .bind(facility.longitude)
        .bind(facility.name)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Create an operator unless the username is taken. Returns `true` if created.
pub async fn insert_operator_if_absent(
    conn: &mut SqliteConnection,
    username: &str,
    password_hash: &str,
) -> StorageResult<bool> {
    let result = sqlx::query("INSERT OR IGNORE INTO users (username, password_hash) VALUES (?, ?)")
        .bind(username)
        .bind(password_hash)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

fn help_request_from_row(row: &SqliteRow) -> StorageResult<HelpRequest> {
    let request_type: String = row.try_get("request_type")?;
    let ts: i64 = row.try_get("ts")?;

    Ok(HelpRequest {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        phone: row.try_get("phone")?,
        snake_species: row
            .try_get::<Option<String>, _>("snake_species")?
            .unwrap_or_default(),
        location: row
            .try_get::<Option<String>, _>("location")?
            .unwrap_or_default(),
        request_type: request_type
            .parse()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        latitude: row.try_get("latitude")?,
        longitude: row.try_get("longitude")?,
        timestamp: DateTime::<Utc>::from_timestamp(ts, 0).ok_or_else(|| {
            sqlx::Error::Decode(format!("timestamp {ts} out of range").into())
        })?,
    })
}

fn operator_from_row(row: &SqliteRow) -> StorageResult<Operator> {
    Ok(Operator {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RequestType;

    async fn setup_test_storage() -> Storage {
        Storage::new("sqlite::memory:").await.unwrap()
    }

    fn new_request(name: &str) -> NewHelpRequest {
        NewHelpRequest {
            name: name.to_string(),
            phone: "+977-9800000000".to_string(),
            snake_species: "Naja_naja".to_string(),
            location: "27.7,85.3".to_string(),
            request_type: RequestType::Rescue,
            latitude: Some(27.7),
            longitude: Some(85.3),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get_help_request() {
        let storage = setup_test_storage().await;
        let request = new_request("Sita");

        let id = storage.insert_help_request(&request).await.unwrap();
        let stored = storage.get_help_request(id).await.unwrap().unwrap();

        assert_eq!(stored.name, "Sita");
        assert_eq!(stored.request_type, RequestType::Rescue);
        assert_eq!(stored.latitude, Some(27.7));
        assert_eq!(stored.timestamp.timestamp(), request.timestamp.timestamp());
    }

    #[tokio::test]
    async fn test_null_coordinates_round_trip() {
        let storage = setup_test_storage().await;
        let mut request = new_request("Hari");
        request.latitude = None;
        request.longitude = None;

        let id = storage.insert_help_request(&request).await.unwrap();
        let stored = storage.get_help_request(id).await.unwrap().unwrap();

        assert_eq!(stored.latitude, None);
        assert_eq!(stored.longitude, None);
    }

    #[tokio::test]
    async fn test_delete_help_request() {
        let storage = setup_test_storage().await;
        let id = storage.insert_help_request(&new_request("Gita")).await.unwrap();

        assert!(storage.delete_help_request(id).await.unwrap());
        assert!(storage.get_help_request(id).await.unwrap().is_none());
        assert!(!storage.delete_help_request(id).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_leaves_store_unchanged() {
        let storage = setup_test_storage().await;
        storage.insert_help_request(&new_request("Ram")).await.unwrap();
        storage.insert_help_request(&new_request("Shyam")).await.unwrap();

        assert!(!storage.delete_help_request(999).await.unwrap());
        assert_eq!(storage.count_help_requests().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_facility_insert_is_idempotent() {
        let storage = setup_test_storage().await;
        let bir = NewFacility {
            name: "Bir Hospital",
            phone: "+977-1-4221119",
            latitude: 27.7060,
            longitude: 85.3150,
        };

        let mut tx = storage.begin().await.unwrap();
        assert!(insert_facility_if_absent(&mut tx, FacilityKind::Hospital, &bir)
            .await
            .unwrap());
        assert!(!insert_facility_if_absent(&mut tx, FacilityKind::Hospital, &bir)
            .await
            .unwrap());
        // Same name in the other directory is a different record.
        assert!(insert_facility_if_absent(&mut tx, FacilityKind::Rescuer, &bir)
            .await
            .unwrap());
        tx.commit().await.unwrap();

        let hospitals = storage.list_facilities(FacilityKind::Hospital).await.unwrap();
        assert_eq!(hospitals.len(), 1);
        assert_eq!(hospitals[0].name, "Bir Hospital");
        assert_eq!(storage.count_facilities(FacilityKind::Rescuer).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let storage = setup_test_storage().await;
        let patan = NewFacility {
            name: "Patan Hospital",
            phone: "+977-1-5522295",
            latitude: 27.6680,
            longitude: 85.3200,
        };

        {
            let mut tx = storage.begin().await.unwrap();
            insert_facility_if_absent(&mut tx, FacilityKind::Hospital, &patan)
                .await
                .unwrap();
        }

        assert_eq!(storage.count_facilities(FacilityKind::Hospital).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_memory_pool_keeps_its_connection() {
        let storage = setup_test_storage().await;
        let options = storage.pool.options();

        assert_eq!(options.get_max_connections(), 1);
        assert_eq!(options.get_min_connections(), 1);
        assert_eq!(options.get_idle_timeout(), None);
        assert_eq!(options.get_max_lifetime(), None);
    }

    #[tokio::test]
    async fn test_operator_lookup() {
        let storage = setup_test_storage().await;

        let mut tx = storage.begin().await.unwrap();
        assert!(insert_operator_if_absent(&mut tx, "admin", "hash-1").await.unwrap());
        assert!(!insert_operator_if_absent(&mut tx, "admin", "hash-2").await.unwrap());
        tx.commit().await.unwrap();

        let operator = storage.find_operator_by_username("admin").await.unwrap().unwrap();
        assert_eq!(operator.password_hash, "hash-1");

        let by_id = storage.find_operator_by_id(operator.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "admin");

        assert!(storage.find_operator_by_username("root").await.unwrap().is_none());
    }
}
