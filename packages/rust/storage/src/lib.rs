//! Storage for the masterlist pipeline.
//!
//! Two stores live here:
//! - [`Storage`]: a libSQL database holding each class's student collection,
//!   addressed as `professors/{p}/classes/{c}/students/{id}`.
//! - [`bucket`]: the object store uploads land in ([`LocalBuckets`]).
//!
//! **Access rules:**
//! - the ingestion pipeline: read-write via [`Storage::open`]
//! - readers observing ingestion results: read-only via [`Storage::open_readonly`]
//!
//! Read-only is a flag checked by every write method, not a SQLite open
//! mode: the file is opened normally and writes are refused before they
//! reach the connection.
//!
//! Writers are serialized. A [`Storage`] holds one write lock shared by all
//! merges, and every connection runs in WAL mode with a busy timeout so that
//! separate processes on the same file wait for each other instead of failing
//! with `database is locked`.

pub mod bucket;
mod migrations;

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, TransactionBehavior, params};
use masterlist_shared::{MasterlistError, Result, StudentMap, StudentRecord, paths};
use tokio::sync::Mutex;

pub use bucket::{DocumentSource, LocalBuckets};

/// How long a connection waits on another writer's lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    db: Database,
    conn: Connection,
    readonly: bool,
    write_lock: Mutex<()>,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| MasterlistError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| MasterlistError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| MasterlistError::Storage(e.to_string()))?;
        configure_connection(&conn)?;
        enable_wal(&conn).await?;

        let storage = Self {
            db,
            conn,
            readonly: false,
            write_lock: Mutex::new(()),
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MasterlistError::Storage(format!(
                "database not found at {}",
                path.display()
            )));
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| MasterlistError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| MasterlistError::Storage(e.to_string()))?;
        configure_connection(&conn)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
            write_lock: Mutex::new(()),
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        MasterlistError::Storage(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(MasterlistError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Student collection
    // -----------------------------------------------------------------------

    /// Merge `students` into a class's collection.
    ///
    /// Every record is upserted by `student_id`; students already in the
    /// collection but absent from `students` are left alone. All upserts run
    /// in one immediate transaction on a dedicated connection while the
    /// write lock is held. Concurrent merges through the same handle queue
    /// behind each other, and a failure leaves the collection unchanged.
    ///
    /// Returns the number of records written.
    pub async fn merge_students(
        &self,
        professor_id: &str,
        class_id: &str,
        students: &StudentMap,
    ) -> Result<usize> {
        self.check_writable()?;
        if students.is_empty() {
            return Ok(0);
        }

        let _writer = self.write_lock.lock().await;

        let conn = self
            .db
            .connect()
            .map_err(|e| MasterlistError::Storage(e.to_string()))?;
        configure_connection(&conn)?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .await
            .map_err(|e| MasterlistError::Storage(e.to_string()))?;

        if let Err(e) = upsert_students(&tx, professor_id, class_id, students).await {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "rollback failed");
            }
            return Err(e);
        }

        tx.commit()
            .await
            .map_err(|e| MasterlistError::Storage(format!("commit failed: {e}")))?;

        tracing::debug!(
            path = %paths::students(professor_id, class_id),
            count = students.len(),
            "merged student records"
        );
        Ok(students.len())
    }

    /// List a class's students, ordered by student ID.
    pub async fn list_students(
        &self,
        professor_id: &str,
        class_id: &str,
    ) -> Result<Vec<StudentRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT student_id, name, added_at FROM students
                 WHERE professor_id = ?1 AND class_id = ?2
                 ORDER BY student_id",
                params![professor_id, class_id],
            )
            .await
            .map_err(|e| MasterlistError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| MasterlistError::Storage(e.to_string()))?
        {
            results.push(row_to_student(&row)?);
        }
        Ok(results)
    }

    /// Get one student by ID.
    pub async fn get_student(
        &self,
        professor_id: &str,
        class_id: &str,
        student_id: &str,
    ) -> Result<Option<StudentRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT student_id, name, added_at FROM students
                 WHERE professor_id = ?1 AND class_id = ?2 AND student_id = ?3",
                params![professor_id, class_id, student_id],
            )
            .await
            .map_err(|e| MasterlistError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_student(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(MasterlistError::Storage(e.to_string())),
        }
    }
}

/// Apply the busy timeout to a fresh connection.
fn configure_connection(conn: &Connection) -> Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| MasterlistError::Storage(format!("failed to set busy timeout: {e}")))
}

/// Switch the database file to WAL so readers do not block the writer.
async fn enable_wal(conn: &Connection) -> Result<()> {
    // journal_mode reports the resulting mode as a row, so it goes through query.
    let mut rows = conn
        .query("PRAGMA journal_mode = WAL", params![])
        .await
        .map_err(|e| MasterlistError::Storage(format!("failed to set WAL mode: {e}")))?;
    let mode = match rows.next().await {
        Ok(Some(row)) => row.get::<String>(0).unwrap_or_default(),
        _ => String::new(),
    };
    if !mode.eq_ignore_ascii_case("wal") {
        tracing::warn!(mode = %mode, "database did not switch to WAL mode");
    }
    Ok(())
}

/// Upsert every record through `conn` (the caller owns the transaction).
async fn upsert_students(
    conn: &Connection,
    professor_id: &str,
    class_id: &str,
    students: &StudentMap,
) -> Result<()> {
    for record in students.values() {
        conn.execute(
            "INSERT INTO students (professor_id, class_id, student_id, name, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(professor_id, class_id, student_id) DO UPDATE SET
               name = excluded.name,
               added_at = excluded.added_at",
            params![
                professor_id,
                class_id,
                record.student_id.as_str(),
                record.name.as_str(),
                record.added_at.to_rfc3339(),
            ],
        )
        .await
        .map_err(|e| {
            MasterlistError::Storage(format!(
                "upsert {} failed: {e}",
                paths::student(professor_id, class_id, &record.student_id)
            ))
        })?;
    }
    Ok(())
}

/// Convert a database row to a [`StudentRecord`].
fn row_to_student(row: &libsql::Row) -> Result<StudentRecord> {
    Ok(StudentRecord {
        student_id: row
            .get::<String>(0)
            .map_err(|e| MasterlistError::Storage(e.to_string()))?,
        name: row
            .get::<String>(1)
            .map_err(|e| MasterlistError::Storage(e.to_string()))?,
        added_at: {
            let s: String = row
                .get(2)
                .map_err(|e| MasterlistError::Storage(e.to_string()))?;
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| MasterlistError::Storage(format!("invalid date: {e}")))?
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("masterlist_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    fn student(id: &str, name: &str, added_at: DateTime<Utc>) -> StudentRecord {
        StudentRecord {
            student_id: id.into(),
            name: name.into(),
            added_at,
        }
    }

    fn map_of(records: Vec<StudentRecord>) -> StudentMap {
        records
            .into_iter()
            .map(|r| (r.student_id.clone(), r))
            .collect()
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        let version = storage.get_schema_version().await;
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("masterlist_test_{}.db", Uuid::now_v7()));
        let first = Storage::open(&tmp).await.expect("first open");
        drop(first);
        let second = Storage::open(&tmp).await.expect("second open");
        assert_eq!(second.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn merge_and_read_back() {
        let storage = test_storage().await;
        let now = Utc::now();
        let students = map_of(vec![
            student("TUPM-22-1234", "Dela Cruz, Juan", now),
            student("TUPM-22-0001", "Lim, Kai", now),
        ]);

        let written = storage
            .merge_students("prof-1", "class-1", &students)
            .await
            .expect("merge");
        assert_eq!(written, 2);

        let listed = storage.list_students("prof-1", "class-1").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].student_id, "TUPM-22-0001");
        assert_eq!(listed[1].name, "Dela Cruz, Juan");
        assert_eq!(listed[1].added_at.timestamp_millis(), now.timestamp_millis());

        let one = storage
            .get_student("prof-1", "class-1", "TUPM-22-1234")
            .await
            .unwrap()
            .expect("student exists");
        assert_eq!(one.name, "Dela Cruz, Juan");
    }

    #[tokio::test]
    async fn merge_overwrites_and_keeps_siblings() {
        let storage = test_storage().await;
        let first = Utc::now() - Duration::hours(1);
        let second = Utc::now();

        storage
            .merge_students(
                "prof-1",
                "class-1",
                &map_of(vec![
                    student("TUPM-22-1234", "Dela Cruz, Juan", first),
                    student("TUPM-22-5555", "Bautista, Rosa", first),
                ]),
            )
            .await
            .unwrap();

        // Re-upload omits TUPM-22-5555 and renames TUPM-22-1234.
        storage
            .merge_students(
                "prof-1",
                "class-1",
                &map_of(vec![student("TUPM-22-1234", "Dela Cruz, Juan Miguel", second)]),
            )
            .await
            .unwrap();

        let listed = storage.list_students("prof-1", "class-1").await.unwrap();
        assert_eq!(listed.len(), 2);

        let juan = &listed[0];
        assert_eq!(juan.name, "Dela Cruz, Juan Miguel");
        assert_eq!(juan.added_at.timestamp_millis(), second.timestamp_millis());

        let rosa = &listed[1];
        assert_eq!(rosa.name, "Bautista, Rosa");
        assert_eq!(rosa.added_at.timestamp_millis(), first.timestamp_millis());
    }

    #[tokio::test]
    async fn classes_are_isolated() {
        let storage = test_storage().await;
        let students = map_of(vec![student("TUPM-22-1234", "Dela Cruz, Juan", Utc::now())]);
        storage
            .merge_students("prof-1", "class-1", &students)
            .await
            .unwrap();

        assert!(storage.list_students("prof-1", "class-2").await.unwrap().is_empty());
        assert!(storage.list_students("prof-2", "class-1").await.unwrap().is_empty());
        assert!(
            storage
                .get_student("prof-2", "class-1", "TUPM-22-1234")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn empty_merge_writes_nothing() {
        let storage = test_storage().await;
        let written = storage
            .merge_students("prof-1", "class-1", &StudentMap::new())
            .await
            .unwrap();
        assert_eq!(written, 0);
        assert!(storage.list_students("prof-1", "class-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("masterlist_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.unwrap();
        let students = map_of(vec![student("TUPM-22-1234", "Dela Cruz, Juan", Utc::now())]);
        rw.merge_students("prof-1", "class-1", &students)
            .await
            .unwrap();
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.unwrap();
        assert_eq!(ro.list_students("prof-1", "class-1").await.unwrap().len(), 1);

        let result = ro.merge_students("prof-1", "class-1", &students).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_merges_all_land() {
        let storage = std::sync::Arc::new(test_storage().await);
        let now = Utc::now();

        let mut handles = Vec::new();
        for class in 0..8 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                let students = map_of(
                    (0..300)
                        .map(|n| student(&format!("TUPM-22-{n:04}"), "Reyes, Ana", now))
                        .collect(),
                );
                storage
                    .merge_students("prof", &format!("class-{class}"), &students)
                    .await
            }));
        }

        for handle in handles {
            let written = handle.await.expect("merge task").expect("merge");
            assert_eq!(written, 300);
        }
        for class in 0..8 {
            let listed = storage
                .list_students("prof", &format!("class-{class}"))
                .await
                .unwrap();
            assert_eq!(listed.len(), 300);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn separate_handles_on_one_file_wait_for_each_other() {
        let tmp = std::env::temp_dir().join(format!("masterlist_test_{}.db", Uuid::now_v7()));
        let first = std::sync::Arc::new(Storage::open(&tmp).await.unwrap());
        let second = std::sync::Arc::new(Storage::open(&tmp).await.unwrap());
        let now = Utc::now();

        let mut handles = Vec::new();
        for (class, storage) in [("class-a", first.clone()), ("class-b", second.clone())] {
            handles.push(tokio::spawn(async move {
                let students = map_of(
                    (0..300)
                        .map(|n| student(&format!("TUPM-23-{n:04}"), "Santos, Lea", now))
                        .collect(),
                );
                storage.merge_students("prof", class, &students).await
            }));
        }
        for handle in handles {
            handle.await.expect("merge task").expect("merge");
        }

        assert_eq!(first.list_students("prof", "class-a").await.unwrap().len(), 300);
        assert_eq!(first.list_students("prof", "class-b").await.unwrap().len(), 300);
    }

    #[tokio::test]
    async fn readonly_requires_existing_file() {
        let tmp = std::env::temp_dir().join(format!("masterlist_missing_{}.db", Uuid::now_v7()));
        let result = Storage::open_readonly(&tmp).await;
        assert!(result.is_err());
    }
}
