//! SQL migration definitions for the masterlist database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: class student collections",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- professors/{professor_id}/classes/{class_id}/students/{student_id}
CREATE TABLE IF NOT EXISTS students (
    professor_id TEXT NOT NULL,
    class_id     TEXT NOT NULL,
    student_id   TEXT NOT NULL,
    name         TEXT NOT NULL,
    added_at     TEXT NOT NULL,
    PRIMARY KEY (professor_id, class_id, student_id)
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
