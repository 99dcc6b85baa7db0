//! Schema version bookkeeping shared by both stores.

use rusqlite::{Connection, OptionalExtension};

use crate::errors::LoaderError;

/// A store's DDL plus the name of the single-row table that records which
/// version of it a database carries.
pub struct StoreSchema {
    pub meta_table: &'static str,
    pub version: i64,
    pub statements: &'static [&'static str],
}

impl StoreSchema {
    /// Creates missing tables and stamps the version row. Refuses to open a
    /// database written by a newer schema.
    pub fn ensure(&self, conn: &Connection) -> Result<(), LoaderError> {
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                schema_version INTEGER NOT NULL
            )",
            self.meta_table
        ))
        .map_err(|e| LoaderError::from_sqlite("schema", e))?;
        for sql in self.statements {
            conn.execute_batch(sql)
                .map_err(|e| LoaderError::from_sqlite("schema", e))?;
        }
        match self.read_version(conn)? {
            Some(existing) if existing > self.version => Err(LoaderError::store(format!(
                "database schema version {existing} is newer than supported {}",
                self.version
            ))),
            Some(existing) if existing < self.version => {
                conn.execute(
                    &format!("UPDATE {} SET schema_version=?1 WHERE id=1", self.meta_table),
                    [self.version],
                )
                .map_err(|e| LoaderError::from_sqlite("schema", e))?;
                Ok(())
            }
            Some(_) => Ok(()),
            None => {
                conn.execute(
                    &format!(
                        "INSERT INTO {}(id, schema_version) VALUES(1, ?1)",
                        self.meta_table
                    ),
                    [self.version],
                )
                .map_err(|e| LoaderError::from_sqlite("schema", e))?;
                Ok(())
            }
        }
    }

    pub fn read_version(&self, conn: &Connection) -> Result<Option<i64>, LoaderError> {
        conn.query_row(
            &format!("SELECT schema_version FROM {} WHERE id=1", self.meta_table),
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| LoaderError::from_sqlite("schema", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SCHEMA: StoreSchema = StoreSchema {
        meta_table: "test_meta",
        version: 2,
        statements: &["CREATE TABLE IF NOT EXISTS items(id TEXT PRIMARY KEY)"],
    };

    #[test]
    fn ensure_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        TEST_SCHEMA.ensure(&conn).unwrap();
        TEST_SCHEMA.ensure(&conn).unwrap();
        assert_eq!(TEST_SCHEMA.read_version(&conn).unwrap(), Some(2));
    }

    #[test]
    fn newer_database_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        TEST_SCHEMA.ensure(&conn).unwrap();
        conn.execute("UPDATE test_meta SET schema_version=9 WHERE id=1", [])
            .unwrap();
        assert!(TEST_SCHEMA.ensure(&conn).is_err());
    }
}
