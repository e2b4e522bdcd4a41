//src/readdb.rs

use std::path::Path;
use rusqlite::{params, Connection};

use crate::error::Result;
use crate::types::Mate;

/// One row of the `reads` table, restricted to a single mate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRead {
    pub id: i64,
    pub sequence: String,
}

/// Persisted paired-end reads and their component assignments (SQLite).
pub struct ReadStore {
    conn: Connection,
}

impl ReadStore {
    /// Opens (or creates) the database file. Durability is traded for speed:
    /// every statement here can be replayed from the inputs.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA synchronous = OFF;")?;
        Ok(Self { conn })
    }

    pub fn create_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS reads (
                ID INTEGER PRIMARY KEY,
                PE_seq1 TEXT,
                PE_seq2 TEXT,
                seq1_collective_component INTEGER,
                seq2_collective_component INTEGER,
                seq1_original_component INTEGER,
                seq2_original_component INTEGER
            );",
        )?;
        Ok(())
    }

    pub fn insert_read(
        &self,
        id: i64,
        seq1: &str,
        seq2: &str,
        collective1: u64,
        collective2: u64,
    ) -> Result<()> {
        self.conn.execute(
            "INSERT INTO reads (ID, PE_seq1, PE_seq2, seq1_collective_component, seq2_collective_component)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, seq1, seq2, collective1 as i64, collective2 as i64],
        )?;
        Ok(())
    }

    /// Reads of `mate` previously assigned to collective component `component`, by ID.
    pub fn reads_for_component(&self, mate: Mate, component: u64) -> Result<Vec<StoredRead>> {
        let n = mate.number();
        let sql = format!(
            "SELECT ID, PE_seq{n} FROM reads WHERE seq{n}_collective_component = ?1 ORDER BY ID",
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([component as i64], |row| {
            Ok(StoredRead {
                id: row.get(0)?,
                sequence: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            })
        })?;

        let mut reads = Vec::new();
        for row in rows {
            reads.push(row?);
        }
        Ok(reads)
    }

    pub fn set_original_component(&self, mate: Mate, id: i64, component: u64) -> Result<()> {
        let n = mate.number();
        let sql = format!("UPDATE reads SET seq{n}_original_component = ?1 WHERE ID = ?2");
        self.conn.execute(&sql, params![component as i64, id])?;
        Ok(())
    }

    /// Records both mates' assignments of one read at once.
    pub fn update_original_components(&self, id: i64, component1: u64, component2: u64) -> Result<()> {
        self.conn.execute(
            "UPDATE reads SET seq1_original_component = ?1, seq2_original_component = ?2 WHERE ID = ?3",
            params![component1 as i64, component2 as i64, id],
        )?;
        Ok(())
    }

    pub fn original_component(&self, mate: Mate, id: i64) -> Result<Option<u64>> {
        let n = mate.number();
        let sql = format!("SELECT seq{n}_original_component FROM reads WHERE ID = ?1");
        let value: Option<i64> = self.conn.query_row(&sql, [id], |row| row.get(0))?;
        Ok(value.map(|v| v as u64))
    }

    /// Groups several writes into one transaction.
    pub fn begin(&self) -> Result<()> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    pub fn commit(&self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ReadStore {
        let store = ReadStore::open_in_memory().unwrap();
        store.create_schema().unwrap();
        store.insert_read(1, "AAAA", "CCCC", 3, 4).unwrap();
        store.insert_read(2, "GGGG", "TTTT", 3, 3).unwrap();
        store.insert_read(3, "ACGT", "TGCA", 5, 3).unwrap();
        store
    }

    #[test]
    fn selects_reads_by_mate_and_component() {
        let store = store();
        let r1 = store.reads_for_component(Mate::First, 3).unwrap();
        assert_eq!(
            r1,
            vec![
                StoredRead { id: 1, sequence: "AAAA".into() },
                StoredRead { id: 2, sequence: "GGGG".into() },
            ]
        );
        let r2 = store.reads_for_component(Mate::Second, 3).unwrap();
        let ids: Vec<i64> = r2.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(r2[1].sequence, "TGCA");
        assert!(store.reads_for_component(Mate::First, 42).unwrap().is_empty());
    }

    #[test]
    fn updates_original_components() {
        let store = store();
        assert_eq!(store.original_component(Mate::First, 1).unwrap(), None);
        store.update_original_components(1, 11, 12).unwrap();
        store.set_original_component(Mate::Second, 2, 7).unwrap();
        assert_eq!(store.original_component(Mate::First, 1).unwrap(), Some(11));
        assert_eq!(store.original_component(Mate::Second, 1).unwrap(), Some(12));
        assert_eq!(store.original_component(Mate::Second, 2).unwrap(), Some(7));
    }

    #[test]
    fn missing_row_is_an_error() {
        let store = store();
        assert!(store.original_component(Mate::First, 99).is_err());
    }
}
