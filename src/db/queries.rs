use super::{Database, Result};
use crate::learning::{Correction, LearningStore};
use crate::structure::BlockType;
use chrono::{DateTime, Utc};
use rusqlite::params;

fn parse_type(term: &str, raw: &str) -> Option<BlockType> {
    match raw.parse::<BlockType>() {
        Ok(t) => Some(t),
        Err(e) => {
            log::warn!("Skipping stored entry '{}': {}", term, e);
            None
        }
    }
}

impl Database {
    /// Load the whole learning store.
    pub fn load_learning(&self) -> Result<LearningStore> {
        let mut store = LearningStore::default();

        for (table, map) in [
            ("learned_terms", &mut store.learned_terms),
            ("pattern_history", &mut store.pattern_history),
        ] {
            let mut stmt = self
                .conn
                .prepare(&format!("SELECT term, block_type FROM {table}"))?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (term, raw) = row?;
                if let Some(t) = parse_type(&term, &raw) {
                    map.insert(term, t);
                }
            }
        }

        let mut stmt = self
            .conn
            .prepare("SELECT term, block_type, label, recorded_at FROM user_corrections")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        for row in rows {
            let (term, raw, label, recorded_at) = row?;
            let Some(block_type) = parse_type(&term, &raw) else {
                continue;
            };
            let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(|e| {
                    log::debug!("Bad timestamp for '{}': {}", term, e);
                    Utc::now()
                });
            store.user_corrections.insert(
                term,
                Correction {
                    block_type,
                    label,
                    recorded_at,
                },
            );
        }

        let mut stmt = self
            .conn
            .prepare("SELECT term, confidence FROM confidence_scores")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;
        for row in rows {
            let (term, confidence) = row?;
            store.confidence.insert(term, confidence);
        }

        Ok(store)
    }

    /// Replace the persisted learning store with `store` in one transaction.
    pub fn save_learning(&self, store: &LearningStore) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        clear_tables(&tx)?;

        {
            let mut stmt =
                tx.prepare("INSERT INTO learned_terms (term, block_type) VALUES (?1, ?2)")?;
            for (term, t) in &store.learned_terms {
                stmt.execute(params![term, t.as_str()])?;
            }

            let mut stmt =
                tx.prepare("INSERT INTO pattern_history (term, block_type) VALUES (?1, ?2)")?;
            for (term, t) in &store.pattern_history {
                stmt.execute(params![term, t.as_str()])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO user_corrections (term, block_type, label, recorded_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (term, c) in &store.user_corrections {
                stmt.execute(params![
                    term,
                    c.block_type.as_str(),
                    c.label,
                    c.recorded_at.to_rfc3339()
                ])?;
            }

            let mut stmt =
                tx.prepare("INSERT INTO confidence_scores (term, confidence) VALUES (?1, ?2)")?;
            for (term, confidence) in &store.confidence {
                stmt.execute(params![term, confidence])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Delete everything learned.
    pub fn clear_learning(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        clear_tables(&tx)?;
        tx.commit()?;
        Ok(())
    }
}

fn clear_tables(conn: &rusqlite::Connection) -> Result<()> {
    conn.execute_batch(
        "DELETE FROM learned_terms;
         DELETE FROM pattern_history;
         DELETE FROM user_corrections;
         DELETE FROM confidence_scores;",
    )?;
    Ok(())
}
