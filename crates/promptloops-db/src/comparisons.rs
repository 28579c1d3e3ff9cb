//! Append-only store of pairwise comparisons.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::MutexGuard;

/// A stored comparison. Critique and verdict payloads are opaque JSON blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub comparison_id: String,
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub variant: String,
    pub temp_mode: String,
    pub threshold_mode: String,
    pub user_input: String,
    pub route: String,
    pub temperature_used: f64,
    pub rewrite_threshold_used: Option<u32>,
    pub rewritten: bool,
    pub original_prompt: String,
    pub original_response: String,
    pub original_critique: Value,
    pub original_heuristic: Value,
    pub enhanced_prompt: String,
    pub enhanced_response: String,
    pub enhanced_critique: Value,
    pub enhanced_heuristic: Value,
    pub generative_verdict: Value,
    pub heuristic_verdict: Value,
}

/// One line of history
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonSummary {
    pub comparison_id: String,
    pub created_at: DateTime<Utc>,
    pub route: String,
    pub temperature_used: f64,
    pub rewrite_threshold_used: Option<u32>,
    pub rewritten: bool,
    /// Absent when the generative judge failed
    pub generative_winner: Option<String>,
    pub heuristic_winner: Option<String>,
    pub user_input: String,
}

const COLUMNS: &str = "comparison_id, run_id, created_at, variant, temp_mode, threshold_mode, \
user_input, route, temperature_used, rewrite_threshold_used, rewritten, original_prompt, \
original_response, original_critique, original_heuristic, enhanced_prompt, enhanced_response, \
enhanced_critique, enhanced_heuristic, generative_verdict, heuristic_verdict";

/// Comparisons store with a borrowed connection.
pub struct Comparisons<'db> {
    conn: MutexGuard<'db, Connection>,
}

impl<'db> Comparisons<'db> {
    pub(crate) fn new(conn: MutexGuard<'db, Connection>) -> Self {
        Self { conn }
    }

    /// Insert a comparison keyed by its id.
    ///
    /// Returns `false` when a row with the same id already exists; the stored
    /// row is left untouched.
    pub fn append(&self, row: &ComparisonRow) -> Result<bool, rusqlite::Error> {
        let inserted = self.conn.execute(
            &format!(
                "INSERT INTO comparisons ({}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21) \
                 ON CONFLICT(comparison_id) DO NOTHING",
                COLUMNS
            ),
            params![
                row.comparison_id,
                row.run_id,
                row.created_at.to_rfc3339(),
                row.variant,
                row.temp_mode,
                row.threshold_mode,
                row.user_input,
                row.route,
                row.temperature_used,
                row.rewrite_threshold_used,
                row.rewritten,
                row.original_prompt,
                row.original_response,
                row.original_critique.to_string(),
                row.original_heuristic.to_string(),
                row.enhanced_prompt,
                row.enhanced_response,
                row.enhanced_critique.to_string(),
                row.enhanced_heuristic.to_string(),
                row.generative_verdict.to_string(),
                row.heuristic_verdict.to_string(),
            ],
        )?;

        Ok(inserted > 0)
    }

    pub fn get(&self, comparison_id: &str) -> Result<Option<ComparisonRow>, rusqlite::Error> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM comparisons WHERE comparison_id = ?1", COLUMNS),
                params![comparison_id],
                Self::row_to_record,
            )
            .optional()
    }

    /// Most recent comparisons first
    pub fn recent(&self, limit: usize) -> Result<Vec<ComparisonSummary>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM comparisons ORDER BY created_at DESC LIMIT ?1",
            COLUMNS
        ))?;
        let rows = stmt.query_map(params![limit as i64], Self::row_to_record)?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(ComparisonSummary::from(row?));
        }

        Ok(summaries)
    }

    pub fn count(&self) -> Result<usize, rusqlite::Error> {
        self.conn
            .query_row("SELECT COUNT(*) FROM comparisons", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as usize)
    }

    fn row_to_record(row: &rusqlite::Row) -> Result<ComparisonRow, rusqlite::Error> {
        let created_at: String = row.get(2)?;

        Ok(ComparisonRow {
            comparison_id: row.get(0)?,
            run_id: row.get(1)?,
            created_at: parse_timestamp(2, &created_at)?,
            variant: row.get(3)?,
            temp_mode: row.get(4)?,
            threshold_mode: row.get(5)?,
            user_input: row.get(6)?,
            route: row.get(7)?,
            temperature_used: row.get(8)?,
            rewrite_threshold_used: row.get(9)?,
            rewritten: row.get(10)?,
            original_prompt: row.get(11)?,
            original_response: row.get(12)?,
            original_critique: json_column(row, 13)?,
            original_heuristic: json_column(row, 14)?,
            enhanced_prompt: row.get(15)?,
            enhanced_response: row.get(16)?,
            enhanced_critique: json_column(row, 17)?,
            enhanced_heuristic: json_column(row, 18)?,
            generative_verdict: json_column(row, 19)?,
            heuristic_verdict: json_column(row, 20)?,
        })
    }
}

impl From<ComparisonRow> for ComparisonSummary {
    fn from(row: ComparisonRow) -> Self {
        Self {
            generative_winner: winner_of(&row.generative_verdict),
            heuristic_winner: winner_of(&row.heuristic_verdict),
            comparison_id: row.comparison_id,
            created_at: row.created_at,
            route: row.route,
            temperature_used: row.temperature_used,
            rewrite_threshold_used: row.rewrite_threshold_used,
            rewritten: row.rewritten,
            user_input: row.user_input,
        }
    }
}

fn winner_of(verdict: &Value) -> Option<String> {
    verdict
        .get("winner")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn parse_timestamp(index: usize, value: &str) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                index,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}

fn json_column(row: &rusqlite::Row, index: usize) -> Result<Value, rusqlite::Error> {
    let text: String = row.get(index)?;
    serde_json::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}
