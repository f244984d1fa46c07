//! `SQLite` food ledger.

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::coach::core::errors::{CoachError, CoachResult};
use crate::coach::core::ids::UserId;
use crate::coach::core::nutrition::{FoodEntry, InputMethod, NutritionItem};
use crate::coach::ledger::food_ledger::{FoodLedger, LedgerFuture};

/// Timestamps are stored as fixed-width RFC 3339 UTC text with nanoseconds,
/// so text order is time order and entries read back unchanged.
fn ts_text(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// `SQLite` implementation of the food ledger.
pub struct SqliteFoodLedger {
    conn: Connection,
    table: String,
}

impl SqliteFoodLedger {
    /// Table name for food entries.
    pub const DEFAULT_TABLE: &'static str = "food_entries";

    /// Open (or create) the ledger database at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> CoachResult<Self> {
        let conn = Connection::open(path.as_ref()).await?;
        Self::init(conn).await
    }

    /// Open a private in-memory ledger.
    ///
    /// # Errors
    /// Returns an error if the database cannot be created.
    pub async fn open_in_memory() -> CoachResult<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> CoachResult<Self> {
        let table = Self::DEFAULT_TABLE.to_string();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    id TEXT PRIMARY KEY,
                    user_id TEXT NOT NULL,
                    ts TEXT NOT NULL,
                    description TEXT NOT NULL,
                    calories REAL NOT NULL,
                    protein REAL NOT NULL,
                    carbs REAL NOT NULL,
                    fat REAL NOT NULL,
                    sugar REAL,
                    fibre REAL,
                    saturated_fat REAL,
                    sodium REAL,
                    cholesterol REAL,
                    input_method TEXT NOT NULL,
                    confidence REAL
                );
                CREATE INDEX IF NOT EXISTS idx_{table_name}_user_ts
                    ON {table_name} (user_id, ts);"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }
}

struct EntryRow {
    id: String,
    user_id: String,
    ts: String,
    nutrition: NutritionItem,
    input_method: String,
    confidence: Option<f64>,
}

impl EntryRow {
    fn into_entry(self) -> CoachResult<FoodEntry> {
        let timestamp = DateTime::parse_from_rfc3339(&self.ts)
            .map_err(|err| CoachError::InvalidRecord(format!("invalid timestamp: {err}")))?
            .with_timezone(&Utc);
        let input_method = InputMethod::from_str(&self.input_method)
            .map_err(|err| CoachError::InvalidRecord(format!("invalid input method: {err}")))?;
        Ok(FoodEntry {
            id: self
                .id
                .parse()
                .map_err(|err| CoachError::InvalidRecord(format!("invalid entry id: {err}")))?,
            user_id: self
                .user_id
                .parse()
                .map_err(|err| CoachError::InvalidRecord(format!("invalid user id: {err}")))?,
            timestamp,
            nutrition: self.nutrition,
            input_method,
            confidence: self.confidence,
        })
    }
}

impl FoodLedger for SqliteFoodLedger {
    fn add(&self, entry: FoodEntry) -> LedgerFuture<'_, CoachResult<()>> {
        Box::pin(async move {
            let table = self.table.clone();
            let id = entry.id;
            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT INTO {table}
                            (id, user_id, ts, description, calories, protein, carbs, fat,
                             sugar, fibre, saturated_fat, sodium, cholesterol, input_method, confidence)
                            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
                        ),
                        rusqlite::params![
                            entry.id.to_string(),
                            entry.user_id.to_string(),
                            ts_text(entry.timestamp),
                            entry.nutrition.description,
                            entry.nutrition.calories,
                            entry.nutrition.protein,
                            entry.nutrition.carbs,
                            entry.nutrition.fat,
                            entry.nutrition.sugar,
                            entry.nutrition.fibre,
                            entry.nutrition.saturated_fat,
                            entry.nutrition.sodium,
                            entry.nutrition.cholesterol,
                            entry.input_method.as_str(),
                            entry.confidence,
                        ],
                    )?;
                    Ok(())
                })
                .await?;
            debug!("Stored food entry {id}");
            Ok(())
        })
    }

    fn entries_between(
        &self,
        user_id: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> LedgerFuture<'_, CoachResult<Vec<FoodEntry>>> {
        Box::pin(async move {
            let table = self.table.clone();
            let user = user_id.to_string();
            let from = ts_text(from);
            let to = ts_text(to);
            let rows = self
                .conn
                .call(move |conn| {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT id, user_id, ts, description, calories, protein, carbs, fat,
                                sugar, fibre, saturated_fat, sodium, cholesterol, input_method, confidence
                         FROM {table}
                         WHERE user_id = ?1 AND ts BETWEEN ?2 AND ?3
                         ORDER BY ts, rowid"
                    ))?;
                    let rows = stmt
                        .query_map(rusqlite::params![user, from, to], |row| {
                            Ok(EntryRow {
                                id: row.get(0)?,
                                user_id: row.get(1)?,
                                ts: row.get(2)?,
                                nutrition: NutritionItem {
                                    description: row.get(3)?,
                                    calories: row.get(4)?,
                                    protein: row.get(5)?,
                                    carbs: row.get(6)?,
                                    fat: row.get(7)?,
                                    sugar: row.get(8)?,
                                    fibre: row.get(9)?,
                                    saturated_fat: row.get(10)?,
                                    sodium: row.get(11)?,
                                    cholesterol: row.get(12)?,
                                },
                                input_method: row.get(13)?,
                                confidence: row.get(14)?,
                            })
                        })?
                        .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                    Ok(rows)
                })
                .await?;

            rows.into_iter().map(EntryRow::into_entry).collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[tokio::test]
    async fn test_roundtrip_keeps_optional_fields() {
        let ledger = SqliteFoodLedger::open_in_memory().await;
        assert!(ledger.is_ok());
        let Ok(ledger) = ledger else {
            return;
        };
        let user = UserId::new();
        let now = Utc::now();
        let mut item = NutritionItem::new("greek yoghurt", 120.0, 10.0, 8.0, 5.0);
        item.sugar = Some(6.5);
        let entry = FoodEntry::from_item(user, now, item, InputMethod::Image, Some(0.8));

        assert!(ledger.add(entry.clone()).await.is_ok());

        let loaded = ledger
            .entries_between(user, now - Duration::minutes(1), now + Duration::minutes(1))
            .await;
        assert!(loaded.is_ok());
        let loaded = loaded.unwrap_or_default();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, entry.id);
        assert_eq!(loaded[0].timestamp, entry.timestamp);
        assert_eq!(loaded[0].nutrition.sugar, Some(6.5));
        assert_eq!(loaded[0].nutrition.fibre, None);
        assert_eq!(loaded[0].input_method, InputMethod::Image);
        assert_eq!(loaded[0].confidence, Some(0.8));
    }

    #[tokio::test]
    async fn test_range_excludes_other_users() {
        let ledger = SqliteFoodLedger::open_in_memory().await;
        assert!(ledger.is_ok());
        let Ok(ledger) = ledger else {
            return;
        };
        let now = Utc::now();
        let me = UserId::new();
        for user in [me, UserId::new()] {
            let entry = FoodEntry::from_item(
                user,
                now,
                NutritionItem::new("rice", 200.0, 4.0, 44.0, 0.4),
                InputMethod::Voice,
                None,
            );
            assert!(ledger.add(entry).await.is_ok());
        }

        let mine = ledger
            .entries_between(me, now - Duration::hours(1), now)
            .await
            .unwrap_or_default();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].user_id, me);
    }

    #[tokio::test]
    async fn test_bounds_resolve_below_a_millisecond() {
        let ledger = SqliteFoodLedger::open_in_memory().await;
        assert!(ledger.is_ok());
        let Ok(ledger) = ledger else {
            return;
        };
        let me = UserId::new();
        let first = Utc::now();
        let second = first + Duration::nanoseconds(500);
        for (at, food) in [(first, "oats"), (second, "milk")] {
            let entry = FoodEntry::from_item(
                me,
                at,
                NutritionItem::new(food, 150.0, 5.0, 27.0, 3.0),
                InputMethod::Text,
                None,
            );
            assert!(ledger.add(entry).await.is_ok());
        }

        let exact = ledger
            .entries_between(me, first, first)
            .await
            .unwrap_or_default();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].nutrition.description, "oats");
        assert_eq!(exact[0].timestamp, first);
    }
}
