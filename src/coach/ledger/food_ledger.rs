//! Food ledger contract and in-memory implementation.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::coach::core::errors::CoachResult;
use crate::coach::core::ids::UserId;
use crate::coach::core::nutrition::FoodEntry;

/// Boxed future type for ledger operations.
pub type LedgerFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Append-only persistence boundary for confirmed food entries.
pub trait FoodLedger: Send + Sync {
    /// Persist one entry.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn add(&self, entry: FoodEntry) -> LedgerFuture<'_, CoachResult<()>>;

    /// Entries of a user logged in `[from, to]`, oldest first.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn entries_between(
        &self,
        user_id: UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> LedgerFuture<'_, CoachResult<Vec<FoodEntry>>>;
}

/// Ledger keeping entries in process memory.
#[derive(Default)]
pub struct InMemoryFoodLedger {
    entries: Mutex<Vec<FoodEntry>>,
}

impl InMemoryFoodLedger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries in insertion order.
    pub async fn entries(&self) -> Vec<FoodEntry> {
        self.entries.lock().await.clone()
    }
}

impl FoodLedger for InMemoryFoodLedger {
    fn add(&self, entry: FoodEntry) -> LedgerFuture<'_, CoachResult<()>> {
        Box::pin(async move {
            self.entries.lock().await.push(entry);
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
            let entries = self.entries.lock().await;
            let mut matching: Vec<FoodEntry> = entries
                .iter()
                .filter(|e| e.user_id == user_id && e.timestamp >= from && e.timestamp <= to)
                .cloned()
                .collect();
            matching.sort_by_key(|e| e.timestamp);
            Ok(matching)
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::coach::core::nutrition::{InputMethod, NutritionItem};

    fn entry(user_id: UserId, at: DateTime<Utc>, calories: f64) -> FoodEntry {
        FoodEntry::from_item(
            user_id,
            at,
            NutritionItem::new("food", calories, 0.0, 0.0, 0.0),
            InputMethod::Text,
            None,
        )
    }

    #[tokio::test]
    async fn test_entries_between_filters_user_and_range() {
        let ledger = InMemoryFoodLedger::new();
        let me = UserId::new();
        let other = UserId::new();
        let now = Utc::now();

        assert!(ledger.add(entry(me, now - Duration::days(2), 100.0)).await.is_ok());
        assert!(ledger.add(entry(me, now, 200.0)).await.is_ok());
        assert!(ledger.add(entry(other, now, 300.0)).await.is_ok());

        let today = ledger
            .entries_between(me, now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap_or_default();
        assert_eq!(today.len(), 1);
        assert!((today[0].nutrition.calories - 200.0).abs() < f64::EPSILON);
        assert_eq!(ledger.entries().await.len(), 3);
    }
}
