//! Record store
//!
//! Point lookups, existence checks, full-table snapshots and the bulk
//! replace/upsert transactions used by the ingestion pipeline.
//!
//! Lookups with a provided value (phone number, credential) compare exactly.
//! No trimming or case folding is applied to the caller's value.

use crate::db::models::{Metric, NutritionRecord};
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::{debug, info};

/// Record persistence over the `records` table
#[derive(Debug, Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

fn select_columns() -> String {
    let mut columns = vec!["user_id", "phone_number", "sex", "password"];
    columns.extend(Metric::ALL.iter().map(|m| m.column()));
    columns.join(", ")
}

fn insert_sql() -> String {
    let mut columns = vec!["user_id", "phone_number", "sex", "password"];
    columns.extend(Metric::ALL.iter().map(|m| m.column()));
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO records ({}) VALUES ({})",
        columns.join(", "),
        placeholders
    )
}

/// Upsert keyed on `user_id`
///
/// The credential column is never overwritten: an account claimed between
/// the two ingestion phases keeps its password.
fn upsert_sql() -> String {
    let mut updates = vec![
        "phone_number = excluded.phone_number".to_string(),
        "sex = excluded.sex".to_string(),
    ];
    updates.extend(
        Metric::ALL
            .iter()
            .map(|m| format!("{0} = excluded.{0}", m.column())),
    );
    format!(
        "{} ON CONFLICT(user_id) DO UPDATE SET {}",
        insert_sql(),
        updates.join(", ")
    )
}

fn record_from_row(row: &SqliteRow) -> Result<NutritionRecord> {
    let mut record = NutritionRecord::new(
        row.try_get::<String, _>("user_id")?,
        row.try_get::<String, _>("phone_number")?,
        row.try_get::<String, _>("sex")?,
    );
    record.password = row.try_get("password")?;
    for metric in Metric::ALL {
        record.set_metric(*metric, row.try_get::<Option<f64>, _>(metric.column())?);
    }
    Ok(record)
}

/// Insert or upsert `records` on an open connection/transaction
async fn write_batch(
    conn: &mut SqliteConnection,
    sql: &str,
    records: &[NutritionRecord],
) -> Result<u64> {
    let mut written = 0;
    for record in records {
        let mut query = sqlx::query(sql)
            .bind(&record.user_id)
            .bind(&record.phone_number)
            .bind(&record.sex)
            .bind(&record.password);
        for (_, value) in record.metrics() {
            query = query.bind(value);
        }
        written += query.execute(&mut *conn).await?.rows_affected();
    }
    Ok(written)
}

impl RecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Point lookup by identifier
    pub async fn get(&self, user_id: &str) -> Result<Option<NutritionRecord>> {
        let sql = format!("SELECT {} FROM records WHERE user_id = ?", select_columns());
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Lookup used by the account-claim flow (identifier + contact token)
    pub async fn find_by_phone(
        &self,
        user_id: &str,
        phone_number: &str,
    ) -> Result<Option<NutritionRecord>> {
        let sql = format!(
            "SELECT {} FROM records WHERE user_id = ? AND phone_number = ?",
            select_columns()
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(phone_number)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Lookup used by login (identifier + credential)
    ///
    /// An unclaimed account has an empty credential and never matches.
    pub async fn find_by_credentials(
        &self,
        user_id: &str,
        password: &str,
    ) -> Result<Option<NutritionRecord>> {
        if password.is_empty() {
            return Ok(None);
        }

        let sql = format!(
            "SELECT {} FROM records WHERE user_id = ? AND password = ?",
            select_columns()
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(password)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    pub async fn exists(&self, user_id: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM records WHERE user_id = ?)"
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    /// Snapshot of every stored record, ordered by identifier
    pub async fn list_all(&self) -> Result<Vec<NutritionRecord>> {
        let sql = format!("SELECT {} FROM records ORDER BY user_id", select_columns());
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(record_from_row).collect()
    }

    /// Every stored identifier, for identifier-selection lists
    pub async fn list_user_ids(&self) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar("SELECT user_id FROM records ORDER BY user_id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Remove every record
    pub async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM records").execute(&self.pool).await?;
        info!(deleted = result.rows_affected(), "Deleted all records");
        Ok(result.rows_affected())
    }

    /// Delete everything, then insert `records`, in one transaction
    ///
    /// A user id repeated within `records` collapses to its last occurrence.
    pub async fn replace_all(&self, records: &[NutritionRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM records")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let inserted = write_batch(&mut tx, &upsert_sql(), records).await?;

        tx.commit().await?;

        debug!(deleted, inserted, "Replaced record table contents");
        Ok(inserted)
    }

    /// Insert or update `records` by primary key, in one transaction
    pub async fn upsert_all(&self, records: &[NutritionRecord]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        let written = write_batch(&mut tx, &upsert_sql(), records).await?;
        tx.commit().await?;

        debug!(written, "Upserted records");
        Ok(written)
    }

    /// Set the credential for an account whose identifier and contact token match
    ///
    /// Returns `false` when no such record exists.
    pub async fn claim_account(
        &self,
        user_id: &str,
        phone_number: &str,
        password: &str,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE records SET password = ? WHERE user_id = ? AND phone_number = ?"
        )
        .bind(password)
        .bind(user_id)
        .bind(phone_number)
        .execute(&self.pool)
        .await?;

        let claimed = result.rows_affected() > 0;
        if claimed {
            info!(user_id, "Account claimed");
        }
        Ok(claimed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::open_store;
    use tempfile::TempDir;

    async fn setup_store() -> (TempDir, RecordStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = open_store(&temp_dir.path().join("records.db")).await.unwrap();
        (temp_dir, store.records())
    }

    fn sample(user_id: &str, sex: &str) -> NutritionRecord {
        NutritionRecord::new(user_id, format!("614000000{}", user_id), sex)
            .with_metric(Metric::HeifaTotalScoreMale, 61.5)
            .with_metric(Metric::HeifaTotalScoreFemale, 58.0)
    }

    #[test]
    fn test_upsert_sql_never_touches_password() {
        let sql = upsert_sql();
        assert!(sql.contains("ON CONFLICT(user_id) DO UPDATE SET"));
        assert!(!sql.contains("password = excluded.password"));
        assert!(sql.contains("water_total_ml = excluded.water_total_ml"));
    }

    #[tokio::test]
    async fn test_replace_all_then_get() {
        let (_dir, store) = setup_store().await;

        let inserted = store
            .replace_all(&[sample("1", "Male"), sample("2", "Female")])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(store.count().await.unwrap(), 2);

        let record = store.get("1").await.unwrap().unwrap();
        assert_eq!(record, sample("1", "Male"));
        assert!(store.get("missing").await.unwrap().is_none());
        assert!(store.exists("2").await.unwrap());
        assert!(!store.exists("3").await.unwrap());
    }

    #[tokio::test]
    async fn test_replace_all_discards_previous_rows() {
        let (_dir, store) = setup_store().await;

        store.replace_all(&[sample("1", "Male"), sample("2", "Male")]).await.unwrap();
        store.replace_all(&[sample("3", "Female")]).await.unwrap();

        assert_eq!(store.list_user_ids().await.unwrap(), vec!["3".to_string()]);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_in_place_and_keeps_password() {
        let (_dir, store) = setup_store().await;

        store
            .replace_all(&[NutritionRecord::new("1", "61400000001", "Male")])
            .await
            .unwrap();
        assert!(store.claim_account("1", "61400000001", "secret").await.unwrap());

        let full = sample("1", "Male").with_metric(Metric::WaterTotalMl, 2600.0);
        store.upsert_all(&[full]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let record = store.get("1").await.unwrap().unwrap();
        assert_eq!(record.metric(Metric::WaterTotalMl), Some(2600.0));
        assert_eq!(record.password, "secret");
    }

    #[tokio::test]
    async fn test_claim_and_login_are_exact_match() {
        let (_dir, store) = setup_store().await;
        store.replace_all(&[sample("1", "Male")]).await.unwrap();

        // Unclaimed accounts cannot log in
        assert!(store.find_by_credentials("1", "").await.unwrap().is_none());

        assert!(!store.claim_account("1", "wrong", "pw").await.unwrap());
        assert!(store.find_by_phone("1", " 6140000001").await.unwrap().is_none());
        assert!(store.find_by_phone("1", "6140000001").await.unwrap().is_some());

        assert!(store.claim_account("1", "6140000001", "Pw").await.unwrap());
        assert!(store.find_by_credentials("1", "pw").await.unwrap().is_none());
        assert!(store.find_by_credentials("1", "Pw").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_replace_all_collapses_repeated_ids() {
        let (_dir, store) = setup_store().await;

        let later = sample("1", "Female").with_metric(Metric::Sugar, 3.0);
        store.replace_all(&[sample("1", "Male"), later.clone()]).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.get("1").await.unwrap().unwrap(), later);
    }

    #[tokio::test]
    async fn test_delete_all_and_list_all() {
        let (_dir, store) = setup_store().await;
        store.replace_all(&[sample("2", "Male"), sample("1", "Female")]).await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].user_id, "1");

        assert_eq!(store.delete_all().await.unwrap(), 2);
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
