//! Food preference persistence
//!
//! Preferences are a separate entity keyed by user id. They are never
//! written by ingestion.

use crate::db::models::FoodPreferences;
use crate::Result;
use sqlx::SqlitePool;

#[derive(Debug, Clone)]
pub struct PreferenceStore {
    pool: SqlitePool,
}

impl PreferenceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace the preferences for `prefs.user_id`
    pub async fn save(&self, prefs: &FoodPreferences) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO food_preferences (
                user_id, fruits, vegetables, grains, red_meat, seafood, poultry,
                fish, eggs, nuts_seeds, persona_id, persona_name,
                biggest_meal_time, sleep_time, wake_time
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                fruits = excluded.fruits,
                vegetables = excluded.vegetables,
                grains = excluded.grains,
                red_meat = excluded.red_meat,
                seafood = excluded.seafood,
                poultry = excluded.poultry,
                fish = excluded.fish,
                eggs = excluded.eggs,
                nuts_seeds = excluded.nuts_seeds,
                persona_id = excluded.persona_id,
                persona_name = excluded.persona_name,
                biggest_meal_time = excluded.biggest_meal_time,
                sleep_time = excluded.sleep_time,
                wake_time = excluded.wake_time
            "#,
        )
        .bind(&prefs.user_id)
        .bind(prefs.fruits)
        .bind(prefs.vegetables)
        .bind(prefs.grains)
        .bind(prefs.red_meat)
        .bind(prefs.seafood)
        .bind(prefs.poultry)
        .bind(prefs.fish)
        .bind(prefs.eggs)
        .bind(prefs.nuts_seeds)
        .bind(prefs.persona_id)
        .bind(&prefs.persona_name)
        .bind(&prefs.biggest_meal_time)
        .bind(&prefs.sleep_time)
        .bind(&prefs.wake_time)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get(&self, user_id: &str) -> Result<Option<FoodPreferences>> {
        let prefs = sqlx::query_as::<_, FoodPreferences>(
            "SELECT * FROM food_preferences WHERE user_id = ?"
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(prefs)
    }

    pub async fn delete_all(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM food_preferences")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
