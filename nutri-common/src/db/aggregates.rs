//! Aggregate queries over the `records` table
//!
//! Component names accepted here are the closed set understood by
//! [`Component::from_aggregate_name`]. An unrecognized name yields `0.0` or
//! `0` rather than an error.

use crate::db::models::{is_male, Component, Metric};
use crate::Result;
use sqlx::SqlitePool;
use tracing::debug;

/// Daily water intake (mL) above which a person counts as a high consumer
pub const HIGH_WATER_INTAKE_ML: f64 = 2500.0;

/// Daily sodium intake (mg) above which a person counts as a high consumer
pub const HIGH_SODIUM_MG: f64 = 2300.0;

/// SQL expression selecting the male or female column by each row's `sex`
fn gender_resolved(male: Metric, female: Metric) -> String {
    format!(
        "CASE WHEN lower(sex) = 'male' THEN {} ELSE {} END",
        male.column(),
        female.column()
    )
}

#[derive(Debug, Clone)]
pub struct AggregateQueries {
    pool: SqlitePool,
}

impl AggregateQueries {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Mean of `column` over records of `sex` (0.0 when no non-null values)
    async fn average_for_sex(&self, column: &str, sex: &str) -> Result<f64> {
        let sql = format!(
            "SELECT AVG({}) FROM records WHERE lower(sex) = lower(?)",
            column
        );
        let average: Option<f64> = sqlx::query_scalar(&sql)
            .bind(sex)
            .fetch_one(&self.pool)
            .await?;
        Ok(average.unwrap_or(0.0))
    }

    async fn count_where(&self, predicate: &str, threshold: f64) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM records WHERE {}", predicate);
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(threshold)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Average component score among people of `sex`
    pub async fn average_component_by_sex(&self, component_name: &str, sex: &str) -> Result<f64> {
        let Some(component) = Component::from_aggregate_name(component_name) else {
            debug!(component_name, "Unknown aggregate component");
            return Ok(0.0);
        };
        let metric = component.metric_for(is_male(sex));
        self.average_for_sex(metric.column(), sex).await
    }

    /// Average HEIFA total among people of `sex`
    pub async fn average_total_score_by_sex(&self, sex: &str) -> Result<f64> {
        let metric = if is_male(sex) {
            Metric::HeifaTotalScoreMale
        } else {
            Metric::HeifaTotalScoreFemale
        };
        self.average_for_sex(metric.column(), sex).await
    }

    pub async fn count_total_score_above(&self, threshold: f64) -> Result<i64> {
        let expr = gender_resolved(Metric::HeifaTotalScoreMale, Metric::HeifaTotalScoreFemale);
        self.count_where(&format!("{} > ?", expr), threshold).await
    }

    pub async fn count_total_score_below(&self, threshold: f64) -> Result<i64> {
        let expr = gender_resolved(Metric::HeifaTotalScoreMale, Metric::HeifaTotalScoreFemale);
        self.count_where(&format!("{} < ?", expr), threshold).await
    }

    pub async fn count_component_above(&self, component_name: &str, threshold: f64) -> Result<i64> {
        let Some(component) = Component::from_aggregate_name(component_name) else {
            return Ok(0);
        };
        let (male, female) = component.variants();
        self.count_where(&format!("{} > ?", gender_resolved(male, female)), threshold)
            .await
    }

    pub async fn count_component_below(&self, component_name: &str, threshold: f64) -> Result<i64> {
        let Some(component) = Component::from_aggregate_name(component_name) else {
            return Ok(0);
        };
        let (male, female) = component.variants();
        self.count_where(&format!("{} < ?", gender_resolved(male, female)), threshold)
            .await
    }

    pub async fn count_high_water_intake(&self) -> Result<i64> {
        let predicate = format!("{} > ?", Metric::WaterTotalMl.column());
        self.count_where(&predicate, HIGH_WATER_INTAKE_ML).await
    }

    pub async fn count_high_sodium(&self) -> Result<i64> {
        let predicate = format!("{} > ?", Metric::SodiumMg.column());
        self.count_where(&predicate, HIGH_SODIUM_MG).await
    }

    pub async fn count_alcohol_consumers(&self) -> Result<i64> {
        let predicate = format!("{} > ?", Metric::AlcoholStandardDrinks.column());
        self.count_where(&predicate, 0.0).await
    }

    pub async fn count_by_sex(&self, sex: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM records WHERE lower(sex) = lower(?)"
        )
        .bind(sex)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
