//! Gender-aware score projection
//!
//! Turns a stored record into an [`InsightView`]: one value per component
//! taken from the variant matching the record's sex, with nulls read as zero.

use crate::db::models::{Component, Metric, NutritionRecord};
use serde::Serialize;

/// Gender-resolved, null-defaulted scores for one person
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct InsightView {
    pub discretionary_score: f64,
    pub vegetables_score: f64,
    pub fruit_score: f64,
    pub grains_and_cereals_score: f64,
    pub whole_grains_score: f64,
    pub meat_and_alternatives_score: f64,
    pub dairy_and_alternatives_score: f64,
    pub sodium_score: f64,
    pub alcohol_score: f64,
    pub water_score: f64,
    pub sugar_score: f64,
    pub saturated_fat_score: f64,
    pub unsaturated_fat_score: f64,
    pub total_score: f64,
}

impl InsightView {
    /// Score for one component
    pub fn component(&self, component: Component) -> f64 {
        match component {
            Component::Discretionary => self.discretionary_score,
            Component::Vegetables => self.vegetables_score,
            Component::Fruit => self.fruit_score,
            Component::GrainsAndCereals => self.grains_and_cereals_score,
            Component::WholeGrains => self.whole_grains_score,
            Component::MeatAndAlternatives => self.meat_and_alternatives_score,
            Component::DairyAndAlternatives => self.dairy_and_alternatives_score,
            Component::Sodium => self.sodium_score,
            Component::Alcohol => self.alcohol_score,
            Component::Water => self.water_score,
            Component::Sugar => self.sugar_score,
            Component::SaturatedFat => self.saturated_fat_score,
            Component::UnsaturatedFat => self.unsaturated_fat_score,
        }
    }
}

/// Project `record` into its insight view
///
/// Returns `None` when there is no record.
pub fn project(record: Option<&NutritionRecord>) -> Option<InsightView> {
    let record = record?;
    let male = record.is_male();
    let score = |component: Component| record.metric(component.metric_for(male)).unwrap_or(0.0);

    let total = if male {
        Metric::HeifaTotalScoreMale
    } else {
        Metric::HeifaTotalScoreFemale
    };

    Some(InsightView {
        discretionary_score: score(Component::Discretionary),
        vegetables_score: score(Component::Vegetables),
        fruit_score: score(Component::Fruit),
        grains_and_cereals_score: score(Component::GrainsAndCereals),
        whole_grains_score: score(Component::WholeGrains),
        meat_and_alternatives_score: score(Component::MeatAndAlternatives),
        dairy_and_alternatives_score: score(Component::DairyAndAlternatives),
        sodium_score: score(Component::Sodium),
        alcohol_score: score(Component::Alcohol),
        water_score: score(Component::Water),
        sugar_score: score(Component::Sugar),
        saturated_fat_score: score(Component::SaturatedFat),
        unsaturated_fat_score: score(Component::UnsaturatedFat),
        total_score: record.metric(total).unwrap_or(0.0),
    })
}

/// Overall diet rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Rating {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl Rating {
    /// `"Poor"`, `"Fair"` and `"Good"` map to themselves; any other label is `Excellent`
    pub fn from_label(label: &str) -> Rating {
        match label {
            "Poor" => Rating::Poor,
            "Fair" => Rating::Fair,
            "Good" => Rating::Good,
            _ => Rating::Excellent,
        }
    }

    /// Built-in English description
    pub fn fallback_description(self) -> &'static str {
        match self {
            Rating::Poor => {
                "Your diet needs significant improvement to meet healthy eating guidelines."
            }
            Rating::Fair => {
                "Your diet has some healthy elements, but could use improvement in certain areas."
            }
            Rating::Good => {
                "Your diet is generally healthy with a few areas that could be improved."
            }
            Rating::Excellent => "Excellent! Your diet closely follows healthy eating guidelines.",
        }
    }
}

/// Source of localized rating descriptions
pub trait RatingDescriptions: Send + Sync {
    fn description(&self, rating: Rating) -> String;
}

/// Human-readable description for a rating label
pub fn describe(rating_label: &str, strings: Option<&dyn RatingDescriptions>) -> String {
    let rating = Rating::from_label(rating_label);
    match strings {
        Some(strings) => strings.description(rating),
        None => rating.fallback_description().to_string(),
    }
}
