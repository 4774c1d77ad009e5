//! Database models
//!
//! The nutrition dataset has a fixed set of columns. Every numeric column is
//! declared exactly once in the `nutrition_metrics!` table below, which
//! gives its source header name and its SQL column name. All SQL for the
//! `records` table and all header lookups are derived from that table.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

macro_rules! nutrition_metrics {
    ($( $variant:ident => ($header:literal, $column:literal) ),+ $(,)?) => {
        /// One numeric column of a nutrition record
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Metric {
            $($variant),+
        }

        impl Metric {
            /// Every metric, in declaration order
            pub const ALL: &'static [Metric] = &[$(Metric::$variant),+];

            /// Number of metrics
            pub const COUNT: usize = Metric::ALL.len();

            /// Column name in the source dataset header
            pub fn header(self) -> &'static str {
                match self {
                    $(Metric::$variant => $header),+
                }
            }

            /// Column name in the `records` table
            pub fn column(self) -> &'static str {
                match self {
                    $(Metric::$variant => $column),+
                }
            }
        }
    };
}

nutrition_metrics! {
    HeifaTotalScoreMale => ("HEIFAtotalscoreMale", "heifa_total_score_male"),
    HeifaTotalScoreFemale => ("HEIFAtotalscoreFemale", "heifa_total_score_female"),

    DiscretionaryScoreMale => ("DiscretionaryHEIFAscoreMale", "discretionary_heifa_score_male"),
    DiscretionaryScoreFemale => ("DiscretionaryHEIFAscoreFemale", "discretionary_heifa_score_female"),
    DiscretionaryServeSize => ("Discretionaryservesize", "discretionary_serve_size"),

    VegetablesScoreMale => ("VegetablesHEIFAscoreMale", "vegetables_heifa_score_male"),
    VegetablesScoreFemale => ("VegetablesHEIFAscoreFemale", "vegetables_heifa_score_female"),
    VegetablesWithLegumesServeSize => ("Vegetableswithlegumesallocatedservesize", "vegetables_with_legumes_serve_size"),
    LegumesAllocatedVegetables => ("LegumesallocatedVegetables", "legumes_allocated_vegetables"),
    VegetablesVariationsScore => ("Vegetablesvariationsscore", "vegetables_variations_score"),
    VegetablesCruciferous => ("VegetablesCruciferous", "vegetables_cruciferous"),
    VegetablesTuberAndBulb => ("VegetablesTuberandbulb", "vegetables_tuber_and_bulb"),
    VegetablesOther => ("VegetablesOther", "vegetables_other"),
    Legumes => ("Legumes", "legumes"),
    VegetablesGreen => ("VegetablesGreen", "vegetables_green"),
    VegetablesRedAndOrange => ("VegetablesRedandorange", "vegetables_red_and_orange"),

    FruitServeSize => ("Fruitservesize", "fruit_serve_size"),
    FruitScoreMale => ("FruitHEIFAscoreMale", "fruit_heifa_score_male"),
    FruitScoreFemale => ("FruitHEIFAscoreFemale", "fruit_heifa_score_female"),
    FruitVariationsScore => ("Fruitvariationsscore", "fruit_variations_score"),
    FruitPome => ("FruitPome", "fruit_pome"),
    FruitTropicalAndSubtropical => ("FruitTropicalandsubtropical", "fruit_tropical_and_subtropical"),
    FruitBerry => ("FruitBerry", "fruit_berry"),
    FruitStone => ("FruitStone", "fruit_stone"),
    FruitCitrus => ("FruitCitrus", "fruit_citrus"),
    FruitOther => ("FruitOther", "fruit_other"),

    GrainsScoreMale => ("GrainsandcerealsHEIFAscoreMale", "grains_and_cereals_heifa_score_male"),
    GrainsScoreFemale => ("GrainsandcerealsHEIFAscoreFemale", "grains_and_cereals_heifa_score_female"),
    GrainsServeSize => ("Grainsandcerealsservesize", "grains_and_cereals_serve_size"),
    GrainsNonWholegrains => ("GrainsandcerealsNonwholegrains", "grains_and_cereals_non_wholegrains"),

    WholeGrainsScoreMale => ("WholegrainsHEIFAscoreMale", "whole_grains_heifa_score_male"),
    WholeGrainsScoreFemale => ("WholegrainsHEIFAscoreFemale", "whole_grains_heifa_score_female"),
    WholeGrainsServeSize => ("Wholegrainsservesize", "whole_grains_serve_size"),

    MeatScoreMale => ("MeatandalternativesHEIFAscoreMale", "meat_and_alternatives_heifa_score_male"),
    MeatScoreFemale => ("MeatandalternativesHEIFAscoreFemale", "meat_and_alternatives_heifa_score_female"),
    MeatWithLegumesServeSize => ("Meatandalternativeswithlegumesallocatedservesize", "meat_and_alternatives_with_legumes_serve_size"),
    LegumesAllocatedMeat => ("LegumesallocatedMeatandalternatives", "legumes_allocated_meat_and_alternatives"),

    DairyScoreMale => ("DairyandalternativesHEIFAscoreMale", "dairy_and_alternatives_heifa_score_male"),
    DairyScoreFemale => ("DairyandalternativesHEIFAscoreFemale", "dairy_and_alternatives_heifa_score_female"),
    DairyServeSize => ("Dairyandalternativesservesize", "dairy_and_alternatives_serve_size"),

    SodiumScoreMale => ("SodiumHEIFAscoreMale", "sodium_heifa_score_male"),
    SodiumScoreFemale => ("SodiumHEIFAscoreFemale", "sodium_heifa_score_female"),
    SodiumMg => ("Sodiummgmilligrams", "sodium_mg"),

    AlcoholScoreMale => ("AlcoholHEIFAscoreMale", "alcohol_heifa_score_male"),
    AlcoholScoreFemale => ("AlcoholHEIFAscoreFemale", "alcohol_heifa_score_female"),
    AlcoholStandardDrinks => ("Alcoholstandarddrinks", "alcohol_standard_drinks"),

    WaterScoreMale => ("WaterHEIFAscoreMale", "water_heifa_score_male"),
    WaterScoreFemale => ("WaterHEIFAscoreFemale", "water_heifa_score_female"),
    Water => ("Water", "water"),
    WaterTotalMl => ("WaterTotalmL", "water_total_ml"),
    BeverageTotalMl => ("BeverageTotalmL", "beverage_total_ml"),

    SugarScoreMale => ("SugarHEIFAscoreMale", "sugar_heifa_score_male"),
    SugarScoreFemale => ("SugarHEIFAscoreFemale", "sugar_heifa_score_female"),
    Sugar => ("Sugar", "sugar"),

    SaturatedFatScoreMale => ("SaturatedFatHEIFAscoreMale", "saturated_fat_heifa_score_male"),
    SaturatedFatScoreFemale => ("SaturatedFatHEIFAscoreFemale", "saturated_fat_heifa_score_female"),
    SaturatedFat => ("SaturatedFat", "saturated_fat"),

    UnsaturatedFatScoreMale => ("UnsaturatedFatHEIFAscoreMale", "unsaturated_fat_heifa_score_male"),
    UnsaturatedFatScoreFemale => ("UnsaturatedFatHEIFAscoreFemale", "unsaturated_fat_heifa_score_female"),
    UnsaturatedFatServeSize => ("UnsaturatedFatservesize", "unsaturated_fat_serve_size"),
}

/// A scored nutrition component
///
/// Each component is stored twice, once per gender. Which variant is
/// authoritative depends on the record's declared sex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Discretionary,
    Vegetables,
    Fruit,
    GrainsAndCereals,
    WholeGrains,
    MeatAndAlternatives,
    DairyAndAlternatives,
    Sodium,
    Alcohol,
    Water,
    Sugar,
    SaturatedFat,
    UnsaturatedFat,
}

impl Component {
    pub const ALL: [Component; 13] = [
        Component::Discretionary,
        Component::Vegetables,
        Component::Fruit,
        Component::GrainsAndCereals,
        Component::WholeGrains,
        Component::MeatAndAlternatives,
        Component::DairyAndAlternatives,
        Component::Sodium,
        Component::Alcohol,
        Component::Water,
        Component::Sugar,
        Component::SaturatedFat,
        Component::UnsaturatedFat,
    ];

    /// (male, female) score columns for this component
    pub fn variants(self) -> (Metric, Metric) {
        use Metric::*;
        match self {
            Component::Discretionary => (DiscretionaryScoreMale, DiscretionaryScoreFemale),
            Component::Vegetables => (VegetablesScoreMale, VegetablesScoreFemale),
            Component::Fruit => (FruitScoreMale, FruitScoreFemale),
            Component::GrainsAndCereals => (GrainsScoreMale, GrainsScoreFemale),
            Component::WholeGrains => (WholeGrainsScoreMale, WholeGrainsScoreFemale),
            Component::MeatAndAlternatives => (MeatScoreMale, MeatScoreFemale),
            Component::DairyAndAlternatives => (DairyScoreMale, DairyScoreFemale),
            Component::Sodium => (SodiumScoreMale, SodiumScoreFemale),
            Component::Alcohol => (AlcoholScoreMale, AlcoholScoreFemale),
            Component::Water => (WaterScoreMale, WaterScoreFemale),
            Component::Sugar => (SugarScoreMale, SugarScoreFemale),
            Component::SaturatedFat => (SaturatedFatScoreMale, SaturatedFatScoreFemale),
            Component::UnsaturatedFat => (UnsaturatedFatScoreMale, UnsaturatedFatScoreFemale),
        }
    }

    /// Score column selected by gender
    pub fn metric_for(self, is_male: bool) -> Metric {
        let (male, female) = self.variants();
        if is_male {
            male
        } else {
            female
        }
    }

    /// Resolve a name used by the aggregate query surface
    ///
    /// The set of names is closed: vegetables, fruits, grains, protein, dairy,
    /// water, sodium and unsaturated-fat. Matching ignores ASCII case.
    /// Anything else is `None`.
    pub fn from_aggregate_name(name: &str) -> Option<Component> {
        let name = name.trim().to_ascii_lowercase();
        match name.as_str() {
            "vegetables" => Some(Component::Vegetables),
            "fruits" => Some(Component::Fruit),
            "grains" => Some(Component::GrainsAndCereals),
            "protein" => Some(Component::MeatAndAlternatives),
            "dairy" => Some(Component::DairyAndAlternatives),
            "water" => Some(Component::Water),
            "sodium" => Some(Component::Sodium),
            "unsaturated-fat" => Some(Component::UnsaturatedFat),
            _ => None,
        }
    }
}

/// True when `sex` names the male variant
///
/// Case-insensitive equality only; the parser trims `sex` before it is stored.
pub fn is_male(sex: &str) -> bool {
    sex.eq_ignore_ascii_case("male")
}

/// One person's row from the nutrition dataset
///
/// Identity fields are always present. Metrics are `None` until the full
/// ingestion phase has backfilled them, or when the source cell was blank.
#[derive(Debug, Clone, PartialEq)]
pub struct NutritionRecord {
    pub user_id: String,
    pub phone_number: String,
    pub sex: String,
    /// Empty until the account has been claimed
    pub password: String,
    metrics: [Option<f64>; Metric::COUNT],
}

impl NutritionRecord {
    /// Create a record carrying identity fields only
    pub fn new(
        user_id: impl Into<String>,
        phone_number: impl Into<String>,
        sex: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            phone_number: phone_number.into(),
            sex: sex.into(),
            password: String::new(),
            metrics: [None; Metric::COUNT],
        }
    }

    pub fn metric(&self, metric: Metric) -> Option<f64> {
        self.metrics[metric as usize]
    }

    pub fn set_metric(&mut self, metric: Metric, value: Option<f64>) {
        self.metrics[metric as usize] = value;
    }

    /// Builder-style setter
    pub fn with_metric(mut self, metric: Metric, value: f64) -> Self {
        self.set_metric(metric, Some(value));
        self
    }

    /// All metrics paired with their values, in declaration order
    pub fn metrics(&self) -> impl Iterator<Item = (Metric, Option<f64>)> + '_ {
        Metric::ALL.iter().map(move |m| (*m, self.metric(*m)))
    }

    pub fn is_male(&self) -> bool {
        is_male(&self.sex)
    }

    /// True once at least one metric has been populated
    pub fn has_metrics(&self) -> bool {
        self.metrics.iter().any(Option::is_some)
    }
}

impl Serialize for NutritionRecord {
    /// Flat map of identity fields plus every metric column.
    /// The credential is never serialized.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3 + Metric::COUNT))?;
        map.serialize_entry("user_id", &self.user_id)?;
        map.serialize_entry("phone_number", &self.phone_number)?;
        map.serialize_entry("sex", &self.sex)?;
        for (metric, value) in self.metrics() {
            map.serialize_entry(metric.column(), &value)?;
        }
        map.end()
    }
}

/// Per-person food preferences (independent of the records table)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FoodPreferences {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub fruits: bool,
    #[serde(default)]
    pub vegetables: bool,
    #[serde(default)]
    pub grains: bool,
    #[serde(default)]
    pub red_meat: bool,
    #[serde(default)]
    pub seafood: bool,
    #[serde(default)]
    pub poultry: bool,
    #[serde(default)]
    pub fish: bool,
    #[serde(default)]
    pub eggs: bool,
    #[serde(default)]
    pub nuts_seeds: bool,
    #[serde(default)]
    pub persona_id: i64,
    #[serde(default)]
    pub persona_name: String,
    #[serde(default)]
    pub biggest_meal_time: String,
    #[serde(default)]
    pub sleep_time: String,
    #[serde(default)]
    pub wake_time: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_metric_table_shape() {
        // 63 source columns minus the three identity columns
        assert_eq!(Metric::COUNT, 60);

        let headers: HashSet<_> = Metric::ALL.iter().map(|m| m.header()).collect();
        let columns: HashSet<_> = Metric::ALL.iter().map(|m| m.column()).collect();
        assert_eq!(headers.len(), Metric::COUNT, "duplicate header name");
        assert_eq!(columns.len(), Metric::COUNT, "duplicate column name");

        for (index, metric) in Metric::ALL.iter().enumerate() {
            assert_eq!(*metric as usize, index);
        }
    }

    #[test]
    fn test_component_variants_are_gendered_scores() {
        for component in Component::ALL {
            let (male, female) = component.variants();
            assert!(male.header().ends_with("HEIFAscoreMale"), "{:?}", male);
            assert!(female.header().ends_with("HEIFAscoreFemale"), "{:?}", female);
            assert_eq!(component.metric_for(true), male);
            assert_eq!(component.metric_for(false), female);
        }
    }

    #[test]
    fn test_aggregate_names() {
        assert_eq!(Component::from_aggregate_name("Vegetables"), Some(Component::Vegetables));
        assert_eq!(Component::from_aggregate_name("protein"), Some(Component::MeatAndAlternatives));
        assert_eq!(Component::from_aggregate_name("UNSATURATED-FAT"), Some(Component::UnsaturatedFat));
        assert_eq!(Component::from_aggregate_name("sugar"), None);
        assert_eq!(Component::from_aggregate_name(""), None);
    }

    #[test]
    fn test_record_metrics_default_to_none() {
        let record = NutritionRecord::new("1", "61400000000", "Male");
        assert!(!record.has_metrics());
        assert!(record.password.is_empty());
        assert!(record.is_male());

        let record = record.with_metric(Metric::WaterTotalMl, 2750.0);
        assert!(record.has_metrics());
        assert_eq!(record.metric(Metric::WaterTotalMl), Some(2750.0));
        assert_eq!(record.metric(Metric::Water), None);
    }

    #[test]
    fn test_is_male_ignores_case_only() {
        assert!(is_male("Male"));
        assert!(is_male("mALE"));
        assert!(!is_male(" male "));
        assert!(!is_male("Female"));
        assert!(!is_male(""));
    }
}
