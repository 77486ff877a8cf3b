use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::models::{NutritionFact, NutritionSearchResult, Recipe, RecipeNutrition};

/// Maximum results returned by a single lookup.
pub const SEARCH_LIMIT: usize = 10;

/// A remote food database that reports nutrients per 100 g.
pub trait NutritionClient: Send {
    fn search(&self, query: &str) -> Result<Vec<NutritionSearchResult>>;
}

/// Offline client backed by a fixed table of common ingredients.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubNutritionClient;

// fdc_id, description, kcal, protein, carbs, fiber, fat
const STUB_FOODS: &[(&str, &str, f64, f64, f64, f64, f64)] = &[
    ("123456", "Chicken breast, raw", 120.0, 22.5, 0.0, 0.0, 2.6),
    ("123457", "Rice, white, long-grain, raw", 365.0, 7.1, 80.0, 1.3, 0.7),
    ("123458", "Broccoli, raw", 34.0, 2.8, 7.0, 2.6, 0.4),
    ("123459", "Olive oil", 884.0, 0.0, 0.0, 0.0, 100.0),
    ("123460", "Milk, whole, 3.25% milkfat", 61.0, 3.2, 4.8, 0.0, 3.3),
    ("123461", "Egg, whole, raw, fresh", 143.0, 12.6, 0.7, 0.0, 9.5),
    ("123462", "Tomato, red, ripe, raw", 18.0, 0.9, 3.9, 1.2, 0.2),
    ("123463", "Onion, raw", 40.0, 1.1, 9.3, 1.7, 0.1),
    ("123464", "Garlic, raw", 149.0, 6.4, 33.1, 2.1, 0.5),
    ("123465", "Pasta, dry, enriched", 371.0, 13.0, 74.7, 3.2, 1.5),
    ("123466", "Ground beef, 80% lean meat / 20% fat, raw", 254.0, 17.2, 0.0, 0.0, 20.0),
    ("123467", "Salmon, Atlantic, raw", 142.0, 19.8, 0.0, 0.0, 6.3),
    ("123468", "Potato, flesh and skin, raw", 77.0, 2.0, 17.5, 2.1, 0.1),
    ("123469", "Carrot, raw", 41.0, 0.9, 9.6, 2.8, 0.2),
    ("123470", "Cheese, cheddar", 403.0, 22.9, 3.1, 0.0, 33.3),
];

impl NutritionClient for StubNutritionClient {
    fn search(&self, query: &str) -> Result<Vec<NutritionSearchResult>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(Error::validation("query is required"));
        }

        Ok(STUB_FOODS
            .iter()
            .filter(|(fdc_id, description, ..)| {
                *fdc_id == needle || description.to_lowercase().contains(&needle)
            })
            .take(SEARCH_LIMIT)
            .map(
                |&(fdc_id, description, calories, protein, carbs, fiber, fat)| {
                    NutritionSearchResult {
                        fdc_id: fdc_id.to_string(),
                        description: description.to_string(),
                        data_type: "SR Legacy".to_string(),
                        calories: Some(calories),
                        protein_g: Some(protein),
                        carbs_g: Some(carbs),
                        fiber_g: Some(fiber),
                        fat_g: Some(fat),
                    }
                },
            )
            .collect())
    }
}

/// Sum nutrients over ingredients linked to a cached fact.
///
/// Quantities are read as grams against the per-100 g values. Ingredients with
/// no link, no quantity, or a link missing from `facts` contribute nothing.
#[must_use]
pub fn recipe_nutrition(recipe: &Recipe, facts: &HashMap<i64, NutritionFact>) -> RecipeNutrition {
    let mut totals = RecipeNutrition::default();

    for ing in &recipe.ingredients {
        let Some(fact) = ing.nutrition_id.and_then(|id| facts.get(&id)) else {
            continue;
        };
        let Some(quantity) = ing.quantity else {
            continue;
        };
        let scale = quantity / 100.0;
        totals.total_calories += fact.calories.unwrap_or(0.0) * scale;
        totals.total_protein_g += fact.protein_g.unwrap_or(0.0) * scale;
        totals.total_carbs_g += fact.carbs_g.unwrap_or(0.0) * scale;
        totals.total_fiber_g += fact.fiber_g.unwrap_or(0.0) * scale;
        totals.total_fat_g += fact.fat_g.unwrap_or(0.0) * scale;
    }

    if recipe.servings > 0 {
        #[allow(clippy::cast_precision_loss)]
        let servings = recipe.servings as f64;
        totals.per_serving_calories = totals.total_calories / servings;
        totals.per_serving_protein_g = totals.total_protein_g / servings;
        totals.per_serving_carbs_g = totals.total_carbs_g / servings;
        totals.per_serving_fiber_g = totals.total_fiber_g / servings;
        totals.per_serving_fat_g = totals.total_fat_g / servings;
    }

    totals
}
