//! Recipe recommendations from a list of ingredients on hand.
//!
//! Matching uses a laxer normalization than grocery aggregation: it also folds
//! simple English plurals, so "Tomatoes" on hand matches a recipe's "tomato".

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{Recipe, RecipeRecommendation};

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationMeta {
    pub provided_ingredients: Vec<String>,
    pub total_recipes_found: usize,
}

pub fn validate_recommendation_request(ingredients: &[String]) -> Result<()> {
    if ingredients.is_empty() {
        return Err(Error::validation("at least one ingredient is required"));
    }
    if ingredients.iter().any(|i| i.trim().is_empty()) {
        return Err(Error::validation("ingredient names cannot be empty"));
    }
    Ok(())
}

/// Lowercase, trim, then strip one plural suffix: `ies` becomes `y`, else `es`
/// is dropped, else a trailing `s` is dropped unless the word ends in `ss`.
#[must_use]
pub fn normalize_for_matching(name: &str) -> String {
    let n = name.trim().to_lowercase();
    if let Some(stem) = n.strip_suffix("ies") {
        format!("{stem}y")
    } else if let Some(stem) = n.strip_suffix("es") {
        stem.to_string()
    } else if n.ends_with("ss") {
        n
    } else if let Some(stem) = n.strip_suffix('s') {
        stem.to_string()
    } else {
        n
    }
}

/// Normalized lookup set for the ingredients a user has on hand.
#[must_use]
pub fn on_hand_set(ingredients: &[String]) -> HashSet<String> {
    ingredients
        .iter()
        .map(|i| normalize_for_matching(i))
        .collect()
}

/// Score = matched / total * 100. A recipe with no ingredients scores 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn score_recipe(recipe: Recipe, on_hand: &HashSet<String>) -> RecipeRecommendation {
    let total = recipe.ingredients.len();
    let (matched, missing): (Vec<String>, Vec<String>) = recipe
        .ingredients
        .iter()
        .map(|i| i.ingredient_name.clone())
        .partition(|name| on_hand.contains(&normalize_for_matching(name)));

    let match_score = if total == 0 {
        0.0
    } else {
        matched.len() as f64 / total as f64 * 100.0
    };

    RecipeRecommendation {
        recipe,
        match_score,
        matched_ingredients: matched,
        missing_ingredients: missing,
    }
}

/// Score every candidate and order best first; equal scores keep candidate order.
#[must_use]
pub fn rank_recipes(candidates: Vec<Recipe>, ingredients: &[String]) -> Vec<RecipeRecommendation> {
    let on_hand = on_hand_set(ingredients);
    let mut ranked: Vec<RecipeRecommendation> = candidates
        .into_iter()
        .map(|r| score_recipe(r, &on_hand))
        .collect();
    ranked.sort_by(|a, b| b.match_score.total_cmp(&a.match_score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Department, RecipeIngredient};

    fn recipe(id: i64, ingredients: &[&str]) -> Recipe {
        Recipe {
            id,
            uuid: format!("uuid-{id}"),
            user_id: 1,
            title: format!("Recipe {id}"),
            servings: 2,
            serving_size: "1 plate".to_string(),
            prep_time_minutes: None,
            cook_time_minutes: None,
            total_time_minutes: 0,
            storage_notes: None,
            source: None,
            notes: None,
            created_at: String::new(),
            updated_at: String::new(),
            ingredients: ingredients
                .iter()
                .enumerate()
                .map(|(i, name)| RecipeIngredient {
                    id: i as i64,
                    recipe_id: id,
                    nutrition_id: None,
                    ingredient_name: (*name).to_string(),
                    quantity: None,
                    unit: None,
                    department: Department::Other,
                    order_index: i as i64,
                })
                .collect(),
            instructions: vec![],
            tags: vec![],
        }
    }

    fn owned(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_normalize_plurals() {
        assert_eq!(normalize_for_matching(" Berries "), "berry");
        assert_eq!(normalize_for_matching("Tomatoes"), "tomato");
        assert_eq!(normalize_for_matching("eggs"), "egg");
        assert_eq!(normalize_for_matching("Swiss"), "swiss");
        assert_eq!(normalize_for_matching("rice"), "rice");
    }

    #[test]
    fn test_three_of_four_scores_75() {
        let r = recipe(1, &["egg", "flour", "milk", "sugar"]);
        let on_hand = on_hand_set(&owned(&["Eggs", "flour", "MILK"]));
        let rec = score_recipe(r, &on_hand);
        assert!((rec.match_score - 75.0).abs() < f64::EPSILON);
        assert_eq!(rec.matched_ingredients, vec!["egg", "flour", "milk"]);
        assert_eq!(rec.missing_ingredients, vec!["sugar"]);
    }

    #[test]
    fn test_zero_ingredients_scores_zero() {
        let rec = score_recipe(recipe(1, &[]), &on_hand_set(&owned(&["egg"])));
        assert_eq!(rec.match_score, 0.0);
        assert!(!rec.match_score.is_nan());
        assert!(rec.matched_ingredients.is_empty());
    }

    #[test]
    fn test_rank_descending_and_stable() {
        let candidates = vec![
            recipe(1, &["egg", "bacon"]),
            recipe(2, &["egg"]),
            recipe(3, &["egg", "ham"]),
        ];
        let ranked = rank_recipes(candidates, &owned(&["egg"]));
        let ids: Vec<i64> = ranked.iter().map(|r| r.recipe.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_validate_request() {
        assert!(validate_recommendation_request(&[]).is_err());
        assert!(validate_recommendation_request(&owned(&["egg", "  "])).is_err());
        assert!(validate_recommendation_request(&owned(&["egg"])).is_ok());
    }
}
