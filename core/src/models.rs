use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Implements `as_str`, `FromStr`, `Display` and SQLite TEXT mapping for a closed token enum.
macro_rules! token_enum {
    ($name:ident, $label:literal, { $($variant:ident => $token:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                match s.trim().to_lowercase().as_str() {
                    $($token => Ok($name::$variant),)+
                    _ => Err(Error::validation(format!(
                        "Invalid {} '{s}'. Must be one of: {}",
                        $label,
                        $name::ALL.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: Error| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

/// Store department a grocery line is shelved under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Department {
    Produce,
    Meat,
    Seafood,
    Dairy,
    Bakery,
    Frozen,
    Pantry,
    Spices,
    Beverages,
    Other,
}

token_enum!(Department, "department", {
    Produce => "produce",
    Meat => "meat",
    Seafood => "seafood",
    Dairy => "dairy",
    Bakery => "bakery",
    Frozen => "frozen",
    Pantry => "pantry",
    Spices => "spices",
    Beverages => "beverages",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Bought,
    HaveOnHand,
}

token_enum!(ItemStatus, "status", {
    Pending => "pending",
    Bought => "bought",
    HaveOnHand => "have_on_hand",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    Dessert,
}

token_enum!(MealType, "meal type", {
    Breakfast => "breakfast",
    Lunch => "lunch",
    Dinner => "dinner",
    Snack => "snack",
    Dessert => "dessert",
});

// --- Users ---

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

// --- Recipes ---

#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: i64,
    pub uuid: String,
    pub user_id: i64,
    pub title: String,
    pub servings: i64,
    pub serving_size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cook_time_minutes: Option<i64>,
    pub total_time_minutes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub ingredients: Vec<RecipeIngredient>,
    pub instructions: Vec<RecipeInstruction>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeIngredient {
    pub id: i64,
    pub recipe_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nutrition_id: Option<i64>,
    pub ingredient_name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub department: Department,
    pub order_index: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeInstruction {
    pub id: i64,
    pub recipe_id: i64,
    pub step_number: i64,
    pub instruction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecipe {
    pub title: String,
    pub servings: i64,
    pub serving_size: String,
    #[serde(default)]
    pub prep_time_minutes: Option<i64>,
    #[serde(default)]
    pub cook_time_minutes: Option<i64>,
    #[serde(default)]
    pub storage_notes: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub ingredients: Vec<NewIngredient>,
    pub instructions: Vec<NewInstruction>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIngredient {
    pub ingredient_name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default = "default_department")]
    pub department: Department,
    /// Cached nutrition row (per 100 g) this ingredient is measured against.
    #[serde(default)]
    pub nutrition_id: Option<i64>,
}

fn default_department() -> Department {
    Department::Other
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInstruction {
    pub step_number: i64,
    pub instruction: String,
}

#[derive(Debug, Clone, Default)]
pub struct RecipeQuery {
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

// --- Meal plans ---

#[derive(Debug, Clone, Serialize)]
pub struct MealPlan {
    /// `None` for dates with nothing stored yet.
    pub id: Option<i64>,
    pub plan_date: NaiveDate,
    pub meals: Vec<MealSlot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealSlot {
    pub id: i64,
    pub meal_type: MealType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servings: Option<i64>,
    pub out_of_kitchen: bool,
    pub order_index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMealSlot {
    pub meal_type: MealType,
    #[serde(default)]
    pub recipe_id: Option<i64>,
    #[serde(default)]
    pub servings: Option<i64>,
    #[serde(default)]
    pub out_of_kitchen: bool,
}

// --- Cookbooks ---

#[derive(Debug, Clone, Serialize)]
pub struct Cookbook {
    pub id: i64,
    pub uuid: String,
    pub user_id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub recipe_count: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recipes: Vec<Recipe>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCookbook {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// --- Grocery lists ---

/// Inclusive calendar date range; construction rejects `end < start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::validation(format!(
                "end_date ({end}) must not be before start_date ({start})"
            )));
        }
        Ok(Self { start, end })
    }

    /// Parse two `YYYY-MM-DD` strings into a validated range.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start, "start_date")?, parse_date(end, "end_date")?)
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    #[must_use]
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroceryList {
    pub id: i64,
    pub uuid: String,
    pub user_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub items: Vec<GroceryListItem>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroceryListItem {
    pub id: i64,
    pub grocery_list_id: i64,
    pub item_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub department: Department,
    pub status: ItemStatus,
    pub is_manual: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_recipe_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewManualItem {
    pub item_name: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub department: Option<Department>,
}

/// One recipe ingredient as scheduled by one meal, as read by an ingredient source.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientTuple {
    pub ingredient_name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub department: Department,
    pub recipe_id: i64,
    pub recipe_title: String,
    pub meal_servings: Option<i64>,
    pub recipe_servings: i64,
    pub order_index: i64,
}

/// A merged grocery line, ready to be persisted under a list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedLine {
    pub item_name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub department: Department,
    pub status: ItemStatus,
    pub source_recipe_id: Option<i64>,
}

// --- Nutrition ---

/// A food's nutrients per 100 g, as cached locally from the lookup service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionFact {
    pub id: i64,
    pub fdc_id: String,
    pub food_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carbs_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fiber_g: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fat_g: Option<f64>,
    pub cached_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionSearchResult {
    pub fdc_id: String,
    pub description: String,
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein_g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs_g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fiber_g: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat_g: Option<f64>,
}

impl From<NutritionFact> for NutritionSearchResult {
    fn from(fact: NutritionFact) -> Self {
        NutritionSearchResult {
            fdc_id: fact.fdc_id,
            description: fact.food_name,
            data_type: "Cached".to_string(),
            calories: fact.calories,
            protein_g: fact.protein_g,
            carbs_g: fact.carbs_g,
            fiber_g: fact.fiber_g,
            fat_g: fact.fat_g,
        }
    }
}

/// Whole-recipe and per-serving nutrient totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecipeNutrition {
    pub total_calories: f64,
    pub total_protein_g: f64,
    pub total_carbs_g: f64,
    pub total_fiber_g: f64,
    pub total_fat_g: f64,
    pub per_serving_calories: f64,
    pub per_serving_protein_g: f64,
    pub per_serving_carbs_g: f64,
    pub per_serving_fiber_g: f64,
    pub per_serving_fat_g: f64,
}

// --- Menu recommendations ---

#[derive(Debug, Clone, Serialize)]
pub struct RecipeRecommendation {
    pub recipe: Recipe,
    pub match_score: f64,
    pub matched_ingredients: Vec<String>,
    pub missing_ingredients: Vec<String>,
}

// --- Pagination ---

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Clamp a requested page window to the supported bounds.
#[must_use]
pub fn clamp_page(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = match limit {
        Some(l) if l > 0 => l.min(MAX_PAGE_LIMIT),
        _ => DEFAULT_PAGE_LIMIT,
    };
    (limit, offset.unwrap_or(0).max(0))
}

// --- Validation ---

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_PLAN_RANGE_DAYS: i64 = 90;

pub fn parse_date(s: &str, field: &str) -> Result<NaiveDate> {
    if s.trim().is_empty() {
        return Err(Error::validation(format!("{field} is required")));
    }
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| Error::validation(format!("Invalid {field} '{s}'. Use YYYY-MM-DD")))
}

pub fn validate_new_recipe(recipe: &NewRecipe) -> Result<()> {
    let title = recipe.title.trim();
    if title.is_empty() {
        return Err(Error::validation("title is required"));
    }
    if title.chars().count() >= MAX_TITLE_LEN {
        return Err(Error::validation(format!(
            "title must be less than {MAX_TITLE_LEN} characters"
        )));
    }
    if recipe.servings <= 0 {
        return Err(Error::validation("servings must be greater than 0"));
    }
    if recipe.serving_size.trim().is_empty() {
        return Err(Error::validation("serving_size is required"));
    }
    if recipe.prep_time_minutes.is_some_and(|m| m < 0) {
        return Err(Error::validation("prep_time_minutes cannot be negative"));
    }
    if recipe.cook_time_minutes.is_some_and(|m| m < 0) {
        return Err(Error::validation("cook_time_minutes cannot be negative"));
    }
    if recipe.ingredients.is_empty() {
        return Err(Error::validation("at least one ingredient is required"));
    }
    if recipe.instructions.is_empty() {
        return Err(Error::validation("at least one instruction is required"));
    }
    for (i, ing) in recipe.ingredients.iter().enumerate() {
        if ing.ingredient_name.trim().is_empty() {
            return Err(Error::validation(format!("ingredient {i}: name is required")));
        }
        if ing.quantity.is_some_and(|q| !q.is_finite() || q <= 0.0) {
            return Err(Error::validation(format!(
                "ingredient {i}: quantity must be greater than 0"
            )));
        }
    }
    for (i, step) in recipe.instructions.iter().enumerate() {
        if step.step_number <= 0 {
            return Err(Error::validation(format!(
                "instruction {i}: step number must be greater than 0"
            )));
        }
        if step.instruction.trim().is_empty() {
            return Err(Error::validation(format!("instruction {i}: text is required")));
        }
    }
    Ok(())
}

/// Out-of-kitchen slots carry no recipe and no servings; all others need both.
pub fn validate_meal_slots(slots: &[NewMealSlot]) -> Result<()> {
    for (i, slot) in slots.iter().enumerate() {
        if slot.out_of_kitchen {
            if slot.recipe_id.is_some() {
                return Err(Error::validation(format!(
                    "meal {i}: cannot have recipe_id when out_of_kitchen is true"
                )));
            }
            if slot.servings.is_some() {
                return Err(Error::validation(format!(
                    "meal {i}: cannot have servings when out_of_kitchen is true"
                )));
            }
        } else {
            if slot.recipe_id.is_none() {
                return Err(Error::validation(format!(
                    "meal {i}: recipe_id required when out_of_kitchen is false"
                )));
            }
            match slot.servings {
                None => {
                    return Err(Error::validation(format!(
                        "meal {i}: servings required when out_of_kitchen is false"
                    )));
                }
                Some(s) if s <= 0 => {
                    return Err(Error::validation(format!(
                        "meal {i}: servings must be greater than 0"
                    )));
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

pub fn validate_cookbook(cookbook: &NewCookbook) -> Result<()> {
    let name = cookbook.name.trim();
    if name.is_empty() {
        return Err(Error::validation("name is required"));
    }
    if name.chars().count() > MAX_TITLE_LEN {
        return Err(Error::validation(format!(
            "name must be {MAX_TITLE_LEN} characters or less"
        )));
    }
    Ok(())
}

pub fn validate_manual_item(item: &NewManualItem) -> Result<()> {
    if item.item_name.trim().is_empty() {
        return Err(Error::validation("item_name is required"));
    }
    if item.quantity.is_some_and(|q| !q.is_finite() || q < 0.0) {
        return Err(Error::validation("quantity must not be negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_recipe() -> NewRecipe {
        NewRecipe {
            title: "Tomato Soup".to_string(),
            servings: 4,
            serving_size: "1 bowl".to_string(),
            prep_time_minutes: Some(10),
            cook_time_minutes: Some(30),
            storage_notes: None,
            source: None,
            notes: None,
            ingredients: vec![NewIngredient {
                ingredient_name: "Tomato".to_string(),
                quantity: Some(6.0),
                unit: Some("whole".to_string()),
                department: Department::Produce,
                nutrition_id: None,
            }],
            instructions: vec![NewInstruction {
                step_number: 1,
                instruction: "Simmer everything".to_string(),
            }],
            tags: vec![],
        }
    }

    fn cooking(servings: Option<i64>) -> NewMealSlot {
        NewMealSlot {
            meal_type: MealType::Dinner,
            recipe_id: Some(1),
            servings,
            out_of_kitchen: false,
        }
    }

    #[test]
    fn test_department_tokens_round_trip() {
        for dept in Department::ALL {
            assert_eq!(dept.as_str().parse::<Department>().unwrap(), *dept);
        }
        assert_eq!(Department::ALL.len(), 10);
    }

    #[test]
    fn test_department_parse_is_case_insensitive() {
        assert_eq!("Produce".parse::<Department>().unwrap(), Department::Produce);
        assert_eq!(" SPICES ".parse::<Department>().unwrap(), Department::Spices);
    }

    #[test]
    fn test_department_rejects_unknown_token() {
        let err = "deli".parse::<Department>().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("produce"));
    }

    #[test]
    fn test_department_serde_tokens() {
        let json = serde_json::to_string(&Department::Beverages).unwrap();
        assert_eq!(json, "\"beverages\"");
        let status = serde_json::to_string(&ItemStatus::HaveOnHand).unwrap();
        assert_eq!(status, "\"have_on_hand\"");
    }

    #[test]
    fn test_meal_type_parse() {
        assert_eq!("Dessert".parse::<MealType>().unwrap(), MealType::Dessert);
        assert!("brunch".parse::<MealType>().is_err());
    }

    #[test]
    fn test_date_range_rejects_end_before_start() {
        let err = DateRange::parse("2024-06-10", "2024-06-09").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_date_range_single_day() {
        let range = DateRange::parse("2024-06-10", "2024-06-10").unwrap();
        assert_eq!(range.days(), 1);
        assert_eq!(range.start(), range.end());
    }

    #[test]
    fn test_date_range_bad_format() {
        assert!(DateRange::parse("06/10/2024", "2024-06-12").is_err());
        assert!(DateRange::parse("", "2024-06-12").is_err());
    }

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(None, None), (20, 0));
        assert_eq!(clamp_page(Some(0), Some(-5)), (20, 0));
        assert_eq!(clamp_page(Some(500), Some(40)), (100, 40));
        assert_eq!(clamp_page(Some(5), Some(10)), (5, 10));
    }

    #[test]
    fn test_validate_new_recipe_valid() {
        assert!(validate_new_recipe(&sample_recipe()).is_ok());
    }

    #[test]
    fn test_validate_new_recipe_zero_servings() {
        let mut recipe = sample_recipe();
        recipe.servings = 0;
        assert!(validate_new_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_new_recipe_blank_ingredient() {
        let mut recipe = sample_recipe();
        recipe.ingredients[0].ingredient_name = "   ".to_string();
        assert!(validate_new_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_new_recipe_allows_missing_quantity_and_unit() {
        let mut recipe = sample_recipe();
        recipe.ingredients.push(NewIngredient {
            ingredient_name: "Salt".to_string(),
            quantity: None,
            unit: None,
            department: Department::Spices,
            nutrition_id: None,
        });
        assert!(validate_new_recipe(&recipe).is_ok());
    }

    #[test]
    fn test_validate_new_recipe_negative_quantity() {
        let mut recipe = sample_recipe();
        recipe.ingredients[0].quantity = Some(-1.0);
        assert!(validate_new_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_new_recipe_no_instructions() {
        let mut recipe = sample_recipe();
        recipe.instructions.clear();
        assert!(validate_new_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_meal_slots_cooking() {
        assert!(validate_meal_slots(&[cooking(Some(2))]).is_ok());
        assert!(validate_meal_slots(&[cooking(None)]).is_err());
        assert!(validate_meal_slots(&[cooking(Some(0))]).is_err());
    }

    #[test]
    fn test_validate_meal_slots_out_of_kitchen() {
        let eating_out = NewMealSlot {
            meal_type: MealType::Lunch,
            recipe_id: None,
            servings: None,
            out_of_kitchen: true,
        };
        assert!(validate_meal_slots(&[eating_out.clone()]).is_ok());

        let with_recipe = NewMealSlot {
            recipe_id: Some(3),
            ..eating_out.clone()
        };
        assert!(validate_meal_slots(&[with_recipe]).is_err());

        let with_servings = NewMealSlot {
            servings: Some(2),
            ..eating_out
        };
        assert!(validate_meal_slots(&[with_servings]).is_err());
    }

    #[test]
    fn test_validate_cookbook_name() {
        let ok = NewCookbook {
            name: "Weeknights".to_string(),
            description: None,
        };
        assert!(validate_cookbook(&ok).is_ok());

        let blank = NewCookbook {
            name: " ".to_string(),
            description: None,
        };
        assert!(validate_cookbook(&blank).is_err());

        let long = NewCookbook {
            name: "x".repeat(201),
            description: None,
        };
        assert!(validate_cookbook(&long).is_err());
    }

    #[test]
    fn test_validate_manual_item() {
        let item = NewManualItem {
            item_name: "Paper towels".to_string(),
            quantity: None,
            unit: None,
            department: None,
        };
        assert!(validate_manual_item(&item).is_ok());

        let blank = NewManualItem {
            item_name: "\t".to_string(),
            ..item
        };
        assert!(validate_manual_item(&blank).is_err());
    }
}
