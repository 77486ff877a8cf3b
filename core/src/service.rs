use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::grocery;
use crate::menu::{self, RecommendationMeta};
use crate::nutrition::{self, NutritionClient, SEARCH_LIMIT, StubNutritionClient};
use crate::models::{
    Cookbook, DateRange, GroceryList, GroceryListItem, ItemStatus, MAX_PLAN_RANGE_DAYS, MealPlan,
    NewCookbook, NewManualItem, NewMealSlot, NewRecipe, NutritionFact, NutritionSearchResult, Page,
    Recipe, RecipeNutrition, RecipeQuery, RecipeRecommendation, User, clamp_page, parse_date, validate_cookbook, validate_manual_item,
    validate_meal_slots, validate_new_recipe,
};

/// Application entry point shared by the CLI and the HTTP server.
///
/// Every method that takes a `user_id` enforces ownership: grocery lists and
/// cookbooks owned by someone else are reported as not found. Recipes and meal
/// plans are household-wide, but only a recipe's owner may change it.
pub struct MiseService {
    db: Database,
    nutrition: Box<dyn NutritionClient>,
}

impl MiseService {
    pub fn new(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self::with_database(db))
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::with_database(db))
    }

    fn with_database(db: Database) -> Self {
        Self {
            db,
            nutrition: Box::new(StubNutritionClient),
        }
    }

    /// Replace the nutrition lookup client (the stub table by default).
    #[must_use]
    pub fn with_nutrition_client(mut self, client: impl NutritionClient + 'static) -> Self {
        self.nutrition = Box::new(client);
        self
    }

    // --- Users ---

    pub fn create_user(&self, name: &str, token: &str) -> Result<User> {
        if name.trim().is_empty() {
            return Err(Error::validation("name is required"));
        }
        self.db.create_user(name.trim(), token)
    }

    pub fn user_by_token(&self, token: &str) -> Result<Option<User>> {
        self.db.user_by_token(token)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.db.list_users()
    }

    // --- Grocery lists ---

    /// Aggregate every scheduled ingredient in `[start, end]` into a new list.
    pub fn create_grocery_list(&self, user_id: i64, start: &str, end: &str) -> Result<GroceryList> {
        let range = DateRange::parse(start, end)?;
        let lines = grocery::generate_lines(&self.db, &range)?;
        let list = self.db.insert_grocery_list(user_id, &range, &lines)?;
        info!(
            list_id = list.id,
            user_id,
            start = %range.start(),
            end = %range.end(),
            items = list.items.len(),
            "created grocery list"
        );
        Ok(list)
    }

    pub fn get_grocery_list(&self, user_id: i64, id: i64) -> Result<GroceryList> {
        let list = self.db.get_grocery_list(id)?;
        if list.user_id != user_id {
            return Err(Error::not_found(format!("Grocery list {id} not found")));
        }
        Ok(list)
    }

    pub fn list_grocery_lists(
        &self,
        user_id: i64,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Page<GroceryList>> {
        let (limit, offset) = clamp_page(limit, offset);
        let (data, total) = self.db.list_grocery_lists(user_id, limit, offset)?;
        Ok(Page {
            data,
            total,
            limit,
            offset,
        })
    }

    pub fn delete_grocery_list(&self, user_id: i64, id: i64) -> Result<()> {
        self.get_grocery_list(user_id, id)?;
        self.db.delete_grocery_list(id)?;
        info!(list_id = id, user_id, "deleted grocery list");
        Ok(())
    }

    pub fn add_manual_item(
        &self,
        user_id: i64,
        list_id: i64,
        item: &NewManualItem,
    ) -> Result<GroceryListItem> {
        validate_manual_item(item)?;
        self.get_grocery_list(user_id, list_id)?;
        self.db.insert_manual_item(list_id, item)
    }

    pub fn update_item_status(
        &self,
        user_id: i64,
        list_id: i64,
        item_id: i64,
        status: ItemStatus,
    ) -> Result<GroceryListItem> {
        self.get_grocery_list(user_id, list_id)?;
        self.db.update_item_status(list_id, item_id, status)
    }

    pub fn delete_item(&self, user_id: i64, list_id: i64, item_id: i64) -> Result<()> {
        self.get_grocery_list(user_id, list_id)?;
        if !self.db.delete_grocery_item(list_id, item_id)? {
            return Err(Error::not_found(format!(
                "Grocery list item {item_id} not found"
            )));
        }
        Ok(())
    }

    /// Render a list as CSV with a `department,item,quantity,unit,status` header.
    pub fn export_grocery_list_csv(&self, user_id: i64, id: i64) -> Result<String> {
        let list = self.get_grocery_list(user_id, id)?;
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(["department", "item", "quantity", "unit", "status"])?;
        for item in &list.items {
            let quantity = item.quantity.map(|q| q.to_string()).unwrap_or_default();
            wtr.write_record([
                item.department.as_str(),
                item.item_name.as_str(),
                quantity.as_str(),
                item.unit.as_deref().unwrap_or(""),
                item.status.as_str(),
            ])?;
        }
        let bytes = wtr.into_inner().map_err(|e| Error::Io(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    // --- Recommendations ---

    pub fn recommend(
        &self,
        ingredients: &[String],
    ) -> Result<(Vec<RecipeRecommendation>, RecommendationMeta)> {
        menu::validate_recommendation_request(ingredients)?;
        let candidates = self.db.recipes_with_ingredients(ingredients)?;
        let ranked = menu::rank_recipes(candidates, ingredients);
        let meta = RecommendationMeta {
            provided_ingredients: ingredients.to_vec(),
            total_recipes_found: ranked.len(),
        };
        Ok((ranked, meta))
    }

    // --- Recipes ---

    /// Field validation plus a check that every linked nutrition row exists.
    fn check_recipe(&self, recipe: &NewRecipe) -> Result<()> {
        validate_new_recipe(recipe)?;
        for id in recipe.ingredients.iter().filter_map(|i| i.nutrition_id) {
            if !self.db.nutrition_exists(id)? {
                return Err(Error::validation(format!("nutrition data {id} not found")));
            }
        }
        Ok(())
    }

    pub fn create_recipe(&self, user_id: i64, recipe: &NewRecipe) -> Result<Recipe> {
        self.check_recipe(recipe)?;
        let created = self.db.insert_recipe(user_id, recipe)?;
        info!(recipe_id = created.id, user_id, "created recipe");
        Ok(created)
    }

    /// Import one recipe object or an array of them.
    ///
    /// Every entry is validated first and all of them are inserted in a single
    /// transaction, so a failure anywhere stores nothing.
    pub fn import_recipes_json(&self, user_id: i64, json: &str) -> Result<Vec<Recipe>> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let recipes: Vec<NewRecipe> = if value.is_array() {
            serde_json::from_value(value)?
        } else {
            vec![serde_json::from_value(value)?]
        };
        for (i, r) in recipes.iter().enumerate() {
            self.check_recipe(r)
                .map_err(|e| Error::validation(format!("recipe {i}: {e}")))?;
        }
        let created = self.db.insert_recipes(user_id, &recipes)?;
        info!(user_id, count = created.len(), "imported recipes");
        Ok(created)
    }

    pub fn get_recipe(&self, id: i64) -> Result<Recipe> {
        self.db.get_recipe(id)
    }

    pub fn list_recipes(
        &self,
        search: Option<String>,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Page<Recipe>> {
        let (limit, offset) = clamp_page(limit, offset);
        let (data, total) = self.db.list_recipes(&RecipeQuery {
            search,
            limit,
            offset,
        })?;
        Ok(Page {
            data,
            total,
            limit,
            offset,
        })
    }

    fn owned_recipe(&self, user_id: i64, id: i64, action: &str) -> Result<Recipe> {
        let recipe = self.db.get_recipe(id)?;
        if recipe.user_id != user_id {
            return Err(Error::forbidden(format!(
                "You don't have permission to {action} this recipe"
            )));
        }
        Ok(recipe)
    }

    pub fn update_recipe(&self, user_id: i64, id: i64, recipe: &NewRecipe) -> Result<Recipe> {
        self.check_recipe(recipe)?;
        self.owned_recipe(user_id, id, "update")?;
        self.db.update_recipe(id, recipe)
    }

    pub fn delete_recipe(&self, user_id: i64, id: i64) -> Result<()> {
        self.owned_recipe(user_id, id, "delete")?;
        self.db.soft_delete_recipe(id)?;
        info!(recipe_id = id, user_id, "deleted recipe");
        Ok(())
    }

    // --- Nutrition ---

    /// Search the local cache first; on a miss ask the lookup client and cache what it returns.
    pub fn search_nutrition(&self, query: &str) -> Result<Vec<NutritionSearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::validation("query is required"));
        }

        let limit = i64::try_from(SEARCH_LIMIT).unwrap_or(i64::MAX);
        match self.db.search_nutrition(query, limit) {
            Ok(cached) if !cached.is_empty() => {
                return Ok(cached.into_iter().map(NutritionSearchResult::from).collect());
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, query, "nutrition cache search failed"),
        }

        let results = self.nutrition.search(query)?;
        for result in &results {
            if let Err(e) = self.db.cache_nutrition(result) {
                warn!(error = %e, fdc_id = %result.fdc_id, "failed to cache nutrition data");
            }
        }
        info!(query, results = results.len(), "nutrition lookup");
        Ok(results)
    }

    /// A single food by its lookup-service id, fetched and cached on first use.
    pub fn nutrition_by_fdc_id(&self, fdc_id: &str) -> Result<NutritionFact> {
        if let Some(fact) = self.db.nutrition_by_fdc_id(fdc_id)? {
            return Ok(fact);
        }
        let result = self
            .nutrition
            .search(fdc_id)?
            .into_iter()
            .find(|r| r.fdc_id == fdc_id)
            .ok_or_else(|| Error::not_found(format!("Nutrition data {fdc_id} not found")))?;
        self.db.cache_nutrition(&result)
    }

    pub fn recipe_nutrition(&self, recipe_id: i64) -> Result<RecipeNutrition> {
        let recipe = self.db.get_recipe(recipe_id)?;
        let mut facts: HashMap<i64, NutritionFact> = HashMap::new();
        for id in recipe.ingredients.iter().filter_map(|i| i.nutrition_id) {
            if !facts.contains_key(&id) {
                facts.insert(id, self.db.get_nutrition(id)?);
            }
        }
        Ok(nutrition::recipe_nutrition(&recipe, &facts))
    }

    // --- Meal plans ---

    /// One plan per date in the range, ascending. Dates with nothing stored get an empty plan.
    pub fn get_meal_plans(&self, start: &str, end: &str) -> Result<Vec<MealPlan>> {
        let range = DateRange::parse(start, end)?;
        if range.days() > MAX_PLAN_RANGE_DAYS {
            return Err(Error::validation(format!(
                "date range cannot exceed {MAX_PLAN_RANGE_DAYS} days"
            )));
        }
        let mut stored = self.db.get_meal_plans(&range)?.into_iter().peekable();
        let mut plans = Vec::new();
        for date in range.start().iter_days().take_while(|d| *d <= range.end()) {
            match stored.next_if(|p| p.plan_date == date) {
                Some(plan) => plans.push(plan),
                None => plans.push(empty_plan(date)),
            }
        }
        Ok(plans)
    }

    pub fn get_meal_plan(&self, date: &str) -> Result<MealPlan> {
        let date = parse_date(date, "date")?;
        Ok(self.db.get_meal_plan(date)?.unwrap_or_else(|| empty_plan(date)))
    }

    /// Replace every slot on `date`. Referenced recipes must exist.
    pub fn set_meal_plan(&self, date: &str, slots: &[NewMealSlot]) -> Result<MealPlan> {
        let date = parse_date(date, "date")?;
        validate_meal_slots(slots)?;
        for recipe_id in slots.iter().filter_map(|s| s.recipe_id) {
            if !self.db.recipe_exists(recipe_id)? {
                return Err(Error::validation(format!("recipe {recipe_id} not found")));
            }
        }
        let plan = self.db.set_meal_plan(date, slots)?;
        info!(%date, meals = plan.meals.len(), "saved meal plan");
        Ok(plan)
    }

    // --- Cookbooks ---

    pub fn create_cookbook(&self, user_id: i64, cookbook: &NewCookbook) -> Result<Cookbook> {
        validate_cookbook(cookbook)?;
        self.db.insert_cookbook(user_id, cookbook)
    }

    fn owned_cookbook(&self, user_id: i64, id: i64) -> Result<Cookbook> {
        let cookbook = self.db.get_cookbook(id)?;
        if cookbook.user_id != user_id {
            return Err(Error::not_found(format!("Cookbook {id} not found")));
        }
        Ok(cookbook)
    }

    /// The cookbook together with its recipes.
    pub fn get_cookbook(&self, user_id: i64, id: i64) -> Result<Cookbook> {
        let mut cookbook = self.owned_cookbook(user_id, id)?;
        cookbook.recipes = self.db.cookbook_recipes(id)?;
        Ok(cookbook)
    }

    pub fn list_cookbooks(
        &self,
        user_id: i64,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Page<Cookbook>> {
        let (limit, offset) = clamp_page(limit, offset);
        let (data, total) = self.db.list_cookbooks(user_id, limit, offset)?;
        Ok(Page {
            data,
            total,
            limit,
            offset,
        })
    }

    pub fn update_cookbook(&self, user_id: i64, id: i64, cookbook: &NewCookbook) -> Result<Cookbook> {
        validate_cookbook(cookbook)?;
        self.owned_cookbook(user_id, id)?;
        self.db.update_cookbook(id, cookbook)
    }

    pub fn delete_cookbook(&self, user_id: i64, id: i64) -> Result<()> {
        self.owned_cookbook(user_id, id)?;
        self.db.soft_delete_cookbook(id)?;
        Ok(())
    }

    pub fn add_recipe_to_cookbook(&self, user_id: i64, id: i64, recipe_id: i64) -> Result<Cookbook> {
        self.owned_cookbook(user_id, id)?;
        self.db.get_recipe(recipe_id)?;
        self.db.add_recipe_to_cookbook(id, recipe_id)?;
        self.get_cookbook(user_id, id)
    }

    pub fn remove_recipe_from_cookbook(&self, user_id: i64, id: i64, recipe_id: i64) -> Result<()> {
        self.owned_cookbook(user_id, id)?;
        if !self.db.remove_recipe_from_cookbook(id, recipe_id)? {
            return Err(Error::not_found(format!(
                "Recipe {recipe_id} is not in cookbook {id}"
            )));
        }
        Ok(())
    }
}

fn empty_plan(date: NaiveDate) -> MealPlan {
    MealPlan {
        id: None,
        plan_date: date,
        meals: Vec::new(),
    }
}
