use std::path::Path;

use chrono::{NaiveDate, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use uuid::Uuid;

use crate::error::{Error, Result, not_found_or_store};
use crate::grocery::IngredientSource;
use crate::models::{
    AggregatedLine, Cookbook, DateRange, Department, GroceryList, GroceryListItem, IngredientTuple,
    ItemStatus, MealPlan, MealSlot, NewCookbook, NewManualItem, NewMealSlot, NewRecipe,
    NutritionFact, NutritionSearchResult, Recipe, RecipeIngredient, RecipeInstruction, RecipeQuery,
    User,
};

const RECIPE_COLUMNS: &str = "r.id, r.uuid, r.user_id, r.title, r.servings, r.serving_size,
    r.prep_time_minutes, r.cook_time_minutes, r.total_time_minutes, r.storage_notes,
    r.source, r.notes, r.created_at, r.updated_at";

const COOKBOOK_COLUMNS: &str = "c.id, c.uuid, c.user_id, c.name, c.description,
    (SELECT COUNT(*) FROM cookbook_recipes cr JOIN recipes r ON r.id = cr.recipe_id
     WHERE cr.cookbook_id = c.id AND r.deleted_at IS NULL),
    c.created_at, c.updated_at";

const GROCERY_LIST_COLUMNS: &str =
    "id, uuid, user_id, start_date, end_date, created_at, updated_at";

const GROCERY_ITEM_COLUMNS: &str = "id, grocery_list_id, item_name, quantity, unit, department,
    status, is_manual, source_recipe_id";

const NUTRITION_COLUMNS: &str =
    "id, fdc_id, food_name, calories, protein_g, carbs_g, fiber_g, fat_g, cached_at";

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    #[allow(clippy::too_many_lines)]
    fn migrate(&self) -> Result<()> {
        self.conn.pragma_update(None, "foreign_keys", "ON")?;

        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    token TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    user_id INTEGER NOT NULL REFERENCES users(id),
                    title TEXT NOT NULL,
                    servings INTEGER NOT NULL,
                    serving_size TEXT NOT NULL,
                    prep_time_minutes INTEGER,
                    cook_time_minutes INTEGER,
                    total_time_minutes INTEGER NOT NULL DEFAULT 0,
                    storage_notes TEXT,
                    source TEXT,
                    notes TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    deleted_at TEXT
                );

                CREATE TABLE IF NOT EXISTS recipe_ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    ingredient_name TEXT NOT NULL,
                    quantity REAL,
                    unit TEXT,
                    department TEXT NOT NULL,
                    order_index INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipe_instructions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    step_number INTEGER NOT NULL,
                    instruction TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipe_tags (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    tag_name TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meal_plans (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    plan_date TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meal_slots (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    meal_plan_id INTEGER NOT NULL REFERENCES meal_plans(id) ON DELETE CASCADE,
                    meal_type TEXT NOT NULL,
                    recipe_id INTEGER REFERENCES recipes(id),
                    servings INTEGER,
                    out_of_kitchen INTEGER NOT NULL DEFAULT 0,
                    order_index INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS cookbooks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    user_id INTEGER NOT NULL REFERENCES users(id),
                    name TEXT NOT NULL,
                    description TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    deleted_at TEXT
                );

                CREATE TABLE IF NOT EXISTS cookbook_recipes (
                    cookbook_id INTEGER NOT NULL REFERENCES cookbooks(id) ON DELETE CASCADE,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    added_at TEXT NOT NULL,
                    PRIMARY KEY (cookbook_id, recipe_id)
                );

                CREATE TABLE IF NOT EXISTS grocery_lists (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL UNIQUE,
                    user_id INTEGER NOT NULL REFERENCES users(id),
                    start_date TEXT NOT NULL,
                    end_date TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS grocery_list_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    grocery_list_id INTEGER NOT NULL REFERENCES grocery_lists(id) ON DELETE CASCADE,
                    item_name TEXT NOT NULL,
                    quantity REAL,
                    unit TEXT,
                    department TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'pending',
                    is_manual INTEGER NOT NULL DEFAULT 0,
                    source_recipe_id INTEGER REFERENCES recipes(id),
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_recipe ON recipe_ingredients(recipe_id);
                CREATE INDEX IF NOT EXISTS idx_meal_slots_plan ON meal_slots(meal_plan_id);
                CREATE INDEX IF NOT EXISTS idx_grocery_items_list ON grocery_list_items(grocery_list_id);
                CREATE INDEX IF NOT EXISTS idx_grocery_lists_user ON grocery_lists(user_id, start_date);

                PRAGMA user_version = 1;",
            )?;
        }

        if version < 2 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS nutrition_cache (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    fdc_id TEXT NOT NULL UNIQUE,
                    food_name TEXT NOT NULL,
                    calories REAL,
                    protein_g REAL,
                    carbs_g REAL,
                    fiber_g REAL,
                    fat_g REAL,
                    cached_at TEXT NOT NULL
                );

                ALTER TABLE recipe_ingredients
                    ADD COLUMN nutrition_id INTEGER REFERENCES nutrition_cache(id);

                CREATE INDEX IF NOT EXISTS idx_nutrition_cache_name ON nutrition_cache(food_name);

                PRAGMA user_version = 2;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn user_from_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: row.get(2)?,
        })
    }

    // Expects RECIPE_COLUMNS; children are loaded separately.
    fn recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<Recipe> {
        Ok(Recipe {
            id: row.get(0)?,
            uuid: row.get(1)?,
            user_id: row.get(2)?,
            title: row.get(3)?,
            servings: row.get(4)?,
            serving_size: row.get(5)?,
            prep_time_minutes: row.get(6)?,
            cook_time_minutes: row.get(7)?,
            total_time_minutes: row.get(8)?,
            storage_notes: row.get(9)?,
            source: row.get(10)?,
            notes: row.get(11)?,
            created_at: row.get(12)?,
            updated_at: row.get(13)?,
            ingredients: Vec::new(),
            instructions: Vec::new(),
            tags: Vec::new(),
        })
    }

    fn cookbook_from_row(row: &rusqlite::Row) -> rusqlite::Result<Cookbook> {
        Ok(Cookbook {
            id: row.get(0)?,
            uuid: row.get(1)?,
            user_id: row.get(2)?,
            name: row.get(3)?,
            description: row.get(4)?,
            recipe_count: row.get(5)?,
            recipes: Vec::new(),
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn grocery_list_from_row(row: &rusqlite::Row) -> rusqlite::Result<GroceryList> {
        Ok(GroceryList {
            id: row.get(0)?,
            uuid: row.get(1)?,
            user_id: row.get(2)?,
            start_date: row.get(3)?,
            end_date: row.get(4)?,
            items: Vec::new(),
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn grocery_item_from_row(row: &rusqlite::Row) -> rusqlite::Result<GroceryListItem> {
        Ok(GroceryListItem {
            id: row.get(0)?,
            grocery_list_id: row.get(1)?,
            item_name: row.get(2)?,
            quantity: row.get(3)?,
            unit: row.get(4)?,
            department: row.get(5)?,
            status: row.get(6)?,
            is_manual: row.get(7)?,
            source_recipe_id: row.get(8)?,
        })
    }

    fn nutrition_from_row(row: &rusqlite::Row) -> rusqlite::Result<NutritionFact> {
        Ok(NutritionFact {
            id: row.get(0)?,
            fdc_id: row.get(1)?,
            food_name: row.get(2)?,
            calories: row.get(3)?,
            protein_g: row.get(4)?,
            carbs_g: row.get(5)?,
            fiber_g: row.get(6)?,
            fat_g: row.get(7)?,
            cached_at: row.get(8)?,
        })
    }

    // --- Users ---

    pub fn create_user(&self, name: &str, token: &str) -> Result<User> {
        self.conn.execute(
            "INSERT INTO users (name, token, created_at) VALUES (?1, ?2, ?3)",
            params![name, token, now()],
        )?;
        let id = self.conn.last_insert_rowid();
        self.conn
            .query_row(
                "SELECT id, name, created_at FROM users WHERE id = ?1",
                params![id],
                Self::user_from_row,
            )
            .map_err(|e| not_found_or_store(e, format!("User {id} not found")))
    }

    pub fn user_by_token(&self, token: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, name, created_at FROM users WHERE token = ?1",
                params![token],
                Self::user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM users ORDER BY id")?;
        let users = stmt
            .query_map([], Self::user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    // --- Recipes ---

    pub fn insert_recipe(&self, user_id: i64, recipe: &NewRecipe) -> Result<Recipe> {
        let tx = self.conn.unchecked_transaction()?;
        let id = insert_recipe_row(&tx, user_id, recipe, &now())?;
        tx.commit()?;
        self.get_recipe(id)
    }

    /// Insert every recipe in one transaction. If any insert fails, none are stored.
    pub fn insert_recipes(&self, user_id: i64, recipes: &[NewRecipe]) -> Result<Vec<Recipe>> {
        let ts = now();
        let tx = self.conn.unchecked_transaction()?;
        let ids = recipes
            .iter()
            .map(|r| insert_recipe_row(&tx, user_id, r, &ts))
            .collect::<Result<Vec<_>>>()?;
        tx.commit()?;
        ids.into_iter().map(|id| self.get_recipe(id)).collect()
    }

    /// Fetch a recipe with its ingredients, instructions and tags. Soft-deleted recipes are not found.
    pub fn get_recipe(&self, id: i64) -> Result<Recipe> {
        let recipe = self
            .conn
            .query_row(
                &format!(
                    "SELECT {RECIPE_COLUMNS} FROM recipes r WHERE r.id = ?1 AND r.deleted_at IS NULL"
                ),
                params![id],
                Self::recipe_from_row,
            )
            .map_err(|e| not_found_or_store(e, format!("Recipe {id} not found")))?;
        self.with_recipe_children(recipe)
    }

    pub fn recipe_exists(&self, id: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM recipes WHERE id = ?1 AND deleted_at IS NULL",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn with_recipe_children(&self, mut recipe: Recipe) -> Result<Recipe> {
        let mut stmt = self.conn.prepare(
            "SELECT id, recipe_id, nutrition_id, ingredient_name, quantity, unit, department, order_index
             FROM recipe_ingredients WHERE recipe_id = ?1 ORDER BY order_index, id",
        )?;
        recipe.ingredients = stmt
            .query_map(params![recipe.id], |row| {
                Ok(RecipeIngredient {
                    id: row.get(0)?,
                    recipe_id: row.get(1)?,
                    nutrition_id: row.get(2)?,
                    ingredient_name: row.get(3)?,
                    quantity: row.get(4)?,
                    unit: row.get(5)?,
                    department: row.get(6)?,
                    order_index: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT id, recipe_id, step_number, instruction
             FROM recipe_instructions WHERE recipe_id = ?1 ORDER BY step_number, id",
        )?;
        recipe.instructions = stmt
            .query_map(params![recipe.id], |row| {
                Ok(RecipeInstruction {
                    id: row.get(0)?,
                    recipe_id: row.get(1)?,
                    step_number: row.get(2)?,
                    instruction: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT tag_name FROM recipe_tags WHERE recipe_id = ?1 ORDER BY id")?;
        recipe.tags = stmt
            .query_map(params![recipe.id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(recipe)
    }

    fn recipes_from_query(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Recipe>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt
            .query_map(args, Self::recipe_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|r| self.with_recipe_children(r))
            .collect()
    }

    /// Newest first, optionally filtered by a case-insensitive title substring. Returns the page and the total count.
    pub fn list_recipes(&self, query: &RecipeQuery) -> Result<(Vec<Recipe>, i64)> {
        let pattern = match query.search.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => {
                let escaped = s
                    .replace('\\', "\\\\")
                    .replace('%', "\\%")
                    .replace('_', "\\_");
                format!("%{escaped}%")
            }
            _ => "%".to_string(),
        };

        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM recipes r
             WHERE r.deleted_at IS NULL AND r.title LIKE ?1 ESCAPE '\\'",
            params![pattern],
            |row| row.get(0),
        )?;
        let recipes = self.recipes_from_query(
            &format!(
                "SELECT {RECIPE_COLUMNS} FROM recipes r
                 WHERE r.deleted_at IS NULL AND r.title LIKE ?1 ESCAPE '\\'
                 ORDER BY r.created_at DESC, r.id DESC
                 LIMIT ?2 OFFSET ?3"
            ),
            &[&pattern, &query.limit, &query.offset],
        )?;
        Ok((recipes, total))
    }

    /// Replace a recipe's fields and all of its children.
    pub fn update_recipe(&self, id: i64, recipe: &NewRecipe) -> Result<Recipe> {
        let tx = self.conn.unchecked_transaction()?;
        let rows = tx.execute(
            "UPDATE recipes SET title = ?2, servings = ?3, serving_size = ?4, prep_time_minutes = ?5,
                cook_time_minutes = ?6, total_time_minutes = ?7, storage_notes = ?8, source = ?9,
                notes = ?10, updated_at = ?11
             WHERE id = ?1 AND deleted_at IS NULL",
            params![
                id,
                recipe.title.trim(),
                recipe.servings,
                recipe.serving_size,
                recipe.prep_time_minutes,
                recipe.cook_time_minutes,
                total_minutes(recipe),
                recipe.storage_notes,
                recipe.source,
                recipe.notes,
                now(),
            ],
        )?;
        if rows == 0 {
            return Err(Error::not_found(format!("Recipe {id} not found")));
        }
        tx.execute(
            "DELETE FROM recipe_ingredients WHERE recipe_id = ?1",
            params![id],
        )?;
        tx.execute(
            "DELETE FROM recipe_instructions WHERE recipe_id = ?1",
            params![id],
        )?;
        tx.execute("DELETE FROM recipe_tags WHERE recipe_id = ?1", params![id])?;
        insert_recipe_children(&tx, id, recipe)?;
        tx.commit()?;
        self.get_recipe(id)
    }

    pub fn soft_delete_recipe(&self, id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE recipes SET deleted_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
            params![id, now()],
        )?;
        Ok(rows > 0)
    }

    /// Non-deleted recipes with at least one ingredient whose trimmed, lowercased
    /// name equals one of `names` (compared the same way). Newest first.
    pub fn recipes_with_ingredients(&self, names: &[String]) -> Result<Vec<Recipe>> {
        let wanted: Vec<String> = names.iter().map(|n| n.trim().to_lowercase()).collect();
        if wanted.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = (1..=wanted.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes r
             WHERE r.deleted_at IS NULL
               AND EXISTS (SELECT 1 FROM recipe_ingredients ri
                           WHERE ri.recipe_id = r.id
                             AND LOWER(TRIM(ri.ingredient_name)) IN ({placeholders}))
             ORDER BY r.created_at DESC, r.id DESC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(wanted.iter()), Self::recipe_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|r| self.with_recipe_children(r))
            .collect()
    }

    // --- Meal plans ---

    pub fn get_meal_plan(&self, date: NaiveDate) -> Result<Option<MealPlan>> {
        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM meal_plans WHERE plan_date = ?1",
                params![date],
                |row| row.get(0),
            )
            .optional()?;
        match id {
            Some(id) => Ok(Some(MealPlan {
                id: Some(id),
                plan_date: date,
                meals: self.meal_slots(id)?,
            })),
            None => Ok(None),
        }
    }

    /// Stored plans within the range, ascending by date. Dates without a plan are absent.
    pub fn get_meal_plans(&self, range: &DateRange) -> Result<Vec<MealPlan>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, plan_date FROM meal_plans
             WHERE plan_date >= ?1 AND plan_date <= ?2
             ORDER BY plan_date",
        )?;
        let heads = stmt
            .query_map(params![range.start(), range.end()], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, NaiveDate>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        heads
            .into_iter()
            .map(|(id, plan_date)| {
                Ok(MealPlan {
                    id: Some(id),
                    plan_date,
                    meals: self.meal_slots(id)?,
                })
            })
            .collect()
    }

    fn meal_slots(&self, meal_plan_id: i64) -> Result<Vec<MealSlot>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.id, s.meal_type, s.recipe_id, r.title, s.servings, s.out_of_kitchen, s.order_index
             FROM meal_slots s
             LEFT JOIN recipes r ON r.id = s.recipe_id
             WHERE s.meal_plan_id = ?1
             ORDER BY s.order_index, s.id",
        )?;
        let slots = stmt
            .query_map(params![meal_plan_id], |row| {
                Ok(MealSlot {
                    id: row.get(0)?,
                    meal_type: row.get(1)?,
                    recipe_id: row.get(2)?,
                    recipe_title: row.get(3)?,
                    servings: row.get(4)?,
                    out_of_kitchen: row.get(5)?,
                    order_index: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(slots)
    }

    /// Create the plan for `date` if needed and replace all of its slots.
    pub fn set_meal_plan(&self, date: NaiveDate, slots: &[NewMealSlot]) -> Result<MealPlan> {
        let ts = now();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO meal_plans (plan_date, created_at, updated_at) VALUES (?1, ?2, ?2)
             ON CONFLICT(plan_date) DO UPDATE SET updated_at = excluded.updated_at",
            params![date, ts],
        )?;
        let plan_id: i64 = tx.query_row(
            "SELECT id FROM meal_plans WHERE plan_date = ?1",
            params![date],
            |row| row.get(0),
        )?;
        tx.execute(
            "DELETE FROM meal_slots WHERE meal_plan_id = ?1",
            params![plan_id],
        )?;
        for (i, slot) in slots.iter().enumerate() {
            tx.execute(
                "INSERT INTO meal_slots (meal_plan_id, meal_type, recipe_id, servings, out_of_kitchen, order_index)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    plan_id,
                    slot.meal_type,
                    slot.recipe_id,
                    slot.servings,
                    slot.out_of_kitchen,
                    i as i64,
                ],
            )?;
        }
        tx.commit()?;
        Ok(MealPlan {
            id: Some(plan_id),
            plan_date: date,
            meals: self.meal_slots(plan_id)?,
        })
    }

    // --- Cookbooks ---

    pub fn insert_cookbook(&self, user_id: i64, cookbook: &NewCookbook) -> Result<Cookbook> {
        let ts = now();
        self.conn.execute(
            "INSERT INTO cookbooks (uuid, user_id, name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Uuid::new_v4().to_string(),
                user_id,
                cookbook.name.trim(),
                cookbook.description,
                ts,
                ts,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_cookbook(id)
    }

    pub fn get_cookbook(&self, id: i64) -> Result<Cookbook> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {COOKBOOK_COLUMNS} FROM cookbooks c WHERE c.id = ?1 AND c.deleted_at IS NULL"
                ),
                params![id],
                Self::cookbook_from_row,
            )
            .map_err(|e| not_found_or_store(e, format!("Cookbook {id} not found")))
    }

    pub fn list_cookbooks(&self, user_id: i64, limit: i64, offset: i64) -> Result<(Vec<Cookbook>, i64)> {
        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM cookbooks WHERE user_id = ?1 AND deleted_at IS NULL",
            params![user_id],
            |row| row.get(0),
        )?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {COOKBOOK_COLUMNS} FROM cookbooks c
             WHERE c.user_id = ?1 AND c.deleted_at IS NULL
             ORDER BY c.created_at DESC, c.id DESC
             LIMIT ?2 OFFSET ?3"
        ))?;
        let cookbooks = stmt
            .query_map(params![user_id, limit, offset], Self::cookbook_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok((cookbooks, total))
    }

    pub fn update_cookbook(&self, id: i64, cookbook: &NewCookbook) -> Result<Cookbook> {
        let rows = self.conn.execute(
            "UPDATE cookbooks SET name = ?2, description = ?3, updated_at = ?4
             WHERE id = ?1 AND deleted_at IS NULL",
            params![id, cookbook.name.trim(), cookbook.description, now()],
        )?;
        if rows == 0 {
            return Err(Error::not_found(format!("Cookbook {id} not found")));
        }
        self.get_cookbook(id)
    }

    pub fn soft_delete_cookbook(&self, id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE cookbooks SET deleted_at = ?2 WHERE id = ?1 AND deleted_at IS NULL",
            params![id, now()],
        )?;
        Ok(rows > 0)
    }

    /// Adding a recipe that is already in the cookbook is a no-op.
    pub fn add_recipe_to_cookbook(&self, cookbook_id: i64, recipe_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO cookbook_recipes (cookbook_id, recipe_id, added_at)
             VALUES (?1, ?2, ?3)",
            params![cookbook_id, recipe_id, now()],
        )?;
        Ok(())
    }

    pub fn remove_recipe_from_cookbook(&self, cookbook_id: i64, recipe_id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM cookbook_recipes WHERE cookbook_id = ?1 AND recipe_id = ?2",
            params![cookbook_id, recipe_id],
        )?;
        Ok(rows > 0)
    }

    pub fn cookbook_recipes(&self, cookbook_id: i64) -> Result<Vec<Recipe>> {
        self.recipes_from_query(
            &format!(
                "SELECT {RECIPE_COLUMNS} FROM recipes r
                 JOIN cookbook_recipes cr ON cr.recipe_id = r.id
                 WHERE cr.cookbook_id = ?1 AND r.deleted_at IS NULL
                 ORDER BY cr.added_at, r.id"
            ),
            &[&cookbook_id],
        )
    }

    // --- Grocery lists ---

    /// Insert a list and all of its generated lines in one transaction.
    pub fn insert_grocery_list(
        &self,
        user_id: i64,
        range: &DateRange,
        lines: &[AggregatedLine],
    ) -> Result<GroceryList> {
        let ts = now();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO grocery_lists (uuid, user_id, start_date, end_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                Uuid::new_v4().to_string(),
                user_id,
                range.start(),
                range.end(),
                ts,
                ts,
            ],
        )?;
        let list_id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO grocery_list_items (grocery_list_id, item_name, quantity, unit, department,
                    status, is_manual, source_recipe_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8)",
            )?;
            for line in lines {
                stmt.execute(params![
                    list_id,
                    line.item_name,
                    line.quantity,
                    line.unit,
                    line.department,
                    line.status,
                    line.source_recipe_id,
                    ts,
                ])?;
            }
        }
        tx.commit()?;
        self.get_grocery_list(list_id)
    }

    pub fn get_grocery_list(&self, id: i64) -> Result<GroceryList> {
        let mut list = self
            .conn
            .query_row(
                &format!("SELECT {GROCERY_LIST_COLUMNS} FROM grocery_lists WHERE id = ?1"),
                params![id],
                Self::grocery_list_from_row,
            )
            .map_err(|e| not_found_or_store(e, format!("Grocery list {id} not found")))?;
        list.items = self.grocery_list_items(id)?;
        Ok(list)
    }

    /// Items ordered by department token, then item name.
    pub fn grocery_list_items(&self, list_id: i64) -> Result<Vec<GroceryListItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GROCERY_ITEM_COLUMNS} FROM grocery_list_items
             WHERE grocery_list_id = ?1
             ORDER BY department, item_name, id"
        ))?;
        let items = stmt
            .query_map(params![list_id], Self::grocery_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn list_grocery_lists(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<GroceryList>, i64)> {
        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM grocery_lists WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GROCERY_LIST_COLUMNS} FROM grocery_lists
             WHERE user_id = ?1
             ORDER BY start_date DESC, created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3"
        ))?;
        let mut lists = stmt
            .query_map(params![user_id, limit, offset], Self::grocery_list_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for list in &mut lists {
            list.items = self.grocery_list_items(list.id)?;
        }
        Ok((lists, total))
    }

    pub fn delete_grocery_list(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM grocery_lists WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn insert_manual_item(&self, list_id: i64, item: &NewManualItem) -> Result<GroceryListItem> {
        let department = item.department.unwrap_or(Department::Other);
        self.conn.execute(
            "INSERT INTO grocery_list_items (grocery_list_id, item_name, quantity, unit, department,
                status, is_manual, source_recipe_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, NULL, ?7)",
            params![
                list_id,
                item.item_name.trim(),
                item.quantity,
                item.unit,
                department,
                ItemStatus::Pending,
                now(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.touch_grocery_list(list_id)?;
        self.get_grocery_item(list_id, id)
    }

    pub fn get_grocery_item(&self, list_id: i64, item_id: i64) -> Result<GroceryListItem> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {GROCERY_ITEM_COLUMNS} FROM grocery_list_items
                     WHERE id = ?1 AND grocery_list_id = ?2"
                ),
                params![item_id, list_id],
                Self::grocery_item_from_row,
            )
            .map_err(|e| not_found_or_store(e, format!("Grocery list item {item_id} not found")))
    }

    pub fn update_item_status(
        &self,
        list_id: i64,
        item_id: i64,
        status: ItemStatus,
    ) -> Result<GroceryListItem> {
        let rows = self.conn.execute(
            "UPDATE grocery_list_items SET status = ?3 WHERE id = ?1 AND grocery_list_id = ?2",
            params![item_id, list_id, status],
        )?;
        if rows == 0 {
            return Err(Error::not_found(format!(
                "Grocery list item {item_id} not found"
            )));
        }
        self.touch_grocery_list(list_id)?;
        self.get_grocery_item(list_id, item_id)
    }

    pub fn delete_grocery_item(&self, list_id: i64, item_id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM grocery_list_items WHERE id = ?1 AND grocery_list_id = ?2",
            params![item_id, list_id],
        )?;
        if rows > 0 {
            self.touch_grocery_list(list_id)?;
        }
        Ok(rows > 0)
    }

    fn touch_grocery_list(&self, list_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE grocery_lists SET updated_at = ?2 WHERE id = ?1",
            params![list_id, now()],
        )?;
        Ok(())
    }

    // --- Nutrition cache ---

    /// Cache a lookup result. A row already cached under the same FDC id is kept as is.
    pub fn cache_nutrition(&self, result: &NutritionSearchResult) -> Result<NutritionFact> {
        self.conn.execute(
            "INSERT INTO nutrition_cache (fdc_id, food_name, calories, protein_g, carbs_g, fiber_g,
                fat_g, cached_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(fdc_id) DO NOTHING",
            params![
                result.fdc_id,
                result.description,
                result.calories,
                result.protein_g,
                result.carbs_g,
                result.fiber_g,
                result.fat_g,
                now(),
            ],
        )?;
        self.nutrition_by_fdc_id(&result.fdc_id)?.ok_or_else(|| {
            Error::not_found(format!("Nutrition data {} not found", result.fdc_id))
        })
    }

    pub fn nutrition_by_fdc_id(&self, fdc_id: &str) -> Result<Option<NutritionFact>> {
        let fact = self
            .conn
            .query_row(
                &format!("SELECT {NUTRITION_COLUMNS} FROM nutrition_cache WHERE fdc_id = ?1"),
                params![fdc_id],
                Self::nutrition_from_row,
            )
            .optional()?;
        Ok(fact)
    }

    pub fn get_nutrition(&self, id: i64) -> Result<NutritionFact> {
        self.conn
            .query_row(
                &format!("SELECT {NUTRITION_COLUMNS} FROM nutrition_cache WHERE id = ?1"),
                params![id],
                Self::nutrition_from_row,
            )
            .map_err(|e| not_found_or_store(e, format!("Nutrition data {id} not found")))
    }

    pub fn nutrition_exists(&self, id: i64) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM nutrition_cache WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Cached foods whose name contains `query` (case-insensitive), alphabetical.
    pub fn search_nutrition(&self, query: &str, limit: i64) -> Result<Vec<NutritionFact>> {
        let escaped = query
            .trim()
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {NUTRITION_COLUMNS} FROM nutrition_cache
             WHERE food_name LIKE ?1 ESCAPE '\\'
             ORDER BY food_name
             LIMIT ?2"
        ))?;
        let facts = stmt
            .query_map(params![pattern, limit], Self::nutrition_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(facts)
    }
}

impl IngredientSource for Database {
    fn ingredients_for_range(&self, range: &DateRange) -> Result<Vec<IngredientTuple>> {
        let mut stmt = self.conn.prepare(
            "SELECT ri.ingredient_name, ri.quantity, ri.unit, ri.department,
                    r.id, r.title, s.servings, r.servings, ri.order_index
             FROM meal_plans mp
             JOIN meal_slots s ON s.meal_plan_id = mp.id
             JOIN recipes r ON r.id = s.recipe_id
             JOIN recipe_ingredients ri ON ri.recipe_id = r.id
             WHERE mp.plan_date >= ?1 AND mp.plan_date <= ?2
               AND s.out_of_kitchen = 0
               AND r.deleted_at IS NULL
             ORDER BY r.id, ri.order_index, mp.plan_date, s.id",
        )?;
        let tuples = stmt
            .query_map(params![range.start(), range.end()], |row| {
                Ok(IngredientTuple {
                    ingredient_name: row.get(0)?,
                    quantity: row.get(1)?,
                    unit: row.get(2)?,
                    department: row.get(3)?,
                    recipe_id: row.get(4)?,
                    recipe_title: row.get(5)?,
                    meal_servings: row.get(6)?,
                    recipe_servings: row.get(7)?,
                    order_index: row.get(8)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tuples)
    }
}

fn total_minutes(recipe: &NewRecipe) -> i64 {
    recipe.prep_time_minutes.unwrap_or(0) + recipe.cook_time_minutes.unwrap_or(0)
}

fn insert_recipe_row(conn: &Connection, user_id: i64, recipe: &NewRecipe, ts: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO recipes (uuid, user_id, title, servings, serving_size, prep_time_minutes,
            cook_time_minutes, total_time_minutes, storage_notes, source, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            Uuid::new_v4().to_string(),
            user_id,
            recipe.title.trim(),
            recipe.servings,
            recipe.serving_size,
            recipe.prep_time_minutes,
            recipe.cook_time_minutes,
            total_minutes(recipe),
            recipe.storage_notes,
            recipe.source,
            recipe.notes,
            ts,
            ts,
        ],
    )?;
    let id = conn.last_insert_rowid();
    insert_recipe_children(conn, id, recipe)?;
    Ok(id)
}

// Ingredient names and units are stored as entered; grocery lines show the first one seen.
fn insert_recipe_children(conn: &Connection, recipe_id: i64, recipe: &NewRecipe) -> Result<()> {
    for (i, ing) in recipe.ingredients.iter().enumerate() {
        conn.execute(
            "INSERT INTO recipe_ingredients (recipe_id, nutrition_id, ingredient_name, quantity, unit,
                department, order_index)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                recipe_id,
                ing.nutrition_id,
                ing.ingredient_name,
                ing.quantity,
                ing.unit,
                ing.department,
                i as i64,
            ],
        )?;
    }
    for step in &recipe.instructions {
        conn.execute(
            "INSERT INTO recipe_instructions (recipe_id, step_number, instruction) VALUES (?1, ?2, ?3)",
            params![recipe_id, step.step_number, step.instruction],
        )?;
    }
    for tag in &recipe.tags {
        let tag = tag.trim();
        if !tag.is_empty() {
            conn.execute(
                "INSERT INTO recipe_tags (recipe_id, tag_name) VALUES (?1, ?2)",
                params![recipe_id, tag],
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MealType, NewIngredient, NewInstruction};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn ingredient(name: &str, quantity: Option<f64>, unit: Option<&str>, dept: Department) -> NewIngredient {
        NewIngredient {
            ingredient_name: name.to_string(),
            quantity,
            unit: unit.map(str::to_string),
            department: dept,
            nutrition_id: None,
        }
    }

    fn sample_recipe(title: &str, ingredients: Vec<NewIngredient>) -> NewRecipe {
        NewRecipe {
            title: title.to_string(),
            servings: 4,
            serving_size: "1 cup".to_string(),
            prep_time_minutes: Some(10),
            cook_time_minutes: Some(20),
            storage_notes: None,
            source: None,
            notes: None,
            ingredients,
            instructions: vec![NewInstruction {
                step_number: 1,
                instruction: "Cook it".to_string(),
            }],
            tags: vec!["weeknight".to_string()],
        }
    }

    fn cooking(meal_type: MealType, recipe_id: i64, servings: i64) -> NewMealSlot {
        NewMealSlot {
            meal_type,
            recipe_id: Some(recipe_id),
            servings: Some(servings),
            out_of_kitchen: false,
        }
    }

    fn setup() -> (Database, User) {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("alex", "token-alex").unwrap();
        (db, user)
    }

    #[test]
    fn test_user_by_token() {
        let (db, user) = setup();
        let found = db.user_by_token("token-alex").unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert!(db.user_by_token("nope").unwrap().is_none());
        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn test_insert_and_get_recipe() {
        let (db, user) = setup();
        let recipe = db
            .insert_recipe(
                user.id,
                &sample_recipe(
                    "Chili",
                    vec![
                        ingredient("Beans", Some(2.0), Some("can"), Department::Pantry),
                        ingredient("Cumin", None, None, Department::Spices),
                    ],
                ),
            )
            .unwrap();

        assert_eq!(recipe.title, "Chili");
        assert_eq!(recipe.total_time_minutes, 30);
        assert_eq!(recipe.ingredients.len(), 2);
        assert_eq!(recipe.ingredients[0].ingredient_name, "Beans");
        assert_eq!(recipe.ingredients[1].order_index, 1);
        assert_eq!(recipe.ingredients[1].quantity, None);
        assert_eq!(recipe.ingredients[1].department, Department::Spices);
        assert_eq!(recipe.instructions.len(), 1);
        assert_eq!(recipe.tags, vec!["weeknight"]);
    }

    #[test]
    fn test_get_missing_recipe_is_not_found() {
        let (db, _) = setup();
        assert!(matches!(db.get_recipe(99), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_update_recipe_replaces_children() {
        let (db, user) = setup();
        let recipe = db
            .insert_recipe(
                user.id,
                &sample_recipe("Soup", vec![ingredient("Leek", Some(1.0), None, Department::Produce)]),
            )
            .unwrap();

        let mut changed = sample_recipe(
            "Better Soup",
            vec![
                ingredient("Potato", Some(3.0), None, Department::Produce),
                ingredient("Cream", Some(1.0), Some("cup"), Department::Dairy),
            ],
        );
        changed.tags.clear();
        let updated = db.update_recipe(recipe.id, &changed).unwrap();
        assert_eq!(updated.title, "Better Soup");
        assert_eq!(updated.ingredients.len(), 2);
        assert_eq!(updated.ingredients[0].ingredient_name, "Potato");
        assert!(updated.tags.is_empty());
    }

    #[test]
    fn test_soft_delete_recipe_hides_it() {
        let (db, user) = setup();
        let recipe = db
            .insert_recipe(
                user.id,
                &sample_recipe("Toast", vec![ingredient("Bread", Some(2.0), Some("slice"), Department::Bakery)]),
            )
            .unwrap();
        assert!(db.soft_delete_recipe(recipe.id).unwrap());
        assert!(!db.soft_delete_recipe(recipe.id).unwrap());
        assert!(matches!(db.get_recipe(recipe.id), Err(Error::NotFound(_))));
        assert!(!db.recipe_exists(recipe.id).unwrap());
    }

    #[test]
    fn test_list_recipes_search_and_paging() {
        let (db, user) = setup();
        for title in ["Pancakes", "Pan Pizza", "Salad"] {
            db.insert_recipe(
                user.id,
                &sample_recipe(title, vec![ingredient("Flour", Some(1.0), Some("cup"), Department::Pantry)]),
            )
            .unwrap();
        }

        let query = RecipeQuery {
            search: Some("pan".to_string()),
            limit: 20,
            offset: 0,
        };
        let (found, total) = db.list_recipes(&query).unwrap();
        assert_eq!(total, 2);
        assert_eq!(found.len(), 2);

        let query = RecipeQuery {
            search: None,
            limit: 1,
            offset: 1,
        };
        let (page, total) = db.list_recipes(&query).unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "Pan Pizza");
    }

    #[test]
    fn test_set_meal_plan_replaces_slots() {
        let (db, user) = setup();
        let recipe = db
            .insert_recipe(
                user.id,
                &sample_recipe("Oats", vec![ingredient("Oats", Some(1.0), Some("cup"), Department::Pantry)]),
            )
            .unwrap();
        let day = date("2024-06-10");

        db.set_meal_plan(
            day,
            &[
                cooking(MealType::Breakfast, recipe.id, 2),
                cooking(MealType::Dinner, recipe.id, 4),
            ],
        )
        .unwrap();
        let plan = db
            .set_meal_plan(day, &[cooking(MealType::Lunch, recipe.id, 1)])
            .unwrap();

        assert_eq!(plan.meals.len(), 1);
        assert_eq!(plan.meals[0].meal_type, MealType::Lunch);
        assert_eq!(plan.meals[0].recipe_title.as_deref(), Some("Oats"));

        let fetched = db.get_meal_plan(day).unwrap().unwrap();
        assert_eq!(fetched.id, plan.id);
        assert!(db.get_meal_plan(date("2024-06-11")).unwrap().is_none());
    }

    #[test]
    fn test_get_meal_plans_in_range() {
        let (db, _) = setup();
        db.set_meal_plan(date("2024-06-09"), &[]).unwrap();
        db.set_meal_plan(date("2024-06-12"), &[]).unwrap();
        db.set_meal_plan(date("2024-06-20"), &[]).unwrap();

        let range = DateRange::parse("2024-06-09", "2024-06-15").unwrap();
        let plans = db.get_meal_plans(&range).unwrap();
        let dates: Vec<NaiveDate> = plans.iter().map(|p| p.plan_date).collect();
        assert_eq!(dates, vec![date("2024-06-09"), date("2024-06-12")]);
    }

    #[test]
    fn test_ingredient_source_skips_out_of_kitchen_and_deleted() {
        let (db, user) = setup();
        let pasta = db
            .insert_recipe(
                user.id,
                &sample_recipe("Pasta", vec![ingredient("Spaghetti", Some(1.0), Some("lb"), Department::Pantry)]),
            )
            .unwrap();
        let gone = db
            .insert_recipe(
                user.id,
                &sample_recipe("Gone", vec![ingredient("Caviar", Some(1.0), Some("oz"), Department::Seafood)]),
            )
            .unwrap();
        db.soft_delete_recipe(gone.id).unwrap();

        db.set_meal_plan(
            date("2024-06-10"),
            &[
                cooking(MealType::Dinner, pasta.id, 2),
                NewMealSlot {
                    meal_type: MealType::Lunch,
                    recipe_id: None,
                    servings: None,
                    out_of_kitchen: true,
                },
                cooking(MealType::Snack, gone.id, 1),
            ],
        )
        .unwrap();
        // Out-of-kitchen rows never contribute, whatever they reference.
        db.conn
            .execute(
                "INSERT INTO meal_slots (meal_plan_id, meal_type, recipe_id, servings, out_of_kitchen, order_index)
                 SELECT id, 'lunch', ?1, 3, 1, 9 FROM meal_plans WHERE plan_date = '2024-06-10'",
                params![pasta.id],
            )
            .unwrap();

        let range = DateRange::parse("2024-06-10", "2024-06-10").unwrap();
        let tuples = db.ingredients_for_range(&range).unwrap();
        assert_eq!(tuples.len(), 1);
        assert_eq!(tuples[0].ingredient_name, "Spaghetti");
        assert_eq!(tuples[0].meal_servings, Some(2));
        assert_eq!(tuples[0].recipe_servings, 4);
    }

    #[test]
    fn test_ingredient_source_range_is_inclusive() {
        let (db, user) = setup();
        let r = db
            .insert_recipe(
                user.id,
                &sample_recipe("Eggs", vec![ingredient("Egg", Some(2.0), None, Department::Dairy)]),
            )
            .unwrap();
        for d in ["2024-06-09", "2024-06-10", "2024-06-11", "2024-06-12"] {
            db.set_meal_plan(date(d), &[cooking(MealType::Breakfast, r.id, 4)])
                .unwrap();
        }
        let range = DateRange::parse("2024-06-10", "2024-06-11").unwrap();
        assert_eq!(db.ingredients_for_range(&range).unwrap().len(), 2);
    }

    #[test]
    fn test_insert_grocery_list_with_items() {
        let (db, user) = setup();
        let range = DateRange::parse("2024-06-10", "2024-06-16").unwrap();
        let lines = vec![
            AggregatedLine {
                item_name: "Milk".to_string(),
                quantity: Some(1.0),
                unit: Some("gal".to_string()),
                department: Department::Dairy,
                status: ItemStatus::Pending,
                source_recipe_id: None,
            },
            AggregatedLine {
                item_name: "Apple".to_string(),
                quantity: None,
                unit: None,
                department: Department::Produce,
                status: ItemStatus::Pending,
                source_recipe_id: None,
            },
        ];
        let list = db.insert_grocery_list(user.id, &range, &lines).unwrap();
        assert_eq!(list.start_date, date("2024-06-10"));
        assert_eq!(list.end_date, date("2024-06-16"));
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].item_name, "Milk");
        assert!(!list.items[0].is_manual);
        assert_eq!(list.items[1].quantity, None);
    }

    #[test]
    fn test_insert_grocery_list_is_all_or_nothing() {
        let (db, user) = setup();
        db.conn
            .execute_batch(
                "CREATE TRIGGER fail_item BEFORE INSERT ON grocery_list_items
                 WHEN NEW.item_name = 'boom'
                 BEGIN SELECT RAISE(ABORT, 'boom'); END;",
            )
            .unwrap();
        let range = DateRange::parse("2024-06-10", "2024-06-16").unwrap();
        let line = |name: &str| AggregatedLine {
            item_name: name.to_string(),
            quantity: Some(1.0),
            unit: None,
            department: Department::Other,
            status: ItemStatus::Pending,
            source_recipe_id: None,
        };

        let result = db.insert_grocery_list(user.id, &range, &[line("fine"), line("boom")]);
        assert!(matches!(result, Err(Error::Store(_))));

        let lists: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM grocery_lists", [], |row| row.get(0))
            .unwrap();
        let items: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM grocery_list_items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(lists, 0);
        assert_eq!(items, 0);
    }

    #[test]
    fn test_manual_item_status_and_delete() {
        let (db, user) = setup();
        let range = DateRange::parse("2024-06-10", "2024-06-10").unwrap();
        let list = db.insert_grocery_list(user.id, &range, &[]).unwrap();

        let item = db
            .insert_manual_item(
                list.id,
                &NewManualItem {
                    item_name: " Foil ".to_string(),
                    quantity: None,
                    unit: None,
                    department: None,
                },
            )
            .unwrap();
        assert_eq!(item.item_name, "Foil");
        assert_eq!(item.department, Department::Other);
        assert!(item.is_manual);
        assert_eq!(item.status, ItemStatus::Pending);

        let bought = db
            .update_item_status(list.id, item.id, ItemStatus::Bought)
            .unwrap();
        assert_eq!(bought.status, ItemStatus::Bought);

        let other_list = db.insert_grocery_list(user.id, &range, &[]).unwrap();
        assert!(matches!(
            db.update_item_status(other_list.id, item.id, ItemStatus::HaveOnHand),
            Err(Error::NotFound(_))
        ));

        assert!(db.delete_grocery_item(list.id, item.id).unwrap());
        assert!(db.grocery_list_items(list.id).unwrap().is_empty());
    }

    #[test]
    fn test_delete_grocery_list_cascades() {
        let (db, user) = setup();
        let range = DateRange::parse("2024-06-10", "2024-06-10").unwrap();
        let list = db.insert_grocery_list(user.id, &range, &[]).unwrap();
        db.insert_manual_item(
            list.id,
            &NewManualItem {
                item_name: "Soap".to_string(),
                quantity: Some(1.0),
                unit: None,
                department: None,
            },
        )
        .unwrap();

        assert!(db.delete_grocery_list(list.id).unwrap());
        assert!(matches!(db.get_grocery_list(list.id), Err(Error::NotFound(_))));
        let items: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM grocery_list_items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(items, 0);
    }

    #[test]
    fn test_list_grocery_lists_newest_start_first() {
        let (db, user) = setup();
        for (s, e) in [("2024-06-01", "2024-06-07"), ("2024-06-15", "2024-06-21")] {
            db.insert_grocery_list(user.id, &DateRange::parse(s, e).unwrap(), &[])
                .unwrap();
        }
        let (lists, total) = db.list_grocery_lists(user.id, 20, 0).unwrap();
        assert_eq!(total, 2);
        assert_eq!(lists[0].start_date, date("2024-06-15"));

        let other = db.create_user("sam", "token-sam").unwrap();
        let (lists, total) = db.list_grocery_lists(other.id, 20, 0).unwrap();
        assert_eq!(total, 0);
        assert!(lists.is_empty());
    }

    #[test]
    fn test_cookbook_recipes_and_count() {
        let (db, user) = setup();
        let cookbook = db
            .insert_cookbook(
                user.id,
                &NewCookbook {
                    name: "Favorites".to_string(),
                    description: Some("Go-to dinners".to_string()),
                },
            )
            .unwrap();
        assert_eq!(cookbook.recipe_count, 0);

        let r = db
            .insert_recipe(
                user.id,
                &sample_recipe("Tacos", vec![ingredient("Tortilla", Some(8.0), None, Department::Bakery)]),
            )
            .unwrap();
        db.add_recipe_to_cookbook(cookbook.id, r.id).unwrap();
        db.add_recipe_to_cookbook(cookbook.id, r.id).unwrap();

        assert_eq!(db.get_cookbook(cookbook.id).unwrap().recipe_count, 1);
        assert_eq!(db.cookbook_recipes(cookbook.id).unwrap()[0].title, "Tacos");

        assert!(db.remove_recipe_from_cookbook(cookbook.id, r.id).unwrap());
        assert!(!db.remove_recipe_from_cookbook(cookbook.id, r.id).unwrap());

        assert!(db.soft_delete_cookbook(cookbook.id).unwrap());
        assert!(matches!(db.get_cookbook(cookbook.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_recipes_with_ingredients_strict_match() {
        let (db, user) = setup();
        db.insert_recipe(
            user.id,
            &sample_recipe("Omelette", vec![ingredient("Egg", Some(2.0), None, Department::Dairy)]),
        )
        .unwrap();
        db.insert_recipe(
            user.id,
            &sample_recipe("Salad", vec![ingredient("Lettuce", Some(1.0), None, Department::Produce)]),
        )
        .unwrap();

        let found = db.recipes_with_ingredients(&[" EGG ".to_string()]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Omelette");

        assert!(db.recipes_with_ingredients(&["eggs".to_string()]).unwrap().is_empty());
        assert!(db.recipes_with_ingredients(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_ingredient_names_are_stored_as_entered() {
        let (db, user) = setup();
        let r = db
            .insert_recipe(
                user.id,
                &sample_recipe(
                    "Salsa",
                    vec![ingredient("  Roma Tomato ", Some(3.0), Some(" Cup"), Department::Produce)],
                ),
            )
            .unwrap();
        assert_eq!(r.ingredients[0].ingredient_name, "  Roma Tomato ");
        assert_eq!(r.ingredients[0].unit.as_deref(), Some(" Cup"));

        db.set_meal_plan(date("2024-06-10"), &[cooking(MealType::Dinner, r.id, 4)])
            .unwrap();
        let range = DateRange::parse("2024-06-10", "2024-06-10").unwrap();
        let tuples = db.ingredients_for_range(&range).unwrap();
        assert_eq!(tuples[0].ingredient_name, "  Roma Tomato ");
    }

    #[test]
    fn test_insert_recipes_is_all_or_nothing() {
        let (db, user) = setup();
        db.conn
            .execute_batch(
                "CREATE TRIGGER fail_recipe BEFORE INSERT ON recipes
                 WHEN NEW.title = 'Boom'
                 BEGIN SELECT RAISE(ABORT, 'boom'); END;",
            )
            .unwrap();
        let eggs = || vec![ingredient("Egg", Some(2.0), None, Department::Dairy)];

        let result = db.insert_recipes(
            user.id,
            &[sample_recipe("Omelette", eggs()), sample_recipe("Boom", eggs())],
        );
        assert!(matches!(result, Err(Error::Store(_))));

        let recipes: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))
            .unwrap();
        let ingredients: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM recipe_ingredients", [], |row| row.get(0))
            .unwrap();
        assert_eq!(recipes, 0);
        assert_eq!(ingredients, 0);

        let created = db
            .insert_recipes(
                user.id,
                &[sample_recipe("Omelette", eggs()), sample_recipe("Frittata", eggs())],
            )
            .unwrap();
        assert_eq!(created.len(), 2);
        assert_eq!(created[1].title, "Frittata");
    }

    fn lookup(fdc_id: &str, description: &str, calories: Option<f64>) -> NutritionSearchResult {
        NutritionSearchResult {
            fdc_id: fdc_id.to_string(),
            description: description.to_string(),
            data_type: "SR Legacy".to_string(),
            calories,
            protein_g: Some(1.0),
            carbs_g: None,
            fiber_g: None,
            fat_g: None,
        }
    }

    #[test]
    fn test_cache_nutrition_and_search() {
        let (db, _) = setup();
        let rice = db
            .cache_nutrition(&lookup("100", "Rice, white", Some(365.0)))
            .unwrap();
        db.cache_nutrition(&lookup("200", "Brown rice", Some(370.0)))
            .unwrap();
        db.cache_nutrition(&lookup("300", "Olive oil", Some(884.0)))
            .unwrap();

        let again = db
            .cache_nutrition(&lookup("100", "Rice, renamed", Some(1.0)))
            .unwrap();
        assert_eq!(again, rice);

        let names: Vec<String> = db
            .search_nutrition("RICE", 10)
            .unwrap()
            .into_iter()
            .map(|f| f.food_name)
            .collect();
        assert_eq!(names, vec!["Brown rice", "Rice, white"]);
        assert_eq!(db.search_nutrition("rice", 1).unwrap().len(), 1);
        assert!(db.search_nutrition("100%", 10).unwrap().is_empty());

        assert!(db.nutrition_by_fdc_id("999").unwrap().is_none());
        assert_eq!(db.get_nutrition(rice.id).unwrap().calories, Some(365.0));
        assert!(matches!(db.get_nutrition(9999), Err(Error::NotFound(_))));
        assert!(db.nutrition_exists(rice.id).unwrap());
        assert!(!db.nutrition_exists(9999).unwrap());
    }

    #[test]
    fn test_ingredient_nutrition_id_round_trip() {
        let (db, user) = setup();
        let oil = db
            .cache_nutrition(&lookup("300", "Olive oil", Some(884.0)))
            .unwrap();
        let mut with_fact = ingredient("Olive oil", Some(15.0), Some("g"), Department::Pantry);
        with_fact.nutrition_id = Some(oil.id);

        let r = db
            .insert_recipe(
                user.id,
                &sample_recipe(
                    "Dressing",
                    vec![with_fact, ingredient("Vinegar", Some(1.0), Some("tbsp"), Department::Pantry)],
                ),
            )
            .unwrap();
        assert_eq!(r.ingredients[0].nutrition_id, Some(oil.id));
        assert_eq!(r.ingredients[1].nutrition_id, None);
    }
}
