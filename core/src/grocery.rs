//! Grocery-list aggregation: scale each scheduled ingredient to the meal's
//! servings, bucket by normalized (name, unit), and sum within a bucket.

use std::collections::HashMap;

use crate::error::Result;
use crate::models::{AggregatedLine, DateRange, IngredientTuple, ItemStatus};

/// Produces one tuple per (scheduled meal, recipe ingredient) in a date range.
///
/// Implementations must skip out-of-kitchen meals and soft-deleted recipes.
pub trait IngredientSource {
    fn ingredients_for_range(&self, range: &DateRange) -> Result<Vec<IngredientTuple>>;
}

/// Bucket identity for merging. A missing unit is its own bucket, distinct from an empty one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizationKey {
    pub name: String,
    pub unit: Option<String>,
}

#[must_use]
pub fn normalization_key(name: &str, unit: Option<&str>) -> NormalizationKey {
    NormalizationKey {
        name: name.trim().to_lowercase(),
        unit: unit.map(|u| u.trim().to_lowercase()),
    }
}

/// Quantity adjusted to the meal's servings. Unchanged when the meal has no
/// servings or the recipe's base servings are not positive.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn scaled_quantity(
    quantity: Option<f64>,
    meal_servings: Option<i64>,
    recipe_servings: i64,
) -> Option<f64> {
    let q = quantity?;
    match meal_servings {
        Some(ms) if recipe_servings > 0 => Some(q * ms as f64 / recipe_servings as f64),
        _ => Some(q),
    }
}

/// Stable sort by (recipe id, ingredient order index); fixes which tuple is "first" per key.
pub fn sort_for_aggregation(tuples: &mut [IngredientTuple]) {
    tuples.sort_by_key(|t| (t.recipe_id, t.order_index));
}

fn add_quantities(acc: Option<f64>, next: Option<f64>) -> Option<f64> {
    match (acc, next) {
        (Some(a), Some(b)) => Some(a + b),
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}

/// Fold tuples into one line per normalization key, then order by department and name.
///
/// Display name, unit, department and source recipe come from the first tuple seen
/// for each key; callers fix that order with [`sort_for_aggregation`].
#[must_use]
pub fn aggregate(tuples: &[IngredientTuple]) -> Vec<AggregatedLine> {
    let mut index: HashMap<NormalizationKey, usize> = HashMap::new();
    let mut lines: Vec<AggregatedLine> = Vec::new();

    for t in tuples {
        let scaled = scaled_quantity(t.quantity, t.meal_servings, t.recipe_servings);
        let key = normalization_key(&t.ingredient_name, t.unit.as_deref());

        if let Some(&i) = index.get(&key) {
            let line = &mut lines[i];
            line.quantity = add_quantities(line.quantity, scaled);
        } else {
            index.insert(key, lines.len());
            lines.push(AggregatedLine {
                item_name: t.ingredient_name.clone(),
                quantity: scaled,
                unit: t.unit.clone(),
                department: t.department,
                status: ItemStatus::Pending,
                source_recipe_id: Some(t.recipe_id),
            });
        }
    }

    lines.sort_by(|a, b| {
        a.department
            .as_str()
            .cmp(b.department.as_str())
            .then_with(|| a.item_name.cmp(&b.item_name))
    });
    lines
}

/// Read every scheduled ingredient in the range and fold it into grocery lines.
pub fn generate_lines<S: IngredientSource + ?Sized>(
    source: &S,
    range: &DateRange,
) -> Result<Vec<AggregatedLine>> {
    let mut tuples = source.ingredients_for_range(range)?;
    tracing::debug!(
        start = %range.start(),
        end = %range.end(),
        tuples = tuples.len(),
        "read scheduled ingredients"
    );
    sort_for_aggregation(&mut tuples);
    Ok(aggregate(&tuples))
}
