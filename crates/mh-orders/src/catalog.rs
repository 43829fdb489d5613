//! Catalog read path: restaurant listings and per-restaurant menus.
//!
//! Structural filtering (search, sort, pagination, surplus-only) happens in
//! the store query. Dietary filtering is tag/allergen matching over the
//! fetched page and stays here as pure functions.

use mh_schemas::{Meal, MealFilter, Restaurant, RestaurantFilter};
use mh_store::Store;

use crate::{OrderError, Result};

/// Dietary constraints applied after the structural query.
#[derive(Debug, Clone, Default)]
pub struct DietaryFilter {
    pub vegetarian: bool,
    pub vegan: bool,
    pub gluten_free: bool,
    /// Comma-separated allergen names to exclude, matched case-insensitively
    /// as substrings of the meal's allergen entries.
    pub exclude_allergens: Option<String>,
}

impl DietaryFilter {
    pub fn is_empty(&self) -> bool {
        !self.vegetarian
            && !self.vegan
            && !self.gluten_free
            && self.exclude_allergens.is_none()
    }
}

pub async fn list_restaurants(
    store: &dyn Store,
    filter: &RestaurantFilter,
) -> Result<Vec<Restaurant>> {
    Ok(store.list_restaurants(filter).await?)
}

pub async fn list_meals(
    store: &dyn Store,
    restaurant_id: uuid::Uuid,
    filter: &MealFilter,
    dietary: &DietaryFilter,
) -> Result<Vec<Meal>> {
    store
        .restaurant(restaurant_id)
        .await?
        .ok_or(OrderError::NotFound("restaurant"))?;

    let meals = store.meals_for_restaurant(restaurant_id, filter).await?;
    if dietary.is_empty() {
        return Ok(meals);
    }
    Ok(meals
        .into_iter()
        .filter(|m| matches_dietary(m, dietary))
        .collect())
}

/// True when the meal satisfies every requested dietary constraint.
fn matches_dietary(meal: &Meal, dietary: &DietaryFilter) -> bool {
    if dietary.vegetarian && !has_tag(meal, "vegetarian") {
        return false;
    }
    if dietary.vegan && !has_tag(meal, "vegan") {
        return false;
    }
    if dietary.gluten_free && has_allergen(meal, "gluten") {
        return false;
    }
    if let Some(list) = &dietary.exclude_allergens {
        for needle in list.split(',') {
            let needle = needle.trim();
            if !needle.is_empty() && has_allergen(meal, needle) {
                return false;
            }
        }
    }
    true
}

fn has_tag(meal: &Meal, tag: &str) -> bool {
    meal.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
}

fn has_allergen(meal: &Meal, needle: &str) -> bool {
    let needle = needle.to_lowercase();
    meal.allergens
        .iter()
        .any(|a| a.to_lowercase().contains(&needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn meal(tags: &[&str], allergens: &[&str]) -> Meal {
        Meal {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::new_v4(),
            name: "test".to_string(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            base_price_cents: 1000,
            surplus_price_cents: None,
            quantity: None,
            allergens: allergens.iter().map(|s| s.to_string()).collect(),
            calories: None,
            image_link: None,
        }
    }

    #[test]
    fn vegetarian_requires_the_tag() {
        let dietary = DietaryFilter {
            vegetarian: true,
            ..Default::default()
        };
        assert!(matches_dietary(&meal(&["Vegetarian"], &[]), &dietary));
        assert!(!matches_dietary(&meal(&["spicy"], &[]), &dietary));
    }

    #[test]
    fn vegan_and_vegetarian_are_distinct_tags() {
        let dietary = DietaryFilter {
            vegan: true,
            ..Default::default()
        };
        assert!(matches_dietary(&meal(&["vegan"], &[]), &dietary));
        assert!(!matches_dietary(&meal(&["vegetarian"], &[]), &dietary));
    }

    #[test]
    fn gluten_free_excludes_gluten_allergens() {
        let dietary = DietaryFilter {
            gluten_free: true,
            ..Default::default()
        };
        assert!(!matches_dietary(&meal(&[], &["Gluten (wheat)"]), &dietary));
        assert!(matches_dietary(&meal(&[], &["peanuts"]), &dietary));
    }

    #[test]
    fn exclude_allergens_is_a_comma_list_of_substrings() {
        let dietary = DietaryFilter {
            exclude_allergens: Some("peanut, Shellfish".to_string()),
            ..Default::default()
        };
        assert!(!matches_dietary(&meal(&[], &["Peanuts"]), &dietary));
        assert!(!matches_dietary(&meal(&[], &["shellfish (shrimp)"]), &dietary));
        assert!(matches_dietary(&meal(&[], &["soy"]), &dietary));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let dietary = DietaryFilter::default();
        assert!(dietary.is_empty());
        assert!(matches_dietary(&meal(&[], &["gluten"]), &dietary));
    }

    #[test]
    fn constraints_combine_conjunctively() {
        let dietary = DietaryFilter {
            vegetarian: true,
            gluten_free: true,
            ..Default::default()
        };
        assert!(matches_dietary(&meal(&["vegetarian"], &["soy"]), &dietary));
        assert!(!matches_dietary(&meal(&["vegetarian"], &["gluten"]), &dietary));
    }
}
