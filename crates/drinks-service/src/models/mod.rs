//! Drinks service models.
//!
//! Contains the drink domain type, its two public representations, and the
//! request/response bodies of the drinks endpoints.

use crate::errors::ApiError;
use serde::{Deserialize, Serialize};

/// Maximum drink title length (matches the `drinks.title` column).
pub const MAX_TITLE_LENGTH: usize = 80;

/// One recipe ingredient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub color: String,
    pub parts: u32,
}

/// Ingredient as shown to anonymous callers: no name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortIngredient {
    pub color: String,
    pub parts: u32,
}

/// A stored drink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drink {
    pub id: i32,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

impl Drink {
    /// Public representation: ingredient names are hidden.
    pub fn short(&self) -> DrinkShort {
        DrinkShort {
            id: self.id,
            title: self.title.clone(),
            recipe: self
                .recipe
                .iter()
                .map(|ingredient| ShortIngredient {
                    color: ingredient.color.clone(),
                    parts: ingredient.parts,
                })
                .collect(),
        }
    }

    /// Detailed representation with the full recipe.
    pub fn long(&self) -> DrinkLong {
        DrinkLong {
            id: self.id,
            title: self.title.clone(),
            recipe: self.recipe.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrinkShort {
    pub id: i32,
    pub title: String,
    pub recipe: Vec<ShortIngredient>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrinkLong {
    pub id: i32,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// A validated drink to insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDrink {
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// A validated partial update. At least one field is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrinkUpdate {
    pub title: Option<String>,
    pub recipe: Option<Vec<Ingredient>>,
}

// ============================================================================
// Request bodies
// ============================================================================

/// Recipe in a request body: a single ingredient object or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RecipeInput {
    One(Ingredient),
    Many(Vec<Ingredient>),
}

impl RecipeInput {
    pub fn into_vec(self) -> Vec<Ingredient> {
        match self {
            RecipeInput::One(ingredient) => vec![ingredient],
            RecipeInput::Many(ingredients) => ingredients,
        }
    }
}

/// `POST /drinks` body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDrinkRequest {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub recipe: Option<RecipeInput>,
}

impl CreateDrinkRequest {
    /// Validate into a [`NewDrink`].
    ///
    /// # Errors
    ///
    /// `ApiError::BadRequest` if `title` or `recipe` is missing or invalid.
    pub fn validate(self) -> Result<NewDrink, ApiError> {
        let title = self
            .title
            .ok_or_else(|| ApiError::BadRequest("title is required".to_string()))?;
        let recipe = self
            .recipe
            .ok_or_else(|| ApiError::BadRequest("recipe is required".to_string()))?;

        Ok(NewDrink {
            title: validate_title(&title)?,
            recipe: validate_recipe(recipe.into_vec())?,
        })
    }
}

/// `PATCH /drinks/:id` body.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDrinkRequest {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub recipe: Option<RecipeInput>,
}

impl UpdateDrinkRequest {
    /// Validate into a [`DrinkUpdate`].
    ///
    /// # Errors
    ///
    /// `ApiError::BadRequest` if neither field is present or a present
    /// field is invalid.
    pub fn validate(self) -> Result<DrinkUpdate, ApiError> {
        if self.title.is_none() && self.recipe.is_none() {
            return Err(ApiError::BadRequest(
                "title or recipe must be provided".to_string(),
            ));
        }

        Ok(DrinkUpdate {
            title: self.title.as_deref().map(validate_title).transpose()?,
            recipe: self
                .recipe
                .map(|recipe| validate_recipe(recipe.into_vec()))
                .transpose()?,
        })
    }
}

fn validate_title(title: &str) -> Result<String, ApiError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(title.to_string())
}

fn validate_recipe(recipe: Vec<Ingredient>) -> Result<Vec<Ingredient>, ApiError> {
    if recipe.is_empty() {
        return Err(ApiError::BadRequest(
            "recipe must contain at least one ingredient".to_string(),
        ));
    }
    if recipe.iter().any(|ingredient| ingredient.parts == 0) {
        return Err(ApiError::BadRequest(
            "ingredient parts must be at least 1".to_string(),
        ));
    }
    Ok(recipe)
}

// ============================================================================
// Response bodies
// ============================================================================

/// `{"success": true, "drinks": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrinksResponse<T> {
    pub success: bool,
    pub drinks: Vec<T>,
}

impl<T> DrinksResponse<T> {
    pub fn new(drinks: Vec<T>) -> Self {
        Self {
            success: true,
            drinks,
        }
    }
}

/// `{"success": true, "delete": <id>}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub delete: i32,
}
