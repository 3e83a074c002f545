//! In-memory drink repository.
//!
//! Used when no database is configured and by the test server harness.
//! Enforces the same title uniqueness as the `drinks` table.

use crate::models::{Drink, DrinkUpdate, NewDrink};
use crate::repositories::{DrinkRepository, RepositoryError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Store {
    drinks: BTreeMap<i32, Drink>,
    last_id: i32,
}

impl Store {
    fn title_taken(&self, title: &str, except: Option<i32>) -> bool {
        self.drinks
            .values()
            .any(|drink| drink.title == title && Some(drink.id) != except)
    }
}

/// Drink repository held in process memory.
#[derive(Default)]
pub struct InMemoryDrinkRepository {
    store: RwLock<Store>,
}

impl InMemoryDrinkRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository pre-populated with `drinks`, assigning ids in order.
    ///
    /// Later drinks with an already used title are skipped.
    pub fn with_drinks(drinks: impl IntoIterator<Item = NewDrink>) -> Self {
        let mut store = Store::default();
        for drink in drinks {
            if store.title_taken(&drink.title, None) {
                continue;
            }
            store.last_id += 1;
            let id = store.last_id;
            store.drinks.insert(
                id,
                Drink {
                    id,
                    title: drink.title,
                    recipe: drink.recipe,
                },
            );
        }
        Self {
            store: RwLock::new(store),
        }
    }
}

#[async_trait]
impl DrinkRepository for InMemoryDrinkRepository {
    async fn list(&self) -> Result<Vec<Drink>, RepositoryError> {
        Ok(self.store.read().await.drinks.values().cloned().collect())
    }

    async fn get(&self, id: i32) -> Result<Drink, RepositoryError> {
        self.store
            .read()
            .await
            .drinks
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn insert(&self, drink: NewDrink) -> Result<Drink, RepositoryError> {
        let mut store = self.store.write().await;
        if store.title_taken(&drink.title, None) {
            return Err(RepositoryError::DuplicateTitle(drink.title));
        }

        store.last_id += 1;
        let created = Drink {
            id: store.last_id,
            title: drink.title,
            recipe: drink.recipe,
        };
        store.drinks.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i32, update: DrinkUpdate) -> Result<Drink, RepositoryError> {
        let mut store = self.store.write().await;
        if !store.drinks.contains_key(&id) {
            return Err(RepositoryError::NotFound(id));
        }
        if let Some(title) = &update.title {
            if store.title_taken(title, Some(id)) {
                return Err(RepositoryError::DuplicateTitle(title.clone()));
            }
        }

        let drink = store
            .drinks
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound(id))?;
        if let Some(title) = update.title {
            drink.title = title;
        }
        if let Some(recipe) = update.recipe {
            drink.recipe = recipe;
        }
        Ok(drink.clone())
    }

    async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        self.store
            .write()
            .await
            .drinks
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound(id))
    }
}
