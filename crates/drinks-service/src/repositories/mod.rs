//! Repository layer for the drinks service.
//!
//! Handlers depend on the [`DrinkRepository`] trait; the binary picks
//! [`PgDrinkRepository`] when a database is configured and
//! [`InMemoryDrinkRepository`] otherwise.

pub mod drinks;
pub mod memory;

pub use drinks::PgDrinkRepository;
pub use memory::InMemoryDrinkRepository;

use crate::models::{Drink, DrinkUpdate, NewDrink};
use async_trait::async_trait;
use thiserror::Error;

/// Repository failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Drink {0} not found")]
    NotFound(i32),

    #[error("Drink title '{0}' already exists")]
    DuplicateTitle(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Drink persistence.
///
/// Titles are unique; ids are assigned by the repository.
#[async_trait]
pub trait DrinkRepository: Send + Sync {
    /// All drinks ordered by id.
    async fn list(&self) -> Result<Vec<Drink>, RepositoryError>;

    async fn get(&self, id: i32) -> Result<Drink, RepositoryError>;

    async fn insert(&self, drink: NewDrink) -> Result<Drink, RepositoryError>;

    /// Apply the set fields of `update` and return the updated drink.
    async fn update(&self, id: i32, update: DrinkUpdate) -> Result<Drink, RepositoryError>;

    async fn delete(&self, id: i32) -> Result<(), RepositoryError>;
}
