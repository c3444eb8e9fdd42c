//! This module provides the prize storage engine.
//!
//! The [`PrizeStore`] trait is the seam between the HTTP services and storage, the only
//! implementation is [`JsonPrizeStore`], which keeps the collection in memory and persists it
//! into a single JSON file.
use crate::model::{Prize, PrizeUpdate, Prizes};
use crate::Result;

/// A trait for the operations the backend performs on the prize collection.
///
/// Implementations are cheap handles that are cloned into every request handler, so they must
/// synchronize access to the collection internally.
pub trait PrizeStore: Clone + Send + Sync + 'static {
    /// Returns the whole collection
    fn all(&self) -> Result<Prizes>;

    /// Returns every prize awarded in `year`
    ///
    /// # Errors
    ///
    /// Returns `NobelError::NotFound` if no prize matched.
    fn by_year(&self, year: i32) -> Result<Vec<Prize>>;

    /// Returns every prize awarded in `year` for `category`, matching the category
    /// case-insensitively
    ///
    /// # Errors
    ///
    /// Returns `NobelError::NotFound` if no prize matched.
    fn by_year_and_category(&self, year: i32, category: &str) -> Result<Vec<Prize>>;

    /// Applies a partial `update` to the first prize matching `year` and `category`, and
    /// returns the updated prize
    ///
    /// # Errors
    ///
    /// Returns `NobelError::NotFound` if the prize, or one of the laureates referenced by the
    /// update, does not exist. The collection is not changed in that case.
    fn update(&self, year: i32, category: &str, update: PrizeUpdate) -> Result<Prize>;

    /// Removes the first prize matching `year` and `category` and returns it
    ///
    /// # Errors
    ///
    /// Returns `NobelError::NotFound` if no prize matched.
    fn delete(&self, year: i32, category: &str) -> Result<Prize>;

    /// Appends a new prize to the collection and returns it.
    ///
    /// Laureate ids are assigned sequentially, in input order, starting right after the
    /// highest laureate id in the whole collection. Any id given in `prize` is ignored.
    fn create(&self, prize: Prize) -> Result<Prize>;
}

pub(crate) mod json;

pub use self::json::JsonPrizeStore;
