//! Favorite mutations and their compensations.
//!
//! A mutation is applied to local state right away. Applying it yields the
//! inverse transformation, which is applied if the backing request for the
//! mutation fails.

use crate::models::Book;
use crate::state::library::LibraryState;

/// A change to the favorites collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FavoriteMutation {
    Add(Book),
    Remove(String),
}

impl FavoriteMutation {
    /// Catalog key the mutation targets.
    pub fn key(&self) -> &str {
        match self {
            FavoriteMutation::Add(book) => &book.key,
            FavoriteMutation::Remove(key) => key,
        }
    }
}

/// Inverse of an applied [`FavoriteMutation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// The mutation changed nothing
    Nothing,
    /// Undo an insert
    Remove(String),
    /// Undo a removal, putting the book back where it was
    Restore { index: usize, book: Book },
}

impl LibraryState {
    /// Apply a mutation and return its compensation.
    pub fn apply(&mut self, mutation: &FavoriteMutation) -> Compensation {
        match mutation {
            FavoriteMutation::Add(book) => {
                if self.add_favorite(book.clone()) {
                    Compensation::Remove(book.key.clone())
                } else {
                    Compensation::Nothing
                }
            }
            FavoriteMutation::Remove(key) => match self.remove_favorite(key) {
                Some((index, book)) => Compensation::Restore { index, book },
                None => Compensation::Nothing,
            },
        }
    }

    /// Apply a compensation produced by [`LibraryState::apply`].
    pub fn compensate(&mut self, compensation: Compensation) {
        match compensation {
            Compensation::Nothing => {}
            Compensation::Remove(key) => {
                self.remove_favorite(&key);
            }
            Compensation::Restore { index, book } => {
                self.insert_favorite_at(index, book);
            }
        }
    }
}
