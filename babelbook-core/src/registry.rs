//! Book registry abstraction
//!
//! Keeps track of books across a translation run so progress can be queried
//! and finished runs inspected. The in-memory backend is the default; a
//! persistent backend only has to implement [`BookRegistry`].

use crate::error::RegistryError;
use crate::types::Book;
use async_trait::async_trait;
use uuid::Uuid;

/// Result type for registry operations
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Abstract store of books under translation
#[async_trait]
pub trait BookRegistry: Send + Sync {
    /// Insert or replace a book by its id
    async fn save(&self, book: Book) -> RegistryResult<()>;

    /// Look up a book by id
    async fn find(&self, id: Uuid) -> RegistryResult<Option<Book>>;

    /// Look up a book by source file name; latest saved wins on collision
    async fn find_by_file_name(&self, file_name: &str) -> RegistryResult<Option<Book>>;

    /// Remove a book; it is an error if the id is unknown
    async fn delete(&self, id: Uuid) -> RegistryResult<()>;

    /// Check whether a book id is known
    async fn exists(&self, id: Uuid) -> RegistryResult<bool>;
}

/// In-memory registry, the default for CLI runs and tests
#[derive(Default)]
pub struct MemoryRegistry {
    books: std::sync::RwLock<std::collections::HashMap<Uuid, Book>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.books.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.read().unwrap().is_empty()
    }
}

#[async_trait]
impl BookRegistry for MemoryRegistry {
    async fn save(&self, book: Book) -> RegistryResult<()> {
        self.books.write().unwrap().insert(book.id(), book);
        Ok(())
    }

    async fn find(&self, id: Uuid) -> RegistryResult<Option<Book>> {
        Ok(self.books.read().unwrap().get(&id).cloned())
    }

    async fn find_by_file_name(&self, file_name: &str) -> RegistryResult<Option<Book>> {
        Ok(self
            .books
            .read()
            .unwrap()
            .values()
            .find(|b| b.file_name() == file_name)
            .cloned())
    }

    async fn delete(&self, id: Uuid) -> RegistryResult<()> {
        self.books
            .write()
            .unwrap()
            .remove(&id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        Ok(())
    }

    async fn exists(&self, id: Uuid) -> RegistryResult<bool> {
        Ok(self.books.read().unwrap().contains_key(&id))
    }
}
