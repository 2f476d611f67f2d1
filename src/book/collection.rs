use std::collections::HashMap;

use crate::action::ActionKind;
use crate::book::{Book, BookError};

/// Books in file order, plus the indices that keep id, ISBN and signature
/// unique. The indices map a key to the row that first used it.
#[derive(Debug, Clone, Default)]
pub struct BookCollection {
    books: Vec<Book>,
    by_id: HashMap<String, usize>,
    by_isbn: HashMap<String, usize>,
    by_signature: HashMap<String, usize>,
}

impl BookCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `book` after checking every uniqueness key. Nothing is indexed
    /// when any key collides.
    pub fn add(&mut self, book: Book) -> Result<(), BookError> {
        let row = book.row();
        if !book.id().is_empty() {
            if let Some(&first_row) = self.by_id.get(book.id()) {
                return Err(BookError::DuplicateId {
                    row,
                    value: book.id().to_owned(),
                    first_row,
                });
            }
        }
        if !book.isbn().is_empty() {
            if let Some(&first_row) = self.by_isbn.get(book.isbn()) {
                return Err(BookError::DuplicateIsbn {
                    row,
                    value: book.isbn().to_owned(),
                    first_row,
                });
            }
        }
        if let Some(&first_row) = self.by_signature.get(book.signature()) {
            return Err(BookError::DuplicateSignature {
                row,
                value: book.signature().to_owned(),
                first_row,
            });
        }

        if !book.id().is_empty() {
            self.by_id.insert(book.id().to_owned(), row);
        }
        if !book.isbn().is_empty() {
            self.by_isbn.insert(book.isbn().to_owned(), row);
        }
        self.by_signature.insert(book.signature().to_owned(), row);
        self.books.push(book);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Book> {
        self.books.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Book> {
        self.books.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Book> {
        self.books.get_mut(index)
    }

    pub fn books_to_process(&self) -> impl Iterator<Item = &Book> {
        self.books.iter().filter(|book| book.has_pending_actions())
    }

    pub fn num_books_to_process(&self) -> usize {
        self.books_to_process().count()
    }

    /// Whether any book still has `kind` queued.
    pub fn contains_action(&self, kind: ActionKind) -> bool {
        self.books.iter().any(|book| book.contains_action(kind))
    }
}
