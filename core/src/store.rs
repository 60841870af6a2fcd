//! The authoritative in-memory todo collection.
//!
//! # Design
//! `TodoStore` keeps todos in a `Vec` so iteration order is insertion order,
//! and hands out ids from a counter that only ever moves forward, so ids are
//! never reused after a delete. Lookups are linear; the collection is small
//! and unpaginated. The store does not read the clock: every mutating call
//! takes `now`.

use chrono::{DateTime, Utc};

use crate::error::StoreError;
use crate::types::{CreateTodo, Todo, UpdateTodo};

pub const TITLE_REQUIRED: &str = "Title is required";

#[derive(Debug)]
pub struct TodoStore {
    todos: Vec<Todo>,
    next_id: u64,
}

impl Default for TodoStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoStore {
    pub fn new() -> Self {
        Self {
            todos: Vec::new(),
            next_id: 1,
        }
    }

    /// All todos in insertion order.
    pub fn list(&self) -> &[Todo] {
        &self.todos
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    pub fn get(&self, id: u64) -> Result<&Todo, StoreError> {
        self.todos
            .iter()
            .find(|todo| todo.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    /// Validate, allocate the next id and append. A rejected create leaves
    /// both the collection and the id counter untouched.
    pub fn create(&mut self, input: CreateTodo, now: DateTime<Utc>) -> Result<Todo, StoreError> {
        let title = match input.title {
            Some(title) if !title.is_empty() => title,
            _ => return Err(StoreError::Validation(TITLE_REQUIRED.to_string())),
        };

        let todo = Todo {
            id: self.next_id,
            title,
            description: input.description.unwrap_or_default(),
            completed: false,
            created_at: now,
            updated_at: None,
            stored_in_blob: None,
        };
        self.next_id += 1;
        self.todos.push(todo.clone());
        Ok(todo)
    }

    /// Apply only the supplied fields and refresh `updatedAt`.
    pub fn update(
        &mut self,
        id: u64,
        input: UpdateTodo,
        now: DateTime<Utc>,
    ) -> Result<Todo, StoreError> {
        let todo = self.get_mut(id)?;
        if let Some(title) = input.title {
            todo.title = title;
        }
        if let Some(description) = input.description {
            todo.description = description;
        }
        if let Some(completed) = input.completed {
            todo.completed = completed;
        }
        todo.updated_at = Some(now);
        Ok(todo.clone())
    }

    pub fn delete(&mut self, id: u64) -> Result<Todo, StoreError> {
        let index = self
            .todos
            .iter()
            .position(|todo| todo.id == id)
            .ok_or(StoreError::NotFound(id))?;
        Ok(self.todos.remove(index))
    }

    /// Record the outcome of a mirror write. Returns `false` when the todo
    /// was deleted while the write was in flight.
    pub fn record_mirror_outcome(&mut self, id: u64, stored: bool) -> bool {
        match self.get_mut(id) {
            Ok(todo) => {
                todo.stored_in_blob = Some(stored);
                true
            }
            Err(_) => false,
        }
    }

    fn get_mut(&mut self, id: u64) -> Result<&mut Todo, StoreError> {
        self.todos
            .iter_mut()
            .find(|todo| todo.id == id)
            .ok_or(StoreError::NotFound(id))
    }
}
