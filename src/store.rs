use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::todo::{Todo, TodoPatch, normalize_title};

/// Errors returned by [`TodoStore`] operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Title is required")]
    EmptyTitle,

    #[error("Todo {0} not found")]
    NotFound(u64),
}

/// In-memory collection of todos for one running process
///
/// The store owns the authoritative list and the next-id counter. It holds no
/// lock of its own; the web layer keeps it behind a mutex so that every request
/// runs atomically against the list.
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
    /// Create an empty store whose first id will be 1
    pub fn new() -> Self {
        TodoStore {
            todos: Vec::new(),
            next_id: 1,
        }
    }

    /// All todos, in insertion order
    pub fn list(&self) -> &[Todo] {
        &self.todos
    }

    pub fn len(&self) -> usize {
        self.todos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.todos.is_empty()
    }

    /// Look up a todo by id
    ///
    /// # Errors
    /// * `StoreError::NotFound` if no todo has that id
    pub fn get_by_id(&self, id: u64) -> Result<&Todo, StoreError> {
        self.todos
            .iter()
            .find(|todo| todo.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    /// Create a todo from a raw title
    ///
    /// The title is trimmed; the new record gets the next id, `completed` set
    /// to false and identical creation/update timestamps.
    ///
    /// # Arguments
    /// * `title` - Raw title as typed by the user
    ///
    /// # Returns
    /// * `Result<Todo, StoreError>` - A copy of the stored record
    ///
    /// # Errors
    /// * `StoreError::EmptyTitle` if the title is empty after trimming
    ///
    /// # Examples
    /// ```
    /// use todo_web::store::TodoStore;
    ///
    /// let mut store = TodoStore::new();
    /// let todo = store.add("  buy milk ").unwrap();
    /// assert_eq!(todo.id, 1);
    /// assert_eq!(todo.title, "buy milk");
    /// assert!(store.add("   ").is_err());
    /// ```
    pub fn add(&mut self, title: &str) -> Result<Todo, StoreError> {
        let title = normalize_title(title).ok_or(StoreError::EmptyTitle)?;
        let now = Utc::now();

        let todo = Todo {
            id: self.next_id,
            title,
            completed: false,
            created_at: now,
            updated_at: now,
        };
        self.next_id += 1;
        self.todos.push(todo.clone());

        log::debug!("Added todo {}", todo.id);
        Ok(todo)
    }

    /// Merge a partial update into an existing todo
    ///
    /// A supplied title is re-trimmed and must not be blank; a supplied
    /// `completed` replaces the flag. `updated_at` always moves forward, even
    /// for an empty patch.
    ///
    /// # Arguments
    /// * `id` - Id of the todo to update
    /// * `patch` - Fields to change
    ///
    /// # Returns
    /// * `Result<Todo, StoreError>` - A copy of the updated record
    ///
    /// # Errors
    /// * `StoreError::NotFound` if no todo has that id
    /// * `StoreError::EmptyTitle` if the patch carries a blank title; the
    ///   record is left unchanged
    pub fn update(&mut self, id: u64, patch: TodoPatch) -> Result<Todo, StoreError> {
        let todo = self
            .todos
            .iter_mut()
            .find(|todo| todo.id == id)
            .ok_or(StoreError::NotFound(id))?;

        let title = match patch.title.as_deref() {
            Some(raw) => Some(normalize_title(raw).ok_or(StoreError::EmptyTitle)?),
            None => None,
        };

        if let Some(title) = title {
            todo.title = title;
        }
        if let Some(completed) = patch.completed {
            todo.completed = completed;
        }
        todo.updated_at = next_timestamp(todo.updated_at);

        log::debug!("Updated todo {}", id);
        Ok(todo.clone())
    }

    /// Remove a todo
    ///
    /// # Errors
    /// * `StoreError::NotFound` if no todo has that id
    pub fn remove(&mut self, id: u64) -> Result<(), StoreError> {
        let index = self
            .todos
            .iter()
            .position(|todo| todo.id == id)
            .ok_or(StoreError::NotFound(id))?;

        self.todos.remove(index);
        log::debug!("Removed todo {}", id);
        Ok(())
    }
}

// Wall-clock time, but never at or before `previous`.
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_assigns_increasing_ids_and_trims() {
        let mut store = TodoStore::new();
        let first = store.add(" write report ").unwrap();
        let second = store.add("call mom").unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.title, "write report");
        assert!(!first.completed);
        assert_eq!(first.created_at, first.updated_at);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn add_rejects_blank_titles() {
        let mut store = TodoStore::new();
        assert_eq!(store.add(""), Err(StoreError::EmptyTitle));
        assert_eq!(store.add("   "), Err(StoreError::EmptyTitle));
        assert!(store.is_empty());

        // A rejected add does not consume an id
        assert_eq!(store.add("ok").unwrap().id, 1);
    }

    #[test]
    fn list_keeps_insertion_order() {
        let mut store = TodoStore::new();
        for title in ["a", "b", "c"] {
            store.add(title).unwrap();
        }
        let titles: Vec<&str> = store.list().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
    }

    #[test]
    fn get_by_id_finds_or_reports_missing() {
        let mut store = TodoStore::new();
        let todo = store.add("a").unwrap();
        assert_eq!(store.get_by_id(todo.id).unwrap().title, "a");
        assert_eq!(store.get_by_id(42), Err(StoreError::NotFound(42)));
    }

    #[test]
    fn update_completed_only_touches_flag_and_advances_timestamp() {
        let mut store = TodoStore::new();
        let before = store.add("buy milk").unwrap();

        let after = store
            .update(
                before.id,
                TodoPatch {
                    title: None,
                    completed: Some(true),
                },
            )
            .unwrap();

        assert!(after.completed);
        assert_eq!(after.title, before.title);
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at > before.updated_at);
    }

    #[test]
    fn update_retrims_title() {
        let mut store = TodoStore::new();
        let todo = store.add("draft").unwrap();
        let updated = store
            .update(
                todo.id,
                TodoPatch {
                    title: Some("  final  ".to_string()),
                    completed: None,
                },
            )
            .unwrap();
        assert_eq!(updated.title, "final");
    }

    #[test]
    fn update_with_blank_title_leaves_record_unchanged() {
        let mut store = TodoStore::new();
        let todo = store.add("keep me").unwrap();
        let result = store.update(
            todo.id,
            TodoPatch {
                title: Some("  ".to_string()),
                completed: Some(true),
            },
        );

        assert_eq!(result, Err(StoreError::EmptyTitle));
        assert_eq!(store.get_by_id(todo.id).unwrap(), &todo);
    }

    #[test]
    fn empty_patch_refreshes_updated_at_only() {
        let mut store = TodoStore::new();
        let todo = store.add("idle").unwrap();
        let updated = store.update(todo.id, TodoPatch::default()).unwrap();

        assert_eq!(updated.title, todo.title);
        assert_eq!(updated.completed, todo.completed);
        assert!(updated.updated_at > todo.updated_at);
    }

    #[test]
    fn update_missing_id_is_not_found() {
        let mut store = TodoStore::new();
        store.add("a").unwrap();
        assert_eq!(
            store.update(9999, TodoPatch::default()),
            Err(StoreError::NotFound(9999))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_deletes_once() {
        let mut store = TodoStore::new();
        let a = store.add("a").unwrap();
        store.add("b").unwrap();

        assert_eq!(store.remove(a.id), Ok(()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.remove(a.id), Err(StoreError::NotFound(a.id)));
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let mut store = TodoStore::new();
        let a = store.add("a").unwrap();
        store.remove(a.id).unwrap();
        let b = store.add("b").unwrap();
        assert_eq!(b.id, 2);
    }

    #[test]
    fn next_timestamp_is_strictly_later() {
        let future = Utc::now() + Duration::hours(1);
        assert!(next_timestamp(future) > future);
    }
}
