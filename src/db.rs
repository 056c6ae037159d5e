//! In-memory task collection and the operations on it.
//!
//! Nothing here touches the disk; `store` loads a `TaskList`, the command
//! layer mutates it through these methods, and `store` writes it back.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{InputError, TaskError};
use crate::task::Task;

/// Ordered collection of tasks, serialised as a bare JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskList {
    tasks: Vec<Task>,
}

/// Result of marking a task done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Marked,
    AlreadyDone,
    NotFound,
}

impl TaskList {
    pub fn new(tasks: Vec<Task>) -> Self {
        TaskList { tasks }
    }

    /// Generate the next available task ID.
    pub fn next_id(&self) -> Result<u64, TaskError> {
        match self.tasks.iter().map(|t| t.id).max() {
            None => Ok(1),
            Some(last) => last
                .checked_add(1)
                .ok_or(TaskError::IdSpaceExhausted { last }),
        }
    }

    /// Append a new open task and return it.
    pub fn add(&mut self, name: impl Into<String>) -> Result<&Task, TaskError> {
        let task = Task::new(self.next_id()?, name);
        self.tasks.push(task);
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    /// All tasks in stored order.
    pub fn list(&self) -> &[Task] {
        &self.tasks
    }

    /// Get a task by ID.
    pub fn find(&self, id: u64) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Remove the first task with the given ID, returning it.
    pub fn delete(&mut self, id: u64) -> Option<Task> {
        let idx = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(idx))
    }

    /// Mark a task done. Completing a finished task changes nothing.
    pub fn complete(&mut self, id: u64) -> Completion {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            None => Completion::NotFound,
            Some(t) if t.completed => Completion::AlreadyDone,
            Some(t) => {
                t.completed = true;
                Completion::Marked
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.completed).count()
    }

    pub fn has_zero_id(&self) -> bool {
        self.tasks.iter().any(|t| t.id == 0)
    }

    /// First id that appears more than once, if any.
    pub fn duplicate_id(&self) -> Option<u64> {
        let mut seen = HashSet::new();
        self.tasks.iter().map(|t| t.id).find(|id| !seen.insert(*id))
    }
}

/// Trim a task name and reject it if nothing is left.
pub fn validate_name(raw: &str) -> Result<String, InputError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(InputError::EmptyName);
    }
    Ok(name.to_string())
}

/// Parse a user-entered task id.
pub fn parse_id(raw: &str) -> Result<u64, InputError> {
    let trimmed = raw.trim();
    trimmed
        .parse::<u64>()
        .map_err(|_| InputError::InvalidId(trimmed.to_string()))
}
