use chrono::NaiveDate;
use log::{info, warn};

use crate::error::{TaskError, TaskResult};
use crate::store::Store;
use crate::task::{Priority, Task};

/// Every mutation persists before returning. A failed write undoes the
/// mutation so memory and the file never disagree.
pub struct Tracker {
    store: Store,
    tasks: Vec<Task>,
    changed: bool,
}

impl Tracker {
    pub fn open(store: Store) -> TaskResult<Self> {
        let tasks = store.load()?;
        info!("Opened {} tasks from {:?}", tasks.len(), store.path);
        Ok(Self { store, tasks, changed: false })
    }

    /// Final save, skipped when the session never changed anything.
    pub fn close(self) -> TaskResult<()> {
        if !self.changed {
            return Ok(());
        }
        self.store.save(&self.tasks)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn add(&mut self, description: &str, due: NaiveDate, priority: Priority) -> TaskResult<Task> {
        if description.trim().is_empty() {
            return Err(TaskError::Validation(
                "please enter a task description".to_string(),
            ));
        }
        let task = Task::new(description, due, priority);
        self.tasks.push(task.clone());
        if let Err(e) = self.persist() {
            self.tasks.pop();
            return Err(e);
        }
        info!("Added task {} ({})", task.id, task.description);
        Ok(task)
    }

    pub fn toggle_done(&mut self, id: &str) -> TaskResult<&Task> {
        let index = self.position(id)?;
        self.toggle_done_at(index)
    }

    pub fn toggle_done_at(&mut self, index: usize) -> TaskResult<&Task> {
        self.check_index(index)?;
        self.tasks[index].done = !self.tasks[index].done;
        if let Err(e) = self.persist() {
            self.tasks[index].done = !self.tasks[index].done;
            return Err(e);
        }
        let task = &self.tasks[index];
        info!("Task {} marked {}", task.id, if task.done { "done" } else { "pending" });
        Ok(task)
    }

    pub fn delete(&mut self, id: &str) -> TaskResult<Task> {
        let index = self.position(id)?;
        self.delete_at(index)
    }

    /// Later tasks shift down by one, so any cached positions are stale after this.
    pub fn delete_at(&mut self, index: usize) -> TaskResult<Task> {
        self.check_index(index)?;
        let removed = self.tasks.remove(index);
        if let Err(e) = self.persist() {
            self.tasks.insert(index, removed);
            return Err(e);
        }
        info!("Deleted task {} ({})", removed.id, removed.description);
        Ok(removed)
    }

    pub fn progress(&self) -> f64 {
        progress(&self.tasks)
    }

    pub fn position(&self, id: &str) -> TaskResult<usize> {
        self.tasks.iter().position(|t| t.id == id).ok_or_else(|| {
            warn!("No task with id {}", id);
            TaskError::TaskNotFound { id: id.to_string() }
        })
    }

    fn persist(&mut self) -> TaskResult<()> {
        self.store.save(&self.tasks)?;
        self.changed = true;
        Ok(())
    }

    fn check_index(&self, index: usize) -> TaskResult<()> {
        if index >= self.tasks.len() {
            warn!("Task position {} out of range ({} tasks)", index, self.tasks.len());
            return Err(TaskError::IndexOutOfRange {
                index,
                len: self.tasks.len(),
            });
        }
        Ok(())
    }
}

/// Percentage of done tasks, 0 for an empty collection.
pub fn progress(tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let done = tasks.iter().filter(|t| t.done).count();
    done as f64 / tasks.len() as f64 * 100.0
}
