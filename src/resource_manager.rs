//! Resource management

use crate::error::AnalysisError;

use tokio::sync::{Semaphore, SemaphorePermit};

/// [crate::resource_manager::ResourceManager] bounds the number of analysis tasks that may run
/// at once, using a Tokio Semaphore.
#[derive(Debug)]
pub struct ResourceManager {
    /// Optional semaphore for tasks.
    tasks: Option<Semaphore>,
}

impl ResourceManager {
    /// Returns a new ResourceManager object.
    ///
    /// `None` leaves the number of tasks unbounded.
    pub fn new(task_limit: Option<usize>) -> Self {
        Self {
            tasks: task_limit.map(Semaphore::new),
        }
    }

    /// The task limit used when none is configured: one less than the number of CPUs, but at
    /// least one.
    pub fn default_task_limit() -> usize {
        num_cpus::get().saturating_sub(1).max(1)
    }

    /// Acquire a task resource.
    pub async fn task(&self) -> Result<Option<SemaphorePermit<'_>>, AnalysisError> {
        optional_acquire(&self.tasks).await
    }
}

/// Acquire a permit on an optional Semaphore, if present.
async fn optional_acquire(
    sem: &Option<Semaphore>,
) -> Result<Option<SemaphorePermit<'_>>, AnalysisError> {
    match sem {
        Some(sem) => Ok(Some(sem.acquire().await?)),
        None => Ok(None),
    }
}
