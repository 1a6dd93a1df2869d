use crate::errors::AppError;
use crate::services::task_manager::TaskManager;
use std::sync::Arc;
use std::time::Duration;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::info;

/// Drives [`TaskManager::schedule`] from a repeating timer.
pub struct JobSchedulerService {
    scheduler: JobScheduler,
    task_manager: Arc<TaskManager>,
}

impl JobSchedulerService {
    pub async fn new(task_manager: Arc<TaskManager>) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::External(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler,
            task_manager,
        })
    }

    /// Run a scheduling pass every `interval`.
    pub async fn start(&mut self, interval: Duration) -> Result<(), AppError> {
        info!("🚀 Starting job scheduler...");

        let task_manager = self.task_manager.clone();
        let job = Job::new_repeated_async(interval, move |_uuid, _l| {
            let task_manager = task_manager.clone();
            Box::pin(async move {
                task_manager.schedule().await;
            })
        })
        .map_err(|e| AppError::External(format!("Failed to create scheduling job: {}", e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::External(format!("Failed to add scheduling job: {}", e)))?;

        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::External(format!("Failed to start scheduler: {}", e)))?;

        info!("✅ Task scheduling every {}s", interval.as_secs());
        Ok(())
    }

    /// Wait for an in-flight pass, block further passes, then stop the timer.
    pub async fn stop(&mut self) -> Result<(), AppError> {
        info!("🛑 Stopping job scheduler...");
        self.task_manager.stop_scheduling().await;
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::External(format!("Failed to stop scheduler: {}", e)))?;
        info!("✅ Job scheduler stopped");
        Ok(())
    }
}
