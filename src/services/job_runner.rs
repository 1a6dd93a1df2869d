use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::user_messages::MessagesAggregator;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct JobResult {
    pub items_processed: i32,
    pub items_failed: i32,
}

pub type JobFuture = BoxFuture<'static, Result<JobResult, AppError>>;

/// Execution substrate for background jobs.
pub trait JobRunner: Send + Sync {
    /// Run `job` concurrently under `task_name`.
    ///
    /// When `exception_is_error` is set a failure is reported to the user as an
    /// error, otherwise it is only logged.
    fn spawn_and_track(&self, task_name: String, exception_is_error: bool, job: JobFuture);

    /// Forget jobs that have completed.
    fn clear_finished(&self);

    /// Number of tracked jobs still running.
    fn live_count(&self) -> usize;

    /// Names of the tracked jobs still running.
    fn task_names(&self) -> Vec<String>;
}

struct TrackedJob {
    id: Uuid,
    task_name: String,
    handle: JoinHandle<()>,
}

/// [`JobRunner`] spawning each job as a tokio task.
pub struct TokioJobRunner {
    jobs: Mutex<Vec<TrackedJob>>,
    messages: MessagesAggregator,
}

impl TokioJobRunner {
    pub fn new(messages: MessagesAggregator) -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            messages,
        }
    }
}

impl JobRunner for TokioJobRunner {
    fn spawn_and_track(&self, task_name: String, exception_is_error: bool, job: JobFuture) {
        let id = Uuid::new_v4();
        let messages = self.messages.clone();
        let name = task_name.clone();

        let handle = tokio::spawn(async move {
            execute_job_with_tracking(id, &name, exception_is_error, job, &messages).await;
        });

        self.jobs.lock().push(TrackedJob {
            id,
            task_name,
            handle,
        });
    }

    fn clear_finished(&self) {
        self.jobs.lock().retain(|job| {
            let finished = job.handle.is_finished();
            if finished {
                debug!("Clearing finished job {} ({})", job.task_name, job.id);
            }
            !finished
        });
    }

    fn live_count(&self) -> usize {
        self.jobs
            .lock()
            .iter()
            .filter(|job| !job.handle.is_finished())
            .count()
    }

    fn task_names(&self) -> Vec<String> {
        self.jobs
            .lock()
            .iter()
            .filter(|job| !job.handle.is_finished())
            .map(|job| job.task_name.clone())
            .collect()
    }
}

async fn execute_job_with_tracking(
    id: Uuid,
    task_name: &str,
    exception_is_error: bool,
    job: JobFuture,
    messages: &MessagesAggregator,
) {
    debug!("🏃 Starting job: {} ({})", task_name, id);
    let started_at: DateTime<Utc> = Utc::now();

    let result = match AssertUnwindSafe(job).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            // Panics are logged at error regardless of the flag
            let reason = panic_message(payload.as_ref());
            error!("❌ Job panicked: {} - {}", task_name, reason);
            if exception_is_error {
                messages.add_error(format!("Task {} panicked: {}", task_name, reason));
            }
            return;
        }
    };

    let duration_ms = (Utc::now() - started_at).num_milliseconds();

    match result {
        Ok(job_result) => {
            info!(
                "✅ Job completed: {} (processed: {}, failed: {}, duration: {}ms)",
                task_name, job_result.items_processed, job_result.items_failed, duration_ms
            );
        }
        Err(e) if exception_is_error => {
            error!("❌ Job failed: {} - {}", task_name, e);
            messages.add_error(format!("Task {} failed: {}", task_name, e));
        }
        Err(e) => {
            warn!("Job failed: {} - {}", task_name, e);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
