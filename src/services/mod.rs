pub mod clock;
pub mod job_runner;
pub mod job_scheduler_service;
pub mod price_ignore_set;
pub mod price_query_queue;
pub mod rate_gate;
pub mod task_manager;
pub mod user_messages;
