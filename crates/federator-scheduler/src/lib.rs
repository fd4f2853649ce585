//! Recurring job scheduling on top of `tokio-cron-scheduler`: cron and ISO-8601 interval
//! schedules, a reconcile algorithm that diffs the desired job set against what's
//! currently registered, and a small state machine per job.

pub mod iso;
pub mod reconcile;
pub mod scheduler;

pub use reconcile::ReconcilePlan;
pub use scheduler::{FederatorScheduler, JobRunner, JobState};
