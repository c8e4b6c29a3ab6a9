//! # Overseer Core Library
//!
//! This library provides the obligation lifecycle engine behind Overseer:
//! one party (the supervisor) assigns time-bound obligations and optional
//! rewards to another (the assignee); completion is proof-gated and
//! reviewed; a point economy tracks standing; missed deadlines trigger
//! automatic penalties and cascading consequences.
//!
//! ## Architecture
//!
//! - **Storage**: a single SQLite store behind `Arc<Database>`, threaded
//!   through every component at construction time. The internal connection
//!   mutex is the serialization boundary for point deltas and
//!   check-then-set reviews.
//! - **Repositories**: `UserRepo`, `TaskRepo`, `RewardRepo`,
//!   `PunishmentRepo` and `ThresholdEvaluator` implement the lifecycle
//!   transitions; all point mutation flows through the `Ledger`.
//! - **Periodic processes**: `DeadlineSweeper` and `ReminderScheduler` are
//!   cooperative timer loops that call the same repository operations.
//! - **Notifications**: best-effort delivery behind the `Notifier` trait;
//!   state transitions commit first, delivery failures are dropped.
//!
//! ## Key Components
//!
//! - [`Database`]: store handle, schema migrations
//! - [`Ledger`]: atomic per-user point deltas
//! - [`TaskRepo`]: tasks, completion submission and review
//! - [`PunishmentRepo`]: punishment catalog and assignment state machine
//! - [`DeadlineSweeper`]: deadline expiry and recurrence resets

pub mod error;
pub mod ledger;
pub mod model;
pub mod notify;
pub mod punishments;
pub mod recurrence;
pub mod reminders;
pub mod rewards;
pub mod stats;
pub mod storage;
pub mod sweeper;
pub mod tasks;
pub mod thresholds;
pub mod users;

pub use error::{ConfigError, CoreError, DatabaseError, Result};
pub use ledger::Ledger;
pub use model::{
    Assignment, AssignmentKind, AssignmentStatus, AutoPunishment, CompletionStatus, DailyCount,
    Frequency, PointThreshold, Punishment, RecurrenceRule, Relationship, Reward, Role, Task,
    TaskCompletion, TaskStats, User,
};
pub use notify::{Notifier, NullNotifier, WebhookNotifier};
pub use punishments::{
    NewPunishmentAssignment, ProofRelease, ProofReviewOutcome, PunishmentRepo,
};
pub use reminders::{ReminderReport, ReminderScheduler};
pub use rewards::{RewardGrant, RewardRepo};
pub use stats::StatsRepo;
pub use storage::{Config, Database};
pub use sweeper::{DeadlineSweeper, SweepReport};
pub use tasks::{NewTask, ReviewOutcome, TaskRepo};
pub use thresholds::{NewThreshold, ThresholdEvaluator};
pub use users::UserRepo;
