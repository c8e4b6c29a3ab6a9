//! Entity types for the obligation lifecycle engine.
//!
//! Status enums carry their own transition tables; every lifecycle mutation
//! in the repositories is a check-then-set against these.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Role of a registered user, fixed at registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Supervisor,
    Assignee,
}

/// A registered user.
///
/// The numeric id is the external platform identity; the point balance is a
/// signed integer with no floor and changes only through the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub points: i64,
    /// IANA timezone identifier. Defaults to UTC.
    pub timezone: String,
    pub created_at: DateTime<Utc>,
}

/// Directed supervisor -> assignee edge, unique per ordered pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub id: i64,
    pub supervisor_id: i64,
    pub assignee_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Frequency class of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Custom,
}

/// Recurrence rule for a task: either a fixed hour interval or a weekday
/// set with an optional wall-clock time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub enabled: bool,
    pub interval_hours: Option<i64>,
    pub weekdays: Option<Vec<Weekday>>,
    pub time_of_day: Option<NaiveTime>,
}

/// Auto-punishment configured on a task or threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AutoPunishment {
    /// No cascade on expiry.
    None,
    /// A specific catalog punishment.
    Specific(i64),
    /// Pick uniformly at random from the supervisor's catalog.
    Random,
}

impl Default for AutoPunishment {
    fn default() -> Self {
        AutoPunishment::None
    }
}

/// A task owned jointly by one supervisor and one assignee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub supervisor_id: i64,
    pub assignee_id: i64,
    pub title: String,
    pub description: String,
    pub frequency: Frequency,
    pub point_value: i64,
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recurrence: RecurrenceRule,
    pub next_occurrence: Option<DateTime<Utc>>,
    /// Wall-clock time used to recompute the next deadline after an
    /// approved or reset-rejected completion.
    pub anchor_time: Option<NaiveTime>,
    pub auto_punishment: AutoPunishment,
    pub active: bool,
    pub reminder_hours: Option<i64>,
    pub last_reminded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Status of a task completion submission.
///
/// Valid transitions:
/// - PENDING -> APPROVED (review)
/// - PENDING -> REJECTED (review)
///
/// Both outcomes are terminal; a rejected task is resubmitted as a new
/// completion record, never by reopening the old one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Pending,
    Approved,
    Rejected,
}

impl CompletionStatus {
    /// Check if a transition is valid.
    pub fn can_transition_to(&self, to: &CompletionStatus) -> bool {
        match self {
            CompletionStatus::Pending => {
                matches!(to, CompletionStatus::Approved | CompletionStatus::Rejected)
            }
            CompletionStatus::Approved | CompletionStatus::Rejected => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, CompletionStatus::Pending)
    }
}

/// A submission event against one task.
///
/// `points_snapshot` freezes the task's point value at submission time so
/// later edits to the task do not retroactively change pending submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskCompletion {
    pub id: i64,
    pub task_id: i64,
    pub assignee_id: i64,
    pub proof_url: Option<String>,
    pub points_snapshot: i64,
    pub status: CompletionStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_by: Option<i64>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// A supervisor-owned reward catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reward {
    pub id: i64,
    pub supervisor_id: i64,
    pub title: String,
    pub description: String,
    pub point_cost: i64,
    pub created_at: DateTime<Utc>,
}

/// A supervisor-owned punishment catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Punishment {
    pub id: i64,
    pub supervisor_id: i64,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Type tag for the shared assignments table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentKind {
    Reward,
    Punishment,
}

/// Status of an assignment.
///
/// Reward grants are created as GRANTED and never transition. Punishment
/// assignments follow:
///
/// ```text
/// PENDING ──submit──> SUBMITTED ──review──> APPROVED | REJECTED
///    │                    ^
///    │ deadline miss      │ late proof
///    └────> EXPIRED ──────┘
/// ```
///
/// A supervisor can also force PENDING|SUBMITTED -> APPROVED ("cancel").
/// Whether the assignment ever reached EXPIRED is tracked separately
/// (`expired_at`), because a late submission moves the status on while the
/// doubled penalty stays deducted until approval.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Pending,
    Submitted,
    Approved,
    Rejected,
    Expired,
    Granted,
}

impl AssignmentStatus {
    /// Check if a transition is valid.
    pub fn can_transition_to(&self, to: &AssignmentStatus) -> bool {
        match self {
            AssignmentStatus::Pending => matches!(
                to,
                AssignmentStatus::Submitted
                    | AssignmentStatus::Approved
                    | AssignmentStatus::Expired
            ),
            AssignmentStatus::Submitted => matches!(
                to,
                AssignmentStatus::Submitted
                    | AssignmentStatus::Approved
                    | AssignmentStatus::Rejected
            ),
            AssignmentStatus::Expired => matches!(to, AssignmentStatus::Submitted),
            AssignmentStatus::Approved | AssignmentStatus::Rejected | AssignmentStatus::Granted => {
                false
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AssignmentStatus::Approved | AssignmentStatus::Rejected | AssignmentStatus::Granted
        )
    }
}

/// A reward grant or punishment instance applied to one assignee.
///
/// Reward rows carry only `reason`; punishment rows additionally carry the
/// deadline/penalty/proof lifecycle fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub kind: AssignmentKind,
    /// Catalog id (rewards.id or punishments.id).
    pub item_id: i64,
    pub supervisor_id: i64,
    pub assignee_id: i64,
    pub reason: Option<String>,
    pub deadline: Option<DateTime<Utc>>,
    /// Point penalty; doubled when the deadline passes unmet.
    pub penalty: Option<i64>,
    pub proof_url: Option<String>,
    /// Identity that receives the proof, only upon approval.
    pub forward_to: Option<String>,
    pub status: AssignmentStatus,
    /// Set when the deadline passed unmet; survives late re-submission.
    pub expired_at: Option<DateTime<Utc>>,
    pub reminder_hours: Option<i64>,
    pub last_reminded_at: Option<DateTime<Utc>>,
    pub assigned_at: DateTime<Utc>,
}

/// A supervisor rule auto-assigning a punishment when an assignee's balance
/// drops below `threshold_points`. Fires at most once per 24 hours.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointThreshold {
    pub id: i64,
    pub supervisor_id: i64,
    /// None applies the rule to all of the supervisor's assignees.
    pub assignee_id: Option<i64>,
    pub threshold_points: i64,
    pub punishment: AutoPunishment,
    pub penalty: i64,
    pub active: bool,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Aggregate completion statistics for an assignee over a day window.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TaskStats {
    pub total_completions: u64,
    pub total_points: i64,
    pub daily_counts: Vec<DailyCount>,
}

/// One `{date, count}` bucket for reporting adapters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: String,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_status_transitions() {
        let pending = CompletionStatus::Pending;
        assert!(pending.can_transition_to(&CompletionStatus::Approved));
        assert!(pending.can_transition_to(&CompletionStatus::Rejected));
        assert!(!CompletionStatus::Approved.can_transition_to(&CompletionStatus::Rejected));
        assert!(!CompletionStatus::Rejected.can_transition_to(&CompletionStatus::Pending));
    }

    #[test]
    fn assignment_status_transitions() {
        use AssignmentStatus::*;
        assert!(Pending.can_transition_to(&Submitted));
        assert!(Pending.can_transition_to(&Expired));
        assert!(Pending.can_transition_to(&Approved)); // cancel
        assert!(!Pending.can_transition_to(&Rejected));
        assert!(Expired.can_transition_to(&Submitted)); // late proof
        assert!(!Expired.can_transition_to(&Approved));
        assert!(Submitted.can_transition_to(&Approved));
        assert!(Submitted.can_transition_to(&Rejected));
        assert!(Submitted.can_transition_to(&Submitted)); // proof replace
        assert!(Approved.is_terminal());
        assert!(Granted.is_terminal());
        assert!(!Expired.is_terminal());
    }

    #[test]
    fn task_serialization() {
        let task = Task {
            id: 1,
            supervisor_id: 100,
            assignee_id: 200,
            title: "Morning routine".to_string(),
            description: "Photo proof required".to_string(),
            frequency: Frequency::Daily,
            point_value: 10,
            deadline: Some(Utc::now()),
            recurrence: RecurrenceRule {
                enabled: true,
                interval_hours: Some(24),
                weekdays: None,
                time_of_day: None,
            },
            next_occurrence: Some(Utc::now()),
            anchor_time: NaiveTime::from_hms_opt(9, 0, 0),
            auto_punishment: AutoPunishment::Random,
            active: true,
            reminder_hours: Some(4),
            last_reminded_at: None,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&task).unwrap();
        let _decoded: Task = serde_json::from_str(&json).unwrap();
    }
}
