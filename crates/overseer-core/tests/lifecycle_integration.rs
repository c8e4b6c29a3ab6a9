//! Integration tests for the obligation lifecycle.
//!
//! These exercise the public API end to end against an in-memory store:
//! registration through review, deadline expiry with cascades, and the
//! point economy rules that tie them together.

use std::sync::Arc;

use chrono::{Duration, Utc};
use overseer_core::storage::config::SweepConfig;
use overseer_core::{
    AutoPunishment, CoreError, Database, DeadlineSweeper, Frequency, Ledger,
    NewPunishmentAssignment, NewTask, NewThreshold, NullNotifier, PunishmentRepo, RecurrenceRule,
    RewardRepo, Role, StatsRepo, TaskRepo, ThresholdEvaluator, UserRepo,
};

const SUPERVISOR: i64 = 100;
const ASSIGNEE: i64 = 200;

struct Harness {
    db: Arc<Database>,
    users: UserRepo,
    tasks: TaskRepo,
    rewards: RewardRepo,
    punishments: PunishmentRepo,
    thresholds: ThresholdEvaluator,
    ledger: Ledger,
    sweeper: DeadlineSweeper,
}

fn harness() -> Harness {
    let db = Arc::new(Database::open_memory().unwrap());
    let users = UserRepo::new(db.clone());
    users.register(SUPERVISOR, "dom", Role::Supervisor).unwrap();
    users.register(ASSIGNEE, "sub", Role::Assignee).unwrap();
    users.link(SUPERVISOR, ASSIGNEE).unwrap();
    Harness {
        users,
        tasks: TaskRepo::new(db.clone()),
        rewards: RewardRepo::new(db.clone()),
        punishments: PunishmentRepo::new(db.clone()),
        thresholds: ThresholdEvaluator::new(db.clone()),
        ledger: Ledger::new(db.clone()),
        sweeper: DeadlineSweeper::new(db.clone(), Arc::new(NullNotifier), SweepConfig::default()),
        db,
    }
}

fn new_task(title: &str) -> NewTask {
    NewTask {
        supervisor_id: SUPERVISOR,
        assignee_id: ASSIGNEE,
        title: title.to_string(),
        description: String::new(),
        frequency: Frequency::Daily,
        point_value: 10,
        deadline: Some(Utc::now() + Duration::hours(6)),
        recurrence: RecurrenceRule::default(),
        anchor_time: None,
        auto_punishment: AutoPunishment::None,
        reminder_hours: None,
    }
}

fn backdate_task(h: &Harness, task_id: i64) {
    use rusqlite::params;
    // Reach under the API to simulate the passage of time.
    h.db.with_connection(|conn| {
        conn.execute(
            "UPDATE tasks SET deadline = ?1 WHERE id = ?2",
            params![(Utc::now() - Duration::hours(1)).to_rfc3339(), task_id],
        )
        .map(|_| ())
    })
    .unwrap();
}

#[test]
fn submit_review_award_round_trip() {
    let h = harness();
    let task = h.tasks.create(new_task("Dishes")).unwrap();
    let completion = h
        .tasks
        .submit_completion(task.id, ASSIGNEE, Some("http://img/1"))
        .unwrap();

    let outcome = h
        .tasks
        .review_completion(completion.id, SUPERVISOR, true, false)
        .unwrap();
    assert_eq!(outcome.points_awarded, 10);
    assert_eq!(h.ledger.balance(ASSIGNEE).unwrap(), 10);

    let stats = StatsRepo::new(h.db.clone()).task_stats(ASSIGNEE, 7).unwrap();
    assert_eq!(stats.total_completions, 1);
    assert_eq!(stats.total_points, 10);
}

#[tokio::test]
async fn missed_deadline_cascade_and_late_redemption() {
    let h = harness();
    let lines = h.punishments.create(SUPERVISOR, "Lines", "").unwrap();
    let mut task = new_task("Curfew");
    task.auto_punishment = AutoPunishment::Specific(lines.id);
    let task = h.tasks.create(task).unwrap();
    backdate_task(&h, task.id);

    // Sweep 1: task expires. 10 points deducted, cascade issued with the
    // configured fixed penalty and a 24h window.
    let report = h.sweeper.sweep_once(Utc::now()).await;
    assert_eq!(report.expired_tasks, 1);
    assert_eq!(report.cascades, 1);
    assert_eq!(h.ledger.balance(ASSIGNEE).unwrap(), -10);

    let cascade = h.punishments.list_for_assignee(ASSIGNEE, false).unwrap()[0].clone();
    assert_eq!(cascade.penalty, Some(10));

    // Sweep 2 at cascade deadline + epsilon: the pending assignment
    // expires, penalty doubles to 20 and is deducted.
    let later = Utc::now() + Duration::hours(25);
    let report = h.sweeper.sweep_once(later).await;
    assert_eq!(report.expired_assignments, 1);
    assert_eq!(h.ledger.balance(ASSIGNEE).unwrap(), -30);

    // Late proof is still accepted and approval refunds exactly the
    // doubled penalty.
    h.punishments
        .submit_proof(cascade.id, ASSIGNEE, "http://img/proof")
        .unwrap();
    let outcome = h
        .punishments
        .review_proof(cascade.id, SUPERVISOR, true)
        .unwrap();
    assert_eq!(outcome.refunded, 20);
    assert_eq!(h.ledger.balance(ASSIGNEE).unwrap(), -10);

    // Idempotent expiry: nothing left to sweep.
    let report = h.sweeper.sweep_once(later).await;
    assert_eq!(report.expired_tasks, 0);
    assert_eq!(report.expired_assignments, 0);
}

#[test]
fn reward_economy_blocks_overdraw() {
    let h = harness();
    h.ledger.apply_delta(ASSIGNEE, 30).unwrap();
    let movie = h.rewards.create(SUPERVISOR, "Movie night", "", 25).unwrap();

    let grant = h
        .rewards
        .assign(SUPERVISOR, ASSIGNEE, movie.id, Some("good week"))
        .unwrap();
    assert_eq!(grant.new_balance, 5);

    assert!(matches!(
        h.rewards.assign(SUPERVISOR, ASSIGNEE, movie.id, None),
        Err(CoreError::InsufficientPoints {
            required: 25,
            available: 5
        })
    ));
}

#[tokio::test]
async fn threshold_fires_once_per_window_across_expiries() {
    let h = harness();
    h.punishments.create(SUPERVISOR, "Lines", "").unwrap();
    h.thresholds
        .create(NewThreshold {
            supervisor_id: SUPERVISOR,
            assignee_id: Some(ASSIGNEE),
            threshold_points: 50,
            punishment: AutoPunishment::Random,
            penalty: 5,
        })
        .unwrap();

    let a = h.tasks.create(new_task("Task A")).unwrap();
    let b = h.tasks.create(new_task("Task B")).unwrap();
    backdate_task(&h, a.id);

    // First expiry drops the balance below 50: the threshold fires.
    let report = h.sweeper.sweep_once(Utc::now()).await;
    assert_eq!(report.threshold_firings, 1);

    // Second qualifying event inside the cooldown window: no re-fire.
    backdate_task(&h, b.id);
    let report = h.sweeper.sweep_once(Utc::now()).await;
    assert_eq!(report.expired_tasks, 1);
    assert_eq!(report.threshold_firings, 0);
}

#[test]
fn multi_supervisor_lookups_are_deterministic() {
    let h = harness();
    h.users.register(101, "dom-b", Role::Supervisor).unwrap();
    h.users.link(101, ASSIGNEE).unwrap();

    assert_eq!(h.users.supervisors_of(ASSIGNEE).unwrap().len(), 2);
    let dominant = h.users.dominant_supervisor(ASSIGNEE).unwrap().unwrap();
    assert_eq!(dominant.id, SUPERVISOR);
}

#[test]
fn direct_punishment_assignment_flow() {
    let h = harness();
    let corner = h.punishments.create(SUPERVISOR, "Corner", "").unwrap();
    let assignment = h
        .punishments
        .assign(NewPunishmentAssignment {
            supervisor_id: SUPERVISOR,
            assignee_id: ASSIGNEE,
            punishment: AutoPunishment::Specific(corner.id),
            reason: Some("talked back".to_string()),
            deadline: Utc::now() + Duration::hours(24),
            penalty: 15,
            forward_to: Some("witness".to_string()),
            reminder_hours: None,
        })
        .unwrap();

    h.punishments
        .submit_proof(assignment.id, ASSIGNEE, "http://img/done")
        .unwrap();
    let outcome = h
        .punishments
        .review_proof(assignment.id, SUPERVISOR, true)
        .unwrap();
    // No expiry happened, so nothing is refunded, and the proof is
    // released to the forward-to identity.
    assert_eq!(outcome.refunded, 0);
    assert_eq!(outcome.forward.unwrap().to, "witness");
    assert_eq!(h.ledger.balance(ASSIGNEE).unwrap(), 0);
}
