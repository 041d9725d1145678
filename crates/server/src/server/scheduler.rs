//! Named repeating tasks.
//!
//! Each task is rescheduled from its completion time, so a slow run drifts
//! instead of piling up catch-up runs.

use crate::config::LoopConfig;

/// Repeating tasks driven by the game loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Fast,
    Slow,
    ConnectionCheck,
    RewardSpawn,
    Leaderboard,
    RoundRotation,
}

impl TaskKind {
    pub const ALL: [TaskKind; 6] = [
        TaskKind::Fast,
        TaskKind::Slow,
        TaskKind::ConnectionCheck,
        TaskKind::RewardSpawn,
        TaskKind::Leaderboard,
        TaskKind::RoundRotation,
    ];
}

#[derive(Debug, Clone)]
struct Task {
    kind: TaskKind,
    period_ms: u64,
    next_due: u64,
    cancelled: bool,
}

/// Plain-value scheduler, stepped by the caller with explicit timestamps.
#[derive(Debug, Clone)]
pub struct Scheduler {
    tasks: Vec<Task>,
}

impl Scheduler {
    /// Every task first fires one period after `now`, except the fast tick which fires at once.
    pub fn new(loops: &LoopConfig, now: u64) -> Self {
        let tasks = TaskKind::ALL
            .iter()
            .map(|&kind| {
                let period_ms = period_of(loops, kind).max(1);
                let next_due = if kind == TaskKind::Fast { now } else { now + period_ms };
                Task { kind, period_ms, next_due, cancelled: false }
            })
            .collect();
        Self { tasks }
    }

    /// Tasks due at `now`, in declaration order.
    pub fn due(&self, now: u64) -> Vec<TaskKind> {
        self.tasks
            .iter()
            .filter(|task| !task.cancelled && task.next_due <= now)
            .map(|task| task.kind)
            .collect()
    }

    /// Mark a run finished at `completed_at`.
    pub fn complete(&mut self, kind: TaskKind, completed_at: u64) {
        if let Some(task) = self.task_mut(kind) {
            task.next_due = completed_at + task.period_ms;
        }
    }

    /// Restart the period from `now`.
    pub fn reset(&mut self, kind: TaskKind, now: u64) {
        self.complete(kind, now);
    }

    pub fn cancel(&mut self, kind: TaskKind) {
        if let Some(task) = self.task_mut(kind) {
            task.cancelled = true;
        }
    }

    pub fn resume(&mut self, kind: TaskKind, now: u64) {
        if let Some(task) = self.task_mut(kind) {
            task.cancelled = false;
            task.next_due = now + task.period_ms;
        }
    }

    pub fn is_cancelled(&self, kind: TaskKind) -> bool {
        self.tasks.iter().any(|task| task.kind == kind && task.cancelled)
    }

    /// When `kind` is next due.
    pub fn next_due(&self, kind: TaskKind) -> Option<u64> {
        self.tasks
            .iter()
            .find(|task| task.kind == kind && !task.cancelled)
            .map(|task| task.next_due)
    }

    /// Earliest due time over every live task.
    pub fn next_wakeup(&self) -> Option<u64> {
        self.tasks.iter().filter(|task| !task.cancelled).map(|task| task.next_due).min()
    }

    /// Re-derive periods after a config change. A changed task keeps its last
    /// completion time and moves its due time by the new period, never into the past.
    pub fn set_periods(&mut self, loops: &LoopConfig, now: u64) {
        for task in &mut self.tasks {
            let period_ms = period_of(loops, task.kind).max(1);
            if period_ms == task.period_ms {
                continue;
            }
            let completed_at = task.next_due.saturating_sub(task.period_ms);
            task.period_ms = period_ms;
            task.next_due = (completed_at + period_ms).max(now);
        }
    }

    fn task_mut(&mut self, kind: TaskKind) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.kind == kind)
    }
}

fn period_of(loops: &LoopConfig, kind: TaskKind) -> u64 {
    match kind {
        TaskKind::Fast => loops.fast_ms,
        TaskKind::Slow => loops.slow_ms,
        TaskKind::ConnectionCheck => loops.connection_check_ms,
        TaskKind::RewardSpawn => loops.reward_spawn_ms,
        TaskKind::Leaderboard => loops.leaderboard_ms,
        TaskKind::RoundRotation => loops.round_loop_seconds * 1000,
    }
}
