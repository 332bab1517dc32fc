//! Cooperative timer manager backing the `wait` tool (spec.md §4.10).
//!
//! Structurally the same shape as the teacher's
//! `sa_tools::manager::ProcessManager`: a keyed map behind a single lock
//! with register/get/list/kill/cleanup_stale operations. The difference is
//! what drives completion — a `tokio::time::sleep` ticking at `interval`
//! instead of a child process's exit.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hub_domain::entities::{TimerHandle, TimerStatus};
use hub_domain::error::{Error, Result};
use hub_domain::trace::TraceEvent;
use hub_domain::TimersConfig;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use uuid::Uuid;

struct TimerEntry {
    handle: TimerHandle,
    finished_at: Option<DateTime<Utc>>,
    cancel_tx: Option<mpsc::Sender<()>>,
}

/// Keyed map of `timer_id -> TimerEntry`, guarded by a single lock —
/// mirrors `ProcessManager`'s `sessions: RwLock<HashMap<String, _>>`.
pub struct TimerManager {
    timers: RwLock<HashMap<Uuid, TimerEntry>>,
    config: TimersConfig,
}

impl TimerManager {
    pub fn new(config: TimersConfig) -> Self {
        Self {
            timers: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Schedule a cooperative countdown of `duration`, ticking every
    /// `interval`. Terminates with status `completed` unless cancelled
    /// first. Rejects durations beyond `TimersConfig::max_duration_ms`.
    /// Takes `Arc<Self>` by value so the spawned task can hold its own
    /// clone — call as `Arc::clone(&manager).start_timer(...)`.
    pub fn start_timer(self: std::sync::Arc<Self>, duration: Duration, interval: Duration) -> Result<Uuid> {
        if duration.as_millis() as u64 > self.config.max_duration_ms {
            return Err(Error::Validation(format!(
                "duration {}ms exceeds max_duration_ms {}",
                duration.as_millis(),
                self.config.max_duration_ms
            )));
        }

        let id = Uuid::new_v4();
        let (cancel_tx, mut cancel_rx) = mpsc::channel(1);
        let handle = TimerHandle {
            id,
            status: TimerStatus::Running,
            started_at: Utc::now(),
            duration_ms: duration.as_millis() as u64,
        };

        self.timers.write().insert(
            id,
            TimerEntry {
                handle: handle.clone(),
                finished_at: None,
                cancel_tx: Some(cancel_tx),
            },
        );

        TraceEvent::TimerStarted {
            timer_id: id.to_string(),
            duration_ms: handle.duration_ms,
        }
        .emit();

        let manager = self.clone();
        tokio::spawn(async move {
            let mut elapsed = Duration::ZERO;
            let outcome = loop {
                if elapsed >= duration {
                    break TimerStatus::Completed;
                }
                let tick = interval.min(duration - elapsed);
                tokio::select! {
                    _ = tokio::time::sleep(tick) => {
                        elapsed += tick;
                    }
                    _ = cancel_rx.recv() => {
                        break TimerStatus::Cancelled;
                    }
                }
            };
            manager.finish(id, outcome);
        });

        Ok(id)
    }

    fn finish(&self, id: Uuid, status: TimerStatus) {
        let mut timers = self.timers.write();
        if let Some(entry) = timers.get_mut(&id) {
            if entry.handle.status != TimerStatus::Running {
                return;
            }
            entry.handle.status = status;
            entry.finished_at = Some(Utc::now());
            entry.cancel_tx = None;

            TraceEvent::TimerCompleted {
                timer_id: id.to_string(),
                reason: match status {
                    TimerStatus::Completed => "completed".to_string(),
                    TimerStatus::Cancelled => "cancelled".to_string(),
                    TimerStatus::Running => unreachable!("finish() only sets a terminal status"),
                },
            }
            .emit();
        }
    }

    /// Transition a running timer to `cancelled`. Errors if the timer is
    /// unknown or already in a terminal state — a timer never resurrects.
    pub fn cancel_timer(&self, id: Uuid) -> Result<()> {
        let tx = {
            let timers = self.timers.read();
            let entry = timers
                .get(&id)
                .ok_or_else(|| Error::NotFound(format!("timer {id}")))?;
            if entry.handle.status != TimerStatus::Running {
                return Err(Error::Conflict(format!("timer {id} already {:?}", entry.handle.status)));
            }
            entry.cancel_tx.clone()
        };
        if let Some(tx) = tx {
            let _ = tx.try_send(());
        }
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Option<TimerHandle> {
        self.timers.read().get(&id).map(|e| e.handle.clone())
    }

    pub fn list_active_timers(&self) -> Vec<TimerHandle> {
        self.timers
            .read()
            .values()
            .filter(|e| e.handle.status == TimerStatus::Running)
            .map(|e| e.handle.clone())
            .collect()
    }

    /// Prune timers that reached a terminal state more than
    /// `cleanup_after_ms` ago. Returns the number removed.
    pub fn cleanup_timers(&self) -> usize {
        let cutoff_ms = self.config.cleanup_after_ms as i64;
        let now = Utc::now();
        let mut timers = self.timers.write();
        let before = timers.len();
        timers.retain(|_, entry| match entry.finished_at {
            Some(finished) => now.signed_duration_since(finished).num_milliseconds() < cutoff_ms,
            None => true,
        });
        before - timers.len()
    }
}

pub type SharedTimerManager = std::sync::Arc<TimerManager>;
