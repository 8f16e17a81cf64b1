//! Tick-driven scheduled events
//!
//! Timed effects register an expiry tick here and the tick loop pops
//! everything due at the start of each tick. Entries remember the round they
//! were scheduled in, so an expiry that outlives a restart can be recognized
//! as stale.

use serde::{Deserialize, Serialize};

use super::body::BodyId;

/// What to do when an entry comes due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduledAction {
    /// Restore the agent's base speed
    EndBoost { agent: BodyId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub due_tick: u64,
    /// Round in which the entry was scheduled
    pub round: u32,
    pub action: ScheduledAction,
}

/// Pending timed effects, in insertion order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schedule {
    entries: Vec<ScheduledEvent>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: ScheduledEvent) {
        self.entries.push(event);
    }

    /// Remove any pending boost expiry for an agent
    pub fn cancel_boost(&mut self, agent: BodyId) {
        self.entries
            .retain(|e| e.action != ScheduledAction::EndBoost { agent });
    }

    /// Pop every entry due at or before `now`, earliest first
    pub fn drain_due(&mut self, now: u64) -> Vec<ScheduledEvent> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.entries.drain(..).partition(|e| e.due_tick <= now);
        self.entries = pending;
        // Stable sort keeps insertion order among equal ticks
        due.sort_by_key(|e| e.due_tick);
        due
    }

    pub fn next_due(&self) -> Option<u64> {
        self.entries.iter().map(|e| e.due_tick).min()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn end_boost(agent: BodyId, due_tick: u64) -> ScheduledEvent {
        ScheduledEvent {
            due_tick,
            round: 0,
            action: ScheduledAction::EndBoost { agent },
        }
    }

    #[test]
    fn test_drain_due_only_pops_due_entries() {
        let mut schedule = Schedule::new();
        schedule.push(end_boost(1, 30));
        schedule.push(end_boost(2, 10));
        schedule.push(end_boost(3, 60));

        assert!(schedule.drain_due(5).is_empty());
        let due = schedule.drain_due(30);
        assert_eq!(due, vec![end_boost(2, 10), end_boost(1, 30)]);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.next_due(), Some(60));
    }

    #[test]
    fn test_cancel_boost() {
        let mut schedule = Schedule::new();
        schedule.push(end_boost(1, 30));
        schedule.push(end_boost(2, 30));
        schedule.cancel_boost(1);
        assert_eq!(schedule.drain_due(100), vec![end_boost(2, 30)]);
        assert!(schedule.is_empty());
    }
}
