//! Duplicate-command suppression.
//!
//! Push delivery is at-least-once: a retry storm can hand the agent the
//! same command several times within seconds. This keeps only the last
//! accepted instant per command kind and suppresses arrivals inside a
//! short window. Noise reduction only - every operation behind it is
//! idempotent, so a duplicate that slips through (window expired, or a
//! process restart cleared the map) is harmless.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tether_common::CommandKind;

pub struct CommandDeduplicator {
    window: Duration,
    last_accepted: Mutex<HashMap<CommandKind, Instant>>,
}

impl CommandDeduplicator {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true when the command should proceed, false when it is a
    /// duplicate inside the window. Different kinds never suppress each
    /// other.
    pub fn accept(&self, kind: CommandKind, now: Instant) -> bool {
        let mut last = self.last_accepted.lock().unwrap();
        if let Some(prev) = last.get(&kind) {
            if now.duration_since(*prev) < self.window {
                return false;
            }
        }
        last.insert(kind, now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_inside_window_is_suppressed() {
        let dedup = CommandDeduplicator::new(Duration::from_secs(5));
        let t0 = Instant::now();
        assert!(dedup.accept(CommandKind::Lock, t0));
        assert!(!dedup.accept(CommandKind::Lock, t0 + Duration::from_secs(1)));
    }

    #[test]
    fn test_arrival_after_window_proceeds() {
        let dedup = CommandDeduplicator::new(Duration::from_secs(5));
        let t0 = Instant::now();
        assert!(dedup.accept(CommandKind::Lock, t0));
        assert!(dedup.accept(CommandKind::Lock, t0 + Duration::from_secs(6)));
    }

    #[test]
    fn test_kinds_do_not_suppress_each_other() {
        let dedup = CommandDeduplicator::new(Duration::from_secs(5));
        let t0 = Instant::now();
        assert!(dedup.accept(CommandKind::Lock, t0));
        assert!(dedup.accept(CommandKind::Unlock, t0));
        assert!(dedup.accept(CommandKind::Ping, t0));
    }

    #[test]
    fn test_suppressed_arrival_does_not_extend_window() {
        let dedup = CommandDeduplicator::new(Duration::from_secs(5));
        let t0 = Instant::now();
        assert!(dedup.accept(CommandKind::Lock, t0));
        // Suppressed duplicate at t0+4 must not push the window forward:
        // the arrival at t0+6 is measured against t0.
        assert!(!dedup.accept(CommandKind::Lock, t0 + Duration::from_secs(4)));
        assert!(dedup.accept(CommandKind::Lock, t0 + Duration::from_secs(6)));
    }

    #[test]
    fn test_zero_window_accepts_everything() {
        // Dedup disabled: correctness must not depend on suppression.
        let dedup = CommandDeduplicator::new(Duration::ZERO);
        let t0 = Instant::now();
        assert!(dedup.accept(CommandKind::Lock, t0));
        assert!(dedup.accept(CommandKind::Lock, t0));
    }
}
