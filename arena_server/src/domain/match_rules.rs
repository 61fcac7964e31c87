// Match win conditions: first to the kill target, or the time limit.

use crate::domain::entities::EntityId;
use crate::domain::events::MatchEndReason;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct MatchRules {
    pub kill_target: u32,
    /// `None` disables the time limit.
    pub time_limit: Option<Duration>,
    /// Pause between a finished match and the next one.
    pub intermission: Duration,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            kill_target: 20,
            time_limit: Some(Duration::from_secs(420)),
            intermission: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub reason: MatchEndReason,
    pub winners: Vec<EntityId>,
}

/// Clock and result of one match. A match stays unstarted until `start`, and an
/// unstarted match never times out.
#[derive(Debug, Clone)]
pub struct MatchState {
    rules: MatchRules,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
    last_announced: Option<u64>,
}

impl MatchState {
    pub fn new(rules: MatchRules) -> Self {
        Self {
            rules,
            started_at: None,
            ended_at: None,
            last_announced: None,
        }
    }

    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_over(&self) -> bool {
        self.ended_at.is_some()
    }

    /// Starts the clock. Returns false if the match is already running or over.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.started_at.is_some() {
            return false;
        }
        self.started_at = Some(now);
        true
    }

    /// Back to the unstarted state with the same rules.
    pub fn reset(&mut self) {
        *self = Self::new(self.rules);
    }

    /// True once a finished match has sat through its intermission.
    pub fn intermission_elapsed(&self, now: Instant) -> bool {
        self.ended_at
            .is_some_and(|ended| now.saturating_duration_since(ended) >= self.rules.intermission)
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let limit = self.rules.time_limit?;
        let Some(started) = self.started_at else {
            return Some(limit);
        };
        Some(limit.saturating_sub(now.saturating_duration_since(started)))
    }

    /// Whole seconds remaining, reported once per second change while running.
    pub fn timer_tick(&mut self, now: Instant) -> Option<Duration> {
        if !self.is_started() || self.is_over() {
            return None;
        }
        let remaining = self.remaining(now)?;
        let secs = remaining.as_secs();
        if self.last_announced == Some(secs) {
            return None;
        }
        self.last_announced = Some(secs);
        Some(Duration::from_secs(secs))
    }

    /// Checks both win conditions on a running match. Yields an outcome exactly once.
    pub fn evaluate(
        &mut self,
        now: Instant,
        scores: impl IntoIterator<Item = (EntityId, u32)>,
    ) -> Option<MatchOutcome> {
        if !self.is_started() || self.is_over() {
            return None;
        }
        let scores: Vec<(EntityId, u32)> = scores.into_iter().collect();
        let top = scores.iter().map(|(_, kills)| *kills).max().unwrap_or(0);
        let leaders = || {
            scores
                .iter()
                .filter(|(_, kills)| *kills == top)
                .map(|(id, _)| *id)
                .collect::<Vec<_>>()
        };

        let reason = if self.rules.kill_target > 0 && top >= self.rules.kill_target {
            MatchEndReason::KillTarget
        } else if self.remaining(now).is_some_and(|r| r.is_zero()) {
            MatchEndReason::TimeLimit
        } else {
            return None;
        };

        self.ended_at = Some(now);
        Some(MatchOutcome {
            reason,
            winners: if top == 0 { Vec::new() } else { leaders() },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(rules: MatchRules, t0: Instant) -> MatchState {
        let mut state = MatchState::new(rules);
        assert!(state.start(t0));
        state
    }

    #[test]
    fn kill_target_ends_match_once() {
        let t0 = Instant::now();
        let mut state = running(MatchRules::default(), t0);
        assert!(state.evaluate(t0, [(1, 19), (2, 3)]).is_none());
        let outcome = state.evaluate(t0, [(1, 20), (2, 3)]).expect("ends");
        assert_eq!(outcome.reason, MatchEndReason::KillTarget);
        assert_eq!(outcome.winners, vec![1]);
        assert!(state.is_over());
        assert!(state.evaluate(t0, [(1, 25)]).is_none());
    }

    #[test]
    fn time_limit_reports_ties() {
        let t0 = Instant::now();
        let rules = MatchRules {
            kill_target: 20,
            time_limit: Some(Duration::from_secs(10)),
            ..MatchRules::default()
        };
        let mut state = running(rules, t0);
        assert!(state.evaluate(t0 + Duration::from_secs(9), [(1, 2), (2, 2)]).is_none());
        let outcome = state
            .evaluate(t0 + Duration::from_secs(10), [(1, 2), (2, 2), (3, 0)])
            .expect("ends");
        assert_eq!(outcome.reason, MatchEndReason::TimeLimit);
        assert_eq!(outcome.winners, vec![1, 2]);
    }

    #[test]
    fn timer_announces_each_second_once() {
        let t0 = Instant::now();
        let rules = MatchRules {
            kill_target: 0,
            time_limit: Some(Duration::from_secs(3)),
            ..MatchRules::default()
        };
        let mut state = running(rules, t0);
        assert_eq!(state.timer_tick(t0), Some(Duration::from_secs(3)));
        assert_eq!(state.timer_tick(t0 + Duration::from_millis(10)), Some(Duration::from_secs(2)));
        assert_eq!(state.timer_tick(t0 + Duration::from_millis(500)), None);
        assert_eq!(state.timer_tick(t0 + Duration::from_millis(1001)), Some(Duration::from_secs(1)));
    }

    #[test]
    fn no_time_limit_never_times_out() {
        let t0 = Instant::now();
        let rules = MatchRules {
            kill_target: 5,
            time_limit: None,
            ..MatchRules::default()
        };
        let mut state = running(rules, t0);
        assert!(state.evaluate(t0 + Duration::from_secs(100_000), [(1, 4)]).is_none());
        assert!(state.timer_tick(t0).is_none());
    }

    #[test]
    fn unstarted_match_never_times_out() {
        let t0 = Instant::now();
        let nobody: [(EntityId, u32); 0] = [];
        let mut state = MatchState::new(MatchRules::default());
        let late = t0 + Duration::from_secs(10_000);
        assert!(state.evaluate(late, nobody).is_none());
        assert!(state.timer_tick(late).is_none());
        assert_eq!(state.remaining(late), Some(Duration::from_secs(420)));

        assert!(state.start(late));
        assert!(!state.start(late + Duration::from_secs(1)));
        assert!(state.evaluate(late + Duration::from_secs(419), nobody).is_none());
        let outcome = state.evaluate(late + Duration::from_secs(420), nobody).expect("ends");
        assert_eq!(outcome.reason, MatchEndReason::TimeLimit);
        assert!(outcome.winners.is_empty());
    }

    #[test]
    fn intermission_then_reset_allows_a_new_match() {
        let t0 = Instant::now();
        let rules = MatchRules {
            kill_target: 1,
            ..MatchRules::default()
        };
        let mut state = running(rules, t0);
        assert!(state.evaluate(t0, [(1, 1)]).is_some());
        assert!(!state.intermission_elapsed(t0 + Duration::from_secs(9)));
        assert!(state.intermission_elapsed(t0 + Duration::from_secs(10)));

        state.reset();
        assert!(!state.is_over() && !state.is_started());
        assert!(state.start(t0 + Duration::from_secs(10)));
        assert!(state.evaluate(t0 + Duration::from_secs(10), [(1, 0)]).is_none());
    }
}
