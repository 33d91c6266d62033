//! Time-derived round lifecycle.
//!
//! A round's phase is never stored; every observer recomputes it from the
//! round's timestamps, the current time, and the completion flag. That keeps
//! the state machine idempotent: querying it from any number of components
//! at the same instant yields the same answer, and no background timer has
//! to own the transitions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Schedule validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("round schedule must satisfy registration open <= close <= play time")]
    Unordered,
}

/// The three timestamps that drive a round's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSchedule {
    pub registration_opens_at: DateTime<Utc>,
    pub registration_closes_at: DateTime<Utc>,
    pub plays_at: DateTime<Utc>,
}

impl RoundSchedule {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.registration_opens_at <= self.registration_closes_at
            && self.registration_closes_at <= self.plays_at
        {
            Ok(())
        } else {
            Err(ScheduleError::Unordered)
        }
    }

    /// Latest instant at which a card may still be finalized: the setup
    /// timer runs from registration close but never extends past play time.
    pub fn card_setup_deadline(&self, setup_window: Duration) -> DateTime<Utc> {
        (self.registration_closes_at + setup_window).min(self.plays_at)
    }
}

/// Derived lifecycle phase of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    /// Before registration closes. Users may buy tickets once registration
    /// has opened.
    Registration,
    /// Between registration close and play time; the card-setup window.
    LobbyWait,
    /// Play time has arrived and the round has not completed; numbers are
    /// being drawn.
    Drawing,
    /// Terminal: a winner was confirmed or the number pool was exhausted.
    Completed,
}

impl RoundPhase {
    /// Derive the phase from stored timestamps plus the completion flag.
    pub fn derive(schedule: &RoundSchedule, completed: bool, now: DateTime<Utc>) -> Self {
        if completed {
            RoundPhase::Completed
        } else if now >= schedule.plays_at {
            RoundPhase::Drawing
        } else if now >= schedule.registration_closes_at {
            RoundPhase::LobbyWait
        } else {
            RoundPhase::Registration
        }
    }

    pub fn is_drawing(self) -> bool {
        self == RoundPhase::Drawing
    }
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            RoundPhase::Registration => "registration",
            RoundPhase::LobbyWait => "lobby_wait",
            RoundPhase::Drawing => "drawing",
            RoundPhase::Completed => "completed",
        };
        write!(f, "{repr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> RoundSchedule {
        let t0 = Utc::now();
        RoundSchedule {
            registration_opens_at: t0,
            registration_closes_at: t0 + Duration::hours(1),
            plays_at: t0 + Duration::hours(1) + Duration::minutes(5),
        }
    }

    #[test]
    fn phases_follow_the_clock() {
        let schedule = schedule();
        let t0 = schedule.registration_opens_at;

        let cases = [
            (t0 + Duration::minutes(30), RoundPhase::Registration),
            (t0 + Duration::minutes(62), RoundPhase::LobbyWait),
            (t0 + Duration::minutes(70), RoundPhase::Drawing),
        ];
        for (now, expected) in cases {
            assert_eq!(RoundPhase::derive(&schedule, false, now), expected);
        }
    }

    #[test]
    fn completion_is_terminal_regardless_of_clock() {
        let schedule = schedule();
        let t0 = schedule.registration_opens_at;
        for offset in [0, 62, 70, 600] {
            let now = t0 + Duration::minutes(offset);
            assert_eq!(
                RoundPhase::derive(&schedule, true, now),
                RoundPhase::Completed
            );
        }
    }

    #[test]
    fn derivation_is_deterministic() {
        let schedule = schedule();
        let now = schedule.registration_opens_at + Duration::minutes(45);
        let first = RoundPhase::derive(&schedule, false, now);
        for _ in 0..10 {
            assert_eq!(RoundPhase::derive(&schedule, false, now), first);
        }
    }

    #[test]
    fn boundaries_are_half_open() {
        let schedule = schedule();
        assert_eq!(
            RoundPhase::derive(&schedule, false, schedule.registration_closes_at),
            RoundPhase::LobbyWait
        );
        assert_eq!(
            RoundPhase::derive(&schedule, false, schedule.plays_at),
            RoundPhase::Drawing
        );
    }

    #[test]
    fn setup_deadline_is_capped_by_play_time() {
        let schedule = schedule();
        let short = schedule.card_setup_deadline(Duration::seconds(120));
        assert_eq!(
            short,
            schedule.registration_closes_at + Duration::seconds(120)
        );
        let long = schedule.card_setup_deadline(Duration::hours(2));
        assert_eq!(long, schedule.plays_at);
    }

    #[test]
    fn schedule_ordering_is_enforced() {
        let mut bad = schedule();
        bad.plays_at = bad.registration_opens_at;
        assert_eq!(bad.validate(), Err(ScheduleError::Unordered));
        assert!(schedule().validate().is_ok());
    }
}
