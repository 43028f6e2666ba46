//! Per-session countdown controller
//!
//! Each session owns exactly one [`TimerController`]. Starting a
//! countdown atomically supersedes any prior one through a generation
//! counter: tick alarms carry the generation they were scheduled under,
//! and a tick whose generation no longer matches is stale and produces
//! no effect. Two live countdowns on one session are therefore
//! impossible by construction, and a countdown whose question already
//! closed silently dies on its next tick.
//!
//! The controller is sans-IO: it never sleeps or spawns. The session
//! layer asks the embedder to redeliver a tick alarm after each tick
//! interval and feeds it back through [`TimerController::tick`].

use serde::{Deserialize, Serialize};

/// The effect of delivering one tick alarm to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The alarm belonged to a superseded or cancelled countdown
    Stale,
    /// The countdown advanced; this many ticks remain
    Tick(u32),
    /// The countdown reached zero and is now terminated
    Expired,
}

/// A cancelable countdown owned by one session
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TimerController {
    /// Monotonic counter identifying the live countdown
    generation: u64,
    /// Remaining ticks of the live countdown, if one is running
    remaining: Option<u32>,
}

impl TimerController {
    /// Starts a fresh countdown, superseding any running one
    ///
    /// Returns the generation the caller must stamp onto the tick
    /// alarms it schedules for this countdown.
    pub fn start(&mut self, ticks: u32) -> u64 {
        self.generation += 1;
        self.remaining = Some(ticks);
        self.generation
    }

    /// Cancels the running countdown, if any
    ///
    /// In-flight tick alarms for it become stale.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.remaining = None;
    }

    /// Returns the remaining ticks of the live countdown
    pub fn remaining(&self) -> Option<u32> {
        self.remaining
    }

    /// Delivers one tick alarm stamped with `generation`
    ///
    /// A matching live countdown is decremented; at zero it terminates
    /// and [`TickOutcome::Expired`] is returned exactly once. Everything
    /// else is [`TickOutcome::Stale`].
    pub fn tick(&mut self, generation: u64) -> TickOutcome {
        if generation != self.generation {
            return TickOutcome::Stale;
        }
        let Some(remaining) = self.remaining else {
            return TickOutcome::Stale;
        };

        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            self.cancel();
            TickOutcome::Expired
        } else {
            self.remaining = Some(remaining);
            TickOutcome::Tick(remaining)
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_counts_down_to_expiry() {
        let mut timer = TimerController::default();
        let generation = timer.start(3);

        assert_eq!(timer.tick(generation), TickOutcome::Tick(2));
        assert_eq!(timer.tick(generation), TickOutcome::Tick(1));
        assert_eq!(timer.tick(generation), TickOutcome::Expired);
    }

    #[test]
    fn test_expiry_happens_once() {
        let mut timer = TimerController::default();
        let generation = timer.start(1);

        assert_eq!(timer.tick(generation), TickOutcome::Expired);
        // A re-delivered alarm for the same countdown is stale.
        assert_eq!(timer.tick(generation), TickOutcome::Stale);
    }

    #[test]
    fn test_start_supersedes_prior_countdown() {
        let mut timer = TimerController::default();
        let old = timer.start(10);
        let new = timer.start(10);
        assert_ne!(old, new);

        // The old countdown's alarms no longer do anything.
        assert_eq!(timer.tick(old), TickOutcome::Stale);
        assert_eq!(timer.tick(new), TickOutcome::Tick(9));
    }

    #[test]
    fn test_cancel_makes_ticks_stale() {
        let mut timer = TimerController::default();
        let generation = timer.start(5);
        timer.cancel();

        assert_eq!(timer.tick(generation), TickOutcome::Stale);
        assert_eq!(timer.remaining(), None);
    }

    #[test]
    fn test_remaining_tracks_countdown() {
        let mut timer = TimerController::default();
        assert_eq!(timer.remaining(), None);

        let generation = timer.start(4);
        assert_eq!(timer.remaining(), Some(4));

        timer.tick(generation);
        assert_eq!(timer.remaining(), Some(3));
    }

    #[test]
    fn test_tick_with_future_generation_is_stale() {
        let mut timer = TimerController::default();
        let generation = timer.start(5);
        assert_eq!(timer.tick(generation + 1), TickOutcome::Stale);
        assert_eq!(timer.remaining(), Some(5));
    }
}
