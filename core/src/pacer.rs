use log::trace;

pub trait TimeDaemon {
    fn get_now_ms(&self) -> f64;

    /// Blocks for `ms` milliseconds. Spins on the clock unless the platform
    /// has something better.
    fn sleep_ms(&self, ms: f64) {
        let until = self.get_now_ms() + ms;
        while self.get_now_ms() < until {
            core::hint::spin_loop();
        }
    }
}

/// 70 ticks per second while playing.
pub const GAME_TICK_MS: f64 = 1000.0 / 70.0;
/// 28 frames per second for cutscenes.
pub const MOVIE_TICK_MS: f64 = 1000.0 / 28.0;
/// Lateness carried over is never more than this.
pub const MAX_CARRIED_DRIFT_MS: f64 = 250.0;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickMode {
    Gameplay,
    Movie,
}

impl TickMode {
    pub const fn interval_ms(self) -> f64 {
        match self {
            TickMode::Gameplay => GAME_TICK_MS,
            TickMode::Movie => MOVIE_TICK_MS,
        }
    }
}

/// Sleep budget bookkeeping. Lateness of one tick is taken out of the next
/// ones.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FrameClock {
    target_ms: f64,
    carried_drift_ms: f64,
}

impl FrameClock {
    pub fn target_ms(&self) -> f64 {
        self.target_ms
    }

    /// Always zero or negative.
    pub fn carried_drift_ms(&self) -> f64 {
        self.carried_drift_ms
    }

    /// How long to sleep after a tick whose work took `elapsed_ms`.
    pub fn schedule(&mut self, target_ms: f64, elapsed_ms: f64) -> f64 {
        self.target_ms = target_ms;
        let budget = target_ms - elapsed_ms + self.carried_drift_ms;
        if budget < 0.0 {
            self.carried_drift_ms = budget.max(-MAX_CARRIED_DRIFT_MS);
            0.0
        } else {
            self.carried_drift_ms = 0.0;
            budget.min(target_ms)
        }
    }

    pub fn reset(&mut self) {
        self.carried_drift_ms = 0.0;
    }
}

/// Keeps the loop on a fixed tick. `wait_next_frame` sleeps on the calling
/// thread; `next_delay` only says how long to wait, for event loops that
/// schedule their own wakeups.
pub struct FramePacer<Clock: TimeDaemon> {
    clock: Clock,
    frame: FrameClock,
    last_wake_ms: f64,
    nosync: bool,
}

impl<Clock: TimeDaemon> FramePacer<Clock> {
    pub fn new(clock: Clock, nosync: bool) -> Self {
        let last_wake_ms = clock.get_now_ms();
        Self {
            clock,
            frame: FrameClock::default(),
            last_wake_ms,
            nosync,
        }
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn frame_clock(&self) -> &FrameClock {
        &self.frame
    }

    pub fn now_ms(&self) -> f64 {
        self.clock.get_now_ms()
    }

    /// Delay before the next tick. Time since the previous wakeup counts as
    /// that tick's work.
    pub fn next_delay(&mut self, mode: TickMode) -> f64 {
        let now = self.clock.get_now_ms();
        if self.nosync {
            self.last_wake_ms = now;
            return 0.0;
        }
        let elapsed = now - self.last_wake_ms;
        let delay = self.frame.schedule(mode.interval_ms(), elapsed);
        trace!(
            "tick: elapsed {:.2} ms, sleep {:.2} ms, drift {:.2} ms",
            elapsed,
            delay,
            self.frame.carried_drift_ms()
        );
        self.last_wake_ms = now + delay;
        delay
    }

    /// Blocks until the next tick is due and returns how long it slept.
    pub fn wait_next_frame(&mut self, mode: TickMode) -> f64 {
        let delay = self.next_delay(mode);
        if delay > 0.0 {
            self.clock.sleep_ms(delay);
        }
        delay
    }

    /// Forgets accumulated lateness, e.g. after the window was hidden.
    pub fn resume(&mut self) {
        self.last_wake_ms = self.clock.get_now_ms();
        self.frame.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedClock;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_on_time_tick_sleeps_nothing() {
        let mut clock = FrameClock::default();
        assert!(close(clock.schedule(GAME_TICK_MS, GAME_TICK_MS), 0.0));
        assert!(close(clock.carried_drift_ms(), 0.0));
    }

    #[test]
    fn test_late_tick_carries_drift() {
        let mut clock = FrameClock::default();
        assert!(close(clock.schedule(GAME_TICK_MS, GAME_TICK_MS + 5.0), 0.0));
        assert!(close(clock.carried_drift_ms(), -5.0));

        // the next quick tick pays the debt back
        let sleep = clock.schedule(GAME_TICK_MS, 2.0);
        assert!(close(sleep, GAME_TICK_MS - 7.0));
        assert!(close(clock.carried_drift_ms(), 0.0));
    }

    #[test]
    fn test_drift_is_floored() {
        let mut clock = FrameClock::default();
        clock.schedule(MOVIE_TICK_MS, 10_000.0);
        assert!(close(clock.carried_drift_ms(), -MAX_CARRIED_DRIFT_MS));
    }

    #[test]
    fn test_sleep_is_capped_at_one_interval() {
        let mut clock = FrameClock::default();
        assert!(close(clock.schedule(MOVIE_TICK_MS, -50.0), MOVIE_TICK_MS));
    }

    #[test]
    fn test_pacer_measures_work_since_last_wake() {
        let clock = ScriptedClock::default();
        let mut pacer = FramePacer::new(clock.clone(), false);

        clock.advance(4.0);
        let slept = pacer.wait_next_frame(TickMode::Gameplay);
        assert!(close(slept, GAME_TICK_MS - 4.0));
        assert!(close(clock.now(), GAME_TICK_MS));

        clock.advance(MOVIE_TICK_MS + 5.0);
        assert!(close(pacer.wait_next_frame(TickMode::Movie), 0.0));
        assert!(close(pacer.frame_clock().carried_drift_ms(), -5.0));
        assert_eq!(clock.sleeps(), [GAME_TICK_MS - 4.0]);
    }

    #[test]
    fn test_steady_state_hits_target_rate() {
        let clock = ScriptedClock::default();
        let mut pacer = FramePacer::new(clock.clone(), false);
        for _ in 0..70 {
            clock.advance(3.0);
            pacer.wait_next_frame(TickMode::Gameplay);
        }
        assert!(close(clock.now(), 1000.0));
    }

    #[test]
    fn test_nosync_never_waits() {
        let clock = ScriptedClock::default();
        let mut pacer = FramePacer::new(clock.clone(), true);
        clock.advance(1.0);
        assert_eq!(pacer.wait_next_frame(TickMode::Gameplay), 0.0);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn test_resume_forgets_the_stall() {
        let clock = ScriptedClock::default();
        let mut pacer = FramePacer::new(clock.clone(), false);
        clock.advance(5_000.0);
        pacer.resume();
        clock.advance(1.0);
        assert!(close(pacer.next_delay(TickMode::Gameplay), GAME_TICK_MS - 1.0));
    }
}
