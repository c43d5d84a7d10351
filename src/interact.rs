use std::time::Duration;

use instant::Instant;

use crate::sched::{Scheduler, TimerId, TimerToken};

/// Presses closer together than this continue a burst; the same window
/// doubles as the double-click window.
const DOUBLE_CLICK_WINDOW: f64 = 0.5;
/// Idle time after which an unfinished burst is forgotten.
const BURST_RESET_DELAY: Duration = Duration::from_millis(1500);
/// Presses in one burst that trigger a turn-around.
const BURST_TURN_COUNT: u32 = 3;

/// Burst-derived action for a single press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    /// Plain press (or second of a pair): greet with a speech bubble.
    Greet,
    /// The burst reached the trigger count: request a turn-around.
    TurnAround,
}

/// Everything one press resolves to. The burst action dispatches first;
/// `sway` rides along when the press also completed a double-click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickOutcome {
    pub action: ClickAction,
    pub sway: bool,
}

/// Classifies raw presses into greet / turn-around / sway requests and owns
/// the click-burst counter.
///
/// The burst state (count + its own timestamp) is destroyed when the trigger
/// fires or the idle reset elapses; the double-click reference timestamp is
/// independent and survives both, mirroring how a toolkit-level double-click
/// keeps firing on quick presses after a burst was consumed.
pub struct InteractionState {
    burst_count: u32,
    burst_last: Option<Instant>,
    last_press: Option<Instant>,
    reset_timer: Option<TimerId>,
    /// Pointer is moving with the button held; suspends follow.
    pub dragging: bool,
}

impl InteractionState {
    pub fn new() -> Self {
        Self {
            burst_count: 0,
            burst_last: None,
            last_press: None,
            reset_timer: None,
            dragging: false,
        }
    }

    /// Feed one primary-button press. Updates all counters before the caller
    /// dispatches anything, so a failing handler cannot corrupt burst state.
    pub fn on_press(&mut self, now: Instant, sched: &mut Scheduler) -> ClickOutcome {
        let within = |t: &Option<Instant>| {
            matches!(t, Some(prev) if now.duration_since(*prev).as_secs_f64() < DOUBLE_CLICK_WINDOW)
        };

        let double = within(&self.last_press);

        self.burst_count = if within(&self.burst_last) {
            self.burst_count + 1
        } else {
            1
        };
        self.burst_last = Some(now);
        self.last_press = Some(now);

        // Every press restarts the idle reset.
        if let Some(id) = self.reset_timer.take() {
            sched.cancel(id);
        }
        self.reset_timer = Some(sched.schedule_once(now, BURST_RESET_DELAY, TimerToken::ResetClicks));

        let action = if self.burst_count >= BURST_TURN_COUNT {
            self.burst_count = 0;
            self.burst_last = None;
            ClickAction::TurnAround
        } else {
            ClickAction::Greet
        };

        ClickOutcome { action, sway: double }
    }

    /// The idle-reset one-shot fired: forget the burst entirely.
    pub fn on_reset_timer(&mut self) {
        self.burst_count = 0;
        self.burst_last = None;
        self.reset_timer = None;
    }

    /// Cancel the idle-reset timer this component owns.
    pub fn shutdown(&mut self, sched: &mut Scheduler) {
        if let Some(id) = self.reset_timer.take() {
            sched.cancel(id);
        }
        self.burst_count = 0;
        self.burst_last = None;
        self.dragging = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> (InteractionState, Scheduler, Instant) {
        (InteractionState::new(), Scheduler::new(), Instant::now())
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn single_press_greets() {
        let (mut it, mut sched, t0) = ctx();
        let out = it.on_press(t0, &mut sched);
        assert_eq!(out.action, ClickAction::Greet);
        assert!(!out.sway);
        assert_eq!(it.burst_count, 1);
    }

    #[test]
    fn second_quick_press_greets_and_sways() {
        let (mut it, mut sched, t0) = ctx();
        it.on_press(t0, &mut sched);
        let out = it.on_press(t0 + ms(200), &mut sched);
        assert_eq!(out.action, ClickAction::Greet);
        assert!(out.sway);
        assert_eq!(it.burst_count, 2);
    }

    #[test]
    fn third_quick_press_turns_around_once_and_resets() {
        let (mut it, mut sched, t0) = ctx();
        it.on_press(t0, &mut sched);
        it.on_press(t0 + ms(200), &mut sched);
        let out = it.on_press(t0 + ms(400), &mut sched);
        assert_eq!(out.action, ClickAction::TurnAround);
        assert_eq!(it.burst_count, 0);

        // A quick fourth press starts a new burst at 1, inheriting nothing.
        let out = it.on_press(t0 + ms(600), &mut sched);
        assert_eq!(out.action, ClickAction::Greet);
        assert_eq!(it.burst_count, 1);
        // But it is still a double-click at the input level.
        assert!(out.sway);
    }

    #[test]
    fn slow_presses_never_build_a_burst() {
        let (mut it, mut sched, t0) = ctx();
        for i in 0..5 {
            let out = it.on_press(t0 + ms(i * 700), &mut sched);
            assert_eq!(out.action, ClickAction::Greet);
            assert!(!out.sway);
            assert_eq!(it.burst_count, 1);
        }
    }

    #[test]
    fn idle_reset_timer_restarts_on_every_press() {
        let (mut it, mut sched, t0) = ctx();
        it.on_press(t0, &mut sched);
        it.on_press(t0 + ms(400), &mut sched);
        assert_eq!(it.burst_count, 2);

        // 1500ms measured from the first press has passed, but the timer was
        // rearmed by the second press, so nothing fires yet.
        assert!(sched.tick(t0 + ms(1600)).is_empty());

        // It fires 1500ms after the second press.
        assert_eq!(
            sched.tick(t0 + ms(1900)),
            &[TimerToken::ResetClicks]
        );
        it.on_reset_timer();
        assert_eq!(it.burst_count, 0);

        // The press after the reset starts a fresh burst.
        let out = it.on_press(t0 + ms(2000), &mut sched);
        assert_eq!(out.action, ClickAction::Greet);
        assert_eq!(it.burst_count, 1);
    }

    #[test]
    fn burst_continues_across_presses_up_to_trigger() {
        let (mut it, mut sched, t0) = ctx();
        // Press 1 and 2 quick, pause 0.6s (burst breaks), then 3 more quick.
        it.on_press(t0, &mut sched);
        it.on_press(t0 + ms(300), &mut sched);
        it.on_press(t0 + ms(900), &mut sched);
        assert_eq!(it.burst_count, 1);
        it.on_press(t0 + ms(1100), &mut sched);
        assert_eq!(it.burst_count, 2);
        let out = it.on_press(t0 + ms(1300), &mut sched);
        assert_eq!(out.action, ClickAction::TurnAround);
    }

    #[test]
    fn shutdown_cancels_owned_timer() {
        let (mut it, mut sched, t0) = ctx();
        it.on_press(t0, &mut sched);
        assert_eq!(sched.pending_count(), 1);
        it.shutdown(&mut sched);
        assert_eq!(sched.pending_count(), 0);
        assert!(sched.tick(t0 + ms(5000)).is_empty());
    }
}
