use std::time::Duration;

use instant::Instant;

use crate::sched::{Scheduler, TimerId, TimerToken};

/// How long a greeting stays on screen.
pub const BUBBLE_DURATION: Duration = Duration::from_millis(2000);

/// Speech bubble above the pet. At most one bubble is visible; showing a new
/// one replaces the text and restarts the hide countdown.
#[derive(Default)]
pub struct Bubble {
    text: Option<String>,
    hide_timer: Option<TimerId>,
}

impl Bubble {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn show(&mut self, text: String, duration: Duration, sched: &mut Scheduler, now: Instant) {
        log::debug!("Bubble: {text}");
        self.text = Some(text);
        if let Some(id) = self.hide_timer.take() {
            sched.cancel(id);
        }
        self.hide_timer = Some(sched.schedule_once(now, duration, TimerToken::HideBubble));
    }

    /// Handle a fired hide timer. Returns true if a bubble was dismissed.
    pub fn on_hide_timer(&mut self) -> bool {
        self.hide_timer = None;
        self.text.take().is_some()
    }

    pub fn shutdown(&mut self, sched: &mut Scheduler) {
        if let Some(id) = self.hide_timer.take() {
            sched.cancel(id);
        }
        self.text = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_sets_text_and_arms_hide_timer() {
        let mut sched = Scheduler::new();
        let mut bubble = Bubble::new();
        let t0 = Instant::now();

        assert!(bubble.text().is_none());
        bubble.show("Hi!".to_string(), BUBBLE_DURATION, &mut sched, t0);
        assert_eq!(bubble.text(), Some("Hi!"));

        assert!(sched.tick(t0 + Duration::from_millis(1999)).is_empty());
        assert_eq!(
            sched.tick(t0 + Duration::from_millis(2001)),
            &[TimerToken::HideBubble]
        );
        assert!(bubble.on_hide_timer());
        assert!(bubble.text().is_none());
    }

    #[test]
    fn reshow_replaces_text_and_restarts_countdown() {
        let mut sched = Scheduler::new();
        let mut bubble = Bubble::new();
        let t0 = Instant::now();

        bubble.show("first".to_string(), BUBBLE_DURATION, &mut sched, t0);
        let t1 = t0 + Duration::from_millis(1500);
        bubble.show("second".to_string(), BUBBLE_DURATION, &mut sched, t1);
        assert_eq!(bubble.text(), Some("second"));

        // The original deadline passes without firing; only the new one fires.
        assert!(sched.tick(t0 + Duration::from_millis(2100)).is_empty());
        assert_eq!(
            sched.tick(t1 + Duration::from_millis(2100)),
            &[TimerToken::HideBubble]
        );
        assert_eq!(sched.pending_count(), 0);
    }

    #[test]
    fn hide_timer_on_empty_bubble_reports_nothing_dismissed() {
        let mut bubble = Bubble::new();
        assert!(!bubble.on_hide_timer());
    }

    #[test]
    fn shutdown_cancels_timer_and_clears_text() {
        let mut sched = Scheduler::new();
        let mut bubble = Bubble::new();
        let t0 = Instant::now();

        bubble.show("bye".to_string(), BUBBLE_DURATION, &mut sched, t0);
        bubble.shutdown(&mut sched);
        assert!(bubble.text().is_none());
        assert_eq!(sched.pending_count(), 0);
        assert!(sched.tick(t0 + Duration::from_millis(4000)).is_empty());
    }
}
