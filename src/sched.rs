use std::time::Duration;

use instant::Instant;

/// Max accumulated time before a ticker clamps (prevents spiral of death).
const MAX_ACCUMULATOR: f64 = 0.25;

/// Fixed-cadence tick accumulator.
///
/// Feed it frame deltas; it answers how many fixed-period ticks are due.
/// A long stall is clamped so a hitch cannot produce a tick burst.
pub struct Ticker {
    period: f64,
    acc: f64,
}

impl Ticker {
    pub fn new(period: f64) -> Self {
        Self { period, acc: 0.0 }
    }

    /// Accumulate `dt` seconds and drain the due tick count.
    pub fn advance(&mut self, dt: f64) -> u32 {
        self.acc += dt;
        if self.acc > MAX_ACCUMULATOR {
            self.acc = MAX_ACCUMULATOR;
        }

        let mut ticks = 0;
        while self.acc >= self.period {
            self.acc -= self.period;
            ticks += 1;
        }
        ticks
    }
}

// ---------------------------------------------------------------------------
// One-shot timers
// ---------------------------------------------------------------------------

/// What a one-shot timer means when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerToken {
    /// Automatic turn back to front after the pet was left facing away.
    TurnBack,
    /// Speech bubble display time elapsed.
    HideBubble,
    /// Click burst idle timeout.
    ResetClicks,
}

/// Handle to a scheduled one-shot, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(u64);

struct Entry {
    id: TimerId,
    due: Instant,
    token: TimerToken,
}

/// One-shot timer scheduler.
///
/// Owned by the app and passed into components; each component keeps the
/// `TimerId`s it created and cancels them itself on shutdown. `tick` delivers
/// due tokens in schedule order (earliest due first, insertion order on ties).
pub struct Scheduler {
    entries: Vec<Entry>,
    next_id: u64,
    due_buf: Vec<TimerToken>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(8),
            next_id: 0,
            due_buf: Vec::with_capacity(8),
        }
    }

    /// Arm a one-shot that fires `delay` after `now`.
    pub fn schedule_once(&mut self, now: Instant, delay: Duration, token: TimerToken) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            due: now + delay,
            token,
        });
        id
    }

    /// Cancel a pending one-shot. Returns false if it already fired or was
    /// cancelled before.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    /// Collect every timer due at `now`. Each fires exactly once.
    pub fn tick(&mut self, now: Instant) -> &[TimerToken] {
        self.due_buf.clear();

        if self.entries.iter().any(|e| e.due <= now) {
            // Entries are pushed in creation order; a stable sort by due time
            // keeps insertion order for identical deadlines.
            let mut due: Vec<Entry> = Vec::new();
            let mut i = 0;
            while i < self.entries.len() {
                if self.entries[i].due <= now {
                    due.push(self.entries.remove(i));
                } else {
                    i += 1;
                }
            }
            due.sort_by_key(|e| (e.due, e.id.0));
            self.due_buf.extend(due.iter().map(|e| e.token));
        }

        &self.due_buf
    }

    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_drains_whole_periods() {
        let mut t = Ticker::new(0.033);
        assert_eq!(t.advance(0.010), 0);
        assert_eq!(t.advance(0.030), 1);
        assert_eq!(t.advance(0.070), 2);
    }

    #[test]
    fn ticker_clamps_long_stall() {
        let mut t = Ticker::new(1.0 / 60.0);
        // A 10s stall must not produce 600 catch-up ticks.
        let ticks = t.advance(10.0);
        assert!(ticks as f64 <= MAX_ACCUMULATOR / (1.0 / 60.0) + 1.0);
    }

    #[test]
    fn due_timer_fires_once() {
        let mut s = Scheduler::new();
        let t0 = Instant::now();
        s.schedule_once(t0, Duration::from_millis(100), TimerToken::HideBubble);

        assert!(s.tick(t0 + Duration::from_millis(50)).is_empty());

        let due = s.tick(t0 + Duration::from_millis(150));
        assert_eq!(due, &[TimerToken::HideBubble]);

        // Already delivered.
        assert!(s.tick(t0 + Duration::from_millis(500)).is_empty());
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let mut s = Scheduler::new();
        let t0 = Instant::now();
        let id = s.schedule_once(t0, Duration::from_millis(100), TimerToken::TurnBack);
        assert_eq!(s.pending_count(), 1);

        assert!(s.cancel(id));
        assert!(!s.cancel(id));
        assert_eq!(s.pending_count(), 0);

        assert!(s.tick(t0 + Duration::from_secs(10)).is_empty());
    }

    #[test]
    fn due_timers_fire_in_schedule_order() {
        let mut s = Scheduler::new();
        let t0 = Instant::now();
        s.schedule_once(t0, Duration::from_millis(300), TimerToken::TurnBack);
        s.schedule_once(t0, Duration::from_millis(100), TimerToken::HideBubble);
        s.schedule_once(t0, Duration::from_millis(200), TimerToken::ResetClicks);

        let due = s.tick(t0 + Duration::from_millis(400));
        assert_eq!(
            due,
            &[
                TimerToken::HideBubble,
                TimerToken::ResetClicks,
                TimerToken::TurnBack,
            ]
        );
    }

    #[test]
    fn rearming_replaces_old_deadline() {
        let mut s = Scheduler::new();
        let t0 = Instant::now();
        let first = s.schedule_once(t0, Duration::from_millis(100), TimerToken::ResetClicks);
        s.cancel(first);
        s.schedule_once(
            t0 + Duration::from_millis(80),
            Duration::from_millis(100),
            TimerToken::ResetClicks,
        );

        // The original deadline passes without a delivery.
        assert!(s.tick(t0 + Duration::from_millis(120)).is_empty());
        assert_eq!(
            s.tick(t0 + Duration::from_millis(200)),
            &[TimerToken::ResetClicks]
        );
    }
}
