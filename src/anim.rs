use std::time::Duration;

use glam::IVec2;
use instant::Instant;

use crate::pet::PetState;
use crate::sched::{Scheduler, TimerId, TimerToken};

/// Frames in a full turn-around jump.
pub const TURN_FRAMES: u32 = 16;
/// Peak jump height in pixels during the turn.
const TURN_JUMP_HEIGHT: f64 = 50.0;
/// Height of the small landing bounce at the end of the turn.
const TURN_LANDING_HEIGHT: f64 = 10.0;
/// Delay before the pet turns back around on its own.
pub const TURN_BACK_DELAY: Duration = Duration::from_millis(3000);

/// Frames in a full sway.
pub const SWAY_FRAMES: u32 = 40;
/// Peak horizontal sway displacement in pixels.
const SWAY_AMPLITUDE: f64 = 15.0;

/// Which scripted animation is (or was) running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimKind {
    TurnAround,
    Sway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Turning { frame: u32 },
    Swaying { frame: u32 },
}

/// Frame-stepped procedural animation engine.
///
/// Exactly one animation runs at a time. User start requests are dropped
/// while another run is active; the scheduled turn-back instead preempts a
/// sway in flight. While idle the offset is pinned at (0, 0).
pub struct AnimationEngine {
    phase: Phase,
    offset: IVec2,
    turn_back_timer: Option<TimerId>,
}

impl AnimationEngine {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            offset: IVec2::ZERO,
            turn_back_timer: None,
        }
    }

    pub fn is_animating(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Current window displacement. (0, 0) whenever idle.
    pub fn offset(&self) -> IVec2 {
        self.offset
    }

    /// Begin a turn-around jump. Dropped unless idle.
    /// Cancels a pending automatic turn-back so the facing cannot double-toggle.
    pub fn start_turn(&mut self, sched: &mut Scheduler) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }
        if let Some(id) = self.turn_back_timer.take() {
            sched.cancel(id);
        }
        self.phase = Phase::Turning { frame: 0 };
        true
    }

    /// Begin a sway. Dropped unless idle.
    pub fn start_sway(&mut self) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }
        self.phase = Phase::Swaying { frame: 0 };
        true
    }

    /// Begin the scheduled return to the front. Unlike `start_turn` this
    /// preempts a sway in flight, abandoning it; only a turn already
    /// running blocks it.
    pub fn turn_back(&mut self, sched: &mut Scheduler) -> bool {
        if matches!(self.phase, Phase::Turning { .. }) {
            return false;
        }
        if let Some(id) = self.turn_back_timer.take() {
            sched.cancel(id);
        }
        self.offset = IVec2::ZERO;
        self.phase = Phase::Turning { frame: 0 };
        true
    }

    /// Advance one animation frame.
    ///
    /// On the completion frame the offset returns to zero and, for a turn,
    /// `facing` toggles; a turn that leaves the pet facing away arms the
    /// automatic turn-back one-shot. Returns the kind that completed.
    pub fn step(
        &mut self,
        facing: &mut PetState,
        sched: &mut Scheduler,
        now: Instant,
    ) -> Option<AnimKind> {
        match self.phase {
            Phase::Idle => None,
            Phase::Turning { frame } => {
                let frame = frame + 1;
                if frame >= TURN_FRAMES {
                    self.phase = Phase::Idle;
                    self.offset = IVec2::ZERO;
                    *facing = facing.turned();
                    if facing.is_back() {
                        self.turn_back_timer =
                            Some(sched.schedule_once(now, TURN_BACK_DELAY, TimerToken::TurnBack));
                    }
                    Some(AnimKind::TurnAround)
                } else {
                    let progress = f64::from(frame) / f64::from(TURN_FRAMES);
                    self.phase = Phase::Turning { frame };
                    self.offset = IVec2::new(0, -(turn_height(progress) as i32));
                    None
                }
            }
            Phase::Swaying { frame } => {
                let frame = frame + 1;
                if frame >= SWAY_FRAMES {
                    self.phase = Phase::Idle;
                    self.offset = IVec2::ZERO;
                    Some(AnimKind::Sway)
                } else {
                    let progress = f64::from(frame) / f64::from(SWAY_FRAMES);
                    self.phase = Phase::Swaying { frame };
                    self.offset = IVec2::new(sway_offset(progress) as i32, 0);
                    None
                }
            }
        }
    }

    /// Force idle: zero the offset immediately and drop the turn-back timer.
    /// Used on teardown; no easing, no facing change.
    pub fn stop_all(&mut self, sched: &mut Scheduler) {
        self.phase = Phase::Idle;
        self.offset = IVec2::ZERO;
        if let Some(id) = self.turn_back_timer.take() {
            sched.cancel(id);
        }
    }

    /// Cancel any timer this engine owns.
    pub fn shutdown(&mut self, sched: &mut Scheduler) {
        self.stop_all(sched);
    }
}

/// Jump height for the turn-around at `progress` in [0, 1].
///
/// Three phases: quadratic ease-out rise to the peak, quadratic fall back
/// down, then a small linear settle that lands at exactly zero.
fn turn_height(progress: f64) -> f64 {
    if progress < 0.3 {
        let t = 1.0 - progress / 0.3;
        TURN_JUMP_HEIGHT * (1.0 - t * t)
    } else if progress < 0.7 {
        let t = (progress - 0.3) / 0.4;
        TURN_JUMP_HEIGHT * (1.0 - t * t)
    } else {
        let t = (progress - 0.7) / 0.3;
        TURN_LANDING_HEIGHT * (1.0 - t)
    }
}

/// Horizontal sway displacement at `progress` in [0, 1]: two full sine
/// oscillations, zero at both ends.
fn sway_offset(progress: f64) -> f64 {
    SWAY_AMPLITUDE * (progress * 4.0 * std::f64::consts::PI).sin()
}
