use glam::IVec2;

use crate::pet::WINDOW_SIZE;

/// Manhattan-distance cursor movement below this is treated as jitter.
const MOVEMENT_THRESHOLD: i32 = 10;
/// Where the window sits relative to the cursor once caught up.
const FOLLOW_OFFSET: IVec2 = IVec2::new(30, 30);
/// Margin kept between the window and the screen edge while following.
const FOLLOW_MARGIN: i32 = 50;
/// Distance tiers for easing selection (pixels to target).
const NEAR_DISTANCE: f64 = 100.0;
const FAR_DISTANCE: f64 = 300.0;
/// Easing factors per tier: close pets catch up faster.
const EASE_NEAR: f64 = 0.05;
const EASE_MID: f64 = 0.03;
const EASE_FAR: f64 = 0.02;

/// Screen (or virtual desktop) bounds in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl ScreenRect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
}

fn clamp_axis(v: i32, lo: i32, hi: i32) -> i32 {
    v.clamp(lo, hi.max(lo))
}

/// Cursor-follow controller.
///
/// Decides, once per motion tick, whether and where to move the pet window.
/// Holds only its own reference state; drag and animation activity are passed
/// in by the caller each tick.
pub struct FollowController {
    enabled: bool,
    last_cursor: Option<IVec2>,
    offset: IVec2,
}

impl FollowController {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            last_cursor: None,
            offset: FOLLOW_OFFSET,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable following. Disabling clears the cursor reference so
    /// re-enabling starts with a record-only tick instead of a jump.
    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.last_cursor = None;
        }
        self.enabled = enabled;
    }

    /// The cursor moved back over the pet's own window; drop the reference
    /// point so leaving again starts fresh.
    pub fn cursor_entered_window(&mut self) {
        self.last_cursor = None;
    }

    /// One motion tick. Returns the new window base position, or None when
    /// nothing should move this tick.
    pub fn update(
        &mut self,
        cursor: IVec2,
        window_pos: IVec2,
        screen: ScreenRect,
        dragging: bool,
        animating: bool,
    ) -> Option<IVec2> {
        // Disabled follow dropped its reference in set_enabled; a drag ends
        // with the cursor over the window, which clears it below.
        if !self.enabled || dragging {
            return None;
        }

        // A scripted animation owns the window position right now.
        if animating {
            return None;
        }

        // Cursor over the pet itself: petting, not leading.
        if inside_window(cursor, window_pos) {
            self.last_cursor = None;
            return None;
        }

        let Some(last) = self.last_cursor else {
            self.last_cursor = Some(cursor);
            return None;
        };

        // Jitter gate: leave the reference untouched so slow drift
        // accumulates until it crosses the threshold.
        let jitter = (cursor.x - last.x).abs() + (cursor.y - last.y).abs();
        if jitter < MOVEMENT_THRESHOLD {
            return None;
        }

        // Target beside the cursor, kept a margin inside the screen.
        let raw_target = cursor + self.offset;
        let target = IVec2::new(
            clamp_axis(
                raw_target.x,
                screen.x + FOLLOW_MARGIN,
                screen.x + screen.w - WINDOW_SIZE - FOLLOW_MARGIN,
            ),
            clamp_axis(
                raw_target.y,
                screen.y + FOLLOW_MARGIN,
                screen.y + screen.h - WINDOW_SIZE - FOLLOW_MARGIN,
            ),
        );

        let dx = f64::from(target.x - window_pos.x);
        let dy = f64::from(target.y - window_pos.y);
        let distance = (dx * dx + dy * dy).sqrt();

        let ease = if distance < NEAR_DISTANCE {
            EASE_NEAR
        } else if distance < FAR_DISTANCE {
            EASE_MID
        } else {
            EASE_FAR
        };

        let stepped = IVec2::new(
            window_pos.x + (dx * ease) as i32,
            window_pos.y + (dy * ease) as i32,
        );

        // Hard safety clamp to plain screen bounds.
        let new_pos = IVec2::new(
            clamp_axis(stepped.x, screen.x, screen.x + screen.w - WINDOW_SIZE),
            clamp_axis(stepped.y, screen.y, screen.y + screen.h - WINDOW_SIZE),
        );

        self.last_cursor = Some(cursor);

        if new_pos != window_pos {
            Some(new_pos)
        } else {
            None
        }
    }
}

fn inside_window(cursor: IVec2, window_pos: IVec2) -> bool {
    cursor.x >= window_pos.x
        && cursor.x < window_pos.x + WINDOW_SIZE
        && cursor.y >= window_pos.y
        && cursor.y < window_pos.y + WINDOW_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: ScreenRect = ScreenRect {
        x: 0,
        y: 0,
        w: 1920,
        h: 1080,
    };

    /// Prime the controller's cursor reference without moving anything.
    fn primed(cursor: IVec2) -> FollowController {
        let mut f = FollowController::new(true);
        assert_eq!(
            f.update(cursor, IVec2::new(500, 500), SCREEN, false, false),
            None
        );
        f
    }

    #[test]
    fn first_observation_is_record_only() {
        let mut f = FollowController::new(true);
        // Far cursor, but no reference yet: must not jump.
        assert_eq!(
            f.update(IVec2::new(1800, 900), IVec2::new(100, 100), SCREEN, false, false),
            None
        );
        // Second tick has a reference and moves.
        assert!(f
            .update(IVec2::new(1820, 920), IVec2::new(100, 100), SCREEN, false, false)
            .is_some());
    }

    #[test]
    fn sub_threshold_delta_never_moves() {
        let start = IVec2::new(1000, 200);
        let mut f = primed(start);
        // 4 + 5 = 9 Manhattan, under the threshold.
        assert_eq!(
            f.update(start + IVec2::new(4, 5), IVec2::new(500, 500), SCREEN, false, false),
            None
        );
        // The reference was not advanced, so drift accumulates: another
        // +4/+5 crosses the threshold measured from the original point.
        assert!(f
            .update(start + IVec2::new(8, 10), IVec2::new(500, 500), SCREEN, false, false)
            .is_some());
    }

    #[test]
    fn far_tier_eases_at_two_percent() {
        let mut f = primed(IVec2::new(1500, 100));
        let window = IVec2::new(100, 800);
        // Target = (1430, 150), unclamped; distance is far beyond 300, so
        // the step is trunc(delta * 0.02) per axis.
        let cursor = IVec2::new(1400, 120);
        assert_eq!(
            f.update(cursor, window, SCREEN, false, false),
            Some(IVec2::new(100 + 26, 800 - 13)) // trunc(1330*0.02), trunc(-650*0.02)
        );
    }

    #[test]
    fn near_tier_eases_at_five_percent() {
        let mut f = primed(IVec2::new(400, 480));
        let window = IVec2::new(500, 500);
        // Cursor left of the window: target = (460, 510), ~41px away.
        let cursor = IVec2::new(430, 480);
        assert_eq!(
            f.update(cursor, window, SCREEN, false, false),
            Some(IVec2::new(498, 500)) // trunc(-40*0.05) = -2, trunc(10*0.05) = 0
        );
    }

    #[test]
    fn proposals_stay_inside_margin_for_offscreen_cursor() {
        let mut f = primed(IVec2::new(500, 500));
        let mut window = IVec2::new(900, 500);

        // Cursor far beyond the right edge; walk many ticks and move the
        // cursor a little each time to defeat the jitter gate.
        for i in 0..400 {
            let cursor = IVec2::new(5000 + (i % 2) * 20, 540 + (i % 2) * 20);
            if let Some(p) = f.update(cursor, window, SCREEN, false, false) {
                window = p;
            }
            assert!(window.x + WINDOW_SIZE <= SCREEN.w - FOLLOW_MARGIN);
            assert!(window.y + WINDOW_SIZE <= SCREEN.h - FOLLOW_MARGIN);
            assert!(window.x >= FOLLOW_MARGIN);
            assert!(window.y >= FOLLOW_MARGIN);
        }
        // It actually converged toward the clamped target.
        assert!(window.x > 1000);
    }

    #[test]
    fn guards_suppress_movement() {
        let cursor = IVec2::new(1200, 300);
        let window = IVec2::new(200, 200);

        let mut f = primed(IVec2::new(1000, 1000));
        assert_eq!(f.update(cursor, window, SCREEN, true, false), None); // dragging
        assert_eq!(f.update(cursor, window, SCREEN, false, true), None); // animating

        let mut off = FollowController::new(false);
        assert_eq!(off.update(cursor, window, SCREEN, false, false), None);
    }

    #[test]
    fn disable_then_reenable_does_not_jump() {
        let mut f = primed(IVec2::new(300, 300));
        f.set_enabled(false);

        // Disabled ticks do nothing.
        assert_eq!(
            f.update(IVec2::new(1700, 900), IVec2::new(100, 100), SCREEN, false, false),
            None
        );

        f.set_enabled(true);
        // set_enabled(false) dropped the reference; the first tick after
        // re-enable records only, even though the cursor moved a lot.
        assert_eq!(
            f.update(IVec2::new(900, 900), IVec2::new(100, 100), SCREEN, false, false),
            None
        );
        assert!(f
            .update(IVec2::new(940, 940), IVec2::new(100, 100), SCREEN, false, false)
            .is_some());
    }

    #[test]
    fn cursor_over_pet_clears_reference() {
        let window = IVec2::new(500, 500);
        let mut f = primed(IVec2::new(100, 100));

        // Inside the 400x400 window rect.
        assert_eq!(f.update(IVec2::new(600, 600), window, SCREEN, false, false), None);

        // Leaving again: first outside tick is record-only.
        assert_eq!(f.update(IVec2::new(1500, 300), window, SCREEN, false, false), None);
        assert!(f
            .update(IVec2::new(1540, 340), window, SCREEN, false, false)
            .is_some());
    }

    #[test]
    fn settled_pet_does_not_crawl() {
        // Window already exactly at the clamped target: step is zero.
        let cursor = IVec2::new(800, 400);
        let window = cursor + IVec2::new(30, 30);
        let mut f = primed(cursor - IVec2::new(40, 0));
        assert_eq!(f.update(cursor, window, SCREEN, false, false), None);
    }
}
