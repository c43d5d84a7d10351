//! Procedural pet sprite. Everything is painted from primitives so the
//! binary ships without image assets; the layered ellipses fake a radial
//! gradient well enough at 200px.

use egui::epaint::EllipseShape;
use egui::{Color32, Painter, Pos2, Shape, Stroke, pos2, vec2};

use crate::pet::PetState;

const BODY_LIGHT: Color32 = Color32::from_rgb(140, 220, 120);
const BODY: Color32 = Color32::from_rgb(80, 180, 80);
const BODY_DARK: Color32 = Color32::from_rgb(50, 140, 50);
const EYE: Color32 = Color32::from_rgb(200, 50, 50);
const SHADOW: Color32 = Color32::from_rgba_premultiplied(0, 0, 0, 50);

fn blush() -> Color32 {
    Color32::from_rgba_unmultiplied(255, 150, 150, 80)
}

/// Paint the pet centered on `center`, `size` points tall.
pub fn draw_pet(painter: &Painter, center: Pos2, size: f32, state: PetState) {
    let r = size * 0.35;

    // Ground shadow under the body, unaffected by facing.
    painter.add(EllipseShape::filled(
        center + vec2(0.0, r * 0.95),
        vec2(r * 0.9, r * 0.22),
        SHADOW,
    ));

    // Body: three offset layers, dark to light toward the upper left.
    painter.add(EllipseShape::filled(center, vec2(r, r * 0.92), BODY_DARK));
    painter.add(EllipseShape::filled(
        center + vec2(-r * 0.06, -r * 0.06),
        vec2(r * 0.92, r * 0.84),
        BODY,
    ));
    painter.add(EllipseShape::filled(
        center + vec2(-r * 0.22, -r * 0.26),
        vec2(r * 0.5, r * 0.42),
        BODY_LIGHT,
    ));

    match state {
        PetState::Back => draw_back(painter, center, r),
        PetState::Normal => draw_face(painter, center, r, Mood::Calm),
        PetState::Happy => draw_face(painter, center, r, Mood::Smiling),
        PetState::Excited => draw_face(painter, center, r, Mood::Wide),
        PetState::Sleeping => draw_sleeping_face(painter, center, r),
    }
}

enum Mood {
    Calm,
    Smiling,
    Wide,
}

fn draw_face(painter: &Painter, center: Pos2, r: f32, mood: Mood) {
    let eye_y = center.y - r * 0.15;
    let eye_dx = r * 0.38;
    let eye_r = match mood {
        Mood::Wide => r * 0.16,
        _ => r * 0.13,
    };

    for side in [-1.0, 1.0] {
        let eye = pos2(center.x + side * eye_dx, eye_y);
        painter.add(EllipseShape::filled(eye, vec2(eye_r * 0.8, eye_r), EYE));
        // Glint in the upper corner keeps the eyes from reading as flat dots.
        painter.circle_filled(
            eye + vec2(-eye_r * 0.25, -eye_r * 0.35),
            eye_r * 0.28,
            Color32::from_rgba_unmultiplied(255, 255, 255, 200),
        );
    }

    painter.circle_filled(pos2(center.x - r * 0.58, center.y + r * 0.12), r * 0.14, blush());
    painter.circle_filled(pos2(center.x + r * 0.58, center.y + r * 0.12), r * 0.14, blush());

    let upturn = match mood {
        Mood::Calm => r * 0.08,
        Mood::Smiling | Mood::Wide => r * 0.16,
    };
    painter.add(Shape::line(
        mouth_points(pos2(center.x, center.y + r * 0.28), r * 0.22, upturn),
        Stroke::new(r * 0.04, BODY_DARK),
    ));
}

/// Turned away: no face, just a seam hinting at the back of the head.
fn draw_back(painter: &Painter, center: Pos2, r: f32) {
    painter.add(Shape::line(
        mouth_points(pos2(center.x, center.y - r * 0.35), r * 0.3, -r * 0.12),
        Stroke::new(r * 0.03, BODY_DARK),
    ));
}

fn draw_sleeping_face(painter: &Painter, center: Pos2, r: f32) {
    let eye_y = center.y - r * 0.12;
    let eye_dx = r * 0.38;
    for side in [-1.0f32, 1.0] {
        let x = center.x + side * eye_dx;
        painter.line_segment(
            [pos2(x - r * 0.12, eye_y), pos2(x + r * 0.12, eye_y)],
            Stroke::new(r * 0.04, EYE),
        );
    }
    painter.add(Shape::line(
        mouth_points(pos2(center.x, center.y + r * 0.28), r * 0.12, r * 0.04),
        Stroke::new(r * 0.04, BODY_DARK),
    ));
}

/// Sampled arc through (−w, 0), (0, upturn), (w, 0) relative to `at`.
fn mouth_points(at: Pos2, half_width: f32, upturn: f32) -> Vec<Pos2> {
    const SEGMENTS: usize = 12;
    (0..=SEGMENTS)
        .map(|i| {
            let t = i as f32 / SEGMENTS as f32 * 2.0 - 1.0;
            pos2(at.x + t * half_width, at.y + upturn * (1.0 - t * t))
        })
        .collect()
}
