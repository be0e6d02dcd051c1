use crate::{Point, Stroke};

pub const FALLBACK_COLOR: &str = "#1f1f1f";
pub const MAX_COLOR_LEN: usize = 32;
pub const MAX_ID_LEN: usize = 64;
pub const MIN_STROKE_WIDTH: f64 = 1.0;
pub const MAX_STROKE_WIDTH: f64 = 60.0;
/// Points kept per stroke; anything beyond is dropped.
pub const MAX_POINTS_PER_STROKE: usize = 5000;

pub fn normalize_point(point: Point) -> Option<Point> {
    if !point.is_finite() {
        return None;
    }
    Some(point)
}

pub fn sanitize_color(mut color: String) -> String {
    if color.is_empty() {
        return FALLBACK_COLOR.to_string();
    }
    if color.len() > MAX_COLOR_LEN {
        let mut end = MAX_COLOR_LEN;
        while !color.is_char_boundary(end) {
            end -= 1;
        }
        color.truncate(end);
    }
    color
}

pub fn sanitize_width(width: f64) -> f64 {
    let width = if width.is_finite() {
        width
    } else {
        crate::DEFAULT_STROKE_WIDTH
    };
    width.clamp(MIN_STROKE_WIDTH, MAX_STROKE_WIDTH)
}

pub fn valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ID_LEN
}

/// Normalizes a stroke received from a peer; `None` when nothing drawable is left.
pub fn sanitize_stroke(mut stroke: Stroke) -> Option<Stroke> {
    if !valid_id(stroke.id.as_str()) {
        return None;
    }
    stroke.color = sanitize_color(stroke.color);
    stroke.stroke_width = sanitize_width(stroke.stroke_width);
    stroke.points = stroke
        .points
        .into_iter()
        .filter_map(normalize_point)
        .take(MAX_POINTS_PER_STROKE)
        .collect();
    if stroke.points.is_empty() {
        return None;
    }
    Some(stroke)
}
