use web_sys::CanvasRenderingContext2d;

use didboard_shared::{Point, Snapshot, Stroke};

pub fn draw_dot(ctx: &CanvasRenderingContext2d, point: Point, color: &str, width: f64) {
    ctx.set_fill_style_str(color);
    ctx.begin_path();
    let _ = ctx.arc(point.x, point.y, width / 2.0, 0.0, std::f64::consts::PI * 2.0);
    ctx.fill();
}

pub fn draw_stroke(ctx: &CanvasRenderingContext2d, stroke: &Stroke) {
    let Some((first, rest)) = stroke.points.split_first() else {
        return;
    };
    if rest.is_empty() {
        draw_dot(ctx, *first, &stroke.color, stroke.stroke_width);
        return;
    }
    ctx.set_stroke_style_str(&stroke.color);
    ctx.set_line_width(stroke.stroke_width);
    ctx.begin_path();
    ctx.move_to(first.x, first.y);
    for point in rest {
        ctx.line_to(point.x, point.y);
    }
    ctx.stroke();
}

/// Full repaint from a snapshot.
pub fn redraw(
    ctx: &CanvasRenderingContext2d,
    width: f64,
    height: f64,
    dpr: f64,
    snapshot: &Snapshot,
) {
    let _ = ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0);
    ctx.clear_rect(0.0, 0.0, width, height);
    ctx.set_line_cap("round");
    ctx.set_line_join("round");
    for stroke in snapshot.iter() {
        draw_stroke(ctx, stroke);
    }
}
