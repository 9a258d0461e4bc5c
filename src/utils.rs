//! Rectangle helpers and image conversion utilities.

pub mod image_conversion;
pub mod safe_cast;

use opencv::core::{Point, Rect};

/// Clip a rectangle to an image of the given size
///
/// Returns `None` when nothing of the rectangle lies inside the image.
#[must_use]
pub fn clip_rect(rect: Rect, width: i32, height: i32) -> Option<Rect> {
    let x1 = rect.x.max(0);
    let y1 = rect.y.max(0);
    let x2 = (rect.x + rect.width).min(width);
    let y2 = (rect.y + rect.height).min(height);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(Rect::new(x1, y1, x2 - x1, y2 - y1))
}

/// Integer center of a rectangle
#[must_use]
pub fn rect_center(rect: Rect) -> Point {
    Point::new(rect.x + rect.width / 2, rect.y + rect.height / 2)
}
