use tauri::PhysicalPosition;

use super::presets::WindowSize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Display bounds in physical pixels (virtual desktop coordinates).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl DisplayBounds {
    pub fn right(&self) -> f64 {
        self.x as f64 + self.width as f64
    }

    pub fn bottom(&self) -> f64 {
        self.y as f64 + self.height as f64
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x as f64
            && point.x < self.right()
            && point.y >= self.y as f64
            && point.y < self.bottom()
    }

    /// Squared distance from `point` to the closest edge; zero inside.
    fn distance_sq(&self, point: Point) -> f64 {
        let dx = (self.x as f64 - point.x).max(point.x - self.right()).max(0.0);
        let dy = (self.y as f64 - point.y).max(point.y - self.bottom()).max(0.0);
        dx * dx + dy * dy
    }
}

/// Picks the display closest to the cursor. A display that contains the cursor
/// always wins; ties keep enumeration order.
pub fn nearest_display(cursor: Point, displays: &[DisplayBounds]) -> Option<DisplayBounds> {
    if let Some(containing) = displays.iter().find(|d| d.contains(cursor)) {
        return Some(*containing);
    }

    displays
        .iter()
        .copied()
        .min_by(|a, b| a.distance_sq(cursor).total_cmp(&b.distance_sq(cursor)))
}

/// Top-left that centers a window of `window` size on the display nearest the
/// cursor. `None` only when no display is known.
pub fn compute_top_left(
    cursor: Point,
    window: WindowSize,
    displays: &[DisplayBounds],
) -> Option<PhysicalPosition<i32>> {
    let display = nearest_display(cursor, displays)?;

    let offset_x = (display.width as f64 - window.width as f64) / 2.0;
    let offset_y = (display.height as f64 - window.height as f64) / 2.0;

    Some(PhysicalPosition {
        x: display.x + round_half_up(offset_x),
        y: display.y + round_half_up(offset_y),
    })
}

// Halves round toward +inf, so a window one pixel wider than the display sits at x + 0, not x - 1.
fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}
