/*
 * server/src/utils.rs
 *
 * Purpose: Small geometry helpers shared by the interaction checks.
 */

/// Calculates the squared distance between two 2D points.
#[inline]
pub fn get_distance_squared(x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    let dx = x1 - x2;
    let dy = y1 - y2;
    dx * dx + dy * dy
}

/// Unit vector an entity faces, from its rotation in radians (0 = +Y, i.e. "down" on screen).
#[inline]
pub fn facing_vector(facing_radians: f32) -> (f32, f32) {
    (facing_radians.sin(), facing_radians.cos())
}

/// True when the point (px, py) lies strictly in the half-plane behind an
/// entity at (ex, ey) facing `facing_radians`.
pub fn is_point_behind(ex: f32, ey: f32, facing_radians: f32, px: f32, py: f32) -> bool {
    let (fx, fy) = facing_vector(facing_radians);
    let dot = (px - ex) * fx + (py - ey) * fy;
    dot < 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn distance_squared() {
        assert_eq!(get_distance_squared(0.0, 0.0, 3.0, 4.0), 25.0);
    }

    #[test]
    fn behind_depends_on_facing() {
        // Facing +Y: a point above (negative y) is behind.
        assert!(is_point_behind(0.0, 0.0, 0.0, 0.0, -10.0));
        assert!(!is_point_behind(0.0, 0.0, 0.0, 0.0, 10.0));
        // Facing -Y flips it.
        assert!(is_point_behind(0.0, 0.0, PI, 0.0, 10.0));
        // Facing +X: a point to the left is behind.
        assert!(is_point_behind(5.0, 5.0, PI / 2.0, 0.0, 5.0));
    }

    #[test]
    fn point_on_the_side_is_not_behind() {
        assert!(!is_point_behind(0.0, 0.0, 0.0, 10.0, 0.0));
    }
}
