//! Contacts for round shapes: circles, particles (radius zero) and capsule ends.

use super::ContactPoint;
use crate::{math, Fp, Vec2};

/// Circle `a` against circle `b`. Touching circles count as colliding.
pub fn circle_circle(center_a: Vec2, radius_a: Fp, center_b: Vec2, radius_b: Fp) -> Option<ContactPoint> {
   let d = center_b - center_a;
   let r = radius_a + radius_b;
   if d.length_squared() > r * r {
      return None;
   }
   let normal = math::normalize_or(d, Vec2::Y);
   Some(ContactPoint {
      normal,
      point_a: center_a + normal * radius_a,
      point_b: center_b - normal * radius_b,
   })
}

/// Circle against the half-space below a plane through `plane_position` with normal
/// `rotate(Y, plane_angle)`.
pub fn circle_plane(center: Vec2, radius: Fp, plane_position: Vec2, plane_angle: Fp) -> Option<ContactPoint> {
   let n = math::rotate(Vec2::Y, plane_angle);
   let d = (center - plane_position).dot(n);
   if d > radius {
      return None;
   }
   Some(ContactPoint {
      normal: -n,
      point_a: center - n * radius,
      point_b: center - n * d,
   })
}

/// Circle against a segment inflated by `segment_radius`.
pub fn circle_segment(center: Vec2, radius: Fp, s0: Vec2, s1: Vec2, segment_radius: Fp) -> Option<ContactPoint> {
   let edge = s1 - s0;
   let len_sq = edge.length_squared();
   let t = if len_sq > 0.0 { ((center - s0).dot(edge) / len_sq).clamp(0.0, 1.0) } else { 0.0 };
   let closest = s0 + edge * t;

   let d = closest - center;
   let r = radius + segment_radius;
   if d.length_squared() > r * r {
      return None;
   }
   // center exactly on the segment
   let fallback = -math::rotate90cw(math::normalize_or(edge, Vec2::X));
   let normal = math::normalize_or(d, fallback);
   Some(ContactPoint {
      normal,
      point_a: center + normal * radius,
      point_b: closest - normal * segment_radius,
   })
}

/// Local endpoints of a line or capsule core of the given length.
#[inline]
pub fn segment_ends(length: Fp, position: Vec2, angle: Fp) -> (Vec2, Vec2) {
   let half = math::rotate(Vec2::new(length * 0.5, 0.0), angle);
   (position - half, position + half)
}

#[cfg(test)]
mod tests {
   use super::*;
   use approx::assert_relative_eq;

   #[test]
   fn circles_contact_iff_within_radii() {
      for &(d, hit) in &[(0.5, true), (1.5, true), (1.5000001, false), (3.0, false)] {
         let c = circle_circle(Vec2::ZERO, 1.0, Vec2::new(d, 0.0), 0.5);
         assert_eq!(c.is_some(), hit, "distance {d}");
         if let Some(c) = c {
            assert_relative_eq!(c.normal, Vec2::X);
            assert_relative_eq!(c.separation(), d - 1.5, epsilon = 1e-12);
         }
      }
   }

   #[test]
   fn circle_rests_on_plane() {
      let c = circle_plane(Vec2::new(3.0, 0.4), 0.5, Vec2::ZERO, 0.0).unwrap();
      assert_relative_eq!(c.normal, -Vec2::Y);
      assert_relative_eq!(c.point_b, Vec2::new(3.0, 0.0));
      assert_relative_eq!(c.separation(), -0.1, epsilon = 1e-12);
      assert!(circle_plane(Vec2::new(0.0, 0.6), 0.5, Vec2::ZERO, 0.0).is_none());
   }

   #[test]
   fn segment_edge_and_end_regions() {
      let (s0, s1) = segment_ends(2.0, Vec2::ZERO, 0.0);
      let side = circle_segment(Vec2::new(0.3, 0.4), 0.5, s0, s1, 0.0).unwrap();
      assert_relative_eq!(side.normal, -Vec2::Y);
      assert_relative_eq!(side.point_b, Vec2::new(0.3, 0.0));

      let end = circle_segment(Vec2::new(1.3, 0.0), 0.5, s0, s1, 0.0).unwrap();
      assert_relative_eq!(end.normal, -Vec2::X);
      assert_relative_eq!(end.separation(), -0.2, epsilon = 1e-12);

      let capsule = circle_segment(Vec2::new(0.0, 0.9), 0.5, s0, s1, 0.5).unwrap();
      assert_relative_eq!(capsule.point_b, Vec2::new(0.0, 0.5));
      assert!(circle_segment(Vec2::new(0.0, 1.1), 0.5, s0, s1, 0.5).is_none());
   }
}
