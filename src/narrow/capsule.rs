//! Capsule contacts, built from the two end circles and the middle rectangle.

use super::{
   circle::{circle_segment, segment_ends},
   convex::{circle_polygon, plane_points, polygon_polygon, WorldPolygon},
   ContactPoint, Manifold,
};
use crate::{math, shape::ConvexPolygon, Fp, Vec2};

/// World placement and dimensions of a capsule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldCapsule {
   pub position: Vec2,
   pub angle: Fp,
   pub length: Fp,
   pub radius: Fp,
}

impl WorldCapsule {
   #[inline]
   pub fn ends(&self) -> (Vec2, Vec2) {
      segment_ends(self.length, self.position, self.angle)
   }

   /// The rectangle between the end circles.
   pub fn middle(&self) -> WorldPolygon {
      WorldPolygon::new(&ConvexPolygon::rectangle(self.length, 2.0 * self.radius), self.position, self.angle)
   }
}

/// Capsule against a polygon, normals pointing from the capsule into the polygon.
pub fn capsule_polygon(capsule: &WorldCapsule, polygon: &WorldPolygon) -> Manifold {
   let (e0, e1) = capsule.ends();
   let mut manifold: Manifold = [e0, e1]
      .iter()
      .filter_map(|&end| circle_polygon(end, capsule.radius, polygon))
      .collect();
   manifold.extend(polygon_polygon(&capsule.middle(), polygon));
   manifold
}

/// Plane against a capsule, normals pointing out of the plane.
pub fn plane_capsule(plane_position: Vec2, plane_angle: Fp, capsule: &WorldCapsule) -> Manifold {
   let (e0, e1) = capsule.ends();
   plane_points(plane_position, plane_angle, &[e0, e1], capsule.radius)
}

/// Circle against a capsule, normal pointing from the circle into the capsule.
pub fn circle_capsule(center: Vec2, radius: Fp, capsule: &WorldCapsule) -> Option<ContactPoint> {
   let (e0, e1) = capsule.ends();
   circle_segment(center, radius, e0, e1, capsule.radius)
}

/// Two capsules. Each end circle is tested against the other capsule's core segment, and
/// crossing cores with no end contact fall back to a single point at the crossing.
pub fn capsule_capsule(a: &WorldCapsule, b: &WorldCapsule) -> Manifold {
   let (a0, a1) = a.ends();
   let (b0, b1) = b.ends();

   let mut manifold: Manifold = [a0, a1]
      .iter()
      .filter_map(|&end| circle_segment(end, a.radius, b0, b1, b.radius))
      .collect();
   if manifold.len() < 2 {
      manifold.extend(
         [b0, b1]
            .iter()
            .filter_map(|&end| circle_segment(end, b.radius, a0, a1, a.radius))
            .map(|c| c.flipped()),
      );
   }

   if manifold.is_empty() {
      if let Some(t) = math::seg_seg_query(a0, a1, b0, b1) {
         let crossing = a0 + (a1 - a0) * t;
         let side = math::rotate(Vec2::Y, a.angle);
         let normal = if side.dot(b.position - a.position) < 0.0 { -side } else { side };
         manifold.push(ContactPoint {
            normal,
            point_a: crossing + normal * a.radius,
            point_b: crossing - normal * b.radius,
         });
      }
   }
   manifold
}

#[cfg(test)]
mod tests {
   use super::*;
   use approx::assert_relative_eq;

   fn capsule(x: Fp, y: Fp, angle: Fp) -> WorldCapsule {
      WorldCapsule { position: Vec2::new(x, y), angle, length: 2.0, radius: 0.25 }
   }

   #[test]
   fn capsule_lying_on_plane() {
      let m = plane_capsule(Vec2::ZERO, 0.0, &capsule(0.0, 0.2, 0.0));
      assert_eq!(m.len(), 2);
      for c in m.iter() {
         assert_relative_eq!(c.normal, Vec2::Y);
         assert_relative_eq!(c.separation(), -0.05, epsilon = 1e-12);
      }
   }

   #[test]
   fn parallel_capsules_touch_along_their_length() {
      let m = capsule_capsule(&capsule(0.0, 0.0, 0.0), &capsule(0.5, 0.4, 0.0));
      assert_eq!(m.len(), 2);
      for c in m.iter() {
         assert_relative_eq!(c.normal, Vec2::Y, epsilon = 1e-12);
         assert_relative_eq!(c.separation(), -0.1, epsilon = 1e-12);
      }
   }

   #[test]
   fn crossing_capsules_meet_at_the_crossing() {
      let m = capsule_capsule(&capsule(0.0, 0.0, 0.0), &capsule(0.0, 0.1, crate::FRAC_PI_2));
      assert_eq!(m.len(), 1);
      assert_relative_eq!(m[0].normal, Vec2::Y, epsilon = 1e-12);
      assert!(m[0].separation() < 0.0);
   }

   #[test]
   fn capsule_end_hits_box() {
      let poly = WorldPolygon::new(&ConvexPolygon::rectangle(1.0, 1.0), Vec2::new(1.6, 0.0), 0.0);
      let m = capsule_polygon(&capsule(0.0, 0.0, 0.0), &poly);
      assert!(!m.is_empty());
      for c in m.iter() {
         assert_relative_eq!(c.normal, Vec2::X, epsilon = 1e-12);
         assert_relative_eq!(c.separation(), -0.15, epsilon = 1e-12);
      }
   }

   #[test]
   fn circle_beside_capsule() {
      let c = circle_capsule(Vec2::new(0.5, 0.6), 0.5, &capsule(0.0, 0.0, 0.0)).unwrap();
      assert_relative_eq!(c.normal, -Vec2::Y);
      assert_relative_eq!(c.separation(), -0.15, epsilon = 1e-12);
   }
}
