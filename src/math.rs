//! Vector helpers and line/segment intersection primitives.

use crate::{Fp, Vec2};

/// Default precision used by [`scalars_equal`].
pub const EPSILON: Fp = 1e-6;

#[inline]
pub fn scalars_equal(a: Fp, b: Fp, precision: Fp) -> bool {
   (a - b).abs() <= precision
}

#[inline]
pub fn rotate(v: Vec2, angle: Fp) -> Vec2 {
   //! Rotates `v` counter-clockwise by `angle` radians.
   if angle == 0.0 {
      return v;
   }
   let (s, c) = angle.sin_cos();
   Vec2::new(c * v.x - s * v.y, s * v.x + c * v.y)
}

#[inline]
pub fn rotate90cw(v: Vec2) -> Vec2 {
   Vec2::new(v.y, -v.x)
}

#[inline]
pub fn cross(a: Vec2, b: Vec2) -> Fp {
   //! Z component of the 3D cross product of two vectors in the XY plane.
   a.x * b.y - a.y * b.x
}

#[inline]
pub fn cross_vz(v: Vec2, z: Fp) -> Vec2 {
   //! Cross product of `v` with a vector `z` along the Z axis.
   Vec2::new(z * v.y, -z * v.x)
}

#[inline]
pub fn cross_zv(z: Fp, v: Vec2) -> Vec2 {
   //! Cross product of a vector `z` along the Z axis with `v`.
   Vec2::new(-z * v.y, z * v.x)
}

#[inline]
pub fn to_local_frame(world_point: Vec2, frame_position: Vec2, frame_angle: Fp) -> Vec2 {
   rotate(world_point - frame_position, -frame_angle)
}

#[inline]
pub fn to_global_frame(local_point: Vec2, frame_position: Vec2, frame_angle: Fp) -> Vec2 {
   rotate(local_point, frame_angle) + frame_position
}

#[inline]
pub fn vector_to_local_frame(world_vector: Vec2, frame_angle: Fp) -> Vec2 {
   rotate(world_vector, -frame_angle)
}

#[inline]
pub fn vector_to_global_frame(local_vector: Vec2, frame_angle: Fp) -> Vec2 {
   rotate(local_vector, frame_angle)
}

#[inline]
pub fn normalize_or(v: Vec2, fallback: Vec2) -> Vec2 {
   //! Normalizes `v`, substituting `fallback` for zero-length input.
   let len2 = v.length_squared();
   if len2 > 0.0 {
      v / len2.sqrt()
   } else {
      fallback
   }
}

#[inline]
pub fn centroid(a: Vec2, b: Vec2, c: Vec2) -> Vec2 {
   (a + b + c) / 3.0
}

#[inline]
pub fn reflect(v: Vec2, normal: Vec2) -> Vec2 {
   v - normal * (2.0 * v.dot(normal))
}

#[inline]
pub fn distance_from_line_squared(point: Vec2, line_origin: Vec2, line_direction: Vec2) -> Fp {
   //! Squared distance from `point` to the infinite line through `line_origin` along unit `line_direction`.
   let d = point - line_origin;
   let along = d.dot(line_direction);
   (d - line_direction * along).length_squared()
}

// ---------- Point & Line ---------- //

#[inline]
pub fn seg_seg_query(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> Option<Fp> {
   //! Returns the coefficient distance along line segment `a` an intersection occurs.
   let da = a2 - a1;
   let db = b2 - b1;

   let dot = da.x * db.y - db.x * da.y;
   if dot == 0.0 { return None; } // guard against colinearity
   let dd = dot * dot;

   let nd1 = a1 - b1;
   let tdd = db.perp_dot(nd1) * dot;
   if tdd < 0.0 || tdd > dd { return None; } // seg a guard

   let udd = da.perp_dot(nd1) * dot;
   if udd < 0.0 || udd > dd { return None; } // seg b guard

   Some(tdd / dd)
}

#[inline]
pub fn line_line_point(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2, precision: Fp) -> Option<Vec2> {
   //! Intersection point of the infinite lines through `a1 a2` and `b1 b2`, `None` when parallel.
   let a = a2 - a1;
   let b = b2 - b1;
   let det = cross(a, b);
   if scalars_equal(det, 0.0, precision) {
      return None;
   }
   let t = cross(b1 - a1, b) / det;
   Some(a1 + a * t)
}

#[inline]
pub fn segments_intersect(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> bool {
   seg_seg_query(a1, a2, b1, b2).is_some()
}

#[cfg(test)]
mod tests {
   use super::*;
   use approx::assert_relative_eq;

   #[test]
   fn frame_round_trip() {
      let samples = [
         (Vec2::new(1.0, 2.0), Vec2::new(-3.0, 0.5), 0.3),
         (Vec2::new(-4.0, 7.0), Vec2::new(10.0, -2.0), -2.1),
         (Vec2::new(0.0, 0.0), Vec2::new(0.0, 0.0), 5.0),
      ];
      for (p, pos, angle) in samples {
         let back = to_local_frame(to_global_frame(p, pos, angle), pos, angle);
         assert_relative_eq!(back, p, epsilon = 1e-5);
      }
   }

   #[test]
   fn rotation() {
      assert_relative_eq!(rotate(Vec2::X, crate::FRAC_PI_2), Vec2::Y, epsilon = 1e-6);
      assert_eq!(rotate90cw(Vec2::Y), Vec2::X);
      assert_eq!(cross(Vec2::X, Vec2::Y), 1.0);
   }

   #[test]
   fn segment_query() {
      assert_eq!(seg_seg_query(Vec2::new(0.0, 0.0), Vec2::new(3.0, 1.0), Vec2::new(2.0, 1.0), Vec2::new(2.0, -4.0)), Some(2.0 / 3.0));
      assert!(seg_seg_query(Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0)).is_none());
   }

   #[test]
   fn parallel_lines_have_no_intersection() {
      let p = line_line_point(Vec2::ZERO, Vec2::X, Vec2::Y, Vec2::new(1.0, 1.0), EPSILON);
      assert!(p.is_none());
      let p = line_line_point(Vec2::ZERO, Vec2::X, Vec2::new(0.5, -1.0), Vec2::new(0.5, 1.0), EPSILON).unwrap();
      assert_relative_eq!(p, Vec2::new(0.5, 0.0), epsilon = 1e-6);
   }
}
