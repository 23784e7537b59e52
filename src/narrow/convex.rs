//! Polygon contacts: SAT with reference/incident edge clipping, circle-polygon and plane-points.

use super::{ContactPoint, Manifold};
use crate::{math, shape::ConvexPolygon, Fp, Vec2};
use smallvec::SmallVec;

/// Most contact points a polygon pair produces.
pub const MAX_MANIFOLD_POINTS: usize = 2;
/// Tolerance that keeps the reference face from flip-flopping between nearly equal separations.
pub const LINEAR_SLOP: Fp = 0.005;

/// Polygon vertices and outward edge normals, transformed to world space.
#[derive(Debug, Clone, Default)]
pub struct WorldPolygon {
   pub vertices: SmallVec<[Vec2; 8]>,
   pub normals: SmallVec<[Vec2; 8]>,
}

impl WorldPolygon {
   pub fn new(polygon: &ConvexPolygon, position: Vec2, angle: Fp) -> WorldPolygon {
      WorldPolygon {
         vertices: polygon.vertices().iter().map(|&v| math::to_global_frame(v, position, angle)).collect(),
         normals: polygon.normals().iter().map(|&n| math::rotate(n, angle)).collect(),
      }
   }

   #[inline]
   fn vertex(&self, i: usize) -> Vec2 {
      self.vertices[i % self.vertices.len()]
   }

   pub fn contains(&self, point: Vec2) -> bool {
      self.vertices.iter().zip(self.normals.iter()).all(|(&v, &n)| n.dot(point - v) <= 0.0)
   }
}

/// Finds the edge of `poly1` along whose normal `poly2` is separated the most.
///
/// Returns the edge index and the separation, which is negative when the polygons overlap.
pub fn find_max_separation(poly1: &WorldPolygon, poly2: &WorldPolygon) -> (usize, Fp) {
   let mut best_index = 0;
   let mut max_separation = Fp::MIN;
   for (i, (&v1, &n)) in poly1.vertices.iter().zip(poly1.normals.iter()).enumerate() {
      let si = poly2.vertices.iter().map(|&v2| n.dot(v2 - v1)).fold(Fp::MAX, Fp::min);
      if si > max_separation {
         max_separation = si;
         best_index = i;
      }
   }
   (best_index, max_separation)
}

/// Edge of `poly2` whose normal is most anti-parallel to `reference_normal`.
pub fn find_incident_edge(reference_normal: Vec2, poly2: &WorldPolygon) -> usize {
   let mut index = 0;
   let mut min_dot = Fp::MAX;
   for (i, &n) in poly2.normals.iter().enumerate() {
      let dot = reference_normal.dot(n);
      if dot < min_dot {
         min_dot = dot;
         index = i;
      }
   }
   index
}

/// Sutherland-Hodgman clip of a segment against the half-plane `dot(normal, p) <= offset`.
pub fn clip_segment_to_line(input: [Vec2; 2], normal: Vec2, offset: Fp) -> SmallVec<[Vec2; 2]> {
   let mut out = SmallVec::new();
   let d0 = normal.dot(input[0]) - offset;
   let d1 = normal.dot(input[1]) - offset;

   if d0 <= 0.0 {
      out.push(input[0]);
   }
   if d1 <= 0.0 {
      out.push(input[1]);
   }
   if d0 * d1 < 0.0 && out.len() < MAX_MANIFOLD_POINTS {
      let interp = d0 / (d0 - d1);
      out.push(input[0] + (input[1] - input[0]) * interp);
   }
   out
}

/// Contact manifold between two polygons, normals pointing from `a` to `b`.
pub fn polygon_polygon(a: &WorldPolygon, b: &WorldPolygon) -> Manifold {
   let mut manifold = Manifold::new();
   if a.vertices.len() < 2 || b.vertices.len() < 2 {
      return manifold;
   }

   let (edge_a, separation_a) = find_max_separation(a, b);
   if separation_a > 0.0 {
      return manifold;
   }
   let (edge_b, separation_b) = find_max_separation(b, a);
   if separation_b > 0.0 {
      return manifold;
   }

   let (reference, incident, edge, flip) = if separation_b > separation_a + 0.1 * LINEAR_SLOP {
      (b, a, edge_b, true)
   } else {
      (a, b, edge_a, false)
   };

   let normal = reference.normals[edge];
   let incident_edge = find_incident_edge(normal, incident);
   let incident_points = [incident.vertex(incident_edge), incident.vertex(incident_edge + 1)];

   let v11 = reference.vertex(edge);
   let v12 = reference.vertex(edge + 1);
   let tangent = math::normalize_or(v12 - v11, Vec2::X);

   let front_offset = normal.dot(v11);
   let side_offset1 = -tangent.dot(v11);
   let side_offset2 = tangent.dot(v12);

   let clip1 = clip_segment_to_line(incident_points, -tangent, side_offset1);
   if clip1.len() < 2 {
      return manifold;
   }
   let clip2 = clip_segment_to_line([clip1[0], clip1[1]], tangent, side_offset2);
   if clip2.len() < 2 {
      return manifold;
   }

   for &point in clip2.iter() {
      let separation = normal.dot(point) - front_offset;
      if separation > 0.0 {
         continue;
      }
      let on_reference = point - normal * separation;
      manifold.push(if flip {
         ContactPoint { normal: -normal, point_a: point, point_b: on_reference }
      } else {
         ContactPoint { normal, point_a: on_reference, point_b: point }
      });
   }
   manifold
}

/// Circle against a polygon, normal pointing from the circle into the polygon.
///
/// Tests the edges around the least penetrated face first, then the vertices.
pub fn circle_polygon(center: Vec2, radius: Fp, polygon: &WorldPolygon) -> Option<ContactPoint> {
   let n = polygon.vertices.len();
   if n == 0 {
      return None;
   }

   let mut face = 0;
   let mut max_separation = Fp::MIN;
   for (i, (&v, &normal)) in polygon.vertices.iter().zip(polygon.normals.iter()).enumerate() {
      let s = normal.dot(center - v);
      if s > radius {
         return None;
      }
      if s > max_separation {
         max_separation = s;
         face = i;
      }
   }

   let mut best: Option<(Fp, ContactPoint)> = None;
   for i in (face + n - 1)..(face + n + 2) {
      let i = i % n;
      let (v0, normal) = (polygon.vertices[i], polygon.normals[i]);
      let candidate = center - normal * radius;
      if !polygon.contains(candidate) {
         continue;
      }
      let depth = (v0 - candidate).dot(normal).abs();
      if best.as_ref().map_or(true, |(d, _)| depth < *d) {
         let on_edge = candidate + normal * depth;
         best = Some((depth, ContactPoint { normal: -normal, point_a: candidate, point_b: on_edge }));
      }
   }
   if let Some((_, contact)) = best {
      return Some(contact);
   }

   if radius > 0.0 {
      for &v in polygon.vertices.iter() {
         let d = v - center;
         if d.length_squared() < radius * radius {
            let normal = math::normalize_or(d, Vec2::Y);
            return Some(ContactPoint { normal, point_a: center + normal * radius, point_b: v });
         }
      }
   }
   None
}

/// Points below a plane, normal pointing out of the plane.
pub fn plane_points(plane_position: Vec2, plane_angle: Fp, points: &[Vec2], radius: Fp) -> Manifold {
   let n = math::rotate(Vec2::Y, plane_angle);
   points
      .iter()
      .filter_map(|&p| {
         let d = (p - plane_position).dot(n);
         (d < radius).then(|| ContactPoint { normal: n, point_a: p - n * d, point_b: p - n * radius })
      })
      .collect()
}

#[cfg(test)]
mod tests {
   use super::*;
   use approx::assert_relative_eq;

   fn unit_box(x: Fp, y: Fp) -> WorldPolygon {
      WorldPolygon::new(&ConvexPolygon::rectangle(1.0, 1.0), Vec2::new(x, y), 0.0)
   }

   #[test]
   fn max_separation_of_overlapping_boxes() {
      let delta = 0.2;
      let a = unit_box(0.0, 0.0);
      let b = unit_box(1.0 - delta, 0.0);
      let (edge, separation) = find_max_separation(&a, &b);
      assert_relative_eq!(separation, -delta, epsilon = 1e-12);
      assert_relative_eq!(a.normals[edge], Vec2::X, epsilon = 1e-12);

      let (edge, separation) = find_max_separation(&b, &a);
      assert_relative_eq!(separation, -delta, epsilon = 1e-12);
      assert_relative_eq!(b.normals[edge], -Vec2::X, epsilon = 1e-12);
   }

   #[test]
   fn stacked_boxes_make_two_points() {
      let a = unit_box(0.0, 0.0);
      let b = unit_box(0.25, 0.9);
      let manifold = polygon_polygon(&a, &b);
      assert_eq!(manifold.len(), 2);
      for c in manifold.iter() {
         assert_relative_eq!(c.normal, Vec2::Y, epsilon = 1e-12);
         assert_relative_eq!(c.separation(), -0.1, epsilon = 1e-12);
      }
   }

   #[test]
   fn reference_on_b_flips_normal() {
      let a = WorldPolygon::new(&ConvexPolygon::rectangle(0.5, 0.5), Vec2::new(0.0, 0.7), 0.3);
      let b = WorldPolygon::new(&ConvexPolygon::rectangle(4.0, 1.0), Vec2::ZERO, 0.0);
      let manifold = polygon_polygon(&a, &b);
      assert!(!manifold.is_empty());
      for c in manifold.iter() {
         assert_relative_eq!(c.normal, -Vec2::Y, epsilon = 1e-12);
         assert!(c.separation() <= 0.0);
      }
   }

   #[test]
   fn separated_boxes_have_no_manifold() {
      assert!(polygon_polygon(&unit_box(0.0, 0.0), &unit_box(1.1, 0.0)).is_empty());
   }

   #[test]
   fn clipping_keeps_inside_and_intersection() {
      let out = clip_segment_to_line([Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0)], Vec2::X, 0.5);
      assert_eq!(out.len(), 2);
      assert_relative_eq!(out[1], Vec2::new(0.5, 0.0));
   }

   #[test]
   fn circle_against_box_face_and_corner() {
      let b = unit_box(0.0, 0.0);
      let face = circle_polygon(Vec2::new(0.0, 0.9), 0.5, &b).unwrap();
      assert_relative_eq!(face.normal, -Vec2::Y, epsilon = 1e-12);
      assert_relative_eq!(face.separation(), -0.1, epsilon = 1e-12);

      let corner = circle_polygon(Vec2::new(0.8, 0.8), 0.5, &b).unwrap();
      assert_relative_eq!(corner.point_b, Vec2::new(0.5, 0.5));
      assert!(circle_polygon(Vec2::new(1.0, 1.0), 0.5, &b).is_none());
   }

   #[test]
   fn plane_catches_points_below() {
      let points = [Vec2::new(-1.0, -0.1), Vec2::new(1.0, 0.2)];
      let m = plane_points(Vec2::ZERO, 0.0, &points, 0.0);
      assert_eq!(m.len(), 1);
      assert_relative_eq!(m[0].point_a, Vec2::new(-1.0, 0.0));
      assert_relative_eq!(m[0].separation(), -0.1, epsilon = 1e-12);
   }
}
