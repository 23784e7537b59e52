//! Contacts against heightfields. Work happens in the heightfield's local frame, restricted
//! to the sample intervals under the other shape.

use super::{
   capsule::WorldCapsule,
   convex::{polygon_polygon, WorldPolygon},
   ContactPoint, Manifold,
};
use crate::{
   math,
   shape::{ConvexPolygon, Heightfield},
   Fp, Vec2,
};

/// Depth of the solid tile synthesized under each sample interval.
const TILE_DEPTH: Fp = 100.0;

/// A heightfield together with its world transform.
#[derive(Debug, Clone, Copy)]
pub struct PlacedHeightfield<'a> {
   pub heightfield: &'a Heightfield,
   pub position: Vec2,
   pub angle: Fp,
}

impl PlacedHeightfield<'_> {
   fn to_local(&self, point: Vec2) -> Vec2 {
      math::to_local_frame(point, self.position, self.angle)
   }

   fn to_world(&self, contact: ContactPoint) -> ContactPoint {
      ContactPoint {
         normal: math::rotate(contact.normal, self.angle),
         point_a: math::to_global_frame(contact.point_a, self.position, self.angle),
         point_b: math::to_global_frame(contact.point_b, self.position, self.angle),
      }
   }

   fn tile(&self, i: usize) -> WorldPolygon {
      let (v0, v1) = self.heightfield.segment(i);
      let floor = self.heightfield.min_value() - TILE_DEPTH;
      let tile = ConvexPolygon::new_from_wound(vec![Vec2::new(v0.x, floor), Vec2::new(v1.x, floor), v1, v0]);
      WorldPolygon::new(&tile, Vec2::ZERO, 0.0)
   }
}

/// Circle against a heightfield, normals pointing from the circle into the ground.
///
/// Segment faces are tested first. Sample vertices are only considered when no face touches.
pub fn circle_heightfield(center: Vec2, radius: Fp, field: &PlacedHeightfield) -> Manifold {
   let mut manifold = Manifold::new();
   let c = field.to_local(center);
   let Some((first, last)) = field.heightfield.segment_range(c.x - radius, c.x + radius) else {
      return manifold;
   };
   if c.y - radius > field.heightfield.max_value() {
      return manifold;
   }

   for i in first..=last {
      let (v0, v1) = field.heightfield.segment(i);
      let up = math::normalize_or(math::cross_zv(1.0, v1 - v0), Vec2::Y);
      let d = up.dot(c - v0);
      if d > radius {
         continue;
      }
      let projected = c - up * d;
      // a sample shared by two segments belongs to the right one
      if projected.x < v0.x || projected.x > v1.x || (projected.x == v1.x && i < last) {
         continue;
      }
      manifold.push(ContactPoint { normal: -up, point_a: c - up * radius, point_b: projected });
   }

   if manifold.is_empty() && radius > 0.0 {
      let (heights, w) = (field.heightfield.heights(), field.heightfield.element_width());
      for k in first..=last + 1 {
         let v = Vec2::new(k as Fp * w, heights[k]);
         let d = v - c;
         if d.length_squared() < radius * radius {
            let normal = math::normalize_or(d, -Vec2::Y);
            manifold.push(ContactPoint { normal, point_a: c + normal * radius, point_b: v });
         }
      }
   }

   manifold.into_iter().map(|contact| field.to_world(contact)).collect()
}

/// Convex polygon against a heightfield, normals pointing from the polygon into the ground.
pub fn polygon_heightfield(polygon: &ConvexPolygon, position: Vec2, angle: Fp, field: &PlacedHeightfield) -> Manifold {
   let local = WorldPolygon::new(polygon, field.to_local(position), angle - field.angle);
   tiles_against(&local, field)
}

/// Capsule against a heightfield: the end circles plus the middle rectangle.
pub fn capsule_heightfield(capsule: &WorldCapsule, field: &PlacedHeightfield) -> Manifold {
   let (e0, e1) = capsule.ends();
   let mut manifold = circle_heightfield(e0, capsule.radius, field);
   manifold.extend(circle_heightfield(e1, capsule.radius, field));

   let middle = ConvexPolygon::rectangle(capsule.length, 2.0 * capsule.radius);
   manifold.extend(polygon_heightfield(&middle, capsule.position, capsule.angle, field));
   manifold
}

fn tiles_against(local: &WorldPolygon, field: &PlacedHeightfield) -> Manifold {
   let mut manifold = Manifold::new();
   let (lower, upper) = local.vertices.iter().fold((Vec2::MAX, Vec2::MIN), |(lo, hi), &v| (lo.min(v), hi.max(v)));
   if lower.y > field.heightfield.max_value() {
      return manifold;
   }
   let Some((first, last)) = field.heightfield.segment_range(lower.x, upper.x) else {
      return manifold;
   };

   for i in first..=last {
      let tile = field.tile(i);
      manifold.extend(polygon_polygon(local, &tile).into_iter().map(|contact| field.to_world(contact)));
   }
   manifold
}
