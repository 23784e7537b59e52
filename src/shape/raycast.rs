use super::{Shape, ShapeKind};
use crate::{math, ray::RaySink, Fp, Vec2};

impl Shape {
   /// Intersects the world-space segment `from -> to` with the shape placed at
   /// `position`/`angle`, reporting each hit to `sink` as a fraction along the
   /// segment together with the world-space surface normal.
   pub fn raycast(&self, sink: &mut dyn RaySink, from: Vec2, to: Vec2, position: Vec2, angle: Fp) {
      match &self.kind {
         ShapeKind::Circle { radius } => raycast_circle(sink, from, to, position, *radius),
         ShapeKind::Particle => raycast_particle(sink, from, to, position),
         ShapeKind::Plane => raycast_plane(sink, from, to, position, angle),
         ShapeKind::Convex(poly) | ShapeKind::Box { polygon: poly, .. } => {
            let (lf, lt) = (math::to_local_frame(from, position, angle), math::to_local_frame(to, position, angle));
            let (vertices, normals) = (poly.vertices(), poly.normals());
            for i in 0..vertices.len() {
               let (v0, v1) = (vertices[i], vertices[(i + 1) % vertices.len()]);
               if let Some(fraction) = math::seg_seg_query(lf, lt, v0, v1) {
                  sink.report(fraction, math::rotate(normals[i], angle), i as i32);
                  if sink.should_stop() {
                     return;
                  }
               }
            }
         }
         ShapeKind::Line { length } => {
            let (lf, lt) = (math::to_local_frame(from, position, angle), math::to_local_frame(to, position, angle));
            let half = Vec2::new(length * 0.5, 0.0);
            if let Some(fraction) = math::seg_seg_query(lf, lt, -half, half) {
               // face the ray origin
               let normal = if lf.y >= 0.0 { Vec2::Y } else { -Vec2::Y };
               sink.report(fraction, math::rotate(normal, angle), -1);
            }
         }
         ShapeKind::Capsule { length, radius } => raycast_capsule(sink, from, to, position, angle, *length, *radius),
         ShapeKind::Heightfield(hf) => {
            let (lf, lt) = (math::to_local_frame(from, position, angle), math::to_local_frame(to, position, angle));
            let Some((first, last)) = hf.segment_range(lf.x.min(lt.x), lf.x.max(lt.x)) else { return };
            for i in first..=last {
               let (v0, v1) = hf.segment(i);
               if let Some(fraction) = math::seg_seg_query(lf, lt, v0, v1) {
                  let normal = math::normalize_or((v1 - v0).perp(), Vec2::Y);
                  sink.report(fraction, math::rotate(normal, angle), i as i32);
                  if sink.should_stop() {
                     return;
                  }
               }
            }
         }
      }
   }
}

fn raycast_circle(sink: &mut dyn RaySink, from: Vec2, to: Vec2, center: Vec2, radius: Fp) {
   let d = to - from;
   let m = from - center;
   let a = d.length_squared();
   if a == 0.0 {
      return;
   }
   let b = 2.0 * d.dot(m);
   let c = m.length_squared() - radius * radius;
   let delta = b * b - 4.0 * a * c;

   let report = |sink: &mut dyn RaySink, t: Fp| {
      if (0.0..=1.0).contains(&t) {
         let hit = from + d * t;
         sink.report(t, math::normalize_or(hit - center, -d / a.sqrt()), -1);
      }
   };

   if delta < 0.0 {
      return;
   } else if delta == 0.0 {
      report(sink, -b / (2.0 * a));
   } else {
      let sq = delta.sqrt();
      report(sink, (-b - sq) / (2.0 * a));
      if sink.should_stop() {
         return;
      }
      report(sink, (-b + sq) / (2.0 * a));
   }
}

fn raycast_particle(sink: &mut dyn RaySink, from: Vec2, to: Vec2, position: Vec2) {
   let d = to - from;
   let len = d.length();
   if len == 0.0 {
      return;
   }
   let dir = d / len;
   let along = (position - from).dot(dir);
   if along < 0.0 || along > len {
      return;
   }
   if math::distance_from_line_squared(position, from, dir) > math::EPSILON * math::EPSILON {
      return;
   }
   sink.report(along / len, -dir, -1);
}

fn raycast_plane(sink: &mut dyn RaySink, from: Vec2, to: Vec2, position: Vec2, angle: Fp) {
   let normal = math::rotate(Vec2::Y, angle);
   let from_dist = (from - position).dot(normal);
   let to_dist = (to - position).dot(normal);
   if from_dist * to_dist > 0.0 {
      return; // both ends on the same side
   }
   let denom = from_dist - to_dist;
   if denom == 0.0 {
      return;
   }
   sink.report(from_dist / denom, normal, -1);
}

fn raycast_capsule(sink: &mut dyn RaySink, from: Vec2, to: Vec2, position: Vec2, angle: Fp, length: Fp, radius: Fp) {
   let (lf, lt) = (math::to_local_frame(from, position, angle), math::to_local_frame(to, position, angle));
   let hl = length * 0.5;

   // flat sides
   for (side, y) in [(0, radius), (1, -radius)] {
      let (a, b) = (Vec2::new(-hl, y), Vec2::new(hl, y));
      if let Some(fraction) = math::seg_seg_query(lf, lt, a, b) {
         let normal = if y > 0.0 { Vec2::Y } else { -Vec2::Y };
         sink.report(fraction, math::rotate(normal, angle), side);
         if sink.should_stop() {
            return;
         }
      }
   }

   // end caps, only the outer halves
   let d = lt - lf;
   let a = d.length_squared();
   if a == 0.0 {
      return;
   }
   for (side, s) in [(2, 1.0), (3, -1.0)] {
      let center = Vec2::new(s * hl, 0.0);
      let m = lf - center;
      let b = 2.0 * d.dot(m);
      let c = m.length_squared() - radius * radius;
      let delta = b * b - 4.0 * a * c;
      if delta < 0.0 {
         continue;
      }
      let sq = delta.sqrt();
      for t in [(-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)] {
         if !(0.0..=1.0).contains(&t) {
            continue;
         }
         let hit = lf + d * t;
         if (hit.x - center.x) * s < 0.0 {
            continue;
         }
         sink.report(t, math::rotate(math::normalize_or(hit - center, Vec2::X), angle), side);
         if sink.should_stop() {
            return;
         }
      }
   }
}

#[cfg(test)]
mod tests {
   use crate::{ray::RaySink, shape::Shape, Fp, Vec2};
   use approx::assert_relative_eq;

   #[derive(Default)]
   struct Hits(Vec<(Fp, Vec2)>);

   impl RaySink for Hits {
      fn report(&mut self, fraction: Fp, normal: Vec2, _face_index: i32) {
         self.0.push((fraction, normal));
      }
      fn should_stop(&self) -> bool {
         false
      }
   }

   #[test]
   fn circle_roots_in_order() {
      let mut hits = Hits::default();
      Shape::circle(1.0).raycast(&mut hits, Vec2::new(-2.0, 0.0), Vec2::new(2.0, 0.0), Vec2::ZERO, 0.0);
      assert_eq!(hits.0.len(), 2);
      assert_relative_eq!(hits.0[0].0, 0.25);
      assert_relative_eq!(hits.0[0].1, Vec2::new(-1.0, 0.0));
      assert_relative_eq!(hits.0[1].0, 0.75);
   }

   #[test]
   fn box_faces() {
      let mut hits = Hits::default();
      Shape::rectangle(2.0, 2.0).raycast(&mut hits, Vec2::new(0.0, 5.0), Vec2::new(0.0, 0.0), Vec2::ZERO, 0.0);
      assert_eq!(hits.0.len(), 1);
      assert_relative_eq!(hits.0[0].0, 0.8, epsilon = 1e-12);
      assert_relative_eq!(hits.0[0].1, Vec2::Y, epsilon = 1e-12);
   }

   #[test]
   fn plane_crossing() {
      let mut hits = Hits::default();
      Shape::plane().raycast(&mut hits, Vec2::new(0.0, 4.0), Vec2::new(0.0, -1.0), Vec2::ZERO, 0.0);
      assert_relative_eq!(hits.0[0].0, 0.8);
      let mut none = Hits::default();
      Shape::plane().raycast(&mut none, Vec2::new(0.0, 4.0), Vec2::new(0.0, 1.0), Vec2::ZERO, 0.0);
      assert!(none.0.is_empty());
   }

   #[test]
   fn capsule_caps_and_sides() {
      let mut hits = Hits::default();
      Shape::capsule(2.0, 0.5).raycast(&mut hits, Vec2::new(-3.0, 0.0), Vec2::new(0.0, 0.0), Vec2::ZERO, 0.0);
      assert_eq!(hits.0.len(), 1);
      assert_relative_eq!(hits.0[0].0, 0.5, epsilon = 1e-12);
      assert_relative_eq!(hits.0[0].1, Vec2::new(-1.0, 0.0), epsilon = 1e-12);

      let mut hits = Hits::default();
      Shape::capsule(2.0, 0.5).raycast(&mut hits, Vec2::new(0.0, 2.0), Vec2::new(0.0, 0.0), Vec2::ZERO, 0.0);
      assert_eq!(hits.0.len(), 1);
      assert_relative_eq!(hits.0[0].0, 0.75, epsilon = 1e-12);
   }

   #[test]
   fn heightfield_surface() {
      let mut hits = Hits::default();
      let shape = Shape::heightfield(vec![1.0, 1.0, 1.0], 1.0).unwrap();
      shape.raycast(&mut hits, Vec2::new(0.5, 3.0), Vec2::new(0.5, -1.0), Vec2::ZERO, 0.0);
      assert_eq!(hits.0.len(), 1);
      assert_relative_eq!(hits.0[0].0, 0.5, epsilon = 1e-12);
      assert_relative_eq!(hits.0[0].1, Vec2::Y, epsilon = 1e-12);
   }
}
