use super::World;
use crate::{
   aabb::Aabb,
   body::BodyHandle,
   math,
   ray::{Ray, RaycastResult},
   shape::ShapeType,
   Fp, Vec2,
};

impl World {
   fn refresh_aabbs(&mut self) {
      for body in self.bodies.iter_mut() {
         if body.aabb_needs_update() {
            body.update_aabb();
         }
      }
   }

   /// Casts `ray` against every body whose AABB the ray's AABB touches.
   ///
   /// Hits accumulate into `result` according to the ray's mode. Returns whether anything was hit.
   pub fn raycast(&mut self, result: &mut RaycastResult, ray: &mut Ray) -> bool {
      ray.update();
      self.refresh_aabbs();
      let mut slots = Vec::new();
      self.broadphase.aabb_query(&self.bodies, &ray.aabb(), &mut slots);
      ray.intersect_bodies(result, slots.iter().map(|&slot| &self.bodies[slot]));
      result.has_hit()
   }

   /// Bodies whose AABB overlaps `aabb`.
   pub fn aabb_query(&mut self, aabb: &Aabb) -> Vec<BodyHandle> {
      self.refresh_aabbs();
      let mut slots = Vec::new();
      self.broadphase.aabb_query(&self.bodies, aabb, &mut slots);
      slots.into_iter().map(|slot| self.bodies[slot].handle()).collect()
   }

   /// Which of `bodies` have a shape containing `point`.
   ///
   /// Particles have no extent, so they count as hit within `precision` of the point.
   /// Unknown handles are skipped.
   pub fn hit_test(&self, point: Vec2, bodies: &[BodyHandle], precision: Fp) -> Vec<BodyHandle> {
      let mut hits = Vec::new();
      for &handle in bodies {
         let Some(body) = self.body(handle) else { continue };
         let hit = body.shapes().iter().any(|shape| {
            let (position, angle) = body.shape_world_transform(shape);
            if shape.shape_type() == ShapeType::Particle {
               position.distance_squared(point) < precision * precision
            } else {
               shape.point_test(math::to_local_frame(point, position, angle))
            }
         });
         if hit {
            hits.push(handle);
         }
      }
      hits
   }

   /// Whether any shapes of the two bodies overlapped during the last step.
   pub fn bodies_are_overlapping(&self, a: BodyHandle, b: BodyHandle) -> bool {
      self.overlap_keeper.bodies_are_overlapping(a, b)
   }

   /// Every body that overlapped `body` during the last step.
   pub fn overlapping_bodies(&self, body: BodyHandle) -> Vec<BodyHandle> {
      self.overlap_keeper.overlapping_bodies(body)
   }
}

#[cfg(test)]
mod tests {
   use crate::{
      aabb::Aabb,
      body::{Body, BodyOptions},
      ray::{Ray, RayMode, RaycastResult},
      shape::Shape,
      Fp, Vec2, World,
   };
   use approx::assert_relative_eq;

   fn body_at(shape: Shape, x: Fp) -> Body {
      let mut body = Body::new(BodyOptions::default().with_position(Vec2::new(x, 0.0)));
      body.add_shape(shape).unwrap();
      body
   }

   #[test]
   fn closest_raycast_through_world() {
      let mut world = World::default();
      let near = world.add_body(body_at(Shape::circle(0.5), 2.0)).unwrap();
      world.add_body(body_at(Shape::rectangle(1.0, 1.0), 5.0)).unwrap();

      let mut ray = Ray::new(Vec2::ZERO, Vec2::new(10.0, 0.0)).with_mode(RayMode::Closest);
      let mut result = RaycastResult::new();
      assert!(world.raycast(&mut result, &mut ray));
      assert_eq!(result.body, Some(near));
      assert_relative_eq!(result.hit_distance(&ray), 1.5, epsilon = 1e-9);
      assert_relative_eq!(result.normal, Vec2::new(-1.0, 0.0), epsilon = 1e-9);

      let mut miss = Ray::new(Vec2::new(0.0, 3.0), Vec2::new(10.0, 3.0));
      let mut result = RaycastResult::new();
      assert!(!world.raycast(&mut result, &mut miss));
   }

   #[test]
   fn hit_test_and_aabb_query() {
      let mut world = World::default();
      let circle = world.add_body(body_at(Shape::circle(1.0), 0.0)).unwrap();
      let square = world.add_body(body_at(Shape::rectangle(1.0, 1.0), 3.0)).unwrap();
      let dot = world.add_body(body_at(Shape::particle(), 6.0)).unwrap();
      let all = [circle, square, dot];

      assert_eq!(world.hit_test(Vec2::new(0.5, 0.5), &all, 0.0), vec![circle]);
      assert_eq!(world.hit_test(Vec2::new(3.4, -0.4), &all, 0.0), vec![square]);
      assert!(world.hit_test(Vec2::new(6.05, 0.0), &all, 0.0).is_empty());
      assert_eq!(world.hit_test(Vec2::new(6.05, 0.0), &all, 0.1), vec![dot]);

      let found = world.aabb_query(&Aabb::new(Vec2::new(2.0, -1.0), Vec2::new(7.0, 1.0)));
      assert_eq!(found, vec![square, dot]);
   }
}
