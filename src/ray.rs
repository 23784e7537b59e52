//! Ray casting against bodies and shapes.

use crate::{aabb::Aabb, body::{Body, BodyHandle}, shape::ShapeId, Fp, Vec2};
use std::fmt::{Debug, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RayMode {
   /// Keep only the nearest hit.
   Closest,
   /// Stop at the first hit found.
   Any,
   /// Invoke the callback for every hit, never stopping on its own.
   All,
}

/// Receives the intersections a shape finds along a segment.
pub trait RaySink {
   fn report(&mut self, fraction: Fp, normal: Vec2, face_index: i32);
   fn should_stop(&self) -> bool;
}

pub type RayCallback = Box<dyn FnMut(&mut RaycastResult)>;

pub struct Ray {
   pub from: Vec2,
   pub to: Vec2,
   pub mode: RayMode,
   pub collision_group: u32,
   pub collision_mask: u32,
   /// Ignore shapes with collision response turned off.
   pub check_collision_response: bool,
   /// Ignore hits on faces whose normal points along the ray.
   pub skip_backfaces: bool,
   direction: Vec2,
   length: Fp,
   callback: Option<RayCallback>,
}

impl Debug for Ray {
   fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("Ray")
         .field("from", &self.from)
         .field("to", &self.to)
         .field("mode", &self.mode)
         .field("collision_group", &self.collision_group)
         .field("collision_mask", &self.collision_mask)
         .field("has_callback", &self.callback.is_some())
         .finish()
   }
}

impl Ray {
   pub fn new(from: Vec2, to: Vec2) -> Ray {
      let mut ray = Ray {
         from,
         to,
         mode: RayMode::Closest,
         collision_group: u32::MAX,
         collision_mask: u32::MAX,
         check_collision_response: true,
         skip_backfaces: false,
         direction: Vec2::ZERO,
         length: 0.0,
         callback: None,
      };
      ray.update();
      ray
   }

   pub fn with_mode(mut self, mode: RayMode) -> Ray {
      self.mode = mode;
      self
   }
   pub fn with_collision(mut self, group: u32, mask: u32) -> Ray {
      self.collision_group = group;
      self.collision_mask = mask;
      self
   }
   /// Sets the per-hit callback used in [`RayMode::All`].
   pub fn with_callback(mut self, callback: impl FnMut(&mut RaycastResult) + 'static) -> Ray {
      self.callback = Some(Box::new(callback));
      self
   }

   /// Refreshes the cached direction and length after `from`/`to` change.
   pub fn update(&mut self) {
      let d = self.to - self.from;
      self.length = d.length();
      self.direction = if self.length > 0.0 { d / self.length } else { Vec2::ZERO };
   }

   #[inline]
   pub fn direction(&self) -> Vec2 {
      self.direction
   }
   #[inline]
   pub fn length(&self) -> Fp {
      self.length
   }

   pub fn aabb(&self) -> Aabb {
      Aabb::new(self.from.min(self.to), self.from.max(self.to))
   }

   pub fn intersect_bodies<'b>(&mut self, result: &mut RaycastResult, bodies: impl IntoIterator<Item = &'b Body>) {
      for body in bodies {
         if result.should_stop(self) {
            break;
         }
         let aabb = body.aabb();
         if aabb.overlaps_ray(self).map_or(false, |f| f >= 0.0) || aabb.contains_point(self.from) {
            self.intersect_body(result, body);
         }
      }
   }

   pub fn intersect_body(&mut self, result: &mut RaycastResult, body: &Body) {
      for shape in body.shapes() {
         if self.check_collision_response && !shape.collision_response {
            continue;
         }
         if self.collision_group & shape.collision_mask == 0 || shape.collision_group & self.collision_mask == 0 {
            continue;
         }

         let (position, angle) = body.shape_world_transform(shape);
         if position.distance(self.from) > shape.bounding_radius() + self.length {
            continue;
         }

         let (from, to) = (self.from, self.to);
         let mut sink = RayHitSink { ray: &mut *self, result: &mut *result, shape: shape.id(), body: body.handle() };
         shape.raycast(&mut sink, from, to, position, angle);

         if result.should_stop(self) {
            break;
         }
      }
   }

   fn report_intersection(&mut self, result: &mut RaycastResult, hit: Hit) {
      if self.skip_backfaces && hit.normal.dot(self.direction) > 0.0 {
         return;
      }
      match self.mode {
         RayMode::All => {
            result.set(hit);
            if let Some(callback) = self.callback.as_mut() {
               callback(result);
            }
         }
         RayMode::Closest => {
            if hit.fraction < result.fraction || !result.has_hit() {
               result.set(hit);
            }
         }
         RayMode::Any => result.set(hit),
      }
   }
}

#[derive(Clone, Copy)]
struct Hit {
   normal: Vec2,
   shape: ShapeId,
   body: BodyHandle,
   fraction: Fp,
   face_index: i32,
}

/// Routes a shape's intersections through a ray's mode into a result.
pub struct RayHitSink<'a> {
   pub ray: &'a mut Ray,
   pub result: &'a mut RaycastResult,
   pub shape: ShapeId,
   pub body: BodyHandle,
}

impl RaySink for RayHitSink<'_> {
   fn report(&mut self, fraction: Fp, normal: Vec2, face_index: i32) {
      let hit = Hit { normal, shape: self.shape, body: self.body, fraction, face_index };
      self.ray.report_intersection(self.result, hit);
   }
   fn should_stop(&self) -> bool {
      self.result.should_stop(self.ray)
   }
}

/// Accumulated outcome of a ray cast. `fraction` is `-1` until something is hit.
#[derive(Debug, Clone, PartialEq)]
pub struct RaycastResult {
   pub normal: Vec2,
   pub shape: Option<ShapeId>,
   pub body: Option<BodyHandle>,
   /// Edge index of the hit for polygonal shapes, else `-1`.
   pub face_index: i32,
   pub fraction: Fp,
   pub is_stopped: bool,
}

impl Default for RaycastResult {
   fn default() -> Self {
      RaycastResult { normal: Vec2::ZERO, shape: None, body: None, face_index: -1, fraction: -1.0, is_stopped: false }
   }
}

impl RaycastResult {
   pub fn new() -> RaycastResult {
      RaycastResult::default()
   }

   pub fn reset(&mut self) {
      *self = RaycastResult::default();
   }

   #[inline]
   pub fn has_hit(&self) -> bool {
      self.fraction != -1.0
   }

   pub fn hit_point(&self, ray: &Ray) -> Vec2 {
      ray.from.lerp(ray.to, self.fraction)
   }

   pub fn hit_distance(&self, ray: &Ray) -> Fp {
      ray.from.distance(ray.to) * self.fraction
   }

   /// Stops the cast after the current hit. Meant for [`RayMode::All`] callbacks.
   #[inline]
   pub fn stop(&mut self) {
      self.is_stopped = true;
   }

   #[inline]
   pub fn should_stop(&self, ray: &Ray) -> bool {
      self.is_stopped || (self.has_hit() && ray.mode == RayMode::Any)
   }

   fn set(&mut self, hit: Hit) {
      self.normal = hit.normal;
      self.shape = Some(hit.shape);
      self.body = Some(hit.body);
      self.fraction = hit.fraction;
      self.face_index = hit.face_index;
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::{body::BodyOptions, shape::Shape};
   use approx::assert_relative_eq;
   use std::{cell::RefCell, rc::Rc};

   fn circle_body(x: Fp) -> Body {
      let mut body = Body::new(BodyOptions::default().with_position(Vec2::new(x, 0.0)));
      body.add_shape(Shape::circle(0.5)).unwrap();
      body.update_aabb();
      body
   }

   #[test]
   fn closest_keeps_nearest() {
      let bodies = [circle_body(3.0), circle_body(1.0)];
      let mut ray = Ray::new(Vec2::ZERO, Vec2::new(10.0, 0.0));
      let mut result = RaycastResult::new();
      ray.intersect_bodies(&mut result, bodies.iter());
      assert!(result.has_hit());
      assert_eq!(result.body, Some(bodies[1].handle()));
      assert_relative_eq!(result.hit_distance(&ray), 0.5, epsilon = 1e-9);
      assert_relative_eq!(result.hit_point(&ray), Vec2::new(0.5, 0.0), epsilon = 1e-9);
   }

   #[test]
   fn any_stops_early() {
      let bodies = [circle_body(3.0), circle_body(1.0)];
      let mut ray = Ray::new(Vec2::ZERO, Vec2::new(10.0, 0.0)).with_mode(RayMode::Any);
      let mut result = RaycastResult::new();
      ray.intersect_bodies(&mut result, bodies.iter());
      assert_eq!(result.body, Some(bodies[0].handle()));
   }

   #[test]
   fn all_reports_every_hit() {
      let bodies = [circle_body(3.0), circle_body(1.0)];
      let hits = Rc::new(RefCell::new(Vec::new()));
      let sink = hits.clone();
      let mut ray = Ray::new(Vec2::ZERO, Vec2::new(10.0, 0.0))
         .with_mode(RayMode::All)
         .with_callback(move |r| sink.borrow_mut().push(r.fraction));
      let mut result = RaycastResult::new();
      ray.intersect_bodies(&mut result, bodies.iter());
      assert_eq!(hits.borrow().len(), 4);
   }

   #[test]
   fn group_filter() {
      let bodies = [circle_body(1.0)];
      let mut ray = Ray::new(Vec2::ZERO, Vec2::new(10.0, 0.0)).with_collision(0b10, 0b10);
      let mut result = RaycastResult::new();
      ray.intersect_bodies(&mut result, bodies.iter());
      assert!(!result.has_hit());
   }
}
