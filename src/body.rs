//! Rigid bodies: shape ownership, mass properties, integration and sleeping.

use crate::{
   aabb::Aabb,
   error::{PhysicsError, PhysicsResult},
   events::WorldEvent,
   math, polygon,
   shape::{ConvexPolygon, Shape, ShapeId, ShapeKind},
   Fp, Vec2,
};
use smallvec::SmallVec;
use std::sync::atomic::{AtomicU32, Ordering};

/// Unique body identity, issued at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyHandle(pub u32);

static NEXT_BODY_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BodyType {
   /// Moved by forces and contacts.
   Dynamic,
   /// Never moves.
   Static,
   /// Moved only by its velocity, unaffected by forces and contacts.
   Kinematic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SleepState {
   Awake,
   Sleepy,
   Sleeping,
}

/// Initial state and tuning for [`Body::new`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyOptions {
   /// Defaults to `Static` for zero mass and `Dynamic` otherwise.
   pub body_type: Option<BodyType>,
   pub mass: Fp,
   pub position: Vec2,
   pub velocity: Vec2,
   pub angle: Fp,
   pub angular_velocity: Fp,
   pub force: Vec2,
   pub angular_force: Fp,
   pub damping: Fp,
   pub angular_damping: Fp,
   pub fixed_rotation: bool,
   pub fixed_x: bool,
   pub fixed_y: bool,
   pub allow_sleep: bool,
   pub sleep_speed_limit: Fp,
   pub sleep_time_limit: Fp,
   pub gravity_scale: Fp,
   pub collision_response: bool,
   /// CCD is used above this speed. Negative disables it.
   pub ccd_speed_threshold: Fp,
   pub ccd_iterations: usize,
}

impl Default for BodyOptions {
   fn default() -> Self {
      BodyOptions {
         body_type: None,
         mass: 0.0,
         position: Vec2::ZERO,
         velocity: Vec2::ZERO,
         angle: 0.0,
         angular_velocity: 0.0,
         force: Vec2::ZERO,
         angular_force: 0.0,
         damping: 0.1,
         angular_damping: 0.1,
         fixed_rotation: false,
         fixed_x: false,
         fixed_y: false,
         allow_sleep: true,
         sleep_speed_limit: 0.2,
         sleep_time_limit: 1.0,
         gravity_scale: 1.0,
         collision_response: true,
         ccd_speed_threshold: -1.0,
         ccd_iterations: 10,
      }
   }
}

impl BodyOptions {
   pub fn dynamic(mass: Fp) -> BodyOptions {
      BodyOptions { mass, body_type: Some(BodyType::Dynamic), ..Default::default() }
   }
   pub fn with_type(mut self, body_type: BodyType) -> BodyOptions {
      self.body_type = Some(body_type);
      self
   }
   pub fn with_mass(mut self, mass: Fp) -> BodyOptions {
      self.mass = mass;
      self
   }
   pub fn with_position(mut self, position: Vec2) -> BodyOptions {
      self.position = position;
      self
   }
   pub fn with_velocity(mut self, velocity: Vec2) -> BodyOptions {
      self.velocity = velocity;
      self
   }
   pub fn with_angle(mut self, angle: Fp) -> BodyOptions {
      self.angle = angle;
      self
   }
   pub fn with_angular_velocity(mut self, angular_velocity: Fp) -> BodyOptions {
      self.angular_velocity = angular_velocity;
      self
   }
   pub fn with_damping(mut self, damping: Fp, angular_damping: Fp) -> BodyOptions {
      self.damping = damping;
      self.angular_damping = angular_damping;
      self
   }
   pub fn with_fixed_rotation(mut self, fixed_rotation: bool) -> BodyOptions {
      self.fixed_rotation = fixed_rotation;
      self
   }
   pub fn with_fixed_axes(mut self, fixed_x: bool, fixed_y: bool) -> BodyOptions {
      self.fixed_x = fixed_x;
      self.fixed_y = fixed_y;
      self
   }
   pub fn with_sleep(mut self, allow_sleep: bool, speed_limit: Fp, time_limit: Fp) -> BodyOptions {
      self.allow_sleep = allow_sleep;
      self.sleep_speed_limit = speed_limit;
      self.sleep_time_limit = time_limit;
      self
   }
   pub fn with_gravity_scale(mut self, gravity_scale: Fp) -> BodyOptions {
      self.gravity_scale = gravity_scale;
      self
   }
   pub fn with_collision_response(mut self, collision_response: bool) -> BodyOptions {
      self.collision_response = collision_response;
      self
   }
   pub fn with_ccd(mut self, speed_threshold: Fp, iterations: usize) -> BodyOptions {
      self.ccd_speed_threshold = speed_threshold;
      self.ccd_iterations = iterations;
      self
   }
}

/// Options for [`Body::from_polygon`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonOptions {
   /// Drop vertices closer than this to being collinear with their neighbours.
   pub remove_collinear_points: Option<Fp>,
   pub skip_simple_check: bool,
   pub max_decomp_level: usize,
}

impl Default for PolygonOptions {
   fn default() -> Self {
      PolygonOptions { remove_collinear_points: None, skip_simple_check: false, max_decomp_level: polygon::DEFAULT_MAX_LEVEL }
   }
}

#[derive(Debug)]
pub struct Body {
   handle: BodyHandle,
   shapes: Vec<Shape>,

   pub body_type: BodyType,
   mass: Fp,
   inv_mass: Fp,
   inertia: Fp,
   inv_inertia: Fp,
   pub(crate) inv_mass_solve: Fp,
   pub(crate) inv_inertia_solve: Fp,
   fixed_rotation: bool,
   fixed_x: bool,
   fixed_y: bool,
   pub(crate) mass_multiplier: Vec2,

   pub position: Vec2,
   pub previous_position: Vec2,
   /// Position interpolated between the last two fixed steps, for rendering.
   pub interpolated_position: Vec2,
   pub angle: Fp,
   pub previous_angle: Fp,
   pub interpolated_angle: Fp,
   pub velocity: Vec2,
   pub angular_velocity: Fp,
   pub force: Vec2,
   pub angular_force: Fp,

   /// Constraint velocity accumulated by the solver.
   pub(crate) vlambda: Vec2,
   pub(crate) wlambda: Fp,

   pub damping: Fp,
   pub angular_damping: Fp,

   pub allow_sleep: bool,
   sleep_state: SleepState,
   pub sleep_speed_limit: Fp,
   pub sleep_time_limit: Fp,
   pub(crate) idle_time: Fp,
   pub(crate) time_last_sleepy: Fp,
   pub(crate) wants_to_sleep: bool,

   pub gravity_scale: Fp,
   pub collision_response: bool,
   pub ccd_speed_threshold: Fp,
   pub ccd_iterations: usize,

   pub(crate) island_id: i32,
   pub(crate) in_world: bool,
   pub(crate) locked: bool,

   aabb: Aabb,
   aabb_needs_update: bool,
   bounding_radius: Fp,
}

impl Body {
   pub fn new(options: BodyOptions) -> Body {
      let body_type = options
         .body_type
         .unwrap_or(if options.mass == 0.0 { BodyType::Static } else { BodyType::Dynamic });

      let mut body = Body {
         handle: BodyHandle(NEXT_BODY_ID.fetch_add(1, Ordering::Relaxed)),
         shapes: Vec::new(),
         body_type,
         mass: options.mass,
         inv_mass: 0.0,
         inertia: 0.0,
         inv_inertia: 0.0,
         inv_mass_solve: 0.0,
         inv_inertia_solve: 0.0,
         fixed_rotation: options.fixed_rotation,
         fixed_x: options.fixed_x,
         fixed_y: options.fixed_y,
         mass_multiplier: Vec2::ONE,
         position: options.position,
         previous_position: options.position,
         interpolated_position: options.position,
         angle: options.angle,
         previous_angle: options.angle,
         interpolated_angle: options.angle,
         velocity: options.velocity,
         angular_velocity: options.angular_velocity,
         force: options.force,
         angular_force: options.angular_force,
         vlambda: Vec2::ZERO,
         wlambda: 0.0,
         damping: options.damping,
         angular_damping: options.angular_damping,
         allow_sleep: options.allow_sleep,
         sleep_state: SleepState::Awake,
         sleep_speed_limit: options.sleep_speed_limit,
         sleep_time_limit: options.sleep_time_limit,
         idle_time: 0.0,
         time_last_sleepy: 0.0,
         wants_to_sleep: false,
         gravity_scale: options.gravity_scale,
         collision_response: options.collision_response,
         ccd_speed_threshold: options.ccd_speed_threshold,
         ccd_iterations: options.ccd_iterations,
         island_id: -1,
         in_world: false,
         locked: false,
         aabb: Aabb::default(),
         aabb_needs_update: true,
         bounding_radius: 0.0,
      };
      if body_type == BodyType::Static {
         body.halt();
      }
      body.update_mass_properties();
      body
   }

   #[inline]
   pub fn handle(&self) -> BodyHandle {
      self.handle
   }
   #[inline]
   pub fn shapes(&self) -> &[Shape] {
      &self.shapes
   }
   pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
      self.shapes.iter().find(|s| s.id() == id)
   }
   #[inline]
   pub fn mass(&self) -> Fp {
      self.mass
   }
   #[inline]
   pub fn inv_mass(&self) -> Fp {
      self.inv_mass
   }
   #[inline]
   pub fn inertia(&self) -> Fp {
      self.inertia
   }
   #[inline]
   pub fn inv_inertia(&self) -> Fp {
      self.inv_inertia
   }
   #[inline]
   pub fn sleep_state(&self) -> SleepState {
      self.sleep_state
   }
   #[inline]
   pub fn is_sleeping(&self) -> bool {
      self.sleep_state == SleepState::Sleeping
   }
   #[inline]
   pub fn wants_to_sleep(&self) -> bool {
      self.wants_to_sleep
   }
   /// Union-find root of the body's island after the last step, `-1` when not dynamic or not split.
   #[inline]
   pub fn island_id(&self) -> i32 {
      self.island_id
   }
   #[inline]
   pub fn bounding_radius(&self) -> Fp {
      self.bounding_radius
   }
   #[inline]
   pub fn fixed_rotation(&self) -> bool {
      self.fixed_rotation
   }
   #[inline]
   pub fn is_dynamic(&self) -> bool {
      self.body_type == BodyType::Dynamic
   }

   pub fn set_mass(&mut self, mass: Fp) {
      self.mass = mass;
      self.update_mass_properties();
   }

   pub fn set_fixed_rotation(&mut self, fixed_rotation: bool) {
      self.fixed_rotation = fixed_rotation;
      self.update_mass_properties();
   }

   pub fn set_fixed_axes(&mut self, fixed_x: bool, fixed_y: bool) {
      self.fixed_x = fixed_x;
      self.fixed_y = fixed_y;
      self.update_mass_properties();
   }

   pub fn set_type(&mut self, body_type: BodyType) {
      self.body_type = body_type;
      if body_type == BodyType::Static {
         self.halt();
      }
      self.update_mass_properties();
   }

   /// Static bodies never move, so they carry no velocity.
   fn halt(&mut self) {
      self.velocity = Vec2::ZERO;
      self.angular_velocity = 0.0;
   }

   /// Whether the step integrates this body at all.
   pub fn is_frozen(&self) -> bool {
      self.body_type == BodyType::Static || self.sleep_state == SleepState::Sleeping
   }

   /// Sets the mass from a uniform density over the shapes' total area.
   pub fn set_density(&mut self, density: Fp) {
      self.mass = self.area() * density;
      self.update_mass_properties();
   }

   pub fn area(&self) -> Fp {
      self.shapes.iter().map(Shape::area).sum()
   }

   pub fn add_shape(&mut self, mut shape: Shape) -> PhysicsResult<ShapeId> {
      //! Attaches `shape` at its own `position`/`angle` offset.
      if let Some(body) = shape.body() {
         return Err(PhysicsError::ShapeAlreadyAttached { shape: shape.id(), body });
      }
      if self.locked {
         return Err(PhysicsError::BodyLocked(self.handle));
      }
      shape.body = Some(self.handle);
      let id = shape.id();
      self.shapes.push(shape);
      self.update_mass_properties();
      self.update_bounding_radius();
      self.aabb_needs_update = true;
      Ok(id)
   }

   pub fn add_shape_at(&mut self, shape: Shape, offset: Vec2, angle: Fp) -> PhysicsResult<ShapeId> {
      self.add_shape(shape.with_position(offset).with_angle(angle))
   }

   pub fn remove_shape(&mut self, id: ShapeId) -> PhysicsResult<Option<Shape>> {
      //! Detaches and returns the shape, `None` if it isn't on this body.
      if self.locked {
         return Err(PhysicsError::BodyLocked(self.handle));
      }
      let Some(index) = self.shapes.iter().position(|s| s.id() == id) else { return Ok(None) };
      let mut shape = self.shapes.remove(index);
      shape.body = None;
      self.update_mass_properties();
      self.update_bounding_radius();
      self.aabb_needs_update = true;
      Ok(Some(shape))
   }

   pub fn update_mass_properties(&mut self) {
      if self.body_type != BodyType::Dynamic {
         self.mass = Fp::INFINITY;
         self.inv_mass = 0.0;
         self.inertia = Fp::INFINITY;
         self.inv_inertia = 0.0;
      } else {
         let n = self.shapes.len();
         let m = if n > 0 { self.mass / n as Fp } else { 0.0 };

         let inertia = if self.fixed_rotation {
            Fp::INFINITY
         } else {
            self.shapes
               .iter()
               .map(|s| m * (s.compute_moment_of_inertia() + s.position.length_squared()))
               .sum()
         };
         self.inertia = inertia;
         self.inv_mass = if self.mass > 0.0 { 1.0 / self.mass } else { 0.0 };
         self.inv_inertia = if inertia > 0.0 && inertia.is_finite() { 1.0 / inertia } else { 0.0 };
      }
      self.mass_multiplier = Vec2::new(
         if self.fixed_x { 0.0 } else { 1.0 },
         if self.fixed_y { 0.0 } else { 1.0 },
      );
      self.update_solve_mass_properties();
   }

   pub(crate) fn update_solve_mass_properties(&mut self) {
      if self.sleep_state == SleepState::Sleeping || self.body_type == BodyType::Kinematic {
         self.inv_mass_solve = 0.0;
         self.inv_inertia_solve = 0.0;
      } else {
         self.inv_mass_solve = self.inv_mass;
         self.inv_inertia_solve = self.inv_inertia;
      }
   }

   pub fn update_bounding_radius(&mut self) {
      self.bounding_radius = self
         .shapes
         .iter()
         .map(|s| s.position.length() + s.bounding_radius())
         .fold(0.0, Fp::max);
   }

   /// World position and angle of one of this body's shapes.
   #[inline]
   pub fn shape_world_transform(&self, shape: &Shape) -> (Vec2, Fp) {
      (self.to_world_frame(shape.position), self.angle + shape.angle)
   }

   /// The cached bounding box, current as of the last [`Body::update_aabb`].
   #[inline]
   pub fn aabb(&self) -> Aabb {
      self.aabb
   }
   #[inline]
   pub fn aabb_needs_update(&self) -> bool {
      self.aabb_needs_update
   }
   #[inline]
   pub fn invalidate_aabb(&mut self) {
      self.aabb_needs_update = true;
   }

   pub fn update_aabb(&mut self) {
      let mut shape_aabb = Aabb::default();
      let mut first = true;
      for shape in self.shapes.iter() {
         let (position, angle) = self.shape_world_transform(shape);
         shape.compute_aabb(&mut shape_aabb, position, angle);
         if first {
            self.aabb.copy(&shape_aabb);
            first = false;
         } else {
            self.aabb.extend(&shape_aabb);
         }
      }
      if first {
         self.aabb = Aabb::new(self.position, self.position);
      }
      self.aabb_needs_update = false;
   }

   #[inline]
   pub fn to_local_frame(&self, world_point: Vec2) -> Vec2 {
      math::to_local_frame(world_point, self.position, self.angle)
   }
   #[inline]
   pub fn to_world_frame(&self, local_point: Vec2) -> Vec2 {
      math::to_global_frame(local_point, self.position, self.angle)
   }
   #[inline]
   pub fn vector_to_local_frame(&self, world_vector: Vec2) -> Vec2 {
      math::vector_to_local_frame(world_vector, self.angle)
   }
   #[inline]
   pub fn vector_to_world_frame(&self, local_vector: Vec2) -> Vec2 {
      math::vector_to_global_frame(local_vector, self.angle)
   }

   /// Adds `force` at `relative_point`, an offset from the body origin in world orientation.
   pub fn apply_force(&mut self, force: Vec2, relative_point: Vec2) {
      self.force += force;
      self.angular_force += math::cross(relative_point, force);
   }

   pub fn apply_force_local(&mut self, local_force: Vec2, local_point: Vec2) {
      let force = self.vector_to_world_frame(local_force);
      let point = self.vector_to_world_frame(local_point);
      self.apply_force(force, point);
   }

   pub fn apply_impulse(&mut self, impulse: Vec2, relative_point: Vec2) {
      if self.body_type != BodyType::Dynamic {
         return;
      }
      self.velocity += impulse * self.inv_mass * self.mass_multiplier;
      self.angular_velocity += math::cross(relative_point, impulse) * self.inv_inertia;
   }

   pub fn apply_impulse_local(&mut self, local_impulse: Vec2, local_point: Vec2) {
      let impulse = self.vector_to_world_frame(local_impulse);
      let point = self.vector_to_world_frame(local_point);
      self.apply_impulse(impulse, point);
   }

   #[inline]
   pub fn set_zero_force(&mut self) {
      self.force = Vec2::ZERO;
      self.angular_force = 0.0;
   }

   pub fn apply_damping(&mut self, dt: Fp) {
      if self.body_type == BodyType::Dynamic {
         self.velocity *= (1.0 - self.damping).powf(dt);
         self.angular_velocity *= (1.0 - self.angular_damping).powf(dt);
      }
   }

   /// Velocity of the material point at `relative_point` (world orientation, relative to the body origin).
   #[inline]
   pub fn velocity_at_point(&self, relative_point: Vec2) -> Vec2 {
      self.velocity + math::cross_zv(self.angular_velocity, relative_point)
   }

   pub fn kinetic_energy(&self) -> Fp {
      let rotational = if self.inertia.is_finite() { 0.5 * self.inertia * self.angular_velocity * self.angular_velocity } else { 0.0 };
      let mass = if self.mass.is_finite() { self.mass } else { 0.0 };
      0.5 * mass * self.velocity.length_squared() + rotational
   }

   /// Whether any shape of this body touches any shape of `other`, ignoring collision masks.
   pub fn overlaps(&self, other: &Body) -> bool {
      crate::narrow::bodies_overlap(self, other, false)
   }

   pub(crate) fn add_constraint_velocity(&mut self) {
      self.velocity += self.vlambda;
      self.angular_velocity += self.wlambda;
   }

   pub(crate) fn reset_constraint_velocity(&mut self) {
      self.vlambda = Vec2::ZERO;
      self.wlambda = 0.0;
   }

   /// Applies the accumulated forces to the velocities.
   pub fn integrate_velocity(&mut self, dt: Fp) {
      self.previous_position = self.position;
      self.previous_angle = self.angle;
      if !self.fixed_rotation {
         self.angular_velocity += self.angular_force * self.inv_inertia * dt;
      }
      self.velocity += self.force * dt * self.inv_mass * self.mass_multiplier;
   }

   /// Moves the body along its velocity for `dt`.
   pub fn integrate_position(&mut self, dt: Fp) {
      self.position += self.velocity * dt;
      self.angle += self.angular_velocity * dt;
      self.aabb_needs_update = true;
   }

   /// Semi-implicit Euler step without continuous collision detection.
   pub fn integrate(&mut self, dt: Fp) {
      self.integrate_velocity(dt);
      self.integrate_position(dt);
   }

   pub fn wake_up(&mut self) -> Option<WorldEvent> {
      //! Returns the wake up event if the body was not already awake.
      let previous = self.sleep_state;
      self.sleep_state = SleepState::Awake;
      self.idle_time = 0.0;
      self.update_solve_mass_properties();
      (previous != SleepState::Awake).then_some(WorldEvent::WakeUp { body: self.handle })
   }

   pub fn sleep(&mut self) -> Option<WorldEvent> {
      let previous = self.sleep_state;
      self.sleep_state = SleepState::Sleeping;
      self.velocity = Vec2::ZERO;
      self.angular_velocity = 0.0;
      self.set_zero_force();
      self.wants_to_sleep = false;
      self.update_solve_mass_properties();
      (previous != SleepState::Sleeping).then_some(WorldEvent::Sleep { body: self.handle })
   }

   /// Advances the sleep state machine. With `dont_sleep` a body that would
   /// fall asleep only raises its `wants_to_sleep` flag.
   pub fn sleep_tick(&mut self, time: Fp, dont_sleep: bool, dt: Fp) -> SmallVec<[WorldEvent; 2]> {
      let mut events = SmallVec::new();
      self.wants_to_sleep = false;
      if !self.allow_sleep || !self.is_dynamic() || self.sleep_state == SleepState::Sleeping {
         return events;
      }

      let speed_squared = self.velocity.length_squared() + self.angular_velocity * self.angular_velocity;
      if speed_squared >= self.sleep_speed_limit * self.sleep_speed_limit {
         self.idle_time = 0.0;
         self.sleep_state = SleepState::Awake;
      } else {
         self.idle_time += dt;
         if self.sleep_state == SleepState::Awake {
            self.sleep_state = SleepState::Sleepy;
            self.time_last_sleepy = time;
            events.push(WorldEvent::Sleepy { body: self.handle });
         }
      }

      if self.idle_time > self.sleep_time_limit {
         if dont_sleep {
            self.wants_to_sleep = true;
         } else {
            events.extend(self.sleep());
         }
      }
      events
   }

   /// Moves the body origin to the area-weighted centroid of its shapes, leaving the shapes in place.
   pub fn adjust_center_of_mass(&mut self) {
      let total_area: Fp = self.area();
      if !(total_area > 0.0) || !total_area.is_finite() {
         return;
      }
      let center = self.shapes.iter().map(|s| s.position * s.area()).fold(Vec2::ZERO, |a, b| a + b) / total_area;
      for shape in self.shapes.iter_mut() {
         shape.position -= center;
      }
      self.position += self.vector_to_world_frame(center);
      self.update_mass_properties();
      self.update_bounding_radius();
      self.aabb_needs_update = true;
   }

   /// Replaces the body's shapes by a convex decomposition of the simple polygon `path`.
   pub fn from_polygon(&mut self, path: &[Vec2], options: PolygonOptions) -> PhysicsResult<()> {
      if self.locked {
         return Err(PhysicsError::BodyLocked(self.handle));
      }
      let mut path = path.to_vec();
      polygon::make_ccw(&mut path);
      if let Some(precision) = options.remove_collinear_points {
         polygon::remove_collinear_points(&mut path, precision);
      }
      if path.len() < 3 {
         return Err(PhysicsError::TooFewVertices { count: path.len() });
      }
      if !options.skip_simple_check && !polygon::is_simple(&path) {
         return Err(PhysicsError::SelfIntersecting);
      }

      let pieces = polygon::quick_decomp(&path, options.max_decomp_level);
      let mut convexes = Vec::with_capacity(pieces.len());
      for piece in pieces {
         let mut convex = ConvexPolygon::new(piece)?;
         let center = convex.center_of_mass();
         convex.translate(-center);
         convexes.push((convex, center));
      }

      self.shapes.clear();
      for (convex, center) in convexes {
         let mut shape = Shape::new(ShapeKind::Convex(convex)).with_position(center);
         shape.body = Some(self.handle);
         self.shapes.push(shape);
      }
      self.adjust_center_of_mass();
      self.aabb_needs_update = true;
      Ok(())
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use approx::assert_relative_eq;

   #[test]
   fn mass_properties() {
      let mut body = Body::new(BodyOptions::dynamic(2.0));
      body.add_shape(Shape::rectangle(2.0, 1.0)).unwrap();
      assert_relative_eq!(body.mass() * body.inv_mass(), 1.0);
      assert_relative_eq!(body.inertia(), 2.0 * 5.0 / 12.0);

      body.add_shape(Shape::circle(0.5).with_position(Vec2::new(2.0, 0.0))).unwrap();
      let expected = 1.0 * 5.0 / 12.0 + 1.0 * (0.125 + 4.0);
      assert_relative_eq!(body.inertia(), expected, epsilon = 1e-12);
      assert_relative_eq!(body.inertia() * body.inv_inertia(), 1.0, epsilon = 1e-12);
   }

   #[test]
   fn static_and_kinematic_are_immovable() {
      let body = Body::new(BodyOptions::default());
      assert_eq!(body.body_type, BodyType::Static);
      assert_eq!(body.inv_mass(), 0.0);
      assert_eq!(body.inv_inertia(), 0.0);

      let mut kin = Body::new(BodyOptions::default().with_type(BodyType::Kinematic));
      kin.add_shape(Shape::circle(1.0)).unwrap();
      assert_eq!(kin.inv_mass_solve, 0.0);
   }

   #[test]
   fn becoming_static_drops_velocity() {
      let mut body = Body::new(BodyOptions::dynamic(1.0).with_velocity(Vec2::new(2.0, 1.0)).with_angular_velocity(1.0));
      body.add_shape(Shape::circle(1.0)).unwrap();
      assert!(!body.is_frozen());
      body.set_type(BodyType::Static);
      assert_eq!(body.velocity, Vec2::ZERO);
      assert_eq!(body.angular_velocity, 0.0);
      assert!(body.is_frozen());
   }

   #[test]
   fn fixed_axes() {
      let mut body = Body::new(BodyOptions::dynamic(1.0).with_fixed_axes(true, false).with_fixed_rotation(true));
      body.add_shape(Shape::circle(1.0)).unwrap();
      assert_eq!(body.mass_multiplier, Vec2::new(0.0, 1.0));
      assert_eq!(body.inv_inertia(), 0.0);
      body.apply_force(Vec2::new(1.0, 1.0), Vec2::new(0.0, 1.0));
      body.integrate(1.0);
      assert_eq!(body.velocity, Vec2::new(0.0, 1.0));
      assert_eq!(body.angular_velocity, 0.0);
   }

   #[test]
   fn shape_ownership() {
      let mut a = Body::new(BodyOptions::dynamic(1.0));
      let mut b = Body::new(BodyOptions::dynamic(1.0));
      let id = a.add_shape(Shape::circle(1.0)).unwrap();
      let shape = a.remove_shape(id).unwrap().unwrap();
      assert!(a.shapes().is_empty());
      b.add_shape(shape).unwrap();

      let mut attached = Shape::circle(1.0);
      attached.body = Some(b.handle());
      assert!(matches!(a.add_shape(attached), Err(PhysicsError::ShapeAlreadyAttached { .. })));

      a.locked = true;
      assert_eq!(a.add_shape(Shape::circle(1.0)), Err(PhysicsError::BodyLocked(a.handle())));
   }

   #[test]
   fn sleep_transitions() {
      let mut body = Body::new(BodyOptions::dynamic(1.0).with_velocity(Vec2::new(0.1, 0.0)));
      body.add_shape(Shape::circle(1.0)).unwrap();
      let dt = 0.25;

      let events = body.sleep_tick(0.0, false, dt);
      assert_eq!(body.sleep_state(), SleepState::Sleepy);
      assert_eq!(events.as_slice(), &[WorldEvent::Sleepy { body: body.handle() }]);

      // velocity spike
      body.velocity = Vec2::new(5.0, 0.0);
      body.sleep_tick(0.25, false, dt);
      assert_eq!(body.sleep_state(), SleepState::Awake);

      body.velocity = Vec2::new(0.1, 0.0);
      let mut slept = false;
      for i in 0..6 {
         let events = body.sleep_tick(0.5 + i as Fp * dt, false, dt);
         slept |= events.contains(&WorldEvent::Sleep { body: body.handle() });
      }
      assert!(slept);
      assert_eq!(body.sleep_state(), SleepState::Sleeping);
      assert_eq!(body.velocity, Vec2::ZERO);

      assert_eq!(body.wake_up(), Some(WorldEvent::WakeUp { body: body.handle() }));
      assert_eq!(body.wake_up(), None);
   }

   #[test]
   fn dont_sleep_only_flags() {
      let mut body = Body::new(BodyOptions::dynamic(1.0));
      body.add_shape(Shape::circle(1.0)).unwrap();
      for _ in 0..10 {
         body.sleep_tick(0.0, true, 0.5);
      }
      assert!(body.wants_to_sleep());
      assert_ne!(body.sleep_state(), SleepState::Sleeping);
   }

   #[test]
   fn damping_is_frame_rate_independent() {
      let mut a = Body::new(BodyOptions::dynamic(1.0).with_velocity(Vec2::X).with_damping(0.5, 0.5));
      let mut b = Body::new(BodyOptions::dynamic(1.0).with_velocity(Vec2::X).with_damping(0.5, 0.5));
      a.apply_damping(1.0);
      b.apply_damping(0.5);
      b.apply_damping(0.5);
      assert_relative_eq!(a.velocity, b.velocity, epsilon = 1e-12);
      assert_relative_eq!(a.velocity.x, 0.5);
   }

   #[test]
   fn polygon_decomposition_keeps_area() {
      let mut body = Body::new(BodyOptions::dynamic(1.0));
      let l_shape = [
         Vec2::new(0.0, 0.0),
         Vec2::new(2.0, 0.0),
         Vec2::new(2.0, 1.0),
         Vec2::new(1.0, 1.0),
         Vec2::new(1.0, 2.0),
         Vec2::new(0.0, 2.0),
      ];
      body.from_polygon(&l_shape, PolygonOptions::default()).unwrap();
      assert_eq!(body.shapes().len(), 2);
      assert_relative_eq!(body.area(), 3.0, epsilon = 1e-9);

      let bowtie = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 1.0), Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0)];
      assert_eq!(body.from_polygon(&bowtie, PolygonOptions::default()), Err(PhysicsError::SelfIntersecting));
   }

   #[test]
   fn center_of_mass_adjustment() {
      let mut body = Body::new(BodyOptions::dynamic(1.0));
      body.add_shape(Shape::rectangle(1.0, 1.0).with_position(Vec2::new(2.0, 0.0))).unwrap();
      body.add_shape(Shape::rectangle(1.0, 1.0).with_position(Vec2::new(4.0, 0.0))).unwrap();
      body.adjust_center_of_mass();
      assert_relative_eq!(body.position, Vec2::new(3.0, 0.0));
      assert_relative_eq!(body.shapes()[0].position, Vec2::new(-1.0, 0.0));
   }
}
