//! The simulation container: bodies, constraints, springs and materials, plus the
//! broadphase, narrowphase and solver that step them.
//!
//! Bodies are stored in insertion order and addressed by [`BodyHandle`] through a hash
//! index, so iteration order, and with it solver order, is deterministic.

mod options;
mod query;
mod step;

pub use options::{SleepMode, WorldOptions};

use crate::{
   body::{Body, BodyHandle},
   broad::{Broadphase, BroadphaseKind},
   constraint::{Constraint, ConstraintHandle},
   error::{PhysicsError, PhysicsResult},
   events::{EventEmitter, EventType, ListenerId, WorldEvent},
   material::{ContactMaterial, Material, MaterialId},
   narrow::Narrowphase,
   overlap::OverlapKeeper,
   solver::{GsSolver, UnionFind},
   spring::{Spring, SpringHandle},
   Fp, Vec2,
};
use fnv::{FnvHashMap, FnvHashSet};
use tracing::debug;

#[inline]
pub(crate) fn pair_key(a: BodyHandle, b: BodyHandle) -> (BodyHandle, BodyHandle) {
   if a <= b { (a, b) } else { (b, a) }
}

/// Mutable access to two distinct bodies of a slice.
pub(crate) fn pair_mut(bodies: &mut [Body], i: usize, j: usize) -> Option<(&mut Body, &mut Body)> {
   if i == j || i >= bodies.len() || j >= bodies.len() {
      return None;
   }
   if i < j {
      let (lo, hi) = bodies.split_at_mut(j);
      Some((&mut lo[i], &mut hi[0]))
   } else {
      let (lo, hi) = bodies.split_at_mut(i);
      Some((&mut hi[0], &mut lo[j]))
   }
}

pub(crate) fn find_contact_material<'a>(
   materials: &'a [ContactMaterial],
   default: &'a ContactMaterial,
   a: Option<MaterialId>,
   b: Option<MaterialId>,
) -> &'a ContactMaterial {
   match (a, b) {
      (Some(a), Some(b)) => materials.iter().find(|cm| cm.pairs(a, b)).unwrap_or(default),
      _ => default,
   }
}

#[derive(Debug)]
pub struct World {
   bodies: Vec<Body>,
   body_index: FnvHashMap<BodyHandle, usize>,
   constraints: Vec<Constraint>,
   springs: Vec<Spring>,
   contact_materials: Vec<ContactMaterial>,
   disabled_body_collision: FnvHashSet<(BodyHandle, BodyHandle)>,

   pub gravity: Vec2,
   /// Gravity magnitude used to turn friction coefficients into slip forces.
   pub friction_gravity: Fp,
   /// Recompute `friction_gravity` from `gravity` every step.
   pub use_world_gravity_as_friction_gravity: bool,
   /// Keep the last `friction_gravity` while gravity is zero.
   pub use_friction_gravity_on_zero_gravity: bool,
   pub apply_gravity: bool,
   pub apply_spring_forces: bool,
   pub apply_damping: bool,
   /// Generate friction for contact materials with a positive friction coefficient.
   pub enable_friction: bool,
   pub island_split: bool,
   pub sleep_mode: SleepMode,
   pub solve_constraints: bool,

   pub default_material: Material,
   pub default_contact_material: ContactMaterial,
   pub solver: GsSolver,
   pub narrowphase: Narrowphase,
   broadphase: Box<dyn Broadphase>,
   overlap_keeper: OverlapKeeper,
   events: EventEmitter,

   time: Fp,
   accumulator: Fp,
   last_time_step: Fp,
   stepping: bool,
   union_find: UnionFind,
   pairs: Vec<(usize, usize)>,
}

impl Default for World {
   fn default() -> Self {
      World::new(WorldOptions::default())
   }
}

impl World {
   pub fn new(options: WorldOptions) -> World {
      let default_material = Material::new();
      let default_contact_material = ContactMaterial::new(default_material.id(), default_material.id())
         .with_friction(options.friction)
         .with_restitution(options.restitution)
         .with_stiffness(options.stiffness, options.relaxation);

      let mut solver = GsSolver::new();
      solver.iterations = options.solver_iterations;
      solver.tolerance = options.solver_tolerance;
      solver.friction_iterations = options.friction_iterations;

      let mut narrowphase = Narrowphase::new();
      narrowphase.enable_friction_reduction = options.enable_friction_reduction;

      World {
         bodies: Vec::new(),
         body_index: FnvHashMap::default(),
         constraints: Vec::new(),
         springs: Vec::new(),
         contact_materials: Vec::new(),
         disabled_body_collision: FnvHashSet::default(),
         gravity: options.gravity,
         friction_gravity: options.gravity.length(),
         use_world_gravity_as_friction_gravity: true,
         use_friction_gravity_on_zero_gravity: true,
         apply_gravity: options.apply_gravity,
         apply_spring_forces: options.apply_spring_forces,
         apply_damping: options.apply_damping,
         enable_friction: options.enable_friction,
         island_split: options.island_split,
         sleep_mode: options.sleep_mode,
         solve_constraints: true,
         default_material,
         default_contact_material,
         solver,
         narrowphase,
         broadphase: options.broadphase.create(),
         overlap_keeper: OverlapKeeper::new(),
         events: EventEmitter::new(),
         time: 0.0,
         accumulator: 0.0,
         last_time_step: 1.0 / 60.0,
         stepping: false,
         union_find: UnionFind::default(),
         pairs: Vec::new(),
      }
   }

   /// Simulated seconds so far.
   #[inline]
   pub fn time(&self) -> Fp {
      self.time
   }
   #[inline]
   pub fn last_time_step(&self) -> Fp {
      self.last_time_step
   }
   #[inline]
   pub fn is_stepping(&self) -> bool {
      self.stepping
   }

   fn ensure_not_stepping(&self, operation: &'static str) -> PhysicsResult<()> {
      if self.stepping {
         Err(PhysicsError::WorldStepping { operation })
      } else {
         Ok(())
      }
   }

   // ---------- Events ---------- //

   pub fn events(&self) -> &EventEmitter {
      &self.events
   }

   pub fn on(&self, event_type: EventType, listener: impl FnMut(&WorldEvent) + 'static) -> ListenerId {
      self.events.on(event_type, listener)
   }

   pub fn off(&self, event_type: EventType, id: ListenerId) -> bool {
      self.events.off(event_type, id)
   }

   pub(crate) fn emit(&self, event: WorldEvent) {
      self.events.emit(&event);
   }

   // ---------- Bodies ---------- //

   pub fn add_body(&mut self, mut body: Body) -> PhysicsResult<BodyHandle> {
      self.ensure_not_stepping("add a body")?;
      let handle = body.handle();
      if body.in_world || self.body_index.contains_key(&handle) {
         return Err(PhysicsError::BodyAlreadyInWorld(handle));
      }
      body.in_world = true;
      body.invalidate_aabb();

      let slot = self.bodies.len();
      self.bodies.push(body);
      self.body_index.insert(handle, slot);
      self.broadphase.body_added(slot);
      debug!(body = handle.0, slot, "added body");
      self.emit(WorldEvent::AddBody { body: handle });
      Ok(handle)
   }

   /// Removes and returns the body. Fails while any constraint still references it.
   pub fn remove_body(&mut self, handle: BodyHandle) -> PhysicsResult<Body> {
      self.ensure_not_stepping("remove a body")?;
      let slot = *self.body_index.get(&handle).ok_or(PhysicsError::UnknownBody(handle))?;
      let count = self.constraints.iter().filter(|c| c.connects(handle)).count();
      if count > 0 {
         return Err(PhysicsError::BodyHasConstraints { body: handle, count });
      }

      let mut body = self.bodies.remove(slot);
      self.reindex_bodies();
      self.broadphase.body_removed(slot);
      self.overlap_keeper.remove_body(handle);
      self.disabled_body_collision.retain(|&(a, b)| a != handle && b != handle);
      body.in_world = false;
      body.locked = false;
      debug!(body = handle.0, slot, "removed body");
      self.emit(WorldEvent::RemoveBody { body: handle });
      Ok(body)
   }

   fn reindex_bodies(&mut self) {
      self.body_index.clear();
      for (slot, body) in self.bodies.iter().enumerate() {
         self.body_index.insert(body.handle(), slot);
      }
   }

   #[inline]
   pub fn bodies(&self) -> &[Body] {
      &self.bodies
   }

   pub fn bodies_mut(&mut self) -> impl Iterator<Item = &mut Body> + '_ {
      self.bodies.iter_mut()
   }

   pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
      self.body_index.get(&handle).map(|&slot| &self.bodies[slot])
   }

   pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
      let slot = *self.body_index.get(&handle)?;
      Some(&mut self.bodies[slot])
   }

   /// Looks a body up by the numeric part of its handle.
   pub fn get_body_by_id(&self, id: u32) -> Option<&Body> {
      self.body(BodyHandle(id))
   }

   #[inline]
   pub(crate) fn slot(&self, handle: BodyHandle) -> Option<usize> {
      self.body_index.get(&handle).copied()
   }

   // ---------- Constraints ---------- //

   /// Fails unless both bodies of the constraint were added first.
   pub fn add_constraint(&mut self, constraint: Constraint) -> PhysicsResult<ConstraintHandle> {
      self.ensure_not_stepping("add a constraint")?;
      let (a, b) = (constraint.body_a(), constraint.body_b());
      if !self.body_index.contains_key(&a) || !self.body_index.contains_key(&b) {
         return Err(PhysicsError::ConstraintBodiesNotInWorld { body_a: a, body_b: b });
      }
      let handle = constraint.handle();
      debug!(constraint = handle.0, body_a = a.0, body_b = b.0, "added constraint");
      self.constraints.push(constraint);
      Ok(handle)
   }

   pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> PhysicsResult<Constraint> {
      self.ensure_not_stepping("remove a constraint")?;
      let index = self
         .constraints
         .iter()
         .position(|c| c.handle() == handle)
         .ok_or(PhysicsError::UnknownConstraint(handle))?;
      debug!(constraint = handle.0, "removed constraint");
      Ok(self.constraints.remove(index))
   }

   #[inline]
   pub fn constraints(&self) -> &[Constraint] {
      &self.constraints
   }

   pub fn constraint(&self, handle: ConstraintHandle) -> Option<&Constraint> {
      self.constraints.iter().find(|c| c.handle() == handle)
   }

   pub fn constraint_mut(&mut self, handle: ConstraintHandle) -> Option<&mut Constraint> {
      self.constraints.iter_mut().find(|c| c.handle() == handle)
   }

   // ---------- Springs ---------- //

   pub fn add_spring(&mut self, spring: Spring) -> PhysicsResult<SpringHandle> {
      self.ensure_not_stepping("add a spring")?;
      let handle = spring.handle();
      debug!(spring = handle.0, "added spring");
      // a sleeping body would otherwise ignore the new pull
      for body in [spring.body_a(), spring.body_b()] {
         let woken = self.body_index.get(&body).and_then(|&slot| self.bodies[slot].wake_up());
         if let Some(event) = woken {
            self.emit(event);
         }
      }
      self.springs.push(spring);
      self.emit(WorldEvent::AddSpring { spring: handle });
      Ok(handle)
   }

   pub fn remove_spring(&mut self, handle: SpringHandle) -> PhysicsResult<Spring> {
      self.ensure_not_stepping("remove a spring")?;
      let index = self
         .springs
         .iter()
         .position(|s| s.handle() == handle)
         .ok_or(PhysicsError::UnknownSpring(handle))?;
      let spring = self.springs.remove(index);
      debug!(spring = handle.0, "removed spring");
      self.emit(WorldEvent::RemoveSpring { spring: handle });
      Ok(spring)
   }

   #[inline]
   pub fn springs(&self) -> &[Spring] {
      &self.springs
   }

   pub fn spring_mut(&mut self, handle: SpringHandle) -> Option<&mut Spring> {
      self.springs.iter_mut().find(|s| s.handle() == handle)
   }

   // ---------- Materials ---------- //

   pub fn add_contact_material(&mut self, contact_material: ContactMaterial) {
      self.contact_materials.push(contact_material);
   }

   /// Removes every contact material pairing `a` and `b`, returning whether one existed.
   pub fn remove_contact_material(&mut self, a: MaterialId, b: MaterialId) -> bool {
      let before = self.contact_materials.len();
      self.contact_materials.retain(|cm| !cm.pairs(a, b));
      before != self.contact_materials.len()
   }

   /// The contact material registered for the two materials, in either order.
   pub fn contact_material(&self, a: MaterialId, b: MaterialId) -> Option<&ContactMaterial> {
      self.contact_materials.iter().find(|cm| cm.pairs(a, b))
   }

   // ---------- Collision filtering ---------- //

   /// Stops all contact between the two bodies, including continuous collision checks.
   pub fn disable_body_collision(&mut self, a: BodyHandle, b: BodyHandle) {
      self.disabled_body_collision.insert(pair_key(a, b));
   }

   pub fn enable_body_collision(&mut self, a: BodyHandle, b: BodyHandle) {
      self.disabled_body_collision.remove(&pair_key(a, b));
   }

   #[inline]
   pub fn body_collision_disabled(&self, a: BodyHandle, b: BodyHandle) -> bool {
      self.disabled_body_collision.contains(&pair_key(a, b))
   }

   // ---------- Broadphase ---------- //

   pub fn broadphase(&self) -> &dyn Broadphase {
      self.broadphase.as_ref()
   }

   /// Replaces the broadphase, carrying over its bounding volume setting.
   pub fn set_broadphase(&mut self, kind: BroadphaseKind) {
      let volume = self.broadphase.bounding_volume();
      let mut broadphase = kind.create();
      broadphase.set_bounding_volume(volume);
      for slot in 0..self.bodies.len() {
         broadphase.body_added(slot);
      }
      self.broadphase = broadphase;
   }

   pub fn broadphase_mut(&mut self) -> &mut dyn Broadphase {
      self.broadphase.as_mut()
   }

   /// Removes every constraint, spring, body and contact material, and resets the clock.
   pub fn clear(&mut self) -> PhysicsResult<()> {
      self.ensure_not_stepping("clear the world")?;
      self.constraints.clear();
      while let Some(handle) = self.bodies.last().map(Body::handle) {
         self.remove_body(handle)?;
      }
      let springs: Vec<_> = self.springs.iter().map(Spring::handle).collect();
      for spring in springs {
         self.remove_spring(spring)?;
      }
      self.contact_materials.clear();
      self.disabled_body_collision.clear();
      self.broadphase.clear();
      self.narrowphase.clear();
      self.overlap_keeper.clear();
      self.time = 0.0;
      self.accumulator = 0.0;
      debug!("cleared world");
      Ok(())
   }
}

#[cfg(test)]
mod tests {
   use super::*;
   use crate::{
      body::BodyOptions,
      constraint::Constraint,
      shape::Shape,
      spring::{LinearSpring, Spring},
   };
   use std::{cell::RefCell, rc::Rc};

   fn ball(x: Fp) -> Body {
      let mut b = Body::new(BodyOptions::dynamic(1.0).with_position(Vec2::new(x, 0.0)));
      b.add_shape(Shape::circle(0.5)).unwrap();
      b
   }

   #[test]
   fn bodies_keep_insertion_order_after_removal() {
      let mut world = World::default();
      let handles: Vec<_> = (0..4).map(|i| world.add_body(ball(i as Fp * 2.0)).unwrap()).collect();
      let removed = world.remove_body(handles[1]).unwrap();
      assert_eq!(removed.handle(), handles[1]);
      let order: Vec<_> = world.bodies().iter().map(Body::handle).collect();
      assert_eq!(order, vec![handles[0], handles[2], handles[3]]);
      assert_eq!(world.slot(handles[3]), Some(2));
      assert!(world.body(handles[1]).is_none());
      assert_eq!(world.get_body_by_id(handles[2].0).map(Body::handle), Some(handles[2]));
   }

   #[test]
   fn structural_errors() {
      let mut world = World::default();
      let a = world.add_body(ball(0.0)).unwrap();
      let loose = ball(3.0);

      let c = Constraint::distance_between_centers(world.body(a).unwrap(), &loose);
      assert!(matches!(world.add_constraint(c), Err(PhysicsError::ConstraintBodiesNotInWorld { .. })));

      let b = world.add_body(loose).unwrap();
      let c = Constraint::distance_between_centers(world.body(a).unwrap(), world.body(b).unwrap());
      let ch = world.add_constraint(c).unwrap();
      assert_eq!(world.remove_body(a).unwrap_err(), PhysicsError::BodyHasConstraints { body: a, count: 1 });

      world.remove_constraint(ch).unwrap();
      assert_eq!(world.remove_constraint(ch).unwrap_err(), PhysicsError::UnknownConstraint(ch));
      let body = world.remove_body(a).unwrap();
      assert_eq!(world.remove_body(a).unwrap_err(), PhysicsError::UnknownBody(a));

      let mut other = World::default();
      let mut body = body;
      body.in_world = true;
      assert_eq!(other.add_body(body).unwrap_err(), PhysicsError::BodyAlreadyInWorld(a));
   }

   #[test]
   fn add_and_remove_emit_events() {
      let mut world = World::default();
      let seen = Rc::new(RefCell::new(Vec::new()));
      for ty in [EventType::AddBody, EventType::RemoveBody, EventType::AddSpring, EventType::RemoveSpring] {
         let seen = seen.clone();
         world.on(ty, move |e| seen.borrow_mut().push(e.event_type()));
      }

      let a = world.add_body(ball(0.0)).unwrap();
      let b = world.add_body(ball(2.0)).unwrap();
      let spring = {
         let (ba, bb) = (world.body(a).unwrap(), world.body(b).unwrap());
         Spring::linear(ba, bb, LinearSpring::new(ba, bb, Vec2::ZERO, Vec2::ZERO, None))
      };
      world.add_spring(spring).unwrap();
      world.clear().unwrap();

      assert!(world.bodies().is_empty());
      assert!(world.springs().is_empty());
      assert_eq!(
         *seen.borrow(),
         vec![
            EventType::AddBody,
            EventType::AddBody,
            EventType::AddSpring,
            EventType::RemoveBody,
            EventType::RemoveBody,
            EventType::RemoveSpring,
         ]
      );
   }

   #[test]
   fn contact_material_lookup_is_symmetric() {
      let mut world = World::default();
      let (ice, steel) = (Material::new(), Material::new());
      world.add_contact_material(ContactMaterial::new(ice.id(), steel.id()).with_friction(0.01));
      assert_eq!(world.contact_material(steel.id(), ice.id()).map(|cm| cm.friction), Some(0.01));
      let fallback = find_contact_material(&world.contact_materials, &world.default_contact_material, Some(ice.id()), None);
      assert_eq!(fallback.friction, 0.3);
      assert!(world.remove_contact_material(steel.id(), ice.id()));
      assert!(world.contact_material(ice.id(), steel.id()).is_none());
   }

   #[test]
   fn contact_material_sets_skin_and_slip_force() {
      let mut world = World::new(WorldOptions::default().with_gravity(Vec2::new(0.0, -10.0)));
      let (rubber, stone) = (Material::new(), Material::new());
      world.add_contact_material(
         ContactMaterial::new(rubber.id(), stone.id()).with_friction(0.8).with_contact_skin_size(0.02),
      );
      let mut ground = Body::new(BodyOptions::default());
      ground.add_shape(Shape::plane().with_material(stone.id())).unwrap();
      world.add_body(ground).unwrap();
      let mut wheel = Body::new(BodyOptions::dynamic(2.0).with_position(Vec2::new(0.0, 0.45)));
      wheel.add_shape(Shape::circle(0.5).with_material(rubber.id())).unwrap();
      world.add_body(wheel).unwrap();

      world.step(1.0 / 60.0);
      assert_eq!(world.narrowphase.contact_equations.len(), 1);
      assert_eq!(world.narrowphase.contact_equations[0].offset, 0.02);
      // friction * |gravity| * reduced mass, the ground being static
      assert_eq!(world.narrowphase.friction_equations.len(), 1);
      let slip = world.narrowphase.friction_equations[0].slip_force();
      assert!((slip - 0.8 * 10.0 * 2.0).abs() < 1e-9);
   }

   #[test]
   fn pair_mut_splits_either_order() {
      let mut bodies = vec![ball(0.0), ball(1.0), ball(2.0)];
      let (a, b) = pair_mut(&mut bodies, 2, 0).unwrap();
      assert_eq!(a.position.x, 2.0);
      assert_eq!(b.position.x, 0.0);
      assert!(pair_mut(&mut bodies, 1, 1).is_none());
   }
}
