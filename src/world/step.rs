use super::{find_contact_material, pair_key, pair_mut, SleepMode, World};
use crate::{
   body::{Body, BodyType, SleepState},
   equation::Equation,
   events::{EventType, WorldEvent},
   narrow::{self, Side},
   ray::{Ray, RayMode, RaycastResult},
   solver::split_islands,
   Fp,
};
use fnv::FnvHashMap;
use tracing::{trace, warn};

/// Whether `sleeper` should wake because `other` hit it fast enough.
fn woken_by(sleeper: &Body, other: &Body) -> bool {
   sleeper.allow_sleep
      && sleeper.body_type == BodyType::Dynamic
      && sleeper.sleep_state() == SleepState::Sleeping
      && other.sleep_state() == SleepState::Awake
      && other.body_type != BodyType::Static
      && {
         let speed_squared = other.velocity.length_squared() + other.angular_velocity * other.angular_velocity;
         speed_squared >= 2.0 * other.sleep_speed_limit * other.sleep_speed_limit
      }
}

impl World {
   /// Advances the simulation by exactly `dt` seconds.
   pub fn step(&mut self, dt: Fp) {
      if dt <= 0.0 || !dt.is_finite() {
         warn!(dt, "ignoring step with a non-positive time step");
         return;
      }
      self.internal_step(dt);
      for body in self.bodies.iter_mut() {
         body.interpolated_position = body.position;
         body.interpolated_angle = body.angle;
      }
   }

   /// Fixed-step stepping for variable frame times.
   ///
   /// Adds `time_since_last_called` to an accumulator and takes up to `max_sub_steps`
   /// steps of `dt` out of it. Time that did not fit is dropped. Interpolated positions
   /// are then set from the remaining fraction of a step. Returns the number of steps taken.
   pub fn step_accumulated(&mut self, dt: Fp, time_since_last_called: Fp, max_sub_steps: usize) -> usize {
      if dt <= 0.0 || !dt.is_finite() {
         warn!(dt, "ignoring step with a non-positive time step");
         return 0;
      }
      self.accumulator += time_since_last_called.max(0.0);
      let mut sub_steps = 0;
      while self.accumulator >= dt && sub_steps < max_sub_steps {
         self.internal_step(dt);
         self.accumulator -= dt;
         sub_steps += 1;
      }
      self.accumulator %= dt;

      let t = self.accumulator / dt;
      for body in self.bodies.iter_mut() {
         body.interpolated_position = body.previous_position.lerp(body.position, t);
         body.interpolated_angle = body.previous_angle + t * (body.angle - body.previous_angle);
      }
      sub_steps
   }

   fn internal_step(&mut self, dt: Fp) {
      self.stepping = true;
      self.last_time_step = dt;
      for body in self.bodies.iter_mut() {
         body.locked = true;
      }
      self.overlap_keeper.tick();

      self.update_friction_gravity();
      self.apply_forces(dt);

      let pairs = self.broadphase_pairs();
      self.run_narrowphase(&pairs);
      self.pairs = pairs;

      if self.events.has(EventType::EndContact) {
         for r in self.overlap_keeper.end_overlaps() {
            self.events.emit(&WorldEvent::EndContact {
               body_a: r.body_a,
               body_b: r.body_b,
               shape_a: r.shape_a,
               shape_b: r.shape_b,
            });
         }
      }
      self.emit(WorldEvent::PreSolve {
         contact_equations: self.narrowphase.contact_equations.len(),
         friction_equations: self.narrowphase.friction_equations.len(),
      });

      self.solve(dt);
      self.integrate_bodies(dt);
      self.emit_impacts();
      self.sleep_bodies(dt);

      self.time += dt;
      for body in self.bodies.iter_mut() {
         body.locked = false;
      }
      self.stepping = false;
      trace!(
         time = self.time,
         pairs = self.pairs.len(),
         contacts = self.narrowphase.contact_equations.len(),
         frictions = self.narrowphase.friction_equations.len(),
         "stepped"
      );
      self.emit(WorldEvent::PostStep);
   }

   fn update_friction_gravity(&mut self) {
      if self.use_world_gravity_as_friction_gravity {
         let g = self.gravity.length();
         if g != 0.0 || !self.use_friction_gravity_on_zero_gravity {
            self.friction_gravity = g;
         }
      }
   }

   fn apply_forces(&mut self, dt: Fp) {
      if self.apply_gravity {
         for body in self.bodies.iter_mut() {
            if body.body_type == BodyType::Dynamic && !body.is_sleeping() {
               body.force += self.gravity * (body.mass() * body.gravity_scale);
            }
         }
      }
      if self.apply_spring_forces {
         for spring in self.springs.iter() {
            let (Some(&i), Some(&j)) = (self.body_index.get(&spring.body_a()), self.body_index.get(&spring.body_b())) else {
               continue;
            };
            if let Some((a, b)) = pair_mut(&mut self.bodies, i, j) {
               spring.apply_force(a, b);
            }
         }
      }
      if self.apply_damping {
         for body in self.bodies.iter_mut() {
            body.apply_damping(dt);
         }
      }
   }

   /// Candidate pairs with disabled and connected-but-not-colliding pairs removed.
   fn broadphase_pairs(&mut self) -> Vec<(usize, usize)> {
      for body in self.bodies.iter_mut() {
         if body.aabb_needs_update() {
            body.update_aabb();
         }
      }

      let mut pairs = std::mem::take(&mut self.pairs);
      pairs.clear();
      self.broadphase.collision_pairs(&self.bodies, &mut pairs);

      let (bodies, disabled, constraints) = (&self.bodies, &self.disabled_body_collision, &self.constraints);
      pairs.retain(|&(i, j)| {
         let (a, b) = (bodies[i].handle(), bodies[j].handle());
         !disabled.contains(&pair_key(a, b))
            && !constraints.iter().any(|c| !c.collide_connected && c.connects(a) && c.connects(b))
      });

      if self.events.has(EventType::PostBroadphase) {
         let handles = pairs.iter().map(|&(i, j)| (bodies[i].handle(), bodies[j].handle())).collect();
         self.events.emit(&WorldEvent::PostBroadphase { pairs: handles });
      }
      pairs
   }

   fn run_narrowphase(&mut self, pairs: &[(usize, usize)]) {
      self.narrowphase.reset();
      let mut wake = Vec::new();

      for &(i, j) in pairs {
         let (bi, bj) = (&self.bodies[i], &self.bodies[j]);
         let inv_mass_sum = bi.inv_mass() + bj.inv_mass();
         let reduced_mass = if inv_mass_sum > 0.0 { 1.0 / inv_mass_sum } else { 0.0 };

         for si in bi.shapes() {
            for sj in bj.shapes() {
               if !si.collides_with(sj) {
                  continue;
               }

               let cm = find_contact_material(&self.contact_materials, &self.default_contact_material, si.material, sj.material);
               let np = &mut self.narrowphase;
               np.enable_friction = self.enable_friction && cm.friction > 0.0;
               np.friction_coefficient = cm.friction;
               np.slip_force = cm.friction * self.friction_gravity * reduced_mass;
               np.restitution = cm.restitution;
               np.surface_velocity = cm.surface_velocity;
               np.stiffness = cm.stiffness;
               np.relaxation = cm.relaxation;
               np.friction_stiffness = cm.friction_stiffness;
               np.friction_relaxation = cm.friction_relaxation;
               np.contact_skin_size = cm.contact_skin_size;
               np.enabled_equations =
                  bi.collision_response && bj.collision_response && si.collision_response && sj.collision_response;

               let just_test = si.sensor || sj.sensor;
               let (contacts_before, frictions_before) = (np.contact_equations.len(), np.friction_equations.len());
               let found = np.collide(Side { body: bi, slot: i, shape: si }, Side { body: bj, slot: j, shape: sj }, just_test);
               if found == 0 {
                  continue;
               }

               // spread the slip force over the friction equations of this shape pair
               let frictions = np.friction_equations.len() - frictions_before;
               if frictions > 1 {
                  for f in np.friction_equations[frictions_before..].iter_mut() {
                     let slip = f.slip_force() / frictions as Fp;
                     f.set_slip_force(slip);
                  }
               }

               if woken_by(bi, bj) {
                  wake.push(i);
               }
               if woken_by(bj, bi) {
                  wake.push(j);
               }

               self.overlap_keeper.set_overlapping(bi.handle(), si.id(), bj.handle(), sj.id());
               if self.events.has(EventType::BeginContact) && self.overlap_keeper.is_new_overlap(si.id(), sj.id()) {
                  let contacts = np.contact_equations[contacts_before..].iter().filter_map(Equation::contact_info).collect();
                  self.events.emit(&WorldEvent::BeginContact {
                     body_a: bi.handle(),
                     body_b: bj.handle(),
                     shape_a: si.id(),
                     shape_b: sj.id(),
                     contacts,
                  });
               }
            }
         }
      }

      for slot in wake {
         if let Some(event) = self.bodies[slot].wake_up() {
            self.events.emit(&event);
         }
      }
   }

   /// Updates constraints and solves every enabled equation, per island when splitting.
   fn solve(&mut self, dt: Fp) {
      for constraint in self.constraints.iter_mut() {
         let mut resolved = true;
         for eq in constraint.equations_mut() {
            resolved &= eq.resolve_indices(&self.body_index);
         }
         if resolved {
            constraint.update(&self.bodies);
         }
      }

      let mut equations: Vec<&mut Equation> = self
         .narrowphase
         .contact_equations
         .iter_mut()
         .chain(self.narrowphase.friction_equations.iter_mut())
         .chain(self.constraints.iter_mut().flat_map(|c| c.equations_mut().iter_mut()))
         .collect();
      let active: Vec<usize> = equations.iter().enumerate().filter(|(_, eq)| eq.enabled).map(|(i, _)| i).collect();

      let needs_islands = self.island_split || self.sleep_mode == SleepMode::IslandSleeping;
      let islands = if needs_islands {
         split_islands(&mut self.union_find, &equations, &active, &mut self.bodies)
      } else {
         Vec::new()
      };

      if !self.solve_constraints || active.is_empty() {
         return;
      }
      if self.island_split {
         for island in islands.iter() {
            self.solver.solve(dt, &mut equations, island, &mut self.bodies);
         }
         trace!(islands = islands.len(), equations = active.len(), "solved islands");
      } else {
         self.solver.solve(dt, &mut equations, &active, &mut self.bodies);
      }
   }

   fn integrate_bodies(&mut self, dt: Fp) {
      for slot in 0..self.bodies.len() {
         let body = &mut self.bodies[slot];
         if body.is_frozen() {
            body.previous_position = body.position;
            body.previous_angle = body.angle;
            continue;
         }
         body.integrate_velocity(dt);
         if !self.integrate_to_time_of_impact(slot, dt) {
            self.bodies[slot].integrate_position(dt);
         }
      }
      for body in self.bodies.iter_mut() {
         body.set_zero_force();
      }
   }

   /// Continuous collision for a fast body: casts its path against the other bodies and,
   /// on a hit, moves it only as far as a bisection of the path finds it still separated.
   /// Returns `false` when the body should integrate normally.
   fn integrate_to_time_of_impact(&mut self, slot: usize, dt: Fp) -> bool {
      let body = &self.bodies[slot];
      if body.body_type == BodyType::Static
         || body.ccd_speed_threshold < 0.0
         || body.velocity.length_squared() < body.ccd_speed_threshold * body.ccd_speed_threshold
      {
         return false;
      }

      let (start, start_angle) = (body.position, body.angle);
      let (travel, turn) = (body.velocity * dt, body.angular_velocity * dt);
      let (handle, iterations) = (body.handle(), body.ccd_iterations);

      let mut ray = Ray::new(start, start + travel).with_mode(RayMode::Closest);
      ray.skip_backfaces = true;
      let mut result = RaycastResult::new();
      for (j, other) in self.bodies.iter().enumerate() {
         if j != slot && !self.body_collision_disabled(handle, other.handle()) {
            ray.intersect_body(&mut result, other);
         }
      }
      if !result.has_hit() {
         return false;
      }
      let Some(hit) = result.body.and_then(|h| self.slot(h)) else {
         return false;
      };
      let Some((body, other)) = pair_mut(&mut self.bodies, slot, hit) else {
         return false;
      };
      if other.aabb_needs_update() {
         other.update_aabb();
      }

      let (mut tmin, mut tmax) = (0.0, result.fraction);
      for _ in 0..iterations {
         let tmid = 0.5 * (tmin + tmax);
         body.position = start + travel * tmid;
         body.angle = start_angle + turn * tmid;
         body.update_aabb();
         if body.aabb().overlaps(&other.aabb()) && narrow::bodies_overlap(body, other, false) {
            tmax = tmid;
         } else {
            tmin = tmid;
         }
      }

      let time_of_impact = 0.5 * (tmin + tmax);
      body.position = start + travel * time_of_impact;
      body.angle = start_angle + turn * time_of_impact;
      body.invalidate_aabb();
      trace!(body = handle.0, other = other.handle().0, time_of_impact, "continuous collision");
      true
   }

   fn emit_impacts(&self) {
      if !self.events.has(EventType::Impact) {
         return;
      }
      for eq in self.narrowphase.contact_equations.iter() {
         if !eq.contact().map_or(false, |c| c.first_impact) {
            continue;
         }
         if let Some(contact) = eq.contact_info() {
            self.events.emit(&WorldEvent::Impact {
               body_a: eq.body_a,
               body_b: eq.body_b,
               shape_a: contact.shape_a,
               shape_b: contact.shape_b,
               contact,
            });
         }
      }
   }

   fn sleep_bodies(&mut self, dt: Fp) {
      let time = self.time;
      match self.sleep_mode {
         SleepMode::NoSleeping => {}
         SleepMode::BodySleeping => {
            for body in self.bodies.iter_mut() {
               for event in body.sleep_tick(time, false, dt) {
                  self.events.emit(&event);
               }
            }
         }
         SleepMode::IslandSleeping => {
            for body in self.bodies.iter_mut() {
               for event in body.sleep_tick(time, true, dt) {
                  self.events.emit(&event);
               }
            }

            // an island sleeps once every dynamic body in it is ready to
            let mut ready: FnvHashMap<i32, bool> = FnvHashMap::default();
            for body in self.bodies.iter().filter(|b| b.is_dynamic() && b.island_id() >= 0) {
               let entry = ready.entry(body.island_id()).or_insert(true);
               *entry &= body.wants_to_sleep() || body.is_sleeping();
            }
            for body in self.bodies.iter_mut() {
               if body.is_dynamic() && !body.is_sleeping() && ready.get(&body.island_id()).copied().unwrap_or(false) {
                  if let Some(event) = body.sleep() {
                     self.events.emit(&event);
                  }
               }
            }
         }
      }
   }
}

#[cfg(test)]
mod tests {
   use crate::{
      body::{Body, BodyOptions},
      shape::Shape,
      World, WorldOptions, Vec2,
   };
   use approx::assert_relative_eq;

   fn falling_ball(world: &mut World) -> crate::body::BodyHandle {
      let mut body = Body::new(BodyOptions::dynamic(1.0).with_damping(0.0, 0.0));
      body.add_shape(Shape::circle(0.5)).unwrap();
      world.add_body(body).unwrap()
   }

   #[test]
   fn free_fall_uses_semi_implicit_euler() {
      let mut world = World::new(WorldOptions::default().with_gravity(Vec2::new(0.0, -10.0)));
      let ball = falling_ball(&mut world);
      world.step(0.1);
      world.step(0.1);
      let body = world.body(ball).unwrap();
      assert_relative_eq!(body.velocity.y, -2.0, epsilon = 1e-12);
      assert_relative_eq!(body.position.y, -0.3, epsilon = 1e-12);
      assert_relative_eq!(world.time(), 0.2, epsilon = 1e-12);
      assert_eq!(body.force, Vec2::ZERO);
   }

   #[test]
   fn non_positive_time_step_is_ignored() {
      let mut world = World::default();
      let ball = falling_ball(&mut world);
      world.step(0.0);
      world.step(-1.0);
      assert_eq!(world.step_accumulated(0.0, 1.0, 10), 0);
      assert_eq!(world.time(), 0.0);
      assert_eq!(world.body(ball).unwrap().position, Vec2::ZERO);
   }

   #[test]
   fn accumulator_caps_sub_steps_and_interpolates() {
      let mut world = World::new(WorldOptions::default().with_gravity(Vec2::new(0.0, -10.0)));
      let ball = falling_ball(&mut world);

      assert_eq!(world.step_accumulated(0.1, 0.25, 10), 2);
      let body = world.body(ball).unwrap();
      assert_relative_eq!(body.previous_position.y, -0.1, epsilon = 1e-12);
      assert_relative_eq!(body.position.y, -0.3, epsilon = 1e-12);
      // half a step left over
      assert_relative_eq!(body.interpolated_position.y, -0.2, epsilon = 1e-9);

      // only three sub-steps are allowed, the rest of the time is dropped
      assert_eq!(world.step_accumulated(0.1, 1.0, 3), 3);
      assert_eq!(world.step_accumulated(0.1, 0.0, 3), 0);
      assert_relative_eq!(world.time(), 0.5, epsilon = 1e-12);
   }

   #[test]
   fn static_bodies_do_not_fall() {
      let mut world = World::default();
      let mut ground = Body::new(BodyOptions::default());
      ground.add_shape(Shape::plane()).unwrap();
      let ground = world.add_body(ground).unwrap();
      for _ in 0..10 {
         world.step(1.0 / 60.0);
      }
      assert_eq!(world.body(ground).unwrap().position, Vec2::ZERO);
   }

   #[test]
   fn static_bodies_ignore_velocity() {
      let mut world = World::default();
      let mut wall = Body::new(BodyOptions::default().with_velocity(Vec2::new(1.0, 0.0)).with_angular_velocity(2.0));
      wall.add_shape(Shape::rectangle(1.0, 1.0)).unwrap();
      let wall = world.add_body(wall).unwrap();
      assert_eq!(world.body(wall).unwrap().velocity, Vec2::ZERO);

      // velocity written after construction is not integrated either
      world.body_mut(wall).unwrap().velocity = Vec2::new(0.0, 3.0);
      for _ in 0..60 {
         world.step(1.0 / 60.0);
      }
      let body = world.body(wall).unwrap();
      assert_eq!(body.position, Vec2::ZERO);
      assert_eq!(body.angle, 0.0);
   }
}
