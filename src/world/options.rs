use crate::{broad::BroadphaseKind, Fp, Vec2};

/// How bodies are put to sleep at the end of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SleepMode {
   #[default]
   NoSleeping,
   /// Each body sleeps on its own once it has been slow for long enough.
   BodySleeping,
   /// Bodies sleep together once every dynamic body of their island wants to.
   IslandSleeping,
}

/// Construction parameters for a [`World`](super::World).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldOptions {
   pub gravity: Vec2,
   pub broadphase: BroadphaseKind,
   pub island_split: bool,
   pub sleep_mode: SleepMode,

   pub solver_iterations: usize,
   pub solver_tolerance: Fp,
   /// Sweeps used to estimate normal forces for friction bounds, `0` to use fixed slip forces.
   pub friction_iterations: usize,

   /// Parameters of the contact material used when no specific one matches.
   pub friction: Fp,
   pub restitution: Fp,
   pub stiffness: Fp,
   pub relaxation: Fp,

   pub enable_friction: bool,
   pub enable_friction_reduction: bool,

   pub apply_gravity: bool,
   pub apply_spring_forces: bool,
   pub apply_damping: bool,
}

impl Default for WorldOptions {
   fn default() -> Self {
      WorldOptions {
         gravity: Vec2::new(0.0, -9.78),
         broadphase: BroadphaseKind::Sap,
         island_split: true,
         sleep_mode: SleepMode::NoSleeping,
         solver_iterations: 10,
         solver_tolerance: 1e-7,
         friction_iterations: 0,
         friction: 0.3,
         restitution: 0.0,
         stiffness: 1e6,
         relaxation: 4.0,
         enable_friction: true,
         enable_friction_reduction: true,
         apply_gravity: true,
         apply_spring_forces: true,
         apply_damping: true,
      }
   }
}

impl WorldOptions {
   pub fn with_gravity(mut self, gravity: Vec2) -> WorldOptions {
      self.gravity = gravity;
      self
   }
   pub fn with_broadphase(mut self, broadphase: BroadphaseKind) -> WorldOptions {
      self.broadphase = broadphase;
      self
   }
   pub fn with_island_split(mut self, island_split: bool) -> WorldOptions {
      self.island_split = island_split;
      self
   }
   pub fn with_sleep_mode(mut self, sleep_mode: SleepMode) -> WorldOptions {
      self.sleep_mode = sleep_mode;
      self
   }
   pub fn with_solver(mut self, iterations: usize, tolerance: Fp) -> WorldOptions {
      self.solver_iterations = iterations;
      self.solver_tolerance = tolerance;
      self
   }
   pub fn with_friction_iterations(mut self, friction_iterations: usize) -> WorldOptions {
      self.friction_iterations = friction_iterations;
      self
   }
   pub fn with_default_contact(mut self, friction: Fp, restitution: Fp) -> WorldOptions {
      self.friction = friction;
      self.restitution = restitution;
      self
   }
   pub fn with_default_stiffness(mut self, stiffness: Fp, relaxation: Fp) -> WorldOptions {
      self.stiffness = stiffness;
      self.relaxation = relaxation;
      self
   }
   pub fn with_friction(mut self, enable: bool, reduction: bool) -> WorldOptions {
      self.enable_friction = enable;
      self.enable_friction_reduction = reduction;
      self
   }
   pub fn with_forces(mut self, gravity: bool, springs: bool, damping: bool) -> WorldOptions {
      self.apply_gravity = gravity;
      self.apply_spring_forces = springs;
      self.apply_damping = damping;
      self
   }
}
