//! Surface materials and the contact parameters between pairs of them.

use crate::Fp;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_MATERIAL_ID: AtomicU32 = AtomicU32::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MaterialId(pub u32);

/// A material identity. Shapes refer to it, [`ContactMaterial`]s pair two of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Material {
   id: MaterialId,
}

impl Material {
   pub fn new() -> Material {
      Material { id: MaterialId(NEXT_MATERIAL_ID.fetch_add(1, Ordering::Relaxed)) }
   }

   #[inline]
   pub fn id(&self) -> MaterialId {
      self.id
   }
}

impl Default for Material {
   fn default() -> Self {
      Material::new()
   }
}

/// Contact parameters used whenever shapes of `material_a` and `material_b` touch.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContactMaterial {
   pub material_a: MaterialId,
   pub material_b: MaterialId,
   pub friction: Fp,
   pub restitution: Fp,
   pub stiffness: Fp,
   pub relaxation: Fp,
   pub friction_stiffness: Fp,
   pub friction_relaxation: Fp,
   /// Tangential velocity of the surface, e.g. a conveyor belt.
   pub surface_velocity: Fp,
   /// Contacts are generated this far before the shapes actually touch.
   pub contact_skin_size: Fp,
}

impl ContactMaterial {
   pub fn new(material_a: MaterialId, material_b: MaterialId) -> ContactMaterial {
      ContactMaterial {
         material_a,
         material_b,
         friction: 0.3,
         restitution: 0.0,
         stiffness: 1e6,
         relaxation: 4.0,
         friction_stiffness: 1e6,
         friction_relaxation: 4.0,
         surface_velocity: 0.0,
         contact_skin_size: 0.005,
      }
   }

   pub fn with_friction(mut self, friction: Fp) -> ContactMaterial {
      self.friction = friction;
      self
   }
   pub fn with_restitution(mut self, restitution: Fp) -> ContactMaterial {
      self.restitution = restitution;
      self
   }
   pub fn with_stiffness(mut self, stiffness: Fp, relaxation: Fp) -> ContactMaterial {
      self.stiffness = stiffness;
      self.relaxation = relaxation;
      self
   }
   pub fn with_friction_stiffness(mut self, stiffness: Fp, relaxation: Fp) -> ContactMaterial {
      self.friction_stiffness = stiffness;
      self.friction_relaxation = relaxation;
      self
   }
   pub fn with_surface_velocity(mut self, surface_velocity: Fp) -> ContactMaterial {
      self.surface_velocity = surface_velocity;
      self
   }
   pub fn with_contact_skin_size(mut self, contact_skin_size: Fp) -> ContactMaterial {
      self.contact_skin_size = contact_skin_size;
      self
   }

   #[inline]
   pub fn pairs(&self, a: MaterialId, b: MaterialId) -> bool {
      //! Order-independent match against a material pair.
      (self.material_a == a && self.material_b == b) || (self.material_a == b && self.material_b == a)
   }
}
