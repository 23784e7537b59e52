//! Broadphase pair culling over body bounding volumes.

mod naive;
mod sap;

pub use naive::NaiveBroadphase;
pub use sap::SapBroadphase;

use crate::{aabb::Aabb, body::{Body, BodyType, SleepState}};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BroadphaseKind {
   Naive,
   #[default]
   Sap,
}

impl BroadphaseKind {
   pub fn create(self) -> Box<dyn Broadphase> {
      match self {
         BroadphaseKind::Naive => Box::new(NaiveBroadphase::new()),
         BroadphaseKind::Sap => Box::new(SapBroadphase::new()),
      }
   }
}

/// Which bound gates pair emission once two bodies pass [`can_collide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BoundingVolume {
   #[default]
   Aabb,
   BoundingCircle,
}

/// Finds candidate body pairs. Bodies are addressed by their slot in the world's body list,
/// and their AABBs must be up to date when a query runs.
pub trait Broadphase: std::fmt::Debug {
   /// Appends every pair of slots `(i, j)` that may be in contact.
   fn collision_pairs(&mut self, bodies: &[Body], out: &mut Vec<(usize, usize)>);

   /// Appends the slot of every body whose AABB overlaps `aabb`.
   fn aabb_query(&mut self, bodies: &[Body], aabb: &Aabb, out: &mut Vec<usize>) {
      out.extend(bodies.iter().enumerate().filter(|(_, b)| b.aabb().overlaps(aabb)).map(|(i, _)| i));
   }

   fn bounding_volume(&self) -> BoundingVolume;
   fn set_bounding_volume(&mut self, volume: BoundingVolume);

   /// A body was appended at `slot`.
   fn body_added(&mut self, _slot: usize) {}
   /// The body at `slot` was removed, and later slots shifted down by one.
   fn body_removed(&mut self, _slot: usize) {}
   fn clear(&mut self) {}
}

/// Whether two bodies may touch at all, judging by type and sleep state.
pub fn can_collide(a: &Body, b: &Body) -> bool {
   use BodyType::*;

   let moving = |t: BodyType| t != Static && t != Kinematic;
   if !moving(a.body_type) && !moving(b.body_type) {
      return false;
   }

   let (sa, sb) = (a.sleep_state() == SleepState::Sleeping, b.sleep_state() == SleepState::Sleeping);
   if (sa && b.body_type == Static) || (sb && a.body_type == Static) {
      return false;
   }
   !(sa && sb)
}

pub fn bounding_volume_check(a: &Body, b: &Body, volume: BoundingVolume) -> bool {
   match volume {
      BoundingVolume::Aabb => a.aabb().overlaps(&b.aabb()),
      BoundingVolume::BoundingCircle => {
         let r = a.bounding_radius() + b.bounding_radius();
         a.position.distance_squared(b.position) <= r * r
      }
   }
}
