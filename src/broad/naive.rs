use super::{bounding_volume_check, can_collide, Broadphase, BoundingVolume};
use crate::body::Body;

/// Tests every body against every other body.
#[derive(Debug, Clone, Default)]
pub struct NaiveBroadphase {
   volume: BoundingVolume,
}

impl NaiveBroadphase {
   pub fn new() -> NaiveBroadphase {
      NaiveBroadphase::default()
   }
}

impl Broadphase for NaiveBroadphase {
   fn collision_pairs(&mut self, bodies: &[Body], out: &mut Vec<(usize, usize)>) {
      for (i, a) in bodies.iter().enumerate() {
         for (j, b) in bodies.iter().enumerate().skip(i + 1) {
            if can_collide(a, b) && bounding_volume_check(a, b, self.volume) {
               out.push((i, j));
            }
         }
      }
   }

   fn bounding_volume(&self) -> BoundingVolume {
      self.volume
   }

   fn set_bounding_volume(&mut self, volume: BoundingVolume) {
      self.volume = volume;
   }
}
