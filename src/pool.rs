/// A free list of reusable objects.
///
/// Objects are moved out on [`Pool::acquire`] and moved back in on
/// [`Pool::release`], so a released object can no longer be touched by its
/// previous holder.
pub struct Pool<T> {
   objects: Vec<T>,
   create: fn() -> T,
   reset: fn(&mut T),
}

impl<T> Pool<T> {
   pub fn new(create: fn() -> T, reset: fn(&mut T)) -> Pool<T> {
      Pool { objects: Vec::new(), create, reset }
   }

   /// Grows or shrinks the free list to exactly `size` objects.
   pub fn resize(&mut self, size: usize) {
      self.objects.truncate(size);
      while self.objects.len() < size {
         self.objects.push((self.create)());
      }
   }

   #[inline]
   pub fn acquire(&mut self) -> T {
      self.objects.pop().unwrap_or_else(self.create)
   }

   #[inline]
   pub fn release(&mut self, mut object: T) {
      (self.reset)(&mut object);
      self.objects.push(object);
   }

   pub fn release_all(&mut self, objects: impl IntoIterator<Item = T>) {
      for object in objects {
         self.release(object);
      }
   }

   /// Number of objects waiting to be reused.
   #[inline]
   pub fn len(&self) -> usize {
      self.objects.len()
   }

   #[inline]
   pub fn is_empty(&self) -> bool {
      self.objects.is_empty()
   }
}

impl<T> std::fmt::Debug for Pool<T> {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      f.debug_struct("Pool").field("free", &self.objects.len()).finish()
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn recycles_released_objects() {
      let mut pool: Pool<Vec<u32>> = Pool::new(Vec::new, Vec::clear);
      pool.resize(2);
      assert_eq!(pool.len(), 2);

      let mut v = pool.acquire();
      v.extend([1, 2, 3]);
      let cap = v.capacity();
      pool.release(v);
      assert_eq!(pool.len(), 2);

      let v = pool.acquire();
      assert!(v.is_empty());
      assert_eq!(v.capacity(), cap);

      let _a = pool.acquire();
      let _b = pool.acquire(); // freshly created
      assert!(pool.is_empty());
   }
}
