//! Typed world events and a synchronous listener registry.

use crate::{body::BodyHandle, shape::ShapeId, spring::SpringHandle, Vec2};
use fnv::FnvHashMap;
use std::{cell::RefCell, rc::Rc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
   AddBody,
   RemoveBody,
   AddSpring,
   RemoveSpring,
   PostBroadphase,
   BeginContact,
   EndContact,
   PreSolve,
   PostStep,
   Impact,
   Sleep,
   Sleepy,
   WakeUp,
}

/// Snapshot of one contact equation, taken when the event is emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactInfo {
   pub body_a: BodyHandle,
   pub body_b: BodyHandle,
   pub shape_a: ShapeId,
   pub shape_b: ShapeId,
   /// Out of `shape_a`, into `shape_b`.
   pub normal_a: Vec2,
   pub contact_point_a: Vec2,
   pub contact_point_b: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorldEvent {
   AddBody { body: BodyHandle },
   RemoveBody { body: BodyHandle },
   AddSpring { spring: SpringHandle },
   RemoveSpring { spring: SpringHandle },
   /// Candidate body pairs that survived the broadphase.
   PostBroadphase { pairs: Vec<(BodyHandle, BodyHandle)> },
   /// Two shapes started overlapping. `contacts` is empty for sensors.
   BeginContact {
      body_a: BodyHandle,
      body_b: BodyHandle,
      shape_a: ShapeId,
      shape_b: ShapeId,
      contacts: Vec<ContactInfo>,
   },
   EndContact {
      body_a: BodyHandle,
      body_b: BodyHandle,
      shape_a: ShapeId,
      shape_b: ShapeId,
   },
   PreSolve { contact_equations: usize, friction_equations: usize },
   PostStep,
   /// First contact between two bodies, fired after solving.
   Impact {
      body_a: BodyHandle,
      body_b: BodyHandle,
      shape_a: ShapeId,
      shape_b: ShapeId,
      contact: ContactInfo,
   },
   Sleep { body: BodyHandle },
   Sleepy { body: BodyHandle },
   WakeUp { body: BodyHandle },
}

impl WorldEvent {
   pub fn event_type(&self) -> EventType {
      match self {
         WorldEvent::AddBody { .. } => EventType::AddBody,
         WorldEvent::RemoveBody { .. } => EventType::RemoveBody,
         WorldEvent::AddSpring { .. } => EventType::AddSpring,
         WorldEvent::RemoveSpring { .. } => EventType::RemoveSpring,
         WorldEvent::PostBroadphase { .. } => EventType::PostBroadphase,
         WorldEvent::BeginContact { .. } => EventType::BeginContact,
         WorldEvent::EndContact { .. } => EventType::EndContact,
         WorldEvent::PreSolve { .. } => EventType::PreSolve,
         WorldEvent::PostStep => EventType::PostStep,
         WorldEvent::Impact { .. } => EventType::Impact,
         WorldEvent::Sleep { .. } => EventType::Sleep,
         WorldEvent::Sleepy { .. } => EventType::Sleepy,
         WorldEvent::WakeUp { .. } => EventType::WakeUp,
      }
   }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Rc<RefCell<dyn FnMut(&WorldEvent)>>;

#[derive(Default)]
struct Registry {
   listeners: FnvHashMap<EventType, Vec<(ListenerId, Listener)>>,
   next_id: u64,
}

/// Shared listener registry. Clones refer to the same listeners, so a
/// listener may capture a clone to register or remove listeners.
///
/// Listeners run synchronously in registration order. Each emission works on
/// a snapshot of the listener list: listeners added while an event is being
/// dispatched only see later emissions.
#[derive(Clone, Default)]
pub struct EventEmitter {
   registry: Rc<RefCell<Registry>>,
}

impl std::fmt::Debug for EventEmitter {
   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
      let count: usize = self.registry.borrow().listeners.values().map(Vec::len).sum();
      f.debug_struct("EventEmitter").field("listeners", &count).finish()
   }
}

impl EventEmitter {
   pub fn new() -> EventEmitter {
      EventEmitter::default()
   }

   pub fn on(&self, event_type: EventType, listener: impl FnMut(&WorldEvent) + 'static) -> ListenerId {
      let mut registry = self.registry.borrow_mut();
      let id = ListenerId(registry.next_id);
      registry.next_id += 1;
      let listener: Listener = Rc::new(RefCell::new(listener));
      registry.listeners.entry(event_type).or_default().push((id, listener));
      id
   }

   pub fn off(&self, event_type: EventType, id: ListenerId) -> bool {
      //! Returns whether the listener was registered.
      let mut registry = self.registry.borrow_mut();
      let Some(list) = registry.listeners.get_mut(&event_type) else { return false };
      let before = list.len();
      list.retain(|(lid, _)| *lid != id);
      before != list.len()
   }

   pub fn has(&self, event_type: EventType) -> bool {
      self.registry.borrow().listeners.get(&event_type).map_or(false, |l| !l.is_empty())
   }

   pub fn emit(&self, event: &WorldEvent) {
      let snapshot: Vec<Listener> = match self.registry.borrow().listeners.get(&event.event_type()) {
         Some(list) => list.iter().map(|(_, l)| l.clone()).collect(),
         None => return,
      };
      for listener in snapshot {
         // a listener re-emitting its own event type is not re-entered
         if let Ok(mut f) = listener.try_borrow_mut() {
            (*f)(event);
         }
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn registration_order() {
      let emitter = EventEmitter::new();
      let log = Rc::new(RefCell::new(Vec::new()));
      for i in 0..3 {
         let log = log.clone();
         emitter.on(EventType::PostStep, move |_| log.borrow_mut().push(i));
      }
      emitter.emit(&WorldEvent::PostStep);
      assert_eq!(*log.borrow(), vec![0, 1, 2]);
   }

   #[test]
   fn listeners_added_during_emit_wait_for_next_emit() {
      let emitter = EventEmitter::new();
      let calls = Rc::new(RefCell::new(0));

      let inner_emitter = emitter.clone();
      let inner_calls = calls.clone();
      let added = Rc::new(RefCell::new(false));
      emitter.on(EventType::PostStep, move |_| {
         if !*added.borrow() {
            *added.borrow_mut() = true;
            let calls = inner_calls.clone();
            inner_emitter.on(EventType::PostStep, move |_| *calls.borrow_mut() += 1);
         }
      });

      emitter.emit(&WorldEvent::PostStep);
      assert_eq!(*calls.borrow(), 0);
      emitter.emit(&WorldEvent::PostStep);
      assert_eq!(*calls.borrow(), 1);
   }

   #[test]
   fn off_removes() {
      let emitter = EventEmitter::new();
      let hits = Rc::new(RefCell::new(0));
      let h = hits.clone();
      let id = emitter.on(EventType::Sleep, move |_| *h.borrow_mut() += 1);
      assert!(emitter.has(EventType::Sleep));
      assert!(emitter.off(EventType::Sleep, id));
      assert!(!emitter.off(EventType::Sleep, id));
      emitter.emit(&WorldEvent::Sleep { body: crate::body::BodyHandle(7) });
      assert_eq!(*hits.borrow(), 0);
   }
}
