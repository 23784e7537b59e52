//! Error types for structural world/body/shape operations.
//!
//! Only programmer errors surface here. Degenerate geometry degrades
//! gracefully inside the pipeline and is never reported as an error.

use thiserror::Error;

use crate::{body::BodyHandle, constraint::ConstraintHandle, shape::ShapeId, spring::SpringHandle, Fp};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
   /// The shape is already owned by a body.
   #[error("shape {shape:?} is already attached to body {body:?}")]
   ShapeAlreadyAttached { shape: ShapeId, body: BodyHandle },

   /// Structural mutation was attempted while the world is stepping.
   #[error("cannot {operation} while the world is stepping")]
   WorldStepping { operation: &'static str },

   /// The body is locked by a world that is mid-step.
   #[error("body {0:?} cannot be modified while its world is stepping")]
   BodyLocked(BodyHandle),

   #[error("body {0:?} already belongs to a world")]
   BodyAlreadyInWorld(BodyHandle),

   #[error("body {0:?} is not part of this world")]
   UnknownBody(BodyHandle),

   #[error("constraint {0:?} is not part of this world")]
   UnknownConstraint(ConstraintHandle),

   #[error("spring {0:?} is not part of this world")]
   UnknownSpring(SpringHandle),

   /// A body cannot be removed while constraints still reference it.
   #[error("body {body:?} is still referenced by {count} constraint(s)")]
   BodyHasConstraints { body: BodyHandle, count: usize },

   /// A constraint was added before both of its bodies were.
   #[error("constraint bodies {body_a:?} and {body_b:?} must both be added to the world first")]
   ConstraintBodiesNotInWorld { body_a: BodyHandle, body_b: BodyHandle },

   /// Convex polygons must be wound counter-clockwise.
   #[error("convex vertices must be wound counter-clockwise (signed area {area})")]
   ClockwiseWinding { area: Fp },

   #[error("polygon requires at least 3 vertices, got {count}")]
   TooFewVertices { count: usize },

   #[error("polygon is self-intersecting and cannot be decomposed")]
   SelfIntersecting,

   #[error("heightfield requires at least 2 samples, got {count}")]
   TooFewSamples { count: usize },
}

pub type PhysicsResult<T> = Result<T, PhysicsError>;
