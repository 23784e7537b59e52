//! A 2D rigid body physics engine.
//!
//! Bodies carry shapes, the [`World`] advances them through time: forces,
//! broadphase pair culling, narrowphase contact generation, a projected
//! Gauss-Seidel solver over SPOOK-stabilized equations, integration with
//! optional continuous collision detection, and island based sleeping.

pub mod aabb;
pub mod body;
pub mod broad;
pub mod constraint;
pub mod equation;
pub mod error;
pub mod events;
pub mod material;
pub mod math;
pub mod narrow;
pub mod overlap;
pub mod polygon;
pub mod pool;
pub mod ray;
pub mod shape;
pub mod solver;
pub mod spring;
pub mod world;

#[cfg(feature = "f64")]
pub type Fp = f64;
#[cfg(feature = "f64")]
pub type Vec2 = glam::DVec2;
#[cfg(feature = "f64")]
pub use std::f64::consts::{FRAC_PI_2, PI};

#[cfg(not(feature = "f64"))]
pub type Fp = f32;
#[cfg(not(feature = "f64"))]
pub type Vec2 = glam::Vec2;
#[cfg(not(feature = "f64"))]
pub use std::f32::consts::{FRAC_PI_2, PI};

pub use aabb::Aabb;
pub use body::{Body, BodyHandle, BodyOptions, BodyType, SleepState};
pub use broad::{BoundingVolume, Broadphase, BroadphaseKind, NaiveBroadphase, SapBroadphase};
pub use constraint::{
   Constraint, ConstraintHandle, ConstraintKind, DistanceConstraint, GearConstraint, LockConstraint, PrismaticConstraint,
   RevoluteConstraint,
};
pub use equation::{Equation, EquationKind};
pub use error::{PhysicsError, PhysicsResult};
pub use events::{ContactInfo, EventEmitter, EventType, ListenerId, WorldEvent};
pub use material::{ContactMaterial, Material, MaterialId};
pub use narrow::{ContactPoint, Manifold, Narrowphase};
pub use overlap::{OverlapKeeper, OverlapRecord};
pub use ray::{Ray, RayMode, RaycastResult};
pub use shape::{ConvexPolygon, Heightfield, Shape, ShapeId, ShapeKind, ShapeType};
pub use solver::GsSolver;
pub use spring::{LinearSpring, RotationalSpring, Spring, SpringHandle, SpringKind};
pub use world::{SleepMode, World, WorldOptions};
