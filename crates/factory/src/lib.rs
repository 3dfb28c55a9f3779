//! # Factory
//!
//! Component registry.
//!
//! Responsibilities:
//! - Map config `kind` strings to sensor and sink constructors
//! - Expand multi-sensor devices into their child sensors
//! - Resolve a `FeedBlueprint` into live components, including the plant
//!   controller and its output

mod builtins;
pub mod error;
pub mod registry;

pub use error::{FactoryError, Result};
pub use registry::{
    ComponentRegistry, ResolveOptions, ResolvedFeed, SensorConstructor, SinkConstructor,
};
