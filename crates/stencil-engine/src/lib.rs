//! Boundary to the native serving engine.
//!
//! [`ServingEngine`] mirrors the engine's exported entry points.
//! [`NativeEngine`] calls them in a loaded shared library,
//! [`RecordingEngine`] records them for tests and dry runs, and
//! [`RegistrationBridge`] is what application code talks to.

pub mod bridge;
pub mod engine;
pub mod error;
pub mod native;
pub mod recording;

pub use bridge::{RegistrationBridge, ShipSummary};
pub use engine::ServingEngine;
pub use error::EngineError;
pub use native::{library_filename, NativeEngine};
pub use recording::{EngineCall, RecordingEngine};
