//! Runtime-facing surface: target descriptors and the simulator calling
//! convention.
//!
//! This crate never executes kernels. The types here describe what a host
//! runtime receives from dispatch and how it invokes the simulator.

pub mod sim;
pub mod types;

pub use sim::{CallArg, SimulatorBackend, SimulatorCall, CONV2D_FORWARD_SYMBOL};
pub use types::{
    BufferHandle, DeviceClass, RuntimeError, TargetDescriptor, TargetParseError,
    INT8_DOT_CAPABILITY, SIMULATOR_CAPABILITY,
};
