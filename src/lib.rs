//! simconv: conv2d strategy dispatch and accelerator-simulator parameter
//! translation.
//!
//! Given a conv2d operator (attributes plus input and kernel shapes) and a
//! compilation target, [`Dispatcher::select_strategy`] picks the
//! implementation that runs it. When the target opts into the simulator, the
//! [`Translator`] turns the operator into the simulator's positional
//! parameter list and derives the output buffer shape.
//!
//! ```
//! use simconv::{ConvAttributes, Dispatcher, SimulatorConfig, StrategyRegistry, TensorShape};
//!
//! let registry = StrategyRegistry::cpu_defaults();
//! let dispatcher = Dispatcher::new(&registry, SimulatorConfig::new("arch.cfg", "tiles.txt"));
//! let attrs = ConvAttributes { padding: (1, 1), ..ConvAttributes::default() };
//! let data = TensorShape::new([1, 2, 10, 10]).unwrap();
//! let kernel = TensorShape::new([2, 2, 3, 3]).unwrap();
//!
//! let target = "cpu -libs=sim".parse().unwrap();
//! let strategy = dispatcher.select_strategy(&attrs, &data, &kernel, &target).unwrap();
//! let desc = strategy.specialized().unwrap();
//! assert_eq!(desc.derived.output.dims(), [1, 2, 10, 10]);
//! ```

pub mod config;
pub mod runtime;
pub mod shapes;
pub mod strategy;
pub mod translate;
pub mod types;

pub use config::{ConfigError, SimulatorConfig};
pub use runtime::{
    BufferHandle, CallArg, DeviceClass, SimulatorBackend, SimulatorCall, TargetDescriptor,
};
pub use shapes::DerivedShape;
pub use strategy::{
    ComputeDescriptor, DispatchError, Dispatcher, Implementation, ScheduleRef,
    SpecializedDescriptor, Strategy, StrategyCandidate, StrategyRegistry,
};
pub use translate::{ParamValue, SimulatorParameterVector, TranslationError, Translator};
pub use types::{ConvAttributes, DType, DataLayout, KernelLayout, TensorShape};
