//! Simulator calling convention.
//!
//! A [`SimulatorCall`] is the fully bound argument list for the simulator's
//! conv2d entry point: fifteen scalar parameters followed by the input,
//! weight and output buffers. The host runtime owns the buffers and performs
//! the call through a [`SimulatorBackend`] implementation.

use std::fmt;

use serde::Serialize;

use crate::runtime::types::{BufferHandle, RuntimeError};
use crate::strategy::SpecializedDescriptor;
use crate::translate::{ParamValue, SimulatorParameterVector};
use crate::types::{DType, TensorShape};

/// Packed-function name of the simulator's forward convolution.
pub const CONV2D_FORWARD_SYMBOL: &str = "simconv.sim.conv2d.forward";

/// One positional argument of a simulator call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CallArg {
    Param(ParamValue),
    Buffer(BufferHandle),
}

impl fmt::Display for CallArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallArg::Param(value) => write!(f, "{value}"),
            CallArg::Buffer(handle) => write!(f, "<buffer {handle}>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatorCall {
    symbol: &'static str,
    args: Vec<CallArg>,
    output_shape: TensorShape,
    out_dtype: DType,
    sparsity_ratio: f64,
}

impl SimulatorCall {
    pub const ARITY: usize = SimulatorParameterVector::ARITY + 3;

    /// Append the three caller-owned buffers to a specialized descriptor's
    /// parameters. `output` must already be allocated to
    /// [`SimulatorCall::output_shape`].
    pub fn bind(
        descriptor: &SpecializedDescriptor,
        input: BufferHandle,
        weight: BufferHandle,
        output: BufferHandle,
    ) -> Self {
        let mut args: Vec<CallArg> = descriptor
            .params
            .to_positional()
            .into_iter()
            .map(CallArg::Param)
            .collect();
        args.extend([
            CallArg::Buffer(input),
            CallArg::Buffer(weight),
            CallArg::Buffer(output),
        ]);

        Self {
            symbol: descriptor.symbol,
            args,
            output_shape: descriptor.derived.output,
            out_dtype: descriptor.out_dtype,
            sparsity_ratio: descriptor.sparsity_ratio,
        }
    }

    pub fn symbol(&self) -> &'static str {
        self.symbol
    }

    pub fn args(&self) -> &[CallArg] {
        &self.args
    }

    pub fn output_shape(&self) -> TensorShape {
        self.output_shape
    }

    pub fn out_dtype(&self) -> DType {
        self.out_dtype
    }

    pub fn sparsity_ratio(&self) -> f64 {
        self.sparsity_ratio
    }

    /// Check that the argument list follows the calling convention: string
    /// paths at `[0]` and `[14]`, integers in between, buffers last.
    pub fn check_convention(&self) -> Result<(), RuntimeError> {
        if self.args.len() != Self::ARITY {
            return Err(RuntimeError::MalformedCall {
                message: format!("expected {} arguments, got {}", Self::ARITY, self.args.len()),
            });
        }
        for (idx, arg) in self.args.iter().enumerate() {
            let ok = match idx {
                0 | 14 => matches!(arg, CallArg::Param(ParamValue::Str(_))),
                1..=13 => matches!(arg, CallArg::Param(ParamValue::Int(_))),
                _ => matches!(arg, CallArg::Buffer(_)),
            };
            if !ok {
                return Err(RuntimeError::MalformedCall {
                    message: format!("argument [{idx}] has the wrong kind: {arg}"),
                });
            }
        }
        Ok(())
    }
}

/// Contract for runtimes able to execute a bound simulator call.
///
/// An implementation is responsible for resolving the buffer handles and
/// running the simulator; this crate only prepares the call.
pub trait SimulatorBackend {
    fn invoke(&self, call: &SimulatorCall) -> Result<(), RuntimeError>;
}
