// Copyright 2025 STARGA Inc.
// Licensed under the Apache License, Version 2.0 (the “License”);
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at:
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an “AS IS” BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Translation of convolution attributes into the simulator's positional
//! parameter schema.
//!
//! Simulator variable names:
//!
//! | name | meaning                               |
//! |------|---------------------------------------|
//! | R, S | filter rows, filter columns           |
//! | C    | filter and input channels             |
//! | K    | filters and output channels           |
//! | G    | groups (always 1 here)                |
//! | N    | batch size (always 1 here)            |
//! | X, Y | input rows, input columns             |
//! | X_, Y_ | output rows, output columns         |
//!
//! The order of [`SimulatorParameterVector::to_positional`] is the
//! simulator's calling convention and must not change on its own.

use std::fmt;

use serde::Serialize;

use crate::config::SimulatorConfig;
use crate::shapes::{self, DerivedShape};
use crate::types::{ConvAttributes, DataLayout, TensorShape};

/// Errors produced while translating an operator for the simulator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TranslationError {
    #[error("dilation must be positive, got {0:?}")]
    InvalidDilation((usize, usize)),
    #[error("strides must be positive, got {0:?}")]
    InvalidStride((usize, usize)),
    #[error("the simulator does not support a batch size greater than one (got {0})")]
    UnsupportedBatchSize(usize),
    #[error("the simulator only supports groups == 1 (got {0})")]
    UnsupportedGroups(usize),
    #[error("the simulator expects NCHW data, got {0}")]
    UnsupportedDataLayout(DataLayout),
    #[error("kernel_size {attr:?} disagrees with kernel extent {kernel:?}")]
    KernelSizeMismatch {
        attr: (usize, usize),
        kernel: (usize, usize),
    },
    #[error("kernel expects {found} input channels per group but data provides {expected}")]
    ChannelMismatch { expected: usize, found: usize },
    #[error("degenerate output extent ({x_out}, {y_out})")]
    DegenerateOutputShape { x_out: i64, y_out: i64 },
    #[error("output extent overflows for padding {padding:?} and dilation {dilation:?}")]
    ExtentOverflow {
        padding: (usize, usize),
        dilation: (usize, usize),
    },
}

/// A single positional simulator argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Str(String),
    Int(i64),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => write!(f, "{s:?}"),
            ParamValue::Int(v) => write!(f, "{v}"),
        }
    }
}

/// The fifteen scalar parameters handed to the simulator's conv2d entry
/// point. Buffer handles are appended by the caller at invocation time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SimulatorParameterVector {
    pub config_path: String,
    pub r: usize,
    pub s: usize,
    pub c: usize,
    pub k: usize,
    pub g: usize,
    pub n: usize,
    pub x: usize,
    pub y: usize,
    pub x_out: usize,
    pub y_out: usize,
    pub stride: usize,
    pub pad_x: usize,
    pub pad_y: usize,
    pub tiles_path: String,
}

impl SimulatorParameterVector {
    pub const ARITY: usize = 15;

    /// Parameters in calling-convention order, slots `[0]` to `[14]`.
    pub fn to_positional(&self) -> [ParamValue; Self::ARITY] {
        let int = |v: usize| ParamValue::Int(v as i64);
        [
            ParamValue::Str(self.config_path.clone()),
            int(self.r),
            int(self.s),
            int(self.c),
            int(self.k),
            int(self.g),
            int(self.n),
            int(self.x),
            int(self.y),
            int(self.x_out),
            int(self.y_out),
            int(self.stride),
            int(self.pad_x),
            int(self.pad_y),
            ParamValue::Str(self.tiles_path.clone()),
        ]
    }
}

/// Pure translator from operator attributes to simulator parameters.
///
/// Holds only the deployment paths taken from [`SimulatorConfig`]; identical
/// inputs always produce identical outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Translator {
    config: SimulatorConfig,
}

impl Translator {
    pub fn new(config: SimulatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Validate a convolution for the simulator and build its parameters.
    ///
    /// `data` must be stored as NCHW; `kernel` is read according to
    /// `attrs.kernel_layout`.
    pub fn translate(
        &self,
        attrs: &ConvAttributes,
        data: &TensorShape,
        kernel: &TensorShape,
    ) -> Result<(DerivedShape, SimulatorParameterVector), TranslationError> {
        if !attrs.has_valid_dilation() {
            return Err(TranslationError::InvalidDilation(attrs.dilation));
        }

        let input = shapes::input_dims(data, attrs.data_layout);
        let filter = shapes::filter_dims(kernel, attrs.kernel_layout);

        if input.n > 1 {
            return Err(TranslationError::UnsupportedBatchSize(input.n));
        }
        if attrs.groups != 1 {
            return Err(TranslationError::UnsupportedGroups(attrs.groups));
        }
        if attrs.data_layout != DataLayout::Nchw {
            return Err(TranslationError::UnsupportedDataLayout(attrs.data_layout));
        }
        if !attrs.has_valid_strides() {
            return Err(TranslationError::InvalidStride(attrs.strides));
        }
        if let Some(attr) = attrs.kernel_size {
            if attr != (filter.h, filter.w) {
                return Err(TranslationError::KernelSizeMismatch {
                    attr,
                    kernel: (filter.h, filter.w),
                });
            }
        }
        if filter.i != input.c / attrs.groups {
            return Err(TranslationError::ChannelMismatch {
                expected: input.c / attrs.groups,
                found: filter.i,
            });
        }

        let (x, y) = (input.h, input.w);
        let (r, s) = (filter.h, filter.w);
        let k = filter.o;
        let (pad_x, pad_y) = attrs.padding;
        let stride = attrs.strides.0;

        // Both extents divide by the row stride; the simulator only takes one.
        let overflow = || TranslationError::ExtentOverflow {
            padding: attrs.padding,
            dilation: attrs.dilation,
        };
        let x_out = shapes::conv_output_extent(x, r, stride, pad_x, attrs.dilation.0)
            .ok_or_else(overflow)?;
        let y_out = shapes::conv_output_extent(y, s, stride, pad_y, attrs.dilation.1)
            .ok_or_else(overflow)?;
        if x_out < 1 || y_out < 1 {
            return Err(TranslationError::DegenerateOutputShape { x_out, y_out });
        }
        let (x_out, y_out) = (x_out as usize, y_out as usize);

        let output = TensorShape::new([1, k, x_out, y_out])
            .map_err(|_| TranslationError::DegenerateOutputShape {
                x_out: x_out as i64,
                y_out: y_out as i64,
            })?;

        let params = SimulatorParameterVector {
            config_path: self.config.simulation_file_path.clone(),
            r,
            s,
            c: input.c,
            k,
            g: 1,
            n: 1,
            x,
            y,
            x_out,
            y_out,
            stride,
            pad_x,
            pad_y,
            tiles_path: self.config.tiles_file_path.clone(),
        };

        Ok((
            DerivedShape {
                x_out,
                y_out,
                output,
            },
            params,
        ))
    }
}
