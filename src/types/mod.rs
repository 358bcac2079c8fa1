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

//! Operator-level type definitions: element types, 4-D tensor shapes,
//! layouts and convolution attributes.
//!
//! # Example
//! ```
//! use simconv::types::{DType, TensorShape};
//! let shape = TensorShape::new([1, 2, 10, 10]).unwrap();
//! assert_eq!(shape.dims(), [1, 2, 10, 10]);
//! assert!(DType::I8.is_int8());
//! ```

pub mod attrs;
pub mod layout;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

pub use attrs::ConvAttributes;
pub use layout::{DataLayout, DataLayoutFamily, KernelLayout, KernelLayoutFamily, LayoutParseError};

/// Numeric element kind carried by operator inputs and outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(into = "String")]
pub enum DType {
    I8,
    U8,
    I32,
    #[default]
    F32,
    BF16,
    F16,
}

impl DType {
    /// True for the 8-bit integer kinds used by int8 dot-product kernels.
    pub fn is_int8(self) -> bool {
        matches!(self, DType::I8 | DType::U8)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DType::I8 => "int8",
            DType::U8 => "uint8",
            DType::I32 => "int32",
            DType::F32 => "float32",
            DType::BF16 => "bfloat16",
            DType::F16 => "float16",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DType> for String {
    fn from(dtype: DType) -> Self {
        dtype.as_str().to_string()
    }
}

/// Error returned when a dtype name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown dtype `{0}`")]
pub struct DTypeParseError(pub String);

impl FromStr for DType {
    type Err = DTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int8" | "i8" => Ok(DType::I8),
            "uint8" | "u8" => Ok(DType::U8),
            "int32" | "i32" => Ok(DType::I32),
            "float32" | "f32" => Ok(DType::F32),
            "bfloat16" | "bf16" => Ok(DType::BF16),
            "float16" | "f16" => Ok(DType::F16),
            _ => Err(DTypeParseError(s.to_string())),
        }
    }
}

/// Error type returned when building a [`TensorShape`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("expected rank {expected} but found {found}")]
    RankMismatch { expected: usize, found: usize },
    #[error("dimension {axis} must be positive")]
    NonPositiveDim { axis: usize },
}

/// A concrete rank-4 tensor shape.
///
/// The axis meaning depends on the layout it is paired with: a data tensor in
/// `NCHW` stores `[N, C, H, W]`, a kernel in `HWIO` stores `[H, W, I, O]`.
/// Blocked layouts carry their logical (unblocked) extents. Every extent is
/// positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TensorShape {
    dims: [usize; 4],
}

impl TensorShape {
    pub const RANK: usize = 4;

    pub fn new(dims: [usize; 4]) -> Result<Self, ShapeError> {
        if let Some(axis) = dims.iter().position(|&d| d == 0) {
            return Err(ShapeError::NonPositiveDim { axis });
        }
        Ok(Self { dims })
    }

    pub fn from_slice(dims: &[usize]) -> Result<Self, ShapeError> {
        let dims: [usize; 4] = dims.try_into().map_err(|_| ShapeError::RankMismatch {
            expected: Self::RANK,
            found: dims.len(),
        })?;
        Self::new(dims)
    }

    pub fn dims(&self) -> [usize; 4] {
        self.dims
    }

    /// Number of elements described by the shape.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }
}

impl fmt::Display for TensorShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.dims;
        write!(f, "({a},{b},{c},{d})")
    }
}
