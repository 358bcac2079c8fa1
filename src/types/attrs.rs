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

use serde::Serialize;

use super::{DType, DataLayout, KernelLayout};

/// Hyperparameters of a single 2-D convolution operator.
///
/// Built once per operator instance by the host compiler and only ever read
/// afterwards. Pairs are `(row, column)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ConvAttributes {
    /// `(R, S)` when the host recorded it; the kernel shape is authoritative.
    pub kernel_size: Option<(usize, usize)>,
    pub strides: (usize, usize),
    pub padding: (usize, usize),
    pub dilation: (usize, usize),
    pub groups: usize,
    pub data_layout: DataLayout,
    pub kernel_layout: KernelLayout,
    pub out_dtype: DType,
    /// Element kind of the data tensor.
    pub data_dtype: DType,
    /// Element kind of the kernel tensor.
    pub kernel_dtype: DType,
}

impl Default for ConvAttributes {
    fn default() -> Self {
        Self {
            kernel_size: None,
            strides: (1, 1),
            padding: (0, 0),
            dilation: (1, 1),
            groups: 1,
            data_layout: DataLayout::Nchw,
            kernel_layout: KernelLayout::Oihw,
            out_dtype: DType::F32,
            data_dtype: DType::F32,
            kernel_dtype: DType::F32,
        }
    }
}

impl ConvAttributes {
    /// True when both dilation components are at least one.
    pub fn has_valid_dilation(&self) -> bool {
        self.dilation.0 >= 1 && self.dilation.1 >= 1
    }

    pub fn has_valid_strides(&self) -> bool {
        self.strides.0 >= 1 && self.strides.1 >= 1
    }

    pub fn is_undilated(&self) -> bool {
        self.dilation == (1, 1)
    }
}
