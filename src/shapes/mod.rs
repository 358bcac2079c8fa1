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

//! Layout-aware convolution shape helpers.
//!
//! These helpers read logical extents out of layout-tagged shapes and compute
//! convolution output extents. They are purely numeric and never fail; the
//! callers decide which results are acceptable.

use serde::Serialize;

use crate::types::{DataLayout, KernelLayout, TensorShape};

/// Logical extents of a convolution input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct InputDims {
    pub n: usize,
    pub c: usize,
    pub h: usize,
    pub w: usize,
}

/// Logical extents of a convolution kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FilterDims {
    /// Output channels (`K`), or input channels for depthwise kernels.
    pub o: usize,
    /// Input channels per group, or the channel multiplier for depthwise kernels.
    pub i: usize,
    pub h: usize,
    pub w: usize,
}

pub fn input_dims(shape: &TensorShape, layout: DataLayout) -> InputDims {
    let dims = shape.dims();
    let [n, c, h, w] = layout.axes();
    InputDims {
        n: dims[n],
        c: dims[c],
        h: dims[h],
        w: dims[w],
    }
}

pub fn filter_dims(shape: &TensorShape, layout: KernelLayout) -> FilterDims {
    let dims = shape.dims();
    let [o, i, h, w] = layout.axes();
    FilterDims {
        o: dims[o],
        i: dims[i],
        h: dims[h],
        w: dims[w],
    }
}

/// Output extent of one spatial axis:
/// `floor((input + 2*pad - dilation*(kernel-1) - 1) / stride) + 1`.
///
/// Computed in checked signed arithmetic: oversized kernels yield a
/// non-positive extent, and `None` means an operand or intermediate does not
/// fit in `i64` (or `stride` is zero).
pub fn conv_output_extent(
    input: usize,
    kernel: usize,
    stride: usize,
    pad: usize,
    dilation: usize,
) -> Option<i64> {
    let [input, kernel, stride, pad, dilation] =
        [input, kernel, stride, pad, dilation].map(i64::try_from);
    let effective = dilation.ok()?.checked_mul(kernel.ok()?.checked_sub(1)?)?;
    let span = input
        .ok()?
        .checked_add(pad.ok()?.checked_mul(2)?)?
        .checked_sub(effective)?
        .checked_sub(1)?;
    span.checked_div_euclid(stride.ok()?)?.checked_add(1)
}

/// Output shape produced for the simulator: spatial extents `(X_, Y_)` and the
/// full `(N, K, X_, Y_)` result tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DerivedShape {
    pub x_out: usize,
    pub y_out: usize,
    pub output: TensorShape,
}
