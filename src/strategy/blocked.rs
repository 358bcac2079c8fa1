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

//! Dispatch for channel-blocked layouts (`NCHW[x]c` data, `OIHW[x]i[y]o`
//! kernels).
//!
//! Dense kernels tile their input channels with the data block; depthwise
//! kernels carry a unit input block and tile outputs with the data block.
//! Grouped convolutions have no blocked variant.

use crate::types::{DataLayout, KernelLayout, KernelLayoutFamily};

use super::dispatch::{unsupported, DispatchError};
use super::registry::StrategyRegistry;
use super::{DispatchContext, StrategyCandidate, Topology};

pub(super) fn select<'r>(
    registry: &'r StrategyRegistry,
    ctx: &DispatchContext<'_>,
) -> Result<(&'r StrategyCandidate, &'static str), DispatchError> {
    let attrs = ctx.attrs;
    let DataLayout::NchwBlocked { block } = attrs.data_layout else {
        return Err(unsupported(ctx));
    };
    let KernelLayout::OihwBlocked {
        in_block,
        out_block,
    } = attrs.kernel_layout
    else {
        return Err(DispatchError::LayoutMismatch {
            data_layout: attrs.data_layout,
            kernel_layout: attrs.kernel_layout,
            expected: KernelLayoutFamily::OihwBlocked,
        });
    };

    let mismatch = || DispatchError::BlockMismatch {
        data_layout: attrs.data_layout,
        kernel_layout: attrs.kernel_layout,
    };
    if block == 0 || in_block == 0 || out_block == 0 {
        return Err(mismatch());
    }

    let aligned = match ctx.topology {
        Topology::Dense => in_block == block,
        Topology::Depthwise { .. } => in_block == 1 && out_block == block,
        Topology::Grouped => return Err(unsupported(ctx)),
    };
    if !aligned {
        return Err(mismatch());
    }
    if ctx.input.c % block != 0 {
        return Err(DispatchError::IndivisibleChannels {
            channels: ctx.input.c,
            block,
        });
    }
    if ctx.filter.o % out_block != 0 {
        return Err(DispatchError::IndivisibleChannels {
            channels: ctx.filter.o,
            block: out_block,
        });
    }

    registry
        .generic()
        .find(|(candidate, _)| candidate.applies(ctx))
        .ok_or_else(|| unsupported(ctx))
}
