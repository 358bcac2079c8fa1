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

use std::collections::BTreeSet;

use crate::runtime::{CONV2D_FORWARD_SYMBOL, INT8_DOT_CAPABILITY, SIMULATOR_CAPABILITY};
use crate::types::{DataLayoutFamily, KernelLayoutFamily};

use super::{
    ComputeDescriptor, DispatchContext, ScheduleRef, StrategyCandidate, Tier, Topology,
    TopologyMatch,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("strategy `{0}` registered twice")]
    DuplicateName(&'static str),
}

/// Read-only set of strategy candidates, ordered by tier and then by
/// registration order.
///
/// Build it once before any dispatch happens and share it by reference (or
/// `Arc`); it is never mutated afterwards.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    candidates: Vec<StrategyCandidate>,
}

impl StrategyRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registry holding [`default_candidates`].
    pub fn cpu_defaults() -> Self {
        Self::ordered(default_candidates().to_vec())
    }

    fn ordered(mut candidates: Vec<StrategyCandidate>) -> Self {
        // Stable: registration order is kept inside a tier.
        candidates.sort_by_key(StrategyCandidate::tier);
        Self { candidates }
    }

    pub fn get(&self, name: &str) -> Option<&StrategyCandidate> {
        self.candidates.iter().find(|candidate| candidate.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Candidates in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = &StrategyCandidate> {
        self.candidates.iter()
    }

    pub fn tier(&self, tier: Tier) -> impl Iterator<Item = &StrategyCandidate> {
        self.candidates
            .iter()
            .filter(move |candidate| candidate.tier() == tier)
    }

    /// Generic candidates in evaluation order, paired with their compute name.
    pub fn generic(&self) -> impl Iterator<Item = (&StrategyCandidate, &'static str)> {
        self.candidates
            .iter()
            .filter_map(|candidate| match candidate.compute {
                ComputeDescriptor::Generic { compute } => Some((candidate, compute)),
                ComputeDescriptor::Specialized { .. } => None,
            })
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    candidates: Vec<StrategyCandidate>,
}

impl RegistryBuilder {
    pub fn register(mut self, candidate: StrategyCandidate) -> Self {
        self.candidates.push(candidate);
        self
    }

    pub fn register_all(mut self, candidates: &[StrategyCandidate]) -> Self {
        self.candidates.extend_from_slice(candidates);
        self
    }

    pub fn build(self) -> Result<StrategyRegistry, RegistryError> {
        let mut seen = BTreeSet::new();
        for candidate in &self.candidates {
            if !seen.insert(candidate.name) {
                return Err(RegistryError::DuplicateName(candidate.name));
            }
        }
        Ok(StrategyRegistry::ordered(self.candidates))
    }
}

fn int8_operands(ctx: &DispatchContext<'_>) -> bool {
    ctx.attrs.data_dtype.is_int8() && ctx.attrs.kernel_dtype.is_int8()
}

fn unit_multiplier_undilated(ctx: &DispatchContext<'_>) -> bool {
    matches!(ctx.topology, Topology::Depthwise { multiplier: 1 }) && ctx.attrs.is_undilated()
}

const fn generic(
    name: &'static str,
    topology: TopologyMatch,
    data_layout: DataLayoutFamily,
    kernel_layout: KernelLayoutFamily,
    compute: &'static str,
    schedule: &'static str,
) -> StrategyCandidate {
    StrategyCandidate {
        name,
        requires: None,
        topology,
        data_layout,
        kernel_layout: Some(kernel_layout),
        refine: None,
        compute: ComputeDescriptor::Generic { compute },
        schedule: ScheduleRef(schedule),
    }
}

/// The curated CPU candidate list.
///
/// Order inside the generic tier matters: refined variants come before the
/// fallback for the same layout. Keep it stable so listings stay
/// deterministic.
pub fn default_candidates() -> &'static [StrategyCandidate] {
    use DataLayoutFamily as D;
    use KernelLayoutFamily as K;
    use TopologyMatch::*;

    static CANDIDATES: [StrategyCandidate; 12] = [
        StrategyCandidate {
            name: "conv2d_sim.cpu",
            requires: Some(SIMULATOR_CAPABILITY),
            topology: Any,
            data_layout: D::Nchw,
            kernel_layout: None,
            refine: None,
            compute: ComputeDescriptor::Specialized {
                symbol: CONV2D_FORWARD_SYMBOL,
            },
            schedule: ScheduleRef::EXTERN,
        },
        StrategyCandidate {
            requires: Some(INT8_DOT_CAPABILITY),
            refine: Some(int8_operands),
            ..generic(
                "conv2d_nchw_int8.cpu",
                Dense,
                D::Nchw,
                K::Oihw,
                "conv2d_nchw_int8",
                "schedule_conv2d_nchw_int8",
            )
        },
        generic(
            "conv2d_nchw.cpu",
            Dense,
            D::Nchw,
            K::Oihw,
            "conv2d_nchw",
            "schedule_conv2d_nchw",
        ),
        generic(
            "conv2d_NCHWc.cpu",
            Dense,
            D::NchwBlocked,
            K::OihwBlocked,
            "conv2d_NCHWc",
            "schedule_conv2d_NCHWc",
        ),
        generic(
            "conv2d_nhwc.cpu",
            Dense,
            D::Nhwc,
            K::Hwio,
            "conv2d_nhwc",
            "schedule_conv2d_nhwc",
        ),
        generic(
            "conv2d_hwcn.generic",
            Dense,
            D::Hwcn,
            K::Hwio,
            "conv2d_hwcn",
            "schedule_conv2d_hwcn",
        ),
        StrategyCandidate {
            refine: Some(unit_multiplier_undilated),
            ..generic(
                "depthwise_conv2d_nchw.cpu",
                Depthwise,
                D::Nchw,
                K::Oihw,
                "depthwise_conv2d_nchw",
                "schedule_depthwise_conv2d_nchw",
            )
        },
        generic(
            "depthwise_conv2d_nchw.generic",
            Depthwise,
            D::Nchw,
            K::Oihw,
            "depthwise_conv2d_nchw",
            "schedule_depthwise_conv2d_nchw.generic",
        ),
        generic(
            "depthwise_conv2d_NCHWc.cpu",
            Depthwise,
            D::NchwBlocked,
            K::OihwBlocked,
            "depthwise_conv2d_NCHWc",
            "schedule_depthwise_conv2d_NCHWc",
        ),
        generic(
            "depthwise_conv2d_nhwc.generic",
            Depthwise,
            D::Nhwc,
            K::Hwoi,
            "depthwise_conv2d_nhwc",
            "schedule_depthwise_conv2d_nhwc",
        ),
        generic(
            "group_conv2d_nchw.generic",
            Grouped,
            D::Nchw,
            K::Oihw,
            "group_conv2d_nchw",
            "schedule_group_conv2d_nchw",
        ),
        generic(
            "group_conv2d_nhwc.generic",
            Grouped,
            D::Nhwc,
            K::Hwio,
            "group_conv2d_nhwc",
            "schedule_group_conv2d_nhwc",
        ),
    ];

    &CANDIDATES
}
