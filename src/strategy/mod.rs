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

//! Conv2d implementation strategies.
//!
//! A [`StrategyCandidate`] describes one implementation variant together with
//! the conditions under which it applies. Candidates live in a
//! [`StrategyRegistry`] built once at start-up; the [`Dispatcher`] walks them
//! in priority order and returns the selected [`Strategy`].

mod blocked;
pub mod dispatch;
pub mod registry;

use std::fmt;

use serde::Serialize;

use crate::runtime::TargetDescriptor;
use crate::shapes::{DerivedShape, FilterDims, InputDims};
use crate::translate::SimulatorParameterVector;
use crate::types::{ConvAttributes, DType, DataLayoutFamily, KernelLayoutFamily};

pub use dispatch::{DispatchError, Dispatcher};
pub use registry::{default_candidates, RegistryBuilder, RegistryError, StrategyRegistry};

/// Priority tier of a candidate. Every specialized candidate is considered
/// before any generic one, regardless of registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Specialized,
    Generic,
}

/// Group/channel structure of a convolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Topology {
    /// `groups == 1`.
    Dense,
    /// `groups == C` and the kernel's output axis equals `groups`; each group
    /// produces `multiplier` output channels.
    Depthwise { multiplier: usize },
    /// Any other `groups > 1` convolution.
    Grouped,
}

impl Topology {
    pub fn classify(groups: usize, input: &InputDims, filter: &FilterDims) -> Self {
        if groups == 1 {
            Topology::Dense
        } else if input.c == groups && filter.o == groups {
            Topology::Depthwise {
                multiplier: filter.i,
            }
        } else {
            Topology::Grouped
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::Dense => f.write_str("dense"),
            Topology::Depthwise { multiplier } => write!(f, "depthwise(x{multiplier})"),
            Topology::Grouped => f.write_str("grouped"),
        }
    }
}

/// Which topologies a candidate accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopologyMatch {
    Any,
    Dense,
    Depthwise,
    Grouped,
}

impl TopologyMatch {
    pub fn admits(self, topology: Topology) -> bool {
        matches!(
            (self, topology),
            (TopologyMatch::Any, _)
                | (TopologyMatch::Dense, Topology::Dense)
                | (TopologyMatch::Depthwise, Topology::Depthwise { .. })
                | (TopologyMatch::Grouped, Topology::Grouped)
        )
    }
}

/// Everything a candidate predicate may inspect.
#[derive(Debug, Clone, Copy)]
pub struct DispatchContext<'a> {
    pub attrs: &'a ConvAttributes,
    pub target: &'a TargetDescriptor,
    pub input: InputDims,
    pub filter: FilterDims,
    pub topology: Topology,
}

/// Extra applicability check run after layouts and topology matched.
pub type Refinement = for<'a> fn(&DispatchContext<'a>) -> bool;

/// How a candidate computes its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ComputeDescriptor {
    /// A registered portable kernel, identified by name.
    Generic { compute: &'static str },
    /// An extern call into the simulator; parameters come from the translator.
    Specialized { symbol: &'static str },
}

/// Reference to a registered schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ScheduleRef(pub &'static str);

impl ScheduleRef {
    /// Schedule used by extern (simulator) computations.
    pub const EXTERN: ScheduleRef = ScheduleRef("schedule_extern");
}

impl fmt::Display for ScheduleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// One registered implementation variant.
#[derive(Clone, Copy)]
pub struct StrategyCandidate {
    pub name: &'static str,
    /// Capability flag the target must advertise.
    pub requires: Option<&'static str>,
    pub topology: TopologyMatch,
    pub data_layout: DataLayoutFamily,
    /// Kernel layout family the candidate needs; `None` accepts any.
    pub kernel_layout: Option<KernelLayoutFamily>,
    pub refine: Option<Refinement>,
    pub compute: ComputeDescriptor,
    pub schedule: ScheduleRef,
}

impl fmt::Debug for StrategyCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyCandidate")
            .field("name", &self.name)
            .field("tier", &self.tier())
            .field("requires", &self.requires)
            .field("topology", &self.topology)
            .field("data_layout", &self.data_layout)
            .field("kernel_layout", &self.kernel_layout)
            .field("refined", &self.refine.is_some())
            .field("compute", &self.compute)
            .field("schedule", &self.schedule)
            .finish()
    }
}

impl StrategyCandidate {
    /// Simulator-backed candidates form the specialized tier.
    pub fn tier(&self) -> Tier {
        match self.compute {
            ComputeDescriptor::Specialized { .. } => Tier::Specialized,
            ComputeDescriptor::Generic { .. } => Tier::Generic,
        }
    }

    /// Whether the candidate owns this operator: target capability, topology
    /// and data layout all match. The kernel layout is checked separately so
    /// that a wrong pairing surfaces as a mismatch.
    pub fn claims(&self, ctx: &DispatchContext<'_>) -> bool {
        self.requires.map_or(true, |cap| ctx.target.has_capability(cap))
            && self.topology.admits(ctx.topology)
            && self.data_layout == ctx.attrs.data_layout.family()
    }

    pub fn accepts_kernel(&self, ctx: &DispatchContext<'_>) -> bool {
        self.kernel_layout
            .map_or(true, |family| family == ctx.attrs.kernel_layout.family())
    }

    pub fn refined(&self, ctx: &DispatchContext<'_>) -> bool {
        self.refine.map_or(true, |refine| refine(ctx))
    }

    /// Full applicability predicate.
    pub fn applies(&self, ctx: &DispatchContext<'_>) -> bool {
        self.claims(ctx) && self.accepts_kernel(ctx) && self.refined(ctx)
    }
}

/// Simulator-bound computation: derived output shape plus the parameter
/// vector, ready to be bound to buffers by the host runtime.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpecializedDescriptor {
    pub symbol: &'static str,
    pub derived: DerivedShape,
    pub params: SimulatorParameterVector,
    pub out_dtype: DType,
    pub sparsity_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Implementation {
    Generic { compute: &'static str },
    Specialized(SpecializedDescriptor),
}

/// The strategy selected for one operator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Strategy {
    pub name: &'static str,
    pub schedule: ScheduleRef,
    pub implementation: Implementation,
}

impl Strategy {
    pub fn is_specialized(&self) -> bool {
        matches!(self.implementation, Implementation::Specialized(_))
    }

    pub fn specialized(&self) -> Option<&SpecializedDescriptor> {
        match &self.implementation {
            Implementation::Specialized(desc) => Some(desc),
            Implementation::Generic { .. } => None,
        }
    }
}
