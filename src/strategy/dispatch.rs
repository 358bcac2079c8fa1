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

//! Strategy selection for conv2d.
//!
//! Selection is a priority walk over the registry, first match wins:
//!
//! 1. dilation and groups are validated before anything else;
//! 2. specialized candidates whose capability the target advertises and
//!    whose data layout matches are taken unconditionally. Their parameters
//!    come from the [`Translator`]; a translation failure is a hard error and
//!    never falls back to a generic kernel;
//! 3. otherwise the generic candidates are walked in registration order.
//!    Blocked (`NCHW[x]c`) layouts are handed to a dedicated routine.
//!
//! Selection is pure: no I/O, no shared mutable state, so a [`Dispatcher`]
//! may be used from many threads at once.

use crate::config::SimulatorConfig;
use crate::runtime::TargetDescriptor;
use crate::shapes;
use crate::translate::{TranslationError, Translator};
use crate::types::{
    ConvAttributes, DataLayout, DataLayoutFamily, KernelLayout, KernelLayoutFamily, TensorShape,
};

use super::registry::StrategyRegistry;
use super::{
    blocked, ComputeDescriptor, DispatchContext, Implementation, SpecializedDescriptor, Strategy,
    StrategyCandidate, Tier, Topology,
};

/// Errors returned by [`Dispatcher::select_strategy`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("dilation should be positive, got {0:?}")]
    InvalidDilation((usize, usize)),
    #[error("groups must be at least 1")]
    InvalidGroups,
    #[error("{data_layout} data requires a {expected} kernel, got {kernel_layout}")]
    LayoutMismatch {
        data_layout: DataLayout,
        kernel_layout: KernelLayout,
        expected: KernelLayoutFamily,
    },
    #[error("block factors of {data_layout} and {kernel_layout} do not line up")]
    BlockMismatch {
        data_layout: DataLayout,
        kernel_layout: KernelLayout,
    },
    #[error("{channels} channels cannot be split into blocks of {block}")]
    IndivisibleChannels { channels: usize, block: usize },
    #[error("unsupported {topology} conv2d layout {data_layout}/{kernel_layout}")]
    UnsupportedLayout {
        data_layout: DataLayout,
        kernel_layout: KernelLayout,
        topology: Topology,
    },
    #[error("simulator translation failed: {0}")]
    TranslationFailed(#[from] TranslationError),
}

/// Selects conv2d strategies from a registry.
#[derive(Debug, Clone)]
pub struct Dispatcher<'r> {
    registry: &'r StrategyRegistry,
    translator: Translator,
}

impl<'r> Dispatcher<'r> {
    pub fn new(registry: &'r StrategyRegistry, config: SimulatorConfig) -> Self {
        Self {
            registry,
            translator: Translator::new(config),
        }
    }

    pub fn registry(&self) -> &'r StrategyRegistry {
        self.registry
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    pub fn select_strategy(
        &self,
        attrs: &ConvAttributes,
        data: &TensorShape,
        kernel: &TensorShape,
        target: &TargetDescriptor,
    ) -> Result<Strategy, DispatchError> {
        if !attrs.has_valid_dilation() {
            return Err(DispatchError::InvalidDilation(attrs.dilation));
        }
        if attrs.groups == 0 {
            return Err(DispatchError::InvalidGroups);
        }

        let input = shapes::input_dims(data, attrs.data_layout);
        let filter = shapes::filter_dims(kernel, attrs.kernel_layout);
        let ctx = DispatchContext {
            attrs,
            target,
            input,
            filter,
            topology: Topology::classify(attrs.groups, &input, &filter),
        };

        let specialized = self.registry.tier(Tier::Specialized).find_map(|candidate| {
            match candidate.compute {
                ComputeDescriptor::Specialized { symbol } if candidate.applies(&ctx) => {
                    Some((candidate, symbol))
                }
                _ => None,
            }
        });
        if let Some((candidate, symbol)) = specialized {
            log::debug!(
                "conv2d {}/{} on `{}`: specialized strategy `{}`",
                attrs.data_layout,
                attrs.kernel_layout,
                target,
                candidate.name
            );
            return self.specialize(candidate, symbol, attrs, data, kernel);
        }

        let is_blocked = attrs.data_layout.family() == DataLayoutFamily::NchwBlocked;
        let (candidate, compute) = if is_blocked {
            blocked::select(self.registry, &ctx)?
        } else {
            select_generic(self.registry, &ctx)?
        };
        log::debug!(
            "conv2d {}/{} ({}) on `{}`: strategy `{}`",
            attrs.data_layout,
            attrs.kernel_layout,
            ctx.topology,
            target,
            candidate.name
        );
        Ok(compose(candidate, compute))
    }

    fn specialize(
        &self,
        candidate: &StrategyCandidate,
        symbol: &'static str,
        attrs: &ConvAttributes,
        data: &TensorShape,
        kernel: &TensorShape,
    ) -> Result<Strategy, DispatchError> {
        let (derived, params) = self.translator.translate(attrs, data, kernel)?;
        Ok(Strategy {
            name: candidate.name,
            schedule: candidate.schedule,
            implementation: Implementation::Specialized(SpecializedDescriptor {
                symbol,
                derived,
                params,
                out_dtype: attrs.out_dtype,
                sparsity_ratio: self.translator.config().sparsity_ratio,
            }),
        })
    }
}

/// Walk the generic tier. The first candidate that claims the operator but
/// rejects its kernel layout decides the mismatch error, unless a later
/// candidate accepts it.
fn select_generic<'r>(
    registry: &'r StrategyRegistry,
    ctx: &DispatchContext<'_>,
) -> Result<(&'r StrategyCandidate, &'static str), DispatchError> {
    let mut expected: Option<KernelLayoutFamily> = None;
    for (candidate, compute) in registry.generic() {
        if !candidate.claims(ctx) {
            continue;
        }
        if !candidate.accepts_kernel(ctx) {
            log::trace!(
                "`{}` rejects kernel layout {}",
                candidate.name,
                ctx.attrs.kernel_layout
            );
            if expected.is_none() {
                expected = candidate.kernel_layout;
            }
            continue;
        }
        if !candidate.refined(ctx) {
            log::trace!("`{}` refinement not met", candidate.name);
            continue;
        }
        return Ok((candidate, compute));
    }

    Err(match expected {
        Some(expected) => DispatchError::LayoutMismatch {
            data_layout: ctx.attrs.data_layout,
            kernel_layout: ctx.attrs.kernel_layout,
            expected,
        },
        None => unsupported(ctx),
    })
}

pub(super) fn unsupported(ctx: &DispatchContext<'_>) -> DispatchError {
    DispatchError::UnsupportedLayout {
        data_layout: ctx.attrs.data_layout,
        kernel_layout: ctx.attrs.kernel_layout,
        topology: ctx.topology,
    }
}

fn compose(candidate: &StrategyCandidate, compute: &'static str) -> Strategy {
    Strategy {
        name: candidate.name,
        schedule: candidate.schedule,
        implementation: Implementation::Generic { compute },
    }
}
