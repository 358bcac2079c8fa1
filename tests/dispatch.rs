use simconv::runtime::{TargetDescriptor, INT8_DOT_CAPABILITY, SIMULATOR_CAPABILITY};
use simconv::shapes;
use simconv::strategy::{DispatchContext, Topology};
use simconv::translate::TranslationError;
use simconv::types::KernelLayoutFamily;
use simconv::{
    ConvAttributes, DType, DataLayout, DispatchError, Dispatcher, Implementation, KernelLayout,
    SimulatorConfig, StrategyRegistry, TensorShape,
};

fn shape(dims: [usize; 4]) -> TensorShape {
    TensorShape::new(dims).unwrap()
}

fn sim_target() -> TargetDescriptor {
    TargetDescriptor::cpu().with_capability(SIMULATOR_CAPABILITY)
}

fn select(
    attrs: &ConvAttributes,
    data: [usize; 4],
    kernel: [usize; 4],
    target: &TargetDescriptor,
) -> Result<simconv::Strategy, DispatchError> {
    let registry = StrategyRegistry::cpu_defaults();
    let dispatcher = Dispatcher::new(
        &registry,
        SimulatorConfig::new("arch/test.cfg", "arch/tiles.txt").with_sparsity_ratio(0.5),
    );
    dispatcher.select_strategy(attrs, &shape(data), &shape(kernel), target)
}

#[test]
fn simulator_capability_selects_specialized_candidate() {
    let attrs = ConvAttributes {
        padding: (1, 1),
        ..ConvAttributes::default()
    };
    let strategy = select(&attrs, [1, 2, 10, 10], [2, 2, 3, 3], &sim_target()).unwrap();

    assert_eq!(strategy.name, "conv2d_sim.cpu");
    assert_eq!(strategy.schedule.0, "schedule_extern");
    let desc = strategy.specialized().expect("specialized descriptor");
    assert_eq!(desc.derived.output.dims(), [1, 2, 10, 10]);
    assert_eq!(desc.params.config_path, "arch/test.cfg");
    assert_eq!(desc.params.tiles_path, "arch/tiles.txt");
    assert_eq!(desc.sparsity_ratio, 0.5);
    assert_eq!(desc.out_dtype, DType::F32);
}

#[test]
fn specialized_candidate_wins_even_when_registered_last() {
    let generic: Vec<_> = simconv::strategy::default_candidates()
        .iter()
        .copied()
        .filter(|c| c.name != "conv2d_sim.cpu")
        .collect();
    let sim = *StrategyRegistry::cpu_defaults()
        .get("conv2d_sim.cpu")
        .unwrap();
    let registry = StrategyRegistry::builder()
        .register_all(&generic)
        .register(sim)
        .build()
        .unwrap();

    let dispatcher = Dispatcher::new(&registry, SimulatorConfig::default());
    let strategy = dispatcher
        .select_strategy(
            &ConvAttributes::default(),
            &shape([1, 3, 8, 8]),
            &shape([4, 3, 3, 3]),
            &sim_target(),
        )
        .unwrap();
    assert!(strategy.is_specialized());
    assert_eq!(strategy.name, "conv2d_sim.cpu");
}

#[test]
fn translation_failure_is_not_downgraded() {
    let err = select(
        &ConvAttributes::default(),
        [2, 3, 8, 8],
        [4, 3, 3, 3],
        &sim_target(),
    )
    .unwrap_err();
    assert_eq!(
        err,
        DispatchError::TranslationFailed(TranslationError::UnsupportedBatchSize(2))
    );
}

#[test]
fn grouped_operator_on_simulator_target_fails_translation() {
    let attrs = ConvAttributes {
        groups: 2,
        ..ConvAttributes::default()
    };
    let err = select(&attrs, [1, 4, 8, 8], [4, 2, 3, 3], &sim_target()).unwrap_err();
    assert_eq!(
        err,
        DispatchError::TranslationFailed(TranslationError::UnsupportedGroups(2))
    );
}

#[test]
fn simulator_target_with_nhwc_uses_generic_kernel() {
    let attrs = ConvAttributes {
        data_layout: DataLayout::Nhwc,
        kernel_layout: KernelLayout::Hwio,
        ..ConvAttributes::default()
    };
    let strategy = select(&attrs, [1, 8, 8, 3], [3, 3, 3, 4], &sim_target()).unwrap();
    assert_eq!(strategy.name, "conv2d_nhwc.cpu");
    assert!(!strategy.is_specialized());
}

#[test]
fn invalid_dilation_is_rejected_before_branching() {
    let attrs = ConvAttributes {
        dilation: (0, 1),
        data_layout: DataLayout::Hwcn,
        kernel_layout: KernelLayout::Oihw,
        ..ConvAttributes::default()
    };
    let err = select(&attrs, [8, 8, 3, 1], [4, 3, 3, 3], &sim_target()).unwrap_err();
    assert_eq!(err, DispatchError::InvalidDilation((0, 1)));
}

#[test]
fn zero_groups_is_rejected() {
    let attrs = ConvAttributes {
        groups: 0,
        ..ConvAttributes::default()
    };
    let err = select(&attrs, [1, 3, 8, 8], [4, 3, 3, 3], &TargetDescriptor::cpu()).unwrap_err();
    assert_eq!(err, DispatchError::InvalidGroups);
}

#[test]
fn plain_cpu_target_selects_dense_nchw() {
    let strategy = select(
        &ConvAttributes::default(),
        [1, 3, 8, 8],
        [4, 3, 3, 3],
        &TargetDescriptor::cpu(),
    )
    .unwrap();
    assert_eq!(strategy.name, "conv2d_nchw.cpu");
    assert_eq!(
        strategy.implementation,
        Implementation::Generic {
            compute: "conv2d_nchw"
        }
    );
}

#[test]
fn dense_layouts_dispatch_by_data_layout() {
    let cases = [
        (DataLayout::Nhwc, KernelLayout::Hwio, [1, 8, 8, 3], [3, 3, 3, 4], "conv2d_nhwc.cpu"),
        (DataLayout::Hwcn, KernelLayout::Hwio, [8, 8, 3, 1], [3, 3, 3, 4], "conv2d_hwcn.generic"),
    ];
    for (data_layout, kernel_layout, data, kernel, expected) in cases {
        let attrs = ConvAttributes {
            data_layout,
            kernel_layout,
            ..ConvAttributes::default()
        };
        let strategy = select(&attrs, data, kernel, &TargetDescriptor::cpu()).unwrap();
        assert_eq!(strategy.name, expected, "{data_layout}/{kernel_layout}");
    }
}

#[test]
fn nhwc_with_wrong_kernel_layout_is_a_mismatch() {
    let attrs = ConvAttributes {
        data_layout: DataLayout::Nhwc,
        kernel_layout: KernelLayout::Oihw,
        ..ConvAttributes::default()
    };
    let err = select(&attrs, [1, 8, 8, 3], [4, 3, 3, 3], &TargetDescriptor::cpu()).unwrap_err();
    assert_eq!(
        err,
        DispatchError::LayoutMismatch {
            data_layout: DataLayout::Nhwc,
            kernel_layout: KernelLayout::Oihw,
            expected: KernelLayoutFamily::Hwio,
        }
    );
}

#[test]
fn int8_variant_needs_capability_and_int8_operands() {
    let attrs = ConvAttributes {
        data_dtype: DType::U8,
        kernel_dtype: DType::I8,
        out_dtype: DType::I32,
        ..ConvAttributes::default()
    };
    let int8_target = TargetDescriptor::cpu().with_capability(INT8_DOT_CAPABILITY);

    let strategy = select(&attrs, [1, 16, 8, 8], [16, 16, 1, 1], &int8_target).unwrap();
    assert_eq!(strategy.name, "conv2d_nchw_int8.cpu");

    let strategy = select(&attrs, [1, 16, 8, 8], [16, 16, 1, 1], &TargetDescriptor::cpu()).unwrap();
    assert_eq!(strategy.name, "conv2d_nchw.cpu");

    let strategy = select(
        &ConvAttributes::default(),
        [1, 16, 8, 8],
        [16, 16, 1, 1],
        &int8_target,
    )
    .unwrap();
    assert_eq!(strategy.name, "conv2d_nchw.cpu");
}

#[test]
fn depthwise_unit_multiplier_takes_fast_path() {
    let attrs = ConvAttributes {
        groups: 8,
        padding: (1, 1),
        ..ConvAttributes::default()
    };
    let strategy = select(&attrs, [1, 8, 16, 16], [8, 1, 3, 3], &TargetDescriptor::cpu()).unwrap();
    assert_eq!(strategy.name, "depthwise_conv2d_nchw.cpu");
}

#[test]
fn depthwise_multiplier_two_takes_general_path() {
    let attrs = ConvAttributes {
        groups: 8,
        ..ConvAttributes::default()
    };
    let strategy = select(&attrs, [1, 8, 16, 16], [8, 2, 3, 3], &TargetDescriptor::cpu()).unwrap();
    assert_eq!(strategy.name, "depthwise_conv2d_nchw.generic");
}

#[test]
fn dilated_depthwise_takes_general_path() {
    let attrs = ConvAttributes {
        groups: 8,
        dilation: (2, 2),
        ..ConvAttributes::default()
    };
    let strategy = select(&attrs, [1, 8, 16, 16], [8, 1, 3, 3], &TargetDescriptor::cpu()).unwrap();
    assert_eq!(strategy.name, "depthwise_conv2d_nchw.generic");
}

#[test]
fn depthwise_nhwc_requires_hwoi() {
    let attrs = ConvAttributes {
        groups: 8,
        data_layout: DataLayout::Nhwc,
        kernel_layout: KernelLayout::Hwoi,
        ..ConvAttributes::default()
    };
    let strategy = select(&attrs, [1, 16, 16, 8], [3, 3, 8, 1], &TargetDescriptor::cpu()).unwrap();
    assert_eq!(strategy.name, "depthwise_conv2d_nhwc.generic");
}

#[test]
fn grouped_convolution_dispatches_by_layout() {
    let attrs = ConvAttributes {
        groups: 2,
        ..ConvAttributes::default()
    };
    let strategy = select(&attrs, [1, 8, 16, 16], [16, 4, 3, 3], &TargetDescriptor::cpu()).unwrap();
    assert_eq!(strategy.name, "group_conv2d_nchw.generic");

    let attrs = ConvAttributes {
        groups: 2,
        data_layout: DataLayout::Nhwc,
        kernel_layout: KernelLayout::Hwio,
        ..ConvAttributes::default()
    };
    let strategy = select(&attrs, [1, 16, 16, 8], [3, 3, 4, 16], &TargetDescriptor::cpu()).unwrap();
    assert_eq!(strategy.name, "group_conv2d_nhwc.generic");
}

#[test]
fn grouped_hwcn_is_unsupported() {
    let attrs = ConvAttributes {
        groups: 2,
        data_layout: DataLayout::Hwcn,
        kernel_layout: KernelLayout::Hwio,
        ..ConvAttributes::default()
    };
    let err = select(&attrs, [16, 16, 8, 1], [3, 3, 4, 16], &TargetDescriptor::cpu()).unwrap_err();
    assert_eq!(
        err,
        DispatchError::UnsupportedLayout {
            data_layout: DataLayout::Hwcn,
            kernel_layout: KernelLayout::Hwio,
            topology: Topology::Grouped,
        }
    );
}

#[test]
fn blocked_layouts_use_blocked_routine() {
    let attrs = ConvAttributes {
        data_layout: DataLayout::NchwBlocked { block: 8 },
        kernel_layout: KernelLayout::OihwBlocked {
            in_block: 8,
            out_block: 8,
        },
        ..ConvAttributes::default()
    };
    let strategy = select(&attrs, [1, 16, 14, 14], [32, 16, 3, 3], &sim_target()).unwrap();
    assert_eq!(strategy.name, "conv2d_NCHWc.cpu");

    let attrs = ConvAttributes {
        groups: 16,
        kernel_layout: KernelLayout::OihwBlocked {
            in_block: 1,
            out_block: 8,
        },
        ..attrs
    };
    let strategy = select(&attrs, [1, 16, 14, 14], [16, 1, 3, 3], &TargetDescriptor::cpu()).unwrap();
    assert_eq!(strategy.name, "depthwise_conv2d_NCHWc.cpu");
}

#[test]
fn blocked_layout_errors() {
    let blocked = ConvAttributes {
        data_layout: DataLayout::NchwBlocked { block: 8 },
        kernel_layout: KernelLayout::Oihw,
        ..ConvAttributes::default()
    };
    let err = select(&blocked, [1, 16, 14, 14], [32, 16, 3, 3], &TargetDescriptor::cpu())
        .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::LayoutMismatch {
            expected: KernelLayoutFamily::OihwBlocked,
            ..
        }
    ));

    let misaligned = ConvAttributes {
        kernel_layout: KernelLayout::OihwBlocked {
            in_block: 4,
            out_block: 8,
        },
        ..blocked.clone()
    };
    let err = select(&misaligned, [1, 16, 14, 14], [32, 16, 3, 3], &TargetDescriptor::cpu())
        .unwrap_err();
    assert!(matches!(err, DispatchError::BlockMismatch { .. }));

    let aligned = ConvAttributes {
        kernel_layout: KernelLayout::OihwBlocked {
            in_block: 8,
            out_block: 8,
        },
        ..blocked
    };
    let err = select(&aligned, [1, 12, 14, 14], [32, 12, 3, 3], &TargetDescriptor::cpu())
        .unwrap_err();
    assert_eq!(
        err,
        DispatchError::IndivisibleChannels {
            channels: 12,
            block: 8
        }
    );
}

#[test]
fn dispatcher_is_shareable_across_threads() {
    let registry = StrategyRegistry::cpu_defaults();
    let dispatcher = Dispatcher::new(&registry, SimulatorConfig::new("a.cfg", "t.txt"));
    let target = sim_target();
    let attrs = ConvAttributes {
        padding: (1, 1),
        ..ConvAttributes::default()
    };

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (1..=4)
            .map(|c| {
                let (dispatcher, target, attrs) = (&dispatcher, &target, &attrs);
                scope.spawn(move || {
                    dispatcher
                        .select_strategy(attrs, &shape([1, c, 10, 10]), &shape([2, c, 3, 3]), target)
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (idx, strategy) in results.iter().enumerate() {
        let desc = strategy.specialized().unwrap();
        assert_eq!(desc.params.c, idx + 1);
        assert_eq!(desc.derived.output.dims(), [1, 2, 10, 10]);
    }
}

#[test]
fn zero_block_factors_are_a_mismatch() {
    let layouts = [(8, 8, 0), (8, 0, 8), (0, 8, 8)];
    for (block, in_block, out_block) in layouts {
        let attrs = ConvAttributes {
            data_layout: DataLayout::NchwBlocked { block },
            kernel_layout: KernelLayout::OihwBlocked {
                in_block,
                out_block,
            },
            ..ConvAttributes::default()
        };
        let err = select(&attrs, [1, 16, 14, 14], [32, 16, 3, 3], &TargetDescriptor::cpu())
            .unwrap_err();
        assert!(
            matches!(err, DispatchError::BlockMismatch { .. }),
            "block {block}, kernel {in_block}i{out_block}o: {err:?}"
        );
    }
}

#[test]
fn dense_nchw_with_hwio_kernel_expects_oihw() {
    let attrs = ConvAttributes {
        kernel_layout: KernelLayout::Hwio,
        ..ConvAttributes::default()
    };
    let data = shape([1, 3, 8, 8]);
    let kernel = shape([3, 3, 3, 4]);
    let target = TargetDescriptor::cpu();

    let registry = StrategyRegistry::cpu_defaults();
    let input = shapes::input_dims(&data, attrs.data_layout);
    let filter = shapes::filter_dims(&kernel, attrs.kernel_layout);
    let ctx = DispatchContext {
        attrs: &attrs,
        target: &target,
        input,
        filter,
        topology: Topology::classify(attrs.groups, &input, &filter),
    };
    assert!(!registry.get("conv2d_nchw_int8.cpu").unwrap().claims(&ctx));
    assert!(registry.get("conv2d_nchw.cpu").unwrap().claims(&ctx));

    let err = Dispatcher::new(&registry, SimulatorConfig::default())
        .select_strategy(&attrs, &data, &kernel, &target)
        .unwrap_err();
    assert_eq!(
        err,
        DispatchError::LayoutMismatch {
            data_layout: DataLayout::Nchw,
            kernel_layout: KernelLayout::Hwio,
            expected: KernelLayoutFamily::Oihw,
        }
    );
}

#[test]
fn grouped_nchw_with_hwio_kernel_is_a_mismatch() {
    let attrs = ConvAttributes {
        groups: 2,
        kernel_layout: KernelLayout::Hwio,
        ..ConvAttributes::default()
    };
    let err = select(&attrs, [1, 8, 16, 16], [3, 3, 4, 16], &TargetDescriptor::cpu()).unwrap_err();
    assert_eq!(
        err,
        DispatchError::LayoutMismatch {
            data_layout: DataLayout::Nchw,
            kernel_layout: KernelLayout::Hwio,
            expected: KernelLayoutFamily::Oihw,
        }
    );
}

#[test]
fn generic_strategies_carry_their_compute_name() {
    let attrs = ConvAttributes {
        data_layout: DataLayout::NchwBlocked { block: 8 },
        kernel_layout: KernelLayout::OihwBlocked {
            in_block: 8,
            out_block: 8,
        },
        ..ConvAttributes::default()
    };
    let strategy = select(&attrs, [1, 16, 14, 14], [32, 16, 3, 3], &sim_target()).unwrap();
    assert_eq!(
        strategy.implementation,
        Implementation::Generic {
            compute: "conv2d_NCHWc"
        }
    );
}
