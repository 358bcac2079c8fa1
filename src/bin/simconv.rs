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

//! simconv command-line tool: select a conv2d strategy for a target and show
//! the simulator call it would produce.

use std::path::PathBuf;
use std::process;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};

use simconv::runtime::TargetDescriptor;
use simconv::strategy::Tier;
use simconv::{
    ConvAttributes, DType, DataLayout, Dispatcher, Implementation, KernelLayout, SimulatorCall,
    SimulatorConfig, StrategyRegistry, TensorShape,
};

#[derive(Parser, Debug)]
#[command(name = "simconv", about = "Conv2d strategy selection", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Select the strategy for one conv2d operator.
    Select(SelectArgs),
    /// List registered candidates in evaluation order.
    List,
}

#[derive(Args, Debug)]
struct SelectArgs {
    /// Simulator config (TOML). Defaults to empty paths.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Target string, e.g. "cpu -libs=sim".
    #[arg(long, default_value = "cpu")]
    target: String,
    /// Data shape in data-layout order, e.g. 1,2,10,10.
    #[arg(long, value_name = "DIMS")]
    data: String,
    /// Kernel shape in kernel-layout order, e.g. 2,2,3,3.
    #[arg(long, value_name = "DIMS")]
    kernel: String,
    #[arg(long, default_value = "NCHW")]
    data_layout: String,
    #[arg(long, default_value = "OIHW")]
    kernel_layout: String,
    #[arg(long, default_value = "1,1")]
    strides: String,
    #[arg(long, default_value = "0,0")]
    padding: String,
    #[arg(long, default_value = "1,1")]
    dilation: String,
    #[arg(long, default_value_t = 1)]
    groups: usize,
    #[arg(long, default_value = "float32")]
    dtype: String,
    #[arg(long, default_value = "float32")]
    out_dtype: String,
    /// Emit JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Select(args) => run_select(&args),
        Command::List => {
            run_list();
            Ok(())
        }
    };
    if let Err(err) = result {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn run_list() {
    let registry = StrategyRegistry::cpu_defaults();
    for candidate in registry.iter() {
        let tier = match candidate.tier() {
            Tier::Specialized => "specialized",
            Tier::Generic => "generic",
        };
        let kernel = candidate
            .kernel_layout
            .map_or_else(|| "*".to_string(), |family| family.to_string());
        println!(
            "{:<32} {:<12} {:?}/{} {:?}",
            candidate.name, tier, candidate.data_layout, kernel, candidate.topology
        );
    }
}

fn run_select(args: &SelectArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => SimulatorConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SimulatorConfig::default(),
    };
    let target: TargetDescriptor = args.target.parse().context("parsing --target")?;
    let dtype: DType = args.dtype.parse()?;
    let attrs = ConvAttributes {
        kernel_size: None,
        strides: parse_pair(&args.strides).context("parsing --strides")?,
        padding: parse_pair(&args.padding).context("parsing --padding")?,
        dilation: parse_pair(&args.dilation).context("parsing --dilation")?,
        groups: args.groups,
        data_layout: args.data_layout.parse::<DataLayout>()?,
        kernel_layout: args.kernel_layout.parse::<KernelLayout>()?,
        out_dtype: args.out_dtype.parse()?,
        data_dtype: dtype,
        kernel_dtype: dtype,
    };
    let data = parse_shape(&args.data).context("parsing --data")?;
    let kernel = parse_shape(&args.kernel).context("parsing --kernel")?;

    let registry = StrategyRegistry::cpu_defaults();
    let dispatcher = Dispatcher::new(&registry, config);
    let strategy = dispatcher.select_strategy(&attrs, &data, &kernel, &target)?;

    // Placeholder buffer handles: the host runtime owns the real buffers.
    let call = strategy
        .specialized()
        .map(|desc| SimulatorCall::bind(desc, 0, 1, 2));

    if args.json {
        let value = serde_json::json!({ "strategy": strategy, "call": call });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("strategy: {}", strategy.name);
    println!("schedule: {}", strategy.schedule);
    match &strategy.implementation {
        Implementation::Generic { compute } => println!("compute:  {compute}"),
        Implementation::Specialized(desc) => {
            println!("compute:  extern {}", desc.symbol);
            println!("output:   {} {}", desc.derived.output, desc.out_dtype);
        }
    }
    if let Some(call) = call {
        for (idx, arg) in call.args().iter().enumerate() {
            println!("  [{idx:>2}] {arg}");
        }
    }
    Ok(())
}

fn parse_dims(text: &str) -> Result<Vec<usize>> {
    text.split(',')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .map_err(|err| anyhow!("invalid extent `{}`: {err}", part.trim()))
        })
        .collect()
}

fn parse_pair(text: &str) -> Result<(usize, usize)> {
    match parse_dims(text)?.as_slice() {
        [a, b] => Ok((*a, *b)),
        [a] => Ok((*a, *a)),
        other => Err(anyhow!("expected one or two values, got {}", other.len())),
    }
}

fn parse_shape(text: &str) -> Result<TensorShape> {
    Ok(TensorShape::from_slice(&parse_dims(text)?)?)
}
