// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Orrery runtime: builds an aspect engine from a RON file and ticks it.
// Run with: cargo run -p orrery-runtime -- --ticks 120

mod demo;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use orrery_aspects::AspectFactory;
use orrery_control::AspectEngine;
use orrery_jobs::PropagationMode;

use crate::demo::RuntimeFile;

#[derive(Parser, Debug)]
#[command(version, about = "Tick a scene on the Orrery aspect engine")]
struct Cli {
    /// RON file with `engine`, `scene` and `spin` sections; the built-in
    /// demo when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Number of ticks to run.
    #[arg(long, default_value_t = 120)]
    ticks: u64,

    /// Override the configured worker thread count.
    #[arg(long)]
    workers: Option<usize>,

    /// Run one depth level at a time in parallel instead of depth-first.
    #[arg(long)]
    per_level: bool,

    /// Log filter used when RUST_LOG is not set.
    #[arg(long, default_value = "info")]
    log: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    orrery_telemetry::init_logging(&cli.log);

    let mut file = match &cli.config {
        Some(path) => RuntimeFile::from_path(path)?,
        None => RuntimeFile::from_ron_str(demo::DEMO)?,
    };
    if let Some(workers) = cli.workers {
        file.engine.worker_threads = workers;
    }
    if cli.per_level {
        file.engine.propagation = PropagationMode::PerLevel;
    }

    let factory = AspectFactory::with_registered();
    log::info!("Known aspects: {}", factory.names().join(", "));

    let mut engine = AspectEngine::from_config(file.engine.clone(), &factory)?;
    demo::populate(&mut engine, &file)?;

    engine.run_for(cli.ticks)?;

    {
        let scene = engine
            .scene()
            .read()
            .map_err(|_| anyhow::anyhow!("scene lock poisoned"))?;
        for (id, node) in scene.iter() {
            let p = node.global.translation();
            log::info!(
                "{:>8} {:<8} world=({:7.3}, {:7.3}, {:7.3})",
                id.to_string(),
                node.name.as_deref().unwrap_or("-"),
                p.x,
                p.y,
                p.z
            );
        }
    }
    for (id, value) in engine.metrics().snapshot() {
        log::info!("{} = {}", id, value.as_f64());
    }

    engine.shutdown();
    Ok(())
}
