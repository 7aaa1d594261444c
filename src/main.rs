// cluster-test-orchestrator: scenario-driven orchestration, stat ingestion
// and offline analysis for gossip-membership cluster tests.
// Copyright (C) 2026 the project contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cluster_test_orchestrator::config::{Cli, Config};
use cluster_test_orchestrator::ingestor::StatIngestor;
use cluster_test_orchestrator::launcher::LauncherClient;
use cluster_test_orchestrator::orchestrator::{self, Orchestrator};
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(Config::log_level(cli.verbose));
    let logger = builder.build();
    let multi = MultiProgress::new();
    LogWrapper::new(multi.clone(), logger)
        .try_init()
        .context("initializing logger")?;

    let config = Config::load(&cli)?;

    let all_passed = if config.only_measure {
        run_measure_only(&config)?
    } else {
        run_orchestrated(&config).await?
    };

    if all_passed {
        Ok(())
    } else {
        std::process::exit(1);
    }
}

/// `--only-measure`: skip the launcher and ingestor entirely and re-analyze
/// an already-recorded stats file against every scenario's measurements.
fn run_measure_only(config: &Config) -> Result<bool> {
    let mut all_passed = true;
    for scenario in &config.test_file.scenarios {
        log::info!("re-measuring scenario: {}", scenario.summary());
        let report = orchestrator::measure_and_report(&config.stats_file, scenario)?;
        println!("{report}");
        if !report.success() {
            all_passed = false;
        }
    }
    Ok(all_passed)
}

async fn run_orchestrated(config: &Config) -> Result<bool> {
    let launcher = LauncherClient {
        vhosts: config.vhosts.clone(),
        vc_bin: config.vc_bin.clone(),
        session_file: config.session_file.clone(),
        node_bin: config.node_bin.clone(),
        stats_udp_addr: config.listen_addr,
    };

    // Reset then prepare the session once, up front: every scenario in this
    // run shares the same virtual-cluster topology, so there is exactly one
    // prepare/reset cycle rather than one per scenario.
    launcher
        .reset()
        .await
        .context("resetting launcher session")?;
    launcher
        .prepare()
        .await
        .context("preparing launcher session")?;

    let mut all_passed = true;
    for scenario in &config.test_file.scenarios {
        log::info!("running scenario: {}", scenario.summary());

        let ingestor = Arc::new(
            StatIngestor::listen(config.listen_addr, &config.stats_file)
                .await
                .context("starting stat ingestor")?,
        );
        let orchestrator = Orchestrator::new(launcher.clone(), ingestor.clone(), config.stats_file.clone());

        let report = orchestrator.run_scenario(scenario).await?;
        ingestor.shutdown().await;

        println!("{report}");
        if !report.success() {
            all_passed = false;
        }
    }
    Ok(all_passed)
}
