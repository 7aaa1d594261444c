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
//! CLI surface and the resolved configuration built from it.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use crate::launcher::VHost;
use crate::yaml::{self, TestFile};

/// Drive a scenario file against a virtual cluster and report the measured
/// results.
#[derive(Parser, Debug)]
#[command(about, long_about = None)]
pub struct Cli {
    /// Path to the scenario YAML file describing hosts and scenarios to run.
    #[arg(long)]
    pub scenario: PathBuf,

    /// Path to the external virtual-cluster control binary.
    #[arg(long)]
    pub vc_bin: PathBuf,

    /// Path to the session file the control binary operates on.
    #[arg(long)]
    pub session_file: PathBuf,

    /// Path to the node binary, passed through to the control binary on
    /// every `apply`.
    #[arg(long)]
    pub node_bin: PathBuf,

    /// UDP address to listen for stat datagrams on, and the address nodes
    /// are told to report their stats to.
    #[arg(long, default_value = "0.0.0.0:3300")]
    pub listen_addr: SocketAddr,

    /// Where to write the stamped stats file for this run.
    #[arg(long)]
    pub stats_file: PathBuf,

    /// Skip orchestration entirely and re-analyze an existing stats file.
    #[arg(long)]
    pub only_measure: bool,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub struct Config {
    pub test_file: TestFile,
    pub vhosts: Vec<VHost>,
    pub vc_bin: PathBuf,
    pub session_file: PathBuf,
    pub node_bin: PathBuf,
    pub listen_addr: SocketAddr,
    pub stats_file: PathBuf,
    pub only_measure: bool,
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(&cli.scenario)
            .with_context(|| format!("reading scenario file {}", cli.scenario.display()))?;
        let test_file =
            yaml::parse(&text).with_context(|| format!("parsing {}", cli.scenario.display()))?;
        let vhosts = test_file
            .hosts
            .iter()
            .map(|(name, cap)| VHost {
                name: name.clone(),
                cap: *cap,
            })
            .collect();
        Ok(Config {
            test_file,
            vhosts,
            vc_bin: cli.vc_bin.clone(),
            session_file: cli.session_file.clone(),
            node_bin: cli.node_bin.clone(),
            listen_addr: cli.listen_addr,
            stats_file: cli.stats_file.clone(),
            only_measure: cli.only_measure,
        })
    }

    pub fn log_level(verbose: u8) -> log::LevelFilter {
        match verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
