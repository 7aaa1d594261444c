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
//! Drives a scenario end to end: bootstrap the cluster to the right size,
//! replay its script against the launcher while labelling the stats stream,
//! then measure and report.

use std::fmt;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use tokio::sync::Mutex;

use crate::command::Command;
use crate::error::OrchestratorError;
use crate::ingestor::StatIngestor;
use crate::launcher::{host_slices, slice_addresses, LauncherClient};
use crate::measurement::Measurement;
use crate::scenario::Scenario;
use crate::stream::FileLineStream;
use crate::value::Value;

/// Drives one scenario's worth of node bring-up/teardown against a shared
/// launcher, tracking which slots are currently running itself: the
/// launcher's `apply` is stateless across calls (`spec.md` §4.H), so the
/// running bitmap has to live here, on the driver.
pub struct Orchestrator {
    pub launcher: LauncherClient,
    pub ingestor: Arc<StatIngestor>,
    pub stats_path: std::path::PathBuf,
    running: Mutex<Vec<bool>>,
}

impl Orchestrator {
    pub fn new(launcher: LauncherClient, ingestor: Arc<StatIngestor>, stats_path: std::path::PathBuf) -> Self {
        let total: usize = launcher.vhosts.iter().map(|v| v.cap).sum();
        Orchestrator {
            launcher,
            ingestor,
            stats_path,
            running: Mutex::new(vec![false; total]),
        }
    }
}

/// The outcome of a single measurement against a finished run.
pub struct MeasurementOutcome {
    pub measurement: Measurement,
    pub value: Value,
    pub assertion_failure: Option<String>,
}

impl MeasurementOutcome {
    fn passed(&self) -> bool {
        self.assertion_failure.is_none()
    }
}

/// The full report for one scenario: measurements whose window matches two
/// adjacent script labels go in `main`, in script order; anything else
/// (spanning non-adjacent labels, or `..`-open windows) goes in `extra`.
pub struct ScenarioReport {
    pub scenario_name: String,
    pub main: Vec<MeasurementOutcome>,
    pub extra: Vec<MeasurementOutcome>,
}

impl ScenarioReport {
    pub fn success(&self) -> bool {
        self.main.iter().all(MeasurementOutcome::passed)
            && self.extra.iter().all(MeasurementOutcome::passed)
    }
}

impl fmt::Display for ScenarioReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "== {} ==", self.scenario_name)?;
        for outcome in &self.main {
            write_row(f, outcome)?;
        }
        if !self.extra.is_empty() {
            writeln!(f, "-- Extra Measurements --")?;
            for outcome in &self.extra {
                write_row(f, outcome)?;
            }
        }
        Ok(())
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, outcome: &MeasurementOutcome) -> fmt::Result {
    match &outcome.assertion_failure {
        None => writeln!(f, "{:<40} {}", outcome.measurement.to_string(), outcome.value),
        Some(reason) => writeln!(
            f,
            "{:<40} {}  FAILED: {reason}",
            outcome.measurement.to_string(),
            outcome.value
        ),
    }
}

impl Orchestrator {
    /// Flip slot `idx` (1-based, as script commands name nodes) to `value`.
    /// Out-of-range indices are silently ignored; the scenario's `size` is
    /// validated against the topology when slices are carved.
    async fn set_running(&self, idx: u32, value: bool) {
        let mut bits = self.running.lock().await;
        if let Some(bit) = (idx as usize).checked_sub(1).and_then(|i| bits.get_mut(i)) {
            *bit = value;
        }
    }

    async fn bitmap(&self) -> String {
        self.running
            .lock()
            .await
            .iter()
            .map(|&b| if b { '1' } else { '0' })
            .collect()
    }

    async fn apply_running(&self) -> Result<(), OrchestratorError> {
        let bitmap = self.bitmap().await;
        self.launcher.apply(&bitmap).await?;
        Ok(())
    }

    pub async fn bootstrap(&self, size: u32) -> Result<(), OrchestratorError> {
        {
            let mut bits = self.running.lock().await;
            bits.iter_mut().for_each(|b| *b = false);
        }
        self.apply_running().await?;
        {
            let mut bits = self.running.lock().await;
            for (i, bit) in bits.iter_mut().enumerate() {
                *bit = (i as u32) < size;
            }
        }
        self.apply_running().await?;
        let hosts = self.hosts_for_size(size)?;
        self.ingestor.wait_for_stable(&hosts).await?;
        Ok(())
    }

    fn hosts_for_size(&self, size: u32) -> Result<Vec<String>, OrchestratorError> {
        let slices = host_slices(&self.launcher.vhosts, 0, size as usize)?;
        Ok(slice_addresses(&self.launcher.vhosts, &slices))
    }

    /// Apply a command's side effect only. Does not wait for stability:
    /// every non-`sleep` command is followed by an implicit `WaitForStable`
    /// barrier in [`run_scenario`], regardless of which verb ran.
    async fn execute(&self, cmd: &Command, size: u32) -> Result<(), OrchestratorError> {
        match cmd {
            Command::Kill(n) => {
                self.set_running(*n, false).await;
                self.apply_running().await?;
            }
            Command::Start(n) => {
                self.set_running(*n, true).await;
                self.apply_running().await?;
            }
            Command::RollingRestart { batch, pause } => {
                // Batches are contiguous by slot index and may straddle a
                // host boundary; inherited as-is rather than redesigned.
                for group in &(1..=size).chunks(*batch as usize) {
                    let group: Vec<u32> = group.collect();
                    for &i in &group {
                        self.set_running(i, false).await;
                    }
                    self.apply_running().await?;
                    for &i in &group {
                        self.set_running(i, true).await;
                    }
                    self.apply_running().await?;
                    tokio::time::sleep(*pause).await;
                }
            }
            Command::Sleep(d) => tokio::time::sleep(*d).await,
            Command::WaitForStable => {}
        }
        Ok(())
    }

    /// Run one scenario: bootstrap, replay its script against the launcher
    /// while labelling the stats stream at each step, stop every node, then
    /// measure against the recorded stats file.
    pub async fn run_scenario(&self, scenario: &Scenario) -> Result<ScenarioReport, OrchestratorError> {
        let progress = ProgressBar::new(scenario.script.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{msg} [{bar:40}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress.set_message(scenario.name.clone());

        self.bootstrap(scenario.size).await?;
        for step in &scenario.script {
            self.ingestor
                .insert_label(&step.label, &step.command.to_string())?;
            self.execute(&step.command, scenario.size).await?;
            if !matches!(step.command, Command::Sleep(_)) {
                let hosts = self.hosts_for_size(scenario.size)?;
                self.ingestor.wait_for_stable(&hosts).await?;
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        {
            let mut bits = self.running.lock().await;
            bits.iter_mut().for_each(|b| *b = false);
        }
        self.apply_running().await?;

        self.measure_and_report(scenario)
    }

    fn measure_and_report(&self, scenario: &Scenario) -> Result<ScenarioReport, OrchestratorError> {
        measure_and_report(&self.stats_path, scenario)
    }
}

/// Re-run a scenario's `measure` list against an already-recorded stats file,
/// without touching the launcher or ingestor. Used both by a normal run
/// (after bootstrap + script replay) and by `--only-measure` mode, which
/// skips orchestration entirely and re-analyzes a stats file from a past run.
pub fn measure_and_report(
    stats_path: &std::path::Path,
    scenario: &Scenario,
) -> Result<ScenarioReport, OrchestratorError> {
    let adjacent_pairs: std::collections::HashSet<(&str, &str)> = scenario
        .script
        .windows(2)
        .map(|w| (w[0].label.as_str(), w[1].label.as_str()))
        .collect();

    let mut main = Vec::new();
    let mut extra = Vec::new();
    for measurement in &scenario.measure {
        let mut stream = FileLineStream::open(stats_path)
            .map_err(|e| OrchestratorError::Analysis(crate::error::AnalysisError::Io(e)))?;
        let value = measurement.measure(&mut stream)?;
        let assertion_failure = measurement
            .assertion
            .as_ref()
            .and_then(|a| a.check(value).err())
            .map(|e| e.to_string());
        let outcome = MeasurementOutcome {
            measurement: measurement.clone(),
            value,
            assertion_failure,
        };
        if adjacent_pairs.contains(&(measurement.start.as_str(), measurement.end.as_str())) {
            main.push(outcome);
        } else {
            extra.push(outcome);
        }
    }

    Ok(ScenarioReport {
        scenario_name: scenario.name.clone(),
        main,
        extra,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertion::Assertion;
    use crate::measurement::Quantity;

    #[test]
    fn report_success_requires_every_outcome_to_pass() {
        let report = ScenarioReport {
            scenario_name: "x".to_string(),
            main: vec![MeasurementOutcome {
                measurement: Measurement {
                    start: "t0".to_string(),
                    end: "t1".to_string(),
                    quantity: Quantity::Convtime,
                    args: vec![],
                    assertion: Some(Assertion::Is(Value::Number(1.0))),
                },
                value: Value::Number(1.0),
                assertion_failure: None,
            }],
            extra: vec![],
        };
        assert!(report.success());
    }

    #[test]
    fn report_fails_if_any_outcome_has_a_failure() {
        let report = ScenarioReport {
            scenario_name: "x".to_string(),
            main: vec![MeasurementOutcome {
                measurement: Measurement {
                    start: "t0".to_string(),
                    end: "t1".to_string(),
                    quantity: Quantity::Count,
                    args: vec![],
                    assertion: None,
                },
                value: Value::Number(1.0),
                assertion_failure: Some("boom".to_string()),
            }],
            extra: vec![],
        };
        assert!(!report.success());
    }
}
