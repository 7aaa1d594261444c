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
//! A scenario: a cluster size, a labelled script of commands to run against
//! it, and a set of measurements to take once it has finished.

use crate::command::Command;
use crate::measurement::Measurement;

#[derive(Debug, Clone)]
pub struct ScriptStep {
    pub label: String,
    pub command: Command,
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub size: u32,
    pub desc: String,
    pub script: Vec<ScriptStep>,
    pub measure: Vec<Measurement>,
}

impl Scenario {
    /// A human-readable one-liner for progress reporting.
    pub fn summary(&self) -> String {
        format!("{} (size {}): {}", self.name, self.size, self.desc)
    }
}
