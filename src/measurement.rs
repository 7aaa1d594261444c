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
//! A measurement ties a labelled window to a quantity to extract and an
//! optional assertion to check the extracted value against.

use std::fmt;

use strum_macros::{Display, EnumString};

use crate::analysis;
use crate::assertion::Assertion;
use crate::error::AnalysisError;
use crate::stream::{LineStream, WindowScanner};
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Quantity {
    Count,
    Checksums,
    RingChecksums,
    Convtime,
}

#[derive(Debug, Clone)]
pub struct Measurement {
    pub start: String,
    pub end: String,
    pub quantity: Quantity,
    pub args: Vec<String>,
    pub assertion: Option<Assertion>,
}

impl Measurement {
    /// Run this measurement against a window carved out of `stream`,
    /// returning the extracted value. Does not check the assertion; callers
    /// decide whether a failed assertion should abort the run.
    pub fn measure(&self, stream: &mut dyn LineStream) -> Result<Value, AnalysisError> {
        let mut window = WindowScanner::new(stream, &self.start, &self.end);
        let result = match self.quantity {
            Quantity::Count => {
                let needle = self
                    .args
                    .first()
                    .map(String::as_str)
                    .unwrap_or_default();
                analysis::count(&mut window, needle)
            }
            Quantity::Checksums => analysis::checksums(&mut window, false),
            Quantity::RingChecksums => analysis::checksums(&mut window, true),
            Quantity::Convtime => analysis::convergence_time(&mut window),
        };
        // Checked after running the quantity analysis (which drains the
        // window to completion either way) so a missing start label always
        // wins over whatever error the quantity happened to hit on an empty
        // window, e.g. convtime's `NoMembershipSet`.
        if !window.start_found() {
            return Err(AnalysisError::SectionStartNotFound(self.start.clone()));
        }
        result
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{} {}", self.start, self.end, self.quantity)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
