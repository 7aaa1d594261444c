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
//! Error taxonomy for the orchestrator. Each stage of the pipeline gets its
//! own error type so that callers can match on recoverable vs. fatal cases;
//! `main` collapses everything into `anyhow::Error` at the top.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid duration \"{0}\": {1}")]
    Duration(String, String),

    #[error("could not parse \"{0}\" as a number or a duration")]
    NotAValue(String),

    #[error("invalid range \"{0}\": expected (v1,v2)")]
    Range(String),

    #[error("range endpoints of \"{0}\" are not the same kind of value")]
    RangeMismatch(String),

    #[error("empty command")]
    EmptyCommand,

    #[error("unrecognized command verb \"{0}\"")]
    UnknownVerb(String),

    #[error("wrong number of arguments for \"{0}\": {1}")]
    WrongArgCount(String, String),

    #[error("measurement \"{0}\" needs at least a start label, end label and quantity")]
    MeasurementTooShort(String),

    #[error("unrecognized quantity \"{0}\"")]
    UnknownQuantity(String),

    #[error("script entry has {0} keys, expected exactly 1")]
    ScriptEntryKeys(usize),

    #[error("run row has {0} values, expected {1} (matching the run var names)")]
    RunRowArity(usize, usize),

    #[error("run variable \"{0}\" is not wrapped in angle brackets, e.g. <{0}>")]
    RunVarNotBracketed(String),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum AssertionError {
    #[error("assertion type mismatch: {0:?} vs {1:?}")]
    TypeMismatch(String, String),

    #[error("assertion failed: expected {1} got {0}")]
    NotEqual(String, String),

    #[error("assertion failed: {0} not in ({1},{2})")]
    NotInRange(String, String, String),
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("no membership-set stat found in window")]
    NoMembershipSet,

    #[error("section start \"{0}\" not found")]
    SectionStartNotFound(String),

    #[error("could not parse timestamp in \"{0}\": {1}")]
    Timestamp(String, chrono::ParseError),

    #[error("could not parse stat value in \"{0}\"")]
    UnparsableValue(String),

    #[error("checksum is not a gauge: \"{0}\"")]
    ChecksumNotGauge(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("session out of capacity: requested {requested} hosts starting at offset {skip}, but only {available} available")]
    OutOfCapacity {
        skip: usize,
        requested: usize,
        available: usize,
    },

    #[error("launcher subprocess \"{0}\" failed: {1}")]
    SubprocessFailed(String, String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Assertion(#[from] AssertionError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Launcher(#[from] LauncherError),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}
