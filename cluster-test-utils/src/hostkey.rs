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
//! Canonical host-key handling.
//!
//! A hostKey is the `A_B_C_D_PORT` form used as a map key by both the node
//! emitter and the ingestor (see `ringpop.<IP_PORT>.<stat.path>:<value>|<type>`
//! in the wire format). This module is the single place that knows the
//! canonicalization rule and the regex that recognizes it embedded in a
//! stat line, since both the real-time ingestor and the offline checksum
//! analysis need it.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Matches a canonical hostKey embedded anywhere in a line: four dotted
    /// byte groups plus a port, joined by underscores.
    static ref HOSTKEY_RE: Regex =
        Regex::new(r"[0-9]{1,3}_[0-9]{1,3}_[0-9]{1,3}_[0-9]{1,3}_[0-9]{1,6}").unwrap();
}

/// Canonicalize a `host:port` or `host.port`-ish string into the `A_B_C_D_PORT`
/// form used as a map key, by replacing every `.` and `:` with `_`.
pub fn canonicalize(host_port: &str) -> String {
    host_port.replace(['.', ':'], "_")
}

/// Find the first canonical hostKey embedded in `line`, if any.
pub fn find_hostkey(line: &str) -> Option<&str> {
    HOSTKEY_RE.find(line).map(|m| m.as_str())
}

/// Extract the hostKey that appears between the literal `ringpop.` prefix and
/// the next `.` in a stamped or raw stat line, e.g.
/// `ringpop.172_18_24_220_3000.changes.disseminate:0|g` -> `172_18_24_220_3000`.
pub fn hostkey_after_ringpop(line: &str) -> Option<&str> {
    let after = line.split_once("ringpop.")?.1;
    let end = after.find('.')?;
    Some(&after[..end])
}
