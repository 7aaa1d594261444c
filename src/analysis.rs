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
//! Offline window analyses: `count`, `checksums`, `convtime`.
//!
//! All three scan a [`LineStream`] window and produce a [`Value`]. Stat
//! lines look like `<RFC3339Nano timestamp>|ringpop.<hostkey>.<stat.path>:<value>|<type>`.

use chrono::{DateTime, Utc};
use cluster_test_utils::hostkey;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::AnalysisError;
use crate::stream::LineStream;
use crate::value::Value;

/// Split a stat line into `(timestamp, path, raw value text, statsd_type)`,
/// returning `None` for anything that doesn't look like a stamped stat line
/// (e.g. a `label:` marker). The value is left unparsed: callers decide
/// whether a malformed number is relevant to them or not.
fn split_stat_line(line: &str) -> Option<(&str, &str, &str, &str)> {
    let (ts, rest) = line.split_once('|')?;
    let (path_and_value, statsd_type) = rest.rsplit_once('|')?;
    let (path, value) = path_and_value.rsplit_once(':')?;
    Some((ts, path, value, statsd_type))
}

/// Like [`split_stat_line`] but also parses the value, silently dropping
/// lines whose value doesn't parse as a float. Used by analyses that don't
/// need to distinguish "not a stat line" from "malformed stat line".
fn parse_stat_line(line: &str) -> Option<(&str, &str, f64, &str)> {
    let (ts, path, value, statsd_type) = split_stat_line(line)?;
    Some((ts, path, value.parse().ok()?, statsd_type))
}

fn parse_timestamp(ts: &str) -> Result<DateTime<Utc>, AnalysisError> {
    DateTime::parse_from_rfc3339(ts)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AnalysisError::Timestamp(ts.to_string(), e))
}

/// Accumulate the numeric values of every stat line whose path contains
/// `needle`. This deliberately diverges from a plain line count: the value
/// after `:` is summed, not just the occurrence tallied. A matching line
/// whose value fails to parse is a hard error, not a skip.
pub fn count(stream: &mut dyn LineStream, needle: &str) -> Result<Value, AnalysisError> {
    let mut total = 0.0;
    while let Some(line) = stream.next_line() {
        let Some((_, path, value, _)) = split_stat_line(&line) else {
            continue;
        };
        if !path.contains(needle) {
            continue;
        }
        let value: f64 = value
            .parse()
            .map_err(|_| AnalysisError::UnparsableValue(line.clone()))?;
        total += value;
    }
    Ok(Value::Number(total))
}

/// Count the number of distinct checksum values reported by any host in the
/// window, keeping only each hostkey's most recently reported checksum.
/// `include_ring` selects between the membership checksum (`false`, the
/// `checksums` quantity) and the ring checksum (`true`, `ring-checksums`) —
/// lines are discriminated by the literal substring `ring.checksum`. A
/// matching line that isn't a gauge (`|g`) is a hard error.
pub fn checksums(stream: &mut dyn LineStream, include_ring: bool) -> Result<Value, AnalysisError> {
    let mut last_by_host: HashMap<String, i64> = HashMap::new();
    while let Some(line) = stream.next_line() {
        if !line.contains(".checksum:") {
            continue;
        }
        let Some((_, path, value, statsd_type)) = split_stat_line(&line) else {
            continue;
        };
        if path.contains("ring.checksum") != include_ring {
            continue;
        }
        if statsd_type != "g" {
            return Err(AnalysisError::ChecksumNotGauge(line.clone()));
        }
        let value: f64 = value
            .parse()
            .map_err(|_| AnalysisError::UnparsableValue(line.clone()))?;
        let Some(host) = hostkey::find_hostkey(&line) else {
            continue;
        };
        last_by_host.insert(host.to_string(), value as i64);
    }
    let distinct: std::collections::HashSet<_> = last_by_host.values().collect();
    Ok(Value::Number(distinct.len() as f64))
}

/// Convergence time: the duration between the first and the last
/// `membership-set` stat in the window, truncated to whole milliseconds.
pub fn convergence_time(stream: &mut dyn LineStream) -> Result<Value, AnalysisError> {
    let mut first: Option<DateTime<Utc>> = None;
    let mut last: Option<DateTime<Utc>> = None;
    while let Some(line) = stream.next_line() {
        let Some((ts, path, _, _)) = parse_stat_line(&line) else {
            continue;
        };
        if !path.contains("membership-set") {
            continue;
        }
        let when = parse_timestamp(ts)?;
        if first.is_none() {
            first = Some(when);
        }
        last = Some(when);
    }
    match (first, last) {
        (Some(first), Some(last)) => {
            let diff = last - first;
            let millis = diff.num_milliseconds();
            Ok(Value::Duration(Duration::from_millis(millis.max(0) as u64)))
        }
        _ => Err(AnalysisError::NoMembershipSet),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::VecLineStream;

    fn count_fixture() -> Vec<String> {
        vec![
            "2016-06-17T11:29:15.0Z|ringpop.172_18_24_192_3005.ping.send:1|c".to_string(),
            "label:t0|cmd: kill 1".to_string(),
            "2016-06-17T11:29:16.0Z|ringpop.172_18_24_192_3005.ping.send:1|c".to_string(),
            "2016-06-17T11:29:17.0Z|ringpop.172_18_24_192_3005.ping.ack:1|c".to_string(),
            "2016-06-17T11:29:18.0Z|ringpop.172_18_24_192_3005.changes.disseminate:1|g".to_string(),
            "2016-06-17T11:29:19.0Z|ringpop.172_18_24_193_3005.changes.disseminate:1|g".to_string(),
            "2016-06-17T11:29:20.0Z|ringpop.172_18_24_192_3005.ping.send:1|c".to_string(),
            "2016-06-17T11:29:21.0Z|ringpop.172_18_24_192_3005.changes.disseminate:1|g".to_string(),
            "2016-06-17T11:29:22.0Z|ringpop.172_18_24_193_3005.changes.disseminate:1|g".to_string(),
            "label:t1|cmd: wait-for-stable".to_string(),
            "2016-06-17T11:29:23.0Z|ringpop.172_18_24_192_3005.ping.send:1|c".to_string(),
        ]
    }

    #[test]
    fn count_sums_matching_lines() {
        let mut src = VecLineStream::new(count_fixture());
        assert_eq!(count(&mut src, "ping.send").unwrap(), Value::Number(2.0));

        let mut src = VecLineStream::new(count_fixture());
        assert_eq!(
            count(&mut src, "changes.disseminate").unwrap(),
            Value::Number(4.0)
        );
    }

    #[test]
    fn checksums_counts_distinct_values_across_hosts() {
        let lines = vec![
            "2016-06-17T11:29:15.0Z|ringpop.172_18_24_192_3005.checksum:4321|g".to_string(),
            "2016-06-17T11:29:16.0Z|ringpop.172_18_24_193_3005.checksum:1234|g".to_string(),
            "2016-06-17T11:29:17.0Z|ringpop.172_18_24_194_3005.checksum:1000|g".to_string(),
            "2016-06-17T11:29:18.0Z|ringpop.172_18_24_195_3005.checksum:1234|g".to_string(),
            "2016-06-17T11:29:19.0Z|ringpop.172_18_24_196_3005.checksum:1234|g".to_string(),
            "2016-06-17T11:29:20.0Z|ringpop.172_18_24_197_3005.checksum:4321|g".to_string(),
            "2016-06-17T11:29:21.0Z|ringpop.172_18_24_198_3005.checksum:4321|g".to_string(),
        ];
        let mut src = VecLineStream::new(lines);
        assert_eq!(checksums(&mut src, false).unwrap(), Value::Number(3.0));
    }

    #[test]
    fn checksums_include_ring_flag_selects_disjoint_lines() {
        let lines = vec![
            "2016-06-17T11:29:15.0Z|ringpop.172_18_24_192_3005.checksum:4321|g".to_string(),
            "2016-06-17T11:29:16.0Z|ringpop.172_18_24_192_3005.ring.checksum:9999|g".to_string(),
        ];
        let mut src = VecLineStream::new(lines.clone());
        assert_eq!(checksums(&mut src, false).unwrap(), Value::Number(1.0));
        let mut src = VecLineStream::new(lines);
        assert_eq!(checksums(&mut src, true).unwrap(), Value::Number(1.0));
    }

    #[test]
    fn convergence_time_is_first_to_last_membership_set() {
        let lines = vec![
            "2016-06-17T11:29:15.0Z|ringpop.172_18_24_192_3005.ping.send:1|c".to_string(),
            "2016-06-17T11:29:18.0Z|ringpop.172_18_24_192_3005.membership-set.suspect:1|c"
                .to_string(),
            "2016-06-17T11:29:22.0Z|ringpop.172_18_24_193_3005.membership-set.suspect:1|c"
                .to_string(),
            "2016-06-17T11:29:26.0Z|ringpop.172_18_24_194_3005.membership-set.suspect:1|c"
                .to_string(),
        ];
        let mut src = VecLineStream::new(lines);
        assert_eq!(
            convergence_time(&mut src).unwrap(),
            Value::Duration(Duration::from_secs(8))
        );
    }

    #[test]
    fn convergence_time_errors_without_membership_set() {
        let lines = vec!["2016-06-17T11:29:15.0Z|ringpop.172_18_24_192_3005.ping.send:1|c".to_string()];
        let mut src = VecLineStream::new(lines);
        assert!(convergence_time(&mut src).is_err());
    }
}
