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
//! Scenario file parsing: the YAML shape, a parameter-sweep expansion
//! (`runs`) that substitutes `<VAR>` placeholders with concrete values, and
//! parsing of commands/measurements out of their one-line string form.
//!
//! Unlike the implementation this was distilled from, every failure here is
//! a plain `Result` error propagated up through `?` — nothing here recovers
//! from a panic, because nothing here panics.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::assertion::Assertion;
use crate::calc;
use crate::command::Command;
use crate::error::ParseError;
use crate::measurement::{Measurement, Quantity};
use crate::scenario::{Scenario, ScriptStep};
use crate::value::Value;

#[derive(Debug, Deserialize)]
pub struct RawTestFile {
    pub hosts: IndexMap<String, usize>,
    pub scenarios: Vec<RawScenario>,
}

#[derive(Debug, Deserialize)]
pub struct RawScenario {
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub size: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub script: Vec<HashMap<String, String>>,
    #[serde(default)]
    pub measure: Vec<String>,
    #[serde(default)]
    pub runs: Vec<Vec<String>>,
}

/// The scenario `size` field is usually a plain YAML integer, but may also
/// be a `<VAR>` placeholder substituted by a `runs` sweep; accept either.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Int(i64),
        String(String),
    }
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Int(n) => n.to_string(),
        StringOrNumber::String(s) => s,
    })
}

pub struct TestFile {
    pub hosts: IndexMap<String, usize>,
    pub scenarios: Vec<Scenario>,
}

/// Parse a whole scenario file, expanding every `runs` parameter sweep into
/// its own concrete scenario.
pub fn parse(text: &str) -> Result<TestFile, ParseError> {
    let raw: RawTestFile = serde_yaml::from_str(text)?;
    let mut scenarios = Vec::new();
    for raw_scenario in &raw.scenarios {
        scenarios.extend(extract_scenarios(raw_scenario)?);
    }
    Ok(TestFile {
        hosts: raw.hosts,
        scenarios,
    })
}

/// Expand a single raw scenario into one or more concrete scenarios,
/// substituting `runs` rows for the `<VAR>` placeholders they name. A
/// scenario with no `runs` entries is itself the only scenario produced.
fn extract_scenarios(raw: &RawScenario) -> Result<Vec<Scenario>, ParseError> {
    if raw.runs.is_empty() {
        return Ok(vec![instantiate(raw, &[], &[])?]);
    }
    let (var_names, rows) = raw.runs.split_first().expect("checked non-empty above");
    for name in var_names {
        if !(name.starts_with('<') && name.ends_with('>')) {
            return Err(ParseError::RunVarNotBracketed(name.clone()));
        }
    }
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        if row.len() != var_names.len() {
            return Err(ParseError::RunRowArity(row.len(), var_names.len()));
        }
        out.push(instantiate(raw, var_names, row)?);
    }
    Ok(out)
}

fn substitute(template: &str, var_names: &[String], values: &[String]) -> String {
    let mut out = template.to_string();
    for (name, value) in var_names.iter().zip(values.iter()) {
        out = out.replace(name, value);
    }
    out
}

fn instantiate(
    raw: &RawScenario,
    var_names: &[String],
    values: &[String],
) -> Result<Scenario, ParseError> {
    let name = substitute(&raw.name, var_names, values);
    let size_str = substitute(&raw.size, var_names, values);
    let size: u32 = size_str
        .trim()
        .parse()
        .map_err(|_| ParseError::NotAValue(size_str.clone()))?;
    let desc = substitute(&raw.desc, var_names, values);

    let mut seen_labels = std::collections::HashSet::new();
    let mut script = Vec::with_capacity(raw.script.len());
    for entry in &raw.script {
        if entry.len() != 1 {
            return Err(ParseError::ScriptEntryKeys(entry.len()));
        }
        let (label, cmd) = entry.iter().next().expect("checked len == 1 above");
        let label = substitute(label, var_names, values);
        let cmd = substitute(cmd, var_names, values);
        if !seen_labels.insert(label.clone()) {
            log::warn!("scenario \"{name}\" reuses label \"{label}\"; window scans will match its first occurrence");
        }
        script.push(ScriptStep {
            label,
            command: Command::parse(&cmd)?,
        });
    }

    let mut measure = Vec::with_capacity(raw.measure.len());
    for m in &raw.measure {
        let m = substitute(m, var_names, values);
        measure.push(parse_measurement(&m)?);
    }

    Ok(Scenario {
        name,
        size,
        desc,
        script,
        measure,
    })
}

/// Parse one measurement line: `<start> <end> <quantity> [args...] [is|in <bound>]`.
fn parse_measurement(input: &str) -> Result<Measurement, ParseError> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(ParseError::MeasurementTooShort(input.to_string()));
    }
    let start = tokens[0].to_string();
    let end = tokens[1].to_string();
    let quantity: Quantity = tokens[2]
        .parse()
        .map_err(|_| ParseError::UnknownQuantity(tokens[2].to_string()))?;

    let rest = &tokens[3..];
    let keyword_pos = rest.iter().position(|t| *t == "is" || *t == "in");
    let (args, assertion) = match keyword_pos {
        None => (rest.to_vec(), None),
        Some(pos) => {
            let args = rest[..pos].to_vec();
            let keyword = rest[pos];
            let payload: String = rest[pos + 1..].concat();
            let assertion = Some(if keyword == "is" {
                Assertion::Is(parse_value(&payload)?)
            } else {
                parse_range(&payload)?
            });
            (args, assertion)
        }
    };

    Ok(Measurement {
        start,
        end,
        quantity,
        args: args.into_iter().map(str::to_string).collect(),
        assertion,
    })
}

/// Parse a scalar value. Tries arithmetic evaluation first, then duration
/// parsing; this order is load-bearing, since a bare integer like `5` is
/// valid in both grammars and must be treated as a number.
fn parse_value(text: &str) -> Result<Value, ParseError> {
    if let Ok(n) = calc::eval(text) {
        return Ok(Value::Number(n));
    }
    if let Ok(d) = humantime::parse_duration(text) {
        return Ok(Value::Duration(d));
    }
    Err(ParseError::NotAValue(text.to_string()))
}

/// Parse a `(v1,v2)` range, requiring both bounds to be the same kind of
/// value.
fn parse_range(text: &str) -> Result<Assertion, ParseError> {
    let inner = text
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| ParseError::Range(text.to_string()))?;
    let (low, high) = inner
        .split_once(',')
        .ok_or_else(|| ParseError::Range(text.to_string()))?;
    let low = parse_value(low)?;
    let high = parse_value(high)?;
    if std::mem::discriminant(&low) != std::mem::discriminant(&high) {
        return Err(ParseError::RangeMismatch(text.to_string()));
    }
    Ok(Assertion::In(low, high))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn parses_measurement_with_is_assertion() {
        let m = parse_measurement("t0 t1 convtime is 2s").unwrap();
        assert_eq!(m.start, "t0");
        assert_eq!(m.end, "t1");
        assert_eq!(m.quantity, Quantity::Convtime);
        assert!(matches!(m.assertion, Some(Assertion::Is(Value::Duration(_)))));
    }

    #[test]
    fn parses_measurement_with_in_assertion_and_args() {
        let m = parse_measurement("t0 t1 count ping.send in (1,10)").unwrap();
        assert_eq!(m.args, vec!["ping.send".to_string()]);
        assert!(matches!(m.assertion, Some(Assertion::In(_, _))));
    }

    #[test]
    fn parses_measurement_without_assertion() {
        let m = parse_measurement("t0 t1 checksums").unwrap();
        assert!(m.assertion.is_none());
    }

    #[test]
    fn value_parsing_prefers_number_over_duration() {
        assert_eq!(parse_value("5").unwrap(), Value::Number(5.0));
    }

    #[test]
    fn value_parsing_falls_back_to_duration() {
        assert_eq!(
            parse_value("2s").unwrap(),
            Value::Duration(Duration::from_secs(2))
        );
    }

    #[test]
    fn range_requires_matching_kinds() {
        assert!(parse_range("(1,2s)").is_err());
        assert!(parse_range("(1,10)").is_ok());
    }

    #[test]
    fn extract_scenarios_expands_runs() {
        let raw = RawScenario {
            name: "partition heal".to_string(),
            size: "<N>".to_string(),
            desc: "split <SPLIT>".to_string(),
            script: vec![],
            measure: vec![],
            runs: vec![
                vec!["<N>".to_string(), "<SPLIT>".to_string()],
                vec!["10".to_string(), "3".to_string()],
                vec!["20".to_string(), "5".to_string()],
            ],
        };
        let scenarios = extract_scenarios(&raw).unwrap();
        assert_eq!(scenarios.len(), 2);
        assert_eq!(scenarios[0].size, 10);
        assert_eq!(scenarios[0].desc, "split 3");
        assert_eq!(scenarios[1].size, 20);
        assert_eq!(scenarios[1].desc, "split 5");
    }

    #[test]
    fn run_var_names_must_be_bracketed() {
        let raw = RawScenario {
            name: "x".to_string(),
            size: "<N>".to_string(),
            desc: String::new(),
            script: vec![],
            measure: vec![],
            runs: vec![vec!["N".to_string()], vec!["10".to_string()]],
        };
        assert!(matches!(
            extract_scenarios(&raw),
            Err(ParseError::RunVarNotBracketed(_))
        ));
    }

    #[test]
    fn script_entry_with_multiple_keys_is_error() {
        let mut entry = HashMap::new();
        entry.insert("t0".to_string(), "kill 1".to_string());
        entry.insert("t1".to_string(), "kill 2".to_string());
        let raw = RawScenario {
            name: "x".to_string(),
            size: "1".to_string(),
            desc: String::new(),
            script: vec![entry],
            measure: vec![],
            runs: vec![],
        };
        assert!(matches!(
            extract_scenarios(&raw),
            Err(ParseError::ScriptEntryKeys(2))
        ));
    }

    #[test]
    fn parse_full_yaml_document() {
        let text = r#"
hosts:
  A: 10
  B: 5
scenarios:
  - name: simple kill
    size: 10
    desc: kill one node
    script:
      - t0: kill 1
      - t1: wait-for-stable
    measure:
      - "t0 t1 convtime is 2s"
"#;
        let parsed = parse(text).unwrap();
        assert_eq!(parsed.hosts["A"], 10);
        assert_eq!(parsed.scenarios.len(), 1);
        assert_eq!(parsed.scenarios[0].script.len(), 2);
    }
}
