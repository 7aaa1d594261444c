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
//! Scenario script commands: the verbs recognized in a scenario's `script`
//! section. Network-fault verbs (partitions, packet drops) are out of scope.

use std::fmt;
use std::time::Duration;

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Kill(u32),
    Start(u32),
    RollingRestart { batch: u32, pause: Duration },
    Sleep(Duration),
    WaitForStable,
}

impl Command {
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        let tokens: Vec<&str> = input.split_whitespace().collect();
        let (verb, args) = tokens.split_first().ok_or(ParseError::EmptyCommand)?;
        match *verb {
            "kill" => {
                let n = parse_node_index(args, verb)?;
                Ok(Command::Kill(n))
            }
            "start" => {
                let n = parse_node_index(args, verb)?;
                Ok(Command::Start(n))
            }
            "rolling-restart" => {
                if args.len() != 2 {
                    return Err(ParseError::WrongArgCount(
                        verb.to_string(),
                        "expected <batch-size> <pause-duration>".to_string(),
                    ));
                }
                let batch: u32 = args[0]
                    .parse()
                    .map_err(|_| ParseError::WrongArgCount(verb.to_string(), args[0].to_string()))?;
                let pause = humantime::parse_duration(args[1])
                    .map_err(|e| ParseError::Duration(args[1].to_string(), e.to_string()))?;
                Ok(Command::RollingRestart { batch, pause })
            }
            "sleep" => {
                if args.len() != 1 {
                    return Err(ParseError::WrongArgCount(
                        verb.to_string(),
                        "expected <duration>".to_string(),
                    ));
                }
                let d = humantime::parse_duration(args[0])
                    .map_err(|e| ParseError::Duration(args[0].to_string(), e.to_string()))?;
                Ok(Command::Sleep(d))
            }
            "wait-for-stable" => {
                if !args.is_empty() {
                    return Err(ParseError::WrongArgCount(
                        verb.to_string(),
                        "expects no arguments".to_string(),
                    ));
                }
                Ok(Command::WaitForStable)
            }
            other => Err(ParseError::UnknownVerb(other.to_string())),
        }
    }
}

fn parse_node_index(args: &[&str], verb: &str) -> Result<u32, ParseError> {
    if args.len() != 1 {
        return Err(ParseError::WrongArgCount(
            verb.to_string(),
            "expected a single node index".to_string(),
        ));
    }
    args[0]
        .parse()
        .map_err(|_| ParseError::WrongArgCount(verb.to_string(), args[0].to_string()))
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Kill(n) => write!(f, "kill {n}"),
            Command::Start(n) => write!(f, "start {n}"),
            Command::RollingRestart { batch, pause } => {
                write!(f, "rolling-restart {batch} {pause:?}")
            }
            Command::Sleep(d) => write!(f, "sleep {d:?}"),
            Command::WaitForStable => write!(f, "wait-for-stable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kill_and_start() {
        assert_eq!(Command::parse("kill 1").unwrap(), Command::Kill(1));
        assert_eq!(Command::parse("start 2").unwrap(), Command::Start(2));
    }

    #[test]
    fn parses_rolling_restart() {
        assert_eq!(
            Command::parse("rolling-restart 2 5s").unwrap(),
            Command::RollingRestart {
                batch: 2,
                pause: Duration::from_secs(5)
            }
        );
    }

    #[test]
    fn parses_sleep_and_wait_for_stable() {
        assert_eq!(
            Command::parse("sleep 10s").unwrap(),
            Command::Sleep(Duration::from_secs(10))
        );
        assert_eq!(
            Command::parse("wait-for-stable").unwrap(),
            Command::WaitForStable
        );
    }

    #[test]
    fn empty_command_is_error() {
        assert!(matches!(Command::parse(""), Err(ParseError::EmptyCommand)));
    }

    #[test]
    fn unknown_verb_is_error() {
        assert!(matches!(
            Command::parse("network-drop 1"),
            Err(ParseError::UnknownVerb(_))
        ));
    }
}
