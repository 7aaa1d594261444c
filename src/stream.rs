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
//! Line-oriented stat streams and the label-delimited window scanner.
//!
//! Offline analyses read a finished stats file through this trait; the
//! live ingestor never scans through it (it updates its stability state
//! directly off each raw line as it arrives, see `ingestor.rs`), so only a
//! file-backed and an in-memory implementation are needed here.

use std::fs::File;
use std::io::{BufRead, BufReader};

/// A pull-based source of stat lines.
pub trait LineStream {
    /// Return the next line, or `None` at end of stream.
    fn next_line(&mut self) -> Option<String>;
}

pub struct FileLineStream {
    lines: std::io::Lines<BufReader<File>>,
}

impl FileLineStream {
    pub fn open(path: &std::path::Path) -> std::io::Result<Self> {
        let file = File::open(path)?;
        Ok(FileLineStream {
            lines: BufReader::new(file).lines(),
        })
    }
}

impl LineStream for FileLineStream {
    fn next_line(&mut self) -> Option<String> {
        self.lines.next().and_then(Result::ok)
    }
}

/// A `LineStream` backed by an in-memory vector, used in tests in place of a
/// file on disk.
pub struct VecLineStream {
    lines: std::vec::IntoIter<String>,
}

impl VecLineStream {
    pub fn new(lines: Vec<String>) -> Self {
        VecLineStream {
            lines: lines.into_iter(),
        }
    }
}

impl LineStream for VecLineStream {
    fn next_line(&mut self) -> Option<String> {
        self.lines.next()
    }
}

/// Wraps a `LineStream`, yielding only the lines strictly between a
/// `label:<start>` marker (exclusive) and a `label:<end>` marker (exclusive).
/// `".."` for either bound means "from the beginning" / "to the end".
pub struct WindowScanner<'a> {
    inner: &'a mut dyn LineStream,
    start: String,
    end: String,
    started: bool,
    done: bool,
}

impl<'a> WindowScanner<'a> {
    pub fn new(inner: &'a mut dyn LineStream, start: &str, end: &str) -> Self {
        WindowScanner {
            inner,
            start: start.to_string(),
            end: end.to_string(),
            started: start == "..",
            done: false,
        }
    }

    fn label_marker(line: &str, label: &str) -> bool {
        line.starts_with(&format!("label:{label}|"))
    }

    /// Whether the start label has been seen (or was `".."`, trivially
    /// satisfied). Only meaningful to check once the window has been fully
    /// drained: a `false` at that point means the start label never
    /// appeared in the underlying stream.
    pub fn start_found(&self) -> bool {
        self.started
    }
}

impl<'a> LineStream for WindowScanner<'a> {
    fn next_line(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        loop {
            let line = self.inner.next_line()?;
            if !self.started {
                if Self::label_marker(&line, &self.start) {
                    self.started = true;
                }
                continue;
            }
            if self.end != ".." && Self::label_marker(&line, &self.end) {
                self.done = true;
                return None;
            }
            return Some(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Vec<String> {
        vec![
            "2016-06-17T11:29:15.0Z|ringpop.172_18_24_192_3005.ping.send:1|c".to_string(),
            "label:t0|cmd: kill 1".to_string(),
            "2016-06-17T11:29:16.0Z|ringpop.172_18_24_192_3005.ping.send:1|c".to_string(),
            "2016-06-17T11:29:17.0Z|ringpop.172_18_24_192_3005.ping.ack:1|c".to_string(),
            "2016-06-17T11:29:18.0Z|ringpop.172_18_24_192_3005.changes.disseminate:3|g".to_string(),
            "2016-06-17T11:29:19.0Z|ringpop.172_18_24_192_3005.changes.disseminate:2|g".to_string(),
            "label:t1|cmd: wait-for-stable".to_string(),
            "2016-06-17T11:29:20.0Z|ringpop.172_18_24_192_3005.ping.send:1|c".to_string(),
        ]
    }

    #[test]
    fn window_scanner_yields_only_lines_strictly_between_labels() {
        let mut src = VecLineStream::new(fixture());
        let mut window = WindowScanner::new(&mut src, "t0", "t1");
        let mut got = Vec::new();
        while let Some(line) = window.next_line() {
            got.push(line);
        }
        assert_eq!(got.len(), 4);
        assert!(got.iter().all(|l| !l.starts_with("label:")));
    }

    #[test]
    fn dotdot_start_means_from_the_beginning() {
        let mut src = VecLineStream::new(fixture());
        let mut window = WindowScanner::new(&mut src, "..", "t0");
        let mut got = Vec::new();
        while let Some(line) = window.next_line() {
            got.push(line);
        }
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn dotdot_end_means_to_the_end() {
        let mut src = VecLineStream::new(fixture());
        let mut window = WindowScanner::new(&mut src, "t1", "..");
        let mut got = Vec::new();
        while let Some(line) = window.next_line() {
            got.push(line);
        }
        assert_eq!(got.len(), 1);
    }
}
