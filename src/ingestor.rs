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
//! Live stat ingestion: an async UDP listener that stamps every incoming
//! datagram with a timestamp, appends it to the run's stats file, and tracks
//! per-host "has this node gone quiet" state used by `wait-for-stable`.
//!
//! The UDP read loop only ever reads and pushes onto a channel; a second
//! task drains the channel, writes to the file and updates shared state.
//! Decoupling the two means a slow disk never causes the kernel socket
//! buffer to back up and drop datagrams.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use cluster_test_utils::hostkey;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::error::IngestError;

const CHANNEL_CAPACITY: usize = 1024;
const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Default)]
struct IngestState {
    /// hostkey -> "has gone quiet (changes.disseminate reached 0)"
    empty_nodes: HashMap<String, bool>,
    was_unstable: bool,
}

pub struct StatIngestor {
    state: Arc<Mutex<IngestState>>,
    file: Arc<std::sync::Mutex<std::fs::File>>,
    shutdown_tx: watch::Sender<bool>,
    read_task: Mutex<Option<JoinHandle<()>>>,
    process_task: Mutex<Option<JoinHandle<()>>>,
}

impl StatIngestor {
    /// Bind `addr`, open `stats_path` for appending, and spawn the listener
    /// and processing tasks. Returns a handle usable from the orchestrator
    /// loop for labels and stability waits.
    pub async fn listen(
        addr: std::net::SocketAddr,
        stats_path: &std::path::Path,
    ) -> Result<Self, IngestError> {
        let socket = UdpSocket::bind(addr).await?;
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(stats_path)?;

        let state = Arc::new(Mutex::new(IngestState::default()));
        let file = Arc::new(std::sync::Mutex::new(file));

        let (tx, rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let read_task = tokio::spawn(read_loop(socket, tx, shutdown_rx));
        let process_task = tokio::spawn(process_loop(rx, state.clone(), file.clone()));

        Ok(StatIngestor {
            state,
            file,
            shutdown_tx,
            read_task: Mutex::new(Some(read_task)),
            process_task: Mutex::new(Some(process_task)),
        })
    }

    /// Close the UDP source and wait for both ingest tasks to drain. A
    /// scenario's ingestor is shut down exactly once, at the end of its run;
    /// `wait_for_stable`/`insert_label` calls after this are invalid.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.read_task.lock().await.take() {
            let _ = handle.await;
        }
        if let Some(handle) = self.process_task.lock().await.take() {
            let _ = handle.await;
        }
        let mut file = self.file.lock().expect("stats file mutex poisoned");
        let _ = file.flush();
    }

    /// Write a `label:<label>|cmd: <cmd>` marker directly to the stats file,
    /// so offline window analyses can find the scenario's script boundaries.
    pub fn insert_label(&self, label: &str, cmd: &str) -> Result<(), IngestError> {
        let line = format!("label:{label}|cmd: {cmd}\n");
        let mut file = self.file.lock().expect("stats file mutex poisoned");
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Block until the cluster has gone unstable at least once and then
    /// settled back to stable for the given hosts, polling every 200ms.
    /// Clears `was_unstable` before returning, so the next call starts fresh.
    pub async fn wait_for_stable(&self, hosts: &[String]) -> Result<(), IngestError> {
        loop {
            if self.state.lock().await.was_unstable {
                break;
            }
            sleep(POLL_INTERVAL).await;
        }
        loop {
            if self.is_cluster_stable(hosts).await {
                self.state.lock().await.was_unstable = false;
                return Ok(());
            }
            sleep(POLL_INTERVAL).await;
        }
    }

    async fn is_cluster_stable(&self, hosts: &[String]) -> bool {
        let state = self.state.lock().await;
        hosts
            .iter()
            .map(|h| hostkey::canonicalize(h))
            .all(|key| state.empty_nodes.get(&key).copied().unwrap_or(false))
    }
}

async fn read_loop(socket: UdpSocket, tx: mpsc::Sender<String>, mut shutdown: watch::Receiver<bool>) {
    let mut buf = [0u8; 8192];
    loop {
        tokio::select! {
            res = socket.recv_from(&mut buf) => {
                let Ok((len, _)) = res else { return; };
                let line = String::from_utf8_lossy(&buf[..len]).to_string();
                if tx.send(line).await.is_err() {
                    return;
                }
            }
            _ = shutdown.changed() => return,
        }
    }
}

async fn process_loop(
    mut rx: mpsc::Receiver<String>,
    state: Arc<Mutex<IngestState>>,
    file: Arc<std::sync::Mutex<std::fs::File>>,
) {
    while let Some(raw) = rx.recv().await {
        let stamped = format!("{}|{}\n", Utc::now().to_rfc3339(), raw);
        {
            let mut file = file.lock().expect("stats file mutex poisoned");
            let _ = file.write_all(stamped.as_bytes());
        }
        handle_stat(&raw, &state).await;
    }
}

/// Update `empty_nodes`/`was_unstable` from a single raw `changes.disseminate`
/// gauge line, if that's what this line is.
async fn handle_stat(raw: &str, state: &Arc<Mutex<IngestState>>) {
    let Some(hostkey) = hostkey::hostkey_after_ringpop(raw) else {
        return;
    };
    let Some(rest) = raw.split_once("changes.disseminate:") else {
        return;
    };
    let Some((value_str, _)) = rest.1.split_once('|') else {
        return;
    };
    let Ok(value) = value_str.parse::<i64>() else {
        log::warn!("dropping unparsable changes.disseminate value in stat line: {raw}");
        return;
    };

    let mut state = state.lock().await;
    let is_empty = value == 0;
    state.empty_nodes.insert(hostkey.to_string(), is_empty);
    if !is_empty {
        state.was_unstable = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_ingestor() -> StatIngestor {
        let (shutdown_tx, _) = watch::channel(false);
        StatIngestor {
            state: Arc::new(Mutex::new(IngestState::default())),
            file: Arc::new(std::sync::Mutex::new(
                tempfile::tempfile().expect("tempfile"),
            )),
            shutdown_tx,
            read_task: Mutex::new(None),
            process_task: Mutex::new(None),
        }
    }

    #[tokio::test]
    async fn handle_stat_marks_node_empty_at_zero() {
        let state = Arc::new(Mutex::new(IngestState::default()));
        handle_stat(
            "ringpop.172_18_24_220_3000.changes.disseminate:0|g",
            &state,
        )
        .await;
        let s = state.lock().await;
        assert_eq!(s.empty_nodes.get("172_18_24_220_3000"), Some(&true));
        assert!(!s.was_unstable);
    }

    #[tokio::test]
    async fn handle_stat_marks_unstable_on_nonzero() {
        let state = Arc::new(Mutex::new(IngestState::default()));
        handle_stat(
            "ringpop.172_18_24_220_3000.changes.disseminate:3|g",
            &state,
        )
        .await;
        let s = state.lock().await;
        assert_eq!(s.empty_nodes.get("172_18_24_220_3000"), Some(&false));
        assert!(s.was_unstable);
    }

    #[tokio::test]
    async fn is_cluster_stable_requires_all_hosts_empty() {
        let ingestor = test_ingestor();
        handle_stat(
            "ringpop.172_18_24_220_3000.changes.disseminate:0|g",
            &ingestor.state,
        )
        .await;
        handle_stat(
            "ringpop.172_18_24_221_3000.changes.disseminate:0|g",
            &ingestor.state,
        )
        .await;
        let hosts = vec![
            "172.18.24.220:3000".to_string(),
            "172.18.24.221:3000".to_string(),
        ];
        assert!(ingestor.is_cluster_stable(&hosts).await);

        handle_stat(
            "ringpop.172_18_24_221_3000.changes.disseminate:1|g",
            &ingestor.state,
        )
        .await;
        assert!(!ingestor.is_cluster_stable(&hosts).await);
    }

    #[tokio::test]
    async fn wait_for_stable_clears_was_unstable_on_return() {
        let ingestor = test_ingestor();
        let host = "172.18.24.220:3000".to_string();
        handle_stat(
            "ringpop.172_18_24_220_3000.changes.disseminate:1|g",
            &ingestor.state,
        )
        .await;
        handle_stat(
            "ringpop.172_18_24_220_3000.changes.disseminate:0|g",
            &ingestor.state,
        )
        .await;
        ingestor
            .wait_for_stable(std::slice::from_ref(&host))
            .await
            .unwrap();
        assert!(!ingestor.state.lock().await.was_unstable);
    }

    #[tokio::test]
    async fn is_cluster_stable_three_node_unstable_then_stable_sample() {
        let ingestor = test_ingestor();
        for host in ["172_18_24_220_3000", "172_18_24_220_3001", "172_18_24_220_3002"] {
            handle_stat(&format!("ringpop.{host}.changes.disseminate:0|g"), &ingestor.state).await;
        }
        for host in ["172_18_24_220_3000", "172_18_24_220_3001", "172_18_24_220_3002"] {
            handle_stat(&format!("ringpop.{host}.changes.disseminate:1|g"), &ingestor.state).await;
        }
        handle_stat("ringpop.172_18_24_220_3000.changes.disseminate:0|g", &ingestor.state).await;
        handle_stat("ringpop.172_18_24_220_3001.changes.disseminate:0|g", &ingestor.state).await;
        handle_stat("ringpop.172_18_24_220_3002.changes.disseminate:1|g", &ingestor.state).await;

        let all_three = vec![
            "172.18.24.220:3000".to_string(),
            "172.18.24.220:3001".to_string(),
            "172.18.24.220:3002".to_string(),
        ];
        let first_two = vec![
            "172.18.24.220:3000".to_string(),
            "172.18.24.220:3001".to_string(),
        ];
        assert!(!ingestor.is_cluster_stable(&all_three).await);
        assert!(ingestor.is_cluster_stable(&first_two).await);
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_with_no_tasks_spawned() {
        let ingestor = test_ingestor();
        ingestor.shutdown().await;
        ingestor.shutdown().await;
    }
}
