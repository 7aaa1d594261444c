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
//! The launcher client: drives the external node-control binary that
//! actually starts, stops and reconfigures cluster nodes. Everything here
//! models a flat pool of virtual hosts grouped into named capacity buckets
//! (e.g. rack `A` has 10 slots, rack `B` has 5), the way the cluster's
//! session tool addresses them.

use std::net::SocketAddr;
use std::path::PathBuf;

use tokio::process::Command;

use crate::error::LauncherError;

/// A named pool of `cap` addressable slots.
#[derive(Debug, Clone)]
pub struct VHost {
    pub name: String,
    pub cap: usize,
}

/// A contiguous `[start, end)` range of slots within one `VHost`.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSlice {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

/// Carve `group_size` slots out of `vhosts`, skipping the first `skip` slots
/// of the combined pool. Slots are addressed as if every `VHost`'s range
/// were concatenated in order.
pub fn host_slices(
    vhosts: &[VHost],
    skip: usize,
    group_size: usize,
) -> Result<Vec<HostSlice>, LauncherError> {
    if group_size == 0 {
        return Ok(vec![]);
    }
    let total: usize = vhosts.iter().map(|v| v.cap).sum();
    if skip + group_size > total {
        return Err(LauncherError::OutOfCapacity {
            skip,
            requested: group_size,
            available: total.saturating_sub(skip),
        });
    }
    Ok(host_slices_inner(vhosts, skip, group_size))
}

fn host_slices_inner(vhosts: &[VHost], skip: usize, group_size: usize) -> Vec<HostSlice> {
    if group_size == 0 {
        return vec![];
    }
    let Some((first, rest)) = vhosts.split_first() else {
        // Unreachable once `host_slices` has pre-checked total capacity.
        return vec![];
    };
    if first.cap <= skip {
        return host_slices_inner(rest, skip - first.cap, group_size);
    }
    let take = (first.cap - skip).min(group_size);
    let mut out = vec![HostSlice {
        name: first.name.clone(),
        start: skip,
        end: skip + take,
    }];
    if group_size > take {
        out.extend(host_slices_inner(rest, 0, group_size - take));
    }
    out
}

/// Group the `'0'`/`'1'` running-bitmap into contiguous `true` runs, one
/// `HostSlice` per run, scoped to each `VHost`'s own segment of the bitmap.
/// A bitmap shorter than the combined capacity is treated as all-`false`
/// past its end.
pub fn running_groups(vhosts: &[VHost], running: &str) -> Vec<HostSlice> {
    let bits: Vec<bool> = running.chars().map(|c| c == '1').collect();
    let mut offset = 0;
    let mut groups = Vec::new();
    for vhost in vhosts {
        if offset >= bits.len() {
            break;
        }
        let end = (offset + vhost.cap).min(bits.len());
        let segment = &bits[offset..end];
        let mut run_start = None;
        for (i, &running) in segment.iter().enumerate() {
            match (running, run_start) {
                (true, None) => run_start = Some(i),
                (false, Some(s)) => {
                    groups.push(HostSlice {
                        name: vhost.name.clone(),
                        start: s,
                        end: i,
                    });
                    run_start = None;
                }
                _ => {}
            }
        }
        if let Some(s) = run_start {
            groups.push(HostSlice {
                name: vhost.name.clone(),
                start: s,
                end: segment.len(),
            });
        }
        offset += vhost.cap;
    }
    groups
}

/// The addresses of every currently-running slot, in `10.10.<vhost
/// index>.<slot+1>:3000` form, one rack per third octet.
pub fn started_hosts(vhosts: &[VHost], running: &str) -> Vec<String> {
    let bits: Vec<bool> = running.chars().map(|c| c == '1').collect();
    let mut offset = 0;
    let mut hosts = Vec::new();
    for (vhost_idx, vhost) in vhosts.iter().enumerate() {
        for slot in 0..vhost.cap {
            let bit_idx = offset + slot;
            if bits.get(bit_idx).copied().unwrap_or(false) {
                hosts.push(format!("10.10.{}.{}:3000", vhost_idx, slot + 1));
            }
        }
        offset += vhost.cap;
    }
    hosts
}

/// Render a set of `HostSlice`s back into `10.10.<rack>.<slot>:3000`
/// addresses, the inverse of `started_hosts` restricted to a known set of
/// slices rather than a full bitmap.
pub fn slice_addresses(vhosts: &[VHost], slices: &[HostSlice]) -> Vec<String> {
    slices
        .iter()
        .flat_map(|slice| {
            let idx = vhosts
                .iter()
                .position(|v| v.name == slice.name)
                .unwrap_or(0);
            (slice.start..slice.end).map(move |slot| format!("10.10.{}.{}:3000", idx, slot + 1))
        })
        .collect()
}

/// Drives the external virtual-cluster control binary. Starting and
/// stopping individual nodes is a pure bitmap mutation owned by the
/// orchestrator (see `orchestrator.rs`); this client only ever shells out
/// for `reset`, `prepare` and `apply`.
#[derive(Clone)]
pub struct LauncherClient {
    pub vhosts: Vec<VHost>,
    pub vc_bin: PathBuf,
    pub session_file: PathBuf,
    /// Node binary path passed through to `apply` after the `--` separator.
    pub node_bin: PathBuf,
    /// Address nodes should report their stats to, passed as `--stats-udp`.
    pub stats_udp_addr: SocketAddr,
}

impl LauncherClient {
    async fn run(&self, args: &[String]) -> Result<(), LauncherError> {
        let output = Command::new(&self.vc_bin)
            .arg(&self.session_file)
            .args(args)
            .output()
            .await?;
        if !output.status.success() {
            return Err(LauncherError::SubprocessFailed(
                self.vc_bin.display().to_string(),
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        Ok(())
    }

    pub async fn prepare(&self) -> Result<(), LauncherError> {
        self.run(&["prepare".to_string()]).await
    }

    pub async fn reset(&self) -> Result<(), LauncherError> {
        self.run(&["reset".to_string()]).await
    }

    /// Translate `running` (a `'0'`/`'1'` bitmap) into contiguous host
    /// slices via [`running_groups`] and apply it, passing the node binary
    /// and its stats-udp endpoint as trailing arguments after `--`.
    pub async fn apply(&self, running: &str) -> Result<(), LauncherError> {
        let groups = running_groups(&self.vhosts, running);
        let slice_arg = groups
            .iter()
            .map(|g| format!("{}[{}:{}]", g.name, g.start, g.end))
            .collect::<Vec<_>>()
            .join(",");
        let args = vec![
            "apply".to_string(),
            "-g".to_string(),
            slice_arg,
            "--".to_string(),
            self.node_bin.display().to_string(),
            format!("--stats-udp={}", self.stats_udp_addr),
        ];
        self.run(&args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vhosts() -> Vec<VHost> {
        vec![
            VHost { name: "A".to_string(), cap: 10 },
            VHost { name: "B".to_string(), cap: 5 },
            VHost { name: "C".to_string(), cap: 10 },
        ]
    }

    #[test]
    fn host_slices_single_host_exact_fit() {
        let slices = host_slices(&vhosts(), 10, 5).unwrap();
        assert_eq!(
            slices,
            vec![HostSlice { name: "B".to_string(), start: 0, end: 5 }]
        );
    }

    #[test]
    fn host_slices_skips_into_third_host() {
        let slices = host_slices(&vhosts(), 15, 10).unwrap();
        assert_eq!(
            slices,
            vec![HostSlice { name: "C".to_string(), start: 0, end: 10 }]
        );
    }

    #[test]
    fn host_slices_spans_all_hosts() {
        let slices = host_slices(&vhosts(), 0, 25).unwrap();
        assert_eq!(
            slices,
            vec![
                HostSlice { name: "A".to_string(), start: 0, end: 10 },
                HostSlice { name: "B".to_string(), start: 0, end: 5 },
                HostSlice { name: "C".to_string(), start: 0, end: 10 },
            ]
        );
    }

    #[test]
    fn host_slices_partial_first_host() {
        let slices = host_slices(&vhosts(), 5, 15).unwrap();
        assert_eq!(
            slices,
            vec![
                HostSlice { name: "A".to_string(), start: 5, end: 10 },
                HostSlice { name: "B".to_string(), start: 0, end: 5 },
                HostSlice { name: "C".to_string(), start: 0, end: 5 },
            ]
        );
    }

    #[test]
    fn host_slices_over_capacity_is_error() {
        let err = host_slices(&vhosts(), 0, 26).unwrap_err();
        assert!(matches!(err, LauncherError::OutOfCapacity { .. }));
    }

    #[test]
    fn running_groups_matches_bitmap_runs() {
        let groups = running_groups(&vhosts(), "110001101111000110");
        assert_eq!(
            groups,
            vec![
                HostSlice { name: "A".to_string(), start: 0, end: 2 },
                HostSlice { name: "A".to_string(), start: 5, end: 7 },
                HostSlice { name: "A".to_string(), start: 8, end: 10 },
                HostSlice { name: "B".to_string(), start: 0, end: 2 },
                HostSlice { name: "C".to_string(), start: 0, end: 2 },
            ]
        );
    }

    #[test]
    fn started_hosts_formats_rack_and_slot() {
        let hosts = started_hosts(&vhosts(), "1100000000000");
        assert_eq!(hosts, vec!["10.10.0.1:3000", "10.10.0.2:3000"]);
    }

    #[test]
    fn started_hosts_skips_empty_leading_host() {
        let hosts = started_hosts(&vhosts(), "0000000000111111111111111");
        let mut expected: Vec<String> = (1..=5).map(|slot| format!("10.10.1.{slot}:3000")).collect();
        expected.extend((1..=10).map(|slot| format!("10.10.2.{slot}:3000")));
        assert_eq!(hosts, expected);
    }
}
