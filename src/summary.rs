// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The one-line record written once a whole zoom sequence is done.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::errors::Result;
use crate::partition::Policy;
use crate::planes::Geometry;
use crate::zoom::ZoomReport;

/// Name, timing, field size and checksums of a finished run.
#[derive(Clone, Debug, Serialize)]
pub struct Summary {
    /// Which policy produced the run.
    pub name: &'static str,
    /// Wall time for every round together.
    pub seconds: f64,
    /// Field width.
    pub width: usize,
    /// Field height.
    pub height: usize,
    /// Running sum of every round's checksum, in hex.
    #[serde(rename = "CRC")]
    pub crc: String,
    /// The checksum of the final round.
    pub checksum: u64,
    /// Ranks taking part, the coordinator included.
    pub ranks: usize,
    /// Rounds run.
    pub rounds: usize,
}

impl Summary {
    /// Summarises `report`, a run under `policy` over fields of
    /// `geometry`.
    pub fn new(policy: Policy, geometry: Geometry, report: &ZoomReport) -> Summary {
        Summary {
            name: policy.name(),
            seconds: report.elapsed.as_secs_f64(),
            width: geometry.width,
            height: geometry.height,
            crc: format!("0x{:x}", report.crc()),
            checksum: report.final_checksum().unwrap_or(0),
            ranks: report.rounds.first().map_or(0, |r| r.stats.ranks),
            rounds: report.rounds.len(),
        }
    }

    /// Writes the summary as a single JSON line to `file` in `dir`.
    pub fn write_to<P: AsRef<Path>>(&self, dir: P, file: &str) -> Result<PathBuf> {
        fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(file);
        fs::write(&path, format!("{}\n", self))?;
        Ok(path)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let line = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(&line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::RoundStats;
    use crate::planes::Window;
    use crate::zoom::RoundReport;
    use std::time::Duration;

    fn report() -> ZoomReport {
        let stats = RoundStats {
            policy: Policy::Block,
            ranks: 3,
            results: 3,
            chunks_issued: 0,
            outstanding: 0,
        };
        ZoomReport {
            rounds: vec![
                RoundReport {
                    index: 0,
                    window: Window::start(),
                    checksum: 250,
                    stats,
                },
                RoundReport {
                    index: 1,
                    window: Window::target(),
                    checksum: 6,
                    stats,
                },
            ],
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn summary_carries_the_running_crc() {
        let s = Summary::new(Policy::Block, Geometry::default(), &report());
        assert_eq!(s.name, "roadmap_static");
        assert_eq!(s.crc, "0x100");
        assert_eq!(s.checksum, 6);
        assert_eq!((s.width, s.height, s.ranks, s.rounds), (2000, 2000, 3, 2));
        assert!((s.seconds - 1.5).abs() < 1e-9);
    }

    #[test]
    fn summary_is_one_json_line() {
        let dir = tempfile::tempdir().unwrap();
        let s = Summary::new(Policy::Block, Geometry::default(), &report());
        let path = s.write_to(dir.path(), Policy::Block.result_file()).unwrap();
        assert!(path.ends_with("result-stat.txt"));
        let text = fs::read_to_string(path).unwrap();
        assert_eq!(text.lines().count(), 1);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["name"], "roadmap_static");
        assert_eq!(parsed["CRC"], "0x100");
        assert_eq!(parsed["width"], 2000);
    }
}
