// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Where finished rounds go.  The zoom driver hands every completed
//! round to a `RoundSink` before starting the next one; `DumpSink`
//! stores the field for later plotting, `Discard` drops it.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::coordinator::Round;
use crate::errors::Result;
use crate::partition::Policy;

/// Receives each round once it is complete.
pub trait RoundSink {
    /// Consume one finished round produced under `policy`.
    fn accept(&mut self, policy: Policy, round: &Round) -> Result<()>;
}

/// A sink that keeps nothing.
#[derive(Debug, Default)]
pub struct Discard;

impl RoundSink for Discard {
    fn accept(&mut self, _policy: Policy, _round: &Round) -> Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct DumpRecord<'a> {
    expdata: &'a str,
    arr: Vec<&'a [u32]>,
}

/// Writes every field it receives to its own numbered file in a
/// directory, as `{"expdata": <label>, "arr": [[row], ...]}`.
#[derive(Debug)]
pub struct DumpSink {
    dir: PathBuf,
    filenum: usize,
}

impl DumpSink {
    /// A sink writing into `dir`, which is created if it is missing.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<DumpSink> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(DumpSink {
            dir: dir.as_ref().to_path_buf(),
            filenum: 0,
        })
    }

    /// The file the next dump under `policy` will be written to.
    pub fn next_path(&self, policy: Policy) -> PathBuf {
        self.dir
            .join(format!("{}-out-{:04}.data", policy.label(), self.filenum))
    }
}

impl RoundSink for DumpSink {
    fn accept(&mut self, policy: Policy, round: &Round) -> Result<()> {
        let path = self.next_path(policy);
        info!("Storing data to {}.", path.display());
        let record = DumpRecord {
            expdata: policy.label(),
            arr: round.field.rows().collect(),
        };
        let mut out = BufWriter::new(File::create(&path)?);
        serde_json::to_writer(&mut out, &record)?;
        out.write_all(b"\n")?;
        out.flush()?;
        self.filenum += 1;
        Ok(())
    }
}
