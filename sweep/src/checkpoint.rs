//! Sweep progress persistence.
//!
//! The checkpoint is a single line of comma-separated integers:
//! `gridIdx,obstacleIdx,agentIdx,instanceIdx,counter_0,...,counter_k`.
//! It is rewritten (delete, then recreate) after every processed tuple, so a
//! crash leaves at worst the previous checkpoint intact. An absent file
//! means the sweep starts from the beginning with zeroed counters.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use crate::cursor::TupleIndices;

/// Last attempted tuple plus the failure-counter snapshot taken after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointRecord {
    pub indices: TupleIndices,
    pub counters: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Read the checkpoint, if any. `counter_count` is the number of
    /// per-strategy counters the record must carry.
    pub fn load(&self, counter_count: usize) -> Result<Option<CheckpointRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("read checkpoint {}", self.path.display()))?;
        let record = parse_record(contents.trim(), counter_count)
            .with_context(|| format!("parse checkpoint {}", self.path.display()))?;
        Ok(Some(record))
    }

    /// Replace the checkpoint with `record`.
    pub fn write(&self, record: &CheckpointRecord) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("remove checkpoint {}", self.path.display()))?;
        }
        let mut line = format!(
            "{},{},{},{}",
            record.indices.grid,
            record.indices.obstacle,
            record.indices.agents,
            record.indices.instance
        );
        for counter in &record.counters {
            line.push_str(&format!(",{counter}"));
        }
        line.push('\n');
        fs::write(&self.path, line)
            .with_context(|| format!("write checkpoint {}", self.path.display()))?;
        Ok(())
    }
}

fn parse_record(line: &str, counter_count: usize) -> Result<CheckpointRecord> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != 4 + counter_count {
        bail!(
            "expected {} comma-separated fields, found {}",
            4 + counter_count,
            fields.len()
        );
    }
    let mut indices = [0usize; 4];
    for (slot, field) in indices.iter_mut().zip(&fields[..4]) {
        *slot = field
            .parse()
            .with_context(|| format!("parse index field {:?}", field))?;
    }
    let counters = fields[4..]
        .iter()
        .map(|field| {
            field
                .parse::<u32>()
                .with_context(|| format!("parse counter field {:?}", field))
        })
        .collect::<Result<Vec<u32>>>()?;
    Ok(CheckpointRecord {
        indices: TupleIndices::new(indices[0], indices[1], indices[2], indices[3]),
        counters,
    })
}
