//! Sort-and-rotate step: drains the accumulation buffer into a sorted,
//! deduplicated output file once the size threshold is reached.

use crate::errors::SortError;
use crate::metrics;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

/// Fixed bucket order: the generator vocabulary's alphabet. This order is the
/// primary sort key of the output.
pub const ALPHABET: [char; 33] = [
    'а', 'б', 'в', 'г', 'д', 'е', 'ё', 'ж', 'з', 'и', 'й', 'к', 'л', 'м', 'н', 'о', 'п', 'р', 'с',
    'т', 'у', 'ф', 'х', 'ц', 'ч', 'ш', 'щ', 'ъ', 'ы', 'ь', 'э', 'ю', 'я',
];

/// The word segment of a record: everything after the last `.` separator.
fn suffix_token(line: &str) -> &str {
    line.rsplit_once('.').map(|(_, word)| word).unwrap_or(line)
}

/// Bucket for a record line, keyed by the first letter of its word segment,
/// case-insensitively. Lines without a separator or whose word starts outside
/// the alphabet have no bucket and are dropped from the sorted output.
fn bucket_index(line: &str) -> Option<usize> {
    let (_, word) = line.rsplit_once('.')?;
    let first = word.chars().next()?;
    let lowered = first.to_lowercase().next().unwrap_or(first);
    ALPHABET.iter().position(|&letter| letter == lowered)
}

/// Partition lines into alphabet buckets, sort each bucket by word suffix,
/// collapse exact-duplicate lines, and concatenate buckets in alphabet order.
///
/// The per-bucket sort is stable, so lines with equal suffixes keep their
/// arrival order and full-string duplicates end up adjacent for `dedup`.
/// Buckets are disjoint, so they sort in parallel on the calling rayon pool.
pub fn sort_lines(lines: Vec<String>) -> Vec<String> {
    let mut buckets: Vec<Vec<String>> = vec![Vec::new(); ALPHABET.len()];
    let mut dropped = 0usize;
    for line in lines {
        match bucket_index(&line) {
            Some(idx) => buckets[idx].push(line),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!(dropped, "dropped lines without a vocabulary bucket");
    }

    buckets.par_iter_mut().for_each(|bucket| {
        bucket.sort_by(|a, b| suffix_token(a).cmp(suffix_token(b)));
        bucket.dedup();
    });

    buckets.into_iter().flatten().collect()
}

pub(crate) fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Owns the output directory and the sort thread pool, and guarantees unique
/// output names across rotations within one process.
pub struct Rotator {
    output_dir: PathBuf,
    pool: rayon::ThreadPool,
    last_stamp: u64,
    next_seq: u64,
}

impl Rotator {
    pub fn new(output_dir: PathBuf, threading_number: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threading_number.max(1))
            .build()
            .context("failed to build bucket sort thread pool")?;
        Ok(Self {
            output_dir,
            pool,
            last_stamp: 0,
            next_seq: 0,
        })
    }

    /// Unique output filename for a rotation happening at `timestamp`.
    /// Same-second rotations (and clock steps backwards) get a monotonic
    /// sequence suffix instead of colliding.
    fn next_output_name(&mut self, timestamp: u64) -> String {
        if timestamp <= self.last_stamp {
            self.next_seq += 1;
            format!("sorted_values_{}_{}.txt", self.last_stamp, self.next_seq)
        } else {
            self.last_stamp = timestamp;
            self.next_seq = 0;
            format!("sorted_values_{timestamp}.txt")
        }
    }

    /// Read the whole accumulation buffer, sort it, and publish the result as
    /// a new output file.
    ///
    /// The buffer itself is never touched here; the caller resets it only
    /// after this returns `Ok`, so a failed rotation loses no accumulated
    /// data. The output goes through a temp file and rename so a crash
    /// mid-write never publishes partial output.
    pub async fn rotate(&mut self, buffer_path: &Path) -> Result<PathBuf, SortError> {
        let raw = fs::read_to_string(buffer_path)
            .await
            .map_err(|source| SortError::ReadBuffer {
                path: buffer_path.to_path_buf(),
                source,
            })?;
        let lines: Vec<String> = raw.lines().map(str::to_owned).collect();
        let input_lines = lines.len();

        let sorted = self.pool.install(|| sort_lines(lines));

        let filename = self.next_output_name(current_timestamp());
        let final_path = self.output_dir.join(&filename);
        let temp_path = self
            .output_dir
            .join(format!("{}.{}.tmp", filename, Uuid::new_v4()));

        let mut payload = sorted.join("\n");
        if !sorted.is_empty() {
            payload.push('\n');
        }

        fs::write(&temp_path, payload.as_bytes())
            .await
            .map_err(|source| SortError::WriteOutput {
                path: temp_path.clone(),
                source,
            })?;
        fs::rename(&temp_path, &final_path)
            .await
            .map_err(|source| SortError::WriteOutput {
                path: final_path.clone(),
                source,
            })?;

        metrics::RECORDS_WRITTEN_TOTAL.inc_by(sorted.len() as u64);
        info!(
            output = %final_path.display(),
            input_lines,
            output_lines = sorted.len(),
            "wrote sorted output file"
        );
        Ok(final_path)
    }
}
