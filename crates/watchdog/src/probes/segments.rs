//! Output-segment backlog and staleness in the HLS directory.

use super::SignalProbe;
use crate::types::{ProbeOutcome, ProbeReport};
use async_trait::async_trait;
use std::collections::HashSet;
use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info, warn};

struct Segment {
    name: String,
    metadata: Metadata,
}

/// List regular files in `dir` with the given extension.
///
/// Segments are rotated constantly, so a file that disappears between the
/// directory read and the stat is skipped rather than treated as an error.
async fn list_segments(dir: &Path, extension: &str) -> io::Result<Vec<Segment>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut segments = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }

        let metadata = match entry.metadata().await {
            Ok(m) => m,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Segment vanished before stat");
                continue;
            }
            Err(e) => return Err(e),
        };
        if !metadata.is_file() {
            continue;
        }

        segments.push(Segment {
            name: entry.file_name().to_string_lossy().into_owned(),
            metadata,
        });
    }

    Ok(segments)
}

/// Fails when too many segments pile up on disk
pub struct SegmentCountProbe {
    directory: PathBuf,
    extension: String,
    max_files: usize,
}

impl SegmentCountProbe {
    pub fn new(directory: impl Into<PathBuf>, extension: impl Into<String>, max_files: usize) -> Self {
        Self {
            directory: directory.into(),
            extension: extension.into(),
            max_files,
        }
    }
}

#[async_trait]
impl SignalProbe for SegmentCountProbe {
    async fn probe(&self) -> ProbeReport {
        let start = Instant::now();

        match list_segments(&self.directory, &self.extension).await {
            Ok(segments) => {
                let count = segments.len();
                let outcome = if count > self.max_files {
                    warn!(count, max = self.max_files, "Segment count exceeds the maximum allowed");
                    ProbeOutcome::fail(format!(
                        "{} .{} files exceeds the maximum of {}",
                        count, self.extension, self.max_files
                    ))
                } else {
                    info!(count, max = self.max_files, "Segment count within range");
                    ProbeOutcome::Pass
                };
                ProbeReport::new(outcome, start.elapsed()).with_item_count(count)
            }
            Err(e) => {
                warn!(dir = %self.directory.display(), error = %e, "Failed to list segments");
                ProbeReport::new(
                    ProbeOutcome::error(format!(
                        "failed to list {}: {}",
                        self.directory.display(),
                        e
                    )),
                    start.elapsed(),
                )
            }
        }
    }

    fn name(&self) -> &str {
        "segment_count"
    }
}

/// Fails when any segment has not been rewritten within `max_age`
pub struct StaleSegmentsProbe {
    directory: PathBuf,
    extension: String,
    max_age: Duration,
    exclude: HashSet<String>,
}

impl StaleSegmentsProbe {
    pub fn new(
        directory: impl Into<PathBuf>,
        extension: impl Into<String>,
        max_age: Duration,
        exclude: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            directory: directory.into(),
            extension: extension.into(),
            max_age,
            exclude: exclude.into_iter().collect(),
        }
    }

    fn is_stale(&self, metadata: &Metadata, now: SystemTime) -> io::Result<bool> {
        let modified = metadata.modified()?;
        // Clock skew can put mtime in the future; that is not stale.
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        Ok(age > self.max_age)
    }
}

#[async_trait]
impl SignalProbe for StaleSegmentsProbe {
    async fn probe(&self) -> ProbeReport {
        let start = Instant::now();

        let segments = match list_segments(&self.directory, &self.extension).await {
            Ok(segments) => segments,
            Err(e) => {
                warn!(dir = %self.directory.display(), error = %e, "Failed to list segments");
                return ProbeReport::new(
                    ProbeOutcome::error(format!(
                        "failed to list {}: {}",
                        self.directory.display(),
                        e
                    )),
                    start.elapsed(),
                );
            }
        };

        let now = SystemTime::now();
        let mut stale = 0usize;
        for segment in &segments {
            if self.exclude.contains(&segment.name) {
                debug!(file = %segment.name, "Skipping excluded file");
                continue;
            }
            match self.is_stale(&segment.metadata, now) {
                Ok(true) => {
                    warn!(file = %segment.name, "Old segment found");
                    stale += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    return ProbeReport::new(
                        ProbeOutcome::error(format!("failed to read mtime of {}: {}", segment.name, e)),
                        start.elapsed(),
                    );
                }
            }
        }

        let outcome = if stale > 0 {
            warn!(stale, "Old segments found in HLS directory");
            ProbeOutcome::fail(format!("{} old .{} file(s) found", stale, self.extension))
        } else {
            info!("No old segments found in HLS directory");
            ProbeOutcome::Pass
        };

        ProbeReport::new(outcome, start.elapsed())
    }

    fn name(&self) -> &str {
        "stale_segments"
    }
}
