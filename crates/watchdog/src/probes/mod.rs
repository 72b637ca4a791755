//! Signal probes.
//!
//! A probe samples one health dimension and reports a raw
//! [`ProbeOutcome`](crate::types::ProbeOutcome). Probes never fail with
//! `Err`: anything that prevents a measurement is reported as
//! `ProbeOutcome::Error` so the engine can treat it as a failed sample.

mod encoder;
mod icecast;
mod segments;

pub use encoder::{EncoderCpuProbe, parse_cpu, parse_pidof};
pub use icecast::{IcecastProbe, count_sources};
pub use segments::{SegmentCountProbe, StaleSegmentsProbe};

use crate::types::ProbeReport;
use async_trait::async_trait;

/// Signal probe trait
#[async_trait]
pub trait SignalProbe: Send + Sync {
    /// Take one sample
    async fn probe(&self) -> ProbeReport;

    /// Get the name of this probe
    fn name(&self) -> &str;
}
