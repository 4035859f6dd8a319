// src/lib.rs
pub mod extractor {
    use std::path::PathBuf;

    use crate::constants::MAX_CC_COUNT;
    use crate::error::DtvccError;
    use crate::report::SessionReport;
    use crate::types::DtvccSettings;

    pub struct Options {
        /// Raw `(cc_valid, cc_type, data0, data1)` tuples; stdin when `None`
        pub input: Option<PathBuf>,
        pub settings: DtvccSettings,
        /// Tuples per video frame
        pub cc_count: usize,
        pub fps: f64,
    }

    impl Options {
        /// Rejects frame pacing values that cannot describe a video stream
        pub fn validate(&self) -> crate::error::Result<()> {
            if !(1..=MAX_CC_COUNT).contains(&self.cc_count) {
                return Err(DtvccError::Config(format!(
                    "cc_count {} outside 1..={MAX_CC_COUNT}",
                    self.cc_count
                )));
            }
            if !self.fps.is_finite() || self.fps <= 0.0 {
                return Err(DtvccError::Config(format!("fps must be a positive number, got {}", self.fps)));
            }
            Ok(())
        }
    }

    pub struct RunSummary {
        pub frames: u64,
        pub packets: u64,
        pub report: Option<SessionReport>,
    }

    /// Blocking entry-point; returns when the input is exhausted or on a fatal error
    pub fn run(opts: Options) -> anyhow::Result<RunSummary> {
        crate::core::run(opts)
    }
}

pub mod charset;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod parsers;
pub mod processor;
pub mod report;
pub mod service;
pub mod sink;
pub mod stats;
pub mod types;
mod core;

#[cfg(test)]
mod testing;

pub use context::{Collaborators, DtvccContext};
pub use error::DtvccError;
pub use processor::{DecoderSession, PacketAssembler, PacketDecoder};
pub use service::{ServiceDecoderState, ServiceRegistry, WindowState};
pub use stats::DtvccReport;
pub use types::{DtvccSettings, ServiceSet};
