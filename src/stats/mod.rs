//! Session counters shared between the caller and the DTVCC layer

use std::collections::BTreeMap;

use serde::Serialize;

/// Counters collected while decoding; owned by the caller, mutated by the decoder
#[derive(Debug, Clone, Default, Serialize)]
pub struct DtvccReport {
    /// Times the service decoders were reset after a sequence discontinuity
    pub reset_count: u64,
    pub packets: u64,
    /// Flushes that carried no bytes: padding tuples (CONTINUE with cc_valid=0)
    /// and START tuples with nothing pending
    pub empty_flushes: u64,
    pub malformed_packets: u64,
    /// 2-byte units dropped because the packet buffer was full
    pub dropped_units: u64,
    /// service number -> blocks received
    pub service_blocks: BTreeMap<usize, u64>,
    pub cues_written: u64,
}

impl DtvccReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a service block for a 1-based service number
    pub fn record_block(&mut self, service: usize) {
        *self.service_blocks.entry(service).or_insert(0) += 1;
    }

    pub fn blocks_for(&self, service: usize) -> u64 {
        self.service_blocks.get(&service).copied().unwrap_or(0)
    }
}
