//! DTVCC packet reassembly
//!
//! Caption data arrives as 4-byte tuples `(cc_valid, cc_type, data0, data1)`.
//! A START tuple begins a packet, CONTINUE tuples extend it, and a CONTINUE
//! tuple with `cc_valid == 0` ends it. Completed packets are handed to a
//! [`PacketDecoder`].

use log::{debug, error};

use crate::constants::*;
use crate::error::Result;
use crate::service::ServiceRegistry;
use crate::stats::DtvccReport;
use crate::types::CcType;

/// State a packet decoder may touch while handling one packet
pub struct DecoderSession<'a> {
    pub services: &'a mut ServiceRegistry,
    pub last_sequence: &'a mut Option<u8>,
    pub report: &'a mut DtvccReport,
}

/// Interprets completed DTVCC packets
pub trait PacketDecoder {
    /// `packet` holds `0..=MAX_PACKET_LENGTH_BYTES` bytes; an empty packet must be a no-op
    fn handle_packet(&mut self, packet: &[u8], session: &mut DecoderSession<'_>) -> Result<()>;
}

/// Owns the packet buffer shared across `process_data` calls
pub struct PacketAssembler {
    current_packet: [u8; MAX_PACKET_LENGTH_BYTES],
    current_packet_length: usize,
}

impl PacketAssembler {
    pub fn new() -> Self {
        Self {
            current_packet: [0; MAX_PACKET_LENGTH_BYTES],
            current_packet_length: 0,
        }
    }

    pub fn clear(&mut self) {
        self.current_packet.fill(0);
        self.current_packet_length = 0;
    }

    pub fn len(&self) -> usize {
        self.current_packet_length
    }

    pub fn is_empty(&self) -> bool {
        self.current_packet_length == 0
    }

    /// Bytes accumulated so far for the packet in progress
    pub fn packet(&self) -> &[u8] {
        &self.current_packet[..self.current_packet_length]
    }

    /// Consume `data` as 4-byte tuples; a trailing partial tuple is ignored.
    ///
    /// `on_packet` runs synchronously for every completed packet, before the
    /// next tuple is looked at. An illegal cc_type stops processing at that
    /// tuple and is returned as a fatal error.
    pub fn process_data<F>(&mut self, data: &[u8], report: &mut DtvccReport, mut on_packet: F) -> Result<()>
    where
        F: FnMut(&[u8], &mut DtvccReport) -> Result<()>,
    {
        for tuple in data.chunks_exact(CC_TUPLE_SIZE) {
            let cc_valid = tuple[0] != 0;
            let cc_type = CcType::try_from(tuple[1]).inspect_err(|_| {
                error!(target: LOG_TARGET, "illegal cc_type {} in caption data", tuple[1]);
            })?;

            match cc_type {
                CcType::Continue => {
                    if !cc_valid {
                        self.flush(report, &mut on_packet)?;
                    } else if self.current_packet_length > CONTINUE_APPEND_LIMIT {
                        debug!(target: LOG_TARGET, "packet full, dropping continue unit");
                        report.dropped_units += 1;
                    } else {
                        self.push_pair(tuple[2], tuple[3]);
                    }
                }
                CcType::Start => {
                    self.flush(report, &mut on_packet)?;
                    if !cc_valid {
                        continue;
                    }
                    if self.current_packet_length > START_APPEND_LIMIT {
                        debug!(target: LOG_TARGET, "packet full, dropping start unit");
                        report.dropped_units += 1;
                    } else {
                        self.push_pair(tuple[2], tuple[3]);
                    }
                }
            }
        }
        Ok(())
    }

    /// Hand the current packet (possibly empty) to `on_packet` and reset the length
    pub fn flush<F>(&mut self, report: &mut DtvccReport, on_packet: &mut F) -> Result<()>
    where
        F: FnMut(&[u8], &mut DtvccReport) -> Result<()>,
    {
        let len = self.current_packet_length;
        self.current_packet_length = 0;
        on_packet(&self.current_packet[..len], report)
    }

    fn push_pair(&mut self, b0: u8, b1: u8) {
        let len = self.current_packet_length;
        debug_assert!(len + 2 <= MAX_PACKET_LENGTH_BYTES);
        self.current_packet[len] = b0;
        self.current_packet[len + 1] = b1;
        self.current_packet_length = len + 2;
    }
}

impl Default for PacketAssembler {
    fn default() -> Self {
        Self::new()
    }
}
