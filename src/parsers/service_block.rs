use bitstream_io::{BigEndian, BitRead, BitReader};
use log::{debug, warn};

use crate::constants::*;
use crate::error::Result;
use crate::processor::{DecoderSession, PacketDecoder};

/// First byte of a DTVCC packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub sequence: u8,
    pub size_code: u8,
}

impl PacketHeader {
    pub fn parse(byte: u8) -> Option<Self> {
        let bytes = [byte];
        let mut br = BitReader::endian(&bytes[..], BigEndian);
        let sequence = br.read::<2, u8>().ok()?;
        let size_code = br.read::<6, u8>().ok()?;
        Some(Self { sequence, size_code })
    }

    /// Total packet length in bytes, header included
    pub fn packet_len(&self) -> usize {
        match self.size_code {
            0 => PACKET_SIZE_CODE_MAX + 1,
            code => usize::from(code) * 2,
        }
    }
}

/// Service block header: 1 byte, or 2 for extended service numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceBlockHeader {
    pub service_number: u8,
    pub block_size: usize,
    pub header_len: usize,
}

impl ServiceBlockHeader {
    pub fn parse(data: &[u8]) -> Option<Self> {
        let mut br = BitReader::endian(data, BigEndian);
        let service_number = br.read::<3, u8>().ok()?;
        let block_size = usize::from(br.read::<5, u8>().ok()?);

        if service_number == EXTENDED_SERVICE_NUMBER && block_size != 0 {
            br.skip(2).ok()?; // null fill
            let extended = br.read::<6, u8>().ok()?;
            return Some(Self { service_number: extended, block_size, header_len: 2 });
        }
        Some(Self { service_number, block_size, header_len: 1 })
    }
}

/// Default packet decoder: checks packet framing and sequence numbers and
/// routes each service block to its service pipeline
#[derive(Debug, Default)]
pub struct ServiceBlockDemuxer;

impl ServiceBlockDemuxer {
    pub fn new() -> Self {
        Self
    }

    fn track_sequence(&self, sequence: u8, session: &mut DecoderSession<'_>) {
        if let Some(last) = *session.last_sequence {
            if (last + 1) % SEQUENCE_MODULO != sequence {
                debug!(
                    target: LOG_TARGET,
                    "unexpected sequence number {sequence} after {last}, resetting services"
                );
                session.services.reset_all();
                session.report.reset_count += 1;
            }
        }
        *session.last_sequence = Some(sequence);
    }
}

impl PacketDecoder for ServiceBlockDemuxer {
    fn handle_packet(&mut self, packet: &[u8], session: &mut DecoderSession<'_>) -> Result<()> {
        let Some(&first) = packet.first() else {
            session.report.empty_flushes += 1;
            return Ok(());
        };
        session.report.packets += 1;

        let Some(header) = PacketHeader::parse(first) else {
            session.report.malformed_packets += 1;
            return Ok(());
        };
        let expected = header.packet_len();
        if packet.len() != expected {
            debug!(
                target: LOG_TARGET,
                "packet length mismatch: header says {expected}, got {}",
                packet.len()
            );
            session.report.malformed_packets += 1;
        }
        self.track_sequence(header.sequence, session);

        let body = &packet[1..packet.len().min(expected)];
        let mut pos = 0;
        while pos < body.len() {
            let Some(block) = ServiceBlockHeader::parse(&body[pos..]) else {
                debug!(target: LOG_TARGET, "truncated service block header");
                session.report.malformed_packets += 1;
                break;
            };
            if block.service_number == 0 {
                break; // null block, rest is padding
            }
            pos += block.header_len;
            let end = pos + block.block_size;
            if end > body.len() {
                debug!(
                    target: LOG_TARGET,
                    "service {} block of {} bytes runs past the packet",
                    block.service_number,
                    block.block_size
                );
                session.report.malformed_packets += 1;
                break;
            }
            let data = &body[pos..end];
            pos = end;

            let service = usize::from(block.service_number);
            session.report.record_block(service);
            let Some(state) = session.services.get_mut(service - 1) else {
                continue;
            };
            let before = state.cues_written();
            let result = state.handle_block(data);
            session.report.cues_written += state.cues_written() - before;
            match result {
                Err(e) if !e.is_fatal() => {
                    warn!(target: LOG_TARGET, "service {service}: {e}");
                }
                other => other?,
            }
        }
        Ok(())
    }
}
