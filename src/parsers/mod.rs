//! Packet-layer parsers
//!
//! This module contains the default [`PacketDecoder`](crate::processor::PacketDecoder)
//! that splits a DTVCC packet into service blocks.

mod service_block;

pub use service_block::{PacketHeader, ServiceBlockDemuxer, ServiceBlockHeader};
