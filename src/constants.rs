//! Constants for DTVCC (CEA-708) packet reassembly and service decoding

/// Log target used for every diagnostic emitted by the DTVCC layer
pub const LOG_TARGET: &str = "dtvcc";

/// Service channel limits
pub const MAX_SERVICES: usize = 63;
pub const MAX_WINDOWS: usize = 8;
pub const MAX_ROWS: usize = 15;

/// Packet buffer sizing
pub const MAX_PACKET_LENGTH: usize = 128; // in 2-byte units
pub const MAX_PACKET_LENGTH_BYTES: usize = MAX_PACKET_LENGTH * 2;
pub const CONTINUE_APPEND_LIMIT: usize = 253; // CONTINUE units append only while len <= this
pub const START_APPEND_LIMIT: usize = MAX_PACKET_LENGTH_BYTES - 1;

/// cc_type values carried in each 4-byte tuple
pub const CC_TYPE_CONTINUE: u8 = 2;
pub const CC_TYPE_START: u8 = 3;
pub const CC_TUPLE_SIZE: usize = 4;

/// Packet layer (CEA-708 §5)
pub const SEQUENCE_MODULO: u8 = 4;
pub const PACKET_SIZE_CODE_MAX: usize = 127; // packet_size_code == 0
pub const EXTENDED_SERVICE_NUMBER: u8 = 7;

/// Service block codes handled by the text path
pub const CODE_ETX: u8 = 0x03;
pub const CODE_FF: u8 = 0x0C;
pub const CODE_CR: u8 = 0x0D;
pub const CODE_EXT1: u8 = 0x10;
pub const CODE_CLW: u8 = 0x88;
pub const CODE_DLW: u8 = 0x8C;
pub const MUSIC_NOTE: char = '\u{266A}';

/// Exit codes for fatal conditions
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_FILE_CREATION_FAILED: i32 = 5;
pub const EXIT_BUG: i32 = 7;

/// Frame pacing used by the CLI (NTSC, 20 cc tuples per frame)
pub const DEFAULT_FPS: f64 = 30000.0 / 1001.0;
pub const DEFAULT_CC_COUNT: usize = 20;
pub const MAX_CC_COUNT: usize = 31; // 5-bit cc_count in cc_data()
