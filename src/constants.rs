// MIT License - Copyright (c) 2026 Peter Wright
// Satel Integra protocol constants

use std::fmt;

/// Protocol framing bytes.
pub const FRAME_SYNC: u8 = 0xFE;
pub const FRAME_START: [u8; 2] = [0xFE, 0xFE];
pub const FRAME_END: [u8; 2] = [0xFE, 0x0D];
pub const FRAME_ESCAPE: u8 = 0xF0; // FE inside a frame is sent as FE F0

/// Checksum seed.
pub const CHECKSUM_SEED: u16 = 0x147A;

/// Default TCP port of the ETHM-1 integration server.
pub const DEFAULT_PORT: u16 = 7094;

/// Device id ranges.
pub const MAX_ZONES: u32 = 256;
pub const MAX_OUTPUTS: u32 = 256;
pub const MAX_PARTITIONS: u32 = 32;
pub const MAX_USERS: u32 = 255;
pub const MAX_EXPANDERS: u32 = 255;

/// Payload sizes used by write commands.
pub const USER_CODE_LEN: usize = 8;
pub const PARTITIONS_MASK_LEN: usize = 4;
pub const DEVICES_MASK_LEN: usize = 32;
pub const MONITORING_MASK_LEN: usize = 12;

/// Bitmask lengths the panel uses for zone and output reports
/// (16 bytes up to INTEGRA 128, 32 bytes on INTEGRA 256 PLUS).
pub const DEVICE_REPORT_LENGTHS: [usize; 2] = [16, 32];

/// Upper bound on a buffered frame before the decoder gives up on it.
pub const MAX_FRAME_LEN: usize = 512;

/// Length of the encrypted PDU header.
pub const PDU_HEADER_LEN: usize = 6;

/// Bytes the ETHM module sends before dropping a second client.
pub const BUSY_MARKER: &[u8] = b"Busy";

/// Keep-alive request: read the name of zone 1.
pub const KEEP_ALIVE_DEVICE: (u8, u8) = (0x01, 0x01);

/// Consecutive keep-alive failures tolerated before a session is dropped.
pub const KEEP_ALIVE_FAILURE_LIMIT: u32 = 3;

/// Corrupted-frame tolerance before a session is considered broken.
pub const BAD_FRAME_LIMIT: u32 = 10;
pub const BAD_FRAME_WINDOW_SECS: u64 = 60;

/// Time to wait for a "Busy" notice right after connecting.
pub const BUSY_CHECK_MS: u64 = 100;

/// Panel models as reported by the `0x7E` version query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelModel {
    Integra24,
    Integra32,
    Integra64,
    Integra128,
    Integra128WrlSim300,
    Integra128WrlLeon,
    Integra64Plus,
    Integra128Plus,
    Integra256Plus,
    Unknown(u8),
}

impl PanelModel {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Integra24,
            1 => Self::Integra32,
            2 => Self::Integra64,
            3 => Self::Integra128,
            4 => Self::Integra128WrlSim300,
            66 => Self::Integra64Plus,
            67 => Self::Integra128Plus,
            72 => Self::Integra256Plus,
            132 => Self::Integra128WrlLeon,
            other => Self::Unknown(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Integra24 => "INTEGRA 24",
            Self::Integra32 => "INTEGRA 32",
            Self::Integra64 => "INTEGRA 64",
            Self::Integra128 => "INTEGRA 128",
            Self::Integra128WrlSim300 => "INTEGRA 128-WRL SIM300",
            Self::Integra128WrlLeon => "INTEGRA 128-WRL LEON",
            Self::Integra64Plus => "INTEGRA 64 PLUS",
            Self::Integra128Plus => "INTEGRA 128 PLUS",
            Self::Integra256Plus => "INTEGRA 256 PLUS",
            Self::Unknown(_) => "UNKNOWN",
        }
    }

    /// Number of zones/outputs the model supports.
    pub fn max_devices(&self) -> u32 {
        match self {
            Self::Integra24 => 24,
            Self::Integra32 => 32,
            Self::Integra64 | Self::Integra64Plus => 64,
            Self::Integra256Plus => 256,
            _ => 128,
        }
    }
}

impl fmt::Display for PanelModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "UNKNOWN ({})", code),
            _ => f.write_str(self.name()),
        }
    }
}
