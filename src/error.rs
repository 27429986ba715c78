// MIT License - Copyright (c) 2026 Peter Wright
// Satel Integra error types

use std::fmt;

/// Result codes carried by the panel's `0xEF` result frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    /// 0x00 - OK
    Ok,
    /// 0x01 - User code not found
    UserCodeNotFound,
    /// 0x02 - No access
    NoAccess,
    /// 0x03 - Selected user does not exist
    UserDoesNotExist,
    /// 0x04 - Selected user already exists
    UserAlreadyExists,
    /// 0x05 - Wrong code or code already exists
    WrongCode,
    /// 0x06 - Telephone code already exists
    TelephoneCodeExists,
    /// 0x07 - Changed code is the same
    CodeUnchanged,
    /// 0x08 - Other error
    OtherError,
    /// 0x11 - Can not arm, but can use force arm
    CannotArmForceAvailable,
    /// 0x12 - Can not arm
    CannotArm,
    /// 0x80..=0x8F - Other errors
    Other(u8),
    /// 0xFF - Command accepted, will be processed
    Accepted,
    /// Any code not listed above
    Unknown(u8),
}

impl ResultCode {
    /// Interpret the first byte of a result frame.
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00 => Self::Ok,
            0x01 => Self::UserCodeNotFound,
            0x02 => Self::NoAccess,
            0x03 => Self::UserDoesNotExist,
            0x04 => Self::UserAlreadyExists,
            0x05 => Self::WrongCode,
            0x06 => Self::TelephoneCodeExists,
            0x07 => Self::CodeUnchanged,
            0x08 => Self::OtherError,
            0x11 => Self::CannotArmForceAvailable,
            0x12 => Self::CannotArm,
            0x80..=0x8F => Self::Other(b),
            0xFF => Self::Accepted,
            other => Self::Unknown(other),
        }
    }

    pub fn as_byte(&self) -> u8 {
        match self {
            Self::Ok => 0x00,
            Self::UserCodeNotFound => 0x01,
            Self::NoAccess => 0x02,
            Self::UserDoesNotExist => 0x03,
            Self::UserAlreadyExists => 0x04,
            Self::WrongCode => 0x05,
            Self::TelephoneCodeExists => 0x06,
            Self::CodeUnchanged => 0x07,
            Self::OtherError => 0x08,
            Self::CannotArmForceAvailable => 0x11,
            Self::CannotArm => 0x12,
            Self::Other(b) | Self::Unknown(b) => *b,
            Self::Accepted => 0xFF,
        }
    }

    /// Whether the panel accepted the command.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ok | Self::Accepted)
    }

    /// Human-readable description of the result code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::UserCodeNotFound => "User code not found",
            Self::NoAccess => "No access",
            Self::UserDoesNotExist => "Selected user does not exist",
            Self::UserAlreadyExists => "Selected user already exists",
            Self::WrongCode => "Wrong code or code already exists",
            Self::TelephoneCodeExists => "Telephone code already exists",
            Self::CodeUnchanged => "Changed code is the same",
            Self::OtherError => "Other error",
            Self::CannotArmForceAvailable => "Can not arm, but can use force arm",
            Self::CannotArm => "Can not arm",
            Self::Other(_) => "Other error",
            Self::Accepted => "Command accepted",
            Self::Unknown(_) => "Unknown result code",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}: {}", self.as_byte(), self.description())
    }
}

/// All errors that can occur while talking to a Satel panel.
#[derive(Debug, thiserror::Error)]
pub enum SatelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("Panel busy: another client is connected to the module")]
    PanelBusy,

    #[error("Command timeout: {command}")]
    CommandTimeout { command: String },

    #[error("Command rejected by panel: {0}")]
    Rejected(ResultCode),

    #[error("Panel refused to start monitoring")]
    MonitoringRejected,

    #[error("Checksum mismatch (expected {expected:#06X}, received {received:#06X})")]
    ChecksumMismatch { expected: u16, received: u16 },

    #[error("Too many corrupted frames (exceeded limit of {limit})")]
    ChecksumLimitExceeded { limit: u32 },

    #[error("Invalid frame: {details}")]
    InvalidFrame { details: String },

    #[error("Unknown command: {0:#04X}")]
    UnknownCommand(u8),

    #[error("Invalid bitmask length: expected {expected} bytes, got {actual}")]
    InvalidBitmask { expected: usize, actual: usize },

    #[error("Invalid device ID: {id} (max: {max})")]
    InvalidDeviceId { id: u32, max: u32 },

    #[error("Invalid user code")]
    InvalidUserCode,

    #[error("Encrypted session mismatch: expected id {expected:#04X}, received {received:#04X}")]
    SessionMismatch { expected: u8, received: u8 },

    #[error("Frame too large for encrypted transport: {len} bytes")]
    FrameTooLarge { len: usize },

    #[error("Invalid response: {details}")]
    InvalidResponse { details: String },

    #[error("Socket disconnected")]
    Disconnected,

    #[error("Client closed")]
    Closed,
}

impl SatelError {
    /// Whether this error is transient and the connection should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SatelError::Io(_)
                | SatelError::ConnectionTimeout
                | SatelError::PanelBusy
                | SatelError::CommandTimeout { .. }
                | SatelError::Disconnected
                | SatelError::ChecksumMismatch { .. }
                | SatelError::ChecksumLimitExceeded { .. }
                | SatelError::InvalidFrame { .. }
                | SatelError::SessionMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SatelError>;
