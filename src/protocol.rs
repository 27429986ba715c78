// MIT License - Copyright (c) 2026 Peter Wright
// Satel Integra command set

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use crate::codec::Frame;
use crate::config::ArmMode;
use crate::constants::{
    DEVICE_REPORT_LENGTHS, DEVICES_MASK_LEN, KEEP_ALIVE_DEVICE, MAX_EXPANDERS, MAX_OUTPUTS,
    MAX_PARTITIONS, MAX_USERS, MAX_ZONES, MONITORING_MASK_LEN, PARTITIONS_MASK_LEN, PanelModel,
    USER_CODE_LEN,
};
use crate::error::{Result, ResultCode, SatelError};

/// Commands answered by a frame with the same command byte.
///
/// Sending one of these without payload queries the current state; in
/// monitoring mode the panel also pushes them on its own when the state
/// changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReadCommand {
    /// `0x00` - violated zones (16/32-byte bitmask)
    ZonesViolated,
    /// `0x01` - tampered zones
    ZonesTamper,
    /// `0x02` - zones in alarm
    ZonesAlarm,
    /// `0x06` - bypassed zones
    ZonesBypassed,
    /// `0x09` - armed partitions (suppressed)
    PartitionsArmedSuppressed,
    /// `0x0A` - partitions really armed (mode 0)
    PartitionsArmedMode0,
    /// `0x0B` - partitions armed in mode 2
    PartitionsArmedMode2,
    /// `0x0C` - partitions armed in mode 3
    PartitionsArmedMode3,
    /// `0x0E` - partitions with entry time
    PartitionsEntryTime,
    /// `0x0F` - partitions with exit time counting, more than 10 s left
    PartitionsExitCountdownOver10,
    /// `0x10` - partitions with exit time counting, less than 10 s left
    PartitionsExitCountdownUnder10,
    /// `0x13` - partitions in alarm
    PartitionsAlarm,
    /// `0x14` - partitions in fire alarm
    PartitionsFireAlarm,
    /// `0x17` - active outputs (16/32-byte bitmask)
    OutputsState,
    /// `0x1A` - RTC and basic status
    ReadTime,
    /// `0x2A` - partitions armed in mode 1
    PartitionsArmedMode1,
    /// `0x7E` - INTEGRA version
    ReadVersion,
    /// `0xEE` - read device name; request payload is `[kind, number]`
    ReadDeviceName,
    /// `0xEF` - result of the last write command
    Result,
}

impl ReadCommand {
    pub fn code(&self) -> u8 {
        match self {
            Self::ZonesViolated => 0x00,
            Self::ZonesTamper => 0x01,
            Self::ZonesAlarm => 0x02,
            Self::ZonesBypassed => 0x06,
            Self::PartitionsArmedSuppressed => 0x09,
            Self::PartitionsArmedMode0 => 0x0A,
            Self::PartitionsArmedMode2 => 0x0B,
            Self::PartitionsArmedMode3 => 0x0C,
            Self::PartitionsEntryTime => 0x0E,
            Self::PartitionsExitCountdownOver10 => 0x0F,
            Self::PartitionsExitCountdownUnder10 => 0x10,
            Self::PartitionsAlarm => 0x13,
            Self::PartitionsFireAlarm => 0x14,
            Self::OutputsState => 0x17,
            Self::ReadTime => 0x1A,
            Self::PartitionsArmedMode1 => 0x2A,
            Self::ReadVersion => 0x7E,
            Self::ReadDeviceName => 0xEE,
            Self::Result => 0xEF,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::ZonesViolated),
            0x01 => Some(Self::ZonesTamper),
            0x02 => Some(Self::ZonesAlarm),
            0x06 => Some(Self::ZonesBypassed),
            0x09 => Some(Self::PartitionsArmedSuppressed),
            0x0A => Some(Self::PartitionsArmedMode0),
            0x0B => Some(Self::PartitionsArmedMode2),
            0x0C => Some(Self::PartitionsArmedMode3),
            0x0E => Some(Self::PartitionsEntryTime),
            0x0F => Some(Self::PartitionsExitCountdownOver10),
            0x10 => Some(Self::PartitionsExitCountdownUnder10),
            0x13 => Some(Self::PartitionsAlarm),
            0x14 => Some(Self::PartitionsFireAlarm),
            0x17 => Some(Self::OutputsState),
            0x1A => Some(Self::ReadTime),
            0x2A => Some(Self::PartitionsArmedMode1),
            0x7E => Some(Self::ReadVersion),
            0xEE => Some(Self::ReadDeviceName),
            0xEF => Some(Self::Result),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ZonesViolated => "ZONES_VIOLATED",
            Self::ZonesTamper => "ZONES_TAMPER",
            Self::ZonesAlarm => "ZONES_ALARM",
            Self::ZonesBypassed => "ZONES_BYPASSED",
            Self::PartitionsArmedSuppressed => "PARTITIONS_ARMED_SUPPRESSED",
            Self::PartitionsArmedMode0 => "PARTITIONS_ARMED_MODE0",
            Self::PartitionsArmedMode2 => "PARTITIONS_ARMED_MODE2",
            Self::PartitionsArmedMode3 => "PARTITIONS_ARMED_MODE3",
            Self::PartitionsEntryTime => "PARTITIONS_ENTRY_TIME",
            Self::PartitionsExitCountdownOver10 => "PARTITIONS_EXIT_COUNTDOWN_OVER_10",
            Self::PartitionsExitCountdownUnder10 => "PARTITIONS_EXIT_COUNTDOWN_UNDER_10",
            Self::PartitionsAlarm => "PARTITIONS_ALARM",
            Self::PartitionsFireAlarm => "PARTITIONS_FIRE_ALARM",
            Self::OutputsState => "OUTPUTS_STATE",
            Self::ReadTime => "READ_TIME",
            Self::PartitionsArmedMode1 => "PARTITIONS_ARMED_MODE1",
            Self::ReadVersion => "READ_VERSION",
            Self::ReadDeviceName => "READ_DEVICE_NAME",
            Self::Result => "RESULT",
        }
    }
}

impl fmt::Display for ReadCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Zone reports, in the order they are refreshed.
pub const ZONE_REPORTS: [ReadCommand; 4] = [
    ReadCommand::ZonesViolated,
    ReadCommand::ZonesTamper,
    ReadCommand::ZonesAlarm,
    ReadCommand::ZonesBypassed,
];

/// Partition reports. A partition's state is only known once all of them arrived.
pub const PARTITION_REPORTS: [ReadCommand; 10] = [
    ReadCommand::PartitionsArmedSuppressed,
    ReadCommand::PartitionsArmedMode0,
    ReadCommand::PartitionsArmedMode1,
    ReadCommand::PartitionsArmedMode2,
    ReadCommand::PartitionsArmedMode3,
    ReadCommand::PartitionsEntryTime,
    ReadCommand::PartitionsExitCountdownOver10,
    ReadCommand::PartitionsExitCountdownUnder10,
    ReadCommand::PartitionsAlarm,
    ReadCommand::PartitionsFireAlarm,
];

/// Every report the client subscribes to in monitoring mode and queries after connecting.
pub fn monitored_reports() -> Vec<ReadCommand> {
    let mut reports = ZONE_REPORTS.to_vec();
    reports.extend_from_slice(&PARTITION_REPORTS);
    reports.push(ReadCommand::OutputsState);
    reports
}

/// Commands that change panel state; answered by a `0xEF` result frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteCommand {
    /// `0x7F` - enable monitoring of the selected reports
    StartMonitoring,
    /// `0x80..=0x83` - arm in mode 0-3
    Arm(ArmMode),
    /// `0x84`
    Disarm,
    /// `0x85`
    ClearAlarm,
    /// `0x86`
    ZonesBypass,
    /// `0x87`
    ZonesUnbypass,
    /// `0x88`
    OutputsOn,
    /// `0x89`
    OutputsOff,
}

impl WriteCommand {
    pub fn code(&self) -> u8 {
        match self {
            Self::StartMonitoring => 0x7F,
            Self::Arm(mode) => 0x80 + mode.as_u8(),
            Self::Disarm => 0x84,
            Self::ClearAlarm => 0x85,
            Self::ZonesBypass => 0x86,
            Self::ZonesUnbypass => 0x87,
            Self::OutputsOn => 0x88,
            Self::OutputsOff => 0x89,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::StartMonitoring => "START_MONITORING",
            Self::Arm(ArmMode::Mode0) => "PARTITIONS_ARM_MODE_0",
            Self::Arm(ArmMode::Mode1) => "PARTITIONS_ARM_MODE_1",
            Self::Arm(ArmMode::Mode2) => "PARTITIONS_ARM_MODE_2",
            Self::Arm(ArmMode::Mode3) => "PARTITIONS_ARM_MODE_3",
            Self::Disarm => "PARTITIONS_DISARM",
            Self::ClearAlarm => "PARTITIONS_CLEAR_ALARM",
            Self::ZonesBypass => "ZONES_BYPASS",
            Self::ZonesUnbypass => "ZONES_UNBYPASS",
            Self::OutputsOn => "OUTPUTS_ON",
            Self::OutputsOff => "OUTPUTS_OFF",
        }
    }
}

/// Either kind of command a request can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Read(ReadCommand),
    Write(WriteCommand),
}

impl Command {
    pub fn code(&self) -> u8 {
        match self {
            Self::Read(cmd) => cmd.code(),
            Self::Write(cmd) => cmd.code(),
        }
    }

    /// Command byte of the frame that answers this command.
    pub fn reply_code(&self) -> u8 {
        match self {
            Self::Read(cmd) => cmd.code(),
            Self::Write(_) => ReadCommand::Result.code(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Read(cmd) => cmd.name(),
            Self::Write(cmd) => cmd.name(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Device kinds understood by the `0xEE` name query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    Partition,
    Zone,
    User,
    Expander,
    Output,
}

impl DeviceKind {
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Partition => 0,
            Self::Zone => 1,
            Self::User => 2,
            Self::Expander => 3,
            Self::Output => 4,
        }
    }

    /// Highest device number the name query accepts for this kind.
    pub fn max_number(&self) -> u32 {
        match self {
            Self::Partition => MAX_PARTITIONS,
            Self::Zone => MAX_ZONES,
            Self::Output => MAX_OUTPUTS,
            Self::User => MAX_USERS,
            Self::Expander => MAX_EXPANDERS,
        }
    }

    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Partition),
            1 => Some(Self::Zone),
            2 => Some(Self::User),
            3 => Some(Self::Expander),
            4 => Some(Self::Output),
            _ => None,
        }
    }
}

/// Encode 1-based ids as a little-endian bitmask of `len` bytes.
///
/// Id `n` sets bit `(n - 1) % 8` of byte `(n - 1) / 8`.
pub fn encode_bitmask_le(ids: &[u32], len: usize) -> Result<Vec<u8>> {
    let max = (len * 8) as u32;
    let mut mask = vec![0u8; len];
    for &id in ids {
        if id == 0 || id > max {
            return Err(SatelError::InvalidDeviceId { id, max });
        }
        let pos = (id - 1) as usize;
        mask[pos / 8] |= 1 << (pos % 8);
    }
    Ok(mask)
}

/// Decode a little-endian bitmask into the sorted list of 1-based ids that are set.
pub fn decode_bitmask_le(data: &[u8], expected_len: usize) -> Result<Vec<u32>> {
    if data.len() != expected_len {
        return Err(SatelError::InvalidBitmask {
            expected: expected_len,
            actual: data.len(),
        });
    }
    let mut ids = Vec::new();
    for (byte_idx, byte) in data.iter().enumerate() {
        for bit in 0..8 {
            if byte & (1 << bit) != 0 {
                ids.push((byte_idx * 8 + bit + 1) as u32);
            }
        }
    }
    Ok(ids)
}

/// Encode a user code: hex digits right-padded with `F` to 8 bytes.
pub fn encode_user_code(code: &str) -> Result<[u8; USER_CODE_LEN]> {
    let code = code.trim();
    if code.is_empty()
        || code.len() > USER_CODE_LEN * 2
        || !code.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(SatelError::InvalidUserCode);
    }

    let padded = format!("{:F<width$}", code, width = USER_CODE_LEN * 2);
    let mut out = [0u8; USER_CODE_LEN];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&padded[i * 2..i * 2 + 2], 16)
            .map_err(|_| SatelError::InvalidUserCode)?;
    }
    Ok(out)
}

/// A request ready to be sent to the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub command: Command,
    pub data: Vec<u8>,
}

impl Request {
    /// Query the current state of a report.
    pub fn query(command: ReadCommand) -> Self {
        Self {
            command: Command::Read(command),
            data: Vec::new(),
        }
    }

    /// Enable monitoring of the given reports (bit `code + 1` of a 12-byte mask).
    pub fn start_monitoring(reports: &[ReadCommand]) -> Result<Self> {
        let bits: Vec<u32> = reports.iter().map(|r| r.code() as u32 + 1).collect();
        Ok(Self {
            command: Command::Write(WriteCommand::StartMonitoring),
            data: encode_bitmask_le(&bits, MONITORING_MASK_LEN)?,
        })
    }

    fn with_code(command: WriteCommand, code: &str, ids: &[u32], mask_len: usize) -> Result<Self> {
        let mut data = encode_user_code(code)?.to_vec();
        data.extend(encode_bitmask_le(ids, mask_len)?);
        Ok(Self {
            command: Command::Write(command),
            data,
        })
    }

    pub fn arm(code: &str, partitions: &[u32], mode: ArmMode) -> Result<Self> {
        Self::with_code(WriteCommand::Arm(mode), code, partitions, PARTITIONS_MASK_LEN)
    }

    pub fn disarm(code: &str, partitions: &[u32]) -> Result<Self> {
        Self::with_code(WriteCommand::Disarm, code, partitions, PARTITIONS_MASK_LEN)
    }

    pub fn clear_alarm(code: &str, partitions: &[u32]) -> Result<Self> {
        Self::with_code(WriteCommand::ClearAlarm, code, partitions, PARTITIONS_MASK_LEN)
    }

    pub fn set_outputs(code: &str, outputs: &[u32], on: bool) -> Result<Self> {
        let command = if on {
            WriteCommand::OutputsOn
        } else {
            WriteCommand::OutputsOff
        };
        Self::with_code(command, code, outputs, DEVICES_MASK_LEN)
    }

    pub fn bypass_zones(code: &str, zones: &[u32], bypass: bool) -> Result<Self> {
        let command = if bypass {
            WriteCommand::ZonesBypass
        } else {
            WriteCommand::ZonesUnbypass
        };
        Self::with_code(command, code, zones, DEVICES_MASK_LEN)
    }

    /// Read the name of a device. Device number 256 is sent as 0.
    pub fn device_name(kind: DeviceKind, number: u32) -> Self {
        Self {
            command: Command::Read(ReadCommand::ReadDeviceName),
            data: vec![kind.as_u8(), (number % 256) as u8],
        }
    }

    /// Cheap request sent periodically so the module keeps the session open.
    pub fn keep_alive() -> Self {
        Self {
            command: Command::Read(ReadCommand::ReadDeviceName),
            data: vec![KEEP_ALIVE_DEVICE.0, KEEP_ALIVE_DEVICE.1],
        }
    }

    pub fn reply_code(&self) -> u8 {
        self.command.reply_code()
    }

    pub fn to_frame(&self) -> Frame {
        Frame::new(self.command.code(), self.data.clone())
    }
}

/// A frame received from the panel with a recognised command byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub command: ReadCommand,
    pub data: Vec<u8>,
}

impl TryFrom<Frame> for Message {
    type Error = SatelError;

    fn try_from(frame: Frame) -> Result<Self> {
        let command = ReadCommand::from_code(frame.cmd).ok_or(SatelError::UnknownCommand(frame.cmd))?;
        Ok(Self {
            command,
            data: frame.data,
        })
    }
}

impl Message {
    /// Ids set in a bitmask payload of exactly `len` bytes.
    pub fn active_bits(&self, len: usize) -> Result<Vec<u32>> {
        decode_bitmask_le(&self.data, len)
    }

    /// Ids set in a zone or output report (16 or 32 bytes depending on the model).
    ///
    /// Returns the ids and the number of ids the report covers.
    pub fn device_bits(&self) -> Result<(Vec<u32>, u32)> {
        let len = DEVICE_REPORT_LENGTHS
            .iter()
            .copied()
            .find(|&l| l == self.data.len())
            .ok_or(SatelError::InvalidBitmask {
                expected: DEVICE_REPORT_LENGTHS[0],
                actual: self.data.len(),
            })?;
        Ok((decode_bitmask_le(&self.data, len)?, (len * 8) as u32))
    }

    /// Result code carried by a `0xEF` frame.
    pub fn result_code(&self) -> Option<ResultCode> {
        if self.command != ReadCommand::Result {
            return None;
        }
        self.data.first().map(|&b| ResultCode::from_byte(b))
    }
}

/// Panel model and firmware information from the `0x7E` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelVersion {
    pub model: PanelModel,
    /// Firmware version, e.g. "1.16"
    pub version: String,
    pub release_date: NaiveDate,
    /// Language code of the firmware; 1 is English
    pub language: u8,
    pub settings_in_flash: bool,
}

impl PanelVersion {
    /// Parse the payload of a `0x7E` reply:
    /// `type | 11 ASCII digits (e.g. "11620160715") | language | 0xFF if settings stored`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 14 {
            return Err(SatelError::InvalidResponse {
                details: format!("version reply too short ({} bytes)", data.len()),
            });
        }
        let digits = &data[1..12];
        if !digits.iter().all(u8::is_ascii_digit) {
            return Err(SatelError::InvalidResponse {
                details: format!("invalid version string {:02X?}", digits),
            });
        }
        let text: String = digits.iter().map(|&b| b as char).collect();
        let version = format!("{}.{}", &text[0..1], &text[1..3]);
        let release_date = NaiveDate::parse_from_str(&text[3..11], "%Y%m%d").map_err(|e| {
            SatelError::InvalidResponse {
                details: format!("invalid firmware date {}: {}", &text[3..11], e),
            }
        })?;

        Ok(Self {
            model: PanelModel::from_code(data[0]),
            version,
            release_date,
            language: data[12],
            settings_in_flash: data[13] == 0xFF,
        })
    }
}

impl fmt::Display for PanelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} LANG: {} SETTINGS {} in flash",
            self.model,
            self.version,
            self.release_date.format("%Y-%m-%d"),
            if self.language == 1 { "English" } else { "Other" },
            if self.settings_in_flash { "STORED" } else { "NOT STORED" },
        )
    }
}

fn bcd(b: u8) -> Option<u32> {
    let (hi, lo) = (b >> 4, b & 0x0F);
    (hi <= 9 && lo <= 9).then_some((hi * 10 + lo) as u32)
}

/// Parse the panel clock from a `0x1A` reply (`YYYY MM DD hh mm ss` in BCD).
pub fn parse_panel_time(data: &[u8]) -> Result<NaiveDateTime> {
    let invalid = || SatelError::InvalidResponse {
        details: format!("invalid RTC reply {:02X?}", data),
    };
    if data.len() < 7 {
        return Err(invalid());
    }
    let digits: Option<Vec<u32>> = data[..7].iter().map(|&b| bcd(b)).collect();
    let d = digits.ok_or_else(invalid)?;
    let year = (d[0] * 100 + d[1]) as i32;
    NaiveDate::from_ymd_opt(year, d[2], d[3])
        .and_then(|date| date.and_hms_opt(d[4], d[5], d[6]))
        .ok_or_else(invalid)
}

/// Name of a device as reported by the `0xEE` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceName {
    pub kind: Option<DeviceKind>,
    pub number: u32,
    /// Zone reaction, output function or similar kind-specific byte
    pub function: u8,
    pub name: String,
}

impl DeviceName {
    /// Parse `kind | number | function | 16-byte name`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 19 {
            return Err(SatelError::InvalidResponse {
                details: format!("device name reply too short ({} bytes)", data.len()),
            });
        }
        let number = match data[1] {
            0 => 256,
            n => n as u32,
        };
        // Names are CP1250 on the panel; non-ASCII characters are replaced
        let name: String = data[3..19]
            .iter()
            .map(|&b| if b.is_ascii() { b as char } else { char::REPLACEMENT_CHARACTER })
            .collect();
        Ok(Self {
            kind: DeviceKind::from_u8(data[0]),
            number,
            function: data[2],
            name: name.trim_end().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{decode_frame, encode_frame};

    fn hex(s: &str) -> Vec<u8> {
        s.split_whitespace()
            .map(|b| u8::from_str_radix(b, 16).unwrap())
            .collect()
    }

    #[test]
    fn test_command_codes_roundtrip() {
        for cmd in monitored_reports() {
            assert_eq!(ReadCommand::from_code(cmd.code()), Some(cmd));
        }
        assert_eq!(ReadCommand::from_code(0x7F), None);
        assert_eq!(WriteCommand::Arm(ArmMode::Mode3).code(), 0x83);
    }

    #[test]
    fn test_device_kind_limits() {
        assert_eq!(DeviceKind::Partition.max_number(), 32);
        assert_eq!(DeviceKind::Zone.max_number(), 256);
        assert_eq!(DeviceKind::Output.max_number(), 256);
        assert_eq!(DeviceKind::User.max_number(), 255);
    }

    #[test]
    fn test_reply_codes() {
        assert_eq!(Request::query(ReadCommand::OutputsState).reply_code(), 0x17);
        assert_eq!(Request::keep_alive().reply_code(), 0xEE);
        assert_eq!(Request::disarm("1234", &[1]).unwrap().reply_code(), 0xEF);
    }

    #[test]
    fn test_bitmask_encode() {
        let mask = encode_bitmask_le(&[3, 14, 128], 16).unwrap();
        assert_eq!(mask, hex("04 20 00 00 00 00 00 00 00 00 00 00 00 00 00 80"));

        let mask = encode_bitmask_le(&[1, 2, 29], 4).unwrap();
        assert_eq!(mask, hex("03 00 00 10"));
    }

    #[test]
    fn test_bitmask_encode_out_of_range() {
        assert!(matches!(
            encode_bitmask_le(&[33], 4),
            Err(SatelError::InvalidDeviceId { id: 33, max: 32 })
        ));
        assert!(encode_bitmask_le(&[0], 4).is_err());
    }

    #[test]
    fn test_bitmask_decode() {
        let ids = decode_bitmask_le(
            &hex("05 00 00 00 00 00 00 20 00 00 00 00 00 00 80 00"),
            16,
        )
        .unwrap();
        assert_eq!(ids, vec![1, 3, 62, 120]);

        assert!(matches!(
            decode_bitmask_le(&[0x01, 0x00], 4),
            Err(SatelError::InvalidBitmask { expected: 4, actual: 2 })
        ));
    }

    #[test]
    fn test_user_code_encoding() {
        assert_eq!(
            encode_user_code("1111").unwrap(),
            [0x11, 0x11, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(
            encode_user_code(" 12345 ").unwrap(),
            [0x12, 0x34, 0x5F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert!(encode_user_code("").is_err());
        assert!(encode_user_code("12a4x").is_err());
        assert!(encode_user_code("12345678901234567").is_err());
    }

    #[test]
    fn test_arm_request_frame() {
        let request = Request::arm("1111", &[1], ArmMode::Mode0).unwrap();
        assert_eq!(
            request.to_frame().encode(),
            hex("FE FE 80 11 11 FF FF FF FF FF FF 01 00 00 00 15 40 FE 0D")
        );
    }

    #[test]
    fn test_start_monitoring_frame() {
        let request = Request::start_monitoring(&[ReadCommand::PartitionsArmedSuppressed]).unwrap();
        assert_eq!(
            request.to_frame().encode(),
            hex("FE FE 7F 00 02 00 00 00 00 00 00 00 00 00 00 A7 A9 FE 0D")
        );
    }

    #[test]
    fn test_start_monitoring_all_reports() {
        let request = Request::start_monitoring(&monitored_reports()).unwrap();
        assert_eq!(request.data.len(), MONITORING_MASK_LEN);
        // zones violated (0x00) -> bit 1, outputs (0x17) -> bit 24, mode 1 (0x2A) -> bit 43
        assert_eq!(request.data[0] & 0x01, 0x01);
        assert_eq!(request.data[2] & 0x80, 0x80);
        assert_eq!(request.data[5] & 0x04, 0x04);
    }

    #[test]
    fn test_output_and_bypass_requests() {
        let request = Request::set_outputs("1234", &[16, 256], true).unwrap();
        assert_eq!(request.command.code(), 0x88);
        assert_eq!(request.data.len(), 8 + 32);
        assert_eq!(request.data[9], 0x80);
        assert_eq!(request.data[39], 0x80);

        let request = Request::bypass_zones("1234", &[2], false).unwrap();
        assert_eq!(request.command.code(), 0x87);
        assert_eq!(request.data[8], 0x02);
    }

    #[test]
    fn test_device_name_request() {
        assert_eq!(
            Request::device_name(DeviceKind::Partition, 1).to_frame().encode(),
            hex("FE FE EE 00 01 63 0A FE 0D")
        );
        assert_eq!(Request::device_name(DeviceKind::Zone, 256).data, vec![1, 0]);
    }

    #[test]
    fn test_message_outputs_report() {
        let frame = decode_frame(&hex(
            "FE FE 17 00 80 00 00 00 00 00 00 00 00 00 00 00 00 00 80 22 D8 FE 0D",
        ))
        .unwrap();
        let msg = Message::try_from(frame).unwrap();
        assert_eq!(msg.command, ReadCommand::OutputsState);
        let (ids, covered) = msg.device_bits().unwrap();
        assert_eq!(ids, vec![16, 128]);
        assert_eq!(covered, 128);
    }

    #[test]
    fn test_message_result_code() {
        let ok = Message::try_from(decode_frame(&hex("FE FE EF 00 4E AA FE 0D")).unwrap()).unwrap();
        assert_eq!(ok.result_code(), Some(ResultCode::Ok));

        let report = Message::try_from(decode_frame(&hex("FE FE 0A 01 00 00 00 7D BC FE 0D")).unwrap())
            .unwrap();
        assert_eq!(report.result_code(), None);
        assert_eq!(report.active_bits(4).unwrap(), vec![1]);
    }

    #[test]
    fn test_unknown_command_byte() {
        let frame = Frame::new(0x7F, vec![0xFE]);
        assert!(matches!(
            Message::try_from(frame),
            Err(SatelError::UnknownCommand(0x7F))
        ));
    }

    #[test]
    fn test_parse_version() {
        let frame = decode_frame(&hex(
            "FE FE 7E 03 31 31 36 32 30 31 36 30 37 31 35 00 00 02 48 FE 0D",
        ))
        .unwrap();
        let version = PanelVersion::parse(&frame.data).unwrap();
        assert_eq!(version.model, PanelModel::Integra128);
        assert_eq!(version.version, "1.16");
        assert_eq!(version.release_date, NaiveDate::from_ymd_opt(2016, 7, 15).unwrap());
        assert_eq!(
            version.to_string(),
            "INTEGRA 128 1.16 2016-07-15 LANG: Other SETTINGS NOT STORED in flash"
        );
    }

    #[test]
    fn test_parse_time() {
        let frame = decode_frame(&hex(
            "FE FE 1A 20 17 08 07 23 59 22 00 A3 34 70 FE 0D",
        ))
        .unwrap();
        let time = parse_panel_time(&frame.data).unwrap();
        assert_eq!(time.to_string(), "2017-08-07 23:59:22");

        assert!(parse_panel_time(&[0x20, 0x17, 0x13, 0x01, 0x00, 0x00, 0x00]).is_err());
        assert!(parse_panel_time(&[0x2A, 0x17, 0x01, 0x01, 0x00, 0x00, 0x00]).is_err());
    }

    #[test]
    fn test_parse_device_name() {
        let frame = decode_frame(&hex(
            "FE FE EE 00 01 00 53 74 72 65 66 61 20 20 31 20 20 20 20 20 20 20 5D 20 FE 0D",
        ))
        .unwrap();
        let name = DeviceName::parse(&frame.data).unwrap();
        assert_eq!(name.kind, Some(DeviceKind::Partition));
        assert_eq!(name.number, 1);
        assert_eq!(name.name, "Strefa  1");
    }

    #[test]
    fn test_keep_alive_frame() {
        assert_eq!(
            Request::keep_alive().to_frame().encode(),
            encode_frame(0xEE, &[0x01, 0x01])
        );
    }
}
