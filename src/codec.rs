// MIT License - Copyright (c) 2026 Peter Wright
// Satel Integra frame codec

//! Frame encoding and decoding for the Satel integration protocol.
//!
//! A plain frame on the wire looks like:
//!
//! ```text
//! FE FE | cmd | data... | crc_hi crc_lo | FE 0D
//! ```
//!
//! Any `FE` between header and trailer is stuffed as `FE F0`. In encrypted
//! mode each frame is wrapped in a PDU (see [`crate::crypto`]) and sent as a
//! length byte followed by the ciphertext; [`SatelCodec`] handles both.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use bytes::{Buf, BufMut, BytesMut};
use tokio::time::Duration;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, error, trace, warn};

use crate::constants::{
    BAD_FRAME_LIMIT, BAD_FRAME_WINDOW_SECS, CHECKSUM_SEED, FRAME_END, FRAME_ESCAPE, FRAME_START,
    FRAME_SYNC, MAX_FRAME_LEN, PDU_HEADER_LEN,
};
use crate::crypto::EncryptedSession;
use crate::error::{Result, SatelError};

/// Encrypted session shared by the read and write halves of a connection.
pub type SharedSession = Arc<Mutex<EncryptedSession>>;

/// A decoded protocol frame: command byte plus unstuffed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub cmd: u8,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(cmd: u8, data: impl Into<Vec<u8>>) -> Self {
        Self {
            cmd,
            data: data.into(),
        }
    }

    /// Serialize to wire bytes (header, stuffed body with checksum, trailer).
    pub fn encode(&self) -> Vec<u8> {
        encode_frame(self.cmd, &self.data)
    }
}

/// Satel checksum over `cmd + data`.
pub fn checksum(data: &[u8]) -> u16 {
    let mut crc = CHECKSUM_SEED;
    for &b in data {
        crc = crc.rotate_left(1);
        crc ^= 0xFFFF;
        crc = crc.wrapping_add((crc >> 8).wrapping_add(b as u16));
    }
    crc
}

/// Build a complete wire frame for a command and its payload.
pub fn encode_frame(cmd: u8, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(data.len() + 3);
    body.push(cmd);
    body.extend_from_slice(data);
    let crc = checksum(&body);
    body.extend_from_slice(&crc.to_be_bytes());

    let mut frame = Vec::with_capacity(body.len() * 2 + 4);
    frame.extend_from_slice(&FRAME_START);
    for b in body {
        frame.push(b);
        if b == FRAME_SYNC {
            frame.push(FRAME_ESCAPE);
        }
    }
    frame.extend_from_slice(&FRAME_END);
    frame
}

/// Parse a complete wire frame, verifying the checksum.
pub fn decode_frame(raw: &[u8]) -> Result<Frame> {
    if raw.len() < FRAME_START.len() + 3 + FRAME_END.len() {
        return Err(SatelError::InvalidFrame {
            details: format!("frame too short ({} bytes)", raw.len()),
        });
    }
    if !raw.starts_with(&FRAME_START) {
        return Err(SatelError::InvalidFrame {
            details: "missing frame header".to_string(),
        });
    }
    if !raw.ends_with(&FRAME_END) {
        return Err(SatelError::InvalidFrame {
            details: "missing frame end marker".to_string(),
        });
    }

    let body = unstuff(&raw[FRAME_START.len()..raw.len() - FRAME_END.len()]);
    if body.len() < 3 {
        return Err(SatelError::InvalidFrame {
            details: format!("frame body too short ({} bytes)", body.len()),
        });
    }

    let (content, crc_bytes) = body.split_at(body.len() - 2);
    let received = u16::from_be_bytes([crc_bytes[0], crc_bytes[1]]);
    let expected = checksum(content);
    if received != expected {
        return Err(SatelError::ChecksumMismatch { expected, received });
    }

    Ok(Frame {
        cmd: content[0],
        data: content[1..].to_vec(),
    })
}

fn unstuff(stuffed: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(stuffed.len());
    let mut i = 0;
    while i < stuffed.len() {
        out.push(stuffed[i]);
        if stuffed[i] == FRAME_SYNC && stuffed.get(i + 1) == Some(&FRAME_ESCAPE) {
            i += 1;
        }
        i += 1;
    }
    out
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// tokio-util codec for Satel frames, plain or encrypted.
#[derive(Debug, Clone, Default)]
pub struct SatelCodec {
    session: Option<SharedSession>,
    bad_frames: u32,
    last_bad_frame: Option<Instant>,
}

impl SatelCodec {
    /// Codec for an unencrypted connection.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Codec for an encrypted connection. Both halves of a connection must
    /// share the same session.
    pub fn encrypted(session: SharedSession) -> Self {
        Self {
            session: Some(session),
            ..Self::default()
        }
    }

    pub fn is_encrypted(&self) -> bool {
        self.session.is_some()
    }

    /// Count a corrupted frame. Fails once the limit is exceeded inside the window.
    fn record_bad_frame(&mut self) -> Result<()> {
        if let Some(last) = self.last_bad_frame
            && last.elapsed() > Duration::from_secs(BAD_FRAME_WINDOW_SECS)
        {
            self.bad_frames = 0;
        }

        self.bad_frames += 1;
        self.last_bad_frame = Some(Instant::now());

        if self.bad_frames > BAD_FRAME_LIMIT {
            error!("Too many corrupted frames ({})", self.bad_frames);
            return Err(SatelError::ChecksumLimitExceeded {
                limit: BAD_FRAME_LIMIT,
            });
        }
        Ok(())
    }
}

fn lock(session: &SharedSession) -> MutexGuard<'_, EncryptedSession> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Cut the next plain frame out of the buffer, discarding leading noise.
fn take_plain_frame(src: &mut BytesMut) -> Option<BytesMut> {
    loop {
        let Some(start) = find(src, &FRAME_START) else {
            // Keep a trailing sync byte, it may be the first half of a header
            let keep = usize::from(src.last() == Some(&FRAME_SYNC));
            if src.len() > keep {
                trace!("Discarding {} bytes outside of a frame", src.len() - keep);
                let discard = src.len() - keep;
                src.advance(discard);
            }
            return None;
        };
        if start > 0 {
            trace!("Discarding {} bytes before frame header", start);
            src.advance(start);
        }

        match find(&src[FRAME_START.len()..], &FRAME_END) {
            Some(pos) => {
                let len = FRAME_START.len() + pos + FRAME_END.len();
                return Some(src.split_to(len));
            }
            None if src.len() > MAX_FRAME_LEN => {
                warn!("No frame end within {} bytes, resynchronizing", MAX_FRAME_LEN);
                src.advance(FRAME_START.len());
            }
            None => return None,
        }
    }
}

/// Cut the next encrypted PDU out of the buffer and return the plain frame inside it.
fn take_encrypted_frame(src: &mut BytesMut, session: &SharedSession) -> Result<Option<Vec<u8>>> {
    let Some(&len) = src.first() else {
        return Ok(None);
    };
    let len = len as usize;
    if len < PDU_HEADER_LEN {
        return Err(SatelError::InvalidFrame {
            details: format!("encrypted PDU too short ({} bytes)", len),
        });
    }
    if src.len() < 1 + len {
        src.reserve(1 + len - src.len());
        return Ok(None);
    }

    src.advance(1);
    let pdu = src.split_to(len);
    let mut payload = lock(session).decrypt_pdu(&pdu)?;

    // Ciphertext is zero padded to a full block, drop whatever follows the trailer
    if let Some(pos) = find(&payload, &FRAME_END) {
        payload.truncate(pos + FRAME_END.len());
    }
    Ok(Some(payload))
}

impl Decoder for SatelCodec {
    type Item = Frame;
    type Error = SatelError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        loop {
            let raw = match &self.session {
                None => match take_plain_frame(src) {
                    Some(raw) => raw.to_vec(),
                    None => return Ok(None),
                },
                Some(session) => match take_encrypted_frame(src, session)? {
                    Some(raw) => raw,
                    None => return Ok(None),
                },
            };

            match decode_frame(&raw) {
                Ok(frame) => {
                    trace!("Received frame: cmd={:#04X} len={}", frame.cmd, frame.data.len());
                    return Ok(Some(frame));
                }
                Err(e) => {
                    warn!("Dropping corrupted frame: {}", e);
                    debug!("Corrupted frame bytes: {:02X?}", raw);
                    self.record_bad_frame()?;
                }
            }
        }
    }
}

impl Encoder<Frame> for SatelCodec {
    type Error = SatelError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        let raw = item.encode();
        match &self.session {
            None => dst.extend_from_slice(&raw),
            Some(session) => {
                let len = raw.len() + PDU_HEADER_LEN;
                if len > u8::MAX as usize {
                    return Err(SatelError::FrameTooLarge { len });
                }
                let pdu = lock(session).encrypt_pdu(&raw);
                dst.reserve(1 + pdu.len());
                dst.put_u8(pdu.len() as u8);
                dst.extend_from_slice(&pdu);
            }
        }
        Ok(())
    }
}
