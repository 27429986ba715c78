// MIT License - Copyright (c) 2026 Peter Wright
// Satel Integra encrypted transport

//! Encryption layer used by ETHM-1 Plus modules when an integration key is set.
//!
//! The AES-192 block primitive is chained in a Satel-specific mode: full
//! 16-byte blocks are CBC-like with an initial vector of `AES(0^16)`, while a
//! trailing partial block is XOR-ed with the re-encrypted chaining value.
//! Every frame is prefixed with a 6-byte header before encryption:
//!
//! ```text
//! rand rand | counter_hi counter_lo | id_s | id_r
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use aes::Aes192;
use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit, generic_array::GenericArray};
use tracing::trace;

use crate::constants::PDU_HEADER_LEN;
use crate::error::{Result, SatelError};

/// AES block size.
pub const BLOCK_LEN: usize = 16;

/// Length of the significant part of an integration key.
const KEY_PART_LEN: usize = 12;

/// Session ids handed out to successive connections in this process.
static NEXT_SESSION_ID: AtomicU8 = AtomicU8::new(0);

/// Convert an integration key into the 24-byte AES-192 key.
///
/// The key is truncated or space padded to 12 bytes and repeated twice.
pub fn integration_key_to_encryption_key(integration_key: &str) -> [u8; 24] {
    let mut part = [b' '; KEY_PART_LEN];
    for (dst, src) in part.iter_mut().zip(integration_key.as_bytes()) {
        *dst = *src;
    }
    let mut key = [0u8; 24];
    key[..KEY_PART_LEN].copy_from_slice(&part);
    key[KEY_PART_LEN..].copy_from_slice(&part);
    key
}

/// AES-192 in the Satel chaining mode.
#[derive(Clone)]
pub struct SatelCipher {
    aes: Aes192,
}

impl fmt::Debug for SatelCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SatelCipher").finish_non_exhaustive()
    }
}

impl SatelCipher {
    pub fn new(integration_key: &str) -> Self {
        let key = integration_key_to_encryption_key(integration_key);
        Self {
            aes: Aes192::new(GenericArray::from_slice(&key)),
        }
    }

    fn encrypt_block(&self, block: &mut [u8; BLOCK_LEN]) {
        let mut b = GenericArray::clone_from_slice(block);
        self.aes.encrypt_block(&mut b);
        block.copy_from_slice(&b);
    }

    fn decrypt_block(&self, block: &mut [u8; BLOCK_LEN]) {
        let mut b = GenericArray::clone_from_slice(block);
        self.aes.decrypt_block(&mut b);
        block.copy_from_slice(&b);
    }

    fn initial_vector(&self) -> [u8; BLOCK_LEN] {
        let mut cv = [0u8; BLOCK_LEN];
        self.encrypt_block(&mut cv);
        cv
    }

    /// Encrypt a message. Inputs shorter than one block are zero padded.
    pub fn encrypt(&self, data: &[u8]) -> Vec<u8> {
        let mut data = data.to_vec();
        if data.len() < BLOCK_LEN {
            data.resize(BLOCK_LEN, 0);
        }

        let mut cv = self.initial_vector();
        for chunk in data.chunks_mut(BLOCK_LEN) {
            if chunk.len() == BLOCK_LEN {
                let mut block = [0u8; BLOCK_LEN];
                for (i, b) in block.iter_mut().enumerate() {
                    *b = chunk[i] ^ cv[i];
                }
                self.encrypt_block(&mut block);
                chunk.copy_from_slice(&block);
                cv = block;
            } else {
                self.encrypt_block(&mut cv);
                for (b, k) in chunk.iter_mut().zip(cv.iter()) {
                    *b ^= k;
                }
            }
        }
        data
    }

    /// Decrypt a message produced by [`SatelCipher::encrypt`].
    pub fn decrypt(&self, data: &[u8]) -> Vec<u8> {
        let mut data = data.to_vec();

        let mut cv = self.initial_vector();
        for chunk in data.chunks_mut(BLOCK_LEN) {
            if chunk.len() == BLOCK_LEN {
                let mut cipher_block = [0u8; BLOCK_LEN];
                cipher_block.copy_from_slice(chunk);
                let mut block = cipher_block;
                self.decrypt_block(&mut block);
                for (i, b) in chunk.iter_mut().enumerate() {
                    *b = block[i] ^ cv[i];
                }
                cv = cipher_block;
            } else {
                self.encrypt_block(&mut cv);
                for (b, k) in chunk.iter_mut().zip(cv.iter()) {
                    *b ^= k;
                }
            }
        }
        data
    }
}

/// Per-connection encryption state: rolling counter and the session ids
/// exchanged in every PDU header.
#[derive(Debug, Clone)]
pub struct EncryptedSession {
    cipher: SatelCipher,
    rolling_counter: u16,
    /// Our session id, echoed back by the panel in byte 5 of its headers.
    id_s: u8,
    /// The panel's session id, taken from byte 4 of the last received header.
    id_r: u8,
}

impl EncryptedSession {
    /// Start a new session with the next process-wide session id.
    pub fn new(integration_key: &str) -> Self {
        Self::with_session_id(integration_key, NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Start a session with an explicit session id.
    pub fn with_session_id(integration_key: &str, id_s: u8) -> Self {
        Self {
            cipher: SatelCipher::new(integration_key),
            rolling_counter: 0,
            id_s,
            id_r: 0,
        }
    }

    pub fn session_id(&self) -> u8 {
        self.id_s
    }

    pub fn remote_session_id(&self) -> u8 {
        self.id_r
    }

    pub fn rolling_counter(&self) -> u16 {
        self.rolling_counter
    }

    fn next_header(&mut self) -> [u8; PDU_HEADER_LEN] {
        let random: [u8; 2] = rand::random();
        let counter = self.rolling_counter.to_be_bytes();
        self.rolling_counter = self.rolling_counter.wrapping_add(1);
        [random[0], random[1], counter[0], counter[1], self.id_s, self.id_r]
    }

    /// Prefix a plain frame with a fresh header and encrypt the whole PDU.
    pub fn encrypt_pdu(&mut self, frame: &[u8]) -> Vec<u8> {
        let header = self.next_header();
        let mut pdu = Vec::with_capacity(PDU_HEADER_LEN + frame.len());
        pdu.extend_from_slice(&header);
        pdu.extend_from_slice(frame);
        trace!("Encrypting PDU: {:02X?}", pdu);
        self.cipher.encrypt(&pdu)
    }

    /// Decrypt a PDU and return the payload that follows its header.
    ///
    /// Fails when the PDU is not addressed to this session.
    pub fn decrypt_pdu(&mut self, pdu: &[u8]) -> Result<Vec<u8>> {
        let decrypted = self.cipher.decrypt(pdu);
        if decrypted.len() < PDU_HEADER_LEN {
            return Err(SatelError::InvalidFrame {
                details: format!("encrypted PDU too short ({} bytes)", decrypted.len()),
            });
        }
        trace!("Decrypted PDU: {:02X?}", decrypted);

        self.id_r = decrypted[4];
        if decrypted[5] != self.id_s {
            return Err(SatelError::SessionMismatch {
                expected: self.id_s,
                received: decrypted[5],
            });
        }
        Ok(decrypted[PDU_HEADER_LEN..].to_vec())
    }
}
