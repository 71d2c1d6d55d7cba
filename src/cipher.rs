//! Password-based authenticated encryption of a whole payload.
//!
//! # Blob layout
//!
//! ```text
//! [0..8]    magic "HOTBKUP\0"
//! [8]       format version
//! [9..25]   salt (random, 16 bytes)
//! [25..29]  argon2 m_cost, KiB   (u32 LE)
//! [29..33]  argon2 t_cost        (u32 LE)
//! [33..37]  argon2 p_cost        (u32 LE)
//! [37..61]  XChaCha20 nonce (random, 24 bytes)
//! [61..]    ciphertext || Poly1305 tag
//! ```
//!
//! The key is Argon2id(password, salt).  The 61-byte header is fed to the AEAD
//! as associated data, so changing any byte of the blob, header included,
//! makes [`decrypt`] fail with [`Error::Authentication`].

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{
    Key, KeyInit, XChaCha20Poly1305, XNonce,
    aead::{Aead, Payload},
};
use rand_core::{OsRng, RngCore};
use zeroize::Zeroizing;

use crate::error::{Error, Result};

pub const MAGIC: [u8; 8] = *b"HOTBKUP\0";
pub const VERSION: u8 = 1;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 24;
pub const TAG_LEN: usize = 16;
const PARAMS_LEN: usize = 12;
pub const HEADER_LEN: usize = MAGIC.len() + 1 + SALT_LEN + PARAMS_LEN + NONCE_LEN;

const KEY_LEN: usize = 32;

// Upper bounds applied to parameters read back from a blob, so a crafted
// header cannot make decryption allocate gigabytes or spin for minutes.
const MAX_M_COST_KIB: u32 = 1024 * 1024;
const MAX_T_COST: u32 = 10;
const MAX_P_COST: u32 = 16;

/// Argon2id cost parameters stored in every blob header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    pub m_cost_kib: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost_kib: Params::DEFAULT_M_COST,
            t_cost: Params::DEFAULT_T_COST,
            p_cost: Params::DEFAULT_P_COST,
        }
    }
}

impl KdfParams {
    fn encode(self) -> [u8; PARAMS_LEN] {
        let mut out = [0u8; PARAMS_LEN];
        out[0..4].copy_from_slice(&self.m_cost_kib.to_le_bytes());
        out[4..8].copy_from_slice(&self.t_cost.to_le_bytes());
        out[8..12].copy_from_slice(&self.p_cost.to_le_bytes());
        out
    }

    fn decode(bytes: &[u8]) -> Self {
        let word = |i: usize| u32::from_le_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Self {
            m_cost_kib: word(0),
            t_cost: word(4),
            p_cost: word(8),
        }
    }

    fn is_acceptable(&self) -> bool {
        (1..=MAX_P_COST).contains(&self.p_cost)
            && (1..=MAX_T_COST).contains(&self.t_cost)
            && self.m_cost_kib >= 8 * self.p_cost
            && self.m_cost_kib <= MAX_M_COST_KIB
    }
}

fn derive_key(
    password: &str,
    salt: &[u8; SALT_LEN],
    params: KdfParams,
) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let argon_params = Params::new(
        params.m_cost_kib,
        params.t_cost,
        params.p_cost,
        Some(KEY_LEN),
    )
    .map_err(|_| Error::Authentication)?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut *key)
        .map_err(|_| Error::Authentication)?;
    Ok(key)
}

fn header(salt: &[u8; SALT_LEN], params: KdfParams, nonce: &[u8; NONCE_LEN]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN);
    out.extend_from_slice(&MAGIC);
    out.push(VERSION);
    out.extend_from_slice(salt);
    out.extend_from_slice(&params.encode());
    out.extend_from_slice(nonce);
    out
}

/// Encrypt `plaintext` under `password` with the default KDF cost.
pub fn encrypt(password: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
    encrypt_with_params(password, plaintext, KdfParams::default())
}

/// Encrypt with explicit KDF cost parameters (recorded in the header).
pub fn encrypt_with_params(password: &str, plaintext: &[u8], params: KdfParams) -> Result<Vec<u8>> {
    if !params.is_acceptable() {
        return Err(Error::policy("argon2 parameters out of range"));
    }

    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let key = derive_key(password, &salt, params)?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_slice()));
    let mut blob = header(&salt, params, &nonce);

    let sealed = cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: &blob,
            },
        )
        // Only reachable for payloads beyond the AEAD's 256 GiB limit.
        .map_err(|_| Error::policy("payload too large to encrypt"))?;

    blob.extend_from_slice(&sealed);
    Ok(blob)
}

/// Decrypt a blob produced by [`encrypt`].
///
/// Every failure (wrong password, modified bytes, truncation, foreign data)
/// is reported as [`Error::Authentication`].
pub fn decrypt(password: &str, blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < HEADER_LEN + TAG_LEN {
        return Err(Error::Authentication);
    }
    let (head, sealed) = blob.split_at(HEADER_LEN);
    if head[..MAGIC.len()] != MAGIC || head[MAGIC.len()] != VERSION {
        return Err(Error::Authentication);
    }

    let mut offset = MAGIC.len() + 1;
    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&head[offset..offset + SALT_LEN]);
    offset += SALT_LEN;
    let params = KdfParams::decode(&head[offset..offset + PARAMS_LEN]);
    offset += PARAMS_LEN;
    let nonce = XNonce::from_slice(&head[offset..offset + NONCE_LEN]);

    if !params.is_acceptable() {
        return Err(Error::Authentication);
    }

    let key = derive_key(password, &salt, params)?;
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.as_slice()));
    cipher
        .decrypt(
            nonce,
            Payload {
                msg: sealed,
                aad: head,
            },
        )
        .map_err(|_| Error::Authentication)
}

/// Cheap parameters for tests; far too weak for real use.
#[cfg(test)]
pub(crate) const TEST_PARAMS: KdfParams = KdfParams {
    m_cost_kib: 64,
    t_cost: 1,
    p_cost: 1,
};

// ─── Tests ────────────────────────────────────────────────────────────────────
