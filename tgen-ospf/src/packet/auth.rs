//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use derive_new::new;
use md5::{Digest, Md5};
use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};

// Length of the OSPFv2 authentication data field.
pub const AUTH_DATA_LEN: usize = 8;
// Length of the keyed MD5 message digest.
pub const MD5_DIGEST_LEN: usize = 16;

// OSPFv2 authentication type.
#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum AuthType {
    Null = 0,
    Simple = 1,
    Cryptographic = 2,
}

// Configured authentication method.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum AuthMethod {
    Cleartext { key: String },
    Md5 { key_id: u8, key: String },
}

// Authentication context used when encoding packets.
#[derive(Clone, Copy, Debug, new)]
pub struct AuthEncodeCtx<'a> {
    pub method: &'a AuthMethod,
    // Non-decreasing sequence number (cryptographic authentication only).
    pub seqno: u32,
}

// ===== impl AuthMethod =====

impl AuthMethod {
    pub fn auth_type(&self) -> AuthType {
        match self {
            AuthMethod::Cleartext { .. } => AuthType::Simple,
            AuthMethod::Md5 { .. } => AuthType::Cryptographic,
        }
    }

    // Returns the cleartext password padded to the size of the
    // authentication data field.
    pub fn cleartext_data(key: &str) -> [u8; AUTH_DATA_LEN] {
        let mut data = [0; AUTH_DATA_LEN];
        let len = std::cmp::min(key.len(), AUTH_DATA_LEN);
        data[..len].copy_from_slice(&key.as_bytes()[..len]);
        data
    }
}

// ===== global functions =====

// Computes the keyed MD5 digest of an OSPFv2 packet (RFC 2328, Appendix D.4.3).
pub fn md5_digest(data: &[u8], key: &str) -> [u8; MD5_DIGEST_LEN] {
    // The authentication key needs to be 16-bytes long.
    let mut key = key.as_bytes().to_vec();
    key.resize(MD5_DIGEST_LEN, 0);

    let mut ctx = Md5::new();
    ctx.update(data);
    ctx.update(&key);

    let mut digest = [0; MD5_DIGEST_LEN];
    digest.copy_from_slice(&ctx.finalize());
    digest
}
