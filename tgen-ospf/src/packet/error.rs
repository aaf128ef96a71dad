//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use serde::{Deserialize, Serialize};

// Type aliases.
pub type DecodeResult<T> = Result<T, DecodeError>;

// OSPF decode errors.
//
// All decode errors are non-fatal: the offending packet is discarded and
// accounted for in the interface counters.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum DecodeError {
    TooShort(usize),
    InvalidLength(u16),
    BadVersion(u8),
    UnknownPacketType(u8),
    BadChecksum,
    UnsupportedAuthType(u16),
    AuthTypeMismatch,
    AuthFailed,
    TruncatedTrailer,
    InvalidLsaLength,
    InvalidLsaType(u32),
    UnknownRouterLinkType(u8),
}

// OSPF LSA validation errors.
//
// Errors that prevent the LSA from being parsed correctly (e.g. invalid LSA
// length) cause the entire LS Update packet to be dropped. These ones only
// cause the offending LSA to be ignored.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum LsaValidationError {
    InvalidChecksum,
    InvalidLsaAge,
    InvalidLsaSeqNo,
    UnsupportedLsaType(u16),
}

// ===== impl DecodeError =====

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::TooShort(len) => {
                write!(f, "packet too short: {} bytes", len)
            }
            DecodeError::InvalidLength(pkt_len) => {
                write!(f, "invalid packet length: {}", pkt_len)
            }
            DecodeError::BadVersion(version) => {
                write!(f, "invalid packet version: {}", version)
            }
            DecodeError::UnknownPacketType(pkt_type) => {
                write!(f, "unknown packet type: {}", pkt_type)
            }
            DecodeError::BadChecksum => {
                write!(f, "invalid checksum")
            }
            DecodeError::UnsupportedAuthType(au_type) => {
                write!(f, "unsupported authentication type: {}", au_type)
            }
            DecodeError::AuthTypeMismatch => {
                write!(f, "authentication type mismatch")
            }
            DecodeError::AuthFailed => {
                write!(f, "authentication failed")
            }
            DecodeError::TruncatedTrailer => {
                write!(f, "truncated variable-length trailer")
            }
            DecodeError::InvalidLsaLength => {
                write!(f, "invalid LSA length")
            }
            DecodeError::InvalidLsaType(lsa_type) => {
                write!(f, "invalid LS type: {:#010x}", lsa_type)
            }
            DecodeError::UnknownRouterLinkType(link_type) => {
                write!(f, "unknown router link type: {}", link_type)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

// ===== impl LsaValidationError =====

impl std::fmt::Display for LsaValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LsaValidationError::InvalidChecksum => {
                write!(f, "invalid LSA checksum")
            }
            LsaValidationError::InvalidLsaAge => {
                write!(f, "invalid LSA age")
            }
            LsaValidationError::InvalidLsaSeqNo => {
                write!(f, "invalid LSA sequence number")
            }
            LsaValidationError::UnsupportedLsaType(lsa_type) => {
                write!(f, "unsupported LSA type: {:#06x}", lsa_type)
            }
        }
    }
}

impl std::error::Error for LsaValidationError {}
