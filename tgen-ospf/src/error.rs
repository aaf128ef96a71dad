//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{IpAddr, Ipv4Addr};

use tracing::{error, warn, warn_span};

use crate::interface::ism;
use crate::neighbor::nsm;
use crate::packet::PacketType;
use crate::packet::error::{DecodeError, LsaValidationError};
use crate::packet::lsa::LsaKey;

// OSPF errors.
#[derive(Debug)]
pub enum Error {
    // Instance management
    Config(ConfigError),
    InstanceInactive,
    // Packet input
    InterfaceNotFound(String),
    PacketDecodeError(DecodeError),
    UnknownNeighbor(IpAddr, Ipv4Addr),
    PacketAuthInvalidSeqno(IpAddr, u32),
    InterfaceCfgError(String, IpAddr, PacketType, InterfaceCfgError),
    DbDescReject(Ipv4Addr, nsm::State),
    InvalidLsa(LsaKey, LsaValidationError),
    // Resource exhaustion
    LsdbFull(LsaKey),
    QueueFull(Ipv4Addr, LsaKey),
    PacketTooBig(String, usize),
    // Other
    IsmUnexpectedEvent(ism::State, ism::Event),
    NsmUnexpectedEvent(Ipv4Addr, nsm::State, nsm::Event),
}

// OSPF interface configuration errors.
#[derive(Debug)]
pub enum InterfaceCfgError {
    AreaIdMismatch(Ipv4Addr, Ipv4Addr),
    HelloMaskMismatch(Ipv4Addr, Ipv4Addr),
    HelloIntervalMismatch(u16, u16),
    DeadIntervalMismatch(u32, u32),
    ExternalRoutingCapabilityMismatch(bool),
    MtuMismatch(u16),
    DuplicateRouterId(Ipv4Addr),
}

// OSPF configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    InvalidRouterId(Ipv4Addr),
    InvalidHelloInterval(u16),
    InvalidDeadInterval(u32),
    InvalidRetransmitInterval,
    InvalidGcInterval,
    AuthNotSupported,
    InvalidAuthKey,
    DuplicateInterface(String),
    MissingAddress(String),
    InvalidMtu(String, u16),
}

// ===== impl Error =====

impl Error {
    pub(crate) fn log(&self) {
        match self {
            Error::Config(error) => {
                error.log();
            }
            Error::InstanceInactive => {
                warn!("{}", self);
            }
            Error::InterfaceNotFound(name) => {
                warn!(%name, "{}", self);
            }
            Error::PacketDecodeError(error) => {
                warn!(error = %with_source(error), "{}", self);
            }
            Error::UnknownNeighbor(source, router_id) => {
                warn!(%source, %router_id, "{}", self);
            }
            Error::PacketAuthInvalidSeqno(source, seqno) => {
                warn!(%source, %seqno, "{}", self);
            }
            Error::InterfaceCfgError(iface, source, _, error) => {
                warn_span!("interface", name = %iface, %source).in_scope(|| {
                    error.log();
                })
            }
            Error::DbDescReject(router_id, state) => {
                warn_span!("neighbor", %router_id).in_scope(|| {
                    warn!(?state, "{}", self);
                })
            }
            Error::InvalidLsa(key, error) => {
                warn!(lsa = %key, %error, "{}", self);
            }
            Error::LsdbFull(key) => {
                error!(lsa = %key, "{}", self);
            }
            Error::QueueFull(router_id, key) => {
                warn_span!("neighbor", %router_id).in_scope(|| {
                    error!(lsa = %key, "{}", self);
                })
            }
            Error::PacketTooBig(name, size) => {
                warn_span!("interface", %name).in_scope(|| {
                    warn!(%size, "{}", self);
                })
            }
            Error::IsmUnexpectedEvent(state, event) => warn_span!("fsm")
                .in_scope(|| {
                    warn!(?state, ?event, "{}", self);
                }),
            Error::NsmUnexpectedEvent(router_id, state, event) => {
                warn_span!("neighbor", %router_id).in_scope(|| {
                    warn_span!("fsm").in_scope(|| {
                        warn!(?state, ?event, "{}", self);
                    })
                })
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Config(error) => error.fmt(f),
            Error::InstanceInactive => {
                write!(f, "instance is not active")
            }
            Error::InterfaceNotFound(..) => {
                write!(f, "interface not found")
            }
            Error::PacketDecodeError(..) => {
                write!(f, "failed to decode packet")
            }
            Error::UnknownNeighbor(..) => {
                write!(f, "unknown neighbor")
            }
            Error::PacketAuthInvalidSeqno(..) => {
                write!(f, "authentication failed: decreasing sequence number")
            }
            Error::InterfaceCfgError(_, _, _, error) => error.fmt(f),
            Error::DbDescReject(..) => {
                write!(f, "database description packet rejected")
            }
            Error::InvalidLsa(..) => {
                write!(f, "discarding invalid LSA")
            }
            Error::LsdbFull(..) => {
                write!(f, "LSDB size limit reached, LSA refused")
            }
            Error::QueueFull(..) => {
                write!(f, "neighbor queue size limit reached, LSA refused")
            }
            Error::PacketTooBig(..) => {
                write!(f, "packet exceeds the maximum fragment length")
            }
            Error::IsmUnexpectedEvent(..) => {
                write!(f, "unexpected event")
            }
            Error::NsmUnexpectedEvent(..) => {
                write!(f, "unexpected event")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(error) => Some(error),
            Error::PacketDecodeError(error) => Some(error),
            Error::InterfaceCfgError(_, _, _, error) => Some(error),
            Error::InvalidLsa(_, error) => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(error: ConfigError) -> Error {
        Error::Config(error)
    }
}

impl From<DecodeError> for Error {
    fn from(error: DecodeError) -> Error {
        Error::PacketDecodeError(error)
    }
}

// ===== impl InterfaceCfgError =====

impl InterfaceCfgError {
    pub(crate) fn log(&self) {
        match self {
            InterfaceCfgError::AreaIdMismatch(received, expected) => {
                warn!(%received, %expected, "{}", self);
            }
            InterfaceCfgError::HelloMaskMismatch(received, expected) => {
                warn!(%received, %expected, "{}", self);
            }
            InterfaceCfgError::HelloIntervalMismatch(received, expected) => {
                warn!(%received, %expected, "{}", self);
            }
            InterfaceCfgError::DeadIntervalMismatch(received, expected) => {
                warn!(%received, %expected, "{}", self);
            }
            InterfaceCfgError::ExternalRoutingCapabilityMismatch(e_bit) => {
                warn!(%e_bit, "{}", self);
            }
            InterfaceCfgError::MtuMismatch(mtu) => {
                warn!(%mtu, "{}", self);
            }
            InterfaceCfgError::DuplicateRouterId(router_id) => {
                warn!(%router_id, "{}", self);
            }
        }
    }
}

impl std::fmt::Display for InterfaceCfgError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterfaceCfgError::AreaIdMismatch(..) => {
                write!(f, "area ID mismatch")
            }
            InterfaceCfgError::HelloMaskMismatch(..) => {
                write!(f, "network mask mismatch")
            }
            InterfaceCfgError::HelloIntervalMismatch(..) => {
                write!(f, "hello interval mismatch")
            }
            InterfaceCfgError::DeadIntervalMismatch(..) => {
                write!(f, "dead interval mismatch")
            }
            InterfaceCfgError::ExternalRoutingCapabilityMismatch(..) => {
                write!(f, "external routing capability mismatch")
            }
            InterfaceCfgError::MtuMismatch(..) => {
                write!(f, "MTU mismatch")
            }
            InterfaceCfgError::DuplicateRouterId(..) => {
                write!(f, "duplicate Router ID")
            }
        }
    }
}

impl std::error::Error for InterfaceCfgError {}

// ===== impl ConfigError =====

impl ConfigError {
    pub(crate) fn log(&self) {
        match self {
            ConfigError::Parse(error) => {
                error!(%error, "{}", self);
            }
            ConfigError::InvalidRouterId(router_id) => {
                error!(%router_id, "{}", self);
            }
            ConfigError::InvalidHelloInterval(interval) => {
                error!(%interval, "{}", self);
            }
            ConfigError::InvalidDeadInterval(interval) => {
                error!(%interval, "{}", self);
            }
            ConfigError::DuplicateInterface(name)
            | ConfigError::MissingAddress(name) => {
                error!(%name, "{}", self);
            }
            ConfigError::InvalidMtu(name, mtu) => {
                error!(%name, %mtu, "{}", self);
            }
            ConfigError::InvalidRetransmitInterval
            | ConfigError::InvalidGcInterval
            | ConfigError::AuthNotSupported
            | ConfigError::InvalidAuthKey => {
                error!("{}", self);
            }
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(..) => {
                write!(f, "failed to parse configuration")
            }
            ConfigError::InvalidRouterId(..) => {
                write!(f, "invalid Router ID")
            }
            ConfigError::InvalidHelloInterval(..) => {
                write!(f, "invalid hello interval")
            }
            ConfigError::InvalidDeadInterval(..) => {
                write!(f, "dead interval must be greater than hello interval")
            }
            ConfigError::InvalidRetransmitInterval => {
                write!(f, "invalid retransmit interval")
            }
            ConfigError::InvalidGcInterval => {
                write!(f, "invalid LSA garbage collection interval")
            }
            ConfigError::AuthNotSupported => {
                write!(f, "authentication not supported by OSPFv3")
            }
            ConfigError::InvalidAuthKey => {
                write!(f, "invalid authentication key")
            }
            ConfigError::DuplicateInterface(..) => {
                write!(f, "duplicate interface")
            }
            ConfigError::MissingAddress(..) => {
                write!(f, "interface address not configured")
            }
            ConfigError::InvalidMtu(..) => {
                write!(f, "invalid interface MTU")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Parse(error) => Some(error),
            _ => None,
        }
    }
}

// ===== global functions =====

fn with_source<E: std::error::Error>(error: E) -> String {
    if let Some(source) = error.source() {
        format!("{} ({})", error, with_source(source))
    } else {
        error.to_string()
    }
}
