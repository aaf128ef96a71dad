//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeSet;
use std::net::{Ipv4Addr, Ipv6Addr};

use ipnetwork::Ipv4Network;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::interface::InterfaceType;
use crate::packet::DbDesc;
use crate::packet::lsa::LsaHdr;
use crate::packet::auth::{AUTH_DATA_LEN, AuthMethod, MD5_DIGEST_LEN};
use crate::version::Version;

// Default values.
pub const DFLT_HELLO_INTERVAL: u16 = 10;
pub const DFLT_DEAD_INTERVAL: u32 = 40;
pub const DFLT_PRIORITY: u8 = 64;
pub const DFLT_METRIC: u16 = 10;
pub const DFLT_MTU: u16 = 1500;
pub const DFLT_MAX_FRAGMENT_LEN: u16 = u16::MAX;
pub const DFLT_RETRANSMIT_INTERVAL: u16 = 5;
pub const DFLT_TRANSMIT_DELAY: u16 = 1;
pub const DFLT_TEARDOWN_TIME: u16 = 5;
pub const DFLT_LSA_GC_INTERVAL: u16 = 30;
pub const DFLT_MAX_LSDB_ENTRIES: usize = 100_000;
pub const DFLT_MAX_QUEUE_ENTRIES: usize = 10_000;

// OSPF instance configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstanceCfg {
    pub id: u16,
    pub version: Version,
    pub router_id: Ipv4Addr,
    pub area: Ipv4Addr,
    pub priority: u8,
    pub overload: bool,
    pub auth: Option<AuthMethod>,
    pub hello_interval: u16,
    pub dead_interval: u32,
    pub retransmit_interval: u16,
    pub transmit_delay: u16,
    pub teardown_time: u16,
    pub lsa_gc_interval: u16,
    pub max_lsdb_entries: usize,
    pub max_queue_entries: usize,
    pub external_connections: Vec<ExternalConnectionCfg>,
    pub interfaces: Vec<InterfaceCfg>,
}

// Point-to-point link to an emulated router located behind this instance.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalConnectionCfg {
    pub router_id: Ipv4Addr,
    #[serde(default = "default_metric")]
    pub metric: u16,
}

// OSPF interface configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterfaceCfg {
    pub name: String,
    pub if_type: InterfaceType,
    // OSPFv2 interface address.
    pub address: Option<Ipv4Network>,
    // OSPFv3 link-local address.
    pub link_local: Option<Ipv6Addr>,
    // OSPFv3 Interface ID.
    pub ifindex: u32,
    // OSPFv3 Instance ID.
    pub instance_id: u8,
    pub metric: u16,
    // Maximum packet size without fragmentation.
    pub mtu: u16,
    // Maximum packet size when a single LSA doesn't fit in the MTU.
    pub max_fragment_len: u16,
    pub loopback: bool,
}

// ===== impl InstanceCfg =====

impl InstanceCfg {
    // Parses and validates a JSON-encoded configuration.
    pub fn from_json(data: &str) -> Result<InstanceCfg, ConfigError> {
        let config: InstanceCfg =
            serde_json::from_str(data).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    // Checks the configuration for invalid parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.router_id.is_unspecified() {
            return Err(ConfigError::InvalidRouterId(self.router_id));
        }
        if self.hello_interval == 0 {
            return Err(ConfigError::InvalidHelloInterval(self.hello_interval));
        }
        if self.dead_interval <= self.hello_interval as u32
            || (self.version == Version::Ospfv3
                && self.dead_interval > u16::MAX as u32)
        {
            return Err(ConfigError::InvalidDeadInterval(self.dead_interval));
        }
        if self.retransmit_interval == 0 {
            return Err(ConfigError::InvalidRetransmitInterval);
        }
        if self.lsa_gc_interval == 0 {
            return Err(ConfigError::InvalidGcInterval);
        }

        // Authentication is only defined in the OSPFv2 packet header.
        match (&self.auth, self.version) {
            (None, _) => (),
            (Some(_), Version::Ospfv3) => {
                return Err(ConfigError::AuthNotSupported);
            }
            (Some(AuthMethod::Cleartext { key }), Version::Ospfv2) => {
                if key.len() > AUTH_DATA_LEN {
                    return Err(ConfigError::InvalidAuthKey);
                }
            }
            (Some(AuthMethod::Md5 { key, .. }), Version::Ospfv2) => {
                if key.is_empty() || key.len() > MD5_DIGEST_LEN {
                    return Err(ConfigError::InvalidAuthKey);
                }
            }
        }

        let mut names = BTreeSet::new();
        for iface in &self.interfaces {
            if !names.insert(iface.name.as_str()) {
                return Err(ConfigError::DuplicateInterface(iface.name.clone()));
            }
            iface.validate(self.version)?;
        }

        Ok(())
    }
}

impl Default for InstanceCfg {
    fn default() -> InstanceCfg {
        InstanceCfg {
            id: 1,
            version: Version::Ospfv2,
            router_id: Ipv4Addr::UNSPECIFIED,
            area: Ipv4Addr::UNSPECIFIED,
            priority: DFLT_PRIORITY,
            overload: false,
            auth: None,
            hello_interval: DFLT_HELLO_INTERVAL,
            dead_interval: DFLT_DEAD_INTERVAL,
            retransmit_interval: DFLT_RETRANSMIT_INTERVAL,
            transmit_delay: DFLT_TRANSMIT_DELAY,
            teardown_time: DFLT_TEARDOWN_TIME,
            lsa_gc_interval: DFLT_LSA_GC_INTERVAL,
            max_lsdb_entries: DFLT_MAX_LSDB_ENTRIES,
            max_queue_entries: DFLT_MAX_QUEUE_ENTRIES,
            external_connections: vec![],
            interfaces: vec![],
        }
    }
}

// ===== impl InterfaceCfg =====

impl InterfaceCfg {
    fn validate(&self, version: Version) -> Result<(), ConfigError> {
        match version {
            Version::Ospfv2 if self.address.is_none() => {
                return Err(ConfigError::MissingAddress(self.name.clone()));
            }
            Version::Ospfv3 if self.link_local.is_none() => {
                return Err(ConfigError::MissingAddress(self.name.clone()));
            }
            _ => (),
        }

        // The MTU must at least fit a Database Description packet carrying
        // one LSA header, plus the IP header and the authentication trailer.
        let ip_hdr_len = match version {
            Version::Ospfv2 => 20,
            Version::Ospfv3 => 40,
        };
        let min_mtu = (ip_hdr_len
            + DbDesc::base_length(version)
            + LsaHdr::LENGTH as usize
            + MD5_DIGEST_LEN) as u16;
        if self.mtu < min_mtu || self.max_fragment_len < self.mtu {
            return Err(ConfigError::InvalidMtu(self.name.clone(), self.mtu));
        }

        Ok(())
    }
}

impl Default for InterfaceCfg {
    fn default() -> InterfaceCfg {
        InterfaceCfg {
            name: String::new(),
            if_type: InterfaceType::PointToPoint,
            address: None,
            link_local: None,
            ifindex: 0,
            instance_id: 0,
            metric: DFLT_METRIC,
            mtu: DFLT_MTU,
            max_fragment_len: DFLT_MAX_FRAGMENT_LEN,
            loopback: false,
        }
    }
}

// ===== helper functions =====

fn default_metric() -> u16 {
    DFLT_METRIC
}

// ===== unit tests =====
