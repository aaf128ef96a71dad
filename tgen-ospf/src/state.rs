//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{IpAddr, Ipv4Addr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::collections::{Arena, Interfaces};
use crate::instance::{InstanceArenas, InstanceState as InstanceUpState};
use crate::interface::{Interface, InterfaceType, ism};
use crate::lsdb::{LsaEntry, LsaEntryFlags, LsaSource};
use crate::neighbor::{Neighbor, nsm};
use crate::packet::PacketType;
use crate::packet::lsa::LsaHdr;
use crate::version::Version;

// Packet counters of an interface or neighbor.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct PacketStats {
    pub rx: PacketCounters,
    pub tx: PacketCounters,
    // Received packets that failed validation.
    pub discarded: u64,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct PacketCounters {
    pub hello: u64,
    pub dbdesc: u64,
    pub lsreq: u64,
    pub lsupd: u64,
    pub lsack: u64,
}

// Operational state of an OSPF instance.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InstanceState {
    pub name: String,
    pub version: Version,
    pub router_id: Ipv4Addr,
    pub active: bool,
    pub overload: bool,
    pub teardown: bool,
    pub orig_lsa_count: u32,
    pub rx_lsa_count: u32,
    pub discontinuity_time: Option<DateTime<Utc>>,
    pub interfaces: Vec<InterfaceState>,
    pub lsdb: Vec<LsaState>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct InterfaceState {
    pub name: String,
    pub if_type: InterfaceType,
    pub state: ism::State,
    pub dr: Option<Ipv4Addr>,
    pub bdr: Option<Ipv4Addr>,
    pub event_count: u32,
    pub discontinuity_time: DateTime<Utc>,
    pub statistics: PacketStats,
    pub neighbors: Vec<NeighborState>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NeighborState {
    pub router_id: Ipv4Addr,
    pub address: IpAddr,
    pub state: nsm::State,
    pub priority: u8,
    pub dr: Option<Ipv4Addr>,
    pub bdr: Option<Ipv4Addr>,
    pub event_count: u32,
    pub discontinuity_time: DateTime<Utc>,
    pub flood_queue_len: usize,
    pub request_queue_len: usize,
    pub ack_queue_len: usize,
    pub statistics: PacketStats,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LsaState {
    pub hdr: LsaHdr,
    pub source: LsaSource,
    pub refcount: usize,
    pub flags: LsaEntryFlags,
}

// ===== impl PacketCounters =====

impl PacketCounters {
    pub(crate) fn incr(&mut self, pkt_type: PacketType) {
        let counter = match pkt_type {
            PacketType::Hello => &mut self.hello,
            PacketType::DbDesc => &mut self.dbdesc,
            PacketType::LsRequest => &mut self.lsreq,
            PacketType::LsUpdate => &mut self.lsupd,
            PacketType::LsAck => &mut self.lsack,
        };
        *counter += 1;
    }

    pub fn total(&self) -> u64 {
        self.hello + self.dbdesc + self.lsreq + self.lsupd + self.lsack
    }
}

// ===== impl InstanceState =====

impl InstanceState {
    pub(crate) fn new(
        name: &str,
        version: Version,
        router_id: Ipv4Addr,
        state: Option<&InstanceUpState>,
        interfaces: &Interfaces,
        arenas: &InstanceArenas,
        now: Instant,
    ) -> InstanceState {
        let lsdb = match state {
            Some(state) => state
                .lsdb
                .iter(&arenas.lsa_entries)
                .map(|(_, lse)| LsaState::new(lse, now))
                .collect(),
            None => vec![],
        };

        InstanceState {
            name: name.to_owned(),
            version,
            router_id: state.map(|state| state.router_id).unwrap_or(router_id),
            active: state.is_some(),
            overload: state.is_some_and(|state| state.overload),
            teardown: state.is_some_and(|state| state.teardown),
            orig_lsa_count: state
                .map(|state| state.orig_lsa_count)
                .unwrap_or(0),
            rx_lsa_count: state.map(|state| state.rx_lsa_count).unwrap_or(0),
            discontinuity_time: state.map(|state| state.discontinuity_time),
            interfaces: interfaces
                .iter(&arenas.interfaces)
                .map(|iface| InterfaceState::new(iface, &arenas.neighbors))
                .collect(),
            lsdb,
        }
    }
}

// ===== impl InterfaceState =====

impl InterfaceState {
    fn new(iface: &Interface, neighbors: &Arena<Neighbor>) -> InterfaceState {
        InterfaceState {
            name: iface.name.clone(),
            if_type: iface.config.if_type,
            state: iface.state.ism_state,
            dr: iface.state.dr.map(|dr| dr.get()),
            bdr: iface.state.bdr.map(|bdr| bdr.get()),
            event_count: iface.state.event_count,
            discontinuity_time: iface.state.discontinuity_time,
            statistics: iface.state.statistics,
            neighbors: iface
                .state
                .neighbors
                .iter(neighbors)
                .map(NeighborState::new)
                .collect(),
        }
    }
}

// ===== impl NeighborState =====

impl NeighborState {
    fn new(nbr: &Neighbor) -> NeighborState {
        NeighborState {
            router_id: nbr.router_id,
            address: nbr.src,
            state: nbr.state,
            priority: nbr.priority,
            dr: nbr.dr.map(|dr| dr.get()),
            bdr: nbr.bdr.map(|bdr| bdr.get()),
            event_count: nbr.event_count,
            discontinuity_time: nbr.discontinuity_time,
            flood_queue_len: nbr.flood.len(),
            request_queue_len: nbr.request.len() + nbr.request_pending.len(),
            ack_queue_len: nbr.ack.len(),
            statistics: nbr.statistics,
        }
    }
}

// ===== impl LsaState =====

impl LsaState {
    fn new(lse: &LsaEntry, now: Instant) -> LsaState {
        LsaState {
            hdr: lse.data.hdr_at(now),
            source: lse.source,
            refcount: lse.refcount,
            flags: lse.flags,
        }
    }
}
