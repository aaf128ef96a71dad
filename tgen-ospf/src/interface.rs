//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use chrono::{DateTime, Utc};
use ism::{Event, State};
use serde::{Deserialize, Serialize};
use tgen_utils::timer::{TimerId, TimerQueue};
use tracing::debug_span;

use crate::collections::{Arena, InterfaceIndex, Neighbors};
use crate::config::InterfaceCfg;
use crate::debug::{Debug, InterfaceInactiveReason};
use crate::error::Error;
use crate::instance::{InstanceUpView, PendingEvent};
use crate::lsdb::{LsaEntry, LsaOriginateEvent};
use crate::neighbor::{Neighbor, NeighborNetId, nsm};
use crate::output;
use crate::packet::auth::{AuthMethod, MD5_DIGEST_LEN};
use crate::state::PacketStats;
use crate::tasks::{self, TimerKind};
use crate::version::Version;

#[derive(Debug)]
pub struct Interface {
    pub idx: InterfaceIndex,
    pub name: String,
    pub config: InterfaceCfg,
    pub state: InterfaceState,
}

#[derive(Debug)]
pub struct InterfaceState {
    // ISM state.
    pub ism_state: State,
    // The network DR/BDR.
    pub dr: Option<NeighborNetId>,
    pub bdr: Option<NeighborNetId>,
    // List of neighbors attached to this interface.
    pub neighbors: Neighbors,
    // Cryptographic sequence number of the last sent packet.
    pub auth_seqno: u32,
    // Statistics.
    pub statistics: PacketStats,
    pub event_count: u32,
    pub discontinuity_time: DateTime<Utc>,
    // Timers.
    pub tasks: InterfaceTasks,
}

#[derive(Debug, Default)]
pub struct InterfaceTasks {
    // ISM Hello Tx interval.
    pub hello_interval: Option<TimerId>,
    // ISM WaitTimer.
    pub wait_timer: Option<TimerId>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceType {
    PointToPoint,
    Broadcast,
    NonBroadcast,
    PointToMultipoint,
    VirtualLink,
}

#[derive(Clone, Copy, Debug)]
struct DrCandidate {
    router_id: Ipv4Addr,
    net_id: NeighborNetId,
    dr: Option<NeighborNetId>,
    bdr: Option<NeighborNetId>,
    priority: u8,
}

// Interface state machine.
pub mod ism {
    use serde::{Deserialize, Serialize};

    use crate::debug::InterfaceInactiveReason;

    #[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
    #[derive(Deserialize, Serialize)]
    pub enum State {
        #[default]
        Down,
        Loopback,
        Waiting,
        PointToPoint,
        DrOther,
        Backup,
        Dr,
    }

    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    pub enum Event {
        InterfaceUp,
        WaitTimer,
        BackupSeen,
        NbrChange,
        LoopInd,
        UnloopInd,
        InterfaceDown(InterfaceInactiveReason),
    }
}

// ===== impl Interface =====

impl Interface {
    pub(crate) fn new(idx: InterfaceIndex, config: InterfaceCfg) -> Interface {
        Interface {
            idx,
            name: config.name.clone(),
            config,
            state: InterfaceState {
                ism_state: State::Down,
                dr: None,
                bdr: None,
                neighbors: Default::default(),
                auth_seqno: 0,
                statistics: Default::default(),
                event_count: 0,
                discontinuity_time: Utc::now(),
                tasks: Default::default(),
            },
        }
    }

    fn start(
        &mut self,
        instance: &mut InstanceUpView<'_>,
        neighbors: &Arena<Neighbor>,
    ) -> State {
        Debug::InterfaceStart(&self.name).log();

        if self.config.loopback {
            return State::Loopback;
        }

        // Get new ISM state.
        let new_ism_state = match self.config.if_type {
            InterfaceType::PointToPoint
            | InterfaceType::PointToMultipoint
            | InterfaceType::VirtualLink => State::PointToPoint,
            InterfaceType::Broadcast | InterfaceType::NonBroadcast => {
                if instance.config.priority == 0 {
                    State::DrOther
                } else {
                    State::Waiting
                }
            }
        };

        if new_ism_state == State::Waiting {
            // Start wait timer.
            let timer = tasks::ism_wait_timer(
                &mut instance.state.timers,
                instance.state.now,
                self.idx,
                instance.config.dead_interval,
            );
            self.state.tasks.wait_timer = Some(timer);
        }

        // Start Hello Tx interval.
        self.hello_interval_start(instance, neighbors);

        new_ism_state
    }

    // Stop interface if it's active.
    fn stop(
        &mut self,
        instance: &mut InstanceUpView<'_>,
        neighbors: &mut Arena<Neighbor>,
        lsa_entries: &mut Arena<LsaEntry>,
        reason: InterfaceInactiveReason,
    ) {
        if self.is_down() {
            return;
        }

        Debug::InterfaceStop(&self.name, reason).log();

        // Kill all neighbors.
        let event = match reason {
            InterfaceInactiveReason::OperationalDown => nsm::Event::LinkDown,
            _ => nsm::Event::Kill,
        };
        for nbr_idx in self.state.neighbors.indexes().collect::<Vec<_>>() {
            let nbr = &mut neighbors[nbr_idx];
            nbr.fsm(self, instance, lsa_entries, event);
            nbr.timers_cancel(&mut instance.state.timers);
            self.state.neighbors.delete(neighbors, nbr_idx);
        }

        // Reset interface state.
        self.state.dr = None;
        self.state.bdr = None;
        self.state.neighbors = Default::default();
        self.timers_cancel(&mut instance.state.timers);
    }

    pub(crate) fn is_down(&self) -> bool {
        self.state.ism_state == State::Down
    }

    pub(crate) fn is_dr_or_backup(&self) -> bool {
        matches!(self.state.ism_state, State::Dr | State::Backup)
    }

    pub(crate) fn is_broadcast_or_nbma(&self) -> bool {
        matches!(
            self.config.if_type,
            InterfaceType::Broadcast | InterfaceType::NonBroadcast
        )
    }

    // Returns the identifier of this router on the attached network.
    pub(crate) fn network_id(
        &self,
        version: Version,
        router_id: Ipv4Addr,
    ) -> NeighborNetId {
        match version {
            Version::Ospfv2 => self
                .config
                .address
                .map(|addr| addr.ip())
                .unwrap_or(Ipv4Addr::UNSPECIFIED)
                .into(),
            Version::Ospfv3 => router_id.into(),
        }
    }

    // Returns the source address used when sending packets.
    pub(crate) fn src_addr(&self, version: Version) -> IpAddr {
        match version {
            Version::Ospfv2 => self
                .config
                .address
                .map(|addr| addr.ip())
                .unwrap_or(Ipv4Addr::UNSPECIFIED)
                .into(),
            Version::Ospfv3 => {
                self.config.link_local.unwrap_or(Ipv6Addr::UNSPECIFIED).into()
            }
        }
    }

    // Returns the maximum size of the OSPF packets sent on this interface,
    // excluding the IP header and the authentication trailer.
    pub(crate) fn max_packet_size(
        &self,
        instance: &InstanceUpView<'_>,
    ) -> usize {
        let ip_hdr_len = match instance.config.version {
            Version::Ospfv2 => 20,
            Version::Ospfv3 => 40,
        };
        let auth_len = match &instance.config.auth {
            Some(AuthMethod::Md5 { .. }) => MD5_DIGEST_LEN,
            _ => 0,
        };
        (self.config.mtu as usize).saturating_sub(ip_hdr_len + auth_len)
    }

    // Returns the next cryptographic sequence number.
    pub(crate) fn auth_seqno_next(&mut self) -> u32 {
        self.state.auth_seqno = self.state.auth_seqno.wrapping_add(1);
        self.state.auth_seqno
    }

    pub(crate) fn fsm(
        &mut self,
        instance: &mut InstanceUpView<'_>,
        neighbors: &mut Arena<Neighbor>,
        lsa_entries: &mut Arena<LsaEntry>,
        event: Event,
    ) {
        let span = debug_span!("interface", name = %self.name);
        let _span_guard = span.enter();

        Debug::IsmEvent(&self.state.ism_state, &event).log();

        let new_ism_state = match (self.state.ism_state, event) {
            (State::Down, Event::InterfaceUp) => {
                // Start interface.
                self.start(instance, neighbors)
            }
            (State::Waiting, Event::NbrChange) => {
                // This is an unspecified event but it can happen during normal
                // operation, so ignore it gracefully instead of logging an
                // error.
                return;
            }
            (State::Waiting, Event::BackupSeen | Event::WaitTimer) => {
                if let Some(timer) = self.state.tasks.wait_timer.take() {
                    instance.state.timers.cancel(timer);
                }

                // Run DR election.
                self.dr_election(instance, neighbors)
            }
            (State::DrOther | State::Backup | State::Dr, Event::NbrChange) => {
                // Run DR election.
                self.dr_election(instance, neighbors)
            }
            (_, Event::InterfaceDown(reason)) => {
                // Stop interface.
                self.stop(instance, neighbors, lsa_entries, reason);
                State::Down
            }
            (_, Event::LoopInd) => {
                // Stop interface.
                self.stop(
                    instance,
                    neighbors,
                    lsa_entries,
                    InterfaceInactiveReason::LoopedBack,
                );
                State::Loopback
            }
            (State::Loopback, Event::UnloopInd) => {
                // No actions are necessary.
                State::Down
            }
            _ => {
                Error::IsmUnexpectedEvent(self.state.ism_state, event).log();
                return;
            }
        };

        // Check for FSM state change.
        if new_ism_state != self.state.ism_state {
            self.fsm_state_change(instance, new_ism_state);
        }
    }

    fn fsm_state_change(
        &mut self,
        instance: &mut InstanceUpView<'_>,
        new_ism_state: State,
    ) {
        // (Re)originate LSAs that might have been affected.
        instance.state.pending.push_back(PendingEvent::LsaOrig(
            LsaOriginateEvent::InterfaceStateChange(self.idx),
        ));
        if self.state.ism_state == State::Dr {
            instance.state.pending.push_back(PendingEvent::LsaOrig(
                LsaOriginateEvent::InterfaceDrChange(self.idx),
            ));
        }

        // Effectively transition to the new FSM state.
        Debug::IsmTransition(&self.state.ism_state, &new_ism_state).log();
        self.state.ism_state = new_ism_state;

        // Update statistics.
        self.state.event_count += 1;
        self.state.discontinuity_time = Utc::now();
    }

    // Sends a Hello packet and (re)starts the Hello Tx interval.
    pub(crate) fn hello_interval_start(
        &mut self,
        instance: &mut InstanceUpView<'_>,
        neighbors: &Arena<Neighbor>,
    ) {
        output::send_hello(self, instance, neighbors);

        if let Some(timer) = self.state.tasks.hello_interval.take() {
            instance.state.timers.cancel(timer);
        }
        let timer = tasks::hello_interval(
            &mut instance.state.timers,
            instance.state.now,
            self.idx,
            instance.config.hello_interval,
        );
        self.state.tasks.hello_interval = Some(timer);
    }

    // Cancels all interface timers.
    pub(crate) fn timers_cancel(&mut self, timers: &mut TimerQueue<TimerKind>) {
        let tasks = std::mem::take(&mut self.state.tasks);
        for timer in [tasks.hello_interval, tasks.wait_timer]
            .into_iter()
            .flatten()
        {
            timers.cancel(timer);
        }
    }

    fn dr_election(
        &mut self,
        instance: &mut InstanceUpView<'_>,
        neighbors: &Arena<Neighbor>,
    ) -> State {
        let router_id = instance.state.router_id;
        let priority = instance.config.priority;
        let net_id = self.network_id(instance.config.version, router_id);

        // Step 1: note the current values for the network's Designated Router
        // and Backup Designated Router.
        let old_dr = self.state.dr;
        let old_bdr = self.state.bdr;

        // Step 2: calculate the new Backup Designated Router.
        let calc_bdr = |iface: &Interface| {
            iface
                .dr_eligible_routers(router_id, net_id, priority, neighbors)
                .filter(|rtr| rtr.dr != Some(rtr.net_id))
                .filter(|rtr| rtr.bdr == Some(rtr.net_id))
                .max_by_key(|rtr| (rtr.priority, rtr.router_id))
                .or_else(|| {
                    iface
                        .dr_eligible_routers(
                            router_id, net_id, priority, neighbors,
                        )
                        .filter(|rtr| rtr.dr != Some(rtr.net_id))
                        .max_by_key(|rtr| (rtr.priority, rtr.router_id))
                })
                .map(|rtr| rtr.net_id)
        };
        let mut new_bdr = calc_bdr(self);

        // Step 3: calculate the new Designated Router.
        let calc_dr = |iface: &Interface, new_bdr: Option<NeighborNetId>| {
            iface
                .dr_eligible_routers(router_id, net_id, priority, neighbors)
                .filter(|rtr| rtr.dr == Some(rtr.net_id))
                .max_by_key(|rtr| (rtr.priority, rtr.router_id))
                .map(|rtr| rtr.net_id)
                .or(new_bdr)
        };
        let mut new_dr = calc_dr(self, new_bdr);
        self.state.dr = new_dr;
        self.state.bdr = new_bdr;

        // Step 4: check if the router is the new DR/BDR or no longer the
        // DR/BDR.
        if (new_dr == Some(net_id) || old_dr == Some(net_id))
            && new_dr != old_dr
            || (new_bdr == Some(net_id) || old_bdr == Some(net_id))
                && new_bdr != old_bdr
        {
            // Repeat steps 2 and 3.
            new_bdr = calc_bdr(self);
            new_dr = calc_dr(self, new_bdr);
            self.state.dr = new_dr;
            self.state.bdr = new_bdr;
        }

        // Step 5: set the interface state accordingly.
        Debug::IsmDrElection(
            old_dr.map(|dr| dr.get()),
            new_dr.map(|dr| dr.get()),
            old_bdr.map(|bdr| bdr.get()),
            new_bdr.map(|bdr| bdr.get()),
        )
        .log();
        let next_state = if new_dr == Some(net_id) {
            State::Dr
        } else if new_bdr == Some(net_id) {
            State::Backup
        } else {
            State::DrOther
        };

        // Step 7: if the DR or BDR changes, invoke the AdjOk? event on all
        // neighbors whose state is at least 2-Way.
        if new_dr != old_dr || new_bdr != old_bdr {
            for nbr in self
                .state
                .neighbors
                .iter(neighbors)
                .filter(|nbr| nbr.state >= nsm::State::TwoWay)
            {
                instance.state.pending.push_back(PendingEvent::Nsm(
                    self.idx,
                    nbr.idx,
                    nsm::Event::AdjOk,
                ));
            }

            // Advertise the updated DR and/or BDR right away.
            self.hello_interval_start(instance, neighbors);
        }

        // If the DR changed, reoriginate LSAs that might have been affected.
        if new_dr != old_dr {
            instance.state.pending.push_back(PendingEvent::LsaOrig(
                LsaOriginateEvent::InterfaceDrChange(self.idx),
            ));
        }

        next_state
    }

    fn dr_eligible_routers<'a>(
        &'a self,
        router_id: Ipv4Addr,
        net_id: NeighborNetId,
        priority: u8,
        neighbors: &'a Arena<Neighbor>,
    ) -> impl Iterator<Item = DrCandidate> + 'a {
        let myself = (priority != 0).then_some(DrCandidate {
            router_id,
            net_id,
            dr: self.state.dr,
            bdr: self.state.bdr,
            priority,
        });

        let nbrs = self
            .state
            .neighbors
            .iter(neighbors)
            .filter(|nbr| nbr.state >= nsm::State::TwoWay)
            .filter(|nbr| nbr.priority != 0)
            .map(|nbr| DrCandidate {
                router_id: nbr.router_id,
                net_id: nbr.net_id,
                dr: nbr.dr,
                bdr: nbr.bdr,
                priority: nbr.priority,
            });

        myself.into_iter().chain(nbrs)
    }

    pub(crate) fn need_adjacency(&self, nbr: &Neighbor) -> bool {
        match self.config.if_type {
            InterfaceType::PointToPoint
            | InterfaceType::PointToMultipoint
            | InterfaceType::VirtualLink => true,
            InterfaceType::Broadcast | InterfaceType::NonBroadcast => {
                self.is_dr_or_backup()
                    || self.state.dr == Some(nbr.net_id)
                    || self.state.bdr == Some(nbr.net_id)
            }
        }
    }
}

impl std::fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterfaceType::PointToPoint => write!(f, "point-to-point"),
            InterfaceType::Broadcast => write!(f, "broadcast"),
            InterfaceType::NonBroadcast => write!(f, "non-broadcast"),
            InterfaceType::PointToMultipoint => {
                write!(f, "point-to-multipoint")
            }
            InterfaceType::VirtualLink => write!(f, "virtual-link"),
        }
    }
}
