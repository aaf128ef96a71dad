//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use nsm::{Event, State};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tgen_utils::timer::{TimerId, TimerQueue};
use tokio::time::Instant;

use crate::collections::{Arena, InterfaceIndex, NeighborIndex};
use crate::debug::Debug;
use crate::error::Error;
use crate::instance::{InstanceUpView, PendingEvent};
use crate::interface::{Interface, ism};
use crate::lsdb::{LsaEntry, LsaOriginateEvent};
use crate::packet::lsa::{Lsa, LsaHdr, LsaKey};
use crate::packet::{DbDesc, DbDescFlags, Options};
use crate::state::PacketStats;
use crate::tasks::messages::output::NetTxPacketMsg;
use crate::tasks::{self, TimerKind};
use crate::{flood, output};

#[derive(Debug)]
pub struct Neighbor {
    pub idx: NeighborIndex,
    pub iface_idx: InterfaceIndex,
    pub router_id: Ipv4Addr,
    pub net_id: NeighborNetId,
    pub src: IpAddr,
    // OSPFv3 Interface ID.
    pub iface_id: Option<u32>,
    pub dr: Option<NeighborNetId>,
    pub bdr: Option<NeighborNetId>,
    pub priority: u8,
    pub state: State,

    pub options: Option<Options>,
    pub dd_flags: DbDescFlags,
    pub dd_seq_no: u32,
    pub dbd_lsa_start: DbDescCursor,
    pub dbd_lsa_next: DbDescCursor,
    pub last_rcvd_dbdesc: Option<LastDbDesc>,
    pub last_sent_dbdesc: Option<NetTxPacketMsg>,
    pub auth_seqno: Option<u32>,

    // LSAs being flooded to the neighbor.
    pub flood: BTreeMap<LsaKey, FloodEntry>,
    // LSAs that need to be received from this neighbor.
    pub request: BTreeMap<LsaKey, LsaHdr>,
    // LSAs that were requested but not received yet.
    pub request_pending: BTreeMap<LsaKey, LsaHdr>,
    // LSA headers waiting to be acknowledged.
    pub ack: BTreeMap<LsaKey, LsaHdr>,

    pub statistics: PacketStats,
    pub event_count: u32,
    pub discontinuity_time: DateTime<Utc>,
    pub tasks: NeighborTasks,
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
pub struct NeighborNetId(Ipv4Addr);

// Position of the LSDB summary sent in Database Description packets.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum DbDescCursor {
    #[default]
    Start,
    After(LsaKey),
    End,
}

#[derive(Debug)]
pub struct LastDbDesc {
    pub options: Options,
    pub dd_flags: DbDescFlags,
    pub dd_seq_no: u32,
}

#[derive(Debug)]
pub struct FloodEntry {
    pub lsa: Arc<Lsa>,
    // Whether the LSA was sent and is waiting to be acknowledged.
    pub wait_ack: bool,
    pub tx_count: u32,
    pub tx_time: Option<Instant>,
}

#[derive(Debug, Default)]
pub struct NeighborTasks {
    pub inactivity_timer: Option<TimerId>,
    pub rxmt_dbdesc: Option<TimerId>,
    pub rxmt_lsreq: Option<TimerId>,
    pub rxmt_lsupd: Option<TimerId>,
    pub ls_update_timer: Option<TimerId>,
    pub delayed_ack_timer: Option<TimerId>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum RxmtPacketType {
    DbDesc,
    LsRequest,
    LsUpdate,
}

// Neighbor state machine.
pub mod nsm {
    use serde::{Deserialize, Serialize};

    use crate::debug::SeqNoMismatchReason;

    #[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
    #[derive(Deserialize, Serialize)]
    pub enum State {
        #[default]
        Down,
        Attempt,
        Init,
        TwoWay,
        ExStart,
        Exchange,
        Loading,
        Full,
    }

    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    pub enum Event {
        HelloRcvd,
        Start,
        TwoWayRcvd,
        NegotiationDone,
        ExchangeDone,
        BadLsReq,
        LoadingDone,
        AdjOk,
        SeqNoMismatch(SeqNoMismatchReason),
        OneWayRcvd,
        Kill,
        InactivityTimer,
        LinkDown,
    }
}

// ===== impl Neighbor =====

impl Neighbor {
    pub(crate) fn new(
        idx: NeighborIndex,
        iface_idx: InterfaceIndex,
        router_id: Ipv4Addr,
        net_id: NeighborNetId,
        src: IpAddr,
    ) -> Neighbor {
        Debug::NeighborCreate(router_id).log();

        // Initialize the DD Sequence Number.
        let dd_seq_no = {
            #[cfg(not(feature = "deterministic"))]
            {
                // Random value.
                rand::rng().next_u32()
            }
            #[cfg(feature = "deterministic")]
            {
                // Fixed value for deterministic test results.
                router_id.into()
            }
        };

        Neighbor {
            idx,
            iface_idx,
            router_id,
            net_id,
            src,
            iface_id: None,
            dr: None,
            bdr: None,
            priority: 0,
            state: State::Down,
            options: None,
            dd_flags: DbDescFlags::empty(),
            dd_seq_no,
            dbd_lsa_start: DbDescCursor::Start,
            dbd_lsa_next: DbDescCursor::Start,
            last_rcvd_dbdesc: None,
            last_sent_dbdesc: None,
            auth_seqno: None,
            flood: Default::default(),
            request: Default::default(),
            request_pending: Default::default(),
            ack: Default::default(),
            statistics: Default::default(),
            event_count: 0,
            discontinuity_time: Utc::now(),
            tasks: Default::default(),
        }
    }

    pub(crate) fn fsm(
        &mut self,
        iface: &mut Interface,
        instance: &mut InstanceUpView<'_>,
        lsa_entries: &mut Arena<LsaEntry>,
        event: Event,
    ) {
        Debug::NsmEvent(self.router_id, &self.state, &event).log();

        let new_state = match (self.state, &event) {
            // NSM (state, event) -> (Action, new state)
            (State::Down, Event::Start) => {
                self.inactivity_timer_reset(instance);
                Some(State::Attempt)
            }
            // NSM (state, event) -> (Action, new state)
            (State::Attempt | State::Down, Event::HelloRcvd) => {
                self.inactivity_timer_reset(instance);
                Some(State::Init)
            }
            // NSM (state, event) -> (Action, new state)
            (
                State::Init
                | State::TwoWay
                | State::ExStart
                | State::Exchange
                | State::Loading
                | State::Full,
                Event::HelloRcvd,
            ) => {
                self.inactivity_timer_reset(instance);
                None
            }
            // NSM (state, event) -> (Action, new state)
            (State::Init, Event::TwoWayRcvd)
            | (State::TwoWay, Event::AdjOk) => {
                if iface.need_adjacency(self) {
                    self.exstart(iface, instance, lsa_entries);
                    Some(State::ExStart)
                } else {
                    Some(State::TwoWay)
                }
            }
            // NSM (state, event) -> (Action, new state)
            (State::ExStart, Event::NegotiationDone) => {
                // MaxAge LSAs are sent directly instead of being summarized.
                let maxage = instance
                    .state
                    .lsdb
                    .iter(lsa_entries)
                    .filter(|(_, lse)| lse.data.hdr.is_maxage())
                    .filter(|(_, lse)| flood::lsa_in_scope(lse, iface))
                    .map(|(lse_idx, _)| lse_idx)
                    .collect::<Vec<_>>();
                for lse_idx in maxage {
                    let lse = &mut lsa_entries[lse_idx];
                    if let Err(error) =
                        flood::queue_insert(self, instance, lse, false)
                    {
                        error.log();
                    }
                }

                self.dbd_lsa_start = DbDescCursor::Start;
                self.dbd_lsa_next = DbDescCursor::Start;
                self.dd_flags.remove(DbDescFlags::I);
                Some(State::Exchange)
            }
            // NSM (state, event) -> (Action, new state)
            (State::Exchange, Event::ExchangeDone) => {
                if self.request_pending.is_empty() && self.request.is_empty() {
                    Some(State::Full)
                } else {
                    // Wait for outstanding LS Requests to be responded.
                    Some(State::Loading)
                }
            }
            // NSM (state, event) -> (Action, new state)
            (State::Loading, Event::LoadingDone) => {
                // No action required.
                Some(State::Full)
            }
            // NSM (state, event) -> (Action, new state)
            (
                State::ExStart | State::Exchange | State::Loading | State::Full,
                Event::AdjOk,
            ) => {
                if iface.need_adjacency(self) {
                    None
                } else {
                    self.reset_adjacency(instance, lsa_entries);
                    Some(State::TwoWay)
                }
            }
            // NSM (state, event) -> (Action, new state)
            (
                State::Exchange | State::Loading | State::Full,
                Event::SeqNoMismatch(_) | Event::BadLsReq,
            ) => {
                // The adjacency is restarted from scratch by the next Hello.
                self.reset_adjacency(instance, lsa_entries);
                self.inactivity_timer_stop(&mut instance.state.timers);
                Some(State::Down)
            }
            // NSM (state, event) -> (Action, new state)
            (_, Event::Kill | Event::LinkDown | Event::InactivityTimer) => {
                self.reset_adjacency(instance, lsa_entries);
                self.inactivity_timer_stop(&mut instance.state.timers);
                Some(State::Down)
            }
            // NSM (state, event) -> (Action, new state)
            (
                State::TwoWay
                | State::ExStart
                | State::Exchange
                | State::Loading
                | State::Full,
                Event::OneWayRcvd,
            ) => {
                self.reset_adjacency(instance, lsa_entries);
                Some(State::Init)
            }
            // NSM (state, event) -> (Action, new state)
            (
                State::TwoWay
                | State::ExStart
                | State::Exchange
                | State::Loading
                | State::Full,
                Event::TwoWayRcvd,
            ) => {
                // No action required.
                None
            }
            // NSM (state, event) -> (Action, new state)
            (State::Init, Event::OneWayRcvd) => {
                // No action required.
                None
            }
            // Catch-all wildcard.
            _ => {
                Error::NsmUnexpectedEvent(self.router_id, self.state, event)
                    .log();
                return;
            }
        };

        // Check for FSM state change.
        if let Some(new_state) = new_state
            && new_state != self.state
        {
            self.fsm_state_change(iface, instance, new_state);
        }
    }

    fn fsm_state_change(
        &mut self,
        iface: &Interface,
        instance: &mut InstanceUpView<'_>,
        new_state: State,
    ) {
        // Check for bidirectional communication change.
        if (new_state >= State::TwoWay && self.state < State::TwoWay
            || new_state < State::TwoWay && self.state >= State::TwoWay)
            && iface.is_broadcast_or_nbma()
        {
            // Trigger the NeighborChange event on broadcast/NBMA networks.
            instance
                .state
                .pending
                .push_back(PendingEvent::Ism(iface.idx, ism::Event::NbrChange));
        }

        // Check if the neighbor changed to/from the FULL state.
        if new_state == State::Full || self.state == State::Full {
            // (Re)originate LSAs that might have been affected.
            instance.state.pending.push_back(PendingEvent::LsaOrig(
                LsaOriginateEvent::NeighborToFromFull(iface.idx),
            ));
        }

        // Effectively transition to the new FSM state.
        Debug::NsmTransition(self.router_id, &self.state, &new_state).log();
        self.state = new_state;

        // Update statistics.
        self.event_count += 1;
        self.discontinuity_time = Utc::now();
    }

    // Starts the negotiation of the master/slave relationship.
    fn exstart(
        &mut self,
        iface: &mut Interface,
        instance: &mut InstanceUpView<'_>,
        lsa_entries: &Arena<LsaEntry>,
    ) {
        self.dd_seq_no = self.dd_seq_no.wrapping_add(1);
        self.dd_flags = DbDescFlags::I | DbDescFlags::M | DbDescFlags::MS;
        self.dbd_lsa_start = DbDescCursor::Start;
        self.dbd_lsa_next = DbDescCursor::Start;
        output::send_dbdesc(self, iface, instance, lsa_entries);
    }

    pub(crate) fn loading_done_check(
        &mut self,
        iface: &mut Interface,
        instance: &mut InstanceUpView<'_>,
    ) {
        // Check if all pending LSA requests were received.
        if self.request_pending.is_empty() {
            // Stop the LS Request rxmt task.
            self.rxmt_lsreq_stop(&mut instance.state.timers);

            // Check if there are new LSAs to request.
            if !self.request.is_empty() {
                output::send_lsreq(self, iface, instance);
            } else if self.state == State::Loading {
                // Database loading has completed.
                instance.state.pending.push_back(PendingEvent::Nsm(
                    iface.idx,
                    self.idx,
                    Event::LoadingDone,
                ));
            }
        }
    }

    // Clears all adjacency-related data, releasing the references held by
    // the flood queue.
    pub(crate) fn reset_adjacency(
        &mut self,
        instance: &mut InstanceUpView<'_>,
        lsa_entries: &mut Arena<LsaEntry>,
    ) {
        for lsa_key in std::mem::take(&mut self.flood).into_keys() {
            if let Some((_, lse)) =
                instance.state.lsdb.get_mut(lsa_entries, &lsa_key)
            {
                lse.refcount = lse.refcount.saturating_sub(1);
            }
        }
        self.options = None;
        self.last_rcvd_dbdesc = None;
        self.last_sent_dbdesc = None;
        self.dbd_lsa_start = DbDescCursor::Start;
        self.dbd_lsa_next = DbDescCursor::Start;
        self.request.clear();
        self.request_pending.clear();
        self.ack.clear();

        let timers = &mut instance.state.timers;
        self.rxmt_dbdesc_stop(timers);
        self.rxmt_lsreq_stop(timers);
        for timer in [
            self.tasks.rxmt_lsupd.take(),
            self.tasks.ls_update_timer.take(),
            self.tasks.delayed_ack_timer.take(),
        ]
        .into_iter()
        .flatten()
        {
            timers.cancel(timer);
        }
    }

    // Cancels all neighbor timers.
    pub(crate) fn timers_cancel(&mut self, timers: &mut TimerQueue<TimerKind>) {
        let tasks = std::mem::take(&mut self.tasks);
        for timer in [
            tasks.inactivity_timer,
            tasks.rxmt_dbdesc,
            tasks.rxmt_lsreq,
            tasks.rxmt_lsupd,
            tasks.ls_update_timer,
            tasks.delayed_ack_timer,
        ]
        .into_iter()
        .flatten()
        {
            timers.cancel(timer);
        }
    }

    pub(crate) fn dbdesc_is_dup(&self, dbdesc: &DbDesc) -> bool {
        if let Some(last_rcvd_dbdesc) = &self.last_rcvd_dbdesc
            && last_rcvd_dbdesc.options == dbdesc.options
            && last_rcvd_dbdesc.dd_flags == dbdesc.dd_flags
            && last_rcvd_dbdesc.dd_seq_no == dbdesc.dd_seq_no
        {
            return true;
        }

        false
    }

    pub(crate) fn inactivity_timer_reset(
        &mut self,
        instance: &mut InstanceUpView<'_>,
    ) {
        self.inactivity_timer_stop(&mut instance.state.timers);
        let timer = tasks::nsm_inactivity_timer(
            &mut instance.state.timers,
            instance.state.now,
            self.iface_idx,
            self.idx,
            instance.config.dead_interval,
        );
        self.tasks.inactivity_timer = Some(timer);
    }

    fn inactivity_timer_stop(&mut self, timers: &mut TimerQueue<TimerKind>) {
        if let Some(timer) = self.tasks.inactivity_timer.take() {
            timers.cancel(timer);
        }
    }

    pub(crate) fn rxmt_dbdesc_start(
        &mut self,
        instance: &mut InstanceUpView<'_>,
    ) {
        self.rxmt_dbdesc_stop(&mut instance.state.timers);
        let timer = self.rxmt_interval(instance, RxmtPacketType::DbDesc);
        self.tasks.rxmt_dbdesc = Some(timer);
    }

    pub(crate) fn rxmt_dbdesc_stop(
        &mut self,
        timers: &mut TimerQueue<TimerKind>,
    ) {
        if let Some(timer) = self.tasks.rxmt_dbdesc.take() {
            timers.cancel(timer);
        }
    }

    pub(crate) fn rxmt_lsreq_start(
        &mut self,
        instance: &mut InstanceUpView<'_>,
    ) {
        self.rxmt_lsreq_stop(&mut instance.state.timers);
        let timer = self.rxmt_interval(instance, RxmtPacketType::LsRequest);
        self.tasks.rxmt_lsreq = Some(timer);
    }

    fn rxmt_lsreq_stop(&mut self, timers: &mut TimerQueue<TimerKind>) {
        if let Some(timer) = self.tasks.rxmt_lsreq.take() {
            timers.cancel(timer);
        }
    }

    pub(crate) fn rxmt_lsupd_start_check(
        &mut self,
        instance: &mut InstanceUpView<'_>,
    ) {
        if self.tasks.rxmt_lsupd.is_none()
            && self.flood.values().any(|entry| entry.wait_ack)
        {
            let timer = self.rxmt_interval(instance, RxmtPacketType::LsUpdate);
            self.tasks.rxmt_lsupd = Some(timer);
        }
    }

    pub(crate) fn rxmt_lsupd_stop_check(
        &mut self,
        timers: &mut TimerQueue<TimerKind>,
    ) {
        if !self.flood.values().any(|entry| entry.wait_ack)
            && let Some(timer) = self.tasks.rxmt_lsupd.take()
        {
            timers.cancel(timer);
        }
    }

    // Schedules the transmission of the LSAs queued for flooding.
    pub(crate) fn ls_update_timer_start(
        &mut self,
        instance: &mut InstanceUpView<'_>,
    ) {
        if self.tasks.ls_update_timer.is_none() {
            let timer = tasks::ls_update_timer(
                &mut instance.state.timers,
                instance.state.now,
                self.iface_idx,
                self.idx,
            );
            self.tasks.ls_update_timer = Some(timer);
        }
    }

    pub(crate) fn delayed_ack_start(
        &mut self,
        instance: &mut InstanceUpView<'_>,
    ) {
        if self.tasks.delayed_ack_timer.is_none() {
            let timer = tasks::delayed_ack_timer(
                &mut instance.state.timers,
                instance.state.now,
                self.iface_idx,
                self.idx,
            );
            self.tasks.delayed_ack_timer = Some(timer);
        }
    }

    pub(crate) fn delayed_ack_stop(
        &mut self,
        timers: &mut TimerQueue<TimerKind>,
    ) {
        if let Some(timer) = self.tasks.delayed_ack_timer.take() {
            timers.cancel(timer);
        }
    }

    fn rxmt_interval(
        &self,
        instance: &mut InstanceUpView<'_>,
        packet_type: RxmtPacketType,
    ) -> TimerId {
        tasks::packet_rxmt_interval(
            &mut instance.state.timers,
            instance.state.now,
            self.iface_idx,
            self.idx,
            packet_type,
            instance.config.retransmit_interval,
        )
    }
}

impl Drop for Neighbor {
    fn drop(&mut self) {
        Debug::NeighborDelete(self.router_id).log();
    }
}

// ===== impl NeighborNetId =====

impl NeighborNetId {
    pub(crate) fn get(&self) -> Ipv4Addr {
        self.0
    }
}

impl std::fmt::Display for NeighborNetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Ipv4Addr> for NeighborNetId {
    fn from(addr: Ipv4Addr) -> NeighborNetId {
        NeighborNetId(addr)
    }
}
