//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::collections::VecDeque;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};
use tgen_utils::timer::{TimerId, TimerQueue};
use tgen_utils::{UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tracing::{Span, debug_span};

use crate::collections::{
    Arena, InterfaceIndex, Interfaces, Lsdb, NeighborIndex,
};
use crate::config::InstanceCfg;
use crate::debug::{
    Debug, InstanceInactiveReason, InterfaceInactiveReason, LsaFlushReason,
};
use crate::error::Error;
use crate::flood::flood;
use crate::interface::{Interface, ism};
use crate::lsdb::{
    self, LsaEntry, LsaInstallResult, LsaOriginateEvent, LsaSource,
};
use crate::neighbor::{Neighbor, nsm};
use crate::packet::lsa::{Lsa, LsaKey};
use crate::tasks::messages::input::{InstanceCmdMsg, NetRxPacketMsg};
use crate::tasks::messages::output::NetTxPacketMsg;
use crate::tasks::{self, TimerKind};
use crate::{events, output, state};

pub struct Instance {
    // Instance name.
    pub name: String,
    // Instance configuration data.
    pub config: InstanceCfg,
    // Instance state data.
    pub state: Option<InstanceState>,
    // Instance arenas.
    pub arenas: InstanceArenas,
    // Instance interfaces, indexed by name.
    pub interfaces: Interfaces,
    // Instance Tx channels.
    pub tx: InstanceChannelsTx,
}

#[derive(Debug)]
pub struct InstanceState {
    // Instance Router ID.
    pub router_id: Ipv4Addr,
    // Whether the instance advertises itself as overloaded.
    pub overload: bool,
    // Whether the instance is tearing down.
    pub teardown: bool,
    // Time of the event being processed.
    pub now: Instant,
    // Link-state database.
    pub lsdb: Lsdb,
    // Instance timers.
    pub timers: TimerQueue<TimerKind>,
    pub tasks: InstanceTasks,
    // Events generated while processing another event.
    pub pending: VecDeque<PendingEvent>,
    // Statistics.
    pub orig_lsa_count: u32,
    pub rx_lsa_count: u32,
    pub discontinuity_time: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct InstanceTasks {
    // LSDB garbage collection interval.
    pub gc_interval: Option<TimerId>,
    // Teardown timeout.
    pub teardown_timer: Option<TimerId>,
}

#[derive(Debug, Default)]
pub struct InstanceArenas {
    pub interfaces: Arena<Interface>,
    pub neighbors: Arena<Neighbor>,
    pub lsa_entries: Arena<LsaEntry>,
}

#[derive(Clone, Debug)]
pub struct InstanceChannelsTx {
    // Packet Tx event.
    pub net_tx: UnboundedSender<NetTxPacketMsg>,
}

#[derive(Debug)]
pub struct InstanceChannelsRx {
    // Packet Rx event.
    pub net_rx: UnboundedReceiver<NetRxPacketMsg>,
    // Instance command.
    pub cmd_rx: UnboundedReceiver<InstanceCmdMsg>,
}

// Event scheduled for processing once the current event is done.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PendingEvent {
    Ism(InterfaceIndex, ism::Event),
    Nsm(InterfaceIndex, NeighborIndex, nsm::Event),
    LsaOrig(LsaOriginateEvent),
}

pub struct InstanceUpView<'a> {
    pub name: &'a str,
    pub config: &'a InstanceCfg,
    pub state: &'a mut InstanceState,
    pub tx: &'a InstanceChannelsTx,
}

// ===== impl Instance =====

impl Instance {
    // Creates a new instance from the given configuration.
    pub fn new(
        name: String,
        config: InstanceCfg,
        net_tx: UnboundedSender<NetTxPacketMsg>,
    ) -> Result<Instance, Error> {
        config.validate()?;

        let span = instance_span(&name);
        let _span_guard = span.enter();
        Debug::InstanceCreate.log();

        let mut arenas = InstanceArenas::default();
        let mut interfaces = Interfaces::default();
        for iface_cfg in &config.interfaces {
            interfaces.insert(&mut arenas.interfaces, iface_cfg.clone());
        }

        Ok(Instance {
            name,
            config,
            state: None,
            arenas,
            interfaces,
            tx: InstanceChannelsTx { net_tx },
        })
    }

    // Starts the instance, bringing all of its interfaces up.
    pub fn start(&mut self, now: Instant) {
        if self.is_active() {
            return;
        }

        let span = instance_span(&self.name);
        let _span_guard = span.enter();
        Debug::InstanceStart.log();

        let mut state = InstanceState::new(&self.config, now);
        let timer = tasks::lsdb_gc_interval(
            &mut state.timers,
            now,
            self.config.lsa_gc_interval,
        );
        state.tasks.gc_interval = Some(timer);

        // Store instance initial state.
        self.state = Some(state);

        let iface_idxs = self.interfaces.indexes().collect::<Vec<_>>();
        let Some((mut instance, arenas)) = self.as_up() else {
            return;
        };
        for iface_idx in iface_idxs {
            let event = ism::Event::InterfaceUp;
            instance
                .state
                .pending
                .push_back(PendingEvent::Ism(iface_idx, event));
        }

        // Originate the Router-LSA.
        instance
            .state
            .pending
            .push_back(PendingEvent::LsaOrig(LsaOriginateEvent::InstanceStart));
        process_pending(&mut instance, arenas);
    }

    // Stops the instance, discarding all of its state.
    pub fn stop(&mut self, reason: InstanceInactiveReason) {
        let span = instance_span(&self.name);
        let _span_guard = span.enter();

        let Some((mut instance, arenas)) = self.as_up() else {
            return;
        };

        Debug::InstanceStop(reason).log();

        // Flush all self-originated LSAs (already done during teardown).
        if !instance.state.teardown {
            lsdb::flush_all_self_originated(&mut instance, arenas);
        }

        // Send pending LS Updates.
        for nbr_idx in arenas.neighbors.indexes() {
            let nbr = &mut arenas.neighbors[nbr_idx];
            if nbr.state < nsm::State::Exchange {
                continue;
            }
            let iface = &mut arenas.interfaces[nbr.iface_idx];
            output::send_lsupd_queued(nbr, iface, &mut instance);
        }

        // Stop interfaces.
        for iface_idx in arenas.interfaces.indexes() {
            let iface = &mut arenas.interfaces[iface_idx];
            if iface.is_down() {
                continue;
            }

            let reason = InterfaceInactiveReason::InstanceDown;
            iface.fsm(
                &mut instance,
                &mut arenas.neighbors,
                &mut arenas.lsa_entries,
                ism::Event::InterfaceDown(reason),
            );
        }

        // Clear instance state.
        arenas.lsa_entries = Default::default();
        self.state = None;
    }

    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    // Processes a packet received from the network.
    pub fn process_packet(
        &mut self,
        now: Instant,
        msg: NetRxPacketMsg,
    ) -> Result<(), Error> {
        let span = instance_span(&self.name);
        let _span_guard = span.enter();

        let (iface_idx, _) = self
            .interfaces
            .get_by_name(&self.arenas.interfaces, &msg.ifname)
            .ok_or_else(|| Error::InterfaceNotFound(msg.ifname.clone()))?;
        let (mut instance, arenas) =
            self.as_up().ok_or(Error::InstanceInactive)?;
        instance.state.now = now;

        let result = events::process_packet(
            &mut instance,
            arenas,
            iface_idx,
            msg.src,
            msg.dst,
            &msg.data,
        );
        process_pending(&mut instance, arenas);
        result
    }

    // Processes all timers that expired at or before `now`, in deadline
    // order.
    pub fn poll_timers(&mut self, now: Instant) {
        let span = instance_span(&self.name);
        let _span_guard = span.enter();

        let Some((mut instance, arenas)) = self.as_up() else {
            return;
        };

        let mut teardown_done = false;
        loop {
            let Some(deadline) = instance.state.timers.next_deadline() else {
                break;
            };
            if deadline > now {
                break;
            }
            let Some((timer, kind)) =
                instance.state.timers.pop_expired(deadline)
            else {
                break;
            };
            instance.state.now = deadline;

            if kind == TimerKind::Teardown {
                if instance.state.tasks.teardown_timer == Some(timer) {
                    instance.state.tasks.teardown_timer = None;
                    teardown_done = true;
                    break;
                }
                continue;
            }

            if let Err(error) =
                events::process_timer(&mut instance, arenas, timer, kind)
            {
                error.log();
            }
            process_pending(&mut instance, arenas);
        }
        instance.state.now = std::cmp::max(instance.state.now, now);

        if teardown_done {
            self.stop(InstanceInactiveReason::Teardown);
        }
    }

    // Returns the deadline of the next timer to expire.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.state.as_mut()?.timers.next_deadline()
    }

    // Flushes all self-originated LSAs and schedules the instance to stop
    // once the teardown time elapses.
    pub fn teardown(&mut self, now: Instant) {
        let span = instance_span(&self.name);
        let _span_guard = span.enter();

        let Some((mut instance, arenas)) = self.as_up() else {
            return;
        };
        if instance.state.teardown {
            return;
        }

        Debug::InstanceTeardown.log();
        instance.state.now = now;
        instance.state.teardown = true;
        lsdb::flush_all_self_originated(&mut instance, arenas);

        let timer = tasks::teardown_timer(
            &mut instance.state.timers,
            now,
            instance.config.teardown_time,
        );
        instance.state.tasks.teardown_timer = Some(timer);
        process_pending(&mut instance, arenas);
    }

    // Sets or clears the overload condition.
    pub fn set_overload(&mut self, now: Instant, overload: bool) {
        let span = instance_span(&self.name);
        let _span_guard = span.enter();

        self.config.overload = overload;
        let Some((mut instance, arenas)) = self.as_up() else {
            return;
        };
        if instance.state.overload == overload {
            return;
        }

        instance.state.now = now;
        instance.state.overload = overload;
        instance
            .state
            .pending
            .push_back(PendingEvent::LsaOrig(
                LsaOriginateEvent::OverloadChange,
            ));
        process_pending(&mut instance, arenas);
    }

    // Injects an externally-sourced LSA into the LSDB.
    //
    // When the LSDB holds a more recent instance, the injected LSA is
    // reoriginated with the next sequence number.
    pub fn inject_lsa(&mut self, now: Instant, lsa: Lsa) -> Result<(), Error> {
        let span = instance_span(&self.name);
        let _span_guard = span.enter();

        let (mut instance, arenas) =
            self.as_up().ok_or(Error::InstanceInactive)?;
        instance.state.now = now;

        let result = inject_lsa(&mut instance, arenas, lsa);
        process_pending(&mut instance, arenas);
        result
    }

    // Withdraws a previously injected LSA from the routing domain.
    pub fn withdraw_lsa(
        &mut self,
        now: Instant,
        lsa_key: LsaKey,
    ) -> Result<(), Error> {
        let span = instance_span(&self.name);
        let _span_guard = span.enter();

        let (mut instance, arenas) =
            self.as_up().ok_or(Error::InstanceInactive)?;
        instance.state.now = now;

        instance.state.lsdb.seqno_wrapping.remove(&lsa_key);
        let lse_idx = instance
            .state
            .lsdb
            .get(&arenas.lsa_entries, &lsa_key)
            .filter(|(_, lse)| lse.source == LsaSource::External)
            .map(|(lse_idx, _)| lse_idx);
        let result = match lse_idx {
            Some(lse_idx) => {
                let reason = LsaFlushReason::PrematureAging;
                lsdb::flush(&mut instance, arenas, lse_idx, reason)
            }
            None => Ok(()),
        };
        process_pending(&mut instance, arenas);
        result
    }

    // Updates the operational status of an interface.
    pub fn interface_update(
        &mut self,
        now: Instant,
        ifname: &str,
        operative: bool,
    ) -> Result<(), Error> {
        let span = instance_span(&self.name);
        let _span_guard = span.enter();

        let (iface_idx, _) = self
            .interfaces
            .get_by_name(&self.arenas.interfaces, ifname)
            .ok_or_else(|| Error::InterfaceNotFound(ifname.to_owned()))?;
        let (mut instance, arenas) =
            self.as_up().ok_or(Error::InstanceInactive)?;
        instance.state.now = now;

        let iface = &arenas.interfaces[iface_idx];
        let event = match (operative, iface.is_down()) {
            (true, true) => ism::Event::InterfaceUp,
            (false, false) => ism::Event::InterfaceDown(
                InterfaceInactiveReason::OperationalDown,
            ),
            _ => return Ok(()),
        };
        instance
            .state
            .pending
            .push_back(PendingEvent::Ism(iface_idx, event));
        process_pending(&mut instance, arenas);

        Ok(())
    }

    // Processes a command sent to the instance.
    pub fn process_cmd(
        &mut self,
        now: Instant,
        msg: InstanceCmdMsg,
    ) -> Result<(), Error> {
        match msg {
            InstanceCmdMsg::SetOverload(overload) => {
                self.set_overload(now, overload);
                Ok(())
            }
            InstanceCmdMsg::InterfaceUpdate { ifname, operative } => {
                self.interface_update(now, &ifname, operative)
            }
            InstanceCmdMsg::InjectLsa(lsa) => self.inject_lsa(now, lsa),
            InstanceCmdMsg::WithdrawLsa(lsa_key) => {
                self.withdraw_lsa(now, lsa_key)
            }
            InstanceCmdMsg::Teardown => {
                self.teardown(now);
                Ok(())
            }
        }
    }

    // Returns a snapshot of the instance operational state.
    pub fn state(&self, now: Instant) -> state::InstanceState {
        state::InstanceState::new(
            &self.name,
            self.config.version,
            self.config.router_id,
            self.state.as_ref(),
            &self.interfaces,
            &self.arenas,
            now,
        )
    }

    // Runs the instance event loop until either input channel is closed or
    // the instance stops.
    pub async fn run(mut self, mut rx: InstanceChannelsRx) {
        self.start(Instant::now());

        while self.is_active() {
            let deadline = self.next_deadline();
            let result = tokio::select! {
                msg = rx.net_rx.recv() => match msg {
                    Some(msg) => self.process_packet(Instant::now(), msg),
                    None => break,
                },
                msg = rx.cmd_rx.recv() => match msg {
                    Some(msg) => self.process_cmd(Instant::now(), msg),
                    None => break,
                },
                _ = tokio::time::sleep_until(
                    deadline.unwrap_or_else(Instant::now)
                ), if deadline.is_some() => {
                    self.poll_timers(Instant::now());
                    Ok(())
                }
            };
            if let Err(error) = result {
                let span = instance_span(&self.name);
                let _span_guard = span.enter();
                error.log();
            }
        }

        self.stop(InstanceInactiveReason::AdminDown);
    }

    pub(crate) fn as_up(
        &mut self,
    ) -> Option<(InstanceUpView<'_>, &mut InstanceArenas)> {
        if let Some(state) = &mut self.state {
            let instance = InstanceUpView {
                name: &self.name,
                config: &self.config,
                state,
                tx: &self.tx,
            };
            Some((instance, &mut self.arenas))
        } else {
            None
        }
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.state)
            .finish()
    }
}

// ===== impl InstanceState =====

impl InstanceState {
    fn new(config: &InstanceCfg, now: Instant) -> InstanceState {
        InstanceState {
            router_id: config.router_id,
            overload: config.overload,
            teardown: false,
            now,
            lsdb: Default::default(),
            timers: Default::default(),
            tasks: Default::default(),
            pending: Default::default(),
            orig_lsa_count: 0,
            rx_lsa_count: 0,
            discontinuity_time: Utc::now(),
        }
    }
}

// ===== global functions =====

// Creates a new pair of instance input channels.
pub fn input_channels() -> (
    UnboundedSender<NetRxPacketMsg>,
    UnboundedSender<InstanceCmdMsg>,
    InstanceChannelsRx,
) {
    let (net_tx, net_rx) = tokio::sync::mpsc::unbounded_channel();
    let (cmd_tx, cmd_rx) = tokio::sync::mpsc::unbounded_channel();
    (net_tx, cmd_tx, InstanceChannelsRx { net_rx, cmd_rx })
}

// ===== helper functions =====

fn instance_span(name: &str) -> Span {
    debug_span!("ospf-instance", %name)
}

// Processes all events generated while handling the current event.
fn process_pending(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
) {
    while let Some(event) = instance.state.pending.pop_front() {
        match event {
            PendingEvent::Ism(iface_idx, event) => {
                events::process_ism_event(instance, arenas, iface_idx, event);
            }
            PendingEvent::Nsm(iface_idx, nbr_idx, event) => {
                events::process_nsm_event(
                    instance, arenas, iface_idx, nbr_idx, event,
                );
            }
            PendingEvent::LsaOrig(event) => {
                if let Err(error) =
                    lsdb::lsa_orig_event(instance, arenas, event)
                {
                    error.log();
                }
            }
        }
    }
}

fn inject_lsa(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    lsa: Lsa,
) -> Result<(), Error> {
    let lsa_key = lsa.hdr.key();
    let (options, body) = (lsa.hdr.options, lsa.body.clone());

    let source = LsaSource::External;
    match lsdb::insert_or_update(instance, arenas, None, lsa, source)? {
        LsaInstallResult::Accepted(lse_idx) => {
            Debug::LsaOriginate(&arenas.lsa_entries[lse_idx].data.hdr).log();
            flood(instance, arenas, lse_idx, None);

            // Update statistics.
            instance.state.orig_lsa_count += 1;
            instance.state.discontinuity_time = Utc::now();
        }
        LsaInstallResult::Rejected { duplicate: true } => (),
        LsaInstallResult::Rejected { duplicate: false } => {
            // Take over the more recent instance.
            let old_seq_no = instance
                .state
                .lsdb
                .get(&arenas.lsa_entries, &lsa_key)
                .map(|(_, lse)| lse.data.hdr.seq_no);
            lsdb::originate_next(
                instance,
                arenas,
                None,
                LsaSource::External,
                old_seq_no,
                options,
                lsa_key,
                body,
            )?;
        }
        LsaInstallResult::Invalid(error) => {
            return Err(Error::InvalidLsa(lsa_key, error));
        }
    }

    Ok(())
}
