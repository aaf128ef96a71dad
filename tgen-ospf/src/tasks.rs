//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::Duration;

use tgen_utils::timer::{TimerId, TimerQueue};
use tokio::time::Instant;

use crate::collections::{InterfaceIndex, LsaEntryIndex, NeighborIndex};
use crate::lsdb::{LSA_MAX_AGE, LSA_REFRESH_TIME};
use crate::neighbor::RxmtPacketType;

//
// OSPF timers diagram:
//
//                                    +--------------+
//                     net_rx (1x) -> |              | -> (1x) net_tx
//                     cmd_rx (1x) -> |              |
//                                    |              |
//             hello_interval (Nx) -> |              |
//             ism_wait_timer (Nx) -> |              |
//                                    |              |
//       nsm_inactivity_timer (Nx) -> |              |
//       packet_rxmt_interval (Nx) -> |   instance   |
//            ls_update_timer (Nx) -> |              |
//          delayed_ack_timer (Nx) -> |              |
//                                    |              |
//           lsa_expiry_timer (Nx) -> |              |
//          lsa_refresh_timer (Nx) -> |              |
//          lsdb_gc_interval (1x) ->  |              |
//             teardown_timer (1x) -> |              |
//                                    +--------------+
//
// All timers share a single per-instance timer queue. The objects they refer
// to are looked up when the timer fires, and timers whose object no longer
// exists (or no longer owns the timer) are ignored.
//

// Delay used to group multiple LS Acks into a single packet.
pub const DELAYED_ACK_TIMEOUT: Duration = Duration::from_secs(1);

// OSPF timer types.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimerKind {
    HelloInterval(InterfaceIndex),
    WaitTimer(InterfaceIndex),
    NbrInactivity(InterfaceIndex, NeighborIndex),
    NbrRxmt(InterfaceIndex, NeighborIndex, RxmtPacketType),
    NbrLsUpdate(InterfaceIndex, NeighborIndex),
    NbrDelayedAck(InterfaceIndex, NeighborIndex),
    LsaExpiry(LsaEntryIndex),
    LsaRefresh(LsaEntryIndex),
    LsdbGc,
    Teardown,
}

// OSPF inter-task message types.
pub mod messages {
    use std::net::IpAddr;

    use bytes::Bytes;
    use serde::{Deserialize, Serialize};

    use crate::packet::Packet;
    use crate::packet::lsa::{Lsa, LsaKey};

    // Type aliases.
    pub type NetRxPacketMsg = input::NetRxPacketMsg;
    pub type InstanceCmdMsg = input::InstanceCmdMsg;
    pub type NetTxPacketMsg = output::NetTxPacketMsg;

    // Input messages (external world -> instance).
    pub mod input {
        use super::*;

        #[derive(Clone, Debug, Deserialize, Serialize)]
        pub struct NetRxPacketMsg {
            pub ifname: String,
            pub src: IpAddr,
            pub dst: IpAddr,
            pub data: Bytes,
        }

        #[derive(Clone, Debug, Deserialize, Serialize)]
        pub enum InstanceCmdMsg {
            SetOverload(bool),
            InterfaceUpdate { ifname: String, operative: bool },
            InjectLsa(Lsa),
            WithdrawLsa(LsaKey),
            Teardown,
        }
    }

    // Output messages (instance -> external world).
    pub mod output {
        use super::*;

        #[derive(Clone, Debug, Deserialize, Serialize)]
        pub struct NetTxPacketMsg {
            pub ifname: String,
            pub src: IpAddr,
            pub dst: IpAddr,
            pub packet: Packet,
            pub data: Bytes,
        }
    }
}

// ===== OSPF timers =====

// Interface hello interval.
pub(crate) fn hello_interval(
    timers: &mut TimerQueue<TimerKind>,
    now: Instant,
    iface_idx: InterfaceIndex,
    interval: u16,
) -> TimerId {
    let interval = Duration::from_secs(interval.into());
    timers.schedule_interval(now, interval, TimerKind::HelloInterval(iface_idx))
}

// Interface wait timer.
pub(crate) fn ism_wait_timer(
    timers: &mut TimerQueue<TimerKind>,
    now: Instant,
    iface_idx: InterfaceIndex,
    dead_interval: u32,
) -> TimerId {
    let timeout = Duration::from_secs(dead_interval.into());
    timers.schedule_after(now, timeout, TimerKind::WaitTimer(iface_idx))
}

// Neighbor inactivity timer.
pub(crate) fn nsm_inactivity_timer(
    timers: &mut TimerQueue<TimerKind>,
    now: Instant,
    iface_idx: InterfaceIndex,
    nbr_idx: NeighborIndex,
    dead_interval: u32,
) -> TimerId {
    let timeout = Duration::from_secs(dead_interval.into());
    timers.schedule_after(
        now,
        timeout,
        TimerKind::NbrInactivity(iface_idx, nbr_idx),
    )
}

// Neighbor retransmission interval.
pub(crate) fn packet_rxmt_interval(
    timers: &mut TimerQueue<TimerKind>,
    now: Instant,
    iface_idx: InterfaceIndex,
    nbr_idx: NeighborIndex,
    packet_type: RxmtPacketType,
    interval: u16,
) -> TimerId {
    let interval = Duration::from_secs(interval.into());
    timers.schedule_interval(
        now,
        interval,
        TimerKind::NbrRxmt(iface_idx, nbr_idx, packet_type),
    )
}

// Sends the LS Update packets queued for the neighbor as soon as the current
// event is processed.
pub(crate) fn ls_update_timer(
    timers: &mut TimerQueue<TimerKind>,
    now: Instant,
    iface_idx: InterfaceIndex,
    nbr_idx: NeighborIndex,
) -> TimerId {
    timers.schedule(now, TimerKind::NbrLsUpdate(iface_idx, nbr_idx))
}

// Neighbor delayed acknowledgment timer.
pub(crate) fn delayed_ack_timer(
    timers: &mut TimerQueue<TimerKind>,
    now: Instant,
    iface_idx: InterfaceIndex,
    nbr_idx: NeighborIndex,
) -> TimerId {
    timers.schedule_after(
        now,
        DELAYED_ACK_TIMEOUT,
        TimerKind::NbrDelayedAck(iface_idx, nbr_idx),
    )
}

// LSA expiry timer, firing when the LSA age reaches MaxAge.
pub(crate) fn lsa_expiry_timer(
    timers: &mut TimerQueue<TimerKind>,
    now: Instant,
    lse_idx: LsaEntryIndex,
    age: u16,
) -> TimerId {
    let timeout = Duration::from_secs(LSA_MAX_AGE.saturating_sub(age).into());
    timers.schedule_after(now, timeout, TimerKind::LsaExpiry(lse_idx))
}

// LSA refresh timer.
pub(crate) fn lsa_refresh_timer(
    timers: &mut TimerQueue<TimerKind>,
    now: Instant,
    lse_idx: LsaEntryIndex,
    age: u16,
) -> TimerId {
    let timeout =
        Duration::from_secs(LSA_REFRESH_TIME.saturating_sub(age).into());
    timers.schedule_after(now, timeout, TimerKind::LsaRefresh(lse_idx))
}

// LSDB garbage collection interval.
pub(crate) fn lsdb_gc_interval(
    timers: &mut TimerQueue<TimerKind>,
    now: Instant,
    interval: u16,
) -> TimerId {
    let interval = Duration::from_secs(interval.into());
    timers.schedule_interval(now, interval, TimerKind::LsdbGc)
}

// Instance teardown timer.
pub(crate) fn teardown_timer(
    timers: &mut TimerQueue<TimerKind>,
    now: Instant,
    timeout: u16,
) -> TimerId {
    let timeout = Duration::from_secs(timeout.into());
    timers.schedule_after(now, timeout, TimerKind::Teardown)
}
