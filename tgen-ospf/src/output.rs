//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use crate::collections::Arena;
use crate::debug::Debug;
use crate::error::Error;
use crate::instance::InstanceUpView;
use crate::interface::{Interface, InterfaceType};
use crate::lsdb::LsaEntry;
use crate::neighbor::{DbDescCursor, Neighbor, nsm};
use crate::packet::auth::{AuthEncodeCtx, AuthMethod};
use crate::packet::lsa::{Lsa, LsaHdr};
use crate::packet::{
    DbDesc, DbDescFlags, Hello, LsAck, LsRequest, LsUpdate, Options, Packet,
    PacketHdr, PacketType,
};
use crate::tasks::messages::output::NetTxPacketMsg;
use crate::version::Version;
use crate::{flood, lsdb};

// AllSPFRouters multicast addresses.
pub const ALL_SPF_RTRS_V4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 5);
pub const ALL_SPF_RTRS_V6: Ipv6Addr =
    Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0x5);

// ===== Hello Packets =====

pub(crate) fn send_hello(
    iface: &mut Interface,
    instance: &InstanceUpView<'_>,
    neighbors: &Arena<Neighbor>,
) {
    let version = instance.config.version;

    // Generate Hello packet.
    let pkt_hdr = packet_hdr(iface, instance, PacketType::Hello);
    let network_mask = match version {
        Version::Ospfv2 => iface
            .config
            .address
            .map(|addr| addr.mask())
            .unwrap_or(Ipv4Addr::UNSPECIFIED),
        Version::Ospfv3 => Ipv4Addr::UNSPECIFIED,
    };
    let packet = Packet::Hello(Hello {
        hdr: pkt_hdr,
        network_mask,
        iface_id: iface.config.ifindex,
        hello_interval: instance.config.hello_interval,
        options: options(version),
        priority: instance.config.priority,
        dead_interval: instance.config.dead_interval,
        dr: iface.state.dr.map(|dr| dr.get()),
        bdr: iface.state.bdr.map(|bdr| bdr.get()),
        neighbors: iface
            .state
            .neighbors
            .iter(neighbors)
            .filter(|nbr| nbr.state >= nsm::State::Init)
            .map(|nbr| nbr.router_id)
            .collect(),
    });

    // Enqueue packet for network transmission.
    let dst = all_spf_rtrs(version);
    send_packet(iface, instance, dst, packet);
}

// ===== Database Description Packets =====

pub(crate) fn send_dbdesc(
    nbr: &mut Neighbor,
    iface: &mut Interface,
    instance: &mut InstanceUpView<'_>,
    lsa_entries: &Arena<LsaEntry>,
) {
    let version = instance.config.version;
    let now = instance.state.now;

    // Append as many LSA headers as possible while on the Exchange state.
    let mut lsa_hdrs = vec![];
    if !nbr.dd_flags.contains(DbDescFlags::I) {
        let max_size =
            iface.max_packet_size(instance) - DbDesc::base_length(version);
        let max_hdrs = max_size / LsaHdr::LENGTH as usize;

        nbr.dbd_lsa_start = nbr.dbd_lsa_next;
        let more = match nbr.dbd_lsa_start {
            DbDescCursor::End => false,
            cursor => {
                let start = match cursor {
                    DbDescCursor::After(lsa_key) => Some(lsa_key),
                    _ => None,
                };

                // MaxAge LSAs are sent directly instead of being summarized.
                let mut lsas = instance
                    .state
                    .lsdb
                    .range_after(lsa_entries, start)
                    .map(|(_, lse)| lse)
                    .filter(|lse| flood::lsa_in_scope(lse, iface))
                    .map(|lse| lse.data.hdr_at(now))
                    .filter(|lsa_hdr| !lsa_hdr.is_maxage());
                lsa_hdrs.extend(lsas.by_ref().take(max_hdrs));
                lsas.next().is_some()
            }
        };

        // Keep track of where the next page starts.
        nbr.dbd_lsa_next = match lsa_hdrs.last() {
            Some(lsa_hdr) if more => DbDescCursor::After(lsa_hdr.key()),
            _ => DbDescCursor::End,
        };

        // Clear the M-bit if there's no more data to send.
        nbr.dd_flags.set(DbDescFlags::M, more);
    }

    // Generate Database Description packet.
    let mtu = match iface.config.if_type {
        InterfaceType::VirtualLink => 0,
        _ => iface.config.mtu,
    };
    let packet = Packet::DbDesc(DbDesc {
        hdr: packet_hdr(iface, instance, PacketType::DbDesc),
        mtu,
        options: options(version),
        dd_flags: nbr.dd_flags,
        dd_seq_no: nbr.dd_seq_no,
        lsa_hdrs,
    });

    // Enqueue packet for network transmission.
    let dst = send_dest_nbr(nbr, iface, version);
    let msg = send_packet(iface, instance, dst, packet);
    nbr.statistics.tx.incr(PacketType::DbDesc);
    nbr.last_sent_dbdesc = Some(msg);

    // Start retransmission interval in two cases:
    // * The router is master
    // * When sending the initial database description packet
    if nbr.dd_flags.intersects(DbDescFlags::MS | DbDescFlags::I) {
        nbr.rxmt_dbdesc_start(instance);
    }
}

pub(crate) fn rxmt_dbdesc(
    nbr: &mut Neighbor,
    iface: &mut Interface,
    instance: &InstanceUpView<'_>,
) {
    if let Some(msg) = &nbr.last_sent_dbdesc {
        // Enqueue packet for network transmission.
        let (dst, packet) = (msg.dst, msg.packet.clone());
        send_packet(iface, instance, dst, packet);
        nbr.statistics.tx.incr(PacketType::DbDesc);
    }
}

// ===== LS Request Packets =====

pub(crate) fn send_lsreq(
    nbr: &mut Neighbor,
    iface: &mut Interface,
    instance: &mut InstanceUpView<'_>,
) {
    let version = instance.config.version;

    // Calculate maximum packet size.
    let max_size = iface.max_packet_size(instance) - version.hdr_length();

    // Append as many LS Request Entries as possible in a single packet.
    let mut total = 0;
    while total + LsRequest::ENTRY_LENGTH <= max_size {
        match nbr.request.pop_first() {
            Some((lsa_key, lsa_hdr)) => {
                nbr.request_pending.insert(lsa_key, lsa_hdr);
                total += LsRequest::ENTRY_LENGTH;
            }
            None => break,
        }
    }

    rxmt_lsreq(nbr, iface, instance);

    // Start retransmission interval.
    nbr.rxmt_lsreq_start(instance);
}

pub(crate) fn rxmt_lsreq(
    nbr: &mut Neighbor,
    iface: &mut Interface,
    instance: &InstanceUpView<'_>,
) {
    let version = instance.config.version;

    // Generate Link State Request packet.
    let packet = Packet::LsRequest(LsRequest {
        hdr: packet_hdr(iface, instance, PacketType::LsRequest),
        entries: nbr.request_pending.keys().copied().collect(),
    });

    // Enqueue packet for network transmission.
    let dst = send_dest_nbr(nbr, iface, version);
    send_packet(iface, instance, dst, packet);
    nbr.statistics.tx.incr(PacketType::LsRequest);
}

// ===== LS Update Packets =====

// Sends the given LSAs to the neighbor, using as many packets as necessary.
pub(crate) fn send_lsupd_direct(
    nbr: &mut Neighbor,
    iface: &mut Interface,
    instance: &InstanceUpView<'_>,
    lsas: Vec<Arc<Lsa>>,
) {
    let version = instance.config.version;
    let now = instance.state.now;
    let transmit_delay = instance.config.transmit_delay;

    // Calculate maximum packet size.
    let max_size = iface.max_packet_size(instance)
        - version.hdr_length()
        - LsUpdate::BASE_LENGTH;

    let dst = send_dest_nbr(nbr, iface, version);
    let mut lsas = lsas.into_iter().peekable();
    while lsas.peek().is_some() {
        // Append as many LSAs as possible in a single packet. An LSA that
        // doesn't fit in an empty packet is sent alone, relying on IP
        // fragmentation up to the maximum fragment length.
        let mut pkt_size = 0;
        let mut pkt_lsas = vec![];
        while let Some(lsa) = lsas.next_if(|lsa| {
            pkt_lsas.is_empty()
                || pkt_size + lsa.hdr.length as usize <= max_size
        }) {
            pkt_size += lsa.hdr.length as usize;

            // Increment the LSA age by the transmission delay.
            let mut lsa = (*lsa).clone();
            let age = std::cmp::min(
                lsa.age(now).saturating_add(transmit_delay),
                lsdb::LSA_MAX_AGE,
            );
            lsa.set_age(age, None);
            pkt_lsas.push(lsa);
        }

        // Generate Link State Update packet.
        let packet = Packet::LsUpdate(LsUpdate {
            hdr: packet_hdr(iface, instance, PacketType::LsUpdate),
            lsas: pkt_lsas,
        });

        // Enqueue packet for network transmission.
        if pkt_size > max_size
            && pkt_size + version.hdr_length() + LsUpdate::BASE_LENGTH
                > iface.config.max_fragment_len as usize
        {
            Error::PacketTooBig(iface.name.clone(), pkt_size).log();
            continue;
        }
        send_packet(iface, instance, dst, packet);
        nbr.statistics.tx.incr(PacketType::LsUpdate);
    }
}

// Sends the LSAs from the neighbor's flood queue that weren't sent yet.
pub(crate) fn send_lsupd_queued(
    nbr: &mut Neighbor,
    iface: &mut Interface,
    instance: &mut InstanceUpView<'_>,
) {
    let now = instance.state.now;
    let lsas = nbr
        .flood
        .values_mut()
        .filter(|entry| !entry.wait_ack)
        .map(|entry| {
            entry.wait_ack = true;
            entry.tx_count += 1;
            entry.tx_time = Some(now);
            entry.lsa.clone()
        })
        .collect::<Vec<_>>();
    if lsas.is_empty() {
        return;
    }

    send_lsupd_direct(nbr, iface, instance, lsas);

    // Start retransmission interval.
    nbr.rxmt_lsupd_start_check(instance);
}

// Retransmits the LSAs from the neighbor's flood queue that weren't
// acknowledged yet.
pub(crate) fn rxmt_lsupd(
    nbr: &mut Neighbor,
    iface: &mut Interface,
    instance: &InstanceUpView<'_>,
) {
    let now = instance.state.now;
    let lsas = nbr
        .flood
        .values_mut()
        .filter(|entry| entry.wait_ack)
        .map(|entry| {
            entry.tx_count += 1;
            entry.tx_time = Some(now);
            entry.lsa.clone()
        })
        .collect::<Vec<_>>();

    send_lsupd_direct(nbr, iface, instance, lsas);
}

// ===== LS Ack Packets =====

pub(crate) fn send_lsack_direct(
    nbr: &mut Neighbor,
    iface: &mut Interface,
    instance: &InstanceUpView<'_>,
    lsa_hdr: &LsaHdr,
) {
    let version = instance.config.version;

    // Generate Link State Ack packet.
    let packet = Packet::LsAck(LsAck {
        hdr: packet_hdr(iface, instance, PacketType::LsAck),
        lsa_hdrs: vec![*lsa_hdr],
    });

    // Enqueue packet for network transmission.
    let dst = send_dest_nbr(nbr, iface, version);
    send_packet(iface, instance, dst, packet);
    nbr.statistics.tx.incr(PacketType::LsAck);
}

// Adds the LSA header to the neighbor's list of pending delayed Acks.
//
// The list is flushed when the delayed ack timer expires or as soon as it
// fills up a whole packet.
pub(crate) fn enqueue_delayed_ack(
    nbr: &mut Neighbor,
    iface: &mut Interface,
    instance: &mut InstanceUpView<'_>,
    lsa_hdr: &LsaHdr,
) {
    let version = instance.config.version;
    let max_hdrs = (iface.max_packet_size(instance) - version.hdr_length())
        / LsaHdr::LENGTH as usize;

    nbr.ack.insert(lsa_hdr.key(), *lsa_hdr);
    if nbr.ack.len() >= max_hdrs {
        nbr.delayed_ack_stop(&mut instance.state.timers);
        send_lsack_delayed(nbr, iface, instance);
    } else {
        nbr.delayed_ack_start(instance);
    }
}

pub(crate) fn send_lsack_delayed(
    nbr: &mut Neighbor,
    iface: &mut Interface,
    instance: &InstanceUpView<'_>,
) {
    let version = instance.config.version;
    let dst = send_dest_nbr(nbr, iface, version);

    // Calculate maximum packet size.
    let max_size = iface.max_packet_size(instance) - version.hdr_length();

    // Send as many LS Acks as necessary.
    while !nbr.ack.is_empty() {
        // Append as many LSA headers as possible in a single packet.
        let mut total = 0;
        let mut lsa_hdrs = vec![];
        while total + LsaHdr::LENGTH as usize <= max_size {
            match nbr.ack.pop_first() {
                Some((_, lsa_hdr)) => {
                    total += LsaHdr::LENGTH as usize;
                    lsa_hdrs.push(lsa_hdr);
                }
                None => break,
            }
        }

        // Generate Link State Ack packet.
        let packet = Packet::LsAck(LsAck {
            hdr: packet_hdr(iface, instance, PacketType::LsAck),
            lsa_hdrs,
        });

        // Enqueue packet for network transmission.
        send_packet(iface, instance, dst, packet);
        nbr.statistics.tx.incr(PacketType::LsAck);
    }
}

// ===== global functions =====

pub(crate) fn all_spf_rtrs(version: Version) -> IpAddr {
    match version {
        Version::Ospfv2 => ALL_SPF_RTRS_V4.into(),
        Version::Ospfv3 => ALL_SPF_RTRS_V6.into(),
    }
}

// ===== helper functions =====

fn packet_hdr(
    iface: &Interface,
    instance: &InstanceUpView<'_>,
    pkt_type: PacketType,
) -> PacketHdr {
    PacketHdr::new(
        instance.config.version,
        pkt_type,
        instance.state.router_id,
        instance.config.area,
        iface.config.instance_id,
    )
}

// Options advertised in Hello and Database Description packets.
fn options(version: Version) -> Options {
    match version {
        Version::Ospfv2 => Options::E,
        Version::Ospfv3 => Options::V6 | Options::E | Options::R,
    }
}

// Returns destination used to send a packet directly to the given neighbor.
fn send_dest_nbr(
    nbr: &Neighbor,
    iface: &Interface,
    version: Version,
) -> IpAddr {
    match iface.config.if_type {
        InterfaceType::PointToPoint => all_spf_rtrs(version),
        _ => nbr.src,
    }
}

// Encodes the packet and enqueues it for network transmission.
fn send_packet(
    iface: &mut Interface,
    instance: &InstanceUpView<'_>,
    dst: IpAddr,
    packet: Packet,
) -> NetTxPacketMsg {
    let src = iface.src_addr(instance.config.version);
    let auth = instance.config.auth.as_ref().map(|method| {
        let seqno = match method {
            AuthMethod::Md5 { .. } => iface.auth_seqno_next(),
            AuthMethod::Cleartext { .. } => 0,
        };
        AuthEncodeCtx::new(method, seqno)
    });
    let data = packet.encode(&src, &dst, auth);

    Debug::PacketTx(&iface.name, &dst, &packet).log();
    iface.state.statistics.tx.incr(packet.hdr().pkt_type);

    let msg = NetTxPacketMsg {
        ifname: iface.name.clone(),
        src,
        dst,
        packet,
        data,
    };
    let _ = instance.tx.net_tx.send(msg.clone());
    msg
}
