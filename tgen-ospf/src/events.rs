//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::cmp::Ordering;
use std::collections::btree_map;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use chrono::Utc;
use tgen_utils::timer::TimerId;

use crate::collections::{
    Arena, InterfaceIndex, LsaEntryIndex, NeighborIndex,
};
use crate::debug::{Debug, LsaFlushReason, SeqNoMismatchReason};
use crate::error::{Error, InterfaceCfgError};
use crate::flood::{self, flood};
use crate::instance::{InstanceArenas, InstanceUpView, PendingEvent};
use crate::interface::{Interface, InterfaceType, ism};
use crate::lsdb::{self, LsaEntry, LsaSource, lsa_compare};
use crate::neighbor::{LastDbDesc, Neighbor, NeighborNetId, RxmtPacketType, nsm};
use crate::output;
use crate::packet::lsa::{Lsa, LsaScope};
use crate::packet::{
    DbDesc, DbDescFlags, Hello, LsAck, LsRequest, LsUpdate, Options, Packet,
    PacketType,
};
use crate::tasks::TimerKind;
use crate::version::Version;

// ===== Interface FSM event =====

pub(crate) fn process_ism_event(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    iface_idx: InterfaceIndex,
    event: ism::Event,
) {
    let Some(iface) = arenas.interfaces.get_mut(iface_idx) else {
        return;
    };

    // Neighbor changes are irrelevant once the interface went down.
    if iface.is_down() && event == ism::Event::NbrChange {
        return;
    }

    // Invoke FSM event.
    iface.fsm(
        instance,
        &mut arenas.neighbors,
        &mut arenas.lsa_entries,
        event,
    );
}

// ===== Neighbor FSM event =====

pub(crate) fn process_nsm_event(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    iface_idx: InterfaceIndex,
    nbr_idx: NeighborIndex,
    event: nsm::Event,
) {
    // Lookup interface and neighbor.
    let Some(iface) = arenas.interfaces.get_mut(iface_idx) else {
        return;
    };
    let Some(nbr) = arenas.neighbors.get_mut(nbr_idx) else {
        return;
    };

    // Invoke FSM event.
    nbr.fsm(iface, instance, &mut arenas.lsa_entries, event);
}

// ===== Network packet receipt =====

pub(crate) fn process_packet(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    iface_idx: InterfaceIndex,
    src: IpAddr,
    dst: IpAddr,
    data: &[u8],
) -> Result<(), Error> {
    let version = instance.config.version;
    let iface = &mut arenas.interfaces[iface_idx];

    // Ignore packets received on inoperational interfaces.
    if matches!(iface.state.ism_state, ism::State::Down | ism::State::Loopback)
    {
        return Ok(());
    }

    // Decode packet.
    let packet = match Packet::decode(
        version,
        data,
        &src,
        &dst,
        instance.config.auth.as_ref(),
    ) {
        Ok(packet) => packet,
        Err(error) => {
            iface.state.statistics.discarded += 1;
            return Err(Error::PacketDecodeError(error));
        }
    };

    // Check for Area ID mismatch.
    let pkt_type = packet.hdr().pkt_type;
    if packet.hdr().area_id != instance.config.area {
        iface.state.statistics.discarded += 1;
        return Err(Error::InterfaceCfgError(
            iface.name.clone(),
            src,
            pkt_type,
            InterfaceCfgError::AreaIdMismatch(
                packet.hdr().area_id,
                instance.config.area,
            ),
        ));
    }

    // OSPFv3: Instance ID mismatches are expected in normal operation and do
    // not constitute an error.
    if version == Version::Ospfv3
        && packet.hdr().instance_id != iface.config.instance_id
    {
        return Ok(());
    }

    // Perform authentication sequence number validation.
    let router_id = packet.hdr().router_id;
    let nbr_idx =
        get_neighbor(iface, version, &src, router_id, &arenas.neighbors);
    if let Some(auth_seqno) = packet.hdr().auth_seqno
        && let Some(nbr_idx) = nbr_idx
    {
        // Discard the packet if its sequence number is lower than the
        // recorded sequence number in the sender's neighbor data structure.
        let nbr = &mut arenas.neighbors[nbr_idx];
        if let Some(nbr_auth_seqno) = nbr.auth_seqno
            && auth_seqno < nbr_auth_seqno
        {
            iface.state.statistics.discarded += 1;
            return Err(Error::PacketAuthInvalidSeqno(src, auth_seqno));
        }

        // Update neighbor's last received sequence number.
        nbr.auth_seqno = Some(auth_seqno);
    }

    // Log received packet.
    Debug::PacketRx(&iface.name, &src, &dst, &packet).log();
    iface.state.statistics.rx.incr(pkt_type);

    if let Packet::Hello(pkt) = packet {
        return process_packet_hello(
            iface,
            instance,
            &mut arenas.neighbors,
            &mut arenas.lsa_entries,
            src,
            pkt,
        );
    }

    // Non-Hello packets not matching any known neighbor are discarded.
    let nbr_idx = nbr_idx.ok_or(Error::UnknownNeighbor(src, router_id))?;
    let nbr = &mut arenas.neighbors[nbr_idx];
    nbr.statistics.rx.incr(pkt_type);
    match packet {
        Packet::Hello(_) => unreachable!(),
        Packet::DbDesc(pkt) => process_packet_dbdesc(
            nbr,
            iface,
            instance,
            &mut arenas.lsa_entries,
            src,
            pkt,
        ),
        Packet::LsRequest(pkt) => process_packet_lsreq(
            nbr,
            iface,
            instance,
            &mut arenas.lsa_entries,
            pkt,
        ),
        Packet::LsUpdate(pkt) => {
            process_packet_lsupd(nbr_idx, iface_idx, instance, arenas, pkt)
        }
        Packet::LsAck(pkt) => process_packet_lsack(
            nbr,
            instance,
            &mut arenas.lsa_entries,
            pkt,
        ),
    }
}

fn process_packet_hello(
    iface: &mut Interface,
    instance: &mut InstanceUpView<'_>,
    neighbors: &mut Arena<Neighbor>,
    lsa_entries: &mut Arena<LsaEntry>,
    src: IpAddr,
    hello: Hello,
) -> Result<(), Error> {
    let version = instance.config.version;

    // Perform all the required sanity checks.
    process_packet_hello_sanity_checks(iface, instance, &hello).map_err(
        |error| {
            iface.state.statistics.discarded += 1;
            Error::InterfaceCfgError(
                iface.name.clone(),
                src,
                PacketType::Hello,
                error,
            )
        },
    )?;

    // Find or create new neighbor.
    let router_id = hello.hdr.router_id;
    let iface_id = (version == Version::Ospfv3).then_some(hello.iface_id);
    let hello_dr = hello.dr.map(NeighborNetId::from);
    let hello_bdr = hello.bdr.map(NeighborNetId::from);
    let nbr_idx =
        match get_neighbor(iface, version, &src, router_id, neighbors) {
            Some(nbr_idx) => nbr_idx,
            None => {
                // Create new neighbor.
                let net_id = neighbor_net_id(version, &src, router_id);
                let (nbr_idx, nbr) = iface.state.neighbors.insert(
                    neighbors, iface.idx, router_id, net_id, src,
                );

                // Initialize neighbor values.
                nbr.iface_id = iface_id;
                nbr.priority = hello.priority;
                if iface.is_broadcast_or_nbma() {
                    nbr.dr = hello_dr;
                    nbr.bdr = hello_bdr;
                }

                nbr_idx
            }
        };
    let nbr = &mut neighbors[nbr_idx];
    nbr.statistics.rx.incr(PacketType::Hello);

    // Update neighbor's source address.
    nbr.src = src;

    // Trigger the HelloReceived event.
    nbr.fsm(iface, instance, lsa_entries, nsm::Event::HelloRcvd);

    // Trigger the 1-WayReceived or the 2-WayReceived event.
    if hello.neighbors.contains(&instance.state.router_id) {
        nbr.fsm(iface, instance, lsa_entries, nsm::Event::TwoWayRcvd);
    } else {
        nbr.fsm(iface, instance, lsa_entries, nsm::Event::OneWayRcvd);

        // Update neighbor values.
        nbr.iface_id = iface_id;
        if iface.is_broadcast_or_nbma() {
            nbr.priority = hello.priority;
            nbr.dr = hello_dr;
            nbr.bdr = hello_bdr;
        }

        return Ok(());
    }

    // Check for Interface ID change.
    if iface_id != nbr.iface_id {
        nbr.iface_id = iface_id;

        // (Re)originate LSAs that might have been affected.
        if nbr.state == nsm::State::Full {
            instance.state.pending.push_back(
                PendingEvent::LsaOrig(
                    lsdb::LsaOriginateEvent::InterfaceStateChange(iface.idx),
                ),
            );
        }
    }

    // Examine rest of the Hello Packet (ignore Point-to-MultiPoint
    // interfaces as per errata 4022 of RFC 2328).
    if iface.is_broadcast_or_nbma() {
        let pending = &mut instance.state.pending;

        // Check for Router Priority change.
        if hello.priority != nbr.priority {
            nbr.priority = hello.priority;
            pending.push_back(PendingEvent::Ism(
                iface.idx,
                ism::Event::NbrChange,
            ));
        }

        // Check for DR/BDR changes.
        let nbr_net_id = nbr.net_id;
        if iface.state.ism_state == ism::State::Waiting
            && ((hello_dr == Some(nbr_net_id) && hello_bdr.is_none())
                || hello_bdr == Some(nbr_net_id))
        {
            pending.push_back(PendingEvent::Ism(
                iface.idx,
                ism::Event::BackupSeen,
            ));
        }
        if (hello_dr == Some(nbr_net_id)) != (nbr.dr == Some(nbr_net_id))
            || (hello_bdr == Some(nbr_net_id)) != (nbr.bdr == Some(nbr_net_id))
        {
            pending.push_back(PendingEvent::Ism(
                iface.idx,
                ism::Event::NbrChange,
            ));
        }

        // Update neighbor's DR/BDR.
        nbr.dr = hello_dr;
        nbr.bdr = hello_bdr;
    }

    Ok(())
}

fn process_packet_hello_sanity_checks(
    iface: &Interface,
    instance: &InstanceUpView<'_>,
    hello: &Hello,
) -> Result<(), InterfaceCfgError> {
    // OSPFv2: check for network mask mismatch (ignored on point-to-point
    // and virtual links).
    if instance.config.version == Version::Ospfv2
        && !matches!(
            iface.config.if_type,
            InterfaceType::PointToPoint | InterfaceType::VirtualLink
        )
    {
        let mask = iface
            .config
            .address
            .map(|addr| addr.mask())
            .unwrap_or(Ipv4Addr::UNSPECIFIED);
        if hello.network_mask != mask {
            return Err(InterfaceCfgError::HelloMaskMismatch(
                hello.network_mask,
                mask,
            ));
        }
    }

    // Check for HelloInterval mismatch.
    if hello.hello_interval != instance.config.hello_interval {
        return Err(InterfaceCfgError::HelloIntervalMismatch(
            hello.hello_interval,
            instance.config.hello_interval,
        ));
    }

    // Check for RouterDeadInterval mismatch.
    if hello.dead_interval != instance.config.dead_interval {
        return Err(InterfaceCfgError::DeadIntervalMismatch(
            hello.dead_interval,
            instance.config.dead_interval,
        ));
    }

    // Check for ExternalRoutingCapability mismatch.
    if !hello.options.contains(Options::E) {
        return Err(InterfaceCfgError::ExternalRoutingCapabilityMismatch(
            false,
        ));
    }

    // Check for duplicate Router ID.
    if hello.hdr.router_id == instance.state.router_id {
        return Err(InterfaceCfgError::DuplicateRouterId(hello.hdr.router_id));
    }

    Ok(())
}

fn process_packet_dbdesc(
    nbr: &mut Neighbor,
    iface: &mut Interface,
    instance: &mut InstanceUpView<'_>,
    lsa_entries: &mut Arena<LsaEntry>,
    src: IpAddr,
    dbdesc: DbDesc,
) -> Result<(), Error> {
    let version = instance.config.version;
    let router_id = dbdesc.hdr.router_id;

    // MTU mismatch check.
    if iface.config.if_type != InterfaceType::VirtualLink
        && dbdesc.mtu > iface.config.mtu
    {
        return Err(Error::InterfaceCfgError(
            iface.name.clone(),
            src,
            PacketType::DbDesc,
            InterfaceCfgError::MtuMismatch(dbdesc.mtu),
        ));
    }

    // Further processing depends on the neighbor's state.
    match nbr.state {
        nsm::State::Down | nsm::State::Attempt | nsm::State::TwoWay => {
            return Err(Error::DbDescReject(nbr.router_id, nbr.state));
        }
        nsm::State::Init | nsm::State::ExStart => {
            if nbr.state == nsm::State::Init {
                let event = nsm::Event::TwoWayRcvd;
                nbr.fsm(iface, instance, lsa_entries, event);
                if nbr.state != nsm::State::ExStart {
                    return Ok(());
                }
                // Fall through to the ExStart case.
            }

            if dbdesc
                .dd_flags
                .contains(DbDescFlags::I | DbDescFlags::M | DbDescFlags::MS)
                && dbdesc.lsa_hdrs.is_empty()
                && router_id > instance.state.router_id
            {
                // Set the master/slave bit to slave, and set the neighbor
                // data structure's DD sequence number to that specified by
                // the master.
                nbr.dd_flags.remove(DbDescFlags::MS);
                nbr.dd_seq_no = dbdesc.dd_seq_no;
            } else if !dbdesc
                .dd_flags
                .intersects(DbDescFlags::I | DbDescFlags::MS)
                && dbdesc.dd_seq_no == nbr.dd_seq_no
                && router_id < instance.state.router_id
            {
                // In this case the router is Master.
            } else {
                // Ignore the packet.
                return Ok(());
            }

            nbr.options = Some(dbdesc.options);
            let event = nsm::Event::NegotiationDone;
            nbr.fsm(iface, instance, lsa_entries, event);
        }
        nsm::State::Exchange => {
            // Check for duplicate packet.
            if nbr.dbdesc_is_dup(&dbdesc) {
                // The slave needs to retransmit the last Database Description
                // packet that it had sent.
                if !nbr.dd_flags.contains(DbDescFlags::MS) {
                    output::rxmt_dbdesc(nbr, iface, instance);
                }

                return Ok(());
            }

            // Sanity checks.
            let master = nbr.dd_flags.contains(DbDescFlags::MS);
            let reason = match &nbr.last_rcvd_dbdesc {
                Some(last) => {
                    let rcvd_ms = dbdesc.dd_flags.contains(DbDescFlags::MS);
                    let last_ms = last.dd_flags.contains(DbDescFlags::MS);
                    if dbdesc.dd_flags.contains(DbDescFlags::I)
                        || rcvd_ms != last_ms
                    {
                        Some(SeqNoMismatchReason::InconsistentFlags)
                    } else if dbdesc.options != last.options {
                        Some(SeqNoMismatchReason::InconsistentOptions)
                    } else if (master && dbdesc.dd_seq_no != nbr.dd_seq_no)
                        || (!master
                            && dbdesc.dd_seq_no
                                != nbr.dd_seq_no.wrapping_add(1))
                    {
                        Some(SeqNoMismatchReason::InconsistentSeqNo)
                    } else {
                        None
                    }
                }
                None => Some(SeqNoMismatchReason::UnexpectedDbDesc),
            };
            if let Some(reason) = reason {
                let event = nsm::Event::SeqNoMismatch(reason);
                nbr.fsm(iface, instance, lsa_entries, event);
                return Ok(());
            }
        }
        nsm::State::Loading | nsm::State::Full => {
            // Check for duplicate packet.
            if nbr.dbdesc_is_dup(&dbdesc) {
                // The slave must respond to duplicates by repeating the last
                // Database Description packet that it had sent.
                if !nbr.dd_flags.contains(DbDescFlags::MS) {
                    output::rxmt_dbdesc(nbr, iface, instance);
                }

                return Ok(());
            }

            let reason = SeqNoMismatchReason::UnexpectedDbDesc;
            let event = nsm::Event::SeqNoMismatch(reason);
            nbr.fsm(iface, instance, lsa_entries, event);
            return Ok(());
        }
    }

    // If we got this far it means the packet was accepted. Stop the
    // retransmission interval in case it's active.
    nbr.rxmt_dbdesc_stop(&mut instance.state.timers);

    // Now iterate over all LSA headers.
    let now = instance.state.now;
    for lsa_hdr in &dbdesc.lsa_hdrs {
        // Check if the LSA type is valid.
        if !lsa_hdr.lsa_type.is_valid(version) {
            let reason = SeqNoMismatchReason::InvalidLsaType;
            let event = nsm::Event::SeqNoMismatch(reason);
            nbr.fsm(iface, instance, lsa_entries, event);
            return Ok(());
        }

        // Put the LSA on the Link state request list if it's not present on
        // the LSDB, or if the local copy is less recent than the received
        // one.
        let lsa_key = lsa_hdr.key();
        if let Some((_, lse)) = instance.state.lsdb.get(lsa_entries, &lsa_key)
            && lsa_compare(&lse.data.hdr_at(now), lsa_hdr) != Ordering::Less
        {
            continue;
        }

        // Reset the adjacency when the request list can't hold the entry.
        if !nbr.request.contains_key(&lsa_key)
            && nbr.request.len() + nbr.request_pending.len()
                >= instance.config.max_queue_entries
        {
            Error::QueueFull(nbr.router_id, lsa_key).log();
            let reason = SeqNoMismatchReason::RequestListFull;
            let event = nsm::Event::SeqNoMismatch(reason);
            nbr.fsm(iface, instance, lsa_entries, event);
            return Ok(());
        }
        nbr.request.insert(lsa_key, *lsa_hdr);
    }

    // Start sending Link State Request packets.
    if !nbr.request.is_empty() && nbr.request_pending.is_empty() {
        output::send_lsreq(nbr, iface, instance);
    }

    // Further processing depends on whether the router is master or slave.
    let mut exchange_done = false;
    if nbr.dd_flags.contains(DbDescFlags::MS) {
        nbr.dd_seq_no = nbr.dd_seq_no.wrapping_add(1);

        if !nbr.dd_flags.contains(DbDescFlags::M)
            && !dbdesc.dd_flags.contains(DbDescFlags::M)
        {
            exchange_done = true;
        } else {
            output::send_dbdesc(nbr, iface, instance, lsa_entries);
        }
    } else {
        nbr.dd_seq_no = dbdesc.dd_seq_no;

        output::send_dbdesc(nbr, iface, instance, lsa_entries);

        if !nbr.dd_flags.contains(DbDescFlags::M)
            && !dbdesc.dd_flags.contains(DbDescFlags::M)
        {
            exchange_done = true;
        }
    }

    // Save last received Database Description packet.
    nbr.last_rcvd_dbdesc = Some(LastDbDesc {
        options: dbdesc.options,
        dd_flags: dbdesc.dd_flags,
        dd_seq_no: dbdesc.dd_seq_no,
    });

    if exchange_done {
        nbr.fsm(iface, instance, lsa_entries, nsm::Event::ExchangeDone);
    }

    Ok(())
}

fn process_packet_lsreq(
    nbr: &mut Neighbor,
    iface: &mut Interface,
    instance: &mut InstanceUpView<'_>,
    lsa_entries: &mut Arena<LsaEntry>,
    ls_req: LsRequest,
) -> Result<(), Error> {
    if nbr.state < nsm::State::Exchange {
        Debug::PacketRxIgnore(nbr.router_id, &nbr.state).log();
        return Ok(());
    }

    // Iterate over all request entries.
    let mut lsas = vec![];
    for lsa_key in &ls_req.entries {
        // Locate LSA in the LSDB.
        let lsa = instance
            .state
            .lsdb
            .get(lsa_entries, lsa_key)
            .filter(|(_, lse)| flood::lsa_in_scope(lse, iface))
            .map(|(_, lse)| lse.data.clone());
        match lsa {
            Some(lsa) => {
                // Copy LSA for transmission to the neighbor.
                lsas.push(lsa);
            }
            None => {
                // Something has gone wrong with the Database Exchange
                // process.
                nbr.fsm(iface, instance, lsa_entries, nsm::Event::BadLsReq);
                return Ok(());
            }
        }
    }

    // Send the requested LSAs.
    output::send_lsupd_direct(nbr, iface, instance, lsas);

    Ok(())
}

fn process_packet_lsupd(
    nbr_idx: NeighborIndex,
    iface_idx: InterfaceIndex,
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    ls_upd: LsUpdate,
) -> Result<(), Error> {
    let nbr = &arenas.neighbors[nbr_idx];
    if nbr.state < nsm::State::Exchange {
        Debug::PacketRxIgnore(nbr.router_id, &nbr.state).log();
        return Ok(());
    }

    // Process all LSAs contained in the packet.
    for lsa in ls_upd.lsas {
        let stop =
            process_packet_lsupd_lsa(nbr_idx, iface_idx, instance, arenas, lsa);
        if stop {
            break;
        }
    }

    Ok(())
}

// Processes a single LSA received in a Link State Update packet.
//
// Returns whether the processing of the remaining LSAs should stop.
fn process_packet_lsupd_lsa(
    nbr_idx: NeighborIndex,
    iface_idx: InterfaceIndex,
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    mut lsa: Lsa,
) -> bool {
    let version = instance.config.version;
    let now = instance.state.now;
    let nbr_router_id = arenas.neighbors[nbr_idx].router_id;
    let nbr_net_id = arenas.neighbors[nbr_idx].net_id;

    // (1) Validate the LSA (not only the checksum as specified by the RFC).
    if let Err(error) = lsa.validate(version) {
        // Log why the LSA is being discarded.
        Debug::LsaDiscard(nbr_router_id, &lsa.hdr, &error).log();

        // Examine the next LSA.
        return false;
    }

    // (2-3) Check if the LSA type is valid.
    if !lsa.hdr.lsa_type.is_valid(version) {
        // Examine the next LSA.
        return false;
    }

    // (5) Find the instance of this LSA that is currently contained in the
    // router's link state database.
    let lsa_key = lsa.hdr.key();
    let lse = instance
        .state
        .lsdb
        .get(&arenas.lsa_entries, &lsa_key)
        .map(|(lse_idx, lse)| (lse_idx, lse.data.clone(), lse.source));

    // (4) If the LSA's LS age is equal to MaxAge, and there is currently no
    // instance of the LSA in the router's link state database, and none of
    // router's neighbors are in states Exchange or Loading.
    if lsa.hdr.is_maxage()
        && lse.is_none()
        && !arenas.neighbors.iter().any(|(_, nbr)| {
            matches!(nbr.state, nsm::State::Exchange | nsm::State::Loading)
        })
    {
        // Acknowledge the receipt of the LSA.
        let nbr = &mut arenas.neighbors[nbr_idx];
        let iface = &mut arenas.interfaces[iface_idx];
        output::send_lsack_direct(nbr, iface, instance, &lsa.hdr);

        // Examine the next LSA.
        return false;
    }

    // (5 cont.) There is no database copy, or the received LSA is more
    // recent than the database copy.
    let lsa_cmp = lse
        .as_ref()
        .map(|(_, old_lsa, _)| lsa_compare(&old_lsa.hdr_at(now), &lsa.hdr));
    if matches!(lsa_cmp, None | Some(Ordering::Less)) {
        let lsa_iface_idx = (lsa.hdr.lsa_type.scope(version) == LsaScope::Link)
            .then_some(iface_idx);

        // (5.d) Install the new LSA in the link state database (replacing
        // the current database copy). The installation process takes care of
        // removing the old copy from all Link state retransmission lists.
        lsa.base_time = Some(now);
        let lse_idx = match lsdb::install(
            instance,
            arenas,
            lsa_iface_idx,
            Arc::new(lsa),
            LsaSource::Adjacency,
        ) {
            Ok(lse_idx) => lse_idx,
            Err(error) => {
                // The LSA is refused and thus not acknowledged.
                error.log();
                return false;
            }
        };

        // (5.b) Immediately flood the new LSA out some subset of the
        // router's interfaces.
        let flooded_back =
            flood(instance, arenas, lse_idx, Some((iface_idx, nbr_idx)));

        // Update statistics.
        instance.state.rx_lsa_count += 1;
        instance.state.discontinuity_time = Utc::now();

        // (5.e) Possibly acknowledge the receipt of the LSA by sending a
        // Link State Acknowledgment packet.
        let lsa_hdr = arenas.lsa_entries[lse_idx].data.hdr;
        let nbr = &mut arenas.neighbors[nbr_idx];
        let iface = &mut arenas.interfaces[iface_idx];
        if !flooded_back
            && (iface.state.ism_state != ism::State::Backup
                || iface.state.dr == Some(nbr_net_id))
        {
            output::enqueue_delayed_ack(nbr, iface, instance, &lsa_hdr);
        }

        // (5.f) Check if this is a self-originated LSA.
        if lsa_hdr.adv_rtr == instance.state.router_id {
            Debug::LsaSelfOriginated(nbr_router_id, &lsa_hdr).log();
            process_self_originated_lsa(instance, arenas, lse_idx, lse);
        }

        // Examine the next LSA.
        return false;
    }
    let Some((lse_idx, old_lsa, _)) = lse else {
        return false;
    };
    let nbr = &mut arenas.neighbors[nbr_idx];
    let iface = &mut arenas.interfaces[iface_idx];

    // (6 - errata 3974) Check if the received LSA is the same instance as
    // the database copy (i.e., neither one is more recent).
    if lsa_cmp == Some(Ordering::Equal) {
        // Check if this LSA can be handled as an implied acknowledgment.
        if nbr.flood.remove(&lsa_key).is_some() {
            let lse = &mut arenas.lsa_entries[lse_idx];
            lse.refcount = lse.refcount.saturating_sub(1);
            nbr.rxmt_lsupd_stop_check(&mut instance.state.timers);

            if iface.state.ism_state == ism::State::Backup
                && iface.state.dr == Some(nbr.net_id)
            {
                output::enqueue_delayed_ack(nbr, iface, instance, &lsa.hdr);
            }
        } else {
            // Send direct ack.
            output::send_lsack_direct(nbr, iface, instance, &lsa.hdr);
        }

        // Examine the next LSA.
        return false;
    }

    // (7 - errata 3974) If there is an instance of the LSA on the sending
    // neighbor's Link state request list, an error has occurred in the
    // Database Exchange process.
    if nbr.request.contains_key(&lsa_key)
        || nbr.request_pending.contains_key(&lsa_key)
    {
        // Restart the Database Exchange process.
        let event = nsm::Event::BadLsReq;
        nbr.fsm(iface, instance, &mut arenas.lsa_entries, event);

        // Stop processing the Link State Update packet.
        return true;
    }

    // (8) The database copy is more recent.
    //
    // If the database copy has LS age equal to MaxAge and LS sequence number
    // equal to MaxSequenceNumber, simply discard the received LSA without
    // acknowledging it.
    if old_lsa.hdr.is_maxage() && old_lsa.hdr.seq_no == lsdb::LSA_MAX_SEQ_NO {
        // Examine the next LSA.
        return false;
    }

    // Send the database copy back to the sending neighbor, encapsulated
    // within a Link State Update Packet.
    output::send_lsupd_direct(nbr, iface, instance, vec![old_lsa]);

    // Examine the next LSA.
    false
}

fn process_self_originated_lsa(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    lse_idx: LsaEntryIndex,
    old: Option<(LsaEntryIndex, Arc<Lsa>, LsaSource)>,
) {
    let lse = &arenas.lsa_entries[lse_idx];
    let rcvd_seq_no = lse.data.hdr.seq_no;
    let iface_idx = lse.iface_idx;

    let result = match old {
        // Advance the sequence number past the received instance, keeping
        // the contents of the local copy.
        Some((
            _,
            old_lsa,
            source @ (LsaSource::SelfOriginated | LsaSource::External),
        )) if !instance.state.teardown => {
            lsdb::originate_next(
                instance,
                arenas,
                iface_idx,
                source,
                Some(rcvd_seq_no),
                old_lsa.hdr.options,
                old_lsa.hdr.key(),
                old_lsa.body.clone(),
            )
        }
        // The LSA is no longer originated by this router.
        _ => {
            let reason = LsaFlushReason::PrematureAging;
            lsdb::flush(instance, arenas, lse_idx, reason)
        }
    };
    if let Err(error) = result {
        error.log();
    }
}

fn process_packet_lsack(
    nbr: &mut Neighbor,
    instance: &mut InstanceUpView<'_>,
    lsa_entries: &mut Arena<LsaEntry>,
    ls_ack: LsAck,
) -> Result<(), Error> {
    if nbr.state < nsm::State::Exchange {
        Debug::PacketRxIgnore(nbr.router_id, &nbr.state).log();
        return Ok(());
    }

    // Iterate over all LSA headers.
    let now = instance.state.now;
    for lsa_hdr in &ls_ack.lsa_hdrs {
        let lsa_key = lsa_hdr.key();
        if let btree_map::Entry::Occupied(o) = nbr.flood.entry(lsa_key) {
            let entry = o.get();
            if lsa_compare(&entry.lsa.hdr_at(now), lsa_hdr) == Ordering::Equal {
                o.remove();
                if let Some((_, lse)) =
                    instance.state.lsdb.get_mut(lsa_entries, &lsa_key)
                {
                    lse.refcount = lse.refcount.saturating_sub(1);
                }
                nbr.rxmt_lsupd_stop_check(&mut instance.state.timers);
            } else {
                Debug::QuestionableAck(nbr.router_id, lsa_hdr).log();
            }
        }
    }

    Ok(())
}

// ===== Timer expiration =====

pub(crate) fn process_timer(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    timer: TimerId,
    kind: TimerKind,
) -> Result<(), Error> {
    match kind {
        TimerKind::HelloInterval(iface_idx) => {
            if let Some(iface) = arenas.interfaces.get_mut(iface_idx)
                && iface.state.tasks.hello_interval == Some(timer)
            {
                output::send_hello(iface, instance, &arenas.neighbors);
            }
        }
        TimerKind::WaitTimer(iface_idx) => {
            if let Some(iface) = arenas.interfaces.get_mut(iface_idx)
                && iface.state.tasks.wait_timer == Some(timer)
            {
                iface.state.tasks.wait_timer = None;
                iface.fsm(
                    instance,
                    &mut arenas.neighbors,
                    &mut arenas.lsa_entries,
                    ism::Event::WaitTimer,
                );
            }
        }
        TimerKind::NbrInactivity(iface_idx, nbr_idx) => {
            if let Some(iface) = arenas.interfaces.get_mut(iface_idx)
                && let Some(nbr) = arenas.neighbors.get_mut(nbr_idx)
                && nbr.tasks.inactivity_timer == Some(timer)
            {
                nbr.tasks.inactivity_timer = None;
                let event = nsm::Event::InactivityTimer;
                nbr.fsm(iface, instance, &mut arenas.lsa_entries, event);
            }
        }
        TimerKind::NbrRxmt(iface_idx, nbr_idx, packet_type) => {
            if let Some(iface) = arenas.interfaces.get_mut(iface_idx)
                && let Some(nbr) = arenas.neighbors.get_mut(nbr_idx)
            {
                match packet_type {
                    RxmtPacketType::DbDesc
                        if nbr.tasks.rxmt_dbdesc == Some(timer) =>
                    {
                        output::rxmt_dbdesc(nbr, iface, instance);
                    }
                    RxmtPacketType::LsRequest
                        if nbr.tasks.rxmt_lsreq == Some(timer) =>
                    {
                        output::rxmt_lsreq(nbr, iface, instance);
                    }
                    RxmtPacketType::LsUpdate
                        if nbr.tasks.rxmt_lsupd == Some(timer) =>
                    {
                        output::rxmt_lsupd(nbr, iface, instance);
                    }
                    _ => (),
                }
            }
        }
        TimerKind::NbrLsUpdate(iface_idx, nbr_idx) => {
            if let Some(iface) = arenas.interfaces.get_mut(iface_idx)
                && let Some(nbr) = arenas.neighbors.get_mut(nbr_idx)
                && nbr.tasks.ls_update_timer == Some(timer)
            {
                nbr.tasks.ls_update_timer = None;
                output::send_lsupd_queued(nbr, iface, instance);
            }
        }
        TimerKind::NbrDelayedAck(iface_idx, nbr_idx) => {
            if let Some(iface) = arenas.interfaces.get_mut(iface_idx)
                && let Some(nbr) = arenas.neighbors.get_mut(nbr_idx)
                && nbr.tasks.delayed_ack_timer == Some(timer)
            {
                nbr.tasks.delayed_ack_timer = None;
                output::send_lsack_delayed(nbr, iface, instance);
            }
        }
        TimerKind::LsaExpiry(lse_idx) => {
            if arenas
                .lsa_entries
                .get(lse_idx)
                .is_some_and(|lse| lse.expiry_timer == Some(timer))
            {
                lsdb::expire(instance, arenas, lse_idx)?;
            }
        }
        TimerKind::LsaRefresh(lse_idx) => {
            if arenas
                .lsa_entries
                .get(lse_idx)
                .is_some_and(|lse| lse.refresh_timer == Some(timer))
            {
                lsdb::refresh(instance, arenas, lse_idx)?;
            }
        }
        TimerKind::LsdbGc => {
            if instance.state.tasks.gc_interval == Some(timer) {
                lsdb::gc(instance, arenas);
            }
        }
        // Handled by the instance itself.
        TimerKind::Teardown => (),
    }

    Ok(())
}

// ===== helper functions =====

// Returns the neighbor that sent a packet.
//
// OSPFv2 neighbors on multi-access networks are identified by their source
// addresses, all others by their Router IDs.
fn get_neighbor(
    iface: &Interface,
    version: Version,
    src: &IpAddr,
    router_id: Ipv4Addr,
    neighbors: &Arena<Neighbor>,
) -> Option<NeighborIndex> {
    match (version, iface.config.if_type) {
        (
            Version::Ospfv2,
            InterfaceType::Broadcast
            | InterfaceType::NonBroadcast
            | InterfaceType::PointToMultipoint,
        ) => {
            let net_id = neighbor_net_id(version, src, router_id);
            iface.state.neighbors.get_by_net_id(neighbors, net_id)
        }
        _ => iface.state.neighbors.get_by_router_id(neighbors, router_id),
    }
    .map(|(nbr_idx, _)| nbr_idx)
}

fn neighbor_net_id(
    version: Version,
    src: &IpAddr,
    router_id: Ipv4Addr,
) -> NeighborNetId {
    match (version, src) {
        (Version::Ospfv2, IpAddr::V4(addr)) => (*addr).into(),
        _ => router_id.into(),
    }
}
