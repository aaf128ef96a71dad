//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::cmp::Ordering;
use std::net::Ipv4Addr;
use std::sync::Arc;

use bitflags::bitflags;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tgen_utils::timer::{TimerId, TimerQueue};

use crate::collections::{InterfaceIndex, LsaEntryIndex};
use crate::debug::{Debug, LsaFlushReason};
use crate::error::Error;
use crate::flood::flood;
use crate::instance::{InstanceArenas, InstanceUpView};
use crate::interface::{Interface, InterfaceType, ism};
use crate::neighbor::nsm;
use crate::packet::Options;
use crate::packet::lsa::{
    Lsa, LsaBody, LsaHdr, LsaKey, LsaNetwork, LsaRouter, LsaRouterFlags,
    LsaRouterLink, LsaRouterLinkType, LsaType,
};
use crate::tasks::{self, TimerKind};
use crate::version::Version;

// Architectural Constants.
pub const LSA_REFRESH_TIME: u16 = 1800;
pub const LSA_MAX_AGE: u16 = 3600;
pub const LSA_MAX_AGE_DIFF: u16 = 900;
pub const LSA_INIT_SEQ_NO: u32 = 0x80000001;
pub const LSA_MAX_SEQ_NO: u32 = 0x7fffffff;
pub const LSA_RESERVED_SEQ_NO: u32 = 0x80000000;
pub const MAX_LINK_METRIC: u16 = 0xffff;

#[derive(Debug)]
pub struct LsaEntry {
    // LSA data.
    pub data: Arc<Lsa>,
    // Where the LSA came from.
    pub source: LsaSource,
    // Interface of link-scope LSAs.
    pub iface_idx: Option<InterfaceIndex>,
    // Number of neighbor flood queue entries referencing this LSA.
    pub refcount: usize,
    // Expiry timer that triggers when the LSA age reaches MaxAge.
    pub expiry_timer: Option<TimerId>,
    // Refresh timer that triggers every LSA_REFRESH_TIME seconds.
    pub refresh_timer: Option<TimerId>,
    // LSA entry flags.
    pub flags: LsaEntryFlags,
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct LsaEntryFlags: u8 {
        const EXPIRED = 0x01;
        const DELETED = 0x02;
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LsaSource {
    SelfOriginated,
    Adjacency,
    External,
}

// LSA waiting to be originated once the flushed instance with the maximum
// sequence number is gone.
#[derive(Debug)]
pub struct LsaDelayedOrig {
    pub data: Lsa,
    pub source: LsaSource,
    pub iface_idx: Option<InterfaceIndex>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LsaInstallResult {
    Accepted(LsaEntryIndex),
    Rejected { duplicate: bool },
    Invalid(crate::packet::error::LsaValidationError),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LsaOriginateEvent {
    InstanceStart,
    InterfaceStateChange(InterfaceIndex),
    InterfaceDrChange(InterfaceIndex),
    NeighborToFromFull(InterfaceIndex),
    OverloadChange,
}

// ===== impl LsaEntry =====

impl LsaEntry {
    pub(crate) fn new(
        data: Arc<Lsa>,
        source: LsaSource,
        iface_idx: Option<InterfaceIndex>,
    ) -> LsaEntry {
        LsaEntry {
            data,
            source,
            iface_idx,
            refcount: 0,
            expiry_timer: None,
            refresh_timer: None,
            flags: Default::default(),
        }
    }

    pub(crate) fn is_self_originated(&self) -> bool {
        matches!(self.source, LsaSource::SelfOriginated | LsaSource::External)
    }

    fn timers_cancel(&mut self, timers: &mut TimerQueue<TimerKind>) {
        if let Some(timer) = self.expiry_timer.take() {
            timers.cancel(timer);
        }
        if let Some(timer) = self.refresh_timer.take() {
            timers.cancel(timer);
        }
    }
}

// ===== global functions =====

// Compares which LSA is more recent according to the rules specified in Section
// 13.1 of RFC 2328.
//
// Returns:
// - Ordering::Greater when `a` is more recent
// - Ordering::Less when `b` is more recent
// - Ordering::Equal when the two LSAs are considered to be identical
pub fn lsa_compare(a: &LsaHdr, b: &LsaHdr) -> Ordering {
    let a_seq_no = a.seq_no as i32;
    let b_seq_no = b.seq_no as i32;
    let cmp = a_seq_no.cmp(&b_seq_no);
    if cmp != Ordering::Equal {
        return cmp;
    }

    let cmp = a.cksum.cmp(&b.cksum);
    if cmp != Ordering::Equal {
        return cmp;
    }

    if a.is_maxage() && !b.is_maxage() {
        return Ordering::Greater;
    } else if !a.is_maxage() && b.is_maxage() {
        return Ordering::Less;
    }

    if a.age.abs_diff(b.age) > LSA_MAX_AGE_DIFF {
        return b.age.cmp(&a.age);
    }

    Ordering::Equal
}

// Installs the provided LSA in the LSDB, replacing the existing instance (if
// any).
pub(crate) fn install(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    iface_idx: Option<InterfaceIndex>,
    lsa: Arc<Lsa>,
    source: LsaSource,
) -> Result<LsaEntryIndex, Error> {
    let lsa_key = lsa.hdr.key();
    let lse_idx = match instance.state.lsdb.get(&arenas.lsa_entries, &lsa_key)
    {
        Some((lse_idx, _)) => {
            // Remove old instance from all neighbors' flood queues.
            flood_queues_remove(instance, arenas, &lsa_key);

            let lse = &mut arenas.lsa_entries[lse_idx];
            lse.timers_cancel(&mut instance.state.timers);
            lse.data = lsa;
            lse.source = source;
            lse.iface_idx = iface_idx;
            lse.flags = LsaEntryFlags::empty();
            lse_idx
        }
        None => {
            if instance.state.lsdb.len() >= instance.config.max_lsdb_entries {
                return Err(Error::LsdbFull(lsa_key));
            }

            let lse = LsaEntry::new(lsa, source, iface_idx);
            let (lse_idx, _) =
                instance.state.lsdb.insert(&mut arenas.lsa_entries, lse);
            lse_idx
        }
    };

    let lse = &mut arenas.lsa_entries[lse_idx];
    Debug::LsaInstall(&lse.data.hdr).log();

    // Schedule LSA aging and refreshing.
    let now = instance.state.now;
    let age = lse.data.age(now);
    if age >= LSA_MAX_AGE {
        lse.flags.insert(LsaEntryFlags::EXPIRED);
    } else {
        let timers = &mut instance.state.timers;
        lse.expiry_timer =
            Some(tasks::lsa_expiry_timer(timers, now, lse_idx, age));
        if lse.is_self_originated() {
            lse.refresh_timer =
                Some(tasks::lsa_refresh_timer(timers, now, lse_idx, age));
        }
    }

    Ok(lse_idx)
}

// Installs the provided LSA if it's valid and more recent than the database
// copy.
pub(crate) fn insert_or_update(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    iface_idx: Option<InterfaceIndex>,
    mut lsa: Lsa,
    source: LsaSource,
) -> Result<LsaInstallResult, Error> {
    if let Err(error) = lsa.validate(instance.config.version) {
        return Ok(LsaInstallResult::Invalid(error));
    }

    let now = instance.state.now;
    if let Some((_, lse)) =
        instance.state.lsdb.get(&arenas.lsa_entries, &lsa.hdr.key())
    {
        match lsa_compare(&lse.data.hdr_at(now), &lsa.hdr) {
            Ordering::Greater => {
                return Ok(LsaInstallResult::Rejected { duplicate: false });
            }
            Ordering::Equal => {
                return Ok(LsaInstallResult::Rejected { duplicate: true });
            }
            Ordering::Less => (),
        }
    }

    // Start aging the LSA.
    if lsa.base_time.is_none() {
        lsa.base_time = Some(now);
    }

    let lse_idx = install(instance, arenas, iface_idx, Arc::new(lsa), source)?;
    Ok(LsaInstallResult::Accepted(lse_idx))
}

// Originates a self-originated LSA, unless an identical instance is already
// present in the LSDB.
pub(crate) fn originate(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    iface_idx: Option<InterfaceIndex>,
    options: Options,
    lsa_type: LsaType,
    lsa_id: Ipv4Addr,
    body: LsaBody,
) -> Result<(), Error> {
    let adv_rtr = instance.state.router_id;
    let lsa_key = LsaKey::new(lsa_type, lsa_id, adv_rtr);
    let version = instance.config.version;

    // While the sequence number is wrapping, only update the LSA that will be
    // originated later.
    if let Some(ldo) = instance.state.lsdb.seqno_wrapping.get_mut(&lsa_key) {
        ldo.data = Lsa::new(
            version,
            0,
            options,
            lsa_type,
            lsa_id,
            adv_rtr,
            LSA_INIT_SEQ_NO,
            body,
        );
        return Ok(());
    }

    let mut old_seq_no = None;
    if let Some((_, old_lse)) =
        instance.state.lsdb.get(&arenas.lsa_entries, &lsa_key)
    {
        // If an LSA with identical contents already exists in the LSDB, skip
        // originating a new one.
        let old_lsa = &old_lse.data;
        if !old_lsa.hdr.is_maxage()
            && !old_lse.flags.contains(LsaEntryFlags::EXPIRED)
            && old_lsa.hdr.options == options
            && old_lsa.body == body
        {
            return Ok(());
        }
        old_seq_no = Some(old_lsa.hdr.seq_no);
    }

    originate_next(
        instance,
        arenas,
        iface_idx,
        LsaSource::SelfOriginated,
        old_seq_no,
        options,
        lsa_key,
        body,
    )
}

// Originates the next instance of an LSA, given the sequence number of the
// current instance.
//
// When an attempt is made to increment the sequence number past the maximum
// value, the current instance is flushed first. The new instance is originated
// with the initial sequence number once the flushed one is gone.
pub(crate) fn originate_next(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    iface_idx: Option<InterfaceIndex>,
    source: LsaSource,
    old_seq_no: Option<u32>,
    options: Options,
    lsa_key: LsaKey,
    body: LsaBody,
) -> Result<(), Error> {
    let version = instance.config.version;
    let seq_no = match old_seq_no {
        Some(LSA_MAX_SEQ_NO) => {
            let lsa = Lsa::new(
                version,
                0,
                options,
                lsa_key.lsa_type,
                lsa_key.lsa_id,
                lsa_key.adv_rtr,
                LSA_INIT_SEQ_NO,
                body,
            );
            Debug::LsaSeqNoWrap(&lsa.hdr).log();
            instance.state.lsdb.seqno_wrapping.insert(
                lsa_key,
                LsaDelayedOrig {
                    data: lsa,
                    source,
                    iface_idx,
                },
            );

            if let Some((lse_idx, _)) =
                instance.state.lsdb.get(&arenas.lsa_entries, &lsa_key)
            {
                flush(instance, arenas, lse_idx, LsaFlushReason::SeqNoWrap)?;
            }
            return Ok(());
        }
        Some(seq_no) => seq_no.wrapping_add(1),
        None => LSA_INIT_SEQ_NO,
    };

    let lsa = Lsa::new(
        version,
        0,
        options,
        lsa_key.lsa_type,
        lsa_key.lsa_id,
        lsa_key.adv_rtr,
        seq_no,
        body,
    );
    originate_lsa(instance, arenas, iface_idx, lsa, source)
}

// Installs and floods a newly built LSA.
fn originate_lsa(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    iface_idx: Option<InterfaceIndex>,
    mut lsa: Lsa,
    source: LsaSource,
) -> Result<(), Error> {
    Debug::LsaOriginate(&lsa.hdr).log();

    lsa.base_time = Some(instance.state.now);
    let lse_idx = install(instance, arenas, iface_idx, Arc::new(lsa), source)?;
    flood(instance, arenas, lse_idx, None);

    // Update statistics.
    instance.state.orig_lsa_count += 1;
    instance.state.discontinuity_time = Utc::now();

    Ok(())
}

// Flushes LSA from the routing domain by setting its age to MaxAge and
// reflooding it.
pub(crate) fn flush(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    lse_idx: LsaEntryIndex,
    reason: LsaFlushReason,
) -> Result<(), Error> {
    // Do not flush the same LSA more than once.
    let lse = &mut arenas.lsa_entries[lse_idx];
    if lse.data.hdr.is_maxage() {
        return Ok(());
    }

    Debug::LsaFlush(&lse.data.hdr, reason).log();

    // Set the LSA age to MaxAge.
    let mut lsa = (*lse.data).clone();
    lsa.set_maxage(instance.state.now);
    let source = lse.source;
    let iface_idx = lse.iface_idx;

    // Install updated LSA to clear the flood queues and disarm timers.
    let lse_idx = install(instance, arenas, iface_idx, Arc::new(lsa), source)?;

    // Reflood updated LSA.
    flood(instance, arenas, lse_idx, None);

    Ok(())
}

// Flushes all self-originated and externally injected LSAs from the LSDB.
pub(crate) fn flush_all_self_originated(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
) {
    let lse_idxs = instance
        .state
        .lsdb
        .iter(&arenas.lsa_entries)
        .filter(|(_, lse)| lse.is_self_originated())
        .map(|(lse_idx, _)| lse_idx)
        .collect::<Vec<_>>();

    // Pending originations must not resurrect flushed LSAs.
    instance.state.lsdb.seqno_wrapping.clear();

    for lse_idx in lse_idxs {
        let reason = LsaFlushReason::PrematureAging;
        if let Err(error) = flush(instance, arenas, lse_idx, reason) {
            error.log();
        }
    }
}

// Handles an LSA reaching MaxAge.
pub(crate) fn expire(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    lse_idx: LsaEntryIndex,
) -> Result<(), Error> {
    let lse = &mut arenas.lsa_entries[lse_idx];
    lse.expiry_timer = None;

    if lse.is_self_originated() {
        flush(instance, arenas, lse_idx, LsaFlushReason::Expiry)
    } else {
        // Learned LSAs are removed once no flood queue references them.
        lse.flags.insert(LsaEntryFlags::EXPIRED);
        Ok(())
    }
}

// Reoriginates a self-originated LSA with the next sequence number.
pub(crate) fn refresh(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    lse_idx: LsaEntryIndex,
) -> Result<(), Error> {
    let lse = &mut arenas.lsa_entries[lse_idx];
    lse.refresh_timer = None;

    // LSAs are flushed, not refreshed, during teardown.
    if instance.state.teardown {
        return Ok(());
    }

    Debug::LsaRefresh(&lse.data.hdr).log();

    let lsa = lse.data.clone();
    let (source, iface_idx) = (lse.source, lse.iface_idx);
    originate_next(
        instance,
        arenas,
        iface_idx,
        source,
        Some(lsa.hdr.seq_no),
        lsa.hdr.options,
        lsa.hdr.key(),
        lsa.body.clone(),
    )
}

// Removes unreferenced MaxAge LSAs from the LSDB.
//
// Removal happens in two steps: expired LSAs without flood queue references
// are first marked as deleted, and then removed in the following run.
pub(crate) fn gc(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
) {
    // Removing LSAs while a database exchange is in progress could cause the
    // removed LSAs to be requested again.
    if arenas.neighbors.iter().any(|(_, nbr)| {
        matches!(nbr.state, nsm::State::Exchange | nsm::State::Loading)
    }) {
        return;
    }

    let mut removed = 0;
    let mut marked = 0;
    for lse_idx in instance.state.lsdb.indexes() {
        let lse = &mut arenas.lsa_entries[lse_idx];
        if lse.refcount > 0 {
            continue;
        }

        if lse.flags.contains(LsaEntryFlags::DELETED) {
            Debug::LsaDelete(&lse.data.hdr).log();
            instance.state.lsdb.delete(&mut arenas.lsa_entries, lse_idx);
            removed += 1;
        } else if lse.flags.contains(LsaEntryFlags::EXPIRED) {
            lse.flags.insert(LsaEntryFlags::DELETED);
            lse.timers_cancel(&mut instance.state.timers);
            marked += 1;
        }
    }

    // Originate LSAs whose sequence number wrapped, as long as the flushed
    // instance is gone.
    let wrapped = instance
        .state
        .lsdb
        .seqno_wrapping
        .keys()
        .copied()
        .filter(|lsa_key| {
            match instance.state.lsdb.get(&arenas.lsa_entries, lsa_key) {
                Some((_, lse)) => lse.flags.contains(LsaEntryFlags::DELETED),
                None => true,
            }
        })
        .collect::<Vec<_>>();
    for lsa_key in wrapped {
        if let Some(ldo) = instance.state.lsdb.seqno_wrapping.remove(&lsa_key)
            && let Err(error) = originate_lsa(
                instance,
                arenas,
                ldo.iface_idx,
                ldo.data,
                ldo.source,
            )
        {
            error.log();
        }
    }

    if removed > 0 || marked > 0 {
        Debug::LsdbGc(removed, marked).log();
    }
}

// (Re)originates or flushes the LSAs affected by the given event.
pub(crate) fn lsa_orig_event(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    event: LsaOriginateEvent,
) -> Result<(), Error> {
    // Self-originated LSAs are only flushed during teardown.
    if instance.state.teardown {
        return Ok(());
    }

    match event {
        LsaOriginateEvent::InstanceStart
        | LsaOriginateEvent::OverloadChange => {
            lsa_orig_router(instance, arenas)?;
        }
        LsaOriginateEvent::InterfaceStateChange(iface_idx)
        | LsaOriginateEvent::InterfaceDrChange(iface_idx)
        | LsaOriginateEvent::NeighborToFromFull(iface_idx) => {
            lsa_orig_router(instance, arenas)?;
            lsa_orig_network(instance, arenas, iface_idx)?;
        }
    }

    Ok(())
}

// ===== helper functions =====

// Removes the given LSA from all neighbors' flood queues, releasing the
// references held on the LSDB entry.
fn flood_queues_remove(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    lsa_key: &LsaKey,
) {
    let mut released = 0;
    for (_, nbr) in arenas.neighbors.iter_mut() {
        if nbr.flood.remove(lsa_key).is_some() {
            released += 1;
            nbr.rxmt_lsupd_stop_check(&mut instance.state.timers);
        }
    }

    if released > 0
        && let Some((_, lse)) =
            instance.state.lsdb.get_mut(&mut arenas.lsa_entries, lsa_key)
    {
        lse.refcount = lse.refcount.saturating_sub(released);
    }
}

fn lsa_orig_router(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
) -> Result<(), Error> {
    let version = instance.config.version;
    let router_id = instance.state.router_id;

    let mut links = vec![];
    for (_, iface) in arenas.interfaces.iter() {
        router_links_iface(instance, arenas, iface, &mut links);
    }

    // Point-to-point links to emulated routers behind this instance.
    for conn in &instance.config.external_connections {
        links.push(LsaRouterLink::new(
            LsaRouterLinkType::PointToPoint,
            conn.router_id,
            router_id,
            0,
            0,
            conn.metric,
        ));
    }

    // Advertise maximum metrics while overloaded.
    if instance.state.overload {
        for link in &mut links {
            link.metric = MAX_LINK_METRIC;
        }
    }

    let (options, body_options, lsa_id) = match version {
        Version::Ospfv2 => (Options::E, Options::empty(), router_id),
        Version::Ospfv3 => (
            Options::empty(),
            Options::V6 | Options::E | Options::R,
            Ipv4Addr::UNSPECIFIED,
        ),
    };
    let body = LsaBody::Router(LsaRouter::new(
        LsaRouterFlags::empty(),
        body_options,
        links,
    ));
    originate(
        instance,
        arenas,
        None,
        options,
        LsaType::router(version),
        lsa_id,
        body,
    )
}

fn router_links_iface(
    instance: &InstanceUpView<'_>,
    arenas: &InstanceArenas,
    iface: &Interface,
    links: &mut Vec<LsaRouterLink>,
) {
    let version = instance.config.version;
    let router_id = instance.state.router_id;
    let metric = iface.config.metric;
    let addr = iface.config.address;
    let full_nbrs = iface
        .state
        .neighbors
        .iter(&arenas.neighbors)
        .filter(|nbr| nbr.state == nsm::State::Full);

    match iface.state.ism_state {
        ism::State::Down => (),
        ism::State::Loopback => {
            // OSPFv2: host route to the interface address.
            if let (Version::Ospfv2, Some(addr)) = (version, addr) {
                links.push(LsaRouterLink::new(
                    LsaRouterLinkType::StubNetwork,
                    addr.ip(),
                    Ipv4Addr::BROADCAST,
                    0,
                    0,
                    0,
                ));
            }
        }
        ism::State::PointToPoint => {
            let link_type = match iface.config.if_type {
                InterfaceType::VirtualLink => LsaRouterLinkType::VirtualLink,
                _ => LsaRouterLinkType::PointToPoint,
            };
            for nbr in full_nbrs {
                let link_data = addr
                    .map(|addr| addr.ip())
                    .unwrap_or(Ipv4Addr::UNSPECIFIED);
                links.push(LsaRouterLink::new(
                    link_type,
                    nbr.router_id,
                    link_data,
                    iface.config.ifindex,
                    nbr.iface_id.unwrap_or(0),
                    metric,
                ));
            }

            // OSPFv2: stub link to the subnet (or to the host address on
            // point-to-multipoint networks).
            if let (Version::Ospfv2, Some(addr)) = (version, addr) {
                match iface.config.if_type {
                    InterfaceType::PointToPoint => {
                        let link =
                            stub_link(addr.network(), addr.mask(), metric);
                        links.push(link);
                    }
                    InterfaceType::PointToMultipoint => {
                        let link =
                            stub_link(addr.ip(), Ipv4Addr::BROADCAST, 0);
                        links.push(link);
                    }
                    _ => (),
                }
            }
        }
        ism::State::Waiting
        | ism::State::DrOther
        | ism::State::Backup
        | ism::State::Dr => {
            let net_id = iface.network_id(version, router_id);
            let transit = iface.state.ism_state != ism::State::Waiting
                && match iface.state.dr {
                    Some(dr) if dr == net_id => full_nbrs.count() > 0,
                    Some(dr) => iface
                        .state
                        .neighbors
                        .get_by_net_id(&arenas.neighbors, dr)
                        .is_some_and(|(_, nbr)| nbr.state == nsm::State::Full),
                    None => false,
                };

            if transit && let Some(dr) = iface.state.dr {
                // OSPFv3 identifies the transit network by the DR's Router ID
                // and Interface ID.
                let (dr_router_id, dr_iface_id) = if dr == net_id {
                    (router_id, iface.config.ifindex)
                } else {
                    iface
                        .state
                        .neighbors
                        .get_by_net_id(&arenas.neighbors, dr)
                        .map(|(_, nbr)| {
                            (nbr.router_id, nbr.iface_id.unwrap_or(0))
                        })
                        .unwrap_or((dr.get(), 0))
                };
                let (link_id, link_data) = match version {
                    Version::Ospfv2 => (
                        dr.get(),
                        addr.map(|addr| addr.ip())
                            .unwrap_or(Ipv4Addr::UNSPECIFIED),
                    ),
                    Version::Ospfv3 => (dr_router_id, Ipv4Addr::UNSPECIFIED),
                };
                links.push(LsaRouterLink::new(
                    LsaRouterLinkType::TransitNetwork,
                    link_id,
                    link_data,
                    iface.config.ifindex,
                    dr_iface_id,
                    metric,
                ));
            } else if let (Version::Ospfv2, Some(addr)) = (version, addr) {
                links.push(stub_link(addr.network(), addr.mask(), metric));
            }
        }
    }
}

fn stub_link(link_id: Ipv4Addr, mask: Ipv4Addr, metric: u16) -> LsaRouterLink {
    LsaRouterLink::new(
        LsaRouterLinkType::StubNetwork,
        link_id,
        mask,
        0,
        0,
        metric,
    )
}

// Originates the Network-LSA of the given interface while we're the DR with
// at least one fully adjacent neighbor, flushing it otherwise.
fn lsa_orig_network(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    iface_idx: InterfaceIndex,
) -> Result<(), Error> {
    let version = instance.config.version;
    let router_id = instance.state.router_id;
    let Some(iface) = arenas.interfaces.get(iface_idx) else {
        return Ok(());
    };

    let lsa_type = LsaType::network(version);
    let lsa_id = match version {
        Version::Ospfv2 => match iface.config.address {
            Some(addr) => addr.ip(),
            None => return Ok(()),
        },
        Version::Ospfv3 => Ipv4Addr::from(iface.config.ifindex),
    };

    let attached_rtrs = iface
        .state
        .neighbors
        .iter(&arenas.neighbors)
        .filter(|nbr| nbr.state == nsm::State::Full)
        .map(|nbr| nbr.router_id)
        .collect::<Vec<_>>();

    if iface.state.ism_state == ism::State::Dr && !attached_rtrs.is_empty() {
        let (options, mask, body_options) = match version {
            Version::Ospfv2 => (
                Options::E,
                iface
                    .config
                    .address
                    .map(|addr| addr.mask())
                    .unwrap_or(Ipv4Addr::UNSPECIFIED),
                Options::empty(),
            ),
            Version::Ospfv3 => (
                Options::empty(),
                Ipv4Addr::UNSPECIFIED,
                Options::V6 | Options::E | Options::R,
            ),
        };
        let attached_rtrs =
            std::iter::once(router_id).chain(attached_rtrs).collect();
        let body = LsaBody::Network(LsaNetwork::new(
            mask,
            body_options,
            attached_rtrs,
        ));
        originate(instance, arenas, None, options, lsa_type, lsa_id, body)
    } else {
        let lsa_key = LsaKey::new(lsa_type, lsa_id, router_id);
        instance.state.lsdb.seqno_wrapping.remove(&lsa_key);
        match instance.state.lsdb.get(&arenas.lsa_entries, &lsa_key) {
            Some((lse_idx, _)) => {
                flush(instance, arenas, lse_idx, LsaFlushReason::PrematureAging)
            }
            None => Ok(()),
        }
    }
}

// ===== unit tests =====
