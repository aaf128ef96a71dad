//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::cmp::Ordering;
use std::collections::btree_map;

use crate::collections::{
    Arena, InterfaceIndex, LsaEntryIndex, NeighborIndex,
};
use crate::error::Error;
use crate::instance::{InstanceArenas, InstanceUpView};
use crate::interface::{Interface, ism};
use crate::lsdb::{self, LsaEntry};
use crate::neighbor::{FloodEntry, Neighbor, nsm};

// ===== global functions =====

// Floods the given LSA to all eligible neighbors.
//
// Returns whether the LSA was flooded back out the interface it was received
// on.
pub(crate) fn flood(
    instance: &mut InstanceUpView<'_>,
    arenas: &mut InstanceArenas,
    lse_idx: LsaEntryIndex,
    src: Option<(InterfaceIndex, NeighborIndex)>,
) -> bool {
    let mut flooded_back = false;
    for iface_idx in arenas.interfaces.indexes() {
        let iface = &mut arenas.interfaces[iface_idx];
        let lse = &mut arenas.lsa_entries[lse_idx];
        if iface.is_down() || !lsa_in_scope(lse, iface) {
            continue;
        }

        flooded_back |= flood_interface(
            iface,
            instance,
            &mut arenas.neighbors,
            lse,
            src,
        );
    }

    flooded_back
}

// Returns whether the LSA can be flooded out the given interface.
pub(crate) fn lsa_in_scope(lse: &LsaEntry, iface: &Interface) -> bool {
    // Link-scope LSAs are bound to the interface they were received or
    // originated on.
    match lse.iface_idx {
        Some(iface_idx) => iface_idx == iface.idx,
        None => true,
    }
}

// Adds the LSA to the neighbor's flood queue.
//
// LSAs that weren't sent yet are transmitted as soon as the current event is
// processed.
pub(crate) fn queue_insert(
    nbr: &mut Neighbor,
    instance: &mut InstanceUpView<'_>,
    lse: &mut LsaEntry,
    wait_ack: bool,
) -> Result<(), Error> {
    let lsa_key = lse.data.hdr.key();
    let queue_len = nbr.flood.len();
    match nbr.flood.entry(lsa_key) {
        btree_map::Entry::Occupied(mut o) => {
            // Replace the queued instance. The LSDB reference is kept.
            let entry = o.get_mut();
            entry.lsa = lse.data.clone();
            entry.wait_ack = wait_ack;
        }
        btree_map::Entry::Vacant(v) => {
            if queue_len >= instance.config.max_queue_entries {
                return Err(Error::QueueFull(nbr.router_id, lsa_key));
            }
            v.insert(FloodEntry {
                lsa: lse.data.clone(),
                wait_ack,
                tx_count: 0,
                tx_time: None,
            });
            lse.refcount += 1;
        }
    }

    if wait_ack {
        nbr.rxmt_lsupd_start_check(instance);
    } else {
        nbr.ls_update_timer_start(instance);
    }

    Ok(())
}

// ===== helper functions =====

fn flood_interface(
    iface: &mut Interface,
    instance: &mut InstanceUpView<'_>,
    neighbors: &mut Arena<Neighbor>,
    lse: &mut LsaEntry,
    src: Option<(InterfaceIndex, NeighborIndex)>,
) -> bool {
    let lsa_hdr = lse.data.hdr;
    let lsa_key = lsa_hdr.key();

    // Keep track that this LSA was flooded back out the receiving interface.
    // This information is relevant when deciding whether or not to send a
    // delayed ack later.
    let mut flooded_back = false;

    // 1) Each of the neighbors attached to this interface are examined.
    let mut queued = false;
    for nbr_idx in iface.state.neighbors.indexes().collect::<Vec<_>>() {
        let nbr = &mut neighbors[nbr_idx];

        // 1.a) Skip neighbors in a lesser state than Exchange.
        if nbr.state < nsm::State::Exchange {
            continue;
        }

        // 1.b) Adjacencies that are not full only have their request lists
        // examined.
        if nbr.state != nsm::State::Full {
            use btree_map::Entry::Occupied;

            let mut removed = false;
            match (
                nbr.request.entry(lsa_key),
                nbr.request_pending.entry(lsa_key),
            ) {
                (Occupied(o), _) | (_, Occupied(o)) => {
                    match lsdb::lsa_compare(&lsa_hdr, o.get()) {
                        Ordering::Less => (),
                        Ordering::Equal | Ordering::Greater => {
                            // Delete the LSA from the Link state request list.
                            o.remove();
                            removed = true;
                        }
                    }
                }
                _ => (),
            }

            // Check if the neighbor can transition to Full.
            if removed {
                nbr.loading_done_check(iface, instance);
            }
            continue;
        }

        // 1.c) If the new LSA was received from this neighbor, examine the
        // next neighbor.
        if let Some((_, nbr_src_idx)) = src
            && nbr_src_idx == nbr_idx
        {
            continue;
        }

        // 1.d) Add LSA to the neighbor's flood queue.
        match queue_insert(nbr, instance, lse, false) {
            Ok(()) => queued = true,
            Err(error) => error.log(),
        }
    }

    // 2) If in the previous step, the LSA was NOT added to any of the flood
    // queues, there is no need to flood the LSA out the interface.
    if !queued {
        return flooded_back;
    }

    if let Some((iface_src_idx, nbr_src_idx)) = src
        && iface_src_idx == iface.idx
    {
        let nbr_src_net_id = neighbors[nbr_src_idx].net_id;

        // 3) If the new LSA was received on this interface, and it was
        // received from either the DR or the BDR, chances are
        // that all the neighbors have received the LSA already.
        if iface.state.dr == Some(nbr_src_net_id)
            || iface.state.bdr == Some(nbr_src_net_id)
        {
            return flooded_back;
        }

        // 4) If the new LSA was received on this interface, and the
        // interface state is BDR, examine the next interface.
        if iface.state.ism_state == ism::State::Backup {
            return flooded_back;
        }

        flooded_back = true;
    }

    flooded_back
}
