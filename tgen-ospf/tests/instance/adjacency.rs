//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use const_addrs::{ip, ip4};
use maplit::btreeset;
use tgen_ospf::error::Error;
use tgen_ospf::interface::ism;
use tgen_ospf::lsdb::LSA_INIT_SEQ_NO;
use tgen_ospf::neighbor::nsm;
use tgen_ospf::packet::lsa::{
    Lsa, LsaBody, LsaKey, LsaRouter, LsaRouterFlags, LsaRouterLinkType, LsaType,
};
use tgen_ospf::packet::{DbDescFlags, Options, Packet};
use tgen_ospf::tasks::messages::input::NetRxPacketMsg;
use tgen_ospf::version::Version;

use super::{NBR_DD_SEQ_NO, NBR_ID, RTR_ID, TestInstance, config};

#[test]
fn hello_sent_on_start() {
    let mut test = TestInstance::new(Version::Ospfv2);
    test.start();

    let msgs = test.sent_msgs();
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].src, ip!("10.0.1.1"));
    assert_eq!(msgs[0].dst, ip!("224.0.0.5"));
    let Packet::Hello(hello) = &msgs[0].packet else {
        panic!("unexpected packet: {:?}", msgs[0].packet);
    };
    assert_eq!(hello.hdr.router_id, RTR_ID);
    assert_eq!(hello.network_mask, ip4!("255.255.255.0"));
    assert_eq!(hello.hello_interval, 10);
    assert_eq!(hello.dead_interval, 40);
    assert_eq!(hello.options, Options::E);
    assert!(hello.neighbors.is_empty());

    let state = test.state(0);
    assert!(state.active);
    assert_eq!(state.interfaces[0].state, ism::State::PointToPoint);
    assert_eq!(state.orig_lsa_count, 1);
    assert_eq!(
        test.lsdb_seq_no(0, &test.router_lsa_key()),
        Some(LSA_INIT_SEQ_NO)
    );

    // Hellos are sent periodically.
    test.poll(9);
    assert!(test.sent().is_empty());
    test.poll(10);
    assert!(matches!(test.sent().as_slice(), [Packet::Hello(_)]));
    test.poll(30);
    assert_eq!(test.sent().len(), 2);
}

#[test]
fn one_way_hello() {
    let mut test = TestInstance::new(Version::Ospfv2);
    test.start();
    test.sent();

    // The peer doesn't see us yet.
    test.recv(0, test.hello(btreeset![]));
    assert_eq!(test.nbr_state(0), Some(nsm::State::Init));
    assert!(test.sent().is_empty());

    // Our next Hello lists the peer.
    test.poll(10);
    let sent = test.sent();
    let [Packet::Hello(hello)] = sent.as_slice() else {
        panic!("unexpected packets: {sent:?}");
    };
    assert_eq!(hello.neighbors, btreeset![NBR_ID]);
}

#[test]
fn hello_interval_mismatch() {
    let mut test = TestInstance::new(Version::Ospfv2);
    test.start();
    test.sent();

    let mut hello = test.hello(btreeset![RTR_ID]);
    if let Packet::Hello(hello) = &mut hello {
        hello.hello_interval = 5;
    }
    let (src, dst) = (ip!("10.0.1.2"), ip!("224.0.0.5"));
    let msg = NetRxPacketMsg {
        ifname: "eth1".to_owned(),
        src,
        dst,
        data: hello.encode(&src, &dst, None),
    };
    let now = test.at(0);
    let result = test.instance.process_packet(now, msg);
    assert!(matches!(result, Err(Error::InterfaceCfgError(..))));
    assert_eq!(test.nbr_state(0), None);
    assert_eq!(test.state(0).interfaces[0].statistics.discarded, 1);
}

#[test]
fn adjacency_full_ospfv2() {
    let mut test = TestInstance::new(Version::Ospfv2);
    let lsupd = test.bring_up();

    // Point-to-point link to the peer plus the stub link to the subnet.
    let router = lsupd.lsas[0].body.as_router().unwrap();
    assert_eq!(router.links.len(), 2);
    assert_eq!(router.links[0].link_type, LsaRouterLinkType::PointToPoint);
    assert_eq!(router.links[0].link_id, NBR_ID);
    assert_eq!(router.links[0].link_data, ip4!("10.0.1.1"));
    assert_eq!(router.links[0].metric, 10);
    assert_eq!(router.links[1].link_type, LsaRouterLinkType::StubNetwork);
    assert_eq!(router.links[1].link_id, ip4!("10.0.1.0"));
    assert_eq!(router.links[1].link_data, ip4!("255.255.255.0"));

    let nbr = test.nbr(0).unwrap();
    assert_eq!(nbr.router_id, NBR_ID);
    assert_eq!(nbr.address, ip!("10.0.1.2"));
    assert_eq!(nbr.flood_queue_len, 1);
    assert_eq!(nbr.request_queue_len, 0);

    let state = test.state(0);
    assert_eq!(state.orig_lsa_count, 2);
    assert_eq!(state.lsdb.len(), 1);
    assert_eq!(state.lsdb[0].refcount, 1);
}

#[test]
fn adjacency_full_ospfv3() {
    let mut test = TestInstance::new(Version::Ospfv3);
    let lsupd = test.bring_up();

    let router = lsupd.lsas[0].body.as_router().unwrap();
    assert_eq!(router.options, Options::V6 | Options::E | Options::R);
    assert_eq!(router.links.len(), 1);
    assert_eq!(router.links[0].link_type, LsaRouterLinkType::PointToPoint);
    assert_eq!(router.links[0].link_id, NBR_ID);
    assert_eq!(router.links[0].iface_id, 1);
    assert_eq!(router.links[0].nbr_iface_id, 2);

    let nbr = test.nbr(0).unwrap();
    assert_eq!(nbr.address, ip!("fe80::2"));
}

#[test]
fn adjacency_sends_to_all_spf_routers() {
    let mut test = TestInstance::new(Version::Ospfv3);
    test.start();
    test.sent();

    test.recv(0, test.hello(btreeset![RTR_ID]));
    let msgs = test.sent_msgs();
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].src, ip!("fe80::1"));
    assert_eq!(msgs[0].dst, ip!("ff02::5"));
    let Packet::DbDesc(dbdesc) = &msgs[0].packet else {
        panic!("unexpected packet: {:?}", msgs[0].packet);
    };
    assert_eq!(dbdesc.options, Options::V6 | Options::E | Options::R);
    assert_eq!(dbdesc.mtu, 1500);
}

#[test]
fn initial_dbdesc_retransmission() {
    let mut test = TestInstance::new(Version::Ospfv2);
    test.start();
    test.sent();

    test.recv(0, test.hello(btreeset![RTR_ID]));
    let sent = test.sent();
    assert!(matches!(sent.as_slice(), [Packet::DbDesc(_)]));

    // The peer never answers: the same packet is sent again after the
    // retransmission interval.
    test.poll(5);
    let resent = test.sent();
    assert_eq!(resent, sent);
    assert_eq!(test.nbr_state(5), Some(nsm::State::ExStart));
}

#[test]
fn duplicate_dbdesc_slave() {
    let mut test = TestInstance::new(Version::Ospfv2);
    test.bring_up();

    // The master retransmits its last packet: the slave answers with its
    // own last packet.
    test.recv(1, test.dbdesc(DbDescFlags::MS, NBR_DD_SEQ_NO + 1));
    let sent = test.sent();
    let [Packet::DbDesc(dbdesc)] = sent.as_slice() else {
        panic!("unexpected packets: {sent:?}");
    };
    assert_eq!(dbdesc.dd_seq_no, NBR_DD_SEQ_NO + 1);
    assert_eq!(dbdesc.dd_flags, DbDescFlags::empty());
    assert_eq!(test.nbr_state(1), Some(nsm::State::Full));
}

#[test]
fn seqno_mismatch_restarts_adjacency() {
    let mut test = TestInstance::new(Version::Ospfv2);
    test.bring_up();

    // Unexpected DD packet while Full.
    test.recv(1, test.dbdesc(DbDescFlags::MS, NBR_DD_SEQ_NO + 2));
    assert_eq!(test.nbr_state(1), Some(nsm::State::Down));
    let nbr = test.nbr(1).unwrap();
    assert_eq!(nbr.flood_queue_len, 0);
    assert!(test.state(1).lsdb.iter().all(|lsa| lsa.refcount == 0));

    // The Router-LSA no longer lists the peer.
    test.poll(1);
    test.sent();
    assert_eq!(
        test.lsdb_seq_no(1, &test.router_lsa_key()),
        Some(LSA_INIT_SEQ_NO + 2)
    );

    // The next Hello starts a new database exchange.
    test.recv(2, test.hello(btreeset![RTR_ID]));
    let sent = test.sent();
    let [Packet::DbDesc(dbdesc)] = sent.as_slice() else {
        panic!("unexpected packets: {sent:?}");
    };
    assert_eq!(
        dbdesc.dd_flags,
        DbDescFlags::I | DbDescFlags::M | DbDescFlags::MS
    );
    assert_eq!(dbdesc.dd_seq_no, NBR_DD_SEQ_NO + 2);
    assert_eq!(test.nbr_state(2), Some(nsm::State::ExStart));
}

#[test]
fn seqno_mismatch_single_down_transition() {
    let mut test = TestInstance::new(Version::Ospfv2);
    test.bring_up();
    let event_count = test.nbr(0).unwrap().event_count;

    test.recv(1, test.dbdesc(DbDescFlags::MS, NBR_DD_SEQ_NO + 2));
    let nbr = test.nbr(1).unwrap();
    assert_eq!(nbr.state, nsm::State::Down);
    assert_eq!(nbr.event_count, event_count + 1);
    assert_eq!(nbr.request_queue_len, 0);
    assert_eq!(nbr.ack_queue_len, 0);

    // Further DD packets are rejected while Down.
    let packet = test.dbdesc(DbDescFlags::MS, NBR_DD_SEQ_NO + 3);
    let result = test.try_recv(2, packet);
    assert!(matches!(result, Err(Error::DbDescReject(..))));
    test.poll(2);
    let nbr = test.nbr(2).unwrap();
    assert_eq!(nbr.state, nsm::State::Down);
    assert_eq!(nbr.event_count, event_count + 1);
}

#[test]
fn request_list_limit() {
    let mut config = config(Version::Ospfv2);
    config.max_queue_entries = 2;
    let mut test = TestInstance::with_config(config);
    test.start();
    test.sent();

    // Become the slave of the peer's database exchange.
    test.recv(0, test.hello(btreeset![RTR_ID]));
    let flags = DbDescFlags::I | DbDescFlags::M | DbDescFlags::MS;
    test.recv(0, test.dbdesc(flags, NBR_DD_SEQ_NO));
    assert_eq!(test.nbr_state(0), Some(nsm::State::Exchange));
    test.sent();
    let event_count = test.nbr(0).unwrap().event_count;

    // Three unknown LSAs don't fit in the request list.
    let lsa_hdrs = ["3.3.3.3", "4.4.4.4", "5.5.5.5"]
        .into_iter()
        .map(|adv_rtr| {
            let adv_rtr = adv_rtr.parse().unwrap();
            Lsa::new(
                Version::Ospfv2,
                1,
                Options::E,
                LsaType::router(Version::Ospfv2),
                adv_rtr,
                adv_rtr,
                LSA_INIT_SEQ_NO,
                LsaBody::Router(LsaRouter::new(
                    LsaRouterFlags::empty(),
                    Options::empty(),
                    vec![],
                )),
            )
            .hdr
        })
        .collect();
    let flags = DbDescFlags::M | DbDescFlags::MS;
    test.recv(0, test.dbdesc_with_hdrs(flags, NBR_DD_SEQ_NO + 1, lsa_hdrs));

    // The adjacency is reset once, with nothing left to request.
    let nbr = test.nbr(0).unwrap();
    assert_eq!(nbr.state, nsm::State::Down);
    assert_eq!(nbr.event_count, event_count + 1);
    assert_eq!(nbr.request_queue_len, 0);
    assert!(
        !test
            .sent()
            .iter()
            .any(|packet| matches!(packet, Packet::LsRequest(_)))
    );
}

#[test]
fn inactivity_timer() {
    let mut test = TestInstance::new(Version::Ospfv2);
    test.bring_up();
    let event_count = test.nbr(0).unwrap().event_count;

    // Hellos keep the neighbor alive.
    test.recv(30, test.hello(btreeset![RTR_ID]));
    test.poll(60);
    assert_eq!(test.nbr_state(60), Some(nsm::State::Full));

    // No Hello received within the dead interval.
    test.poll(70);
    assert_eq!(test.nbr_state(70), Some(nsm::State::Down));
    assert_eq!(test.nbr(70).unwrap().event_count, event_count + 1);
    let state = test.state(70);
    assert!(state.lsdb.iter().all(|lsa| lsa.refcount == 0));
    let nbr = test.nbr(70).unwrap();
    assert_eq!(nbr.flood_queue_len, 0);
    assert_eq!(nbr.ack_queue_len, 0);

    // Down neighbors aren't listed in Hellos.
    test.sent();
    test.poll(80);
    let sent = test.sent();
    let [Packet::Hello(hello)] = sent.as_slice() else {
        panic!("unexpected packets: {sent:?}");
    };
    assert!(hello.neighbors.is_empty());

    // The neighbor stays Down without further transitions.
    test.poll(120);
    assert_eq!(test.nbr_state(120), Some(nsm::State::Down));
    assert_eq!(test.nbr(120).unwrap().event_count, event_count + 1);
}

#[test]
fn ls_request() {
    let mut test = TestInstance::new(Version::Ospfv2);
    test.bring_up();

    // Requested LSAs are sent right away.
    test.recv(1, test.lsreq(vec![test.router_lsa_key()]));
    let sent = test.sent();
    let [Packet::LsUpdate(lsupd)] = sent.as_slice() else {
        panic!("unexpected packets: {sent:?}");
    };
    assert_eq!(lsupd.lsas[0].hdr.key(), test.router_lsa_key());

    // Requesting an unknown LSA breaks the adjacency.
    let lsa_key = LsaKey::new(
        LsaType::router(Version::Ospfv2),
        ip4!("9.9.9.9"),
        ip4!("9.9.9.9"),
    );
    test.recv(2, test.lsreq(vec![lsa_key]));
    assert_eq!(test.nbr_state(2), Some(nsm::State::Down));
}

#[test]
fn interface_down_deletes_neighbors() {
    let mut test = TestInstance::new(Version::Ospfv2);
    test.bring_up();

    let now = test.at(1);
    test.instance.interface_update(now, "eth1", false).unwrap();
    let state = test.state(1);
    assert_eq!(state.interfaces[0].state, ism::State::Down);
    assert!(state.interfaces[0].neighbors.is_empty());
    assert!(state.lsdb.iter().all(|lsa| lsa.refcount == 0));

    // Packets received on inoperational interfaces are ignored.
    test.recv(2, test.hello(btreeset![RTR_ID]));
    assert_eq!(test.nbr_state(2), None);

    // Bringing the interface back up sends a Hello right away.
    test.sent();
    let now = test.at(3);
    test.instance.interface_update(now, "eth1", true).unwrap();
    assert!(matches!(test.sent().as_slice(), [Packet::Hello(_)]));
    assert_eq!(test.state(3).interfaces[0].state, ism::State::PointToPoint);

    let result = test.instance.interface_update(now, "eth9", true);
    assert!(matches!(result, Err(Error::InterfaceNotFound(_))));
}
