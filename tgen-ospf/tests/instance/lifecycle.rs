//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::time::Duration;

use bytes::Bytes;
use const_addrs::ip4;
use tgen_ospf::config::ExternalConnectionCfg;
use tgen_ospf::debug::InstanceInactiveReason;
use tgen_ospf::error::Error;
use tgen_ospf::instance::{self, Instance};
use tgen_ospf::lsdb::{
    LSA_INIT_SEQ_NO, LSA_MAX_AGE, LsaSource, MAX_LINK_METRIC,
};
use tgen_ospf::packet::lsa::{Lsa, LsaBody, LsaKey, LsaType};
use tgen_ospf::packet::{Options, Packet};
use tgen_ospf::tasks::messages::input::InstanceCmdMsg;
use tgen_ospf::version::Version;

use super::{NBR_ID, RTR_ID, TestInstance, config};

fn external_lsa(seq_no: u32) -> Lsa {
    // Network mask, E-bit and metric, forwarding address, route tag.
    let body = Bytes::from_static(&[
        0xff, 0xff, 0xff, 0x00, 0x80, 0x00, 0x00, 0x14, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,
    ]);
    Lsa::new(
        Version::Ospfv2,
        0,
        Options::E,
        LsaType::as_external(Version::Ospfv2),
        ip4!("172.16.1.0"),
        ip4!("3.3.3.3"),
        seq_no,
        LsaBody::Unknown(body),
    )
}

#[test]
fn teardown() {
    let mut test = TestInstance::new(Version::Ospfv2);
    test.bring_up();

    test.instance.teardown(test.t0);
    let state = test.state(0);
    assert!(state.active);
    assert!(state.teardown);
    assert!(state.lsdb.iter().all(|lse| lse.hdr.age == LSA_MAX_AGE));

    // The flushed Router-LSA is flooded right away.
    test.poll(0);
    let sent = test.sent();
    let [Packet::LsUpdate(lsupd)] = sent.as_slice() else {
        panic!("unexpected packets: {sent:?}");
    };
    assert_eq!(lsupd.lsas[0].hdr.key(), test.router_lsa_key());
    assert!(lsupd.lsas[0].hdr.is_maxage());

    // Neighbor events no longer reoriginate LSAs.
    test.recv(1, test.dbdesc(Default::default(), 0));
    test.poll(1);
    assert_eq!(test.state(1).orig_lsa_count, 2);

    // The instance stops once the teardown time elapses.
    test.poll(4);
    assert!(test.instance.is_active());
    test.poll(5);
    assert!(!test.instance.is_active());
    let state = test.state(5);
    assert!(!state.active);
    assert!(state.lsdb.is_empty());
    assert!(state.interfaces[0].neighbors.is_empty());
    assert_eq!(test.instance.next_deadline(), None);

    // A second teardown is a no-op.
    test.instance.teardown(test.t0);
    assert!(!test.instance.is_active());
}

#[test]
fn stop_flushes_self_originated_lsas() {
    let mut test = TestInstance::new(Version::Ospfv2);
    let lsupd = test.bring_up();
    test.recv(0, test.lsack(&lsupd.lsas[0]));

    test.instance.stop(InstanceInactiveReason::AdminDown);
    assert!(!test.instance.is_active());

    // Queued LS Updates are sent before the interfaces go down.
    let sent = test.sent();
    let [Packet::LsUpdate(lsupd)] = sent.as_slice() else {
        panic!("unexpected packets: {sent:?}");
    };
    assert!(lsupd.lsas[0].hdr.is_maxage());

    // Inactive instances reject input.
    let result = test.instance.inject_lsa(test.t0, external_lsa(1));
    assert!(matches!(result, Err(Error::InstanceInactive)));
}

#[test]
fn flushed_router_lsa_removed() {
    let mut config = config(Version::Ospfv2);
    config.teardown_time = 100;
    let mut test = TestInstance::with_config(config);
    test.bring_up();
    let router_lsa_key = test.router_lsa_key();

    test.instance.teardown(test.t0);
    test.poll(0);
    let sent = test.sent();
    let [Packet::LsUpdate(lsupd)] = sent.as_slice() else {
        panic!("unexpected packets: {sent:?}");
    };
    assert!(lsupd.lsas[0].hdr.is_maxage());
    test.recv(0, test.lsack(&lsupd.lsas[0]));
    assert_eq!(test.nbr(0).unwrap().flood_queue_len, 0);

    // The first collection run only marks the flushed LSA.
    test.poll(30);
    assert!(test.lsdb_seq_no(30, &router_lsa_key).is_some());

    // The second one removes it.
    test.poll(60);
    assert!(test.lsdb_seq_no(60, &router_lsa_key).is_none());
    assert!(test.instance.is_active());
}

#[test]
fn flood_queue_limit() {
    let mut config = config(Version::Ospfv2);
    config.max_queue_entries = 1;
    let mut test = TestInstance::with_config(config);
    let lsupd = test.bring_up();

    // The unacknowledged Router-LSA fills the flood queue.
    assert_eq!(test.nbr(0).unwrap().flood_queue_len, 1);

    // The injected LSA is installed but not queued for the neighbor.
    let lsa = external_lsa(LSA_INIT_SEQ_NO);
    let lsa_key = lsa.hdr.key();
    test.instance.inject_lsa(test.t0, lsa).unwrap();
    assert_eq!(test.lsdb_seq_no(0, &lsa_key), Some(LSA_INIT_SEQ_NO));
    assert_eq!(test.nbr(0).unwrap().flood_queue_len, 1);
    test.poll(0);
    assert!(test.sent().is_empty());

    // Once the queue drains, newer instances are flooded again.
    test.recv(1, test.lsack(&lsupd.lsas[0]));
    assert_eq!(test.nbr(1).unwrap().flood_queue_len, 0);
    let lsa = external_lsa(LSA_INIT_SEQ_NO + 1);
    test.instance.inject_lsa(test.at(1), lsa).unwrap();
    assert_eq!(test.nbr(1).unwrap().flood_queue_len, 1);
    test.poll(1);
    let sent = test.sent();
    let [Packet::LsUpdate(lsupd)] = sent.as_slice() else {
        panic!("unexpected packets: {sent:?}");
    };
    assert_eq!(lsupd.lsas[0].hdr.key(), lsa_key);
}

#[test]
fn overload() {
    let mut test = TestInstance::new(Version::Ospfv2);
    test.bring_up();

    test.instance.set_overload(test.t0, true);
    assert!(test.state(0).overload);
    test.poll(0);
    let sent = test.sent();
    let [Packet::LsUpdate(lsupd)] = sent.as_slice() else {
        panic!("unexpected packets: {sent:?}");
    };
    let router = lsupd.lsas[0].body.as_router().unwrap();
    assert_eq!(lsupd.lsas[0].hdr.seq_no, LSA_INIT_SEQ_NO + 2);
    assert!(!router.links.is_empty());
    assert!(router.links.iter().all(|link| link.metric == MAX_LINK_METRIC));

    // Setting the same condition again has no effect.
    test.instance.set_overload(test.t0, true);
    test.poll(0);
    assert!(test.sent().is_empty());

    // Clearing it restores the configured metrics.
    test.instance
        .process_cmd(test.t0, InstanceCmdMsg::SetOverload(false))
        .unwrap();
    test.poll(0);
    let sent = test.sent();
    let [Packet::LsUpdate(lsupd)] = sent.as_slice() else {
        panic!("unexpected packets: {sent:?}");
    };
    let router = lsupd.lsas[0].body.as_router().unwrap();
    assert!(router.links.iter().all(|link| link.metric == 10));
}

#[test]
fn external_connections() {
    let mut config = config(Version::Ospfv2);
    config.external_connections = vec![ExternalConnectionCfg {
        router_id: ip4!("3.3.3.3"),
        metric: 20,
    }];
    let mut test = TestInstance::with_config(config);
    let lsupd = test.bring_up();

    let router = lsupd.lsas[0].body.as_router().unwrap();
    let link = router
        .links
        .iter()
        .find(|link| link.link_id == ip4!("3.3.3.3"))
        .unwrap();
    assert_eq!(link.metric, 20);
    assert_eq!(link.link_data, RTR_ID);
}

#[test]
fn inject_and_withdraw() {
    let mut test = TestInstance::new(Version::Ospfv2);
    test.bring_up();

    // Injected LSAs are installed and flooded.
    let lsa = external_lsa(LSA_INIT_SEQ_NO);
    let lsa_key = lsa.hdr.key();
    test.instance.inject_lsa(test.t0, lsa.clone()).unwrap();
    let state = test.state(0);
    assert_eq!(state.orig_lsa_count, 3);
    let lse = state
        .lsdb
        .iter()
        .find(|lse| lse.hdr.key() == lsa_key)
        .unwrap();
    assert_eq!(lse.source, LsaSource::External);
    test.poll(0);
    let sent = test.sent();
    let [Packet::LsUpdate(lsupd)] = sent.as_slice() else {
        panic!("unexpected packets: {sent:?}");
    };
    assert_eq!(lsupd.lsas[0].hdr.key(), lsa_key);
    assert_eq!(lsupd.lsas[0].body, lsa.body);

    // Injecting the same instance twice is a no-op.
    test.instance.inject_lsa(test.t0, lsa.clone()).unwrap();
    test.poll(0);
    assert!(test.sent().is_empty());

    // Injecting an older instance takes over the current sequence number.
    let newer = external_lsa(LSA_INIT_SEQ_NO + 5);
    test.instance.inject_lsa(test.t0, newer).unwrap();
    test.instance.inject_lsa(test.t0, lsa.clone()).unwrap();
    assert_eq!(test.lsdb_seq_no(0, &lsa_key), Some(LSA_INIT_SEQ_NO + 6));
    test.poll(0);
    test.sent();

    // Withdrawn LSAs are flushed.
    test.instance
        .process_cmd(test.t0, InstanceCmdMsg::WithdrawLsa(lsa_key))
        .unwrap();
    let state = test.state(0);
    let lse = state
        .lsdb
        .iter()
        .find(|lse| lse.hdr.key() == lsa_key)
        .unwrap();
    assert_eq!(lse.hdr.age, LSA_MAX_AGE);
    test.poll(0);
    let sent = test.sent();
    let [Packet::LsUpdate(lsupd)] = sent.as_slice() else {
        panic!("unexpected packets: {sent:?}");
    };
    assert!(lsupd.lsas[0].hdr.is_maxage());

    // Self-originated LSAs can't be withdrawn.
    let router_lsa_key = test.router_lsa_key();
    test.instance.withdraw_lsa(test.t0, router_lsa_key).unwrap();
    let state = test.state(0);
    let lse = state
        .lsdb
        .iter()
        .find(|lse| lse.hdr.key() == router_lsa_key)
        .unwrap();
    assert!(!lse.hdr.is_maxage());
}

#[test]
fn inject_invalid_lsa() {
    let mut test = TestInstance::new(Version::Ospfv2);
    test.start();

    let mut lsa = external_lsa(LSA_INIT_SEQ_NO);
    lsa.hdr.age = LSA_MAX_AGE + 1;
    let result = test.instance.inject_lsa(test.t0, lsa);
    assert!(matches!(result, Err(Error::InvalidLsa(..))));

    // Unknown LSAs are silently ignored on withdrawal.
    let lsa_key = LsaKey::new(
        LsaType::as_external(Version::Ospfv2),
        ip4!("172.16.2.0"),
        NBR_ID,
    );
    assert!(test.instance.withdraw_lsa(test.t0, lsa_key).is_ok());
}

#[tokio::test]
async fn event_loop() {
    let mut config = config(Version::Ospfv2);
    config.teardown_time = 0;
    let (net_tx, mut net_rx) = tokio::sync::mpsc::unbounded_channel();
    let instance = Instance::new("test".to_owned(), config, net_tx).unwrap();
    let (_net_rx_tx, cmd_tx, rx) = instance::input_channels();
    let handle = tokio::spawn(instance.run(rx));

    // A Hello is sent as soon as the instance starts.
    let msg = tokio::time::timeout(Duration::from_secs(5), net_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(msg.packet, Packet::Hello(_)));

    // Tearing down stops the event loop.
    cmd_tx.send(InstanceCmdMsg::Teardown).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn event_loop_cmd_channel_closed() {
    let config = config(Version::Ospfv2);
    let (net_tx, mut net_rx) = tokio::sync::mpsc::unbounded_channel();
    let instance = Instance::new("test".to_owned(), config, net_tx).unwrap();
    let (_net_rx_tx, cmd_tx, rx) = instance::input_channels();
    let handle = tokio::spawn(instance.run(rx));

    let msg = tokio::time::timeout(Duration::from_secs(5), net_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(msg.packet, Packet::Hello(_)));

    // Closing the command channel stops the event loop even though the
    // network channel is still open.
    drop(cmd_tx);
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
}
