//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

mod adjacency;
mod lifecycle;

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use const_addrs::{ip, ip4, ip6};
use maplit::btreeset;
use tgen_ospf::config::{InstanceCfg, InterfaceCfg};
use tgen_ospf::error::Error;
use tgen_ospf::instance::Instance;
use tgen_ospf::lsdb::LSA_INIT_SEQ_NO;
use tgen_ospf::neighbor::nsm;
use tgen_ospf::packet::lsa::{Lsa, LsaHdr, LsaKey, LsaType};
use tgen_ospf::packet::{
    DbDesc, DbDescFlags, Hello, LsAck, LsRequest, LsUpdate, Options, Packet,
    PacketHdr, PacketType,
};
use tgen_ospf::state::{InstanceState, NeighborState};
use tgen_ospf::tasks::messages::input::NetRxPacketMsg;
use tgen_ospf::tasks::messages::output::NetTxPacketMsg;
use tgen_ospf::version::Version;
use tgen_utils::UnboundedReceiver;
use tokio::time::Instant;

const IFNAME: &str = "eth1";
const RTR_ID: Ipv4Addr = Ipv4Addr::new(1, 1, 1, 1);
const NBR_ID: Ipv4Addr = Ipv4Addr::new(2, 2, 2, 2);
const AREA_ID: Ipv4Addr = Ipv4Addr::UNSPECIFIED;
// DD sequence number chosen by the peer when acting as master.
const NBR_DD_SEQ_NO: u32 = 5000;

//
// Test harness.
//

// OSPF instance attached to a single emulated peer.
pub struct TestInstance {
    pub version: Version,
    pub instance: Instance,
    pub net_rx: UnboundedReceiver<NetTxPacketMsg>,
    pub t0: Instant,
}

impl TestInstance {
    pub fn new(version: Version) -> TestInstance {
        TestInstance::with_config(config(version))
    }

    pub fn with_config(config: InstanceCfg) -> TestInstance {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let version = config.version;
        let (net_tx, net_rx) = tokio::sync::mpsc::unbounded_channel();
        let instance = Instance::new("test".to_owned(), config, net_tx)
            .expect("invalid configuration");
        TestInstance {
            version,
            instance,
            net_rx,
            t0: Instant::now(),
        }
    }

    // Returns the time `secs` seconds after the start of the test.
    pub fn at(&self, secs: u64) -> Instant {
        self.t0 + Duration::from_secs(secs)
    }

    pub fn start(&mut self) {
        self.instance.start(self.t0);
    }

    // Returns all packets sent since the last call.
    pub fn sent(&mut self) -> Vec<Packet> {
        let mut packets = vec![];
        while let Ok(msg) = self.net_rx.try_recv() {
            assert_eq!(msg.ifname, IFNAME);
            packets.push(msg.packet);
        }
        packets
    }

    // Returns all messages sent since the last call.
    pub fn sent_msgs(&mut self) -> Vec<NetTxPacketMsg> {
        let mut msgs = vec![];
        while let Ok(msg) = self.net_rx.try_recv() {
            msgs.push(msg);
        }
        msgs
    }

    // Delivers a packet sent by the peer.
    pub fn recv(&mut self, secs: u64, packet: Packet) {
        self.try_recv(secs, packet).expect("failed to process packet");
    }

    pub fn try_recv(&mut self, secs: u64, packet: Packet) -> Result<(), Error> {
        let (src, dst) = peer_addrs(self.version);
        let data = packet.encode(&src, &dst, None);
        let msg = NetRxPacketMsg {
            ifname: IFNAME.to_owned(),
            src,
            dst,
            data,
        };
        self.instance.process_packet(self.at(secs), msg)
    }

    // Processes all timers that expired up to the given time.
    pub fn poll(&mut self, secs: u64) {
        self.instance.poll_timers(self.at(secs));
    }

    pub fn state(&self, secs: u64) -> InstanceState {
        self.instance.state(self.at(secs))
    }

    pub fn nbr(&self, secs: u64) -> Option<NeighborState> {
        self.state(secs)
            .interfaces
            .into_iter()
            .find(|iface| iface.name == IFNAME)
            .and_then(|iface| iface.neighbors.into_iter().next())
    }

    pub fn nbr_state(&self, secs: u64) -> Option<nsm::State> {
        self.nbr(secs).map(|nbr| nbr.state)
    }

    pub fn router_lsa_key(&self) -> LsaKey {
        let lsa_id = match self.version {
            Version::Ospfv2 => RTR_ID,
            Version::Ospfv3 => Ipv4Addr::UNSPECIFIED,
        };
        LsaKey::new(LsaType::router(self.version), lsa_id, RTR_ID)
    }

    pub fn lsdb_seq_no(&self, secs: u64, lsa_key: &LsaKey) -> Option<u32> {
        self.state(secs)
            .lsdb
            .into_iter()
            .find(|lsa| lsa.hdr.key() == *lsa_key)
            .map(|lsa| lsa.hdr.seq_no)
    }

    // Brings the adjacency with the peer up to the Full state, returning
    // the LS Update sent right after the adjacency came up.
    pub fn bring_up(&mut self) -> LsUpdate {
        self.start();
        let sent = self.sent();
        assert!(matches!(sent.as_slice(), [Packet::Hello(_)]));

        // Two-way communication: we become the master candidate.
        self.recv(0, self.hello(btreeset![RTR_ID]));
        let sent = self.sent();
        let [Packet::DbDesc(dbdesc)] = sent.as_slice() else {
            panic!("unexpected packets: {sent:?}");
        };
        assert_eq!(
            dbdesc.dd_flags,
            DbDescFlags::I | DbDescFlags::M | DbDescFlags::MS
        );
        assert_eq!(dbdesc.dd_seq_no, u32::from(NBR_ID) + 1);
        assert!(dbdesc.lsa_hdrs.is_empty());
        assert_eq!(self.nbr_state(0), Some(nsm::State::ExStart));

        // The peer has the higher Router ID and becomes the master.
        let flags = DbDescFlags::I | DbDescFlags::M | DbDescFlags::MS;
        self.recv(0, self.dbdesc(flags, NBR_DD_SEQ_NO));
        let sent = self.sent();
        let [Packet::DbDesc(dbdesc)] = sent.as_slice() else {
            panic!("unexpected packets: {sent:?}");
        };
        assert_eq!(dbdesc.dd_flags, DbDescFlags::empty());
        assert_eq!(dbdesc.dd_seq_no, NBR_DD_SEQ_NO);
        assert_eq!(dbdesc.lsa_hdrs.len(), 1);
        assert_eq!(dbdesc.lsa_hdrs[0].key(), self.router_lsa_key());
        assert_eq!(self.nbr_state(0), Some(nsm::State::Exchange));

        // Last packet from the master.
        self.recv(0, self.dbdesc(DbDescFlags::MS, NBR_DD_SEQ_NO + 1));
        let sent = self.sent();
        let [Packet::DbDesc(dbdesc)] = sent.as_slice() else {
            panic!("unexpected packets: {sent:?}");
        };
        assert_eq!(dbdesc.dd_flags, DbDescFlags::empty());
        assert_eq!(dbdesc.dd_seq_no, NBR_DD_SEQ_NO + 1);
        assert!(dbdesc.lsa_hdrs.is_empty());
        assert_eq!(self.nbr_state(0), Some(nsm::State::Full));

        // The Router-LSA now describes the adjacency.
        self.poll(0);
        let sent = self.sent();
        let [Packet::LsUpdate(lsupd)] = sent.as_slice() else {
            panic!("unexpected packets: {sent:?}");
        };
        assert_eq!(lsupd.lsas.len(), 1);
        assert_eq!(lsupd.lsas[0].hdr.key(), self.router_lsa_key());
        assert_eq!(lsupd.lsas[0].hdr.seq_no, LSA_INIT_SEQ_NO + 1);
        lsupd.clone()
    }

    //
    // Packets sent by the peer.
    //

    pub fn hdr(&self, pkt_type: PacketType) -> PacketHdr {
        PacketHdr::new(self.version, pkt_type, NBR_ID, AREA_ID, 0)
    }

    pub fn hello(&self, neighbors: BTreeSet<Ipv4Addr>) -> Packet {
        Packet::Hello(Hello {
            hdr: self.hdr(PacketType::Hello),
            network_mask: match self.version {
                Version::Ospfv2 => ip4!("255.255.255.0"),
                Version::Ospfv3 => Ipv4Addr::UNSPECIFIED,
            },
            iface_id: 2,
            hello_interval: 10,
            options: options(self.version),
            priority: 1,
            dead_interval: 40,
            dr: None,
            bdr: None,
            neighbors,
        })
    }

    pub fn dbdesc(&self, dd_flags: DbDescFlags, dd_seq_no: u32) -> Packet {
        self.dbdesc_with_hdrs(dd_flags, dd_seq_no, vec![])
    }

    pub fn dbdesc_with_hdrs(
        &self,
        dd_flags: DbDescFlags,
        dd_seq_no: u32,
        lsa_hdrs: Vec<LsaHdr>,
    ) -> Packet {
        Packet::DbDesc(DbDesc {
            hdr: self.hdr(PacketType::DbDesc),
            mtu: 1500,
            options: options(self.version),
            dd_flags,
            dd_seq_no,
            lsa_hdrs,
        })
    }

    pub fn lsreq(&self, entries: Vec<LsaKey>) -> Packet {
        Packet::LsRequest(LsRequest {
            hdr: self.hdr(PacketType::LsRequest),
            entries,
        })
    }

    pub fn lsupd(&self, lsas: Vec<Lsa>) -> Packet {
        Packet::LsUpdate(LsUpdate {
            hdr: self.hdr(PacketType::LsUpdate),
            lsas,
        })
    }

    pub fn lsack(&self, lsa: &Lsa) -> Packet {
        Packet::LsAck(LsAck {
            hdr: self.hdr(PacketType::LsAck),
            lsa_hdrs: vec![lsa.hdr],
        })
    }
}

//
// Helper functions.
//

pub fn config(version: Version) -> InstanceCfg {
    let iface = match version {
        Version::Ospfv2 => InterfaceCfg {
            name: IFNAME.to_owned(),
            address: Some("10.0.1.1/24".parse().unwrap()),
            ..Default::default()
        },
        Version::Ospfv3 => InterfaceCfg {
            name: IFNAME.to_owned(),
            link_local: Some(ip6!("fe80::1")),
            ifindex: 1,
            ..Default::default()
        },
    };
    InstanceCfg {
        version,
        router_id: RTR_ID,
        area: AREA_ID,
        interfaces: vec![iface],
        ..Default::default()
    }
}

fn peer_addrs(version: Version) -> (IpAddr, IpAddr) {
    match version {
        Version::Ospfv2 => (ip!("10.0.1.2"), ip!("224.0.0.5")),
        Version::Ospfv3 => (ip!("fe80::2"), ip!("ff02::5")),
    }
}

fn options(version: Version) -> Options {
    match version {
        Version::Ospfv2 => Options::E,
        Version::Ospfv3 => Options::V6 | Options::E | Options::R,
    }
}
