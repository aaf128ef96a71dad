//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::sync::LazyLock as Lazy;

use bytes::Bytes;
use tgen_ospf::packet::auth::{AuthEncodeCtx, AuthMethod};
use tgen_ospf::packet::error::DecodeError;
use tgen_ospf::packet::lsa::*;
use tgen_ospf::packet::*;
use tgen_ospf::version::Version;

const SRC_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
const DST_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::new(224, 0, 0, 5));

type TestPacket = (Vec<u8>, Option<(AuthMethod, u32)>, Packet);

//
// Helper functions.
//

fn test_encode_packet(
    bytes_expected: &[u8],
    auth_data: &Option<(AuthMethod, u32)>,
    packet: &Packet,
) {
    // Prepare authentication context.
    let auth = auth_data
        .as_ref()
        .map(|(method, seqno)| AuthEncodeCtx::new(method, *seqno));

    // Encode the packet.
    let bytes_actual = packet.encode(&SRC_ADDR, &DST_ADDR, auth);
    assert_eq!(bytes_expected, bytes_actual.as_ref());
}

fn test_decode_packet(
    bytes: &[u8],
    auth_data: &Option<(AuthMethod, u32)>,
    packet_expected: &Packet,
) {
    let auth = auth_data.as_ref().map(|(method, _)| method);

    // Decode the packet.
    let packet_actual =
        Packet::decode(Version::Ospfv2, bytes, &SRC_ADDR, &DST_ADDR, auth)
            .unwrap();
    assert_eq!(*packet_expected, packet_actual);
}

fn test_encode_lsa(bytes_expected: &[u8], lsa: &Lsa) {
    assert_eq!(bytes_expected, lsa.raw.as_ref());
}

fn test_decode_lsa(bytes: &[u8], lsa_expected: &Lsa) {
    let mut bytes = Bytes::copy_from_slice(bytes);
    let lsa_actual = Lsa::decode(Version::Ospfv2, &mut bytes).unwrap();
    assert_eq!(*lsa_expected, lsa_actual);
}

fn hdr(pkt_type: PacketType, router_id: &str, area_id: &str) -> PacketHdr {
    PacketHdr::new(
        Version::Ospfv2,
        pkt_type,
        Ipv4Addr::from_str(router_id).unwrap(),
        Ipv4Addr::from_str(area_id).unwrap(),
        0,
    )
}

//
// Test packets.
//

static HELLO1: Lazy<TestPacket> = Lazy::new(|| {
    (
        vec![
            0x02, 0x01, 0x00, 0x30, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00,
            0x01, 0xf6, 0x9e, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0xff, 0xff, 0xff, 0x00, 0x00, 0x03, 0x02, 0x01, 0x00,
            0x00, 0x00, 0x24, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x01, 0x01, 0x01, 0x01,
        ],
        None,
        Packet::Hello(Hello {
            hdr: hdr(PacketType::Hello, "2.2.2.2", "0.0.0.1"),
            network_mask: Ipv4Addr::from_str("255.255.255.0").unwrap(),
            iface_id: 0,
            hello_interval: 3,
            options: Options::E,
            priority: 1,
            dead_interval: 36,
            dr: None,
            bdr: None,
            neighbors: [Ipv4Addr::from_str("1.1.1.1").unwrap()].into(),
        }),
    )
});

static HELLO1_MD5: Lazy<TestPacket> = Lazy::new(|| {
    let mut hdr = hdr(PacketType::Hello, "1.1.1.1", "0.0.0.0");
    hdr.auth_seqno = Some(843436052);
    (
        vec![
            0x02, 0x01, 0x00, 0x34, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x01, 0x10, 0x32, 0x45,
            0xd0, 0x14, 0xff, 0xff, 0xff, 0x00, 0x00, 0x03, 0x02, 0x01, 0x00,
            0x00, 0x00, 0x0c, 0x0a, 0x00, 0x01, 0x03, 0x0a, 0x00, 0x01, 0x02,
            0x02, 0x02, 0x02, 0x02, 0x03, 0x03, 0x03, 0x03, 0x9d, 0xd5, 0xa8,
            0x03, 0x86, 0xee, 0x71, 0x67, 0x44, 0x1a, 0x37, 0xa9, 0x04, 0x27,
            0xfc, 0xc7,
        ],
        Some((
            AuthMethod::Md5 {
                key_id: 1,
                key: "HOLO".to_owned(),
            },
            843436052,
        )),
        Packet::Hello(Hello {
            hdr,
            network_mask: Ipv4Addr::from_str("255.255.255.0").unwrap(),
            iface_id: 0,
            hello_interval: 3,
            options: Options::E,
            priority: 1,
            dead_interval: 12,
            dr: Some(Ipv4Addr::from_str("10.0.1.3").unwrap()),
            bdr: Some(Ipv4Addr::from_str("10.0.1.2").unwrap()),
            neighbors: [
                Ipv4Addr::from_str("2.2.2.2").unwrap(),
                Ipv4Addr::from_str("3.3.3.3").unwrap(),
            ]
            .into(),
        }),
    )
});

static DBDESC1: Lazy<TestPacket> = Lazy::new(|| {
    (
        vec![
            0x02, 0x02, 0x00, 0x48, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00,
            0x01, 0xd8, 0x9e, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x05, 0xdc, 0x42, 0x00, 0x4e, 0xb8, 0x8f, 0x2e, 0x00,
            0x03, 0x02, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
            0x80, 0x00, 0x00, 0x02, 0x48, 0xd6, 0x00, 0x30, 0x00, 0x03, 0x02,
            0x05, 0xac, 0x10, 0x01, 0x00, 0x01, 0x01, 0x01, 0x01, 0x80, 0x00,
            0x00, 0x01, 0xfc, 0xff, 0x00, 0x24,
        ],
        None,
        Packet::DbDesc(DbDesc {
            hdr: hdr(PacketType::DbDesc, "1.1.1.1", "0.0.0.1"),
            mtu: 1500,
            options: Options::E | Options::O,
            dd_flags: DbDescFlags::empty(),
            dd_seq_no: 1320718126,
            lsa_hdrs: vec![
                LsaHdr {
                    age: 3,
                    options: Options::E,
                    lsa_type: LsaType::router(Version::Ospfv2),
                    lsa_id: Ipv4Addr::from_str("1.1.1.1").unwrap(),
                    adv_rtr: Ipv4Addr::from_str("1.1.1.1").unwrap(),
                    seq_no: 0x80000002,
                    cksum: 0x48d6,
                    length: 48,
                },
                LsaHdr {
                    age: 3,
                    options: Options::E,
                    lsa_type: LsaType::as_external(Version::Ospfv2),
                    lsa_id: Ipv4Addr::from_str("172.16.1.0").unwrap(),
                    adv_rtr: Ipv4Addr::from_str("1.1.1.1").unwrap(),
                    seq_no: 0x80000001,
                    cksum: 0xfcff,
                    length: 36,
                },
            ],
        }),
    )
});

static LSREQUEST1: Lazy<TestPacket> = Lazy::new(|| {
    (
        vec![
            0x02, 0x03, 0x00, 0x30, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00,
            0x01, 0x46, 0xab, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
            0x01, 0x01, 0x01, 0x00, 0x00, 0x00, 0x05, 0xac, 0x10, 0x01, 0x00,
            0x01, 0x01, 0x01, 0x01,
        ],
        None,
        Packet::LsRequest(LsRequest {
            hdr: hdr(PacketType::LsRequest, "2.2.2.2", "0.0.0.1"),
            entries: vec![
                LsaKey::new(
                    LsaType::router(Version::Ospfv2),
                    Ipv4Addr::from_str("1.1.1.1").unwrap(),
                    Ipv4Addr::from_str("1.1.1.1").unwrap(),
                ),
                LsaKey::new(
                    LsaType::as_external(Version::Ospfv2),
                    Ipv4Addr::from_str("172.16.1.0").unwrap(),
                    Ipv4Addr::from_str("1.1.1.1").unwrap(),
                ),
            ],
        }),
    )
});

static LSUPDATE1: Lazy<TestPacket> = Lazy::new(|| {
    (
        vec![
            0x02, 0x04, 0x00, 0x78, 0x02, 0x02, 0x02, 0x02, 0x00, 0x00, 0x00,
            0x01, 0x40, 0xa1, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x00, 0x31, 0x02, 0x01, 0x02,
            0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x80, 0x00, 0x00, 0x02,
            0x37, 0xf4, 0x00, 0x24, 0x01, 0x00, 0x00, 0x01, 0x0a, 0x00, 0x01,
            0x00, 0xff, 0xff, 0xff, 0x00, 0x03, 0x00, 0x00, 0x0a, 0x00, 0x31,
            0x02, 0x03, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x80,
            0x00, 0x00, 0x01, 0xd2, 0x7a, 0x00, 0x1c, 0xff, 0xff, 0xff, 0xff,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x31, 0x02, 0x03, 0x0a, 0x00, 0x02,
            0x00, 0x02, 0x02, 0x02, 0x02, 0x80, 0x00, 0x00, 0x01, 0xfa, 0x44,
            0x00, 0x1c, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0x0a,
        ],
        None,
        Packet::LsUpdate(LsUpdate {
            hdr: hdr(PacketType::LsUpdate, "2.2.2.2", "0.0.0.1"),
            lsas: vec![
                LSA1.1.clone(),
                // Summary-LSAs are carried as opaque bodies.
                Lsa::new(
                    Version::Ospfv2,
                    49,
                    Options::E,
                    LsaType(3),
                    Ipv4Addr::from_str("2.2.2.2").unwrap(),
                    Ipv4Addr::from_str("2.2.2.2").unwrap(),
                    0x80000001,
                    LsaBody::Unknown(Bytes::from_static(&[
                        0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00,
                    ])),
                ),
                Lsa::new(
                    Version::Ospfv2,
                    49,
                    Options::E,
                    LsaType(3),
                    Ipv4Addr::from_str("10.0.2.0").unwrap(),
                    Ipv4Addr::from_str("2.2.2.2").unwrap(),
                    0x80000001,
                    LsaBody::Unknown(Bytes::from_static(&[
                        0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0x0a,
                    ])),
                ),
            ],
        }),
    )
});

static LSACK1: Lazy<TestPacket> = Lazy::new(|| {
    let summary = |lsa_id: &str, cksum: u16| LsaHdr {
        age: 1,
        options: Options::E,
        lsa_type: LsaType(3),
        lsa_id: Ipv4Addr::from_str(lsa_id).unwrap(),
        adv_rtr: Ipv4Addr::from_str("2.2.2.2").unwrap(),
        seq_no: 0x80000001,
        cksum,
        length: 28,
    };
    (
        vec![
            0x02, 0x05, 0x00, 0x54, 0x01, 0x01, 0x01, 0x01, 0x00, 0x00, 0x00,
            0x01, 0xa0, 0x2e, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x01, 0x02, 0x03, 0x03, 0x03, 0x03, 0x03, 0x02,
            0x02, 0x02, 0x02, 0x80, 0x00, 0x00, 0x01, 0x09, 0x36, 0x00, 0x1c,
            0x00, 0x01, 0x02, 0x03, 0x0a, 0x00, 0x03, 0x00, 0x02, 0x02, 0x02,
            0x02, 0x80, 0x00, 0x00, 0x01, 0x54, 0xdf, 0x00, 0x1c, 0x00, 0x01,
            0x02, 0x03, 0x0a, 0x00, 0x04, 0x00, 0x02, 0x02, 0x02, 0x02, 0x80,
            0x00, 0x00, 0x01, 0x49, 0xe9, 0x00, 0x1c,
        ],
        None,
        Packet::LsAck(LsAck {
            hdr: hdr(PacketType::LsAck, "1.1.1.1", "0.0.0.1"),
            lsa_hdrs: vec![
                summary("3.3.3.3", 0x0936),
                summary("10.0.3.0", 0x54df),
                summary("10.0.4.0", 0x49e9),
            ],
        }),
    )
});

//
// Test LSAs.
//

static LSA1: Lazy<(Vec<u8>, Lsa)> = Lazy::new(|| {
    (
        vec![
            0x00, 0x31, 0x02, 0x01, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02,
            0x02, 0x80, 0x00, 0x00, 0x02, 0x37, 0xf4, 0x00, 0x24, 0x01, 0x00,
            0x00, 0x01, 0x0a, 0x00, 0x01, 0x00, 0xff, 0xff, 0xff, 0x00, 0x03,
            0x00, 0x00, 0x0a,
        ],
        Lsa::new(
            Version::Ospfv2,
            49,
            Options::E,
            LsaType::router(Version::Ospfv2),
            Ipv4Addr::from_str("2.2.2.2").unwrap(),
            Ipv4Addr::from_str("2.2.2.2").unwrap(),
            0x80000002,
            LsaBody::Router(LsaRouter {
                flags: LsaRouterFlags::B,
                options: Options::empty(),
                links: vec![LsaRouterLink {
                    link_type: LsaRouterLinkType::StubNetwork,
                    link_id: Ipv4Addr::from_str("10.0.1.0").unwrap(),
                    link_data: Ipv4Addr::from_str("255.255.255.0").unwrap(),
                    iface_id: 0,
                    nbr_iface_id: 0,
                    metric: 10,
                }],
            }),
        ),
    )
});

//
// Tests.
//

#[test]
fn test_encode_hello1() {
    let (ref bytes, ref auth, ref hello) = *HELLO1;
    test_encode_packet(bytes, auth, hello);
}

#[test]
fn test_decode_hello1() {
    let (ref bytes, ref auth, ref hello) = *HELLO1;
    test_decode_packet(bytes, auth, hello);
}

#[test]
fn test_encode_hello_md5() {
    let (ref bytes, ref auth, ref hello) = *HELLO1_MD5;
    test_encode_packet(bytes, auth, hello);
}

#[test]
fn test_decode_hello_md5() {
    let (ref bytes, ref auth, ref hello) = *HELLO1_MD5;
    test_decode_packet(bytes, auth, hello);
}

#[test]
fn test_decode_hello_md5_wrong_key() {
    let (ref bytes, _, _) = *HELLO1_MD5;
    let auth = AuthMethod::Md5 {
        key_id: 1,
        key: "OLOH".to_owned(),
    };
    let result = Packet::decode(
        Version::Ospfv2,
        bytes,
        &SRC_ADDR,
        &DST_ADDR,
        Some(&auth),
    );
    assert_eq!(result, Err(DecodeError::AuthFailed));
}

#[test]
fn test_decode_hello_auth_type_mismatch() {
    let (ref bytes, _, _) = *HELLO1_MD5;
    let result =
        Packet::decode(Version::Ospfv2, bytes, &SRC_ADDR, &DST_ADDR, None);
    assert_eq!(result, Err(DecodeError::AuthTypeMismatch));
}

#[test]
fn test_hello_cleartext() {
    let (_, _, ref hello) = *HELLO1;
    let auth = AuthMethod::Cleartext {
        key: "holo".to_owned(),
    };
    let auth_ctx = AuthEncodeCtx::new(&auth, 0);
    let bytes = hello.encode(&SRC_ADDR, &DST_ADDR, Some(auth_ctx));
    assert_eq!(&bytes[14..16], &[0x00, 0x01]);
    assert_eq!(&bytes[16..24], b"holo\0\0\0\0");

    let packet = Packet::decode(
        Version::Ospfv2,
        &bytes,
        &SRC_ADDR,
        &DST_ADDR,
        Some(&auth),
    )
    .unwrap();
    assert_eq!(packet, *hello);

    let wrong = AuthMethod::Cleartext {
        key: "olho".to_owned(),
    };
    let result = Packet::decode(
        Version::Ospfv2,
        &bytes,
        &SRC_ADDR,
        &DST_ADDR,
        Some(&wrong),
    );
    assert_eq!(result, Err(DecodeError::AuthFailed));
}

#[test]
fn test_decode_bad_checksum() {
    let (ref bytes, _, _) = *HELLO1;
    let mut bytes = bytes.clone();
    bytes[13] ^= 0xff;
    let result =
        Packet::decode(Version::Ospfv2, &bytes, &SRC_ADDR, &DST_ADDR, None);
    assert_eq!(result, Err(DecodeError::BadChecksum));
}

#[test]
fn test_decode_bad_version() {
    let (ref bytes, _, _) = *HELLO1;
    let result =
        Packet::decode(Version::Ospfv3, bytes, &SRC_ADDR, &DST_ADDR, None);
    assert_eq!(result, Err(DecodeError::BadVersion(2)));
}

#[test]
fn test_decode_truncated() {
    let (ref bytes, _, _) = *HELLO1;
    let result = Packet::decode(
        Version::Ospfv2,
        &bytes[..10],
        &SRC_ADDR,
        &DST_ADDR,
        None,
    );
    assert_eq!(result, Err(DecodeError::TooShort(10)));

    // Declared length larger than the received data.
    let result = Packet::decode(
        Version::Ospfv2,
        &bytes[..40],
        &SRC_ADDR,
        &DST_ADDR,
        None,
    );
    assert_eq!(result, Err(DecodeError::InvalidLength(48)));
}

#[test]
fn test_encode_dbdesc1() {
    let (ref bytes, ref auth, ref dbdescr) = *DBDESC1;
    test_encode_packet(bytes, auth, dbdescr);
}

#[test]
fn test_decode_dbdesc1() {
    let (ref bytes, ref auth, ref dbdescr) = *DBDESC1;
    test_decode_packet(bytes, auth, dbdescr);
}

#[test]
fn test_encode_lsrequest1() {
    let (ref bytes, ref auth, ref request) = *LSREQUEST1;
    test_encode_packet(bytes, auth, request);
}

#[test]
fn test_decode_lsrequest1() {
    let (ref bytes, ref auth, ref request) = *LSREQUEST1;
    test_decode_packet(bytes, auth, request);
}

#[test]
fn test_decode_lsrequest_wide_lsa_type() {
    let (ref bytes, _, _) = *LSREQUEST1;
    let mut bytes = bytes.clone();
    // LS type 0x00010001, with the checksum adjusted to match.
    bytes[25] = 0x01;
    bytes[13] = 0xaa;
    let result =
        Packet::decode(Version::Ospfv2, &bytes, &SRC_ADDR, &DST_ADDR, None);
    assert_eq!(result, Err(DecodeError::InvalidLsaType(0x00010001)));
}

#[test]
fn test_encode_lsupdate1() {
    let (ref bytes, ref auth, ref lsupdate) = *LSUPDATE1;
    test_encode_packet(bytes, auth, lsupdate);
}

#[test]
fn test_decode_lsupdate1() {
    let (ref bytes, ref auth, ref lsupdate) = *LSUPDATE1;
    test_decode_packet(bytes, auth, lsupdate);
}

#[test]
fn test_encode_lsack1() {
    let (ref bytes, ref auth, ref lsack) = *LSACK1;
    test_encode_packet(bytes, auth, lsack);
}

#[test]
fn test_decode_lsack1() {
    let (ref bytes, ref auth, ref lsack) = *LSACK1;
    test_decode_packet(bytes, auth, lsack);
}

#[test]
fn test_encode_lsa1() {
    let (ref bytes, ref lsa) = *LSA1;
    test_encode_lsa(bytes, lsa);
}

#[test]
fn test_decode_lsa1() {
    let (ref bytes, ref lsa) = *LSA1;
    test_decode_lsa(bytes, lsa);
}

#[test]
fn test_validate_lsa1() {
    let (ref bytes, _) = *LSA1;
    let mut bytes = Bytes::copy_from_slice(bytes);
    let lsa = Lsa::decode(Version::Ospfv2, &mut bytes).unwrap();
    assert!(lsa.validate(Version::Ospfv2).is_ok());

    // Corrupt the Link ID.
    let (ref bytes, _) = *LSA1;
    let mut bytes = bytes.clone();
    bytes[24] = 0x0b;
    let mut bytes = Bytes::from(bytes);
    let lsa = Lsa::decode(Version::Ospfv2, &mut bytes).unwrap();
    assert!(lsa.validate(Version::Ospfv2).is_err());
}
