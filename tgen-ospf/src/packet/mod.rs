//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

pub mod auth;
pub mod error;
pub mod lsa;

use std::collections::BTreeSet;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use bitflags::bitflags;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use derive_new::new;
use enum_as_inner::EnumAsInner;
use internet_checksum::Checksum;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use tgen_utils::bytes::BytesExt;

use crate::packet::auth::{
    AUTH_DATA_LEN, AuthEncodeCtx, AuthMethod, AuthType, MD5_DIGEST_LEN,
};
use crate::packet::error::{DecodeError, DecodeResult};
use crate::packet::lsa::{Lsa, LsaHdr, LsaKey, LsaType};
use crate::version::{Field, Version};

// IP protocol number used by OSPF.
pub const IPPROTO_OSPF: u8 = 89;

// Minimum and maximum total packet length.
pub const PACKET_MIN_LENGTH: usize = 16;
pub const PACKET_MAX_LENGTH: usize = u16::MAX as usize;

// OSPFv2 authentication data range, excluded from the packet checksum.
const AUTH_RANGE: std::ops::Range<usize> = 16..24;

// Database Description flags.
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct DbDescFlags: u8 {
        const MS = 0x01;
        const M = 0x02;
        const I = 0x04;
    }
}

// OSPF Options.
//
// OSPFv2 uses the lower 8 bits, OSPFv3 uses 24 bits. A few bits were
// reassigned between versions; both names are provided for those.
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct Options: u32 {
        const MT = 0x01;
        const V6 = 0x01;
        const E = 0x02;
        const MC = 0x04;
        const NP = 0x08;
        const L = 0x10;
        const R = 0x10;
        const DC = 0x20;
        const O = 0x40;
        const DN = 0x80;
        const AF = 0x100;
    }
}

// OSPF Packet Type.
//
// IANA registry:
// https://www.iana.org/assignments/ospfv2-parameters/ospfv2-parameters.xhtml#ospfv2-parameters-3
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(FromPrimitive, Deserialize, Serialize)]
pub enum PacketType {
    Hello = 0x01,
    DbDesc = 0x02,
    LsRequest = 0x03,
    LsUpdate = 0x04,
    LsAck = 0x05,
}

// OSPF packet.
#[derive(Clone, Debug, EnumAsInner, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum Packet {
    Hello(Hello),
    DbDesc(DbDesc),
    LsRequest(LsRequest),
    LsUpdate(LsUpdate),
    LsAck(LsAck),
}

//
// OSPF packet header.
//
// Encoding format (OSPFv2):
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |   Version #   |     Type      |         Packet length         |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                          Router ID                            |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                           Area ID                             |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |           Checksum            |             AuType            |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                       Authentication                          |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                       Authentication                          |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
// OSPFv3 replaces AuType and Authentication with the Instance ID followed
// by a reserved octet.
//
#[derive(Clone, Debug, Eq, PartialEq, new)]
#[derive(Deserialize, Serialize)]
pub struct PacketHdr {
    pub version: Version,
    pub pkt_type: PacketType,
    pub router_id: Ipv4Addr,
    pub area_id: Ipv4Addr,
    // OSPFv3 only.
    pub instance_id: u8,
    // Cryptographic sequence number of received packets.
    #[new(default)]
    pub auth_seqno: Option<u32>,
}

// OSPFv2 authentication fields of a received packet.
#[derive(Clone, Copy, Debug)]
enum PacketHdrAuth {
    Null,
    Simple([u8; AUTH_DATA_LEN]),
    Cryptographic { key_id: u8, auth_len: u8, seqno: u32 },
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct Hello {
    pub hdr: PacketHdr,
    // OSPFv2 only.
    pub network_mask: Ipv4Addr,
    // OSPFv3 only.
    pub iface_id: u32,
    pub hello_interval: u16,
    pub options: Options,
    pub priority: u8,
    pub dead_interval: u32,
    pub dr: Option<Ipv4Addr>,
    pub bdr: Option<Ipv4Addr>,
    pub neighbors: BTreeSet<Ipv4Addr>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct DbDesc {
    pub hdr: PacketHdr,
    pub mtu: u16,
    pub options: Options,
    pub dd_flags: DbDescFlags,
    pub dd_seq_no: u32,
    pub lsa_hdrs: Vec<LsaHdr>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct LsRequest {
    pub hdr: PacketHdr,
    pub entries: Vec<LsaKey>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct LsUpdate {
    pub hdr: PacketHdr,
    pub lsas: Vec<Lsa>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub struct LsAck {
    pub hdr: PacketHdr,
    pub lsa_hdrs: Vec<LsaHdr>,
}

// ===== impl PacketHdr =====

impl PacketHdr {
    // Decodes and sanity checks the common packet header.
    //
    // Returns the header, the declared packet length and the OSPFv2
    // authentication fields.
    fn decode(
        version: Version,
        data: &[u8],
    ) -> DecodeResult<(Self, usize, PacketHdrAuth)> {
        if data.len() < PACKET_MIN_LENGTH {
            return Err(DecodeError::TooShort(data.len()));
        }

        // Check version.
        let pkt_version = data[0];
        if pkt_version != version as u8 {
            return Err(DecodeError::BadVersion(pkt_version));
        }
        let hdr_len = version.hdr_length();
        if data.len() < hdr_len {
            return Err(DecodeError::TooShort(data.len()));
        }

        // Parse and validate message type.
        let pkt_type = data[1];
        let pkt_type = PacketType::from_u8(pkt_type)
            .ok_or(DecodeError::UnknownPacketType(pkt_type))?;

        // Parse and validate message length.
        let pkt_len = u16::from_be_bytes([data[2], data[3]]);
        if (pkt_len as usize) < hdr_len || pkt_len as usize > data.len() {
            return Err(DecodeError::InvalidLength(pkt_len));
        }

        let router_id = Ipv4Addr::from(Field::new(4, 4).read(data));
        let area_id = Ipv4Addr::from(Field::new(8, 4).read(data));
        let (instance_id, hdr_auth) = match version {
            Version::Ospfv2 => {
                let au_type = u16::from_be_bytes([data[14], data[15]]);
                let hdr_auth = match AuthType::from_u16(au_type) {
                    Some(AuthType::Null) => PacketHdrAuth::Null,
                    Some(AuthType::Simple) => {
                        let mut auth_data = [0; AUTH_DATA_LEN];
                        auth_data.copy_from_slice(&data[AUTH_RANGE]);
                        PacketHdrAuth::Simple(auth_data)
                    }
                    Some(AuthType::Cryptographic) => {
                        PacketHdrAuth::Cryptographic {
                            key_id: data[18],
                            auth_len: data[19],
                            seqno: Field::new(20, 4).read(data),
                        }
                    }
                    None => {
                        return Err(DecodeError::UnsupportedAuthType(au_type));
                    }
                };
                (0, hdr_auth)
            }
            Version::Ospfv3 => (data[14], PacketHdrAuth::Null),
        };

        let hdr = PacketHdr {
            version,
            pkt_type,
            router_id,
            area_id,
            instance_id,
            auth_seqno: None,
        };
        Ok((hdr, pkt_len as usize, hdr_auth))
    }

    // Encodes the packet header into the beginning of the buffer. The
    // packet length and checksum are filled in later.
    fn encode(&self, buf: &mut BytesMut, auth: Option<AuthEncodeCtx<'_>>) {
        buf[0] = self.version as u8;
        buf[1] = self.pkt_type as u8;
        Field::new(4, 4).write(buf, self.router_id.into());
        Field::new(8, 4).write(buf, self.area_id.into());
        match self.version {
            Version::Ospfv2 => {
                let au_type = auth
                    .map(|auth| auth.method.auth_type())
                    .unwrap_or(AuthType::Null);
                Field::new(14, 2).write(buf, au_type as u32);
                match auth.map(|auth| (auth.method, auth.seqno)) {
                    Some((AuthMethod::Cleartext { key }, _)) => {
                        buf[AUTH_RANGE]
                            .copy_from_slice(&AuthMethod::cleartext_data(key));
                    }
                    Some((AuthMethod::Md5 { key_id, .. }, seqno)) => {
                        buf[18] = *key_id;
                        buf[19] = MD5_DIGEST_LEN as u8;
                        Field::new(20, 4).write(buf, seqno);
                    }
                    None => (),
                }
            }
            Version::Ospfv3 => {
                buf[14] = self.instance_id;
            }
        }
    }
}

// ===== impl Hello =====

impl Hello {
    fn decode(hdr: PacketHdr, data: &[u8]) -> DecodeResult<Self> {
        let layout = hdr.version.hello_layout();
        let neighbors = trailer(data, layout.neighbors, 4)?;

        Ok(Hello {
            network_mask: layout
                .network_mask
                .map(|field| Ipv4Addr::from(field.read(data)))
                .unwrap_or(Ipv4Addr::UNSPECIFIED),
            iface_id: layout
                .iface_id
                .map(|field| field.read(data))
                .unwrap_or(0),
            hello_interval: layout.hello_interval.read(data) as u16,
            options: Options::from_bits_retain(layout.options.read(data)),
            priority: layout.priority.read(data) as u8,
            dead_interval: layout.dead_interval.read(data),
            dr: opt_ipv4(layout.dr.read(data)),
            bdr: opt_ipv4(layout.bdr.read(data)),
            neighbors: neighbors
                .chunks_exact(4)
                .map(|mut chunk| chunk.get_ipv4())
                .collect(),
            hdr,
        })
    }

    fn encode(&self, buf: &mut BytesMut) {
        let layout = self.hdr.version.hello_layout();
        if let Some(field) = layout.network_mask {
            field.write(buf, self.network_mask.into());
        }
        if let Some(field) = layout.iface_id {
            field.write(buf, self.iface_id);
        }
        layout
            .hello_interval
            .write(buf, self.hello_interval as u32);
        layout.options.write(buf, self.options.bits());
        layout.priority.write(buf, self.priority as u32);
        layout.dead_interval.write(buf, self.dead_interval);
        layout.dr.write(buf, self.dr.map(u32::from).unwrap_or(0));
        layout.bdr.write(buf, self.bdr.map(u32::from).unwrap_or(0));
        for nbr in &self.neighbors {
            buf.put_u32((*nbr).into());
        }
    }
}

// ===== impl DbDesc =====

impl DbDesc {
    // Size of the fixed part of the packet.
    pub fn base_length(version: Version) -> usize {
        version.dbdesc_layout().lsa_hdrs
    }

    fn decode(hdr: PacketHdr, data: &[u8]) -> DecodeResult<Self> {
        let layout = hdr.version.dbdesc_layout();
        let lsa_hdrs = trailer(data, layout.lsa_hdrs, LsaHdr::LENGTH as usize)?;
        let mut lsa_hdrs = Bytes::copy_from_slice(lsa_hdrs);

        Ok(DbDesc {
            mtu: layout.mtu.read(data) as u16,
            options: Options::from_bits_retain(layout.options.read(data)),
            dd_flags: DbDescFlags::from_bits_truncate(
                layout.dd_flags.read(data) as u8,
            ),
            dd_seq_no: layout.dd_seq_no.read(data),
            lsa_hdrs: std::iter::from_fn(|| {
                lsa_hdrs
                    .has_remaining()
                    .then(|| LsaHdr::decode(hdr.version, &mut lsa_hdrs))
            })
            .collect::<Result<_, _>>()?,
            hdr,
        })
    }

    fn encode(&self, buf: &mut BytesMut) {
        let version = self.hdr.version;
        let layout = version.dbdesc_layout();
        layout.mtu.write(buf, self.mtu as u32);
        layout.options.write(buf, self.options.bits());
        layout.dd_flags.write(buf, self.dd_flags.bits() as u32);
        layout.dd_seq_no.write(buf, self.dd_seq_no);
        for lsa_hdr in &self.lsa_hdrs {
            lsa_hdr.encode(version, buf);
        }
    }
}

// ===== impl LsRequest =====

impl LsRequest {
    pub const ENTRY_LENGTH: usize = 12;

    fn decode(hdr: PacketHdr, data: &[u8]) -> DecodeResult<Self> {
        let entries =
            trailer(data, hdr.version.hdr_length(), Self::ENTRY_LENGTH)?;

        let entries = entries
            .chunks_exact(Self::ENTRY_LENGTH)
            .map(|mut chunk| -> DecodeResult<LsaKey> {
                // OSPFv2 encodes the LS type as a 32-bit field, while OSPFv3
                // precedes the 16-bit LS type with a reserved field.
                let lsa_type = chunk.get_u32();
                let lsa_type = match hdr.version {
                    Version::Ospfv2 => u16::try_from(lsa_type)
                        .map_err(|_| DecodeError::InvalidLsaType(lsa_type))?,
                    Version::Ospfv3 => lsa_type as u16,
                };
                let lsa_id = chunk.get_ipv4();
                let adv_rtr = chunk.get_ipv4();
                Ok(LsaKey::new(LsaType(lsa_type), lsa_id, adv_rtr))
            })
            .collect::<DecodeResult<_>>()?;

        Ok(LsRequest { entries, hdr })
    }

    fn encode(&self, buf: &mut BytesMut) {
        for entry in &self.entries {
            buf.put_u32(entry.lsa_type.0 as u32);
            buf.put_u32(entry.lsa_id.into());
            buf.put_u32(entry.adv_rtr.into());
        }
    }
}

// ===== impl LsUpdate =====

impl LsUpdate {
    pub const BASE_LENGTH: usize = 4;

    fn decode(hdr: PacketHdr, data: &[u8]) -> DecodeResult<Self> {
        let hdr_len = hdr.version.hdr_length();
        if data.len() < hdr_len + Self::BASE_LENGTH {
            return Err(DecodeError::TooShort(data.len()));
        }
        let mut buf = Bytes::copy_from_slice(&data[hdr_len..]);
        let lsas_cnt = buf.get_u32();

        let mut lsas = vec![];
        for _ in 0..lsas_cnt {
            let lsa = Lsa::decode(hdr.version, &mut buf)?;
            lsas.push(lsa);
        }

        Ok(LsUpdate { hdr, lsas })
    }

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.lsas.len() as u32);
        for lsa in &self.lsas {
            buf.put_slice(&lsa.raw);
        }
    }
}

// ===== impl LsAck =====

impl LsAck {
    fn decode(hdr: PacketHdr, data: &[u8]) -> DecodeResult<Self> {
        let lsa_hdrs =
            trailer(data, hdr.version.hdr_length(), LsaHdr::LENGTH as usize)?;
        let mut lsa_hdrs = Bytes::copy_from_slice(lsa_hdrs);

        Ok(LsAck {
            lsa_hdrs: std::iter::from_fn(|| {
                lsa_hdrs
                    .has_remaining()
                    .then(|| LsaHdr::decode(hdr.version, &mut lsa_hdrs))
            })
            .collect::<Result<_, _>>()?,
            hdr,
        })
    }

    fn encode(&self, buf: &mut BytesMut) {
        for lsa_hdr in &self.lsa_hdrs {
            lsa_hdr.encode(self.hdr.version, buf);
        }
    }
}

// ===== impl Packet =====

impl Packet {
    // Decodes OSPF packet from a bytes buffer.
    //
    // The source and destination addresses are only used to validate the
    // OSPFv3 checksum.
    pub fn decode(
        version: Version,
        data: &[u8],
        src: &IpAddr,
        dst: &IpAddr,
        auth: Option<&AuthMethod>,
    ) -> DecodeResult<Self> {
        // Decode the packet header.
        let (mut hdr, pkt_len, hdr_auth) = PacketHdr::decode(version, data)?;
        let pkt = &data[..pkt_len];

        // Verify the packet checksum. Cryptographic authentication replaces
        // the checksum with the message digest.
        let cksum_valid = match version {
            Version::Ospfv2 => {
                matches!(hdr_auth, PacketHdrAuth::Cryptographic { .. })
                    || ospfv2_cksum(pkt) == [0; 2]
            }
            Version::Ospfv3 => {
                ospfv3_cksum(pkt, &to_ipv6(src), &to_ipv6(dst)) == [0; 2]
            }
        };
        if !cksum_valid {
            return Err(DecodeError::BadChecksum);
        }

        // Validate the packet authentication.
        hdr.auth_seqno = decode_auth_validate(data, pkt_len, hdr_auth, auth)?;

        // Decode the packet body.
        let packet = match hdr.pkt_type {
            PacketType::Hello => Packet::Hello(Hello::decode(hdr, pkt)?),
            PacketType::DbDesc => Packet::DbDesc(DbDesc::decode(hdr, pkt)?),
            PacketType::LsRequest => {
                Packet::LsRequest(LsRequest::decode(hdr, pkt)?)
            }
            PacketType::LsUpdate => {
                Packet::LsUpdate(LsUpdate::decode(hdr, pkt)?)
            }
            PacketType::LsAck => Packet::LsAck(LsAck::decode(hdr, pkt)?),
        };

        Ok(packet)
    }

    // Encodes OSPF packet into a bytes buffer.
    pub fn encode(
        &self,
        src: &IpAddr,
        dst: &IpAddr,
        auth: Option<AuthEncodeCtx<'_>>,
    ) -> Bytes {
        let hdr = self.hdr();
        let fixed_len = match self {
            Packet::Hello(_) => hdr.version.hello_layout().neighbors,
            Packet::DbDesc(_) => DbDesc::base_length(hdr.version),
            _ => hdr.version.hdr_length(),
        };

        let mut buf = packet_encode_start(hdr, fixed_len, auth);
        match self {
            Packet::Hello(pkt) => pkt.encode(&mut buf),
            Packet::DbDesc(pkt) => pkt.encode(&mut buf),
            Packet::LsRequest(pkt) => pkt.encode(&mut buf),
            Packet::LsUpdate(pkt) => pkt.encode(&mut buf),
            Packet::LsAck(pkt) => pkt.encode(&mut buf),
        }
        packet_encode_end(buf, hdr.version, src, dst, auth)
    }

    // Returns a reference to the packet header.
    pub fn hdr(&self) -> &PacketHdr {
        match self {
            Packet::Hello(pkt) => &pkt.hdr,
            Packet::DbDesc(pkt) => &pkt.hdr,
            Packet::LsRequest(pkt) => &pkt.hdr,
            Packet::LsUpdate(pkt) => &pkt.hdr,
            Packet::LsAck(pkt) => &pkt.hdr,
        }
    }
}

// ===== helper functions =====

fn packet_encode_start(
    hdr: &PacketHdr,
    fixed_len: usize,
    auth: Option<AuthEncodeCtx<'_>>,
) -> BytesMut {
    let mut buf = BytesMut::zeroed(fixed_len);
    hdr.encode(&mut buf, auth);
    buf
}

fn packet_encode_end(
    mut buf: BytesMut,
    version: Version,
    src: &IpAddr,
    dst: &IpAddr,
    auth: Option<AuthEncodeCtx<'_>>,
) -> Bytes {
    // Initialize packet length.
    let pkt_len = buf.len() as u16;
    buf[2..4].copy_from_slice(&pkt_len.to_be_bytes());

    // Calculate the packet checksum or append the authentication trailer.
    match (version, auth.map(|auth| auth.method)) {
        (Version::Ospfv2, Some(AuthMethod::Md5 { key, .. })) => {
            let digest = auth::md5_digest(&buf, key);
            buf.put_slice(&digest);
        }
        (Version::Ospfv2, _) => {
            let cksum = ospfv2_cksum(&buf);
            buf[12..14].copy_from_slice(&cksum);
        }
        (Version::Ospfv3, _) => {
            let cksum = ospfv3_cksum(&buf, &to_ipv6(src), &to_ipv6(dst));
            buf[12..14].copy_from_slice(&cksum);
        }
    }

    buf.freeze()
}

fn decode_auth_validate(
    data: &[u8],
    pkt_len: usize,
    hdr_auth: PacketHdrAuth,
    auth: Option<&AuthMethod>,
) -> DecodeResult<Option<u32>> {
    match (hdr_auth, auth) {
        (PacketHdrAuth::Null, None) => Ok(None),
        (
            PacketHdrAuth::Simple(auth_data),
            Some(AuthMethod::Cleartext { key }),
        ) => {
            if auth_data != AuthMethod::cleartext_data(key) {
                return Err(DecodeError::AuthFailed);
            }
            Ok(None)
        }
        (
            PacketHdrAuth::Cryptographic {
                key_id,
                auth_len,
                seqno,
            },
            Some(AuthMethod::Md5 {
                key_id: cfg_key_id,
                key,
            }),
        ) => {
            // Sanity checks.
            if auth_len as usize != MD5_DIGEST_LEN || key_id != *cfg_key_id {
                return Err(DecodeError::AuthFailed);
            }

            // Get the authentication trailer.
            let Some(auth_trailer) = data.get(pkt_len..pkt_len + MD5_DIGEST_LEN)
            else {
                return Err(DecodeError::AuthFailed);
            };

            // Check if the received message digest is valid.
            let digest = auth::md5_digest(&data[..pkt_len], key);
            if *auth_trailer != digest {
                return Err(DecodeError::AuthFailed);
            }

            Ok(Some(seqno))
        }
        // Discard the packet if its authentication type doesn't match the
        // interface's configured authentication type.
        _ => Err(DecodeError::AuthTypeMismatch),
    }
}

// Returns the variable-length trailer starting at `offset`, checking that it
// holds a whole number of elements.
fn trailer(
    data: &[u8],
    offset: usize,
    elem_size: usize,
) -> DecodeResult<&[u8]> {
    if data.len() < offset {
        return Err(DecodeError::TooShort(data.len()));
    }
    let trailer = &data[offset..];
    if trailer.len() % elem_size != 0 {
        return Err(DecodeError::TruncatedTrailer);
    }
    Ok(trailer)
}

fn opt_ipv4(value: u32) -> Option<Ipv4Addr> {
    Some(Ipv4Addr::from(value)).filter(|addr| !addr.is_unspecified())
}

fn to_ipv6(addr: &IpAddr) -> Ipv6Addr {
    match addr {
        IpAddr::V4(addr) => addr.to_ipv6_mapped(),
        IpAddr::V6(addr) => *addr,
    }
}

// OSPFv2 checksum: the standard IP checksum of the entire packet, excluding
// the 64-bit authentication field.
fn ospfv2_cksum(data: &[u8]) -> [u8; 2] {
    let mut cksum = Checksum::new();
    cksum.add_bytes(&data[..AUTH_RANGE.start]);
    cksum.add_bytes(&data[AUTH_RANGE.end..]);
    cksum.checksum()
}

// OSPFv3 checksum: the standard IPv6 upper-layer checksum, covering the IPv6
// pseudo-header.
fn ospfv3_cksum(data: &[u8], src: &Ipv6Addr, dst: &Ipv6Addr) -> [u8; 2] {
    let mut cksum = Checksum::new();
    cksum.add_bytes(&src.octets());
    cksum.add_bytes(&dst.octets());
    cksum.add_bytes(&(data.len() as u32).to_be_bytes());
    cksum.add_bytes(&[0, 0, 0, IPPROTO_OSPF]);
    cksum.add_bytes(data);
    cksum.checksum()
}
