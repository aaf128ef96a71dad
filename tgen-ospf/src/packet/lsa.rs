//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::net::Ipv4Addr;

use bitflags::bitflags;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use derive_new::new;
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};
use tgen_utils::bytes::{BytesExt, BytesMutExt};
use tokio::time::Instant;

use crate::lsdb::{LSA_MAX_AGE, LSA_RESERVED_SEQ_NO};
use crate::packet::Options;
use crate::packet::error::{DecodeError, DecodeResult, LsaValidationError};
use crate::version::Version;

// OSPF LSA type.
//
// OSPFv2 types only use the lower byte. OSPFv3 types carry the U-bit, the
// flooding scope and the function code.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[derive(Deserialize, Serialize)]
#[serde(transparent)]
pub struct LsaType(pub u16);

// OSPF LSA flooding scope.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum LsaScope {
    Link,
    Area,
    As,
    Unknown,
}

// OSPF LSA key. It serves both as a global LSA identifier and as a key to
// store LSAs in the LSDB and in the neighbor queues.
//
// Please be aware that modifying the order of the fields will impact the
// order in which the LSDB is summarized during the database exchange.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, new)]
#[derive(Deserialize, Serialize)]
pub struct LsaKey {
    pub lsa_type: LsaType,
    pub lsa_id: Ipv4Addr,
    pub adv_rtr: Ipv4Addr,
}

//
// OSPF LSA header.
//
// Encoding format (OSPFv2):
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |            LS age             |    Options    |    LS type    |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                        Link State ID                          |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                     Advertising Router                        |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                     LS sequence number                        |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |         LS checksum           |             length            |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//
// OSPFv3 replaces the Options and LS type octets with a 16-bit LS type.
//
#[derive(Clone, Copy, Debug, Eq, PartialEq, new)]
#[derive(Deserialize, Serialize)]
pub struct LsaHdr {
    pub age: u16,
    // OSPFv2 only.
    pub options: Options,
    pub lsa_type: LsaType,
    pub lsa_id: Ipv4Addr,
    pub adv_rtr: Ipv4Addr,
    pub seq_no: u32,
    pub cksum: u16,
    pub length: u16,
}

// OSPF LSA.
#[derive(Clone, Debug, Eq)]
#[derive(Deserialize, Serialize)]
pub struct Lsa {
    // LSA raw bytes.
    #[serde(skip)]
    pub raw: Bytes,
    // LSA header.
    pub hdr: LsaHdr,
    // LSA body.
    pub body: LsaBody,
    // Time the LSA was originated or received. When combined with the Age
    // field in the LSA header, the actual LSA age can be determined.
    #[serde(skip)]
    pub base_time: Option<Instant>,
}

// OSPF LSA body.
//
// Only the LSA types originated by this implementation are fully decoded.
// The remaining ones are stored and flooded as opaque data.
#[derive(Clone, Debug, Eq, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum LsaBody {
    Router(LsaRouter),
    Network(LsaNetwork),
    Unknown(Bytes),
}

// OSPF Router-LSA flags.
bitflags! {
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
    #[derive(Deserialize, Serialize)]
    #[serde(transparent)]
    pub struct LsaRouterFlags: u8 {
        const B = 0x01;
        const E = 0x02;
        const V = 0x04;
    }
}

//
// OSPF Router-LSA.
//
// Encoding format (OSPFv2):
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |    0    |V|E|B|        0      |            # links            |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                          Link ID                              |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                         Link Data                             |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |     Type      |     # TOS     |            metric             |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                              ...                              |
//
// Encoding format (OSPFv3):
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |  0  |Nt|x|V|E|B|            Options                            |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |     Type      |       0       |          Metric               |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                      Interface ID                             |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                   Neighbor Interface ID                       |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                    Neighbor Router ID                         |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                              ...                              |
//
#[derive(Clone, Debug, Default, Eq, PartialEq, new)]
#[derive(Deserialize, Serialize)]
pub struct LsaRouter {
    pub flags: LsaRouterFlags,
    // OSPFv3 only.
    pub options: Options,
    pub links: Vec<LsaRouterLink>,
}

#[derive(Clone, Copy, Debug, Eq, FromPrimitive, PartialEq)]
#[derive(Deserialize, Serialize)]
pub enum LsaRouterLinkType {
    PointToPoint = 0x01,
    TransitNetwork = 0x02,
    StubNetwork = 0x03,
    VirtualLink = 0x04,
}

#[derive(Clone, Debug, Eq, PartialEq, new)]
#[derive(Deserialize, Serialize)]
pub struct LsaRouterLink {
    pub link_type: LsaRouterLinkType,
    // OSPFv2: Link ID. OSPFv3: Neighbor Router ID.
    pub link_id: Ipv4Addr,
    // OSPFv2 only.
    pub link_data: Ipv4Addr,
    // OSPFv3 only.
    pub iface_id: u32,
    // OSPFv3 only.
    pub nbr_iface_id: u32,
    pub metric: u16,
}

//
// OSPF Network-LSA.
//
// Encoding format (OSPFv2):
//
//  0                   1                   2                   3
//  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                         Network Mask                          |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                        Attached Router                        |
// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
// |                              ...                              |
//
// OSPFv3 replaces the Network Mask with a reserved octet and 24 bits of
// options.
//
#[derive(Clone, Debug, Eq, PartialEq, new)]
#[derive(Deserialize, Serialize)]
pub struct LsaNetwork {
    // OSPFv2 only.
    pub mask: Ipv4Addr,
    // OSPFv3 only.
    pub options: Options,
    pub attached_rtrs: Vec<Ipv4Addr>,
}

// ===== impl LsaType =====

impl LsaType {
    pub const fn router(version: Version) -> LsaType {
        match version {
            Version::Ospfv2 => LsaType(1),
            Version::Ospfv3 => LsaType(0x2001),
        }
    }

    pub const fn network(version: Version) -> LsaType {
        match version {
            Version::Ospfv2 => LsaType(2),
            Version::Ospfv3 => LsaType(0x2002),
        }
    }

    pub const fn as_external(version: Version) -> LsaType {
        match version {
            Version::Ospfv2 => LsaType(5),
            Version::Ospfv3 => LsaType(0x4005),
        }
    }

    pub fn scope(&self, version: Version) -> LsaScope {
        match version {
            Version::Ospfv2 => match self.0 {
                1..=4 | 7 | 10 => LsaScope::Area,
                5 | 11 => LsaScope::As,
                9 => LsaScope::Link,
                _ => LsaScope::Unknown,
            },
            Version::Ospfv3 => match (self.0 & 0x6000) >> 13 {
                0 => LsaScope::Link,
                1 => LsaScope::Area,
                2 => LsaScope::As,
                _ => LsaScope::Unknown,
            },
        }
    }

    // Returns whether LSAs of this type can be stored and flooded.
    pub fn is_valid(&self, version: Version) -> bool {
        self.scope(version) != LsaScope::Unknown
    }
}

impl std::fmt::Display for LsaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

// ===== impl LsaKey =====

impl std::fmt::Display for LsaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} {} {}]", self.lsa_type, self.lsa_id, self.adv_rtr)
    }
}

// ===== impl LsaHdr =====

impl LsaHdr {
    pub const LENGTH: u16 = 20;

    pub fn decode(version: Version, buf: &mut Bytes) -> DecodeResult<Self> {
        if buf.remaining() < Self::LENGTH as usize {
            return Err(DecodeError::InvalidLsaLength);
        }
        let age = buf.get_u16();
        let (options, lsa_type) = match version {
            Version::Ospfv2 => {
                let options = Options::from_bits_retain(buf.get_u8() as u32);
                (options, LsaType(buf.get_u8() as u16))
            }
            Version::Ospfv3 => (Options::empty(), LsaType(buf.get_u16())),
        };
        let lsa_id = buf.get_ipv4();
        let adv_rtr = buf.get_ipv4();
        let seq_no = buf.get_u32();
        let cksum = buf.get_u16();
        let length = buf.get_u16();

        Ok(LsaHdr {
            age,
            options,
            lsa_type,
            lsa_id,
            adv_rtr,
            seq_no,
            cksum,
            length,
        })
    }

    pub fn encode(&self, version: Version, buf: &mut BytesMut) {
        buf.put_u16(self.age);
        match version {
            Version::Ospfv2 => {
                buf.put_u8(self.options.bits() as u8);
                buf.put_u8(self.lsa_type.0 as u8);
            }
            Version::Ospfv3 => {
                buf.put_u16(self.lsa_type.0);
            }
        }
        buf.put_ipv4(&self.lsa_id);
        buf.put_ipv4(&self.adv_rtr);
        buf.put_u32(self.seq_no);
        buf.put_u16(self.cksum);
        buf.put_u16(self.length);
    }

    pub fn key(&self) -> LsaKey {
        LsaKey::new(self.lsa_type, self.lsa_id, self.adv_rtr)
    }

    pub fn is_maxage(&self) -> bool {
        self.age == LSA_MAX_AGE
    }
}

// ===== impl Lsa =====

impl Lsa {
    // LSA maximum length
    //
    // Opt for a conservative value to avoid packet fragmentation even in
    // low-MTU links.
    pub const MAX_LENGTH: usize = 1024;

    pub fn new(
        version: Version,
        age: u16,
        options: Options,
        lsa_type: LsaType,
        lsa_id: Ipv4Addr,
        adv_rtr: Ipv4Addr,
        seq_no: u32,
        body: LsaBody,
    ) -> Self {
        // The length and checksum are computed during encoding.
        let hdr =
            LsaHdr::new(age, options, lsa_type, lsa_id, adv_rtr, seq_no, 0, 0);
        let mut lsa = Lsa {
            raw: Default::default(),
            hdr,
            body,
            base_time: None,
        };
        lsa.encode(version);
        lsa
    }

    // Returns the LSA age at the given time.
    pub fn age(&self, now: Instant) -> u16 {
        match self.base_time {
            Some(base_time) => {
                let elapsed = now.saturating_duration_since(base_time);
                let elapsed =
                    u16::try_from(elapsed.as_secs()).unwrap_or(u16::MAX);
                std::cmp::min(self.hdr.age.saturating_add(elapsed), LSA_MAX_AGE)
            }
            None => self.hdr.age,
        }
    }

    // Returns a copy of the LSA header with the age field updated.
    pub fn hdr_at(&self, now: Instant) -> LsaHdr {
        let mut hdr = self.hdr;
        hdr.age = self.age(now);
        hdr
    }

    // Updates the LSA age, restarting the aging clock at `now`.
    pub fn set_age(&mut self, age: u16, now: Option<Instant>) {
        self.hdr.age = age;

        // The Age field isn't covered by the LSA checksum.
        let mut raw = BytesMut::from(self.raw.as_ref());
        raw[0..2].copy_from_slice(&age.to_be_bytes());
        self.raw = raw.freeze();

        self.base_time = now;
    }

    // Sets the LSA age to MaxAge.
    pub fn set_maxage(&mut self, now: Instant) {
        self.set_age(LSA_MAX_AGE, Some(now));
    }

    pub fn key(&self) -> LsaKey {
        self.hdr.key()
    }

    // Decodes an LSA from a bytes buffer.
    pub fn decode(version: Version, buf: &mut Bytes) -> DecodeResult<Self> {
        let buf_orig = buf.clone();
        let hdr = LsaHdr::decode(version, buf)?;
        if hdr.length < LsaHdr::LENGTH {
            return Err(DecodeError::InvalidLsaLength);
        }
        let body_len = (hdr.length - LsaHdr::LENGTH) as usize;
        if buf.remaining() < body_len {
            return Err(DecodeError::InvalidLsaLength);
        }
        let mut buf_body = buf.split_to(body_len);
        let body = LsaBody::decode(version, hdr.lsa_type, &mut buf_body)?;

        Ok(Lsa {
            raw: buf_orig.slice(0..hdr.length as usize),
            hdr,
            body,
            base_time: None,
        })
    }

    // Encodes the LSA, updating its length, checksum and raw data.
    pub fn encode(&mut self, version: Version) {
        let mut buf = BytesMut::with_capacity(Self::MAX_LENGTH);
        self.hdr.encode(version, &mut buf);
        self.body.encode(version, &mut buf);

        // Rewrite LSA length.
        let lsa_len = buf.len() as u16;
        buf[18..20].copy_from_slice(&lsa_len.to_be_bytes());
        self.hdr.length = lsa_len;

        // Compute LSA checksum.
        buf[16..18].copy_from_slice(&[0, 0]);
        let cksum = Self::checksum(&buf[2..lsa_len as usize]);
        buf[16..18].copy_from_slice(&cksum);
        self.hdr.cksum = u16::from_be_bytes(cksum);

        self.raw = buf.freeze();
    }

    pub fn validate(&self, version: Version) -> Result<(), LsaValidationError> {
        if self.hdr.age > LSA_MAX_AGE {
            return Err(LsaValidationError::InvalidLsaAge);
        }
        if self.hdr.seq_no == LSA_RESERVED_SEQ_NO {
            return Err(LsaValidationError::InvalidLsaSeqNo);
        }
        if !self.hdr.lsa_type.is_valid(version) {
            return Err(LsaValidationError::UnsupportedLsaType(
                self.hdr.lsa_type.0,
            ));
        }
        if !self.is_checksum_valid() {
            return Err(LsaValidationError::InvalidChecksum);
        }

        Ok(())
    }

    // Fletcher checksum as specified in ISO 8473 Annex C, placed at the
    // checksum field located 14 bytes into the checksummed data.
    fn checksum(data: &[u8]) -> [u8; 2] {
        let checksum = fletcher::calc_fletcher16(data);
        let mut checkbyte0 = (checksum & 0x00FF) as i32;
        let mut checkbyte1 = ((checksum >> 8) & 0x00FF) as i32;

        // Adjust checksum value using scaling factor.
        let sop = data.len() as i32 - 15;
        let mut x = (sop * checkbyte0 - checkbyte1) % 255;
        if x <= 0 {
            x += 255;
        }
        checkbyte1 = 510 - checkbyte0 - x;
        if checkbyte1 > 255 {
            checkbyte1 -= 255;
        }
        checkbyte0 = x;
        [checkbyte0 as u8, checkbyte1 as u8]
    }

    fn is_checksum_valid(&self) -> bool {
        let length = self.hdr.length as usize;
        if length > self.raw.len() {
            return false;
        }

        // Skip the Age field.
        fletcher::calc_fletcher16(&self.raw[2..length]) == 0
    }
}

// LSA instances are compared by content. The aging clock is local state.
impl PartialEq for Lsa {
    fn eq(&self, other: &Lsa) -> bool {
        self.hdr == other.hdr && self.body == other.body
    }
}

// ===== impl LsaBody =====

impl LsaBody {
    pub fn decode(
        version: Version,
        lsa_type: LsaType,
        buf: &mut Bytes,
    ) -> DecodeResult<Self> {
        let body = if lsa_type == LsaType::router(version) {
            LsaBody::Router(LsaRouter::decode(version, buf)?)
        } else if lsa_type == LsaType::network(version) {
            LsaBody::Network(LsaNetwork::decode(version, buf)?)
        } else {
            LsaBody::Unknown(buf.split_to(buf.remaining()))
        };
        Ok(body)
    }

    pub fn encode(&self, version: Version, buf: &mut BytesMut) {
        match self {
            LsaBody::Router(lsa) => lsa.encode(version, buf),
            LsaBody::Network(lsa) => lsa.encode(version, buf),
            LsaBody::Unknown(data) => buf.put_slice(data),
        }
    }

    pub fn as_router(&self) -> Option<&LsaRouter> {
        match self {
            LsaBody::Router(lsa) => Some(lsa),
            _ => None,
        }
    }
}

// ===== impl LsaRouter =====

impl LsaRouter {
    pub fn decode(version: Version, buf: &mut Bytes) -> DecodeResult<Self> {
        let mut lsa = LsaRouter::default();
        match version {
            Version::Ospfv2 => {
                if buf.remaining() < 4 {
                    return Err(DecodeError::InvalidLsaLength);
                }
                lsa.flags = LsaRouterFlags::from_bits_truncate(buf.get_u8());
                let _ = buf.get_u8();
                let links_cnt = buf.get_u16();
                for _ in 0..links_cnt {
                    if buf.remaining() < 12 {
                        return Err(DecodeError::InvalidLsaLength);
                    }
                    let link_id = buf.get_ipv4();
                    let link_data = buf.get_ipv4();
                    let link_type = buf.get_u8();
                    let tos_cnt = buf.get_u8() as usize;
                    let metric = buf.get_u16();

                    // TOS-specific metrics are ignored.
                    if buf.remaining() < tos_cnt * 4 {
                        return Err(DecodeError::InvalidLsaLength);
                    }
                    buf.advance(tos_cnt * 4);

                    let link_type = LsaRouterLinkType::from_u8(link_type)
                        .ok_or(DecodeError::UnknownRouterLinkType(link_type))?;
                    lsa.links.push(LsaRouterLink::new(
                        link_type, link_id, link_data, 0, 0, metric,
                    ));
                }
            }
            Version::Ospfv3 => {
                if buf.remaining() < 4 {
                    return Err(DecodeError::InvalidLsaLength);
                }
                lsa.flags = LsaRouterFlags::from_bits_truncate(buf.get_u8());
                lsa.options = Options::from_bits_retain(buf.get_u24());
                if buf.remaining() % 16 != 0 {
                    return Err(DecodeError::InvalidLsaLength);
                }
                while buf.remaining() >= 16 {
                    let link_type = buf.get_u8();
                    let _ = buf.get_u8();
                    let metric = buf.get_u16();
                    let iface_id = buf.get_u32();
                    let nbr_iface_id = buf.get_u32();
                    let nbr_router_id = buf.get_ipv4();

                    let link_type = LsaRouterLinkType::from_u8(link_type)
                        .ok_or(DecodeError::UnknownRouterLinkType(link_type))?;
                    lsa.links.push(LsaRouterLink::new(
                        link_type,
                        nbr_router_id,
                        Ipv4Addr::UNSPECIFIED,
                        iface_id,
                        nbr_iface_id,
                        metric,
                    ));
                }
            }
        }

        Ok(lsa)
    }

    pub fn encode(&self, version: Version, buf: &mut BytesMut) {
        match version {
            Version::Ospfv2 => {
                buf.put_u8(self.flags.bits());
                buf.put_u8(0);
                buf.put_u16(self.links.len() as u16);
                for link in &self.links {
                    buf.put_ipv4(&link.link_id);
                    buf.put_ipv4(&link.link_data);
                    buf.put_u8(link.link_type as u8);
                    buf.put_u8(0);
                    buf.put_u16(link.metric);
                }
            }
            Version::Ospfv3 => {
                buf.put_u8(self.flags.bits());
                buf.put_u24(self.options.bits());
                for link in &self.links {
                    buf.put_u8(link.link_type as u8);
                    buf.put_u8(0);
                    buf.put_u16(link.metric);
                    buf.put_u32(link.iface_id);
                    buf.put_u32(link.nbr_iface_id);
                    buf.put_ipv4(&link.link_id);
                }
            }
        }
    }
}

// ===== impl LsaNetwork =====

impl LsaNetwork {
    pub fn decode(version: Version, buf: &mut Bytes) -> DecodeResult<Self> {
        if buf.remaining() < 4 || buf.remaining() % 4 != 0 {
            return Err(DecodeError::InvalidLsaLength);
        }
        let (mask, options) = match version {
            Version::Ospfv2 => (buf.get_ipv4(), Options::empty()),
            Version::Ospfv3 => {
                let _ = buf.get_u8();
                let options = Options::from_bits_retain(buf.get_u24());
                (Ipv4Addr::UNSPECIFIED, options)
            }
        };
        let mut attached_rtrs = vec![];
        while buf.remaining() >= 4 {
            attached_rtrs.push(buf.get_ipv4());
        }

        Ok(LsaNetwork {
            mask,
            options,
            attached_rtrs,
        })
    }

    pub fn encode(&self, version: Version, buf: &mut BytesMut) {
        match version {
            Version::Ospfv2 => buf.put_ipv4(&self.mask),
            Version::Ospfv3 => {
                buf.put_u8(0);
                buf.put_u24(self.options.bits());
            }
        }
        for rtr in &self.attached_rtrs {
            buf.put_ipv4(rtr);
        }
    }
}

// ===== unit tests =====
