use crate::config::{TrafficConfig, MAX_VLAN_ID};
use crate::error::{AddressField, Error, Result};

use pnet::util::MacAddr;
use pnet_packet::ethernet::{EtherType, EtherTypes, MutableEthernetPacket};
use pnet_packet::vlan::{ClassOfService, MutableVlanPacket};
use rand_core::RngCore;

pub const ETHERNET_HEADER_SIZE: usize = 14;
pub const VLAN_TAG_SIZE: usize = 4;
/// Minimum Ethernet frame size, FCS excluded
pub const MIN_FRAME_SIZE: usize = 60;
pub const MAX_FRAME_SIZE: usize = 65535;

/// A serialized Ethernet frame, ready to be written on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    header_len: usize,
}

impl Frame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Ethernet header length, 802.1Q tag included (14 or 18 bytes)
    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[self.header_len..]
    }

    /// Copies the frame into `buf` and fills everything after the 14-byte
    /// Ethernet header with random bytes. An 802.1Q tag, if any, is part of
    /// the randomized bytes.
    pub fn randomize_into(&self, rng: &mut impl RngCore, buf: &mut Vec<u8>) {
        buf.clear();
        buf.extend_from_slice(&self.data);
        rng.fill_bytes(&mut buf[ETHERNET_HEADER_SIZE..]);
    }
}

/// Parses a MAC address made of six two-digit hexadecimal octets, all
/// separated by colons or all by hyphens
fn parse_mac(value: &str, field: AddressField) -> Result<MacAddr> {
    let invalid = |reason: &str| Error::InvalidAddress {
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    };
    let separator = match value.as_bytes().get(2) {
        Some(b':') => ':',
        Some(b'-') => '-',
        _ => return Err(invalid("expected ':' or '-' separated octets")),
    };
    let mut octets = [0u8; 6];
    let mut groups = value.split(separator);
    for octet in octets.iter_mut() {
        let group = groups
            .next()
            .ok_or_else(|| invalid("expected 6 octets"))?;
        if group.len() != 2 || !group.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid("each octet must be two hexadecimal digits"));
        }
        *octet = u8::from_str_radix(group, 16).map_err(|e| invalid(&e.to_string()))?;
    }
    if groups.next().is_some() {
        return Err(invalid("expected 6 octets"));
    }
    let [a, b, c, d, e, f] = octets;
    Ok(MacAddr::new(a, b, c, d, e, f))
}

/// Sets the destination and source MAC addresses and the EtherType
fn setup_ethernet_header(
    frame: &mut [u8],
    src_mac: MacAddr,
    dst_mac: MacAddr,
    ether_type: EtherType,
) -> Result<()> {
    let mut eth_packet = MutableEthernetPacket::new(frame)
        .ok_or_else(|| Error::Serialization("buffer too small for the Ethernet header".into()))?;
    eth_packet.set_destination(dst_mac);
    eth_packet.set_source(src_mac);
    eth_packet.set_ethertype(ether_type);
    Ok(())
}

/// Sets the 802.1Q tag control information (priority 0, not drop eligible)
/// and the EtherType of the encapsulated protocol
fn setup_vlan_tag(tag: &mut [u8], vlan: u16, inner_type: EtherType) -> Result<()> {
    let mut vlan_packet = MutableVlanPacket::new(tag)
        .ok_or_else(|| Error::Serialization("buffer too small for the 802.1Q tag".into()))?;
    vlan_packet.set_priority_code_point(ClassOfService::new(0));
    vlan_packet.set_drop_eligible_indicator(0);
    vlan_packet.set_vlan_identifier(vlan & MAX_VLAN_ID);
    vlan_packet.set_ethertype(inner_type);
    Ok(())
}

/// Builds the frame described by the configuration.
///
/// The payload is zero-filled: only its size matters here. Fails if either
/// MAC address cannot be parsed or if the frame would be larger than
/// [`MAX_FRAME_SIZE`]; no partial frame is ever returned.
pub fn build(config: &TrafficConfig) -> Result<Frame> {
    config.check_frame_len()?;
    let src_mac = parse_mac(&config.src_mac, AddressField::Source)?;
    let dst_mac = parse_mac(&config.dst_mac, AddressField::Destination)?;

    let header_len = config.header_len();
    let mut data = vec![0u8; config.frame_len()];
    let ether_type = EtherType::new(config.ether_type);

    match config.vlan {
        Some(vlan) => {
            setup_ethernet_header(&mut data, src_mac, dst_mac, EtherTypes::Vlan)?;
            setup_vlan_tag(&mut data[ETHERNET_HEADER_SIZE..], vlan, ether_type)?;
        }
        None => setup_ethernet_header(&mut data, src_mac, dst_mac, ether_type)?,
    }

    Ok(Frame { data, header_len })
}
