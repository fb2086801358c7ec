//! Frame builders and savefile fixtures for unit tests

use crate::packet::PacketHeader;
use crate::session::Session;
use crate::types::Linktype;
use std::path::Path;

const ETHERTYPE_IPV4: u16 = 0x0800;
const IPPROTO_TCP: u8 = 6;
const IPPROTO_UDP: u8 = 17;

/// First timestamp written by [`write_capture`]
pub(crate) const BASE_TS_SEC: i64 = 1_700_000_000;

fn ethernet_ipv4(protocol: u8, transport: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(14 + 20 + transport.len());
    // Ethernet: dst, src, ethertype
    frame.extend_from_slice(&[0x02, 0x00, 0x00, 0x00, 0x00, 0x02]);
    frame.extend_from_slice(&[0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
    frame.extend_from_slice(&ETHERTYPE_IPV4.to_be_bytes());

    let total_len = (20 + transport.len()) as u16;
    frame.push(0x45);
    frame.push(0);
    frame.extend_from_slice(&total_len.to_be_bytes());
    frame.extend_from_slice(&[0x00, 0x01]);
    frame.extend_from_slice(&[0x40, 0x00]);
    frame.push(64);
    frame.push(protocol);
    frame.extend_from_slice(&[0x00, 0x00]);
    frame.extend_from_slice(&[10, 0, 0, 1]);
    frame.extend_from_slice(&[10, 0, 0, 2]);

    frame.extend_from_slice(transport);
    frame
}

/// Ethernet/IPv4/TCP SYN to `dst_port`
pub(crate) fn tcp_frame(dst_port: u16) -> Vec<u8> {
    let mut tcp = Vec::with_capacity(20);
    tcp.extend_from_slice(&40000u16.to_be_bytes());
    tcp.extend_from_slice(&dst_port.to_be_bytes());
    tcp.extend_from_slice(&[0, 0, 0, 1]);
    tcp.extend_from_slice(&[0, 0, 0, 0]);
    tcp.push(0x50);
    tcp.push(0x02);
    tcp.extend_from_slice(&[0xff, 0xff]);
    tcp.extend_from_slice(&[0, 0, 0, 0]);
    ethernet_ipv4(IPPROTO_TCP, &tcp)
}

/// Ethernet/IPv4/UDP datagram with a small payload to `dst_port`
pub(crate) fn udp_frame(dst_port: u16) -> Vec<u8> {
    let payload = b"pcap-bridge";
    let mut udp = Vec::with_capacity(8 + payload.len());
    udp.extend_from_slice(&40001u16.to_be_bytes());
    udp.extend_from_slice(&dst_port.to_be_bytes());
    udp.extend_from_slice(&((8 + payload.len()) as u16).to_be_bytes());
    udp.extend_from_slice(&[0, 0]);
    udp.extend_from_slice(payload);
    ethernet_ipv4(IPPROTO_UDP, &udp)
}

/// `count` frames alternating between web and DNS traffic
pub(crate) fn synthetic_frames(count: usize) -> Vec<Vec<u8>> {
    (0..count)
        .map(|i| if i % 2 == 0 { tcp_frame(80) } else { udp_frame(53) })
        .collect()
}

/// Write an Ethernet savefile, one second apart, each at +500us
pub(crate) fn write_capture(path: &Path, frames: &[Vec<u8>]) {
    let session = Session::open_dead(Linktype::ETHERNET, 65535).unwrap();
    let mut dumper = session.dump_open(path).unwrap();
    for (i, frame) in frames.iter().enumerate() {
        let len = frame.len() as u32;
        let header = PacketHeader::new(BASE_TS_SEC + i as i64, 500, len, len);
        dumper.dump(&header, frame).unwrap();
    }
    dumper.close();
    session.close();
}
