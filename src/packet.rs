use pnet::packet::Packet;
use pnet::packet::icmp::echo_request::{EchoRequestPacket, MutableEchoRequestPacket};
use pnet::packet::icmp::{IcmpCode, IcmpTypes};

pub const TIMESTAMP_SIZE: usize = 8;

/// Largest ICMP payload that fits in a single IPv4 datagram.
pub const MAX_PAYLOAD_SIZE: usize = 65_507;

/// Internet checksum (RFC 1071) over `data`.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut words = data.chunks_exact(2);
    for word in &mut words {
        sum = sum.wrapping_add(u16::from_be_bytes([word[0], word[1]]) as u32);
    }
    if let [last] = words.remainder() {
        sum = sum.wrapping_add((*last as u32) << 8);
    }
    while (sum >> 16) != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !(sum as u16)
}

/// Builds the payload of a probe: the send timestamp followed by the
/// `i mod 256` padding pattern. Never shorter than the timestamp.
pub fn build_payload(payload_size: usize, sent_at: f64) -> Vec<u8> {
    let mut payload = Vec::with_capacity(payload_size.max(TIMESTAMP_SIZE));
    payload.extend_from_slice(&sent_at.to_ne_bytes());
    let padding = payload_size.saturating_sub(TIMESTAMP_SIZE);
    payload.extend((0..padding).map(|i| (i % 256) as u8));
    payload
}

/// Builds a complete ICMP echo request carrying `sent_at` (seconds since the
/// Unix epoch) in its payload.
pub fn build_echo_request(identifier: u16, sequence: u16, payload_size: usize, sent_at: f64) -> Vec<u8> {
    let payload = build_payload(payload_size, sent_at);
    let mut buf = vec![0u8; EchoRequestPacket::minimum_packet_size() + payload.len()];

    // buffer is sized above the minimum, so the view always fits
    let mut echo_packet = MutableEchoRequestPacket::new(&mut buf[..])
        .expect("buffer holds an echo request header");
    echo_packet.set_icmp_type(IcmpTypes::EchoRequest);
    echo_packet.set_icmp_code(IcmpCode::new(0));
    echo_packet.set_checksum(0);
    echo_packet.set_identifier(identifier);
    echo_packet.set_sequence_number(sequence);
    echo_packet.set_payload(&payload);

    let echo_checksum = checksum(echo_packet.packet());
    echo_packet.set_checksum(echo_checksum);
    buf
}
