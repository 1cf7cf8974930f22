use crate::error::MalformedPacket;
use crate::packet::TIMESTAMP_SIZE;
use pnet::packet::icmp::echo_reply::EchoReplyPacket;

/// ICMP header fields and payload of a received datagram.
#[derive(Debug, Clone, PartialEq)]
pub struct EchoMessage<'a> {
    pub icmp_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence: u16,
    pub payload: &'a [u8],
}

/// Parses a raw IPv4 datagram as read from the raw socket.
///
/// The IP header length comes from the IHL nibble of the first byte. The ICMP
/// checksum is taken as-is and not verified.
pub fn parse(datagram: &[u8]) -> Result<EchoMessage<'_>, MalformedPacket> {
    let header_len = datagram.first().map_or(0, |b| (b & 0x0F) as usize * 4);
    let needed = header_len + EchoReplyPacket::minimum_packet_size();
    if datagram.len() < needed {
        return Err(MalformedPacket { len: datagram.len(), needed });
    }

    let icmp = &datagram[header_len..];
    let echo = EchoReplyPacket::new(icmp).ok_or(MalformedPacket { len: datagram.len(), needed })?;
    Ok(EchoMessage {
        icmp_type: echo.get_icmp_type().0,
        code: echo.get_icmp_code().0,
        checksum: echo.get_checksum(),
        identifier: echo.get_identifier(),
        sequence: echo.get_sequence_number(),
        payload: &icmp[EchoReplyPacket::minimum_packet_size()..],
    })
}

/// Round-trip time in milliseconds from the timestamp embedded in `payload`.
pub fn extract_rtt(payload: &[u8], received_at: f64) -> Option<f64> {
    let stamp: [u8; TIMESTAMP_SIZE] = payload.get(..TIMESTAMP_SIZE)?.try_into().ok()?;
    let sent_at = f64::from_ne_bytes(stamp);
    Some((received_at - sent_at) * 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::build_echo_request;

    fn with_ip_header(ihl: u8, icmp: &[u8]) -> Vec<u8> {
        let mut datagram = vec![0u8; ihl as usize * 4];
        datagram[0] = 0x40 | ihl;
        datagram.extend_from_slice(icmp);
        datagram
    }

    #[test]
    fn parses_own_echo_request() {
        let probe = build_echo_request(0x4321, 512, 56, 1_700_000_000.0);
        let datagram = with_ip_header(5, &probe);

        let message = parse(&datagram).unwrap();
        assert_eq!(message.icmp_type, 8);
        assert_eq!(message.code, 0);
        assert_eq!(message.identifier, 0x4321);
        assert_eq!(message.sequence, 512);
        assert_eq!(message.payload.len(), 56);
    }

    #[test]
    fn honours_ip_options() {
        let probe = build_echo_request(7, 9, 8, 5.0);
        let datagram = with_ip_header(7, &probe);

        let message = parse(&datagram).unwrap();
        assert_eq!(message.identifier, 7);
        assert_eq!(message.sequence, 9);
        assert_eq!(message.payload, &5.0f64.to_ne_bytes());
    }

    #[test]
    fn rejects_truncated_datagrams() {
        assert_eq!(parse(&[]), Err(MalformedPacket { len: 0, needed: 8 }));

        let datagram = with_ip_header(5, &[0, 0, 0, 0, 0]);
        assert_eq!(parse(&datagram), Err(MalformedPacket { len: 25, needed: 28 }));
    }

    #[test]
    fn header_only_reply_has_empty_payload() {
        let mut datagram = with_ip_header(5, &[0, 0, 0xff, 0xff, 0, 1, 0, 2]);
        let message = parse(&datagram).unwrap();
        assert!(message.payload.is_empty());
        assert_eq!(message.checksum, 0xffff);

        // corrupted checksum is accepted unchanged
        datagram[22] = 0x12;
        assert_eq!(parse(&datagram).unwrap().checksum, 0x12ff);
    }

    #[test]
    fn rtt_from_embedded_timestamp() {
        let t0 = 1_700_000_000.125;
        let payload = crate::packet::build_payload(56, t0);
        let rtt = extract_rtt(&payload, t0 + 0.050).unwrap();
        assert!((rtt - 50.0).abs() < 1e-3, "rtt was {rtt}");
    }

    #[test]
    fn no_rtt_without_full_timestamp() {
        assert_eq!(extract_rtt(&[1, 2, 3, 4, 5, 6, 7], 10.0), None);
        assert_eq!(extract_rtt(&[], 10.0), None);
    }
}
