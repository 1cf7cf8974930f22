use crate::clock::Clock;
use crate::config::MonitorConfig;
use crate::error::MalformedPacket;
use crate::host::HostRecord;
use crate::messages::MonitorEvent;
use crate::packet::build_echo_request;
use crate::parser::{extract_rtt, parse};
use crate::socket::IcmpSocket;
use crate::stats::StatsEntry;
use log::{debug, warn};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub struct Monitor {
    config: MonitorConfig,
    identifier: u16,
    hosts: HashMap<Ipv4Addr, HostRecord>,
    stats: HashMap<Ipv4Addr, StatsEntry>,
    // resolution order, for stable output
    order: Vec<Ipv4Addr>,
}

impl Monitor {
    pub fn new(config: MonitorConfig, identifier: u16, resolved: Vec<(String, Ipv4Addr)>) -> Self {
        let mut hosts: HashMap<Ipv4Addr, HostRecord> = HashMap::new();
        let mut stats = HashMap::new();
        let mut order = Vec::new();
        for (name, ip) in resolved {
            if let Some(existing) = hosts.get(&ip) {
                warn!("{name} resolves to {ip}, already monitored as {}", existing.name);
                continue;
            }
            hosts.insert(ip, HostRecord::new(name, ip));
            stats.insert(ip, StatsEntry::default());
            order.push(ip);
        }
        Monitor { config, identifier, hosts, stats, order }
    }

    pub fn identifier(&self) -> u16 {
        self.identifier
    }

    pub fn host(&self, ip: Ipv4Addr) -> Option<&HostRecord> {
        self.hosts.get(&ip)
    }

    pub fn stats(&self, ip: Ipv4Addr) -> Option<&StatsEntry> {
        self.stats.get(&ip)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &HostRecord> {
        self.order.iter().filter_map(|ip| self.hosts.get(ip))
    }

    /// Hosts paired with their statistics, in resolution order.
    pub fn entries(&self) -> impl Iterator<Item = (&HostRecord, &StatsEntry)> {
        self.order.iter().filter_map(|ip| Some((self.hosts.get(ip)?, self.stats.get(ip)?)))
    }

    /// Runs until `cancel` is set. The flag is checked once per iteration.
    pub fn run<S, C, F>(&mut self, socket: &mut S, clock: &C, cancel: &AtomicBool, mut on_event: F)
    where
        S: IcmpSocket,
        C: Clock,
        F: FnMut(MonitorEvent),
    {
        while !cancel.load(Ordering::SeqCst) {
            self.send_due(socket, clock, &mut on_event);
            // sleep only after an empty poll; queued replies are read back to back
            if !self.receive(socket, clock, &mut on_event) {
                clock.sleep(self.config.idle_sleep);
            }
        }
        debug!("cancellation observed, leaving probe loop");
    }

    pub fn send_due<S, C, F>(&mut self, socket: &mut S, clock: &C, on_event: &mut F)
    where
        S: IcmpSocket,
        C: Clock,
        F: FnMut(MonitorEvent),
    {
        let now = clock.monotonic();
        for ip in &self.order {
            let (Some(host), Some(stats)) = (self.hosts.get_mut(ip), self.stats.get_mut(ip)) else {
                continue;
            };
            if !host.is_due(now, self.config.interval) {
                continue;
            }

            let packet = build_echo_request(self.identifier, host.sequence(), self.config.payload_size, clock.wall());
            match socket.send_to(&packet, host.ip) {
                Ok(sent) => {
                    if sent != packet.len() {
                        on_event(MonitorEvent::ShortSend { sent, expected: packet.len() });
                    }
                    debug!("sent ICMP to {}/{} seq={}, packet_size={}", host.name, host.ip, host.sequence(), packet.len());
                    host.mark_sent(now);
                    stats.record_sent();
                }
                Err(e) => {
                    host.defer(now);
                    on_event(MonitorEvent::SendFailed { name: host.name.clone(), ip: host.ip, error: e.to_string() });
                }
            }
        }
    }

    /// Waits for at most one datagram and dispatches it. Returns whether a
    /// datagram was read.
    pub fn receive<S, C, F>(&mut self, socket: &mut S, clock: &C, on_event: &mut F) -> bool
    where
        S: IcmpSocket,
        C: Clock,
        F: FnMut(MonitorEvent),
    {
        let poll_timeout = self.config.poll_timeout;
        let wait = self.next_send_in(clock.monotonic()).map_or(poll_timeout, |due| due.min(poll_timeout));
        match socket.recv_timeout(wait) {
            Ok(Some(datagram)) => {
                let received_at = clock.wall();
                match self.handle_datagram(&datagram.bytes, datagram.source, received_at) {
                    Ok(Some(event)) => on_event(event),
                    Ok(None) => {}
                    Err(e) => on_event(MonitorEvent::ReceiveError { error: e.to_string() }),
                }
                true
            }
            Ok(None) => false,
            Err(e) => {
                on_event(MonitorEvent::ReceiveError { error: e.to_string() });
                false
            }
        }
    }

    /// Time left until the earliest host is due; `None` without hosts.
    pub fn next_send_in(&self, now: Duration) -> Option<Duration> {
        self.hosts.values().map(|h| h.due_in(now, self.config.interval)).min()
    }

    /// Attributes a raw datagram to a host and updates its state.
    ///
    /// Returns `Ok(None)` for traffic that is not ours: a foreign identifier
    /// or a source that is not monitored.
    pub fn handle_datagram(
        &mut self,
        datagram: &[u8],
        source: Ipv4Addr,
        received_at: f64,
    ) -> Result<Option<MonitorEvent>, MalformedPacket> {
        let message = parse(datagram)?;
        debug!(
            "ICMP: src={source}, type={}, code={}, id={}, seq={}, payload={}B",
            message.icmp_type,
            message.code,
            message.identifier,
            message.sequence,
            message.payload.len()
        );

        if message.identifier != self.identifier {
            return Ok(None);
        }
        let (Some(host), Some(stats)) = (self.hosts.get_mut(&source), self.stats.get_mut(&source)) else {
            debug!("skipping: {source} not in monitored hosts");
            return Ok(None);
        };

        let Some(rtt_ms) = extract_rtt(message.payload, received_at) else {
            debug!("payload too short ({}B)", message.payload.len());
            return Ok(Some(MonitorEvent::NoRtt { name: host.name.clone(), ip: host.ip, sequence: message.sequence }));
        };

        stats.record_reply(rtt_ms);
        let transition = host.classify(rtt_ms, self.config.threshold_ms, received_at);
        Ok(Some(MonitorEvent::Reply {
            name: host.name.clone(),
            ip: host.ip,
            sequence: message.sequence,
            rtt_ms,
            transition,
        }))
    }
}
