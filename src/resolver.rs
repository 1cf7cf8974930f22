use crate::error::MonitorError;
use log::debug;
use std::io;
use std::net::{IpAddr, Ipv4Addr};

/// Resolves every host name to an IPv4 address through the system resolver.
/// Any failure aborts the whole set.
pub fn resolve_hosts(names: &[String]) -> Result<Vec<(String, Ipv4Addr)>, MonitorError> {
    resolve_with(names, dns_lookup::lookup_host)
}

pub fn resolve_with<F>(names: &[String], lookup: F) -> Result<Vec<(String, Ipv4Addr)>, MonitorError>
where
    F: Fn(&str) -> io::Result<Vec<IpAddr>>,
{
    names.iter().map(|name| resolve_one(name, &lookup).map(|ip| (name.clone(), ip))).collect()
}

fn resolve_one<F>(name: &str, lookup: &F) -> Result<Ipv4Addr, MonitorError>
where
    F: Fn(&str) -> io::Result<Vec<IpAddr>>,
{
    if let Ok(ip) = name.parse::<Ipv4Addr>() {
        return Ok(ip);
    }
    let addresses = lookup(name).map_err(|e| MonitorError::Resolve { host: name.to_string(), reason: e.to_string() })?;
    let ip = addresses
        .into_iter()
        .find_map(|ip| match ip {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| MonitorError::Resolve { host: name.to_string(), reason: "no IPv4 address".to_string() })?;
    debug!("resolved {name} to {ip}");
    Ok(ip)
}
