use if_addrs::{get_if_addrs, IfAddr};
use sysinfo::System;

pub(crate) fn hostname() -> String {
    System::host_name().unwrap_or_else(|| "unknown".to_string())
}

/// Interface/IPv4 pairs for the published `ips` field. Loopback and docker
/// interfaces are skipped; one address per interface, sorted by address.
pub(crate) fn interface_addresses() -> std::io::Result<Vec<(String, String)>> {
    let pairs = get_if_addrs()?
        .into_iter()
        .filter_map(|if_addr| {
            if if_addr.is_loopback() || if_addr.name.contains("docker") {
                return None;
            }
            match if_addr.addr {
                IfAddr::V4(v4) => Some((if_addr.name, v4.ip.to_string())),
                IfAddr::V6(_) => None,
            }
        })
        .collect();
    Ok(sort_interface_list(pairs))
}

fn sort_interface_list(mut pairs: Vec<(String, String)>) -> Vec<(String, String)> {
    let mut seen = std::collections::HashSet::new();
    pairs.retain(|(name, _)| seen.insert(name.clone()));
    pairs.sort_by(|a, b| a.1.cmp(&b.1));
    pairs
}
