//! Destination address policy

use quiver_core::types::NetworkConfig;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Which destinations the fetcher may connect to
#[derive(Debug, Clone, Default)]
pub struct SsrfPolicy {
    /// Skip address checks entirely
    pub allow_private_network: bool,

    /// Hostnames (or IP literals) exempt from address checks
    pub allowed_hosts: Vec<String>,
}

impl SsrfPolicy {
    /// Block every non-public destination
    pub fn strict() -> Self {
        Self::default()
    }

    pub fn from_network_config(network: &NetworkConfig) -> Self {
        Self {
            allow_private_network: network.allow_private_network,
            allowed_hosts: network.allowed_hosts.clone(),
        }
    }

    pub fn with_allowed_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.push(host.into());
        self
    }

    /// Whether `host` bypasses the address check
    pub fn allows_host(&self, host: &str) -> bool {
        if self.allow_private_network {
            return true;
        }
        let host = host.trim_start_matches('[').trim_end_matches(']');
        self.allowed_hosts
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(host))
    }

    /// First address in `addrs` that the policy refuses, if any
    pub fn first_blocked<'a, I>(&self, host: &str, addrs: I) -> Option<IpAddr>
    where
        I: IntoIterator<Item = &'a IpAddr>,
    {
        if self.allows_host(host) {
            return None;
        }
        addrs.into_iter().copied().find(|ip| is_blocked_ip(*ip))
    }
}

/// Whether `ip` is private, loopback, link-local or otherwise non-public
pub fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_blocked_v4(v4),
        IpAddr::V6(v6) => is_blocked_v6(v6),
    }
}

fn is_blocked_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_multicast()
        || a == 0
        // 100.64.0.0/10 carrier-grade NAT
        || (a == 100 && (b & 0xc0) == 64)
}

fn is_blocked_v6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = embedded_ipv4(ip) {
        return is_blocked_v4(v4);
    }
    let first = ip.segments()[0];
    ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        // fc00::/7 unique local
        || (first & 0xfe00) == 0xfc00
        // fe80::/10 link-local
        || (first & 0xffc0) == 0xfe80
        // fec0::/10 deprecated site-local
        || (first & 0xffc0) == 0xfec0
}

/// IPv4 address carried inside an IPv6 one.
///
/// Covers IPv4-mapped `::ffff:0:0/96`, IPv4-compatible `::/96`, NAT64
/// `64:ff9b::/96` and 6to4 `2002::/16`.
fn embedded_ipv4(ip: Ipv6Addr) -> Option<Ipv4Addr> {
    let seg = ip.segments();
    let from_segments = |hi: u16, lo: u16| {
        let [a, b] = hi.to_be_bytes();
        let [c, d] = lo.to_be_bytes();
        Ipv4Addr::new(a, b, c, d)
    };
    match seg {
        [0x2002, hi, lo, ..] => Some(from_segments(hi, lo)),
        [0x64, 0xff9b, 0, 0, 0, 0, hi, lo] => Some(from_segments(hi, lo)),
        _ => ip.to_ipv4(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_blocks_private_ranges() {
        for addr in [
            "127.0.0.1",
            "10.1.2.3",
            "172.16.0.1",
            "192.168.1.1",
            "169.254.169.254",
            "0.0.0.0",
            "100.64.0.1",
            "::1",
            "fe80::1",
            "fd00::1",
            "::ffff:127.0.0.1",
            "::127.0.0.1",
            "::10.0.0.1",
            "64:ff9b::169.254.169.254",
            "64:ff9b::a00:1",
            "2002:7f00:1::1",
            "2002:c0a8:101::",
        ] {
            assert!(is_blocked_ip(ip(addr)), "{} should be blocked", addr);
        }
    }

    #[test]
    fn test_allows_public_addresses() {
        for addr in [
            "8.8.8.8",
            "142.250.72.16",
            "100.128.0.1",
            "2607:f8b0::1",
            "64:ff9b::8.8.8.8",
            "2002:808:808::1",
        ] {
            assert!(!is_blocked_ip(ip(addr)), "{} should be allowed", addr);
        }
    }

    #[test]
    fn test_allowed_hosts_bypass() {
        let policy = SsrfPolicy::strict().with_allowed_host("catalog.internal");
        let addrs = [ip("10.0.0.5")];
        assert_eq!(policy.first_blocked("catalog.internal", &addrs), None);
        assert_eq!(policy.first_blocked("CATALOG.INTERNAL", &addrs), None);
        assert_eq!(
            policy.first_blocked("other.internal", &addrs),
            Some(ip("10.0.0.5"))
        );
    }

    #[test]
    fn test_mixed_answers_are_blocked() {
        let policy = SsrfPolicy::strict();
        let addrs = [ip("93.184.216.34"), ip("127.0.0.1")];
        assert_eq!(
            policy.first_blocked("rebind.example", &addrs),
            Some(ip("127.0.0.1"))
        );
    }
}
