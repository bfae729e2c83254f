//! ICMP reachability probe with native sockets and a `ping` command fallback.
//!
//! Sends a small fixed number of echo requests and reports the average
//! round-trip time. The native path uses blocking sockets in spawn_blocking;
//! the command path shells out to `ping` and parses its summary output on a
//! best-effort basis. If the host replies but timing cannot be extracted,
//! the probe still reports the host as reachable, just unmeasured.

use std::mem::MaybeUninit;
use std::net::{IpAddr, SocketAddr};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use regex::Regex;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::process::Command;

use super::ProbeError;

/// Echo requests sent per probe.
pub(crate) const ECHO_COUNT: u16 = 3;

/// ICMP capability state
#[derive(Debug, Clone, Copy, PartialEq)]
enum IcmpCapability {
    /// Native ICMP sockets are available
    Native,
    /// Only command fallback is available
    CommandOnly,
}

static ICMP_CAPABILITY: OnceLock<IcmpCapability> = OnceLock::new();

/// Detect ICMP capability by attempting to create a socket.
fn detect_icmp_capability() -> IcmpCapability {
    // RAW needs CAP_NET_RAW or root; DGRAM works unprivileged on Linux with
    // ping_group_range set, and on macOS.
    if Socket::new(Domain::IPV4, Type::RAW, Some(Protocol::ICMPV4)).is_ok() {
        tracing::info!("ping probe: using native ICMP (RAW socket, privileged)");
        return IcmpCapability::Native;
    }
    if Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::ICMPV4)).is_ok() {
        tracing::info!("ping probe: using native ICMP (DGRAM socket, unprivileged)");
        return IcmpCapability::Native;
    }

    tracing::info!("ping probe: native ICMP unavailable, using command fallback");
    IcmpCapability::CommandOnly
}

/// Run a ping probe against the given host.
///
/// Returns the average round-trip time in milliseconds over the echoes that
/// were answered, or `None` when the host is reachable but timing could not
/// be measured.
pub async fn run_ping_probe(host: &str, timeout: Duration) -> Result<Option<f64>, ProbeError> {
    let capability = *ICMP_CAPABILITY.get_or_init(detect_icmp_capability);

    if capability == IcmpCapability::Native {
        // Resolve before spawn_blocking (DNS is async)
        let ip = resolve_address(host).await?;
        let host_owned = host.to_string();

        let result =
            tokio::task::spawn_blocking(move || run_blocking_ping(ip, timeout))
                .await
                .map_err(|e| ProbeError::Network(format!("spawn_blocking failed: {}", e)))?;

        match result {
            Ok(avg_ms) => return Ok(Some(avg_ms)),
            Err(e) => {
                let error_str = format!("{:?}", e);
                if error_str.contains("Permission")
                    || error_str.contains("Operation not permitted")
                    || error_str.contains("denied")
                {
                    tracing::warn!(
                        "native ping failed with permission error for {}, falling back to command: {}",
                        host_owned,
                        error_str
                    );
                    return run_ping_command(&host_owned, timeout).await;
                }
                return Err(e);
            }
        }
    }

    run_ping_command(host, timeout).await
}

/// Resolve hostname to IP address.
async fn resolve_address(host: &str) -> Result<IpAddr, ProbeError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs: Vec<_> = tokio::net::lookup_host(format!("{}:0", host))
        .await
        .map_err(|e| ProbeError::Dns(e.to_string()))?
        .collect();

    addrs
        .into_iter()
        .next()
        .map(|sa| sa.ip())
        .ok_or_else(|| ProbeError::Dns(format!("no addresses found for {}", host)))
}

/// Per-family ICMP constants.
struct IcmpFamily {
    domain: Domain,
    protocol: Protocol,
    echo_type: u8,
    reply_type: u8,
    /// ICMPv4 checksum is computed in userspace; the kernel fills it in for
    /// ICMPv6.
    needs_checksum: bool,
}

impl IcmpFamily {
    fn for_ip(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => IcmpFamily {
                domain: Domain::IPV4,
                protocol: Protocol::ICMPV4,
                echo_type: 8,
                reply_type: 0,
                needs_checksum: true,
            },
            IpAddr::V6(_) => IcmpFamily {
                domain: Domain::IPV6,
                protocol: Protocol::ICMPV6,
                echo_type: 128,
                reply_type: 129,
                needs_checksum: false,
            },
        }
    }
}

/// Send ECHO_COUNT echo requests over a blocking ICMP socket and average the
/// round-trip times of the replies. Runs in a spawn_blocking thread.
fn run_blocking_ping(ip: IpAddr, timeout: Duration) -> Result<f64, ProbeError> {
    let family = IcmpFamily::for_ip(ip);

    let socket = Socket::new(family.domain, Type::RAW, Some(family.protocol))
        .or_else(|_| Socket::new(family.domain, Type::DGRAM, Some(family.protocol)))
        .map_err(|e| ProbeError::Network(format!("failed to create ICMP socket: {}", e)))?;

    socket
        .set_read_timeout(Some(timeout))
        .map_err(|e| ProbeError::Network(format!("failed to set timeout: {}", e)))?;
    socket
        .set_write_timeout(Some(timeout))
        .map_err(|e| ProbeError::Network(format!("failed to set timeout: {}", e)))?;

    let dest = SocketAddr::new(ip, 0);
    socket
        .connect(&dest.into())
        .map_err(|e| ProbeError::Network(format!("failed to connect: {}", e)))?;

    let identifier: u16 = rand::random();
    let mut rtts_ms: Vec<f64> = Vec::with_capacity(ECHO_COUNT as usize);
    let mut last_err: Option<ProbeError> = None;

    for sequence in 0..ECHO_COUNT {
        match echo_once(&socket, &family, identifier, sequence, timeout) {
            Ok(rtt) => rtts_ms.push(rtt.as_secs_f64() * 1000.0),
            Err(e) => last_err = Some(e),
        }
    }

    if rtts_ms.is_empty() {
        return Err(last_err.unwrap_or(ProbeError::Timeout(timeout)));
    }

    Ok(rtts_ms.iter().sum::<f64>() / rtts_ms.len() as f64)
}

/// Send one echo request and wait for the matching reply.
fn echo_once(
    socket: &Socket,
    family: &IcmpFamily,
    identifier: u16,
    sequence: u16,
    timeout: Duration,
) -> Result<Duration, ProbeError> {
    let packet = build_echo_request(family, identifier, sequence);

    let start = Instant::now();

    socket.send(&packet).map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            ProbeError::Network(format!("Permission denied: {}", e))
        } else {
            ProbeError::Network(format!("failed to send: {}", e))
        }
    })?;

    // Loop until OUR reply arrives or the deadline passes; the socket may
    // deliver unrelated ICMP traffic first.
    loop {
        let mut buf: [MaybeUninit<u8>; 1500] = unsafe { MaybeUninit::uninit().assume_init() };
        let len = socket.recv(&mut buf).map_err(|e| {
            if e.kind() == std::io::ErrorKind::WouldBlock
                || e.kind() == std::io::ErrorKind::TimedOut
            {
                ProbeError::Timeout(timeout)
            } else {
                ProbeError::Network(format!("failed to receive: {}", e))
            }
        })?;
        // SAFETY: recv initialized `len` bytes
        let buf: &[u8] = unsafe { std::slice::from_raw_parts(buf.as_ptr() as *const u8, len) };

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(ProbeError::Timeout(timeout));
        }

        // RAW IPv4 sockets deliver the IP header in front of the ICMP
        // message; DGRAM and ICMPv6 sockets do not.
        let offset = if !buf.is_empty() && buf[0] >> 4 == 4 { 20 } else { 0 };
        if len > offset + 7 {
            let reply_type = buf[offset];
            let reply_id = u16::from_be_bytes([buf[offset + 4], buf[offset + 5]]);
            let reply_seq = u16::from_be_bytes([buf[offset + 6], buf[offset + 7]]);

            if reply_type == family.reply_type && reply_id == identifier && reply_seq == sequence {
                return Ok(elapsed);
            }
        }
        // Not ours, keep waiting
    }
}

/// Build an ICMP echo request packet (8 byte header + 56 byte payload).
fn build_echo_request(family: &IcmpFamily, identifier: u16, sequence: u16) -> Vec<u8> {
    let mut packet = vec![0u8; 64];

    packet[0] = family.echo_type;
    packet[1] = 0; // Code
    packet[4..6].copy_from_slice(&identifier.to_be_bytes());
    packet[6..8].copy_from_slice(&sequence.to_be_bytes());

    // Payload carries a send timestamp
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    packet[8..16].copy_from_slice(&timestamp.to_be_bytes());

    if family.needs_checksum {
        let checksum = icmp_checksum(&packet);
        packet[2..4].copy_from_slice(&checksum.to_be_bytes());
    }

    packet
}

/// Compute ICMP checksum (RFC 1071).
fn icmp_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut i = 0;

    while i < data.len() - 1 {
        sum += u16::from_be_bytes([data[i], data[i + 1]]) as u32;
        i += 2;
    }

    if i < data.len() {
        sum += (data[i] as u32) << 8;
    }

    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    !sum as u16
}

/// Run ping via command execution (fallback).
async fn run_ping_command(host: &str, timeout: Duration) -> Result<Option<f64>, ProbeError> {
    let timeout_secs = timeout.as_secs().max(1);
    // The command sends ECHO_COUNT packets, each with its own deadline
    let overall = timeout * u32::from(ECHO_COUNT) + Duration::from_secs(1);

    let output = tokio::time::timeout(
        overall,
        Command::new("ping")
            .args([
                "-c",
                &ECHO_COUNT.to_string(),
                "-W",
                &timeout_secs.to_string(),
                host,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output(),
    )
    .await
    .map_err(|_| ProbeError::Timeout(timeout))?
    .map_err(|e| ProbeError::Command(format!("failed to execute ping: {}", e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout);

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("timeout")
            || stdout.contains("100% packet loss")
            || stdout.contains("100.0% packet loss")
        {
            return Err(ProbeError::Timeout(timeout));
        }
        return Err(ProbeError::Network(format!("ping failed: {}", stdout)));
    }

    // Best-effort parse: an unparseable reply still counts as reachable
    Ok(parse_avg_rtt(&stdout))
}

/// Extract the average round-trip time in milliseconds from `ping` output.
///
/// Returns `None` when no timing can be found; callers treat that as a
/// reachable host with unmeasured latency rather than a failure.
fn parse_avg_rtt(output: &str) -> Option<f64> {
    // Summary line "rtt min/avg/max/mdev = X/X/X/X ms" (Linux)
    static RE_LINUX: OnceLock<Regex> = OnceLock::new();
    let re_linux = RE_LINUX.get_or_init(|| {
        Regex::new(r"rtt\s+min/avg/max/mdev\s*=\s*([0-9.]+)/([0-9.]+)/([0-9.]+)").unwrap()
    });

    if let Some(caps) = re_linux.captures(output) {
        if let Some(avg) = caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok()) {
            return Some(avg);
        }
    }

    // Summary line "round-trip min/avg/max/stddev = X/X/X/X ms" (macOS)
    static RE_MACOS: OnceLock<Regex> = OnceLock::new();
    let re_macos = RE_MACOS.get_or_init(|| {
        Regex::new(r"round-trip\s+min/avg/max/stddev\s*=\s*([0-9.]+)/([0-9.]+)/([0-9.]+)").unwrap()
    });

    if let Some(caps) = re_macos.captures(output) {
        if let Some(avg) = caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok()) {
            return Some(avg);
        }
    }

    // No summary: average the per-packet "time=X ms" lines
    static RE_PACKET: OnceLock<Regex> = OnceLock::new();
    let re_packet =
        RE_PACKET.get_or_init(|| Regex::new(r"time[=<]([0-9.]+)\s*ms").unwrap());

    let times: Vec<f64> = re_packet
        .captures_iter(output)
        .filter_map(|caps| caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok()))
        .collect();

    if times.is_empty() {
        None
    } else {
        Some(times.iter().sum::<f64>() / times.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icmp_checksum_nonzero() {
        let mut packet = vec![0u8; 8];
        packet[0] = 8;
        packet[4] = 0x12;
        packet[5] = 0x34;
        packet[7] = 0x01;

        assert_ne!(icmp_checksum(&packet), 0);
    }

    #[test]
    fn test_build_echo_request_v4() {
        let family = IcmpFamily::for_ip("127.0.0.1".parse().unwrap());
        let packet = build_echo_request(&family, 0x1234, 2);
        assert_eq!(packet.len(), 64);
        assert_eq!(packet[0], 8);
        assert_eq!(packet[1], 0);
        assert_eq!(packet[4..6], [0x12, 0x34]);
        assert_eq!(packet[6..8], [0x00, 0x02]);
        // Checksum filled in
        assert!(packet[2] != 0 || packet[3] != 0);
    }

    #[test]
    fn test_build_echo_request_v6_leaves_checksum_to_kernel() {
        let family = IcmpFamily::for_ip("::1".parse().unwrap());
        let packet = build_echo_request(&family, 1, 0);
        assert_eq!(packet[0], 128);
        assert_eq!(packet[2..4], [0, 0]);
    }

    #[test]
    fn test_parse_avg_rtt_linux_summary() {
        let output = r#"PING 8.8.8.8 (8.8.8.8) 56(84) bytes of data.
64 bytes from 8.8.8.8: icmp_seq=1 ttl=117 time=12.3 ms
64 bytes from 8.8.8.8: icmp_seq=2 ttl=117 time=12.5 ms
64 bytes from 8.8.8.8: icmp_seq=3 ttl=117 time=12.7 ms

--- 8.8.8.8 ping statistics ---
3 packets transmitted, 3 received, 0% packet loss, time 2003ms
rtt min/avg/max/mdev = 12.300/12.500/12.700/0.163 ms"#;
        let avg = parse_avg_rtt(output).unwrap();
        assert!((avg - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_avg_rtt_macos_summary() {
        let output = r#"PING google.com (142.250.69.174): 56 data bytes

--- google.com ping statistics ---
3 packets transmitted, 3 packets received, 0.0% packet loss
round-trip min/avg/max/stddev = 17.100/17.906/18.400/0.530 ms"#;
        let avg = parse_avg_rtt(output).unwrap();
        assert!((avg - 17.906).abs() < 1e-9);
    }

    #[test]
    fn test_parse_avg_rtt_per_packet_fallback() {
        let output = "64 bytes from 10.0.0.1: icmp_seq=1 ttl=64 time=2.0 ms\n\
                      64 bytes from 10.0.0.1: icmp_seq=2 ttl=64 time=4.0 ms";
        let avg = parse_avg_rtt(output).unwrap();
        assert!((avg - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_avg_rtt_unparseable_is_none() {
        assert_eq!(parse_avg_rtt("3 packets transmitted, 3 received"), None);
        assert_eq!(parse_avg_rtt(""), None);
    }
}
