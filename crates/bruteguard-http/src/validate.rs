//! Input parsing for addresses and subnets.

use std::net::IpAddr;

use ipnet::IpNet;

use bruteguard_service::subnet::canonical;

use crate::error::ApiError;

/// Rejects empty or whitespace-only values for a required field.
pub fn require_non_empty(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::bad_request(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Parses the source address of an attempt.
///
/// The unspecified addresses (`0.0.0.0`, `::`) are rejected: they cannot
/// originate a connection. IPv4-mapped IPv6 addresses come back as IPv4.
pub fn parse_addr(ip: &str) -> Result<IpAddr, ApiError> {
    let addr = ip
        .trim()
        .parse::<IpAddr>()
        .map_err(|_| ApiError::bad_request(format!("invalid ip address: {ip:?}")))?
        .to_canonical();
    if addr.is_unspecified() {
        return Err(ApiError::bad_request(format!("unspecified ip address: {ip}")));
    }
    Ok(addr)
}

/// Parses a subnet from an address and an optional mask.
///
/// With a mask, `ip` is a plain address and `mask` is either a prefix
/// length or a contiguous dotted netmask of the same family. Without one,
/// `ip` must be CIDR notation. Host bits are cleared.
pub fn parse_subnet(ip: &str, mask: Option<&str>) -> Result<IpNet, ApiError> {
    let ip = ip.trim();
    let Some(mask) = mask.map(str::trim).filter(|m| !m.is_empty()) else {
        let net: IpNet = ip
            .parse()
            .map_err(|_| ApiError::bad_request(format!("invalid subnet: {ip:?}")))?;
        return Ok(canonical(net));
    };

    let addr: IpAddr = ip
        .parse()
        .map_err(|_| ApiError::bad_request(format!("invalid ip address: {ip:?}")))?;
    let prefix = parse_mask(mask, addr)?;
    let net = IpNet::new(addr, prefix)
        .map_err(|_| ApiError::bad_request(format!("prefix length out of range: {prefix}")))?;
    Ok(canonical(net))
}

fn parse_mask(mask: &str, addr: IpAddr) -> Result<u8, ApiError> {
    let mask = mask.strip_prefix('/').unwrap_or(mask);
    if let Ok(prefix) = mask.parse::<u8>() {
        return Ok(prefix);
    }

    let invalid = || ApiError::bad_request(format!("invalid mask: {mask:?}"));
    let netmask: IpAddr = mask.parse().map_err(|_| invalid())?;
    match (addr, netmask) {
        (IpAddr::V4(_), IpAddr::V4(m)) => contiguous_prefix(u128::from(u32::from(m)) << 96),
        (IpAddr::V6(_), IpAddr::V6(m)) => contiguous_prefix(u128::from(m)),
        _ => None,
    }
    .ok_or_else(invalid)
}

/// Prefix length of a left-aligned mask, or `None` if its bits have gaps.
fn contiguous_prefix(bits: u128) -> Option<u8> {
    let ones = bits.leading_ones();
    if bits.checked_shl(ones).unwrap_or(0) != 0 {
        return None;
    }
    u8::try_from(ones).ok()
}
