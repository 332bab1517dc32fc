use hub_domain::{Error, Result};
use std::fs;

/// Resolves a stable machine identifier used as KDF input alongside the
/// stored salt (spec.md §4.1). Order: `/etc/machine-id`, platform
/// equivalent, hostname + primary MAC address.
pub fn resolve() -> Result<String> {
    if let Ok(id) = fs::read_to_string("/etc/machine-id") {
        let id = id.trim();
        if !id.is_empty() {
            return Ok(id.to_string());
        }
    }

    if let Some(id) = platform_equivalent() {
        return Ok(id);
    }

    hostname_plus_mac()
}

#[cfg(target_os = "macos")]
fn platform_equivalent() -> Option<String> {
    use std::process::Command;
    let output = Command::new("ioreg")
        .args(["-rd1", "-c", "IOPlatformExpertDevice"])
        .output()
        .ok()?;
    let text = String::from_utf8_lossy(&output.stdout);
    text.lines()
        .find(|l| l.contains("IOPlatformUUID"))
        .and_then(|l| l.split('"').nth(3))
        .map(|s| s.to_string())
}

#[cfg(target_os = "windows")]
fn platform_equivalent() -> Option<String> {
    use std::process::Command;
    let output = Command::new("wmic")
        .args(["csproduct", "get", "UUID"])
        .output()
        .ok()?;
    let text = String::from_utf8_lossy(&output.stdout);
    text.lines().nth(1).map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_equivalent() -> Option<String> {
    None
}

/// Last-resort fallback: hostname concatenated with the first non-loopback
/// interface's MAC address found under `/sys/class/net`.
fn hostname_plus_mac() -> Result<String> {
    let hostname = fs::read_to_string("/proc/sys/kernel/hostname")
        .or_else(|_| fs::read_to_string("/etc/hostname"))
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|_| "unknown-host".to_string());

    let mac = first_mac_address().unwrap_or_else(|| "00:00:00:00:00:00".to_string());
    Ok(format!("{hostname}:{mac}"))
}

fn first_mac_address() -> Option<String> {
    let entries = fs::read_dir("/sys/class/net").ok()?;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name == "lo" {
            continue;
        }
        let addr_path = entry.path().join("address");
        if let Ok(addr) = fs::read_to_string(addr_path) {
            let addr = addr.trim();
            if !addr.is_empty() && addr != "00:00:00:00:00:00" {
                return Some(addr.to_string());
            }
        }
    }
    None
}

/// Ensures the resolver never silently returns an empty identifier — an
/// empty string would derive a predictable, attacker-guessable key.
pub fn resolve_non_empty() -> Result<String> {
    let id = resolve()?;
    if id.trim().is_empty() {
        return Err(Error::Crypto("resolved machine id is empty".into()));
    }
    Ok(id)
}
