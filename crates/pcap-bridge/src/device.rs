//! Interface enumeration and network lookup

use crate::cstr::{from_native, to_cstring, ErrorBuffer};
use crate::error::{PcapError, PcapResult};
use crate::ffi;
use serde::Serialize;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::debug;

const PCAP_IF_LOOPBACK: u32 = 0x0000_0001;
const PCAP_IF_UP: u32 = 0x0000_0002;
const PCAP_IF_RUNNING: u32 = 0x0000_0004;
const PCAP_IF_WIRELESS: u32 = 0x0000_0008;
const PCAP_IF_CONNECTION_STATUS: u32 = 0x0000_0030;

/// Link state reported in the interface flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Unknown,
    Connected,
    Disconnected,
    NotApplicable,
}

/// Interface flag bits (`PCAP_IF_*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct DeviceFlags(pub u32);

impl DeviceFlags {
    pub fn is_loopback(self) -> bool {
        self.0 & PCAP_IF_LOOPBACK != 0
    }

    pub fn is_up(self) -> bool {
        self.0 & PCAP_IF_UP != 0
    }

    pub fn is_running(self) -> bool {
        self.0 & PCAP_IF_RUNNING != 0
    }

    pub fn is_wireless(self) -> bool {
        self.0 & PCAP_IF_WIRELESS != 0
    }

    pub fn connection_status(self) -> ConnectionStatus {
        match self.0 & PCAP_IF_CONNECTION_STATUS {
            0x10 => ConnectionStatus::Connected,
            0x20 => ConnectionStatus::Disconnected,
            0x30 => ConnectionStatus::NotApplicable,
            _ => ConnectionStatus::Unknown,
        }
    }
}

/// One address of an interface, copied out of native memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Address {
    pub addr: Option<IpAddr>,
    pub netmask: Option<IpAddr>,
    pub broadcast: Option<IpAddr>,
    pub destination: Option<IpAddr>,
}

/// A capture-capable interface, copied out of native memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    pub name: String,
    pub description: Option<String>,
    pub addresses: Vec<Address>,
    pub flags: DeviceFlags,
}

/// The native interface list returned by `pcap_findalldevs`
///
/// Freed exactly once, either through [`DeviceList::free`] or on drop.
pub struct DeviceList {
    head: *mut ffi::pcap_if_t,
}

unsafe impl Send for DeviceList {}

/// Enumerate capture devices
pub fn find_all_devices() -> PcapResult<DeviceList> {
    let mut head: *mut ffi::pcap_if_t = std::ptr::null_mut();
    let mut errbuf = ErrorBuffer::new();
    let ret = unsafe { ffi::pcap_findalldevs(&mut head, errbuf.as_mut_ptr()) };
    if ret != 0 {
        return Err(PcapError::Native {
            message: errbuf.message(),
        });
    }
    // A null head with a zero return is an empty list, not an error
    let list = DeviceList { head };
    debug!("Found {} capture devices", list.len());
    Ok(list)
}

/// Enumerate capture devices and copy them into host memory
pub fn devices() -> PcapResult<Vec<Device>> {
    let list = find_all_devices()?;
    let devices = list.to_vec();
    list.free();
    Ok(devices)
}

impl DeviceList {
    pub fn iter(&self) -> DeviceIter<'_> {
        DeviceIter {
            next: self.head,
            _list: self,
        }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_null()
    }

    pub fn to_vec(&self) -> Vec<Device> {
        self.iter().collect()
    }

    /// Release the native list now
    pub fn free(self) {
        drop(self)
    }
}

impl Drop for DeviceList {
    fn drop(&mut self) {
        if !self.head.is_null() {
            unsafe { ffi::pcap_freealldevs(self.head) };
            self.head = std::ptr::null_mut();
        }
    }
}

impl std::fmt::Debug for DeviceList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Iterator copying each native entry into a [`Device`]
pub struct DeviceIter<'a> {
    next: *mut ffi::pcap_if_t,
    _list: &'a DeviceList,
}

impl Iterator for DeviceIter<'_> {
    type Item = Device;

    fn next(&mut self) -> Option<Device> {
        if self.next.is_null() {
            return None;
        }
        // The list is borrowed, so every entry stays valid while we read it
        let entry = unsafe { &*self.next };
        self.next = entry.next;
        Some(unsafe { device_from_raw(entry) })
    }
}

unsafe fn device_from_raw(entry: &ffi::pcap_if_t) -> Device {
    let mut addresses = Vec::new();
    let mut next = entry.addresses;
    while !next.is_null() {
        let addr = &*next;
        addresses.push(Address {
            addr: sockaddr_to_ip(addr.addr),
            netmask: sockaddr_to_ip(addr.netmask),
            broadcast: sockaddr_to_ip(addr.broadaddr),
            destination: sockaddr_to_ip(addr.dstaddr),
        });
        next = addr.next;
    }

    Device {
        name: from_native(entry.name).unwrap_or_default(),
        description: from_native(entry.description),
        addresses,
        flags: DeviceFlags(entry.flags),
    }
}

/// Convert an IPv4/IPv6 socket address; other families yield `None`
unsafe fn sockaddr_to_ip(addr: *const libc::sockaddr) -> Option<IpAddr> {
    if addr.is_null() {
        return None;
    }
    match (*addr).sa_family as libc::c_int {
        libc::AF_INET => {
            let sin = &*(addr as *const libc::sockaddr_in);
            Some(IpAddr::V4(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr))))
        }
        libc::AF_INET6 => {
            let sin6 = &*(addr as *const libc::sockaddr_in6);
            Some(IpAddr::V6(Ipv6Addr::from(sin6.sin6_addr.s6_addr)))
        }
        _ => None,
    }
}

/// IPv4 network number and mask of a device (`pcap_lookupnet`)
///
/// Both values are kept in the byte order libpcap returns, which is what
/// [`Session::compile`](crate::Session::compile) expects as its netmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkAndMask {
    pub net: u32,
    pub mask: u32,
}

impl NetworkAndMask {
    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from_be(self.net))
    }

    pub fn netmask(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from_be(self.mask))
    }
}

/// Look up the IPv4 network and mask of `device`
pub fn lookup_net(device: &str) -> PcapResult<NetworkAndMask> {
    let c_device = to_cstring(device)?;
    let mut net = 0u32;
    let mut mask = 0u32;
    let mut errbuf = ErrorBuffer::new();
    let ret =
        unsafe { ffi::pcap_lookupnet(c_device.as_ptr(), &mut net, &mut mask, errbuf.as_mut_ptr()) };
    if ret < 0 {
        return Err(PcapError::Native {
            message: errbuf.message(),
        });
    }
    Ok(NetworkAndMask { net, mask })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_flags() {
        let flags = DeviceFlags(PCAP_IF_LOOPBACK | PCAP_IF_UP | 0x10);
        assert!(flags.is_loopback());
        assert!(flags.is_up());
        assert!(!flags.is_running());
        assert!(!flags.is_wireless());
        assert_eq!(flags.connection_status(), ConnectionStatus::Connected);
        assert_eq!(
            DeviceFlags(0x30).connection_status(),
            ConnectionStatus::NotApplicable
        );
        assert_eq!(DeviceFlags(0).connection_status(), ConnectionStatus::Unknown);
    }

    #[test]
    fn test_network_and_mask_byte_order() {
        let value = NetworkAndMask {
            net: u32::from_be_bytes([192, 168, 1, 0]).to_be(),
            mask: u32::from_be_bytes([255, 255, 255, 0]).to_be(),
        };
        assert_eq!(value.network(), Ipv4Addr::new(192, 168, 1, 0));
        assert_eq!(value.netmask(), Ipv4Addr::new(255, 255, 255, 0));
    }

    #[test]
    fn test_find_all_devices_then_free() {
        // Enumeration may legitimately fail in locked-down sandboxes
        let list = match find_all_devices() {
            Ok(list) => list,
            Err(PcapError::Native { .. }) => return,
            Err(e) => panic!("unexpected error: {}", e),
        };
        let copied = list.to_vec();
        assert_eq!(copied.len(), list.len());
        assert_eq!(list.is_empty(), copied.is_empty());
        for device in &copied {
            assert!(!device.name.is_empty());
        }
        list.free();
    }

    #[test]
    fn test_lookup_net_unknown_device() {
        let err = lookup_net("pcap-bridge-no-such-device0").unwrap_err();
        assert!(matches!(err, PcapError::Native { .. }));
    }

    #[test]
    fn test_lookup_net_rejects_nul() {
        assert!(matches!(
            lookup_net("eth\00"),
            Err(PcapError::InvalidString(_))
        ));
    }

    #[test]
    fn test_sockaddr_null() {
        assert_eq!(unsafe { sockaddr_to_ip(std::ptr::null()) }, None);
    }
}
