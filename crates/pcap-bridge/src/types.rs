//! Link-layer types, timestamp types and the native name tables

use crate::cstr::{from_native, to_cstring};
use crate::error::{PcapError, PcapResult};
use crate::ffi;
use std::fmt;

/// A datalink type (`DLT_*` value as reported by libpcap)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Linktype(pub i32);

impl Linktype {
    pub const NULL: Self = Self(0);
    pub const ETHERNET: Self = Self(1);
    pub const IEEE802_5: Self = Self(6);
    pub const ARCNET: Self = Self(7);
    pub const SLIP: Self = Self(8);
    pub const PPP: Self = Self(9);
    pub const FDDI: Self = Self(10);
    pub const ATM_RFC1483: Self = Self(11);
    #[cfg(not(target_os = "openbsd"))]
    pub const RAW: Self = Self(12);
    #[cfg(target_os = "openbsd")]
    pub const RAW: Self = Self(14);
    pub const PPP_ETHER: Self = Self(51);
    pub const IEEE802_11: Self = Self(105);
    pub const FRELAY: Self = Self(107);
    #[cfg(not(target_os = "openbsd"))]
    pub const LOOP: Self = Self(108);
    #[cfg(target_os = "openbsd")]
    pub const LOOP: Self = Self(12);
    pub const LINUX_SLL: Self = Self(113);
    pub const LTALK: Self = Self(114);
    pub const PFLOG: Self = Self(117);
    pub const IEEE802_11_PRISM: Self = Self(119);
    pub const IP_OVER_FC: Self = Self(122);
    pub const SUNATM: Self = Self(123);
    pub const IEEE802_11_RADIOTAP: Self = Self(127);
    pub const ARCNET_LINUX: Self = Self(129);
    pub const LINUX_IRDA: Self = Self(144);
    pub const IEEE802_11_AVS: Self = Self(163);
    pub const USB_LINUX: Self = Self(189);
    pub const PPI: Self = Self(192);
    pub const IEEE802_15_4: Self = Self(195);
    pub const USB_LINUX_MMAPPED: Self = Self(220);
    pub const CAN_SOCKETCAN: Self = Self(227);
    pub const IPV4: Self = Self(228);
    pub const IPV6: Self = Self(229);
    pub const NFLOG: Self = Self(239);
    pub const NETLINK: Self = Self(253);
    pub const LINUX_SLL2: Self = Self(276);

    /// Every constant defined above
    pub const KNOWN: &'static [Linktype] = &[
        Self::NULL,
        Self::ETHERNET,
        Self::IEEE802_5,
        Self::ARCNET,
        Self::SLIP,
        Self::PPP,
        Self::FDDI,
        Self::ATM_RFC1483,
        Self::RAW,
        Self::PPP_ETHER,
        Self::IEEE802_11,
        Self::FRELAY,
        Self::LOOP,
        Self::LINUX_SLL,
        Self::LTALK,
        Self::PFLOG,
        Self::IEEE802_11_PRISM,
        Self::IP_OVER_FC,
        Self::SUNATM,
        Self::IEEE802_11_RADIOTAP,
        Self::ARCNET_LINUX,
        Self::LINUX_IRDA,
        Self::IEEE802_11_AVS,
        Self::USB_LINUX,
        Self::PPI,
        Self::IEEE802_15_4,
        Self::USB_LINUX_MMAPPED,
        Self::CAN_SOCKETCAN,
        Self::IPV4,
        Self::IPV6,
        Self::NFLOG,
        Self::NETLINK,
        Self::LINUX_SLL2,
    ];

    /// Look up a datalink by its libpcap name (`"EN10MB"`, case-insensitive)
    pub fn from_name(name: &str) -> PcapResult<Self> {
        let c_name = to_cstring(name)?;
        let value = unsafe { ffi::pcap_datalink_name_to_val(c_name.as_ptr()) };
        if value < 0 {
            Err(PcapError::UnknownName(name.to_string()))
        } else {
            Ok(Self(value))
        }
    }

    /// libpcap name, `None` if libpcap has no entry for this value
    pub fn name(self) -> Option<String> {
        unsafe { from_native(ffi::pcap_datalink_val_to_name(self.0)) }
    }

    pub fn description(self) -> Option<String> {
        unsafe { from_native(ffi::pcap_datalink_val_to_description(self.0)) }
    }

    /// Description, or `"DLT <n>"` for values libpcap does not know
    pub fn description_or_dlt(self) -> String {
        unsafe { from_native(ffi::pcap_datalink_val_to_description_or_dlt(self.0)) }
            .unwrap_or_else(|| format!("DLT {}", self.0))
    }
}

impl fmt::Display for Linktype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "DLT {}", self.0),
        }
    }
}

/// Timestamp source (`PCAP_TSTAMP_*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimestampType(pub i32);

impl TimestampType {
    pub const HOST: Self = Self(0);
    pub const HOST_LOWPREC: Self = Self(1);
    pub const HOST_HIPREC: Self = Self(2);
    pub const ADAPTER: Self = Self(3);
    pub const ADAPTER_UNSYNCED: Self = Self(4);
    pub const HOST_HIPREC_UNSYNCED: Self = Self(5);

    pub fn from_name(name: &str) -> PcapResult<Self> {
        let c_name = to_cstring(name)?;
        let value = unsafe { ffi::pcap_tstamp_type_name_to_val(c_name.as_ptr()) };
        if value < 0 {
            Err(PcapError::UnknownName(name.to_string()))
        } else {
            Ok(Self(value))
        }
    }

    pub fn name(self) -> Option<String> {
        unsafe { from_native(ffi::pcap_tstamp_type_val_to_name(self.0)) }
    }

    pub fn description(self) -> Option<String> {
        unsafe { from_native(ffi::pcap_tstamp_type_val_to_description(self.0)) }
    }
}

impl fmt::Display for TimestampType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "tstamp {}", self.0),
        }
    }
}

/// Resolution of packet timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TimestampPrecision {
    #[default]
    Micro,
    Nano,
}

impl TimestampPrecision {
    pub fn code(self) -> i32 {
        match self {
            TimestampPrecision::Micro => 0,
            TimestampPrecision::Nano => 1,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(TimestampPrecision::Micro),
            1 => Some(TimestampPrecision::Nano),
            _ => None,
        }
    }

    /// Parse the configuration spelling (`"micro"` / `"nano"`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "micro" | "us" => Some(TimestampPrecision::Micro),
            "nano" | "ns" => Some(TimestampPrecision::Nano),
            _ => None,
        }
    }

    /// Nanoseconds per unit of the sub-second timestamp field
    pub(crate) fn nanos_per_unit(self) -> u32 {
        match self {
            TimestampPrecision::Micro => 1_000,
            TimestampPrecision::Nano => 1,
        }
    }
}

/// Packet direction selected with `set_direction`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    InOut,
    In,
    Out,
}

impl Direction {
    pub fn code(self) -> i32 {
        match self {
            Direction::InOut => 0,
            Direction::In => 1,
            Direction::Out => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ethernet_name() {
        assert_eq!(Linktype::ETHERNET.name().as_deref(), Some("EN10MB"));
        assert_eq!(Linktype::from_name("en10mb").unwrap(), Linktype::ETHERNET);
        assert_eq!(Linktype::ETHERNET.to_string(), "EN10MB");
    }

    #[test]
    fn test_datalink_round_trip() {
        let mut named = 0;
        for &linktype in Linktype::KNOWN {
            if let Some(name) = linktype.name() {
                assert_eq!(
                    Linktype::from_name(&name).unwrap(),
                    linktype,
                    "round trip through {}",
                    name
                );
                named += 1;
            }
        }
        assert!(named > 10, "libpcap only named {} linktypes", named);
    }

    #[test]
    fn test_unknown_datalink() {
        assert!(matches!(
            Linktype::from_name("NOT_A_LINKTYPE"),
            Err(PcapError::UnknownName(_))
        ));
        assert_eq!(Linktype(60000).name(), None);
        assert!(Linktype(60000).description_or_dlt().contains("60000"));
    }

    #[test]
    fn test_timestamp_type_names() {
        assert_eq!(TimestampType::HOST.name().as_deref(), Some("host"));
        assert_eq!(
            TimestampType::from_name("adapter").unwrap(),
            TimestampType::ADAPTER
        );
        assert!(TimestampType::from_name("bogus").is_err());
        assert!(TimestampType::HOST.description().is_some());
    }

    #[test]
    fn test_precision_codes() {
        assert_eq!(TimestampPrecision::from_code(1), Some(TimestampPrecision::Nano));
        assert_eq!(TimestampPrecision::from_code(7), None);
        assert_eq!(TimestampPrecision::from_name("NANO"), Some(TimestampPrecision::Nano));
        assert_eq!(TimestampPrecision::default().code(), 0);
    }
}
