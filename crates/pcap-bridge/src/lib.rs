//! pcap-bridge - safe bindings to the system libpcap
//!
//! Every call forwards to one native capture function. What the binding adds
//! is ownership: sessions, device lists, filter programs, capture-file
//! writers and code lists are move-only values that release their native
//! memory exactly once, and packet views borrow the call that produced them.
//!
//! ```no_run
//! use pcap_bridge::{NextPacket, Session};
//!
//! # fn main() -> pcap_bridge::PcapResult<()> {
//! let mut session = Session::open_offline("trace.pcap")?;
//! while let NextPacket::Packet(packet) = session.next_packet()? {
//!     println!("{} bytes", packet.header.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
mod cstr;
pub mod device;
pub mod dump;
pub mod error;
mod ffi;
pub mod filter;
pub mod list;
pub mod packet;
pub mod session;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::{BridgeConfig, CaptureSettings, ConfigError, ConfigLoader, LoggingSettings};
pub use device::{
    devices, find_all_devices, lookup_net, Address, ConnectionStatus, Device, DeviceFlags,
    DeviceList, NetworkAndMask,
};
pub use dump::Dumper;
pub use error::{PcapError, PcapResult, Status, Warning};
pub use filter::{BpfInstruction, BpfProgram, NETMASK_UNKNOWN};
pub use list::{Datalinks, TimestampTypes, TypeList};
pub use packet::{Packet, PacketHeader};
pub use session::{BreakHandle, LoopOutcome, NextPacket, Session, SessionKind, Stats};
pub use types::{Direction, Linktype, TimestampPrecision, TimestampType};

use cstr::{from_native, ErrorBuffer};
use tracing::debug;

/// Initialize libpcap with UTF-8 strings (libpcap 1.10 or later)
///
/// Calling it again with the same options is harmless.
pub fn init() -> PcapResult<()> {
    let mut errbuf = ErrorBuffer::new();
    let ret = unsafe { ffi::pcap_init(ffi::PCAP_CHAR_ENC_UTF_8, errbuf.as_mut_ptr()) };
    if ret != 0 {
        return Err(PcapError::Native {
            message: errbuf.message(),
        });
    }
    debug!("libpcap initialized: {}", lib_version());
    Ok(())
}

/// Version string of the linked libpcap
pub fn lib_version() -> String {
    unsafe { from_native(ffi::pcap_lib_version()) }.unwrap_or_default()
}

/// Describe a native status code (`pcap_statustostr`)
pub fn status_to_string(code: i32) -> String {
    unsafe { from_native(ffi::pcap_statustostr(code)) }.unwrap_or_default()
}

/// Describe an `errno` value (`pcap_strerror`)
pub fn string_error(errno: i32) -> String {
    unsafe { from_native(ffi::pcap_strerror(errno)) }.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_repeatable() {
        init().unwrap();
        init().unwrap();
    }

    #[test]
    fn test_lib_version() {
        assert!(lib_version().contains("libpcap"));
    }

    #[test]
    fn test_status_to_string() {
        assert!(!status_to_string(0).is_empty());
        assert!(!status_to_string(-5).is_empty());
        assert_ne!(status_to_string(-5), status_to_string(-8));
        assert!(Status::NoSuchDevice.to_string().ends_with("(-5)"));
    }

    #[test]
    fn test_string_error() {
        assert!(!string_error(libc::ENOENT).is_empty());
    }
}
