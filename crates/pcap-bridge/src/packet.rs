//! Packet headers and zero-copy packet views

use crate::error::{PcapError, PcapResult};
use crate::ffi;
use crate::types::TimestampPrecision;
use std::fmt;
use std::time::Duration;

/// Per-packet metadata, layout-compatible with `struct pcap_pkthdr`
///
/// Headers produced by a capture are borrowed from libpcap; headers built
/// with [`PacketHeader::new`] are host-owned and can be passed to
/// [`Dumper::dump`](crate::Dumper::dump) or
/// [`BpfProgram::matches`](crate::BpfProgram::matches).
#[repr(transparent)]
#[derive(Clone, Copy)]
pub struct PacketHeader(ffi::pcap_pkthdr);

impl PacketHeader {
    /// Build a header; `ts_subsec` is in the unit of the session's precision
    pub fn new(ts_sec: i64, ts_subsec: u32, caplen: u32, len: u32) -> Self {
        Self(ffi::pcap_pkthdr {
            ts: libc::timeval {
                tv_sec: ts_sec as libc::time_t,
                tv_usec: ts_subsec as libc::suseconds_t,
            },
            caplen,
            len,
            #[cfg(target_os = "macos")]
            comment: [0; 256],
        })
    }

    /// Header for a complete (untruncated) packet at `timestamp` since the epoch
    pub fn for_data(timestamp: Duration, precision: TimestampPrecision, data: &[u8]) -> Self {
        let subsec = timestamp.subsec_nanos() / precision.nanos_per_unit();
        let len = data.len() as u32;
        Self::new(timestamp.as_secs() as i64, subsec, len, len)
    }

    pub fn ts_sec(&self) -> i64 {
        self.0.ts.tv_sec as i64
    }

    /// Sub-second part, microseconds or nanoseconds depending on precision
    pub fn ts_subsec(&self) -> u32 {
        self.0.ts.tv_usec as u32
    }

    /// Timestamp since the epoch, interpreted with `precision`
    pub fn timestamp(&self, precision: TimestampPrecision) -> Duration {
        let nanos = self.ts_subsec().saturating_mul(precision.nanos_per_unit());
        Duration::new(self.ts_sec().max(0) as u64, 0) + Duration::from_nanos(nanos as u64)
    }

    /// Bytes actually captured
    pub fn caplen(&self) -> u32 {
        self.0.caplen
    }

    /// Length of the packet on the wire
    pub fn len(&self) -> u32 {
        self.0.len
    }

    pub fn is_empty(&self) -> bool {
        self.0.len == 0
    }

    pub fn is_truncated(&self) -> bool {
        self.0.caplen < self.0.len
    }

    pub(crate) fn as_raw(&self) -> *const ffi::pcap_pkthdr {
        &self.0
    }

    /// Reject buffers shorter than `caplen`; libpcap reads `caplen` bytes
    pub(crate) fn check_buffer(&self, data: &[u8]) -> PcapResult<()> {
        let needed = self.0.caplen as usize;
        if data.len() < needed {
            Err(PcapError::BufferTooShort {
                needed,
                actual: data.len(),
            })
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for PacketHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PacketHeader")
            .field("ts_sec", &self.ts_sec())
            .field("ts_subsec", &self.ts_subsec())
            .field("caplen", &self.caplen())
            .field("len", &self.len())
            .finish()
    }
}

impl PartialEq for PacketHeader {
    fn eq(&self, other: &Self) -> bool {
        self.ts_sec() == other.ts_sec()
            && self.ts_subsec() == other.ts_subsec()
            && self.caplen() == other.caplen()
            && self.len() == other.len()
    }
}

impl Eq for PacketHeader {}

/// A packet borrowed from native memory
///
/// Valid only until the next packet is fetched from the same session: the
/// borrow checker enforces this for `next_packet`, and callback views do not
/// outlive the callback.
#[derive(Debug, Clone, Copy)]
pub struct Packet<'a> {
    pub header: &'a PacketHeader,
    pub data: &'a [u8],
}

impl<'a> Packet<'a> {
    /// View a native header/bytes pair
    ///
    /// # Safety
    /// `header` must point at a valid `pcap_pkthdr` and `bytes` at `caplen`
    /// readable bytes, both valid for `'a`.
    pub(crate) unsafe fn from_raw(header: *const ffi::pcap_pkthdr, bytes: *const u8) -> Self {
        let header = &*(header as *const PacketHeader);
        let data = if bytes.is_null() || header.caplen() == 0 {
            &[][..]
        } else {
            std::slice::from_raw_parts(bytes, header.caplen() as usize)
        };
        Packet { header, data }
    }

    /// Copy the bytes out of native memory
    pub fn to_owned_data(&self) -> Vec<u8> {
        self.data.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_accessors() {
        let header = PacketHeader::new(1_700_000_000, 250_000, 60, 1514);
        assert_eq!(header.ts_sec(), 1_700_000_000);
        assert_eq!(header.ts_subsec(), 250_000);
        assert_eq!(header.caplen(), 60);
        assert_eq!(header.len(), 1514);
        assert!(header.is_truncated());
        assert_eq!(
            header.timestamp(TimestampPrecision::Micro),
            Duration::new(1_700_000_000, 250_000_000)
        );
    }

    #[test]
    fn test_header_for_data_uses_precision() {
        let ts = Duration::new(10, 123_456_789);
        let data = [0u8; 42];

        let micro = PacketHeader::for_data(ts, TimestampPrecision::Micro, &data);
        assert_eq!(micro.ts_subsec(), 123_456);
        assert_eq!(micro.caplen(), 42);
        assert!(!micro.is_truncated());

        let nano = PacketHeader::for_data(ts, TimestampPrecision::Nano, &data);
        assert_eq!(nano.ts_subsec(), 123_456_789);
        assert_eq!(nano.timestamp(TimestampPrecision::Nano), ts);
    }

    #[test]
    fn test_check_buffer() {
        let header = PacketHeader::new(0, 0, 10, 10);
        assert!(header.check_buffer(&[0u8; 10]).is_ok());
        assert!(matches!(
            header.check_buffer(&[0u8; 4]),
            Err(PcapError::BufferTooShort { needed: 10, actual: 4 })
        ));
    }

    #[test]
    fn test_view_from_raw_uses_caplen() {
        let header = PacketHeader::new(0, 0, 3, 8);
        let bytes = [1u8, 2, 3, 4, 5];
        let packet = unsafe { Packet::from_raw(header.as_raw(), bytes.as_ptr()) };
        assert_eq!(packet.data, &[1, 2, 3]);
        assert_eq!(packet.header.len(), 8);
        assert_eq!(packet.to_owned_data(), vec![1, 2, 3]);
    }
}
