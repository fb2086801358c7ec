//! Capture-file writer

use crate::error::PcapResult;
use crate::ffi;
use crate::packet::{Packet, PacketHeader};
use std::io;
use std::ptr::NonNull;
use tracing::debug;

/// An open savefile writer (`pcap_dumper_t`)
///
/// The file header is written with the link-layer type and snapshot length
/// of the session it was opened from; after that the writer is independent
/// of the session. Closed exactly once, on [`close`](Dumper::close) or drop.
pub struct Dumper {
    raw: NonNull<ffi::pcap_dumper_t>,
}

unsafe impl Send for Dumper {}

impl Dumper {
    pub(crate) fn from_raw(raw: NonNull<ffi::pcap_dumper_t>) -> Self {
        Self { raw }
    }

    /// Append one packet
    pub fn dump(&mut self, header: &PacketHeader, data: &[u8]) -> PcapResult<()> {
        header.check_buffer(data)?;
        unsafe {
            ffi::pcap_dump(
                self.raw.as_ptr() as *mut u8,
                header.as_raw(),
                data.as_ptr(),
            )
        };
        Ok(())
    }

    pub fn dump_packet(&mut self, packet: &Packet<'_>) -> PcapResult<()> {
        self.dump(packet.header, packet.data)
    }

    /// Flush buffered packets to the file
    pub fn flush(&mut self) -> PcapResult<()> {
        let ret = unsafe { ffi::pcap_dump_flush(self.raw.as_ptr()) };
        if ret != 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(())
    }

    /// Current write offset in the file
    pub fn tell(&mut self) -> PcapResult<u64> {
        let position = unsafe { ffi::pcap_dump_ftell(self.raw.as_ptr()) };
        if position < 0 {
            return Err(io::Error::last_os_error().into());
        }
        Ok(position as u64)
    }

    /// Flush and close the file
    pub fn close(self) {
        drop(self)
    }
}

impl Drop for Dumper {
    fn drop(&mut self) {
        debug!("Closing capture file writer");
        unsafe { ffi::pcap_dump_close(self.raw.as_ptr()) };
    }
}

impl std::fmt::Debug for Dumper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dumper").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{NextPacket, Session};
    use crate::test_support::{synthetic_frames, tcp_frame, write_capture};
    use crate::types::Linktype;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Global savefile header size
    const FILE_HEADER_LEN: u64 = 24;
    /// Per-record header size on disk
    const RECORD_HEADER_LEN: u64 = 16;

    #[test]
    fn test_tell_tracks_written_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tell.pcap");
        let session = Session::open_dead(Linktype::ETHERNET, 65535).unwrap();
        let mut dumper = session.dump_open(&path).unwrap();
        assert_eq!(dumper.tell().unwrap(), FILE_HEADER_LEN);

        let frame = tcp_frame(80);
        let header = PacketHeader::new(1, 0, frame.len() as u32, frame.len() as u32);
        dumper.dump(&header, &frame).unwrap();
        dumper.flush().unwrap();
        assert_eq!(
            dumper.tell().unwrap(),
            FILE_HEADER_LEN + RECORD_HEADER_LEN + frame.len() as u64
        );
        dumper.close();
    }

    #[test]
    fn test_dump_rejects_short_buffer() {
        let dir = TempDir::new().unwrap();
        let session = Session::open_dead(Linktype::ETHERNET, 65535).unwrap();
        let mut dumper = session.dump_open(dir.path().join("short.pcap")).unwrap();
        let header = PacketHeader::new(0, 0, 64, 64);
        assert!(dumper.dump(&header, &[0u8; 10]).is_err());
    }

    #[test]
    fn test_append_extends_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("append.pcap");
        write_capture(&path, &synthetic_frames(2));

        let session = Session::open_dead(Linktype::ETHERNET, 65535).unwrap();
        let mut dumper = session.dump_open_append(&path).unwrap();
        let frame = tcp_frame(8080);
        let header = PacketHeader::for_data(Duration::from_secs(5), Default::default(), &frame);
        dumper.dump(&header, &frame).unwrap();
        dumper.close();

        let mut reader = Session::open_offline(&path).unwrap();
        let mut count = 0;
        while let NextPacket::Packet(_) = reader.next_packet().unwrap() {
            count += 1;
        }
        assert_eq!(count, 3);
    }
}
