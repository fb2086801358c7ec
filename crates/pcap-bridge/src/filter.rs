//! Compiled BPF filter programs

use crate::error::PcapResult;
use crate::ffi;
use crate::packet::{Packet, PacketHeader};
use std::fmt;

/// Netmask to pass to `compile` when the capture network is unknown
pub const NETMASK_UNKNOWN: u32 = 0xffff_ffff;

pub use crate::ffi::bpf_insn as BpfInstruction;

/// A compiled filter program
///
/// Starts out empty; [`Session::compile_into`](crate::Session::compile_into)
/// fills it. The instructions are released exactly once, on [`free`] or drop.
/// A failed compile leaves the program empty, so releasing it is always safe.
/// libpcap copies the program into the session on `set_filter`, so a program
/// may outlive the session it was compiled against.
///
/// [`free`]: BpfProgram::free
pub struct BpfProgram {
    inner: ffi::bpf_program,
}

unsafe impl Send for BpfProgram {}

impl BpfProgram {
    pub fn new() -> Self {
        Self {
            inner: ffi::bpf_program {
                bf_len: 0,
                bf_insns: std::ptr::null_mut(),
            },
        }
    }

    /// Number of instructions
    pub fn len(&self) -> usize {
        if self.inner.bf_insns.is_null() {
            0
        } else {
            self.inner.bf_len as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn instructions(&self) -> &[BpfInstruction] {
        if self.is_empty() {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.inner.bf_insns, self.len()) }
        }
    }

    /// Run the filter over a packet without a live session
    ///
    /// An empty program accepts everything, matching libpcap.
    pub fn matches(&self, header: &PacketHeader, data: &[u8]) -> PcapResult<bool> {
        header.check_buffer(data)?;
        let ret = unsafe { ffi::pcap_offline_filter(&self.inner, header.as_raw(), data.as_ptr()) };
        Ok(ret != 0)
    }

    pub fn matches_packet(&self, packet: &Packet<'_>) -> PcapResult<bool> {
        self.matches(packet.header, packet.data)
    }

    /// Release the compiled instructions now
    pub fn free(self) {
        drop(self)
    }

    pub(crate) fn as_raw(&self) -> *const ffi::bpf_program {
        &self.inner
    }

    pub(crate) fn as_mut_raw(&mut self) -> *mut ffi::bpf_program {
        &mut self.inner
    }

    /// Drop any previous instructions before the program is recompiled
    pub(crate) fn reset(&mut self) {
        if !self.inner.bf_insns.is_null() {
            unsafe { ffi::pcap_freecode(&mut self.inner) };
        }
        self.inner.bf_len = 0;
        self.inner.bf_insns = std::ptr::null_mut();
    }
}

impl Default for BpfProgram {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BpfProgram {
    fn drop(&mut self) {
        self.reset();
    }
}

impl fmt::Debug for BpfProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BpfProgram")
            .field("instructions", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::test_support::{tcp_frame, udp_frame};
    use crate::types::Linktype;

    fn dead_ethernet() -> Session {
        Session::open_dead(Linktype::ETHERNET, 65535).unwrap()
    }

    #[test]
    fn test_empty_program_accepts_everything() {
        let program = BpfProgram::new();
        assert!(program.is_empty());
        assert!(program.instructions().is_empty());
        let frame = udp_frame(53);
        let header = PacketHeader::new(0, 0, frame.len() as u32, frame.len() as u32);
        assert!(program.matches(&header, &frame).unwrap());
        program.free();
    }

    #[test]
    fn test_tcp_port_80_on_dead_ethernet() {
        let mut session = dead_ethernet();
        let program = session.compile("tcp port 80", true, NETMASK_UNKNOWN).unwrap();
        assert!(!program.is_empty());

        let web = tcp_frame(80);
        let web_header = PacketHeader::new(0, 0, web.len() as u32, web.len() as u32);
        assert!(program.matches(&web_header, &web).unwrap());

        let dns = udp_frame(53);
        let dns_header = PacketHeader::new(0, 0, dns.len() as u32, dns.len() as u32);
        assert!(!program.matches(&dns_header, &dns).unwrap());

        let ssh = tcp_frame(22);
        let ssh_header = PacketHeader::new(0, 0, ssh.len() as u32, ssh.len() as u32);
        assert!(!program.matches(&ssh_header, &ssh).unwrap());

        program.free();
        session.close();
    }

    #[test]
    fn test_invalid_expression_leaves_program_freeable() {
        let mut session = dead_ethernet();
        let mut program = BpfProgram::new();
        let err = session
            .compile_into(&mut program, "tcp port eighty and (", true, NETMASK_UNKNOWN)
            .unwrap_err();
        assert!(err.status().map(|s| s.is_error()).unwrap_or(false));
        assert!(!err.to_string().is_empty());
        assert!(program.is_empty());
        program.free();
    }

    #[test]
    fn test_recompile_replaces_instructions() {
        let mut session = dead_ethernet();
        let mut program = BpfProgram::new();
        session
            .compile_into(&mut program, "tcp port 80", false, NETMASK_UNKNOWN)
            .unwrap();
        let first = program.len();
        session
            .compile_into(&mut program, "udp", false, NETMASK_UNKNOWN)
            .unwrap();
        assert!(program.len() > 0);
        assert_ne!(program.len(), first);

        let dns = udp_frame(53);
        let header = PacketHeader::new(0, 0, dns.len() as u32, dns.len() as u32);
        assert!(program.matches(&header, &dns).unwrap());
    }

    #[test]
    fn test_short_buffer_is_rejected() {
        let mut session = dead_ethernet();
        let program = session.compile("ip", true, NETMASK_UNKNOWN).unwrap();
        let header = PacketHeader::new(0, 0, 100, 100);
        assert!(program.matches(&header, &[0u8; 20]).is_err());
    }

    #[test]
    fn test_program_outlives_session() {
        let mut session = dead_ethernet();
        let program = session.compile("tcp", true, NETMASK_UNKNOWN).unwrap();
        session.close();

        let frame = tcp_frame(443);
        let header = PacketHeader::new(0, 0, frame.len() as u32, frame.len() as u32);
        assert!(program.matches(&header, &frame).unwrap());
    }
}
