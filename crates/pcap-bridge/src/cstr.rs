//! String marshaling helpers shared by the wrappers

use crate::error::PcapResult;
use crate::ffi::PCAP_ERRBUF_SIZE;
use libc::c_char;
use std::ffi::{CStr, CString};

/// Per-call error buffer handed to libpcap functions that take `errbuf`
pub(crate) struct ErrorBuffer([c_char; PCAP_ERRBUF_SIZE]);

impl ErrorBuffer {
    pub(crate) fn new() -> Self {
        Self([0; PCAP_ERRBUF_SIZE])
    }

    pub(crate) fn as_mut_ptr(&mut self) -> *mut c_char {
        self.0.as_mut_ptr()
    }

    /// Copy the message out, stopping at the first NUL
    pub(crate) fn message(&self) -> String {
        // Guard against a library that filled the buffer without terminating it
        let end = self.0.iter().position(|&c| c == 0).unwrap_or(PCAP_ERRBUF_SIZE);
        let bytes: Vec<u8> = self.0[..end].iter().map(|&c| c as u8).collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

pub(crate) fn to_cstring(value: &str) -> PcapResult<CString> {
    Ok(CString::new(value)?)
}

/// Copy a borrowed native string into host memory
///
/// # Safety
/// `ptr` must be null or point at a NUL-terminated string that stays valid
/// for the duration of the call.
pub(crate) unsafe fn from_native(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        None
    } else {
        Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_buffer_starts_empty() {
        assert_eq!(ErrorBuffer::new().message(), "");
    }

    #[test]
    fn test_error_buffer_reads_until_nul() {
        let mut buf = ErrorBuffer::new();
        for (i, b) in b"no such device\0garbage".iter().enumerate() {
            buf.0[i] = *b as c_char;
        }
        assert_eq!(buf.message(), "no such device");
    }

    #[test]
    fn test_interior_nul_is_rejected() {
        assert!(to_cstring("eth\00").is_err());
        assert_eq!(to_cstring("eth0").unwrap().as_bytes(), b"eth0");
    }

    #[test]
    fn test_null_native_string() {
        assert_eq!(unsafe { from_native(std::ptr::null()) }, None);
    }
}
