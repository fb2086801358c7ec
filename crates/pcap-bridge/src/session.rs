//! Capture sessions
//!
//! A [`Session`] owns one native `pcap_t`. Every operation is a thin forward
//! to the matching libpcap call; the binding does not enforce libpcap's
//! activation ordering, so calling a setter on an activated handle surfaces
//! as [`Status::Activated`] rather than a binding-level check.
//!
//! Concurrency: a session is `Send` but all operations take `&self` or
//! `&mut self`, so use from several threads has to go through the caller's
//! own synchronization. The one exception is [`BreakHandle`], which may stop
//! a running `loop_packets`/`dispatch` from any thread.

use crate::cstr::{from_native, to_cstring, ErrorBuffer};
use crate::dump::Dumper;
use crate::error::{PcapError, PcapResult, Status, Warning};
use crate::ffi;
use crate::filter::BpfProgram;
use crate::list::{Datalinks, TimestampTypes, TypeList};
use crate::packet::Packet;
use crate::types::{Direction, Linktype, TimestampPrecision, TimestampType};
use parking_lot::RwLock;
use std::any::Any;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::ptr::NonNull;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Where a session's packets come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    /// A network interface (created with `create` or `open_live`)
    Live,
    /// A savefile
    Offline,
    /// No source at all; used for compiling filters and writing files
    Dead,
}

/// Capture statistics (`pcap_stats`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub received: u32,
    pub dropped: u32,
    pub if_dropped: u32,
}

/// How a push-mode loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The count was reached, the savefile ended, or a dispatch batch finished
    Completed { packets: usize },
    /// `break_loop` was called (`PCAP_ERROR_BREAK`)
    Broken { packets: usize },
}

impl LoopOutcome {
    pub fn packets(&self) -> usize {
        match *self {
            LoopOutcome::Completed { packets } | LoopOutcome::Broken { packets } => packets,
        }
    }

    pub fn is_broken(&self) -> bool {
        matches!(self, LoopOutcome::Broken { .. })
    }
}

/// Result of one pull-mode fetch
#[derive(Debug)]
pub enum NextPacket<'a> {
    Packet(Packet<'a>),
    /// The live read timeout expired with no packet
    Timeout,
    /// No more packets in the savefile
    EndOfFile,
}

/// Native handle shared with break handles
struct RawHandle(NonNull<ffi::pcap_t>);

// pcap_breakloop only sets a flag and is documented as callable from any thread
unsafe impl Send for RawHandle {}
unsafe impl Sync for RawHandle {}

type SharedHandle = Arc<RwLock<Option<RawHandle>>>;

/// An open capture handle
pub struct Session {
    handle: NonNull<ffi::pcap_t>,
    kind: SessionKind,
    shared: SharedHandle,
}

unsafe impl Send for Session {}

/// Cross-thread cancellation for a running capture loop
///
/// Holds no ownership of the session. Once the session is closed,
/// [`break_loop`](BreakHandle::break_loop) reports
/// [`PcapError::SessionClosed`] instead of touching the freed handle.
#[derive(Clone)]
pub struct BreakHandle {
    shared: SharedHandle,
}

impl BreakHandle {
    /// Ask the loop to return at the next safe point
    pub fn break_loop(&self) -> PcapResult<()> {
        let guard = self.shared.read();
        match guard.as_ref() {
            Some(raw) => {
                unsafe { ffi::pcap_breakloop(raw.0.as_ptr()) };
                Ok(())
            }
            None => Err(PcapError::SessionClosed),
        }
    }

    /// Whether the session this handle belongs to is still open
    pub fn is_open(&self) -> bool {
        self.shared.read().is_some()
    }
}

impl std::fmt::Debug for BreakHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BreakHandle")
            .field("open", &self.is_open())
            .finish()
    }
}

fn path_to_cstring(path: &Path) -> PcapResult<CString> {
    Ok(CString::new(path.as_os_str().as_bytes())?)
}

impl Session {
    fn from_raw(raw: *mut ffi::pcap_t, kind: SessionKind) -> Option<Self> {
        let handle = NonNull::new(raw)?;
        debug!("Opened {:?} capture session", kind);
        Some(Self {
            handle,
            kind,
            shared: Arc::new(RwLock::new(Some(RawHandle(handle)))),
        })
    }

    fn open_error(errbuf: &ErrorBuffer) -> PcapError {
        PcapError::Open {
            message: errbuf.message(),
        }
    }

    fn dead_error() -> PcapError {
        PcapError::Open {
            message: "pcap_open_dead failed to allocate a handle".to_string(),
        }
    }

    /// Create an inactive live handle; configure it, then [`activate`](Session::activate)
    pub fn create(source: &str) -> PcapResult<Self> {
        let c_source = to_cstring(source)?;
        let mut errbuf = ErrorBuffer::new();
        let raw = unsafe { ffi::pcap_create(c_source.as_ptr(), errbuf.as_mut_ptr()) };
        Self::from_raw(raw, SessionKind::Live).ok_or_else(|| Self::open_error(&errbuf))
    }

    /// Open and activate a live handle in one call
    pub fn open_live(
        device: &str,
        snaplen: i32,
        promiscuous: bool,
        timeout_ms: i32,
    ) -> PcapResult<Self> {
        let c_device = to_cstring(device)?;
        let mut errbuf = ErrorBuffer::new();
        let raw = unsafe {
            ffi::pcap_open_live(
                c_device.as_ptr(),
                snaplen,
                promiscuous as libc::c_int,
                timeout_ms,
                errbuf.as_mut_ptr(),
            )
        };
        let session = Self::from_raw(raw, SessionKind::Live)
            .ok_or_else(|| Self::open_error(&errbuf))?;
        // open_live reports activation warnings through the error buffer
        let message = errbuf.message();
        if !message.is_empty() {
            warn!("open_live({}): {}", device, message);
        }
        Ok(session)
    }

    pub fn open_offline(path: impl AsRef<Path>) -> PcapResult<Self> {
        let c_path = path_to_cstring(path.as_ref())?;
        let mut errbuf = ErrorBuffer::new();
        let raw = unsafe { ffi::pcap_open_offline(c_path.as_ptr(), errbuf.as_mut_ptr()) };
        Self::from_raw(raw, SessionKind::Offline).ok_or_else(|| Self::open_error(&errbuf))
    }

    /// Open a savefile, scaling timestamps to `precision`
    pub fn open_offline_with_precision(
        path: impl AsRef<Path>,
        precision: TimestampPrecision,
    ) -> PcapResult<Self> {
        let c_path = path_to_cstring(path.as_ref())?;
        let mut errbuf = ErrorBuffer::new();
        let raw = unsafe {
            ffi::pcap_open_offline_with_tstamp_precision(
                c_path.as_ptr(),
                precision.code() as libc::c_uint,
                errbuf.as_mut_ptr(),
            )
        };
        Self::from_raw(raw, SessionKind::Offline).ok_or_else(|| Self::open_error(&errbuf))
    }

    /// A handle with no packet source, for compiling filters and writing files
    pub fn open_dead(linktype: Linktype, snaplen: i32) -> PcapResult<Self> {
        let raw = unsafe { ffi::pcap_open_dead(linktype.0, snaplen) };
        Self::from_raw(raw, SessionKind::Dead).ok_or_else(Self::dead_error)
    }

    pub fn open_dead_with_precision(
        linktype: Linktype,
        snaplen: i32,
        precision: TimestampPrecision,
    ) -> PcapResult<Self> {
        let raw = unsafe {
            ffi::pcap_open_dead_with_tstamp_precision(
                linktype.0,
                snaplen,
                precision.code() as libc::c_uint,
            )
        };
        Self::from_raw(raw, SessionKind::Dead).ok_or_else(Self::dead_error)
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// A handle that can stop `loop_packets`/`dispatch` from another thread
    pub fn break_handle(&self) -> BreakHandle {
        BreakHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Release the native handle now
    pub fn close(self) {
        drop(self)
    }

    fn as_ptr(&self) -> *mut ffi::pcap_t {
        self.handle.as_ptr()
    }

    /// The session's last error message (`pcap_geterr`)
    pub fn last_error(&self) -> String {
        unsafe { from_native(ffi::pcap_geterr(self.as_ptr())) }.unwrap_or_default()
    }

    fn status_error(&self, code: i32) -> PcapError {
        let status = Status::from_code(code);
        let mut message = self.last_error();
        if message.is_empty() {
            message = status.description();
        }
        PcapError::Status { status, message }
    }

    /// Map a native return where only zero is success
    fn check(&self, code: libc::c_int) -> PcapResult<()> {
        if code == 0 {
            Ok(())
        } else {
            Err(self.status_error(code))
        }
    }

    /// Map a native return where positive values are warnings
    fn check_warning(&self, code: libc::c_int) -> PcapResult<Option<Warning>> {
        match Status::from_code(code) {
            Status::Success => Ok(None),
            Status::Warning(warning) => Ok(Some(warning)),
            _ => Err(self.status_error(code)),
        }
    }

    /// Map a native boolean query (`1`/`0`, negative on error)
    fn check_flag(&self, code: libc::c_int) -> PcapResult<bool> {
        if code < 0 {
            Err(self.status_error(code))
        } else {
            Ok(code > 0)
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Activate a handle from [`Session::create`]
    ///
    /// `Ok(Some(warning))` means the capture is running but something did
    /// not go as requested (for example promiscuous mode unsupported).
    pub fn activate(&mut self) -> PcapResult<Option<Warning>> {
        let ret = unsafe { ffi::pcap_activate(self.as_ptr()) };
        let result = self.check_warning(ret);
        match &result {
            Ok(None) => debug!("Capture session activated"),
            Ok(Some(warning)) => warn!("Capture session activated with warning: {:?}", warning),
            Err(e) => debug!("Capture session activation failed: {}", e),
        }
        result
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    pub fn set_snap_length(&mut self, snaplen: i32) -> PcapResult<()> {
        let ret = unsafe { ffi::pcap_set_snaplen(self.as_ptr(), snaplen) };
        self.check(ret)
    }

    pub fn set_promiscuous(&mut self, promiscuous: bool) -> PcapResult<()> {
        let ret = unsafe { ffi::pcap_set_promisc(self.as_ptr(), promiscuous as libc::c_int) };
        self.check(ret)
    }

    /// Restrict capture to one ethertype protocol (Linux packet sockets)
    #[cfg(target_os = "linux")]
    pub fn set_protocol(&mut self, protocol: u16) -> PcapResult<()> {
        let ret = unsafe { ffi::pcap_set_protocol_linux(self.as_ptr(), protocol as libc::c_int) };
        self.check(ret)
    }

    pub fn set_monitor_mode(&mut self, monitor: bool) -> PcapResult<()> {
        let ret = unsafe { ffi::pcap_set_rfmon(self.as_ptr(), monitor as libc::c_int) };
        self.check(ret)
    }

    pub fn can_set_monitor_mode(&mut self) -> PcapResult<bool> {
        let ret = unsafe { ffi::pcap_can_set_rfmon(self.as_ptr()) };
        self.check_flag(ret)
    }

    pub fn set_timeout(&mut self, timeout_ms: i32) -> PcapResult<()> {
        let ret = unsafe { ffi::pcap_set_timeout(self.as_ptr(), timeout_ms) };
        self.check(ret)
    }

    pub fn set_immediate_mode(&mut self, immediate: bool) -> PcapResult<()> {
        let ret =
            unsafe { ffi::pcap_set_immediate_mode(self.as_ptr(), immediate as libc::c_int) };
        self.check(ret)
    }

    pub fn set_buffer_size(&mut self, bytes: i32) -> PcapResult<()> {
        let ret = unsafe { ffi::pcap_set_buffer_size(self.as_ptr(), bytes) };
        self.check(ret)
    }

    /// libpcap may accept an unsupported type with a warning
    pub fn set_timestamp_type(&mut self, tstamp_type: TimestampType) -> PcapResult<Option<Warning>> {
        let ret = unsafe { ffi::pcap_set_tstamp_type(self.as_ptr(), tstamp_type.0) };
        self.check_warning(ret)
    }

    pub fn set_timestamp_precision(&mut self, precision: TimestampPrecision) -> PcapResult<()> {
        let ret = unsafe { ffi::pcap_set_tstamp_precision(self.as_ptr(), precision.code()) };
        self.check(ret)
    }

    pub fn set_datalink(&mut self, linktype: Linktype) -> PcapResult<()> {
        let ret = unsafe { ffi::pcap_set_datalink(self.as_ptr(), linktype.0) };
        self.check(ret)
    }

    pub fn set_direction(&mut self, direction: Direction) -> PcapResult<()> {
        let ret = unsafe { ffi::pcap_setdirection(self.as_ptr(), direction.code()) };
        self.check(ret)
    }

    pub fn set_nonblock(&mut self, nonblock: bool) -> PcapResult<()> {
        let mut errbuf = ErrorBuffer::new();
        let ret = unsafe {
            ffi::pcap_setnonblock(self.as_ptr(), nonblock as libc::c_int, errbuf.as_mut_ptr())
        };
        if ret < 0 {
            return Err(PcapError::Native {
                message: errbuf.message(),
            });
        }
        Ok(())
    }

    pub fn is_nonblock(&self) -> PcapResult<bool> {
        let mut errbuf = ErrorBuffer::new();
        let ret = unsafe { ffi::pcap_getnonblock(self.as_ptr(), errbuf.as_mut_ptr()) };
        if ret < 0 {
            return Err(PcapError::Native {
                message: errbuf.message(),
            });
        }
        Ok(ret > 0)
    }

    // =========================================================================
    // Introspection
    // =========================================================================

    pub fn datalink(&self) -> PcapResult<Linktype> {
        let ret = unsafe { ffi::pcap_datalink(self.as_ptr()) };
        if ret < 0 {
            return Err(self.status_error(ret));
        }
        Ok(Linktype(ret))
    }

    pub fn snapshot_length(&self) -> PcapResult<i32> {
        let ret = unsafe { ffi::pcap_snapshot(self.as_ptr()) };
        if ret < 0 {
            return Err(self.status_error(ret));
        }
        Ok(ret)
    }

    /// Whether the savefile uses the opposite byte order to this host
    pub fn is_swapped(&self) -> PcapResult<bool> {
        let ret = unsafe { ffi::pcap_is_swapped(self.as_ptr()) };
        self.check_flag(ret)
    }

    /// Savefile format major version
    pub fn major_version(&self) -> i32 {
        unsafe { ffi::pcap_major_version(self.as_ptr()) }
    }

    pub fn minor_version(&self) -> i32 {
        unsafe { ffi::pcap_minor_version(self.as_ptr()) }
    }

    /// Descriptor of the savefile being read, `None` for live and dead sessions
    pub fn file_descriptor(&self) -> Option<RawFd> {
        let file = unsafe { ffi::pcap_file(self.as_ptr()) };
        if file.is_null() {
            None
        } else {
            Some(unsafe { libc::fileno(file) })
        }
    }

    /// Descriptor to wait on with `poll`/`select`, `None` when there is none
    pub fn selectable_fd(&self) -> Option<RawFd> {
        let fd = unsafe { ffi::pcap_get_selectable_fd(self.as_ptr()) };
        if fd < 0 {
            None
        } else {
            Some(fd)
        }
    }

    pub fn timestamp_precision(&self) -> TimestampPrecision {
        let code = unsafe { ffi::pcap_get_tstamp_precision(self.as_ptr()) };
        TimestampPrecision::from_code(code).unwrap_or_default()
    }

    pub fn list_timestamp_types(&self) -> PcapResult<TypeList<TimestampTypes>> {
        let mut list: *mut libc::c_int = std::ptr::null_mut();
        let ret = unsafe { ffi::pcap_list_tstamp_types(self.as_ptr(), &mut list) };
        if ret < 0 {
            return Err(self.status_error(ret));
        }
        Ok(unsafe { TypeList::from_raw(list, ret as usize) })
    }

    pub fn list_datalinks(&self) -> PcapResult<TypeList<Datalinks>> {
        let mut list: *mut libc::c_int = std::ptr::null_mut();
        let ret = unsafe { ffi::pcap_list_datalinks(self.as_ptr(), &mut list) };
        if ret < 0 {
            return Err(self.status_error(ret));
        }
        Ok(unsafe { TypeList::from_raw(list, ret as usize) })
    }

    pub fn stats(&self) -> PcapResult<Stats> {
        let mut raw = ffi::pcap_stat::default();
        let ret = unsafe { ffi::pcap_stats(self.as_ptr(), &mut raw) };
        self.check(ret)?;
        Ok(Stats {
            received: raw.ps_recv,
            dropped: raw.ps_drop,
            if_dropped: raw.ps_ifdrop,
        })
    }

    // =========================================================================
    // Packet acquisition
    // =========================================================================

    /// Process packets until `count` are handled (`count <= 0` means no
    /// limit), the savefile ends, an error occurs or the loop is broken.
    ///
    /// `callback` runs synchronously on this thread for every packet and
    /// should return quickly. A panic in the callback stops the loop and is
    /// resumed once control is back on the Rust side.
    pub fn loop_packets<F>(&mut self, count: i32, callback: F) -> PcapResult<LoopOutcome>
    where
        F: FnMut(Packet<'_>),
    {
        self.run_loop(count, callback, ffi::pcap_loop)
    }

    /// Process at most one buffer's worth of packets (`count <= 0`: all of it)
    pub fn dispatch<F>(&mut self, count: i32, callback: F) -> PcapResult<LoopOutcome>
    where
        F: FnMut(Packet<'_>),
    {
        self.run_loop(count, callback, ffi::pcap_dispatch)
    }

    fn run_loop<F>(
        &mut self,
        count: i32,
        callback: F,
        driver: unsafe extern "C" fn(
            *mut ffi::pcap_t,
            libc::c_int,
            ffi::pcap_handler,
            *mut u8,
        ) -> libc::c_int,
    ) -> PcapResult<LoopOutcome>
    where
        F: FnMut(Packet<'_>),
    {
        let mut state = LoopState {
            callback,
            handle: self.as_ptr(),
            delivered: 0,
            panic: None,
        };
        let ret = unsafe {
            driver(
                self.as_ptr(),
                count,
                trampoline::<F>,
                &mut state as *mut LoopState<F> as *mut u8,
            )
        };
        if let Some(payload) = state.panic.take() {
            panic::resume_unwind(payload);
        }
        trace!("Capture loop returned {} after {} packets", ret, state.delivered);

        match ret {
            -2 => Ok(LoopOutcome::Broken {
                packets: state.delivered,
            }),
            ret if ret < 0 => Err(self.status_error(ret)),
            _ => Ok(LoopOutcome::Completed {
                packets: state.delivered,
            }),
        }
    }

    /// Arm the break flag so the next `loop_packets`/`dispatch` call returns
    /// [`LoopOutcome::Broken`] before delivering anything
    ///
    /// A running loop holds `&mut self`; stop it through a [`BreakHandle`].
    pub fn break_loop(&self) {
        unsafe { ffi::pcap_breakloop(self.as_ptr()) }
    }

    /// Fetch one packet
    ///
    /// The returned view borrows the session, so it cannot be held across
    /// the next fetch, when libpcap may reuse the buffer.
    pub fn next_packet(&mut self) -> PcapResult<NextPacket<'_>> {
        let mut header: *mut ffi::pcap_pkthdr = std::ptr::null_mut();
        let mut data: *const u8 = std::ptr::null();
        let ret = unsafe { ffi::pcap_next_ex(self.as_ptr(), &mut header, &mut data) };
        match ret {
            1 => Ok(NextPacket::Packet(unsafe { Packet::from_raw(header, data) })),
            0 => Ok(NextPacket::Timeout),
            -2 => Ok(NextPacket::EndOfFile),
            ret => Err(self.status_error(ret)),
        }
    }

    // =========================================================================
    // Transmission
    // =========================================================================

    /// Send a raw frame, returning the number of bytes written
    pub fn inject(&mut self, frame: &[u8]) -> PcapResult<usize> {
        let ret = unsafe {
            ffi::pcap_inject(
                self.as_ptr(),
                frame.as_ptr() as *const libc::c_void,
                frame.len(),
            )
        };
        if ret < 0 {
            return Err(self.status_error(ret));
        }
        Ok(ret as usize)
    }

    pub fn send_packet(&mut self, frame: &[u8]) -> PcapResult<()> {
        let len = libc::c_int::try_from(frame.len()).map_err(|_| PcapError::Status {
            status: Status::Generic,
            message: format!("frame of {} bytes is too large to send", frame.len()),
        })?;
        let ret = unsafe { ffi::pcap_sendpacket(self.as_ptr(), frame.as_ptr(), len) };
        self.check(ret)
    }

    // =========================================================================
    // Filtering
    // =========================================================================

    /// Compile `expression` into a caller-provided program
    ///
    /// Any instructions already in `program` are released first. On failure
    /// the program is left empty.
    pub fn compile_into(
        &mut self,
        program: &mut BpfProgram,
        expression: &str,
        optimize: bool,
        netmask: u32,
    ) -> PcapResult<()> {
        let c_expression = to_cstring(expression)?;
        program.reset();
        let ret = unsafe {
            ffi::pcap_compile(
                self.as_ptr(),
                program.as_mut_raw(),
                c_expression.as_ptr(),
                optimize as libc::c_int,
                netmask,
            )
        };
        if ret < 0 {
            program.reset();
            return Err(self.status_error(ret));
        }
        debug!("Compiled filter {:?} ({} instructions)", expression, program.len());
        Ok(())
    }

    pub fn compile(
        &mut self,
        expression: &str,
        optimize: bool,
        netmask: u32,
    ) -> PcapResult<BpfProgram> {
        let mut program = BpfProgram::new();
        self.compile_into(&mut program, expression, optimize, netmask)?;
        Ok(program)
    }

    /// Attach a filter; libpcap keeps its own copy of the program
    pub fn set_filter(&mut self, program: &BpfProgram) -> PcapResult<()> {
        // pcap_setfilter only reads the program despite the mutable pointer
        let ret = unsafe { ffi::pcap_setfilter(self.as_ptr(), program.as_raw() as *mut _) };
        self.check(ret)
    }

    // =========================================================================
    // Capture files
    // =========================================================================

    /// Create (or truncate) a savefile using this session's link type
    pub fn dump_open(&self, path: impl AsRef<Path>) -> PcapResult<Dumper> {
        let c_path = path_to_cstring(path.as_ref())?;
        let raw = unsafe { ffi::pcap_dump_open(self.as_ptr(), c_path.as_ptr()) };
        self.dumper_from_raw(raw, path.as_ref())
    }

    /// Append to an existing savefile with a matching link type
    pub fn dump_open_append(&self, path: impl AsRef<Path>) -> PcapResult<Dumper> {
        let c_path = path_to_cstring(path.as_ref())?;
        let raw = unsafe { ffi::pcap_dump_open_append(self.as_ptr(), c_path.as_ptr()) };
        self.dumper_from_raw(raw, path.as_ref())
    }

    fn dumper_from_raw(&self, raw: *mut ffi::pcap_dumper_t, path: &Path) -> PcapResult<Dumper> {
        match NonNull::new(raw) {
            Some(raw) => {
                debug!("Writing capture file {}", path.display());
                Ok(Dumper::from_raw(raw))
            }
            None => Err(PcapError::Open {
                message: self.last_error(),
            }),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Break handles must see the slot empty before the handle is freed
        self.shared.write().take();
        unsafe { ffi::pcap_close(self.handle.as_ptr()) };
        debug!("Closed {:?} capture session", self.kind);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("kind", &self.kind).finish()
    }
}

struct LoopState<F> {
    callback: F,
    handle: *mut ffi::pcap_t,
    delivered: usize,
    panic: Option<Box<dyn Any + Send + 'static>>,
}

/// Native entry point for packet delivery; `user` is the loop's `LoopState<F>`
unsafe extern "C" fn trampoline<F>(user: *mut u8, header: *const ffi::pcap_pkthdr, bytes: *const u8)
where
    F: FnMut(Packet<'_>),
{
    let state = &mut *(user as *mut LoopState<F>);
    if state.panic.is_some() {
        return;
    }
    let packet = Packet::from_raw(header, bytes);
    let callback = &mut state.callback;
    match panic::catch_unwind(AssertUnwindSafe(|| callback(packet))) {
        Ok(()) => state.delivered += 1,
        Err(payload) => {
            state.panic = Some(payload);
            ffi::pcap_breakloop(state.handle);
        }
    }
}
