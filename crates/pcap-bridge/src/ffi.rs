//! Raw libpcap declarations
//!
//! Every `extern "C"` symbol the binding calls is declared here, together with
//! `#[repr(C)]` mirrors of the structures libpcap hands across the boundary.
//! These layouts must match `<pcap/pcap.h>` and `<pcap/bpf.h>` exactly.
//! Nothing outside this crate sees these types; the safe wrappers live in the
//! sibling modules.

#![allow(non_camel_case_types)]

use libc::{c_char, c_int, c_long, c_uint, c_void, size_t, sockaddr, timeval, FILE};

/// Size of the caller-provided error buffer (`PCAP_ERRBUF_SIZE`)
pub const PCAP_ERRBUF_SIZE: usize = 256;

/// `pcap_init` option selecting UTF-8 strings (`PCAP_CHAR_ENC_UTF_8`)
pub const PCAP_CHAR_ENC_UTF_8: c_uint = 1;

/// Opaque capture handle
#[repr(C)]
pub struct pcap_t {
    _private: [u8; 0],
}

/// Opaque savefile writer
#[repr(C)]
pub struct pcap_dumper_t {
    _private: [u8; 0],
}

/// Per-packet header (`struct pcap_pkthdr`)
#[repr(C)]
#[derive(Clone, Copy)]
pub struct pcap_pkthdr {
    pub ts: timeval,
    pub caplen: u32,
    pub len: u32,
    /// Apple's libpcap appends a comment buffer to the header
    #[cfg(target_os = "macos")]
    pub comment: [c_char; 256],
}

/// One BPF instruction (`struct bpf_insn`)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct bpf_insn {
    pub code: u16,
    pub jt: u8,
    pub jf: u8,
    pub k: u32,
}

/// Compiled filter program (`struct bpf_program`)
#[repr(C)]
pub struct bpf_program {
    pub bf_len: c_uint,
    pub bf_insns: *mut bpf_insn,
}

/// Interface address entry (`struct pcap_addr`)
#[repr(C)]
pub struct pcap_addr_t {
    pub next: *mut pcap_addr_t,
    pub addr: *mut sockaddr,
    pub netmask: *mut sockaddr,
    pub broadaddr: *mut sockaddr,
    pub dstaddr: *mut sockaddr,
}

/// Interface list entry (`struct pcap_if`)
#[repr(C)]
pub struct pcap_if_t {
    pub next: *mut pcap_if_t,
    pub name: *mut c_char,
    pub description: *mut c_char,
    pub addresses: *mut pcap_addr_t,
    pub flags: u32,
}

/// Capture statistics (`struct pcap_stat`)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct pcap_stat {
    pub ps_recv: c_uint,
    pub ps_drop: c_uint,
    pub ps_ifdrop: c_uint,
}

/// Packet delivery callback (`pcap_handler`)
pub type pcap_handler =
    unsafe extern "C" fn(user: *mut u8, header: *const pcap_pkthdr, bytes: *const u8);

extern "C" {
    pub fn pcap_init(opts: c_uint, errbuf: *mut c_char) -> c_int;
    pub fn pcap_lib_version() -> *const c_char;

    pub fn pcap_lookupnet(
        device: *const c_char,
        netp: *mut u32,
        maskp: *mut u32,
        errbuf: *mut c_char,
    ) -> c_int;
    pub fn pcap_findalldevs(alldevsp: *mut *mut pcap_if_t, errbuf: *mut c_char) -> c_int;
    pub fn pcap_freealldevs(alldevs: *mut pcap_if_t);

    pub fn pcap_create(source: *const c_char, errbuf: *mut c_char) -> *mut pcap_t;
    pub fn pcap_open_live(
        device: *const c_char,
        snaplen: c_int,
        promisc: c_int,
        to_ms: c_int,
        errbuf: *mut c_char,
    ) -> *mut pcap_t;
    pub fn pcap_open_offline(fname: *const c_char, errbuf: *mut c_char) -> *mut pcap_t;
    pub fn pcap_open_offline_with_tstamp_precision(
        fname: *const c_char,
        precision: c_uint,
        errbuf: *mut c_char,
    ) -> *mut pcap_t;
    pub fn pcap_open_dead(linktype: c_int, snaplen: c_int) -> *mut pcap_t;
    pub fn pcap_open_dead_with_tstamp_precision(
        linktype: c_int,
        snaplen: c_int,
        precision: c_uint,
    ) -> *mut pcap_t;
    pub fn pcap_activate(p: *mut pcap_t) -> c_int;
    pub fn pcap_close(p: *mut pcap_t);
    pub fn pcap_geterr(p: *mut pcap_t) -> *mut c_char;

    pub fn pcap_set_snaplen(p: *mut pcap_t, snaplen: c_int) -> c_int;
    pub fn pcap_set_promisc(p: *mut pcap_t, promisc: c_int) -> c_int;
    #[cfg(target_os = "linux")]
    pub fn pcap_set_protocol_linux(p: *mut pcap_t, protocol: c_int) -> c_int;
    pub fn pcap_set_rfmon(p: *mut pcap_t, rfmon: c_int) -> c_int;
    pub fn pcap_can_set_rfmon(p: *mut pcap_t) -> c_int;
    pub fn pcap_set_timeout(p: *mut pcap_t, to_ms: c_int) -> c_int;
    pub fn pcap_set_immediate_mode(p: *mut pcap_t, immediate: c_int) -> c_int;
    pub fn pcap_set_buffer_size(p: *mut pcap_t, buffer_size: c_int) -> c_int;
    pub fn pcap_set_tstamp_type(p: *mut pcap_t, tstamp_type: c_int) -> c_int;
    pub fn pcap_set_tstamp_precision(p: *mut pcap_t, precision: c_int) -> c_int;
    pub fn pcap_get_tstamp_precision(p: *mut pcap_t) -> c_int;
    pub fn pcap_set_datalink(p: *mut pcap_t, dlt: c_int) -> c_int;
    pub fn pcap_setdirection(p: *mut pcap_t, direction: c_int) -> c_int;
    pub fn pcap_getnonblock(p: *mut pcap_t, errbuf: *mut c_char) -> c_int;
    pub fn pcap_setnonblock(p: *mut pcap_t, nonblock: c_int, errbuf: *mut c_char) -> c_int;

    pub fn pcap_datalink(p: *mut pcap_t) -> c_int;
    pub fn pcap_snapshot(p: *mut pcap_t) -> c_int;
    pub fn pcap_is_swapped(p: *mut pcap_t) -> c_int;
    pub fn pcap_major_version(p: *mut pcap_t) -> c_int;
    pub fn pcap_minor_version(p: *mut pcap_t) -> c_int;
    pub fn pcap_file(p: *mut pcap_t) -> *mut FILE;
    pub fn pcap_get_selectable_fd(p: *mut pcap_t) -> c_int;
    pub fn pcap_stats(p: *mut pcap_t, ps: *mut pcap_stat) -> c_int;

    pub fn pcap_list_tstamp_types(p: *mut pcap_t, tstamp_typesp: *mut *mut c_int) -> c_int;
    pub fn pcap_free_tstamp_types(tstamp_types: *mut c_int);
    pub fn pcap_list_datalinks(p: *mut pcap_t, dlt_buf: *mut *mut c_int) -> c_int;
    pub fn pcap_free_datalinks(dlt_list: *mut c_int);

    pub fn pcap_loop(p: *mut pcap_t, cnt: c_int, callback: pcap_handler, user: *mut u8) -> c_int;
    pub fn pcap_dispatch(
        p: *mut pcap_t,
        cnt: c_int,
        callback: pcap_handler,
        user: *mut u8,
    ) -> c_int;
    pub fn pcap_next_ex(
        p: *mut pcap_t,
        pkt_header: *mut *mut pcap_pkthdr,
        pkt_data: *mut *const u8,
    ) -> c_int;
    pub fn pcap_breakloop(p: *mut pcap_t);

    pub fn pcap_inject(p: *mut pcap_t, buf: *const c_void, size: size_t) -> c_int;
    pub fn pcap_sendpacket(p: *mut pcap_t, buf: *const u8, size: c_int) -> c_int;

    pub fn pcap_compile(
        p: *mut pcap_t,
        fp: *mut bpf_program,
        expression: *const c_char,
        optimize: c_int,
        netmask: u32,
    ) -> c_int;
    pub fn pcap_setfilter(p: *mut pcap_t, fp: *mut bpf_program) -> c_int;
    pub fn pcap_freecode(fp: *mut bpf_program);
    pub fn pcap_offline_filter(
        fp: *const bpf_program,
        header: *const pcap_pkthdr,
        pkt: *const u8,
    ) -> c_int;

    pub fn pcap_dump_open(p: *mut pcap_t, fname: *const c_char) -> *mut pcap_dumper_t;
    pub fn pcap_dump_open_append(p: *mut pcap_t, fname: *const c_char) -> *mut pcap_dumper_t;
    pub fn pcap_dump(user: *mut u8, header: *const pcap_pkthdr, bytes: *const u8);
    pub fn pcap_dump_flush(p: *mut pcap_dumper_t) -> c_int;
    pub fn pcap_dump_ftell(p: *mut pcap_dumper_t) -> c_long;
    pub fn pcap_dump_close(p: *mut pcap_dumper_t);

    pub fn pcap_datalink_name_to_val(name: *const c_char) -> c_int;
    pub fn pcap_datalink_val_to_name(dlt: c_int) -> *const c_char;
    pub fn pcap_datalink_val_to_description(dlt: c_int) -> *const c_char;
    pub fn pcap_datalink_val_to_description_or_dlt(dlt: c_int) -> *const c_char;
    pub fn pcap_tstamp_type_name_to_val(name: *const c_char) -> c_int;
    pub fn pcap_tstamp_type_val_to_name(tstamp_type: c_int) -> *const c_char;
    pub fn pcap_tstamp_type_val_to_description(tstamp_type: c_int) -> *const c_char;

    pub fn pcap_statustostr(error: c_int) -> *const c_char;
    pub fn pcap_strerror(error: c_int) -> *const c_char;
}
