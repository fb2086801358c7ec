//! Native-allocated code arrays
//!
//! `pcap_list_tstamp_types` and `pcap_list_datalinks` return a malloc'd array
//! plus a length, each with its own free function. [`TypeList`] owns both
//! halves and releases the array exactly once.

use crate::ffi;
use crate::types::{Linktype, TimestampType};
use libc::c_int;
use std::fmt;
use std::marker::PhantomData;

/// Which native list a [`TypeList`] holds
pub trait ListKind {
    type Item: Copy;

    fn item(code: i32) -> Self::Item;

    /// # Safety
    /// `list` must come from the matching `pcap_list_*` call and not have
    /// been freed.
    unsafe fn release(list: *mut c_int);
}

/// Supported timestamp types of a session
pub struct TimestampTypes;

/// Supported datalink types of a session
pub struct Datalinks;

impl ListKind for TimestampTypes {
    type Item = TimestampType;

    fn item(code: i32) -> TimestampType {
        TimestampType(code)
    }

    unsafe fn release(list: *mut c_int) {
        ffi::pcap_free_tstamp_types(list)
    }
}

impl ListKind for Datalinks {
    type Item = Linktype;

    fn item(code: i32) -> Linktype {
        Linktype(code)
    }

    unsafe fn release(list: *mut c_int) {
        ffi::pcap_free_datalinks(list)
    }
}

/// An owned native code array
pub struct TypeList<K: ListKind> {
    ptr: *mut c_int,
    len: usize,
    _kind: PhantomData<K>,
}

// The array is plain heap memory with no ties to the session thread
unsafe impl<K: ListKind> Send for TypeList<K> {}

impl<K: ListKind> TypeList<K> {
    /// # Safety
    /// `ptr` must be null or the array produced by the `K` list call, holding
    /// at least `len` entries.
    pub(crate) unsafe fn from_raw(ptr: *mut c_int, len: usize) -> Self {
        Self {
            ptr,
            len: if ptr.is_null() { 0 } else { len },
            _kind: PhantomData,
        }
    }

    fn codes(&self) -> &[c_int] {
        if self.ptr.is_null() {
            &[]
        } else {
            unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<K::Item> {
        self.codes().get(index).map(|&code| K::item(code))
    }

    pub fn iter(&self) -> impl Iterator<Item = K::Item> + '_ {
        self.codes().iter().map(|&code| K::item(code))
    }

    pub fn contains(&self, item: K::Item) -> bool
    where
        K::Item: PartialEq,
    {
        self.iter().any(|candidate| candidate == item)
    }

    pub fn to_vec(&self) -> Vec<K::Item> {
        self.iter().collect()
    }

    /// Release the native array now
    pub fn free(self) {
        drop(self)
    }
}

impl<K: ListKind> Drop for TypeList<K> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { K::release(self.ptr) };
            self.ptr = std::ptr::null_mut();
        }
    }
}

impl<K: ListKind> fmt::Debug for TypeList<K>
where
    K::Item: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}
