//! Status codes and error types
//!
//! libpcap reports outcomes as integers: zero is success, negative values are
//! errors and positive values are warnings. [`Status`] gives each code a
//! name, [`PcapError`] is what every fallible binding call returns.

use std::ffi::NulError;
use std::fmt;
use thiserror::Error;

/// Warning codes (positive native status values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Warning {
    /// `PCAP_WARNING`
    Generic,
    /// `PCAP_WARNING_PROMISC_NOTSUP`
    PromiscNotSupported,
    /// `PCAP_WARNING_TSTAMP_TYPE_NOTSUP`
    TimestampTypeNotSupported,
    /// A warning code this binding does not know about
    Unknown(i32),
}

impl Warning {
    /// Native code for this warning
    pub fn code(self) -> i32 {
        match self {
            Warning::Generic => 1,
            Warning::PromiscNotSupported => 2,
            Warning::TimestampTypeNotSupported => 3,
            Warning::Unknown(code) => code,
        }
    }

    fn from_code(code: i32) -> Self {
        match code {
            1 => Warning::Generic,
            2 => Warning::PromiscNotSupported,
            3 => Warning::TimestampTypeNotSupported,
            other => Warning::Unknown(other),
        }
    }
}

/// A native status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Success,
    /// `PCAP_ERROR`
    Generic,
    /// `PCAP_ERROR_BREAK`
    Break,
    /// `PCAP_ERROR_NOT_ACTIVATED`
    NotActivated,
    /// `PCAP_ERROR_ACTIVATED`
    Activated,
    /// `PCAP_ERROR_NO_SUCH_DEVICE`
    NoSuchDevice,
    /// `PCAP_ERROR_RFMON_NOTSUP`
    MonitorModeNotSupported,
    /// `PCAP_ERROR_NOT_RFMON`
    NotMonitorMode,
    /// `PCAP_ERROR_PERM_DENIED`
    PermissionDenied,
    /// `PCAP_ERROR_IFACE_NOT_UP`
    InterfaceNotUp,
    /// `PCAP_ERROR_CANTSET_TSTAMP_TYPE`
    CantSetTimestampType,
    /// `PCAP_ERROR_PROMISC_PERM_DENIED`
    PromiscPermissionDenied,
    /// `PCAP_ERROR_TSTAMP_PRECISION_NOTSUP`
    TimestampPrecisionNotSupported,
    /// `PCAP_ERROR_CAPTURE_NOTSUP`
    CaptureNotSupported,
    Warning(Warning),
    /// A negative code this binding does not know about
    Unknown(i32),
}

impl Status {
    /// Classify a raw native code
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Status::Success,
            -1 => Status::Generic,
            -2 => Status::Break,
            -3 => Status::NotActivated,
            -4 => Status::Activated,
            -5 => Status::NoSuchDevice,
            -6 => Status::MonitorModeNotSupported,
            -7 => Status::NotMonitorMode,
            -8 => Status::PermissionDenied,
            -9 => Status::InterfaceNotUp,
            -10 => Status::CantSetTimestampType,
            -11 => Status::PromiscPermissionDenied,
            -12 => Status::TimestampPrecisionNotSupported,
            -13 => Status::CaptureNotSupported,
            code if code > 0 => Status::Warning(Warning::from_code(code)),
            code => Status::Unknown(code),
        }
    }

    /// The native code this status was built from
    pub fn code(self) -> i32 {
        match self {
            Status::Success => 0,
            Status::Generic => -1,
            Status::Break => -2,
            Status::NotActivated => -3,
            Status::Activated => -4,
            Status::NoSuchDevice => -5,
            Status::MonitorModeNotSupported => -6,
            Status::NotMonitorMode => -7,
            Status::PermissionDenied => -8,
            Status::InterfaceNotUp => -9,
            Status::CantSetTimestampType => -10,
            Status::PromiscPermissionDenied => -11,
            Status::TimestampPrecisionNotSupported => -12,
            Status::CaptureNotSupported => -13,
            Status::Warning(warning) => warning.code(),
            Status::Unknown(code) => code,
        }
    }

    pub fn is_error(self) -> bool {
        self.code() < 0
    }

    pub fn is_warning(self) -> bool {
        matches!(self, Status::Warning(_))
    }

    /// Native description of this status (`pcap_statustostr`)
    pub fn description(self) -> String {
        crate::status_to_string(self.code())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

/// Binding error type
#[derive(Error, Debug)]
pub enum PcapError {
    #[error("{status}: {message}")]
    Status { status: Status, message: String },

    #[error("Failed to open capture: {message}")]
    Open { message: String },

    #[error("libpcap error: {message}")]
    Native { message: String },

    #[error("String contains an interior NUL byte: {0}")]
    InvalidString(#[from] NulError),

    #[error("Capture session is already closed")]
    SessionClosed,

    #[error("Unknown name: {0}")]
    UnknownName(String),

    #[error("Packet buffer holds {actual} bytes but the header claims {needed}")]
    BufferTooShort { needed: usize, actual: usize },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PcapError {
    /// The native status behind this error, if there is one
    pub fn status(&self) -> Option<Status> {
        match self {
            PcapError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type PcapResult<T> = Result<T, PcapError>;
