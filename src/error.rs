//! Common error definitions.

use crate::{capture::CaptureError, config::ConfigError};

macro_rules! impl_from_error {
    ($error:ident) => {
        impl From<$error> for Error {
            fn from(error: $error) -> Self {
                Self::$error(error)
            }
        }
    };
}

/// Alias for Result<T, Error>.
pub type Result<T> = core::result::Result<T, Error>;

/// Collection of all errors that can occur.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A block contained no samples, so it has no mean.
    EmptyInput,
    /// Occurs when an expected change of a register does happen in time.
    ///
    /// This is returned when a bounded loop exceeds its alotted iteration count.
    RegisterUnchanged,
    /// The capture source failed to deliver a block.
    CaptureError(CaptureError),
    /// Invalid receive or peripheral settings.
    ConfigError(ConfigError),
    /// The output sink rejected a write.
    SinkError(embedded_io::ErrorKind),
}

impl_from_error!(CaptureError);
impl_from_error!(ConfigError);

impl<E: embedded_io::Error> From<embedded_io::WriteFmtError<E>> for Error {
    fn from(error: embedded_io::WriteFmtError<E>) -> Self {
        match error {
            embedded_io::WriteFmtError::Other(e) => Self::SinkError(e.kind()),
            _ => Self::SinkError(embedded_io::ErrorKind::Other),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "block contains no samples"),
            Self::RegisterUnchanged => write!(f, "register did not change in time"),
            Self::CaptureError(e) => write!(f, "capture failed: {:?}", e),
            Self::ConfigError(e) => write!(f, "invalid configuration: {:?}", e),
            Self::SinkError(k) => write!(f, "sink write failed: {:?}", k),
        }
    }
}

mod embedded_io_impl {
    use embedded_io::{Error as IoError, ErrorKind as IoErrorKind};

    use super::{CaptureError, Error};

    impl IoError for Error {
        fn kind(&self) -> IoErrorKind {
            match self {
                Error::RegisterUnchanged => IoErrorKind::TimedOut,
                Error::CaptureError(c) => match c {
                    CaptureError::Timeout => IoErrorKind::TimedOut,
                    CaptureError::Overrun => IoErrorKind::OutOfMemory,
                    CaptureError::ClockAbsent => IoErrorKind::NotConnected,
                },
                Error::EmptyInput => IoErrorKind::InvalidData,
                Error::ConfigError(_) => IoErrorKind::InvalidInput,
                Error::SinkError(k) => *k,
            }
        }
    }
}
