use thiserror::Error;

/// Every error this driver can surface.
///
/// `E` is the underlying block device's own error type, so a caller's I/O
/// failures propagate without this crate having to know anything about them.
#[derive(Debug, Error)]
pub enum Error<E> {
    /// A structural violation of the on-disk format, or a version the driver
    /// does not support. Not recoverable: the volume is not mountable, or the
    /// operation that hit it is aborted.
    #[error("{0}")]
    BadFS(&'static str),

    /// A semantic mismatch between what the caller asked for and what the
    /// node actually is (listing a file, opening a directory).
    #[error("{0}")]
    BadFileType(&'static str),

    /// A pointer, length, or loop bound computed from on-disk data would run
    /// outside the buffer or device it indexes into.
    #[error("value out of range")]
    OutOfRange,

    /// Propagated from the underlying block device.
    #[error("device I/O error")]
    Io(E),
}

impl<E> From<esfs_bytes::OutOfBounds> for Error<E> {
    fn from(_: esfs_bytes::OutOfBounds) -> Self {
        Error::OutOfRange
    }
}

impl<E> Error<E> {
    /// Rewrites an `OutOfRange` into the uniform "not us" signal mount uses
    /// when probing the wrong partition, per the driver's error-handling
    /// contract. Every other variant passes through unchanged.
    pub(crate) fn into_mount_error(self) -> Self {
        match self {
            Error::OutOfRange => Error::BadFS("not an esfs filesystem"),
            other => other,
        }
    }
}
