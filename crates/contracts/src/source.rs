//! ByteSource trait - gyro byte stream abstraction
//!
//! Decouples the frame engine from where bytes come from: a device node,
//! a capture file, stdin or a synthetic generator.

use crate::ContractError;

/// Blocking, ordered supply of bytes
///
/// Implementations block until a byte is available. End of stream and read
/// failures are terminal for the caller.
///
/// # Example
///
/// ```ignore
/// let mut source: Box<dyn ByteSource> = open_source(&config)?;
/// loop {
///     let byte = source.next_byte()?;
///     // ...
/// }
/// ```
pub trait ByteSource: Send {
    /// Source name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Read the next byte
    ///
    /// # Errors
    /// [`ContractError::StreamClosed`] at end of stream,
    /// [`ContractError::StreamRead`] on read failure.
    fn next_byte(&mut self) -> Result<u8, ContractError>;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn next_byte(&mut self) -> Result<u8, ContractError> {
        (**self).next_byte()
    }
}
