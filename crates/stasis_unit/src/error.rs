//! Error types for unit decoding and encoding.

/// Errors produced by the unit codec.
///
/// Variants up to [`UnitError::TrailingBytes`] are decode failures: the input
/// bytes cannot be turned into a unit. The remaining variants are encode
/// failures: the in-memory unit cannot be written as a valid unit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    /// The input ended before a field could be read.
    #[error("truncated unit: needed {needed} bytes at offset {offset}")]
    Truncated {
        /// Byte offset where the read started.
        offset: usize,
        /// Number of bytes the read required.
        needed: usize,
    },

    /// The input does not start with the unit magic.
    #[error("not a compiled unit: bad magic {found:02x?}")]
    BadMagic {
        /// The four bytes found instead.
        found: [u8; 4],
    },

    /// The format version is not one this codec understands.
    #[error("unsupported unit format version {found}")]
    UnsupportedVersion {
        /// The version found in the header.
        found: u16,
    },

    /// A name or call target is not valid UTF-8.
    #[error("invalid UTF-8 string at offset {offset}")]
    InvalidUtf8 {
        /// Byte offset of the string payload.
        offset: usize,
    },

    /// The stored trailer checksum does not match the content.
    #[error("unit checksum mismatch: stored {stored}, computed {computed}")]
    ChecksumMismatch {
        /// Checksum found in the trailer.
        stored: String,
        /// Checksum computed over the content.
        computed: String,
    },

    /// Extra bytes follow the last method.
    #[error("{count} trailing bytes after last method")]
    TrailingBytes {
        /// Number of unexpected bytes.
        count: usize,
    },

    /// A string is longer than the 16-bit length prefix allows.
    #[error("{what} is {len} bytes, longer than the format allows")]
    StringTooLong {
        /// What the string is (unit name, method name, call target).
        what: &'static str,
        /// Its length in bytes.
        len: usize,
    },

    /// An opaque instruction carries more than 255 operand bytes.
    #[error("opaque instruction in `{method}` has {len} operand bytes (max 255)")]
    OperandsTooLong {
        /// The method containing the instruction.
        method: String,
        /// Number of operand bytes.
        len: usize,
    },

    /// An opaque instruction uses an opcode reserved for return or call.
    #[error("opaque instruction in `{method}` uses reserved opcode 0x{opcode:02x}")]
    ReservedOpcode {
        /// The method containing the instruction.
        method: String,
        /// The offending opcode.
        opcode: u8,
    },

    /// A call instruction has an empty target.
    #[error("call in `{method}` has an empty target")]
    EmptyCallTarget {
        /// The method containing the call.
        method: String,
    },

    /// The unit has more methods than the format can count.
    #[error("unit has {count} methods, more than the format allows")]
    TooManyMethods {
        /// Number of methods.
        count: usize,
    },

    /// A method body is larger than the 32-bit code length allows.
    #[error("method `{method}` code is {len} bytes, more than the format allows")]
    CodeTooLarge {
        /// The method name.
        method: String,
        /// Encoded code length.
        len: usize,
    },
}

impl UnitError {
    /// Returns `true` if this error was raised while decoding.
    pub fn is_decode(&self) -> bool {
        matches!(
            self,
            UnitError::Truncated { .. }
                | UnitError::BadMagic { .. }
                | UnitError::UnsupportedVersion { .. }
                | UnitError::InvalidUtf8 { .. }
                | UnitError::ChecksumMismatch { .. }
                | UnitError::TrailingBytes { .. }
        )
    }
}
