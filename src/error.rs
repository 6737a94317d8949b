use thiserror::Error;

/// Why a pickle stream could not be decoded.
///
/// Every variant is fatal for the call: the decoder stops at the first
/// violation and returns no partial result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ended in the middle of an opcode or its argument
    #[error("unexpected end of pickle stream at offset {offset}")]
    UnexpectedEof { offset: usize },

    /// Unknown or unsupported pickle opcode
    #[error("invalid or unknown opcode {} at offset {offset}", describe_byte(.opcode))]
    InvalidOpcode { opcode: u8, offset: usize },

    /// PROTO announced a protocol newer than 2
    #[error("unsupported pickle protocol {0}")]
    UnsupportedProtocol(u8),

    /// A text number, quoted string, escape sequence or length failed to parse
    #[error("malformed {opcode} argument: {reason}")]
    MalformedLiteral { opcode: &'static str, reason: String },

    /// Pop or peek on an empty stack (or below the current mark)
    #[error("pickle stack underflow")]
    EmptyStackPop,

    /// A mark-consuming opcode ran with no mark set
    #[error("pickle mark stack underflow: no MARK to pop")]
    EmptyMarkStackPop,

    /// GET of a memo index that was never stored
    #[error("memo key {0} is not defined")]
    UndefinedMemoKey(usize),

    /// STOP reached with a stack depth other than one
    #[error("pickle stream ended with {depth} values on the stack, expected exactly 1")]
    MalformedStreamEnd { depth: usize },

    /// Container opcode applied to the wrong kind of value
    #[error("{opcode} expects a {expected} beneath its operands, found {found}")]
    TypeMismatch {
        opcode: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// DICT or SETITEMS with an unpaired key above the mark
    #[error("{opcode} found an odd number of items for a dict")]
    OddDictItems { opcode: &'static str },

    /// A configured resource limit was crossed
    #[error("{what} exceeds configured limit of {limit}")]
    LimitExceeded { what: &'static str, limit: usize },

    /// The stream builds a container that contains itself
    #[error("pickle stream builds a self-referencing container")]
    RecursiveStructure,
}

/// `'n'` for printable ASCII, `0x8c` otherwise.
fn describe_byte(b: &u8) -> String {
    let b = *b;
    if b.is_ascii_graphic() || b == b' ' {
        format!("'{}'", b as char)
    } else {
        format!("0x{b:02x}")
    }
}

impl DecodeError {
    pub(crate) fn malformed(opcode: u8, reason: impl Into<String>) -> Self {
        DecodeError::MalformedLiteral {
            opcode: crate::opcodes::name(opcode),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_opcode_names_printable_byte() {
        let err = DecodeError::InvalidOpcode { opcode: b'n', offset: 0 };
        assert_eq!(err.to_string(), "invalid or unknown opcode 'n' at offset 0");
    }

    #[test]
    fn test_invalid_opcode_names_binary_byte_in_hex() {
        let err = DecodeError::InvalidOpcode { opcode: 0x95, offset: 2 };
        assert!(err.to_string().contains("0x95"));
    }

    #[test]
    fn test_malformed_uses_opcode_name() {
        let err = DecodeError::malformed(b'I', "not a number");
        assert_eq!(err.to_string(), "malformed INT argument: not a number");
    }
}
