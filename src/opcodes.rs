/// Pickle opcodes understood by the decoder (protocol 0-2).
///
/// Object-construction opcodes (GLOBAL, REDUCE, BUILD, INST, OBJ, NEWOBJ,
/// PERSID, BINPERSID, EXT*) and everything added in protocol 3+ are left out
/// on purpose: they decode as unknown opcodes.
///
/// Reference: Python pickletools.py

// -- Protocol 0 (text-based, legacy) --
pub const MARK: u8 = b'('; // push special markobject on stack
pub const STOP: u8 = b'.'; // every pickle ends with STOP
pub const POP: u8 = b'0'; // discard topmost stack item
pub const POP_MARK: u8 = b'1'; // discard stack top through topmost markobject
pub const DUP: u8 = b'2'; // duplicate top stack item
pub const FLOAT: u8 = b'F'; // push float; decimal string argument
pub const INT: u8 = b'I'; // push integer or bool; decimal string argument
pub const LONG: u8 = b'L'; // push long; decimal string argument
pub const NONE: u8 = b'N'; // push None
pub const STRING: u8 = b'S'; // push string; NL-terminated quoted argument
pub const UNICODE: u8 = b'V'; // push Unicode string; raw-unicode-escaped argument
pub const APPEND: u8 = b'a'; // append stack top to list below it
pub const DICT: u8 = b'd'; // build a dict from stack items
pub const APPENDS: u8 = b'e'; // extend list on stack by topmost slice
pub const GET: u8 = b'g'; // push item from memo by string index
pub const LIST: u8 = b'l'; // build list from topmost stack slice
pub const PUT: u8 = b'p'; // store stack top in memo by string index
pub const SETITEM: u8 = b's'; // add key+value pair to dict
pub const TUPLE: u8 = b't'; // build tuple from topmost stack slice
pub const SETITEMS: u8 = b'u'; // modify dict by adding topmost key+value pairs

// -- Protocol 1 (binary) --
pub const EMPTY_LIST: u8 = b']'; // push empty list
pub const EMPTY_DICT: u8 = b'}'; // push empty dict
pub const EMPTY_TUPLE: u8 = b')'; // push empty tuple
pub const BININT: u8 = b'J'; // push 4-byte signed int
pub const BININT1: u8 = b'K'; // push 1-byte unsigned int
pub const BININT2: u8 = b'M'; // push 2-byte unsigned int
pub const BINFLOAT: u8 = b'G'; // push float; binary 8-byte IEEE, big-endian
pub const BINSTRING: u8 = b'T'; // push string; counted binary string
pub const SHORT_BINSTRING: u8 = b'U'; // push string; counted binary string <= 255 bytes
pub const BINUNICODE: u8 = b'X'; // push Unicode string; counted UTF-8 string
pub const BINGET: u8 = b'h'; // push item from memo by 1-byte index
pub const LONG_BINGET: u8 = b'j'; // push item from memo by 4-byte index
pub const BINPUT: u8 = b'q'; // store stack top in memo by 1-byte index
pub const LONG_BINPUT: u8 = b'r'; // store stack top in memo by 4-byte index

// -- Protocol 2 --
pub const PROTO: u8 = 0x80; // identify pickle protocol
pub const TUPLE1: u8 = 0x85; // build 1-tuple from top of stack
pub const TUPLE2: u8 = 0x86; // build 2-tuple from top two stack items
pub const TUPLE3: u8 = 0x87; // build 3-tuple from top three stack items
pub const NEWTRUE: u8 = 0x88; // push True
pub const NEWFALSE: u8 = 0x89; // push False
pub const LONG1: u8 = 0x8a; // push long from < 256 bytes
pub const LONG4: u8 = 0x8b; // push really big long

/// Highest protocol version this decoder accepts in a PROTO opcode.
pub const HIGHEST_PROTOCOL: u8 = 2;

/// Opcode name for error messages.
pub fn name(op: u8) -> &'static str {
    match op {
        MARK => "MARK",
        STOP => "STOP",
        POP => "POP",
        POP_MARK => "POP_MARK",
        DUP => "DUP",
        FLOAT => "FLOAT",
        INT => "INT",
        LONG => "LONG",
        NONE => "NONE",
        STRING => "STRING",
        UNICODE => "UNICODE",
        APPEND => "APPEND",
        DICT => "DICT",
        APPENDS => "APPENDS",
        GET => "GET",
        LIST => "LIST",
        PUT => "PUT",
        SETITEM => "SETITEM",
        TUPLE => "TUPLE",
        SETITEMS => "SETITEMS",
        EMPTY_LIST => "EMPTY_LIST",
        EMPTY_DICT => "EMPTY_DICT",
        EMPTY_TUPLE => "EMPTY_TUPLE",
        BININT => "BININT",
        BININT1 => "BININT1",
        BININT2 => "BININT2",
        BINFLOAT => "BINFLOAT",
        BINSTRING => "BINSTRING",
        SHORT_BINSTRING => "SHORT_BINSTRING",
        BINUNICODE => "BINUNICODE",
        BINGET => "BINGET",
        LONG_BINGET => "LONG_BINGET",
        BINPUT => "BINPUT",
        LONG_BINPUT => "LONG_BINPUT",
        PROTO => "PROTO",
        TUPLE1 => "TUPLE1",
        TUPLE2 => "TUPLE2",
        TUPLE3 => "TUPLE3",
        NEWTRUE => "NEWTRUE",
        NEWFALSE => "NEWFALSE",
        LONG1 => "LONG1",
        LONG4 => "LONG4",
        _ => "UNKNOWN",
    }
}
