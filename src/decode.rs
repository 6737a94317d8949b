use tracing::{debug, trace};

use crate::config::DecoderConfig;
use crate::cursor::Cursor;
use crate::error::DecodeError;
use crate::heap::{Heap, Node, NodeId};
use crate::literal;
use crate::memo::Memo;
use crate::opcodes::{self, *};
use crate::types::Value;

/// Decode pickle bytes into a `Value` tree.
///
/// This implements the data-only part of the pickle virtual machine for
/// protocols 0-2. Opcodes that would import or construct objects are
/// reported as invalid.
pub fn decode_pickle(data: &[u8], config: &DecoderConfig) -> Result<Value, DecodeError> {
    Decoder::new(data, config).run()
}

struct Decoder<'a> {
    cursor: Cursor<'a>,
    config: &'a DecoderConfig,
    heap: Heap,
    stack: Vec<NodeId>,
    /// Stack depths saved by MARK
    marks: Vec<usize>,
    memo: Memo<NodeId>,
    protocol: u8,
}

impl<'a> Decoder<'a> {
    fn new(data: &'a [u8], config: &'a DecoderConfig) -> Self {
        Self {
            cursor: Cursor::new(data),
            config,
            heap: Heap::new(),
            stack: Vec::with_capacity(16),
            marks: Vec::with_capacity(4),
            memo: Memo::new(config.max_memo_index),
            protocol: 0,
        }
    }

    fn run(mut self) -> Result<Value, DecodeError> {
        loop {
            let offset = self.cursor.position();
            let op = self.cursor.read_u8()?;
            match op {
                STOP => {
                    return self.finish();
                }
                PROTO => {
                    let version = self.cursor.read_u8()?;
                    if version > HIGHEST_PROTOCOL {
                        return Err(DecodeError::UnsupportedProtocol(version));
                    }
                    trace!(version, "pickle protocol");
                    self.protocol = version;
                }

                // -- None, Bool --
                NONE => self.push_value(Value::None),
                NEWTRUE => self.push_value(Value::Bool(true)),
                NEWFALSE => self.push_value(Value::Bool(false)),

                // -- Integers --
                INT => {
                    let line = self.cursor.read_line()?;
                    let val = literal::parse_int_line(line, self.config.max_long_digits)?;
                    self.push_value(val);
                }
                BININT => {
                    let val = self.cursor.read_i32()?;
                    self.push_value(Value::Int(val as i64));
                }
                BININT1 => {
                    let val = self.cursor.read_u8()?;
                    self.push_value(Value::Int(val as i64));
                }
                BININT2 => {
                    let val = self.cursor.read_u16()?;
                    self.push_value(Value::Int(val as i64));
                }
                LONG => {
                    let line = self.cursor.read_line()?;
                    let val = literal::parse_long_line(line, self.config.max_long_digits)?;
                    self.push_value(Value::BigInt(val));
                }
                LONG1 => {
                    let n = self.cursor.read_u8()? as usize;
                    let bytes = self.cursor.read_bytes(n)?;
                    self.push_value(Value::BigInt(literal::decode_long_bytes(bytes)));
                }
                LONG4 => {
                    let n = self.read_length(op)?;
                    let bytes = self.cursor.read_bytes(n)?;
                    self.push_value(Value::BigInt(literal::decode_long_bytes(bytes)));
                }

                // -- Float --
                FLOAT => {
                    let line = self.cursor.read_line()?;
                    self.push_value(Value::Float(literal::parse_float_line(line)?));
                }
                BINFLOAT => {
                    let val = self.cursor.read_f64_be()?;
                    self.push_value(Value::Float(val));
                }

                // -- Strings (Python 2 str) --
                STRING => {
                    let line = self.cursor.read_line()?;
                    self.push_value(Value::Bytes(literal::unquote_string(line)?));
                }
                BINSTRING => {
                    let n = self.read_length(op)?;
                    let bytes = self.cursor.read_bytes(n)?.to_vec();
                    self.push_value(Value::Bytes(bytes));
                }
                SHORT_BINSTRING => {
                    let n = self.cursor.read_u8()? as usize;
                    let bytes = self.cursor.read_bytes(n)?.to_vec();
                    self.push_value(Value::Bytes(bytes));
                }

                // -- Unicode strings, kept as their UTF-8 encoding --
                UNICODE => {
                    let line = self.cursor.read_line()?;
                    let s = literal::decode_raw_unicode_escape(line)?;
                    self.push_value(Value::Bytes(s.into_bytes()));
                }
                BINUNICODE => {
                    let n = self.cursor.read_u32()? as usize;
                    self.check_length(n)?;
                    let bytes = self.cursor.read_bytes(n)?;
                    if std::str::from_utf8(bytes).is_err() {
                        return Err(DecodeError::malformed(op, "payload is not valid UTF-8"));
                    }
                    self.push_value(Value::Bytes(bytes.to_vec()));
                }

                // -- Mark --
                MARK => self.marks.push(self.stack.len()),
                POP_MARK => {
                    self.pop_mark()?;
                }

                // -- Tuple --
                EMPTY_TUPLE => self.push_node(Node::Tuple(Vec::new())),
                TUPLE => {
                    let items = self.pop_mark()?;
                    self.push_node(Node::Tuple(items));
                }
                TUPLE1 | TUPLE2 | TUPLE3 => {
                    let n = (op - TUPLE1 + 1) as usize;
                    let items = self.pop_n(n)?;
                    self.push_node(Node::Tuple(items));
                }

                // -- List --
                EMPTY_LIST => self.push_node(Node::List(Vec::new())),
                LIST => {
                    let items = self.pop_mark()?;
                    self.push_node(Node::List(items));
                }
                APPEND => {
                    let val = self.pop()?;
                    self.list_at_top(op)?.push(val);
                }
                APPENDS => {
                    let items = self.pop_mark()?;
                    self.list_at_top(op)?.extend(items);
                }

                // -- Dict --
                EMPTY_DICT => self.push_node(Node::Dict(Vec::new())),
                DICT => {
                    let items = self.pop_mark()?;
                    let pairs = items_to_pairs(op, items)?;
                    self.push_node(Node::Dict(pairs));
                }
                SETITEM => {
                    let val = self.pop()?;
                    let key = self.pop()?;
                    self.dict_at_top(op)?.push((key, val));
                }
                SETITEMS => {
                    let items = self.pop_mark()?;
                    let pairs = items_to_pairs(op, items)?;
                    self.dict_at_top(op)?.extend(pairs);
                }

                // -- Memo --
                PUT => {
                    let line = self.cursor.read_line()?;
                    let idx = literal::parse_memo_index(op, line)?;
                    self.memo_put(idx)?;
                }
                BINPUT => {
                    let idx = self.cursor.read_u8()? as usize;
                    self.memo_put(idx)?;
                }
                LONG_BINPUT => {
                    let idx = self.cursor.read_u32()? as usize;
                    self.memo_put(idx)?;
                }
                GET => {
                    let line = self.cursor.read_line()?;
                    let idx = literal::parse_memo_index(op, line)?;
                    self.stack.push(self.memo.get(idx)?);
                }
                BINGET => {
                    let idx = self.cursor.read_u8()? as usize;
                    self.stack.push(self.memo.get(idx)?);
                }
                LONG_BINGET => {
                    let idx = self.cursor.read_u32()? as usize;
                    self.stack.push(self.memo.get(idx)?);
                }

                // -- Stack manipulation --
                POP => {
                    // With nothing above the mark, POP discards the mark itself.
                    if self.stack.len() > self.floor() {
                        self.stack.pop();
                    } else if self.marks.pop().is_none() {
                        return Err(DecodeError::EmptyStackPop);
                    }
                }
                DUP => {
                    let id = self.top()?;
                    self.stack.push(id);
                }

                _ => {
                    return Err(DecodeError::InvalidOpcode { opcode: op, offset });
                }
            }
        }
    }

    fn finish(self) -> Result<Value, DecodeError> {
        if self.stack.len() != 1 {
            return Err(DecodeError::MalformedStreamEnd {
                depth: self.stack.len(),
            });
        }
        if self.cursor.peek().is_some() {
            debug!(
                trailing = self.cursor.remaining(),
                "ignoring bytes after STOP"
            );
        }
        debug!(
            protocol = self.protocol,
            nodes = self.heap.len(),
            memo = self.memo.len(),
            "pickle decoded"
        );
        self.heap.materialize(self.stack[0], self.config)
    }

    // -- Argument helpers --

    /// Signed 4-byte length used by BINSTRING and LONG4.
    fn read_length(&mut self, op: u8) -> Result<usize, DecodeError> {
        let n = self.cursor.read_i32()?;
        let n = usize::try_from(n)
            .map_err(|_| DecodeError::malformed(op, format!("negative length {n}")))?;
        self.check_length(n)?;
        Ok(n)
    }

    fn check_length(&self, n: usize) -> Result<(), DecodeError> {
        if n > self.config.max_literal_len {
            return Err(DecodeError::LimitExceeded {
                what: "literal length",
                limit: self.config.max_literal_len,
            });
        }
        Ok(())
    }

    // -- Stack operations --

    #[inline]
    fn push_node(&mut self, node: Node) {
        let id = self.heap.alloc(node);
        self.stack.push(id);
    }

    #[inline]
    fn push_value(&mut self, val: Value) {
        self.push_node(Node::Scalar(val));
    }

    /// Lowest stack depth reachable without popping a mark.
    #[inline]
    fn floor(&self) -> usize {
        self.marks.last().copied().unwrap_or(0)
    }

    #[inline]
    fn pop(&mut self) -> Result<NodeId, DecodeError> {
        if self.stack.len() <= self.floor() {
            return Err(DecodeError::EmptyStackPop);
        }
        self.stack.pop().ok_or(DecodeError::EmptyStackPop)
    }

    #[inline]
    fn top(&self) -> Result<NodeId, DecodeError> {
        if self.stack.len() <= self.floor() {
            return Err(DecodeError::EmptyStackPop);
        }
        self.stack.last().copied().ok_or(DecodeError::EmptyStackPop)
    }

    /// Pop the top `n` items, oldest first.
    fn pop_n(&mut self, n: usize) -> Result<Vec<NodeId>, DecodeError> {
        if self.stack.len() < self.floor() + n {
            return Err(DecodeError::EmptyStackPop);
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    /// Pop all items above the last MARK, and the mark itself.
    fn pop_mark(&mut self) -> Result<Vec<NodeId>, DecodeError> {
        let depth = self.marks.pop().ok_or(DecodeError::EmptyMarkStackPop)?;
        if depth > self.stack.len() {
            return Err(DecodeError::EmptyStackPop);
        }
        Ok(self.stack.split_off(depth))
    }

    fn list_at_top(&mut self, op: u8) -> Result<&mut Vec<NodeId>, DecodeError> {
        let id = self.top()?;
        let found = self.heap.kind(id);
        match self.heap.get_mut(id) {
            Node::List(items) => Ok(items),
            _ => Err(DecodeError::TypeMismatch {
                opcode: opcodes::name(op),
                expected: "list",
                found,
            }),
        }
    }

    fn dict_at_top(&mut self, op: u8) -> Result<&mut Vec<(NodeId, NodeId)>, DecodeError> {
        let id = self.top()?;
        let found = self.heap.kind(id);
        match self.heap.get_mut(id) {
            Node::Dict(pairs) => Ok(pairs),
            _ => Err(DecodeError::TypeMismatch {
                opcode: opcodes::name(op),
                expected: "dict",
                found,
            }),
        }
    }

    // -- Memo operations --

    /// Store the stack top by reference; it stays on the stack.
    fn memo_put(&mut self, idx: usize) -> Result<(), DecodeError> {
        let id = self.top()?;
        self.memo.put(idx, id)
    }
}

/// Convert a flat list [k1, v1, k2, v2, ...] into pairs [(k1, v1), (k2, v2), ...].
fn items_to_pairs(op: u8, items: Vec<NodeId>) -> Result<Vec<(NodeId, NodeId)>, DecodeError> {
    if items.len() % 2 != 0 {
        return Err(DecodeError::OddDictItems {
            opcode: opcodes::name(op),
        });
    }
    Ok(items.chunks_exact(2).map(|kv| (kv[0], kv[1])).collect())
}
