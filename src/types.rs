use std::collections::hash_map::Entry;
use std::collections::HashMap;

use num_bigint::BigInt;

/// A decoded pickle value.
///
/// The tree is fully owned: memo back-references in the stream are resolved
/// into copies, so a value reachable twice appears twice.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    /// LONG, LONG1 and LONG4 always produce this variant, as does INT text
    /// that does not fit in `i64`.
    BigInt(BigInt),
    Float(f64),
    /// Every string opcode lands here. STRING/BINSTRING payloads are raw
    /// octets; UNICODE/BINUNICODE payloads are guaranteed UTF-8.
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Insertion-ordered pairs with unique keys.
    Dict(Vec<(Value, Value)>),
}

impl Value {
    /// Variant name, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::BigInt(_) => "bigint",
            Value::Float(_) => "float",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Dict(_) => "dict",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer value of `Int`, or of a `BigInt` that fits in `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::BigInt(bi) => i64::try_from(bi).ok(),
            _ => None,
        }
    }

    pub fn as_bigint(&self) -> Option<BigInt> {
        match self {
            Value::Int(i) => Some(BigInt::from(*i)),
            Value::BigInt(bi) => Some(bi.clone()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// `Bytes` payload as text, when it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&[(Value, Value)]> {
        match self {
            Value::Dict(pairs) => Some(pairs),
            _ => None,
        }
    }

    /// Dict lookup using the same key equality the decoder applies.
    pub fn get(&self, key: &Value) -> Option<&Value> {
        let pairs = self.as_dict()?;
        let wanted = DictKey::of(key)?;
        pairs
            .iter()
            .find(|(k, _)| DictKey::of(k).as_ref() == Some(&wanted))
            .map(|(_, v)| v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Bytes(s.as_bytes().to_vec())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Hashable identity of a dict key.
///
/// Numbers that compare equal in the pickling language share one identity:
/// `True`, `1`, `1L` and `1.0` are the same key. Containers are keyed by the
/// identities of their items, so `(1,)` and `(True,)` collide too.
#[derive(Debug, PartialEq, Eq, Hash)]
pub(crate) enum DictKey {
    None,
    Int(BigInt),
    /// Bit pattern of a non-integral, non-NaN float
    Float(u64),
    Bytes(Vec<u8>),
    List(Vec<DictKey>),
    Tuple(Vec<DictKey>),
    Dict(Vec<(DictKey, DictKey)>),
}

impl DictKey {
    /// `None` when the key equals nothing, not even itself: NaN, or a
    /// container holding one.
    pub(crate) fn of(val: &Value) -> Option<DictKey> {
        Some(match val {
            Value::None => DictKey::None,
            Value::Bool(b) => DictKey::Int(BigInt::from(*b as i64)),
            Value::Int(i) => DictKey::Int(BigInt::from(*i)),
            Value::BigInt(bi) => DictKey::Int(bi.clone()),
            Value::Float(f) if f.is_nan() => return None,
            Value::Float(f) => match integral_float(*f) {
                Some(i) => DictKey::Int(i),
                None => DictKey::Float(f.to_bits()),
            },
            Value::Bytes(b) => DictKey::Bytes(b.clone()),
            Value::List(items) => DictKey::List(keys_of(items)?),
            Value::Tuple(items) => DictKey::Tuple(keys_of(items)?),
            Value::Dict(pairs) => DictKey::Dict(
                pairs
                    .iter()
                    .map(|(k, v)| Some((DictKey::of(k)?, DictKey::of(v)?)))
                    .collect::<Option<_>>()?,
            ),
        })
    }
}

fn keys_of(items: &[Value]) -> Option<Vec<DictKey>> {
    items.iter().map(DictKey::of).collect()
}

/// Exact integer value of a finite float with no fractional part.
fn integral_float(f: f64) -> Option<BigInt> {
    if !f.is_finite() || f.fract() != 0.0 {
        return None;
    }
    // Both bounds are exact in f64, and every integral float between them fits i64.
    if (-9_223_372_036_854_775_808.0..9_223_372_036_854_775_808.0).contains(&f) {
        return Some(BigInt::from(f as i64));
    }
    // |f| >= 2^63: mantissa times a non-negative power of two.
    let bits = f.to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as usize - 1075;
    let mantissa = (bits & ((1u64 << 52) - 1)) | (1u64 << 52);
    let magnitude = BigInt::from(mantissa) << exponent;
    Some(if f < 0.0 { -magnitude } else { magnitude })
}

/// Collapse repeated keys: the later value wins, the first key keeps its position.
pub(crate) fn dedup_pairs(pairs: Vec<(Value, Value)>) -> Vec<(Value, Value)> {
    let mut out: Vec<(Value, Value)> = Vec::with_capacity(pairs.len());
    let mut index: HashMap<DictKey, usize> = HashMap::with_capacity(pairs.len());
    for (k, v) in pairs {
        let Some(key) = DictKey::of(&k) else {
            out.push((k, v));
            continue;
        };
        match index.entry(key) {
            Entry::Occupied(e) => out[*e.get()].1 = v,
            Entry::Vacant(e) => {
                e.insert(out.len());
                out.push((k, v));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_later_value_wins_in_first_position() {
        let pairs = vec![
            (Value::from("a"), Value::Int(1)),
            (Value::from("b"), Value::Int(2)),
            (Value::from("a"), Value::Int(3)),
            (Value::Bool(true), Value::from("t")),
            (Value::Int(1), Value::from("one")),
        ];
        assert_eq!(
            dedup_pairs(pairs),
            vec![
                (Value::from("a"), Value::Int(3)),
                (Value::from("b"), Value::Int(2)),
                (Value::Bool(true), Value::from("one")),
            ]
        );
    }

    #[test]
    fn test_dedup_tuple_keys() {
        let key = || Value::Tuple(vec![Value::None]);
        let pairs = vec![(key(), Value::Int(1)), (key(), Value::Int(2))];
        assert_eq!(dedup_pairs(pairs), vec![(key(), Value::Int(2))]);
    }

    #[test]
    fn test_dedup_tuple_keys_by_numeric_identity() {
        let pairs = vec![
            (Value::Tuple(vec![Value::Int(1), Value::from("x")]), Value::Int(1)),
            (Value::List(vec![Value::Int(1), Value::from("x")]), Value::Int(2)),
            (Value::Tuple(vec![Value::Bool(true), Value::from("x")]), Value::Int(3)),
        ];
        assert_eq!(
            dedup_pairs(pairs),
            vec![
                (Value::Tuple(vec![Value::Int(1), Value::from("x")]), Value::Int(3)),
                (Value::List(vec![Value::Int(1), Value::from("x")]), Value::Int(2)),
            ]
        );
    }

    #[test]
    fn test_dedup_many_tuple_keys() {
        let pairs: Vec<_> = (0..20_000)
            .map(|i| (Value::Tuple(vec![Value::Int(i % 10_000)]), Value::Int(i)))
            .collect();
        let out = dedup_pairs(pairs);
        assert_eq!(out.len(), 10_000);
        assert_eq!(out[0], (Value::Tuple(vec![Value::Int(0)]), Value::Int(10_000)));
    }

    #[test]
    fn test_dedup_large_integral_float_matches_bigint() {
        let two_63: BigInt = "9223372036854775808".parse().unwrap();
        let pairs = vec![
            (Value::BigInt(two_63.clone()), Value::from("big")),
            (Value::Float(9_223_372_036_854_775_808.0), Value::from("float")),
            (Value::Float(-1e20), Value::from("neg")),
            (Value::BigInt(-BigInt::from(10u64).pow(20)), Value::from("negbig")),
        ];
        assert_eq!(
            dedup_pairs(pairs),
            vec![
                (Value::BigInt(two_63), Value::from("float")),
                (Value::Float(-1e20), Value::from("negbig")),
            ]
        );
    }

    #[test]
    fn test_dedup_keeps_every_nan_key() {
        let pairs = vec![
            (Value::Float(f64::NAN), Value::Int(1)),
            (Value::Float(f64::NAN), Value::Int(2)),
            (Value::Tuple(vec![Value::Float(f64::NAN)]), Value::Int(3)),
            (Value::Tuple(vec![Value::Float(f64::NAN)]), Value::Int(4)),
            (Value::Float(0.5), Value::Int(5)),
            (Value::Float(0.5), Value::Int(6)),
        ];
        let out = dedup_pairs(pairs);
        let values: Vec<_> = out.iter().map(|(_, v)| v.as_i64()).collect();
        assert_eq!(values, vec![Some(1), Some(2), Some(3), Some(4), Some(6)]);
    }

    #[test]
    fn test_as_i64_accepts_small_bigint() {
        assert_eq!(Value::BigInt(BigInt::from(42)).as_i64(), Some(42));
        let huge: BigInt = "123456789012345678901234567890".parse().unwrap();
        assert_eq!(Value::BigInt(huge).as_i64(), None);
    }

    #[test]
    fn test_get_treats_numeric_keys_alike() {
        let dict = Value::Dict(vec![
            (Value::Int(1), Value::from("one")),
            (Value::from("k"), Value::from("v")),
        ]);
        assert_eq!(dict.get(&Value::Bool(true)), Some(&Value::from("one")));
        assert_eq!(dict.get(&Value::Float(1.0)), Some(&Value::from("one")));
        assert_eq!(dict.get(&Value::from("k")), Some(&Value::from("v")));
        assert_eq!(dict.get(&Value::Int(2)), None);
        assert_eq!(dict.get(&Value::Float(f64::NAN)), None);
    }

    #[test]
    fn test_get_with_tuple_key() {
        let key = Value::Tuple(vec![Value::Int(1), Value::Int(2)]);
        let dict = Value::Dict(vec![(key.clone(), Value::None)]);
        assert_eq!(dict.get(&key), Some(&Value::None));
    }

    #[test]
    fn test_as_str_rejects_invalid_utf8() {
        assert_eq!(Value::Bytes(vec![0xff]).as_str(), None);
        assert_eq!(Value::from("test").as_str(), Some("test"));
    }
}
