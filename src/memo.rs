use crate::error::DecodeError;

/// Id-addressed table of previously produced values, scoped to one decode call.
///
/// Indices are dense in practice (picklers count up from 0), so entries live
/// in a `Vec` with holes rather than a map. Storing at an index that is
/// already taken overwrites it; nothing is evicted.
pub struct Memo<T> {
    entries: Vec<Option<T>>,
    max_index: usize,
}

impl<T: Clone> Memo<T> {
    pub fn new(max_index: usize) -> Self {
        Self {
            entries: Vec::with_capacity(16),
            max_index,
        }
    }

    pub fn put(&mut self, idx: usize, val: T) -> Result<(), DecodeError> {
        if idx > self.max_index {
            return Err(DecodeError::LimitExceeded {
                what: "memo index",
                limit: self.max_index,
            });
        }
        if idx >= self.entries.len() {
            self.entries.resize(idx + 1, None);
        }
        self.entries[idx] = Some(val);
        Ok(())
    }

    pub fn get(&self, idx: usize) -> Result<T, DecodeError> {
        self.entries
            .get(idx)
            .and_then(Option::as_ref)
            .cloned()
            .ok_or(DecodeError::UndefinedMemoKey(idx))
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_overwrites() {
        let mut memo = Memo::new(10);
        memo.put(3, 'a').unwrap();
        memo.put(3, 'b').unwrap();
        assert_eq!(memo.get(3).unwrap(), 'b');
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn test_hole_is_undefined() {
        let mut memo = Memo::new(10);
        memo.put(5, 1u32).unwrap();
        assert_eq!(memo.get(2).unwrap_err(), DecodeError::UndefinedMemoKey(2));
        assert_eq!(memo.get(6).unwrap_err(), DecodeError::UndefinedMemoKey(6));
    }

    #[test]
    fn test_index_past_limit() {
        let mut memo = Memo::new(4);
        memo.put(4, ()).unwrap();
        let err = memo.put(5, ()).unwrap_err();
        assert!(err.to_string().contains("memo index"));
    }
}
