/// Decoded numeric CSI sequence argument.
///
/// Carries two flags on top of the value: *missing* (no digits were
/// written, distinct from an explicit 0) and *more* (the argument was
/// separated from the next with `:` instead of `;`, i.e. a compound
/// sub-parameter list continues).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsiParam {
    value: Option<i64>,
    more: bool,
}

/// Digits past this value stop accumulating, preventing argument bombs.
pub const ARG_OVERFLOW_LIMIT: i64 = 100_000_000;

impl CsiParam {
    pub const MISSING: CsiParam = CsiParam {
        value: None,
        more: false,
    };

    pub fn new(value: i64) -> Self {
        Self {
            value: Some(value),
            more: false,
        }
    }

    pub fn new_more(value: i64) -> Self {
        Self {
            value: Some(value),
            more: true,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.value.is_none()
    }

    pub fn value(&self) -> Option<i64> {
        self.value
    }

    /// The value, or `default` when missing.
    pub fn or(&self, default: i64) -> i64 {
        self.value.unwrap_or(default)
    }

    /// The value as a repeat count: missing and 0 both mean 1.
    pub fn count(&self) -> i64 {
        match self.value {
            Some(v) if v > 0 => v,
            _ => 1,
        }
    }

    pub fn has_more(&self) -> bool {
        self.more
    }

    pub fn set_more(&mut self) {
        self.more = true;
    }

    /// Fold one decimal digit into the value, clamping against overflow.
    pub fn push_digit(&mut self, digit: u8) {
        let cur = match self.value {
            None => 0,
            Some(v) if v > ARG_OVERFLOW_LIMIT => return,
            Some(v) => v * 10,
        };
        self.value = Some(cur + i64::from(digit));
    }
}

impl Default for CsiParam {
    fn default() -> Self {
        Self::MISSING
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_vs_zero() {
        let missing = CsiParam::MISSING;
        assert!(missing.is_missing());
        assert_eq!(missing.or(7), 7);
        assert_eq!(missing.count(), 1);

        let zero = CsiParam::new(0);
        assert!(!zero.is_missing());
        assert_eq!(zero.or(7), 0);
        assert_eq!(zero.count(), 1);
    }

    #[test]
    fn test_push_digit() {
        let mut p = CsiParam::MISSING;
        p.push_digit(4);
        p.push_digit(2);
        assert_eq!(p.value(), Some(42));
    }

    #[test]
    fn test_overflow_clamp() {
        let mut p = CsiParam::new(ARG_OVERFLOW_LIMIT + 1);
        let before = p.value();
        p.push_digit(9);
        assert_eq!(p.value(), before);
    }
}
