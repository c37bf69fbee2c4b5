//! Numeric element representation for averaging.
//!
//! [`Query::average`](crate::Query::average) accepts any element type that
//! converts into a [`Number`], so integer and floating point sequences share
//! one implementation.

/// A numeric element, widened for averaging.
///
/// Integers stay integers so sums of large values do not lose precision
/// before the final division.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Signed integer, widened to 64 bits.
    I64(i64),
    /// Unsigned integer, widened to 64 bits.
    U64(u64),
    /// Floating point.
    F64(f64),
}

impl Number {
    /// Converts the number to f64, rounding large integers.
    pub fn to_f64(self) -> f64 {
        match self {
            Number::I64(n) => n as f64,
            Number::U64(n) => n as f64,
            Number::F64(n) => n,
        }
    }
}

macro_rules! number_from {
    ($variant:ident as $wide:ty: $($ty:ty),+) => {
        $(
            impl From<$ty> for Number {
                fn from(n: $ty) -> Self {
                    Number::$variant(n as $wide)
                }
            }
        )+
    };
}

number_from!(I64 as i64: i8, i16, i32, i64, isize);
number_from!(U64 as u64: u8, u16, u32, u64, usize);
number_from!(F64 as f64: f32, f64);

/// Running total for an average, kept exact for integers.
#[derive(Debug, Default)]
pub(crate) struct Mean {
    ints: i128,
    floats: f64,
    count: usize,
}

impl Mean {
    pub(crate) fn push(&mut self, n: Number) {
        match n {
            Number::I64(n) => self.ints += n as i128,
            Number::U64(n) => self.ints += n as i128,
            Number::F64(n) => self.floats += n,
        }
        self.count += 1;
    }

    /// Returns `None` when nothing was pushed.
    pub(crate) fn finish(&self) -> Option<f64> {
        (self.count > 0).then(|| (self.ints as f64 + self.floats) / self.count as f64)
    }
}
