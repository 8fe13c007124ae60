// Semiring weights: the algebraic interface and the three float semirings.

use std::fmt;
use std::io::{self, Read, Write as IoWrite};

/// A semiring value attached to arcs and final states.
///
/// Implementations provide the two identities, a failure sentinel, the
/// semiring operations, a hash that agrees with equality, and a stable
/// little-endian byte representation used by the container and encode-table
/// formats. Equality follows IEEE semantics, so `no_weight()` (NaN-backed)
/// never compares equal to anything, including itself; use
/// [`is_member`](Weight::is_member) to test for it.
pub trait Weight: Clone + PartialEq + fmt::Debug + fmt::Display + 'static {
    /// Weight type name, e.g. `"tropical"`.
    const TYPE: &'static str;

    /// Arc-type tag for FSTs over this semiring, e.g. `"standard"`.
    const ARC_TYPE: &'static str;

    /// Additive identity; absorbing for `times`. A state with this final
    /// weight is non-final.
    fn zero() -> Self;

    /// Multiplicative identity.
    fn one() -> Self;

    /// Failure sentinel; not a member of the semiring.
    fn no_weight() -> Self;

    /// False for the failure sentinel.
    fn is_member(&self) -> bool;

    /// Semiring addition.
    fn plus(&self, rhs: &Self) -> Self;

    /// Semiring multiplication.
    fn times(&self, rhs: &Self) -> Self;

    /// Stable hash agreeing with equality.
    fn hash(&self) -> u64;

    /// Serialize as little-endian bytes.
    fn write<W: IoWrite>(&self, writer: &mut W) -> io::Result<()>;

    /// Deserialize from little-endian bytes.
    fn read<R: Read>(reader: &mut R) -> io::Result<Self>;
}

/// -log(1 + e^-x) for x >= 0, used by log-semiring addition.
#[inline]
fn neg_log1p_exp_neg(x: f64) -> f64 {
    -(-x).exp().ln_1p()
}

macro_rules! float_weight {
    ($name:ident, $float:ty, $wtype:expr, $atype:expr, $plus:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq)]
        pub struct $name(pub $float);

        impl $name {
            pub fn new(value: $float) -> Self {
                Self(value)
            }

            pub fn value(self) -> $float {
                self.0
            }
        }

        impl Weight for $name {
            const TYPE: &'static str = $wtype;
            const ARC_TYPE: &'static str = $atype;

            fn zero() -> Self {
                Self(<$float>::INFINITY)
            }

            fn one() -> Self {
                Self(0.0)
            }

            fn no_weight() -> Self {
                Self(<$float>::NAN)
            }

            fn is_member(&self) -> bool {
                !self.0.is_nan()
            }

            fn plus(&self, rhs: &Self) -> Self {
                if !self.is_member() || !rhs.is_member() {
                    return Self::no_weight();
                }
                ($plus)(*self, *rhs)
            }

            fn times(&self, rhs: &Self) -> Self {
                if !self.is_member() || !rhs.is_member() {
                    return Self::no_weight();
                }
                // Zero (infinity) absorbs.
                if self.0 == <$float>::INFINITY || rhs.0 == <$float>::INFINITY {
                    return Self::zero();
                }
                Self(self.0 + rhs.0)
            }

            fn hash(&self) -> u64 {
                // Normalize -0.0 so the hash agrees with IEEE equality.
                let value = if self.0 == 0.0 { 0.0 } else { self.0 };
                value.to_bits() as u64
            }

            fn write<W: IoWrite>(&self, writer: &mut W) -> io::Result<()> {
                writer.write_all(&self.0.to_le_bytes())
            }

            fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
                let mut buf = [0u8; std::mem::size_of::<$float>()];
                reader.read_exact(&mut buf)?;
                Ok(Self(<$float>::from_le_bytes(buf)))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                if self.0.is_nan() {
                    write!(f, "BadNumber")
                } else if self.0 == <$float>::INFINITY {
                    write!(f, "Infinity")
                } else if self.0 == <$float>::NEG_INFINITY {
                    write!(f, "-Infinity")
                } else {
                    write!(f, "{}", self.0)
                }
            }
        }
    };
}

float_weight!(
    TropicalWeight,
    f32,
    "tropical",
    "standard",
    |x: TropicalWeight, y: TropicalWeight| if x.0 <= y.0 { x } else { y }
);

float_weight!(
    LogWeight,
    f32,
    "log",
    "log",
    |x: LogWeight, y: LogWeight| {
        if x.0 == f32::INFINITY {
            y
        } else if y.0 == f32::INFINITY {
            x
        } else {
            let (lo, hi) = if x.0 <= y.0 { (x.0, y.0) } else { (y.0, x.0) };
            LogWeight((lo as f64 + neg_log1p_exp_neg((hi - lo) as f64)) as f32)
        }
    }
);

float_weight!(
    Log64Weight,
    f64,
    "log64",
    "log64",
    |x: Log64Weight, y: Log64Weight| {
        if x.0 == f64::INFINITY {
            y
        } else if y.0 == f64::INFINITY {
            x
        } else {
            let (lo, hi) = if x.0 <= y.0 { (x.0, y.0) } else { (y.0, x.0) };
            Log64Weight(lo + neg_log1p_exp_neg(hi - lo))
        }
    }
);
