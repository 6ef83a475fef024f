//! Weak cross-object identifiers
//!
//! A [`Tuid`] names an object without owning it. Scene nodes refer to their
//! parents and children by `Tuid`, component collections stamp their events
//! with one, and reflected fields may hold them as plain values.

use core::fmt;
use core::str::FromStr;
use core::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// A 64-bit unique identifier
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tuid(u64);

impl Tuid {
    /// The null identifier, never produced by a generator
    pub const NULL: Tuid = Tuid(0);

    /// Wrap a raw value
    #[inline]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value
    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Check if this is the null identifier
    #[inline]
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }

    /// Generate a new identifier from the process-wide generator
    pub fn generate() -> Self {
        GLOBAL_GENERATOR.next()
    }

    /// Derive a stable identifier from a name (FNV-1a)
    pub fn from_name(name: &str) -> Self {
        let mut hash = 0xcbf29ce484222325u64;
        for byte in name.bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        // zero is reserved for null
        Self(if hash == 0 { 1 } else { hash })
    }
}

impl fmt::Debug for Tuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Tuid(null)")
        } else {
            write!(f, "Tuid({:#018X})", self.0)
        }
    }
}

impl fmt::Display for Tuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018X}", self.0)
    }
}

/// Error returned when a string is not a valid [`Tuid`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseTuidError(String);

impl fmt::Display for ParseTuidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid tuid '{}'", self.0)
    }
}

impl std::error::Error for ParseTuidError {}

impl FromStr for Tuid {
    type Err = ParseTuidError;

    /// Accepts `0x`-prefixed hexadecimal (the `Display` form) or decimal
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            Some(hex) => u64::from_str_radix(hex, 16),
            None => trimmed.parse::<u64>(),
        };
        parsed.map(Tuid).map_err(|_| ParseTuidError(s.to_string()))
    }
}

impl From<u64> for Tuid {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Thread-safe generator of unique identifiers
///
/// The high bits come from a seed taken at construction, the low bits from
/// a counter, and the two are mixed so consecutive ids don't share prefixes.
pub struct TuidGenerator {
    seed: u64,
    next: AtomicU64,
}

impl TuidGenerator {
    /// Create a generator with an explicit seed
    pub const fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            next: AtomicU64::new(1),
        }
    }

    /// Create a generator seeded from the system clock
    pub fn new() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x5eed);
        Self::with_seed(nanos)
    }

    /// Generate the next identifier
    pub fn next(&self) -> Tuid {
        loop {
            let count = self.next.fetch_add(1, Ordering::Relaxed);
            let value = mix(self.seed ^ count.wrapping_mul(0x9e3779b97f4a7c15));
            if value != 0 {
                return Tuid(value);
            }
        }
    }
}

impl Default for TuidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_GENERATOR: LazyGenerator = LazyGenerator::new();

/// Seeds itself on first use; `SystemTime` is not available in const context
struct LazyGenerator {
    inner: std::sync::OnceLock<TuidGenerator>,
}

impl LazyGenerator {
    const fn new() -> Self {
        Self {
            inner: std::sync::OnceLock::new(),
        }
    }

    fn next(&self) -> Tuid {
        self.inner.get_or_init(TuidGenerator::new).next()
    }
}

// splitmix64 finalizer
#[inline]
fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
    z ^ (z >> 31)
}
