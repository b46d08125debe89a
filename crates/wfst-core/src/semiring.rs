// Semiring weights: tropical (min, +) and log (log-sum-exp, +).
//
// Both semirings share the same representation, a single `f32` where `+inf`
// is the semiring zero (no path) and `0.0` is the semiring one (free path).

use std::fmt;
use std::str::FromStr;

/// Default tolerance for weight comparisons.
pub const KDELTA: f32 = 1.0 / 1024.0;

/// Tag identifying a semiring, stable across file format versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemiringKind {
    Tropical,
    Log,
}

impl SemiringKind {
    /// Numeric tag written to binary files.
    pub fn tag(self) -> u32 {
        match self {
            SemiringKind::Tropical => 1,
            SemiringKind::Log => 2,
        }
    }

    /// Inverse of [`tag`](Self::tag).
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(SemiringKind::Tropical),
            2 => Some(SemiringKind::Log),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SemiringKind::Tropical => "tropical",
            SemiringKind::Log => "log",
        }
    }
}

impl fmt::Display for SemiringKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A semiring over `f32` values.
///
/// `plus` combines alternative (parallel) paths, `times` combines consecutive
/// arcs along one path. `zero()` is the identity of `plus` and annihilates
/// `times`; `one()` is the identity of `times`.
pub trait Semiring:
    Copy + fmt::Debug + fmt::Display + PartialEq + Send + Sync + 'static
{
    /// Which semiring this is.
    const KIND: SemiringKind;

    /// Wrap a raw value.
    fn new(value: f32) -> Self;

    /// The raw value.
    fn value(&self) -> f32;

    fn zero() -> Self;

    fn one() -> Self;

    fn plus(&self, rhs: &Self) -> Self;

    fn times(&self, rhs: &Self) -> Self;

    fn is_zero(&self) -> bool {
        self.value() == f32::INFINITY
    }

    fn is_one(&self) -> bool {
        self.value() == 0.0
    }

    /// Equality within `delta`. Two zeros compare equal.
    fn approx_eq(&self, other: &Self, delta: f32) -> bool {
        let (a, b) = (self.value(), other.value());
        if a.is_infinite() || b.is_infinite() {
            return a == b;
        }
        a <= b + delta && b <= a + delta
    }

    /// Whether the value is a well-formed element of the semiring.
    fn is_member(&self) -> bool {
        let v = self.value();
        !v.is_nan() && v != f32::NEG_INFINITY
    }
}

/// Semirings whose `plus` selects one of its operands, giving a total order
/// on paths ("shortest" = least in this order).
pub trait NaturalOrder: Semiring {
    /// `self` is strictly better than `other`.
    fn natural_less(&self, other: &Self) -> bool;
}

/// Error returned when a weight cannot be parsed from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} weight: {input:?}")]
pub struct ParseWeightError {
    pub kind: SemiringKind,
    pub input: String,
}

fn parse_value(kind: SemiringKind, s: &str) -> Result<f32, ParseWeightError> {
    let trimmed = s.trim();
    match trimmed {
        "Infinity" | "inf" | "+inf" | "INF" => Ok(f32::INFINITY),
        _ => trimmed
            .parse::<f32>()
            .ok()
            .filter(|v| !v.is_nan())
            .ok_or_else(|| ParseWeightError {
                kind,
                input: s.to_string(),
            }),
    }
}

fn fmt_value(value: f32, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if value == f32::INFINITY {
        f.write_str("Infinity")
    } else {
        write!(f, "{value}")
    }
}

/// Tropical semiring: `plus` = min, `times` = +.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TropicalWeight(pub f32);

impl Semiring for TropicalWeight {
    const KIND: SemiringKind = SemiringKind::Tropical;

    #[inline]
    fn new(value: f32) -> Self {
        TropicalWeight(value)
    }

    #[inline]
    fn value(&self) -> f32 {
        self.0
    }

    #[inline]
    fn zero() -> Self {
        TropicalWeight(f32::INFINITY)
    }

    #[inline]
    fn one() -> Self {
        TropicalWeight(0.0)
    }

    #[inline]
    fn plus(&self, rhs: &Self) -> Self {
        if rhs.0 < self.0 { *rhs } else { *self }
    }

    #[inline]
    fn times(&self, rhs: &Self) -> Self {
        if self.is_zero() || rhs.is_zero() {
            return Self::zero();
        }
        TropicalWeight(self.0 + rhs.0)
    }
}

impl NaturalOrder for TropicalWeight {
    #[inline]
    fn natural_less(&self, other: &Self) -> bool {
        self.0 < other.0
    }
}

impl From<f32> for TropicalWeight {
    fn from(value: f32) -> Self {
        TropicalWeight(value)
    }
}

impl fmt::Display for TropicalWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_value(self.0, f)
    }
}

impl FromStr for TropicalWeight {
    type Err = ParseWeightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_value(SemiringKind::Tropical, s).map(TropicalWeight)
    }
}

/// Log semiring: `plus` = -log(e^-a + e^-b), `times` = +.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct LogWeight(pub f32);

impl Semiring for LogWeight {
    const KIND: SemiringKind = SemiringKind::Log;

    #[inline]
    fn new(value: f32) -> Self {
        LogWeight(value)
    }

    #[inline]
    fn value(&self) -> f32 {
        self.0
    }

    #[inline]
    fn zero() -> Self {
        LogWeight(f32::INFINITY)
    }

    #[inline]
    fn one() -> Self {
        LogWeight(0.0)
    }

    fn plus(&self, rhs: &Self) -> Self {
        if self.is_zero() {
            return *rhs;
        }
        if rhs.is_zero() {
            return *self;
        }
        let (lo, hi) = if self.0 <= rhs.0 {
            (self.0, rhs.0)
        } else {
            (rhs.0, self.0)
        };
        LogWeight(lo - (lo - hi).exp().ln_1p())
    }

    #[inline]
    fn times(&self, rhs: &Self) -> Self {
        if self.is_zero() || rhs.is_zero() {
            return Self::zero();
        }
        LogWeight(self.0 + rhs.0)
    }
}

impl From<f32> for LogWeight {
    fn from(value: f32) -> Self {
        LogWeight(value)
    }
}

impl fmt::Display for LogWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_value(self.0, f)
    }
}

impl FromStr for LogWeight {
    type Err = ParseWeightError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_value(SemiringKind::Log, s).map(LogWeight)
    }
}
