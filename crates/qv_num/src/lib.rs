//! Exact numeric domain for Quiver.
//!
//! `NumberValue` is the tagged sum every numeric value flows through:
//! arbitrary-precision integers, exact rationals, and IEEE-754 doubles.
//! Arithmetic over exact values stays exact; a `Double` operand is
//! contagious but is never introduced by an exact computation. This is the
//! invariant that makes `0.1 + 0.2 = 0.3` hold all the way to the wire.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{FromPrimitive, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

// ── Errors ──────────────────────────────────────────────────────────────

/// The single failure sum of the numeric core. Parser, evaluator,
/// projector, and emitter all speak this type; callers wrap it into their
/// transport envelopes unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NumericError {
    #[error("malformed numeric literal: '{0}'")]
    MalformedNumeric(String),

    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("type error in '{op}': expected {expected} operand, got {got}")]
    TypeError {
        op: &'static str,
        expected: &'static str,
        got: String,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("numeric fault: {0}")]
    NumericFault(&'static str),
}

// ── Declared types ──────────────────────────────────────────────────────

/// The XSD types the numeric pipeline recognizes. The projector keys its
/// rendering choice off this; anything else is rejected up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum XsdType {
    #[serde(rename = "xsd:integer")]
    Integer,
    #[serde(rename = "xsd:decimal")]
    Decimal,
    #[serde(rename = "xsd:double")]
    Double,
    #[serde(rename = "xsd:float")]
    Float,
}

impl XsdType {
    /// Resolve a lexical type name. Unknown names fail with `TypeMismatch`.
    pub fn from_name(name: &str) -> Result<Self, NumericError> {
        match name {
            "xsd:integer" => Ok(XsdType::Integer),
            "xsd:decimal" => Ok(XsdType::Decimal),
            "xsd:double" => Ok(XsdType::Double),
            "xsd:float" => Ok(XsdType::Float),
            _ => Err(NumericError::TypeMismatch {
                expected: "numeric xsd type".into(),
                got: name.into(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            XsdType::Integer => "xsd:integer",
            XsdType::Decimal => "xsd:decimal",
            XsdType::Double => "xsd:double",
            XsdType::Float => "xsd:float",
        }
    }

    /// True for `xsd:double` and `xsd:float`, the two types whose values
    /// live in binary64.
    pub fn is_floating(&self) -> bool {
        matches!(self, XsdType::Double | XsdType::Float)
    }
}

impl fmt::Display for XsdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── NumberValue ─────────────────────────────────────────────────────────

/// A numeric value in one of three representations.
///
/// Invariants:
/// - `Rational` is always in lowest terms with positive denominator
///   (`BigRational::new` canonicalizes; all construction routes through it).
/// - A `Rational` is never silently collapsed to `Integer`; whether a
///   value renders as `2` or `2.0` is the projector's concern.
/// - `Double` appears only when the declared type was `xsd:double` or
///   `xsd:float`, or when an operand already was one.
///
/// Values are immutable and carry no identity; comparison is structural.
#[derive(Debug, Clone, PartialEq)]
pub enum NumberValue {
    Integer(BigInt),
    Rational(BigRational),
    Double(f64),
}

impl NumberValue {
    /// Build a canonical rational. Fails with `DivisionByZero` on a zero
    /// denominator (`BigRational::new` would panic).
    pub fn rational(numer: BigInt, denom: BigInt) -> Result<Self, NumericError> {
        if denom.is_zero() {
            return Err(NumericError::DivisionByZero);
        }
        Ok(NumberValue::Rational(BigRational::new(numer, denom)))
    }

    /// Representation name used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            NumberValue::Integer(_) => "integer",
            NumberValue::Rational(_) => "rational",
            NumberValue::Double(_) => "double",
        }
    }

    pub fn is_exact(&self) -> bool {
        !matches!(self, NumberValue::Double(_))
    }

    /// Lossy view for float arithmetic. Exact values far outside binary64
    /// range saturate to ±∞, matching IEEE semantics for the declared-
    /// double path that is the only consumer.
    pub fn as_f64(&self) -> f64 {
        match self {
            NumberValue::Integer(i) => i.to_f64().unwrap_or(f64::NAN),
            NumberValue::Rational(r) => r.to_f64().unwrap_or(f64::NAN),
            NumberValue::Double(f) => *f,
        }
    }

    /// Exact view as a rational; `None` for `Double`.
    pub fn to_exact_rational(&self) -> Option<BigRational> {
        match self {
            NumberValue::Integer(i) => Some(BigRational::from_integer(i.clone())),
            NumberValue::Rational(r) => Some(r.clone()),
            NumberValue::Double(_) => None,
        }
    }

    /// The XSD type the evaluator tags a result of this representation
    /// with: `Integer` → `xsd:integer`, `Rational` → `xsd:decimal`,
    /// `Double` → `xsd:double`.
    pub fn result_tag(&self) -> XsdType {
        match self {
            NumberValue::Integer(_) => XsdType::Integer,
            NumberValue::Rational(_) => XsdType::Decimal,
            NumberValue::Double(_) => XsdType::Double,
        }
    }
}

impl From<i64> for NumberValue {
    fn from(v: i64) -> Self {
        NumberValue::Integer(BigInt::from(v))
    }
}

// ── Arithmetic ──────────────────────────────────────────────────────────

fn exact_pair(a: &NumberValue, b: &NumberValue) -> Option<(BigRational, BigRational)> {
    Some((a.to_exact_rational()?, b.to_exact_rational()?))
}

/// Shared shape of the three total ring ops: integer fast path, float
/// contagion, exact rational promotion otherwise.
fn ring_op<I, R>(a: &NumberValue, b: &NumberValue, int_op: I, rat_op: R, float_op: fn(f64, f64) -> f64) -> NumberValue
where
    I: Fn(&BigInt, &BigInt) -> BigInt,
    R: Fn(&BigRational, &BigRational) -> BigRational,
{
    match (a, b) {
        (NumberValue::Integer(x), NumberValue::Integer(y)) => NumberValue::Integer(int_op(x, y)),
        _ => match exact_pair(a, b) {
            Some((ra, rb)) => NumberValue::Rational(rat_op(&ra, &rb)),
            None => NumberValue::Double(float_op(a.as_f64(), b.as_f64())),
        },
    }
}

pub fn add(a: &NumberValue, b: &NumberValue) -> NumberValue {
    ring_op(a, b, |x, y| x + y, |x, y| x + y, |x, y| x + y)
}

pub fn sub(a: &NumberValue, b: &NumberValue) -> NumberValue {
    ring_op(a, b, |x, y| x - y, |x, y| x - y, |x, y| x - y)
}

pub fn mul(a: &NumberValue, b: &NumberValue) -> NumberValue {
    ring_op(a, b, |x, y| x * y, |x, y| x * y, |x, y| x * y)
}

pub fn neg(a: &NumberValue) -> NumberValue {
    match a {
        NumberValue::Integer(x) => NumberValue::Integer(-x),
        NumberValue::Rational(r) => NumberValue::Rational(-r),
        NumberValue::Double(f) => NumberValue::Double(-f),
    }
}

/// Exact division. Over exact operands the result is **always** a
/// `Rational`, even when the quotient is integral; the `xsd:decimal`
/// result tag depends on it. Over doubles this is IEEE division: ±∞ and
/// NaN are representable values here and only fault at emission.
pub fn divide(a: &NumberValue, b: &NumberValue) -> Result<NumberValue, NumericError> {
    match exact_pair(a, b) {
        Some((ra, rb)) => {
            if rb.is_zero() {
                return Err(NumericError::DivisionByZero);
            }
            Ok(NumberValue::Rational(ra / rb))
        }
        None => Ok(NumberValue::Double(a.as_f64() / b.as_f64())),
    }
}

/// Integer division, truncated toward zero. Both operands must already be
/// `Integer`; anything else is a domain error, not a coercion site.
pub fn int_div(a: &NumberValue, b: &NumberValue) -> Result<NumberValue, NumericError> {
    let (x, y) = match (a, b) {
        (NumberValue::Integer(x), NumberValue::Integer(y)) => (x, y),
        (NumberValue::Integer(_), other) | (other, _) => {
            return Err(NumericError::TypeError {
                op: "div",
                expected: "integer",
                got: other.kind_name().into(),
            })
        }
    };
    if y.is_zero() {
        return Err(NumericError::DivisionByZero);
    }
    // BigInt `/` truncates toward zero, same as native integer division.
    Ok(NumberValue::Integer(x / y))
}

fn pow_exponent(e: &BigInt) -> Result<u32, NumericError> {
    e.magnitude()
        .to_u32()
        .ok_or(NumericError::NumericFault("exponent out of range"))
}

/// Exponentiation. The exponent must be an `Integer`; a non-negative
/// exponent over an exact base stays exact (repeated squaring inside
/// `BigInt::pow`), a negative exponent over an exact base produces the
/// reciprocal `Rational`. A `Double` on either side goes through `powf`.
pub fn pow(base: &NumberValue, exp: &NumberValue) -> Result<NumberValue, NumericError> {
    match (base, exp) {
        // A rational exponent is outside the operator's domain no matter
        // what the base is.
        (_, NumberValue::Rational(_)) => Err(NumericError::TypeError {
            op: "exp",
            expected: "integer",
            got: "rational".into(),
        }),
        (NumberValue::Double(b), _) => Ok(NumberValue::Double(b.powf(exp.as_f64()))),
        (_, NumberValue::Double(e)) => Ok(NumberValue::Double(base.as_f64().powf(*e))),
        (NumberValue::Integer(b), NumberValue::Integer(e)) => {
            let mag = pow_exponent(e)?;
            if e.is_negative() {
                // x^-n = 1 / x^n; a zero base has no reciprocal.
                if b.is_zero() {
                    return Err(NumericError::DivisionByZero);
                }
                Ok(NumberValue::Rational(
                    BigRational::from_integer(b.pow(mag)).recip(),
                ))
            } else {
                Ok(NumberValue::Integer(b.pow(mag)))
            }
        }
        (NumberValue::Rational(r), NumberValue::Integer(e)) => {
            let mag = pow_exponent(e)?;
            if e.is_negative() && r.is_zero() {
                return Err(NumericError::DivisionByZero);
            }
            let powed = BigRational::new(r.numer().pow(mag), r.denom().pow(mag));
            Ok(NumberValue::Rational(if e.is_negative() {
                powed.recip()
            } else {
                powed
            }))
        }
    }
}

/// Floor toward −∞. `Rational` floors to an `Integer`; a `Double` must be
/// finite to cross back into the exact domain.
pub fn floor(a: &NumberValue) -> Result<NumberValue, NumericError> {
    match a {
        NumberValue::Integer(i) => Ok(NumberValue::Integer(i.clone())),
        NumberValue::Rational(r) => Ok(NumberValue::Integer(r.floor().to_integer())),
        NumberValue::Double(f) => {
            if f.is_nan() || f.is_infinite() {
                return Err(NumericError::NumericFault("floor of non-finite double"));
            }
            let i = BigInt::from_f64(f.floor())
                .ok_or(NumericError::NumericFault("floor of non-finite double"))?;
            Ok(NumberValue::Integer(i))
        }
    }
}

/// Numeric comparison across representations. `None` only when a NaN is
/// involved.
pub fn compare(a: &NumberValue, b: &NumberValue) -> Option<Ordering> {
    match exact_pair(a, b) {
        Some((ra, rb)) => Some(ra.cmp(&rb)),
        None => a.as_f64().partial_cmp(&b.as_f64()),
    }
}

/// Numeric equality across representations (`Integer(2)` equals
/// `Rational(2,1)` here, unlike structural `==`).
pub fn num_eq(a: &NumberValue, b: &NumberValue) -> bool {
    compare(a, b) == Some(Ordering::Equal)
}

// ── Tests ───────────────────────────────────────────────────────────────
