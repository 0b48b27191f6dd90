//! Typed projection and digit-faithful JSON emission.
//!
//! The projector turns `(NumberValue, declared type)` into a `WireForm`, a
//! digit-level decomposition of the number. The emitter assembles the JSON
//! number token byte-by-byte from that decomposition; exact values never
//! meet a float formatter, so what was stored is what goes on the wire.

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use qv_num::{NumberValue, NumericError, XsdType};
use serde_json::Value;

/// Minimum count of fractional digits emitted for a rational whose decimal
/// expansion does not terminate. 20 digits safely exceeds the 17 needed
/// for a binary64 round-trip and gives decimal-arithmetic clients a stable
/// precision floor for repeating expansions.
pub const DECIMAL_DIGITS: usize = 20;

// ── WireForm ────────────────────────────────────────────────────────────

/// The intermediate representation between projector and emitter.
///
/// Digit strings hold ASCII decimal digits only. `digits` and `int_digits`
/// carry no leading zeros (other than a lone `0`); `frac_digits` may carry
/// leading and trailing zeros, which are significant.
#[derive(Debug, Clone, PartialEq)]
pub enum WireForm {
    Int {
        negative: bool,
        digits: String,
    },
    Dec {
        negative: bool,
        int_digits: String,
        frac_digits: String,
    },
    Double(f64),
}

fn wire_int(i: &BigInt) -> WireForm {
    WireForm::Int {
        negative: i.is_negative(),
        digits: i.magnitude().to_string(),
    }
}

// ── Projection ──────────────────────────────────────────────────────────

/// Minimal `k` with `d | 10^k`, or `None` when the expansion of `1/d`
/// does not terminate (i.e. `d` has a prime factor other than 2 and 5).
fn terminating_scale(denom: &BigInt) -> Option<u32> {
    let mut d = denom.clone();
    let two = BigInt::from(2);
    let five = BigInt::from(5);
    let mut twos = 0u32;
    let mut fives = 0u32;
    while (&d % &two).is_zero() {
        d /= &two;
        twos += 1;
    }
    while (&d % &five).is_zero() {
        d /= &five;
        fives += 1;
    }
    if d.is_one() {
        Some(twos.max(fives))
    } else {
        None
    }
}

fn pow10(k: u32) -> BigInt {
    BigInt::from(10u32).pow(k)
}

/// Exact terminating expansion with exactly `k` fractional digits.
fn terminating_decimal(n: &BigInt, d: &BigInt, k: u32, negative: bool) -> WireForm {
    let scaled = n * pow10(k) / d;
    let mut s = scaled.to_string();
    let k = k as usize;
    if s.len() <= k {
        let mut padded = "0".repeat(k + 1 - s.len());
        padded.push_str(&s);
        s = padded;
    }
    let split = s.len() - k;
    WireForm::Dec {
        negative,
        int_digits: s[..split].to_string(),
        frac_digits: s[split..].to_string(),
    }
}

/// Long-division rendering to exactly `DECIMAL_DIGITS` fractional digits,
/// truncated toward zero. Works on magnitudes; the sign rides alongside.
fn repeating_decimal(n: &BigInt, d: &BigInt, negative: bool) -> WireForm {
    let (int_part, mut rem) = n.div_rem(d);
    let ten = BigInt::from(10);
    let mut frac = String::with_capacity(DECIMAL_DIGITS);
    for _ in 0..DECIMAL_DIGITS {
        rem *= &ten;
        let (q, r) = rem.div_rem(d);
        // q < 10: rem was < d before the multiply
        frac.push(char::from(b'0' + q.to_u8().unwrap_or(0)));
        rem = r;
    }
    WireForm::Dec {
        negative,
        int_digits: int_part.to_string(),
        frac_digits: frac,
    }
}

fn project_decimal(r: &BigRational) -> WireForm {
    let negative = r.numer().is_negative();
    let n = BigInt::from(r.numer().magnitude().clone());
    let d = r.denom();
    match terminating_scale(d) {
        Some(0) => wire_int(&r.to_integer()),
        Some(k) => terminating_decimal(&n, d, k, negative),
        None => repeating_decimal(&n, d, negative),
    }
}

/// Choose the on-wire representation for a value under its declared type.
///
/// Integers render with all digits under any declared type: no scientific
/// notation, no truncation, regardless of magnitude. A non-integral
/// rational under `xsd:integer` is a domain error; a pairing that crosses
/// the exact/floating divide is a declared-type mismatch.
pub fn project(nv: &NumberValue, declared: XsdType) -> Result<WireForm, NumericError> {
    match (nv, declared) {
        (NumberValue::Integer(i), _) => Ok(wire_int(i)),
        (NumberValue::Rational(r), XsdType::Decimal) => Ok(project_decimal(r)),
        (NumberValue::Rational(r), XsdType::Integer) => {
            if r.is_integer() {
                Ok(wire_int(&r.to_integer()))
            } else {
                Err(NumericError::TypeError {
                    op: "project",
                    expected: "integer",
                    got: "rational".into(),
                })
            }
        }
        (NumberValue::Double(f), t) if t.is_floating() => Ok(WireForm::Double(*f)),
        (nv, t) => Err(NumericError::TypeMismatch {
            expected: t.as_str().into(),
            got: nv.kind_name().into(),
        }),
    }
}

// ── Emission ────────────────────────────────────────────────────────────

/// Append the JSON number token for `form` to `out`, byte by byte.
///
/// Exact forms are assembled from their digit strings. A `Double` is the
/// one place a float formatter runs, emitting the shortest decimal that
/// round-trips through binary64; non-finite values have no JSON number
/// representation and fault.
pub fn emit(form: &WireForm, out: &mut Vec<u8>) -> Result<(), NumericError> {
    match form {
        WireForm::Int { negative, digits } => {
            if *negative {
                out.push(b'-');
            }
            out.extend_from_slice(digits.as_bytes());
        }
        WireForm::Dec {
            negative,
            int_digits,
            frac_digits,
        } => {
            if *negative {
                out.push(b'-');
            }
            out.extend_from_slice(int_digits.as_bytes());
            if !frac_digits.is_empty() {
                out.push(b'.');
                out.extend_from_slice(frac_digits.as_bytes());
            }
        }
        WireForm::Double(f) => {
            if !f.is_finite() {
                return Err(NumericError::NumericFault(
                    "non-finite double has no JSON representation",
                ));
            }
            out.extend_from_slice(f.to_string().as_bytes());
        }
    }
    Ok(())
}

pub fn emit_to_string(form: &WireForm) -> Result<String, NumericError> {
    let mut buf = Vec::new();
    emit(form, &mut buf)?;
    // the emitter writes ASCII only
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Wrap the emitted token as a `serde_json::Number` so it can embed in a
/// `Value` result. With arbitrary-precision JSON the token text is stored
/// verbatim; no float re-parse happens here.
pub fn wire_number(form: &WireForm) -> Result<serde_json::Number, NumericError> {
    let token = emit_to_string(form)?;
    match serde_json::from_str::<Value>(&token) {
        Ok(Value::Number(n)) => Ok(n),
        _ => Err(NumericError::MalformedNumeric(token)),
    }
}

/// The typed-literal form used in query bindings:
/// `{"@type": <declared>, "@value": <JSON number>}` with a digit-faithful
/// value. Both the compute path and the graph-pattern read path emit
/// their results through this.
pub fn typed_literal(nv: &NumberValue, declared: XsdType) -> Result<Value, NumericError> {
    let form = project(nv, declared)?;
    let number = wire_number(&form)?;
    Ok(serde_json::json!({ "@type": declared.as_str(), "@value": number }))
}

// ── Read path ───────────────────────────────────────────────────────────

/// Project one stored literal into its wire value. Called per numeric
/// field during document read: resolve the declared type, parse the
/// lexical form exactly, project, and hand back a digit-faithful JSON
/// number.
pub fn project_stored_literal(raw: &str, xsd_type: &str) -> Result<Value, NumericError> {
    let declared = XsdType::from_name(xsd_type)?;
    let nv = qv_lexical::parse_typed(raw, declared)?;
    let form = project(&nv, declared)?;
    let n = wire_number(&form)?;
    tracing::debug!(xsd = xsd_type, token = %n, "projected stored literal");
    Ok(Value::Number(n))
}

// ── Tests ───────────────────────────────────────────────────────────────
