//! Lexical ingestion of numeric forms.
//!
//! Three entry points, one rule: an exact type never passes through a
//! float. JSON number tokens arrive as their exact source byte sequence
//! (serde_json's arbitrary-precision `Number` preserves the text), decimal
//! strings become `Rational(n, 10^k)` by digit surgery, and scientific
//! notation is an exact power-of-ten shift. Only `xsd:double` and
//! `xsd:float` lexical forms go through binary64, because that is what
//! those types mean.

use num_bigint::BigInt;
use num_rational::BigRational;
use qv_num::{NumberValue, NumericError, XsdType};
use serde_json::Value;

/// Bounds the `10^|e|` materialization for scientific notation. Larger
/// exponents are lexically valid but cannot be held without pathological
/// allocation, so they are rejected as malformed.
const MAX_EXPONENT_MAGNITUDE: i64 = 100_000;

// ── Token scanning ──────────────────────────────────────────────────────

/// A number token split into its lexical pieces. Digits are kept as the
/// source slices; nothing is evaluated yet.
struct TokenParts<'a> {
    negative: bool,
    int_digits: &'a str,
    frac_digits: &'a str,
    /// `None` when the token had no exponent marker.
    exponent: Option<i64>,
    /// Distinguishes `5` from `5.`; both have empty `frac_digits`.
    had_point: bool,
}

impl TokenParts<'_> {
    fn is_integer_shaped(&self) -> bool {
        !self.had_point && self.exponent.is_none()
    }
}

fn malformed(token: &str) -> NumericError {
    NumericError::MalformedNumeric(token.into())
}

fn scan_token(token: &str) -> Result<TokenParts<'_>, NumericError> {
    let bytes = token.as_bytes();
    let mut pos = 0;

    let negative = match bytes.first() {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };

    let int_start = pos;
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    let int_digits = &token[int_start..pos];

    let mut had_point = false;
    let mut frac_digits = "";
    if pos < bytes.len() && bytes[pos] == b'.' {
        had_point = true;
        pos += 1;
        let frac_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        frac_digits = &token[frac_start..pos];
    }

    if int_digits.is_empty() && frac_digits.is_empty() {
        return Err(malformed(token));
    }

    let mut exponent = None;
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        pos += 1;
        let exp_start = pos;
        if pos < bytes.len() && (bytes[pos] == b'-' || bytes[pos] == b'+') {
            pos += 1;
        }
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        let exp_str = &token[exp_start..pos];
        if exp_str.is_empty() || exp_str.ends_with(['-', '+']) {
            return Err(malformed(token));
        }
        let e: i64 = exp_str.parse().map_err(|_| malformed(token))?;
        if e.abs() > MAX_EXPONENT_MAGNITUDE {
            return Err(malformed(token));
        }
        exponent = Some(e);
    }

    if pos != bytes.len() {
        return Err(malformed(token));
    }

    Ok(TokenParts {
        negative,
        int_digits,
        frac_digits,
        exponent,
        had_point,
    })
}

// ── Exact materialization ───────────────────────────────────────────────

fn pow10(k: u32) -> BigInt {
    BigInt::from(10u32).pow(k)
}

/// Digits-minus-the-point mantissa over `10^k`, then the exact exponent
/// shift. Never touches `f64`.
fn exact_value(parts: &TokenParts<'_>) -> Result<NumberValue, NumericError> {
    let mut digits = String::with_capacity(parts.int_digits.len() + parts.frac_digits.len() + 1);
    if parts.negative {
        digits.push('-');
    }
    digits.push_str(parts.int_digits);
    digits.push_str(parts.frac_digits);
    let mantissa: BigInt = digits
        .parse()
        .map_err(|_| NumericError::MalformedNumeric(digits.clone()))?;

    let shift = parts.exponent.unwrap_or(0) - parts.frac_digits.len() as i64;
    if shift >= 0 {
        Ok(NumberValue::Rational(BigRational::from_integer(
            mantissa * pow10(shift as u32),
        )))
    } else {
        NumberValue::rational(mantissa, pow10((-shift) as u32))
    }
}

// ── Public API ──────────────────────────────────────────────────────────

/// Parse the exact source byte sequence of a JSON number token.
///
/// Integer tokens (no point, no exponent) become `Integer`; everything
/// else becomes an exact `Rational`.
pub fn parse_number_token(token: &str) -> Result<NumberValue, NumericError> {
    let parts = scan_token(token)?;
    if parts.is_integer_shaped() {
        let i: BigInt = token.parse().map_err(|_| malformed(token))?;
        Ok(NumberValue::Integer(i))
    } else {
        exact_value(&parts)
    }
}

/// Parse a lexical form under a declared XSD type.
pub fn parse_typed(lexical: &str, declared: XsdType) -> Result<NumberValue, NumericError> {
    match declared {
        XsdType::Integer => {
            let body = lexical
                .strip_prefix(['+', '-'])
                .unwrap_or(lexical);
            if !body.is_empty() && body.bytes().all(|b| b.is_ascii_digit()) {
                let i: BigInt = lexical.parse().map_err(|_| malformed(lexical))?;
                return Ok(NumberValue::Integer(i));
            }
            // A well-formed number that is not an integer lexical form is
            // a declared-type violation, not a malformed token.
            if scan_token(lexical).is_ok() {
                Err(NumericError::TypeMismatch {
                    expected: XsdType::Integer.as_str().into(),
                    got: lexical.into(),
                })
            } else {
                Err(malformed(lexical))
            }
        }
        XsdType::Decimal => {
            let parts = scan_token(lexical)?;
            if parts.exponent.is_some() {
                // xsd:decimal has no exponent in its lexical space.
                return Err(NumericError::TypeMismatch {
                    expected: XsdType::Decimal.as_str().into(),
                    got: lexical.into(),
                });
            }
            exact_value(&parts)
        }
        XsdType::Double | XsdType::Float => parse_float_lexical(lexical),
    }
}

/// The only admissible float ingress: `xsd:double` / `xsd:float` lexical
/// forms, including the XSD special values. Non-finite results are legal
/// here and fault later if they reach the wire.
fn parse_float_lexical(lexical: &str) -> Result<NumberValue, NumericError> {
    let f = match lexical {
        "NaN" => f64::NAN,
        "INF" | "+INF" => f64::INFINITY,
        "-INF" => f64::NEG_INFINITY,
        _ => lexical.parse::<f64>().map_err(|_| malformed(lexical))?,
    };
    Ok(NumberValue::Double(f))
}

/// Parse a literal as it arrives from the query layer: either a bare JSON
/// number or a typed-literal dict `{"@type": T, "@value": V}`.
pub fn parse_literal(value: &Value) -> Result<(NumberValue, XsdType), NumericError> {
    match value {
        Value::Number(n) => {
            let token = n.to_string();
            let nv = parse_number_token(&token)?;
            let tag = nv.result_tag();
            Ok((nv, tag))
        }
        Value::Object(map) => {
            let type_name = map
                .get("@type")
                .and_then(Value::as_str)
                .ok_or_else(|| NumericError::MalformedNumeric("typed literal without @type".into()))?;
            let declared = XsdType::from_name(type_name)?;
            let nv = match map.get("@value") {
                Some(Value::String(s)) => parse_typed(s, declared)?,
                Some(Value::Number(n)) => parse_typed(&n.to_string(), declared)?,
                _ => {
                    return Err(NumericError::MalformedNumeric(
                        "typed literal without numeric @value".into(),
                    ))
                }
            };
            Ok((nv, declared))
        }
        other => Err(NumericError::MalformedNumeric(other.to_string())),
    }
}

// ── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn rat(n: i64, d: i64) -> NumberValue {
        NumberValue::rational(BigInt::from(n), BigInt::from(d)).unwrap()
    }

    // --- number tokens ---

    #[test]
    fn integer_token() {
        assert_eq!(parse_number_token("42").unwrap(), NumberValue::from(42));
        assert_eq!(parse_number_token("-7").unwrap(), NumberValue::from(-7));
    }

    #[test]
    fn integer_token_beyond_native_width() {
        let nv = parse_number_token("99999999999999999999").unwrap();
        assert_eq!(
            nv,
            NumberValue::Integer("99999999999999999999".parse().unwrap())
        );
    }

    #[test]
    fn decimal_token_is_exact_rational() {
        assert_eq!(parse_number_token("0.1").unwrap(), rat(1, 10));
        assert_eq!(parse_number_token("-0.5").unwrap(), rat(-1, 2));
        assert_eq!(parse_number_token("12.345").unwrap(), rat(12345, 1000));
    }

    #[test]
    fn decimal_point_only_forms() {
        assert_eq!(parse_number_token(".5").unwrap(), rat(1, 2));
        assert_eq!(parse_number_token("5.").unwrap(), rat(5, 1));
    }

    #[test]
    fn scientific_notation_is_exact() {
        assert_eq!(parse_number_token("1.5e3").unwrap(), rat(1500, 1));
        assert_eq!(parse_number_token("1e3").unwrap(), rat(1000, 1));
        assert_eq!(parse_number_token("25e-3").unwrap(), rat(1, 40));
        assert_eq!(parse_number_token("-2.5E-1").unwrap(), rat(-1, 4));
    }

    #[test]
    fn malformed_tokens_rejected() {
        for bad in ["", "-", "+", ".", "1.2.3", "1e", "1e+", "e5", "1x", "--5", "0.1 "] {
            assert!(
                matches!(
                    parse_number_token(bad),
                    Err(NumericError::MalformedNumeric(_))
                ),
                "expected malformed: {bad:?}"
            );
        }
    }

    #[test]
    fn absurd_exponent_rejected() {
        assert!(parse_number_token("1e2000000000").is_err());
    }

    // --- typed lexical forms ---

    #[test]
    fn typed_integer_arbitrary_length() {
        let nv = parse_typed("123456789012345678901234567890", XsdType::Integer).unwrap();
        assert_eq!(
            nv,
            NumberValue::Integer("123456789012345678901234567890".parse().unwrap())
        );
        assert_eq!(
            parse_typed("+5", XsdType::Integer).unwrap(),
            NumberValue::from(5)
        );
    }

    #[test]
    fn typed_integer_rejects_fractional_form() {
        assert!(matches!(
            parse_typed("5.5", XsdType::Integer).unwrap_err(),
            NumericError::TypeMismatch { .. }
        ));
        // even a zero fraction is not in xsd:integer's lexical space
        assert!(matches!(
            parse_typed("5.0", XsdType::Integer).unwrap_err(),
            NumericError::TypeMismatch { .. }
        ));
        assert!(matches!(
            parse_typed("1e3", XsdType::Integer).unwrap_err(),
            NumericError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn typed_integer_garbage_is_malformed() {
        assert!(matches!(
            parse_typed("abc", XsdType::Integer).unwrap_err(),
            NumericError::MalformedNumeric(_)
        ));
    }

    #[test]
    fn typed_decimal_preserves_scale_exactly() {
        assert_eq!(parse_typed("0.075", XsdType::Decimal).unwrap(), rat(3, 40));
        assert_eq!(parse_typed("5", XsdType::Decimal).unwrap(), rat(5, 1));
    }

    #[test]
    fn typed_decimal_rejects_exponent() {
        assert!(matches!(
            parse_typed("1e3", XsdType::Decimal).unwrap_err(),
            NumericError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn typed_double_goes_through_binary64() {
        let nv = parse_typed("0.1", XsdType::Double).unwrap();
        assert!(matches!(nv, NumberValue::Double(f) if f == 0.1));
    }

    #[test]
    fn typed_double_special_forms() {
        assert!(
            matches!(parse_typed("NaN", XsdType::Double).unwrap(), NumberValue::Double(f) if f.is_nan())
        );
        assert!(
            matches!(parse_typed("INF", XsdType::Float).unwrap(), NumberValue::Double(f) if f == f64::INFINITY)
        );
        assert!(
            matches!(parse_typed("-INF", XsdType::Double).unwrap(), NumberValue::Double(f) if f == f64::NEG_INFINITY)
        );
    }

    // --- literal dispatch ---

    #[test]
    fn bare_number_literal_tags_by_shape() {
        let v: Value = serde_json::from_str("3").unwrap();
        let (nv, tag) = parse_literal(&v).unwrap();
        assert_eq!(nv, NumberValue::from(3));
        assert_eq!(tag, XsdType::Integer);

        let v: Value = serde_json::from_str("0.25").unwrap();
        let (nv, tag) = parse_literal(&v).unwrap();
        assert_eq!(nv, rat(1, 4));
        assert_eq!(tag, XsdType::Decimal);
    }

    #[test]
    fn bare_number_literal_preserves_big_digits() {
        // Without arbitrary-precision JSON this would collapse through f64.
        let v: Value = serde_json::from_str("99999999999999999999").unwrap();
        let (nv, _) = parse_literal(&v).unwrap();
        assert_eq!(
            nv,
            NumberValue::Integer("99999999999999999999".parse().unwrap())
        );
    }

    #[test]
    fn typed_literal_dict() {
        let v: Value =
            serde_json::from_str(r#"{"@type": "xsd:decimal", "@value": "0.1"}"#).unwrap();
        let (nv, tag) = parse_literal(&v).unwrap();
        assert_eq!(nv, rat(1, 10));
        assert_eq!(tag, XsdType::Decimal);

        let v: Value = serde_json::from_str(r#"{"@type": "xsd:integer", "@value": 7}"#).unwrap();
        let (nv, tag) = parse_literal(&v).unwrap();
        assert_eq!(nv, NumberValue::from(7));
        assert_eq!(tag, XsdType::Integer);
    }

    #[test]
    fn bare_scientific_number_tags_decimal() {
        let v: Value = serde_json::from_str("1.5e3").unwrap();
        let (nv, tag) = parse_literal(&v).unwrap();
        assert_eq!(nv, rat(1500, 1));
        assert_eq!(tag, XsdType::Decimal);
    }

    #[test]
    fn typed_double_accepts_number_payload() {
        let v: Value = serde_json::from_str(r#"{"@type": "xsd:double", "@value": 0.1}"#).unwrap();
        let (nv, tag) = parse_literal(&v).unwrap();
        assert!(matches!(nv, NumberValue::Double(f) if f == 0.1));
        assert_eq!(tag, XsdType::Double);
    }

    #[test]
    fn typed_literal_unknown_type_rejected() {
        let v: Value = serde_json::from_str(r#"{"@type": "xsd:string", "@value": "5"}"#).unwrap();
        assert!(matches!(
            parse_literal(&v).unwrap_err(),
            NumericError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn non_numeric_literal_rejected() {
        let v: Value = serde_json::from_str(r#""hello""#).unwrap();
        assert!(matches!(
            parse_literal(&v).unwrap_err(),
            NumericError::MalformedNumeric(_)
        ));
    }

    // --- properties ---

    use proptest::prelude::*;

    proptest! {
        /// A decimal literal `i.f` is exactly the rational formed by the
        /// digits over 10^|f|.
        #[test]
        fn decimal_literal_matches_digit_surgery(
            int_part in 0u64..1_000_000,
            frac in "[0-9]{1,12}",
        ) {
            let token = format!("{int_part}.{frac}");
            let parsed = parse_number_token(&token).unwrap();
            let mantissa: BigInt = format!("{int_part}{frac}").parse().unwrap();
            let expected = NumberValue::rational(
                mantissa,
                BigInt::from(10u32).pow(frac.len() as u32),
            )
            .unwrap();
            prop_assert_eq!(parsed, expected);
        }

        /// Scientific notation equals the plain token shifted by 10^e.
        #[test]
        fn scientific_matches_shift(m in 1u64..1_000_000, e in 0u32..10) {
            let sci = parse_number_token(&format!("{m}e{e}")).unwrap();
            let plain = parse_number_token(&format!("{m}")).unwrap();
            let shift = NumberValue::Integer(BigInt::from(10u32).pow(e));
            prop_assert!(qv_num::num_eq(&sci, &qv_num::mul(&plain, &shift)));
        }

        /// Exact parses never produce a Double.
        #[test]
        fn exact_tokens_never_float(int_part in 0u64..10_000, frac in "[0-9]{1,8}") {
            let nv = parse_number_token(&format!("{int_part}.{frac}")).unwrap();
            prop_assert!(nv.is_exact());
        }
    }
}
