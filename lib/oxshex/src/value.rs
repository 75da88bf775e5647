//! Typed view of XSD literals, used for facets, datatype checks and formula comparisons.

use std::cmp::Ordering;

use oxrdf::vocab::xsd;
use oxrdf::{Literal, Term};
use oxsdatatypes::{Boolean, Date, DateTime, Decimal, Double, Duration, Float, Integer, Time};

/// The value of a literal of a supported XSD datatype.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TypedValue {
    String(String),
    Boolean(Boolean),
    Integer(Integer),
    Decimal(Decimal),
    Float(Float),
    Double(Double),
    DateTime(DateTime),
    Date(Date),
    Time(Time),
    Duration(Duration),
}

/// Result of reading a literal against its datatype.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Parsed {
    Valid(TypedValue),
    /// The datatype is supported but the lexical form is not valid for it.
    Invalid,
    /// The datatype is not one of the supported XSD datatypes.
    Unsupported,
}

impl TypedValue {
    pub(crate) fn from_literal(literal: &Literal) -> Parsed {
        if literal.language().is_some() {
            return Parsed::Unsupported;
        }
        let value = literal.value();
        let datatype = literal.datatype();
        let parsed = if datatype == xsd::STRING {
            Some(Self::String(value.to_owned()))
        } else if datatype == xsd::BOOLEAN {
            value.parse().ok().map(Self::Boolean)
        } else if datatype == xsd::DECIMAL {
            value.parse().ok().map(Self::Decimal)
        } else if datatype == xsd::FLOAT {
            value.parse().ok().map(Self::Float)
        } else if datatype == xsd::DOUBLE {
            value.parse().ok().map(Self::Double)
        } else if datatype == xsd::DATE_TIME || datatype == xsd::DATE_TIME_STAMP {
            value.parse().ok().map(Self::DateTime)
        } else if datatype == xsd::DATE {
            value.parse().ok().map(Self::Date)
        } else if datatype == xsd::TIME {
            value.parse().ok().map(Self::Time)
        } else if datatype == xsd::DURATION {
            value.parse().ok().map(Self::Duration)
        } else if let Some(range) = integer_range(datatype.as_str()) {
            value
                .parse::<Integer>()
                .ok()
                .filter(|i| range.contains(i64::from(*i)))
                .map(Self::Integer)
        } else {
            return Parsed::Unsupported;
        };
        parsed.map_or(Parsed::Invalid, Parsed::Valid)
    }

    /// Reads a term as a typed value if it is a valid literal of a supported datatype.
    pub(crate) fn from_term(term: &Term) -> Option<Self> {
        match term {
            Term::Literal(literal) => match Self::from_literal(literal) {
                Parsed::Valid(value) => Some(value),
                Parsed::Invalid | Parsed::Unsupported => None,
            },
            _ => None,
        }
    }

    /// Compares two values, numeric types being promoted as in XPath.
    pub(crate) fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self {
            Self::String(a) => match other {
                Self::String(b) => a.partial_cmp(b),
                _ => None,
            },
            Self::Boolean(a) => match other {
                Self::Boolean(b) => a.partial_cmp(b),
                _ => None,
            },
            Self::Float(a) => match other {
                Self::Float(b) => a.partial_cmp(b),
                Self::Double(b) => Double::from(*a).partial_cmp(b),
                Self::Integer(b) => a.partial_cmp(&Float::from(*b)),
                Self::Decimal(b) => a.partial_cmp(&(*b).into()),
                _ => None,
            },
            Self::Double(a) => match other {
                Self::Float(b) => a.partial_cmp(&(*b).into()),
                Self::Double(b) => a.partial_cmp(b),
                Self::Integer(b) => a.partial_cmp(&Double::from(*b)),
                Self::Decimal(b) => a.partial_cmp(&(*b).into()),
                _ => None,
            },
            Self::Integer(a) => match other {
                Self::Float(b) => Float::from(*a).partial_cmp(b),
                Self::Double(b) => Double::from(*a).partial_cmp(b),
                Self::Integer(b) => a.partial_cmp(b),
                Self::Decimal(b) => Decimal::from(*a).partial_cmp(b),
                _ => None,
            },
            Self::Decimal(a) => match other {
                Self::Float(b) => Float::from(*a).partial_cmp(b),
                Self::Double(b) => Double::from(*a).partial_cmp(b),
                Self::Integer(b) => a.partial_cmp(&Decimal::from(*b)),
                Self::Decimal(b) => a.partial_cmp(b),
                _ => None,
            },
            Self::DateTime(a) => match other {
                Self::DateTime(b) => a.partial_cmp(b),
                _ => None,
            },
            Self::Date(a) => match other {
                Self::Date(b) => a.partial_cmp(b),
                _ => None,
            },
            Self::Time(a) => match other {
                Self::Time(b) => a.partial_cmp(b),
                _ => None,
            },
            Self::Duration(a) => match other {
                Self::Duration(b) => a.partial_cmp(b),
                _ => None,
            },
        }
    }

    /// Lexical digits of a decimal value, as (total digits, fraction digits).
    pub(crate) fn digits(&self) -> Option<(u32, u32)> {
        let lexical = match self {
            Self::Integer(i) => i.to_string(),
            Self::Decimal(d) => d.to_string(),
            _ => return None,
        };
        let unsigned = lexical.trim_start_matches(['-', '+']);
        let (integer_part, fraction_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        let integer_part = integer_part.trim_start_matches('0');
        let fraction_part = fraction_part.trim_end_matches('0');
        let fraction = u32::try_from(fraction_part.len()).ok()?;
        let total = u32::try_from(integer_part.len()).ok()? + fraction;
        Some((total.max(1), fraction))
    }
}

/// Returns true if the term is a literal whose datatype has a total order.
///
/// Only such values may be bound to variables compared with `<`, `<=`, `>` or `>=`.
pub(crate) fn is_orderable(term: &Term) -> bool {
    matches!(
        TypedValue::from_term(term),
        Some(
            TypedValue::Integer(_)
                | TypedValue::Decimal(_)
                | TypedValue::Float(_)
                | TypedValue::Double(_)
                | TypedValue::String(_)
                | TypedValue::DateTime(_)
                | TypedValue::Date(_)
                | TypedValue::Time(_)
        )
    )
}

/// Compares two terms as typed literals.
pub(crate) fn compare_terms(a: &Term, b: &Term) -> Option<Ordering> {
    TypedValue::from_term(a)?.partial_cmp(&TypedValue::from_term(b)?)
}

#[derive(Debug, Clone, Copy)]
struct IntegerRange {
    min: Option<i64>,
    max: Option<i64>,
}

impl IntegerRange {
    fn contains(self, value: i64) -> bool {
        self.min.is_none_or(|min| min <= value) && self.max.is_none_or(|max| value <= max)
    }
}

fn integer_range(datatype: &str) -> Option<IntegerRange> {
    let (min, max) = match datatype {
        "http://www.w3.org/2001/XMLSchema#integer" | "http://www.w3.org/2001/XMLSchema#long" => {
            (None, None)
        }
        "http://www.w3.org/2001/XMLSchema#int" => {
            (Some(i64::from(i32::MIN)), Some(i64::from(i32::MAX)))
        }
        "http://www.w3.org/2001/XMLSchema#short" => {
            (Some(i64::from(i16::MIN)), Some(i64::from(i16::MAX)))
        }
        "http://www.w3.org/2001/XMLSchema#byte" => {
            (Some(i64::from(i8::MIN)), Some(i64::from(i8::MAX)))
        }
        "http://www.w3.org/2001/XMLSchema#unsignedLong"
        | "http://www.w3.org/2001/XMLSchema#nonNegativeInteger" => (Some(0), None),
        "http://www.w3.org/2001/XMLSchema#unsignedInt" => (Some(0), Some(i64::from(u32::MAX))),
        "http://www.w3.org/2001/XMLSchema#unsignedShort" => (Some(0), Some(i64::from(u16::MAX))),
        "http://www.w3.org/2001/XMLSchema#unsignedByte" => (Some(0), Some(i64::from(u8::MAX))),
        "http://www.w3.org/2001/XMLSchema#positiveInteger" => (Some(1), None),
        "http://www.w3.org/2001/XMLSchema#negativeInteger" => (None, Some(-1)),
        "http://www.w3.org/2001/XMLSchema#nonPositiveInteger" => (None, Some(0)),
        _ => return None,
    };
    Some(IntegerRange { min, max })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(value: &str, datatype: oxrdf::NamedNodeRef<'_>) -> Term {
        Literal::new_typed_literal(value, datatype).into()
    }

    #[test]
    fn test_lexical_validity() {
        let parse = |value, datatype| match typed(value, datatype) {
            Term::Literal(l) => TypedValue::from_literal(&l),
            _ => Parsed::Unsupported,
        };
        assert!(matches!(parse("12", xsd::INTEGER), Parsed::Valid(_)));
        assert_eq!(parse("twelve", xsd::INTEGER), Parsed::Invalid);
        assert_eq!(parse("300", xsd::BYTE), Parsed::Invalid);
        assert_eq!(parse("-1", xsd::NON_NEGATIVE_INTEGER), Parsed::Invalid);
        assert!(matches!(parse("2020-01-01", xsd::DATE), Parsed::Valid(_)));
        assert_eq!(parse("2020-13-01", xsd::DATE), Parsed::Invalid);
        assert_eq!(parse("x", xsd::ANY_URI), Parsed::Unsupported);
    }

    #[test]
    fn test_numeric_promotion() {
        assert_eq!(
            compare_terms(&typed("1", xsd::INTEGER), &typed("1.5", xsd::DECIMAL)),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_terms(&typed("2.0", xsd::DOUBLE), &typed("2", xsd::INTEGER)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            compare_terms(&typed("1", xsd::INTEGER), &Literal::new_simple_literal("1").into()),
            None
        );
    }

    #[test]
    fn test_orderable() {
        assert!(is_orderable(&typed("1", xsd::INTEGER)));
        assert!(is_orderable(&Literal::new_simple_literal("a").into()));
        assert!(!is_orderable(&typed("true", xsd::BOOLEAN)));
        assert!(!is_orderable(
            &oxrdf::NamedNode::new_unchecked("http://example.org/").into()
        ));
    }

    #[test]
    fn test_digits() {
        let digits = |term: Term| TypedValue::from_term(&term).and_then(|v| v.digits());
        assert_eq!(digits(typed("123.450", xsd::DECIMAL)), Some((5, 2)));
        assert_eq!(digits(typed("-0012", xsd::INTEGER)), Some((2, 0)));
        assert_eq!(digits(typed("0.5", xsd::DECIMAL)), Some((1, 1)));
        assert_eq!(digits(typed("1.5", xsd::DOUBLE)), None);
    }
}
