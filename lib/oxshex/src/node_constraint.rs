//! Node constraint evaluation.
//!
//! A node constraint only looks at the focus node itself and never at the graph.

use std::collections::hash_map::Entry;

use oxrdf::Term;
use regex::Regex;
use rustc_hash::FxHashMap;

use crate::error::ShexValidationError;
use crate::limits::ValidationLimits;
use crate::model::{NodeConstraint, NumericFacet, StringFacet, ValueSetValue};
use crate::value::{Parsed, TypedValue};

/// Cache of compiled regular expressions, keyed by pattern and flags.
#[derive(Debug, Default)]
pub(crate) struct RegexCache {
    regexes: FxHashMap<(String, Option<String>), Regex>,
}

impl RegexCache {
    /// Gets or compiles a regular expression with optional flags (`i`, `m`, `s` and `x`).
    pub(crate) fn get_or_compile(
        &mut self,
        pattern: &str,
        flags: Option<&str>,
        limits: &ValidationLimits,
    ) -> Result<&Regex, ShexValidationError> {
        match self
            .regexes
            .entry((pattern.to_owned(), flags.map(ToOwned::to_owned)))
        {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                limits.check_regex_length(pattern)?;
                let mut regex_pattern = String::new();
                if let Some(f) = flags {
                    for flag in ['i', 'm', 's', 'x'] {
                        if f.contains(flag) {
                            regex_pattern.push_str("(?");
                            regex_pattern.push(flag);
                            regex_pattern.push(')');
                        }
                    }
                }
                regex_pattern.push_str(pattern);
                let regex = Regex::new(&regex_pattern)
                    .map_err(|e| ShexValidationError::invalid_regex(pattern, e.to_string()))?;
                Ok(entry.insert(regex))
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.regexes.clear();
    }
}

/// Returns true if `node` satisfies every part of the constraint.
pub(crate) fn satisfies_node_constraint(
    node: &Term,
    constraint: &NodeConstraint,
    regexes: &mut RegexCache,
    limits: &ValidationLimits,
) -> Result<bool, ShexValidationError> {
    if let Some(node_kind) = &constraint.node_kind {
        if !node_kind.matches(node) {
            return Ok(false);
        }
    }

    if let Some(datatype) = &constraint.datatype {
        let Term::Literal(literal) = node else {
            return Ok(false);
        };
        if literal.datatype() != datatype.as_ref()
            || TypedValue::from_literal(literal) == Parsed::Invalid
        {
            return Ok(false);
        }
    }

    for facet in &constraint.string_facets {
        let Some(lexical) = lexical_form(node) else {
            return Ok(false);
        };
        let satisfied = match facet {
            StringFacet::Length(length) => lexical.chars().count() == *length,
            StringFacet::MinLength(min) => lexical.chars().count() >= *min,
            StringFacet::MaxLength(max) => lexical.chars().count() <= *max,
            StringFacet::Pattern { pattern, flags } => regexes
                .get_or_compile(pattern, flags.as_deref(), limits)?
                .is_match(lexical),
        };
        if !satisfied {
            return Ok(false);
        }
    }

    if !constraint.numeric_facets.is_empty() {
        let Some(value) = TypedValue::from_term(node).filter(is_numeric) else {
            return Ok(false);
        };
        for facet in &constraint.numeric_facets {
            if !satisfies_numeric_facet(&value, facet) {
                return Ok(false);
            }
        }
    }

    if !constraint.values.is_empty() {
        limits.check_value_set_length(constraint.values.len())?;
        if !constraint.values.iter().any(|v| matches_value_set(node, v)) {
            return Ok(false);
        }
    }

    Ok(true)
}

fn satisfies_numeric_facet(value: &TypedValue, facet: &NumericFacet) -> bool {
    use std::cmp::Ordering;

    let compare = |bound: &oxrdf::Literal| match TypedValue::from_literal(bound) {
        Parsed::Valid(bound) => value.partial_cmp(&bound),
        Parsed::Invalid | Parsed::Unsupported => None,
    };
    match facet {
        NumericFacet::MinInclusive(min) => {
            matches!(compare(min), Some(Ordering::Greater | Ordering::Equal))
        }
        NumericFacet::MinExclusive(min) => compare(min) == Some(Ordering::Greater),
        NumericFacet::MaxInclusive(max) => {
            matches!(compare(max), Some(Ordering::Less | Ordering::Equal))
        }
        NumericFacet::MaxExclusive(max) => compare(max) == Some(Ordering::Less),
        NumericFacet::TotalDigits(total) => value.digits().is_some_and(|(t, _)| t <= *total),
        NumericFacet::FractionDigits(fraction) => {
            value.digits().is_some_and(|(_, f)| f <= *fraction)
        }
    }
}

fn is_numeric(value: &TypedValue) -> bool {
    matches!(
        value,
        TypedValue::Integer(_)
            | TypedValue::Decimal(_)
            | TypedValue::Float(_)
            | TypedValue::Double(_)
    )
}

/// The string the string facets apply to. Blank nodes have none.
fn lexical_form(term: &Term) -> Option<&str> {
    match term {
        Term::NamedNode(n) => Some(n.as_str()),
        Term::Literal(l) => Some(l.value()),
        _ => None,
    }
}

/// Checks if a term matches a value set value.
fn matches_value_set(term: &Term, value_set: &ValueSetValue) -> bool {
    match value_set {
        ValueSetValue::ObjectValue(val) => term == val,
        ValueSetValue::IriStem(stem) => {
            matches!(term, Term::NamedNode(n) if n.as_str().starts_with(stem.as_str()))
        }
        ValueSetValue::IriStemRange { stem, exclusions } => {
            matches!(term, Term::NamedNode(n) if n.as_str().starts_with(stem.as_str()))
                && !exclusions.iter().any(|ex| matches_value_set(term, ex))
        }
        ValueSetValue::LiteralStem(stem) => {
            matches!(term, Term::Literal(l) if l.value().starts_with(stem.as_str()))
        }
        ValueSetValue::LiteralStemRange { stem, exclusions } => {
            matches!(term, Term::Literal(l) if l.value().starts_with(stem.as_str()))
                && !exclusions.iter().any(|ex| matches_value_set(term, ex))
        }
        ValueSetValue::LanguageStem(stem) => has_language_stem(term, stem),
        ValueSetValue::LanguageStemRange { stem, exclusions } => {
            has_language_stem(term, stem)
                && !exclusions.iter().any(|ex| matches_value_set(term, ex))
        }
    }
}

/// Language tags match a stem case-insensitively, on a subtag boundary.
fn has_language_stem(term: &Term, stem: &str) -> bool {
    let Term::Literal(literal) = term else {
        return false;
    };
    let Some(language) = literal.language() else {
        return false;
    };
    if stem.is_empty() {
        return true;
    }
    let language = language.to_ascii_lowercase();
    let stem = stem.to_ascii_lowercase();
    language == stem
        || language
            .strip_prefix(&stem)
            .is_some_and(|rest| rest.starts_with('-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeKind;
    use oxrdf::vocab::xsd;
    use oxrdf::{BlankNode, Literal, NamedNode};

    fn check(node: &Term, constraint: &NodeConstraint) -> bool {
        satisfies_node_constraint(
            node,
            constraint,
            &mut RegexCache::default(),
            &ValidationLimits::default(),
        )
        .unwrap()
    }

    fn int(value: &str) -> Term {
        Literal::new_typed_literal(value, xsd::INTEGER).into()
    }

    #[test]
    fn test_empty_constraint_accepts_everything() {
        let constraint = NodeConstraint::new();
        assert!(check(&BlankNode::default().into(), &constraint));
        assert!(check(&int("1"), &constraint));
    }

    #[test]
    fn test_node_kind_and_datatype() {
        let iri: Term = NamedNode::new_unchecked("http://example.org/a").into();
        assert!(check(&iri, &NodeConstraint::with_node_kind(NodeKind::Iri)));
        assert!(!check(&int("1"), &NodeConstraint::with_node_kind(NodeKind::NonLiteral)));

        let integer = NodeConstraint::with_datatype(xsd::INTEGER.into_owned());
        assert!(check(&int("42"), &integer));
        assert!(!check(&int("forty-two"), &integer));
        assert!(!check(&Literal::new_simple_literal("42").into(), &integer));
        assert!(!check(&iri, &integer));
    }

    #[test]
    fn test_string_facets() {
        let constraint = NodeConstraint::new()
            .with_string_facet(StringFacet::MinLength(2))
            .with_string_facet(StringFacet::MaxLength(4));
        assert!(!check(&Literal::new_simple_literal("a").into(), &constraint));
        assert!(check(&Literal::new_simple_literal("abc").into(), &constraint));
        assert!(!check(&Literal::new_simple_literal("abcde").into(), &constraint));
        assert!(!check(&BlankNode::default().into(), &constraint));

        let exact = NodeConstraint::new().with_string_facet(StringFacet::Length(3));
        assert!(check(&Literal::new_simple_literal("été").into(), &exact));
    }

    #[test]
    fn test_pattern_with_flags() {
        let constraint = NodeConstraint::new().with_string_facet(StringFacet::Pattern {
            pattern: "^abc".to_owned(),
            flags: Some("i".to_owned()),
        });
        assert!(check(&Literal::new_simple_literal("ABCdef").into(), &constraint));
        assert!(!check(&Literal::new_simple_literal("xabc").into(), &constraint));
    }

    #[test]
    fn test_invalid_and_long_patterns() {
        let mut regexes = RegexCache::default();
        let invalid = NodeConstraint::new().with_string_facet(StringFacet::Pattern {
            pattern: "(".to_owned(),
            flags: None,
        });
        let result = satisfies_node_constraint(
            &Literal::new_simple_literal("a").into(),
            &invalid,
            &mut regexes,
            &ValidationLimits::default(),
        );
        assert!(matches!(result, Err(ShexValidationError::InvalidRegex { .. })));

        let long = NodeConstraint::new().with_string_facet(StringFacet::Pattern {
            pattern: "a".repeat(20),
            flags: None,
        });
        let result = satisfies_node_constraint(
            &Literal::new_simple_literal("a").into(),
            &long,
            &mut regexes,
            &ValidationLimits::default().with_max_regex_length(10),
        );
        assert!(matches!(result, Err(ShexValidationError::RegexTooLong { .. })));
    }

    #[test]
    fn test_numeric_facets() {
        let constraint = NodeConstraint::new()
            .with_numeric_facet(NumericFacet::MinInclusive(Literal::from(0)))
            .with_numeric_facet(NumericFacet::MaxExclusive(Literal::new_typed_literal(
                "10.5",
                xsd::DECIMAL,
            )));
        assert!(check(&int("0"), &constraint));
        assert!(check(&int("10"), &constraint));
        assert!(!check(&int("-1"), &constraint));
        assert!(!check(&Literal::new_typed_literal("10.5", xsd::DECIMAL).into(), &constraint));
        assert!(!check(&Literal::new_simple_literal("5").into(), &constraint));

        let digits = NodeConstraint::new()
            .with_numeric_facet(NumericFacet::TotalDigits(3))
            .with_numeric_facet(NumericFacet::FractionDigits(1));
        assert!(check(&Literal::new_typed_literal("12.5", xsd::DECIMAL).into(), &digits));
        assert!(!check(&Literal::new_typed_literal("1.25", xsd::DECIMAL).into(), &digits));
        assert!(!check(&int("1234"), &digits));
    }

    #[test]
    fn test_value_sets() {
        let iri: Term = NamedNode::new_unchecked("http://example.org/a").into();
        let constraint = NodeConstraint::with_values([ValueSetValue::IriStemRange {
            stem: "http://example.org/".to_owned(),
            exclusions: vec![ValueSetValue::ObjectValue(
                NamedNode::new_unchecked("http://example.org/b").into(),
            )],
        }]);
        assert!(check(&iri, &constraint));
        assert!(!check(
            &NamedNode::new_unchecked("http://example.org/b").into(),
            &constraint
        ));
        assert!(!check(
            &NamedNode::new_unchecked("http://other.org/a").into(),
            &constraint
        ));

        let languages = NodeConstraint::with_values([ValueSetValue::language_stem("en")]);
        let en_gb: Term = Literal::new_language_tagged_literal_unchecked("colour", "en-gb").into();
        let eno: Term = Literal::new_language_tagged_literal_unchecked("x", "eno").into();
        assert!(check(&en_gb, &languages));
        assert!(!check(&eno, &languages));

        let literals = NodeConstraint::with_values([ValueSetValue::literal_stem("ab")]);
        assert!(check(&Literal::new_simple_literal("abc").into(), &literals));
        assert!(!check(&iri, &literals));
    }

    #[test]
    fn test_value_set_limit() {
        let constraint = NodeConstraint::with_values([
            ValueSetValue::literal_stem("a"),
            ValueSetValue::literal_stem("b"),
        ]);
        let result = satisfies_node_constraint(
            &Literal::new_simple_literal("a").into(),
            &constraint,
            &mut RegexCache::default(),
            &ValidationLimits::default().with_max_value_set_length(1),
        );
        assert!(matches!(result, Err(ShexValidationError::ValueSetTooLong { .. })));
    }
}
