//! Type and format inference for annotation bodies.
//!
//! A body's IIIF `type` and `format` are resolved by walking an ordered
//! chain of rules. Each rule is a lookup over the [`AnnotationMapping`];
//! the first rule that answers wins, and a rule with nothing to say falls
//! through to the next one.
//!
//! | Order | Type rule                | Format rule                          |
//! |-------|--------------------------|--------------------------------------|
//! | 1     | explicit `type`          | explicit `format`                    |
//! | 2     | extension's first type   | extension + resolved type            |
//! | 3     | reverse lookup of format | extension's first format             |
//! | 4     |                          | motivation alone (single candidate)  |
//!
//! Explicit values are never overridden. Every answer carries its
//! [`Source`] so callers can log which rule produced a guess.

use crate::mapping::AnnotationMapping;

/// Which rule produced an inferred value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Explicit,
    Extension,
    ExtensionAndType,
    Format,
    Motivation,
}

/// An inferred value and the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inferred {
    pub value: String,
    pub source: Source,
}

impl Inferred {
    pub fn is_guess(&self) -> bool {
        self.source != Source::Explicit
    }
}

/// Everything known about a body before inference.
#[derive(Debug, Clone, Copy, Default)]
pub struct Facts<'a> {
    pub motivation: &'a str,
    /// Lowercase extension of the body reference, without the dot.
    pub extension: Option<&'a str>,
    pub explicit_type: Option<&'a str>,
    pub explicit_format: Option<&'a str>,
    /// Type as already resolved by the type chain; used by format rules.
    pub resolved_type: Option<&'a str>,
}

type Lookup = for<'m> fn(&'m AnnotationMapping, &Facts<'m>) -> Option<&'m str>;

struct Rule {
    source: Source,
    lookup: Lookup,
}

const TYPE_RULES: &[Rule] = &[
    Rule {
        source: Source::Explicit,
        lookup: explicit_type,
    },
    Rule {
        source: Source::Extension,
        lookup: type_from_extension,
    },
    Rule {
        source: Source::Format,
        lookup: type_from_format,
    },
];

const FORMAT_RULES: &[Rule] = &[
    Rule {
        source: Source::Explicit,
        lookup: explicit_format,
    },
    Rule {
        source: Source::ExtensionAndType,
        lookup: format_from_extension_and_type,
    },
    Rule {
        source: Source::Extension,
        lookup: format_from_extension,
    },
    Rule {
        source: Source::Motivation,
        lookup: format_from_motivation,
    },
];

fn explicit_type<'m>(_: &'m AnnotationMapping, facts: &Facts<'m>) -> Option<&'m str> {
    facts.explicit_type
}

fn type_from_extension<'m>(mapping: &'m AnnotationMapping, facts: &Facts<'m>) -> Option<&'m str> {
    mapping.type_by_extension(facts.motivation, facts.extension?)
}

fn type_from_format<'m>(mapping: &'m AnnotationMapping, facts: &Facts<'m>) -> Option<&'m str> {
    mapping.type_by_format(facts.motivation, facts.explicit_format?)
}

fn explicit_format<'m>(_: &'m AnnotationMapping, facts: &Facts<'m>) -> Option<&'m str> {
    facts.explicit_format
}

fn format_from_extension_and_type<'m>(
    mapping: &'m AnnotationMapping,
    facts: &Facts<'m>,
) -> Option<&'m str> {
    mapping.format_by_extension_and_type(facts.motivation, facts.extension?, facts.resolved_type?)
}

fn format_from_extension<'m>(
    mapping: &'m AnnotationMapping,
    facts: &Facts<'m>,
) -> Option<&'m str> {
    mapping.format_by_extension(facts.motivation, facts.extension?)
}

fn format_from_motivation<'m>(
    mapping: &'m AnnotationMapping,
    facts: &Facts<'m>,
) -> Option<&'m str> {
    mapping.format_by_type(facts.motivation)
}

fn evaluate<'m>(rules: &[Rule], mapping: &'m AnnotationMapping, facts: &Facts<'m>) -> Option<Inferred> {
    rules.iter().find_map(|rule| {
        (rule.lookup)(mapping, facts)
            .filter(|value| !value.is_empty())
            .map(|value| Inferred {
                value: value.to_string(),
                source: rule.source,
            })
    })
}

/// Resolve the body type.
pub fn infer_type<'m>(mapping: &'m AnnotationMapping, facts: &Facts<'m>) -> Option<Inferred> {
    evaluate(TYPE_RULES, mapping, facts)
}

/// Resolve the body format. Set `facts.resolved_type` first so the
/// extension + type rule can disambiguate multi-candidate extensions.
pub fn infer_format<'m>(mapping: &'m AnnotationMapping, facts: &Facts<'m>) -> Option<Inferred> {
    evaluate(FORMAT_RULES, mapping, facts)
}

/// Normalize a motivation as written in a sidecar.
///
/// Lowercases and drops a namespace prefix: `"oa:Painting"` → `"painting"`.
pub fn normalize_motivation(raw: &str) -> String {
    let trimmed = raw.trim();
    let local = trimmed
        .split_once(':')
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);
    local.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::PAINTING;

    fn facts<'a>(ext: Option<&'a str>, ty: Option<&'a str>, format: Option<&'a str>) -> Facts<'a> {
        Facts {
            motivation: PAINTING,
            extension: ext,
            explicit_type: ty,
            explicit_format: format,
            resolved_type: None,
        }
    }

    // =========================================================================
    // Type chain
    // =========================================================================

    #[test]
    fn explicit_type_is_never_overridden() {
        let mapping = AnnotationMapping::default();
        let inferred = infer_type(&mapping, &facts(Some("jpg"), Some("Dataset"), None)).unwrap();
        assert_eq!(inferred.value, "Dataset");
        assert_eq!(inferred.source, Source::Explicit);
        assert!(!inferred.is_guess());
    }

    #[test]
    fn type_from_extension() {
        let mapping = AnnotationMapping::default();
        let inferred = infer_type(&mapping, &facts(Some("mp4"), None, None)).unwrap();
        assert_eq!(inferred.value, "Video");
        assert_eq!(inferred.source, Source::Extension);
    }

    #[test]
    fn type_from_format_when_extension_unknown() {
        let mapping = AnnotationMapping::default();
        let inferred = infer_type(&mapping, &facts(None, None, Some("image/tiff"))).unwrap();
        assert_eq!(inferred.value, "Image");
        assert_eq!(inferred.source, Source::Format);
    }

    #[test]
    fn unrecognized_extension_falls_through_to_format() {
        let mapping = AnnotationMapping::default();
        let inferred = infer_type(&mapping, &facts(Some("xyz"), None, Some("audio/wav"))).unwrap();
        assert_eq!(inferred.value, "Sound");
    }

    #[test]
    fn type_unresolvable() {
        let mapping = AnnotationMapping::default();
        assert!(infer_type(&mapping, &facts(Some("xyz"), None, None)).is_none());
    }

    #[test]
    fn empty_explicit_type_is_ignored() {
        let mapping = AnnotationMapping::default();
        let inferred = infer_type(&mapping, &facts(Some("png"), Some(""), None)).unwrap();
        assert_eq!(inferred.value, "Image");
    }

    // =========================================================================
    // Format chain
    // =========================================================================

    #[test]
    fn explicit_format_is_never_overridden() {
        let mapping = AnnotationMapping::default();
        let inferred =
            infer_format(&mapping, &facts(Some("jpg"), None, Some("image/x-custom"))).unwrap();
        assert_eq!(inferred.value, "image/x-custom");
        assert_eq!(inferred.source, Source::Explicit);
    }

    #[test]
    fn format_uses_resolved_type_to_disambiguate() {
        let mapping = AnnotationMapping::default();
        let mut f = facts(Some("mp4"), Some("Sound"), None);
        f.resolved_type = Some("Sound");
        let inferred = infer_format(&mapping, &f).unwrap();
        assert_eq!(inferred.value, "audio/mp4");
        assert_eq!(inferred.source, Source::ExtensionAndType);
    }

    #[test]
    fn format_falls_back_to_first_candidate() {
        let mapping = AnnotationMapping::default();
        let mut f = facts(Some("mp4"), None, None);
        f.resolved_type = Some("Model");
        let inferred = infer_format(&mapping, &f).unwrap();
        assert_eq!(inferred.value, "video/mp4");
        assert_eq!(inferred.source, Source::Extension);
    }

    #[test]
    fn format_from_motivation_alone() {
        let mapping = AnnotationMapping::default();
        let f = Facts {
            motivation: "tagging",
            explicit_type: Some("TextualBody"),
            resolved_type: Some("TextualBody"),
            ..Facts::default()
        };
        let inferred = infer_format(&mapping, &f).unwrap();
        assert_eq!(inferred.value, "text/plain");
        assert_eq!(inferred.source, Source::Motivation);
    }

    #[test]
    fn format_unresolvable_for_ambiguous_motivation() {
        let mapping = AnnotationMapping::default();
        let f = Facts {
            motivation: "commenting",
            ..Facts::default()
        };
        assert!(infer_format(&mapping, &f).is_none());
    }

    // =========================================================================
    // Motivation normalization
    // =========================================================================

    #[test]
    fn motivation_is_lowercased() {
        assert_eq!(normalize_motivation("Painting"), "painting");
    }

    #[test]
    fn motivation_namespace_is_dropped() {
        assert_eq!(normalize_motivation("oa:Commenting"), "commenting");
        assert_eq!(normalize_motivation(" sc:painting "), "painting");
    }
}
