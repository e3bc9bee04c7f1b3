//! Deterministic utterance classifier.
//!
//! Routing is decided by explicit patterns, not free-form interpretation:
//! the classifier extracts an optional person+place+role triple and flags
//! questions and preference/narrative statements. It errs conservative —
//! a triple it cannot extract in full yields no triple at all, and an
//! incomplete triple never reaches the graph.

use regex_lite::Regex;
use std::sync::OnceLock;
use twinmem_types::memory::FactTriple;

/// What the classifier saw in one utterance.
#[derive(Debug, Clone, Default)]
pub struct UtteranceShape {
    /// A complete person+place+role triple, when the utterance names all
    /// three explicitly.
    pub triple: Option<FactTriple>,
    /// Whether the utterance is a question.
    pub is_question: bool,
    /// Whether the utterance reads as subjective/preference/narrative
    /// content.
    pub is_preference: bool,
}

fn name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[Mm]y name is ([A-Z][A-Za-z'\-]*(?: [A-Z][A-Za-z'\-]*)*)")
            .expect("static pattern")
    })
}

fn role_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"[Ii](?:'m| am) the (.+?) (of|at) (?:the )?([A-Z][A-Za-z'\-]*(?:\.[A-Za-z][A-Za-z'\-]*| [A-Z][A-Za-z'\-]*)*)",
        )
        .expect("static pattern")
    })
}

fn works_at_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"[Ii] work(?:s)? (?:at|for) (?:the )?([A-Z][A-Za-z'\-]*(?:\.[A-Za-z][A-Za-z'\-]*| [A-Z][A-Za-z'\-]*)*)",
        )
        .expect("static pattern")
    })
}

const INTERROGATIVES: &[&str] = &[
    "what", "who", "where", "when", "why", "how", "which", "do", "does", "did", "is", "are",
    "can", "could", "would", "will",
];

const PREFERENCE_MARKERS: &[&str] = &[
    "favorite",
    "favourite",
    "i like ",
    "i love ",
    "i prefer ",
    "i enjoy ",
    "i have a ",
    "i have an ",
    "i collect ",
    "my hobby",
];

/// Classify one utterance.
pub fn classify(utterance: &str) -> UtteranceShape {
    let trimmed = utterance.trim();
    let triple = extract_triple(trimmed);
    let is_question = detect_question(trimmed);
    let is_preference = !is_question && triple.is_none() && detect_preference(trimmed);

    UtteranceShape {
        triple,
        is_question,
        is_preference,
    }
}

/// Extract a complete person+place+role triple, or nothing.
///
/// The role keeps its connective ("governor of", "Lead Developer at") so it
/// can be stored verbatim as the relation type.
fn extract_triple(utterance: &str) -> Option<FactTriple> {
    let person = name_pattern()
        .captures(utterance)
        .map(|c| c[1].trim().to_string())?;

    if let Some(caps) = role_pattern().captures(utterance) {
        let role = format!("{} {}", caps[1].trim(), &caps[2]);
        let place = caps[3].trim().to_string();
        return Some(FactTriple {
            person,
            place,
            role,
        });
    }

    if let Some(caps) = works_at_pattern().captures(utterance) {
        return Some(FactTriple {
            person,
            place: caps[1].trim().to_string(),
            role: "works at".to_string(),
        });
    }

    None
}

fn detect_question(utterance: &str) -> bool {
    if utterance.ends_with('?') {
        return true;
    }
    let first_word = utterance
        .split_whitespace()
        .next()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .unwrap_or_default();
    INTERROGATIVES.contains(&first_word.as_str())
}

fn detect_preference(utterance: &str) -> bool {
    let lower = utterance.to_lowercase();
    PREFERENCE_MARKERS.iter().any(|m| lower.contains(m))
}
