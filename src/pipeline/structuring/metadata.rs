use std::collections::HashSet;

use chrono::NaiveDate;

use super::patterns::{
    month_number, ARTICLE_HEADER, BOILERPLATE_LINE, CLAUSE_BOUNDARY, CODE_TITLE, ELI,
    FRENCH_DATE, NATURE_ANYWHERE, NATURE_AT_LINE_START, NOR, NUMERIC_DATE, NUMERO_PATTERNS,
    PUBLICATION_DATE, REFERENCE_TARGET, REFERENCE_VERBS, SECTION_KEYWORD_LINE, SIGNATORY_NAME,
    SIGNATORY_ROLE, SIGNATURE_LINE, TITLE_CONTINUATION, TITLE_PREAMBLE, TITLE_STOP, VISA,
};
use super::types::{DocumentMetadata, Nature, ReferenceType, TextReference};

/// Nature keywords are only looked for at the top of the document.
const NATURE_WINDOW_CHARS: usize = 1000;
const TITLE_WINDOW_CHARS: usize = 3000;
const NUMERO_WINDOW_CHARS: usize = 2000;
const MIN_TITLE_CHARS: usize = 10;
const MAX_TITLE_CONTINUATION_CHARS: usize = 1000;
const MAX_DESCRIPTION_CHARS: usize = 200;

/// Extract document metadata from normalized text.
///
/// Every field is optional or may be empty; a field whose patterns all
/// miss is left unset.
pub fn extract_metadata(text: &str) -> DocumentMetadata {
    let (titre, titre_complet) = extract_title(text);
    let visas = extract_visas(text);

    let mut references = extract_references(text);
    references.extend(visa_citations(&visas));
    if let Some(own) = titre.as_deref().map(str::to_lowercase) {
        references.retain(|r| r.texte_ref.to_lowercase() != own);
    }
    let references = dedup_references(references);

    let date_signature = extract_signature_date(text).or_else(|| titre.as_deref().and_then(parse_date));

    let metadata = DocumentMetadata {
        nature: detect_nature(text),
        numero: extract_numero(titre.as_deref(), text),
        date_signature,
        date_publication: extract_publication_date(text),
        signataires: extract_signataires(text),
        nor: NOR.captures(text).map(|c| c[1].to_string()),
        eli: ELI.captures(text).map(|c| c[1].to_string()),
        titre,
        titre_complet,
        visas,
        references,
    };

    tracing::debug!(
        nature = ?metadata.nature,
        numero = ?metadata.numero,
        visas = metadata.visas.len(),
        references = metadata.references.len(),
        signataires = metadata.signataires.len(),
        "Metadata extracted"
    );

    metadata
}

/// Longest prefix of `text` holding at most `max_chars` characters.
fn head(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(i, _)| &text[..i])
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

// ── Title ──────────────────────────────────────────────

fn extract_title(text: &str) -> (Option<String>, Option<String>) {
    let head = head(text, TITLE_WINDOW_CHARS);

    let found = TITLE_PREAMBLE
        .captures(head)
        .or_else(|| CODE_TITLE.captures(head))
        .and_then(|c| c.get(1))
        .map(|m| (collapse_whitespace(m.as_str()), m.end()))
        .or_else(|| first_substantial_line(head));

    let Some((titre, end)) = found else {
        return (None, None);
    };

    let titre_complet = title_continuation(&head[end..]).map(|rest| format!("{titre} {rest}"));
    (Some(titre), titre_complet)
}

/// First line that is neither page furniture nor too short to be a title.
/// Returns the line and the offset just past it.
fn first_substantial_line(head: &str) -> Option<(String, usize)> {
    let mut offset = 0;
    for line in head.split('\n') {
        let end = offset + line.len();
        offset = end + 1;

        let trimmed = line.trim();
        if trimmed.is_empty() || BOILERPLATE_LINE.is_match(trimmed) {
            continue;
        }
        if TITLE_STOP.is_match(trimmed) {
            return None;
        }
        if trimmed.chars().count() >= MIN_TITLE_CHARS && trimmed.chars().any(char::is_alphabetic) {
            return Some((trimmed.to_string(), end));
        }
    }
    None
}

/// `portant...` / `relatif à...` text following the title, up to a blank
/// line or the first recital.
fn title_continuation(rest: &str) -> Option<String> {
    let mut parts = Vec::new();
    for (i, line) in rest.split('\n').enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if i == 0 {
                continue;
            }
            break;
        }
        if TITLE_STOP.is_match(trimmed) {
            break;
        }
        parts.push(trimmed);
    }

    let continuation = collapse_whitespace(&parts.join(" "));
    if TITLE_CONTINUATION.is_match(&continuation) {
        Some(truncate_chars(&continuation, MAX_TITLE_CONTINUATION_CHARS))
    } else {
        None
    }
}

// ── Nature, numéro, dates ──────────────────────────────

fn detect_nature(text: &str) -> Option<Nature> {
    let head = head(text, NATURE_WINDOW_CHARS);
    NATURE_AT_LINE_START
        .iter()
        .chain(NATURE_ANYWHERE.iter())
        .find(|(_, regex)| regex.is_match(head))
        .map(|(nature, _)| *nature)
}

fn extract_numero(titre: Option<&str>, text: &str) -> Option<String> {
    let head = head(text, NUMERO_WINDOW_CHARS);
    titre
        .into_iter()
        .chain(std::iter::once(head))
        .find_map(|haystack| {
            NUMERO_PATTERNS
                .iter()
                .find_map(|regex| regex.captures(haystack).map(|c| c[1].to_string()))
        })
}

/// First French or numeric date in `s`.
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Some(c) = FRENCH_DATE.captures(s) {
        let day = c[1].parse().ok()?;
        let month = month_number(&c[2])?;
        let year = c[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    let c = NUMERIC_DATE.captures(s)?;
    NaiveDate::from_ymd_opt(c[3].parse().ok()?, c[2].parse().ok()?, c[1].parse().ok()?)
}

fn extract_signature_date(text: &str) -> Option<NaiveDate> {
    SIGNATURE_LINE
        .captures_iter(text)
        .find_map(|c| parse_date(&c[1]))
}

fn extract_publication_date(text: &str) -> Option<NaiveDate> {
    PUBLICATION_DATE
        .captures_iter(text)
        .find_map(|c| parse_date(&c[1]))
}

// ── Signataires and visas ──────────────────────────────

/// Names on the line following a role (`Le Premier ministre,`) or the
/// `Fait à` line. Order of appearance, without duplicates.
fn extract_signataires(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut names: Vec<String> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if !(SIGNATORY_ROLE.is_match(line) || SIGNATURE_LINE.is_match(line)) {
            continue;
        }
        let Some(next) = lines[i + 1..].iter().find(|l| !l.is_empty()) else {
            continue;
        };
        let Some(name) = SIGNATORY_NAME.captures(next).map(|c| collapse_whitespace(&c[1])) else {
            continue;
        };
        if is_person_name(&name) && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

fn is_person_name(candidate: &str) -> bool {
    const NOT_A_NAME: &[&str] = &["Le", "La", "Les", "Par", "Fait", "Vu", "Article", "Art."];
    let first = candidate.split_whitespace().next().unwrap_or_default();
    !NOT_A_NAME.contains(&first)
        && !ARTICLE_HEADER.is_match(candidate)
        && !SECTION_KEYWORD_LINE.is_match(candidate)
}

fn extract_visas(text: &str) -> Vec<String> {
    VISA.captures_iter(text)
        .map(|c| collapse_whitespace(&c[1]))
        .collect()
}

// ── References ─────────────────────────────────────────

/// Split at `;`, blank lines and sentence ends. A sentence end followed by
/// a capitalized word keeps that word in the next clause.
fn split_clauses(text: &str) -> Vec<&str> {
    let mut clauses = Vec::new();
    let mut start = 0;
    for m in CLAUSE_BOUNDARY.find_iter(text) {
        let matched = m.as_str();
        let (end, next) = if matched.starts_with('.') {
            let after_dot = &matched[1..];
            let spaces = after_dot.len() - after_dot.trim_start_matches([' ', '\t']).len();
            (m.start() + 1, m.start() + 1 + spaces)
        } else {
            (m.start(), m.end())
        };
        clauses.push(&text[start..end]);
        start = next;
    }
    clauses.push(&text[start..]);
    clauses
}

fn is_visa_clause(clause: &str) -> bool {
    clause
        .lines()
        .any(|line| line.trim_start().starts_with("Vu ") || line.trim_start().starts_with("VU "))
}

/// Abrogation, modification, completion and application references.
///
/// Each clause carrying one of these verbs yields a reference per cited
/// text. Recitals are left to [`visa_citations`].
pub(crate) fn extract_references(text: &str) -> Vec<TextReference> {
    let mut references = Vec::new();
    for clause in split_clauses(text) {
        let clause = clause.trim();
        if clause.is_empty() || is_visa_clause(clause) {
            continue;
        }
        let Some(kind) = REFERENCE_VERBS
            .iter()
            .find(|(_, regex)| regex.is_match(clause))
            .map(|(kind, _)| *kind)
        else {
            continue;
        };
        references.extend(targets(kind, clause));
    }
    dedup_references(references)
}

fn visa_citations(visas: &[String]) -> Vec<TextReference> {
    visas
        .iter()
        .flat_map(|visa| targets(ReferenceType::Cite, visa))
        .collect()
}

fn targets(kind: ReferenceType, clause: &str) -> Vec<TextReference> {
    let description = truncate_chars(&collapse_whitespace(clause), MAX_DESCRIPTION_CHARS);
    REFERENCE_TARGET
        .captures_iter(clause)
        .filter_map(|c| {
            Some(TextReference {
                kind,
                texte_ref: collapse_whitespace(c.get(2)?.as_str()),
                article_ref: c.get(1).map(|m| collapse_whitespace(m.as_str())),
                description: Some(description.clone()),
            })
        })
        .collect()
}

fn dedup_references(references: Vec<TextReference>) -> Vec<TextReference> {
    let mut seen = HashSet::new();
    references
        .into_iter()
        .filter(|r| seen.insert((r.kind, r.texte_ref.to_lowercase(), r.article_ref.clone())))
        .collect()
}
