use super::patterns::{ARTICLE_HEADER, SECTION_PATTERNS, TOC_LINE};
use super::types::SectionType;

/// Titles longer than this on the following line are body text, not a heading.
const MAX_NEXT_LINE_TITLE_CHARS: usize = 200;

/// A recognized section heading and where it starts in the text.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SectionHeader {
    pub kind: SectionType,
    pub numero: String,
    pub titre: String,
    pub offset: usize,
}

/// Lines of `text` with the byte offset at which each starts.
pub(crate) fn lines_with_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut offset = 0;
    text.split('\n')
        .map(|line| {
            let start = offset;
            offset += line.len() + 1;
            (start, line)
        })
        .collect()
}

/// Match a section heading line.
///
/// Returns the kind, the number as printed and the rest of the line. A
/// title-case keyword (`Chapitre 2`) only counts when nothing but a
/// separated title follows, so prose such as `Section 2 du code` is left alone.
pub(crate) fn match_section_header(line: &str) -> Option<(SectionType, &str, &str)> {
    if TOC_LINE.is_match(line) {
        return None;
    }
    SECTION_PATTERNS.iter().find_map(|pattern| {
        let caps = pattern.regex.captures(line)?;
        let keyword = caps.get(1)?.as_str();
        let numero = caps.get(2)?.as_str();
        let rest = caps.get(3).map_or("", |m| m.as_str());

        let all_caps = !keyword.chars().any(char::is_lowercase);
        if !all_caps && !(rest.is_empty() || rest.starts_with(['.', ':', '-'])) {
            return None;
        }
        Some((pattern.kind, numero, rest))
    })
}

/// All section headings in document order.
pub(crate) fn collect_section_headers(text: &str) -> Vec<SectionHeader> {
    let lines = lines_with_offsets(text);
    let mut headers = Vec::new();

    for (i, (offset, line)) in lines.iter().enumerate() {
        let Some((kind, numero, rest)) = match_section_header(line) else {
            continue;
        };

        let inline_title = strip_separator(rest);
        let titre = if inline_title.is_empty() {
            title_from_next_line(&lines[i + 1..])
        } else {
            inline_title.to_string()
        };

        tracing::trace!(kind = kind.as_str(), numero, offset, "Section header");
        headers.push(SectionHeader {
            kind,
            numero: numero.to_string(),
            titre,
            offset: *offset,
        });
    }

    headers
}

fn strip_separator(rest: &str) -> &str {
    rest.trim_start_matches(['.', ':', '-', ' ', '\t']).trim()
}

/// Headings often carry their title on the next non-blank line.
fn title_from_next_line(following: &[(usize, &str)]) -> String {
    let Some(line) = following
        .iter()
        .map(|(_, l)| l.trim())
        .find(|l| !l.is_empty())
    else {
        return String::new();
    };

    let is_heading = match_section_header(line).is_some() || ARTICLE_HEADER.is_match(line);
    if is_heading || line.chars().count() > MAX_NEXT_LINE_TITLE_CHARS {
        String::new()
    } else {
        line.to_string()
    }
}
