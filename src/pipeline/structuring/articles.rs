use std::collections::HashMap;

use uuid::Uuid;

use super::metadata::extract_references;
use super::patterns::{
    ordinal_value, roman_value, ARTICLE_HEADER, ARTICLE_PROSE_CONTINUATION, ENUMERATION_MARKER,
    ETAT_ABROGE, ETAT_MODIFIE, FAIT_A_LINE, LEADING_DIGITS, REFERENTIAL_ENDING,
    SECTION_KEYWORD_LINE, TOC_LINE,
};
use super::sections::{lines_with_offsets, match_section_header};
use super::types::{ArticleNode, Etat};

const MIN_CONTENT_CHARS: usize = 20;
const MAX_HEADER_TITLE_CHARS: usize = 80;

/// An article and the offset of its header line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ArticleBlock {
    pub offset: usize,
    pub article: ArticleNode,
}

struct Header<'a> {
    line_index: usize,
    numero: &'a str,
    separator: Option<&'a str>,
    rest: &'a str,
}

/// Articles of `text`: filtered, deduplicated by number and sorted by
/// their leading number.
pub(crate) fn collect_articles(text: &str) -> Vec<ArticleBlock> {
    let lines = lines_with_offsets(text);
    let headers: Vec<Header> = lines
        .iter()
        .enumerate()
        .filter_map(|(i, (_, line))| parse_header(i, line))
        .filter(|h| !preceded_by_reference(&lines[..h.line_index]))
        .collect();

    let mut blocks = Vec::new();
    for (k, header) in headers.iter().enumerate() {
        let next_header = headers.get(k + 1).map_or(lines.len(), |h| h.line_index);
        let body: Vec<&str> = lines[header.line_index + 1..next_header]
            .iter()
            .map(|(_, line)| *line)
            .take_while(|line| !ends_article(line))
            .collect();

        let offset = lines[header.line_index].0;
        match build_block(header, &body, offset) {
            Some(block) => blocks.push(block),
            None => tracing::trace!(numero = header.numero, offset, "Article discarded"),
        }
    }

    let found = blocks.len();
    let mut articles = dedup_longest(blocks);
    articles.sort_by_key(|b| leading_number(&b.article.numero));

    tracing::debug!(found, kept = articles.len(), "Articles collected");
    articles
}

fn parse_header(line_index: usize, line: &str) -> Option<Header<'_>> {
    let caps = ARTICLE_HEADER.captures(line)?;
    let separator = caps.get(2).map(|m| m.as_str());
    let rest = caps.get(3).map_or("", |m| m.as_str());
    if separator.is_none() && ARTICLE_PROSE_CONTINUATION.is_match(rest) {
        return None;
    }
    Some(Header {
        line_index,
        numero: caps.get(1)?.as_str(),
        separator,
        rest,
    })
}

/// The previous non-blank line ends with `l'`, `dudit`... so this line
/// continues a citation.
fn preceded_by_reference(before: &[(usize, &str)]) -> bool {
    before
        .iter()
        .rev()
        .map(|(_, line)| line.trim())
        .find(|line| !line.is_empty())
        .is_some_and(|line| REFERENTIAL_ENDING.is_match(line))
}

fn ends_article(line: &str) -> bool {
    SECTION_KEYWORD_LINE.is_match(line)
        || match_section_header(line).is_some()
        || FAIT_A_LINE.is_match(line)
}

fn build_block(header: &Header, body: &[&str], offset: usize) -> Option<ArticleBlock> {
    let (titre, first_line) = split_header_title(header);

    let contenu = first_line
        .into_iter()
        .chain(body.iter().copied())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    if contenu.chars().count() < MIN_CONTENT_CHARS {
        return None;
    }
    if contenu.lines().next().is_some_and(|l| TOC_LINE.is_match(l)) {
        return None;
    }

    let numero = normalize_numero(header.numero);
    let id = Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("article:{numero}:{offset}").as_bytes(),
    );

    Some(ArticleBlock {
        offset,
        article: ArticleNode {
            id,
            alineas: split_alineas(&contenu),
            etat: detect_etat(&contenu),
            references: extract_references(&contenu),
            numero,
            titre,
            contenu,
        },
    })
}

/// `Article 2 - Objet` carries a title; otherwise the header remainder
/// is the first line of content.
fn split_header_title<'a>(header: &Header<'a>) -> (Option<String>, Option<&'a str>) {
    let rest = header.rest.trim();
    if rest.is_empty() {
        return (None, None);
    }
    let short = rest.chars().count() < MAX_HEADER_TITLE_CHARS;
    let unterminated = !rest.ends_with(['.', ';', ':', ',']);
    if header.separator == Some("-") && short && unterminated {
        (Some(rest.to_string()), None)
    } else {
        (None, Some(rest))
    }
}

/// Canonical article number: `premier` → `1`, `IV` → `4`, `3 bis` → `3bis`,
/// `L. 121-1` → `L121-1`. `unique` is kept as is.
pub(crate) fn normalize_numero(raw: &str) -> String {
    let word = raw.trim();
    if word.eq_ignore_ascii_case("unique") {
        return "unique".to_string();
    }
    if let Some(value) = ordinal_value(word).or_else(|| roman_value(word)) {
        return value.to_string();
    }
    word.chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect()
}

fn leading_number(numero: &str) -> u64 {
    LEADING_DIGITS
        .find(numero)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

/// One entry per number, keeping the longest content. The first block found
/// wins a tie.
fn dedup_longest(blocks: Vec<ArticleBlock>) -> Vec<ArticleBlock> {
    let mut kept: Vec<ArticleBlock> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for block in blocks {
        match index.get(&block.article.numero) {
            Some(&i) => {
                let current = kept[i].article.contenu.chars().count();
                if block.article.contenu.chars().count() > current {
                    tracing::debug!(numero = %block.article.numero, "Duplicate article replaced by longer one");
                    kept[i] = block;
                }
            }
            None => {
                index.insert(block.article.numero.clone(), kept.len());
                kept.push(block);
            }
        }
    }
    kept
}

/// Paragraphs of an article. A new alinéa starts after a blank line, at an
/// enumeration marker, or after a line ending a sentence.
fn split_alineas(contenu: &str) -> Vec<String> {
    let mut alineas = Vec::new();
    let mut current = String::new();
    let mut previous_ends_sentence = false;

    for line in contenu.lines().map(str::trim) {
        if line.is_empty() {
            flush(&mut current, &mut alineas);
            previous_ends_sentence = false;
            continue;
        }
        if !current.is_empty() && (previous_ends_sentence || ENUMERATION_MARKER.is_match(line)) {
            flush(&mut current, &mut alineas);
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(line);
        previous_ends_sentence = line.ends_with(['.', ';', ':']);
    }
    flush(&mut current, &mut alineas);
    alineas
}

fn flush(current: &mut String, alineas: &mut Vec<String>) {
    let text = current.trim();
    if !text.is_empty() {
        alineas.push(text.to_string());
    }
    current.clear();
}

fn detect_etat(contenu: &str) -> Etat {
    if ETAT_ABROGE.is_match(contenu) {
        Etat::Abroge
    } else if ETAT_MODIFIE.is_match(contenu) {
        Etat::Modifie
    } else {
        Etat::Vigueur
    }
}
