use std::sync::LazyLock;

use regex::Regex;

/// Characters removed outright: C0 controls except tab and newline, DEL,
/// zero-width characters, BOM and soft hyphen.
const INVISIBLE: &str = r"\x00-\x08\x0B\x0E-\x1F\x7F\x{00AD}\x{200B}-\x{200D}\x{2060}\x{FEFF}";

static LINE_BREAKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r\n|\r|\x0C").unwrap());

static HORIZONTAL_SPACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[ \t\x{00A0}\x{2000}-\x{200A}\x{202F}\x{205F}\x{3000}]+").unwrap()
});

static INVISIBLE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("[{INVISIBLE}]+")).unwrap());

/// Every apostrophe look-alike that `fold_typography` turns into `'`.
const QUOTE: &str = "['\u{2018}\u{2019}\u{201A}\u{201B}\u{2032}]";

/// `l' article`, `qu ' il` → `l'article`, `qu'il`.
static SPLIT_CONTRACTION: LazyLock<Regex> = LazyLock::new(|| {
    let gap = format!(r"[ \t{INVISIBLE}]");
    Regex::new(&format!(
        r"(?i)\b(jusqu|lorsqu|puisqu|quoiqu|presqu|qu|l|d|n|s|j|m|t|c)(?:{gap}*{QUOTE}{gap}+|{gap}+{QUOTE}{gap}*)(\p{{L}})"
    ))
    .unwrap()
});

static ARTICLE_MISSPELLING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:Articte|Artlcle|Artiele|Articie|ArticIe|Arlicle|Aiticle|Atricle|Artide|Art1cle|Artic1e|Articlc)")
        .unwrap()
});

static UPPERCASE_ARTICLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bARTICLE[ \t]*(\d|(?:PREMIER|UNIQUE|1ER)\b|[IVXL]+\b)").unwrap()
});

static ARTICLE_GLUED_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bArticle(\d)").unwrap());

static PAGE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bpage[ \t]+\d+[ \t]*(?:sur|/)[ \t]*\d+\b").unwrap()
});

const HEADER: &str = concat!(
    r"(?:Article[ \t]+(?:\d|(?i:premier|1er|unique)\b|[IVXL]+\b)",
    r"|Art\.[ \t]*\d",
    r"|(?:SOUS-SECTION|SOUS-TITRE|TITRE|CHAPITRE|LIVRE|SECTION|PARTIE|PARAGRAPHE)[ \t]+",
    r"(?:\d|[IVXLC]+\b|(?i:premier|ier|1er|unique|préliminaire)\b))",
);

static SENTENCE_THEN_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"([.;:!?])[ \t]+({HEADER})")).unwrap());

static HEADER_AT_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^{HEADER}")).unwrap());

static SPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());

static BLANK_LINE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Clean extracted text for structuring.
///
/// Idempotent: applying it twice gives the same result as once. Invisible
/// characters go before any repair so that repairs see joined words.
pub fn normalize(text: &str) -> String {
    let text = LINE_BREAKS.replace_all(text, "\n");
    let text = HORIZONTAL_SPACE.replace_all(&text, " ");
    let text = INVISIBLE_CHARS.replace_all(&text, "");
    let text = SPLIT_CONTRACTION.replace_all(&text, "${1}'${2}");
    let text = fix_article_ocr(&text);
    let text = fold_typography(&text);
    let text = PAGE_HEADER.replace_all(&text, "");
    let text = break_before_headers(&text);
    tidy(&text)
}

fn fix_article_ocr(text: &str) -> String {
    let text = ARTICLE_MISSPELLING.replace_all(text, "Article");
    let text = UPPERCASE_ARTICLE.replace_all(&text, "Article ${1}");
    ARTICLE_GLUED_NUMBER
        .replace_all(&text, "Article ${1}")
        .into_owned()
}

/// Ligatures, dashes, quotes and ellipses to their plain forms.
/// French guillemets are kept.
fn fold_typography(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            'ﬁ' => out.push_str("fi"),
            'ﬂ' => out.push_str("fl"),
            'ﬀ' => out.push_str("ff"),
            'ﬃ' => out.push_str("ffi"),
            'ﬄ' => out.push_str("ffl"),
            'ﬅ' | 'ﬆ' => out.push_str("st"),
            '\u{2010}'..='\u{2015}' | '\u{2212}' => out.push('-'),
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => out.push('"'),
            '…' => out.push_str("..."),
            _ => out.push(c),
        }
    }
    out
}

/// Blank line before every article or section header that starts a sentence
/// or a line.
fn break_before_headers(text: &str) -> String {
    let text = SENTENCE_THEN_HEADER.replace_all(text, "${1}\n\n${2}");

    let mut out = String::with_capacity(text.len() + 64);
    let mut previous_blank = true;
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
            if !previous_blank && HEADER_AT_START.is_match(line.trim_start()) {
                out.push('\n');
            }
        }
        out.push_str(line);
        previous_blank = line.trim().is_empty();
    }
    out
}

fn tidy(text: &str) -> String {
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| SPACE_RUNS.replace_all(line.trim(), " ").into_owned())
        .collect();
    let joined = lines.join("\n");
    BLANK_LINE_RUNS
        .replace_all(&joined, "\n\n")
        .trim()
        .to_string()
}
