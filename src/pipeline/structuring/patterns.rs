//! Pattern tables for French legal texts.
//!
//! Everything here is plain data: compiled regexes and lookup tables used by
//! the metadata extractor and the structure builder. No function in this
//! module walks a whole document.

use std::sync::LazyLock;

use regex::Regex;

use super::types::{Nature, ReferenceType, SectionType};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern compiles")
}

// ═══════════════════════════════════════════
// Numbering
// ═══════════════════════════════════════════

const ROMAN_NUMERALS: [&str; 20] = [
    "I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X", "XI", "XII", "XIII", "XIV",
    "XV", "XVI", "XVII", "XVIII", "XIX", "XX",
];

const ORDINALS: &[(&str, u32)] = &[
    ("premier", 1),
    ("première", 1),
    ("1er", 1),
    ("ier", 1),
    ("deuxième", 2),
    ("second", 2),
    ("troisième", 3),
    ("quatrième", 4),
    ("cinquième", 5),
    ("sixième", 6),
    ("septième", 7),
    ("huitième", 8),
    ("neuvième", 9),
    ("dixième", 10),
];

/// Value of a roman numeral between I and XX.
pub fn roman_value(s: &str) -> Option<u32> {
    let upper = s.to_ascii_uppercase();
    ROMAN_NUMERALS
        .iter()
        .position(|r| *r == upper)
        .map(|i| i as u32 + 1)
}

/// Value of a French ordinal word (`premier`, `1er`, `deuxième`...).
pub fn ordinal_value(word: &str) -> Option<u32> {
    let lower = word.to_lowercase();
    ORDINALS
        .iter()
        .find(|(w, _)| *w == lower)
        .map(|(_, v)| *v)
}

/// Month number for a French month name, with or without accents.
pub fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "janvier" => 1,
        "février" | "fevrier" => 2,
        "mars" => 3,
        "avril" => 4,
        "mai" => 5,
        "juin" => 6,
        "juillet" => 7,
        "août" | "aout" => 8,
        "septembre" => 9,
        "octobre" => 10,
        "novembre" => 11,
        "décembre" | "decembre" => 12,
        _ => return None,
    };
    Some(month)
}

// ═══════════════════════════════════════════
// Structure: sections and articles
// ═══════════════════════════════════════════

/// Header pattern for one section kind.
pub struct SectionPattern {
    pub kind: SectionType,
    /// Groups: 1 keyword as printed, 2 number, 3 rest of the line.
    pub regex: Regex,
}

const SECTION_NUMBER: &str = r"(?i:ier|1er|premier|première|unique|préliminaire)|[IVXLC]+|\d+";

pub static SECTION_PATTERNS: LazyLock<Vec<SectionPattern>> = LazyLock::new(|| {
    [
        (SectionType::Livre, "LIVRE|Livre"),
        (SectionType::Partie, "PARTIE|Partie"),
        (SectionType::Titre, "TITRE|Titre"),
        (SectionType::SousTitre, "SOUS-TITRE|Sous-titre|Sous-Titre"),
        (SectionType::Chapitre, "CHAPITRE|Chapitre"),
        (SectionType::Section, "SECTION|Section"),
        (SectionType::SousSection, "SOUS-SECTION|Sous-section|Sous-Section"),
        (SectionType::Paragraphe, "PARAGRAPHE|Paragraphe"),
    ]
    .into_iter()
    .map(|(kind, keyword)| SectionPattern {
        kind,
        regex: re(&format!(
            r"^[ \t]*({keyword})[ \t]+({SECTION_NUMBER})\b[ \t]*(.*?)[ \t]*$"
        )),
    })
    .collect()
});

/// All-caps section keyword at the start of a line. Ends article content.
pub static SECTION_KEYWORD_LINE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"^[ \t]*(?:LIVRE|PARTIE|TITRE|SOUS-TITRE|CHAPITRE|SECTION|SOUS-SECTION|PARAGRAPHE)(?:[ \t]|$)")
});

const ARTICLE_NUMBER: &str = concat!(
    r"(?i:premier|1er|unique|deuxième|troisième|quatrième|cinquième|sixième|septième|huitième|neuvième|dixième)",
    r"|[LRDA]\.?[ \t]*\d+(?:-\d+)*",
    r"|\d+(?:-\d+)*(?:[ \t]*(?:bis|ter|quater|quinquies|sexies|septies|octies|nonies))?",
    r"|[IVX]{1,5}",
);

/// Article header line. Groups: 1 number, 2 separator, 3 rest of the line.
pub static ARTICLE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    re(&format!(
        r"^[ \t]*(?:(?:Article|ARTICLE)[ \t]+|Art\.[ \t]*)({ARTICLE_NUMBER})\b[ \t]*([.:\-])?[ \t]*(.*?)[ \t]*$"
    ))
});

/// Prose continuing after an article number, as in `Article 5 de la loi`.
/// Lower case only: `Article 2 À compter du...` opens a real article.
pub static ARTICLE_PROSE_CONTINUATION: LazyLock<Regex> =
    LazyLock::new(|| re(r"^(?:de|du|des|au|aux|à|d')(?:\b|[ \t]|$)"));

/// Line ending that makes a following `Article N` a citation, not a header.
pub static REFERENTIAL_ENDING: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)(?:\bl['’]|\bcet|\bledit|\bdudit|\baudit|\bmême|\bprésent|\bdit)[ \t]*$")
});

/// Closing formula that ends the enacting terms.
pub static FAIT_A_LINE: LazyLock<Regex> = LazyLock::new(|| re(r"^[ \t]*Fait[ \t]+à[ \t]+"));

/// Table-of-contents entry: dot leader then page number.
pub static TOC_LINE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?:\.[ \t]*){3,}\d+[ \t]*$"));

/// Leading integer of an article number, used for ordering.
pub static LEADING_DIGITS: LazyLock<Regex> = LazyLock::new(|| re(r"\d+"));

/// `(abrogé)` style marker in article content.
pub static ETAT_ABROGE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\((?:abrog[ée]e?s?|article[ \t]+abrog[ée])\)|^[ \t]*\[?abrog[ée]\]?[ \t]*\.?$"));

pub static ETAT_MODIFIE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?i)\((?:modifi[ée]e?s?|article[ \t]+modifi[ée])\)"));

/// Line opening a new alinéa: `1°`, `a)`, `-` or `•`.
pub static ENUMERATION_MARKER: LazyLock<Regex> =
    LazyLock::new(|| re(r"^[ \t]*(?:\d+[°º]|[a-z]\)|-[ \t]|•)"));

// ═══════════════════════════════════════════
// Metadata
// ═══════════════════════════════════════════

const NATURE_KEYWORDS: [(Nature, &str); 10] = [
    (Nature::Constitution, r"constitution\b"),
    (Nature::LoiConstitutionnelle, r"loi[ \t]+constitutionnelle\b"),
    (Nature::LoiOrganique, r"loi[ \t]+organique\b"),
    (Nature::Loi, r"loi\b"),
    (Nature::Ordonnance, r"ordonnance\b"),
    (Nature::Decret, r"d[ée]cret\b"),
    (Nature::Arrete, r"arr[êe]t[ée]\b"),
    (Nature::Circulaire, r"circulaire\b"),
    (Nature::Decision, r"d[ée]cision\b"),
    (Nature::Code, r"code\b"),
];

/// Nature keywords at the start of a line, in priority order.
pub static NATURE_AT_LINE_START: LazyLock<Vec<(Nature, Regex)>> = LazyLock::new(|| {
    NATURE_KEYWORDS
        .iter()
        .map(|(nature, kw)| (*nature, re(&format!(r"(?im)^[ \t]*{kw}"))))
        .collect()
});

/// Same keywords anywhere, used when no line starts with one.
pub static NATURE_ANYWHERE: LazyLock<Vec<(Nature, Regex)>> = LazyLock::new(|| {
    NATURE_KEYWORDS
        .iter()
        .map(|(nature, kw)| (*nature, re(&format!(r"(?i)\b{kw}"))))
        .collect()
});

const DATE_TEXT: &str = r"\d{1,2}(?:er)?[ \t]+\p{L}+[ \t]+\d{4}";

/// Legal preamble: `Décret n° 2024-123 du 5 mars 2024`, `Arrêté du 1er juin 2023`.
pub static TITLE_PREAMBLE: LazyLock<Regex> = LazyLock::new(|| {
    re(&r"(?im)^[ \t]*((?:loi(?:[ \t]+(?:organique|constitutionnelle))?|ordonnance|d[ée]cret|arr[êe]t[ée]|circulaire|d[ée]cision)[ \t]+(?:n[°º][ \t]*\d[0-9A-Za-z/\-]*(?:[ \t]+du[ \t]+DATE)?|du[ \t]+DATE))"
        .replace("DATE", DATE_TEXT))
});

/// A code's own title line, `Code du travail`.
pub static CODE_TITLE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?im)^[ \t]*(code[ \t]+[\p{L}' \-]{2,60}?)[ \t]*$"));

/// Words that continue a title: `portant`, `relatif à`...
pub static TITLE_CONTINUATION: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)^(?:portant|relatif|relative|relatifs|relatives|modifiant|fixant|pris|prise|autorisant|ratifiant|instituant|créant|complétant|tendant|visant|habilitant)\b")
});

/// Lines that end the title block.
pub static TITLE_STOP: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)^[ \t]*(?:vu\b|le[ \t]+pr[ée]sident|la[ \t]+pr[ée]sidente|le[ \t]+premier[ \t]+ministre|la[ \t]+premi[èe]re[ \t]+ministre|nor\b|eli\b|article\b|art\.|titre\b|chapitre\b|livre\b|d[ée]cr[èe]te\b|arr[êe]te[ \t]*:)")
});

/// Page furniture skipped when picking the first substantial line as title.
pub static BOILERPLATE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)^[ \t]*(?:r[ée]publique[ \t]+fran[çc]aise|libert[ée]\b|journal[ \t]+officiel|jorf\b|nor\b|eli\b|texte[ \t]+\d|sommaire\b)")
});

/// Numéro conventions, most specific first. Group 1 is the number.
pub static NUMERO_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        re(r"(?i)\bn[°º][ \t]*(\d{2,4}-\d+(?:-\d+)?)"),
        re(r"(?i)\bn[°º][ \t]*(\d+(?:/\d+)*)"),
        re(r"(?i)\bnum[ée]ro[ \t]+(\d+(?:[-/]\d+)*)"),
    ]
});

/// `1er janvier 2024`. Groups: day, month name, year.
pub static FRENCH_DATE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)\b(\d{1,2})(?:er)?[ \t]+(janvier|f[ée]vrier|mars|avril|mai|juin|juillet|ao[uû]t|septembre|octobre|novembre|d[ée]cembre)[ \t]+(\d{4})\b")
});

/// `01/02/2024`. Groups: day, month, year.
pub static NUMERIC_DATE: LazyLock<Regex> =
    LazyLock::new(|| re(r"\b(\d{1,2})/(\d{1,2})/(\d{4})\b"));

/// `Fait à Paris, le 5 mars 2024`. Group 1 is the remainder of the line.
pub static SIGNATURE_LINE: LazyLock<Regex> =
    LazyLock::new(|| re(r"(?im)^[ \t]*fait[ \t]+à[ \t]+([^\n]+)$"));

/// Journal officiel publication. Group 1 is the date text.
pub static PUBLICATION_DATE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)(?:\bJORF\b|journal[ \t]+officiel)[^\n]{0,120}?\bdu[ \t]+(\d{1,2}(?:er)?[ \t]+\p{L}+[ \t]+\d{4}|\d{1,2}/\d{1,2}/\d{4})")
});

/// Signatory role line: `Le Premier ministre,`, `Le ministre de l'intérieur,`.
pub static SIGNATORY_ROLE: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?i)^[ \t]*(?:par[ \t]+)?(?:le|la)[ \t]+(?:(?:pr[ée]sidente?[ \t]+de[ \t]+la[ \t]+r[ée]publique|premi(?:er|[èe]re)[ \t]+ministre)[ \t]*[,:]?|(?:ministre|garde[ \t]+des[ \t]+sceaux|secr[ée]taire[ \t]+d'[ée]tat)\b[^\n]*,)[ \t]*$")
});

/// Proper name line: every word capitalized.
pub static SIGNATORY_NAME: LazyLock<Regex> = LazyLock::new(|| {
    re(r"^[ \t]*(\p{Lu}[\p{L}'\-]+(?:[ \t]+\p{Lu}[\p{L}'\-.]*)+)[ \t]*$")
});

/// `Vu ... ;` recital. Group 1 is the visa without the semicolon.
pub static VISA: LazyLock<Regex> = LazyLock::new(|| {
    re(r"(?m)^[ \t]*((?:Vu|VU)[ \t](?:[^;\n]|\n[^\n])+?)[ \t]*;")
});

pub static NOR: LazyLock<Regex> =
    LazyLock::new(|| re(r"\bNOR[ \t]*:[ \t]*([A-Z]{4}[0-9]{7}[A-Z])\b"));

pub static ELI: LazyLock<Regex> =
    LazyLock::new(|| re(r"\bELI[ \t]*:[ \t]*(https?://\S+|/eli/\S+)"));

// ═══════════════════════════════════════════
// References between texts
// ═══════════════════════════════════════════

/// Clause separators. A `. Capitalized` boundary keeps the capital in the next clause.
pub static CLAUSE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| re(r";|\n[ \t]*\n|\.\n|\.[ \t]+\p{Lu}\p{Ll}"));

/// Reference verbs in priority order.
pub static REFERENCE_VERBS: LazyLock<Vec<(ReferenceType, Regex)>> = LazyLock::new(|| {
    vec![
        (ReferenceType::Abroge, re(r"(?i)\babrog")),
        (ReferenceType::Modifie, re(r"(?i)\bmodifi")),
        (ReferenceType::Complete, re(r"(?i)\bcompl[ée]t")),
        (
            ReferenceType::Applique,
            re(r"(?i)\bpris(?:e)?[ \t]+(?:pour|en)[ \t]+l'application|\bappliqu|\ben[ \t]+application[ \t]+d"),
        ),
    ]
});

const REFERENCE_ARTICLE: &str =
    r"(?:premier|1er|[LRDA]\.?[ \t]*\d+(?:-\d+)*|\d+(?:-\d+)*(?:[ \t]+(?:bis|ter|quater))?)";

const REFERENCE_TEXT: &str = concat!(
    r"(?:loi(?:[ \t]+organique)?|ordonnance|d[ée]cret|arr[êe]t[ée])[ \t]+",
    r"(?:n[°º][ \t]*\d[\d\-/]*(?:[ \t]+du[ \t]+DATE)?|du[ \t]+DATE)",
    r"|code[ \t]+(?:civil|p[ée]nal|(?:g[ée]n[ée]ral[ \t]+)?(?:de[ \t]+la|des|du|de[ \t]+l'|de)[ \t]*\p{L}+",
    r"(?:[ \t]+(?:sociale|publique|territoriales|maritime|rurale|intérieure|financier))?)",
);

/// Cited text, optionally preceded by its article.
/// Groups: 1 article number, 2 text identifier.
pub static REFERENCE_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    let text = REFERENCE_TEXT.replace("DATE", DATE_TEXT);
    re(&format!(
        r"(?i)(?:\barticles?[ \t]+({REFERENCE_ARTICLE})[ \t]+(?:de[ \t]+la|du|de[ \t]+l'|des|de)[ \t]*)?\b({text})"
    ))
});

#[cfg(test)]
mod tests {
    use super::*;

    fn section_match(line: &str) -> Option<(SectionType, String, String)> {
        SECTION_PATTERNS.iter().find_map(|p| {
            p.regex
                .captures(line)
                .map(|c| (p.kind, c[2].to_string(), c[3].to_string()))
        })
    }

    #[test]
    fn all_patterns_compile() {
        assert_eq!(SECTION_PATTERNS.len(), 8);
        assert_eq!(NATURE_AT_LINE_START.len(), 10);
        assert_eq!(NATURE_ANYWHERE.len(), 10);
        assert_eq!(NUMERO_PATTERNS.len(), 3);
        assert_eq!(REFERENCE_VERBS.len(), 4);
        for regex in [
            &*SECTION_KEYWORD_LINE,
            &*ARTICLE_HEADER,
            &*ARTICLE_PROSE_CONTINUATION,
            &*REFERENTIAL_ENDING,
            &*FAIT_A_LINE,
            &*TOC_LINE,
            &*ETAT_ABROGE,
            &*ETAT_MODIFIE,
            &*ENUMERATION_MARKER,
            &*TITLE_PREAMBLE,
            &*CODE_TITLE,
            &*TITLE_CONTINUATION,
            &*TITLE_STOP,
            &*BOILERPLATE_LINE,
            &*FRENCH_DATE,
            &*NUMERIC_DATE,
            &*SIGNATURE_LINE,
            &*PUBLICATION_DATE,
            &*SIGNATORY_ROLE,
            &*SIGNATORY_NAME,
            &*VISA,
            &*NOR,
            &*ELI,
            &*CLAUSE_BOUNDARY,
            &*REFERENCE_TARGET,
        ] {
            assert!(!regex.as_str().is_empty());
        }
    }

    #[test]
    fn roman_table_covers_one_to_twenty() {
        assert_eq!(roman_value("I"), Some(1));
        assert_eq!(roman_value("iv"), Some(4));
        assert_eq!(roman_value("XIX"), Some(19));
        assert_eq!(roman_value("XX"), Some(20));
        assert_eq!(roman_value("XXI"), None);
        assert_eq!(roman_value("IIII"), None);
    }

    #[test]
    fn ordinals_map_to_digits() {
        assert_eq!(ordinal_value("premier"), Some(1));
        assert_eq!(ordinal_value("1er"), Some(1));
        assert_eq!(ordinal_value("Deuxième"), Some(2));
        assert_eq!(ordinal_value("dixième"), Some(10));
        assert_eq!(ordinal_value("unique"), None);
    }

    #[test]
    fn months_accept_missing_accents() {
        assert_eq!(month_number("février"), Some(2));
        assert_eq!(month_number("fevrier"), Some(2));
        assert_eq!(month_number("Août"), Some(8));
        assert_eq!(month_number("brumaire"), None);
    }

    #[test]
    fn section_headers_per_kind() {
        let (kind, num, rest) = section_match("TITRE Ier - DISPOSITIONS GÉNÉRALES").unwrap();
        assert_eq!(kind, SectionType::Titre);
        assert_eq!(num, "Ier");
        assert_eq!(rest, "- DISPOSITIONS GÉNÉRALES");

        let (kind, num, _) = section_match("SOUS-SECTION 2").unwrap();
        assert_eq!(kind, SectionType::SousSection);
        assert_eq!(num, "2");

        let (kind, num, _) = section_match("Chapitre premier").unwrap();
        assert_eq!(kind, SectionType::Chapitre);
        assert_eq!(num, "premier");

        let (kind, num, _) = section_match("LIVRE IV").unwrap();
        assert_eq!(kind, SectionType::Livre);
        assert_eq!(num, "IV");
    }

    #[test]
    fn section_keyword_needs_a_number() {
        assert!(section_match("TITRE Irrelevant").is_none());
        assert!(section_match("SECTION CIVILE").is_none());
        assert!(section_match("TITRES II").is_none());
        assert!(section_match("le titre II").is_none());
    }

    #[test]
    fn article_header_forms() {
        let c = ARTICLE_HEADER.captures("Article 1er").unwrap();
        assert_eq!(&c[1], "1er");

        let c = ARTICLE_HEADER.captures("Article premier - Objet").unwrap();
        assert_eq!(&c[1], "premier");
        assert_eq!(c.get(2).map(|m| m.as_str()), Some("-"));
        assert_eq!(&c[3], "Objet");

        let c = ARTICLE_HEADER.captures("ARTICLE 12. Le présent décret").unwrap();
        assert_eq!(&c[1], "12");
        assert_eq!(&c[3], "Le présent décret");

        let c = ARTICLE_HEADER.captures("Art. L. 121-1").unwrap();
        assert_eq!(&c[1], "L. 121-1");

        let c = ARTICLE_HEADER.captures("Article 3 bis").unwrap();
        assert_eq!(&c[1], "3 bis");

        let c = ARTICLE_HEADER.captures("Article IV").unwrap();
        assert_eq!(&c[1], "IV");
    }

    #[test]
    fn article_header_rejects_non_headers() {
        assert!(ARTICLE_HEADER.captures("L'article 3 est abrogé.").is_none());
        assert!(ARTICLE_HEADER.captures("Articles 3 et 4").is_none());
        assert!(ARTICLE_HEADER.captures("Article unique").is_some());
        let c = ARTICLE_HEADER.captures("Article 3 terminé").unwrap();
        assert_eq!(&c[1], "3");
    }

    #[test]
    fn prose_continuation_detected() {
        assert!(ARTICLE_PROSE_CONTINUATION.is_match("de la loi du 1er juillet 1901"));
        assert!(ARTICLE_PROSE_CONTINUATION.is_match("du code civil"));
        assert!(ARTICLE_PROSE_CONTINUATION.is_match("à 12"));
        assert!(!ARTICLE_PROSE_CONTINUATION.is_match("Dispositions générales"));
        assert!(!ARTICLE_PROSE_CONTINUATION.is_match("Le présent décret"));
        assert!(!ARTICLE_PROSE_CONTINUATION.is_match("À compter du 1er janvier 2025"));
        assert!(!ARTICLE_PROSE_CONTINUATION.is_match("Des arrêtés fixent les modalités"));
        assert!(!ARTICLE_PROSE_CONTINUATION.is_match("Au plus tard le 31 décembre"));
    }

    #[test]
    fn referential_endings() {
        assert!(REFERENTIAL_ENDING.is_match("conformément à l'"));
        assert!(REFERENTIAL_ENDING.is_match("les dispositions dudit"));
        assert!(REFERENTIAL_ENDING.is_match("au sens du présent "));
        assert!(!REFERENTIAL_ENDING.is_match("Le présent décret entre en vigueur."));
    }

    #[test]
    fn toc_lines_detected() {
        assert!(TOC_LINE.is_match("Dispositions générales ........ 12"));
        assert!(TOC_LINE.is_match(". . . . 3"));
        assert!(!TOC_LINE.is_match("Le présent décret entre en vigueur."));
    }

    #[test]
    fn nature_keywords_prefer_specific_forms() {
        let text = "LOI ORGANIQUE n° 2024-1 du 5 janvier 2024";
        let first = NATURE_AT_LINE_START
            .iter()
            .find(|(_, r)| r.is_match(text))
            .map(|(n, _)| *n);
        assert_eq!(first, Some(Nature::LoiOrganique));

        assert!(!NATURE_ANYWHERE[0].1.is_match("loi constitutionnelle"));
    }

    #[test]
    fn title_preamble_with_and_without_number() {
        let c = TITLE_PREAMBLE
            .captures("Décret n° 2024-123 du 5 mars 2024 portant diverses dispositions")
            .unwrap();
        assert_eq!(&c[1], "Décret n° 2024-123 du 5 mars 2024");

        let c = TITLE_PREAMBLE
            .captures("Arrêté du 1er juin 2023 relatif aux tarifs")
            .unwrap();
        assert_eq!(&c[1], "Arrêté du 1er juin 2023");
    }

    #[test]
    fn numero_conventions() {
        assert_eq!(&NUMERO_PATTERNS[0].captures("LOI n° 2024-42 du")
            .unwrap()[1], "2024-42");
        assert_eq!(&NUMERO_PATTERNS[1].captures("décision n°12/2023").unwrap()[1], "12/2023");
        assert_eq!(&NUMERO_PATTERNS[2].captures("circulaire numéro 45").unwrap()[1], "45");
    }

    #[test]
    fn dates_with_premier_day() {
        let c = FRENCH_DATE.captures("le 1er janvier 2024").unwrap();
        assert_eq!((&c[1], &c[2], &c[3]), ("1", "janvier", "2024"));
        let c = NUMERIC_DATE.captures("du 05/03/2024").unwrap();
        assert_eq!((&c[1], &c[2], &c[3]), ("05", "03", "2024"));
    }

    #[test]
    fn signatory_lines() {
        assert!(SIGNATORY_ROLE.is_match("Le Premier ministre,"));
        assert!(SIGNATORY_ROLE.is_match("Par le Président de la République :"));
        assert!(SIGNATORY_ROLE.is_match("La ministre de la culture,"));
        assert!(!SIGNATORY_ROLE.is_match("Le Premier ministre est chargé de l'exécution"));
        assert!(SIGNATORY_NAME.is_match("Emmanuel Macron"));
        assert!(SIGNATORY_NAME.is_match("Jean-Noël BARROT"));
        assert!(!SIGNATORY_NAME.is_match("Sur le rapport du Premier ministre,"));
    }

    #[test]
    fn visa_stops_at_semicolon() {
        let text = "Vu le code civil ;\nVu la loi n° 78-17 du 6 janvier 1978\nmodifiée ;\nDécrète :";
        let visas: Vec<&str> = VISA.captures_iter(text).map(|c| c.get(1).unwrap().as_str()).collect();
        assert_eq!(visas, vec!["Vu le code civil", "Vu la loi n° 78-17 du 6 janvier 1978\nmodifiée"]);
    }

    #[test]
    fn nor_and_eli() {
        assert_eq!(&NOR.captures("NOR : INTD2401234D").unwrap()[1], "INTD2401234D");
        assert_eq!(
            &ELI.captures("ELI: https://www.legifrance.gouv.fr/eli/decret/2024/3/5/X").unwrap()[1],
            "https://www.legifrance.gouv.fr/eli/decret/2024/3/5/X"
        );
    }

    #[test]
    fn reference_target_with_article() {
        let c = REFERENCE_TARGET
            .captures("L'article 3 de la loi n° 2000-321 du 12 avril 2000 est modifié")
            .unwrap();
        assert_eq!(&c[1], "3");
        assert_eq!(&c[2], "loi n° 2000-321 du 12 avril 2000");

        let c = REFERENCE_TARGET
            .captures("l'article L. 1221-1 du code du travail est complété")
            .unwrap();
        assert_eq!(&c[1], "L. 1221-1");
        assert_eq!(&c[2], "code du travail");

        let c = REFERENCE_TARGET
            .captures("le code de la sécurité sociale est ainsi modifié")
            .unwrap();
        assert!(c.get(1).is_none());
        assert_eq!(&c[2], "code de la sécurité sociale");
    }

    #[test]
    fn clause_boundary_ignores_code_article_abbreviations() {
        assert!(!CLAUSE_BOUNDARY.is_match("l'article L. 121-1 du code"));
        assert!(CLAUSE_BOUNDARY.is_match("est abrogé. Les articles"));
    }
}
