use std::collections::HashSet;
use std::fmt::Write as _;

use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Serialize;
use uuid::Uuid;

use super::types::{ArticleNode, DocumentMetadata, DocumentStructure, SectionNode};

#[derive(Serialize)]
struct RenderedDocument<'a> {
    metadata: &'a DocumentMetadata,
    structure: &'a DocumentStructure,
}

/// Pretty JSON of metadata and structure.
pub fn render_json(
    metadata: &DocumentMetadata,
    structure: &DocumentStructure,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&RenderedDocument {
        metadata,
        structure,
    })
}

/// Standalone HTML fragment: header with metadata, the section tree with
/// its articles, then articles that belong to no section.
///
/// All text is escaped; the output depends only on its inputs.
pub fn render_html(metadata: &DocumentMetadata, structure: &DocumentStructure) -> String {
    let mut html = String::new();
    html.push_str("<article class=\"legal-document\">\n");
    render_header(&mut html, metadata);

    for section in &structure.sections {
        render_section(&mut html, section);
    }

    let attached: HashSet<Uuid> = structure
        .sections
        .iter()
        .flat_map(SectionNode::all_articles)
        .map(|a| a.id)
        .collect();
    for article in structure.articles.iter().filter(|a| !attached.contains(&a.id)) {
        render_article(&mut html, article, 2);
    }

    html.push_str("</article>\n");
    html
}

fn render_header(html: &mut String, metadata: &DocumentMetadata) {
    html.push_str("<header>\n");
    if let Some(titre) = metadata.titre_complet.as_ref().or(metadata.titre.as_ref()) {
        let _ = writeln!(html, "<h1>{}</h1>", encode_text(titre));
    }

    let mut facts: Vec<(&str, String)> = Vec::new();
    if let Some(nature) = metadata.nature {
        facts.push(("nature", nature.as_str().to_string()));
    }
    if let Some(numero) = &metadata.numero {
        facts.push(("numero", numero.clone()));
    }
    if let Some(date) = metadata.date_signature {
        facts.push(("date-signature", date.format("%Y-%m-%d").to_string()));
    }
    if let Some(date) = metadata.date_publication {
        facts.push(("date-publication", date.format("%Y-%m-%d").to_string()));
    }
    if let Some(nor) = &metadata.nor {
        facts.push(("nor", nor.clone()));
    }
    if !facts.is_empty() {
        html.push_str("<dl class=\"metadata\">\n");
        for (name, value) in facts {
            let _ = writeln!(
                html,
                "<dt>{name}</dt><dd class=\"{name}\">{}</dd>",
                encode_text(&value)
            );
        }
        html.push_str("</dl>\n");
    }

    if !metadata.visas.is_empty() {
        html.push_str("<div class=\"visas\">\n");
        for visa in &metadata.visas {
            let _ = writeln!(html, "<p class=\"visa\">{} ;</p>", encode_text(visa));
        }
        html.push_str("</div>\n");
    }
    html.push_str("</header>\n");
}

fn render_section(html: &mut String, section: &SectionNode) {
    let heading = heading_level(section.niveau);
    let _ = writeln!(
        html,
        "<section class=\"{}\" id=\"{}\">",
        section.kind.as_str().to_lowercase(),
        encode_double_quoted_attribute(&section.id.to_string())
    );

    let mut label = format!("{} {}", section.kind.keyword(), section.numero);
    if !section.titre.is_empty() {
        label.push_str(" - ");
        label.push_str(&section.titre);
    }
    let _ = writeln!(html, "<h{heading}>{}</h{heading}>", encode_text(&label));

    for article in &section.articles {
        render_article(html, article, heading + 1);
    }
    for child in &section.children {
        render_section(html, child);
    }
    html.push_str("</section>\n");
}

fn render_article(html: &mut String, article: &ArticleNode, level: u8) {
    let heading = level.min(6);
    let _ = writeln!(
        html,
        "<div class=\"article {}\" id=\"{}\">",
        article.etat.as_str().to_lowercase(),
        encode_double_quoted_attribute(&article.id.to_string())
    );

    let mut label = format!("Article {}", article.numero);
    if let Some(titre) = &article.titre {
        label.push_str(" - ");
        label.push_str(titre);
    }
    let _ = writeln!(html, "<h{heading}>{}</h{heading}>", encode_text(&label));

    for alinea in &article.alineas {
        let _ = writeln!(html, "<p>{}</p>", encode_text(alinea));
    }
    html.push_str("</div>\n");
}

/// `<h2>` for the outermost sections, `<h6>` at most.
fn heading_level(niveau: u8) -> u8 {
    (niveau + 1).min(6)
}
