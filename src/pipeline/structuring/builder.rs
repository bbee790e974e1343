use uuid::Uuid;

use super::articles::{collect_articles, ArticleBlock};
use super::sections::{collect_section_headers, SectionHeader};
use super::types::{ArticleNode, DocumentStructure, SectionNode};

enum Event {
    Section(SectionHeader),
    Article(ArticleNode),
}

/// Build the section tree and the flat article list from normalized text.
///
/// Never fails: a text without recognizable headings yields an empty
/// structure. Each article is attached to the innermost section whose
/// heading precedes it; articles before any heading only appear in the
/// flat list.
pub fn build_structure(text: &str) -> DocumentStructure {
    let headers = collect_section_headers(text);
    let articles = collect_articles(text);

    let mut events: Vec<(usize, Event)> = headers
        .into_iter()
        .map(|h| (h.offset, Event::Section(h)))
        .chain(
            articles
                .iter()
                .map(|ArticleBlock { offset, article }| (*offset, Event::Article(article.clone()))),
        )
        .collect();
    events.sort_by_key(|(offset, _)| *offset);

    let mut roots: Vec<SectionNode> = Vec::new();
    let mut stack: Vec<SectionNode> = Vec::new();

    for (_, event) in events {
        match event {
            Event::Section(header) => {
                let node = section_node(header);
                while stack.last().is_some_and(|top| top.niveau >= node.niveau) {
                    close_top(&mut stack, &mut roots);
                }
                stack.push(node);
            }
            Event::Article(article) => {
                if let Some(parent) = stack.last_mut() {
                    parent.articles.push(article);
                }
            }
        }
    }
    while !stack.is_empty() {
        close_top(&mut stack, &mut roots);
    }

    let structure = DocumentStructure {
        sections: roots,
        articles: articles.into_iter().map(|b| b.article).collect(),
    };

    tracing::info!(
        sections = structure.sections.len(),
        articles = structure.articles.len(),
        "Structure built"
    );
    structure
}

/// Pop the innermost open section and attach it to its parent, or to the
/// roots when it has none.
fn close_top(stack: &mut Vec<SectionNode>, roots: &mut Vec<SectionNode>) {
    let Some(node) = stack.pop() else {
        return;
    };
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn section_node(header: SectionHeader) -> SectionNode {
    let id = Uuid::new_v5(
        &Uuid::NAMESPACE_OID,
        format!("section:{}:{}:{}", header.kind.as_str(), header.numero, header.offset).as_bytes(),
    );
    SectionNode {
        id,
        kind: header.kind,
        numero: header.numero,
        titre: header.titre,
        niveau: header.kind.niveau(),
        children: Vec::new(),
        articles: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::structuring::normalize;
    use crate::pipeline::structuring::types::SectionType;

    const TWO_TITLES: &str = "\
TITRE Ier
Dispositions générales

Article 1er

Le présent décret s'applique à l'ensemble des agents publics.

CHAPITRE Ier
Champ d'application

Article 2

Les dispositions du présent chapitre s'appliquent aux services.

TITRE II
Dispositions finales

Article 3

Le présent décret entre en vigueur le lendemain de sa publication.";

    fn numeros(articles: &[ArticleNode]) -> Vec<&str> {
        articles.iter().map(|a| a.numero.as_str()).collect()
    }

    fn assert_niveau_increases(node: &SectionNode) {
        for child in &node.children {
            assert!(child.niveau > node.niveau);
            assert_niveau_increases(child);
        }
    }

    #[test]
    fn sections_nest_by_niveau() {
        let structure = build_structure(TWO_TITLES);

        assert_eq!(structure.sections.len(), 2);
        let titre_1 = &structure.sections[0];
        assert_eq!(titre_1.kind, SectionType::Titre);
        assert_eq!(titre_1.numero, "Ier");
        assert_eq!(titre_1.titre, "Dispositions générales");
        assert_eq!(numeros(&titre_1.articles), vec!["1"]);

        assert_eq!(titre_1.children.len(), 1);
        let chapitre = &titre_1.children[0];
        assert_eq!(chapitre.kind, SectionType::Chapitre);
        assert_eq!(chapitre.niveau, 3);
        assert_eq!(numeros(&chapitre.articles), vec!["2"]);

        let titre_2 = &structure.sections[1];
        assert_eq!(titre_2.titre, "Dispositions finales");
        assert!(titre_2.children.is_empty());
        assert_eq!(numeros(&titre_2.articles), vec!["3"]);

        assert_eq!(numeros(&structure.articles), vec!["1", "2", "3"]);
        for root in &structure.sections {
            assert_niveau_increases(root);
        }
    }

    #[test]
    fn every_tree_article_is_in_the_flat_list() {
        let structure = build_structure(TWO_TITLES);
        let in_tree: Vec<_> = structure
            .sections
            .iter()
            .flat_map(|s| s.all_articles())
            .map(|a| a.id)
            .collect();
        assert_eq!(in_tree.len(), 3);
        assert!(in_tree
            .iter()
            .all(|id| structure.articles.iter().any(|a| a.id == *id)));
    }

    #[test]
    fn shallower_heading_closes_deeper_ones() {
        let text = "LIVRE Ier\n\nTITRE Ier\n\nCHAPITRE Ier\n\nSECTION 1\n\nLIVRE II\n\nCHAPITRE 2";
        let structure = build_structure(text);
        assert_eq!(structure.sections.len(), 2);
        let livre_1 = &structure.sections[0];
        assert_eq!(livre_1.children[0].kind, SectionType::Titre);
        assert_eq!(livre_1.children[0].children[0].children[0].kind, SectionType::Section);
        let livre_2 = &structure.sections[1];
        assert_eq!(livre_2.children[0].kind, SectionType::Chapitre);
    }

    #[test]
    fn articles_without_sections_stay_flat() {
        let text = "Article unique\n\nLe présent texte ne comporte qu'un article.";
        let structure = build_structure(text);
        assert!(structure.sections.is_empty());
        assert_eq!(numeros(&structure.articles), vec!["unique"]);
    }

    #[test]
    fn roman_and_ordinal_numbers_are_normalized() {
        let text = "Article premier\n\nPremier article du texte étudié.\n\nArticle IV\n\nQuatrième article du texte étudié.";
        let structure = build_structure(text);
        assert_eq!(numeros(&structure.articles), vec!["1", "4"]);
    }

    #[test]
    fn duplicate_article_keeps_longest() {
        let text = "Article 5\n\nVersion courte du texte.\n\nArticle 5\n\nVersion bien plus longue du même article cinq.";
        let structure = build_structure(text);
        assert_eq!(structure.articles.len(), 1);
        assert!(structure.articles[0].contenu.starts_with("Version bien plus longue"));
    }

    #[test]
    fn citation_split_across_lines_is_rejected() {
        let raw = "Article 83\nLes agents mentionnés à l'\nArticle 84 précité bénéficient de la mesure.";
        let structure = build_structure(&normalize(raw));
        assert_eq!(numeros(&structure.articles), vec!["83"]);
    }

    #[test]
    fn articles_run_together_on_one_line_are_split() {
        let raw = "Article 1er Le présent décret fixe les conditions d'accès. \
                   Article 2 À compter du 1er janvier 2025, les agents sont reclassés. \
                   Article 3 Des arrêtés fixent les modalités d'application.";
        let structure = build_structure(&normalize(raw));
        assert_eq!(numeros(&structure.articles), vec!["1", "2", "3"]);
        assert!(structure.articles[1].contenu.starts_with("À compter du"));
    }

    #[test]
    fn ids_are_stable_across_runs() {
        let a = build_structure(TWO_TITLES);
        let b = build_structure(TWO_TITLES);
        assert_eq!(a, b);
        assert_ne!(a.sections[0].id, a.sections[1].id);
    }

    #[test]
    fn empty_text_gives_empty_structure() {
        assert!(build_structure("").is_empty());
        assert!(build_structure("Texte libre sans aucun intitulé.").is_empty());
    }
}
