use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::StructuringError;

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string form is also the serialized form.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:tt),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = StructuringError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(StructuringError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Nature {
    Constitution => "CONSTITUTION",
    LoiConstitutionnelle => "LOI_CONSTITUTIONNELLE",
    LoiOrganique => "LOI_ORGANIQUE",
    Loi => "LOI",
    Ordonnance => "ORDONNANCE",
    Decret => "DECRET",
    Arrete => "ARRETE",
    Circulaire => "CIRCULAIRE",
    Decision => "DECISION",
    Code => "CODE",
});

str_enum!(SectionType {
    Livre => "LIVRE",
    Partie => "PARTIE",
    Titre => "TITRE",
    SousTitre => "SOUS_TITRE",
    Chapitre => "CHAPITRE",
    Section => "SECTION",
    SousSection => "SOUS_SECTION",
    Paragraphe => "PARAGRAPHE",
});

impl SectionType {
    /// Depth in the sectioning hierarchy, 1 (coarsest) to 6.
    pub fn niveau(&self) -> u8 {
        match self {
            Self::Livre | Self::Partie => 1,
            Self::Titre | Self::SousTitre => 2,
            Self::Chapitre => 3,
            Self::Section => 4,
            Self::SousSection => 5,
            Self::Paragraphe => 6,
        }
    }

    /// Header keyword as printed in legal texts.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Livre => "LIVRE",
            Self::Partie => "PARTIE",
            Self::Titre => "TITRE",
            Self::SousTitre => "SOUS-TITRE",
            Self::Chapitre => "CHAPITRE",
            Self::Section => "SECTION",
            Self::SousSection => "SOUS-SECTION",
            Self::Paragraphe => "PARAGRAPHE",
        }
    }
}

str_enum!(Etat {
    Vigueur => "VIGUEUR",
    Modifie => "MODIFIE",
    Abroge => "ABROGE",
});

str_enum!(ReferenceType {
    Abroge => "abroge",
    Modifie => "modifie",
    Cite => "cite",
    Applique => "applique",
    Complete => "complete",
});

/// A citation of another legal text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextReference {
    #[serde(rename = "type")]
    pub kind: ReferenceType,
    pub texte_ref: String,
    pub article_ref: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub titre: Option<String>,
    pub titre_complet: Option<String>,
    pub nature: Option<Nature>,
    pub numero: Option<String>,
    pub date_signature: Option<NaiveDate>,
    pub date_publication: Option<NaiveDate>,
    pub signataires: Vec<String>,
    pub visas: Vec<String>,
    pub references: Vec<TextReference>,
    /// Administrative order number, e.g. `INTD2401234D`.
    pub nor: Option<String>,
    /// European Legislation Identifier.
    pub eli: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleNode {
    pub id: Uuid,
    pub numero: String,
    pub titre: Option<String>,
    pub contenu: String,
    pub alineas: Vec<String>,
    pub etat: Etat,
    pub references: Vec<TextReference>,
}

/// One heading of the sectioning hierarchy. Owns its subtree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionNode {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: SectionType,
    pub numero: String,
    pub titre: String,
    pub niveau: u8,
    pub children: Vec<SectionNode>,
    pub articles: Vec<ArticleNode>,
}

impl SectionNode {
    /// Every article in this subtree, depth-first.
    pub fn all_articles(&self) -> Vec<&ArticleNode> {
        let mut out: Vec<&ArticleNode> = self.articles.iter().collect();
        for child in &self.children {
            out.extend(child.all_articles());
        }
        out
    }
}

/// Section tree plus the flat, deduplicated article list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentStructure {
    pub sections: Vec<SectionNode>,
    pub articles: Vec<ArticleNode>,
}

impl DocumentStructure {
    /// No section and no article was recognized.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && self.articles.is_empty()
    }
}
