pub mod types;
pub mod patterns;
pub mod normalize;
pub mod metadata;
pub mod sections;
pub mod articles;
pub mod builder;
pub mod render;

pub use types::*;
pub use normalize::normalize;
pub use metadata::extract_metadata;
pub use builder::build_structure;
pub use render::{render_html, render_json};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuringError {
    #[error("Invalid {field} value: {value}")]
    InvalidEnum { field: String, value: String },
}
