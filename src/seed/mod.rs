//! Markdown seed files: site metadata, global styles, settings and the
//! pages with their content blocks.

pub mod error;
pub mod parser;
pub mod types;

pub use error::{ParseWarning, SeedError};
pub use parser::parse_seed;
pub use types::{Metadata, SeedBlock, SeedDocument, SeedPage};
