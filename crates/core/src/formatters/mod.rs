pub mod markdown;
pub mod text;

pub use markdown::{FrontMatterExtras, MarkdownDocument};
pub use text::{TextConfig, convert_to_text};
