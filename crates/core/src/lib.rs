//! Readable-content extraction and rule-based HTML to Markdown conversion.
//!
//! The pipeline parses a page into an owned node arena ([`Document`]),
//! extracts the main content with [`Readability`], and renders it with the
//! [`MarkdownSerializer`]. [`Converter`] ties the steps together and falls
//! back to a simpler extractor when the main pipeline finds nothing.
//!
//! ```rust
//! use readmark_core::{Converter, Document};
//!
//! let html = "<html><head><title>Hi</title></head><body><main><p>Hello, world.</p></main></body></html>";
//! let doc = Document::parse(html).unwrap();
//! let converted = Converter::new().convert(&doc, "hello.html").unwrap();
//! assert!(converted.document.render().ends_with("Hello, world.\n"));
//! ```

pub mod article;
pub mod convert;
pub mod dom_tree;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod fetch;
pub mod formatters;
pub mod metadata;
pub mod parse;
pub mod patterns;
pub mod postprocess;
pub mod preprocess;
pub mod readability;
pub mod scoring;
pub mod serializer;
pub mod text_index;
pub mod visibility;

pub use article::{Article, OutputFormat};
pub use convert::{Converted, Converter, ConverterBuilder, Origin, page_serializer};
#[doc(hidden)]
pub use dom_tree::{DomNode, DomTree, NodeData, NodeId};
pub use error::{ReadmarkError, Result};
#[doc(hidden)]
pub use extract::{ExtractConfig, ExtractedContent, extract_content};
pub use fallback::fallback_markdown;
#[cfg(feature = "fetch")]
pub use fetch::{FetchConfig, fetch_url};
pub use fetch::{fetch_file, fetch_stdin};
pub use formatters::{FrontMatterExtras, MarkdownDocument, TextConfig, convert_to_text};
pub use metadata::ArticleMetadata;
pub use parse::Document;
pub use patterns::PatternSet;
#[doc(hidden)]
pub use postprocess::PostProcessConfig;
#[doc(hidden)]
pub use preprocess::PreprocessConfig;
#[cfg(feature = "fetch")]
pub use readability::fetch_and_parse;
pub use readability::{Readability, ReadabilityConfig, ReadabilityConfigBuilder, is_probably_readable, parse, parse_with_url};
pub use serializer::{
    CodeBlockStyle, Filter, HeadingStyle, LinkReferenceStyle, LinkStyle, MarkdownInput, MarkdownOptions,
    MarkdownSerializer, MarkdownSerializerBuilder, Rule,
};
pub use visibility::{AlwaysVisible, VisibilityOracle};
