//! Output options for the Markdown serializer.

/// How headings are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeadingStyle {
    /// `# Heading`
    #[default]
    Atx,
    /// Underlined with `=` or `-`; levels 3 to 6 still use ATX.
    Setext,
}

/// How `pre > code` blocks are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodeBlockStyle {
    #[default]
    Fenced,
    Indented,
}

/// Whether link targets sit inline or in reference definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkStyle {
    #[default]
    Inlined,
    Referenced,
}

/// Shape of reference links when [`LinkStyle::Referenced`] is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkReferenceStyle {
    /// `[text][1]` with `[1]: href`
    #[default]
    Full,
    /// `[text][]` with `[text]: href`
    Collapsed,
    /// `[text]` with `[text]: href`
    Shortcut,
}

/// Configuration for Markdown output.
///
/// # Example
///
/// ```rust
/// use readmark_core::serializer::{HeadingStyle, MarkdownOptions};
///
/// let options = MarkdownOptions::builder()
///     .heading_style(HeadingStyle::Setext)
///     .bullet_list_marker("*")
///     .build();
/// assert_eq!(options.fence, "```");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownOptions {
    pub heading_style: HeadingStyle,
    /// Thematic break (default: `* * *`)
    pub hr: String,
    /// Marker of unordered list items (default: `-`)
    pub bullet_list_marker: String,
    pub code_block_style: CodeBlockStyle,
    /// Fence of fenced code blocks; only its first character matters for the
    /// length calculation (default: three backticks)
    pub fence: String,
    /// Emphasis delimiter (default: `*`)
    pub em_delimiter: String,
    /// Strong emphasis delimiter (default: `**`)
    pub strong_delimiter: String,
    pub link_style: LinkStyle,
    pub link_reference_style: LinkReferenceStyle,
    /// Written before the newline of a `<br>` (default: two spaces)
    pub line_break_marker: String,
    /// Keep whitespace inside `code` as if it were `pre`
    pub preformatted_code: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            heading_style: HeadingStyle::Atx,
            hr: "* * *".to_string(),
            bullet_list_marker: "-".to_string(),
            code_block_style: CodeBlockStyle::Fenced,
            fence: "```".to_string(),
            em_delimiter: "*".to_string(),
            strong_delimiter: "**".to_string(),
            link_style: LinkStyle::Inlined,
            link_reference_style: LinkReferenceStyle::Full,
            line_break_marker: "  ".to_string(),
            preformatted_code: false,
        }
    }
}

impl MarkdownOptions {
    /// Creates a new builder for MarkdownOptions.
    pub fn builder() -> MarkdownOptionsBuilder {
        MarkdownOptionsBuilder::new()
    }
}

/// Builder for MarkdownOptions.
#[derive(Debug, Clone, Default)]
pub struct MarkdownOptionsBuilder {
    options: MarkdownOptions,
}

impl MarkdownOptionsBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { options: MarkdownOptions::default() }
    }

    pub fn heading_style(mut self, value: HeadingStyle) -> Self {
        self.options.heading_style = value;
        self
    }

    pub fn hr(mut self, value: impl Into<String>) -> Self {
        self.options.hr = value.into();
        self
    }

    pub fn bullet_list_marker(mut self, value: impl Into<String>) -> Self {
        self.options.bullet_list_marker = value.into();
        self
    }

    pub fn code_block_style(mut self, value: CodeBlockStyle) -> Self {
        self.options.code_block_style = value;
        self
    }

    pub fn fence(mut self, value: impl Into<String>) -> Self {
        self.options.fence = value.into();
        self
    }

    pub fn em_delimiter(mut self, value: impl Into<String>) -> Self {
        self.options.em_delimiter = value.into();
        self
    }

    pub fn strong_delimiter(mut self, value: impl Into<String>) -> Self {
        self.options.strong_delimiter = value.into();
        self
    }

    pub fn link_style(mut self, value: LinkStyle) -> Self {
        self.options.link_style = value;
        self
    }

    pub fn link_reference_style(mut self, value: LinkReferenceStyle) -> Self {
        self.options.link_reference_style = value;
        self
    }

    pub fn line_break_marker(mut self, value: impl Into<String>) -> Self {
        self.options.line_break_marker = value.into();
        self
    }

    pub fn preformatted_code(mut self, value: bool) -> Self {
        self.options.preformatted_code = value;
        self
    }

    /// Builds the options.
    pub fn build(self) -> MarkdownOptions {
        self.options
    }
}
