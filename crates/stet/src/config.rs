//! Per-document emission settings.

use std::fmt;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    /// YAML 1.2 output.
    Yaml,
    /// JSON output (comments dropped, aliases resolved, keys quoted).
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Yaml => "YAML",
            Self::Json => "JSON",
        })
    }
}

/// How mapping keys are quoted on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyQuoteStyle {
    /// Keep each key's source quoting; quote new keys only when necessary.
    #[default]
    Auto,
    /// Strip quotes wherever the key is a safe plain scalar.
    Never,
    /// Double-quote every key.
    Always,
}

/// Default presentation for collections synthesized during sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionStyle {
    #[default]
    Block,
    Flow,
}

/// Document-wide emission settings, recorded once by the unmarshaller and
/// shared read-only during sync. Callers may override any field between
/// load and save.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    /// Output format; defaults to the detected input format.
    pub output_format: OutputFormat,
    /// Indentation step; detected from the first indented child, fallback 2.
    /// For JSON, 0 selects compact output.
    pub indent: usize,
    pub key_quote_style: KeyQuoteStyle,
    pub default_mapping_style: CollectionStyle,
    pub default_sequence_style: CollectionStyle,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Yaml,
            indent: 2,
            key_quote_style: KeyQuoteStyle::Auto,
            default_mapping_style: CollectionStyle::Block,
            default_sequence_style: CollectionStyle::Block,
        }
    }
}
