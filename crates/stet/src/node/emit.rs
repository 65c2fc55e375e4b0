//! Serializes a node tree back to text.
//!
//! The YAML emitter reproduces the lexical presentation recorded on each
//! node: comments, blank lines, anchors and aliases, quoting, flow vs. block
//! style, zero-indented sequences and verbatim block scalars. The JSON
//! emitter resolves aliases, drops comments, quotes every key and
//! pretty-prints at the configured indent (compact when the indent is 0).

use crate::{
    config::{DocumentConfig, KeyQuoteStyle, OutputFormat},
    node::{parse::resolve_plain_tag, tag, NodeArena, NodeId, NodeKind, Style},
};

pub(crate) fn emit(arena: &NodeArena, root: NodeId, config: &DocumentConfig) -> String {
    match config.output_format {
        OutputFormat::Yaml => YamlEmitter {
            arena,
            step: config.indent.max(1),
            key_quotes: config.key_quote_style,
            out: String::new(),
        }
        .document(root),
        OutputFormat::Json => JsonEmitter {
            arena,
            indent: config.indent,
            out: String::new(),
        }
        .document(root),
    }
}

struct YamlEmitter<'a> {
    arena: &'a NodeArena,
    step: usize,
    key_quotes: KeyQuoteStyle,
    out: String,
}

impl YamlEmitter<'_> {
    fn document(mut self, root: NodeId) -> String {
        let node = &self.arena[root];
        let (content, style, foot) = match &node.kind {
            NodeKind::Document { content } => (*content, node.style, node.foot_comment.clone()),
            _ => (Some(root), Style::empty(), String::new()),
        };

        if style.contains(Style::EXPLICIT_START) {
            self.out.push_str("---\n");
        }
        if let Some(content) = content {
            self.block_node(content, 0);
        }
        self.comment_block(&foot, 0);
        self.out
    }

    /// Emits a node at a block position, starting at column `indent`.
    fn block_node(&mut self, id: NodeId, indent: usize) {
        let node = &self.arena[id];
        match &node.kind {
            NodeKind::Mapping { .. } if !node.style.contains(Style::FLOW) => {
                self.block_mapping(id, indent, false);
            }
            NodeKind::Sequence { .. } if !node.style.contains(Style::FLOW) => {
                self.block_sequence(id, indent, false);
            }
            _ => {
                self.comment_block(&node.head_comment.clone(), indent);
                self.push_indent(indent);
                let text = self.inline_text(id);
                self.out.push_str(&text);
                self.line_comment(id);
                self.out.push('\n');
            }
        }
    }

    fn block_mapping(&mut self, id: NodeId, indent: usize, compact_first: bool) {
        let entries = self.arena.mapping_entries(id);
        if entries.is_empty() {
            // Only synthesized mappings can be empty; fall back to flow.
            self.out.push_str("{}\n");
            return;
        }
        for (index, (key_id, value_id)) in entries.iter().enumerate() {
            let key = &self.arena[*key_id];
            if index > 0 || !compact_first {
                self.comment_block(&key.head_comment.clone(), indent);
                self.push_indent(indent);
            }
            let key_text = self.key_text(*key_id);
            self.out.push_str(&key_text);
            self.out.push(':');
            self.block_entry_value(*key_id, *value_id, indent);
        }
    }

    /// Emits the value side of `key:`; handles inline values, nested blocks
    /// and block scalars.
    fn block_entry_value(&mut self, key_id: NodeId, value_id: NodeId, indent: usize) {
        let value = &self.arena[value_id];
        match &value.kind {
            NodeKind::Scalar { raw: Some(raw), .. } => {
                self.out.push(' ');
                self.anchor_prefix(value_id);
                let raw = raw.clone();
                self.out.push_str(&raw);
                if !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
            }
            NodeKind::Scalar { value: text, .. } => {
                if value.is_null() && text.is_empty() {
                    // Implicit null: nothing after the colon.
                    self.line_comment_for_entry(key_id, value_id);
                    self.out.push('\n');
                } else if value.style.intersects(Style::LITERAL | Style::FOLDED) {
                    self.out.push(' ');
                    self.anchor_prefix(value_id);
                    self.literal_scalar(value_id, indent + self.step);
                } else {
                    self.out.push(' ');
                    self.anchor_prefix(value_id);
                    let text = self.inline_scalar_text(value_id);
                    self.out.push_str(&text);
                    self.line_comment_for_entry(key_id, value_id);
                    self.out.push('\n');
                }
            }
            NodeKind::Alias { name, .. } => {
                self.out.push_str(" *");
                self.out.push_str(&name.clone());
                self.line_comment_for_entry(key_id, value_id);
                self.out.push('\n');
            }
            NodeKind::Mapping { entries } => {
                if value.style.contains(Style::FLOW) || entries.is_empty() {
                    self.out.push(' ');
                    self.anchor_prefix(value_id);
                    let text = self.flow_text(value_id);
                    self.out.push_str(&text);
                    self.line_comment_for_entry(key_id, value_id);
                    self.out.push('\n');
                } else {
                    self.anchor_suffix(value_id);
                    self.line_comment_for_entry(key_id, value_id);
                    self.out.push('\n');
                    self.block_mapping(value_id, indent + self.step, false);
                }
            }
            NodeKind::Sequence { items } => {
                if value.style.contains(Style::FLOW) || items.is_empty() {
                    self.out.push(' ');
                    self.anchor_prefix(value_id);
                    let text = self.flow_text(value_id);
                    self.out.push_str(&text);
                    self.line_comment_for_entry(key_id, value_id);
                    self.out.push('\n');
                } else {
                    self.anchor_suffix(value_id);
                    self.line_comment_for_entry(key_id, value_id);
                    self.out.push('\n');
                    let child_indent = if value.style.contains(Style::ZERO_INDENTED) {
                        indent
                    } else {
                        indent + self.step
                    };
                    self.block_sequence(value_id, child_indent, false);
                }
            }
            NodeKind::Document { .. } => {}
        }
    }

    fn block_sequence(&mut self, id: NodeId, indent: usize, compact_first: bool) {
        let items = self.arena.sequence_items(id);
        if items.is_empty() {
            self.out.push_str("[]\n");
            return;
        }
        for (index, item_id) in items.iter().enumerate() {
            let item = &self.arena[*item_id];
            let head = self.item_head_comment(*item_id);
            if index > 0 || !compact_first {
                self.comment_block(&head, indent);
                self.push_indent(indent);
            }
            self.out.push_str("- ");
            match &item.kind {
                NodeKind::Mapping { entries }
                    if !item.style.contains(Style::FLOW) && !entries.is_empty() =>
                {
                    if item.anchor.is_some() {
                        // `- &name` on its own line, block below.
                        self.anchor_prefix(*item_id);
                        trim_trailing_space(&mut self.out);
                        self.out.push('\n');
                        self.block_mapping(*item_id, indent + 2, false);
                    } else {
                        self.block_mapping(*item_id, indent + 2, true);
                    }
                }
                NodeKind::Sequence { items }
                    if !item.style.contains(Style::FLOW) && !items.is_empty() =>
                {
                    self.block_sequence(*item_id, indent + 2, true);
                }
                NodeKind::Scalar { raw: Some(raw), .. } => {
                    self.anchor_prefix(*item_id);
                    let raw = raw.clone();
                    self.out.push_str(&raw);
                    if !self.out.ends_with('\n') {
                        self.out.push('\n');
                    }
                }
                NodeKind::Scalar { .. }
                    if item.style.intersects(Style::LITERAL | Style::FOLDED) =>
                {
                    self.anchor_prefix(*item_id);
                    self.literal_scalar(*item_id, indent + 2);
                }
                _ => {
                    let text = self.inline_text(*item_id);
                    if text.is_empty() {
                        // Implicit null item: bare dash.
                        trim_trailing_space(&mut self.out);
                    }
                    self.out.push_str(&text);
                    self.line_comment(*item_id);
                    self.out.push('\n');
                }
            }
        }
    }

    /// Head comment displayed above a sequence item: block mapping items
    /// carry it on their first key.
    fn item_head_comment(&self, id: NodeId) -> String {
        let node = &self.arena[id];
        match &node.kind {
            NodeKind::Mapping { entries } if !node.style.contains(Style::FLOW) => entries
                .first()
                .map(|(key, _)| self.arena[*key].head_comment.clone())
                .unwrap_or_default(),
            _ => node.head_comment.clone(),
        }
    }

    /// Inline rendering of scalars, aliases and flow collections.
    fn inline_text(&self, id: NodeId) -> String {
        let node = &self.arena[id];
        let mut text = String::new();
        if let Some(anchor) = &node.anchor {
            text.push('&');
            text.push_str(anchor);
            text.push(' ');
        }
        match &node.kind {
            NodeKind::Alias { name, .. } => {
                text.clear();
                text.push('*');
                text.push_str(name);
            }
            NodeKind::Scalar { .. } => text.push_str(&self.inline_scalar_text(id)),
            _ => text.push_str(&self.flow_text(id)),
        }
        text
    }

    fn inline_scalar_text(&self, id: NodeId) -> String {
        let node = &self.arena[id];
        let (value, node_tag) = match &node.kind {
            NodeKind::Scalar { value, tag, .. } => (value.as_str(), tag.as_str()),
            _ => ("", tag::STR),
        };
        render_scalar(value, node_tag, node.style)
    }

    fn key_text(&self, id: NodeId) -> String {
        let node = &self.arena[id];
        let value = node.scalar_value().unwrap_or_default();
        match self.key_quotes {
            KeyQuoteStyle::Always => double_quote(value),
            KeyQuoteStyle::Never if plain_safe(value) => value.to_owned(),
            _ => render_scalar(value, node.scalar_tag().unwrap_or(tag::STR), node.style),
        }
    }

    /// `|`/`>` scalar without a verbatim source: re-derive the header from
    /// the value's trailing newlines and emit the body at `indent`.
    fn literal_scalar(&mut self, id: NodeId, indent: usize) {
        let value = match &self.arena[id].kind {
            NodeKind::Scalar { value, .. } => value.clone(),
            _ => String::new(),
        };
        let trailing = value.len() - value.trim_end_matches('\n').len();
        let header = match trailing {
            0 => "|-",
            1 => "|",
            _ => "|+",
        };
        self.out.push_str(header);
        self.out.push('\n');
        for line in value.trim_end_matches('\n').split('\n') {
            if line.is_empty() {
                self.out.push('\n');
            } else {
                self.push_indent(indent);
                self.out.push_str(line);
                self.out.push('\n');
            }
        }
        for _ in 1..trailing {
            self.out.push('\n');
        }
    }

    fn flow_text(&self, id: NodeId) -> String {
        let node = &self.arena[id];
        match &node.kind {
            NodeKind::Mapping { entries } => {
                let body: Vec<String> = entries
                    .iter()
                    .map(|(key, value)| {
                        let mut entry = self.key_text(*key);
                        entry.push_str(": ");
                        entry.push_str(&self.inline_text(*value));
                        entry
                    })
                    .collect();
                format!("{{{}}}", body.join(", "))
            }
            NodeKind::Sequence { items } => {
                let body: Vec<String> =
                    items.iter().map(|item| self.inline_text(*item)).collect();
                format!("[{}]", body.join(", "))
            }
            NodeKind::Scalar { .. } => self.inline_scalar_text(id),
            NodeKind::Alias { name, .. } => format!("*{name}"),
            NodeKind::Document { .. } => String::new(),
        }
    }

    fn anchor_prefix(&mut self, id: NodeId) {
        if let Some(anchor) = self.arena[id].anchor.clone() {
            self.out.push('&');
            self.out.push_str(&anchor);
            self.out.push(' ');
        }
    }

    /// ` &name` after `key:` for anchored block collections.
    fn anchor_suffix(&mut self, id: NodeId) {
        if let Some(anchor) = self.arena[id].anchor.clone() {
            self.out.push_str(" &");
            self.out.push_str(&anchor);
        }
    }

    /// The line comment of `key: value` lives on the value node, or on the
    /// key when the value moved to the following lines.
    fn line_comment_for_entry(&mut self, key_id: NodeId, value_id: NodeId) {
        let comment = {
            let value = &self.arena[value_id].line_comment;
            if value.is_empty() {
                self.arena[key_id].line_comment.clone()
            } else {
                value.clone()
            }
        };
        if !comment.is_empty() {
            self.out.push(' ');
            self.out.push_str(&comment);
        }
    }

    fn line_comment(&mut self, id: NodeId) {
        let comment = self.arena[id].line_comment.clone();
        if !comment.is_empty() {
            self.out.push(' ');
            self.out.push_str(&comment);
        }
    }

    /// Writes a comment block: newline-terminated lines where an empty line
    /// stands for a blank source line.
    fn comment_block(&mut self, block: &str, indent: usize) {
        if block.is_empty() {
            return;
        }
        let trimmed = block.strip_suffix('\n').unwrap_or(block);
        for line in trimmed.split('\n') {
            if line.is_empty() {
                self.out.push('\n');
            } else {
                self.push_indent(indent);
                self.out.push_str(line);
                self.out.push('\n');
            }
        }
    }

    fn push_indent(&mut self, indent: usize) {
        for _ in 0..indent {
            self.out.push(' ');
        }
    }
}

fn trim_trailing_space(out: &mut String) {
    while out.ends_with(' ') {
        out.pop();
    }
}

/// Renders a scalar for inline YAML output. Plain style is kept only when
/// the text is safe and still resolves to the node's tag; otherwise the
/// scalar is double-quoted.
fn render_scalar(value: &str, node_tag: &str, style: Style) -> String {
    if style.contains(Style::DOUBLE_QUOTED) {
        double_quote(value)
    } else if style.contains(Style::SINGLE_QUOTED) {
        format!("'{}'", value.replace('\'', "''"))
    } else if value.is_empty() && node_tag == tag::NULL {
        // Implicit null: rendered as nothing.
        String::new()
    } else if plain_safe(value) && resolve_plain_tag(value) == node_tag {
        value.to_owned()
    } else {
        double_quote(value)
    }
}

/// Can `text` be emitted as a plain scalar without changing meaning?
pub(crate) fn plain_safe(text: &str) -> bool {
    if text.is_empty() || text.starts_with(' ') || text.ends_with(' ') || text.ends_with(':') {
        return false;
    }
    let first = text.as_bytes()[0];
    if matches!(
        first,
        b'#' | b'&' | b'*' | b'!' | b'|' | b'>' | b'{' | b'}' | b'[' | b']' | b'%' | b'@' | b'`'
            | b'"' | b'\'' | b',' | b'?'
    ) {
        return false;
    }
    if text.starts_with("- ") || text == "-" || text.starts_with(": ") {
        return false;
    }
    !(text.contains('\n')
        || text.contains(": ")
        || text.contains(" #")
        || text.contains('\t'))
}

fn double_quote(value: &str) -> String {
    let mut text = String::with_capacity(value.len() + 2);
    text.push('"');
    for ch in value.chars() {
        match ch {
            '"' => text.push_str("\\\""),
            '\\' => text.push_str("\\\\"),
            '\n' => text.push_str("\\n"),
            '\t' => text.push_str("\\t"),
            '\r' => text.push_str("\\r"),
            '\0' => text.push_str("\\0"),
            ch if (ch as u32) < 0x20 => {
                text.push_str(&format!("\\u{:04x}", ch as u32));
            }
            ch => text.push(ch),
        }
    }
    text.push('"');
    text
}

struct JsonEmitter<'a> {
    arena: &'a NodeArena,
    indent: usize,
    out: String,
}

impl JsonEmitter<'_> {
    fn document(mut self, root: NodeId) -> String {
        let content = self.arena.content(self.arena.resolve(root));
        match content {
            Some(id) => self.value(id, 0),
            None => self.out.push_str("null"),
        }
        self.out.push('\n');
        self.out
    }

    fn value(&mut self, id: NodeId, depth: usize) {
        let id = self.arena.resolve(id);
        let node = &self.arena[id];
        match &node.kind {
            NodeKind::Scalar { value, tag: t, .. } => {
                let rendered = json_scalar(value, t);
                self.out.push_str(&rendered);
            }
            NodeKind::Mapping { entries } => {
                if entries.is_empty() {
                    self.out.push_str("{}");
                    return;
                }
                let entries = entries.clone();
                self.out.push('{');
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        self.out.push(',');
                    }
                    self.newline_indent(depth + 1);
                    let key_text = self.arena.scalar_value(*key).unwrap_or_default();
                    self.out.push_str(&json_string(key_text));
                    self.out.push(':');
                    if self.indent > 0 {
                        self.out.push(' ');
                    }
                    self.value(*value, depth + 1);
                }
                self.newline_indent(depth);
                self.out.push('}');
            }
            NodeKind::Sequence { items } => {
                if items.is_empty() {
                    self.out.push_str("[]");
                    return;
                }
                let items = items.clone();
                self.out.push('[');
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        self.out.push(',');
                    }
                    self.newline_indent(depth + 1);
                    self.value(*item, depth + 1);
                }
                self.newline_indent(depth);
                self.out.push(']');
            }
            NodeKind::Alias { .. } | NodeKind::Document { .. } => self.out.push_str("null"),
        }
    }

    fn newline_indent(&mut self, depth: usize) {
        if self.indent > 0 {
            self.out.push('\n');
            for _ in 0..depth * self.indent {
                self.out.push(' ');
            }
        }
    }
}

fn json_scalar(value: &str, node_tag: &str) -> String {
    match node_tag {
        tag::NULL => "null".to_owned(),
        tag::BOOL => {
            if value.eq_ignore_ascii_case("true") {
                "true".to_owned()
            } else {
                "false".to_owned()
            }
        }
        tag::INT => {
            if is_json_int(value) {
                value.to_owned()
            } else {
                // Hex/octal forms become decimal.
                parse_int_text(value).map_or_else(|| json_string(value), |n| n.to_string())
            }
        }
        tag::FLOAT => {
            if let Ok(number) = value.parse::<f64>() {
                if number.is_finite() {
                    return if is_json_float(value) {
                        value.to_owned()
                    } else {
                        format!("{number}")
                    };
                }
            }
            json_string(value)
        }
        _ => json_string(value),
    }
}

fn is_json_int(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_json_float(text: &str) -> bool {
    let rest = text.strip_prefix('-').unwrap_or(text);
    rest.as_bytes().first().is_some_and(u8::is_ascii_digit)
        && rest
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'e' | b'E' | b'+' | b'-'))
}

/// Parses YAML integer forms: decimal, `0x` hex, `0o` octal.
pub(crate) fn parse_int_text(text: &str) -> Option<i64> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let magnitude = if let Some(hex) = unsigned.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(octal) = unsigned.strip_prefix("0o") {
        i64::from_str_radix(octal, 8).ok()?
    } else {
        unsigned.parse::<i64>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

fn json_string(value: &str) -> String {
    let mut text = String::with_capacity(value.len() + 2);
    text.push('"');
    for ch in value.chars() {
        match ch {
            '"' => text.push_str("\\\""),
            '\\' => text.push_str("\\\\"),
            '\n' => text.push_str("\\n"),
            '\t' => text.push_str("\\t"),
            '\r' => text.push_str("\\r"),
            ch if (ch as u32) < 0x20 => text.push_str(&format!("\\u{:04x}", ch as u32)),
            ch => text.push(ch),
        }
    }
    text.push('"');
    text
}
