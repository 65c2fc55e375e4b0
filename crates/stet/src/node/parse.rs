//! YAML/JSON parser producing the lossless node tree.
//!
//! Hand-written recursive descent over the subset these documents use:
//! block mappings and sequences (including compact `- key: value` items and
//! zero-indented sequences), flow collections (a superset of JSON), plain
//! and quoted scalars, literal/folded block scalars, comments, anchors and
//! aliases. Comments and blank lines collected while skipping between
//! constructs attach to the next node parsed; comments trailing the document
//! attach to the document node.

use std::collections::HashMap;

use crate::{
    error::Error,
    node::{tag, Node, NodeArena, NodeId, NodeKind, Style},
};

/// Result of parsing one document.
#[derive(Debug)]
pub(crate) struct ParseOutcome {
    /// The document node.
    pub root: NodeId,
    /// Indent step observed at the first block descent, if any.
    pub detected_indent: Option<usize>,
}

pub(crate) fn parse_document(arena: &mut NodeArena, input: &str) -> Result<ParseOutcome, Error> {
    let mut parser = Parser::new(arena, input);
    let root = parser.document()?;
    Ok(ParseOutcome {
        root,
        detected_indent: parser.detected_indent,
    })
}

/// A scalar token scanned at a block position, before it is known whether it
/// is a mapping key or a standalone value.
struct ScannedScalar {
    text: String,
    style: Style,
    quoted: bool,
    is_key: bool,
    line: u32,
    column: u32,
}

struct Parser<'a> {
    arena: &'a mut NodeArena,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    column: u32,
    /// Comment/blank lines collected since the last node; `""` is a blank line.
    pending: Vec<String>,
    /// Set when positioned at the first content byte of a line whose indent
    /// has been measured but whose content has not been claimed yet.
    lookahead: Option<usize>,
    anchors: HashMap<String, NodeId>,
    detected_indent: Option<usize>,
}

impl<'a> Parser<'a> {
    fn new(arena: &'a mut NodeArena, input: &'a str) -> Self {
        Self {
            arena,
            bytes: input.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            pending: Vec::new(),
            lookahead: None,
            anchors: HashMap::new(),
            detected_indent: None,
        }
    }

    // ===== Low-level scanning =====

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(byte)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::syntax(self.line, self.column, message)
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.bump();
        }
    }

    /// Consumes an optional `\r` and a `\n` (or EOF).
    fn consume_line_end(&mut self) -> Result<(), Error> {
        if self.peek() == Some(b'\r') {
            self.bump();
        }
        match self.peek() {
            Some(b'\n') => {
                self.bump();
                Ok(())
            }
            None => Ok(()),
            Some(other) => Err(self.error(format!(
                "unexpected character `{}` at end of line",
                other as char
            ))),
        }
    }

    /// Reads the remainder of the current line: optional spaces, optional
    /// `# comment` (returned without trailing whitespace), then the line end.
    fn consume_line_remainder(&mut self) -> Result<String, Error> {
        self.skip_spaces();
        let mut comment = String::new();
        if self.peek() == Some(b'#') {
            comment = self.read_comment_text();
        }
        self.consume_line_end()?;
        Ok(comment)
    }

    /// Reads `#...` up to (not including) the line end.
    fn read_comment_text(&mut self) -> String {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte == b'\n' || byte == b'\r' {
                break;
            }
            self.bump();
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or_default();
        text.trim_end().to_owned()
    }

    /// Drains collected comment/blank lines into a comment block. Each line
    /// is newline-terminated, so a single blank line (`"\n"`) is distinct
    /// from no block at all (`""`).
    fn take_pending(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            let mut block = std::mem::take(&mut self.pending).join("\n");
            block.push('\n');
            block
        }
    }

    /// From a line start, consumes blank lines and full-line comments into
    /// `pending` and stops at the first content byte, recording its indent in
    /// `lookahead`. Returns the indent, or `None` at EOF.
    fn advance_to_content(&mut self) -> Result<Option<usize>, Error> {
        if self.lookahead.is_some() {
            return Ok(self.lookahead);
        }
        loop {
            let mut indent = 0;
            while self.peek() == Some(b' ') {
                self.bump();
                indent += 1;
            }
            match self.peek() {
                None => return Ok(None),
                Some(b'\t') => {
                    return Err(self.error("tab characters are not allowed in indentation"));
                }
                Some(b'\r') | Some(b'\n') => {
                    self.consume_line_end()?;
                    self.pending.push(String::new());
                }
                Some(b'#') => {
                    let comment = self.read_comment_text();
                    self.consume_line_end()?;
                    self.pending.push(comment);
                }
                Some(_) => {
                    self.lookahead = Some(indent);
                    return Ok(Some(indent));
                }
            }
        }
    }

    fn claim_content(&mut self) {
        self.lookahead = None;
    }

    // ===== Document =====

    fn document(&mut self) -> Result<NodeId, Error> {
        let mut style = Style::empty();
        let mut content = None;

        if self.advance_to_content()?.is_some() {
            if self.at_marker(b"---") {
                style |= Style::EXPLICIT_START;
                self.claim_content();
                self.pos += 3;
                self.column += 3;
                self.skip_spaces();
                match self.peek() {
                    None | Some(b'\n') | Some(b'\r') | Some(b'#') => {
                        self.consume_line_remainder()?;
                    }
                    Some(_) => {
                        let indent = (self.column - 1) as usize;
                        content = Some(self.parse_block_node(indent)?);
                    }
                }
            }
            if content.is_none() {
                if let Some(indent) = self.advance_to_content()? {
                    self.claim_content();
                    content = Some(self.parse_block_node(indent)?);
                }
            }
        }

        // Only comments may follow the content; `...` ends the document.
        if self.advance_to_content()?.is_some() {
            if self.at_marker(b"...") {
                self.claim_content();
                self.pos += 3;
                self.column += 3;
                self.consume_line_remainder()?;
            }
            if self.advance_to_content()?.is_some() {
                let message = if self.at_marker(b"---") {
                    "multiple documents are not supported"
                } else {
                    "trailing content after document"
                };
                return Err(self.error(message));
            }
        }

        let foot = self.take_pending();
        let mut node = Node::new(NodeKind::Document { content }).with_style(style);
        node.foot_comment = foot;
        node.line = 1;
        node.column = 1;
        Ok(self.arena.insert(node))
    }

    fn at_marker(&self, marker: &[u8]) -> bool {
        self.bytes[self.pos..].starts_with(marker)
            && matches!(
                self.bytes.get(self.pos + marker.len()),
                None | Some(b' ') | Some(b'\n') | Some(b'\r')
            )
    }

    // ===== Block context =====

    /// Parses the node starting at the current position (which must be at a
    /// content byte). `indent` is the node's column (0-based). On return the
    /// construct is fully consumed, including its final line end.
    fn parse_block_node(&mut self, indent: usize) -> Result<NodeId, Error> {
        self.claim_content();
        match self.peek() {
            Some(b'-')
                if matches!(
                    self.peek_at(1),
                    None | Some(b' ') | Some(b'\n') | Some(b'\r')
                ) =>
            {
                self.parse_block_sequence(indent)
            }
            Some(b'{') | Some(b'[') => {
                let id = self.parse_flow_node()?;
                self.skip_spaces();
                if self.peek() == Some(b':') {
                    return Err(self.error("complex mapping keys are not supported"));
                }
                let comment = self.consume_line_remainder()?;
                self.arena[id].line_comment = comment;
                self.arena[id].head_comment = self.take_pending();
                Ok(id)
            }
            Some(b'&') => {
                let (line, column) = (self.line, self.column);
                self.bump();
                let name = self.read_anchor_name()?;
                self.skip_spaces();
                let id = match self.peek() {
                    None | Some(b'\n') | Some(b'\r') | Some(b'#') => {
                        // Anchored block collection on the following lines;
                        // it may align with the anchor itself (sequence items).
                        self.consume_line_remainder()?;
                        match self.advance_to_content()? {
                            Some(child) if child >= indent => self.parse_block_node(child)?,
                            _ => self.null_scalar(line, column),
                        }
                    }
                    Some(_) => {
                        let child_indent = (self.column - 1) as usize;
                        self.parse_block_node(child_indent)?
                    }
                };
                self.arena[id].anchor = Some(name.clone());
                self.anchors.insert(name, id);
                Ok(id)
            }
            Some(b'*') => {
                let (line, column) = (self.line, self.column);
                self.bump();
                let name = self.read_anchor_name()?;
                self.skip_spaces();
                if self.peek() == Some(b':') {
                    return Err(Error::AliasKey { line, column });
                }
                let target = *self
                    .anchors
                    .get(&name)
                    .ok_or(Error::UnknownAnchor {
                        name: name.clone(),
                        line,
                        column,
                    })?;
                let comment = self.consume_line_remainder()?;
                let mut node = Node::new(NodeKind::Alias { name, target });
                node.line = line;
                node.column = column;
                node.line_comment = comment;
                node.head_comment = self.take_pending();
                Ok(self.arena.insert(node))
            }
            Some(b'|') | Some(b'>') => self.parse_block_scalar(indent),
            Some(b'?') => Err(self.error("explicit key syntax is not supported")),
            Some(b'!') => Err(self.error("explicit tags are not supported")),
            Some(_) => {
                let scanned = self.scan_block_scalar_token()?;
                if scanned.is_key {
                    self.parse_block_mapping(indent, scanned)
                } else {
                    let comment = self.consume_line_remainder()?;
                    let id = self.scalar_from_scan(&scanned);
                    self.arena[id].line_comment = comment;
                    self.arena[id].head_comment = self.take_pending();
                    Ok(id)
                }
            }
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn null_scalar(&mut self, line: u32, column: u32) -> NodeId {
        let mut node = Node::scalar("", tag::NULL);
        node.line = line;
        node.column = column;
        self.arena.insert(node)
    }

    fn scalar_from_scan(&mut self, scanned: &ScannedScalar) -> NodeId {
        let resolved_tag = if scanned.quoted {
            tag::STR
        } else {
            resolve_plain_tag(&scanned.text)
        };
        let mut node = Node::scalar(scanned.text.clone(), resolved_tag).with_style(scanned.style);
        node.line = scanned.line;
        node.column = scanned.column;
        self.arena.insert(node)
    }

    fn parse_block_mapping(
        &mut self,
        indent: usize,
        first_key: ScannedScalar,
    ) -> Result<NodeId, Error> {
        let (map_line, map_column) = (first_key.line, first_key.column);
        let mut entries = Vec::new();
        let mut key = first_key;

        loop {
            let head = self.take_pending();
            let key_id = self.scalar_from_scan(&key);
            self.arena[key_id].head_comment = head;

            debug_assert_eq!(self.peek(), Some(b':'));
            self.bump();
            self.skip_spaces();
            let value_id = self.parse_value_position(indent, key_id)?;
            entries.push((key_id, value_id));

            match self.advance_to_content()? {
                Some(next) if next == indent => {
                    self.claim_content();
                    match self.peek() {
                        Some(b'-')
                            if matches!(
                                self.peek_at(1),
                                None | Some(b' ') | Some(b'\n') | Some(b'\r')
                            ) =>
                        {
                            return Err(self.error("unexpected sequence item in mapping"));
                        }
                        Some(b'*') => {
                            return Err(Error::AliasKey {
                                line: self.line,
                                column: self.column,
                            });
                        }
                        Some(b'?') => {
                            return Err(self.error("explicit key syntax is not supported"));
                        }
                        _ => {}
                    }
                    let scanned = self.scan_block_scalar_token()?;
                    if !scanned.is_key {
                        return Err(Error::syntax(
                            scanned.line,
                            scanned.column,
                            "expected a mapping key",
                        ));
                    }
                    key = scanned;
                }
                Some(next) if next > indent => {
                    return Err(self.error("unexpected indentation"));
                }
                _ => break,
            }
        }

        let mut node = Node::new(NodeKind::Mapping { entries });
        node.line = map_line;
        node.column = map_column;
        Ok(self.arena.insert(node))
    }

    /// Parses the value after `key:` (spaces already skipped). `indent` is
    /// the key's indent.
    fn parse_value_position(&mut self, indent: usize, key_id: NodeId) -> Result<NodeId, Error> {
        match self.peek() {
            None => Ok(self.null_scalar(self.line, self.column)),
            Some(b'\n') | Some(b'\r') | Some(b'#') => {
                let comment = self.consume_line_remainder()?;
                self.arena[key_id].line_comment = comment;
                self.parse_nested_block_value(indent)
            }
            Some(b'|') | Some(b'>') => self.parse_block_scalar(indent),
            Some(b'&') => {
                self.bump();
                let name = self.read_anchor_name()?;
                self.skip_spaces();
                let id = match self.peek() {
                    None | Some(b'\n') | Some(b'\r') | Some(b'#') => {
                        let comment = self.consume_line_remainder()?;
                        self.arena[key_id].line_comment = comment;
                        self.parse_nested_block_value(indent)?
                    }
                    Some(b'|') | Some(b'>') => self.parse_block_scalar(indent)?,
                    Some(_) => {
                        let child_indent = (self.column - 1) as usize;
                        self.parse_block_node(child_indent)?
                    }
                };
                self.arena[id].anchor = Some(name.clone());
                self.anchors.insert(name, id);
                Ok(id)
            }
            Some(_) => {
                let child_indent = (self.column - 1) as usize;
                self.parse_block_node(child_indent)
            }
        }
    }

    /// Value laid out on the lines after its key: a deeper-indented block, a
    /// zero-indented sequence, or nothing (implicit null).
    fn parse_nested_block_value(&mut self, indent: usize) -> Result<NodeId, Error> {
        match self.advance_to_content()? {
            Some(child) if child > indent => {
                if self.detected_indent.is_none() {
                    self.detected_indent = Some(child - indent);
                }
                self.parse_block_node(child)
            }
            Some(child)
                if child == indent
                    && self.peek() == Some(b'-')
                    && matches!(
                        self.peek_at(1),
                        None | Some(b' ') | Some(b'\n') | Some(b'\r')
                    ) =>
            {
                let id = self.parse_block_node(child)?;
                self.arena[id].style |= Style::ZERO_INDENTED;
                Ok(id)
            }
            _ => Ok(self.null_scalar(self.line, self.column)),
        }
    }

    fn parse_block_sequence(&mut self, indent: usize) -> Result<NodeId, Error> {
        let (seq_line, seq_column) = (self.line, self.column);
        let mut items = Vec::new();

        loop {
            debug_assert_eq!(self.peek(), Some(b'-'));
            self.bump();
            self.skip_spaces();
            let item = match self.peek() {
                None | Some(b'\n') | Some(b'\r') | Some(b'#') => {
                    self.consume_line_remainder()?;
                    match self.advance_to_content()? {
                        Some(child) if child > indent => {
                            if self.detected_indent.is_none() {
                                self.detected_indent = Some(child - indent);
                            }
                            self.parse_block_node(child)?
                        }
                        _ => self.null_scalar(self.line, self.column),
                    }
                }
                Some(_) => {
                    let item_indent = (self.column - 1) as usize;
                    self.parse_block_node(item_indent)?
                }
            };
            items.push(item);

            match self.advance_to_content()? {
                Some(next)
                    if next == indent
                        && self.peek() == Some(b'-')
                        && matches!(
                            self.peek_at(1),
                            None | Some(b' ') | Some(b'\n') | Some(b'\r')
                        ) =>
                {
                    self.claim_content();
                }
                _ => break,
            }
        }

        let mut node = Node::new(NodeKind::Sequence { items });
        node.line = seq_line;
        node.column = seq_column;
        Ok(self.arena.insert(node))
    }

    // ===== Scalars =====

    /// Scans a quoted or plain scalar at a block position and reports whether
    /// it is followed by `:` (i.e. is a mapping key). Does not consume the
    /// `:` or the line remainder.
    fn scan_block_scalar_token(&mut self) -> Result<ScannedScalar, Error> {
        let (line, column) = (self.line, self.column);
        match self.peek() {
            Some(b'"') => {
                let text = self.parse_double_quoted()?;
                self.skip_spaces();
                let is_key = self.peek() == Some(b':') && self.colon_ends_token(1);
                Ok(ScannedScalar {
                    text,
                    style: Style::DOUBLE_QUOTED,
                    quoted: true,
                    is_key,
                    line,
                    column,
                })
            }
            Some(b'\'') => {
                let text = self.parse_single_quoted()?;
                self.skip_spaces();
                let is_key = self.peek() == Some(b':') && self.colon_ends_token(1);
                Ok(ScannedScalar {
                    text,
                    style: Style::SINGLE_QUOTED,
                    quoted: true,
                    is_key,
                    line,
                    column,
                })
            }
            _ => {
                let start = self.pos;
                let mut is_key = false;
                while let Some(byte) = self.peek() {
                    match byte {
                        b'\n' | b'\r' => break,
                        b':' if self.colon_ends_token(1) => {
                            is_key = true;
                            break;
                        }
                        b'#' if self.pos > start && self.bytes[self.pos - 1] == b' ' => break,
                        _ => {
                            self.bump();
                        }
                    }
                }
                let text = std::str::from_utf8(&self.bytes[start..self.pos])
                    .unwrap_or_default()
                    .trim_end()
                    .to_owned();
                if text.is_empty() {
                    return Err(self.error("expected a scalar"));
                }
                Ok(ScannedScalar {
                    text,
                    style: Style::empty(),
                    quoted: false,
                    is_key,
                    line,
                    column,
                })
            }
        }
    }

    /// In block context `:` terminates a token only when followed by
    /// whitespace or the end of input.
    fn colon_ends_token(&self, offset: usize) -> bool {
        matches!(
            self.peek_at(offset),
            None | Some(b' ') | Some(b'\n') | Some(b'\r') | Some(b'\t')
        )
    }

    fn parse_double_quoted(&mut self) -> Result<String, Error> {
        debug_assert_eq!(self.peek(), Some(b'"'));
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                None | Some(b'\n') => return Err(self.error("unterminated double-quoted scalar")),
                Some(b'"') => return Ok(text),
                Some(b'\\') => match self.bump() {
                    Some(b'n') => text.push('\n'),
                    Some(b't') => text.push('\t'),
                    Some(b'r') => text.push('\r'),
                    Some(b'0') => text.push('\0'),
                    Some(b'\\') => text.push('\\'),
                    Some(b'"') => text.push('"'),
                    Some(b'/') => text.push('/'),
                    Some(b'b') => text.push('\u{8}'),
                    Some(b'f') => text.push('\u{c}'),
                    Some(b'u') => {
                        let mut code = 0_u32;
                        for _ in 0..4 {
                            let digit = self
                                .bump()
                                .and_then(|b| (b as char).to_digit(16))
                                .ok_or_else(|| self.error("invalid \\u escape"))?;
                            code = code * 16 + digit;
                        }
                        let ch = char::from_u32(code)
                            .ok_or_else(|| self.error("invalid \\u escape"))?;
                        text.push(ch);
                    }
                    _ => return Err(self.error("unsupported escape sequence")),
                },
                Some(byte) => {
                    // Re-assemble multi-byte UTF-8 sequences byte by byte.
                    if byte.is_ascii() {
                        text.push(byte as char);
                    } else {
                        let start = self.pos - 1;
                        let width = utf8_width(byte);
                        for _ in 1..width {
                            self.bump();
                        }
                        if let Ok(chunk) = std::str::from_utf8(&self.bytes[start..self.pos]) {
                            text.push_str(chunk);
                        }
                    }
                }
            }
        }
    }

    fn parse_single_quoted(&mut self) -> Result<String, Error> {
        debug_assert_eq!(self.peek(), Some(b'\''));
        self.bump();
        let mut text = String::new();
        loop {
            match self.bump() {
                None | Some(b'\n') => return Err(self.error("unterminated single-quoted scalar")),
                Some(b'\'') => {
                    if self.peek() == Some(b'\'') {
                        self.bump();
                        text.push('\'');
                    } else {
                        return Ok(text);
                    }
                }
                Some(byte) => {
                    if byte.is_ascii() {
                        text.push(byte as char);
                    } else {
                        let start = self.pos - 1;
                        let width = utf8_width(byte);
                        for _ in 1..width {
                            self.bump();
                        }
                        if let Ok(chunk) = std::str::from_utf8(&self.bytes[start..self.pos]) {
                            text.push_str(chunk);
                        }
                    }
                }
            }
        }
    }

    /// Parses a `|` or `>` block scalar. The verbatim source text (header
    /// through the last body line) is retained for byte-exact re-emission.
    fn parse_block_scalar(&mut self, parent_indent: usize) -> Result<NodeId, Error> {
        let (line, column) = (self.line, self.column);
        let raw_start = self.pos;
        let folded = self.bump() == Some(b'>');
        let style = if folded { Style::FOLDED } else { Style::LITERAL };

        let mut chomp = Chomp::Clip;
        let mut explicit_indent = None;
        while let Some(byte) = self.peek() {
            match byte {
                b'-' => {
                    chomp = Chomp::Strip;
                    self.bump();
                }
                b'+' => {
                    chomp = Chomp::Keep;
                    self.bump();
                }
                b'1'..=b'9' => {
                    explicit_indent = Some(parent_indent + (byte - b'0') as usize);
                    self.bump();
                }
                _ => break,
            }
        }
        self.consume_line_remainder()?;

        // Collect body lines. A line belongs to the scalar when it is blank
        // or indented past the parent.
        let mut block_indent = explicit_indent;
        let mut lines: Vec<String> = Vec::new();
        let mut raw_end = self.pos;
        let mut trailing_blanks = 0_usize;
        loop {
            let line_start = self.pos;
            let mut indent = 0;
            while self.peek() == Some(b' ') {
                self.bump();
                indent += 1;
            }
            match self.peek() {
                None => break,
                Some(b'\n') | Some(b'\r') => {
                    self.consume_line_end()?;
                    lines.push(String::new());
                    trailing_blanks += 1;
                    if chomp == Chomp::Keep {
                        raw_end = self.pos;
                    }
                    continue;
                }
                Some(_) => {
                    let effective = block_indent.unwrap_or(parent_indent + 1);
                    if indent < effective {
                        // Not part of the scalar: rewind to the line start.
                        self.rewind_to(line_start);
                        break;
                    }
                    if block_indent.is_none() {
                        block_indent = Some(indent);
                    }
                    let content_start = line_start + block_indent.unwrap().min(indent);
                    while !matches!(self.peek(), None | Some(b'\n') | Some(b'\r')) {
                        self.bump();
                    }
                    let text = std::str::from_utf8(&self.bytes[content_start..self.pos])
                        .unwrap_or_default()
                        .to_owned();
                    raw_end = self.pos;
                    self.consume_line_end()?;
                    lines.push(text);
                    trailing_blanks = 0;
                }
            }
        }
        // Trailing blank lines stay outside the scalar unless `+` keeps them.
        if chomp != Chomp::Keep && trailing_blanks > 0 {
            lines.truncate(lines.len() - trailing_blanks);
        }

        let value = assemble_block_scalar(&lines, folded, chomp);
        let raw = std::str::from_utf8(&self.bytes[raw_start..raw_end])
            .unwrap_or_default()
            .to_owned();

        let mut node = Node::new(NodeKind::Scalar {
            value,
            tag: tag::STR.to_owned(),
            raw: Some(raw),
        })
        .with_style(style);
        node.line = line;
        node.column = column;
        node.head_comment = self.take_pending();
        Ok(self.arena.insert(node))
    }

    fn rewind_to(&mut self, pos: usize) {
        // Only used to back off to the start of the current line, so the
        // line counter is unaffected.
        self.column -= (self.pos - pos) as u32;
        self.pos = pos;
    }

    fn read_anchor_name(&mut self) -> Result<String, Error> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
                self.bump();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.error("expected an anchor name"));
        }
        Ok(std::str::from_utf8(&self.bytes[start..self.pos])
            .unwrap_or_default()
            .to_owned())
    }

    // ===== Flow context =====

    fn parse_flow_node(&mut self) -> Result<NodeId, Error> {
        let (line, column) = (self.line, self.column);
        match self.peek() {
            Some(b'{') => {
                self.bump();
                let mut entries = Vec::new();
                loop {
                    self.skip_flow_ws()?;
                    if self.peek() == Some(b'}') {
                        self.bump();
                        break;
                    }
                    let key = self.parse_flow_key()?;
                    self.skip_flow_ws()?;
                    if self.bump() != Some(b':') {
                        return Err(self.error("expected `:` in flow mapping"));
                    }
                    self.skip_flow_ws()?;
                    let value = self.parse_flow_node()?;
                    entries.push((key, value));
                    self.skip_flow_ws()?;
                    match self.peek() {
                        Some(b',') => {
                            self.bump();
                        }
                        Some(b'}') => {}
                        _ => return Err(self.error("expected `,` or `}` in flow mapping")),
                    }
                }
                let mut node =
                    Node::new(NodeKind::Mapping { entries }).with_style(Style::FLOW);
                node.line = line;
                node.column = column;
                Ok(self.arena.insert(node))
            }
            Some(b'[') => {
                self.bump();
                let mut items = Vec::new();
                loop {
                    self.skip_flow_ws()?;
                    if self.peek() == Some(b']') {
                        self.bump();
                        break;
                    }
                    items.push(self.parse_flow_node()?);
                    self.skip_flow_ws()?;
                    match self.peek() {
                        Some(b',') => {
                            self.bump();
                        }
                        Some(b']') => {}
                        _ => return Err(self.error("expected `,` or `]` in flow sequence")),
                    }
                }
                let mut node = Node::new(NodeKind::Sequence { items }).with_style(Style::FLOW);
                node.line = line;
                node.column = column;
                Ok(self.arena.insert(node))
            }
            Some(b'&') => {
                self.bump();
                let name = self.read_anchor_name()?;
                self.skip_flow_ws()?;
                let id = self.parse_flow_node()?;
                self.arena[id].anchor = Some(name.clone());
                self.anchors.insert(name, id);
                Ok(id)
            }
            Some(b'*') => {
                self.bump();
                let name = self.read_anchor_name()?;
                let target = *self.anchors.get(&name).ok_or(Error::UnknownAnchor {
                    name: name.clone(),
                    line,
                    column,
                })?;
                let mut node = Node::new(NodeKind::Alias { name, target });
                node.line = line;
                node.column = column;
                Ok(self.arena.insert(node))
            }
            Some(b'"') => {
                let text = self.parse_double_quoted()?;
                let mut node = Node::scalar(text, tag::STR).with_style(Style::DOUBLE_QUOTED);
                node.line = line;
                node.column = column;
                Ok(self.arena.insert(node))
            }
            Some(b'\'') => {
                let text = self.parse_single_quoted()?;
                let mut node = Node::scalar(text, tag::STR).with_style(Style::SINGLE_QUOTED);
                node.line = line;
                node.column = column;
                Ok(self.arena.insert(node))
            }
            Some(b'!') => Err(self.error("explicit tags are not supported")),
            Some(_) => {
                let text = self.scan_flow_plain()?;
                let mut node = Node::scalar(text.clone(), resolve_plain_tag(&text));
                node.line = line;
                node.column = column;
                Ok(self.arena.insert(node))
            }
            None => Err(self.error("unexpected end of input in flow context")),
        }
    }

    fn parse_flow_key(&mut self) -> Result<NodeId, Error> {
        let (line, column) = (self.line, self.column);
        let (text, style, quoted) = match self.peek() {
            Some(b'"') => (self.parse_double_quoted()?, Style::DOUBLE_QUOTED, true),
            Some(b'\'') => (self.parse_single_quoted()?, Style::SINGLE_QUOTED, true),
            Some(b'{') | Some(b'[') => {
                return Err(self.error("complex mapping keys are not supported"));
            }
            Some(b'*') => return Err(Error::AliasKey { line, column }),
            _ => (self.scan_flow_plain()?, Style::empty(), false),
        };
        let resolved_tag = if quoted {
            tag::STR
        } else {
            resolve_plain_tag(&text)
        };
        let mut node = Node::scalar(text, resolved_tag).with_style(style);
        node.line = line;
        node.column = column;
        Ok(self.arena.insert(node))
    }

    /// Plain scalar in flow context: ends at a flow indicator, a line break,
    /// or a `:` followed by whitespace/indicator.
    fn scan_flow_plain(&mut self) -> Result<String, Error> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            match byte {
                b',' | b']' | b'}' | b'{' | b'[' | b'\n' | b'\r' => break,
                b':' if matches!(
                    self.peek_at(1),
                    None | Some(b' ') | Some(b',') | Some(b']') | Some(b'}') | Some(b'\n')
                        | Some(b'\r')
                ) =>
                {
                    break;
                }
                _ => {
                    self.bump();
                }
            }
        }
        let text = std::str::from_utf8(&self.bytes[start..self.pos])
            .unwrap_or_default()
            .trim_end()
            .to_owned();
        if text.is_empty() {
            return Err(self.error("expected a flow scalar"));
        }
        Ok(text)
    }

    /// Whitespace (including line breaks) and comments inside flow
    /// collections. Flow comments are not representable in the tree and are
    /// dropped.
    fn skip_flow_ws(&mut self) -> Result<(), Error> {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') => {
                    self.bump();
                }
                Some(b'\r') | Some(b'\n') => {
                    self.consume_line_end()?;
                }
                Some(b'#') => {
                    self.read_comment_text();
                }
                _ => return Ok(()),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chomp {
    Strip,
    Clip,
    Keep,
}

fn assemble_block_scalar(lines: &[String], folded: bool, chomp: Chomp) -> String {
    let mut body = String::new();
    if folded {
        let mut previous_blank = true;
        let mut previous_indented = false;
        for (index, line) in lines.iter().enumerate() {
            let indented = line.starts_with(' ');
            if index > 0 {
                if line.is_empty() {
                    body.push('\n');
                } else if previous_blank || previous_indented || indented {
                    if !previous_blank {
                        body.push('\n');
                    }
                } else {
                    body.push(' ');
                }
            }
            body.push_str(line);
            previous_blank = line.is_empty();
            previous_indented = indented;
        }
    } else {
        body = lines.join("\n");
    }

    match chomp {
        Chomp::Strip => body.trim_end_matches('\n').to_owned(),
        Chomp::Clip => {
            let trimmed = body.trim_end_matches('\n');
            if trimmed.is_empty() {
                String::new()
            } else {
                format!("{trimmed}\n")
            }
        }
        Chomp::Keep => {
            body.push('\n');
            body
        }
    }
}

fn utf8_width(first: u8) -> usize {
    match first {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}

/// YAML 1.2 core schema tag resolution for plain scalars.
pub(crate) fn resolve_plain_tag(text: &str) -> &'static str {
    match text {
        "" | "~" | "null" | "Null" | "NULL" => return tag::NULL,
        "true" | "True" | "TRUE" | "false" | "False" | "FALSE" => return tag::BOOL,
        ".inf" | "+.inf" | "-.inf" | ".Inf" | "+.Inf" | "-.Inf" | ".nan" | ".NaN" | ".NAN" => {
            return tag::FLOAT;
        }
        _ => {}
    }

    let unsigned = text
        .strip_prefix('-')
        .or_else(|| text.strip_prefix('+'))
        .unwrap_or(text);
    if let Some(hex) = unsigned.strip_prefix("0x") {
        if !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return tag::INT;
        }
    }
    if let Some(octal) = unsigned.strip_prefix("0o") {
        if !octal.is_empty() && octal.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
            return tag::INT;
        }
    }
    if !unsigned.is_empty() && unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return tag::INT;
    }
    if is_plain_float(unsigned) {
        return tag::FLOAT;
    }
    tag::STR
}

fn is_plain_float(text: &str) -> bool {
    let mut digits = false;
    let mut dot = false;
    let mut exponent = false;
    let mut chars = text.bytes().peekable();
    while let Some(byte) = chars.next() {
        match byte {
            b'0'..=b'9' => digits = true,
            b'.' if !dot && !exponent => dot = true,
            b'e' | b'E' if digits && !exponent => {
                exponent = true;
                if matches!(chars.peek(), Some(b'+') | Some(b'-')) {
                    chars.next();
                }
                match chars.peek() {
                    Some(b'0'..=b'9') => {}
                    _ => return false,
                }
            }
            _ => return false,
        }
    }
    digits && (dot || exponent)
}
