//! A small CSS parser with position tracking.
//!
//! The tree is deliberately shallow: rules, at-rules and comments at block
//! level, declarations inside blocks. Comments inside declaration blocks are
//! dropped. Serialization is canonical, so parsing the output again yields
//! the same text.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// A 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Line number.
    pub line: usize,
    /// Column number.
    pub column: usize,
}

/// A `property: value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Property name as written.
    pub property: String,
    /// Value with `!important` removed.
    pub value: String,
    /// Whether the declaration was marked `!important`.
    pub important: bool,
    /// Where the declaration starts.
    pub position: Position,
}

impl Declaration {
    /// Creates a declaration without a source position.
    #[must_use]
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
            important: false,
            position: Position::default(),
        }
    }

    /// Returns the lowercase property name.
    #[must_use]
    pub fn name(&self) -> String {
        self.property.to_ascii_lowercase()
    }
}

/// A style rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// The selector list.
    pub selector: String,
    /// Declarations in source order.
    pub declarations: Vec<Declaration>,
    /// Where the rule starts.
    pub position: Position,
}

/// The body of an at-rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AtRuleBody {
    /// Statement at-rule such as `@import url(a.css);`.
    Statement,
    /// Block of declarations such as `@font-face`.
    Declarations(Vec<Declaration>),
    /// Block of nested nodes such as `@media`.
    Nodes(Vec<Node>),
}

/// An at-rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRule {
    /// Name without the `@`.
    pub name: String,
    /// Everything between the name and the block or semicolon.
    pub prelude: String,
    /// The body.
    pub body: AtRuleBody,
    /// Where the at-rule starts.
    pub position: Position,
}

/// A block-level node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A style rule.
    Rule(Rule),
    /// An at-rule.
    AtRule(AtRule),
    /// A comment, without delimiters.
    Comment(String),
}

/// A parsed stylesheet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Stylesheet {
    /// Top-level nodes.
    pub nodes: Vec<Node>,
}

/// Context handed to declaration-block visitors.
#[derive(Debug, Clone, Copy)]
pub struct BlockContext<'a> {
    /// Selector of the enclosing rule, `None` for at-rule declaration blocks.
    pub selector: Option<&'a str>,
    /// Name of the innermost enclosing at-rule.
    pub at_rule: Option<&'a str>,
    /// Position of the block owner.
    pub position: Position,
}

/// A syntax error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at line {}, column {}", .position.line, .position.column)]
pub struct CssParseError {
    /// What went wrong.
    pub message: String,
    /// Where it went wrong.
    pub position: Position,
}

impl Stylesheet {
    /// Parses CSS source text.
    pub fn parse(source: &str) -> Result<Self, CssParseError> {
        let mut parser = Parser::new(source);
        let nodes = parser.parse_nodes(None)?;
        Ok(Self { nodes })
    }

    /// Visits every declaration block mutably.
    pub fn for_each_block_mut(&mut self, f: &mut dyn FnMut(BlockContext<'_>, &mut Vec<Declaration>)) {
        visit_nodes_mut(&mut self.nodes, None, f);
    }

    /// Visits every declaration block.
    pub fn for_each_block(&self, f: &mut dyn FnMut(BlockContext<'_>, &[Declaration])) {
        visit_nodes(&self.nodes, None, f);
    }

    /// Visits every at-rule mutably, outermost first.
    pub fn for_each_at_rule_mut(&mut self, f: &mut dyn FnMut(&mut AtRule)) {
        visit_at_rules_mut(&mut self.nodes, f);
    }
}

fn visit_nodes_mut(
    nodes: &mut [Node],
    at_rule: Option<&str>,
    f: &mut dyn FnMut(BlockContext<'_>, &mut Vec<Declaration>),
) {
    for node in nodes {
        match node {
            Node::Rule(rule) => {
                let ctx = BlockContext {
                    selector: Some(&rule.selector),
                    at_rule,
                    position: rule.position,
                };
                f(ctx, &mut rule.declarations);
            }
            Node::AtRule(at) => {
                let position = at.position;
                match &mut at.body {
                    AtRuleBody::Declarations(decls) => {
                        let ctx = BlockContext {
                            selector: None,
                            at_rule: Some(&at.name),
                            position,
                        };
                        f(ctx, decls);
                    }
                    AtRuleBody::Nodes(children) => visit_nodes_mut(children, Some(&at.name), f),
                    AtRuleBody::Statement => {}
                }
            }
            Node::Comment(_) => {}
        }
    }
}

fn visit_nodes(nodes: &[Node], at_rule: Option<&str>, f: &mut dyn FnMut(BlockContext<'_>, &[Declaration])) {
    for node in nodes {
        match node {
            Node::Rule(rule) => f(
                BlockContext {
                    selector: Some(&rule.selector),
                    at_rule,
                    position: rule.position,
                },
                &rule.declarations,
            ),
            Node::AtRule(at) => match &at.body {
                AtRuleBody::Declarations(decls) => f(
                    BlockContext {
                        selector: None,
                        at_rule: Some(&at.name),
                        position: at.position,
                    },
                    decls,
                ),
                AtRuleBody::Nodes(children) => visit_nodes(children, Some(&at.name), f),
                AtRuleBody::Statement => {}
            },
            Node::Comment(_) => {}
        }
    }
}

fn visit_at_rules_mut(nodes: &mut [Node], f: &mut dyn FnMut(&mut AtRule)) {
    for node in nodes {
        if let Node::AtRule(at) = node {
            f(at);
            if let AtRuleBody::Nodes(children) = &mut at.body {
                visit_at_rules_mut(children, f);
            }
        }
    }
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Parser {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn starts_comment(&self) -> bool {
        self.peek() == Some('/') && self.peek_at(1) == Some('*')
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>, position: Position) -> CssParseError {
        CssParseError {
            message: message.into(),
            position,
        }
    }

    /// Reads a comment starting at `/*`, returning its inner text.
    fn read_comment(&mut self) -> Result<String, CssParseError> {
        let start = self.position();
        self.bump();
        self.bump();
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("Unterminated comment", start)),
                Some('*') if self.peek_at(1) == Some('/') => {
                    self.bump();
                    self.bump();
                    return Ok(text);
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
    }

    /// Reads a quoted string, including the quotes.
    fn read_string(&mut self, out: &mut String) -> Result<(), CssParseError> {
        let start = self.position();
        let Some(quote) = self.bump() else {
            return Ok(());
        };
        out.push(quote);
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error("Unterminated string", start)),
                Some('\\') => {
                    out.push('\\');
                    if let Some(c) = self.bump() {
                        out.push(c);
                    }
                }
                Some(c) if c == quote => {
                    out.push(c);
                    return Ok(());
                }
                Some(c) => out.push(c),
            }
        }
    }

    /// Reads text up to (not including) one of `stops` at paren depth zero.
    fn read_until(&mut self, stops: &[char]) -> Result<(String, Option<char>), CssParseError> {
        let mut text = String::new();
        let mut parens = 0usize;
        loop {
            if self.starts_comment() {
                self.read_comment()?;
                continue;
            }
            match self.peek() {
                None => return Ok((text, None)),
                Some(c) if parens == 0 && stops.contains(&c) => return Ok((text, Some(c))),
                Some('"' | '\'') => self.read_string(&mut text)?,
                Some(c) => {
                    match c {
                        '(' => parens += 1,
                        ')' => parens = parens.saturating_sub(1),
                        _ => {}
                    }
                    text.push(c);
                    self.bump();
                }
            }
        }
    }

    /// Parses nodes until end of input, or until the closing brace of the
    /// block opened at `open`.
    fn parse_nodes(&mut self, open: Option<Position>) -> Result<Vec<Node>, CssParseError> {
        let mut nodes = Vec::new();
        loop {
            self.skip_whitespace();
            if self.starts_comment() {
                nodes.push(Node::Comment(self.read_comment()?));
                continue;
            }
            match self.peek() {
                None => {
                    return match open {
                        Some(at) => Err(self.error("Unclosed block", at)),
                        None => Ok(nodes),
                    };
                }
                Some('}') => {
                    if open.is_some() {
                        self.bump();
                        return Ok(nodes);
                    }
                    return Err(self.error("Unexpected '}'", self.position()));
                }
                Some('@') => nodes.push(self.parse_at_rule()?),
                Some(_) => nodes.push(Node::Rule(self.parse_rule()?)),
            }
        }
    }

    fn parse_rule(&mut self) -> Result<Rule, CssParseError> {
        let position = self.position();
        let (selector, stop) = self.read_until(&['{', ';', '}'])?;
        match stop {
            Some('{') => {
                self.bump();
                let declarations = self.parse_declarations(position)?;
                Ok(Rule {
                    selector: normalize_whitespace(&selector),
                    declarations,
                    position,
                })
            }
            Some(c) => Err(self.error(format!("Unexpected '{c}', expected '{{'"), self.position())),
            None => Err(self.error("Unexpected end of input, expected '{'", position)),
        }
    }

    fn parse_at_rule(&mut self) -> Result<Node, CssParseError> {
        let position = self.position();
        self.bump();
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err(self.error("Expected at-rule name", position));
        }

        let (prelude, stop) = self.read_until(&['{', ';', '}'])?;
        let prelude = normalize_whitespace(&prelude);
        let body = match stop {
            Some(';') => {
                self.bump();
                AtRuleBody::Statement
            }
            Some('{') => {
                self.bump();
                if self.block_has_nested_rules() {
                    AtRuleBody::Nodes(self.parse_nodes(Some(position))?)
                } else {
                    AtRuleBody::Declarations(self.parse_declarations(position)?)
                }
            }
            Some(_) => return Err(self.error("Unexpected '}' in at-rule prelude", self.position())),
            None => return Err(self.error("Unexpected end of input in at-rule", position)),
        };

        Ok(Node::AtRule(AtRule {
            name,
            prelude,
            body,
            position,
        }))
    }

    /// Looks ahead from just after `{` for a nested `{` before the block closes.
    fn block_has_nested_rules(&self) -> bool {
        let mut i = self.pos;
        let mut quote: Option<char> = None;
        while let Some(&c) = self.chars.get(i) {
            if let Some(q) = quote {
                if c == '\\' {
                    i += 1;
                } else if c == q {
                    quote = None;
                }
            } else if c == '/' && self.chars.get(i + 1) == Some(&'*') {
                i += 2;
                while let Some(&c) = self.chars.get(i) {
                    if c == '*' && self.chars.get(i + 1) == Some(&'/') {
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            } else {
                match c {
                    '"' | '\'' => quote = Some(c),
                    '{' => return true,
                    '}' => return false,
                    _ => {}
                }
            }
            i += 1;
        }
        false
    }

    fn parse_declarations(&mut self, open: Position) -> Result<Vec<Declaration>, CssParseError> {
        let mut declarations = Vec::new();
        loop {
            self.skip_whitespace();
            if self.starts_comment() {
                self.read_comment()?;
                continue;
            }
            match self.peek() {
                None => return Err(self.error("Unclosed block", open)),
                Some('}') => {
                    self.bump();
                    return Ok(declarations);
                }
                Some(';') => {
                    self.bump();
                }
                Some(_) => {
                    let position = self.position();
                    let (text, stop) = self.read_until(&[';', '}', '{'])?;
                    match stop {
                        Some('{') => return Err(self.error("Unexpected '{' in declaration block", self.position())),
                        Some(';') => {
                            self.bump();
                        }
                        _ => {}
                    }
                    declarations.push(parse_declaration(&text, position).map_err(|m| self.error(m, position))?);
                }
            }
        }
    }
}

fn parse_declaration(text: &str, position: Position) -> Result<Declaration, String> {
    let Some((property, value)) = text.split_once(':') else {
        return Err(format!("Expected ':' in declaration '{}'", text.trim()));
    };
    let property = property.trim();
    if property.is_empty() {
        return Err("Expected property name before ':'".to_string());
    }

    let mut value = normalize_whitespace(value);
    let mut important = false;
    let lower = value.to_ascii_lowercase();
    if let Some(idx) = lower.rfind("!important") {
        if lower[idx + "!important".len()..].trim().is_empty() {
            important = true;
            value = value[..idx].trim_end().to_string();
        }
    }

    Ok(Declaration {
        property: property.to_string(),
        value,
        important,
        position,
    })
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn write_declarations(out: &mut String, decls: &[Declaration], indent: usize) {
    let pad = "  ".repeat(indent);
    for decl in decls {
        let _ = write!(out, "{pad}{}: {}", decl.property, decl.value);
        if decl.important {
            out.push_str(" !important");
        }
        out.push_str(";\n");
    }
}

fn write_nodes(out: &mut String, nodes: &[Node], indent: usize) {
    let pad = "  ".repeat(indent);
    for node in nodes {
        match node {
            Node::Comment(text) => {
                let _ = writeln!(out, "{pad}/*{text}*/");
            }
            Node::Rule(rule) => {
                let _ = writeln!(out, "{pad}{} {{", rule.selector);
                write_declarations(out, &rule.declarations, indent + 1);
                let _ = writeln!(out, "{pad}}}");
            }
            Node::AtRule(at) => {
                let head = if at.prelude.is_empty() {
                    format!("@{}", at.name)
                } else {
                    format!("@{} {}", at.name, at.prelude)
                };
                match &at.body {
                    AtRuleBody::Statement => {
                        let _ = writeln!(out, "{pad}{head};");
                    }
                    AtRuleBody::Declarations(decls) => {
                        let _ = writeln!(out, "{pad}{head} {{");
                        write_declarations(out, decls, indent + 1);
                        let _ = writeln!(out, "{pad}}}");
                    }
                    AtRuleBody::Nodes(children) => {
                        let _ = writeln!(out, "{pad}{head} {{");
                        write_nodes(out, children, indent + 1);
                        let _ = writeln!(out, "{pad}}}");
                    }
                }
            }
        }
    }
}

impl fmt::Display for Stylesheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        write_nodes(&mut out, &self.nodes, 0);
        f.write_str(&out)
    }
}
