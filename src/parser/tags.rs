//! Doc-comment tag parser. A line-by-line pass splits the comment into a
//! free-text description and tag blocks, then each block is parsed on its
//! own so one malformed tag never affects the others.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{Location, Tag, TagKind, TagParam};
use regex::Regex;
use std::sync::LazyLock;

// -- Regex patterns -----------------------------------------------------------

static RE_GUTTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[[:blank:]]*\* ?").unwrap());

static RE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[[:blank:]]*@([A-Za-z][A-Za-z0-9_]*)(.*)$").unwrap());

static RE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[[:blank:]]*(```|~~~)").unwrap());

static RE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^\{@link(?:code|plain)?[[:space:]]+([^}|[:space:]]+)[[:space:]]*",
        r"(?:\|[[:space:]]*([^}]*))?\}[[:space:]]*(.*)$",
    ))
    .unwrap()
});

// -- Parsed comment -----------------------------------------------------------

/// A parsed documentation comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    /// Text before the first tag, plus any `@description` bodies. Line
    /// breaks are kept.
    pub description: String,
    pub tags: Vec<Tag>,
}

impl DocComment {
    pub fn has(&self, kind: &TagKind) -> bool {
        self.tags.iter().any(|t| &t.kind == kind)
    }

    pub fn first(&self, kind: &TagKind) -> Option<&Tag> {
        self.tags.iter().find(|t| &t.kind == kind)
    }

    pub fn all<'a>(&'a self, kind: &'a TagKind) -> impl Iterator<Item = &'a Tag> + 'a {
        self.tags.iter().filter(move |t| &t.kind == kind)
    }

    /// Comments that describe the file or module rather than a declaration.
    pub fn is_file_level(&self) -> bool {
        self.has(&TagKind::File) || self.has(&TagKind::Module)
    }
}

struct TagBlock {
    name: String,
    lines: Vec<String>,
}

/// Parse the raw text of a `/** ... */` comment.
pub fn parse(raw: &str, location: &Location, diags: &mut Diagnostics) -> DocComment {
    let lines = strip_markers(raw);

    let mut description: Vec<String> = Vec::new();
    let mut blocks: Vec<TagBlock> = Vec::new();
    let mut in_fence = false;

    for line in lines {
        if !in_fence {
            if let Some(caps) = RE_TAG.captures(&line) {
                blocks.push(TagBlock {
                    name: caps[1].to_string(),
                    lines: vec![caps[2].to_string()],
                });
                continue;
            }
        }
        if RE_FENCE.is_match(&line) {
            in_fence = !in_fence;
        }
        match blocks.last_mut() {
            Some(block) => block.lines.push(line),
            None => description.push(line),
        }
    }

    let mut doc = DocComment {
        description: dedent(&description),
        tags: blocks
            .into_iter()
            .map(|b| build_tag(b, location, diags))
            .collect(),
    };

    for tag in doc.tags.iter().filter(|t| t.kind == TagKind::Description) {
        if !doc.description.is_empty() {
            doc.description.push_str("\n\n");
        }
        doc.description.push_str(&tag.body);
    }
    doc
}

/// Remove `/**`, `*/` and the ` * ` gutter from every line.
fn strip_markers(raw: &str) -> Vec<String> {
    let text = raw.trim();
    let text = text.strip_prefix("/**").unwrap_or(text);
    let text = text.strip_suffix("*/").unwrap_or(text);
    text.lines()
        .map(|line| match RE_GUTTER.find(line) {
            Some(m) => line[m.end()..].trim_end().to_string(),
            None => line.trim_end().to_string(),
        })
        .collect()
}

/// Drop surrounding blank lines and the common indentation.
fn dedent(lines: &[String]) -> String {
    let start = lines.iter().position(|l| !l.trim().is_empty());
    let end = lines.iter().rposition(|l| !l.trim().is_empty());
    let (Some(start), Some(end)) = (start, end) else {
        return String::new();
    };
    let body = &lines[start..=end];
    let indent = body
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| blank_prefix(l, usize::MAX))
        .min()
        .unwrap_or(0);
    body.iter()
        .map(|l| &l[blank_prefix(l, indent)..])
        .collect::<Vec<_>>()
        .join("\n")
}

/// Length of the leading run of spaces and tabs, capped at `max`. Other
/// whitespace counts as text.
fn blank_prefix(line: &str, max: usize) -> usize {
    line.bytes()
        .take(max)
        .take_while(|b| matches!(b, b' ' | b'\t'))
        .count()
}

/// Join continuation lines with single spaces. Blank lines become
/// paragraph breaks; fenced blocks are kept verbatim.
fn unwrap_lines(lines: &[String]) -> String {
    let mut out = String::new();
    let mut in_fence = false;
    let mut paragraph_break = false;
    let mut after_fence = false;

    for line in lines {
        let fence = RE_FENCE.is_match(line);
        if in_fence || fence {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(line);
            if fence {
                in_fence = !in_fence;
            }
            after_fence = !in_fence;
            continue;
        }
        let text = line.trim();
        if text.is_empty() {
            paragraph_break = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push_str(if paragraph_break {
                "\n\n"
            } else if after_fence {
                "\n"
            } else {
                " "
            });
        }
        paragraph_break = false;
        after_fence = false;
        out.push_str(text);
    }
    out
}

/// Example text, verbatim. Text on the tag's own line is the first line.
fn example_body(lines: &[String]) -> String {
    let mut body: Vec<String> = Vec::with_capacity(lines.len());
    if let Some((first, rest)) = lines.split_first() {
        body.push(first.trim().to_string());
        body.extend(rest.iter().cloned());
    }
    while body.last().is_some_and(|l| l.trim().is_empty()) {
        body.pop();
    }
    let start = body.iter().position(|l| !l.trim().is_empty()).unwrap_or(body.len());
    body[start..].join("\n")
}

// -- Tag bodies ---------------------------------------------------------------

enum Group<'a> {
    Absent,
    Found(&'a str, &'a str),
    Unterminated,
}

/// Split a leading bracketed group off `s`: its contents and what follows.
fn split_group(s: &str, open: char, close: char) -> Group<'_> {
    if !s.starts_with(open) {
        return Group::Absent;
    }
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' | '`' => quote = Some(c),
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Group::Found(&s[open.len_utf8()..i], &s[i + close.len_utf8()..]);
                }
            }
            _ => {}
        }
    }
    Group::Unterminated
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    (&s[..end], s[end..].trim_start())
}

/// `- text` and `-text` both mean `text`.
fn strip_dash(s: &str) -> String {
    let s = s.trim();
    s.strip_prefix('-').map(str::trim_start).unwrap_or(s).to_string()
}

fn build_tag(block: TagBlock, location: &Location, diags: &mut Diagnostics) -> Tag {
    let mut tag = Tag::new(TagKind::from_name(&block.name));

    if tag.kind == TagKind::Example {
        tag.body = example_body(&block.lines);
        return tag;
    }

    let text = unwrap_lines(&block.lines);
    let head_is_empty = block.lines.first().is_none_or(|l| l.trim().is_empty());

    match tag.kind {
        TagKind::Param | TagKind::Property => {
            parse_param(&mut tag, &block.name, &text, location, diags)
        }
        TagKind::See => parse_see(&mut tag, &text),
        // Arguments only come from the tag's own line. Text on later lines
        // is description.
        _ if tag.kind.takes_argument() && head_is_empty => tag.body = text,
        _ => parse_typed(&mut tag, &block.name, &text, location, diags),
    }
    tag
}

fn malformed(
    tag: &mut Tag,
    name: &str,
    rest: &str,
    problem: &str,
    location: &Location,
    diags: &mut Diagnostics,
) {
    diags.warn(
        DiagnosticKind::MalformedTag,
        Some(location),
        format!("@{name}: {problem}, kept as text"),
    );
    tag.body = rest.trim().to_string();
}

/// `{type} arg rest` for tags with an optional type and argument.
fn parse_typed(
    tag: &mut Tag,
    name: &str,
    text: &str,
    location: &Location,
    diags: &mut Diagnostics,
) {
    let mut rest = text.trim_start();
    match split_group(rest, '{', '}') {
        Group::Found(inner, after) => {
            tag.type_expr = Some(inner.trim().to_string());
            rest = after.trim_start();
        }
        Group::Unterminated => {
            return malformed(tag, name, rest, "unterminated `{`", location, diags)
        }
        Group::Absent => {}
    }

    if tag.kind.takes_argument() {
        let (word, after) = split_word(rest);
        if !word.is_empty() {
            tag.args.push(word.to_string());
            rest = after;
        } else if matches!(tag.kind, TagKind::Augments | TagKind::Implements) {
            if let Some(ty) = &tag.type_expr {
                tag.args.push(ty.clone());
            }
        }
    }
    tag.body = strip_dash(rest);
}

/// `{type} name - text`, `{type} [name=default] text` or `name {type} text`.
fn parse_param(
    tag: &mut Tag,
    name: &str,
    text: &str,
    location: &Location,
    diags: &mut Diagnostics,
) {
    let mut rest = text.trim_start();
    let mut type_expr = None;

    match split_group(rest, '{', '}') {
        Group::Found(inner, after) => {
            type_expr = Some(inner.trim().to_string());
            rest = after.trim_start();
        }
        Group::Unterminated => {
            return malformed(tag, name, rest, "unterminated `{`", location, diags)
        }
        Group::Absent => {}
    }

    let mut param = TagParam {
        name: String::new(),
        optional: false,
        default: None,
        variadic: false,
    };

    match split_group(rest, '[', ']') {
        Group::Found(inner, after) => {
            let (param_name, default) = match inner.split_once('=') {
                Some((n, d)) => (n.trim(), Some(d.trim()).filter(|d| !d.is_empty())),
                None => (inner.trim(), None),
            };
            param.name = param_name.to_string();
            param.default = default.map(str::to_string);
            param.optional = true;
            rest = after.trim_start();
        }
        Group::Unterminated => {
            tag.type_expr = type_expr;
            return malformed(tag, name, rest, "unterminated `[`", location, diags);
        }
        Group::Absent => {
            let (word, after) = split_word(rest);
            param.name = word.to_string();
            rest = after;
        }
    }

    if param.name.is_empty() {
        tag.type_expr = type_expr;
        return malformed(tag, name, rest, "missing name", location, diags);
    }

    if type_expr.is_none() {
        match split_group(rest, '{', '}') {
            Group::Found(inner, after) => {
                type_expr = Some(inner.trim().to_string());
                rest = after.trim_start();
            }
            Group::Unterminated => {
                tag.param = Some(param);
                return malformed(tag, name, rest, "unterminated `{`", location, diags);
            }
            Group::Absent => {}
        }
    }

    if let Some(stripped) = param.name.strip_prefix("...") {
        param.name = stripped.to_string();
        param.variadic = true;
    }
    if let Some(ty) = type_expr {
        let mut ty = ty.as_str();
        if let Some(stripped) = ty.strip_prefix("...") {
            param.variadic = true;
            ty = stripped;
        }
        if let Some(stripped) = ty.strip_suffix('=') {
            param.optional = true;
            ty = stripped;
        }
        tag.type_expr = Some(ty.trim().to_string());
    }

    tag.param = Some(param);
    tag.body = strip_dash(rest);
}

/// `@see Target text` or `@see {@link Target|label} text`.
fn parse_see(tag: &mut Tag, text: &str) {
    let text = text.trim();
    if let Some(caps) = RE_LINK.captures(text) {
        tag.args.push(caps[1].to_string());
        let trailing = caps.get(3).map_or("", |m| m.as_str());
        let label = caps.get(2).map_or("", |m| m.as_str());
        tag.body = if trailing.is_empty() { label.trim() } else { trailing }.to_string();
        return;
    }
    let (word, rest) = split_word(text);
    if !word.is_empty() {
        tag.args.push(word.to_string());
    }
    tag.body = strip_dash(rest);
}
