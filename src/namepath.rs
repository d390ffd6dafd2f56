//! Canonical hierarchical names for entities.
//!
//! A name-path is a list of segments, each carrying the binding that joins it
//! to its container:
//!
//! - `.` static or namespace-level member (`Ns.Class.staticMember`)
//! - `#` instance member (`Ns.Class#method`)
//! - `~` inner, function-local declaration (`outer~inner`)
//!
//! Names that contain a separator, a quote, whitespace or a backslash are
//! written in double quotes (`Foo#"weird#Var"`), so every path formats to a
//! string that parses back to the same segments.

use crate::error::NamePathError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a segment is bound to the segment before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Binding {
    Static,
    Instance,
    Inner,
}

impl Binding {
    pub fn separator(self) -> char {
        match self {
            Binding::Static => '.',
            Binding::Instance => '#',
            Binding::Inner => '~',
        }
    }

    fn from_separator(c: char) -> Option<Binding> {
        match c {
            '.' => Some(Binding::Static),
            '#' => Some(Binding::Instance),
            '~' => Some(Binding::Inner),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Segment {
    pub binding: Binding,
    pub name: String,
}

/// A full or partial path to an entity. The empty path is the root namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NamePath {
    segments: Vec<Segment>,
}

impl NamePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path of a member bound to this one. Members of the root are always
    /// static, whatever binding is asked for.
    pub fn child(&self, binding: Binding, name: &str) -> NamePath {
        let binding = if self.is_root() { Binding::Static } else { binding };
        let mut segments = self.segments.clone();
        segments.push(Segment {
            binding,
            name: name.to_string(),
        });
        NamePath { segments }
    }

    /// Containing path, or `None` for top-level paths and the root.
    pub fn parent(&self) -> Option<NamePath> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(NamePath {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.segments.last().map(|s| s.name.as_str())
    }

    pub fn binding(&self) -> Option<Binding> {
        self.segments.last().map(|s| s.binding)
    }

    /// True when `self` lies strictly below `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &NamePath) -> bool {
        self.segments.len() > ancestor.segments.len()
            && self.segments[..ancestor.segments.len()] == ancestor.segments[..]
    }

    /// Suffix match on segments. The first segment of `suffix` is compared
    /// by name only unless `match_first_binding` is set (the query began
    /// with an explicit separator such as `#method`).
    pub fn ends_with(&self, suffix: &NamePath, match_first_binding: bool) -> bool {
        let n = suffix.segments.len();
        if n == 0 || n > self.segments.len() {
            return false;
        }
        let tail = &self.segments[self.segments.len() - n..];
        tail.iter().zip(&suffix.segments).enumerate().all(|(i, (a, b))| {
            a.name == b.name && (a.binding == b.binding || (i == 0 && !match_first_binding))
        })
    }

    /// Dotted rendering for consumers that cannot index separators:
    /// `Foo#bar~baz` → `Foo.bar.baz`.
    pub fn dotted(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Parse a textual name-path. A leading separator is kept as the binding
    /// of the first segment, which is how partial paths like `#method` are
    /// written.
    pub fn parse(input: &str) -> Result<NamePath, NamePathError> {
        let mut segments = Vec::new();
        let mut chars = input.chars().peekable();

        let mut binding = match chars.peek().copied().and_then(Binding::from_separator) {
            Some(b) => {
                chars.next();
                b
            }
            None => Binding::Static,
        };

        loop {
            let mut name = String::new();
            let mut quoted = false;
            if chars.peek() == Some(&'"') {
                quoted = true;
                chars.next();
                let mut closed = false;
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => match chars.next() {
                            Some(escaped) => name.push(escaped),
                            None => return Err(NamePathError::UnterminatedQuote(input.to_string())),
                        },
                        '"' => {
                            closed = true;
                            break;
                        }
                        _ => name.push(c),
                    }
                }
                if !closed {
                    return Err(NamePathError::UnterminatedQuote(input.to_string()));
                }
            }

            let mut next_binding = None;
            while let Some(c) = chars.next() {
                if let Some(b) = Binding::from_separator(c) {
                    next_binding = Some(b);
                    break;
                }
                if quoted {
                    // Text after a closing quote belongs to the same segment.
                    name.push(c);
                    continue;
                }
                if c == '\\' {
                    if let Some(escaped) = chars.next() {
                        name.push(escaped);
                    }
                    continue;
                }
                name.push(c);
            }

            if name.is_empty() && !quoted {
                if input.is_empty() {
                    return Err(NamePathError::Empty);
                }
                return Err(NamePathError::EmptySegment(input.to_string()));
            }
            segments.push(Segment { binding, name });

            match next_binding {
                Some(b) => binding = b,
                None => break,
            }
        }

        Ok(NamePath { segments })
    }
}

impl fmt::Display for NamePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", seg.binding.separator())?;
            }
            write!(f, "{}", quote_segment(&seg.name))?;
        }
        Ok(())
    }
}

impl TryFrom<String> for NamePath {
    type Error = NamePathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Ok(NamePath::root());
        }
        NamePath::parse(&value)
    }
}

impl From<NamePath> for String {
    fn from(path: NamePath) -> String {
        path.to_string()
    }
}

/// Quote a segment name when it would otherwise be ambiguous.
fn quote_segment(name: &str) -> String {
    let needs_quotes = name.is_empty()
        || name
            .chars()
            .any(|c| matches!(c, '.' | '#' | '~' | '"' | '\\') || c.is_whitespace());
    if !needs_quotes {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> NamePath {
        NamePath::parse(s).unwrap()
    }

    #[test]
    fn bindings_use_distinct_separators() {
        let class = NamePath::root().child(Binding::Static, "Foo");
        let instance = class.child(Binding::Instance, "bar");
        let stat = class.child(Binding::Static, "bar");
        assert_eq!(instance.to_string(), "Foo#bar");
        assert_eq!(stat.to_string(), "Foo.bar");
        assert_ne!(instance, stat);
    }

    #[test]
    fn weird_names_are_quoted() {
        let p = path("Foo").child(Binding::Instance, "weird#Var");
        assert_eq!(p.to_string(), r#"Foo#"weird#Var""#);
        assert_eq!(path(&p.to_string()), p);
    }

    #[test]
    fn quotes_and_backslashes_escape() {
        let p = path("A").child(Binding::Static, r#"say "hi" \ bye"#);
        let text = p.to_string();
        assert_eq!(text, r#"A."say \"hi\" \\ bye""#);
        assert_eq!(path(&text), p);
    }

    #[test]
    fn inner_paths_parse() {
        let p = path("foo~inner");
        assert_eq!(p.len(), 2);
        assert_eq!(p.binding(), Some(Binding::Inner));
        assert_eq!(p.parent(), Some(path("foo")));
    }

    #[test]
    fn leading_separator_sets_first_binding() {
        let p = path("#method");
        assert_eq!(p.segments()[0].binding, Binding::Instance);
        assert!(path("Foo#method").ends_with(&p, true));
        assert!(!path("Foo.method").ends_with(&p, true));
        assert!(path("Foo.method").ends_with(&path("method"), false));
    }

    #[test]
    fn backslash_escapes_outside_quotes() {
        let p = path(r"Foo#a\.b");
        assert_eq!(p.name(), Some("a.b"));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert_eq!(NamePath::parse(""), Err(NamePathError::Empty));
        assert!(matches!(
            NamePath::parse("Foo..bar"),
            Err(NamePathError::EmptySegment(_))
        ));
        assert!(matches!(
            NamePath::parse(r#"Foo#"open"#),
            Err(NamePathError::UnterminatedQuote(_))
        ));
    }

    #[test]
    fn dotted_drops_separators() {
        assert_eq!(path("Ns.Foo#bar~baz").dotted(), "Ns.Foo.bar.baz");
    }

    #[test]
    fn serde_uses_text_form() {
        let p = path(r#"Foo#"weird#Var""#);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#""Foo#\"weird#Var\"""#);
        let back: NamePath = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
