//! Input handed over by the external source parser.
//!
//! The parser itself is not part of this crate. Anything that can produce
//! this shape (directly, or as JSON) can drive a build.

use crate::model::Visibility;
use serde::{Deserialize, Serialize};

/// A source range. Lines are 1-based; columns are optional and only used
/// to order things that share a line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub end_line: u32,
    #[serde(default)]
    pub start_col: u32,
    #[serde(default)]
    pub end_col: u32,
}

impl Span {
    pub fn lines(start_line: u32, end_line: u32) -> Self {
        Self {
            start_line,
            end_line,
            start_col: 0,
            end_col: 0,
        }
    }

    pub fn start(&self) -> (u32, u32) {
        (self.start_line, self.start_col)
    }

    pub fn end(&self) -> (u32, u32) {
        (self.end_line, self.end_col)
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains(&self, other: &Span) -> bool {
        self.start() <= other.start() && other.end() <= self.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    #[serde(default)]
    pub comments: Vec<SourceComment>,
    #[serde(default)]
    pub declarations: Vec<Declaration>,
}

/// A raw comment, markers included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceComment {
    pub text: String,
    pub span: Span,
}

impl SourceComment {
    /// Documentation comments open with exactly `/**`. `/***` banners and
    /// plain `/*` or `//` comments are not documentation.
    pub fn is_doc(&self) -> bool {
        let text = self.text.trim_start();
        text.starts_with("/**") && !text.starts_with("/***") && text != "/**/"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKind {
    Function,
    Class,
    Interface,
    Namespace,
    Constructor,
    Method,
    Property,
    Getter,
    Setter,
    Variable,
    /// `var x = { ... }`. Its children are the literal's members.
    ObjectLiteral,
    /// `target = value`, where `target` is a dotted expression such as
    /// `fn.prop`, `Foo.prototype.bar` or `this.x`.
    Assignment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub kind: DeclKind,
    #[serde(default)]
    pub name: Option<String>,
    pub span: Span,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub type_params: Vec<TypeParamDecl>,
    /// Return type for callables, value type otherwise.
    #[serde(default)]
    pub type_text: Option<String>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub is_exported: bool,
    /// Access modifier written in code (`private foo()`).
    #[serde(default)]
    pub modifier: Option<Visibility>,
    #[serde(default)]
    pub extends: Vec<String>,
    #[serde(default)]
    pub implements: Vec<String>,
    /// `false` for overload signatures and bodiless constructors.
    #[serde(default = "default_true")]
    pub has_body: bool,
    /// Left-hand side of an [`DeclKind::Assignment`].
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub children: Vec<Declaration>,
}

fn default_true() -> bool {
    true
}

impl Declaration {
    pub fn new(kind: DeclKind, name: Option<&str>, span: Span) -> Self {
        Self {
            kind,
            name: name.map(str::to_string),
            span,
            params: Vec::new(),
            type_params: Vec::new(),
            type_text: None,
            is_static: false,
            is_abstract: false,
            is_optional: false,
            is_exported: false,
            modifier: None,
            extends: Vec::new(),
            implements: Vec::new(),
            has_body: true,
            target: None,
            children: Vec::new(),
        }
    }

    /// Name as written, or the last segment of an assignment target.
    pub fn display_name(&self) -> Option<&str> {
        if let Some(name) = self.name.as_deref() {
            return Some(name);
        }
        self.target
            .as_deref()
            .and_then(|t| t.rsplit('.').next())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    /// Empty for destructuring patterns that have no binding name.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub type_text: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub is_rest: bool,
    /// Fields of a destructured parameter (`{a, b}`).
    #[serde(default)]
    pub fields: Vec<ParamDecl>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeParamDecl {
    pub name: String,
    #[serde(default)]
    pub constraint: Option<String>,
    #[serde(default)]
    pub default: Option<String>,
}
