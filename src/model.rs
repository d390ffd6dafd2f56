//! Data model for documentation entities.

use crate::namepath::NamePath;
use serde::{Deserialize, Serialize};

/// Entity variants. Object-literal classes, methods and constructors all
/// normalize into one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Function,
    Class,
    Interface,
    Property,
    Accessor,
    Variable,
    Namespace,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Property => "property",
            Self::Accessor => "accessor",
            Self::Variable => "variable",
            Self::Namespace => "namespace",
        };
        write!(f, "{s}")
    }
}

/// Visibility, ordered from least to most restrictive so `max` picks the
/// winner of conflicting annotations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn parse(s: &str) -> Option<Visibility> {
        match s {
            "public" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// Where an entity was declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

/// Global source order: file-processing index, then declaration sequence
/// within the file. Shadowing compares these.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceOrder {
    pub file: u32,
    pub seq: u32,
}

// -- Tags ---------------------------------------------------------------------

/// Canonical tag kinds. Aliases (`@arg`, `@return`, ...) are folded in by
/// [`TagKind::from_name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagKind {
    Param,
    Returns,
    Throws,
    Example,
    Deprecated,
    See,
    Private,
    Protected,
    Public,
    Access,
    Lends,
    Class,
    Interface,
    Namespace,
    Function,
    Member,
    Property,
    Type,
    Typedef,
    Callback,
    Static,
    Abstract,
    Augments,
    Implements,
    Memberof,
    Template,
    Module,
    Version,
    Author,
    License,
    File,
    Description,
    Classdesc,
    Other(String),
}

impl TagKind {
    pub fn from_name(name: &str) -> TagKind {
        match name {
            "param" | "arg" | "argument" => TagKind::Param,
            "returns" | "return" => TagKind::Returns,
            "throws" | "exception" => TagKind::Throws,
            "example" => TagKind::Example,
            "deprecated" => TagKind::Deprecated,
            "see" => TagKind::See,
            "private" => TagKind::Private,
            "protected" => TagKind::Protected,
            "public" => TagKind::Public,
            "access" => TagKind::Access,
            "lends" => TagKind::Lends,
            "class" | "constructor" => TagKind::Class,
            "interface" => TagKind::Interface,
            "namespace" => TagKind::Namespace,
            "function" | "func" | "method" => TagKind::Function,
            "member" | "var" => TagKind::Member,
            "property" | "prop" => TagKind::Property,
            "type" => TagKind::Type,
            "typedef" => TagKind::Typedef,
            "callback" => TagKind::Callback,
            "static" => TagKind::Static,
            "abstract" | "virtual" => TagKind::Abstract,
            "augments" | "extends" => TagKind::Augments,
            "implements" => TagKind::Implements,
            "memberof" => TagKind::Memberof,
            "template" => TagKind::Template,
            "module" => TagKind::Module,
            "version" => TagKind::Version,
            "author" => TagKind::Author,
            "license" => TagKind::License,
            "file" | "fileoverview" | "overview" => TagKind::File,
            "description" | "desc" => TagKind::Description,
            "classdesc" => TagKind::Classdesc,
            other => TagKind::Other(other.to_string()),
        }
    }

    /// Tags whose first word is an argument (a name or target) rather than
    /// description text.
    pub fn takes_argument(&self) -> bool {
        matches!(
            self,
            TagKind::See
                | TagKind::Access
                | TagKind::Lends
                | TagKind::Class
                | TagKind::Interface
                | TagKind::Namespace
                | TagKind::Function
                | TagKind::Member
                | TagKind::Typedef
                | TagKind::Callback
                | TagKind::Augments
                | TagKind::Implements
                | TagKind::Memberof
                | TagKind::Template
                | TagKind::Module
                | TagKind::Version
        )
    }
}

/// The name part of a `@param`/`@property` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagParam {
    /// Plain or dotted (`opts.name`) name.
    pub name: String,
    pub optional: bool,
    pub default: Option<String>,
    pub variadic: bool,
}

/// One parsed documentation tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub kind: TagKind,
    /// Contents of a `{...}` type expression, without the braces.
    pub type_expr: Option<String>,
    pub param: Option<TagParam>,
    /// Leading arguments for tags that take them (`@lends Target`).
    pub args: Vec<String>,
    /// Free text. Unwrapped, except for examples and fenced blocks.
    pub body: String,
}

impl Tag {
    pub fn new(kind: TagKind) -> Self {
        Self {
            kind,
            type_expr: None,
            param: None,
            args: Vec::new(),
            body: String::new(),
        }
    }

    /// First argument, or the body when the tag has none.
    pub fn target(&self) -> Option<&str> {
        self.args
            .first()
            .map(String::as_str)
            .or_else(|| (!self.body.is_empty()).then_some(self.body.as_str()))
    }
}

// -- Entity parts -------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub type_text: Option<String>,
    pub description: String,
    pub default: Option<String>,
    pub is_optional: bool,
    pub is_variadic: bool,
}

impl Param {
    /// Default value ready to follow `=` in a formal parameter list. When the
    /// first declared type is `string`, the value is rendered as a string
    /// literal even if it was written bare (`[strNum=42]` → `"42"`).
    pub fn formatted_default(&self) -> Option<String> {
        let value = self.default.as_deref()?;
        let first_is_string = self
            .type_text
            .as_deref()
            .and_then(|t| t.split('|').next())
            .is_some_and(|t| t.trim() == "string");
        if first_is_string && !is_quoted(value) {
            return Some(format!("{:?}", value));
        }
        Some(value.to_string())
    }
}

fn is_quoted(value: &str) -> bool {
    value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\''))
            || (value.starts_with('`') && value.ends_with('`')))
}

/// One kind of value a function can return.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Returns {
    pub type_text: Option<String>,
    pub description: String,
}

/// One kind of exception a function can raise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throws {
    pub type_text: Option<String>,
    pub description: String,
}

/// A generic type parameter. Documentation only; never instantiated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: String,
    pub constraint: Option<String>,
    pub default: Option<String>,
    pub description: String,
}

/// One overload signature, kept alongside the merged parameter list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<Param>,
    pub returns: Vec<Returns>,
    pub description: String,
}

/// Which halves of a getter/setter pair were declared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessorParts {
    pub getter: bool,
    pub setter: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Extends,
    Implements,
    Lends,
    Shadow,
}

/// A link from one entity to another, by name. `resolved` is set when the
/// target exists in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub kind: RelationKind,
    pub target: String,
    pub resolved: Option<NamePath>,
}

impl Relation {
    pub fn unresolved(kind: RelationKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            resolved: None,
        }
    }
}

/// Module-level metadata, attached to the root namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub name: String,
    pub description: String,
    pub version: Option<String>,
    pub authors: Vec<String>,
    pub license: Option<String>,
}

// -- Entity -------------------------------------------------------------------

/// A documented program element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub name: String,
    pub path: NamePath,
    /// Containing entity's path. `None` at top level.
    pub parent: Option<NamePath>,
    pub location: Location,
    pub order: SourceOrder,
    pub visibility: Visibility,
    /// `None`: not deprecated. `Some("")`: deprecated without a reason.
    pub deprecated: Option<String>,
    pub description: String,
    pub tags: Vec<Tag>,
    pub params: Vec<Param>,
    pub returns: Vec<Returns>,
    pub throws: Vec<Throws>,
    /// Value type for properties, variables and accessors.
    pub type_text: Option<String>,
    pub type_params: Vec<TypeParam>,
    pub examples: Vec<String>,
    pub see_also: Vec<String>,
    /// Sub-properties documented with `@property`.
    pub properties: Vec<Param>,
    pub signatures: Vec<Signature>,
    pub accessor: Option<AccessorParts>,
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_optional: bool,
    pub is_constructor: bool,
    pub is_exported: bool,
    /// Whether a doc comment was attached.
    pub documented: bool,
    /// Direct members, filled in by the graph builder.
    #[serde(skip)]
    pub members: Vec<NamePath>,
    pub relations: Vec<Relation>,
}

impl Entity {
    pub fn new(
        kind: EntityKind,
        name: impl Into<String>,
        location: Location,
        order: SourceOrder,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            path: NamePath::root(),
            parent: None,
            location,
            order,
            visibility: Visibility::Public,
            deprecated: None,
            description: String::new(),
            tags: Vec::new(),
            params: Vec::new(),
            returns: Vec::new(),
            throws: Vec::new(),
            type_text: None,
            type_params: Vec::new(),
            examples: Vec::new(),
            see_also: Vec::new(),
            properties: Vec::new(),
            signatures: Vec::new(),
            accessor: None,
            is_static: false,
            is_abstract: false,
            is_optional: false,
            is_constructor: false,
            is_exported: false,
            documented: false,
            members: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecated.is_some()
    }

    pub fn relations_of(&self, kind: RelationKind) -> impl Iterator<Item = &Relation> {
        self.relations.iter().filter(move |r| r.kind == kind)
    }
}
