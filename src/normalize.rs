//! Declaration normalizer: every declaration shape becomes a [`Draft`]
//! around one uniform [`Entity`].
//!
//! A file is normalized on its own, with no knowledge of other files. Paths
//! are not computed here; a draft only records how it binds to its
//! container and, for assignments, the expression it was assigned to.

use crate::config::Config;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::model::{
    AccessorParts, Entity, EntityKind, Location, ModuleInfo, Param, Relation, RelationKind, Returns,
    SourceOrder, Tag, TagKind, TagParam, Throws, TypeParam, Visibility,
};
use crate::namepath::Binding;
use crate::parser::{self, attach::CommentIndex, merge, tags::DocComment};
use crate::source::{DeclKind, Declaration, ParamDecl, SourceFile};
use std::collections::HashSet;

/// Annotations consumed by the resolvers rather than stored on the entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Directives {
    /// Every explicit visibility mark, code modifiers included, in order.
    pub visibility: Vec<Visibility>,
    /// `@lends` target as written.
    pub lends: Option<String>,
}

/// An entity before its name-path is known.
#[derive(Debug, Clone)]
pub struct Draft {
    pub entity: Entity,
    /// How the entity binds to the container it was declared in.
    pub binding: Binding,
    /// Assignment target (`fn.prop`, `Foo.prototype.bar`).
    pub target: Option<String>,
    /// Explicit `@memberof` container.
    pub member_of: Option<String>,
    pub directives: Directives,
    /// Bodiless callable: an overload signature.
    pub is_signature: bool,
    pub children: Vec<Draft>,
}

/// Everything one file contributes to a build.
#[derive(Debug, Default)]
pub struct FileUnit {
    pub drafts: Vec<Draft>,
    pub module: Option<ModuleInfo>,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    TopLevel,
    /// Class or interface body.
    Class,
    /// Namespace or object-literal body.
    Namespace,
    /// Function body. `in_method` is set directly inside a class member.
    Function { in_method: bool },
}

pub fn normalize_file(file: &SourceFile, file_index: u32, config: &Config) -> FileUnit {
    let mut diags = Diagnostics::default();
    let docs = parser::parse_comments(file, &mut diags);

    let file_level: Vec<usize> = docs
        .iter()
        .enumerate()
        .filter(|(_, d)| d.as_ref().is_some_and(DocComment::is_file_level))
        .map(|(i, _)| i)
        .collect();
    let module = module_info(&docs, &file_level);

    let mut normalizer = Normalizer {
        file,
        file_index,
        seq: 0,
        index: CommentIndex::new(file, config.max_comment_gap, &file_level),
        docs,
        used: HashSet::new(),
        hoisted: Vec::new(),
        diags,
    };

    let mut drafts = normalizer.declarations(&file.declarations, Scope::TopLevel);
    drafts.extend(normalizer.virtual_doclets(&file_level));

    tracing::debug!(file = %file.path, drafts = drafts.len(), "normalized file");
    FileUnit {
        drafts,
        module,
        diagnostics: normalizer.diags,
    }
}

struct Normalizer<'a> {
    file: &'a SourceFile,
    file_index: u32,
    seq: u32,
    index: CommentIndex<'a>,
    docs: Vec<Option<DocComment>>,
    used: HashSet<usize>,
    /// `this.x` members found in methods, one frame per open class body.
    hoisted: Vec<Vec<Draft>>,
    diags: Diagnostics,
}

impl Normalizer<'_> {
    fn next_order(&mut self) -> SourceOrder {
        let order = SourceOrder {
            file: self.file_index,
            seq: self.seq,
        };
        self.seq += 1;
        order
    }

    fn doc_for(&mut self, decl: &Declaration) -> Option<DocComment> {
        let idx = self.index.comment_for(decl)?;
        self.used.insert(idx);
        self.docs.get(idx).cloned().flatten()
    }

    fn declarations(&mut self, decls: &[Declaration], scope: Scope) -> Vec<Draft> {
        let drafts = decls
            .iter()
            .filter_map(|decl| self.declaration(decl, scope))
            .collect();
        merge::merge_members(drafts)
    }

    fn declaration(&mut self, decl: &Declaration, scope: Scope) -> Option<Draft> {
        let name = if decl.kind == DeclKind::Constructor {
            "constructor".to_string()
        } else if let Some(name) = decl.display_name() {
            name.to_string()
        } else {
            tracing::debug!(
                file = %self.file.path,
                line = decl.span.start_line,
                "skipping anonymous declaration"
            );
            return None;
        };
        let this_member = is_this_member(decl);

        let doc = self.doc_for(decl);
        let location = Location {
            file: self.file.path.clone(),
            line: decl.span.start_line,
        };
        let order = self.next_order();
        let kind = entity_kind(decl, doc.as_ref());

        let mut entity = Entity::new(kind, name, location, order);
        entity.is_static = decl.is_static;
        entity.is_abstract = decl.is_abstract;
        entity.is_optional = decl.is_optional;
        entity.is_exported = decl.is_exported;
        entity.is_constructor = decl.kind == DeclKind::Constructor;
        if kind == EntityKind::Accessor {
            entity.accessor = Some(AccessorParts {
                getter: decl.kind == DeclKind::Getter,
                setter: decl.kind == DeclKind::Setter,
            });
        }
        entity.type_params = decl
            .type_params
            .iter()
            .map(|tp| TypeParam {
                name: tp.name.clone(),
                constraint: tp.constraint.clone(),
                default: tp.default.clone(),
                description: String::new(),
            })
            .collect();
        for target in &decl.extends {
            entity.relations.push(Relation::unresolved(RelationKind::Extends, target.clone()));
        }
        for target in &decl.implements {
            entity.relations.push(Relation::unresolved(RelationKind::Implements, target.clone()));
        }

        let mut directives = Directives::default();
        directives.visibility.extend(decl.modifier);
        let mut member_of = None;
        if let Some(doc) = &doc {
            apply_doc(&mut entity, &mut directives, &mut member_of, doc);
        }

        match decl.kind {
            DeclKind::Getter => {
                let returned = entity.returns.drain(..).find_map(|r| r.type_text);
                entity.type_text = entity
                    .type_text
                    .take()
                    .or(returned)
                    .or_else(|| decl.type_text.clone());
            }
            DeclKind::Setter => {
                let documented = doc
                    .as_ref()
                    .and_then(|d| d.first(&TagKind::Param))
                    .and_then(|t| t.type_expr.clone());
                let code = decl.params.first().and_then(|p| p.type_text.clone());
                entity.type_text = entity.type_text.take().or(documented).or(code);
            }
            _ if matches!(kind, EntityKind::Function | EntityKind::Class) => {
                entity.params = self.reconcile_params(decl, doc.as_ref(), &entity.location);
                if kind == EntityKind::Function
                    && !entity.is_constructor
                    && entity.returns.is_empty()
                {
                    if let Some(ty) = decl.type_text.as_deref().filter(|t| *t != "void") {
                        entity.returns.push(Returns {
                            type_text: Some(ty.to_string()),
                            description: String::new(),
                        });
                    }
                }
            }
            _ => {
                if entity.type_text.is_none() {
                    entity.type_text = decl.type_text.clone();
                }
            }
        }

        let binding = match scope {
            Scope::TopLevel => Binding::Static,
            Scope::Class if entity.is_constructor => Binding::Instance,
            Scope::Class if entity.is_static => Binding::Static,
            Scope::Class => Binding::Instance,
            Scope::Namespace => Binding::Static,
            Scope::Function { .. } if this_member => Binding::Instance,
            Scope::Function { .. } => Binding::Inner,
        };
        let target = if this_member { None } else { decl.target.clone() };

        let child_scope = match decl.kind {
            DeclKind::Class | DeclKind::Interface => Scope::Class,
            DeclKind::Constructor | DeclKind::Method | DeclKind::Getter | DeclKind::Setter
                if scope == Scope::Class =>
            {
                Scope::Function { in_method: true }
            }
            DeclKind::Function
            | DeclKind::Constructor
            | DeclKind::Method
            | DeclKind::Getter
            | DeclKind::Setter => Scope::Function { in_method: false },
            _ if kind == EntityKind::Function => Scope::Function { in_method: false },
            _ => Scope::Namespace,
        };

        let opens_class = child_scope == Scope::Class;
        if opens_class {
            self.hoisted.push(Vec::new());
        }
        let mut children = self.declarations(&decl.children, child_scope);
        if opens_class {
            for member in self.hoisted.pop().unwrap_or_default() {
                adopt_hoisted(&mut children, member);
            }
        }

        let draft = Draft {
            entity,
            binding,
            target,
            member_of,
            directives,
            is_signature: !decl.has_body
                && matches!(
                    decl.kind,
                    DeclKind::Function | DeclKind::Method | DeclKind::Constructor
                ),
            children,
        };

        if this_member && scope == (Scope::Function { in_method: true }) {
            if let Some(frame) = self.hoisted.last_mut() {
                frame.push(draft);
                return None;
            }
        }
        Some(draft)
    }

    /// Documented params drive the list; code params fill in types and
    /// defaults and are appended when undocumented.
    fn reconcile_params(
        &mut self,
        decl: &Declaration,
        doc: Option<&DocComment>,
        location: &Location,
    ) -> Vec<Param> {
        let documented: Vec<Param> = doc
            .map(|d| {
                d.all(&TagKind::Param)
                    .filter_map(|t| t.param.as_ref().map(|p| param_from_tag(t, p)))
                    .collect()
            })
            .unwrap_or_default();
        let code = flatten_code_params(&decl.params, &documented);
        if documented.is_empty() {
            return code;
        }

        let mut params = documented;
        for param in params.iter_mut() {
            let Some(code_param) = code.iter().find(|c| c.name == param.name) else {
                continue;
            };
            if param.type_text.is_none() {
                param.type_text = code_param.type_text.clone();
            }
            param.is_optional |= code_param.is_optional;
            param.is_variadic |= code_param.is_variadic;

            match (&param.default, &code_param.default) {
                (None, Some(code_default)) => param.default = Some(code_default.clone()),
                (Some(doc_default), Some(code_default)) if doc_default != code_default => {
                    let kind = if unquote(doc_default) == unquote(code_default) {
                        DiagnosticKind::DefaultTypeMismatch
                    } else {
                        DiagnosticKind::DefaultMismatch
                    };
                    self.diags.warn(
                        kind,
                        Some(location),
                        format!(
                            "parameter `{}`: documented default {doc_default} differs from \
                             code default {code_default}, using {doc_default}",
                            param.name
                        ),
                    );
                }
                _ => {}
            }
        }
        for code_param in code {
            if !params.iter().any(|p| p.name == code_param.name) {
                params.push(code_param);
            }
        }
        params
    }

    /// `@typedef` and `@callback` comments attached to no declaration.
    fn virtual_doclets(&mut self, skip: &[usize]) -> Vec<Draft> {
        let mut out = Vec::new();
        for idx in 0..self.docs.len() {
            if self.used.contains(&idx) || skip.contains(&idx) {
                continue;
            }
            let Some(doc) = self.docs[idx].clone() else {
                continue;
            };
            let (tag, kind) = if let Some(tag) = doc.first(&TagKind::Typedef) {
                let kind = if doc.has(&TagKind::Property) {
                    EntityKind::Interface
                } else {
                    EntityKind::Variable
                };
                (tag, kind)
            } else if let Some(tag) = doc.first(&TagKind::Callback) {
                (tag, EntityKind::Function)
            } else {
                continue;
            };
            let Some(name) = tag.args.first().cloned() else {
                continue;
            };
            let type_text = tag.type_expr.clone();

            let location = Location {
                file: self.file.path.clone(),
                line: self.file.comments[idx].span.start_line,
            };
            let order = self.next_order();
            let mut entity = Entity::new(kind, name, location, order);
            let mut directives = Directives::default();
            let mut member_of = None;
            apply_doc(&mut entity, &mut directives, &mut member_of, &doc);
            if entity.description.is_empty() {
                entity.description = tag.body.clone();
            }
            entity.type_text = entity.type_text.take().or(type_text);
            if kind == EntityKind::Function {
                entity.params = doc
                    .all(&TagKind::Param)
                    .filter_map(|t| t.param.as_ref().map(|p| param_from_tag(t, p)))
                    .collect();
            }

            out.push(Draft {
                entity,
                binding: Binding::Static,
                target: None,
                member_of,
                directives,
                is_signature: false,
                children: Vec::new(),
            });
        }
        out
    }
}

fn is_this_member(decl: &Declaration) -> bool {
    decl.kind == DeclKind::Assignment
        && decl
            .target
            .as_deref()
            .and_then(|t| t.strip_prefix("this."))
            .is_some_and(|rest| !rest.is_empty() && !rest.contains('.'))
}

fn entity_kind(decl: &Declaration, doc: Option<&DocComment>) -> EntityKind {
    let tagged = |kind: TagKind| doc.is_some_and(|d| d.has(&kind));

    let base = match decl.kind {
        DeclKind::Function | DeclKind::Constructor | DeclKind::Method => EntityKind::Function,
        DeclKind::Class => EntityKind::Class,
        DeclKind::Interface => EntityKind::Interface,
        DeclKind::Namespace => EntityKind::Namespace,
        DeclKind::Property => EntityKind::Property,
        DeclKind::Getter | DeclKind::Setter => return EntityKind::Accessor,
        DeclKind::Variable if !decl.params.is_empty() => EntityKind::Function,
        DeclKind::Variable => EntityKind::Variable,
        DeclKind::ObjectLiteral if tagged(TagKind::Class) || tagged(TagKind::Lends) => {
            EntityKind::Class
        }
        DeclKind::ObjectLiteral => EntityKind::Variable,
        DeclKind::Assignment
            if !decl.params.is_empty()
                || tagged(TagKind::Function)
                || tagged(TagKind::Param)
                || tagged(TagKind::Returns) =>
        {
            EntityKind::Function
        }
        DeclKind::Assignment if decl.target.as_deref().is_some_and(|t| t.contains('.')) => {
            EntityKind::Property
        }
        DeclKind::Assignment => EntityKind::Variable,
    };

    if decl.kind == DeclKind::Constructor {
        return base;
    }
    if tagged(TagKind::Interface) {
        EntityKind::Interface
    } else if tagged(TagKind::Class) {
        EntityKind::Class
    } else if tagged(TagKind::Namespace) {
        EntityKind::Namespace
    } else if tagged(TagKind::Function)
        && matches!(base, EntityKind::Variable | EntityKind::Property)
    {
        EntityKind::Function
    } else {
        base
    }
}

fn apply_doc(
    entity: &mut Entity,
    directives: &mut Directives,
    member_of: &mut Option<String>,
    doc: &DocComment,
) {
    entity.documented = true;
    entity.description = doc.description.clone();

    for tag in &doc.tags {
        match &tag.kind {
            TagKind::Returns => entity.returns.push(Returns {
                type_text: tag.type_expr.clone(),
                description: tag.body.clone(),
            }),
            TagKind::Throws => entity.throws.push(Throws {
                type_text: tag.type_expr.clone(),
                description: tag.body.clone(),
            }),
            TagKind::Example => entity.examples.push(tag.body.clone()),
            TagKind::Deprecated => {
                if entity.deprecated.is_none() {
                    entity.deprecated = Some(tag.body.clone());
                }
            }
            TagKind::See => entity.see_also.extend(tag.args.first().cloned()),
            TagKind::Private => directives.visibility.push(Visibility::Private),
            TagKind::Protected => directives.visibility.push(Visibility::Protected),
            TagKind::Public => directives.visibility.push(Visibility::Public),
            TagKind::Access => directives
                .visibility
                .extend(tag.target().and_then(Visibility::parse)),
            TagKind::Lends => directives.lends = tag.target().map(str::to_string),
            TagKind::Memberof => *member_of = tag.target().map(str::to_string),
            TagKind::Static => entity.is_static = true,
            TagKind::Abstract => entity.is_abstract = true,
            TagKind::Type | TagKind::Member => {
                if let Some(ty) = &tag.type_expr {
                    entity.type_text = Some(ty.clone());
                }
            }
            TagKind::Property => {
                if let Some(param) = &tag.param {
                    entity.properties.push(param_from_tag(tag, param));
                }
            }
            TagKind::Augments | TagKind::Implements => {
                let kind = if tag.kind == TagKind::Augments {
                    RelationKind::Extends
                } else {
                    RelationKind::Implements
                };
                if let Some(target) = tag.args.first() {
                    if !entity.relations.iter().any(|r| r.kind == kind && &r.target == target) {
                        entity.relations.push(Relation::unresolved(kind, target.clone()));
                    }
                }
            }
            TagKind::Template => apply_template(entity, tag),
            TagKind::Classdesc => {
                if entity.description.is_empty() {
                    entity.description = tag.body.clone();
                }
            }
            _ => {}
        }
    }
    entity.tags = doc.tags.clone();
}

fn apply_template(entity: &mut Entity, tag: &Tag) {
    let Some(name) = tag.args.first() else {
        return;
    };
    match entity.type_params.iter_mut().find(|tp| &tp.name == name) {
        Some(tp) => {
            tp.description = tag.body.clone();
            if tp.constraint.is_none() {
                tp.constraint = tag.type_expr.clone();
            }
        }
        None => entity.type_params.push(TypeParam {
            name: name.clone(),
            constraint: tag.type_expr.clone(),
            default: None,
            description: tag.body.clone(),
        }),
    }
}

fn adopt_hoisted(children: &mut Vec<Draft>, member: Draft) {
    let existing = children
        .iter_mut()
        .find(|c| c.entity.name == member.entity.name && c.binding == member.binding);
    match existing {
        Some(existing) if !existing.entity.documented && member.entity.documented => {
            *existing = member
        }
        Some(_) => {}
        None => children.push(member),
    }
}

fn param_from_tag(tag: &Tag, param: &TagParam) -> Param {
    Param {
        name: param.name.clone(),
        type_text: tag.type_expr.clone(),
        description: tag.body.clone(),
        default: param.default.clone(),
        is_optional: param.optional,
        is_variadic: param.variadic,
    }
}

/// Code parameters, with destructured fields flattened to `root.field`.
/// Unnamed destructuring patterns take the documented name at the same
/// position.
fn flatten_code_params(params: &[ParamDecl], documented: &[Param]) -> Vec<Param> {
    let doc_roots: Vec<&str> = documented
        .iter()
        .map(|p| p.name.as_str())
        .filter(|n| !n.contains('.'))
        .collect();

    let mut out = Vec::new();
    for (i, param) in params.iter().enumerate() {
        let name = if param.name.is_empty() {
            doc_roots
                .get(i)
                .map(|s| s.to_string())
                .unwrap_or_else(|| format!("arg{i}"))
        } else {
            param.name.clone()
        };
        out.push(code_param(name.clone(), param));
        push_fields(&name, &param.fields, &mut out);
    }
    out
}

fn push_fields(prefix: &str, fields: &[ParamDecl], out: &mut Vec<Param>) {
    for field in fields {
        let name = format!("{prefix}.{}", field.name);
        out.push(code_param(name.clone(), field));
        push_fields(&name, &field.fields, out);
    }
}

fn code_param(name: String, param: &ParamDecl) -> Param {
    Param {
        name,
        type_text: param.type_text.clone(),
        description: String::new(),
        default: param.default_value.clone(),
        is_optional: param.is_optional || param.default_value.is_some(),
        is_variadic: param.is_rest,
    }
}

fn unquote(value: &str) -> &str {
    let v = value.trim();
    for q in ['"', '\'', '`'] {
        if let Some(inner) = v.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
            return inner;
        }
    }
    v
}

fn module_info(docs: &[Option<DocComment>], file_level: &[usize]) -> Option<ModuleInfo> {
    if file_level.is_empty() {
        return None;
    }
    let mut info = ModuleInfo::default();
    for doc in file_level.iter().filter_map(|&i| docs.get(i).and_then(Option::as_ref)) {
        if info.description.is_empty() {
            info.description = doc
                .first(&TagKind::File)
                .map(|t| t.body.clone())
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| doc.description.clone());
        }
        for tag in &doc.tags {
            match tag.kind {
                TagKind::Module if info.name.is_empty() => {
                    info.name = tag.target().unwrap_or_default().to_string();
                }
                TagKind::Version if info.version.is_none() => {
                    info.version = tag.target().map(str::to_string)
                }
                TagKind::Author => info.authors.push(tag.body.clone()),
                TagKind::License if info.license.is_none() => info.license = Some(tag.body.clone()),
                _ => {}
            }
        }
    }
    Some(info)
}
