//! Member merging: getter/setter pairs and overload sets collapse into one
//! draft each.
//!
//! Merging happens per container, on siblings, before any path is known.
//! Container order is preserved; a merged draft takes the slot of its first
//! part.

use crate::model::{AccessorParts, Entity, EntityKind, Param, Returns, Signature};
use crate::namepath::Binding;
use crate::normalize::Draft;
use std::collections::HashMap;

pub fn merge_members(drafts: Vec<Draft>) -> Vec<Draft> {
    merge_accessors(merge_overloads(drafts))
}

// -- Overloads ----------------------------------------------------------------

/// Collapse runs of same-named callables that start with bodiless
/// signatures. The run ends at the first part with a body (the
/// implementation) or at a different member.
fn merge_overloads(drafts: Vec<Draft>) -> Vec<Draft> {
    let mut out = Vec::with_capacity(drafts.len());
    let mut run: Vec<Draft> = Vec::new();

    for draft in drafts {
        let extends_run = run
            .last()
            .is_some_and(|last| last.is_signature && same_callable(last, &draft));
        if !extends_run {
            flush(&mut run, &mut out);
        }
        run.push(draft);
    }
    flush(&mut run, &mut out);
    out
}

fn same_callable(a: &Draft, b: &Draft) -> bool {
    a.entity.kind == EntityKind::Function
        && b.entity.kind == EntityKind::Function
        && a.entity.name == b.entity.name
        && a.binding == b.binding
}

fn flush(run: &mut Vec<Draft>, out: &mut Vec<Draft>) {
    match run.len() {
        0 => {}
        1 => out.extend(run.pop()),
        _ => out.push(combine_overloads(std::mem::take(run))),
    }
}

fn combine_overloads(parts: Vec<Draft>) -> Draft {
    let (signatures, implementation): (Vec<Draft>, Vec<Draft>) =
        parts.into_iter().partition(|d| d.is_signature);
    let implementation = implementation.into_iter().next();

    // Documentation comes from the signatures. The implementation's comment
    // is used only when no signature has one.
    let any_signature_documented = signatures.iter().any(|s| s.entity.documented);
    let doc_parts: Vec<&Draft> = if any_signature_documented {
        signatures.iter().filter(|s| s.entity.documented).collect()
    } else {
        implementation.iter().filter(|d| d.entity.documented).collect()
    };

    let mut merged = signatures[0].clone();
    let entity = &mut merged.entity;

    entity.signatures = signatures
        .iter()
        .map(|s| Signature {
            params: s.entity.params.clone(),
            returns: s.entity.returns.clone(),
            description: s.entity.description.clone(),
        })
        .collect();

    entity.params = union_params(signatures.iter().map(|s| &s.entity.params), &doc_parts);
    entity.returns = union_returns(signatures.iter().map(|s| &s.entity.returns));

    entity.documented = !doc_parts.is_empty();
    entity.description = doc_parts
        .iter()
        .map(|d| d.entity.description.as_str())
        .find(|d| !d.is_empty())
        .unwrap_or_default()
        .to_string();
    entity.deprecated = doc_parts.iter().find_map(|d| d.entity.deprecated.clone());
    entity.tags = doc_parts.iter().flat_map(|d| d.entity.tags.iter().cloned()).collect();
    entity.examples = doc_parts.iter().flat_map(|d| d.entity.examples.iter().cloned()).collect();
    entity.see_also = doc_parts.iter().flat_map(|d| d.entity.see_also.iter().cloned()).collect();
    entity.throws = doc_parts.iter().flat_map(|d| d.entity.throws.iter().cloned()).collect();

    for part in signatures.iter().skip(1).chain(&implementation) {
        absorb_flags(&mut merged, part);
    }
    if let Some(implementation) = implementation {
        merged.children = implementation.children;
    }
    merged.is_signature = false;
    merged
}

/// Parameters by name across all signatures, in first-seen order. Types
/// that differ between signatures are joined as a union; a parameter
/// missing from some signature is optional.
fn union_params<'a>(
    lists: impl Iterator<Item = &'a Vec<Param>>,
    doc_parts: &[&Draft],
) -> Vec<Param> {
    let lists: Vec<&Vec<Param>> = lists.collect();
    let mut out: Vec<Param> = Vec::new();

    for list in &lists {
        for param in list.iter() {
            match out.iter_mut().find(|p| p.name == param.name) {
                Some(existing) => {
                    existing.type_text =
                        join_types(existing.type_text.take(), param.type_text.as_deref());
                    if existing.description.is_empty() {
                        existing.description = param.description.clone();
                    }
                    if existing.default.is_none() {
                        existing.default = param.default.clone();
                    }
                    existing.is_optional |= param.is_optional;
                    existing.is_variadic |= param.is_variadic;
                }
                None => out.push(param.clone()),
            }
        }
    }

    for param in out.iter_mut() {
        if lists.iter().any(|l| !l.iter().any(|p| p.name == param.name)) {
            param.is_optional = true;
        }
        if param.description.is_empty() {
            if let Some(doc) = doc_parts
                .iter()
                .flat_map(|d| d.entity.params.iter())
                .find(|p| p.name == param.name && !p.description.is_empty())
            {
                param.description = doc.description.clone();
            }
        }
    }
    out
}

fn join_types(existing: Option<String>, other: Option<&str>) -> Option<String> {
    let Some(other) = other else {
        return existing;
    };
    let Some(existing) = existing else {
        return Some(other.to_string());
    };
    let mut parts: Vec<&str> = existing.split('|').map(str::trim).collect();
    for part in other.split('|').map(str::trim) {
        if !parts.contains(&part) {
            parts.push(part);
        }
    }
    Some(parts.join(" | "))
}

fn union_returns<'a>(lists: impl Iterator<Item = &'a Vec<Returns>>) -> Vec<Returns> {
    let mut out: Vec<Returns> = Vec::new();
    for ret in lists.flatten() {
        match out.iter_mut().find(|r| r.type_text == ret.type_text) {
            Some(existing) if existing.description.is_empty() => {
                existing.description = ret.description.clone()
            }
            Some(_) => {}
            None => out.push(ret.clone()),
        }
    }
    out
}

fn absorb_flags(into: &mut Draft, part: &Draft) {
    into.directives.visibility.extend(part.directives.visibility.iter().copied());
    let (a, b) = (&mut into.entity, &part.entity);
    a.is_static |= b.is_static;
    a.is_abstract |= b.is_abstract;
    a.is_exported |= b.is_exported;
    for relation in &b.relations {
        if !a.relations.contains(relation) {
            a.relations.push(relation.clone());
        }
    }
}

// -- Accessors ----------------------------------------------------------------

/// Pair getters and setters by name and binding, wherever they appear
/// among their siblings.
fn merge_accessors(drafts: Vec<Draft>) -> Vec<Draft> {
    let mut out: Vec<Option<Draft>> = Vec::with_capacity(drafts.len());
    let mut slots: HashMap<(String, Binding), usize> = HashMap::new();

    for draft in drafts {
        if draft.entity.kind == EntityKind::Accessor {
            let key = (draft.entity.name.clone(), draft.binding);
            if let Some(&slot) = slots.get(&key) {
                if let Some(first) = out[slot].take() {
                    out[slot] = Some(combine_accessor(first, draft));
                }
                continue;
            }
            slots.insert(key, out.len());
        }
        out.push(Some(draft));
    }
    out.into_iter().flatten().collect()
}

fn is_getter(entity: &Entity) -> bool {
    entity.accessor.is_some_and(|a| a.getter)
}

/// The result does not depend on which half was declared first, apart from
/// the location, which is that of the first-declared half.
fn combine_accessor(first: Draft, second: Draft) -> Draft {
    let (location, order) = if first.entity.order <= second.entity.order {
        (first.entity.location.clone(), first.entity.order)
    } else {
        (second.entity.location.clone(), second.entity.order)
    };
    let (mut getter, setter) = if is_getter(&first.entity) || !is_getter(&second.entity) {
        (first, second)
    } else {
        (second, first)
    };

    let entity = &mut getter.entity;
    let other = setter.entity;
    entity.location = location;
    entity.order = order;
    entity.documented |= other.documented;
    if entity.description.is_empty() {
        entity.description = other.description;
    }
    if entity.deprecated.is_none() {
        entity.deprecated = other.deprecated;
    }
    if entity.type_text.is_none() {
        entity.type_text = other.type_text;
    }
    entity.tags.extend(other.tags);
    entity.examples.extend(other.examples);
    entity.see_also.extend(other.see_also);
    entity.throws.extend(other.throws);
    entity.is_static |= other.is_static;
    entity.is_abstract |= other.is_abstract;
    entity.is_exported |= other.is_exported;
    let (a, b) = (entity.accessor.unwrap_or_default(), other.accessor.unwrap_or_default());
    entity.accessor = Some(AccessorParts {
        getter: a.getter || b.getter,
        setter: a.setter || b.setter,
    });

    getter.directives.visibility.extend(setter.directives.visibility);
    getter.children.extend(setter.children);
    getter
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Location, SourceOrder};
    use crate::normalize::Directives;
    use pretty_assertions::assert_eq;

    fn draft(kind: EntityKind, name: &str, seq: u32) -> Draft {
        let location = Location {
            file: "a.ts".into(),
            line: seq + 1,
        };
        let order = SourceOrder { file: 0, seq };
        Draft {
            entity: Entity::new(kind, name, location, order),
            binding: Binding::Instance,
            target: None,
            member_of: None,
            directives: Directives::default(),
            is_signature: false,
            children: Vec::new(),
        }
    }

    fn accessor(name: &str, seq: u32, getter: bool, description: &str, ty: &str) -> Draft {
        let mut d = draft(EntityKind::Accessor, name, seq);
        d.entity.accessor = Some(AccessorParts {
            getter,
            setter: !getter,
        });
        d.entity.description = description.to_string();
        d.entity.documented = !description.is_empty();
        d.entity.type_text = Some(ty.to_string());
        d
    }

    fn signature(name: &str, seq: u32, param_type: &str, description: &str) -> Draft {
        let mut d = draft(EntityKind::Function, name, seq);
        d.is_signature = true;
        d.entity.documented = true;
        d.entity.description = description.to_string();
        d.entity.params = vec![Param {
            name: "x".into(),
            type_text: Some(param_type.into()),
            ..Default::default()
        }];
        d.entity.returns = vec![Returns {
            type_text: Some(param_type.into()),
            description: String::new(),
        }];
        d
    }

    #[test]
    fn accessor_merge_is_commutative() {
        let get = accessor("value", 0, true, "The value.", "number");
        let set = accessor("value", 1, false, "Sets it.", "number");

        let a = merge_members(vec![get.clone(), set.clone()]);
        let b = merge_members(vec![set, get]);
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);

        let (ea, eb) = (&a[0].entity, &b[0].entity);
        assert_eq!(ea.description, "The value.");
        assert_eq!(ea.accessor, Some(AccessorParts { getter: true, setter: true }));
        assert_eq!(ea, eb);
    }

    #[test]
    fn setter_description_used_when_getter_has_none() {
        let get = accessor("v", 0, true, "", "string");
        let set = accessor("v", 1, false, "Only the setter says.", "string");
        let merged = merge_members(vec![set, get]);
        assert_eq!(merged[0].entity.description, "Only the setter says.");
        assert_eq!(merged[0].entity.location.line, 1);
    }

    #[test]
    fn accessor_merge_keeps_sibling_order() {
        let merged = merge_members(vec![
            accessor("a", 0, true, "", "x"),
            draft(EntityKind::Function, "between", 1),
            accessor("a", 2, false, "", "x"),
        ]);
        let names: Vec<_> = merged.iter().map(|d| d.entity.name.as_str()).collect();
        assert_eq!(names, vec!["a", "between"]);
    }

    #[test]
    fn overloads_collapse_into_one_entity() {
        let mut implementation = draft(EntityKind::Function, "f", 2);
        implementation.entity.description = "Implementation doc.".into();
        implementation.entity.documented = true;
        implementation.children.push(draft(EntityKind::Function, "helper", 3));

        let merged = merge_members(vec![
            signature("f", 0, "number", "Numbers."),
            signature("f", 1, "string", "Strings."),
            implementation,
        ]);
        assert_eq!(merged.len(), 1);
        let entity = &merged[0].entity;
        assert_eq!(entity.signatures.len(), 2);
        assert_eq!(entity.params.len(), 1);
        assert_eq!(entity.params[0].type_text.as_deref(), Some("number | string"));
        let returns: Vec<_> = entity.returns.iter().map(|r| r.type_text.as_deref()).collect();
        assert_eq!(returns, vec![Some("number"), Some("string")]);
        assert_eq!(entity.description, "Numbers.");
        assert_eq!(merged[0].children.len(), 1);
        assert!(!merged[0].is_signature);
    }

    #[test]
    fn implementation_doc_used_when_signatures_are_bare() {
        let mut sig = signature("f", 0, "number", "");
        sig.entity.documented = false;
        let mut implementation = draft(EntityKind::Function, "f", 1);
        implementation.entity.description = "From the body.".into();
        implementation.entity.documented = true;
        let merged = merge_members(vec![sig, implementation]);
        assert_eq!(merged[0].entity.description, "From the body.");
    }

    #[test]
    fn different_names_do_not_merge() {
        let merged = merge_members(vec![
            signature("f", 0, "number", ""),
            signature("g", 1, "number", ""),
        ]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn param_missing_from_a_signature_is_optional() {
        let one = signature("f", 0, "number", "");
        let mut two = signature("f", 1, "number", "");
        two.entity.params.push(Param {
            name: "y".into(),
            ..Default::default()
        });
        let merged = merge_members(vec![one, two]);
        let y = merged[0].entity.params.iter().find(|p| p.name == "y").unwrap();
        assert!(y.is_optional);
        assert!(!merged[0].entity.params[0].is_optional);
    }
}
