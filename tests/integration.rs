use anyhow::{Context, Result};
use doclink::model::{RelationKind, Visibility};
use doclink::source::{DeclKind, Declaration, SourceComment, Span};
use doclink::{
    build, Config, DiagnosticKind, DocError, EntityGraph, EntityKind, LookupError, MemberOrder,
    NamePath, Output, ReferenceKind, SourceFile,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

fn fixture_path(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn fixture(name: &str) -> Result<SourceFile> {
    let text = std::fs::read_to_string(fixture_path(name))
        .with_context(|| format!("reading fixture {name}"))?;
    serde_json::from_str(&text).with_context(|| format!("parsing fixture {name}"))
}

fn build_fixture(name: &str) -> Result<Output> {
    Ok(build(&[fixture(name)?], &Config::default())?)
}

fn path(text: &str) -> NamePath {
    NamePath::parse(text).unwrap()
}

fn paths<'a>(entities: impl IntoIterator<Item = &'a doclink::Entity>) -> Vec<String> {
    entities.into_iter().map(|e| e.path.to_string()).collect()
}

fn kinds(output: &Output) -> Vec<DiagnosticKind> {
    output.diagnostics.iter().map(|d| d.kind).collect()
}

fn comment(text: &str, line: u32) -> SourceComment {
    let lines = text.lines().count() as u32;
    SourceComment {
        text: text.to_string(),
        span: Span::lines(line, line + lines.saturating_sub(1)),
    }
}

fn decl(kind: DeclKind, name: &str, start: u32, end: u32) -> Declaration {
    Declaration::new(kind, Some(name), Span::lines(start, end))
}

// -- classes ------------------------------------------------------------------

#[test]
fn class_members_get_canonical_paths() -> Result<()> {
    let output = build_fixture("class.json")?;
    let graph = &output.graph;

    assert_eq!(
        paths(graph.entities()),
        vec![
            "Base",
            "Circle",
            "Circle#constructor",
            "Circle#someVar",
            "Circle#area",
            "Circle#oldArea",
            r#"Circle#"weird#Var""#,
            "Circle.unit",
        ]
    );
    assert_eq!(graph.module().name, "global");
    Ok(())
}

#[test]
fn constructor_and_hoisted_instance_variable() -> Result<()> {
    let output = build_fixture("class.json")?;
    let graph = &output.graph;

    let ctor = graph.find("Circle#constructor")?;
    assert!(ctor.is_constructor);
    assert_eq!(ctor.description, "Make a circle.");
    assert_eq!(ctor.params.len(), 1);
    assert_eq!(ctor.params[0].name, "radius");
    assert_eq!(ctor.params[0].type_text.as_deref(), Some("number"));
    assert!(ctor.returns.is_empty());

    let var = graph.find("someVar")?;
    assert_eq!(var.path.to_string(), "Circle#someVar");
    assert_eq!(var.kind, EntityKind::Property);
    assert_eq!(var.description, "Instance variable set in the constructor.");
    Ok(())
}

#[test]
fn getter_and_setter_become_one_accessor() -> Result<()> {
    let output = build_fixture("class.json")?;
    let area = output.graph.find("Circle#area")?;

    assert_eq!(area.kind, EntityKind::Accessor);
    let parts = area.accessor.unwrap_or_default();
    assert!(parts.getter && parts.setter);
    assert_eq!(area.description, "The area.");
    assert_eq!(area.type_text.as_deref(), Some("number"));
    assert_eq!(area.examples, vec!["new Circle(2).area".to_string()]);
    assert_eq!(area.location.line, 29);
    Ok(())
}

#[test]
fn conflicting_visibility_hides_member_and_warns() -> Result<()> {
    let output = build_fixture("class.json")?;
    let graph = &output.graph;

    assert!(graph.get(&path("Circle#secret")).is_none());
    let secret = graph.get_any(&path("Circle#secret")).unwrap();
    assert_eq!(secret.visibility, Visibility::Private);
    assert_eq!(kinds(&output), vec![DiagnosticKind::VisibilityConflict]);
    assert!(!paths(graph.members_of(&path("Circle"))).contains(&"Circle#secret".to_string()));
    Ok(())
}

#[test]
fn quoted_and_static_members() -> Result<()> {
    let output = build_fixture("class.json")?;
    let graph = &output.graph;

    let weird = graph.find(r#"Circle#"weird#Var""#)?;
    assert_eq!(weird.name, "weird#Var");
    assert_eq!(weird.type_text.as_deref(), Some("string"));
    assert_eq!(weird.path.dotted(), "Circle.weird#Var");

    let unit = graph.find("Circle.unit")?;
    assert!(unit.is_static);
    assert_eq!(unit.returns.len(), 1);
    assert_eq!(unit.returns[0].type_text.as_deref(), Some("Circle"));

    assert!(graph.find("Circle#oldArea")?.is_deprecated());
    Ok(())
}

#[test]
fn supertypes_and_references() -> Result<()> {
    let output = build_fixture("class.json")?;
    let graph = &output.graph;

    assert_eq!(paths(graph.referrers_of(&path("Base"))), vec!["Circle"]);
    let unresolved: Vec<_> = graph
        .unresolved_references()
        .into_iter()
        .map(|r| (r.from.to_string(), r.kind, r.target.to_string()))
        .collect();
    assert_eq!(
        unresolved,
        vec![
            ("Circle".to_string(), ReferenceKind::See, "Nowhere".to_string()),
            ("Circle".to_string(), ReferenceKind::Implements, "Drawable".to_string()),
        ]
    );
    assert_eq!(paths(graph.by_kind(EntityKind::Class)), vec!["Base", "Circle"]);
    Ok(())
}

#[test]
fn alphabetical_member_order() -> Result<()> {
    let config = Config {
        member_order: MemberOrder::Alphabetical,
        ..Config::default()
    };
    let output = build(&[fixture("class.json")?], &config)?;
    assert_eq!(
        paths(output.graph.members_of(&path("Circle"))),
        vec![
            "Circle#area",
            "Circle#constructor",
            "Circle#oldArea",
            "Circle#someVar",
            "Circle.unit",
            r#"Circle#"weird#Var""#,
        ]
    );
    Ok(())
}

// -- shadowing ----------------------------------------------------------------

#[test]
fn later_function_shadows_earlier_with_its_inner_members() -> Result<()> {
    let output = build_fixture("shadowing.json")?;
    let graph = &output.graph;

    let shadow = graph.find("shadow")?;
    assert_eq!(shadow.description, "Second shadow.");
    assert_eq!(shadow.location.line, 5);
    assert_eq!(graph.find("shadow~inner")?.description, "Inner helper.");

    let superseded: Vec<_> = graph.superseded().iter().map(|e| e.description.as_str()).collect();
    assert_eq!(superseded, vec!["First shadow."]);
    Ok(())
}

#[test]
fn assignment_adds_member_to_function() -> Result<()> {
    let output = build_fixture("shadowing.json")?;
    let graph = &output.graph;

    let prop = graph.find("foo.adHocInner")?;
    assert_eq!(prop.kind, EntityKind::Property);
    assert_eq!(prop.parent, Some(path("foo")));
    assert_eq!(paths(graph.members_of(&path("foo"))), vec!["foo.adHocInner"]);

    assert!(graph.get(&path("hidden")).is_none());
    assert!(graph.get_any(&path("hidden")).is_some());
    Ok(())
}

#[test]
fn cross_file_shadowing_follows_processing_order() -> Result<()> {
    let file = |name: &str, description: &str| SourceFile {
        path: name.to_string(),
        comments: vec![comment(&format!("/** {description} */"), 1)],
        declarations: vec![decl(DeclKind::Function, "shared", 2, 2)],
    };
    let files = vec![file("b.js", "from b"), file("a.js", "from a")];

    let given = build(&files, &Config::default())?;
    assert_eq!(given.graph.find("shared")?.description, "from a");

    let sorted = build(
        &files,
        &Config {
            sort_files: true,
            ..Config::default()
        },
    )?;
    assert_eq!(sorted.graph.find("shared")?.description, "from b");
    assert_eq!(sorted.graph.superseded()[0].location.file, "a.js");
    Ok(())
}

#[test]
fn same_file_twice_is_rejected() -> Result<()> {
    let file = fixture("shadowing.json")?;
    let err = build(&[file.clone(), file], &Config::default()).unwrap_err();
    assert!(matches!(err, DocError::DuplicateSource(p) if p == "lib/shadowing.js"));
    Ok(())
}

// -- overloads ----------------------------------------------------------------

#[test]
fn overload_signatures_merge_into_one_function() -> Result<()> {
    let output = build_fixture("overloads.json")?;
    let graph = &output.graph;

    assert_eq!(paths(graph.entities()), vec!["f"]);
    let f = graph.find("f")?;
    assert_eq!(f.signatures.len(), 2);
    assert_eq!(f.description, "Numbers in, numbers out.");
    assert_eq!(f.params.len(), 1);
    assert_eq!(f.params[0].type_text.as_deref(), Some("number | string"));
    assert_eq!(f.params[0].description, "A number.");
    let returns: Vec<_> = f.returns.iter().map(|r| r.type_text.as_deref()).collect();
    assert_eq!(returns, vec![Some("number"), Some("string")]);
    assert!(graph.superseded().is_empty());
    Ok(())
}

// -- lends --------------------------------------------------------------------

#[test]
fn lends_moves_members_onto_the_prototype() -> Result<()> {
    let output = build_fixture("lends.json")?;
    let graph = &output.graph;

    assert_eq!(graph.find("Public")?.kind, EntityKind::Class);
    assert_eq!(paths(graph.members_of(&path("Public"))), vec!["Public#run", "Public#value"]);
    assert_eq!(graph.find("Public#run")?.description, "Run it.");
    assert!(graph.get_any(&path("Public#hush")).is_some());
    assert!(graph.get(&path("Public#hush")).is_none());

    assert!(graph.get_any(&path("_Impl")).is_none());
    assert_eq!(paths(graph.superseded()), vec!["_Impl"]);
    assert!(output.diagnostics.is_empty());
    Ok(())
}

#[test]
fn object_literal_lending_to_its_own_prototype() -> Result<()> {
    let mut person = decl(DeclKind::ObjectLiteral, "Person", 6, 8);
    person.children = vec![decl(DeclKind::Method, "say", 7, 7)];
    let file = SourceFile {
        path: "person.js".into(),
        comments: vec![comment("/**\n * A person.\n * @class\n * @lends Person.prototype\n */", 1)],
        declarations: vec![person],
    };

    let output = build(&[file], &Config::default())?;
    let graph = &output.graph;
    let person = graph.find("Person")?;
    assert_eq!(person.kind, EntityKind::Class);
    assert_eq!(person.relations_of(RelationKind::Lends).count(), 0);
    assert_eq!(paths(graph.members_of(&path("Person"))), vec!["Person#say"]);
    assert!(graph.get_any(&path("Person.say")).is_none());
    assert!(graph.superseded().is_empty());
    Ok(())
}

#[test]
fn lends_cycle_is_an_error() -> Result<()> {
    let err = build_fixture("lends_cycle.json").unwrap_err();
    let Some(DocError::LendsCycle { chain }) = err.downcast_ref::<DocError>() else {
        panic!("expected a lends cycle, got {err}");
    };
    assert_eq!(chain, &vec!["A".to_string(), "B".to_string(), "A".to_string()]);
    Ok(())
}

#[test]
fn unresolved_lends_target_leaves_members_in_place() -> Result<()> {
    let mut object = decl(DeclKind::ObjectLiteral, "Mixin", 4, 6);
    object.children = vec![decl(DeclKind::Method, "go", 5, 5)];
    let file = SourceFile {
        path: "mixin.js".into(),
        comments: vec![comment("/** Mixin.\n * @lends Missing.prototype\n */", 1)],
        declarations: vec![object],
    };

    let output = build(&[file], &Config::default())?;
    assert_eq!(kinds(&output), vec![DiagnosticKind::UnresolvedLendsTarget]);
    assert!(output.graph.find("Mixin.go").is_ok());
    let unresolved = output.graph.unresolved_references();
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].kind, ReferenceKind::Lends);
    Ok(())
}

// -- parameters ---------------------------------------------------------------

#[test]
fn documented_and_code_defaults_reconcile() -> Result<()> {
    let output = build_fixture("defaults.json")?;
    let f = output.graph.find("defaults")?;

    let params: Vec<_> = f
        .params
        .iter()
        .map(|p| (p.name.as_str(), p.default.as_deref(), p.type_text.as_deref()))
        .collect();
    assert_eq!(
        params,
        vec![
            ("num", Some("5"), Some("number")),
            ("strNum", Some("42"), Some("string")),
            ("mismatch", Some("1"), Some("number")),
            ("quoted", Some("5"), Some("number")),
            ("extra", None, Some("boolean")),
        ]
    );
    assert_eq!(f.params[1].formatted_default().as_deref(), Some("\"42\""));
    assert_eq!(f.params[0].formatted_default().as_deref(), Some("5"));
    assert_eq!(
        kinds(&output),
        vec![DiagnosticKind::DefaultMismatch, DiagnosticKind::DefaultTypeMismatch]
    );
    Ok(())
}

// -- module -------------------------------------------------------------------

#[test]
fn module_metadata_and_virtual_entities() -> Result<()> {
    let output = build_fixture("module.json")?;
    let graph = &output.graph;

    let module = graph.module();
    assert_eq!(module.name, "geometry");
    assert_eq!(module.description, "Geometry helpers.");
    assert_eq!(module.version.as_deref(), Some("2.1.0"));
    assert_eq!(module.authors, vec!["Ada".to_string()]);
    assert_eq!(module.license.as_deref(), Some("MIT"));

    let point = graph.find("Point")?;
    assert_eq!(point.kind, EntityKind::Interface);
    let props: Vec<_> = point.properties.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(props, vec!["x", "y"]);

    let visitor = graph.find("Visitor")?;
    assert_eq!(visitor.kind, EntityKind::Function);
    assert_eq!(visitor.params[0].type_text.as_deref(), Some("Point"));
    assert_eq!(visitor.returns[0].type_text.as_deref(), Some("boolean"));
    Ok(())
}

// -- attachment ---------------------------------------------------------------

#[rstest]
#[case(0, false)]
#[case(1, true)]
fn comment_gap_is_configurable(#[case] gap: u32, #[case] documented: bool) -> Result<()> {
    let file = SourceFile {
        path: "gap.js".into(),
        comments: vec![comment("/** Spaced out. */", 1)],
        declarations: vec![decl(DeclKind::Function, "spaced", 3, 3)],
    };
    let config = Config {
        max_comment_gap: gap,
        ..Config::default()
    };
    let output = build(&[file], &config)?;
    assert_eq!(output.graph.find("spaced")?.documented, documented);
    Ok(())
}

#[rstest]
#[case::prototype_assignment("/** Bar. */", DeclKind::Assignment, Some("Foo.prototype.bar"))]
#[case::memberof_prototype(
    "/**\n * Bar.\n * @memberof Foo.prototype\n */",
    DeclKind::Function,
    None
)]
#[case::memberof_hash("/**\n * Bar.\n * @memberof Foo#\n */", DeclKind::Function, None)]
fn alias_forms_reach_the_same_path(
    #[case] doc: &str,
    #[case] kind: DeclKind,
    #[case] target: Option<&str>,
) -> Result<()> {
    let doc_lines = doc.lines().count() as u32;
    let decl_line = 3 + doc_lines;
    let mut member = Declaration::new(kind, None, Span::lines(decl_line, decl_line));
    match target {
        Some(t) => member.target = Some(t.to_string()),
        None => member.name = Some("bar".into()),
    }
    let file = SourceFile {
        path: "alias.js".into(),
        comments: vec![comment("/** @class */", 1), comment(doc, 3)],
        declarations: vec![decl(DeclKind::Function, "Foo", 2, 2), member],
    };

    let output = build(&[file], &Config::default())?;
    let bar = output.graph.find("Foo#bar")?;
    assert_eq!(bar.description, "Bar.");
    assert_eq!(bar.parent, Some(path("Foo")));
    Ok(())
}

#[test]
fn accessor_merge_does_not_depend_on_declaration_order() -> Result<()> {
    let accessor_file = |getter_first: bool| {
        let (first, second) = if getter_first {
            (DeclKind::Getter, DeclKind::Setter)
        } else {
            (DeclKind::Setter, DeclKind::Getter)
        };
        let docs = |kind: DeclKind| {
            if kind == DeclKind::Getter {
                "/** Read it. */"
            } else {
                "/** Write it. */"
            }
        };
        let mut class = decl(DeclKind::Class, "Box", 1, 6);
        let mut a = decl(first, "size", 3, 3);
        let mut b = decl(second, "size", 5, 5);
        for d in [&mut a, &mut b] {
            d.type_text = Some("number".into());
        }
        class.children = vec![a, b];
        SourceFile {
            path: "box.ts".into(),
            comments: vec![comment(docs(first), 2), comment(docs(second), 4)],
            declarations: vec![class],
        }
    };

    let getter_first = build(&[accessor_file(true)], &Config::default())?;
    let setter_first = build(&[accessor_file(false)], &Config::default())?;
    let a = getter_first.graph.find("Box#size")?;
    let b = setter_first.graph.find("Box#size")?;
    assert_eq!(a.description, "Read it.");
    assert_eq!(a, b);
    Ok(())
}

// -- lookup -------------------------------------------------------------------

#[test]
fn suffix_lookup_through_build() -> Result<()> {
    let output = build_fixture("class.json")?;
    let graph = &output.graph;

    assert_eq!(graph.find("#oldArea")?.path.to_string(), "Circle#oldArea");
    assert_eq!(graph.find("Nope").unwrap_err(), LookupError::NotFound("Nope".into()));
    assert!(matches!(graph.find("Circle#"), Err(LookupError::InvalidPath(_))));
    Ok(())
}

// -- snapshot -----------------------------------------------------------------

#[rstest]
#[case("class.json")]
#[case("shadowing.json")]
#[case("lends.json")]
#[case("module.json")]
fn snapshot_round_trips_through_a_file(#[case] name: &str) -> Result<()> {
    let output = build_fixture(name)?;

    let mut file = NamedTempFile::new()?;
    file.write_all(output.graph.to_json()?.as_bytes())?;
    let json = std::fs::read_to_string(file.path())?;

    let restored = EntityGraph::from_json(&json)?;
    assert_eq!(restored, output.graph);
    Ok(())
}
