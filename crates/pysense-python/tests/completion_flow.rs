//! Completion over a built model: classification against real source text,
//! fragment re-parsing, member candidate listing.

use pysense_python::ast::{build, Expr};
use pysense_python::builder::build_file;
use pysense_python::completion::{
    classify, infer_fragment, member_declarations_for_type, CompletionIntent, ExpressionParser,
};
use pysense_python::model::SharedModel;
use pysense_python::scheduler::{FixedSearchPaths, NullScheduler};
use pysense_python::types::Type;
use std::path::Path;

/// Enough parsing for the fixtures: dotted name chains.
struct DottedParser;

impl ExpressionParser for DottedParser {
    fn parse_expression(&self, text: &str) -> Option<Expr> {
        let text = text.trim();
        if text.is_empty() || !text.chars().all(|c| c.is_alphanumeric() || c == '.' || c == '_') {
            return None;
        }
        let mut parts = text.split('.');
        let mut expr = build::name(parts.next()?);
        for part in parts {
            expr = build::attribute(expr, part);
        }
        Some(expr)
    }
}

/// `class C:` with a method and a member, an instance `c`, and a trailing
/// member access being typed. Spans in the AST match the text.
const SOURCE: &str = "\
class C:
    def ping(self):
        return 1

c = C()
c.v = 3
c.";

fn build_fixture() -> (SharedModel, &'static Path) {
    let path = Path::new("main.py");
    let class_start = 0;
    let class_end = SOURCE.find("\nc = C()").unwrap();
    let module = build::module(vec![
        build::stmt_at(
            build::class(
                "C",
                vec![],
                vec![build::def(
                    "ping",
                    build::params(&["self"]),
                    vec![build::ret(Some(build::int(1)))],
                )],
            ),
            class_start,
            class_end,
        ),
        build::assign(build::store("c"), build::call(build::name("C"), vec![])),
        build::assign(
            build::store_attribute(build::name("c"), "v"),
            build::int(3),
        ),
    ]);
    let model = SharedModel::new();
    build_file(
        &model,
        &NullScheduler,
        &FixedSearchPaths(Vec::new()),
        path,
        &module,
        SOURCE,
    );
    (model, path)
}

#[test]
fn member_access_classifies_and_types_the_fragment() {
    let (model, path) = build_fixture();
    let context = classify(&model, &DottedParser, path, SOURCE, SOURCE.len());
    let CompletionIntent::MemberAccess { expression } = &context.intent else {
        panic!("expected member access, got {:?}", context.intent);
    };
    assert_eq!(expression, "c");

    let scope = context.scope.expect("scope resolved");
    let inferred = infer_fragment(&model, &DottedParser, scope, expression);
    assert!(matches!(inferred.ty, Type::Structure { .. }));

    // member candidates include the method and the grown member, but not
    // the builtin object plumbing inherited from the stub
    let m = model.read();
    let file = m.find_file(path).unwrap();
    drop(m);
    let members = member_declarations_for_type(&model, &inferred.ty, file);
    let names: Vec<String> = {
        let m = model.read();
        members.iter().map(|d| m.declaration(*d).name.clone()).collect()
    };
    assert!(names.contains(&"ping".to_string()));
    assert!(names.contains(&"v".to_string()));
    assert!(!names.contains(&"__hash__".to_string()));
}

#[test]
fn nested_fragment_resolves_member_types() {
    let (model, path) = build_fixture();
    let context = classify(&model, &DottedParser, path, SOURCE, SOURCE.len());
    let scope = context.scope.expect("scope resolved");
    // "what type is at the cursor" for a deeper chain
    let inferred = infer_fragment(&model, &DottedParser, scope, "c.v");
    assert_eq!(
        inferred.ty,
        Type::Integral(pysense_python::types::IntegralKind::Int)
    );
}

#[test]
fn default_completion_sees_module_declarations() {
    let (model, path) = build_fixture();
    let text = "class C:\n    pass\n\nc = C()\nx";
    let context = classify(&model, &DottedParser, path, text, text.len());
    assert_eq!(context.intent, CompletionIntent::Default);
    let abort = pysense_python::scheduler::AbortFlag::new();
    let decls = pysense_python::completion::default_completion_declarations(&model, &context, &abort);
    let m = model.read();
    let names: Vec<&str> = decls.iter().map(|d| m.declaration(*d).name.as_str()).collect();
    assert!(names.contains(&"c"));
    assert!(names.contains(&"C"));
    // the builtin stub contributes through the implicit import
    assert!(names.contains(&"len"));
}
