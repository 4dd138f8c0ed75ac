//! The builtin stub: a synthetic file declaring primitive and container
//! classes.
//!
//! Instead of parsing a documentation file from disk, the stub synthesizes
//! its AST and is built through the ordinary builder under a reserved path,
//! so its declarations behave exactly like user declarations. Every real
//! file implicitly imports the stub's module scope; the stub itself does not
//! (the cycle-break).
//!
//! Method bodies use literal returns (`return 0`, `return ""`) to give the
//! builder concrete return types. Container semantics that literals cannot
//! express are declared through the decorator vocabulary the inferencer
//! recognizes on stub declarations only:
//!
//! - `TypeContainer` / `hasTypedKeys` mark a class as backing a
//!   variable-length container
//! - `getsType` / `getsList` / `getsListOfKeys` redirect a method call's
//!   result to the content/key type of the container it was called on
//! - `addsTypeOfArg(n)` / `addsTypeOfArgContent(n)` feed call argument `n`'s
//!   type (or its content type) back into the container
//! - `returnContentEqualsContentOf(n)` copies the content type of argument
//!   `n`'s container into the return value

use crate::ast::{build, Expr, Module, Stmt};
use crate::builder::build_file;
use crate::model::SharedModel;
use crate::scheduler::{BuildScheduler, SearchPaths};
use std::path::Path;
use tracing::debug;

/// The reserved path of the builtin stub.
pub fn stub_path() -> &'static Path {
    Path::new("<builtins>")
}

/// Build the stub into the model if it is not there yet.
pub fn ensure_builtins(
    model: &SharedModel,
    scheduler: &dyn BuildScheduler,
    paths: &dyn SearchPaths,
) {
    {
        let mut m = model.write();
        if m.stub_file().is_some() {
            return;
        }
        let id = m.intern_file(stub_path());
        m.set_stub_file(id);
    }
    debug!("building builtin stub");
    let module = builtin_module();
    build_file(model, scheduler, paths, stub_path(), &module, "");
}

// ============================================================================
// Stub Source
// ============================================================================

fn method(name: &str, params: &[&str], body: Vec<Stmt>) -> Stmt {
    build::def(name, build::params(params), body)
}

fn returning(name: &str, params: &[&str], value: Expr) -> Stmt {
    method(name, params, vec![build::ret(Some(value))])
}

fn decorated(name: &str, params: &[&str], decorators: Vec<Expr>) -> Stmt {
    build::def_decorated(name, build::params(params), decorators, vec![build::pass()])
}

fn marker(name: &str) -> Expr {
    build::name(name)
}

fn marker_arg(name: &str, index: i64) -> Expr {
    build::call(build::name(name), vec![build::int(index)])
}

/// The synthesized stub module.
pub fn builtin_module() -> Module {
    let object_class = build::class(
        "object",
        vec![],
        vec![
            returning("__str__", &["self"], build::str_lit("")),
            returning("__repr__", &["self"], build::str_lit("")),
            returning("__eq__", &["self", "other"], build::name("True")),
            returning("__ne__", &["self", "other"], build::name("True")),
            returning("__hash__", &["self"], build::int(0)),
        ],
    );

    let int_class = build::class(
        "int",
        vec![build::name("object")],
        vec![
            returning("__add__", &["self", "other"], build::int(0)),
            returning("__sub__", &["self", "other"], build::int(0)),
            returning("__mul__", &["self", "other"], build::int(0)),
            returning("__neg__", &["self"], build::int(0)),
        ],
    );

    let float_class = build::class(
        "float",
        vec![build::name("object")],
        vec![
            returning("__add__", &["self", "other"], build::float(0.0)),
            returning("is_integer", &["self"], build::name("True")),
        ],
    );

    let bool_class = build::class("bool", vec![build::name("int")], vec![build::pass()]);

    let str_class = build::class(
        "str",
        vec![build::name("object")],
        vec![
            returning("upper", &["self"], build::str_lit("")),
            returning("lower", &["self"], build::str_lit("")),
            returning("strip", &["self"], build::str_lit("")),
            returning("replace", &["self", "old", "new"], build::str_lit("")),
            returning("join", &["self", "iterable"], build::str_lit("")),
            returning("format", &["self"], build::str_lit("")),
            returning("find", &["self", "sub"], build::int(0)),
            returning("split", &["self", "sep"], build::list(vec![build::str_lit("")])),
            returning("startswith", &["self", "prefix"], build::name("True")),
            returning("endswith", &["self", "suffix"], build::name("True")),
        ],
    );

    let list_class = build::class_decorated(
        "list",
        vec![build::name("object")],
        vec![marker("TypeContainer")],
        vec![
            decorated("append", &["self", "item"], vec![marker_arg("addsTypeOfArg", 0)]),
            decorated(
                "insert",
                &["self", "index", "item"],
                vec![marker_arg("addsTypeOfArg", 1)],
            ),
            decorated(
                "extend",
                &["self", "iterable"],
                vec![marker_arg("addsTypeOfArgContent", 0)],
            ),
            decorated("pop", &["self"], vec![marker("getsType")]),
            returning("index", &["self", "item"], build::int(0)),
            returning("count", &["self", "item"], build::int(0)),
            method("sort", &["self"], vec![build::pass()]),
            method("reverse", &["self"], vec![build::pass()]),
        ],
    );

    let dict_class = build::class_decorated(
        "dict",
        vec![build::name("object")],
        vec![marker("TypeContainer"), marker("hasTypedKeys")],
        vec![
            decorated("keys", &["self"], vec![marker("getsListOfKeys")]),
            decorated("values", &["self"], vec![marker("getsList")]),
            decorated("get", &["self", "key"], vec![marker("getsType")]),
            decorated("pop", &["self", "key"], vec![marker("getsType")]),
            decorated(
                "update",
                &["self", "other"],
                vec![marker_arg("addsTypeOfArgContent", 0)],
            ),
            returning("has_key", &["self", "key"], build::name("True")),
            method("clear", &["self"], vec![build::pass()]),
        ],
    );

    let set_class = build::class_decorated(
        "set",
        vec![build::name("object")],
        vec![marker("TypeContainer")],
        vec![
            decorated("add", &["self", "item"], vec![marker_arg("addsTypeOfArg", 0)]),
            decorated("pop", &["self"], vec![marker("getsType")]),
            decorated(
                "update",
                &["self", "other"],
                vec![marker_arg("addsTypeOfArgContent", 0)],
            ),
            method("discard", &["self", "item"], vec![build::pass()]),
        ],
    );

    let tuple_class = build::class(
        "tuple",
        vec![build::name("object")],
        vec![
            returning("index", &["self", "item"], build::int(0)),
            returning("count", &["self", "item"], build::int(0)),
        ],
    );

    let functions = vec![
        returning("len", &["obj"], build::int(0)),
        returning("repr", &["obj"], build::str_lit("")),
        returning("abs", &["number"], build::int(0)),
        returning("range", &["stop"], build::list(vec![build::int(0)])),
        returning("isinstance", &["obj", "cls"], build::name("True")),
        returning("hasattr", &["obj", "name"], build::name("True")),
        returning("input", &["prompt"], build::str_lit("")),
        build::def_decorated(
            "sorted",
            build::params(&["iterable"]),
            vec![marker_arg("returnContentEqualsContentOf", 0)],
            vec![build::pass()],
        ),
        build::def_decorated(
            "reversed",
            build::params(&["iterable"]),
            vec![marker_arg("returnContentEqualsContentOf", 0)],
            vec![build::pass()],
        ),
    ];

    let mut body = vec![
        object_class,
        int_class,
        float_class,
        bool_class,
        str_class,
        list_class,
        dict_class,
        set_class,
        tuple_class,
    ];
    body.extend(functions);
    build::module(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DeclKind;
    use crate::scheduler::{FixedSearchPaths, NullScheduler};

    #[test]
    fn test_stub_builds_container_classes() {
        let model = SharedModel::new();
        ensure_builtins(&model, &NullScheduler, &FixedSearchPaths(vec![]));
        let m = model.read();
        let stub = m.stub_file().expect("stub registered");
        assert!(m.module_scope(stub).is_some());
        for class in ["object", "int", "str", "list", "dict", "set", "tuple"] {
            let scope = m.stub_class_scope(class);
            assert!(scope.is_some(), "stub class {class} missing");
        }
        let list = m.stub_class("list").unwrap();
        let ld = m.declaration(list);
        assert_eq!(ld.kind, DeclKind::Class);
        assert!(ld.decorator("TypeContainer").is_some());
        let dict = m.stub_class("dict").unwrap();
        assert!(m.declaration(dict).decorator("hasTypedKeys").is_some());
    }

    #[test]
    fn test_stub_methods_carry_inference_decorators() {
        let model = SharedModel::new();
        ensure_builtins(&model, &NullScheduler, &FixedSearchPaths(vec![]));
        let m = model.read();
        let list_scope = m.stub_class_scope("list").unwrap();
        let append = m
            .find_in_scope(list_scope, "append", None)
            .into_iter()
            .next()
            .expect("list.append declared");
        let d = m.declaration(append);
        assert_eq!(d.kind, DeclKind::Function);
        let marker = d.decorator("addsTypeOfArg").expect("decorated");
        assert_eq!(marker.argument_index(), Some(0));
    }

    #[test]
    fn test_ensure_builtins_is_idempotent() {
        let model = SharedModel::new();
        ensure_builtins(&model, &NullScheduler, &FixedSearchPaths(vec![]));
        let first = model.read().stub_class("list");
        ensure_builtins(&model, &NullScheduler, &FixedSearchPaths(vec![]));
        assert_eq!(model.read().stub_class("list"), first);
    }
}
