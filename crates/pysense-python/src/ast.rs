//! The abstract syntax tree contract with the external parser.
//!
//! The engine never parses Python text itself; it consumes one [`Module`] per
//! source file from an upstream parser. Node kinds are closed sum types so
//! every visitor is an exhaustive `match` rather than virtual dispatch; a
//! parser integration maps its own tree onto these variants.
//!
//! Spans are byte offsets into the source text the tree was parsed from, and
//! are only meaningful for the build generation that consumed that text.
//!
//! The [`build`] module provides constructor shorthands. They are used by the
//! builtin stub module (which synthesizes its AST instead of parsing a file)
//! and by tests.

use pysense_core::source::Span;

// ============================================================================
// Common Nodes
// ============================================================================

/// A name with its source range.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// How a name occurs: being read, being assigned, or declared as a parameter.
///
/// Only store and parameter contexts may introduce declarations; this is what
/// keeps `bar` in `foo = bar` from being declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprContext {
    Load,
    Store,
    Param,
}

/// A whole source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub body: Vec<Stmt>,
}

// ============================================================================
// Statements
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    ClassDef(ClassDef),
    FunctionDef(FunctionDef),
    Assign {
        targets: Vec<Expr>,
        value: Expr,
    },
    Return {
        value: Option<Expr>,
    },
    Import {
        names: Vec<ImportAlias>,
    },
    /// `from <module> import <names>`. A leading dot on `module` means
    /// "search only the importing file's directory"; a name of `*` is a star
    /// import.
    ImportFrom {
        module: String,
        names: Vec<ImportAlias>,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    With {
        context: Expr,
        target: Option<Expr>,
        body: Vec<Stmt>,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<ExceptHandler>,
        orelse: Vec<Stmt>,
        finalbody: Vec<Stmt>,
    },
    Raise {
        exc: Option<Expr>,
    },
    Expr {
        value: Expr,
    },
    Pass,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: Ident,
    pub bases: Vec<Expr>,
    pub decorators: Vec<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Ident,
    pub parameters: Parameters,
    pub decorators: Vec<Expr>,
    pub body: Vec<Stmt>,
}

/// A function's or lambda's parameter list.
///
/// `defaults` aligns with the trailing parameters of `args`, matching Python
/// grammar: `len(args) - len(defaults)` parameters have no default.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Parameters {
    pub args: Vec<Ident>,
    pub defaults: Vec<Expr>,
    pub vararg: Option<Ident>,
    pub kwarg: Option<Ident>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptHandler {
    pub span: Span,
    /// The exception expression (`Error` in `except Error as e`).
    pub ty: Option<Expr>,
    /// The bound name (`e` in `except Error as e`).
    pub name: Option<Ident>,
    pub body: Vec<Stmt>,
}

/// One clause of `import a.b as c` / `from m import a as c`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportAlias {
    /// Dotted module or declaration name, `*` for star imports.
    pub name: String,
    pub as_name: Option<Ident>,
    pub span: Span,
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Name {
        id: String,
        ctx: ExprContext,
    },
    Attribute {
        value: Box<Expr>,
        attr: Ident,
        ctx: ExprContext,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    Subscript {
        value: Box<Expr>,
        slice: Slice,
    },
    Num(Number),
    Str(String),
    Tuple {
        elements: Vec<Expr>,
        ctx: ExprContext,
    },
    List {
        elements: Vec<Expr>,
    },
    Set {
        elements: Vec<Expr>,
    },
    Dict {
        keys: Vec<Expr>,
        values: Vec<Expr>,
    },
    ListComp {
        element: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    SetComp {
        element: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    DictComp {
        key: Box<Expr>,
        value: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    GeneratorExp {
        element: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    Lambda {
        parameters: Parameters,
        body: Box<Expr>,
    },
    BinOp {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    BoolOp {
        values: Vec<Expr>,
    },
    UnaryOp {
        operand: Box<Expr>,
    },
    Compare {
        left: Box<Expr>,
        comparators: Vec<Expr>,
    },
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    Yield {
        value: Option<Box<Expr>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

/// A subscript: either a concrete index expression or a slice.
///
/// Slices keep no operand detail; subscripting with a slice yields the
/// container's own type, so the bounds never matter to inference.
#[derive(Debug, Clone, PartialEq)]
pub enum Slice {
    Index(Box<Expr>),
    Slice,
}

/// One `for target in iter [if cond]*` clause of a comprehension.
#[derive(Debug, Clone, PartialEq)]
pub struct Comprehension {
    pub target: Expr,
    pub iter: Expr,
    pub ifs: Vec<Expr>,
}

// ============================================================================
// Constructor Shorthands
// ============================================================================

/// Constructor shorthands for synthesized trees.
///
/// All nodes get zero spans unless placed with [`at`] / [`stmt_at`]; zero
/// spans sort before every position bound, so synthesized declarations are
/// visible everywhere in their scope.
pub mod build {
    use super::*;

    pub fn at(mut expr: Expr, start: usize, end: usize) -> Expr {
        expr.span = Span::new(start, end);
        expr
    }

    pub fn stmt_at(mut stmt: Stmt, start: usize, end: usize) -> Stmt {
        stmt.span = Span::new(start, end);
        stmt
    }

    pub fn module(body: Vec<Stmt>) -> Module {
        Module { body }
    }

    pub fn ident(name: &str) -> Ident {
        Ident {
            name: name.to_string(),
            span: Span::zero(),
        }
    }

    pub fn ident_at(name: &str, start: usize, end: usize) -> Ident {
        Ident {
            name: name.to_string(),
            span: Span::new(start, end),
        }
    }

    fn expr(kind: ExprKind) -> Expr {
        Expr {
            span: Span::zero(),
            kind,
        }
    }

    fn stmt(kind: StmtKind) -> Stmt {
        Stmt {
            span: Span::zero(),
            kind,
        }
    }

    pub fn name(id: &str) -> Expr {
        expr(ExprKind::Name {
            id: id.to_string(),
            ctx: ExprContext::Load,
        })
    }

    pub fn store(id: &str) -> Expr {
        expr(ExprKind::Name {
            id: id.to_string(),
            ctx: ExprContext::Store,
        })
    }

    pub fn int(value: i64) -> Expr {
        expr(ExprKind::Num(Number::Int(value)))
    }

    pub fn float(value: f64) -> Expr {
        expr(ExprKind::Num(Number::Float(value)))
    }

    pub fn str_lit(value: &str) -> Expr {
        expr(ExprKind::Str(value.to_string()))
    }

    pub fn attribute(value: Expr, attr: &str) -> Expr {
        expr(ExprKind::Attribute {
            value: Box::new(value),
            attr: ident(attr),
            ctx: ExprContext::Load,
        })
    }

    pub fn store_attribute(value: Expr, attr: &str) -> Expr {
        expr(ExprKind::Attribute {
            value: Box::new(value),
            attr: ident(attr),
            ctx: ExprContext::Store,
        })
    }

    pub fn call(func: Expr, args: Vec<Expr>) -> Expr {
        expr(ExprKind::Call {
            func: Box::new(func),
            args,
        })
    }

    pub fn subscript(value: Expr, index: Expr) -> Expr {
        expr(ExprKind::Subscript {
            value: Box::new(value),
            slice: Slice::Index(Box::new(index)),
        })
    }

    pub fn slice(value: Expr) -> Expr {
        expr(ExprKind::Subscript {
            value: Box::new(value),
            slice: Slice::Slice,
        })
    }

    pub fn list(elements: Vec<Expr>) -> Expr {
        expr(ExprKind::List { elements })
    }

    pub fn set(elements: Vec<Expr>) -> Expr {
        expr(ExprKind::Set { elements })
    }

    pub fn dict(keys: Vec<Expr>, values: Vec<Expr>) -> Expr {
        expr(ExprKind::Dict { keys, values })
    }

    pub fn tuple(elements: Vec<Expr>, ctx: ExprContext) -> Expr {
        expr(ExprKind::Tuple { elements, ctx })
    }

    pub fn binop(left: Expr, right: Expr) -> Expr {
        expr(ExprKind::BinOp {
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn compare(left: Expr, comparators: Vec<Expr>) -> Expr {
        expr(ExprKind::Compare {
            left: Box::new(left),
            comparators,
        })
    }

    pub fn yield_expr(value: Option<Expr>) -> Expr {
        expr(ExprKind::Yield {
            value: value.map(Box::new),
        })
    }

    pub fn if_exp(test: Expr, body: Expr, orelse: Expr) -> Expr {
        expr(ExprKind::IfExp {
            test: Box::new(test),
            body: Box::new(body),
            orelse: Box::new(orelse),
        })
    }

    pub fn list_comp(element: Expr, generators: Vec<Comprehension>) -> Expr {
        expr(ExprKind::ListComp {
            element: Box::new(element),
            generators,
        })
    }

    pub fn generator(target: Expr, iter: Expr) -> Comprehension {
        Comprehension {
            target,
            iter,
            ifs: Vec::new(),
        }
    }

    pub fn assign(target: Expr, value: Expr) -> Stmt {
        stmt(StmtKind::Assign {
            targets: vec![target],
            value,
        })
    }

    pub fn assign_many(targets: Vec<Expr>, value: Expr) -> Stmt {
        stmt(StmtKind::Assign { targets, value })
    }

    pub fn expr_stmt(value: Expr) -> Stmt {
        stmt(StmtKind::Expr { value })
    }

    pub fn ret(value: Option<Expr>) -> Stmt {
        stmt(StmtKind::Return { value })
    }

    pub fn pass() -> Stmt {
        stmt(StmtKind::Pass)
    }

    pub fn params(names: &[&str]) -> Parameters {
        Parameters {
            args: names.iter().map(|n| ident(n)).collect(),
            defaults: Vec::new(),
            vararg: None,
            kwarg: None,
        }
    }

    pub fn params_with_defaults(names: &[&str], defaults: Vec<Expr>) -> Parameters {
        Parameters {
            args: names.iter().map(|n| ident(n)).collect(),
            defaults,
            vararg: None,
            kwarg: None,
        }
    }

    pub fn def(name: &str, parameters: Parameters, body: Vec<Stmt>) -> Stmt {
        stmt(StmtKind::FunctionDef(FunctionDef {
            name: ident(name),
            parameters,
            decorators: Vec::new(),
            body,
        }))
    }

    pub fn def_decorated(
        name: &str,
        parameters: Parameters,
        decorators: Vec<Expr>,
        body: Vec<Stmt>,
    ) -> Stmt {
        stmt(StmtKind::FunctionDef(FunctionDef {
            name: ident(name),
            parameters,
            decorators,
            body,
        }))
    }

    pub fn class(name: &str, bases: Vec<Expr>, body: Vec<Stmt>) -> Stmt {
        stmt(StmtKind::ClassDef(ClassDef {
            name: ident(name),
            bases,
            decorators: Vec::new(),
            body,
        }))
    }

    pub fn class_decorated(
        name: &str,
        bases: Vec<Expr>,
        decorators: Vec<Expr>,
        body: Vec<Stmt>,
    ) -> Stmt {
        stmt(StmtKind::ClassDef(ClassDef {
            name: ident(name),
            bases,
            decorators,
            body,
        }))
    }

    pub fn import(name: &str, as_name: Option<&str>) -> Stmt {
        stmt(StmtKind::Import {
            names: vec![ImportAlias {
                name: name.to_string(),
                as_name: as_name.map(ident),
                span: Span::zero(),
            }],
        })
    }

    pub fn import_from(module: &str, names: &[(&str, Option<&str>)]) -> Stmt {
        stmt(StmtKind::ImportFrom {
            module: module.to_string(),
            names: names
                .iter()
                .map(|(n, a)| ImportAlias {
                    name: n.to_string(),
                    as_name: a.map(ident),
                    span: Span::zero(),
                })
                .collect(),
        })
    }

    pub fn for_loop(target: Expr, iter: Expr, body: Vec<Stmt>) -> Stmt {
        stmt(StmtKind::For {
            target,
            iter,
            body,
            orelse: Vec::new(),
        })
    }

    pub fn with_stmt(context: Expr, target: Option<Expr>, body: Vec<Stmt>) -> Stmt {
        stmt(StmtKind::With {
            context,
            target,
            body,
        })
    }

    pub fn try_except(body: Vec<Stmt>, handlers: Vec<ExceptHandler>) -> Stmt {
        stmt(StmtKind::Try {
            body,
            handlers,
            orelse: Vec::new(),
            finalbody: Vec::new(),
        })
    }

    pub fn handler(ty: Option<Expr>, name: Option<&str>, body: Vec<Stmt>) -> ExceptHandler {
        ExceptHandler {
            span: Span::zero(),
            ty,
            name: name.map(ident),
            body,
        }
    }
}
