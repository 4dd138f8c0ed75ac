//! Completion context classification.
//!
//! A state machine plus a prioritized pattern cascade over the raw source
//! text preceding the cursor. Classification never fails: an inconclusive
//! cascade yields the default (plain declaration list) completion, and a
//! cursor inside a string or comment yields [`CompletionIntent::NoCompletion`].
//!
//! The classifier is independent of the builders; it only reads the model
//! (always under a read guard) and calls into the expression inferencer for
//! "what type is at the cursor" queries on re-parsed fragments.

use crate::ast::Expr;
use crate::inference::{ExpressionVisitor, Inferred};
use crate::model::{DeclarationId, ScopeId, ScopeKind, SharedModel, SymbolModel};
use crate::scheduler::AbortFlag;
use crate::types::Type;
use once_cell::sync::Lazy;
use pysense_core::source::FileId;
use pysense_core::text::line_indentation;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

// ============================================================================
// External Parser
// ============================================================================

/// Re-parses a guessed sub-expression extracted from the cursor's
/// surroundings. Supplied by the embedder; the engine never parses text
/// itself.
pub trait ExpressionParser {
    fn parse_expression(&self, text: &str) -> Option<Expr>;
}

/// A parser that parses nothing. Fragment-driven intents degrade gracefully.
#[derive(Debug, Default)]
pub struct NullParser;

impl ExpressionParser for NullParser {
    fn parse_expression(&self, _text: &str) -> Option<Expr> {
        None
    }
}

// ============================================================================
// Completion Context
// ============================================================================

/// The classified kind of completion the cursor position calls for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum CompletionIntent {
    NoCompletion,
    DefineSpecialMethod { indentation: String },
    ImportFile,
    ImportSubmodule { module: String },
    RaiseException,
    Inheritance,
    MemberAccess { expression: String },
    FunctionCall { callee: String, given_args: usize },
    GeneratorVariable { names: Vec<String> },
    NewStatement,
    Default,
}

/// An intent plus the lexical scope considered current after position
/// correction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionContext {
    pub intent: CompletionIntent,
    pub scope: Option<ScopeId>,
}

// ============================================================================
// Classification
// ============================================================================

static RAISE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*raise(\s+\S*)?$").expect("valid regex"));
static IMPORT_SUB_FROM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*from\s+(\S+)\s+import\s*$").expect("valid regex"));
static IMPORT_SUB_DOT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:from|import)\s+([\w.]*)\.$").expect("valid regex"));
static IMPORT_FILE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:import|from)\s*$").expect("valid regex"));
static DEF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*)def\s*$").expect("valid regex"));
static CLASS_BARE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*class\s*$").expect("valid regex"));
static INHERITANCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*class\s+\w+\s*\($").expect("valid regex"));

/// Stop tokens that end a backward expression capture at bracket depth zero.
const EXPRESSION_STOP: &str = " \t=<>+-*/%!&|^~,:;@";

/// Classify the cursor's surroundings into a completion intent.
pub fn classify(
    model: &SharedModel,
    parser: &dyn ExpressionParser,
    path: &Path,
    text: &str,
    position: usize,
) -> CompletionContext {
    let mut position = position.min(text.len());
    while !text.is_char_boundary(position) {
        position -= 1;
    }

    let states = TextState::scan(text);
    let reader = model.read();
    let file = reader.find_file(path).ok();
    let scope = file.and_then(|f| {
        let raw = reader.scope_at(f, position)?;
        Some(corrected_scope(&reader, f, text, position, raw))
    });
    let done = |intent: CompletionIntent| CompletionContext { intent, scope };

    // inside a string or comment nothing sensible can be offered
    if states.class_at(position) != TextClass::Code {
        return done(CompletionIntent::NoCompletion);
    }

    let masked = &states.masked()[..position];
    let line = masked.rsplit('\n').next().unwrap_or(masked);
    debug!(line, "classifying completion line");

    if RAISE_RE.is_match(line) {
        return done(CompletionIntent::RaiseException);
    }
    if let Some(c) = IMPORT_SUB_FROM_RE.captures(line) {
        return done(CompletionIntent::ImportSubmodule {
            module: c[1].to_string(),
        });
    }
    if let Some(c) = IMPORT_SUB_DOT_RE.captures(line) {
        return done(CompletionIntent::ImportSubmodule {
            module: c[1].to_string(),
        });
    }
    if line.trim().is_empty() {
        return done(CompletionIntent::NewStatement);
    }
    if IMPORT_FILE_RE.is_match(line) {
        return done(CompletionIntent::ImportFile);
    }
    if let Some(scan) = scan_expression_backward(line, EXPRESSION_STOP, Some(".")) {
        let expression = scan
            .expression
            .strip_suffix('.')
            .unwrap_or(&scan.expression)
            .to_string();
        if !expression.is_empty() {
            return done(CompletionIntent::MemberAccess { expression });
        }
    }
    if let Some(c) = DEF_RE.captures(line) {
        let in_class = scope
            .map(|s| reader.scope(s).kind == ScopeKind::Class)
            .unwrap_or(false);
        return if in_class {
            done(CompletionIntent::DefineSpecialMethod {
                indentation: c[1].to_string(),
            })
        } else {
            done(CompletionIntent::NoCompletion)
        };
    }
    if INHERITANCE_RE.is_match(line) {
        return done(CompletionIntent::Inheritance);
    }
    if CLASS_BARE_RE.is_match(line) {
        return done(CompletionIntent::NoCompletion);
    }
    if let Some(outer) = scan_expression_backward(line, "", None) {
        if outer.stopped_at == Some('(') {
            if let Some(callee) = scan_expression_backward(&outer.remainder, EXPRESSION_STOP, None)
            {
                if !callee.expression.is_empty() {
                    return done(CompletionIntent::FunctionCall {
                        callee: callee.expression,
                        given_args: outer.top_level_commas,
                    });
                }
            }
        }
    }
    if let Some(fragment) = generator_fragment(line) {
        let names = match scope {
            Some(scope) => recover_generator_names(&reader, parser, scope, &fragment),
            None => Vec::new(),
        };
        return done(CompletionIntent::GeneratorVariable { names });
    }

    done(CompletionIntent::Default)
}

/// Re-parse the captured sub-expression and collect every name in it that
/// does not resolve: those are the candidate loop variables.
fn recover_generator_names(
    model: &SymbolModel,
    parser: &dyn ExpressionParser,
    scope: ScopeId,
    fragment: &str,
) -> Vec<String> {
    let Some(expr) = parser.parse_expression(fragment.trim()) else {
        return Vec::new();
    };
    let mut v = ExpressionVisitor::new(model, scope)
        .with_global_search()
        .with_unknown_name_reporting();
    let _ = v.infer(&expr);
    v.unknown_names
}

// ============================================================================
// Fragment Queries
// ============================================================================

/// Re-parse and type a guessed sub-expression ("what type is at the
/// cursor"). Runs read-only and with file-wide name search, since the
/// model's position information ends before the cursor.
pub fn infer_fragment(
    model: &SharedModel,
    parser: &dyn ExpressionParser,
    scope: ScopeId,
    fragment: &str,
) -> Inferred {
    let m = model.read();
    match parser.parse_expression(fragment.trim()) {
        Some(expr) => {
            let mut v = ExpressionVisitor::new(&m, scope).with_global_search();
            v.infer(&expr)
        }
        None => Inferred::unknown(),
    }
}

/// Member candidates for a type, for the completion-item builder.
///
/// Declarations sourced from the builtin stub are discarded unless the
/// querying file is the stub itself; inherited object plumbing is noise in
/// user-facing member lists.
pub fn member_declarations_for_type(
    model: &SharedModel,
    ty: &Type,
    querying: FileId,
) -> Vec<DeclarationId> {
    let m = model.read();
    let from_stub_query = m.is_stub_file(querying);
    let mut result = Vec::new();
    for scope in ExpressionVisitor::member_scopes(&m, ty) {
        for decl in m.scope_declarations(scope, None) {
            if !from_stub_query && m.is_stub_file(m.declaration(decl).file) {
                continue;
            }
            result.push(decl);
        }
    }
    result
}

/// The declarations a default (plain name) completion should offer,
/// checking the abort flag between scope-walk rounds.
pub fn default_completion_declarations(
    model: &SharedModel,
    context: &CompletionContext,
    abort: &AbortFlag,
) -> Vec<DeclarationId> {
    if abort.is_aborted() {
        return Vec::new();
    }
    let Some(scope) = context.scope else {
        return Vec::new();
    };
    let m = model.read();
    let mut result = Vec::new();
    for decl in m.visible_declarations(scope, None) {
        if abort.is_aborted() {
            return Vec::new();
        }
        result.push(decl);
    }
    result
}

// ============================================================================
// String/Comment State Scan
// ============================================================================

/// What kind of text a position sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextClass {
    Code,
    Comment,
    String,
    TripleString,
}

/// One forward pass over the whole file: per-position text class, plus a
/// masked copy where string contents are replaced by a placeholder so the
/// pattern cascade sees no false brackets, dots or commas.
pub struct TextState {
    masked: String,
    classes: Vec<TextClass>,
}

impl TextState {
    pub fn scan(text: &str) -> TextState {
        let bytes = text.as_bytes();
        let mut masked = bytes.to_vec();
        let mut classes = vec![TextClass::Code; bytes.len() + 1];

        #[derive(Clone, Copy, PartialEq)]
        enum State {
            Code,
            Comment,
            Str(u8),
            Triple(u8),
        }
        let mut state = State::Code;
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            let mut advance = 1;
            match state {
                State::Code => {
                    if b == b'#' {
                        state = State::Comment;
                    } else if b == b'\'' || b == b'"' {
                        if bytes[i..].starts_with(&[b, b, b]) {
                            state = State::Triple(b);
                            advance = 3;
                        } else {
                            state = State::Str(b);
                        }
                    }
                }
                State::Comment => {
                    if b == b'\n' {
                        state = State::Code;
                    }
                }
                State::Str(q) => {
                    if b == b'\\' {
                        advance = 2;
                        mask_bytes(&mut masked, i, advance);
                    } else if b == q {
                        state = State::Code;
                    } else if b == b'\n' {
                        // an unterminated single-quoted string ends with the
                        // line
                        state = State::Code;
                    } else {
                        mask_bytes(&mut masked, i, 1);
                    }
                }
                State::Triple(q) => {
                    if b == q && bytes[i..].starts_with(&[q, q, q]) {
                        state = State::Code;
                        advance = 3;
                    } else {
                        mask_bytes(&mut masked, i, 1);
                    }
                }
            }
            let class = match state {
                State::Code => TextClass::Code,
                State::Comment => TextClass::Comment,
                State::Str(_) => TextClass::String,
                State::Triple(_) => TextClass::TripleString,
            };
            let end = (i + advance).min(bytes.len());
            for slot in classes.iter_mut().take(end + 1).skip(i + 1) {
                *slot = class;
            }
            i += advance;
        }

        TextState {
            masked: String::from_utf8(masked).unwrap_or_else(|_| text.to_string()),
            classes,
        }
    }

    /// The class of the position between bytes `position - 1` and
    /// `position`.
    pub fn class_at(&self, position: usize) -> TextClass {
        self.classes
            .get(position)
            .copied()
            .unwrap_or(TextClass::Code)
    }

    pub fn masked(&self) -> &str {
        &self.masked
    }
}

fn mask_bytes(masked: &mut [u8], start: usize, count: usize) {
    for slot in masked.iter_mut().skip(start).take(count) {
        // multi-byte characters carry no syntax; leave them intact so byte
        // offsets stay aligned
        if slot.is_ascii() {
            *slot = b'_';
        }
    }
}

// ============================================================================
// Scope Position Correction
// ============================================================================

/// A scope's recorded range may end before trailing blank or indented lines
/// that logically still belong to it. If the nearest scope ending before the
/// cursor is indented like the cursor line, it is the scope the user is
/// typing in.
fn corrected_scope(
    m: &SymbolModel,
    file: FileId,
    text: &str,
    position: usize,
    fallback: ScopeId,
) -> ScopeId {
    let cursor_indent = line_indentation(text, position);
    let candidate = m
        .scopes_of_file(file)
        .filter(|s| s.kind != ScopeKind::Module && s.span.end <= position)
        .max_by_key(|s| s.span.end);
    let Some(candidate) = candidate else {
        return fallback;
    };
    if scope_indentation(text, candidate.span.start, candidate.span.end) == Some(cursor_indent) {
        debug!(scope = %candidate.id, "corrected completion scope by indentation");
        candidate.id
    } else {
        fallback
    }
}

/// The indentation of the last non-blank line within a span.
fn scope_indentation(text: &str, start: usize, end: usize) -> Option<&str> {
    let mut start = start.min(text.len());
    let mut end = end.min(text.len());
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[start..end]
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .map(|l| &l[..l.len() - l.trim_start().len()])
}

// ============================================================================
// Backward Expression Scanner
// ============================================================================

/// What a right-to-left expression capture found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackwardScan {
    /// The captured trailing sub-expression, trimmed.
    pub expression: String,
    /// The line content before the capture (and before the unmatched
    /// bracket, when one ended the scan). Rescanning it resolves the next
    /// call in a chain.
    pub remainder: String,
    /// Commas seen at bracket depth zero inside the capture.
    pub top_level_commas: usize,
    /// The unmatched opening bracket that ended the scan, if any.
    pub stopped_at: Option<char>,
}

/// Walk a line right-to-left, skipping balanced bracket groups, stopping on
/// an unmatched opening bracket or on any of `stop` at depth zero.
///
/// With `required_trailing`, the scan only succeeds when the line's last
/// character is in the given set.
pub fn scan_expression_backward(
    line: &str,
    stop: &str,
    required_trailing: Option<&str>,
) -> Option<BackwardScan> {
    let chars: Vec<char> = line.chars().collect();
    let last = *chars.last()?;
    if let Some(required) = required_trailing {
        if !required.contains(last) {
            return None;
        }
    }

    let mut depth: Vec<char> = Vec::new();
    let mut commas = 0usize;
    let mut stop_index: Option<usize> = None;
    let mut stopped_at: Option<char> = None;
    for i in (0..chars.len()).rev() {
        let c = chars[i];
        match c {
            ')' | ']' | '}' => depth.push(c),
            '(' | '[' | '{' => {
                if depth.is_empty() {
                    stop_index = Some(i);
                    stopped_at = Some(c);
                    break;
                }
                depth.pop();
            }
            ',' if depth.is_empty() && !stop.contains(',') => commas += 1,
            c if depth.is_empty() && stop.contains(c) => {
                stop_index = Some(i);
                break;
            }
            _ => {}
        }
    }

    let capture_start = stop_index.map(|i| i + 1).unwrap_or(0);
    let expression: String = chars[capture_start..].iter().collect();
    let remainder: String = chars[..stop_index.unwrap_or(0)].iter().collect();
    Some(BackwardScan {
        expression: expression.trim().to_string(),
        remainder,
        top_level_commas: commas,
        stopped_at,
    })
}

/// Detect a comprehension being typed: an unclosed `[` or `{` followed by a
/// `for` with no `in` yet. Returns the bracketed expression before the
/// `for`, whose unresolved names are the candidate loop variables.
fn generator_fragment(line: &str) -> Option<String> {
    let mut stack: Vec<(usize, char)> = Vec::new();
    for (i, c) in line.char_indices() {
        match c {
            '(' | '[' | '{' => stack.push((i, c)),
            ')' | ']' | '}' => {
                stack.pop();
            }
            _ => {}
        }
    }
    let (open_index, _) = stack.into_iter().rev().find(|(_, c)| *c == '[' || *c == '{')?;
    let inner = &line[open_index + 1..];
    let for_index = rfind_word(inner, "for")?;
    let after = &inner[for_index + 3..];
    if has_word(after, "in") {
        return None;
    }
    // only a partially typed variable list may follow the `for`
    if !after
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == ',' || c.is_whitespace())
    {
        return None;
    }
    let before = inner[..for_index].trim();
    (!before.is_empty()).then(|| before.to_string())
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn rfind_word(text: &str, word: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut search_end = text.len();
    while let Some(position) = text[..search_end].rfind(word) {
        let before_ok = position == 0 || !is_word_byte(bytes[position - 1]);
        let end = position + word.len();
        let after_ok = end >= text.len() || !is_word_byte(bytes[end]);
        if before_ok && after_ok {
            return Some(position);
        }
        if position == 0 {
            break;
        }
        search_end = position;
    }
    None
}

fn has_word(text: &str, word: &str) -> bool {
    rfind_word(text, word).is_some()
}

// ============================================================================
// Special Methods
// ============================================================================

/// A special method the define-completion can offer to implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialMethod {
    pub name: &'static str,
    /// Display form of the parameter list.
    pub signature: &'static str,
    /// Parameter list to insert.
    pub insert: &'static str,
}

const fn special(name: &'static str, signature: &'static str, insert: &'static str) -> SpecialMethod {
    SpecialMethod {
        name,
        signature,
        insert,
    }
}

static SPECIAL_METHODS: &[SpecialMethod] = &[
    special("__init__", "self", "self"),
    special("__new__", "self", "self"),
    special("__del__", "self", "self"),
    special("__repr__", "self", "self"),
    special("__str__", "self", "self"),
    special("__hash__", "self", "self"),
    special("__len__", "self", "self"),
    special("__iter__", "self", "self"),
    special("__reversed__", "self", "self"),
    special("__nonzero__", "self", "self"),
    special("__unicode__", "self", "self"),
    special("__lt__", "self, <any object> other", "self, other"),
    special("__le__", "self, <any object> other", "self, other"),
    special("__gt__", "self, <any object> other", "self, other"),
    special("__ge__", "self, <any object> other", "self, other"),
    special("__eq__", "self, <any object> other", "self, other"),
    special("__ne__", "self, <any object> other", "self, other"),
    special("__cmp__", "self, <any object> other", "self, other"),
    special("__contains__", "self, <any object> item", "self, item"),
    special("__add__", "self, <any object> other", "self, other"),
    special("__sub__", "self, <any object> other", "self, other"),
    special("__mul__", "self, <any object> other", "self, other"),
    special("__div__", "self, <any object> other", "self, other"),
    special("__mod__", "self, <any object> other", "self, other"),
    special("__and__", "self, <any object> other", "self, other"),
    special("__or__", "self, <any object> other", "self, other"),
    special("__xor__", "self, <any object> other", "self, other"),
    special("__neg__", "self", "self"),
    special("__pos__", "self", "self"),
    special("__abs__", "self", "self"),
    special("__invert__", "self", "self"),
    special("__int__", "self", "self"),
    special("__float__", "self", "self"),
    special("__call__", "self, [...args]", "self"),
    special("__getattr__", "self, <string> name", "self, name"),
    special("__setattr__", "self, <string> name, <any object> value", "self, name, value"),
    special("__getitem__", "self, <string> key", "self, key"),
    special("__setitem__", "self, <string> key, <any object> value", "self, key, value"),
    special("__delitem__", "self, <string> key", "self, key"),
];

/// The special methods a `def ` completion inside a class can offer.
pub fn special_methods() -> &'static [SpecialMethod] {
    SPECIAL_METHODS
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{build, ExprKind};
    use crate::model::{DeclKind, ScopeKind};
    use pysense_core::source::{Revision, Span};

    /// Just enough parsing for the fixtures: `a + b`, dotted names, plain
    /// names.
    struct FixtureParser;

    impl ExpressionParser for FixtureParser {
        fn parse_expression(&self, text: &str) -> Option<Expr> {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            if let Some((left, right)) = text.split_once('+') {
                return Some(build::binop(
                    self.parse_expression(left)?,
                    self.parse_expression(right)?,
                ));
            }
            let mut parts = text.split('.');
            let mut expr = build::name(parts.next()?.trim());
            for part in parts {
                expr = build::attribute(expr, part.trim());
            }
            Some(expr)
        }
    }

    fn empty_model_with_file(path: &str, len: usize) -> SharedModel {
        let model = SharedModel::new();
        {
            let mut m = model.write();
            let file = m.intern_file(Path::new(path));
            let module = m.new_scope(ScopeKind::Module, file, Span::new(0, len), None, None);
            m.file_mut(file).module_scope = Some(module);
        }
        model
    }

    fn classify_tail(text: &str) -> CompletionIntent {
        let model = empty_model_with_file("main.py", text.len());
        classify(&model, &FixtureParser, Path::new("main.py"), text, text.len()).intent
    }

    #[test]
    fn test_no_completion_inside_strings_and_comments() {
        assert_eq!(classify_tail("x = \"abc"), CompletionIntent::NoCompletion);
        assert_eq!(classify_tail("x = '''doc\nstill"), CompletionIntent::NoCompletion);
        assert_eq!(classify_tail("x = 1  # comm"), CompletionIntent::NoCompletion);
        // after the string has closed, classification resumes
        assert!(matches!(
            classify_tail("x = \"abc\" and y"),
            CompletionIntent::Default
        ));
    }

    #[test]
    fn test_import_classification() {
        assert_eq!(classify_tail("import "), CompletionIntent::ImportFile);
        assert_eq!(classify_tail("from "), CompletionIntent::ImportFile);
        assert_eq!(
            classify_tail("from foo.bar import "),
            CompletionIntent::ImportSubmodule {
                module: "foo.bar".to_string()
            }
        );
        assert_eq!(
            classify_tail("import foo."),
            CompletionIntent::ImportSubmodule {
                module: "foo".to_string()
            }
        );
    }

    #[test]
    fn test_raise_new_statement_inheritance() {
        assert_eq!(classify_tail("raise "), CompletionIntent::RaiseException);
        assert_eq!(classify_tail("x = 1\n    "), CompletionIntent::NewStatement);
        assert_eq!(classify_tail("class Foo("), CompletionIntent::Inheritance);
        // def outside a class offers nothing
        assert_eq!(classify_tail("def "), CompletionIntent::NoCompletion);
    }

    #[test]
    fn test_member_access_extracts_expression() {
        assert_eq!(
            classify_tail("x = foo.bar."),
            CompletionIntent::MemberAccess {
                expression: "foo.bar".to_string()
            }
        );
        // balanced groups are skipped over
        assert_eq!(
            classify_tail("foo(1, 2).bar."),
            CompletionIntent::MemberAccess {
                expression: "foo(1, 2).bar".to_string()
            }
        );
        // dots inside strings are masked and cannot confuse the scan
        assert_eq!(
            classify_tail("x = \"a.b\"\ny."),
            CompletionIntent::MemberAccess {
                expression: "y".to_string()
            }
        );
    }

    #[test]
    fn test_function_call_scans_chain() {
        // the documented double application: outer capture, then remainder
        let intent = classify_tail("a(b(c(), d, e");
        assert_eq!(
            intent,
            CompletionIntent::FunctionCall {
                callee: "b".to_string(),
                given_args: 2
            }
        );
        assert_eq!(
            classify_tail("f("),
            CompletionIntent::FunctionCall {
                callee: "f".to_string(),
                given_args: 0
            }
        );
    }

    #[test]
    fn test_generator_variable_recovers_unknown_names() {
        let intent = classify_tail("squares = [foo + bar for ");
        match intent {
            CompletionIntent::GeneratorVariable { names } => {
                assert_eq!(names, vec!["foo".to_string(), "bar".to_string()]);
            }
            other => panic!("expected GeneratorVariable, got {other:?}"),
        }
        // once the `in` is typed the construct is no longer ours
        assert!(matches!(
            classify_tail("squares = [foo for foo in "),
            CompletionIntent::Default
        ));
    }

    #[test]
    fn test_define_special_method_in_class_scope() {
        let model = SharedModel::new();
        let text = "class C:\n    x = 1\n    def ";
        let path = Path::new("main.py");
        {
            let mut m = model.write();
            let file = m.intern_file(path);
            let module = m.new_scope(ScopeKind::Module, file, Span::new(0, text.len()), None, None);
            m.file_mut(file).module_scope = Some(module);
            m.new_scope(
                ScopeKind::Class,
                file,
                Span::new(0, text.len()),
                Some(module),
                Some("C".into()),
            );
        }
        let got = classify(&model, &NullParser, path, text, text.len());
        assert_eq!(
            got.intent,
            CompletionIntent::DefineSpecialMethod {
                indentation: "    ".to_string()
            }
        );
        assert!(special_methods().iter().any(|s| s.name == "__init__"));
    }

    #[test]
    fn test_scope_correction_by_indentation() {
        // the function body scope ends before the trailing indented line;
        // the cursor still belongs to it
        let text = "def f():\n    x = 1\n    ";
        let model = SharedModel::new();
        let path = Path::new("main.py");
        let body_scope = {
            let mut m = model.write();
            let file = m.intern_file(path);
            let module = m.new_scope(ScopeKind::Module, file, Span::new(0, text.len()), None, None);
            m.file_mut(file).module_scope = Some(module);
            m.new_scope(
                ScopeKind::Function,
                file,
                Span::new(8, 18),
                Some(module),
                Some("f".into()),
            )
        };
        let got = classify(&model, &NullParser, path, text, text.len());
        assert_eq!(got.scope, Some(body_scope));
        assert_eq!(got.intent, CompletionIntent::NewStatement);

        // an unindented cursor line stays in the module scope
        let text2 = "def f():\n    x = 1\ny";
        let got2 = classify(&model, &NullParser, path, text2, text2.len());
        let m = model.read();
        assert_eq!(got2.scope.map(|s| m.scope(s).kind), Some(ScopeKind::Module));
    }

    #[test]
    fn test_backward_scanner_directly() {
        let scan = scan_expression_backward("a(b(c(), d, e", "", None).unwrap();
        assert_eq!(scan.expression, "c(), d, e");
        assert_eq!(scan.remainder, "a(b");
        assert_eq!(scan.top_level_commas, 2);
        assert_eq!(scan.stopped_at, Some('('));

        let callee = scan_expression_backward("a(b", EXPRESSION_STOP, None).unwrap();
        assert_eq!(callee.expression, "b");

        // required trailing character gates the scan
        assert!(scan_expression_backward("foo", EXPRESSION_STOP, Some(".")).is_none());
        let member = scan_expression_backward("x = foo.bar[1].baz.", EXPRESSION_STOP, Some("."))
            .unwrap();
        assert_eq!(member.expression, "foo.bar[1].baz.");
    }

    #[test]
    fn test_classification_never_panics_on_odd_input() {
        for text in ["", "   ", ")))", "(((", "x = ", "\n\n\n", "a.b.c", "é = 1\né."] {
            let model = empty_model_with_file("main.py", text.len());
            let _ = classify(&model, &NullParser, Path::new("main.py"), text, text.len());
            let _ = classify(&model, &NullParser, Path::new("main.py"), text, 0);
        }
    }

    #[test]
    fn test_default_completion_respects_abort() {
        let model = empty_model_with_file("main.py", 10);
        let scope = model.read().module_scope(FileId(0));
        {
            let mut m = model.write();
            let s = scope.unwrap();
            m.new_declaration(
                "x",
                DeclKind::Instance,
                Type::mixed(),
                FileId(0),
                Span::new(0, 1),
                Revision(1),
                s,
            );
        }
        let context = CompletionContext {
            intent: CompletionIntent::Default,
            scope,
        };
        let abort = AbortFlag::new();
        assert_eq!(default_completion_declarations(&model, &context, &abort).len(), 1);
        abort.abort();
        assert!(default_completion_declarations(&model, &context, &abort).is_empty());
    }

    #[test]
    fn test_completion_context_serializes() {
        let context = CompletionContext {
            intent: CompletionIntent::ImportSubmodule {
                module: "foo.bar".to_string(),
            },
            scope: None,
        };
        let json = serde_json::to_string(&context).unwrap();
        assert!(json.contains("import_submodule"));
        let back: CompletionContext = serde_json::from_str(&json).unwrap();
        assert_eq!(back, context);
    }

    #[test]
    fn test_fixture_parser_shapes() {
        let parsed = FixtureParser.parse_expression("a.b").unwrap();
        assert!(matches!(parsed.kind, ExprKind::Attribute { .. }));
    }
}
