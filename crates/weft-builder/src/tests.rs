
use std::cell::RefCell;
use std::rc::Rc;

use expect_test::{Expect, expect};
use salsa::DatabaseImpl;
use text_size::{TextRange, TextSize};
use weft_syntax::{Language, SyntaxKind, TokenSequence};
use weft_tokenizer::kinds::*;
use weft_tokenizer::{Tiny, Tokenizer};
use weft_tree::SyntaxTree;

use crate::{
    AsMarker, Builder, BuilderConfig, LeadingComments, LightNode, LightTree, Reparse,
    TokenRemapper, TrailingComments, WhitespaceSkipped,
};

fn builder<'db>(db: &'db DatabaseImpl, text: &'db str, config: BuilderConfig) -> Builder<'db> {
    let mut lexer = Tokenizer::new();
    Builder::new(db, &Tiny, text, &mut lexer, config)
}

fn parse(db: &DatabaseImpl, text: &str) -> SyntaxTree {
    let mut p = builder(db, text, BuilderConfig::default());
    grammar::file(&mut p);
    p.tree_built()
}

fn check(text: &str, expect: Expect) {
    let db = DatabaseImpl::new();
    expect.assert_eq(&parse(&db, text).debug_dump(&Tiny));
}

fn offsets(start: u32, end: u32) -> TextRange {
    TextRange::new(TextSize::new(start), TextSize::new(end))
}

#[test]
fn inner_whitespace_belongs_to_the_node() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a + b", BuilderConfig::default());
    let m = p.mark();
    p.advance();
    p.advance();
    p.advance();
    m.done(&mut p, EXPR);

    expect![[r#"
        EXPR@0..5
          IDENT@0..1 "a"
          WHITESPACE@1..2 " "
          PLUS@2..3 "+"
          WHITESPACE@3..4 " "
          IDENT@4..5 "b"
    "#]]
    .assert_eq(&p.tree_built().debug_dump(&Tiny));
}

#[test]
fn error_in_empty_text() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "", BuilderConfig::default());
    let m = p.mark();
    p.error("expected identifier");
    m.done(&mut p, EXPR);

    expect![[r#"
        EXPR@0..0
          ERROR@0..0: expected identifier
    "#]]
    .assert_eq(&p.tree_built().debug_dump(&Tiny));
}

#[test]
fn let_statement() {
    check(
        "let x = a + 1;",
        expect![[r#"
            FILE@0..14
              LET_STMT@0..14
                LET_KW@0..3 "let"
                WHITESPACE@3..4 " "
                IDENT@4..5 "x"
                WHITESPACE@5..6 " "
                EQ@6..7 "="
                WHITESPACE@7..8 " "
                BINARY_EXPR@8..13
                  NAME_REF@8..9
                    IDENT@8..9 "a"
                  WHITESPACE@9..10 " "
                  PLUS@10..11 "+"
                  WHITESPACE@11..12 " "
                  LITERAL@12..13
                    NUMBER@12..13 "1"
                SEMI@13..14 ";"
        "#]],
    );
}

#[test]
fn trailing_whitespace_goes_to_the_root() {
    check(
        "a; ",
        expect![[r#"
            FILE@0..3
              EXPR_STMT@0..2
                NAME_REF@0..1
                  IDENT@0..1 "a"
                SEMI@1..2 ";"
              WHITESPACE@2..3 " "
        "#]],
    );
}

#[test]
fn fn_body_is_collapsed_into_a_lazy_leaf() {
    check(
        "fn f { let x = 1; }",
        expect![[r#"
            FILE@0..19
              FN_DEF@0..19
                MODIFIER_LIST@0..0
                FN_KW@0..2 "fn"
                WHITESPACE@2..3 " "
                IDENT@3..4 "f"
                WHITESPACE@4..5 " "
                BLOCK@5..19 "{ let x = 1; }" (lazy)
        "#]],
    );
}

#[test]
fn syntax_errors_become_error_nodes() {
    let db = DatabaseImpl::new();
    let tree = parse(&db, "let = ;");
    expect![[r#"
        FILE@0..7
          LET_STMT@0..7
            LET_KW@0..3 "let"
            ERROR@3..3: expected name
            WHITESPACE@3..4 " "
            EQ@4..5 "="
            ERROR@5..5: expected expression
            WHITESPACE@5..6 " "
            SEMI@6..7 ";"
    "#]]
    .assert_eq(&tree.debug_dump(&Tiny));

    let errors: Vec<_> = tree.errors().iter().map(|it| it.message().to_owned()).collect();
    assert_eq!(errors, ["expected name", "expected expression"]);
}

#[test]
fn leading_comments_binder() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "// doc\nlet x;", BuilderConfig::default());
    let root = p.mark();
    let stmt = p.mark();
    while !p.at(SEMI) {
        p.advance();
    }
    p.advance();
    let stmt = stmt.done(&mut p, LET_STMT);
    let binder = Rc::new(LeadingComments { comments: Tiny.comments().clone() });
    stmt.set_edge_binders(&mut p, Some(binder), None);
    root.done(&mut p, FILE);

    expect![[r#"
        FILE@0..13
          LET_STMT@0..13
            LINE_COMMENT@0..6 "// doc"
            WHITESPACE@6..7 "\n"
            LET_KW@7..10 "let"
            WHITESPACE@10..11 " "
            IDENT@11..12 "x"
            SEMI@12..13 ";"
    "#]]
    .assert_eq(&p.tree_built().debug_dump(&Tiny));
}

#[test]
fn trailing_comments_binder() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a; // tail\nb;", BuilderConfig::default());
    let root = p.mark();

    let first = p.mark();
    p.advance();
    p.advance();
    let first = first.done(&mut p, EXPR_STMT);
    let binder = Rc::new(TrailingComments { comments: Tiny.comments().clone() });
    first.set_edge_binders(&mut p, None, Some(binder));

    let second = p.mark();
    p.advance();
    p.advance();
    second.done(&mut p, EXPR_STMT);
    root.done(&mut p, FILE);

    expect![[r#"
        FILE@0..13
          EXPR_STMT@0..10
            IDENT@0..1 "a"
            SEMI@1..2 ";"
            WHITESPACE@2..3 " "
            LINE_COMMENT@3..10 "// tail"
          WHITESPACE@10..11 "\n"
          EXPR_STMT@11..13
            IDENT@11..12 "b"
            SEMI@12..13 ";"
    "#]]
    .assert_eq(&p.tree_built().debug_dump(&Tiny));
}

fn empty_node_between(kind: SyntaxKind) -> String {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a  b", BuilderConfig::default());
    let root = p.mark();
    p.advance();
    let m = p.mark();
    m.done(&mut p, kind);
    p.advance();
    root.done(&mut p, FILE);
    p.tree_built().debug_dump(&Tiny)
}

#[test]
fn empty_left_bound_node_sticks_to_the_previous_token() {
    expect![[r#"
        FILE@0..4
          IDENT@0..1 "a"
          MODIFIER_LIST@1..1
          WHITESPACE@1..3 "  "
          IDENT@3..4 "b"
    "#]]
    .assert_eq(&empty_node_between(MODIFIER_LIST));

    expect![[r#"
        FILE@0..4
          IDENT@0..1 "a"
          WHITESPACE@1..3 "  "
          LIST@3..3
          IDENT@3..4 "b"
    "#]]
    .assert_eq(&empty_node_between(LIST));
}

#[test]
fn done_before_with_error_puts_the_error_inside() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a b", BuilderConfig::debug());
    let root = p.mark();
    let m = p.mark();
    p.advance();
    let before = p.mark();
    p.advance();
    let before = before.done(&mut p, NAME_REF);
    m.done_before_with_error(&mut p, EXPR, &before, "missing operator");
    root.done(&mut p, FILE);

    expect![[r#"
        FILE@0..3
          EXPR@0..1
            IDENT@0..1 "a"
            ERROR@1..1: missing operator
          WHITESPACE@1..2 " "
          NAME_REF@2..3
            IDENT@2..3 "b"
    "#]]
    .assert_eq(&p.tree_built().debug_dump(&Tiny));
}

#[test]
fn done_before_closes_ahead_of_a_later_marker() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a b", BuilderConfig::debug());
    let root = p.mark();
    let m = p.mark();
    p.advance();
    let before = p.mark();
    p.advance();
    let before = before.done(&mut p, NAME_REF);
    m.done_before(&mut p, EXPR, &before);
    root.done(&mut p, FILE);

    expect![[r#"
        FILE@0..3
          EXPR@0..1
            IDENT@0..1 "a"
          WHITESPACE@1..2 " "
          NAME_REF@2..3
            IDENT@2..3 "b"
    "#]]
    .assert_eq(&p.tree_built().debug_dump(&Tiny));
}

#[test]
fn error_before_wraps_the_skipped_tokens() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a b", BuilderConfig::debug());
    let root = p.mark();
    let m = p.mark();
    p.advance();
    let before = p.mark();
    p.advance();
    let before = before.done(&mut p, NAME_REF);
    m.error_before(&mut p, "unexpected token", &before);
    root.done(&mut p, FILE);

    let tree = p.tree_built();
    expect![[r#"
        FILE@0..3
          ERROR@0..1: unexpected token
            IDENT@0..1 "a"
          WHITESPACE@1..2 " "
          NAME_REF@2..3
            IDENT@2..3 "b"
    "#]]
    .assert_eq(&tree.debug_dump(&Tiny));
    assert_eq!(tree.errors().len(), 1);
}

#[test]
fn balancing_twice_changes_nothing() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a; // tail\nb;", BuilderConfig::default());
    let root = p.mark();
    let first = p.mark();
    p.advance();
    p.advance();
    let first = first.done(&mut p, EXPR_STMT);
    let binder = Rc::new(TrailingComments { comments: Tiny.comments().clone() });
    first.set_edge_binders(&mut p, None, Some(binder));
    let second = p.mark();
    p.advance();
    p.advance();
    second.done(&mut p, EXPR_STMT);
    root.done(&mut p, FILE);

    let lexemes = |p: &Builder<'_>| -> Vec<u32> {
        p.production().entries().iter().map(|&entry| p.pool().lexeme(entry)).collect()
    };
    p.balance_white_spaces();
    let once = lexemes(&p);
    p.balance_white_spaces();
    assert_eq!(lexemes(&p), once);
    assert_eq!(once, [0, 0, 4, 5, 7, 7]);
}

#[test]
fn repeated_errors_are_reported_once() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, " a", BuilderConfig::default());
    let root = p.mark();
    p.error("first");
    p.error("ignored");
    p.current_kind();
    p.error("same place after balancing");
    p.advance();
    root.done(&mut p, FILE);

    expect![[r#"
        FILE@0..2
          ERROR@0..0: first
          WHITESPACE@0..1 " "
          IDENT@1..2 "a"
    "#]]
    .assert_eq(&p.tree_built().debug_dump(&Tiny));
}

#[test]
fn rollback_restores_cursor_and_log() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a + b", BuilderConfig::default());
    let root = p.mark();
    p.advance();

    let log = p.production().clone();
    let m = p.mark();
    let cursor = p.raw_token_index();
    p.advance();
    p.error("speculative");
    let inner = p.mark();
    p.advance();
    inner.done(&mut p, NAME_REF);
    m.rollback(&mut p);

    assert_eq!(p.raw_token_index(), cursor);
    assert_eq!(p.production(), &log);

    p.advance();
    p.advance();
    root.done(&mut p, EXPR);
    expect![[r#"
        EXPR@0..5
          IDENT@0..1 "a"
          WHITESPACE@1..2 " "
          PLUS@2..3 "+"
          WHITESPACE@3..4 " "
          IDENT@4..5 "b"
    "#]]
    .assert_eq(&p.tree_built().debug_dump(&Tiny));
}

#[test]
fn abandon_keeps_the_contents() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a b", BuilderConfig::debug());
    let root = p.mark();
    let open = p.mark();
    p.advance();
    open.abandon(&mut p);
    let done = p.mark();
    p.advance();
    done.done(&mut p, NAME_REF).abandon(&mut p);
    root.done(&mut p, FILE);

    expect![[r#"
        FILE@0..3
          IDENT@0..1 "a"
          WHITESPACE@1..2 " "
          IDENT@2..3 "b"
    "#]]
    .assert_eq(&p.tree_built().debug_dump(&Tiny));
}

#[test]
fn precede_and_remap_kind() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a", BuilderConfig::debug());
    let root = p.mark();
    let inner = p.mark();
    p.advance();
    let mut inner = inner.done(&mut p, NAME_REF);
    inner.remap_kind(&mut p, LITERAL);
    assert_eq!(inner.kind(), LITERAL);
    let outer = inner.precede(&mut p);
    outer.done(&mut p, EXPR);

    let latest = p.latest_done_marker().map(|it| it.kind());
    assert_eq!(latest, Some(EXPR));
    assert!(!root.has_errors_after(&p));
    root.done(&mut p, FILE);

    expect![[r#"
        FILE@0..1
          EXPR@0..1
            LITERAL@0..1
              IDENT@0..1 "a"
    "#]]
    .assert_eq(&p.tree_built().debug_dump(&Tiny));
}

#[test]
fn errors_after_a_marker() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a", BuilderConfig::default());
    let root = p.mark();
    let m = p.mark();
    p.advance();
    let m = m.done(&mut p, NAME_REF);
    assert!(!root.has_errors_after(&p));
    assert!(!m.has_errors_after(&p));
    p.error("trailing");
    assert!(m.has_errors_after(&p));
    root.done(&mut p, FILE);

    let mut p = builder(&db, "a", BuilderConfig::default());
    let root = p.mark();
    let m = p.mark();
    p.advance();
    m.error(&mut p, "bad name");
    assert!(root.has_errors_after(&p));
    root.done(&mut p, FILE);
}

#[test]
fn cursor_queries() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a + b", BuilderConfig::default());

    assert_eq!(p.lookahead(0), Some(IDENT));
    assert_eq!(p.lookahead(1), Some(PLUS));
    assert_eq!(p.lookahead(2), Some(IDENT));
    assert_eq!(p.lookahead(3), None);

    assert_eq!(p.raw_lookup(1), Some(WHITESPACE));
    assert_eq!(p.raw_lookup(-1), None);
    assert_eq!(p.raw_token_start(2), Some(TextSize::new(2)));
    assert_eq!(p.raw_token_start(10), Some(TextSize::new(5)));
    assert_eq!(p.raw_token_start(-1), None);

    p.advance();
    assert_eq!(p.raw_token_index(), 1);
    assert_eq!(p.current_kind(), Some(PLUS));
    assert_eq!(p.raw_token_index(), 2);
    assert_eq!(p.token_text(), Some("+"));
    assert_eq!(p.current_offset(), TextSize::new(2));

    p.raw_advance(3);
    assert!(p.eof());
    assert_eq!(p.current_kind(), None);
    assert_eq!(p.token_text(), None);
    assert_eq!(p.current_offset(), TextSize::new(5));
    assert_eq!(p.original_text(), "a + b");
}

#[test]
fn remapper_and_whitespace_callback() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a /* c */ b", BuilderConfig::default());

    let skipped = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&skipped);
    let callback: WhitespaceSkipped<'_> =
        Box::new(move |kind: SyntaxKind, range: TextRange| sink.borrow_mut().push((kind, range)));
    p.set_whitespace_skipped_callback(Some(callback));

    let remapper: TokenRemapper<'_> =
        Box::new(|kind: SyntaxKind, range: TextRange, text: &str| {
            if &text[range] == "b" { NUMBER } else { kind }
        });
    p.set_token_type_remapper(Some(remapper));

    let root = p.mark();
    assert_eq!(p.current_kind(), Some(IDENT));
    p.advance();
    assert_eq!(p.current_kind(), Some(NUMBER));
    p.advance();
    root.done(&mut p, EXPR);

    assert_eq!(
        *skipped.borrow(),
        [
            (WHITESPACE, offsets(1, 2)),
            (BLOCK_COMMENT, offsets(2, 9)),
            (WHITESPACE, offsets(9, 10)),
        ]
    );
    expect![[r#"
        EXPR@0..11
          IDENT@0..1 "a"
          WHITESPACE@1..2 " "
          BLOCK_COMMENT@2..9 "/* c */"
          WHITESPACE@9..10 " "
          NUMBER@10..11 "b"
    "#]]
    .assert_eq(&p.tree_built().debug_dump(&Tiny));
}

#[test]
fn enforced_comments_are_skipped() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a ; b", BuilderConfig::default());
    p.enforce_comment_tokens(weft_syntax::KindSet::new([SEMI]));
    let root = p.mark();
    p.advance();
    assert_eq!(p.current_kind(), Some(IDENT));
    p.advance();
    root.done(&mut p, EXPR);
}

#[test]
#[should_panic(expected = "Marker has already been disposed")]
fn rollback_of_a_disposed_marker() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a", BuilderConfig::default());
    let _root = p.mark();
    let m = p.mark();
    p.advance();
    let m = m.done(&mut p, NAME_REF);
    m.rollback(&mut p);
    m.rollback(&mut p);
}

#[test]
#[should_panic(expected = "Marker already done")]
fn done_twice() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a", BuilderConfig::default());
    let _root = p.mark();
    let m = p.mark();
    p.advance();
    let m = m.done(&mut p, NAME_REF);
    p.done_marker(m.as_marker(), NAME_REF, None);
}

#[test]
#[should_panic(expected = "Unbalanced tree")]
#[allow(clippy::mem_forget)]
fn unclosed_inner_marker() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a", BuilderConfig::default());
    let root = p.mark();
    let inner = p.mark();
    p.advance();
    root.done(&mut p, FILE);
    std::mem::forget(inner);
    p.tree_built();
}

#[test]
#[should_panic(expected = "Another not done marker added after this one")]
#[allow(clippy::mem_forget)]
fn debug_mode_checks_nesting_on_done() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a", BuilderConfig::debug());
    let root = p.mark();
    let inner = p.mark();
    p.advance();
    std::mem::forget(inner);
    root.done(&mut p, FILE);
}

#[test]
#[should_panic(expected = "Parser produced no markers")]
fn no_markers() {
    let db = DatabaseImpl::new();
    builder(&db, "a", BuilderConfig::default()).tree_built();
}

#[test]
#[should_panic(expected = "were not inserted into the tree")]
fn unconsumed_tokens() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a b", BuilderConfig::default());
    let root = p.mark();
    p.advance();
    root.done(&mut p, FILE);
    p.tree_built();
}

#[test]
#[should_panic(expected = "are outside of root element")]
fn tokens_before_the_root() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, "a b", BuilderConfig::default());
    p.advance();
    let root = p.mark();
    p.advance();
    root.done(&mut p, FILE);
    p.light_tree();
}

#[test]
fn whitespace_before_the_root_is_pulled_in() {
    let db = DatabaseImpl::new();
    let mut p = builder(&db, " a", BuilderConfig::default());
    assert!(!p.eof());
    let root = p.mark();
    p.advance();
    root.done(&mut p, FILE);

    expect![[r#"
        FILE@0..2
          WHITESPACE@0..1 " "
          IDENT@1..2 "a"
    "#]]
    .assert_eq(&p.tree_built().debug_dump(&Tiny));
}

#[test]
fn cached_tokens_of_a_collapsed_block() {
    let db = DatabaseImpl::new();
    let mut tree = parse(&db, "fn f { let x = 1; }");
    let block = tree.leaves(tree.root()).find(|&leaf| tree.kind(leaf) == BLOCK).unwrap();
    let text = tree.text(block);
    let cached = tree.take_cached_tokens(block).unwrap();
    assert_eq!(cached, TokenSequence::lex(&db, &text, &mut Tokenizer::new()));

    let config = BuilderConfig { verify_cached_tokens: true, ..BuilderConfig::default() };
    let mut p =
        Builder::reusing_tokens(&db, &Tiny, &text, Some(cached), &mut Tokenizer::new(), config);
    crate::LazyParser::parse(&grammar::BlockParser, BLOCK, &mut p);

    expect![[r#"
        BLOCK@0..14
          L_BRACE@0..1 "{"
          WHITESPACE@1..2 " "
          LET_STMT@2..12
            LET_KW@2..5 "let"
            WHITESPACE@5..6 " "
            IDENT@6..7 "x"
            WHITESPACE@7..8 " "
            EQ@8..9 "="
            WHITESPACE@9..10 " "
            LITERAL@10..11
              NUMBER@10..11 "1"
            SEMI@11..12 ";"
          WHITESPACE@12..13 " "
          R_BRACE@13..14 "}"
    "#]]
    .assert_eq(&p.tree_built().debug_dump(&Tiny));
}

#[test]
#[should_panic(expected = "Cached tokens differ from a fresh lexing")]
fn stale_cached_tokens() {
    let db = DatabaseImpl::new();
    let stale = TokenSequence::lex(&db, "{ 1; }", &mut Tokenizer::new());
    let config = BuilderConfig { verify_cached_tokens: true, ..BuilderConfig::default() };
    Builder::reusing_tokens(&db, &Tiny, "{ 22; }", Some(stale), &mut Tokenizer::new(), config);
}

fn light<'db>(db: &'db DatabaseImpl, text: &'db str, config: BuilderConfig) -> LightTree<'db> {
    let mut p = builder(db, text, config);
    grammar::file(&mut p);
    p.light_tree()
}

/// Text of every leaf below `node`, without expanding lazy leaves.
fn leaf_text(tree: &LightTree<'_>, node: LightNode, out: &mut String) {
    if tree.is_leaf(node) {
        out.push_str(tree.text(node));
        return;
    }
    let mut children = Vec::new();
    tree.children(node, &mut children);
    for child in children {
        leaf_text(tree, child, out);
    }
}

fn find(tree: &LightTree<'_>, node: LightNode, kind: SyntaxKind) -> Option<LightNode> {
    if tree.kind(node) == kind {
        return Some(node);
    }
    if tree.is_leaf(node) {
        return None;
    }
    let mut children = Vec::new();
    tree.children(node, &mut children);
    children.into_iter().find_map(|child| find(tree, child, kind))
}

#[test]
fn light_tree_covers_the_text() {
    let db = DatabaseImpl::new();
    let text = "// head\nlet x = (a + 1) * [b, c];\nfn f { 1; }\n";
    let tree = light(&db, text, BuilderConfig::default());

    let mut out = String::new();
    leaf_text(&tree, tree.root(), &mut out);
    assert_eq!(out, text);
    assert_eq!(tree.parent(tree.root()), None);
    assert_eq!(tree.range(tree.root()), offsets(0, text.len() as u32));
}

#[test]
fn light_tree_expands_bracketed_tokens() {
    let db = DatabaseImpl::new();
    let tree = light(&db, "let x = [a, b];", BuilderConfig::default());

    let list = find(&tree, tree.root(), BRACKETED).unwrap();
    assert!(tree.is_lazy(list));
    assert_eq!(tree.text(list), "[a, b]");

    let mut children = Vec::new();
    tree.children(list, &mut children);
    let kinds: Vec<_> = children.iter().map(|&child| tree.kind(child)).collect();
    assert_eq!(kinds, [L_BRACKET, IDENT, COMMA, WHITESPACE, IDENT, R_BRACKET]);
    assert_eq!(tree.range(children[1]), offsets(9, 10));
    assert_eq!(tree.parent(children[1]), Some(list));

    let mut again = Vec::new();
    tree.children(list, &mut again);
    assert_eq!(children, again);
}

#[test]
fn light_tree_expands_blocks_with_the_lazy_parser() {
    let db = DatabaseImpl::new();
    let config =
        BuilderConfig { lazy_parser: Some(Rc::new(grammar::BlockParser)), ..Default::default() };
    let tree = light(&db, "fn f { 1; }", config);

    let block = find(&tree, tree.root(), BLOCK).unwrap();
    let mut children = Vec::new();
    tree.children(block, &mut children);
    let kinds: Vec<_> = children.iter().map(|&child| tree.kind(child)).collect();
    assert_eq!(kinds, [L_BRACE, WHITESPACE, EXPR_STMT, WHITESPACE, R_BRACE]);

    let stmt = children[2];
    assert_eq!(tree.range(stmt), offsets(7, 9));
    assert_eq!(tree.text(stmt), "1;");
    assert_eq!(tree.parent(stmt), Some(block));
    assert_eq!(tree.start_offset(stmt), TextSize::new(7));
    assert_eq!(tree.end_offset(stmt), TextSize::new(9));
}

#[test]
fn light_tree_error_messages() {
    let db = DatabaseImpl::new();
    let tree = light(&db, "let = 1;", BuilderConfig::default());
    let error = find(&tree, tree.root(), SyntaxKind::ERROR).unwrap();
    assert_eq!(tree.error_message(error).as_deref(), Some("expected name"));
    assert!(!tree.is_leaf(error));
    assert_eq!(tree.children(error, &mut Vec::new()), 0);
}

fn reparse(db: &DatabaseImpl, old: &SyntaxTree, text: &str, config: BuilderConfig) -> Reparse {
    let mut p = builder(db, text, config);
    grammar::file(&mut p);
    p.reparse(old)
}

#[test]
fn reparse_of_unchanged_text_is_empty() {
    let db = DatabaseImpl::new();
    let text = "let x = a + 1;\nfn f { 1; }";
    let old = parse(&db, text);

    let Reparse::Merged(log) = reparse(&db, &old, text, BuilderConfig::default()) else {
        panic!("expected a merge");
    };
    assert!(log.is_empty(), "{log:?}");
}

#[test]
fn reparse_produces_the_fresh_tree() {
    let db = DatabaseImpl::new();
    let before = "let x = a + 1;\nfn f { 1; }\nb;";
    let after = "let x = a * 2 + 1;\nfn f { 2; }\nb; c;";
    let mut old = parse(&db, before);

    let Reparse::Merged(log) = reparse(&db, &old, after, BuilderConfig::default()) else {
        panic!("expected a merge");
    };
    assert!(!log.is_empty());
    log.apply(&mut old);

    let fresh = parse(&db, after);
    assert_eq!(old.debug_dump(&Tiny), fresh.debug_dump(&Tiny));
    assert!(old == fresh);
}

#[test]
fn reparse_replaces_a_different_root() {
    let db = DatabaseImpl::new();
    let mut old = parse(&db, "a;");

    let mut p = builder(&db, "a;", BuilderConfig::default());
    let root = p.mark();
    p.advance();
    p.advance();
    root.done(&mut p, EXPR);
    let Reparse::Merged(log) = p.reparse(&old) else { panic!("expected a merge") };
    assert_eq!(log.len(), 1);
    log.apply(&mut old);

    expect![[r#"
        EXPR@0..2
          IDENT@0..1 "a"
          SEMI@1..2 ";"
    "#]]
    .assert_eq(&old.debug_dump(&Tiny));
}

#[test]
fn deep_trees_are_rebuilt() {
    let db = DatabaseImpl::new();
    let old = parse(&db, "a;");
    let config = BuilderConfig { reparse_depth_limit: 1, ..BuilderConfig::default() };

    let Reparse::Rebuilt(tree) = reparse(&db, &old, "a + b;", config) else {
        panic!("expected a rebuild");
    };
    assert!(tree.depth_limit_exceeded());
    assert_eq!(tree.text(tree.root()), "a + b;");
}
