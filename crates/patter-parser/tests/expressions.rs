//! Expression engine coverage: precedence and grouping, multi-token
//! operators, unary operators, terms, and chunk expressions.

use patter_ast::{ChunkType, NodeId, NodeKind, ParseTree};
use patter_lexer::tokenize;
use patter_parser::Parser;

fn parse(source: &str) -> ParseTree {
    let tokens = tokenize(source).expect("lex failed");
    let mut parser = Parser::new();
    let mut tree = ParseTree::new();
    parser
        .parse("test.pt", &tokens, &mut tree)
        .expect("parse failed");
    tree
}

/// Parse `expr` in a `return` statement and hand back its node.
fn parse_expr(expr: &str) -> (ParseTree, NodeId) {
    let tree = parse(&format!("on test\nreturn {expr}\nend test\n"));
    let statements = match &tree.node(tree.roots()[0]).kind {
        NodeKind::FunctionDefinition(def) => def.statements.clone(),
        other => panic!("root is {other:?}"),
    };
    let value = match &tree.node(statements[0]).kind {
        NodeKind::Command { symbol, args } if symbol == "return" => args[0],
        other => panic!("expected return, got {other:?}"),
    };
    (tree, value)
}

fn call_parts(tree: &ParseTree, id: NodeId) -> (String, Vec<NodeId>) {
    match &tree.node(id).kind {
        NodeKind::FunctionCall { name, args, .. } => (name.clone(), args.clone()),
        other => panic!("expected a call, got {other:?}"),
    }
}

fn call_name(tree: &ParseTree, id: NodeId) -> String {
    call_parts(tree, id).0
}

fn local_name(tree: &ParseTree, id: NodeId) -> String {
    match &tree.node(id).kind {
        NodeKind::LocalVariableRef { name, .. } => name.clone(),
        other => panic!("expected a variable reference, got {other:?}"),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    // 1 + 2 * 3 → vcy_add(1, vcy_mul(2, 3))
    let (tree, expr) = parse_expr("1 + 2 * 3");
    let (name, args) = call_parts(&tree, expr);
    assert_eq!(name, "vcy_add");
    assert_eq!(tree.node(args[0]).kind, NodeKind::IntValue(1));
    assert_eq!(call_name(&tree, args[1]), "vcy_mul");
}

#[test]
fn higher_precedence_on_the_left_collapses_first() {
    // 1 * 2 + 3 → vcy_add(vcy_mul(1, 2), 3)
    let (tree, expr) = parse_expr("1 * 2 + 3");
    let (name, args) = call_parts(&tree, expr);
    assert_eq!(name, "vcy_add");
    assert_eq!(call_name(&tree, args[0]), "vcy_mul");
    assert_eq!(tree.node(args[1]).kind, NodeKind::IntValue(3));
}

#[test]
fn equal_precedence_groups_left_to_right() {
    // 10 - 4 - 3 → vcy_sub(vcy_sub(10, 4), 3)
    let (tree, expr) = parse_expr("10 - 4 - 3");
    let (name, args) = call_parts(&tree, expr);
    assert_eq!(name, "vcy_sub");
    let (inner, inner_args) = call_parts(&tree, args[0]);
    assert_eq!(inner, "vcy_sub");
    assert_eq!(tree.node(inner_args[0]).kind, NodeKind::IntValue(10));
    assert_eq!(tree.node(args[1]).kind, NodeKind::IntValue(3));
}

#[test]
fn rising_then_flat_precedence_does_not_overfold() {
    // a + b * c * d → vcy_add(a, vcy_mul(vcy_mul(b, c), d))
    let (tree, expr) = parse_expr("a + b * c * d");
    let (name, args) = call_parts(&tree, expr);
    assert_eq!(name, "vcy_add");
    assert_eq!(local_name(&tree, args[0]), "var_a");
    let (outer_mul, mul_args) = call_parts(&tree, args[1]);
    assert_eq!(outer_mul, "vcy_mul");
    assert_eq!(call_name(&tree, mul_args[0]), "vcy_mul");
    assert_eq!(local_name(&tree, mul_args[1]), "var_d");
}

#[test]
fn logic_binds_loosest_and_comparison_looser_than_concat() {
    // a & b = c and d → vcy_op_and(vcy_cmp(vcy_cat(a, b), c), d)
    let (tree, expr) = parse_expr("a & b = c and d");
    let (name, args) = call_parts(&tree, expr);
    assert_eq!(name, "vcy_op_and");
    let (cmp, cmp_args) = call_parts(&tree, args[0]);
    assert_eq!(cmp, "vcy_cmp");
    assert_eq!(call_name(&tree, cmp_args[0]), "vcy_cat");
}

#[test]
fn exponent_binds_tightest() {
    // 2 * 3 ^ 4 → vcy_mul(2, vcy_pow(3, 4))
    let (tree, expr) = parse_expr("2 * 3 ^ 4");
    let (name, args) = call_parts(&tree, expr);
    assert_eq!(name, "vcy_mul");
    assert_eq!(call_name(&tree, args[1]), "vcy_pow");
}

#[test]
fn two_token_operators_fuse_with_lookahead() {
    let cases = [
        ("1 <= 2", "vcy_cmp_le"),
        ("1 >= 2", "vcy_cmp_ge"),
        ("1 <> 2", "vcy_cmp_ne"),
        ("a is not b", "vcy_cmp_ne"),
        ("a is b", "vcy_cmp"),
        ("a && b", "vcy_cat_space"),
    ];
    for (source, expected) in cases {
        let (tree, expr) = parse_expr(source);
        assert_eq!(call_name(&tree, expr), expected, "for {source}");
    }
}

#[test]
fn failed_two_token_match_restores_the_cursor() {
    let cases = [
        ("1 < 2", "vcy_cmp_lt"),
        ("1 > 2", "vcy_cmp_gt"),
        ("a & b", "vcy_cat"),
        ("1 = 2", "vcy_cmp"),
    ];
    for (source, expected) in cases {
        let (tree, expr) = parse_expr(source);
        let (name, args) = call_parts(&tree, expr);
        assert_eq!(name, expected, "for {source}");
        assert_eq!(args.len(), 2, "for {source}");
    }
}

#[test]
fn unary_operators_bind_tighter_than_binary() {
    // -2 + 3 → vcy_add(vcy_neg(2), 3)
    let (tree, expr) = parse_expr("-2 + 3");
    let (name, args) = call_parts(&tree, expr);
    assert_eq!(name, "vcy_add");
    let (neg, neg_args) = call_parts(&tree, args[0]);
    assert_eq!(neg, "vcy_neg");
    assert_eq!(tree.node(neg_args[0]).kind, NodeKind::IntValue(2));

    let (tree, expr) = parse_expr("not true");
    let (name, args) = call_parts(&tree, expr);
    assert_eq!(name, "vcy_not");
    assert_eq!(tree.node(args[0]).kind, NodeKind::BoolValue(true));
}

#[test]
fn brackets_group_subexpressions() {
    // (1 + 2) * 3 → vcy_mul(vcy_add(1, 2), 3)
    let (tree, expr) = parse_expr("(1 + 2) * 3");
    let (name, args) = call_parts(&tree, expr);
    assert_eq!(name, "vcy_mul");
    assert_eq!(call_name(&tree, args[0]), "vcy_add");
}

#[test]
fn integer_period_integer_makes_a_float() {
    let (tree, expr) = parse_expr("3.25");
    assert_eq!(tree.node(expr).kind, NodeKind::FloatValue(3.25));
}

#[test]
fn keyword_literals_come_from_the_constant_table() {
    let (tree, expr) = parse_expr("empty");
    assert_eq!(tree.node(expr).kind, NodeKind::StringValue(String::new()));
    let (tree, expr) = parse_expr("tab");
    assert_eq!(tree.node(expr).kind, NodeKind::StringValue("\t".to_string()));
    let (tree, expr) = parse_expr("cr");
    assert_eq!(tree.node(expr).kind, NodeKind::StringValue("\r".to_string()));
    let (tree, expr) = parse_expr("false");
    assert_eq!(tree.node(expr).kind, NodeKind::BoolValue(false));
    let (tree, expr) = parse_expr("pi");
    assert_eq!(
        tree.node(expr).kind,
        NodeKind::FloatValue(std::f64::consts::PI)
    );
}

#[test]
fn plain_identifiers_are_self_naming_variables() {
    let (tree, expr) = parse_expr("greeting");
    assert_eq!(local_name(&tree, expr), "var_greeting");
    // Unassigned variables evaluate to their own name.
    match &tree.node(tree.roots()[0]).kind {
        NodeKind::FunctionDefinition(def) => {
            assert!(def.locals["var_greeting"].init_with_name);
        }
        other => panic!("root is {other:?}"),
    }
}

#[test]
fn identifier_with_brackets_is_a_function_call() {
    let (tree, expr) = parse_expr("area(2, 3)");
    match &tree.node(expr).kind {
        NodeKind::FunctionCall {
            name,
            is_command,
            args,
        } => {
            assert_eq!(name, "area");
            assert!(!is_command);
            assert_eq!(args.len(), 2);
        }
        other => panic!("expected a call, got {other:?}"),
    }
}

#[test]
fn param_count_forms() {
    for source in ["the paramCount", "paramCount()"] {
        let (tree, expr) = parse_expr(source);
        let (name, args) = call_parts(&tree, expr);
        assert_eq!(name, "vcy_list_count", "for {source}");
        assert_eq!(local_name(&tree, args[0]), "paramList");
    }
}

#[test]
fn param_access_forms() {
    for source in ["param(2)", "parameter 2"] {
        let (tree, expr) = parse_expr(source);
        let (name, args) = call_parts(&tree, expr);
        assert_eq!(name, "vcy_list_get", "for {source}");
        assert_eq!(local_name(&tree, args[0]), "paramList");
        assert_eq!(tree.node(args[1]).kind, NodeKind::IntValue(2));
    }
}

#[test]
fn entry_of_container_reads_a_list_key() {
    let (tree, expr) = parse_expr("entry 2 of prefs");
    match &tree.node(expr).kind {
        NodeKind::FunctionCall {
            name,
            is_command,
            args,
        } => {
            assert_eq!(name, "GetItemOfListWithKey");
            assert!(*is_command);
            assert_eq!(local_name(&tree, args[0]), "var_prefs");
            assert_eq!(tree.node(args[1]).kind, NodeKind::IntValue(2));
        }
        other => panic!("expected a call, got {other:?}"),
    }
}

#[test]
fn handler_ids_capture_prefixed_names() {
    let cases = [
        ("id of function handler tick", "fun_tick"),
        ("id of message handler tick", "hdl_tick"),
        ("id of handler tick", "hdl_tick"),
    ];
    for (source, expected) in cases {
        let (tree, expr) = parse_expr(source);
        let (name, args) = call_parts(&tree, expr);
        assert_eq!(name, "vcy_fcn_addr", "for {source}");
        assert_eq!(
            tree.node(args[0]).kind,
            NodeKind::StringValue(expected.to_string()),
            "for {source}"
        );
    }
}

#[test]
fn number_of_chunks_counts_with_the_chunk_tag() {
    for source in ["number of words of text", "the number of words of text"] {
        let (tree, expr) = parse_expr(source);
        let (name, args) = call_parts(&tree, expr);
        assert_eq!(name, "vcy_chunk_count", "for {source}");
        assert_eq!(
            tree.node(args[0]).kind,
            NodeKind::IntValue(ChunkType::Word.tag())
        );
        assert_eq!(local_name(&tree, args[1]), "var_text");
    }
}

#[test]
fn length_qualifier_wraps_the_call() {
    // the long version → fun_version(vcy_list_assign_items(temp0, 1, "long"))
    let (tree, expr) = parse_expr("the long version");
    let (name, args) = call_parts(&tree, expr);
    assert_eq!(name, "fun_version");
    match &tree.node(args[0]).kind {
        NodeKind::FunctionCall {
            name,
            is_command,
            args,
        } => {
            assert_eq!(name, "vcy_list_assign_items");
            assert!(*is_command);
            assert_eq!(local_name(&tree, args[0]), "temp0");
            assert_eq!(tree.node(args[1]).kind, NodeKind::IntValue(1));
            assert_eq!(
                tree.node(args[2]).kind,
                NodeKind::StringValue("long".to_string())
            );
        }
        other => panic!("expected list assignment, got {other:?}"),
    }
}

#[test]
fn the_result_is_a_container_reference() {
    let (tree, expr) = parse_expr("the result");
    assert_eq!(local_name(&tree, expr), "theResult");
}

#[test]
fn item_delimiter_reads_the_shared_global() {
    let (tree, expr) = parse_expr("itemDelimiter");
    assert_eq!(local_name(&tree, expr), "gItemDel");
    assert!(tree.globals().contains_key("gItemDel"));
}

#[test]
fn chunk_source_nests_mutable_over_constant() {
    // put char 2 to 4 of word 1 of name into out
    let tree = parse("on test\nput char 2 to 4 of word 1 of name into out\nend test\n");
    let statements = match &tree.node(tree.roots()[0]).kind {
        NodeKind::FunctionDefinition(def) => def.statements.clone(),
        other => panic!("root is {other:?}"),
    };
    let (source, dest) = match &tree.node(statements[0]).kind {
        NodeKind::Command { symbol, args } if symbol == "Put" => (args[0], args[1]),
        other => panic!("expected Put, got {other:?}"),
    };
    assert_eq!(local_name(&tree, dest), "var_out");

    match &tree.node(source).kind {
        NodeKind::ChunkRef {
            chunk,
            start,
            end,
            target,
            mutable,
        } => {
            assert_eq!(*chunk, ChunkType::Character);
            assert!(*mutable);
            assert_eq!(tree.node(*start).kind, NodeKind::IntValue(2));
            assert_eq!(tree.node(*end).kind, NodeKind::IntValue(4));
            match &tree.node(*target).kind {
                NodeKind::ChunkRef {
                    chunk,
                    start,
                    end,
                    target,
                    mutable,
                } => {
                    assert_eq!(*chunk, ChunkType::Word);
                    assert!(!mutable);
                    assert_eq!(start, end);
                    assert_eq!(tree.node(*start).kind, NodeKind::IntValue(1));
                    assert_eq!(local_name(&tree, *target), "var_name");
                }
                other => panic!("inner target is {other:?}"),
            }
        }
        other => panic!("expected a chunk, got {other:?}"),
    }
}

#[test]
fn chunk_without_range_aliases_start_and_end() {
    let (tree, expr) = parse_expr("item 3 of row");
    match &tree.node(expr).kind {
        NodeKind::ChunkRef { start, end, .. } => assert_eq!(start, end),
        other => panic!("expected a chunk, got {other:?}"),
    }
}

#[test]
fn chunk_range_spellings_are_synonyms() {
    for spelling in ["to", "through", "thru"] {
        let (tree, expr) = parse_expr(&format!("char 1 {spelling} 3 of x"));
        match &tree.node(expr).kind {
            NodeKind::ChunkRef { start, end, .. } => {
                assert_ne!(start, end, "for {spelling}");
                assert_eq!(tree.node(*end).kind, NodeKind::IntValue(3));
            }
            other => panic!("expected a chunk, got {other:?}"),
        }
    }
}

#[test]
fn chunk_destination_is_mutable() {
    let tree = parse("on test\nput \"x\" into char 2 of buffer\nend test\n");
    let statements = match &tree.node(tree.roots()[0]).kind {
        NodeKind::FunctionDefinition(def) => def.statements.clone(),
        other => panic!("root is {other:?}"),
    };
    let dest = match &tree.node(statements[0]).kind {
        NodeKind::Command { symbol, args } if symbol == "Put" => args[1],
        other => panic!("expected Put, got {other:?}"),
    };
    match &tree.node(dest).kind {
        NodeKind::ChunkRef { mutable, target, .. } => {
            assert!(*mutable);
            assert_eq!(local_name(&tree, *target), "var_buffer");
        }
        other => panic!("expected a chunk, got {other:?}"),
    }
}
