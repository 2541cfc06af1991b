//! Structural properties of the parse tree: arena totality, observer
//! consistency, temporary-name uniqueness, chunk aliasing, and the
//! `:run` wrapper.

use patter_ast::{Node, NodeId, NodeKind, ParseTree, ParseTreeObserver};
use patter_lexer::tokenize;
use patter_parser::Parser;
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

const SCRIPT: &str = "\
on greet who
  put \"hi \" & who into it
  repeat with i from 1 to 3
    add i to total
  end repeat
  repeat 2 times
    put i after log
  end repeat
end greet

function area w,h
  if w > 0 then
    return w * h
  end if
  return 0
end area
";

#[derive(Default)]
struct RecordingObserver {
    ids: Rc<RefCell<Vec<(NodeId, usize)>>>,
}

impl ParseTreeObserver for RecordingObserver {
    fn node_added(&mut self, id: NodeId, _node: &Node, count: usize) {
        self.ids.borrow_mut().push((id, count));
    }
}

fn parse_with_observer(source: &str) -> (ParseTree, Rc<RefCell<Vec<(NodeId, usize)>>>) {
    let ids = Rc::new(RefCell::new(Vec::new()));
    let mut tree = ParseTree::with_observer(Box::new(RecordingObserver {
        ids: Rc::clone(&ids),
    }));
    let tokens = tokenize(source).expect("lex failed");
    let mut parser = Parser::new();
    parser
        .parse("test.pt", &tokens, &mut tree)
        .expect("parse failed");
    (tree, ids)
}

#[test]
fn every_created_node_lives_in_the_arena() {
    let (tree, ids) = parse_with_observer(SCRIPT);
    for (id, _) in ids.borrow().iter() {
        assert!(tree.contains(*id));
    }
}

#[test]
fn observer_count_matches_the_arena() {
    let (tree, ids) = parse_with_observer(SCRIPT);
    let ids = ids.borrow();
    assert_eq!(ids.len(), tree.len());
    // Counts are strictly increasing, one per node.
    for (index, (_, count)) in ids.iter().enumerate() {
        assert_eq!(*count, index + 1);
    }
}

#[test]
fn generated_temp_names_are_distinct() {
    let (tree, _) = parse_with_observer(SCRIPT);
    let mut temps = Vec::new();
    for root in tree.roots() {
        if let NodeKind::FunctionDefinition(def) = &tree.node(*root).kind {
            temps.extend(def.locals.keys().filter(|k| k.starts_with("temp")).cloned());
        }
    }
    assert!(temps.len() >= 2);
    let unique: HashSet<&String> = temps.iter().collect();
    assert_eq!(unique.len(), temps.len());
}

#[test]
fn temp_counter_is_per_arena() {
    let (first, _) = parse_with_observer("on t\nrepeat 2 times\nput 1\nend repeat\nend t\n");
    let (second, _) = parse_with_observer("on t\nrepeat 2 times\nput 1\nend repeat\nend t\n");
    // A fresh arena starts its temporaries over at temp0.
    for tree in [&first, &second] {
        match &tree.node(tree.roots()[0]).kind {
            NodeKind::FunctionDefinition(def) => {
                assert!(def.locals.contains_key("temp0"));
            }
            other => panic!("root is {other:?}"),
        }
    }
}

#[test]
fn absent_range_clause_aliases_the_chunk_bounds() {
    let (tree, _) = parse_with_observer("on t\nput word 2 of text into x\nend t\n");
    let mut found = false;
    for id in tree.ids() {
        if let NodeKind::ChunkRef { start, end, .. } = &tree.node(id).kind {
            assert_eq!(start, end);
            found = true;
        }
    }
    assert!(found);
}

#[test]
fn command_or_expression_wraps_lines_in_a_run_handler() {
    let tokens = tokenize("put 1 into x\nbeep 2\n").expect("lex failed");
    let mut parser = Parser::new();
    let mut tree = ParseTree::new();
    parser
        .parse_command_or_expression("repl.pt", &tokens, &mut tree)
        .expect("parse failed");

    assert_eq!(tree.roots().len(), 1);
    match &tree.node(tree.roots()[0]).kind {
        NodeKind::FunctionDefinition(def) => {
            assert_eq!(def.name, ":run");
            assert!(def.is_command);
            assert_eq!(def.statements.len(), 2);
        }
        other => panic!("root is {other:?}"),
    }
    let first = parser.first_handler().expect("no first handler");
    assert_eq!(first.name, ":run");
    assert!(!first.is_function);
}

#[test]
fn simplify_all_folds_constant_subtrees() {
    let (mut tree, _) = parse_with_observer("on t\nreturn 2 + 3 * 4\nend t\n");
    tree.simplify_all();
    let statements = match &tree.node(tree.roots()[0]).kind {
        NodeKind::FunctionDefinition(def) => def.statements.clone(),
        other => panic!("root is {other:?}"),
    };
    match &tree.node(statements[0]).kind {
        NodeKind::Command { symbol, args } if symbol == "return" => {
            assert_eq!(tree.node(args[0]).kind, NodeKind::IntValue(14));
        }
        other => panic!("expected return, got {other:?}"),
    }
}

#[test]
fn debug_print_renders_whole_handlers() {
    let (tree, _) = parse_with_observer("on t\nput \"x\" into y\nend t\n");
    let printed = tree.debug_print();
    assert!(printed.starts_with("Handler \"t\" (command)\n{\n"));
    assert!(printed.contains("  Command \"Put\"\n  {\n    string( \"x\" )\n"));
    assert!(printed.contains("localvar( var_y, \"y\" )"));
    assert!(printed.trim_end().ends_with('}'));
}
