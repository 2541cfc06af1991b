//! Error fidelity: every error carries the file name, the 1-based line
//! of the offending token, and a description recognizable from the
//! input.

use patter_ast::ParseTree;
use patter_lexer::tokenize;
use patter_parser::{ParseError, ParseErrorKind, Parser};

fn parse_err(source: &str) -> ParseError {
    let tokens = tokenize(source).expect("lex failed");
    let mut parser = Parser::new();
    let mut tree = ParseTree::new();
    parser.parse("script.pt", &tokens, &mut tree).unwrap_err()
}

#[test]
fn malformed_expression_names_the_offending_token() {
    let err = parse_err("on t\nput & into x\nend t\n");
    assert_eq!(err.kind, ParseErrorKind::MalformedExpression);
    assert_eq!(err.file, "script.pt");
    assert_eq!(err.line, 2);
    assert!(err.message.contains("Expected a term here"));
    assert!(err.message.contains("identifier \"&\""));
    assert_eq!(err.found.as_deref(), Some("identifier \"&\""));
}

#[test]
fn expected_keyword_reports_position() {
    let err = parse_err("on t\nput 1 into x\nadd 5 of total\nend t\n");
    assert_eq!(err.kind, ParseErrorKind::ExpectedKeyword);
    assert_eq!(err.line, 3);
    assert!(err.message.contains("Expected \"to\" here"));
    assert!(err.message.contains("identifier \"of\""));
}

#[test]
fn lexical_relay_on_wrong_token_kind() {
    let err = parse_err("on t\nput 5 into 7\nend t\n");
    assert_eq!(err.kind, ParseErrorKind::LexicalRelay);
    assert!(err.message.contains("Expected a container here"));
    assert!(err.message.contains("number 7"));
}

#[test]
fn unterminated_handler_at_end_of_script() {
    let err = parse_err("on t\nput 1 into x\n");
    assert_eq!(err.kind, ParseErrorKind::UnterminatedConstruct);
    assert!(err.message.contains("Unexpected end of script"));
    assert_eq!(err.line, 2);
}

#[test]
fn unterminated_repeat_names_the_construct() {
    let err = parse_err("on t\nrepeat 3 times\nput 1 into x\nend t\n");
    assert_eq!(err.kind, ParseErrorKind::UnterminatedConstruct);
    assert!(err.message.contains("Expected \"end repeat\""));
}

#[test]
fn unknown_property_reports_the_spelling() {
    let err = parse_err("on t\nset lockScreen to true\nend t\n");
    assert_eq!(err.kind, ParseErrorKind::UnknownProperty);
    assert!(err.message.contains("Unknown global property \"lockScreen\""));
}

#[test]
fn unsupported_object_property() {
    let err = parse_err("on t\nset width of field to 5\nend t\n");
    assert_eq!(err.kind, ParseErrorKind::UnsupportedConstruct);
    assert!(err.message.contains("Object properties"));
}

#[test]
fn display_form_is_file_line_error_message() {
    let err = parse_err("on t\nput & into x\nend t\n");
    let rendered = err.to_string();
    assert!(rendered.starts_with("script.pt:2: error: "));
}

#[test]
fn first_line_errors_report_line_one() {
    let tokens = tokenize("on t 5\nend t\n").unwrap();
    let mut parser = Parser::new();
    let mut tree = ParseTree::new();
    let err = parser.parse("script.pt", &tokens, &mut tree).unwrap_err();
    assert_eq!(err.line, 1);
    assert!(err.message.contains("number 5"));
}
