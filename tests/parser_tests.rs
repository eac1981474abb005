// tests/parser_tests.rs

use opgw_expr::ast::{BinOp, Expr, Token, UnaryOp};
use opgw_expr::catalogue::ChannelCatalogue;
use opgw_expr::parser::{ParseErrorKind, Parser, SyntaxError, parse_text};

fn parse(input: &str) -> Expr {
    parse_text(input, &ChannelCatalogue::new()).unwrap()
}

fn parse_err(input: &str) -> ParseErrorKind {
    match parse_text(input, &ChannelCatalogue::new()) {
        Err(SyntaxError::Parse(e)) => e.kind,
        other => panic!("expected parse error for {:?}, got {:?}", input, other),
    }
}

fn chan(name: &str) -> Expr {
    Expr::channel(name)
}

// ============================================================================
// Precedence
// ============================================================================

#[test]
fn test_multiplication_binds_tighter() {
    assert_eq!(
        parse("a + b * 2"),
        Expr::binary(
            BinOp::Add,
            chan("a"),
            Expr::binary(BinOp::Multiply, chan("b"), Expr::number(2.0))
        )
    );
}

#[test]
fn test_subtraction_is_left_associative() {
    assert_eq!(
        parse("a - b - c"),
        Expr::binary(
            BinOp::Subtract,
            Expr::binary(BinOp::Subtract, chan("a"), chan("b")),
            chan("c")
        )
    );
}

#[test]
fn test_power_is_right_associative() {
    assert_eq!(
        parse("2 ^ 3 ^ 2"),
        Expr::binary(
            BinOp::Power,
            Expr::number(2.0),
            Expr::binary(BinOp::Power, Expr::number(3.0), Expr::number(2.0))
        )
    );
}

#[test]
fn test_unary_minus_below_power() {
    assert_eq!(
        parse("- a ^ 2"),
        Expr::unary(
            UnaryOp::Negate,
            Expr::binary(BinOp::Power, chan("a"), Expr::number(2.0))
        )
    );
}

#[test]
fn test_and_binds_tighter_than_or() {
    assert_eq!(
        parse("a > 1 or b > 2 and c > 3"),
        Expr::binary(
            BinOp::Or,
            Expr::binary(BinOp::GreaterThan, chan("a"), Expr::number(1.0)),
            Expr::binary(
                BinOp::And,
                Expr::binary(BinOp::GreaterThan, chan("b"), Expr::number(2.0)),
                Expr::binary(BinOp::GreaterThan, chan("c"), Expr::number(3.0))
            )
        )
    );
}

#[test]
fn test_not_applies_to_comparison() {
    assert_eq!(
        parse("not humidity > 53"),
        Expr::unary(
            UnaryOp::Not,
            Expr::binary(BinOp::GreaterThan, chan("humidity"), Expr::number(53.0))
        )
    );
}

#[test]
fn test_comparison_of_arithmetic() {
    assert_eq!(
        parse("a + 1 >= b * 2"),
        Expr::binary(
            BinOp::GreaterEqual,
            Expr::binary(BinOp::Add, chan("a"), Expr::number(1.0)),
            Expr::binary(BinOp::Multiply, chan("b"), Expr::number(2.0))
        )
    );
}

#[test]
fn test_groups_are_kept() {
    assert_eq!(
        parse("( a + 1 ) * 2"),
        Expr::binary(
            BinOp::Multiply,
            Expr::Group(Box::new(Expr::binary(BinOp::Add, chan("a"), Expr::number(1.0)))),
            Expr::number(2.0)
        )
    );
}

// ============================================================================
// Calls
// ============================================================================

#[test]
fn test_call_name_is_canonical() {
    assert_eq!(
        parse("Mean ( trace )"),
        Expr::Call {
            name: "mean".to_string(),
            args: vec![chan("trace")],
        }
    );
}

#[test]
fn test_variadic_call() {
    match parse("max ( a , b + 1 , 3 )") {
        Expr::Call { name, args } => {
            assert_eq!(name, "max");
            assert_eq!(args.len(), 3);
        }
        other => panic!("expected call, got {:?}", other),
    }
}

#[test]
fn test_nested_calls() {
    let expr = parse("max ( centre ( trace ) , fwhm ( trace ) )");
    assert_eq!(expr.references(), vec!["trace", "trace"]);
}

#[test]
fn test_arity_mismatch() {
    assert_eq!(
        parse_err("centre ( a , b )"),
        ParseErrorKind::Arity {
            function: "centre".to_string(),
            expected: opgw_expr::functions::Arity::Exact(1),
            found: 2,
        }
    );
}

#[test]
fn test_empty_call_rejected() {
    assert!(matches!(parse_err("mean ( )"), ParseErrorKind::Arity { found: 0, .. }));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_open_bracket_message() {
    let err = parse_text("( ", &ChannelCatalogue::new()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "expression '(' has unexpected end-of-input, check all brackets are closed"
    );
}

#[test]
fn test_empty_input() {
    assert_eq!(parse_err(""), ParseErrorKind::UnexpectedEnd);
}

#[test]
fn test_trailing_operator() {
    assert_eq!(parse_err("a >"), ParseErrorKind::UnexpectedEnd);
    assert_eq!(parse_err("a +"), ParseErrorKind::UnexpectedEnd);
}

#[test]
fn test_missing_operator() {
    assert_eq!(
        parse_err("a b"),
        ParseErrorKind::MissingOperator {
            previous: "a".to_string(),
            found: "b".to_string(),
        }
    );
}

#[test]
fn test_unmatched_close() {
    assert_eq!(parse_err("a > 1 )"), ParseErrorKind::UnmatchedClose);
    assert_eq!(parse_err(") a"), ParseErrorKind::UnmatchedClose);
    assert_eq!(parse_err("a > )"), ParseErrorKind::UnmatchedClose);
}

#[test]
fn test_close_inside_bracket_still_unexpected() {
    assert!(matches!(parse_err("( a > )"), ParseErrorKind::UnexpectedToken { .. }));
}

#[test]
fn test_overflowing_number_rejected() {
    assert_eq!(
        parse_err("a < 1e400"),
        ParseErrorKind::InvalidNumber("1e400".to_string())
    );
    parse("a < 1e300");
}

#[test]
fn test_chained_comparison() {
    assert!(matches!(parse_err("a > 1 > 2"), ParseErrorKind::ChainedComparison { .. }));
    // Separate conditions may each compare
    parse("a > 1 and b > 2");
}

#[test]
fn test_not_in_arithmetic_rejected() {
    assert!(matches!(parse_err("a + not b"), ParseErrorKind::UnexpectedToken { .. }));
}

#[test]
fn test_comma_outside_call_rejected() {
    assert!(matches!(parse_err("a , b"), ParseErrorKind::UnexpectedToken { .. }));
}

#[test]
fn test_parse_token_sequence() {
    let tokens = vec![
        Token::reference("temperature"),
        Token::operator(">").unwrap(),
        Token::number("21"),
    ];
    let expr = Parser::new(tokens).parse().unwrap();
    assert_eq!(
        expr,
        Expr::binary(BinOp::GreaterThan, chan("temperature"), Expr::number(21.0))
    );
}
