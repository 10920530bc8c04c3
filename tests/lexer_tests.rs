use minipy::lexer::{tokenize, TokenKind};
use pretty_assertions::assert_eq;

fn kinds(src: &str) -> Vec<TokenKind> {
    tokenize(src)
        .expect("lexer should succeed")
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn tokenizes_basic_assignment() {
    assert_eq!(
        kinds("x = 1 + 2 * 3\n"),
        vec![
            TokenKind::Ident("x".to_string()),
            TokenKind::Assign,
            TokenKind::Int(1),
            TokenKind::Plus,
            TokenKind::Int(2),
            TokenKind::Star,
            TokenKind::Int(3),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn emits_indent_and_dedent_tokens() {
    assert_eq!(
        kinds("if x:\n    y = 1\nz = 2\n"),
        vec![
            TokenKind::If,
            TokenKind::Ident("x".to_string()),
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Ident("y".to_string()),
            TokenKind::Assign,
            TokenKind::Int(1),
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Ident("z".to_string()),
            TokenKind::Assign,
            TokenKind::Int(2),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn closes_open_indents_at_end_of_input() {
    // No trailing newline after the indented statement.
    assert_eq!(
        kinds("while x:\n    y = 1"),
        vec![
            TokenKind::While,
            TokenKind::Ident("x".to_string()),
            TokenKind::Colon,
            TokenKind::Newline,
            TokenKind::Indent,
            TokenKind::Ident("y".to_string()),
            TokenKind::Assign,
            TokenKind::Int(1),
            TokenKind::Newline,
            TokenKind::Dedent,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn skips_blank_lines_and_comments() {
    assert_eq!(
        kinds("# header\n\nx = 1  # trailing\n\n# footer\n"),
        vec![
            TokenKind::Ident("x".to_string()),
            TokenKind::Assign,
            TokenKind::Int(1),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn recognizes_keywords_and_literals() {
    assert_eq!(
        kinds("def return if elif else while for in and or not True False None\n"),
        vec![
            TokenKind::Def,
            TokenKind::Return,
            TokenKind::If,
            TokenKind::Elif,
            TokenKind::Else,
            TokenKind::While,
            TokenKind::For,
            TokenKind::In,
            TokenKind::And,
            TokenKind::Or,
            TokenKind::Not,
            TokenKind::True,
            TokenKind::False,
            TokenKind::NoneKw,
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn reads_string_literals_with_both_quote_styles_and_escapes() {
    assert_eq!(
        kinds("a = \"x\\ny\"\nb = 'it\\'s'\n"),
        vec![
            TokenKind::Ident("a".to_string()),
            TokenKind::Assign,
            TokenKind::Str("x\ny".to_string()),
            TokenKind::Newline,
            TokenKind::Ident("b".to_string()),
            TokenKind::Assign,
            TokenKind::Str("it's".to_string()),
            TokenKind::Newline,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn tracks_line_and_column_positions() {
    let tokens = tokenize("x = 1\ny = 2\n").expect("lexer should succeed");

    assert_eq!(tokens[0].pos.line, 1);
    assert_eq!(tokens[0].pos.column, 1);

    // `y` opens the second line.
    let y = tokens
        .iter()
        .find(|t| t.kind == TokenKind::Ident("y".to_string()))
        .expect("should find token for y");
    assert_eq!(y.pos.line, 2);
    assert_eq!(y.pos.column, 1);
}

#[test]
fn reports_unterminated_string() {
    let err = tokenize("x = \"uh oh\n").expect_err("lexer should fail");
    assert!(err.message.contains("unterminated string"));
    assert_eq!(err.pos.line, 1);
}

#[test]
fn reports_inconsistent_dedent() {
    let src = "if x:\n        y = 1\n    z = 2\n";
    let err = tokenize(src).expect_err("lexer should fail");
    assert!(err.message.contains("unindent"));
    assert_eq!(err.pos.line, 3);
}

#[test]
fn reports_unexpected_character() {
    let err = tokenize("x = 1 ?\n").expect_err("lexer should fail");
    assert!(err.message.contains("unexpected character '?'"));
}

#[test]
fn reports_oversized_integer_literal() {
    let err = tokenize("x = 99999999999999999999\n").expect_err("lexer should fail");
    assert!(err.message.contains("too large"));
}

#[test]
fn lone_bang_is_rejected() {
    let err = tokenize("x = !y\n").expect_err("lexer should fail");
    assert!(err.message.contains("'!'"));
}

#[test]
fn empty_input_yields_only_eof() {
    assert_eq!(kinds(""), vec![TokenKind::Eof]);
    assert_eq!(kinds("\n\n# only comments\n"), vec![TokenKind::Eof]);
}
