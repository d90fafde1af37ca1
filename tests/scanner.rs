#[cfg(test)]
mod scanner_tests {
    use rlox::error::LoxError;
    use rlox::scanner::*;
    use rlox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len(), "tokens: {:?}", tokens);

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn kinds(source: &str) -> Vec<&'static str> {
        Scanner::new(source)
            .filter_map(Result::ok)
            .map(|t| t.token_type.name())
            .collect()
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*%?:;})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::PERCENT, "%"),
                (TokenType::QUESTION, "?"),
                (TokenType::COLON, ":"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn two_character_operators_are_greedy() {
        assert_token_sequence(
            "!= == <= >= -> ! = < > - /",
            &[
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::ARROW, "->"),
                (TokenType::BANG, "!"),
                (TokenType::EQUAL, "="),
                (TokenType::LESS, "<"),
                (TokenType::GREATER, ">"),
                (TokenType::MINUS, "-"),
                (TokenType::SLASH, "/"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_token_sequence(
            "break continue class this _tmp x1 classy",
            &[
                (TokenType::BREAK, "break"),
                (TokenType::CONTINUE, "continue"),
                (TokenType::CLASS, "class"),
                (TokenType::THIS, "this"),
                (TokenType::IDENTIFIER, "_tmp"),
                (TokenType::IDENTIFIER, "x1"),
                (TokenType::IDENTIFIER, "classy"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn numbers_are_integer_digit_runs() {
        let tokens: Vec<Token> = Scanner::new("42 3.5").filter_map(Result::ok).collect();

        assert_eq!(tokens[0].token_type, TokenType::NUMBER(0.0));
        assert!(matches!(tokens[0].token_type, TokenType::NUMBER(n) if n == 42.0));
        assert_eq!(tokens[0].lexeme, "42");

        // No fractional part: `3.5` is NUMBER DOT NUMBER.
        assert_eq!(kinds("3.5"), vec!["NUMBER", "DOT", "NUMBER", "EOF"]);
        assert_eq!(tokens.len(), 5);
    }

    #[test]
    fn string_literal_carries_unquoted_text() {
        let tokens: Vec<Token> = Scanner::new("\"hi there\"")
            .filter_map(Result::ok)
            .collect();

        assert_eq!(tokens[0].lexeme, "\"hi there\"");
        assert!(matches!(&tokens[0].token_type, TokenType::STRING(s) if s == "hi there"));
    }

    #[test]
    fn unterminated_string_is_dropped_and_scanning_continues() {
        let results: Vec<_> = Scanner::new("\"open\nprint").collect();

        assert_eq!(results.len(), 3);
        assert!(matches!(&results[0], Err(LoxError::Lex { line: 1, .. })));

        let print = results[1].as_ref().expect("print token");
        assert_eq!(print.token_type, TokenType::PRINT);
        assert_eq!(print.line, 2);
    }

    #[test]
    fn comments_are_skipped_and_count_lines() {
        let tokens: Vec<Token> = Scanner::new("a // note\n/* one\ntwo */ b")
            .filter_map(Result::ok)
            .collect();

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].lexeme, "b");
        assert_eq!(tokens[1].line, 3);
        assert_eq!(tokens[2].token_type, TokenType::EOF);
    }

    #[test]
    fn unterminated_block_comment_reports_error() {
        let results: Vec<_> = Scanner::new("x /* never closed\n").collect();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(matches!(&results[1], Err(LoxError::Lex { message, .. }) if message.contains("block comment")));
        assert!(matches!(&results[2], Ok(t) if t.token_type == TokenType::EOF));
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source);

        // Collect all results (both tokens and errors)
        let results: Vec<_> = scanner.collect();

        // Expected: COMMA, DOT, error for '$', LEFT_PAREN, error for '#', EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                err.message().contains("Unexpected character"),
                "Error message should contain 'Unexpected character', got: {}",
                err
            );
        }

        fn assert_token_matches(
            result: &Result<Token, LoxError>,
            expected_type: TokenType,
            expected_lexeme: &str,
        ) {
            match result {
                Ok(token) => {
                    assert_eq!(token.token_type, expected_type);
                    assert_eq!(token.lexeme, expected_lexeme);
                }
                Err(e) => panic!("Expected token but got error: {}", e),
            }
        }
    }

    #[test]
    fn non_ascii_character_is_one_error() {
        let results: Vec<_> = Scanner::new("€+").collect();

        assert_eq!(results.len(), 3);
        assert!(results[0].is_err());
        assert_token_type(&results[1], TokenType::PLUS);

        fn assert_token_type(result: &Result<Token, LoxError>, expected: TokenType) {
            assert_eq!(result.as_ref().map(|t| t.token_type.clone()).ok(), Some(expected));
        }
    }

    #[test]
    fn unicode_letters_form_identifiers() {
        assert_token_sequence(
            "var café = ñ1_x; Δ",
            &[
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "café"),
                (TokenType::EQUAL, "="),
                (TokenType::IDENTIFIER, "ñ1_x"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::IDENTIFIER, "Δ"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn form_feed_and_vertical_tab_are_whitespace() {
        let results: Vec<_> = Scanner::new("a\x0cb\x0bc\u{a0}d\ne").collect();

        assert!(results.iter().all(Result::is_ok), "results: {:?}", results);
        assert_eq!(
            kinds("a\x0cb\x0bc\u{a0}d\ne"),
            vec!["IDENTIFIER", "IDENTIFIER", "IDENTIFIER", "IDENTIFIER", "IDENTIFIER", "EOF"]
        );

        let last = results[4].as_ref().expect("identifier after the newline");
        assert_eq!(last.lexeme, "e");
        assert_eq!(last.line, 2);
    }

    #[test]
    fn relexing_lexemes_reproduces_kinds() {
        let source = "class A { init(x) { this.x = x % 2; } }\n\
                      var f = fun (a, b) -> a >= b ? \"yes\" : nil;\n\
                      for (var i = 0; i != 10; i = i + 1) { if (!f(i, 3) or i <= 1) continue; }";

        let first: Vec<Token> = Scanner::new(source).filter_map(Result::ok).collect();
        let joined: String = first
            .iter()
            .map(|t| t.lexeme.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let second: Vec<Token> = Scanner::new(&joined).filter_map(Result::ok).collect();

        let kinds_of = |tokens: &[Token]| tokens.iter().map(|t| t.token_type.name()).collect::<Vec<_>>();
        assert_eq!(kinds_of(&first[..]), kinds_of(&second[..]));
    }

    #[test]
    fn display_prints_kind_lexeme_and_literal() {
        let tokens: Vec<Token> = Scanner::new("12 \"s\" x").filter_map(Result::ok).collect();

        assert_eq!(tokens[0].to_string(), "NUMBER 12 12.0");
        assert_eq!(tokens[1].to_string(), "STRING \"s\" s");
        assert_eq!(tokens[2].to_string(), "IDENTIFIER x null");
        assert_eq!(tokens[3].to_string(), "EOF  null");
    }
}
