use super::*;

fn types(source: &str) -> Vec<TokenType> {
    tokenize(source).expect("source should lex").iter().map(Token::token_type).collect()
}

mod tokens {
    use super::*;

    #[test]
    pub fn test_numbers() {
        let tokens = tokenize("12 3.25 4.").unwrap();

        assert_eq!(tokens[0].token_type(), TokenType::Int);
        assert_eq!(tokens[0].source(), "12");
        assert_eq!(tokens[1].token_type(), TokenType::Float);
        assert_eq!(tokens[1].source(), "3.25");
        // a dot without digits after it is member access, not a float
        assert_eq!(tokens[2].token_type(), TokenType::Int);
        assert_eq!(tokens[3].token_type(), TokenType::Dot);
        assert_eq!(tokens[4].token_type(), TokenType::Eof);
    }

    #[test]
    pub fn test_keywords_and_identifiers() {
        assert_eq!(types("set settle fun el eli else _x1"), vec![
            TokenType::Keyword(Keyword::Set),
            TokenType::Identifier,
            TokenType::Keyword(Keyword::Fun),
            TokenType::Keyword(Keyword::El),
            TokenType::Keyword(Keyword::Eli),
            TokenType::Identifier,
            TokenType::Identifier,
            TokenType::Eof,
        ]);
    }

    #[test]
    pub fn test_operators_longest_match() {
        assert_eq!(types("= == < <= > >= != -> - ^ : ."), vec![
            TokenType::Eq, TokenType::EqEq,
            TokenType::Lt, TokenType::Lte,
            TokenType::Gt, TokenType::Gte,
            TokenType::NotEq, TokenType::Arrow, TokenType::Minus,
            TokenType::Pow, TokenType::Colon, TokenType::Dot,
            TokenType::Eof,
        ]);
    }

    #[test]
    pub fn test_strings_and_escapes() {
        let tokens = tokenize(r"'it\'s' 'a\nb' ''").unwrap();

        assert_eq!(tokens[0].token_type(), TokenType::String);
        assert_eq!(tokens[0].source(), "it's");
        assert_eq!(tokens[1].source(), "a\nb");
        assert_eq!(tokens[2].source(), "");
    }

    #[test]
    pub fn test_comments_are_discarded() {
        assert_eq!(types("1 # one\n# whole line\n2"), vec![TokenType::Int, TokenType::Int, TokenType::Eof]);
    }

    #[test]
    pub fn test_positions() {
        let tokens = tokenize("set x =\n  'é' + 1").unwrap();

        assert_eq!(*tokens[0].start(), TokenPos::new(1, 1));
        assert_eq!(*tokens[1].start(), TokenPos::new(1, 5));
        assert_eq!(*tokens[3].start(), TokenPos::new(2, 3));
        // columns count characters, not bytes
        assert_eq!(*tokens[4].start(), TokenPos::new(2, 7));
        assert_eq!(*tokens[5].end(), TokenPos::new(2, 10));
    }
}

mod errors {
    use super::*;

    #[test]
    pub fn test_unterminated_string() {
        assert_eq!(tokenize("set s = 'abc"), Err(LexerError::UnterminatedString { pos: TokenPos::new(1, 9) }));
    }

    #[test]
    pub fn test_unexpected_character() {
        let error = tokenize("1 + @").unwrap_err();

        assert_eq!(error, LexerError::UnexpectedCharacter(TokenPos::new(1, 5), '@'));
        assert_eq!(error.get_pos(), TokenPos::new(1, 5));
        assert_eq!(error.to_string(), "Unexpected character '@'");
    }

    #[test]
    pub fn test_lone_exclamation_mark() {
        assert!(matches!(tokenize("!x"), Err(LexerError::UnexpectedCharacter(_, '!'))));
    }

    #[test]
    pub fn test_unknown_escape() {
        assert!(matches!(tokenize(r"'\q'"), Err(LexerError::UnknownEscape { escape: 'q', .. })));
    }

    #[test]
    pub fn test_integer_out_of_range() {
        assert!(matches!(tokenize("99999999999999999999"), Err(LexerError::InvalidNumber { .. })));
    }
}
