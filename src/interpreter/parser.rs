use std::rc::Rc;
use lazy_static::lazy_static;
use crate::interpreter::ast::{Argument, BinaryOperator, Branch, Expr, FieldDecl, Literal, TypeTag, UnaryOperator};
use crate::interpreter::error::ParseError;
use crate::interpreter::lexer::{Keyword, Token, TokenPos, TokenType};
use crate::util;

lazy_static! {
    static ref EXPRESSION_START_TYPES: [TokenType; 18] = [
        TokenType::Int, TokenType::Float, TokenType::String,
        TokenType::Identifier,
        TokenType::LParen,
        TokenType::Plus, TokenType::Minus,
        TokenType::Keyword(Keyword::Set), TokenType::Keyword(Keyword::Not),
        TokenType::Keyword(Keyword::If), TokenType::Keyword(Keyword::For), TokenType::Keyword(Keyword::While),
        TokenType::Keyword(Keyword::Fun), TokenType::Keyword(Keyword::Struct), TokenType::Keyword(Keyword::Return),
        TokenType::Keyword(Keyword::True), TokenType::Keyword(Keyword::False), TokenType::Keyword(Keyword::Null),
    ];

    static ref COMPARISON_TYPES: [(TokenType, BinaryOperator); 6] = [
        (TokenType::EqEq, BinaryOperator::Equal),
        (TokenType::NotEq, BinaryOperator::NotEqual),
        (TokenType::Lt, BinaryOperator::Less),
        (TokenType::Gt, BinaryOperator::Greater),
        (TokenType::Lte, BinaryOperator::LessEqual),
        (TokenType::Gte, BinaryOperator::GreaterEqual),
    ];
}

type ParseResult<T> = Result<T, ParseError>;

/// Parses a complete token sequence into a program [`Expr::Block`].
pub fn parse(tokens: Vec<Token>) -> ParseResult<Expr> {
    Parser::new(tokens).parse()
}

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Parser {
        if tokens.last().map(|token| token.token_type() != TokenType::Eof).unwrap_or(true) {
            let pos = tokens.last().map(|token| *token.end()).unwrap_or_else(TokenPos::begin);
            tokens.push(Token::new(TokenType::Eof, String::new(), pos, pos));
        }

        Parser { tokens, current: 0 }
    }

    pub fn parse(&mut self) -> ParseResult<Expr> {
        let pos = *self.current().start();
        let mut exprs = Vec::new();

        while !self.is_eof() {
            exprs.push(self.parse_expression()?);
        }

        tracing::debug!(expressions = exprs.len(), "parsed program");
        Ok(Expr::Block { exprs, pos })
    }

    // Expression parsing

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        util::ensure_sufficient_stack(|| {
            if self.matches(TokenType::Keyword(Keyword::Set)) {
                return self.parse_assignment();
            }

            self.parse_logical()
        })
    }

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        let pos = *self.previous().start();
        let name = self.expect(TokenType::Identifier, "variable name after 'set'")?;

        let mut path = Vec::new();

        while self.matches(TokenType::Dot) {
            path.push(self.expect(TokenType::Identifier, "field name after '.'")?);
        }

        self.expect(TokenType::Eq, "'=' after assignment target")?;
        let value = Box::new(self.parse_expression()?);

        let field = match path.pop() {
            Some(field) => field,
            None => return Ok(Expr::Assignment { name: name.source().to_owned(), value, pos }),
        };

        let mut target = Expr::Identifier { name: name.source().to_owned(), pos: *name.start() };

        for member in path {
            target = Expr::MemberAccess { target: Box::new(target), field: member.source().to_owned(), pos: *member.start() };
        }

        Ok(Expr::MemberSet { target: Box::new(target), field: field.source().to_owned(), value, pos })
    }

    fn parse_logical(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_comparison()?;

        loop {
            let op = if self.matches(TokenType::Keyword(Keyword::And)) {
                BinaryOperator::And
            } else if self.matches(TokenType::Keyword(Keyword::Or)) {
                BinaryOperator::Or
            } else {
                break;
            };

            let pos = *self.previous().start();
            let right = self.parse_comparison()?;

            expr = Expr::BinaryOp { op, left: Box::new(expr), right: Box::new(right), pos };
        }

        Ok(expr)
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        if self.matches(TokenType::Keyword(Keyword::Not)) {
            let pos = *self.previous().start();
            let operand = self.parse_comparison()?;

            return Ok(Expr::Not { operand: Box::new(operand), pos });
        }

        let expr = self.parse_arithmetic()?;

        // Comparisons do not chain: at most one operator per level
        for (token_type, op) in COMPARISON_TYPES.iter() {
            if self.matches(*token_type) {
                let pos = *self.previous().start();
                let right = self.parse_arithmetic()?;

                return Ok(Expr::BinaryOp { op: *op, left: Box::new(expr), right: Box::new(right), pos });
            }
        }

        Ok(expr)
    }

    fn parse_arithmetic(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_term()?;

        loop {
            let op = if self.matches(TokenType::Plus) {
                BinaryOperator::Add
            } else if self.matches(TokenType::Minus) {
                BinaryOperator::Subtract
            } else {
                break;
            };

            let pos = *self.previous().start();
            let right = self.parse_term()?;

            expr = Expr::BinaryOp { op, left: Box::new(expr), right: Box::new(right), pos };
        }

        Ok(expr)
    }

    fn parse_term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_factor()?;

        loop {
            let op = if self.matches(TokenType::Mul) {
                BinaryOperator::Multiply
            } else if self.matches(TokenType::Div) {
                BinaryOperator::Divide
            } else {
                break;
            };

            let pos = *self.previous().start();
            let right = self.parse_factor()?;

            expr = Expr::BinaryOp { op, left: Box::new(expr), right: Box::new(right), pos };
        }

        Ok(expr)
    }

    fn parse_factor(&mut self) -> ParseResult<Expr> {
        let op = if self.matches(TokenType::Plus) {
            UnaryOperator::Plus
        } else if self.matches(TokenType::Minus) {
            UnaryOperator::Minus
        } else {
            return self.parse_power();
        };

        let pos = *self.previous().start();
        let operand = util::ensure_sufficient_stack(|| self.parse_factor())?;

        Ok(Expr::UnaryOp { op, operand: Box::new(operand), pos })
    }

    fn parse_power(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_call()?;

        if self.matches(TokenType::Pow) {
            let pos = *self.previous().start();
            // Re-entering through `factor` makes `^` right-associative and lets the exponent carry a sign
            let exponent = util::ensure_sufficient_stack(|| self.parse_factor())?;

            return Ok(Expr::BinaryOp { op: BinaryOperator::Power, left: Box::new(expr), right: Box::new(exponent), pos });
        }

        Ok(expr)
    }

    fn parse_call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_atom()?;
        expr = self.parse_members(expr)?;

        if self.matches(TokenType::LParen) {
            expr = self.finish_call(expr)?;
            expr = self.parse_members(expr)?;
        }

        Ok(expr)
    }

    fn parse_members(&mut self, mut expr: Expr) -> ParseResult<Expr> {
        while self.matches(TokenType::Dot) {
            let field = self.expect(TokenType::Identifier, "field name after '.'")?;
            expr = Expr::MemberAccess { target: Box::new(expr), field: field.source().to_owned(), pos: *field.start() };
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let pos = callee.pos();
        let mut args = vec![];

        if !self.check(TokenType::RParen) {
            args.push(self.parse_argument()?);

            while self.matches(TokenType::Comma) {
                args.push(self.parse_argument()?);
            }
        }

        self.expect(TokenType::RParen, "')' after call arguments")?;
        Ok(Expr::Call { callee: Box::new(callee), args, pos })
    }

    fn parse_argument(&mut self) -> ParseResult<Argument> {
        if self.check(TokenType::Identifier) && self.check_next(TokenType::Colon) {
            let name = self.current().source().to_owned();
            self.consume();
            self.consume();

            return Ok(Argument { name: Some(name), value: self.parse_expression()? });
        }

        Ok(Argument { name: None, value: self.parse_expression()? })
    }

    fn parse_atom(&mut self) -> ParseResult<Expr> {
        let token = self.current().clone();
        let pos = *token.start();

        let literal = match token.token_type() {
            TokenType::Int => match token.source().parse::<i64>() {
                Ok(value) => Some(Literal::Int(value)),
                Err(_) => return Err(self.error_at_current("integer literal in range")),
            },
            TokenType::Float => match token.source().parse::<f64>() {
                Ok(value) => Some(Literal::Float(value)),
                Err(_) => return Err(self.error_at_current("float literal")),
            },
            TokenType::String => Some(Literal::Str(token.source().to_owned())),
            TokenType::Keyword(Keyword::True) => Some(Literal::Bool(true)),
            TokenType::Keyword(Keyword::False) => Some(Literal::Bool(false)),
            TokenType::Keyword(Keyword::Null) => Some(Literal::Null),
            _ => None,
        };

        if let Some(value) = literal {
            self.consume();
            return Ok(Expr::Literal { value, pos });
        }

        if self.matches(TokenType::Identifier) {
            return Ok(Expr::Identifier { name: token.source().to_owned(), pos });
        } else if self.matches(TokenType::LParen) {
            return self.parse_block(pos);
        } else if self.matches(TokenType::Keyword(Keyword::If)) {
            return self.parse_if(pos);
        } else if self.matches(TokenType::Keyword(Keyword::For)) {
            return self.parse_for(pos);
        } else if self.matches(TokenType::Keyword(Keyword::While)) {
            return self.parse_while(pos);
        } else if self.matches(TokenType::Keyword(Keyword::Fun)) {
            return self.parse_fun(pos);
        } else if self.matches(TokenType::Keyword(Keyword::Struct)) {
            return self.parse_struct(pos);
        } else if self.matches(TokenType::Keyword(Keyword::Return)) {
            return self.parse_return(pos);
        }

        Err(self.error_at_current("expression"))
    }

    fn parse_block(&mut self, pos: TokenPos) -> ParseResult<Expr> {
        let mut exprs = Vec::new();

        while !self.check(TokenType::RParen) && !self.is_eof() {
            exprs.push(self.parse_expression()?);
        }

        self.expect(TokenType::RParen, "')' after expression")?;

        if exprs.len() == 1 {
            return Ok(exprs.remove(0));
        }

        Ok(Expr::Block { exprs, pos })
    }

    fn parse_if(&mut self, pos: TokenPos) -> ParseResult<Expr> {
        let condition = self.parse_expression()?;
        self.expect(TokenType::Keyword(Keyword::Then), "'then' after 'if' condition")?;
        let body = self.parse_expression()?;

        let mut branches = vec![Branch { condition: Some(condition), body }];

        loop {
            if self.matches(TokenType::Keyword(Keyword::Eli)) {
                let condition = if self.check(TokenType::Keyword(Keyword::Then)) {
                    None
                } else {
                    Some(self.parse_expression()?).filter(|condition| !is_empty_block(condition))
                };

                self.expect(TokenType::Keyword(Keyword::Then), "'then' after 'eli' condition")?;
                let body = self.parse_expression()?;
                let terminal = condition.is_none();

                branches.push(Branch { condition, body });

                // An `eli` without a condition is the default branch, nothing may follow it
                if terminal {
                    break;
                }
            } else if self.matches(TokenType::Keyword(Keyword::El)) {
                let body = self.parse_expression()?;
                branches.push(Branch { condition: None, body });
                break;
            } else {
                break;
            }
        }

        Ok(Expr::If { branches, pos })
    }

    fn parse_for(&mut self, pos: TokenPos) -> ParseResult<Expr> {
        let var = self.expect(TokenType::Identifier, "loop variable after 'for'")?;
        self.expect(TokenType::Eq, "'=' after loop variable")?;
        let from = self.parse_expression()?;

        self.expect(TokenType::Keyword(Keyword::To), "'to' after loop start")?;
        let to = self.parse_expression()?;

        let step = if self.matches(TokenType::Keyword(Keyword::Step)) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        self.expect(TokenType::Keyword(Keyword::Then), "'then' after loop bounds")?;
        let body = self.parse_expression()?;

        Ok(Expr::For {
            var: var.source().to_owned(),
            from: Box::new(from), to: Box::new(to), step,
            body: Box::new(body),
            pos,
        })
    }

    fn parse_while(&mut self, pos: TokenPos) -> ParseResult<Expr> {
        let condition = self.parse_expression()?;
        self.expect(TokenType::Keyword(Keyword::Then), "'then' after 'while' condition")?;
        let body = self.parse_expression()?;

        Ok(Expr::While { condition: Box::new(condition), body: Box::new(body), pos })
    }

    fn parse_fun(&mut self, pos: TokenPos) -> ParseResult<Expr> {
        let name = if self.matches(TokenType::Identifier) {
            Some(self.previous().source().to_owned())
        } else {
            None
        };

        self.expect(TokenType::LParen, "'(' before function parameters")?;
        let mut params: Vec<String> = vec![];

        if !self.check(TokenType::RParen) {
            loop {
                let param = self.expect(TokenType::Identifier, "parameter name")?;

                if params.iter().any(|existing| existing == param.source()) {
                    return Err(self.error_at(&param, "unique parameter name"));
                }

                params.push(param.source().to_owned());

                if !self.matches(TokenType::Comma) {
                    break;
                }
            }
        }

        self.expect(TokenType::RParen, "')' after function parameters")?;
        self.expect(TokenType::Arrow, "'->' before function body")?;
        let body = self.parse_expression()?;

        Ok(Expr::FunDef { name, params, body: Rc::new(body), pos })
    }

    fn parse_struct(&mut self, pos: TokenPos) -> ParseResult<Expr> {
        let name = if self.matches(TokenType::Identifier) {
            Some(self.previous().source().to_owned())
        } else {
            None
        };

        self.expect(TokenType::LParen, "'(' before struct fields")?;
        let mut fields: Vec<FieldDecl> = vec![];

        if !self.check(TokenType::RParen) {
            loop {
                let field = self.expect(TokenType::Identifier, "field name")?;

                if fields.iter().any(|existing| existing.name == field.source()) {
                    return Err(self.error_at(&field, "unique field name"));
                }

                let type_tag = if self.matches(TokenType::Colon) {
                    self.parse_type_tag()?
                } else {
                    TypeTag::Any
                };

                fields.push(FieldDecl { name: field.source().to_owned(), type_tag });

                if !self.matches(TokenType::Comma) {
                    break;
                }
            }
        }

        self.expect(TokenType::RParen, "')' after struct fields")?;
        Ok(Expr::StructDef { name, fields, pos })
    }

    fn parse_type_tag(&mut self) -> ParseResult<TypeTag> {
        if self.matches(TokenType::Keyword(Keyword::Fun)) {
            return Ok(TypeTag::Fun);
        } else if self.matches(TokenType::Keyword(Keyword::Null)) {
            return Ok(TypeTag::Null);
        }

        let name = self.expect(TokenType::Identifier, "field type")?;

        Ok(match name.source() {
            "int" => TypeTag::Int,
            "float" => TypeTag::Float,
            "str" => TypeTag::Str,
            "bool" => TypeTag::Bool,
            "any" => TypeTag::Any,
            other => TypeTag::Struct(other.to_owned()),
        })
    }

    fn parse_return(&mut self, pos: TokenPos) -> ParseResult<Expr> {
        let value = if self.can_start_expression() {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        Ok(Expr::Return { value, pos })
    }

    // Token handling

    fn current(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn consume(&mut self) {
        if !self.is_eof() {
            self.current += 1;
        }
    }

    fn expect(&mut self, token_type: TokenType, expected: &str) -> ParseResult<Token> {
        if self.check(token_type) {
            self.consume();
            return Ok(self.previous().clone());
        }

        Err(self.error_at_current(expected))
    }

    fn matches(&mut self, token_type: TokenType) -> bool { // Should be called "match", but that's a keyword
        if !self.check(token_type) {
            return false;
        }

        self.consume();
        true
    }

    #[inline]
    fn check(&self, token_type: TokenType) -> bool {
        self.current().token_type() == token_type
    }

    fn check_next(&self, token_type: TokenType) -> bool {
        self.tokens.get(self.current + 1).map(|token| token.token_type() == token_type).unwrap_or(false)
    }

    fn can_start_expression(&self) -> bool {
        EXPRESSION_START_TYPES.contains(&self.current().token_type())
    }

    fn is_eof(&self) -> bool {
        self.current().token_type() == TokenType::Eof
    }

    // Error handling

    fn error_at_current(&self, expected: &str) -> ParseError {
        self.error_at(self.current(), expected)
    }

    fn error_at(&self, token: &Token, expected: &str) -> ParseError {
        ParseError::Syntax {
            expected: expected.to_owned(),
            found: token.to_string(),
            pos: *token.start(),
        }
    }
}

fn is_empty_block(expr: &Expr) -> bool {
    matches!(expr, Expr::Block { exprs, .. } if exprs.is_empty())
}
