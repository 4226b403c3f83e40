//! Recursive-descent parser.
//!
//! Precedence, loosest first: `Or`/`||`, `And`/`&&`, equality, comparison,
//! additive, multiplicative, unary (`-`, `!`, `Not`), then calls and
//! indexing.

use crate::ast::{BinaryOp, Expr, ImportName, Program, Stmt, Target, UnaryOp};
use crate::error::ParseError;
use crate::lexer;
use crate::token::{Keyword, Position, Spanned, Token};

/// Maximum nesting of blocks and sub-expressions.
pub const MAX_NESTING: usize = 256;

type Result<T> = std::result::Result<T, ParseError>;

/// Parse a complete program.
pub fn parse(source: &str) -> Result<Program> {
    let tokens = lexer::tokenize(source)?;
    Parser::new(tokens).program()
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn program(mut self) -> Result<Program> {
        let statements = self.statements(false)?;
        Ok(Program { statements })
    }

    // Token cursor. `tokens` always ends with Eof and the cursor never
    // moves past it.

    fn current(&self) -> &Spanned {
        &self.tokens[self.pos]
    }

    fn peek(&self) -> &Token {
        &self.current().token
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn position(&self) -> Position {
        self.current().pos
    }

    fn advance(&mut self) -> Token {
        let token = self.current().token.clone();
        if token != Token::Eof {
            self.pos += 1;
        }
        token
    }

    fn check_keyword(&self, keyword: Keyword) -> bool {
        self.peek().is_keyword(keyword)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: Keyword) -> bool {
        if self.check_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<()> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<String> {
        match self.peek() {
            Token::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        match self.peek() {
            Token::Eof => ParseError::UnexpectedEof {
                expected: expected.to_string(),
            },
            found => ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: found.describe(),
                pos: self.position(),
            },
        }
    }

    fn skip_newlines(&mut self) {
        while self.eat(&Token::Newline) {}
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), Token::Newline | Token::Semicolon) {
            self.advance();
        }
    }

    /// Whether the next token after any newlines is `keyword`.
    fn next_significant_is(&self, keyword: Keyword) -> bool {
        self.tokens[self.pos..]
            .iter()
            .find(|s| s.token != Token::Newline)
            .is_some_and(|s| s.token.is_keyword(keyword))
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek(),
            Token::Newline | Token::Semicolon | Token::RBrace | Token::Eof
        )
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ParseError::TooDeep {
                limit: MAX_NESTING,
                pos: self.position(),
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // Statements

    fn statements(&mut self, in_block: bool) -> Result<Vec<Stmt>> {
        let mut statements = Vec::new();
        loop {
            self.skip_separators();
            match self.peek() {
                Token::Eof if in_block => return Err(self.unexpected("'}'")),
                Token::Eof => break,
                Token::RBrace if in_block => break,
                _ => {}
            }

            statements.push(self.statement()?);

            match self.peek() {
                Token::Newline | Token::Semicolon | Token::Eof => {}
                Token::RBrace if in_block => break,
                _ => return Err(self.unexpected("end of statement")),
            }
        }
        Ok(statements)
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        self.enter()?;
        self.expect(Token::LBrace, "'{'")?;
        let body = self.statements(true)?;
        self.expect(Token::RBrace, "'}'")?;
        self.leave();
        Ok(body)
    }

    fn statement(&mut self) -> Result<Stmt> {
        let keyword = match self.peek() {
            Token::Keyword(k) => Some(*k),
            _ => None,
        };

        match keyword {
            Some(Keyword::Set) => {
                self.advance();
                let name = self.expect_ident("variable name after Set")?;
                self.eat(&Token::Assign);
                let value = self.expression()?;
                Ok(Stmt::Assign {
                    target: Target::Name(name),
                    value,
                })
            }
            Some(Keyword::Func) if matches!(self.peek_at(1), Some(Token::Ident(_))) => {
                self.advance();
                let name = self.expect_ident("function name")?;
                let params = self.params()?;
                let body = self.block()?;
                Ok(Stmt::FuncDef {
                    name,
                    params,
                    body: body.into(),
                })
            }
            Some(Keyword::While) => {
                self.advance();
                let condition = self.expression()?;
                let body = self.block()?;
                Ok(Stmt::While { condition, body })
            }
            Some(Keyword::For) => self.for_loop(),
            Some(Keyword::Return) => {
                self.advance();
                if self.at_statement_end() {
                    Ok(Stmt::Return(None))
                } else {
                    Ok(Stmt::Return(Some(self.expression()?)))
                }
            }
            Some(Keyword::Break) => {
                self.advance();
                Ok(Stmt::Break)
            }
            Some(Keyword::Continue) => {
                self.advance();
                Ok(Stmt::Continue)
            }
            Some(Keyword::Throw) => {
                self.advance();
                Ok(Stmt::Throw(self.expression()?))
            }
            Some(Keyword::Import) => self.import(),
            Some(Keyword::Export) => {
                self.advance();
                Ok(Stmt::Export(self.expect_ident("name after Export")?))
            }
            _ => self.expression_statement(),
        }
    }

    fn for_loop(&mut self) -> Result<Stmt> {
        self.advance();
        let first = self.expect_ident("loop variable")?;
        let (index, item) = if self.eat(&Token::Comma) {
            (Some(first), self.expect_ident("loop variable")?)
        } else {
            (None, first)
        };
        if !self.eat_keyword(Keyword::In) {
            return Err(self.unexpected("'In'"));
        }
        let iterable = self.expression()?;
        let body = self.block()?;
        Ok(Stmt::For {
            index,
            item,
            iterable,
            body,
        })
    }

    /// `Import a, b As c From "path"`
    fn import(&mut self) -> Result<Stmt> {
        self.advance();
        let mut names = Vec::new();
        loop {
            let name = self.expect_ident("name to import")?;
            let alias = if self.eat_keyword(Keyword::As) {
                Some(self.expect_ident("alias after As")?)
            } else {
                None
            };
            names.push(ImportName { name, alias });
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        if !self.eat_keyword(Keyword::From) {
            return Err(self.unexpected("'From'"));
        }
        let path = match self.peek() {
            Token::Str(path) => path.clone(),
            _ => return Err(self.unexpected("module path string")),
        };
        self.advance();
        Ok(Stmt::Import { names, path })
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let pos = self.position();
        let expr = self.expression()?;
        if self.eat(&Token::Assign) {
            let target = assignment_target(expr).ok_or(ParseError::InvalidAssignment { pos })?;
            let value = self.expression()?;
            return Ok(Stmt::Assign { target, value });
        }
        Ok(Stmt::Expr(expr))
    }

    fn params(&mut self) -> Result<Vec<String>> {
        self.expect(Token::LParen, "'('")?;
        let mut params = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat(&Token::RParen) {
                break;
            }
            params.push(self.expect_ident("parameter name")?);
            self.skip_newlines();
            if !self.eat(&Token::Comma) {
                self.expect(Token::RParen, "')'")?;
                break;
            }
        }
        Ok(params)
    }

    // Expressions

    fn expression(&mut self) -> Result<Expr> {
        self.enter()?;
        let expr = self.or_expr()?;
        self.leave();
        Ok(expr)
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut left = self.and_expr()?;
        let mark = self.depth;
        while self.eat_keyword(Keyword::Or) || self.eat(&Token::OrOr) {
            self.enter()?;
            let right = self.and_expr()?;
            left = binary(left, BinaryOp::Or, right);
        }
        self.depth = mark;
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut left = self.equality()?;
        let mark = self.depth;
        while self.eat_keyword(Keyword::And) || self.eat(&Token::AndAnd) {
            self.enter()?;
            let right = self.equality()?;
            left = binary(left, BinaryOp::And, right);
        }
        self.depth = mark;
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut left = self.comparison()?;
        let mark = self.depth;
        loop {
            let op = match self.peek() {
                Token::EqEq => BinaryOp::Eq,
                Token::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            self.enter()?;
            let right = self.comparison()?;
            left = binary(left, op, right);
        }
        self.depth = mark;
        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut left = self.additive()?;
        let mark = self.depth;
        loop {
            let op = match self.peek() {
                Token::Lt => BinaryOp::Lt,
                Token::Le => BinaryOp::Le,
                Token::Gt => BinaryOp::Gt,
                Token::Ge => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            self.enter()?;
            let right = self.additive()?;
            left = binary(left, op, right);
        }
        self.depth = mark;
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut left = self.multiplicative()?;
        let mark = self.depth;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            self.enter()?;
            let right = self.multiplicative()?;
            left = binary(left, op, right);
        }
        self.depth = mark;
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.unary()?;
        let mark = self.depth;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            self.enter()?;
            let right = self.unary()?;
            left = binary(left, op, right);
        }
        self.depth = mark;
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Bang | Token::Keyword(Keyword::Not) => UnaryOp::Not,
            _ => return self.postfix(),
        };
        self.advance();
        self.enter()?;
        let operand = self.unary()?;
        self.leave();
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;
        let mark = self.depth;
        loop {
            if matches!(self.peek(), Token::LParen | Token::LBracket) {
                self.enter()?;
            }
            if self.eat(&Token::LParen) {
                let args = self.call_args()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else if self.eat(&Token::LBracket) {
                self.skip_newlines();
                let index = self.expression()?;
                self.skip_newlines();
                self.expect(Token::RBracket, "']'")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }
        self.depth = mark;
        Ok(expr)
    }

    /// Arguments after an opening `(`.
    fn call_args(&mut self) -> Result<Vec<Expr>> {
        let mut args = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat(&Token::RParen) {
                break;
            }
            args.push(self.expression()?);
            self.skip_newlines();
            if !self.eat(&Token::Comma) {
                self.expect(Token::RParen, "')'")?;
                break;
            }
        }
        Ok(args)
    }

    fn primary(&mut self) -> Result<Expr> {
        let expr = match self.peek() {
            Token::Number(n) => Expr::Number(*n),
            Token::Str(s) => Expr::Str(s.clone()),
            Token::Ident(name) => Expr::Ident(name.clone()),
            Token::Keyword(Keyword::True) => Expr::Bool(true),
            Token::Keyword(Keyword::False) => Expr::Bool(false),
            Token::Keyword(Keyword::Null) => Expr::Null,
            Token::Keyword(Keyword::Func) => {
                self.advance();
                let params = self.params()?;
                let body = self.block()?;
                return Ok(Expr::Lambda {
                    params,
                    body: body.into(),
                });
            }
            Token::Keyword(Keyword::If) => return self.if_expr(),
            Token::LParen => {
                self.advance();
                self.skip_newlines();
                let inner = self.expression()?;
                self.skip_newlines();
                self.expect(Token::RParen, "')'")?;
                return Ok(inner);
            }
            Token::LBracket => return self.array(),
            Token::LBrace => return self.dict(),
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(expr)
    }

    fn if_expr(&mut self) -> Result<Expr> {
        self.advance();
        let condition = self.expression()?;
        let body = self.block()?;
        let mut branches = vec![(condition, body)];
        let mut otherwise = None;

        loop {
            if self.next_significant_is(Keyword::Elif) {
                self.skip_newlines();
                self.advance();
                let condition = self.expression()?;
                let body = self.block()?;
                branches.push((condition, body));
            } else if self.next_significant_is(Keyword::Else) {
                self.skip_newlines();
                self.advance();
                otherwise = Some(if self.check_keyword(Keyword::If) {
                    self.enter()?;
                    let nested = self.if_expr()?;
                    self.leave();
                    vec![Stmt::Expr(nested)]
                } else {
                    self.block()?
                });
                break;
            } else {
                break;
            }
        }

        Ok(Expr::If {
            branches,
            otherwise,
        })
    }

    fn array(&mut self) -> Result<Expr> {
        self.advance();
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat(&Token::RBracket) {
                break;
            }
            items.push(self.expression()?);
            self.skip_newlines();
            if !self.eat(&Token::Comma) {
                self.expect(Token::RBracket, "']'")?;
                break;
            }
        }
        Ok(Expr::Array(items))
    }

    fn dict(&mut self) -> Result<Expr> {
        self.advance();
        let mut entries = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat(&Token::RBrace) {
                break;
            }
            let key = match self.peek() {
                Token::Ident(k) | Token::Str(k) => k.clone(),
                _ => return Err(self.unexpected("dictionary key")),
            };
            self.advance();
            self.skip_newlines();
            self.expect(Token::Colon, "':'")?;
            self.skip_newlines();
            entries.push((key, self.expression()?));
            self.skip_newlines();
            if !self.eat(&Token::Comma) {
                self.expect(Token::RBrace, "'}'")?;
                break;
            }
        }
        Ok(Expr::Dict(entries))
    }
}

fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

/// Convert a parsed expression into something assignable. Only names and
/// index chains rooted at a name qualify.
fn assignment_target(expr: Expr) -> Option<Target> {
    let mut path = Vec::new();
    let mut current = expr;
    loop {
        match current {
            Expr::Ident(name) if path.is_empty() => return Some(Target::Name(name)),
            Expr::Ident(name) => {
                path.reverse();
                return Some(Target::Index { name, path });
            }
            Expr::Index { object, index } => {
                path.push(*index);
                current = *object;
            }
            _ => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(source: &str) -> Stmt {
        let mut program = parse(source).unwrap();
        assert_eq!(program.statements.len(), 1, "{source}");
        program.statements.remove(0)
    }

    fn num(n: f64) -> Box<Expr> {
        Box::new(Expr::Number(n))
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            single("1 + 2 * 3"),
            Stmt::Expr(Expr::Binary {
                left: num(1.0),
                op: BinaryOp::Add,
                right: Box::new(Expr::Binary {
                    left: num(2.0),
                    op: BinaryOp::Mul,
                    right: num(3.0),
                }),
            })
        );
    }

    #[test]
    fn test_statement_separators() {
        let program = parse("x = 1; y = 2\n\nx + y").unwrap();
        assert_eq!(program.statements.len(), 3);
    }

    #[test]
    fn test_empty_program() {
        assert!(parse("").unwrap().statements.is_empty());
        assert!(parse("\n // nothing\n").unwrap().statements.is_empty());
    }

    #[test]
    fn test_set_and_plain_assignment_agree() {
        assert_eq!(single("Set x 5"), single("x = 5"));
        assert_eq!(single("Set x = 5"), single("x = 5"));
    }

    #[test]
    fn test_index_assignment_target() {
        match single("grid[1][2] = 0") {
            Stmt::Assign {
                target: Target::Index { name, path },
                ..
            } => {
                assert_eq!(name, "grid");
                assert_eq!(path, vec![Expr::Number(1.0), Expr::Number(2.0)]);
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(matches!(
            parse("1 + 2 = 3"),
            Err(ParseError::InvalidAssignment { .. })
        ));
    }

    #[test]
    fn test_if_elif_else_across_lines() {
        let source = "If x > 1 {\n  1\n}\nElif x > 0 {\n  2\n}\nElse {\n  3\n}";
        match single(source) {
            Stmt::Expr(Expr::If {
                branches,
                otherwise,
            }) => {
                assert_eq!(branches.len(), 2);
                assert!(otherwise.is_some());
            }
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn test_func_definition_and_lambda() {
        assert!(matches!(
            single("Func add(a, b) { a + b }"),
            Stmt::FuncDef { ref name, ref params, .. } if name == "add" && params.len() == 2
        ));
        assert!(matches!(
            single("f = Func(x) { x * 2 }"),
            Stmt::Assign {
                value: Expr::Lambda { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_import_and_export() {
        assert_eq!(
            single(r#"Import area, PI As pi From "geometry""#),
            Stmt::Import {
                names: vec![
                    ImportName {
                        name: "area".into(),
                        alias: None,
                    },
                    ImportName {
                        name: "PI".into(),
                        alias: Some("pi".into()),
                    },
                ],
                path: "geometry".into(),
            }
        );
        assert_eq!(single("Export area"), Stmt::Export("area".into()));

        assert!(parse(r#"Import From "x""#).is_err());
        assert!(parse("Import a From b").is_err());
        assert!(matches!(
            parse("Import a"),
            Err(ParseError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_for_with_index() {
        assert!(matches!(
            single("For i, x In [1, 2] { x }"),
            Stmt::For { index: Some(_), .. }
        ));
    }

    #[test]
    fn test_multiline_literals() {
        let program = parse("d = {\n  a: 1,\n  \"b c\": [1,\n 2,\n],\n}").unwrap();
        assert_eq!(program.statements.len(), 1);
    }

    #[test]
    fn test_unbalanced_delimiters() {
        assert!(matches!(
            parse("(1 + 2"),
            Err(ParseError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            parse("1 + 2)"),
            Err(ParseError::UnexpectedToken { .. })
        ));
        assert!(matches!(
            parse("While True { 1"),
            Err(ParseError::UnexpectedEof { .. })
        ));
        assert!(parse("}").is_err());
    }

    #[test]
    fn test_missing_operand() {
        assert!(matches!(
            parse("1 +"),
            Err(ParseError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(MAX_NESTING + 10), ")".repeat(MAX_NESTING + 10));
        assert!(matches!(parse(&deep), Err(ParseError::TooDeep { .. })));

        let shallow = format!("{}1{}", "(".repeat(50), ")".repeat(50));
        assert!(parse(&shallow).is_ok());
    }

    #[test]
    fn test_long_operator_chain_counts_toward_nesting() {
        let long = format!("1{}", " + 1".repeat(10_000));
        assert!(matches!(parse(&long), Err(ParseError::TooDeep { .. })));

        let mixed = format!("x{}", " * 2 - 1".repeat(MAX_NESTING));
        assert!(matches!(parse(&mixed), Err(ParseError::TooDeep { .. })));

        let ok = format!("1{}", " + 1".repeat(100));
        assert!(parse(&ok).is_ok());
    }

    #[test]
    fn test_long_postfix_chain_counts_toward_nesting() {
        let index = format!("a{}", "[0]".repeat(10_000));
        assert!(matches!(parse(&index), Err(ParseError::TooDeep { .. })));

        let calls = format!("f{}", "()".repeat(10_000));
        assert!(matches!(parse(&calls), Err(ParseError::TooDeep { .. })));

        let unary = format!("{}1", "-".repeat(10_000));
        assert!(matches!(parse(&unary), Err(ParseError::TooDeep { .. })));

        assert!(parse(&format!("a{}", "[0]".repeat(100))).is_ok());
    }

    #[test]
    fn test_chain_budget_is_released_between_statements() {
        let line = format!("1{}\n", " + 1".repeat(200));
        assert!(parse(&line.repeat(20)).is_ok());
    }
}
