//! Recursive-descent parser for Tiny.
//!
//! Statements and items are parsed top-down; expressions use Pratt parsing
//! driven by [`BinaryOp::binding_power`].

use bumpalo::Bump;
use bumpalo::collections::Vec as BVec;
use tinybridge_core::{ParseError, ParseErrorKind};

use super::*;
use crate::error::SyntaxError;
use crate::lexer::{Lexer, Token, TokenKind};

/// Deepest allowed nesting of blocks, `else if` arms and expressions.
pub const MAX_NESTING: usize = 256;

pub struct Parser<'ast> {
    tokens: Vec<Token<'ast>>,
    pos: usize,
    depth: usize,
    arena: &'ast Bump,
}

impl<'ast> Parser<'ast> {
    /// Lex and parse a whole compile unit.
    pub fn parse(source: &str, arena: &'ast Bump) -> Result<Script<'ast>, SyntaxError> {
        #[cfg(feature = "profiling")]
        profiling::scope!("Parser::parse");

        let tokens = Lexer::new(source, arena).tokenize()?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
            arena,
        };
        Ok(parser.parse_script()?)
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn peek(&self) -> Token<'ast> {
        self.peek_nth(0)
    }

    fn peek_nth(&self, n: usize) -> Token<'ast> {
        let index = (self.pos + n).min(self.tokens.len() - 1);
        self.tokens[index]
    }

    fn advance(&mut self) -> Token<'ast> {
        let token = self.peek();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn eat(&mut self, kind: TokenKind) -> Option<Token<'ast>> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            None
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'ast>, ParseError> {
        if let Some(token) = self.eat(kind) {
            return Ok(token);
        }
        let found = self.peek();
        let error_kind = if found.kind == TokenKind::Eof {
            ParseErrorKind::UnexpectedEof
        } else {
            ParseErrorKind::ExpectedToken
        };
        Err(ParseError::new(
            error_kind,
            found.span,
            format!("expected {}, found {}", kind.describe(), found.kind.describe()),
        ))
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.enter()?;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::new(
                ParseErrorKind::NestingTooDeep,
                self.peek().span,
                format!("more than {MAX_NESTING} nested levels"),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    fn skip_semicolons(&mut self) {
        while self.eat(TokenKind::Semicolon).is_some() {}
    }

    fn ident(&mut self) -> Result<Ident<'ast>, ParseError> {
        let token = self.peek();
        if token.kind != TokenKind::Identifier {
            return Err(ParseError::new(
                ParseErrorKind::ExpectedIdentifier,
                token.span,
                format!("found {}", token.kind.describe()),
            ));
        }
        self.advance();
        Ok(Ident {
            name: token.lexeme,
            span: token.span,
        })
    }

    fn type_ref(&mut self) -> Result<TypeRef<'ast>, ParseError> {
        let token = self.peek();
        if token.kind != TokenKind::Identifier {
            return Err(ParseError::new(
                ParseErrorKind::ExpectedType,
                token.span,
                format!("found {}", token.kind.describe()),
            ));
        }
        self.advance();
        Ok(TypeRef {
            name: token.lexeme,
            span: token.span,
        })
    }

    fn optional_type(&mut self) -> Result<Option<TypeRef<'ast>>, ParseError> {
        if self.eat(TokenKind::Colon).is_some() {
            self.type_ref().map(Some)
        } else {
            Ok(None)
        }
    }

    // ========================================================================
    // Items
    // ========================================================================

    fn parse_script(&mut self) -> Result<Script<'ast>, ParseError> {
        let mut items = BVec::new_in(self.arena);
        loop {
            self.skip_semicolons();
            let token = self.peek();
            let item = match token.kind {
                TokenKind::Eof => break,
                TokenKind::Func => Item::Function(self.parse_function()?),
                TokenKind::Var => Item::Global(self.parse_global()?),
                _ => {
                    return Err(ParseError::new(
                        ParseErrorKind::ExpectedItem,
                        token.span,
                        format!("found {}", token.kind.describe()),
                    ));
                }
            };
            items.push(item);
        }
        Ok(Script {
            items: items.into_bump_slice(),
        })
    }

    fn parse_function(&mut self) -> Result<FunctionDecl<'ast>, ParseError> {
        self.expect(TokenKind::Func)?;
        let name = self.ident()?;
        self.expect(TokenKind::LeftParen)?;

        let mut params = BVec::new_in(self.arena);
        if !self.check(TokenKind::RightParen) {
            loop {
                let name = self.ident()?;
                let ty = self.optional_type()?;
                params.push(Param { name, ty });
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        self.expect(TokenKind::RightParen)?;

        let ret = self.optional_type()?;
        let body = self.parse_block()?;
        Ok(FunctionDecl {
            name,
            params: params.into_bump_slice(),
            ret,
            body,
        })
    }

    fn parse_global(&mut self) -> Result<GlobalDecl<'ast>, ParseError> {
        self.expect(TokenKind::Var)?;
        let name = self.ident()?;
        let ty = self.optional_type()?;
        let init = if self.eat(TokenKind::Equal).is_some() {
            Some(self.parse_expr(0)?)
        } else {
            None
        };
        Ok(GlobalDecl { name, ty, init })
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_block(&mut self) -> Result<Block<'ast>, ParseError> {
        self.nested(Self::block_body)
    }

    fn block_body(&mut self) -> Result<Block<'ast>, ParseError> {
        let open = self.peek();
        if open.kind != TokenKind::LeftBrace {
            return Err(ParseError::new(
                ParseErrorKind::ExpectedBlock,
                open.span,
                format!("expected '{{', found {}", open.kind.describe()),
            ));
        }
        self.advance();

        let mut stmts = BVec::new_in(self.arena);
        loop {
            self.skip_semicolons();
            if self.check(TokenKind::RightBrace) {
                break;
            }
            if self.check(TokenKind::Eof) {
                return Err(ParseError::new(
                    ParseErrorKind::UnexpectedEof,
                    self.peek().span,
                    "unclosed block",
                ));
            }
            stmts.push(self.parse_stmt()?);
        }
        let close = self.advance();

        Ok(Block {
            stmts: stmts.into_bump_slice(),
            span: open.span.merge(close.span),
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt<'ast>, ParseError> {
        let token = self.peek();
        let stmt = match token.kind {
            TokenKind::Var => {
                self.advance();
                let name = self.ident()?;
                let ty = self.optional_type()?;
                let init = if self.eat(TokenKind::Equal).is_some() {
                    Some(self.parse_expr(0)?)
                } else {
                    None
                };
                Stmt::Var { name, ty, init }
            }
            TokenKind::Return => {
                self.advance();
                let value = match self.peek().kind {
                    TokenKind::Semicolon | TokenKind::RightBrace | TokenKind::Eof => None,
                    _ => Some(self.parse_expr(0)?),
                };
                let span = value.map_or(token.span, |v| token.span.merge(v.span));
                Stmt::Return { value, span }
            }
            TokenKind::If => self.parse_if()?,
            TokenKind::While => {
                self.advance();
                let cond = self.parse_expr(0)?;
                let body = self.parse_block()?;
                Stmt::While { cond, body }
            }
            TokenKind::LeftBrace => Stmt::Block(self.parse_block()?),
            TokenKind::Identifier if self.peek_nth(1).kind == TokenKind::ColonEqual => {
                let name = self.ident()?;
                self.advance();
                let init = self.parse_expr(0)?;
                Stmt::Var {
                    name,
                    ty: None,
                    init: Some(init),
                }
            }
            TokenKind::Identifier if self.peek_nth(1).kind == TokenKind::Equal => {
                let target = self.ident()?;
                self.advance();
                let value = self.parse_expr(0)?;
                Stmt::Assign { target, value }
            }
            _ => {
                let expr = self.parse_expr(0)?;
                let next = self.peek();
                if matches!(next.kind, TokenKind::Equal | TokenKind::ColonEqual) {
                    return Err(ParseError::new(
                        ParseErrorKind::InvalidAssignment,
                        expr.span,
                        "only variables can be assigned",
                    ));
                }
                Stmt::Expr(expr)
            }
        };
        self.eat(TokenKind::Semicolon);
        Ok(stmt)
    }

    fn parse_if(&mut self) -> Result<Stmt<'ast>, ParseError> {
        self.nested(Self::if_body)
    }

    fn if_body(&mut self) -> Result<Stmt<'ast>, ParseError> {
        self.expect(TokenKind::If)?;
        let cond = self.parse_expr(0)?;
        let then_block = self.parse_block()?;

        let else_branch = if self.eat(TokenKind::Else).is_some() {
            let branch = if self.check(TokenKind::If) {
                self.parse_if()?
            } else {
                Stmt::Block(self.parse_block()?)
            };
            Some(&*self.arena.alloc(branch))
        } else {
            None
        };

        Ok(Stmt::If {
            cond,
            then_block,
            else_branch,
        })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Parse an expression whose operators bind at least as tightly as `min_bp`.
    pub fn parse_expr(&mut self, min_bp: u8) -> Result<&'ast Expr<'ast>, ParseError> {
        let mut lhs = self.nested(Self::parse_prefix)?;

        // Each fold deepens the left spine, so it counts as a level too.
        let mut folds = 0;
        while let Some(op) = BinaryOp::from_token(self.peek().kind) {
            let (l_bp, r_bp) = op.binding_power();
            if l_bp < min_bp {
                break;
            }
            self.enter()?;
            folds += 1;
            self.advance();
            let rhs = self.parse_expr(r_bp)?;
            lhs = self.arena.alloc(Expr {
                kind: ExprKind::Binary {
                    op,
                    left: lhs,
                    right: rhs,
                },
                span: lhs.span.merge(rhs.span),
            });
        }
        self.depth -= folds;

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> Result<&'ast Expr<'ast>, ParseError> {
        let token = self.peek();
        let (kind, span) = match token.kind {
            TokenKind::Minus => {
                self.advance();
                // Fold negative literals so `var x = -1` stays a literal.
                match self.peek().kind {
                    TokenKind::IntLiteral | TokenKind::FloatLiteral => {
                        let literal = self.advance();
                        let span = token.span.merge(literal.span);
                        (self.number(literal, true)?, span)
                    }
                    _ => {
                        let operand = self.parse_expr(UnaryOp::BINDING_POWER)?;
                        (
                            ExprKind::Unary {
                                op: UnaryOp::Neg,
                                operand,
                            },
                            token.span.merge(operand.span),
                        )
                    }
                }
            }
            TokenKind::Bang => {
                self.advance();
                let operand = self.parse_expr(UnaryOp::BINDING_POWER)?;
                (
                    ExprKind::Unary {
                        op: UnaryOp::Not,
                        operand,
                    },
                    token.span.merge(operand.span),
                )
            }
            TokenKind::IntLiteral | TokenKind::FloatLiteral => {
                self.advance();
                (self.number(token, false)?, token.span)
            }
            TokenKind::StringLiteral => {
                self.advance();
                (ExprKind::Str(token.lexeme), token.span)
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                (ExprKind::Bool(token.kind == TokenKind::True), token.span)
            }
            TokenKind::Null => {
                self.advance();
                (ExprKind::Null, token.span)
            }
            TokenKind::LeftParen => {
                self.advance();
                let inner = self.parse_expr(0)?;
                let close = self.expect(TokenKind::RightParen)?;
                (inner.kind, token.span.merge(close.span))
            }
            TokenKind::Identifier => {
                self.advance();
                if self.check(TokenKind::LeftParen) {
                    return self.parse_call(Ident {
                        name: token.lexeme,
                        span: token.span,
                    });
                }
                (ExprKind::Var(token.lexeme), token.span)
            }
            TokenKind::Eof => {
                return Err(ParseError::new(
                    ParseErrorKind::UnexpectedEof,
                    token.span,
                    "expected expression",
                ));
            }
            _ => {
                return Err(ParseError::new(
                    ParseErrorKind::ExpectedExpression,
                    token.span,
                    format!("found {}", token.kind.describe()),
                ));
            }
        };
        Ok(self.arena.alloc(Expr { kind, span }))
    }

    fn parse_call(&mut self, callee: Ident<'ast>) -> Result<&'ast Expr<'ast>, ParseError> {
        self.expect(TokenKind::LeftParen)?;
        let mut args = BVec::new_in(self.arena);
        if !self.check(TokenKind::RightParen) {
            loop {
                args.push(*self.parse_expr(0)?);
                if self.eat(TokenKind::Comma).is_none() {
                    break;
                }
            }
        }
        let close = self.expect(TokenKind::RightParen)?;
        Ok(self.arena.alloc(Expr {
            kind: ExprKind::Call {
                callee,
                args: args.into_bump_slice(),
            },
            span: callee.span.merge(close.span),
        }))
    }

    fn number(&self, token: Token<'ast>, negate: bool) -> Result<ExprKind<'ast>, ParseError> {
        let out_of_range = || {
            ParseError::new(
                ParseErrorKind::UnexpectedToken,
                token.span,
                format!("number literal '{}' is out of range", token.lexeme),
            )
        };
        if token.kind == TokenKind::FloatLiteral {
            let value: f32 = token.lexeme.parse().map_err(|_| out_of_range())?;
            return Ok(ExprKind::Float(if negate { -value } else { value }));
        }
        let value: i64 = if negate {
            format!("-{}", token.lexeme).parse().map_err(|_| out_of_range())?
        } else {
            token.lexeme.parse().map_err(|_| out_of_range())?
        };
        Ok(ExprKind::Int(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse<'a>(source: &str, arena: &'a Bump) -> Script<'a> {
        Parser::parse(source, arena).unwrap()
    }

    fn only_function<'a>(script: &Script<'a>) -> FunctionDecl<'a> {
        *script.functions().next().unwrap()
    }

    #[test]
    fn function_with_typed_params() {
        let arena = Bump::new();
        let script = parse("func double(x: int): int { return x * 2 }", &arena);
        let func = only_function(&script);
        assert_eq!(func.name.name, "double");
        assert_eq!(func.params.len(), 1);
        assert_eq!(func.params[0].ty.unwrap().name, "int");
        assert_eq!(func.ret.unwrap().name, "int");
        assert!(matches!(func.body.stmts[0], Stmt::Return { value: Some(_), .. }));
    }

    #[test]
    fn globals_and_functions() {
        let arena = Bump::new();
        let script = parse("var count: int = -3\nvar name = \"x\"\nfunc main() {}", &arena);
        let globals: Vec<_> = script.globals().collect();
        assert_eq!(globals.len(), 2);
        assert!(matches!(globals[0].init.unwrap().kind, ExprKind::Int(-3)));
        assert_eq!(script.functions().count(), 1);
    }

    #[test]
    fn precedence() {
        let arena = Bump::new();
        let script = parse("func f() { 1 + 2 * 3 }", &arena);
        let Stmt::Expr(expr) = only_function(&script).body.stmts[0] else {
            panic!("expected expression statement");
        };
        let ExprKind::Binary { op, right, .. } = expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Add);
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn logical_operators_bind_loosest() {
        let arena = Bump::new();
        let script = parse("func f() { a < 1 || b && !c }", &arena);
        let Stmt::Expr(expr) = only_function(&script).body.stmts[0] else {
            panic!("expected expression statement");
        };
        let ExprKind::Binary { op, right, .. } = expr.kind else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::Or);
        assert!(matches!(right.kind, ExprKind::Binary { op: BinaryOp::And, .. }));
    }

    #[test]
    fn declarations_and_assignment() {
        let arena = Bump::new();
        let script = parse("func f() { x := 1; var y: float; y = 2.5 }", &arena);
        let stmts = only_function(&script).body.stmts;
        assert!(matches!(stmts[0], Stmt::Var { init: Some(_), .. }));
        assert!(matches!(stmts[1], Stmt::Var { init: None, ty: Some(_), .. }));
        assert!(matches!(stmts[2], Stmt::Assign { .. }));
    }

    #[test]
    fn else_if_chain() {
        let arena = Bump::new();
        let script = parse("func f(a) { if a { } else if !a { } else { return } }", &arena);
        let Stmt::If { else_branch, .. } = only_function(&script).body.stmts[0] else {
            panic!("expected if");
        };
        assert!(matches!(else_branch, Some(Stmt::If { else_branch: Some(Stmt::Block(_)), .. })));
    }

    #[test]
    fn nested_calls() {
        let arena = Bump::new();
        let script = parse("func main() { pos(self(), 10, getX(self()) + 1) }", &arena);
        let Stmt::Expr(expr) = only_function(&script).body.stmts[0] else {
            panic!("expected expression statement");
        };
        let ExprKind::Call { callee, args } = expr.kind else {
            panic!("expected call");
        };
        assert_eq!(callee.name, "pos");
        assert_eq!(args.len(), 3);
        assert!(matches!(args[0].kind, ExprKind::Call { .. }));
    }

    #[test]
    fn missing_close_paren() {
        let arena = Bump::new();
        let err = Parser::parse("func main() { f(1 }", &arena).unwrap_err();
        let SyntaxError::Parse(err) = err else {
            panic!("expected parse error");
        };
        assert_eq!(err.kind, ParseErrorKind::ExpectedToken);
    }

    #[test]
    fn stray_top_level_statement() {
        let arena = Bump::new();
        let err = Parser::parse("x := 1", &arena).unwrap_err();
        assert!(matches!(
            err,
            SyntaxError::Parse(ParseError {
                kind: ParseErrorKind::ExpectedItem,
                ..
            })
        ));
    }

    #[test]
    fn call_is_not_assignable() {
        let arena = Bump::new();
        let err = Parser::parse("func f() { g() = 1 }", &arena).unwrap_err();
        assert!(matches!(
            err,
            SyntaxError::Parse(ParseError {
                kind: ParseErrorKind::InvalidAssignment,
                ..
            })
        ));
    }

    #[test]
    fn unclosed_block() {
        let arena = Bump::new();
        let err = Parser::parse("func f() { return 1", &arena).unwrap_err();
        assert!(matches!(
            err,
            SyntaxError::Parse(ParseError {
                kind: ParseErrorKind::UnexpectedEof,
                ..
            })
        ));
    }

    fn nesting_error(source: &str) -> ParseError {
        let arena = Bump::new();
        match Parser::parse(source, &arena) {
            Err(SyntaxError::Parse(err)) => err,
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn deep_parentheses_are_rejected() {
        let n = 10_000;
        let source = format!("func f(): int {{ return {}1{} }}", "(".repeat(n), ")".repeat(n));
        let err = nesting_error(&source);
        assert_eq!(err.kind, ParseErrorKind::NestingTooDeep);
        assert_eq!(err.span.line, 1);
    }

    #[test]
    fn deep_unary_chain_is_rejected() {
        let source = format!("func f(): bool {{ return {}true }}", "!".repeat(10_000));
        assert_eq!(nesting_error(&source).kind, ParseErrorKind::NestingTooDeep);
    }

    #[test]
    fn deep_blocks_are_rejected() {
        let n = 10_000;
        let source = format!("func f() {{ {}{} }}", "{ ".repeat(n), "} ".repeat(n));
        assert_eq!(nesting_error(&source).kind, ParseErrorKind::NestingTooDeep);

        let source = format!("func f(a) {{ if a {{ }}{} }}", " else if a { }".repeat(n));
        assert_eq!(nesting_error(&source).kind, ParseErrorKind::NestingTooDeep);
    }

    #[test]
    fn long_operator_chain_is_rejected() {
        let source = format!("func f(): int {{ return 1{} }}", " + 1".repeat(10_000));
        assert_eq!(nesting_error(&source).kind, ParseErrorKind::NestingTooDeep);
    }

    #[test]
    fn nesting_below_the_limit_parses() {
        let arena = Bump::new();
        let n = MAX_NESTING / 2;
        let source = format!("func f(): int {{ return {}1{} }}", "(".repeat(n), ")".repeat(n));
        assert!(Parser::parse(&source, &arena).is_ok());

        // Sequential statements do not accumulate depth.
        let source = format!("func f() {{ {} }}", "{ } ".repeat(MAX_NESTING * 4));
        assert!(Parser::parse(&source, &arena).is_ok());
    }

    #[test]
    fn lex_errors_surface() {
        let arena = Bump::new();
        let err = Parser::parse("func f() { \"open }", &arena).unwrap_err();
        assert!(matches!(err, SyntaxError::Lex(_)));
    }
}
