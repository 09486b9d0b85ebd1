use crate::ast::{
    BinaryOperator, Block, Expression, FunctionDecl, IfBranch, NOT_LEVEL, Statement, UnaryOperator,
};
use crate::feature::FeatureSet;
use crate::lexer::{Lexer, Token, TokenKind};

mod error;

pub use error::{ParseError, ParseResult};

/// Deepest nesting of blocks and expressions a program may use. Expression
/// trees are also capped at this height, so evaluating, rendering and
/// dropping them stays within a small, fixed stack.
pub const MAX_NESTING_DEPTH: usize = 256;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token<'a>,
    features: FeatureSet,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, features: FeatureSet) -> ParseResult<Self> {
        let mut lexer = Lexer::new(input, features);
        let current = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            features,
            depth: 0,
        })
    }

    pub fn parse_program(mut self) -> ParseResult<Block> {
        self.skip_newline()?;
        let mut statements = Vec::new();
        while !matches!(self.current.kind, TokenKind::EOF) {
            statements.push(self.parse_statement()?);
        }
        Ok(Block::new(statements))
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        let statement = match self.current.kind {
            TokenKind::Identifier(_) => self.parse_assignment_or_expression()?,
            TokenKind::If if self.allows(FeatureSet::CONDITIONAL) => self.parse_if_chain()?,
            TokenKind::For if self.allows(FeatureSet::LOOP) => self.parse_for_loop()?,
            TokenKind::Func if self.allows(FeatureSet::FUNCTION) => self.parse_function_def()?,
            TokenKind::Return if self.allows(FeatureSet::FUNCTION) => self.parse_return()?,
            kind => {
                return Err(ParseError::syntax(format!(
                    "Invalid statement start: {kind} at position {}",
                    self.current.span.start
                )));
            }
        };
        self.skip_newline()?;
        Ok(statement)
    }

    /// Both statement forms start with an identifier. Parse the variable
    /// speculatively and rewind unless it is followed by `=`.
    fn parse_assignment_or_expression(&mut self) -> ParseResult<Statement> {
        let checkpoint = self.current.clone();
        self.lexer.start_saving();
        let target = self.parse_variable()?;
        if matches!(self.current.kind, TokenKind::Assign) {
            self.lexer.stop_saving();
            self.advance()?;
            let value = self.parse_expression()?;
            return assignment(target, value);
        }

        self.lexer.replay();
        self.current = checkpoint;
        Ok(Statement::Expr(self.parse_expression()?))
    }

    fn parse_assignment(&mut self) -> ParseResult<Statement> {
        let target = self.parse_variable()?;
        self.expect(TokenKind::Assign, "'='")?;
        let value = self.parse_expression()?;
        assignment(target, value)
    }

    fn parse_if_chain(&mut self) -> ParseResult<Statement> {
        self.expect(TokenKind::If, "'if'")?;
        let mut branches = vec![self.parse_if_branch()?];
        while matches!(self.current.kind, TokenKind::Elif) && self.allows(FeatureSet::ELSE_IF) {
            self.advance()?;
            branches.push(self.parse_if_branch()?);
        }

        let else_block = if matches!(self.current.kind, TokenKind::Else) {
            self.advance()?;
            self.parse_block()?
        } else {
            Block::default()
        };

        Ok(Statement::IfChain {
            branches,
            else_block,
        })
    }

    fn parse_if_branch(&mut self) -> ParseResult<IfBranch> {
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(IfBranch { condition, body })
    }

    fn parse_for_loop(&mut self) -> ParseResult<Statement> {
        self.expect(TokenKind::For, "'for'")?;

        let init = if matches!(self.current.kind, TokenKind::Semicolon) {
            Statement::NoOp
        } else {
            self.parse_assignment()?
        };
        self.expect(TokenKind::Semicolon, "';'")?;

        let condition = if matches!(self.current.kind, TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(TokenKind::Semicolon, "';'")?;

        let increment = if matches!(self.current.kind, TokenKind::LBrace) {
            Statement::NoOp
        } else {
            self.parse_assignment()?
        };
        let body = self.parse_block()?;

        Ok(Statement::For {
            init: Box::new(init),
            condition,
            increment: Box::new(increment),
            body,
        })
    }

    fn parse_function_def(&mut self) -> ParseResult<Statement> {
        self.expect(TokenKind::Func, "'func'")?;
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LParen, "'('")?;

        let mut params = Vec::new();
        if !matches!(self.current.kind, TokenKind::RParen) {
            loop {
                params.push(self.expect_identifier()?);
                if matches!(self.current.kind, TokenKind::Comma) {
                    self.advance()?;
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_block()?;

        Ok(Statement::FunctionDef(FunctionDecl { name, params, body }))
    }

    fn parse_return(&mut self) -> ParseResult<Statement> {
        self.expect(TokenKind::Return, "'return'")?;
        Ok(Statement::Return(self.parse_expression()?))
    }

    fn parse_block(&mut self) -> ParseResult<Block> {
        self.enter()?;
        self.expect(TokenKind::LBrace, "'{'")?;
        self.skip_newline()?;
        let mut statements = Vec::new();
        loop {
            match self.current.kind {
                TokenKind::RBrace => break,
                TokenKind::EOF => return Err(self.unexpected("'}'")),
                _ => statements.push(self.parse_statement()?),
            }
        }
        self.advance()?;
        self.skip_newline()?;
        self.leave();
        Ok(Block::new(statements))
    }

    fn parse_expression(&mut self) -> ParseResult<Expression> {
        self.parse_expression_bp(0)
    }

    /// Precedence climbing: consumes binary operators whose level is at least
    /// `min_level`. Right operands are parsed one level higher, so every
    /// binary level is left-associative.
    fn parse_expression_bp(&mut self, min_level: u8) -> ParseResult<Expression> {
        self.enter()?;
        let mut left = if matches!(self.current.kind, TokenKind::Not) && min_level <= NOT_LEVEL {
            self.advance()?;
            let operand = self.parse_expression_bp(NOT_LEVEL)?;
            self.bounded(Expression::Unary {
                op: UnaryOperator::Not,
                operand: Box::new(operand),
            })?
        } else {
            self.parse_factor()?
        };

        while let Some(op) = binary_operator(self.current.kind) {
            let level = op.level();
            if level < min_level {
                break;
            }
            self.advance()?;
            let right = self.parse_expression_bp(level + 1)?;
            left = self.bounded(Expression::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            })?;
        }
        self.leave();
        Ok(left)
    }

    fn parse_factor(&mut self) -> ParseResult<Expression> {
        let op = match self.current.kind {
            TokenKind::Plus => UnaryOperator::Pos,
            TokenKind::Minus => UnaryOperator::Neg,
            _ => return self.parse_primary(),
        };
        self.advance()?;
        self.enter()?;
        let operand = self.parse_factor()?;
        self.leave();
        self.bounded(Expression::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> ParseResult<Expression> {
        match self.current.kind {
            TokenKind::Integer(value) => {
                self.advance()?;
                Ok(Expression::Integer(value))
            }
            TokenKind::Identifier(_) => self.parse_variable(),
            TokenKind::LParen => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }
            TokenKind::LBracket if self.allows(FeatureSet::ARRAY) => {
                self.advance()?;
                let elements = self.parse_expression_list(TokenKind::RBracket, "']'")?;
                self.bounded(Expression::Array(elements))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// An identifier followed by an optional call suffix and any number of
    /// index suffixes.
    fn parse_variable(&mut self) -> ParseResult<Expression> {
        let name = self.expect_identifier()?;
        let mut expr = if matches!(self.current.kind, TokenKind::LParen)
            && self.allows(FeatureSet::FUNCTION)
        {
            self.advance()?;
            let args = self.parse_expression_list(TokenKind::RParen, "')'")?;
            self.bounded(Expression::Call { callee: name, args })?
        } else {
            Expression::Variable(name)
        };

        while matches!(self.current.kind, TokenKind::LBracket) && self.allows(FeatureSet::ARRAY) {
            self.advance()?;
            let index = self.parse_expression()?;
            self.expect(TokenKind::RBracket, "']'")?;
            expr = self.bounded(Expression::Index {
                base: Box::new(expr),
                index: Box::new(index),
            })?;
        }
        Ok(expr)
    }

    /// Comma separated expressions up to and including `close`.
    fn parse_expression_list(
        &mut self,
        close: TokenKind<'static>,
        description: &str,
    ) -> ParseResult<Vec<Expression>> {
        let mut items = Vec::new();
        if self.current.kind != close {
            loop {
                items.push(self.parse_expression()?);
                if matches!(self.current.kind, TokenKind::Comma) {
                    self.advance()?;
                } else {
                    break;
                }
            }
        }
        self.expect(close, description)?;
        Ok(items)
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.too_deep());
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn bounded(&self, expr: Expression) -> ParseResult<Expression> {
        if expr.height() > MAX_NESTING_DEPTH {
            return Err(self.too_deep());
        }
        Ok(expr)
    }

    fn too_deep(&self) -> ParseError {
        ParseError::syntax(format!(
            "Nesting depth exceeds maximum of {MAX_NESTING_DEPTH} levels at position {}",
            self.current.span.start
        ))
    }

    fn allows(&self, feature: FeatureSet) -> bool {
        self.features.contains(feature)
    }

    fn skip_newline(&mut self) -> ParseResult<()> {
        if matches!(self.current.kind, TokenKind::Newline) {
            self.advance()?;
        }
        Ok(())
    }

    fn expect(&mut self, kind: TokenKind<'static>, description: &str) -> ParseResult<()> {
        if self.current.kind == kind {
            self.advance()?;
            Ok(())
        } else {
            Err(self.unexpected(description))
        }
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        if let TokenKind::Identifier(name) = self.current.kind {
            self.advance()?;
            Ok(name.to_string())
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    fn advance(&mut self) -> ParseResult<Token<'a>> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::syntax(format!(
            "Expected {expected}, got {} at position {}",
            self.current.kind, self.current.span.start
        ))
    }
}

fn assignment(target: Expression, value: Expression) -> ParseResult<Statement> {
    match target {
        Expression::Variable(name) => Ok(Statement::Assign { name, value }),
        Expression::Index { base, index } => Ok(Statement::IndexSet {
            base: *base,
            index: *index,
            value,
        }),
        other => Err(ParseError::syntax(format!("Cannot assign to '{other}'"))),
    }
}

fn binary_operator(kind: TokenKind<'_>) -> Option<BinaryOperator> {
    let op = match kind {
        TokenKind::Or => BinaryOperator::Or,
        TokenKind::And => BinaryOperator::And,
        TokenKind::Is => BinaryOperator::Is,
        TokenKind::IsNot => BinaryOperator::IsNot,
        TokenKind::Less => BinaryOperator::Less,
        TokenKind::LessEqual => BinaryOperator::LessEqual,
        TokenKind::Greater => BinaryOperator::Greater,
        TokenKind::GreaterEqual => BinaryOperator::GreaterEqual,
        TokenKind::Plus => BinaryOperator::Add,
        TokenKind::Minus => BinaryOperator::Sub,
        TokenKind::Star => BinaryOperator::Mul,
        TokenKind::Slash => BinaryOperator::Div,
        TokenKind::Percent => BinaryOperator::Mod,
        _ => return None,
    };
    Some(op)
}

/// Parses `input` with every optional feature enabled.
pub fn parse(input: &str) -> ParseResult<Block> {
    parse_with_features(input, FeatureSet::ALL)
}

pub fn parse_with_features(input: &str, features: FeatureSet) -> ParseResult<Block> {
    Parser::new(input, features)?.parse_program()
}
