//! Syntax tree shared by the parser and the interpreter.
//!
//! Every node renders back to source through [`fmt::Display`]. Rendering is
//! precedence aware: it only adds the parentheses needed for the text to parse
//! back into the same tree.

use std::fmt::{self, Write};

const INDENT: &str = "    ";

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Expression {
    Integer(i64),
    Variable(String),
    Array(Vec<Expression>),
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },
    Index {
        base: Box<Expression>,
        index: Box<Expression>,
    },
    Call {
        callee: String,
        args: Vec<Expression>,
    },
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum UnaryOperator {
    Not,
    Neg,
    Pos,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinaryOperator {
    Or,
    And,
    Is,
    IsNot,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOperator {
    /// Binding strength, low to high. `not` sits at level 2.
    pub fn level(self) -> u8 {
        match self {
            BinaryOperator::Or | BinaryOperator::And => 1,
            BinaryOperator::Is
            | BinaryOperator::IsNot
            | BinaryOperator::Less
            | BinaryOperator::LessEqual
            | BinaryOperator::Greater
            | BinaryOperator::GreaterEqual => 3,
            BinaryOperator::Add | BinaryOperator::Sub => 4,
            BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Mod => 5,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Or => "or",
            BinaryOperator::And => "and",
            BinaryOperator::Is => "is",
            BinaryOperator::IsNot => "is not",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
        }
    }
}

pub const NOT_LEVEL: u8 = 2;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct IfBranch {
    pub condition: Expression,
    pub body: Block,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Block,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Statement {
    Assign {
        name: String,
        value: Expression,
    },
    /// Assignment whose target is an index expression, `base[index] = value`.
    IndexSet {
        base: Expression,
        index: Expression,
        value: Expression,
    },
    Expr(Expression),
    IfChain {
        branches: Vec<IfBranch>,
        else_block: Block,
    },
    /// Omitted init/increment parts are [`Statement::NoOp`].
    For {
        init: Box<Statement>,
        condition: Option<Expression>,
        increment: Box<Statement>,
        body: Block,
    },
    FunctionDef(FunctionDecl),
    Return(Expression),
    NoOp,
}

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Block {
    pub statements: Vec<Statement>,
}

impl Block {
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Renders the statements as top-level source, one per line.
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        for statement in &self.statements {
            // Writing into a String cannot fail.
            let _ = write_statement(&mut out, statement, 0);
            out.push('\n');
        }
        out
    }
}

impl Expression {
    /// Number of nodes on the longest path from this node to a leaf.
    pub fn height(&self) -> usize {
        let children = match self {
            Expression::Integer(_) | Expression::Variable(_) => return 1,
            Expression::Array(items) | Expression::Call { args: items, .. } => {
                items.iter().map(Expression::height).max().unwrap_or(0)
            }
            Expression::Unary { operand, .. } => operand.height(),
            Expression::Binary { left, right, .. } => left.height().max(right.height()),
            Expression::Index { base, index } => base.height().max(index.height()),
        };
        children + 1
    }

    fn is_not(&self) -> bool {
        matches!(
            self,
            Expression::Unary {
                op: UnaryOperator::Not,
                ..
            }
        )
    }

    fn binary_level(&self) -> Option<u8> {
        match self {
            Expression::Binary { op, .. } => Some(op.level()),
            _ => None,
        }
    }
}

fn write_parenthesized(f: &mut impl Write, expr: &Expression, parens: bool) -> fmt::Result {
    if parens {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

fn write_list(f: &mut impl Write, items: &[Expression]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Integer(value) => write!(f, "{value}"),
            Expression::Variable(name) => f.write_str(name),
            Expression::Array(elements) => {
                f.write_char('[')?;
                write_list(f, elements)?;
                f.write_char(']')
            }
            Expression::Unary { op, operand } => match op {
                UnaryOperator::Not => {
                    f.write_str("not ")?;
                    let parens = operand.binary_level().is_some_and(|level| level < NOT_LEVEL);
                    write_parenthesized(f, operand, parens)
                }
                UnaryOperator::Neg | UnaryOperator::Pos => {
                    f.write_char(if *op == UnaryOperator::Neg { '-' } else { '+' })?;
                    let parens = operand.is_not() || operand.binary_level().is_some();
                    write_parenthesized(f, operand, parens)
                }
            },
            Expression::Binary { left, op, right } => {
                let level = op.level();
                let left_parens =
                    left.is_not() || left.binary_level().is_some_and(|child| child < level);
                let right_parens =
                    right.is_not() || right.binary_level().is_some_and(|child| child <= level);
                write_parenthesized(f, left, left_parens)?;
                write!(f, " {} ", op.symbol())?;
                write_parenthesized(f, right, right_parens)
            }
            Expression::Index { base, index } => write!(f, "{base}[{index}]"),
            Expression::Call { callee, args } => {
                write!(f, "{callee}(")?;
                write_list(f, args)?;
                f.write_char(')')
            }
        }
    }
}

fn write_indent(f: &mut impl Write, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str(INDENT)?;
    }
    Ok(())
}

fn write_block(f: &mut impl Write, block: &Block, depth: usize) -> fmt::Result {
    f.write_str("{\n")?;
    for statement in &block.statements {
        write_indent(f, depth + 1)?;
        write_statement(f, statement, depth + 1)?;
        f.write_char('\n')?;
    }
    write_indent(f, depth)?;
    f.write_char('}')
}

/// Writes `statement` assuming the cursor is already indented to `depth`.
fn write_statement(f: &mut impl Write, statement: &Statement, depth: usize) -> fmt::Result {
    match statement {
        Statement::Assign { name, value } => write!(f, "{name} = {value}"),
        Statement::IndexSet { base, index, value } => write!(f, "{base}[{index}] = {value}"),
        Statement::Expr(expr) => write!(f, "{expr}"),
        Statement::IfChain {
            branches,
            else_block,
        } => {
            for (idx, branch) in branches.iter().enumerate() {
                let keyword = if idx == 0 { "if" } else { " elif" };
                write!(f, "{keyword} {} ", branch.condition)?;
                write_block(f, &branch.body, depth)?;
            }
            if !else_block.is_empty() {
                f.write_str(" else ")?;
                write_block(f, else_block, depth)?;
            }
            Ok(())
        }
        Statement::For {
            init,
            condition,
            increment,
            body,
        } => {
            f.write_str("for ")?;
            write_statement(f, init, depth)?;
            f.write_str("; ")?;
            if let Some(condition) = condition {
                write!(f, "{condition}")?;
            }
            f.write_str("; ")?;
            write_statement(f, increment, depth)?;
            if !matches!(**increment, Statement::NoOp) {
                f.write_char(' ')?;
            }
            write_block(f, body, depth)
        }
        Statement::FunctionDef(decl) => {
            write!(f, "func {}({}) ", decl.name, decl.params.join(", "))?;
            write_block(f, &decl.body, depth)
        }
        Statement::Return(value) => write!(f, "return {value}"),
        Statement::NoOp => Ok(()),
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_statement(f, self, 0)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_block(f, self, 0)
    }
}
