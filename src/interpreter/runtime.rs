use tracing::trace;

use crate::ast::{BinaryOperator, Block, Expression, Statement, UnaryOperator};

use super::random::{RANDOM_VARIABLE, RandomSource};
use super::scope::Scopes;
use super::value::{Array, ArrayRef, Value};
use super::{RunOptions, RuntimeError, RuntimeResult};

/// Name under which `return` stores its value.
pub(super) const RETURN_SLOT: &str = "return";

/// Remaining stack below which evaluation continues on a fresh segment.
const STACK_RED_ZONE: usize = 128 * 1024;
const STACK_GROW_SIZE: usize = 1024 * 1024;

/// Control-flow marker for statement execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ExecResult {
    Continue,
    Returned,
}

/// Mutable state of a single run. Nothing here outlives the run.
pub(super) struct InterpreterRuntime<'p, 'r> {
    pub(super) scopes: Scopes<'p>,
    pub(super) options: &'r RunOptions,
    pub(super) random: Option<&'r mut dyn RandomSource>,
    pub(super) steps: u64,
}

impl<'p> InterpreterRuntime<'p, '_> {
    /// Runs a block on a stack segment with room to spare, so deep recursion
    /// in the program never exhausts the host thread's stack.
    pub(super) fn exec_block(&mut self, block: &'p Block) -> RuntimeResult<ExecResult> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.exec_block_inner(block))
    }

    fn exec_block_inner(&mut self, block: &'p Block) -> RuntimeResult<ExecResult> {
        self.tick()?;
        for statement in &block.statements {
            if self.exec_statement(statement)? == ExecResult::Returned {
                return Ok(ExecResult::Returned);
            }
        }
        Ok(ExecResult::Continue)
    }

    fn exec_statement(&mut self, statement: &'p Statement) -> RuntimeResult<ExecResult> {
        self.tick()?;
        match statement {
            Statement::Assign { name, value } => {
                let value = self.eval_expression(value)?;
                self.scopes.write(name, value);
            }
            Statement::IndexSet { base, index, value } => {
                let array = self.eval_array(base)?;
                let value = self.eval_expression(value)?;
                let index = self.eval_index(index)?;
                let max = self.options.max_array_index;
                let slot = usize::try_from(index)
                    .ok()
                    .filter(|slot| *slot <= max)
                    .ok_or(RuntimeError::IndexOutOfRange { index, max })?;
                let value = value.copy_at(array.borrow().slot_depth())?;
                array.borrow_mut().set(slot, value);
            }
            Statement::Expr(expr) => {
                self.eval_expression(expr)?;
            }
            Statement::IfChain {
                branches,
                else_block,
            } => {
                for branch in branches {
                    if self.eval_expression(&branch.condition)?.is_truthy("if")? {
                        return self.exec_block(&branch.body);
                    }
                }
                return self.exec_block(else_block);
            }
            Statement::For {
                init,
                condition,
                increment,
                body,
            } => {
                if self.exec_statement(init)? == ExecResult::Returned {
                    return Ok(ExecResult::Returned);
                }
                loop {
                    if let Some(condition) = condition
                        && !self.eval_expression(condition)?.is_truthy("for")?
                    {
                        break;
                    }
                    if self.exec_block(body)? == ExecResult::Returned {
                        return Ok(ExecResult::Returned);
                    }
                    if self.exec_statement(increment)? == ExecResult::Returned {
                        return Ok(ExecResult::Returned);
                    }
                }
            }
            Statement::FunctionDef(decl) => {
                self.scopes.write(&decl.name, Value::Function(decl));
            }
            Statement::Return(value) => {
                let value = self.eval_expression(value)?;
                self.scopes.write(RETURN_SLOT, value);
                return Ok(ExecResult::Returned);
            }
            Statement::NoOp => {}
        }
        Ok(ExecResult::Continue)
    }

    fn eval_expression(&mut self, expr: &'p Expression) -> RuntimeResult<Value<'p>> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_expression_inner(expr))
    }

    fn eval_expression_inner(&mut self, expr: &'p Expression) -> RuntimeResult<Value<'p>> {
        self.tick()?;
        match expr {
            Expression::Integer(value) => Ok(Value::Integer(*value)),
            Expression::Variable(name) => self.read_variable(name),
            Expression::Array(elements) => {
                let mut array = Array::top_level();
                for (index, element) in elements.iter().enumerate() {
                    let value = self.eval_expression(element)?.copy_at(array.slot_depth())?;
                    array.set(index, value);
                }
                Ok(Value::array(array))
            }
            Expression::Unary { op, operand } => {
                let value = self.eval_expression(operand)?;
                match op {
                    UnaryOperator::Not => Ok(Value::from_bool(!value.is_truthy("not")?)),
                    UnaryOperator::Neg => Ok(Value::Integer(value.as_int("-")?.wrapping_neg())),
                    UnaryOperator::Pos => Ok(Value::Integer(value.as_int("+")?)),
                }
            }
            Expression::Binary { left, op, right } => self.eval_binary(left, *op, right),
            Expression::Index { base, index } => {
                let array = self.eval_array(base)?;
                let index = self.eval_index(index)?;
                // No slot past the addressable range can have been written.
                let value = match usize::try_from(index) {
                    Ok(slot) => array.borrow().get(slot),
                    Err(_) => Value::Integer(0),
                };
                Ok(value)
            }
            Expression::Call { callee, args } => self.call_function(callee, args),
        }
    }

    fn read_variable(&mut self, name: &str) -> RuntimeResult<Value<'p>> {
        if name == RANDOM_VARIABLE
            && let Some(random) = self.random.as_deref_mut()
        {
            return Ok(Value::Integer(random.next_int()));
        }
        match self.scopes.read(name) {
            Some(Value::Function(_)) => Err(RuntimeError::FunctionNotAValue {
                name: name.to_string(),
            }),
            Some(value) => Ok(value.clone()),
            None => Ok(Value::Integer(0)),
        }
    }

    fn eval_binary(
        &mut self,
        left: &'p Expression,
        op: BinaryOperator,
        right: &'p Expression,
    ) -> RuntimeResult<Value<'p>> {
        // `and`/`or` short-circuit and yield the deciding operand unchanged.
        match op {
            BinaryOperator::And => {
                let left = self.eval_expression(left)?;
                if !left.is_truthy("and")? {
                    return Ok(left);
                }
                return self.eval_expression(right);
            }
            BinaryOperator::Or => {
                let left = self.eval_expression(left)?;
                if left.is_truthy("or")? {
                    return Ok(left);
                }
                return self.eval_expression(right);
            }
            _ => {}
        }

        let left = self.eval_expression(left)?;
        let right = self.eval_expression(right)?;
        match op {
            BinaryOperator::Is => return Ok(Value::from_bool(left == right)),
            BinaryOperator::IsNot => return Ok(Value::from_bool(left != right)),
            _ => {}
        }

        let symbol = op.symbol();
        let left = left.as_int(symbol)?;
        let right = right.as_int(symbol)?;
        let result = match op {
            BinaryOperator::Less => i64::from(left < right),
            BinaryOperator::LessEqual => i64::from(left <= right),
            BinaryOperator::Greater => i64::from(left > right),
            BinaryOperator::GreaterEqual => i64::from(left >= right),
            BinaryOperator::Add => left.wrapping_add(right),
            BinaryOperator::Sub => left.wrapping_sub(right),
            BinaryOperator::Mul => left.wrapping_mul(right),
            BinaryOperator::Div => floor_div(left, right)?,
            BinaryOperator::Mod => floor_mod(left, right)?,
            BinaryOperator::And
            | BinaryOperator::Or
            | BinaryOperator::Is
            | BinaryOperator::IsNot => {
                return Err(RuntimeError::Internal {
                    message: format!("operator '{symbol}' reached integer arithmetic"),
                });
            }
        };
        Ok(Value::Integer(result))
    }

    fn eval_array(&mut self, expr: &'p Expression) -> RuntimeResult<ArrayRef<'p>> {
        match self.eval_expression(expr)? {
            Value::Array(array) => Ok(array),
            other => Err(RuntimeError::ExpectedArray {
                got: other.type_name().to_string(),
            }),
        }
    }

    fn eval_index(&mut self, expr: &'p Expression) -> RuntimeResult<i64> {
        let index = self.eval_expression(expr)?.as_int("index")?;
        if index < 0 {
            return Err(RuntimeError::NegativeIndex { index });
        }
        Ok(index)
    }

    fn call_function(&mut self, callee: &str, args: &'p [Expression]) -> RuntimeResult<Value<'p>> {
        let decl = match self.scopes.read(callee) {
            Some(Value::Function(decl)) => *decl,
            _ => {
                return Err(RuntimeError::UndefinedFunction {
                    name: callee.to_string(),
                });
            }
        };
        if decl.params.len() != args.len() {
            return Err(RuntimeError::FunctionArityMismatch {
                name: callee.to_string(),
                expected: decl.params.len(),
                found: args.len(),
            });
        }

        // Arguments are evaluated in the caller's scope.
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expression(arg)?);
        }

        let depth = self.scopes.depth();
        if depth >= self.options.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded {
                max_depth: self.options.max_call_depth,
            });
        }

        trace!(function = callee, depth = depth + 1, "entering function");
        self.scopes.push_frame();
        for (param, value) in decl.params.iter().zip(values) {
            self.scopes.write(param, value);
        }
        self.exec_block(&decl.body)?;
        let result = self
            .scopes
            .read(RETURN_SLOT)
            .cloned()
            .unwrap_or(Value::Integer(0));
        if self.scopes.pop_frame().is_none() {
            return Err(RuntimeError::Internal {
                message: format!("call frame for '{callee}' vanished"),
            });
        }
        trace!(function = callee, depth, "leaving function");
        Ok(result)
    }

    fn tick(&mut self) -> RuntimeResult<()> {
        self.steps += 1;
        match self.options.max_steps {
            Some(budget) if self.steps > budget => {
                Err(RuntimeError::ExecutionBudgetExceeded { budget })
            }
            _ => Ok(()),
        }
    }
}

/// Integer division rounding toward negative infinity.
pub(super) fn floor_div(left: i64, right: i64) -> RuntimeResult<i64> {
    if right == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    let quotient = left.wrapping_div(right);
    if left.wrapping_rem(right) != 0 && ((left < 0) != (right < 0)) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}

/// Remainder carrying the sign of the divisor.
pub(super) fn floor_mod(left: i64, right: i64) -> RuntimeResult<i64> {
    if right == 0 {
        return Err(RuntimeError::DivisionByZero);
    }
    let remainder = left.wrapping_rem(right);
    if remainder != 0 && ((remainder < 0) != (right < 0)) {
        Ok(remainder + right)
    } else {
        Ok(remainder)
    }
}
