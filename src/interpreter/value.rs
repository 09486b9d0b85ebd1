use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::state::StateValue;

use super::{RuntimeError, RuntimeResult};

/// Deepest level an array may sit at inside other arrays. A top-level array
/// is at level 1.
pub(super) const MAX_ARRAY_NESTING: usize = 256;

pub(super) type ArrayRef<'p> = Rc<RefCell<Array<'p>>>;

/// Runtime value. Functions borrow their declaration from the program tree.
#[derive(Debug, Clone)]
pub(super) enum Value<'p> {
    Integer(i64),
    Array(ArrayRef<'p>),
    Function(&'p FunctionDecl),
}

impl<'p> Value<'p> {
    pub(super) fn from_bool(value: bool) -> Self {
        Value::Integer(i64::from(value))
    }

    pub(super) fn array(array: Array<'p>) -> Self {
        Value::Array(Rc::new(RefCell::new(array)))
    }

    pub(super) fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Array(_) => "array",
            Value::Function(_) => "function",
        }
    }

    pub(super) fn as_int(&self, operation: &str) -> RuntimeResult<i64> {
        match self {
            Value::Integer(value) => Ok(*value),
            Value::Array(_) | Value::Function(_) => Err(RuntimeError::ExpectedInteger {
                operation: operation.to_string(),
                got: self.type_name().to_string(),
            }),
        }
    }

    pub(super) fn is_truthy(&self, operation: &str) -> RuntimeResult<bool> {
        Ok(self.as_int(operation)? != 0)
    }

    /// Copy suitable for storing in a slot at nesting level `depth`. Arrays
    /// are copied deeply, so no array is ever reachable from its own slots
    /// and every array keeps a single parent.
    pub(super) fn copy_at(&self, depth: usize) -> RuntimeResult<Self> {
        let Value::Array(array) = self else {
            return Ok(self.clone());
        };
        if depth > MAX_ARRAY_NESTING {
            return Err(RuntimeError::ArrayNestingExceeded {
                max_depth: MAX_ARRAY_NESTING,
            });
        }
        let source = array.borrow();
        let mut copy = Array::at_depth(depth);
        for (index, value) in &source.slots {
            copy.slots.insert(*index, value.copy_at(depth + 1)?);
        }
        Ok(Value::array(copy))
    }

    pub(super) fn from_state(value: &StateValue) -> Self {
        Value::from_state_at(value, 1)
    }

    fn from_state_at(value: &StateValue, depth: usize) -> Self {
        match value {
            StateValue::Int(value) => Value::Integer(*value),
            StateValue::List(items) => {
                let mut array = Array::at_depth(depth);
                for (index, item) in items.iter().enumerate() {
                    array.set(index, Value::from_state_at(item, depth + 1));
                }
                Value::array(array)
            }
        }
    }

    /// Boundary form of the value; `None` for functions.
    pub(super) fn to_state(&self) -> Option<StateValue> {
        match self {
            Value::Integer(value) => Some(StateValue::Int(*value)),
            Value::Array(array) => Some(StateValue::List(array.borrow().to_dense())),
            Value::Function(_) => None,
        }
    }
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(left), Value::Integer(right)) => left == right,
            (Value::Array(left), Value::Array(right)) => {
                Rc::ptr_eq(left, right) || left.borrow().to_dense() == right.borrow().to_dense()
            }
            (Value::Function(left), Value::Function(right)) => std::ptr::eq(*left, *right),
            _ => false,
        }
    }
}

/// Sparse array; unset slots read as zero.
#[derive(Debug)]
pub(super) struct Array<'p> {
    depth: usize,
    slots: BTreeMap<usize, Value<'p>>,
}

impl<'p> Array<'p> {
    /// An array that is not stored inside another array.
    pub(super) fn top_level() -> Self {
        Self::at_depth(1)
    }

    fn at_depth(depth: usize) -> Self {
        Self {
            depth,
            slots: BTreeMap::new(),
        }
    }

    /// Nesting level of the slot values: one below this array.
    pub(super) fn slot_depth(&self) -> usize {
        self.depth + 1
    }

    pub(super) fn get(&self, index: usize) -> Value<'p> {
        self.slots
            .get(&index)
            .cloned()
            .unwrap_or(Value::Integer(0))
    }

    /// Stores an already copied value; see [`Value::copy_at`].
    pub(super) fn set(&mut self, index: usize, value: Value<'p>) {
        self.slots.insert(index, value);
    }

    /// Dense list up to and including the highest slot that is not the
    /// integer zero. Nested arrays are always kept, even when empty.
    fn to_dense(&self) -> Vec<StateValue> {
        let items = self
            .slots
            .iter()
            .map(|(index, value)| (*index, value.to_state().unwrap_or(StateValue::Int(0))))
            .collect::<BTreeMap<_, _>>();
        let Some(last) = items
            .iter()
            .rev()
            .find(|(_, item)| **item != StateValue::Int(0))
            .map(|(index, _)| *index)
        else {
            return Vec::new();
        };
        (0..=last)
            .map(|index| items.get(&index).cloned().unwrap_or(StateValue::Int(0)))
            .collect()
    }
}
