use rustc_hash::FxHashMap;

use super::value::Value;

type Frame<'p> = FxHashMap<String, Value<'p>>;

/// Where a write to a name lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum VariableLocation {
    Global,
    Local(usize),
}

/// Global mapping plus one frame per active call.
///
/// A name that exists as a global key is always written globally, even from
/// inside a call and even when it is also a parameter name. Other writes go
/// to the innermost frame, or to the globals when no call is active.
pub(super) struct Scopes<'p> {
    globals: Frame<'p>,
    frames: Vec<Frame<'p>>,
}

impl<'p> Scopes<'p> {
    pub(super) fn new(globals: FxHashMap<String, Value<'p>>) -> Self {
        Self {
            globals,
            frames: Vec::new(),
        }
    }

    pub(super) fn resolve(&self, name: &str) -> VariableLocation {
        if self.globals.contains_key(name) {
            return VariableLocation::Global;
        }
        match self.frames.len().checked_sub(1) {
            Some(innermost) => VariableLocation::Local(innermost),
            None => VariableLocation::Global,
        }
    }

    pub(super) fn write(&mut self, name: &str, value: Value<'p>) {
        let location = self.resolve(name);
        let frame = match location {
            VariableLocation::Global => &mut self.globals,
            VariableLocation::Local(depth) => match self.frames.get_mut(depth) {
                Some(frame) => frame,
                None => &mut self.globals,
            },
        };
        frame.insert(name.to_string(), value);
    }

    /// Searches frames innermost first, then the globals.
    pub(super) fn read(&self, name: &str) -> Option<&Value<'p>> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .or_else(|| self.globals.get(name))
    }

    pub(super) fn push_frame(&mut self) {
        self.frames.push(Frame::default());
    }

    pub(super) fn pop_frame(&mut self) -> Option<Frame<'p>> {
        self.frames.pop()
    }

    pub(super) fn depth(&self) -> usize {
        self.frames.len()
    }

    pub(super) fn into_globals(self) -> FxHashMap<String, Value<'p>> {
        self.globals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(value: &Value<'_>) -> i64 {
        value.as_int("test").expect("integer")
    }

    #[test]
    fn writes_outside_calls_create_globals() {
        let mut scopes = Scopes::new(FxHashMap::default());
        assert_eq!(scopes.resolve("x"), VariableLocation::Global);
        scopes.write("x", Value::Integer(1));
        assert_eq!(scopes.read("x").map(int), Some(1));
    }

    #[test]
    fn existing_globals_are_aliased_from_calls() {
        let mut globals = FxHashMap::default();
        globals.insert("a".to_string(), Value::Integer(4));
        let mut scopes = Scopes::new(globals);

        scopes.push_frame();
        assert_eq!(scopes.resolve("a"), VariableLocation::Global);
        assert_eq!(scopes.resolve("b"), VariableLocation::Local(0));
        scopes.write("a", Value::Integer(10));
        scopes.write("b", Value::Integer(2));
        scopes.pop_frame();

        assert_eq!(scopes.read("a").map(int), Some(10));
        assert!(scopes.read("b").is_none());
    }

    #[test]
    fn reads_search_every_active_frame() {
        let mut scopes = Scopes::new(FxHashMap::default());
        scopes.push_frame();
        scopes.write("outer", Value::Integer(1));
        scopes.push_frame();
        assert_eq!(scopes.resolve("outer"), VariableLocation::Local(1));
        assert_eq!(scopes.read("outer").map(int), Some(1));
        scopes.write("outer", Value::Integer(2));
        assert_eq!(scopes.read("outer").map(int), Some(2));
        scopes.pop_frame();
        assert_eq!(scopes.read("outer").map(int), Some(1));
        assert_eq!(scopes.depth(), 1);
    }
}
