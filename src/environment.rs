use std::collections::HashMap;

use crate::evaluator::Value;

/// Variable storage: one global frame plus a stack of function-local
/// frames. Reads fall back from the innermost local frame to the global
/// frame; writes always target the innermost active frame.
#[derive(Debug, Default)]
pub struct Environment {
    globals: HashMap<String, Value>,
    frames: Vec<HashMap<String, Value>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(frame) = self.frames.last() {
            if let Some(value) = frame.get(name) {
                return Some(value.clone());
            }
        }
        self.globals.get(name).cloned()
    }

    // Creates the binding if absent; never falls through to an outer frame.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        match self.frames.last_mut() {
            Some(frame) => {
                frame.insert(name.into(), value);
            }
            None => {
                self.globals.insert(name.into(), value);
            }
        }
    }

    pub fn push_frame(&mut self, frame: HashMap<String, Value>) {
        self.frames.push(frame);
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    /// Reads a name from the global frame only, ignoring local frames.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(name).cloned()
    }
}
