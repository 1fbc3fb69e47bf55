// File: src/interpreter/environment.rs
//
// Runtime scope chain for the loxwalk interpreter.
//
// Each Environment is one frame: a map from names to slots plus an optional
// shared handle to its enclosing frame. Frames are reference counted so a
// closure can keep its defining frame alive after the block or call that
// created it has finished.

use super::value::Value;
use crate::errors::RuntimeErrorKind;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A variable's storage. `assigned` stays false for `var x;` until the first
/// assignment, which is how unassigned reads are told apart from undefined ones.
#[derive(Debug, Clone)]
pub struct Slot {
    pub value: Value,
    pub assigned: bool,
}

/// One frame of variable storage
///
/// # Examples
///
/// ```ignore
/// let globals = Rc::new(RefCell::new(Environment::new()));
/// globals.borrow_mut().define("x", Value::Number(1.0), true);
///
/// let block = Rc::new(RefCell::new(Environment::new_enclosed(Rc::clone(&globals))));
/// block.borrow_mut().define("x", Value::Number(2.0), true);   // shadows outer x
/// assert_eq!(Environment::get_at(&block, 1, "x"), Ok(Value::Number(1.0)));
/// ```
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Slot>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    /// Create a root (global) frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a frame whose parent is `enclosing`
    pub fn new_enclosed(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment { values: HashMap::new(), enclosing: Some(enclosing) }
    }

    /// Create a slot in this frame only; never looks at enclosing frames.
    pub fn define(&mut self, name: &str, value: Value, assigned: bool) {
        self.values.insert(name.to_string(), Slot { value, assigned });
    }

    /// Look `name` up here, then in each enclosing frame.
    pub fn get(&self, name: &str) -> Result<Value, RuntimeErrorKind> {
        match self.values.get(name) {
            Some(slot) => Self::read(slot, name),
            None => match &self.enclosing {
                Some(parent) => parent.borrow().get(name),
                None => Err(RuntimeErrorKind::UndefinedVariable(name.to_string())),
            },
        }
    }

    /// Overwrite the nearest existing slot for `name` and mark it assigned.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), RuntimeErrorKind> {
        if let Some(slot) = self.values.get_mut(name) {
            slot.value = value;
            slot.assigned = true;
            return Ok(());
        }
        match &self.enclosing {
            Some(parent) => parent.borrow_mut().assign(name, value),
            None => Err(RuntimeErrorKind::UndefinedVariable(name.to_string())),
        }
    }

    /// Read `name` from the frame exactly `distance` parents above `env`.
    pub fn get_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
    ) -> Result<Value, RuntimeErrorKind> {
        let frame = Self::ancestor(env, distance);
        let frame = frame.borrow();
        match frame.values.get(name) {
            Some(slot) => Self::read(slot, name),
            None => Err(RuntimeErrorKind::UndefinedVariable(name.to_string())),
        }
    }

    /// Assign `name` in the frame exactly `distance` parents above `env`.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
    ) -> Result<(), RuntimeErrorKind> {
        let frame = Self::ancestor(env, distance);
        let mut frame = frame.borrow_mut();
        match frame.values.get_mut(name) {
            Some(slot) => {
                slot.value = value;
                slot.assigned = true;
                Ok(())
            }
            None => Err(RuntimeErrorKind::UndefinedVariable(name.to_string())),
        }
    }

    fn ancestor(env: &Rc<RefCell<Environment>>, distance: usize) -> Rc<RefCell<Environment>> {
        let mut frame = Rc::clone(env);
        for _ in 0..distance {
            let parent = frame.borrow().enclosing.clone();
            match parent {
                Some(parent) => frame = parent,
                None => break,
            }
        }
        frame
    }

    fn read(slot: &Slot, name: &str) -> Result<Value, RuntimeErrorKind> {
        if slot.assigned {
            Ok(slot.value.clone())
        } else {
            Err(RuntimeErrorKind::UnassignedVariable(name.to_string()))
        }
    }

    /// Names defined directly in this frame, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.values.keys().cloned().collect();
        names.sort();
        names
    }

    /// Slots defined directly in this frame, sorted by name.
    pub fn slots(&self) -> Vec<(String, Slot)> {
        let mut slots: Vec<(String, Slot)> =
            self.values.iter().map(|(name, slot)| (name.clone(), slot.clone())).collect();
        slots.sort_by(|a, b| a.0.cmp(&b.0));
        slots
    }
}
