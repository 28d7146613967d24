use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use crate::interpreter::value::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecursionToParent {
    Always,
    Never,
}

impl RecursionToParent {
    pub fn should_recurse(&self) -> bool {
        match self {
            RecursionToParent::Always => true,
            RecursionToParent::Never => false,
        }
    }
}

/// One scope frame.
///
/// Once a closure has captured a frame (or any frame below it), the frame is never written to again.
/// The next binding goes into a copy of the frame that shares its parent, so closures observe the
/// values their free variables had when they were created and the chain does not get any longer.
#[derive(Debug)]
pub struct Environment {
    variables: HashMap<String, Value>,
    parent: Option<Rc<RefCell<Environment>>>,
    captured: bool,
}

impl Environment {
    pub fn new_global() -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment {
            variables: HashMap::new(),
            parent: None,
            captured: false,
        }))
    }

    pub fn new_with_parent(parent: Rc<RefCell<Environment>>) -> Rc<RefCell<Environment>> {
        Rc::new(RefCell::new(Environment {
            variables: HashMap::new(),
            parent: Some(parent),
            captured: false,
        }))
    }

    pub fn lookup(&self, name: &str, recursion: RecursionToParent) -> Option<Value> {
        if let Some(value) = self.variables.get(name) {
            return Some(value.clone());
        }

        if !recursion.should_recurse() {
            return None;
        }

        let mut current = self.parent.as_ref().map(Rc::clone);

        while let Some(environment) = current {
            let borrow = environment.borrow();

            if let Some(value) = borrow.variables.get(name) {
                return Some(value.clone());
            }

            current = borrow.parent.as_ref().map(Rc::clone);
        }

        None
    }

    /// Binds `name` in this scope and returns the frame that now holds the binding,
    /// which replaces this one if it has been captured.
    pub fn define(this: &Rc<RefCell<Environment>>, name: &str, value: Value) -> Rc<RefCell<Environment>> {
        let target = if this.borrow().captured {
            let frame = this.borrow();

            Rc::new(RefCell::new(Environment {
                variables: frame.variables.clone(),
                parent: frame.parent.as_ref().map(Rc::clone),
                captured: false,
            }))
        } else {
            Rc::clone(this)
        };

        target.borrow_mut().variables.insert(name.to_owned(), value);
        target
    }

    /// Marks this frame and all of its ancestors as captured by a closure.
    pub fn capture(this: &Rc<RefCell<Environment>>) {
        let mut current = Some(Rc::clone(this));

        while let Some(environment) = current {
            let mut borrow = environment.borrow_mut();

            if borrow.captured {
                break;
            }

            borrow.captured = true;
            current = borrow.parent.as_ref().map(Rc::clone);
        }
    }
}

impl Drop for Environment {
    // Frames reach older frames through parents and through the closures of the functions they
    // hold. Both are unlinked through a worklist instead of recursively.
    fn drop(&mut self) {
        let mut environments: Vec<Rc<RefCell<Environment>>> = self.parent.take().into_iter().collect();
        let mut values: Vec<Value> = self.variables.drain().map(|(_, value)| value).collect();

        loop {
            if let Some(value) = values.pop() {
                match value {
                    Value::Function(function) => if let Ok(function) = Rc::try_unwrap(function) {
                        environments.push(function.closure);
                    },
                    Value::StructInstance(instance) => if let Ok(instance) = Rc::try_unwrap(instance) {
                        values.extend(instance.into_inner().values);
                    },
                    _ => {},
                }
            } else if let Some(environment) = environments.pop() {
                if let Ok(cell) = Rc::try_unwrap(environment) {
                    let mut environment = cell.into_inner();
                    environments.extend(environment.parent.take());
                    values.extend(environment.variables.drain().map(|(_, value)| value));
                }
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests;
