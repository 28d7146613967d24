use super::*;
use crate::interpreter::ast::{Expr, Literal};
use crate::interpreter::lexer::TokenPos;
use crate::interpreter::value::Function;

mod scopes {
    use super::*;

    #[test]
    pub fn test_lookup_walks_parents() {
        let global = Environment::new_global();
        Environment::define(&global, "x", Value::Int(1));

        let child = Environment::new_with_parent(Rc::clone(&global));

        assert_eq!(child.borrow().lookup("x", RecursionToParent::Always), Some(Value::Int(1)));
        assert_eq!(child.borrow().lookup("x", RecursionToParent::Never), None);
        assert_eq!(child.borrow().lookup("y", RecursionToParent::Always), None);
    }

    #[test]
    pub fn test_define_shadows_in_current_scope() {
        let global = Environment::new_global();
        Environment::define(&global, "x", Value::Int(1));

        let child = Environment::new_with_parent(Rc::clone(&global));
        let target = Environment::define(&child, "x", Value::Int(2));

        assert!(Rc::ptr_eq(&target, &child));
        assert_eq!(child.borrow().lookup("x", RecursionToParent::Always), Some(Value::Int(2)));
        assert_eq!(global.borrow().lookup("x", RecursionToParent::Always), Some(Value::Int(1)));
    }

    #[test]
    pub fn test_uncaptured_frame_is_overwritten_in_place() {
        let global = Environment::new_global();

        for value in 0..10 {
            let target = Environment::define(&global, "i", Value::Int(value));
            assert!(Rc::ptr_eq(&target, &global));
        }

        assert_eq!(global.borrow().lookup("i", RecursionToParent::Never), Some(Value::Int(9)));
    }
}

mod captures {
    use super::*;

    #[test]
    pub fn test_captured_frame_keeps_old_value() {
        let global = Environment::new_global();
        Environment::define(&global, "x", Value::Int(1));
        Environment::capture(&global);

        let current = Environment::define(&global, "x", Value::Int(2));

        assert!(!Rc::ptr_eq(&current, &global));
        assert_eq!(global.borrow().lookup("x", RecursionToParent::Always), Some(Value::Int(1)));
        assert_eq!(current.borrow().lookup("x", RecursionToParent::Always), Some(Value::Int(2)));

        // the new frame is writable until it is captured itself
        let again = Environment::define(&current, "x", Value::Int(3));
        assert!(Rc::ptr_eq(&again, &current));
    }

    #[test]
    pub fn test_capture_marks_ancestors() {
        let global = Environment::new_global();
        let outer = Environment::new_with_parent(Rc::clone(&global));
        let inner = Environment::new_with_parent(Rc::clone(&outer));

        Environment::capture(&inner);

        for frame in [&inner, &outer, &global] {
            let target = Environment::define(frame, "x", Value::Int(1));
            assert!(!Rc::ptr_eq(&target, frame));
            assert_eq!(frame.borrow().lookup("x", RecursionToParent::Never), None);
        }
    }

    #[test]
    pub fn test_copied_frame_shares_parent() {
        let global = Environment::new_global();
        Environment::define(&global, "g", Value::Int(0));

        let outer = Environment::new_with_parent(Rc::clone(&global));
        Environment::define(&outer, "x", Value::Int(1));
        Environment::capture(&outer);

        let current = Environment::define(&outer, "y", Value::Int(2));

        assert!(current.borrow().parent.as_ref().map(|parent| Rc::ptr_eq(parent, &global)).unwrap_or(false));
        assert_eq!(current.borrow().lookup("x", RecursionToParent::Never), Some(Value::Int(1)));
        assert_eq!(current.borrow().lookup("g", RecursionToParent::Always), Some(Value::Int(0)));
        assert_eq!(outer.borrow().lookup("y", RecursionToParent::Never), None);
    }

    fn closure_over(environment: &Rc<RefCell<Environment>>) -> Value {
        Environment::capture(environment);

        Value::Function(Rc::new(Function {
            name: None,
            params: Vec::new(),
            body: Rc::new(Expr::Literal { value: Literal::Null, pos: TokenPos::default() }),
            closure: Rc::clone(environment),
        }))
    }

    #[test]
    pub fn test_closure_chain_drops() {
        let global = Environment::new_global();
        let mut current = Rc::clone(&global);

        // every frame holds a function whose closure is the previous frame
        for value in 0..200_000 {
            let function = closure_over(&current);
            current = Environment::define(&current, "f", function);
            current = Environment::define(&current, "i", Value::Int(value));
        }

        assert!(current.borrow().parent.is_none());
        assert_eq!(current.borrow().lookup("i", RecursionToParent::Never), Some(Value::Int(199_999)));
        drop(current);
        assert_eq!(Rc::strong_count(&global), 1);
    }
}
