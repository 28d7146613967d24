use crate::interpreter::builtins::default_globals;
use crate::interpreter::lexer::tokenize;
use crate::interpreter::parser::parse;
use super::*;

fn program(source: &str) -> Expr {
    parse(tokenize(source).expect("source should lex")).expect("source should parse")
}

fn run(source: &str) -> Result<Value, RuntimeError> {
    Evaluator::new(default_globals()).evaluate(&program(source))
}

fn value(source: &str) -> Value {
    run(source).expect("program should succeed")
}

fn failure(source: &str) -> RuntimeError {
    run(source).expect_err("program should fail")
}

mod arithmetic {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    pub fn test_precedence() {
        assert_eq!(value("2 + 3 * 4"), Value::Int(14));
        assert_eq!(value("2 ^ 3 ^ 2"), Value::Int(512));
        assert_eq!(value("-2 ^ 2"), Value::Int(-4));
        assert_eq!(value("(2 + 3) * 4"), Value::Int(20));
    }

    #[test]
    pub fn test_division() {
        assert_eq!(value("7 / 2"), Value::Float(3.5));
        assert_eq!(value("-7 / 2"), Value::Float(-3.5));
        assert_eq!(value("6 / 3"), Value::Int(2));
        assert_eq!(value("7.0 / 2"), Value::Float(3.5));
        assert_eq!(value("(0 - 9223372036854775807 - 1) / -1"), Value::Float(9223372036854775808.0));
    }

    #[test]
    pub fn test_power() {
        assert_eq!(value("2 ^ 10"), Value::Int(1024));
        assert_eq!(value("2 ^ -1"), Value::Float(0.5));
        assert_eq!(value("4 ^ 0.5"), Value::Float(2.0));
        assert!(matches!(value("2 ^ 63"), Value::Float(_)));
    }

    #[test]
    pub fn test_overflow_falls_back_to_float() {
        assert!(matches!(value("9223372036854775807 + 1"), Value::Float(_)));
        assert!(matches!(value("-9223372036854775807 - 2"), Value::Float(_)));
    }

    #[test]
    pub fn test_strings() {
        assert_eq!(value("'ab' + 'c'"), Value::str("abc"));
        assert_eq!(value("'ab' * 3"), Value::str("ababab"));
        assert_eq!(value("2 * 'x'"), Value::str("xx"));
        assert_eq!(failure("'ab' * -1").kind, ErrorKind::TypeError);
        assert_eq!(failure("'ab' * 9223372036854775807").kind, ErrorKind::TypeError);
        assert_eq!(value("'' * 9223372036854775807"), Value::str(""));
    }

    #[test]
    pub fn test_division_by_zero() {
        let error = failure("1 + (2 / 0)");

        assert_eq!(error.kind, ErrorKind::DivisionByZero);
        assert_eq!(error.pos, TokenPos::new(1, 8));
        assert_eq!(failure("1.5 / 0.0").kind, ErrorKind::DivisionByZero);
    }

    #[test]
    pub fn test_operand_types() {
        assert_eq!(failure("'a' - 1").kind, ErrorKind::TypeError);
        assert_eq!(failure("-'a'").kind, ErrorKind::TypeError);
        assert_eq!(failure("null + 1").to_string(), "TypeError: Unsupported operand types for +: 'null' and 'int'");
    }
}

mod comparisons {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    pub fn test_equality() {
        assert_eq!(value("1 == 1.0"), Value::Bool(true));
        assert_eq!(value("'a' != 'b'"), Value::Bool(true));
        assert_eq!(value("null == null"), Value::Bool(true));
        assert_eq!(value("'a' == null"), Value::Bool(false));
        assert_eq!(failure("1 == 'a'").kind, ErrorKind::TypeError);
    }

    #[test]
    pub fn test_ordering() {
        assert_eq!(value("1 < 2.5"), Value::Bool(true));
        assert_eq!(value("'abc' < 'abd'"), Value::Bool(true));
        assert_eq!(value("3 >= 3"), Value::Bool(true));
        assert_eq!(failure("1 < 'a'").kind, ErrorKind::TypeError);
    }

    #[test]
    pub fn test_identity() {
        assert_eq!(value("struct P(x) set a = P(1) set b = P(1) a == b"), Value::Bool(false));
        assert_eq!(value("struct P(x) set a = P(1) set b = a b == a"), Value::Bool(true));
    }
}

mod logic {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    pub fn test_short_circuit() {
        assert_eq!(value("false and undefined"), Value::Bool(false));
        assert_eq!(value("true or undefined"), Value::Bool(true));
        assert_eq!(failure("true and undefined").kind, ErrorKind::NameError);
    }

    #[test]
    pub fn test_truthiness() {
        assert_eq!(value("0 or ''"), Value::Bool(true));
        assert_eq!(value("0.0 or null"), Value::Bool(false));
        assert_eq!(value("not 0"), Value::Bool(true));
        assert_eq!(value("not 'x'"), Value::Bool(false));
    }
}

mod scoping {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    pub fn test_assignment_yields_value() {
        assert_eq!(value("set x = 5"), Value::Int(5));
        assert_eq!(value("set x = set y = 2 x + y"), Value::Int(4));
    }

    #[test]
    pub fn test_undefined_variable() {
        let error = failure("foo");

        assert_eq!(error.kind, ErrorKind::NameError);
        assert_eq!(error.pos, TokenPos::new(1, 1));
        assert_eq!(error.message, "Undefined variable 'foo'");
    }

    #[test]
    pub fn test_closure_keeps_defining_value() {
        assert_eq!(value("set x = 1 fun get() -> x set x = 2 get()"), Value::Int(1));
        assert_eq!(value("set x = 1 fun get() -> x set x = 2 x"), Value::Int(2));
    }

    #[test]
    pub fn test_returned_closure() {
        assert_eq!(value("fun adder(n) -> fun(x) -> x + n set add2 = adder(2) add2(3)"), Value::Int(5));
    }

    #[test]
    pub fn test_set_in_function_shadows() {
        assert_eq!(value("set x = 1 fun f() -> (set x = 2 x) f() * 10 + x"), Value::Int(21));
    }

    #[test]
    pub fn test_state_is_shared_through_structs() {
        assert_eq!(value("struct Cell(v) set c = Cell(0) fun inc() -> set c.v = c.v + 1 inc() inc() c.v"), Value::Int(2));
    }

    #[test]
    pub fn test_environment_persists_between_programs() {
        let mut evaluator = Evaluator::new(default_globals());

        evaluator.evaluate(&program("set x = 2")).expect("first program should succeed");
        assert_eq!(evaluator.evaluate(&program("x * 3")), Ok(Value::Int(6)));
    }
}

mod functions {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    pub fn test_recursion() {
        assert_eq!(value("fun fact(n) -> if n <= 1 then 1 el n * fact(n - 1) fact(10)"), Value::Int(3628800));
        assert_eq!(value("set fib = fun(n) -> if n < 2 then n el fib(n - 1) + fib(n - 2) fib(15)"), Value::Int(610));
    }

    #[test]
    pub fn test_return() {
        let source = "fun sign(x) -> (if x > 0 then return 'pos' el () 'other') ";

        assert_eq!(value(&format!("{}sign(1)", source)), Value::str("pos"));
        assert_eq!(value(&format!("{}sign(-1)", source)), Value::str("other"));
        assert_eq!(value("fun f() -> (return) f()"), Value::Null);
    }

    #[test]
    pub fn test_top_level_return_ends_program() {
        assert_eq!(value("return 5 undefined"), Value::Int(5));
    }

    #[test]
    pub fn test_recursion_limit() {
        let mut evaluator = Evaluator::new(default_globals()).with_max_depth(50);
        let error = evaluator.evaluate(&program("fun down(n) -> down(n + 1) down(0)")).unwrap_err();

        assert_eq!(error.kind, ErrorKind::RecursionLimit);
        assert_eq!(error.trace.len(), 50);
        assert!(error.trace.iter().all(|frame| frame.name == "down"));
    }

    #[test]
    pub fn test_call_errors() {
        assert_eq!(failure("5(1)").kind, ErrorKind::TypeError);
        assert_eq!(failure("fun f(a) -> a f(1, 2)").kind, ErrorKind::ArityError);
        assert_eq!(failure("fun f(a) -> a f(a: 1)").kind, ErrorKind::TypeError);
        assert_eq!(failure("int(1, 2)").kind, ErrorKind::ArityError);
    }

    #[test]
    pub fn test_traceback() {
        let error = failure("fun inner() -> 1 / 0 fun outer() -> inner() outer()");
        let names: Vec<&str> = error.trace.iter().map(|frame| frame.name.as_str()).collect();

        assert_eq!(error.kind, ErrorKind::DivisionByZero);
        assert_eq!(names, vec!["outer", "inner"]);
        assert_eq!(error.trace[0].call_site, TokenPos::new(1, 45));
    }

    #[test]
    pub fn test_display() {
        assert_eq!(value("str(fun(x) -> x)"), Value::str("<fun>"));
        assert_eq!(value("set f = fun(x) -> x str(f)"), Value::str("<fun f>"));
        assert_eq!(value("str(print)"), Value::str("<builtin print>"));
        assert_eq!(value("type(1.5)"), Value::str("float"));
    }
}

mod control_flow {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    pub fn test_if_chain() {
        let source = "fun classify(x) -> if x < 0 then 'neg' eli x == 0 then 'zero' el 'pos' ";

        assert_eq!(value(&format!("{}classify(-3)", source)), Value::str("neg"));
        assert_eq!(value(&format!("{}classify(0)", source)), Value::str("zero"));
        assert_eq!(value(&format!("{}classify(3)", source)), Value::str("pos"));
        assert_eq!(value("if false then 1"), Value::Null);
        assert_eq!(value("if false then 1 eli then 2"), Value::Int(2));
    }

    #[test]
    pub fn test_for_values() {
        assert_eq!(value("for i = 0 to 5 then i * 2"), Value::Int(8));
        assert_eq!(value("for i = 3 to 0 then i"), Value::Int(1));
        assert_eq!(value("for i = 0 to 10 step 3 then i"), Value::Int(9));
        assert_eq!(value("for i = 0 to 1 step 0.5 then i"), Value::Float(0.5));
        assert_eq!(value("for i = 0 to 0 then i"), Value::Null);
    }

    #[test]
    pub fn test_for_errors() {
        assert_eq!(failure("for i = 0 to 3 step 0 then i").kind, ErrorKind::TypeError);
        assert_eq!(failure("for i = 'a' to 3 then i").kind, ErrorKind::TypeError);
        assert_eq!(failure("for i = 0 to 3 step 'x' then i").kind, ErrorKind::TypeError);
    }

    #[test]
    pub fn test_for_step_follows_body() {
        // the first pass uses the direction from `from` to `to`, the step only decides later ones
        assert_eq!(value("for i = 0 to 10 step -1 then i"), Value::Int(0));
        assert_eq!(value("for i = 0 to 0 step 0 then i"), Value::Null);
    }

    #[test]
    pub fn test_loop_variable_is_scoped() {
        assert_eq!(failure("for i = 0 to 3 then i i").kind, ErrorKind::NameError);
    }

    #[test]
    pub fn test_while() {
        assert_eq!(value("set n = 3 set acc = 0 while n > 0 then (set acc = acc + n set n = n - 1) acc"), Value::Int(6));
        assert_eq!(value("while false then 1"), Value::Null);
    }
}

mod structs {
    use super::*;
    use pretty_assertions::assert_eq;

    const POINT: &str = "struct Point(x: int, y: float) ";

    fn point(source: &str) -> Result<Value, RuntimeError> {
        run(&format!("{}{}", POINT, source))
    }

    #[test]
    pub fn test_construction() {
        assert_eq!(point("Point(x: 1, y: 2).y"), Ok(Value::Float(2.0)));
        assert_eq!(point("Point(y: 2.5, x: 1).x"), Ok(Value::Int(1)));
        assert_eq!(point("Point(3, 4.5).y"), Ok(Value::Float(4.5)));
        assert_eq!(point("str(Point(x: 1, y: 2))"), Ok(Value::str("Point(x: 1, y: 2.0)")));
    }

    #[test]
    pub fn test_construction_errors() {
        assert_eq!(point("Point(x: 1)").map_err(|error| error.kind), Err(ErrorKind::NameError));
        assert_eq!(point("Point(x: 1, y: 2, z: 3)").map_err(|error| error.kind), Err(ErrorKind::NameError));
        assert_eq!(point("Point(x: 1, x: 2)").map_err(|error| error.kind), Err(ErrorKind::NameError));
        assert_eq!(point("Point(x: 'a', y: 1.0)").map_err(|error| error.kind), Err(ErrorKind::TypeError));
        assert_eq!(point("Point(1)").map_err(|error| error.kind), Err(ErrorKind::ArityError));
        assert_eq!(point("Point(1, y: 2)").map_err(|error| error.kind), Err(ErrorKind::TypeError));
    }

    #[test]
    pub fn test_member_access() {
        assert_eq!(point("Point(1, 2.0).z").map_err(|error| error.kind), Err(ErrorKind::NameError));
        assert_eq!(failure("5.x").kind, ErrorKind::TypeError);
    }

    #[test]
    pub fn test_member_set() {
        assert_eq!(point("set p = Point(1, 2.0) set p.x = 7 p.x"), Ok(Value::Int(7)));
        assert_eq!(point("set p = Point(1, 2.0) set p.y = 3 p.y"), Ok(Value::Float(3.0)));
        assert_eq!(point("set p = Point(1, 2.0) set p.x = 1.5").map_err(|error| error.kind), Err(ErrorKind::TypeError));
    }

    #[test]
    pub fn test_nested_struct_fields() {
        let source = "struct Node(value: int, next: Node) set list = Node(1, Node(2, null)) ";

        assert_eq!(value(&format!("{}list.next.value", source)), Value::Int(2));
        assert_eq!(value(&format!("{}set list.next.value = 5 list.next.value", source)), Value::Int(5));
        assert_eq!(failure("struct Node(next: Node) Node(1)").kind, ErrorKind::TypeError);
    }

    #[test]
    pub fn test_anonymous_struct_takes_assigned_name() {
        assert_eq!(value("set Pair = struct(a, b) type(Pair(1, 2))"), Value::str("Pair"));
    }
}
