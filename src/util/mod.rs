/// Minimum stack space to keep available before recursing further.
const RED_ZONE: usize = 100 * 1024;

/// Stack space allocated whenever the red zone is reached.
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Runs `f`, growing the native stack first if less than the red zone is left.
///
/// Wrapped around the recursive entry points of the parser and the evaluator,
/// so deeply nested source is bounded by the interpreter's recursion limit
/// rather than by the size of the main thread's stack.
#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
pub fn is_alphabetic(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[inline]
pub fn is_numeric(c: char) -> bool {
    c.is_ascii_digit()
}

#[inline]
pub fn is_alphanumeric(c: char) -> bool {
    is_alphabetic(c) || is_numeric(c)
}

/// Formats a float so that it always reads as one, e.g. `2.0` instead of `2`.
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.1}", value)
    } else if value.is_finite() && (value.abs() >= 1e15 || (value != 0.0 && value.abs() < 0.000_000_1)) {
        format!("{:E}", value)
    } else {
        format!("{}", value)
    }
}
