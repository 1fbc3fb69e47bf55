// File: src/interpreter/native_functions/system.rs
//
// System-related native functions (time).

use crate::interpreter::Value;
use std::time::{SystemTime, UNIX_EPOCH};

pub const NATIVES: &[(&str, usize)] = &[("clock", 0)];

pub fn handle(name: &str, _args: &[Value]) -> Option<Result<Value, String>> {
    let result = match name {
        // Seconds since the UNIX epoch, with sub-second precision
        "clock" => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| Value::Number(elapsed.as_secs_f64()))
            .map_err(|e| format!("System clock error: {}", e)),
        _ => return None,
    };
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_returns_a_positive_number() {
        match handle("clock", &[]) {
            Some(Ok(Value::Number(seconds))) => assert!(seconds > 0.0),
            other => panic!("unexpected clock result: {:?}", other),
        }
    }

    #[test]
    fn other_names_are_not_handled_here() {
        assert!(handle("print", &[]).is_none());
    }
}
