// File: src/interpreter/native_functions/mod.rs
//
// Built-in callables. Each category module exposes a registry of
// (name, arity) pairs and a `handle` that answers calls for the names it owns.

pub mod system;

use super::value::{NativeFunction, Value};

/// Every native the interpreter defines as a global at startup.
pub fn registry() -> Vec<NativeFunction> {
    system::NATIVES
        .iter()
        .map(|&(name, arity)| NativeFunction { name, arity })
        .collect()
}

/// Route a native call to the module that owns `name`.
///
/// Arity has already been checked by the caller.
pub fn call_native_function(name: &str, args: &[Value]) -> Result<Value, String> {
    if let Some(result) = system::handle(name, args) {
        return result;
    }
    Err(format!("Unknown native function '{}'.", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_lists_clock() {
        let natives = registry();
        assert!(natives.iter().any(|n| n.name == "clock" && n.arity == 0));
    }

    #[test]
    fn unknown_natives_are_reported() {
        assert_eq!(
            call_native_function("nope", &[]),
            Err("Unknown native function 'nope'.".to_string())
        );
    }
}
