//! The block language: a small, restricted statement language run by code blocks.
//!
//! Blocks can assign, update and delete names in the session [`Namespace`]
//! and call a handful of numeric and string built-ins. There is no I/O, no
//! looping and no access to anything outside the namespace, so templates do
//! not have to be trusted to the degree a general-purpose interpreter would
//! require.
//!
//! ```text
//! a = 9
//! b = 3.2
//! a *= b          # a is now 28.8
//! label = "run " + str(round(a))
//! ```

pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod value;

pub use error::ScriptError;
pub use eval::{eval_expr, execute};
pub use parser::{parse, Program};
pub use value::Value;

use crate::executor::BlockEngine;
use crate::namespace::Namespace;

/// The default [`BlockEngine`]: parses block source and executes it with [`execute`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptEngine;

impl ScriptEngine {
    pub fn new() -> Self {
        Self
    }
}

impl BlockEngine for ScriptEngine {
    fn name(&self) -> &'static str {
        "calc"
    }

    fn check(&self, source: &str) -> Result<(), ScriptError> {
        parse(source).map(|_| ())
    }

    fn execute(&self, source: &str, namespace: &mut Namespace) -> Result<(), ScriptError> {
        let program = parse(source)?;
        execute(&program, namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_executes_against_namespace() {
        let engine = ScriptEngine::new();
        let mut ns = Namespace::new();
        engine.execute("a = 9\nb = 3.2", &mut ns).unwrap();
        engine.execute("a *= b", &mut ns).unwrap();
        assert_eq!(ns.get("a"), Some(&Value::Float(28.8)));
    }

    #[test]
    fn test_engine_check_reports_syntax_only() {
        let engine = ScriptEngine::new();
        // undefined names are a runtime concern
        assert!(engine.check("a = missing + 1").is_ok());
        assert!(matches!(
            engine.check("a = = 1"),
            Err(ScriptError::Syntax { line: 1, .. })
        ));
    }
}
