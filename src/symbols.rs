use crate::error::{CalcError, ErrorKind, Span};

/// Constants every session starts with, in declaration order.
pub const BUILTINS: [(&str, f64); 2] = [("pi", 3.1415926535), ("e", 2.7182818284)];

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub value: f64,
}

impl Variable {
    pub fn new(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value,
        }
    }
}

/// Declared variables in declaration order. Names are unique; that is checked
/// when a name is defined, never on assignment.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    vars: Vec<Variable>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self { vars: Vec::new() }
    }

    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        for (name, value) in BUILTINS {
            table.vars.push(Variable::new(name, value));
        }
        table
    }

    pub fn get_value(&self, name: &str, span: Span) -> Result<f64, CalcError> {
        self.vars
            .iter()
            .find(|v| v.name == name)
            .map(|v| v.value)
            .ok_or_else(|| undefined(name, span))
    }

    pub fn set_value(&mut self, name: &str, value: f64, span: Span) -> Result<(), CalcError> {
        match self.vars.iter_mut().find(|v| v.name == name) {
            Some(var) => {
                var.value = value;
                Ok(())
            }
            None => Err(undefined(name, span)),
        }
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.vars.iter().any(|v| v.name == name)
    }

    pub fn define_name(&mut self, name: &str, value: f64, span: Span) -> Result<f64, CalcError> {
        if self.is_declared(name) {
            return Err(CalcError::new_with_help(
                ErrorKind::DuplicateDeclaration(name.to_string()),
                span,
                format!("'{}' already has a value; use a different name", name),
            ));
        }
        self.vars.push(Variable::new(name, value));
        Ok(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.vars.iter()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

fn undefined(name: &str, span: Span) -> CalcError {
    CalcError::new_with_help(
        ErrorKind::UndefinedVariable(name.to_string()),
        span,
        format!("declare it first: let {} = ...", name),
    )
}
