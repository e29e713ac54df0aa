use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// A resolved template value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Int(i64),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Int(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&Path> for Value {
    fn from(path: &Path) -> Self {
        Value::Text(path.to_string_lossy().replace('\\', "/"))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Int(n as i64)
    }
}

pub type Resolver = Arc<dyn Fn() -> Value + Send + Sync>;
pub type ContextResolver = Arc<dyn Fn(&TemplateContext) -> Value + Send + Sync>;

/// A template variable: either an eager value or a deferred resolver
#[derive(Clone)]
pub enum Variable {
    Literal(Value),
    /// Evaluated with no arguments at generation time
    Resolver(Resolver),
    /// Evaluated with the whole, not yet resolved, context at generation time
    ContextResolver(ContextResolver),
}

impl Variable {
    pub fn resolver(f: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        Variable::Resolver(Arc::new(f))
    }

    pub fn context_resolver(f: impl Fn(&TemplateContext) -> Value + Send + Sync + 'static) -> Self {
        Variable::ContextResolver(Arc::new(f))
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Variable::Resolver(_) => f.write_str("Resolver(..)"),
            Variable::ContextResolver(_) => f.write_str("ContextResolver(..)"),
        }
    }
}

impl From<Value> for Variable {
    fn from(value: Value) -> Self {
        Variable::Literal(value)
    }
}

impl From<&str> for Variable {
    fn from(s: &str) -> Self {
        Variable::Literal(s.into())
    }
}

impl From<String> for Variable {
    fn from(s: String) -> Self {
        Variable::Literal(s.into())
    }
}

impl From<&Path> for Variable {
    fn from(path: &Path) -> Self {
        Variable::Literal(path.into())
    }
}

impl From<i64> for Variable {
    fn from(n: i64) -> Self {
        Variable::Literal(n.into())
    }
}

impl From<usize> for Variable {
    fn from(n: usize) -> Self {
        Variable::Literal(n.into())
    }
}

/// Named variables available to a template
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    vars: BTreeMap<String, Variable>,
}

impl TemplateContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, var: impl Into<Variable>) -> &mut Self {
        self.vars.insert(name.into(), var.into());
        self
    }

    pub fn with(mut self, name: impl Into<String>, var: impl Into<Variable>) -> Self {
        self.set(name, var);
        self
    }

    pub fn extend(&mut self, vars: impl IntoIterator<Item = (String, Variable)>) {
        self.vars.extend(vars);
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Variable> {
        self.vars.remove(name)
    }

    /// Literal value of a variable; resolvers are not evaluated
    pub fn literal(&self, name: &str) -> Option<&Value> {
        match self.vars.get(name) {
            Some(Variable::Literal(v)) => Some(v),
            _ => None,
        }
    }

    pub fn literal_int(&self, name: &str) -> Option<i64> {
        self.literal(name).and_then(Value::as_int)
    }

    pub fn literal_text(&self, name: &str) -> Option<&str> {
        self.literal(name).and_then(Value::as_text)
    }

    /// Evaluate every variable into its final string form.
    ///
    /// Keys are visited in sorted order and context resolvers only see the
    /// unresolved context, so the result does not depend on evaluation order.
    pub fn resolve(&self) -> BTreeMap<String, String> {
        self.vars
            .iter()
            .map(|(name, var)| {
                let value = match var {
                    Variable::Literal(v) => v.clone(),
                    Variable::Resolver(f) => f(),
                    Variable::ContextResolver(f) => f(self),
                };
                (name.clone(), value.to_string())
            })
            .collect()
    }
}
