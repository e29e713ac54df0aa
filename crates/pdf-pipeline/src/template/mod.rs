//! Filename and path templates
//!
//! Templates use `$name` or `${name}` placeholders and `$$` for a literal
//! dollar sign. Placeholders are looked up in the resolved
//! [`TemplateContext`] first and in the process environment second.

mod context;
pub mod variables;

pub use context::{ContextResolver, Resolver, TemplateContext, Value, Variable};

use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Missing template variable: {0}")]
    MissingVariable(String),
    #[error("Invalid placeholder at byte {position} in template `{template}`")]
    InvalidPlaceholder { template: String, position: usize },
}

/// Expand `template` against `context` and the process environment.
///
/// With `safe` set, unknown or malformed placeholders are copied to the
/// output unchanged instead of failing.
pub fn generate(template: &str, context: &TemplateContext, safe: bool) -> Result<String, TemplateError> {
    generate_with_env(template, context, safe, |name| std::env::var(name).ok())
}

/// Same as [`generate`] with an explicit environment lookup
pub fn generate_with_env<E>(
    template: &str,
    context: &TemplateContext,
    safe: bool,
    env: E,
) -> Result<String, TemplateError>
where
    E: Fn(&str) -> Option<String>,
{
    let resolved = context.resolve();
    substitute(template, &resolved, safe, &env)
}

fn substitute<E>(
    template: &str,
    vars: &BTreeMap<String, String>,
    safe: bool,
    env: &E,
) -> Result<String, TemplateError>
where
    E: Fn(&str) -> Option<String>,
{
    let lookup = |name: &str| vars.get(name).cloned().or_else(|| env(name));
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        }

        // (name, length of the placeholder after the '$')
        let placeholder = if let Some(braced) = after.strip_prefix('{') {
            braced
                .find('}')
                .filter(|&end| is_identifier(&braced[..end]))
                .map(|end| (&braced[..end], end + 2))
        } else {
            let len = identifier_len(after);
            (len > 0).then(|| (&after[..len], len))
        };

        let len = match placeholder {
            Some((name, len)) => {
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None if safe => out.push_str(&rest[pos..pos + 1 + len]),
                    None => return Err(TemplateError::MissingVariable(name.to_string())),
                }
                len
            }
            None if safe => {
                out.push('$');
                0
            }
            None => {
                return Err(TemplateError::InvalidPlaceholder {
                    template: template.to_string(),
                    position: template.len() - rest.len() + pos,
                });
            }
        };

        rest = &after[len..];
    }

    out.push_str(rest);
    Ok(out)
}

fn identifier_len(s: &str) -> usize {
    let mut chars = s.char_indices();
    match chars.next() {
        Some((_, c)) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return 0,
    }
    chars
        .find(|(_, c)| !(*c == '_' || c.is_ascii_alphanumeric()))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && identifier_len(s) == s.len()
}

/// Repeated name generation over one owned context
#[derive(Debug, Clone, Default)]
pub struct NameGenerator {
    context: TemplateContext,
    safe: bool,
}

impl NameGenerator {
    pub fn new(context: TemplateContext) -> Self {
        Self {
            context,
            safe: true,
        }
    }

    pub fn strict(mut self) -> Self {
        self.safe = false;
        self
    }

    pub fn set(&mut self, name: impl Into<String>, var: impl Into<Variable>) {
        self.context.set(name, var);
    }

    pub fn context(&self) -> &TemplateContext {
        &self.context
    }

    pub fn generate(&self, template: &str) -> Result<String, TemplateError> {
        generate(template, &self.context, self.safe)
    }
}
