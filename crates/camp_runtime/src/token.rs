//! Deferred tokens embedded into resource definitions.
//!
//! A [`Token`] is a string whose parts may only be known at deploy time. It
//! has two renderings:
//!
//! - the string form (`Display`), where deferred parts appear as
//!   `${Fn::ImportValue:<export>}` or `{{resolve:secretstore:<name>:latest}}`
//! - the template form ([`Token::to_cfn`]), where output imports become
//!   `Fn::ImportValue` intrinsics joined with `Fn::Join`
//!
//! Secret lookups are dynamic references, which the deployment engine expands
//! inside plain strings, so both forms carry them as text.

use serde::{Serialize, Serializer};
use serde_json::{json, Value};

/// One piece of a token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Fragment {
    /// Text known at synthesis time.
    Literal(String),
    /// Import of another unit's stack output, by export name.
    Import(String),
    /// Deploy-time lookup of a secret-store entry, by name.
    SecretLookup(String),
}

impl Fragment {
    fn render(&self) -> String {
        match self {
            Fragment::Literal(s) => s.clone(),
            Fragment::Import(export) => format!("${{Fn::ImportValue:{}}}", export),
            Fragment::SecretLookup(name) => secret_reference(name),
        }
    }
}

/// Dynamic reference string for a secret-store entry.
pub fn secret_reference(secret_name: &str) -> String {
    format!("{{{{resolve:secretstore:{}:latest}}}}", secret_name)
}

/// A string value that may contain deploy-time references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Token {
    fragments: Vec<Fragment>,
}

impl Token {
    pub fn literal(value: impl Into<String>) -> Self {
        let mut token = Self::default();
        token.push(Fragment::Literal(value.into()));
        token
    }

    pub fn import(export_name: impl Into<String>) -> Self {
        Self {
            fragments: vec![Fragment::Import(export_name.into())],
        }
    }

    pub fn secret(secret_name: impl Into<String>) -> Self {
        Self {
            fragments: vec![Fragment::SecretLookup(secret_name.into())],
        }
    }

    /// Concatenate tokens in order.
    pub fn concat(parts: impl IntoIterator<Item = Token>) -> Self {
        let mut token = Self::default();
        for part in parts {
            token.append(part);
        }
        token
    }

    /// Append another token, merging adjacent literals.
    pub fn append(&mut self, other: Token) {
        for fragment in other.fragments {
            self.push(fragment);
        }
    }

    fn push(&mut self, fragment: Fragment) {
        if let Fragment::Literal(text) = &fragment {
            if text.is_empty() {
                return;
            }
            if let Some(Fragment::Literal(last)) = self.fragments.last_mut() {
                last.push_str(text);
                return;
            }
        }
        self.fragments.push(fragment);
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Whether the token is fully known at synthesis time.
    pub fn is_literal(&self) -> bool {
        self.fragments
            .iter()
            .all(|f| matches!(f, Fragment::Literal(_)))
    }

    /// The plain value, if the token holds no deferred parts.
    pub fn as_literal(&self) -> Option<&str> {
        match self.fragments.as_slice() {
            [] => Some(""),
            [Fragment::Literal(s)] => Some(s.as_str()),
            _ => None,
        }
    }

    /// Render the token for a deployment template.
    pub fn to_cfn(&self) -> Value {
        let mut parts: Vec<Value> = Vec::new();
        let mut text = String::new();

        for fragment in &self.fragments {
            match fragment {
                Fragment::Import(export) => {
                    if !text.is_empty() {
                        parts.push(Value::String(std::mem::take(&mut text)));
                    }
                    parts.push(json!({ "Fn::ImportValue": export }));
                }
                other => text.push_str(&other.render()),
            }
        }
        if !text.is_empty() {
            parts.push(Value::String(text));
        }

        match parts.len() {
            0 => Value::String(String::new()),
            1 => parts.remove(0),
            _ => json!({ "Fn::Join": ["", parts] }),
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for fragment in &self.fragments {
            write!(f, "{}", fragment.render())?;
        }
        Ok(())
    }
}

impl Serialize for Token {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_cfn().serialize(serializer)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::literal(value)
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::literal(value)
    }
}
