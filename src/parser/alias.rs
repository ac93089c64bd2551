//! Namespace alias bookkeeping for one document
//!
//! Schemas may declare `Alias="Self"` and refer to their own types as
//! `Self.Person`. Lookups substitute the aliased namespace before querying
//! the registry.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `alias -> namespace`. Blank aliases are ignored.
    pub fn register(&mut self, alias: &str, namespace: &str) {
        let alias = alias.trim();
        if alias.is_empty() {
            return;
        }
        self.aliases.insert(alias.to_string(), namespace.to_string());
    }

    /// The namespace an alias stands for, or the segment unchanged
    pub fn resolve<'a>(&'a self, namespace: &'a str) -> &'a str {
        self.aliases
            .get(namespace)
            .map(String::as_str)
            .unwrap_or(namespace)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Split `Namespace.Name` at the last dot
pub fn split_qualified(name: &str) -> Option<(&str, &str)> {
    let index = name.rfind('.')?;
    let (namespace, rest) = name.split_at(index);
    let local = &rest[1..];
    if namespace.is_empty() || local.is_empty() {
        return None;
    }
    Some((namespace, local))
}
