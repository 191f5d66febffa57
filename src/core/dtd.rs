//! DTD Entity Declarations
//!
//! Collects general entity declarations and resolves references to them.
//! Internal entities expand recursively (character references, predefined
//! entities, and nested declared entities); expansions are memoized in an
//! LRU cache. External and unparsed entities are never fetched and resolve
//! to `None`, which makes the decoder fall back to the literal reference.
//! So does an expansion that outgrows the size limit or nests too deeply.

use super::entities::{decode_char_ref, predefined, EntityResolver};
use lru::LruCache;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use tracing::warn;

/// Number of expanded entity values kept in memory
const EXPANSION_CACHE_SIZE: usize = 256;

/// Default cap on the decoded size of one entity expansion, in bytes
pub const DEFAULT_EXPANSION_LIMIT: usize = 1 << 20;

/// Nesting depth past which an expansion is refused
const MAX_EXPANSION_DEPTH: usize = 64;

/// A general entity declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityDecl {
    pub value: Option<String>,        // For internal entities
    pub system_id: Option<String>,    // For external entities
    pub public_id: Option<String>,    // For external entities
    pub ndata: Option<String>,        // For unparsed entities
    pub references: Vec<String>,      // Entities referenced in value
}

impl EntityDecl {
    /// An internal entity with literal replacement text
    pub fn internal(value: impl Into<String>) -> Self {
        let value = value.into();
        EntityDecl {
            references: extract_entity_references(&value),
            value: Some(value),
            ..Self::default()
        }
    }

    /// An external parsed entity
    pub fn external(system_id: impl Into<String>, public_id: Option<String>) -> Self {
        EntityDecl {
            system_id: Some(system_id.into()),
            public_id,
            ..Self::default()
        }
    }

    pub fn is_external(&self) -> bool {
        self.value.is_none()
    }
}

/// Declared general entities, usable as an [`EntityResolver`]
pub struct EntityTable {
    entities: HashMap<String, EntityDecl>,
    expansions: Mutex<LruCache<String, Option<String>>>,
    expansion_limit: usize,
}

impl EntityTable {
    pub fn new() -> Self {
        let capacity = NonZeroUsize::new(EXPANSION_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        EntityTable {
            entities: HashMap::new(),
            expansions: Mutex::new(LruCache::new(capacity)),
            expansion_limit: DEFAULT_EXPANSION_LIMIT,
        }
    }

    /// Cap the decoded size of any single expansion at `bytes`
    pub fn with_expansion_limit(mut self, bytes: usize) -> Self {
        self.expansion_limit = bytes;
        if let Ok(cache) = self.expansions.get_mut() {
            cache.clear();
        }
        self
    }

    pub fn expansion_limit(&self) -> usize {
        self.expansion_limit
    }

    /// Add an entity declaration. The first declaration of a name is
    /// binding; returns whether this one was recorded.
    pub fn declare(&mut self, name: impl Into<String>, decl: EntityDecl) -> bool {
        let name = name.into();
        if self.entities.contains_key(&name) {
            return false;
        }
        self.entities.insert(name, decl);
        // A new declaration can turn a failed expansion into a valid one
        if let Ok(mut cache) = self.expansions.lock() {
            cache.clear();
        }
        true
    }

    pub fn declare_internal(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        self.declare(name, EntityDecl::internal(value))
    }

    pub fn declare_external(
        &mut self,
        name: impl Into<String>,
        system_id: impl Into<String>,
        public_id: Option<String>,
    ) -> bool {
        self.declare(name, EntityDecl::external(system_id, public_id))
    }

    pub fn get(&self, name: &str) -> Option<&EntityDecl> {
        self.entities.get(name)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Collect the general entity declarations of a DTD internal subset.
    ///
    /// Other markup declarations and parameter entities are skipped.
    pub fn parse(subset: &str) -> Result<Self, String> {
        let mut table = EntityTable::new();
        let mut rest = subset;

        while let Some(at) = rest.find("<!ENTITY") {
            rest = skip_ws(&rest[at + "<!ENTITY".len()..]);

            if let Some(after_percent) = rest.strip_prefix('%') {
                // Parameter entity: not usable in content, skip it
                let end = find_decl_end(after_percent)
                    .ok_or("Unterminated parameter entity declaration")?;
                rest = &after_percent[end + 1..];
                continue;
            }

            let name_len = rest
                .find(|c: char| c.is_ascii_whitespace())
                .ok_or("Malformed entity declaration")?;
            let name = &rest[..name_len];
            rest = skip_ws(&rest[name_len..]);

            let decl = if let Some(after) = rest.strip_prefix("SYSTEM") {
                let (system_id, after) = read_quoted(skip_ws(after))?;
                rest = after;
                EntityDecl::external(system_id, None)
            } else if let Some(after) = rest.strip_prefix("PUBLIC") {
                let (public_id, after) = read_quoted(skip_ws(after))?;
                let (system_id, after) = read_quoted(skip_ws(after))?;
                rest = after;
                EntityDecl::external(system_id, Some(public_id.to_string()))
            } else {
                let (value, after) = read_quoted(rest)?;
                rest = after;
                EntityDecl::internal(value)
            };

            let mut decl = decl;
            rest = skip_ws(rest);
            if let Some(after) = rest.strip_prefix("NDATA") {
                let after = skip_ws(after);
                let notation_len = after
                    .find(|c: char| c.is_ascii_whitespace() || c == '>')
                    .unwrap_or(after.len());
                decl.ndata = Some(after[..notation_len].to_string());
                rest = &after[notation_len..];
            }

            let end = find_decl_end(rest).ok_or("Unterminated entity declaration")?;
            rest = &rest[end + 1..];
            table.declare(name, decl);
        }

        Ok(table)
    }

    /// Validate all declarations
    pub fn validate(&self) -> Result<(), String> {
        self.check_entity_recursion()
    }

    /// Check for circular entity references
    fn check_entity_recursion(&self) -> Result<(), String> {
        for name in self.entities.keys() {
            let mut visited = HashSet::new();
            let mut stack = vec![name.as_str()];

            while let Some(current) = stack.pop() {
                if !visited.insert(current) {
                    if current == name {
                        return Err(format!(
                            "Entity '{}' references itself (directly or indirectly)",
                            name
                        ));
                    }
                    continue;
                }

                if let Some(decl) = self.entities.get(current) {
                    for ref_name in &decl.references {
                        if ref_name == name {
                            return Err(format!(
                                "Entity '{}' references itself (directly or indirectly)",
                                name
                            ));
                        }
                        stack.push(ref_name);
                    }
                }
            }
        }
        Ok(())
    }

    /// Expand an internal entity
    fn expand(&self, name: &str) -> Option<String> {
        let mut out = String::new();
        self.expand_into(name, &mut Vec::new(), &mut out)?;
        Some(out)
    }

    /// Append the expansion of `name` to `out`, tracking the chain being
    /// expanded to reject cycles.
    fn expand_into(&self, name: &str, chain: &mut Vec<String>, out: &mut String) -> Option<()> {
        let decl = self.entities.get(name)?;
        if decl.ndata.is_some() || chain.iter().any(|n| n == name) {
            return None;
        }
        if chain.len() >= MAX_EXPANSION_DEPTH {
            warn!(entity = name, depth = chain.len(), "entity nesting too deep, not expanded");
            return None;
        }
        let value = decl.value.as_deref()?;

        chain.push(name.to_string());
        let expanded = self.expand_value(value, chain, out);
        chain.pop();
        expanded
    }

    fn expand_value(&self, value: &str, chain: &mut Vec<String>, out: &mut String) -> Option<()> {
        let mut rest = value;

        while let Some(amp) = rest.find('&') {
            self.push_bounded(out, &rest[..amp])?;
            let tail = &rest[amp..];
            let Some(semi) = tail.find(';') else {
                return self.push_bounded(out, tail);
            };
            let raw = &tail[..=semi];
            let name = &raw[1..semi];
            match decode_char_ref(raw) {
                Some(c) => {
                    let mut buf = [0; 4];
                    self.push_bounded(out, c.encode_utf8(&mut buf))?;
                }
                None if !name.is_empty() && !name.starts_with('#') => {
                    self.expand_into(name, chain, out)?;
                }
                None => return None,
            }
            rest = &tail[semi + 1..];
        }

        self.push_bounded(out, rest)
    }

    /// Append `text` unless the expansion would outgrow the limit
    fn push_bounded(&self, out: &mut String, text: &str) -> Option<()> {
        if out.len() + text.len() > self.expansion_limit {
            warn!(
                limit = self.expansion_limit,
                "entity expansion exceeds size limit, not expanded"
            );
            return None;
        }
        out.push_str(text);
        Some(())
    }
}

impl Default for EntityTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EntityTable {
    fn clone(&self) -> Self {
        let mut table = EntityTable::new().with_expansion_limit(self.expansion_limit);
        table.entities = self.entities.clone();
        table
    }
}

impl fmt::Debug for EntityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityTable")
            .field("entities", &self.entities)
            .finish_non_exhaustive()
    }
}

impl EntityResolver for EntityTable {
    fn resolve(&self, name: &str) -> Option<String> {
        if let Some(c) = predefined(name) {
            return Some(c.to_string());
        }

        if let Ok(mut cache) = self.expansions.lock() {
            if let Some(cached) = cache.get(name) {
                return cached.clone();
            }
        }

        let expanded = self.expand(name);
        if let Ok(mut cache) = self.expansions.lock() {
            cache.put(name.to_string(), expanded.clone());
        }
        expanded
    }
}

/// Parse entity value and extract entity references
pub fn extract_entity_references(value: &str) -> Vec<String> {
    let mut refs = Vec::new();
    let bytes = value.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] == b'&' && pos + 1 < bytes.len() && bytes[pos + 1] != b'#' {
            // Entity reference (not character reference)
            pos += 1;
            let start = pos;
            while pos < bytes.len() && bytes[pos] != b';' {
                pos += 1;
            }
            if pos < bytes.len() && predefined(&value[start..pos]).is_none() {
                refs.push(value[start..pos].to_string());
            }
        }
        pos += 1;
    }

    refs
}

#[inline]
fn skip_ws(content: &str) -> &str {
    content.trim_start_matches([' ', '\t', '\n', '\r'])
}

/// Read a quoted literal, returning its content and the remaining input
fn read_quoted(input: &str) -> Result<(&str, &str), String> {
    let quote = match input.chars().next() {
        Some(q @ ('"' | '\'')) => q,
        _ => return Err("Expected quoted literal in entity declaration".to_string()),
    };
    let body = &input[1..];
    let end = body
        .find(quote)
        .ok_or_else(|| "Unterminated literal in entity declaration".to_string())?;
    Ok((&body[..end], &body[end + 1..]))
}

/// Find the closing '>' of a declaration, skipping quoted literals
fn find_decl_end(input: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, '>') => return Some(i),
            _ => {}
        }
    }
    None
}
