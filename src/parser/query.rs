//! Cached path queries over metadata elements.
//!
//! Capability annotations are read with small path expressions such as
//!
//! ```text
//! edm:Annotation[@Term='Org.OData.Capabilities.V1.InsertRestrictions']/edm:Record/edm:PropertyValue[@Property='Insertable']/@Bool
//! ```
//!
//! A large service document triggers the same handful of queries tens of
//! thousands of times, so each distinct query text is compiled once and the
//! compiled form is kept for the lifetime of the evaluator.
//!
//! Matching is by local name only: namespace prefixes in the query text are
//! dropped and element namespaces are ignored. The capability vocabulary has
//! no colliding local names.
//!
//! Absent paths produce empty results, never errors. Only malformed query
//! text fails, with [`ODataError::EvaluatorError`].

use std::collections::HashMap;

use crate::error::ODataError;

/// Local-name access over a document node
pub trait QueryNode<'a>: Copy {
    fn local_name(&self) -> &'a str;
    fn attribute(&self, local_name: &str) -> Option<&'a str>;
    fn child_elements(&self) -> Vec<Self>;
    /// Concatenated text of all descendants
    fn text(&self) -> String;
}

impl<'a, 'input: 'a> QueryNode<'a> for roxmltree::Node<'a, 'input> {
    fn local_name(&self) -> &'a str {
        self.tag_name().name()
    }

    fn attribute(&self, local_name: &str) -> Option<&'a str> {
        self.attributes()
            .find(|a| a.name() == local_name)
            .map(|a| a.value())
    }

    fn child_elements(&self) -> Vec<Self> {
        self.children().filter(|c| c.is_element()).collect()
    }

    fn text(&self) -> String {
        self.descendants()
            .filter(|n| n.is_text())
            .filter_map(|n| n.text())
            .collect()
    }
}

// ============================================================================
// Compiled query
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Attribute(String),
    Child(String),
}

/// `[operand = 'literal']`
#[derive(Debug, Clone, PartialEq, Eq)]
struct Predicate {
    operand: Operand,
    value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Element {
        name: String,
        predicates: Vec<Predicate>,
    },
    /// Only valid as the final step
    Attribute(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Query {
    steps: Vec<Step>,
}

/// Result of running a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult<N> {
    Elements(Vec<N>),
    Values(Vec<String>),
}

impl Query {
    pub(crate) fn parse(text: &str) -> Result<Self, ODataError> {
        QueryParser::new(text).parse()
    }

    fn evaluate<'a, N: QueryNode<'a>>(&self, node: N) -> QueryResult<N> {
        let mut current = vec![node];
        for step in &self.steps {
            match step {
                Step::Element { name, predicates } => {
                    current = current
                        .iter()
                        .flat_map(|n| n.child_elements())
                        .filter(|c| c.local_name() == name)
                        .filter(|c| predicates.iter().all(|p| p.matches(*c)))
                        .collect();
                    if current.is_empty() {
                        break;
                    }
                }
                Step::Attribute(name) => {
                    return QueryResult::Values(
                        current
                            .iter()
                            .filter_map(|n| n.attribute(name))
                            .map(str::to_string)
                            .collect(),
                    );
                }
            }
        }
        if self.selects_attribute() {
            return QueryResult::Values(Vec::new());
        }
        QueryResult::Elements(current)
    }

    fn selects_attribute(&self) -> bool {
        matches!(self.steps.last(), Some(Step::Attribute(_)))
    }
}

impl Predicate {
    fn matches<'a, N: QueryNode<'a>>(&self, node: N) -> bool {
        match &self.operand {
            Operand::Attribute(name) => node.attribute(name) == Some(self.value.as_str()),
            Operand::Child(name) => node
                .child_elements()
                .iter()
                .any(|c| c.local_name() == name && c.text().trim() == self.value),
        }
    }
}

// ============================================================================
// Query text parser
// ============================================================================

struct QueryParser<'q> {
    text: &'q str,
    chars: Vec<char>,
    pos: usize,
}

impl<'q> QueryParser<'q> {
    fn new(text: &'q str) -> Self {
        Self {
            text,
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> ODataError {
        ODataError::EvaluatorError {
            query: self.text.to_string(),
            message: message.into(),
        }
    }

    fn parse(mut self) -> Result<Query, ODataError> {
        let mut steps = Vec::new();
        loop {
            self.skip_whitespace();
            if self.eat('@') {
                steps.push(Step::Attribute(self.name()?));
            } else {
                let name = self.name()?;
                let mut predicates = Vec::new();
                self.skip_whitespace();
                while self.eat('[') {
                    predicates.push(self.predicate()?);
                    self.skip_whitespace();
                }
                steps.push(Step::Element { name, predicates });
            }

            self.skip_whitespace();
            if self.is_at_end() {
                break;
            }
            if !self.eat('/') {
                return Err(self.error(format!("unexpected '{}' at {}", self.chars[self.pos], self.pos)));
            }
            if matches!(steps.last(), Some(Step::Attribute(_))) {
                return Err(self.error("an attribute must be the last step"));
            }
        }
        Ok(Query { steps })
    }

    fn predicate(&mut self) -> Result<Predicate, ODataError> {
        self.skip_whitespace();
        let operand = if self.eat('@') {
            Operand::Attribute(self.name()?)
        } else {
            Operand::Child(self.name()?)
        };
        self.skip_whitespace();
        if !self.eat('=') {
            return Err(self.error("expected '=' in predicate"));
        }
        self.skip_whitespace();
        let value = self.literal()?;
        self.skip_whitespace();
        if !self.eat(']') {
            return Err(self.error("unterminated predicate"));
        }
        Ok(Predicate { operand, value })
    }

    /// A local name; any `prefix:` is dropped
    fn name(&mut self) -> Result<String, ODataError> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        let local = raw.rsplit(':').next().unwrap_or_default();
        if local.is_empty() {
            return Err(self.error(format!("expected a name at {}", start)));
        }
        Ok(local.to_string())
    }

    fn literal(&mut self) -> Result<String, ODataError> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quoted literal")),
        };
        self.pos += 1;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == quote {
                let value = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                return Ok(value);
            }
            self.pos += 1;
        }
        Err(self.error("unterminated literal"))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }
}

// ============================================================================
// Evaluator
// ============================================================================

/// Query evaluator with a compile cache keyed by the literal query text
#[derive(Debug, Default)]
pub struct ExpressionEvaluator {
    cache: HashMap<String, Query>,
}

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct queries compiled so far
    pub fn cached_queries(&self) -> usize {
        self.cache.len()
    }

    fn compiled(&mut self, query: &str) -> Result<&Query, ODataError> {
        if !self.cache.contains_key(query) {
            let parsed = Query::parse(query)?;
            self.cache.insert(query.to_string(), parsed);
        }
        self.cache
            .get(query)
            .ok_or_else(|| ODataError::EvaluatorError {
                query: query.to_string(),
                message: "query missing from cache".to_string(),
            })
    }

    pub fn evaluate<'a, N: QueryNode<'a>>(
        &mut self,
        node: N,
        query: &str,
    ) -> Result<QueryResult<N>, ODataError> {
        Ok(self.compiled(query)?.evaluate(node))
    }

    /// Matching elements. Fails for queries that select an attribute.
    pub fn elements<'a, N: QueryNode<'a>>(
        &mut self,
        node: N,
        query: &str,
    ) -> Result<Vec<N>, ODataError> {
        match self.evaluate(node, query)? {
            QueryResult::Elements(elements) => Ok(elements),
            QueryResult::Values(_) => Err(ODataError::EvaluatorError {
                query: query.to_string(),
                message: "query selects attribute values, not elements".to_string(),
            }),
        }
    }

    /// Attribute values, or the trimmed text of matching elements
    pub fn strings<'a, N: QueryNode<'a>>(
        &mut self,
        node: N,
        query: &str,
    ) -> Result<Vec<String>, ODataError> {
        Ok(match self.evaluate(node, query)? {
            QueryResult::Values(values) => values.into_iter().map(|v| v.trim().to_string()).collect(),
            QueryResult::Elements(elements) => {
                elements.iter().map(|e| e.text().trim().to_string()).collect()
            }
        })
    }

    /// First match, if any
    pub fn string<'a, N: QueryNode<'a>>(
        &mut self,
        node: N,
        query: &str,
    ) -> Result<Option<String>, ODataError> {
        Ok(self.strings(node, query)?.into_iter().next())
    }

    /// First match, or `default` when nothing matches
    pub fn string_or<'a, N: QueryNode<'a>>(
        &mut self,
        node: N,
        query: &str,
        default: &str,
    ) -> Result<String, ODataError> {
        Ok(self
            .string(node, query)?
            .unwrap_or_else(|| default.to_string()))
    }
}
