//! JSON document ingestion
//!
//! Documents are node objects or arrays of node objects:
//!
//! ```json
//! [{ "@id": "urn:e1", "@type": "urn:Employee", "urn:title": "Sales Rep",
//!    "urn:reportsTo": { "@id": "urn:e4" }, "urn:salary": 100 }]
//! ```
//!
//! Property keys are absolute IRIs. Values are strings, numbers, booleans,
//! `{"@id"}` references, `{"@value", "@type" | "@language"}` literals, nested
//! node objects (blank nodes unless they carry an `@id`) or arrays of those.
//! Problems are collected into [`Diagnostics`] instead of failing the parse.

use contour_core::value::is_iri_reserved;
use contour_core::{vocab, Model, Statement, Value};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

const ID: &str = "@id";
const TYPE: &str = "@type";
const VALUE: &str = "@value";
const LANGUAGE: &str = "@language";

/// Problems found while ingesting a document, by severity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub fatals: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the document must not be written
    pub fn is_fatal(&self) -> bool {
        !self.fatals.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        self.fatals.is_empty() && self.errors.is_empty() && self.warnings.is_empty()
    }

    pub fn merge(mut self, other: Diagnostics) -> Self {
        self.fatals.extend(other.fatals);
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self
    }

    fn fatal(&mut self, message: impl Into<String>) {
        self.fatals.push(message.into());
    }

    fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// Statements parsed from a document with the diagnostics raised on the way
#[derive(Debug, Clone, Default)]
pub struct Ingest {
    pub model: Model,
    pub diagnostics: Diagnostics,
    blanks: usize,
}

impl Ingest {
    /// Parse a JSON document
    pub fn parse(text: &str) -> Self {
        let mut ingest = Self::default();

        match serde_json::from_str::<Json>(text) {
            Ok(json) => ingest.document(&json),
            Err(e) => ingest
                .diagnostics
                .fatal(format!("line {} column {}: {}", e.line(), e.column(), e)),
        }

        tracing::debug!(
            statements = ingest.model.len(),
            fatals = ingest.diagnostics.fatals.len(),
            errors = ingest.diagnostics.errors.len(),
            warnings = ingest.diagnostics.warnings.len(),
            "Ingested document"
        );

        ingest
    }

    fn document(&mut self, json: &Json) {
        match json {
            Json::Object(node) => {
                self.node(node, "$");
            }
            Json::Array(nodes) if nodes.is_empty() => self.diagnostics.warning("empty document"),
            Json::Array(nodes) => {
                for (index, node) in nodes.iter().enumerate() {
                    let at = format!("$[{}]", index);
                    match node {
                        Json::Object(node) => {
                            self.node(node, &at);
                        }
                        _ => self.diagnostics.error(format!("{}: expected a node object", at)),
                    }
                }
            }
            _ => self
                .diagnostics
                .fatal("document must be a node object or an array of node objects"),
        }
    }

    /// Emit the statements of a node object and return its subject
    fn node(&mut self, node: &Map<String, Json>, at: &str) -> Option<Value> {
        let subject = match node.get(ID) {
            None => self.blank(),
            Some(Json::String(id)) => match reference(id) {
                Some(subject) => subject,
                None => {
                    self.diagnostics.error(format!("{}: invalid {} {:?}", at, ID, id));
                    return None;
                }
            },
            Some(_) => {
                self.diagnostics.error(format!("{}: {} must be a string", at, ID));
                return None;
            }
        };

        for (key, json) in node {
            let at = format!("{}.{}", at, key);

            match key.as_str() {
                ID => {}

                TYPE => {
                    for (index, json) in many(json).enumerate() {
                        match json {
                            Json::String(class) if is_iri(class) => self.insert(
                                subject.clone(),
                                vocab::RDF_TYPE,
                                Value::iri(class.as_str()),
                            ),
                            _ => self.diagnostics.error(format!("{}[{}]: type must be an IRI", at, index)),
                        }
                    }
                }

                key if key.starts_with('@') => {
                    self.diagnostics.warning(format!("{}: ignored keyword", at));
                }

                key if !is_iri(key) => {
                    self.diagnostics
                        .error(format!("{}: property is not an absolute IRI", at));
                }

                property => {
                    for (index, json) in many(json).enumerate() {
                        if let Some(object) = self.object(json, &format!("{}[{}]", at, index)) {
                            self.insert(subject.clone(), property, object);
                        }
                    }
                }
            }
        }

        Some(subject)
    }

    fn object(&mut self, json: &Json, at: &str) -> Option<Value> {
        match json {
            Json::Null => {
                self.diagnostics.warning(format!("{}: null value skipped", at));
                None
            }
            Json::Bool(value) => Some(Value::boolean(*value)),
            Json::Number(number) => Some(Value::typed(number.to_string(), number_type(number))),
            Json::String(text) => Some(Value::string(text.as_str())),
            Json::Array(_) => {
                self.diagnostics.error(format!("{}: nested arrays are not supported", at));
                None
            }
            Json::Object(object) if object.contains_key(VALUE) => self.literal(object, at),
            Json::Object(object) if object.len() == 1 && object.contains_key(ID) => match &object[ID] {
                Json::String(id) => reference(id).or_else(|| {
                    self.diagnostics.error(format!("{}: invalid reference {:?}", at, id));
                    None
                }),
                _ => {
                    self.diagnostics.error(format!("{}: {} must be a string", at, ID));
                    None
                }
            },
            Json::Object(object) => self.node(object, at),
        }
    }

    fn literal(&mut self, object: &Map<String, Json>, at: &str) -> Option<Value> {
        let lexical = match &object[VALUE] {
            Json::String(text) => text.clone(),
            Json::Number(number) => number.to_string(),
            Json::Bool(value) => value.to_string(),
            _ => {
                self.diagnostics.error(format!("{}: {} must be a scalar", at, VALUE));
                return None;
            }
        };

        match (object.get(TYPE), object.get(LANGUAGE)) {
            (Some(_), Some(_)) => {
                self.diagnostics
                    .error(format!("{}: {} and {} are exclusive", at, TYPE, LANGUAGE));
                None
            }
            (Some(Json::String(datatype)), None) if is_iri(datatype) => {
                Some(Value::typed(lexical, datatype.as_str()))
            }
            (Some(_), None) => {
                self.diagnostics.error(format!("{}: datatype must be an IRI", at));
                None
            }
            (None, Some(Json::String(lang))) => Some(Value::tagged(lexical, lang.as_str())),
            (None, Some(_)) => {
                self.diagnostics.error(format!("{}: language must be a string", at));
                None
            }
            (None, None) => match &object[VALUE] {
                Json::Number(number) => Some(Value::typed(lexical, number_type(number))),
                Json::Bool(_) => Some(Value::typed(lexical, vocab::XSD_BOOLEAN)),
                _ => Some(Value::string(lexical)),
            },
        }
    }

    fn insert(&mut self, subject: Value, predicate: &str, object: Value) {
        let statement = Statement::new(subject, predicate, object);
        if !self.model.insert(statement.clone()) {
            self.diagnostics.warning(format!("duplicate statement {}", statement));
        }
    }

    fn blank(&mut self) -> Value {
        let blank = Value::bnode(format!("b{}", self.blanks));
        self.blanks += 1;
        blank
    }
}

fn many(json: &Json) -> Box<dyn Iterator<Item = &Json> + '_> {
    match json {
        Json::Array(values) => Box::new(values.iter()),
        value => Box::new(std::iter::once(value)),
    }
}

/// JSON numbers with a fraction or exponent are doubles, the rest integers
fn number_type(number: &serde_json::Number) -> &'static str {
    if number.is_f64() {
        vocab::XSD_DOUBLE
    } else {
        vocab::XSD_INTEGER
    }
}

fn is_iri(text: &str) -> bool {
    match text.split_once(':') {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && !rest.is_empty()
                && scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c))
                && !text.chars().any(is_iri_reserved)
        }
        None => false,
    }
}

fn reference(id: &str) -> Option<Value> {
    match id.strip_prefix("_:") {
        Some(label) if !label.is_empty() => Some(Value::bnode(label)),
        Some(_) => None,
        None => is_iri(id).then(|| Value::iri(id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nodes() {
        let ingest = Ingest::parse(
            r#"[{
                "@id": "urn:e1",
                "@type": "urn:Employee",
                "urn:title": "Sales Rep",
                "urn:salary": 100,
                "urn:reportsTo": { "@id": "urn:e4" },
                "urn:name": { "@value": "Andy", "@language": "en" },
                "urn:address": { "urn:city": "Boston" }
            }]"#,
        );

        assert!(ingest.diagnostics.is_clean(), "{:?}", ingest.diagnostics);
        assert_eq!(ingest.model.len(), 7);

        let e1 = Value::iri("urn:e1");
        assert!(ingest
            .model
            .contains(&Statement::new(e1.clone(), vocab::RDF_TYPE, Value::iri("urn:Employee"))));
        assert!(ingest
            .model
            .contains(&Statement::new(e1.clone(), "urn:salary", Value::integer(100))));
        assert!(ingest
            .model
            .contains(&Statement::new(e1.clone(), "urn:name", Value::tagged("Andy", "en"))));
        assert!(ingest
            .model
            .contains(&Statement::new(e1, "urn:address", Value::bnode("b0"))));
        assert!(ingest
            .model
            .contains(&Statement::new(Value::bnode("b0"), "urn:city", Value::string("Boston"))));
    }

    #[test]
    fn test_number_datatypes() {
        let ingest = Ingest::parse(
            r#"{
                "@id": "urn:e1",
                "urn:salary": 100,
                "urn:rate": 1.5,
                "urn:big": 18446744073709551615,
                "urn:score": { "@value": 2.5e3 }
            }"#,
        );

        assert!(ingest.diagnostics.is_clean(), "{:?}", ingest.diagnostics);

        let e1 = Value::iri("urn:e1");
        let typed = |lexical: &str, datatype: &str| Value::typed(lexical, datatype);
        assert!(ingest
            .model
            .contains(&Statement::new(e1.clone(), "urn:salary", Value::integer(100))));
        assert!(ingest
            .model
            .contains(&Statement::new(e1.clone(), "urn:rate", typed("1.5", vocab::XSD_DOUBLE))));
        assert!(ingest.model.contains(&Statement::new(
            e1.clone(),
            "urn:big",
            typed("18446744073709551615", vocab::XSD_INTEGER)
        )));
        assert!(ingest
            .model
            .contains(&Statement::new(e1, "urn:score", typed("2500.0", vocab::XSD_DOUBLE))));
    }

    #[test]
    fn test_rejects_iris_with_reserved_characters() {
        let ingest = Ingest::parse(
            r#"[
                { "@id": "urn:x>{}", "urn:title": "a" },
                { "@id": "urn:e1", "urn:p|q": "b", "@type": "urn:C\"D" }
            ]"#,
        );

        assert_eq!(ingest.diagnostics.errors.len(), 3);
        assert!(ingest.model.is_empty());
    }

    #[test]
    fn test_malformed_json_is_fatal() {
        let ingest = Ingest::parse(r#"[{"@id": "urn:e1""#);

        assert!(ingest.diagnostics.is_fatal());
        assert!(ingest.model.is_empty());
    }

    #[test]
    fn test_scalar_document_is_fatal() {
        assert!(Ingest::parse("42").diagnostics.is_fatal());
    }

    #[test]
    fn test_errors_and_warnings() {
        let ingest = Ingest::parse(
            r#"[
                { "@id": "urn:e1", "title": "x", "urn:salary": null, "@context": {} },
                { "@id": "not an iri", "urn:title": "y" },
                7
            ]"#,
        );

        assert!(!ingest.diagnostics.is_fatal());
        assert_eq!(ingest.diagnostics.errors.len(), 3);
        assert_eq!(ingest.diagnostics.warnings.len(), 2);
        assert!(ingest.model.is_empty());
    }
}
