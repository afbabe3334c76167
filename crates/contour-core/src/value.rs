//! Graph values and statements

use crate::vocab;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// IRI reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Iri(pub String);

impl Iri {
    pub fn new(iri: impl Into<String>) -> Self {
        Self(iri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Iri {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Iri {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<")?;
        for c in self.0.chars() {
            if is_iri_reserved(c) {
                write!(f, "\\u{:04X}", c as u32)?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        f.write_str(">")
    }
}

/// Characters that can't appear raw between the angle brackets of an IRI reference
pub fn is_iri_reserved(c: char) -> bool {
    matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '^' | '`' | '\\') || c <= ' '
}

/// Typed or language-tagged literal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub lexical: String,

    #[serde(default = "default_datatype")]
    pub datatype: Iri,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

fn default_datatype() -> Iri {
    Iri::new(vocab::XSD_STRING)
}

impl Literal {
    /// Numeric value, if the datatype is numeric and the lexical form parses
    pub fn number(&self) -> Option<f64> {
        if vocab::is_numeric(self.datatype.as_str()) {
            self.lexical.trim().parse::<f64>().ok()
        } else {
            None
        }
    }
}

/// A graph value: IRI, blank node or literal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Value {
    Iri(Iri),
    Bnode(String),
    Literal(Literal),
}

impl Value {
    pub fn iri(iri: impl Into<String>) -> Self {
        Self::Iri(Iri::new(iri))
    }

    pub fn bnode(id: impl Into<String>) -> Self {
        Self::Bnode(id.into())
    }

    pub fn typed(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self::Literal(Literal {
            lexical: lexical.into(),
            datatype: Iri::new(datatype),
            lang: None,
        })
    }

    pub fn string(lexical: impl Into<String>) -> Self {
        Self::typed(lexical, vocab::XSD_STRING)
    }

    pub fn tagged(lexical: impl Into<String>, lang: impl Into<String>) -> Self {
        Self::Literal(Literal {
            lexical: lexical.into(),
            datatype: Iri::new(vocab::RDF_LANG_STRING),
            lang: Some(lang.into()),
        })
    }

    pub fn integer(value: i64) -> Self {
        Self::typed(value.to_string(), vocab::XSD_INTEGER)
    }

    pub fn decimal(value: f64) -> Self {
        Self::typed(value.to_string(), vocab::XSD_DECIMAL)
    }

    pub fn boolean(value: bool) -> Self {
        Self::typed(value.to_string(), vocab::XSD_BOOLEAN)
    }

    /// Lexical form: the IRI text, the blank node label or the literal label
    pub fn lexical(&self) -> &str {
        match self {
            Self::Iri(iri) => iri.as_str(),
            Self::Bnode(id) => id,
            Self::Literal(literal) => &literal.lexical,
        }
    }

    /// Value kind for resources, declared datatype for literals
    pub fn datatype(&self) -> &str {
        match self {
            Self::Iri(_) => vocab::IRI_TYPE,
            Self::Bnode(_) => vocab::BNODE_TYPE,
            Self::Literal(literal) => literal.datatype.as_str(),
        }
    }

    pub fn is_resource(&self) -> bool {
        !matches!(self, Self::Literal(_))
    }

    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn number(&self) -> Option<f64> {
        self.as_literal().and_then(Literal::number)
    }

    /// Partial comparison used by range constraints and query filters
    ///
    /// Values are comparable when both are numeric, both are literals with the
    /// same datatype and language, or both are IRIs.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Literal(x), Self::Literal(y)) => match (x.number(), y.number()) {
                (Some(a), Some(b)) => Some(a.total_cmp(&b)),
                _ if x.datatype == y.datatype && x.lang == y.lang => {
                    Some(x.lexical.cmp(&y.lexical))
                }
                _ => None,
            },
            (Self::Iri(x), Self::Iri(y)) => Some(x.cmp(y)),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Bnode(_) => 0,
            Self::Iri(_) => 1,
            Self::Literal(_) => 2,
        }
    }
}

/// Total order: blank nodes < IRIs < literals; numeric literals first by value,
/// then literals by datatype, language and label
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Iri(x), Self::Iri(y)) => x.cmp(y),
            (Self::Bnode(x), Self::Bnode(y)) => x.cmp(y),
            (Self::Literal(x), Self::Literal(y)) => {
                let numeric = match (x.number(), y.number()) {
                    (Some(a), Some(b)) => a.total_cmp(&b),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };

                numeric
                    .then_with(|| x.datatype.cmp(&y.datatype))
                    .then_with(|| x.lang.cmp(&y.lang))
                    .then_with(|| x.lexical.cmp(&y.lexical))
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iri(iri) => write!(f, "{}", iri),
            Self::Bnode(id) => write!(f, "_:{}", id),
            Self::Literal(literal) => {
                write!(f, "\"{}\"", escape(&literal.lexical))?;
                if let Some(lang) = &literal.lang {
                    write!(f, "@{}", lang)
                } else if literal.datatype.as_str() != vocab::XSD_STRING {
                    write!(f, "^^{}", literal.datatype)
                } else {
                    Ok(())
                }
            }
        }
    }
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl From<Iri> for Value {
    fn from(iri: Iri) -> Self {
        Self::Iri(iri)
    }
}

/// A subject/predicate/object statement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Statement {
    pub subject: Value,
    pub predicate: Iri,
    pub object: Value,
}

impl Statement {
    pub fn new(subject: Value, predicate: impl Into<Iri>, object: Value) -> Self {
        Self {
            subject,
            predicate: predicate.into(),
            object,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}
