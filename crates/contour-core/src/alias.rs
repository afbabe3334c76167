//! Field alias derivation
//!
//! System aliases are guessed from the local name of the edge property, with an
//! `Of` suffix for inverse edges; `Meta(alias, ..)` annotations on the nested
//! shape take precedence.

use crate::edge::Edge;
use crate::error::{Error, Result};
use crate::inspect;
use crate::shape::{Shape, ALIAS};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static LOCAL_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[/#:](?P<name>[^/#:]+)(?:/|#|#_|#id|#this)?$").expect("valid regex")
});

/// User-declared alias annotated on a field's nested shape
pub fn declared(shape: &Shape) -> Option<String> {
    inspect::metas(shape, ALIAS)
        .first()
        .map(|value| value.lexical().to_string())
}

/// System alias guessed from the edge property
pub fn guess(edge: &Edge) -> String {
    let iri = edge.property.as_str();

    let name = LOCAL_NAME
        .captures(iri)
        .and_then(|captures| captures.name("name"))
        .map(|name| name.as_str())
        .unwrap_or(iri);

    if edge.is_inverse() {
        format!("{}Of", name)
    } else {
        name.to_string()
    }
}

/// Aliases of the fields declared at the top level of a shape
///
/// Fails with [`Error::AliasConflict`] if one edge carries two aliases or two
/// edges share one.
pub fn aliases(shape: &Shape) -> Result<BTreeMap<Edge, String>> {
    let mut by_edge: BTreeMap<Edge, (String, bool)> = BTreeMap::new();

    for declared_field in inspect::fields(shape) {
        let edge = declared_field.field.edge;
        let user = declared(&declared_field.field.shape);

        match (by_edge.get(&edge).cloned(), user) {
            (Some((existing, true)), Some(name)) if existing != name => {
                return Err(Error::AliasConflict {
                    edge: edge.to_string(),
                    first: existing,
                    second: name,
                });
            }
            (Some((_, true)), _) => {}
            (_, Some(name)) => {
                by_edge.insert(edge, (name, true));
            }
            (None, None) => {
                let name = guess(&edge);
                by_edge.insert(edge, (name, false));
            }
            (Some((_, false)), None) => {}
        }
    }

    let mut by_alias: BTreeMap<&str, &Edge> = BTreeMap::new();

    for (edge, (name, _)) in &by_edge {
        if let Some(other) = by_alias.insert(name.as_str(), edge) {
            return Err(Error::AliasConflict {
                edge: name.clone(),
                first: other.to_string(),
                second: edge.to_string(),
            });
        }
    }

    Ok(by_edge
        .into_iter()
        .map(|(edge, (name, _))| (edge, name))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{alias, and, field, string};

    #[test]
    fn test_guess() {
        assert_eq!(guess(&Edge::forward("http://example.com/terms#title")), "title");
        assert_eq!(guess(&Edge::forward("http://example.com/office/")), "office");
        assert_eq!(guess(&Edge::forward("urn:example:code")), "code");
        assert_eq!(guess(&Edge::inverse("http://example.com/terms#report")), "reportOf");
    }

    #[test]
    fn test_user_aliases_take_precedence() {
        let shape = and([
            field("http://example.com/terms#title", [string()]),
            field("http://example.com/terms#code", [alias("id")]),
        ]);

        let aliases = aliases(&shape).unwrap();
        assert_eq!(aliases[&Edge::forward("http://example.com/terms#title")], "title");
        assert_eq!(aliases[&Edge::forward("http://example.com/terms#code")], "id");
    }

    #[test]
    fn test_conflicts() {
        let clash = and([
            field("http://example.com/a#name", []),
            field("http://example.com/b#name", []),
        ]);
        assert!(matches!(aliases(&clash), Err(Error::AliasConflict { .. })));

        let twice = and([
            field("http://example.com/a#name", [alias("x")]),
            field("http://example.com/a#name", [alias("y")]),
        ]);
        assert!(matches!(aliases(&twice), Err(Error::AliasConflict { .. })));

        let renamed = and([
            field("http://example.com/a#name", []),
            field("http://example.com/b#name", [alias("other")]),
        ]);
        assert!(aliases(&renamed).is_ok());
    }
}
