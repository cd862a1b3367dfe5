//! Attribute resolution from federated identity claims.
//!
//! Identity providers disagree on claim names, so each canonical field is
//! looked up through a fixed, ordered alias list. The first alias with a
//! non-empty value wins. A secondary [`ClaimsProvider`] is consulted per
//! field only when the primary one yielded nothing for that field.

use std::collections::HashMap;

use crate::models::ResolvedIdentity;

/// Email claim aliases, highest priority first.
pub const EMAIL_ALIASES: &[&str] = &[
    "email",
    "emailAddress",
    "mail",
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress",
];

/// First-name claim aliases, highest priority first.
pub const FIRST_NAME_ALIASES: &[&str] = &[
    "firstName",
    "givenName",
    "given_name",
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/givenname",
];

/// Last-name claim aliases, highest priority first.
pub const LAST_NAME_ALIASES: &[&str] = &[
    "lastName",
    "surname",
    "sn",
    "family_name",
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/surname",
];

/// Anything that can answer "what is the value of claim `name`?".
pub trait ClaimsProvider {
    fn get(&self, name: &str) -> Option<&str>;
}

/// Immutable claim name -> value map scoped to one request.
///
/// Multi-valued claims keep only their first value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimSet {
    values: HashMap<String, String>,
}

impl ClaimSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from multi-valued attributes, keeping the first value of each.
    pub fn from_multi<I, K, V>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoIterator<Item = String>,
    {
        let values = attributes
            .into_iter()
            .filter_map(|(name, vals)| vals.into_iter().next().map(|v| (name.into(), v)))
            .collect();
        Self { values }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ClaimSet {
    /// Later duplicates of a name are dropped so the first value is kept.
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = HashMap::new();
        for (k, v) in iter {
            values.entry(k.into()).or_insert_with(|| v.into());
        }
        Self { values }
    }
}

impl ClaimsProvider for ClaimSet {
    fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }
}

/// Resolve canonical identity fields from a primary and optional secondary
/// claim source. Never fails; absent fields come back empty.
///
/// The email is lowercased so differently-cased assertions for the same
/// mailbox map to one account.
pub fn resolve(
    primary: &dyn ClaimsProvider,
    secondary: Option<&dyn ClaimsProvider>,
) -> ResolvedIdentity {
    let field = |aliases: &[&str]| {
        first_match(primary, aliases)
            .or_else(|| secondary.and_then(|s| first_match(s, aliases)))
            .unwrap_or_default()
    };

    ResolvedIdentity {
        email: field(EMAIL_ALIASES).to_lowercase(),
        first_name: field(FIRST_NAME_ALIASES),
        last_name: field(LAST_NAME_ALIASES),
    }
}

/// First alias whose value is non-blank, trimmed.
fn first_match(provider: &dyn ClaimsProvider, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|name| provider.get(name))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(pairs: &[(&str, &str)]) -> ClaimSet {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_third_priority_alias_resolves() {
        let id = resolve(&claims(&[("mail", "jdoe@example.com")]), None);
        assert_eq!(id.email, "jdoe@example.com");
    }

    #[test]
    fn test_higher_priority_alias_wins() {
        let set = claims(&[
            ("mail", "low@example.com"),
            ("emailAddress", "high@example.com"),
        ]);
        assert_eq!(resolve(&set, None).email, "high@example.com");

        let set = claims(&[
            ("sn", "Low"),
            ("surname", "High"),
            (
                "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/surname",
                "Lowest",
            ),
        ]);
        assert_eq!(resolve(&set, None).last_name, "High");
    }

    #[test]
    fn test_uri_style_claims() {
        let set = claims(&[
            (
                "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress",
                "uri@example.com",
            ),
            (
                "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/givenname",
                "Uri",
            ),
            ("family_name", "Style"),
        ]);
        let id = resolve(&set, None);
        assert_eq!(id.email, "uri@example.com");
        assert_eq!(id.first_name, "Uri");
        assert_eq!(id.last_name, "Style");
    }

    #[test]
    fn test_empty_value_falls_through_to_next_alias() {
        let set = claims(&[("email", "  "), ("mail", "next@example.com")]);
        assert_eq!(resolve(&set, None).email, "next@example.com");
    }

    #[test]
    fn test_missing_fields_are_empty() {
        let id = resolve(&ClaimSet::new(), None);
        assert_eq!(id, ResolvedIdentity::default());
    }

    #[test]
    fn test_secondary_consulted_per_field() {
        let primary = claims(&[("email", "p@example.com"), ("givenName", "Primary")]);
        let secondary = claims(&[
            ("email", "s@example.com"),
            ("firstName", "Secondary"),
            ("lastName", "Fallback"),
        ]);
        let id = resolve(&primary, Some(&secondary));
        assert_eq!(id.email, "p@example.com");
        assert_eq!(id.first_name, "Primary");
        assert_eq!(id.last_name, "Fallback");
    }

    #[test]
    fn test_email_is_lowercased_and_trimmed() {
        let id = resolve(
            &claims(&[("email", " Jane.Doe@Example.COM "), ("firstName", " Jane ")]),
            None,
        );
        assert_eq!(id.email, "jane.doe@example.com");
        assert_eq!(id.first_name, "Jane");
    }

    #[test]
    fn test_multi_valued_claims_keep_first() {
        let set = ClaimSet::from_multi(vec![
            ("mail", vec!["first@example.com".to_string(), "second@example.com".to_string()]),
            ("sn", vec![]),
        ]);
        assert_eq!(set.len(), 1);
        assert_eq!(resolve(&set, None).email, "first@example.com");

        let set = claims(&[("mail", "first@example.com"), ("mail", "dup@example.com")]);
        assert_eq!(set.get("mail"), Some("first@example.com"));
    }
}
