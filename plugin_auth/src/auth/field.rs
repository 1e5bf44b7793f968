//! Auth field groups and tool auth requirements.
//!
//! A group is the set of interchangeable names one logical secret may be stored
//! or configured under, e.g. `DALLE3_API_KEY||DALLE_API_KEY`. The `||`-joined
//! string is the wire form used in tool manifests and by the credential write
//! path; internally the group is always an ordered alias list.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PluginAuthError, PluginAuthResult};

/// Delimiter joining aliases in the wire form.
pub const ALIAS_DELIMITER: &str = "||";

/// Ordered, non-empty list of alias names for one logical secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthFieldGroup {
    aliases: Vec<String>,
}

impl AuthFieldGroup {
    /// Build a group from alias names. Duplicates are dropped, first one kept.
    pub fn new<I, S>(aliases: I) -> PluginAuthResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for alias in aliases {
            let alias = alias.into().trim().to_string();
            if alias.is_empty() {
                return Err(PluginAuthError::config("auth field alias must not be blank"));
            }
            if !out.contains(&alias) {
                out.push(alias);
            }
        }

        if out.is_empty() {
            return Err(PluginAuthError::config(
                "auth field group needs at least one alias",
            ));
        }

        Ok(Self { aliases: out })
    }

    /// Single-alias group.
    pub fn single(field: impl Into<String>) -> PluginAuthResult<Self> {
        Self::new([field.into()])
    }

    /// Parse the `A||B||C` wire form.
    pub fn parse(s: &str) -> PluginAuthResult<Self> {
        Self::new(s.split(ALIAS_DELIMITER))
    }

    /// First alias; resolved values are keyed by it.
    pub fn primary(&self) -> &str {
        &self.aliases[0]
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Always false; groups cannot be built empty.
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.aliases.iter().any(|a| a == field)
    }
}

impl fmt::Display for AuthFieldGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.aliases.join(ALIAS_DELIMITER))
    }
}

impl std::str::FromStr for AuthFieldGroup {
    type Err = PluginAuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for AuthFieldGroup {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for AuthFieldGroup {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::{self, SeqAccess, Visitor};

        struct AuthFieldGroupVisitor;

        impl<'de> Visitor<'de> for AuthFieldGroupVisitor {
            type Value = AuthFieldGroup;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("\"FIELD||ALIAS\" or a list of field names")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                AuthFieldGroup::parse(v).map_err(E::custom)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut aliases: Vec<String> = Vec::new();
                while let Some(alias) = seq.next_element::<String>()? {
                    aliases.push(alias);
                }
                AuthFieldGroup::new(aliases).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_any(AuthFieldGroupVisitor)
    }
}

/// Everything a tool needs resolved before it can be built.
///
/// Empty means the tool needs no authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthRequirement {
    groups: Vec<AuthFieldGroup>,
}

impl AuthRequirement {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(groups: Vec<AuthFieldGroup>) -> Self {
        Self { groups }
    }

    /// Parse each entry in the `A||B` wire form.
    pub fn parse<I, S>(fields: I) -> PluginAuthResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let groups = fields
            .into_iter()
            .map(|f| AuthFieldGroup::parse(f.as_ref()))
            .collect::<PluginAuthResult<Vec<_>>>()?;
        Ok(Self { groups })
    }

    pub fn groups(&self) -> &[AuthFieldGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }
}

impl From<Vec<AuthFieldGroup>> for AuthRequirement {
    fn from(groups: Vec<AuthFieldGroup>) -> Self {
        Self::new(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wire_form() {
        let group = AuthFieldGroup::parse("DALLE3_API_KEY||DALLE_API_KEY").unwrap();
        assert_eq!(group.primary(), "DALLE3_API_KEY");
        assert_eq!(
            group.aliases().collect::<Vec<_>>(),
            vec!["DALLE3_API_KEY", "DALLE_API_KEY"]
        );
        assert_eq!(group.to_string(), "DALLE3_API_KEY||DALLE_API_KEY");
    }

    #[test]
    fn test_parse_trims_and_dedups() {
        let group = AuthFieldGroup::parse(" A || B ||A").unwrap();
        assert_eq!(group.aliases().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(group.len(), 2);
        assert!(group.contains("B"));
        assert!(!group.contains("C"));
    }

    #[test]
    fn test_rejects_blank_aliases() {
        assert!(AuthFieldGroup::parse("").is_err());
        assert!(AuthFieldGroup::parse("A||").is_err());
        assert!(AuthFieldGroup::new(Vec::<String>::new()).is_err());
    }

    #[test]
    fn test_deserialize_string_or_list() {
        let from_str: AuthFieldGroup = serde_yaml::from_str("\"A||B\"").unwrap();
        let from_list: AuthFieldGroup = serde_yaml::from_str("[A, B]").unwrap();
        assert_eq!(from_str, from_list);

        let serialized = serde_json::to_string(&from_list).unwrap();
        assert_eq!(serialized, "\"A||B\"");
    }

    #[test]
    fn test_requirement_parse() {
        let req = AuthRequirement::parse(["GOOGLE_CSE_ID", "GOOGLE_SEARCH_API_KEY||GOOGLE_API_KEY"])
            .unwrap();
        assert_eq!(req.len(), 2);
        assert_eq!(req.groups()[1].primary(), "GOOGLE_SEARCH_API_KEY");
        assert!(AuthRequirement::none().is_empty());
    }
}
