//! ---
//! acm_section: "02-policy-model"
//! acm_subsection: "module"
//! acm_type: "source"
//! acm_scope: "code"
//! acm_description: "Rule representation and canonical rule keys."
//! acm_version: "v0.0.0-prealpha"
//! acm_owner: "tbd"
//! ---
use std::borrow::Borrow;
use std::fmt;

/// A policy rule: ordered, owned string fields.
pub type Rule = Vec<String>;

/// Build a [`Rule`] from borrowed field values.
pub fn to_rule<S: AsRef<str>>(fields: &[S]) -> Rule {
    fields.iter().map(|f| f.as_ref().to_owned()).collect()
}

/// Canonical identity of a rule used by the rule index.
///
/// Keys compare field-by-field with exact string equality, so no separator can
/// collide with field content. The key borrows as `[String]`, which lets lookups
/// use a rule slice directly without building a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleKey(Box<[String]>);

impl RuleKey {
    /// Create a key by copying the rule fields.
    pub fn new(rule: &[String]) -> Self {
        Self(rule.to_vec().into_boxed_slice())
    }

    /// Fields making up the key.
    pub fn fields(&self) -> &[String] {
        &self.0
    }
}

impl Borrow<[String]> for RuleKey {
    fn borrow(&self) -> &[String] {
        &self.0
    }
}

impl From<Rule> for RuleKey {
    fn from(rule: Rule) -> Self {
        Self(rule.into_boxed_slice())
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn keys_do_not_collide_on_separator_content() {
        let joined = RuleKey::new(&to_rule(&["a,b", "c"]));
        let split = RuleKey::new(&to_rule(&["a", "b,c"]));
        assert_ne!(joined, split);
    }

    #[test]
    fn lookup_by_slice_without_key() {
        let mut map = HashMap::new();
        map.insert(RuleKey::new(&to_rule(&["alice", "data", "read"])), 3usize);
        let probe = to_rule(&["alice", "data", "read"]);
        assert_eq!(map.get(probe.as_slice()), Some(&3));
        assert_eq!(map.get(to_rule(&["alice", "data"]).as_slice()), None);
    }

    #[test]
    fn display_lists_fields() {
        let key = RuleKey::from(to_rule(&["bob", "admin"]));
        assert_eq!(key.to_string(), "[bob, admin]");
        assert_eq!(key.fields().len(), 2);
    }
}
