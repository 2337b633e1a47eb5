//! Tag model

use serde::{Deserialize, Serialize};

/// Tag entity; names are unique
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Normalize a client-supplied tag list.
///
/// Names are trimmed, blanks dropped and duplicates collapsed keeping the
/// first occurrence, so the result is the ordered tag list to store.
pub fn normalize_tag_list<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result: Vec<String> = Vec::new();
    for name in names {
        let name = name.as_ref().trim();
        if !name.is_empty() && !result.iter().any(|n| n == name) {
            result.push(name.to_string());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tag_list() {
        let tags = normalize_tag_list(["rust", " web ", "", "rust", "api"]);
        assert_eq!(tags, vec!["rust", "web", "api"]);
    }

    #[test]
    fn test_normalize_empty() {
        let tags = normalize_tag_list(Vec::<String>::new());
        assert!(tags.is_empty());
    }
}
