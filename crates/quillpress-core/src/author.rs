//! Site authors and avatar resolution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

const GRAVATAR_BASE: &str = "https://www.gravatar.com/avatar/";

/// A configured (or fabricated) content author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Display name, also used for lookups from content metadata.
    pub name: String,

    /// Contact email, used for the Gravatar hash.
    #[serde(default)]
    pub email: String,

    /// Personal website.
    #[serde(default)]
    pub website: String,

    /// Short biography.
    #[serde(default)]
    pub bio: String,

    /// Explicit avatar URL. Wins over Gravatar when set.
    #[serde(default)]
    pub avatar: String,

    /// Derive the avatar from the email through Gravatar.
    #[serde(default)]
    pub use_gravatar: bool,

    /// Author page path.
    #[serde(default)]
    pub slug: String,

    /// Social network name to profile URL.
    #[serde(default)]
    pub social: BTreeMap<String, String>,
}

impl Author {
    /// Fabricate an author for a name that is not configured.
    #[must_use]
    pub fn placeholder(name: &str) -> Self {
        let escaped = urlencoding::encode(name).into_owned();
        let mut social = BTreeMap::new();
        social.insert("github".to_string(), format!("https://github.com/{escaped}"));

        let mut author = Self {
            name: name.to_string(),
            email: format!("{name}@example.com"),
            bio: "user bio".to_string(),
            use_gravatar: true,
            slug: format!("/author/{escaped}/"),
            social,
            ..Self::default()
        };
        author.fulfill();
        author
    }

    /// Fill derived fields: default slug and resolved avatar URL.
    pub fn fulfill(&mut self) {
        if self.slug.is_empty() {
            self.slug = format!("/author/{}/", urlencoding::encode(&self.name));
        }
        if self.avatar.is_empty() && self.use_gravatar && !self.email.trim().is_empty() {
            self.avatar = gravatar_url(&self.email);
        }
    }
}

/// Gravatar URL for an email, using the SHA-256 form of the hash.
#[must_use]
pub fn gravatar_url(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    let digest = Sha256::digest(normalized.as_bytes());
    format!("{GRAVATAR_BASE}{}", hex::encode(digest))
}

/// Find a configured author by name or slug.
#[must_use]
pub fn find_author<'a>(authors: &'a [Author], name: &str) -> Option<&'a Author> {
    authors.iter().find(|a| a.name == name || a.slug == name)
}

/// Resolve the author for a piece of content.
///
/// An empty name maps to the first configured author. Unknown names get a
/// placeholder so a typo in metadata never fails the build.
#[must_use]
pub fn resolve_author(authors: &[Author], name: &str) -> Author {
    if name.is_empty() {
        if let Some(first) = authors.first() {
            return first.clone();
        }
    }
    match find_author(authors, name) {
        Some(author) => author.clone(),
        None => {
            warn!(author = name, "unknown author, using placeholder");
            Author::placeholder(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authors() -> Vec<Author> {
        let mut admin = Author {
            name: "admin".to_string(),
            email: "Admin@Example.com ".to_string(),
            use_gravatar: true,
            ..Author::default()
        };
        admin.fulfill();
        let mut jane = Author {
            name: "jane".to_string(),
            avatar: "https://cdn.example.com/jane.png".to_string(),
            use_gravatar: true,
            email: "jane@example.com".to_string(),
            ..Author::default()
        };
        jane.fulfill();
        vec![admin, jane]
    }

    #[test]
    fn test_gravatar_normalizes_email() {
        assert_eq!(gravatar_url(" Admin@Example.com"), gravatar_url("admin@example.com"));
        let url = gravatar_url("admin@example.com");
        assert!(url.starts_with(GRAVATAR_BASE));
        assert_eq!(url.len(), GRAVATAR_BASE.len() + 64);
    }

    #[test]
    fn test_explicit_avatar_wins() {
        let list = authors();
        assert_eq!(list[1].avatar, "https://cdn.example.com/jane.png");
        assert!(list[0].avatar.starts_with(GRAVATAR_BASE));
    }

    #[test]
    fn test_find_by_name_or_slug() {
        let list = authors();
        assert_eq!(find_author(&list, "jane").map(|a| a.name.as_str()), Some("jane"));
        assert_eq!(
            find_author(&list, "/author/admin/").map(|a| a.name.as_str()),
            Some("admin")
        );
        assert!(find_author(&list, "nobody").is_none());
    }

    #[test]
    fn test_resolve_empty_name_uses_first() {
        let list = authors();
        assert_eq!(resolve_author(&list, "").name, "admin");
    }

    #[test]
    fn test_resolve_unknown_fabricates_placeholder() {
        let list = authors();
        let ghost = resolve_author(&list, "Ghost Writer");
        assert_eq!(ghost.name, "Ghost Writer");
        assert_eq!(ghost.email, "Ghost Writer@example.com");
        assert_eq!(ghost.bio, "user bio");
        assert_eq!(ghost.slug, "/author/Ghost%20Writer/");
        assert!(ghost.social.contains_key("github"));
        assert!(ghost.avatar.starts_with(GRAVATAR_BASE));
    }
}
