//! Tag groupings and yearly archives derived from the post collection.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::Serialize;

use crate::content::Post;

/// A tag's rendered identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagLink {
    pub name: String,
    /// Public permalink of the tag index.
    pub link: String,
    /// Output path of the tag index.
    pub local_file: String,
    pub post_count: usize,
}

impl TagLink {
    /// Unresolved link for a tag name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// One tag and its member posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPosts {
    pub tag: TagLink,
    /// Indices into the site's post list, newest first.
    pub posts: Vec<usize>,
}

/// Posts published in one calendar year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub year: i32,
    /// Indices into the site's post list, newest first.
    pub posts: Vec<usize>,
}

/// Group posts by tag, alphabetically by tag name.
///
/// `posts` must already be sorted newest first; member lists keep that order.
/// A tag repeated within one post counts once.
pub fn build_tag_index(posts: &[Post]) -> Vec<TagPosts> {
    let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();

    for (idx, post) in posts.iter().enumerate() {
        for tag in &post.meta.tags {
            let tag = tag.trim();
            if tag.is_empty() {
                continue;
            }
            let members = groups.entry(tag).or_default();
            if members.last() != Some(&idx) {
                members.push(idx);
            }
        }
    }

    groups
        .into_iter()
        .map(|(name, members)| TagPosts {
            tag: TagLink {
                post_count: members.len(),
                ..TagLink::new(name)
            },
            posts: members,
        })
        .collect()
}

/// Group posts by year, newest year first.
pub fn build_archives(posts: &[Post]) -> Vec<Archive> {
    let mut years: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (idx, post) in posts.iter().enumerate() {
        years.entry(post.date.year()).or_default().push(idx);
    }

    years
        .into_iter()
        .rev()
        .map(|(year, posts)| Archive { year, posts })
        .collect()
}
