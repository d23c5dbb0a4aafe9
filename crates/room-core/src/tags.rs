//! Color tags and the color → name dictionary.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;

/// A named color label attached to a box or an arrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub color: String,
    pub name: String,
}

/// Palette a fresh dictionary starts with.
pub const DEFAULT_TAGS: &[(&str, &str)] = &[
    ("#ef4444", "Important"),
    ("#f59e0b", "Pending"),
    ("#10b981", "Done"),
    ("#3b82f6", "Idea"),
    ("#8b5cf6", "Reference"),
    ("#6b7280", "Archived"),
];

/// Process-wide color → default-name dictionary.
///
/// Independent of any single graph. Entries keep insertion order so the
/// tag picker lists them stably.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDictionary {
    entries: Vec<(String, String)>,
    /// Every color ever passed to `remove`, in order. Rooms sharing the
    /// dictionary replay it to clear their own tags.
    #[serde(skip)]
    removed: Vec<String>,
}

/// Handle shared between every canvas of a process.
pub type SharedTags = Rc<RefCell<TagDictionary>>;

impl Default for TagDictionary {
    fn default() -> Self {
        Self {
            entries: DEFAULT_TAGS
                .iter()
                .map(|(c, n)| (normalize(c), (*n).to_string()))
                .collect(),
            removed: Vec::new(),
        }
    }
}

fn normalize(color: &str) -> String {
    color.trim().to_ascii_lowercase()
}

impl TagDictionary {
    /// A dictionary with no entries.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub fn shared(self) -> SharedTags {
        Rc::new(RefCell::new(self))
    }

    /// Default name for `color`, if the dictionary defines one.
    pub fn get(&self, color: &str) -> Option<&str> {
        let color = normalize(color);
        self.entries
            .iter()
            .find(|(c, _)| *c == color)
            .map(|(_, n)| n.as_str())
    }

    /// Display name for `color`. Colors missing from the dictionary are
    /// shown as their raw value.
    pub fn name_for(&self, color: &str) -> String {
        match self.get(color) {
            Some(name) => name.to_string(),
            None => {
                log::debug!("tag color {color} has no dictionary entry");
                color.to_string()
            }
        }
    }

    /// Build the tag an entity receives when `color` is applied to it.
    ///
    /// An entity that already carries `color` keeps its (possibly custom)
    /// name.
    pub fn tag_for(&self, color: &str, current: Option<&Tag>) -> Tag {
        if let Some(tag) = current
            && normalize(&tag.color) == normalize(color)
        {
            return tag.clone();
        }
        Tag {
            color: color.to_string(),
            name: self.name_for(color),
        }
    }

    /// Insert or rename an entry.
    pub fn set(&mut self, color: &str, name: &str) {
        let color = normalize(color);
        match self.entries.iter_mut().find(|(c, _)| *c == color) {
            Some(entry) => entry.1 = name.to_string(),
            None => self.entries.push((color, name.to_string())),
        }
    }

    /// Remove an entry and log the removal. Returns `true` if the entry
    /// existed; the removal is logged either way.
    pub fn remove(&mut self, color: &str) -> bool {
        let color = normalize(color);
        let before = self.entries.len();
        self.entries.retain(|(c, _)| *c != color);
        let existed = self.entries.len() != before;
        self.removed.push(color);
        existed
    }

    /// Number of removals so far.
    pub fn generation(&self) -> usize {
        self.removed.len()
    }

    /// Colors removed after `generation`.
    pub fn removed_since(&self, generation: usize) -> &[String] {
        self.removed.get(generation..).unwrap_or_default()
    }

    pub fn contains(&self, color: &str) -> bool {
        self.get(color).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, n)| (c.as_str(), n.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether `tag` references `color` (case-insensitive).
pub fn tag_has_color(tag: &Tag, color: &str) -> bool {
    normalize(&tag.color) == normalize(color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_lookup_is_case_insensitive() {
        let dict = TagDictionary::default();
        assert_eq!(dict.get("#EF4444"), Some("Important"));
        assert_eq!(dict.name_for("#ef4444"), "Important");
    }

    #[test]
    fn unknown_color_falls_back_to_raw_value() {
        let dict = TagDictionary::default();
        assert_eq!(dict.name_for("#123abc"), "#123abc");
    }

    #[test]
    fn same_color_keeps_custom_name() {
        let dict = TagDictionary::default();
        let custom = Tag {
            color: "#ef4444".into(),
            name: "Blocker".into(),
        };
        assert_eq!(dict.tag_for("#ef4444", Some(&custom)).name, "Blocker");
        assert_eq!(dict.tag_for("#10b981", Some(&custom)).name, "Done");
    }

    #[test]
    fn set_and_remove_entries() {
        let mut dict = TagDictionary::empty();
        dict.set("#ABCDEF", "Mine");
        assert_eq!(dict.get("#abcdef"), Some("Mine"));
        dict.set("#abcdef", "Renamed");
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get("#abcdef"), Some("Renamed"));
        assert!(dict.remove("#AbCdEf"));
        assert!(!dict.remove("#abcdef"));
        assert!(dict.is_empty());
    }

    #[test]
    fn removals_are_logged_by_generation() {
        let mut dict = TagDictionary::default();
        let start = dict.generation();
        dict.remove("#EF4444");
        dict.remove("#123456");
        assert_eq!(dict.generation(), start + 2);
        assert_eq!(dict.removed_since(start), ["#ef4444", "#123456"]);
        assert_eq!(dict.removed_since(start + 1), ["#123456"]);
        assert!(dict.removed_since(start + 2).is_empty());
        assert!(dict.removed_since(start + 9).is_empty());
    }
}
