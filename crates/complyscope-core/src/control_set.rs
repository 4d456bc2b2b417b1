use std::collections::HashSet;

/// Deduplicating set of control identifiers.
///
/// Membership is unordered; every enumeration goes through [`Self::sorted`]
/// or [`Self::into_sorted`] so that callers never observe hash order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlSetIndex {
    ids: HashSet<String>,
}

impl ControlSetIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when `control_id` was not yet a member.
    pub fn insert(&mut self, control_id: &str) -> bool {
        if self.ids.contains(control_id) {
            return false;
        }
        self.ids.insert(control_id.to_string())
    }

    #[must_use]
    pub fn contains(&self, control_id: &str) -> bool {
        self.ids.contains(control_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Members in ascending byte order.
    #[must_use]
    pub fn sorted(&self) -> Vec<&str> {
        let mut ids = self.ids.iter().map(String::as_str).collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn into_sorted(self) -> Vec<String> {
        let mut ids = self.ids.into_iter().collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }
}

impl<'a> FromIterator<&'a str> for ControlSetIndex {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut index = Self::new();
        index.extend(iter);
        index
    }
}

impl<'a> Extend<&'a str> for ControlSetIndex {
    fn extend<I: IntoIterator<Item = &'a str>>(&mut self, iter: I) {
        for control_id in iter {
            self.insert(control_id);
        }
    }
}
