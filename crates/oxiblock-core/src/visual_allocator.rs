//! Visual id allocation.
//!
//! Visual ids live in their own space, offset above the host's native state
//! count so they never collide with a vanilla appearance. Auto state groups
//! name pools of candidate native appearances; they are recorded and
//! queryable, but id selection does not consult them.

use std::collections::HashMap;

use crate::error::AllocError;
use crate::id_allocator::IdAllocator;

/// Number of native block states on the host, used as the default offset.
pub const DEFAULT_NATIVE_STATE_COUNT: u32 = 24_135;

/// A named pool of native appearance ids that custom states may share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoStateGroup {
    pub id: String,
    pub candidates: Vec<u32>,
}

impl AutoStateGroup {
    pub fn new(id: impl Into<String>, candidates: impl IntoIterator<Item = u32>) -> Self {
        Self {
            id: id.into(),
            candidates: candidates.into_iter().collect(),
        }
    }

    /// The groups every allocator starts with: `solid`, `open` and `liquid`.
    pub fn defaults() -> Vec<AutoStateGroup> {
        vec![
            AutoStateGroup::new("solid", [1, 2, 3]),
            AutoStateGroup::new("open", [4, 5, 6]),
            AutoStateGroup::new("liquid", [7, 8, 9]),
        ]
    }
}

/// Allocator for visual ids, starting at the native state count.
#[derive(Debug, Clone)]
pub struct VisualIdAllocator {
    ids: IdAllocator,
    groups: Vec<AutoStateGroup>,
    group_of: HashMap<String, String>,
}

impl Default for VisualIdAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_NATIVE_STATE_COUNT)
    }
}

impl VisualIdAllocator {
    /// Allocator with the default auto state groups.
    pub fn new(native_state_count: u32) -> Self {
        Self {
            groups: AutoStateGroup::defaults(),
            ..Self::bare(native_state_count)
        }
    }

    /// Allocator with exactly the given groups.
    pub fn with_groups(
        native_state_count: u32,
        groups: impl IntoIterator<Item = AutoStateGroup>,
    ) -> Result<Self, AllocError> {
        let mut allocator = Self::bare(native_state_count);
        for group in groups {
            allocator.add_group(group)?;
        }
        Ok(allocator)
    }

    fn bare(native_state_count: u32) -> Self {
        Self {
            ids: IdAllocator::new(native_state_count),
            groups: Vec::new(),
            group_of: HashMap::new(),
        }
    }

    pub fn add_group(&mut self, group: AutoStateGroup) -> Result<(), AllocError> {
        if self.group(&group.id).is_some() {
            return Err(AllocError::DuplicateGroup(group.id));
        }
        self.groups.push(group);
        Ok(())
    }

    pub fn group(&self, id: &str) -> Option<&AutoStateGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn groups(&self) -> &[AutoStateGroup] {
        &self.groups
    }

    /// First visual id handed out to custom states.
    pub fn native_state_count(&self) -> u32 {
        self.ids.start()
    }

    pub fn check_fixed(&self, key: &str, id: u32) -> Result<(), AllocError> {
        self.ids.check_fixed(key, id)
    }

    pub fn assign_fixed(&mut self, key: &str, id: u32) -> Result<u32, AllocError> {
        self.ids.assign_fixed(key, id)
    }

    /// Queue `key` for automatic allocation, remembering its group.
    pub fn request_auto(&mut self, key: &str, group: Option<&str>) -> Result<Option<u32>, AllocError> {
        if let Some(group) = group {
            if self.group(group).is_none() {
                return Err(AllocError::UnknownGroup(group.to_string()));
            }
            self.group_of.insert(key.to_string(), group.to_string());
        }
        Ok(self.ids.request_auto(key))
    }

    pub fn process_pending(&mut self) -> Result<usize, AllocError> {
        self.ids.process_pending()
    }

    pub fn resolved(&self, key: &str) -> Option<u32> {
        self.ids.resolved(key)
    }

    /// Group `key` was requested under, if any.
    pub fn group_of(&self, key: &str) -> Option<&str> {
        self.group_of.get(key).map(String::as_str)
    }

    /// Forget every assignment. Group definitions are kept.
    pub fn reset(&mut self) {
        self.ids.reset();
        self.group_of.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_above_native_states() {
        let mut visual = VisualIdAllocator::new(100);
        assert_eq!(visual.request_auto("a", None), Ok(None));
        visual.process_pending().unwrap();
        assert_eq!(visual.resolved("a"), Some(100));
    }

    #[test]
    fn fixed_visual_id_below_native_range() {
        let mut visual = VisualIdAllocator::new(100);
        assert!(matches!(
            visual.assign_fixed("a", 50),
            Err(AllocError::BelowRange { .. })
        ));
        assert_eq!(visual.assign_fixed("a", 150), Ok(150));
    }

    #[test]
    fn default_groups() {
        let visual = VisualIdAllocator::default();
        let names: Vec<&str> = visual.groups().iter().map(|g| g.id.as_str()).collect();
        assert_eq!(names, ["solid", "open", "liquid"]);
        assert_eq!(visual.native_state_count(), DEFAULT_NATIVE_STATE_COUNT);
    }

    #[test]
    fn unknown_group_rejected() {
        let mut visual = VisualIdAllocator::new(10);
        assert_eq!(
            visual.request_auto("a", Some("glass")),
            Err(AllocError::UnknownGroup("glass".into()))
        );
        assert_eq!(visual.request_auto("a", Some("solid")), Ok(None));
        assert_eq!(visual.group_of("a"), Some("solid"));
    }

    #[test]
    fn duplicate_group_rejected() {
        let err = VisualIdAllocator::with_groups(
            10,
            [AutoStateGroup::new("x", [1]), AutoStateGroup::new("x", [2])],
        )
        .unwrap_err();
        assert_eq!(err, AllocError::DuplicateGroup("x".into()));
    }

    #[test]
    fn groups_do_not_change_selection() {
        let mut visual = VisualIdAllocator::new(10);
        visual.request_auto("a", Some("liquid")).unwrap();
        visual.request_auto("b", None).unwrap();
        visual.request_auto("c", Some("solid")).unwrap();
        visual.process_pending().unwrap();
        assert_eq!(visual.resolved("a"), Some(10));
        assert_eq!(visual.resolved("b"), Some(11));
        assert_eq!(visual.resolved("c"), Some(12));
    }

    #[test]
    fn reset_keeps_groups() {
        let mut visual = VisualIdAllocator::new(10);
        visual.request_auto("a", Some("open")).unwrap();
        visual.process_pending().unwrap();
        visual.reset();
        assert_eq!(visual.resolved("a"), None);
        assert_eq!(visual.group_of("a"), None);
        assert_eq!(visual.groups().len(), 3);
    }
}
