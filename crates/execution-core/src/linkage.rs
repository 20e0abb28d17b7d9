//! Link-group index for OCO and bracket orders.
//!
//! Maps a link identifier to its ordered members and each member back to its
//! group. Bracket trigger parents sit at the back of their group and are also
//! recorded in a parent set; contingents are pushed to the front.
//!
//! The containers never leave this module. Callers get owned results from
//! atomic operations only.

use std::collections::{HashMap, HashSet, VecDeque};

use parking_lot::RwLock;
use tracing::{debug, error};

use crate::error::LinkageError;
use crate::execution::ContingencyType;

/// Number of contingents hanging off a bracket parent.
pub const BRACKET_CHILDREN: usize = 2;

#[derive(Debug, Default)]
struct Groups {
    members: HashMap<String, VecDeque<String>>,
    link_of: HashMap<String, String>,
    parents: HashSet<String>,
    /// Members whose order reached a final state.
    retired: HashSet<String>,
}

/// Thread-safe link-group index.
#[derive(Debug, Default)]
pub struct LinkageIndex {
    groups: RwLock<Groups>,
}

impl LinkageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `order_id` to the group `link_id`, creating the group if needed.
    ///
    /// One-Triggers-Other members are trigger parents: appended at the back
    /// and remembered in the parent set. Everything else goes to the front.
    /// Registering an id that is already a member is a no-op.
    pub fn register_membership(&self, link_id: &str, order_id: &str, contingency: ContingencyType) {
        if link_id.is_empty() {
            return;
        }

        let mut guard = self.groups.write();
        let groups = &mut *guard;
        if groups.link_of.contains_key(order_id) {
            return;
        }

        let members = groups.members.entry(link_id.to_string()).or_default();
        if contingency.is_trigger_parent() {
            members.push_back(order_id.to_string());
            groups.parents.insert(order_id.to_string());
        } else {
            members.push_front(order_id.to_string());
        }
        groups
            .link_of
            .insert(order_id.to_string(), link_id.to_string());

        debug!(
            link_id = %link_id,
            order_id = %order_id,
            contingency = ?contingency,
            "registered link group member"
        );
    }

    /// Replace a member's identifier, keeping its position and parent flag.
    pub fn rename_member(&self, old_id: &str, new_id: &str) -> bool {
        let mut groups = self.groups.write();
        let Some(link_id) = groups.link_of.remove(old_id) else {
            return false;
        };

        if let Some(members) = groups.members.get_mut(&link_id) {
            for member in members.iter_mut() {
                if member.as_str() == old_id {
                    *member = new_id.to_string();
                }
            }
        }
        if groups.parents.remove(old_id) {
            groups.parents.insert(new_id.to_string());
        }
        if groups.retired.remove(old_id) {
            groups.retired.insert(new_id.to_string());
        }
        groups.link_of.insert(new_id.to_string(), link_id);
        true
    }

    /// Link identifier of the group containing `order_id`.
    pub fn group_of(&self, order_id: &str) -> Option<String> {
        self.groups.read().link_of.get(order_id).cloned()
    }

    pub fn is_parent(&self, order_id: &str) -> bool {
        self.groups.read().parents.contains(order_id)
    }

    /// Every member of the group containing `order_id`, including itself, in
    /// group order.
    pub fn members_of(&self, order_id: &str) -> Option<Vec<String>> {
        let groups = self.groups.read();
        let link_id = groups.link_of.get(order_id)?;
        groups
            .members
            .get(link_id)
            .map(|m| m.iter().cloned().collect())
    }

    /// All other members of `order_id`'s group.
    pub fn siblings_of(&self, order_id: &str) -> Result<Vec<String>, LinkageError> {
        let groups = self.groups.read();
        let link_id = groups
            .link_of
            .get(order_id)
            .ok_or_else(|| LinkageError::NotLinked(order_id.to_string()))?;

        Ok(groups
            .members
            .get(link_id)
            .map(|m| m.iter().filter(|id| *id != order_id).cloned().collect())
            .unwrap_or_default())
    }

    /// Siblings of `order_id`, failing unless there are exactly `expected`.
    pub fn siblings_exact(
        &self,
        order_id: &str,
        expected: usize,
    ) -> Result<Vec<String>, LinkageError> {
        let siblings = self.siblings_of(order_id)?;
        if siblings.len() != expected {
            let link_id = self.group_of(order_id).unwrap_or_default();
            error!(
                link_id = %link_id,
                order_id = %order_id,
                expected,
                found = siblings.len(),
                "link group has unexpected arity"
            );
            return Err(LinkageError::MalformedGroup {
                link_id,
                order_id: order_id.to_string(),
                expected,
                found: siblings.len(),
            });
        }
        Ok(siblings)
    }

    /// The two contingents of a bracket parent.
    pub fn bracket_children(&self, parent_id: &str) -> Result<[String; 2], LinkageError> {
        let children = self.siblings_exact(parent_id, BRACKET_CHILDREN)?;
        let mut iter = children.into_iter();
        match (iter.next(), iter.next()) {
            (Some(first), Some(second)) => Ok([first, second]),
            _ => Err(LinkageError::MalformedGroup {
                link_id: self.group_of(parent_id).unwrap_or_default(),
                order_id: parent_id.to_string(),
                expected: BRACKET_CHILDREN,
                found: 0,
            }),
        }
    }

    /// Mark a member as finished. Once every member of a group is finished the
    /// group is dropped. Returns true when that happened.
    pub fn retire_member(&self, order_id: &str) -> bool {
        let mut guard = self.groups.write();
        let groups = &mut *guard;
        let Some(link_id) = groups.link_of.get(order_id).cloned() else {
            return false;
        };
        groups.retired.insert(order_id.to_string());

        let all_retired = groups
            .members
            .get(&link_id)
            .map(|m| m.iter().all(|id| groups.retired.contains(id)))
            .unwrap_or(true);
        if !all_retired {
            return false;
        }

        if let Some(members) = groups.members.remove(&link_id) {
            for id in members {
                groups.link_of.remove(&id);
                groups.parents.remove(&id);
                groups.retired.remove(&id);
            }
        }
        debug!(link_id = %link_id, "link group dissolved");
        true
    }

    /// Drop a member outright (its submission never reached the exchange).
    pub fn remove_member(&self, order_id: &str) {
        let mut groups = self.groups.write();
        let Some(link_id) = groups.link_of.remove(order_id) else {
            return;
        };
        groups.parents.remove(order_id);
        groups.retired.remove(order_id);

        let now_empty = match groups.members.get_mut(&link_id) {
            Some(members) => {
                members.retain(|id| id != order_id);
                members.is_empty()
            }
            None => false,
        };
        if now_empty {
            groups.members.remove(&link_id);
        }
    }

    /// Number of registered groups.
    pub fn group_count(&self) -> usize {
        self.groups.read().members.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_bracket(index: &LinkageIndex) {
        index.register_membership("L1", "entry", ContingencyType::OneTriggersTheOther);
        index.register_membership("L1", "stop", ContingencyType::OneCancelsTheOther);
        index.register_membership("L1", "profit", ContingencyType::OneCancelsTheOther);
    }

    #[test]
    fn test_bracket_layout() {
        let index = LinkageIndex::new();
        make_bracket(&index);

        assert_eq!(
            index.members_of("stop").unwrap(),
            vec!["profit", "stop", "entry"]
        );
        assert!(index.is_parent("entry"));
        assert!(!index.is_parent("stop"));
        assert_eq!(index.group_of("profit").as_deref(), Some("L1"));
    }

    #[test]
    fn test_siblings_exclude_self() {
        let index = LinkageIndex::new();
        make_bracket(&index);

        let siblings = index.siblings_of("stop").unwrap();
        assert_eq!(siblings, vec!["profit", "entry"]);

        let children = index.bracket_children("entry").unwrap();
        assert_eq!(children, ["profit".to_string(), "stop".to_string()]);
    }

    #[test]
    fn test_bracket_children_malformed() {
        let index = LinkageIndex::new();
        index.register_membership("L1", "entry", ContingencyType::OneTriggersTheOther);
        index.register_membership("L1", "stop", ContingencyType::OneCancelsTheOther);

        let err = index.bracket_children("entry").unwrap_err();
        assert_eq!(
            err,
            LinkageError::MalformedGroup {
                link_id: "L1".into(),
                order_id: "entry".into(),
                expected: 2,
                found: 1,
            }
        );
    }

    #[test]
    fn test_not_linked() {
        let index = LinkageIndex::new();
        assert_eq!(
            index.siblings_of("solo"),
            Err(LinkageError::NotLinked("solo".into()))
        );
        assert!(index.members_of("solo").is_none());
    }

    #[test]
    fn test_empty_link_id_ignored() {
        let index = LinkageIndex::new();
        index.register_membership("", "solo", ContingencyType::OneCancelsTheOther);
        assert_eq!(index.group_of("solo"), None);
    }

    #[test]
    fn test_duplicate_registration_is_noop() {
        let index = LinkageIndex::new();
        index.register_membership("L1", "a", ContingencyType::OneCancelsTheOther);
        index.register_membership("L1", "a", ContingencyType::OneCancelsTheOther);
        assert_eq!(index.members_of("a").unwrap(), vec!["a"]);
    }

    #[test]
    fn test_rename_member() {
        let index = LinkageIndex::new();
        make_bracket(&index);

        assert!(index.rename_member("entry", "real-entry"));
        assert!(index.is_parent("real-entry"));
        assert_eq!(index.group_of("entry"), None);
        assert_eq!(
            index.members_of("stop").unwrap(),
            vec!["profit", "stop", "real-entry"]
        );
        assert!(!index.rename_member("unknown", "x"));
    }

    #[test]
    fn test_retire_dissolves_group() {
        let index = LinkageIndex::new();
        make_bracket(&index);

        assert!(!index.retire_member("entry"));
        assert!(!index.retire_member("stop"));
        // Retired members still count as siblings until the group goes away.
        assert_eq!(index.siblings_of("profit").unwrap().len(), 2);

        assert!(index.retire_member("profit"));
        assert_eq!(index.group_count(), 0);
        assert!(!index.is_parent("entry"));
    }

    #[test]
    fn test_remove_member() {
        let index = LinkageIndex::new();
        index.register_membership("L2", "a", ContingencyType::OneCancelsTheOther);
        index.register_membership("L2", "b", ContingencyType::OneCancelsTheOther);

        index.remove_member("a");
        assert_eq!(index.members_of("b").unwrap(), vec!["b"]);
        index.remove_member("b");
        assert_eq!(index.group_count(), 0);
    }
}
