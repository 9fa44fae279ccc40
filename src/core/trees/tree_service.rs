// Membership bookkeeping for the guild tree, plus the validation that has to
// happen before a chart can be drawn.

use super::tree_builder::build_tree;
use super::tree_models::{TreeError, TreeMember, TreeMemberUpdate, TreeNode};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// Name of the virtual root every chart hangs from.
pub const ROOT_NAME: &str = "";

#[async_trait]
pub trait TreeStore: Send + Sync {
    async fn get_member(&self, guild_id: u64, user_id: u64) -> Result<Option<TreeMember>, TreeError>;
    async fn insert_member(&self, member: TreeMember) -> Result<(), TreeError>;
    async fn update_member(
        &self,
        guild_id: u64,
        user_id: u64,
        update: TreeMemberUpdate,
    ) -> Result<(), TreeError>;
    async fn delete_member(&self, guild_id: u64, user_id: u64) -> Result<(), TreeError>;
    /// All members of a guild, oldest first.
    async fn list_members(&self, guild_id: u64) -> Result<Vec<TreeMember>, TreeError>;
}

pub struct TreeService<S: TreeStore> {
    store: S,
}

impl<S: TreeStore> TreeService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn add_member(
        &self,
        guild_id: u64,
        user_id: u64,
        name: &str,
        parent_id: Option<u64>,
    ) -> Result<(), TreeError> {
        let name = clean_name(name)?;
        if parent_id == Some(user_id) {
            return Err(TreeError::SelfParent);
        }

        if self.store.get_member(guild_id, user_id).await?.is_some() {
            return Err(TreeError::AlreadyExists);
        }

        self.store
            .insert_member(TreeMember {
                guild_id,
                user_id,
                name,
                parent_id,
            })
            .await
    }

    pub async fn update_member(
        &self,
        guild_id: u64,
        user_id: u64,
        name: Option<&str>,
        parent_id: Option<u64>,
    ) -> Result<(), TreeError> {
        let name = name.map(clean_name).transpose()?;
        if parent_id == Some(user_id) {
            return Err(TreeError::SelfParent);
        }

        if self.store.get_member(guild_id, user_id).await?.is_none() {
            return Err(TreeError::NotFound);
        }

        self.store
            .update_member(guild_id, user_id, TreeMemberUpdate { name, parent_id })
            .await
    }

    pub async fn remove_member(&self, guild_id: u64, user_id: u64) -> Result<(), TreeError> {
        if self.store.get_member(guild_id, user_id).await?.is_none() {
            return Err(TreeError::NotFound);
        }

        self.store.delete_member(guild_id, user_id).await
    }

    /// Load the guild's members and turn them into a drawable tree.
    pub async fn chart(&self, guild_id: u64) -> Result<TreeNode, TreeError> {
        let members = self.store.list_members(guild_id).await?;
        members_to_tree(&members)
    }
}

fn clean_name(name: &str) -> Result<String, TreeError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TreeError::EmptyName);
    }
    Ok(name.to_string())
}

/// Validate stored members and build the chart tree.
///
/// The result is rooted at [`ROOT_NAME`], whose only child is the member
/// without a parent. Rejects anything the layout cannot draw faithfully:
/// duplicate names, parents outside the tree, several or no roots, cycles.
pub fn members_to_tree(members: &[TreeMember]) -> Result<TreeNode, TreeError> {
    if members.is_empty() {
        return Err(TreeError::Empty);
    }

    let mut names_by_id: HashMap<u64, &str> = HashMap::with_capacity(members.len());
    let mut seen_names: HashSet<&str> = HashSet::with_capacity(members.len());
    for member in members {
        if member.name.trim().is_empty() {
            return Err(TreeError::EmptyName);
        }
        if !seen_names.insert(member.name.as_str()) {
            return Err(TreeError::DuplicateName(member.name.clone()));
        }
        names_by_id.insert(member.user_id, member.name.as_str());
    }

    let mut children_by_parent: HashMap<String, Vec<String>> = HashMap::new();
    for member in members {
        let parent_name = match member.parent_id {
            None => ROOT_NAME,
            Some(parent_id) => {
                *names_by_id
                    .get(&parent_id)
                    .ok_or_else(|| TreeError::DanglingParent {
                        name: member.name.clone(),
                        user_id: member.user_id,
                        parent_id,
                    })?
            }
        };

        children_by_parent
            .entry(parent_name.to_string())
            .or_default()
            .push(member.name.clone());
    }

    match children_by_parent.get(ROOT_NAME).map(Vec::as_slice) {
        None | Some([]) => return Err(TreeError::NoRoot),
        Some([_]) => {}
        Some(roots) => return Err(TreeError::MultipleRoots(roots.to_vec())),
    }

    let tree = build_tree(&children_by_parent, ROOT_NAME)?;

    // Members that never got attached can only be stuck in a loop of their own.
    if tree.node_count() - 1 != members.len() {
        let mut reachable = HashSet::new();
        collect_names(&tree, &mut reachable);
        let stranded = members
            .iter()
            .find(|m| !reachable.contains(m.name.as_str()))
            .map(|m| m.name.clone())
            .unwrap_or_default();
        return Err(TreeError::Cycle { name: stranded });
    }

    Ok(tree)
}

fn collect_names<'a>(node: &'a TreeNode, names: &mut HashSet<&'a str>) {
    names.insert(node.name.as_str());
    for child in &node.children {
        collect_names(child, names);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::trees::tree_builder::extract_rows;
    use std::sync::Mutex;

    /// In-memory store for testing
    struct MockTreeStore {
        members: Mutex<Vec<TreeMember>>,
    }

    impl MockTreeStore {
        fn new() -> Self {
            Self {
                members: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TreeStore for MockTreeStore {
        async fn get_member(
            &self,
            guild_id: u64,
            user_id: u64,
        ) -> Result<Option<TreeMember>, TreeError> {
            let members = self.members.lock().unwrap();
            Ok(members
                .iter()
                .find(|m| m.guild_id == guild_id && m.user_id == user_id)
                .cloned())
        }

        async fn insert_member(&self, member: TreeMember) -> Result<(), TreeError> {
            self.members.lock().unwrap().push(member);
            Ok(())
        }

        async fn update_member(
            &self,
            guild_id: u64,
            user_id: u64,
            update: TreeMemberUpdate,
        ) -> Result<(), TreeError> {
            let mut members = self.members.lock().unwrap();
            if let Some(m) = members
                .iter_mut()
                .find(|m| m.guild_id == guild_id && m.user_id == user_id)
            {
                if let Some(name) = update.name {
                    m.name = name;
                }
                if let Some(parent_id) = update.parent_id {
                    m.parent_id = Some(parent_id);
                }
            }
            Ok(())
        }

        async fn delete_member(&self, guild_id: u64, user_id: u64) -> Result<(), TreeError> {
            self.members
                .lock()
                .unwrap()
                .retain(|m| !(m.guild_id == guild_id && m.user_id == user_id));
            Ok(())
        }

        async fn list_members(&self, guild_id: u64) -> Result<Vec<TreeMember>, TreeError> {
            let members = self.members.lock().unwrap();
            Ok(members.iter().filter(|m| m.guild_id == guild_id).cloned().collect())
        }
    }

    fn member(user_id: u64, name: &str, parent_id: Option<u64>) -> TreeMember {
        TreeMember {
            guild_id: 1,
            user_id,
            name: name.to_string(),
            parent_id,
        }
    }

    #[test]
    fn test_members_to_tree_hangs_root_under_virtual_origin() {
        let members = vec![
            member(10, "Ada", None),
            member(11, "Brook", Some(10)),
            member(12, "Cleo", Some(10)),
            member(13, "Dana", Some(12)),
        ];

        let tree = members_to_tree(&members).unwrap();
        assert_eq!(tree.name, ROOT_NAME);
        assert_eq!(tree.node_count(), 5);

        let rows = extract_rows(&tree);
        let names: Vec<Vec<&str>> = rows
            .iter()
            .map(|r| r.iter().map(|m| m.name.as_str()).collect())
            .collect();
        assert_eq!(names, vec![vec!["Ada"], vec!["Brook", "Cleo"], vec!["Dana"]]);
    }

    #[test]
    fn test_members_to_tree_rejects_empty() {
        assert_eq!(members_to_tree(&[]), Err(TreeError::Empty));
    }

    #[test]
    fn test_members_to_tree_rejects_dangling_parent() {
        let members = vec![member(10, "Ada", None), member(11, "Brook", Some(99))];

        assert_eq!(
            members_to_tree(&members),
            Err(TreeError::DanglingParent {
                name: "Brook".to_string(),
                user_id: 11,
                parent_id: 99
            })
        );
    }

    #[test]
    fn test_members_to_tree_rejects_multiple_roots() {
        let members = vec![member(10, "Ada", None), member(11, "Brook", None)];

        let err = members_to_tree(&members).unwrap_err();
        assert_eq!(
            err,
            TreeError::MultipleRoots(vec!["Ada".to_string(), "Brook".to_string()])
        );
        assert!(err.to_string().ends_with("List of members: Ada, Brook"));
    }

    #[test]
    fn test_members_to_tree_rejects_duplicate_names() {
        let members = vec![member(10, "Ada", None), member(11, "Ada", Some(10))];

        assert_eq!(
            members_to_tree(&members),
            Err(TreeError::DuplicateName("Ada".to_string()))
        );
    }

    #[test]
    fn test_members_to_tree_detects_loops_without_root() {
        let members = vec![member(10, "Ada", Some(11)), member(11, "Brook", Some(10))];

        assert_eq!(members_to_tree(&members), Err(TreeError::NoRoot));
    }

    #[test]
    fn test_members_to_tree_detects_detached_loop() {
        let members = vec![
            member(10, "Ada", None),
            member(11, "Brook", Some(12)),
            member(12, "Cleo", Some(11)),
        ];

        assert!(matches!(
            members_to_tree(&members),
            Err(TreeError::Cycle { .. })
        ));
    }

    #[tokio::test]
    async fn test_add_update_remove_member() {
        let service = TreeService::new(MockTreeStore::new());

        service.add_member(1, 10, "  Ada  ", None).await.unwrap();
        assert_eq!(
            service.add_member(1, 10, "Ada", None).await,
            Err(TreeError::AlreadyExists)
        );

        service.add_member(1, 11, "Brook", Some(10)).await.unwrap();
        service
            .update_member(1, 11, Some("Brooke"), None)
            .await
            .unwrap();

        let tree = service.chart(1).await.unwrap();
        assert_eq!(tree.children[0].name, "Ada");
        assert_eq!(tree.children[0].children[0].name, "Brooke");

        service.remove_member(1, 11).await.unwrap();
        assert_eq!(
            service.remove_member(1, 11).await,
            Err(TreeError::NotFound)
        );
        assert_eq!(
            service.update_member(1, 11, Some("x"), None).await,
            Err(TreeError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_member_input_validation() {
        let service = TreeService::new(MockTreeStore::new());

        assert_eq!(
            service.add_member(1, 10, "   ", None).await,
            Err(TreeError::EmptyName)
        );
        assert_eq!(
            service.add_member(1, 10, "Ada", Some(10)).await,
            Err(TreeError::SelfParent)
        );
    }

    #[tokio::test]
    async fn test_chart_is_scoped_to_guild() {
        let service = TreeService::new(MockTreeStore::new());
        service.add_member(1, 10, "Ada", None).await.unwrap();
        service.add_member(2, 10, "Ada", None).await.unwrap();
        service.add_member(2, 11, "Zed", None).await.unwrap();

        assert!(service.chart(1).await.is_ok());
        assert!(matches!(
            service.chart(2).await,
            Err(TreeError::MultipleRoots(_))
        ));
        assert_eq!(service.chart(3).await, Err(TreeError::Empty));
    }
}
