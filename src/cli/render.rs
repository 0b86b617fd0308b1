//! Tree and table rendering of menus

use termtree::Tree;
use tracing::instrument;

use crate::application::{MenuTree, TreeResult};
use crate::domain::{LinkTarget, MenuEntry, Node, Partition};
use crate::infrastructure::NodeStore;

/// One-line label: path, title, link and a marker for new-window links.
pub fn item_label(node: &Node<MenuEntry>) -> String {
    let entry = &node.payload;
    let mut label = format!("{} {}", node.path, entry.title);
    if !entry.link.is_empty() {
        label.push_str(&format!(" <{}>", entry.link));
    }
    if entry.target == LinkTarget::NewWindow {
        label.push_str(" [new window]");
    }
    label
}

pub fn partition_label(partition: &Partition) -> String {
    match &partition.group {
        Some(group) => format!("{} ({}) [{}]", partition.name, partition.identifier, group),
        None => format!("{} ({})", partition.name, partition.identifier),
    }
}

/// Build a printable tree of a whole menu, siblings in display order.
#[instrument(level = "debug", skip(tree), fields(menu = %partition.identifier))]
pub fn menu_tree<S>(tree: &MenuTree<S>, partition: &Partition) -> TreeResult<Tree<String>>
where
    S: NodeStore<Payload = MenuEntry>,
{
    let leaves = tree
        .root_nodes(partition.id)?
        .iter()
        .map(|node| item_tree(tree, node))
        .collect::<TreeResult<Vec<_>>>()?;
    Ok(Tree::new(partition_label(partition)).with_leaves(leaves))
}

fn item_tree<S>(tree: &MenuTree<S>, node: &Node<MenuEntry>) -> TreeResult<Tree<String>>
where
    S: NodeStore<Payload = MenuEntry>,
{
    if node.is_leaf() {
        return Ok(Tree::new(item_label(node)));
    }
    let leaves = tree
        .children_of(node)?
        .iter()
        .map(|child| item_tree(tree, child))
        .collect::<TreeResult<Vec<_>>>()?;
    Ok(Tree::new(item_label(node)).with_leaves(leaves))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryStore;

    #[test]
    fn test_menu_tree_nests_children_in_order() {
        let mut tree = MenuTree::with_store(MemoryStore::new());
        let menu = tree.create_partition("main", "Main", None).unwrap();
        let home = tree
            .insert_child(None, menu.id, MenuEntry::new("Home", "/", LinkTarget::SameWindow).unwrap())
            .unwrap();
        tree.insert_child(Some(&home), menu.id, MenuEntry::new("News", "/news", LinkTarget::NewWindow).unwrap())
            .unwrap();

        let rendered = menu_tree(&tree, &menu).unwrap().to_string();

        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Main (main)");
        assert!(lines[1].contains("0001 Home </>"));
        assert!(lines[2].contains("00010001 News </news> [new window]"));
    }
}
