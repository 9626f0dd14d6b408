use super::ProcessId;
use crate::nodes::{Node, NodeKind};
use std::sync::Arc;
use vista_utils::{Pool, PoolHandle};

/// Runtime state of a `load` node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LoadState {
    /// Not seen by any render yet.
    Unrequested,
    Pending {
        process: ProcessId,
        attempt: u32,
        log_target: Option<Arc<str>>,
    },
    Loaded,
    Failed,
}

#[derive(Debug, Clone)]
pub(crate) struct GraphNode {
    pub kind: NodeKind,
    pub children: Vec<PoolHandle>,
    /// Only present on `load` nodes.
    pub load: Option<LoadState>,
}

/// The scene's own copy of the node tree, with runtime state attached.
///
/// Nodes live in a generational pool, so that in-flight fetches can refer to their `load` node
/// by handle, and grafted content can be appended without touching the rest of the tree.
#[derive(Debug, Clone)]
pub(crate) struct SceneGraph {
    pool: Pool<GraphNode>,
    root: PoolHandle,
}

impl SceneGraph {
    pub fn new(root: &Node) -> Self {
        let mut pool = Pool::new();
        let root = insert(&mut pool, root);
        Self { pool, root }
    }

    pub fn root(&self) -> PoolHandle {
        self.root
    }

    pub fn get(&self, handle: PoolHandle) -> Option<&GraphNode> {
        self.pool.try_get(handle)
    }

    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut GraphNode> {
        self.pool.try_get_mut(handle)
    }

    /// Appends copies of `nodes` as children of `parent`.
    pub fn graft(&mut self, parent: PoolHandle, nodes: &[Node]) {
        if !self.pool.is_valid(parent) {
            return;
        }
        let grafted: Vec<_> = nodes.iter().map(|node| insert(&mut self.pool, node)).collect();
        self.pool.get_mut(parent).children.extend(grafted);
    }

    pub fn load_state(&self, handle: PoolHandle) -> Option<&LoadState> {
        self.get(handle)?.load.as_ref()
    }

    pub fn set_load_state(&mut self, handle: PoolHandle, state: LoadState) {
        if let Some(node) = self.get_mut(handle) {
            if node.load.is_some() {
                node.load = Some(state);
            }
        }
    }

    /// Total amount of nodes, including grafted ones.
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    /// Rebuilds a plain node tree, including grafted content.
    pub fn snapshot(&self) -> Node {
        self.snapshot_node(self.root)
    }

    fn snapshot_node(&self, handle: PoolHandle) -> Node {
        let node = self.pool.get(handle);
        Node {
            kind: node.kind.clone(),
            children: node
                .children
                .iter()
                .map(|&child| self.snapshot_node(child))
                .collect(),
        }
    }
}

fn insert(pool: &mut Pool<GraphNode>, node: &Node) -> PoolHandle {
    let children = node.children.iter().map(|child| insert(pool, child)).collect();
    let load = matches!(node.kind, NodeKind::Load(_)).then_some(LoadState::Unrequested);
    pool.allocate(GraphNode {
        kind: node.kind.clone(),
        children,
        load,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::params::{Cube, Sphere};

    #[test]
    fn grafting_extends_the_tree() {
        let tree = Node::group([Node::load("a.js"), Node::sphere(Sphere::default())]);
        let mut graph = SceneGraph::new(&tree);
        assert_eq!(graph.len(), 3);

        let load = graph.get(graph.root()).unwrap().children[0];
        assert_eq!(graph.load_state(load), Some(&LoadState::Unrequested));

        graph.graft(
            load,
            &[
                Node::cube(Cube::default()),
                Node::group([Node::cube(Cube::default())]),
            ],
        );
        graph.set_load_state(load, LoadState::Loaded);
        assert_eq!(graph.len(), 6);
        assert_eq!(graph.load_state(load), Some(&LoadState::Loaded));

        let snapshot = graph.snapshot();
        assert_eq!(snapshot.count(), 6);
        assert_eq!(snapshot.children[0].children.len(), 2);

        // Only load nodes carry a load state
        let sphere = graph.get(graph.root()).unwrap().children[1];
        graph.set_load_state(sphere, LoadState::Failed);
        assert_eq!(graph.load_state(sphere), None);
    }
}
