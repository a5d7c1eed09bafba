//! Id-addressed lookup of decoded nodes and path resolution
//!
//! Every node is registered under its id the moment it is created. Ids of
//! suites, tests and keywords are segmented (`s1-s2-t3-k1`) and describe the
//! route from the root; resolving such a path may need split files, so it is
//! continuation-based.

use crate::error::{Error, Result};
use crate::model::Node;
use crate::NodeKind;
use futures::channel::oneshot;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use tracing::debug;

/// Id of the root suite
pub const ROOT_ID: &str = "s1";

const MESSAGE_ID_PREFIX: &str = "element-id-";

/// One `{s|t|k}{n}` segment of a node id, with a 0-based index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSegment {
    pub kind: NodeKind,
    pub index: usize,
}

impl PathSegment {
    pub fn parse(segment: &str) -> Option<Self> {
        let mut chars = segment.chars();
        let kind = NodeKind::from_id_letter(chars.next()?)?;
        let ordinal: usize = chars.as_str().parse().ok()?;
        let index = ordinal.checked_sub(1)?;
        Some(Self { kind, index })
    }
}

/// Split a node id into its segments below the root.
///
/// The root segment itself is skipped. Parsing stops at the first segment that
/// is not a valid `{s|t|k}{n}`, so a malformed tail only shortens the path.
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    path.split('-')
        .skip(1)
        .map_while(PathSegment::parse)
        .collect()
}

/// Registry of every node decoded so far, keyed by id
#[derive(Default)]
pub struct PathRegistry {
    nodes: RefCell<HashMap<String, Node>>,
    message_counter: Cell<u64>,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node` unless its id is taken; returns the registered node
    pub fn register(&self, node: Node) -> Node {
        self.nodes
            .borrow_mut()
            .entry(node.id().to_string())
            .or_insert(node)
            .clone()
    }

    pub fn find(&self, id: &str) -> Option<Node> {
        self.nodes.borrow().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    /// Fresh `element-id-N` id for a node without a structural id
    pub fn next_message_id(&self) -> String {
        let next = self.message_counter.get() + 1;
        self.message_counter.set(next);
        format!("{}{}", MESSAGE_ID_PREFIX, next)
    }

    /// Drop all registered nodes
    pub(crate) fn clear(&self) {
        self.nodes.borrow_mut().clear();
    }

    /// Resolve `path` from the root, loading split files on the way.
    ///
    /// `callback` receives the ids from the root down to the deepest node
    /// that could be found. An unknown segment truncates the chain; only
    /// decode failures are errors.
    pub fn resolve_path(&self, path: &str, callback: impl FnOnce(Result<Vec<String>>) + 'static) {
        let Some(root) = self.find(ROOT_ID) else {
            debug!(path, "root suite not decoded; nothing to resolve");
            return callback(Ok(Vec::new()));
        };
        let chain = vec![root.id().to_string()];
        load_items(root, parse_path(path).into_iter(), chain, Box::new(callback));
    }

    /// Future form of [`resolve_path`](Self::resolve_path)
    pub fn resolve(&self, path: &str) -> impl Future<Output = Result<Vec<String>>> {
        let (tx, rx) = oneshot::channel();
        self.resolve_path(path, move |result| {
            let _ = tx.send(result);
        });
        let path = path.to_string();
        async move { rx.await.unwrap_or_else(|_| Err(Error::LoadAbandoned(path))) }
    }
}

impl std::fmt::Debug for PathRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathRegistry")
            .field("nodes", &self.len())
            .field("messages", &self.message_counter.get())
            .finish()
    }
}

type Continuation = Box<dyn FnOnce(Result<Vec<String>>)>;

fn load_items(
    current: Node,
    mut segments: std::vec::IntoIter<PathSegment>,
    mut chain: Vec<String>,
    callback: Continuation,
) {
    let Some(segment) = segments.next() else {
        return callback(Ok(chain));
    };
    let node = current.clone();
    current.call_when_children_ready(move || match node.child(segment.kind, segment.index) {
        Ok(Some(child)) => {
            chain.push(child.id().to_string());
            load_items(child, segments, chain, callback);
        }
        Ok(None) => {
            debug!(
                parent = node.id(),
                kind = %segment.kind,
                index = segment.index,
                "path segment not found; returning truncated chain"
            );
            callback(Ok(chain));
        }
        Err(e) => callback(Err(e)),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_segments() {
        let segments = parse_path("s1-s4-t2-k10");
        assert_eq!(
            segments,
            vec![
                PathSegment { kind: NodeKind::Suite, index: 3 },
                PathSegment { kind: NodeKind::Test, index: 1 },
                PathSegment { kind: NodeKind::Keyword, index: 9 },
            ]
        );
    }

    #[test]
    fn test_malformed_segment_truncates() {
        assert_eq!(parse_path("s1-t1-x9-k1").len(), 1);
        assert_eq!(parse_path("s1-t0").len(), 0);
        assert_eq!(parse_path("s1-k").len(), 0);
        assert!(parse_path("s1").is_empty());
    }

    #[test]
    fn test_message_ids_are_sequential() {
        let registry = PathRegistry::new();
        assert_eq!(registry.next_message_id(), "element-id-1");
        assert_eq!(registry.next_message_id(), "element-id-2");
    }

    #[test]
    fn test_resolve_without_root_is_empty() {
        let registry = PathRegistry::new();
        let result = futures::executor::block_on(registry.resolve("s1-t1"));
        assert!(result.unwrap().is_empty());
    }
}
