use std::cmp::Reverse;
use std::collections::BTreeMap;

use time::OffsetDateTime;

use crate::error::{CodecError, Result};
use crate::node::LwM2mNode;
use crate::path::LwM2mPath;

/// Sort key for timestamps: "current" (`None`) first, then most recent first.
pub(crate) type TimestampKey = Option<Reverse<OffsetDateTime>>;

pub(crate) fn key(timestamp: Option<OffsetDateTime>) -> TimestampKey {
    timestamp.map(Reverse)
}

/// A node together with the time it was sampled; `None` means current value.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampedNode {
    pub timestamp: Option<OffsetDateTime>,
    pub node: LwM2mNode,
}

impl TimestampedNode {
    pub fn new(timestamp: Option<OffsetDateTime>, node: LwM2mNode) -> Self {
        Self { timestamp, node }
    }

    pub fn current(node: LwM2mNode) -> Self {
        Self::new(None, node)
    }

    pub fn is_timestamped(&self) -> bool {
        self.timestamp.is_some()
    }
}

/// Sort a series in place: current value first, then most recent first.
pub(crate) fn sort_series(series: &mut [TimestampedNode]) {
    series.sort_by_key(|n| key(n.timestamp));
}

/// Nodes of several paths sampled at several points in time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimestampedNodes {
    nodes: BTreeMap<TimestampKey, BTreeMap<LwM2mPath, LwM2mNode>>,
}

impl TimestampedNodes {
    pub fn builder() -> TimestampedNodesBuilder {
        TimestampedNodesBuilder::default()
    }

    /// Nodes sampled at `timestamp`.
    pub fn nodes_at(&self, timestamp: Option<OffsetDateTime>) -> Option<&BTreeMap<LwM2mPath, LwM2mNode>> {
        self.nodes.get(&key(timestamp))
    }

    /// Timestamps present: `None` first, then descending.
    pub fn timestamps(&self) -> Vec<Option<OffsetDateTime>> {
        self.nodes.keys().map(|k| k.map(|Reverse(t)| t)).collect()
    }

    /// Every (timestamp, path, node) triple in timestamp order.
    pub fn iter(&self) -> impl Iterator<Item = (Option<OffsetDateTime>, &LwM2mPath, &LwM2mNode)> {
        self.nodes.iter().flat_map(|(k, nodes)| {
            let timestamp = k.map(|Reverse(t)| t);
            nodes.iter().map(move |(path, node)| (timestamp, path, node))
        })
    }

    /// One node per path, keeping the most recent one.
    pub fn most_recent_nodes(&self) -> BTreeMap<LwM2mPath, LwM2mNode> {
        self.most_recent_timestamped_nodes()
            .into_iter()
            .map(|(path, n)| (path, n.node))
            .collect()
    }

    /// One timestamped node per path, keeping the most recent one.
    ///
    /// A current value (no timestamp) wins over any timestamped one.
    pub fn most_recent_timestamped_nodes(&self) -> BTreeMap<LwM2mPath, TimestampedNode> {
        let mut result = BTreeMap::new();
        for (timestamp, path, node) in self.iter() {
            result
                .entry(*path)
                .or_insert_with(|| TimestampedNode::new(timestamp, node.clone()));
        }
        result
    }

    /// Every node of every timestamp, merged by path; the oldest sample wins.
    ///
    /// Mostly useful when the collection holds a single timestamp.
    pub fn flatten_nodes(&self) -> BTreeMap<LwM2mPath, LwM2mNode> {
        let mut result = BTreeMap::new();
        for (_, path, node) in self.iter() {
            result.insert(*path, node.clone());
        }
        result
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.values().map(BTreeMap::len).sum()
    }
}

/// Collects (timestamp, path, node) triples and groups them by timestamp.
#[derive(Debug, Clone, Default)]
pub struct TimestampedNodesBuilder {
    entries: Vec<(Option<OffsetDateTime>, LwM2mPath, LwM2mNode)>,
    raise_on_duplicate: bool,
    expected_paths: Option<Vec<LwM2mPath>>,
}

impl TimestampedNodesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail `build` when a (timestamp, path) pair is added twice instead of
    /// keeping the last node.
    pub fn raise_on_duplicate(mut self, raise: bool) -> Self {
        self.raise_on_duplicate = raise;
        self
    }

    /// Restrict accepted paths to these paths and their descendants.
    pub fn expected_paths<I: IntoIterator<Item = LwM2mPath>>(mut self, paths: I) -> Self {
        self.expected_paths = Some(paths.into_iter().collect());
        self
    }

    pub fn put(mut self, timestamp: Option<OffsetDateTime>, path: LwM2mPath, node: LwM2mNode) -> Self {
        self.entries.push((timestamp, path, node));
        self
    }

    /// Add a current value.
    pub fn put_current(self, path: LwM2mPath, node: LwM2mNode) -> Self {
        self.put(None, path, node)
    }

    pub fn add_nodes<I>(mut self, timestamp: Option<OffsetDateTime>, nodes: I) -> Self
    where
        I: IntoIterator<Item = (LwM2mPath, LwM2mNode)>,
    {
        self.entries
            .extend(nodes.into_iter().map(|(path, node)| (timestamp, path, node)));
        self
    }

    /// Add every entry of an existing collection.
    pub fn add(mut self, other: &TimestampedNodes) -> Self {
        self.entries.extend(
            other
                .iter()
                .map(|(timestamp, path, node)| (timestamp, *path, node.clone())),
        );
        self
    }

    pub fn build(self) -> Result<TimestampedNodes> {
        let mut nodes: BTreeMap<TimestampKey, BTreeMap<LwM2mPath, LwM2mNode>> = BTreeMap::new();

        for (timestamp, path, node) in self.entries {
            if !node.is_consistent_with(&path) {
                return Err(CodecError::invalid_at(
                    path,
                    format!("{} with id {:?} cannot be stored at this path", node.kind(), node.id()),
                ));
            }

            if let Some(expected) = &self.expected_paths {
                if !expected.iter().any(|p| path.starts_with(p)) {
                    return Err(CodecError::invalid_at(
                        path,
                        format!("path is not below any of the expected paths {:?}", expected),
                    ));
                }
            }

            let previous = nodes.entry(key(timestamp)).or_default().insert(path, node);
            if previous.is_some() && self.raise_on_duplicate {
                return Err(CodecError::DuplicateId {
                    kind: "path",
                    id: path.to_string(),
                    path,
                });
            }
        }

        Ok(TimestampedNodes { nodes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::LwM2mResource;

    fn at(seconds: i64) -> Option<OffsetDateTime> {
        Some(OffsetDateTime::from_unix_timestamp(seconds).unwrap())
    }

    fn battery(level: i64) -> LwM2mNode {
        LwM2mResource::single(9, level).into()
    }

    const BATTERY: LwM2mPath = LwM2mPath::Resource(3, 0, 9);

    #[test]
    fn test_timestamps_sorted_current_then_descending() {
        let nodes = TimestampedNodes::builder()
            .put(at(100), BATTERY, battery(10))
            .put(None, BATTERY, battery(30))
            .put(at(300), BATTERY, battery(20))
            .build()
            .unwrap();

        assert_eq!(nodes.timestamps(), vec![None, at(300), at(100)]);
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes.most_recent_nodes()[&BATTERY], battery(30));
        assert_eq!(nodes.flatten_nodes()[&BATTERY], battery(10));
    }

    #[test]
    fn test_most_recent_timestamped() {
        let nodes = TimestampedNodes::builder()
            .put(at(100), BATTERY, battery(10))
            .put(at(300), BATTERY, battery(20))
            .put(at(100), LwM2mPath::Resource(3, 0, 10), LwM2mResource::single(10, 15i64).into())
            .build()
            .unwrap();

        let recent = nodes.most_recent_timestamped_nodes();
        assert_eq!(recent[&BATTERY], TimestampedNode::new(at(300), battery(20)));
        assert_eq!(recent[&LwM2mPath::Resource(3, 0, 10)].timestamp, at(100));
        assert_eq!(nodes.nodes_at(at(300)).map(|m| m.len()), Some(1));
        assert!(nodes.nodes_at(at(200)).is_none());
    }

    #[test]
    fn test_duplicates() {
        let builder = TimestampedNodes::builder()
            .put(at(100), BATTERY, battery(10))
            .put(at(100), BATTERY, battery(11));

        let last_wins = builder.clone().build().unwrap();
        assert_eq!(last_wins.nodes_at(at(100)).unwrap()[&BATTERY], battery(11));

        let err = builder.raise_on_duplicate(true).build().unwrap_err();
        assert!(matches!(err, CodecError::DuplicateId { .. }));
    }

    #[test]
    fn test_node_must_match_path() {
        let err = TimestampedNodes::builder()
            .put_current(LwM2mPath::Resource(3, 0, 10), battery(10))
            .build()
            .unwrap_err();
        assert_eq!(err.path(), Some(&LwM2mPath::Resource(3, 0, 10)));
    }

    #[test]
    fn test_expected_paths() {
        let builder = TimestampedNodes::builder()
            .expected_paths([LwM2mPath::ObjectInstance(3, 0)])
            .put_current(BATTERY, battery(10));
        assert!(builder.clone().build().is_ok());

        let err = builder
            .put_current(LwM2mPath::Resource(1, 0, 1), LwM2mResource::single(1, 300i64).into())
            .build();
        assert!(err.is_err());
    }

    #[test]
    fn test_add_merges_collections() {
        let first = TimestampedNodes::builder()
            .put(at(100), BATTERY, battery(10))
            .build()
            .unwrap();
        let merged = TimestampedNodes::builder()
            .add(&first)
            .add_nodes(at(200), [(BATTERY, battery(12))])
            .build()
            .unwrap();

        assert_eq!(merged.timestamps(), vec![at(200), at(100)]);
        assert!(!merged.is_empty());
        assert!(TimestampedNodes::default().is_empty());
    }

    #[test]
    fn test_sort_series() {
        let mut series = vec![
            TimestampedNode::new(at(1), battery(1)),
            TimestampedNode::new(at(3), battery(3)),
            TimestampedNode::current(battery(0)),
        ];
        sort_series(&mut series);
        let order: Vec<_> = series.iter().map(|n| n.timestamp).collect();
        assert_eq!(order, vec![None, at(3), at(1)]);
    }
}
