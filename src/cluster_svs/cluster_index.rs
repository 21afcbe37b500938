//! A light wrapper on top of an interval tree for looking up clusters by position
//!

use std::collections::BTreeSet;

use bio::data_structures::interval_tree::IntervalTree;

use crate::int_range::IntRange;

/// Dynamic interval index from cluster ranges to cluster index values
///
/// The underlying tree is insert-only, so removal invalidates the cluster's current entry rather
/// than deleting it. Stale entries are filtered out of every query, and the tree is rebuilt once
/// stale entries outnumber live ones.
///
pub struct ClusterIndex {
    tree: IntervalTree<i64, usize>,

    /// Current indexed range for each cluster index, None if not indexed
    ranges: Vec<Option<IntRange>>,

    live_count: usize,
    stale_count: usize,
}

impl Default for ClusterIndex {
    fn default() -> Self {
        Self {
            tree: IntervalTree::new(),
            ranges: Vec::new(),
            live_count: 0,
            stale_count: 0,
        }
    }
}

impl ClusterIndex {
    /// Index `cluster_index` over `range`
    ///
    /// Each cluster can only be indexed over one range at a time.
    ///
    pub fn insert(&mut self, cluster_index: usize, range: IntRange) {
        assert!(range.size() > 0);
        if cluster_index >= self.ranges.len() {
            self.ranges.resize(cluster_index + 1, None);
        }
        assert!(
            self.ranges[cluster_index].is_none(),
            "Cluster {cluster_index} is already indexed"
        );
        self.tree.insert(range.start..range.end, cluster_index);
        self.ranges[cluster_index] = Some(range);
        self.live_count += 1;
    }

    /// Remove the entry for `cluster_index`, returns false if it wasn't indexed
    pub fn remove(&mut self, cluster_index: usize) -> bool {
        match self.ranges.get_mut(cluster_index) {
            Some(x) if x.is_some() => {
                *x = None;
                self.live_count -= 1;
                self.stale_count += 1;
                if self.stale_count > self.live_count {
                    self.rebuild();
                }
                true
            }
            _ => false,
        }
    }

    /// Return the index of every cluster whose range overlaps `range`, in ascending order
    ///
    pub fn find_overlaps(&self, range: &IntRange) -> Vec<usize> {
        let mut hits = BTreeSet::new();
        for entry in self.tree.find(range.start..range.end) {
            let cluster_index = *entry.data();
            let interval = entry.interval();
            let is_live = matches!(
                &self.ranges[cluster_index],
                Some(x) if x.start == interval.start && x.end == interval.end
            );
            if is_live {
                hits.insert(cluster_index);
            }
        }
        hits.into_iter().collect()
    }

    /// Rebuild the tree from live entries only
    fn rebuild(&mut self) {
        let mut tree = IntervalTree::new();
        for (cluster_index, range) in self.ranges.iter().enumerate() {
            if let Some(range) = range {
                tree.insert(range.start..range.end, cluster_index);
            }
        }
        self.tree = tree;
        self.stale_count = 0;
    }
}
