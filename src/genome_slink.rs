//! Single linkage clustering of genome-sorted nodes
//!
//! Nodes are consumed in genome order and each new node is only compared to the set of nodes
//! which can still be reached from its position. Clusters are returned lazily, as soon as no
//! later node could join them.
//!

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::int_range::{IntRange, get_recip_overlap};

/// A genomic entity with one or two endpoints
///
/// Single-ended entities should report the same chromosome and position for both endpoints.
///
pub trait GenomeNode {
    fn chrom_a(&self) -> &str;
    fn pos_a(&self) -> i64;
    fn chrom_b(&self) -> &str;
    fn pos_b(&self) -> i64;

    fn strands(&self) -> Option<&str> {
        None
    }

    /// Rightmost position of the node on its primary chromosome
    ///
    fn reach(&self) -> i64 {
        if self.chrom_a() == self.chrom_b() {
            std::cmp::max(self.pos_a(), self.pos_b())
        } else {
            self.pos_a()
        }
    }
}

#[derive(Clone, Debug)]
pub struct LinkageSettings {
    /// Max distance between matching endpoints of linked nodes
    pub distance: i64,

    /// If true, linked nodes must have identical strands
    pub match_strands: bool,

    /// Min reciprocal overlap of intrachromosomal linked nodes, no overlap test is made if this is 0
    pub min_recip_overlap: f64,
}

impl Default for LinkageSettings {
    fn default() -> Self {
        Self {
            distance: 300,
            match_strands: false,
            min_recip_overlap: 0.0,
        }
    }
}

/// Test the default linkage criteria between two nodes
///
/// Both the A and B endpoints must be on matching chromosomes within the linkage distance, and
/// any optional strand and reciprocal overlap criteria must be met.
///
pub fn is_endpoint_linked<T: GenomeNode>(n1: &T, n2: &T, settings: &LinkageSettings) -> bool {
    if n1.chrom_a() != n2.chrom_a() || n1.chrom_b() != n2.chrom_b() {
        return false;
    }
    if (n1.pos_a() - n2.pos_a()).abs() > settings.distance
        || (n1.pos_b() - n2.pos_b()).abs() > settings.distance
    {
        return false;
    }
    if settings.match_strands && n1.strands() != n2.strands() {
        return false;
    }
    if settings.min_recip_overlap > 0.0 && n1.chrom_a() == n1.chrom_b() {
        let r1 = IntRange::from_span(n1.pos_a(), n1.pos_b());
        let r2 = IntRange::from_span(n2.pos_a(), n2.pos_b());
        if get_recip_overlap(&r1, &r2) < settings.min_recip_overlap {
            return false;
        }
    }
    true
}

struct OpenCluster {
    /// Node indexes in input order
    members: Vec<usize>,

    /// Max reach of any member on the current chromosome
    reach: i64,
}

/// Lazy single linkage cluster iterator over genome sorted nodes
///
/// Each cluster is keyed by the index of its first node, which is also the root of the cluster in
/// the union-find structure, so that clusters are returned in first-encountered-node order.
///
pub struct SlinkClusters<T, I, F> {
    nodes: I,
    distance: i64,
    is_linked: F,

    /// Nodes which have not yet been returned in a cluster
    node_store: HashMap<usize, T>,
    parent: HashMap<usize, usize>,
    open_clusters: BTreeMap<usize, OpenCluster>,

    /// Nodes which may still link to a new node
    active: Vec<usize>,

    finished_clusters: VecDeque<Vec<T>>,

    node_count: usize,
    current_chrom: Option<String>,
    last_pos: i64,
    is_input_done: bool,
}

impl<T, I, F> SlinkClusters<T, I, F>
where
    T: GenomeNode,
    I: Iterator<Item = T>,
    F: Fn(&T, &T) -> bool,
{
    fn find_root(&mut self, index: usize) -> usize {
        let mut root = index;
        while let Some(&p) = self.parent.get(&root) {
            if p == root {
                break;
            }
            root = p;
        }

        // Path compression
        let mut node = index;
        while node != root {
            let next = self.parent[&node];
            self.parent.insert(node, root);
            node = next;
        }
        root
    }

    /// Merge the clusters containing nodes index1 and index2, the lower root is always kept
    ///
    fn union(&mut self, index1: usize, index2: usize) {
        let root1 = self.find_root(index1);
        let root2 = self.find_root(index2);
        if root1 == root2 {
            return;
        }
        let (keep, drop) = if root1 < root2 {
            (root1, root2)
        } else {
            (root2, root1)
        };
        self.parent.insert(drop, keep);
        let dropped = self.open_clusters.remove(&drop).unwrap();
        let kept = self.open_clusters.get_mut(&keep).unwrap();
        kept.members.extend(dropped.members);
        kept.members.sort_unstable();
        kept.reach = std::cmp::max(kept.reach, dropped.reach);
    }

    fn finish_cluster(&mut self, root: usize) {
        let cluster = self.open_clusters.remove(&root).unwrap();
        let nodes = cluster
            .members
            .iter()
            .map(|i| {
                self.parent.remove(i);
                self.node_store.remove(i).unwrap()
            })
            .collect::<Vec<_>>();
        self.finished_clusters.push_back(nodes);
    }

    /// Move clusters to the finished queue, in order of first node, while the earliest open
    /// cluster can no longer be reached
    ///
    /// If `pos` is None all open clusters are finished.
    ///
    fn finish_unreachable_clusters(&mut self, pos: Option<i64>) {
        while let Some((&root, cluster)) = self.open_clusters.first_key_value() {
            if let Some(pos) = pos
                && cluster.reach + self.distance >= pos
            {
                break;
            }
            self.finish_cluster(root);
        }
    }

    fn add_node(&mut self, node: T) {
        let index = self.node_count;
        self.node_count += 1;

        let is_new_chrom = self.current_chrom.as_deref() != Some(node.chrom_a());
        if is_new_chrom {
            self.finish_unreachable_clusters(None);
            self.active.clear();
            self.current_chrom = Some(node.chrom_a().to_string());
        } else {
            assert!(
                node.pos_a() >= self.last_pos,
                "Input to single linkage clustering is not sorted at {}:{}",
                node.chrom_a(),
                node.pos_a()
            );
        }
        self.last_pos = node.pos_a();

        let pos = node.pos_a();
        let distance = self.distance;
        let node_store = &self.node_store;
        self.active
            .retain(|i| node_store[i].reach() + distance >= pos);

        let linked = self
            .active
            .iter()
            .filter(|&i| (self.is_linked)(&self.node_store[i], &node))
            .copied()
            .collect::<Vec<_>>();

        self.open_clusters.insert(
            index,
            OpenCluster {
                members: vec![index],
                reach: node.reach(),
            },
        );
        self.node_store.insert(index, node);
        self.active.push(index);

        for linked_index in linked {
            self.union(linked_index, index);
        }

        self.finish_unreachable_clusters(Some(pos));
    }
}

impl<T, I, F> Iterator for SlinkClusters<T, I, F>
where
    T: GenomeNode,
    I: Iterator<Item = T>,
    F: Fn(&T, &T) -> bool,
{
    type Item = Vec<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(cluster) = self.finished_clusters.pop_front() {
                return Some(cluster);
            }
            if self.is_input_done {
                return None;
            }
            match self.nodes.next() {
                Some(node) => self.add_node(node),
                None => {
                    self.is_input_done = true;
                    self.finish_unreachable_clusters(None);
                }
            }
        }
    }
}

/// Cluster genome sorted nodes with a custom linkage function
///
/// `is_linked` is only called for node pairs on the same primary chromosome where the new node's
/// primary position is within `distance` of the earlier node's reach. The function must not
/// link any node pairs outside of this window.
///
/// Nodes must be sorted by position within each chromosome, and all nodes from one chromosome
/// must be contiguous.
///
pub fn cluster_nodes_by<T, I, F>(nodes: I, distance: i64, is_linked: F) -> SlinkClusters<T, I::IntoIter, F>
where
    T: GenomeNode,
    I: IntoIterator<Item = T>,
    F: Fn(&T, &T) -> bool,
{
    SlinkClusters {
        nodes: nodes.into_iter(),
        distance,
        is_linked,
        node_store: HashMap::new(),
        parent: HashMap::new(),
        open_clusters: BTreeMap::new(),
        active: Vec::new(),
        finished_clusters: VecDeque::new(),
        node_count: 0,
        current_chrom: None,
        last_pos: 0,
        is_input_done: false,
    }
}

/// Cluster genome sorted nodes using the standard endpoint linkage criteria
///
pub fn cluster_nodes<T, I>(
    nodes: I,
    settings: LinkageSettings,
) -> SlinkClusters<T, I::IntoIter, impl Fn(&T, &T) -> bool>
where
    T: GenomeNode,
    I: IntoIterator<Item = T>,
{
    let distance = settings.distance;
    cluster_nodes_by(nodes, distance, move |n1: &T, n2: &T| {
        is_endpoint_linked(n1, n2, &settings)
    })
}
