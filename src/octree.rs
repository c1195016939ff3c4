//! Octree color quantization over an index arena.
//!
//! Nodes live in a flat `Vec` and refer to their children by index. A node is
//! either internal (has children) or a leaf (holds color sums); `reduce` is the
//! only transition, folding the children of the deepest reducible node back
//! into it.

use rgb::RGBA8;

const MAX_DEPTH: usize = 8;

#[derive(Debug, Clone, Default)]
struct OctreeNode {
    red: u64,
    green: u64,
    blue: u64,
    alpha: u64,
    pixel_count: u64,
    children: [Option<usize>; 8],
    is_leaf: bool,
}

#[derive(Debug, Clone)]
pub struct Octree {
    nodes: Vec<OctreeNode>,
    /// Internal nodes per depth that may still be reduced.
    reducible: [Vec<usize>; MAX_DEPTH],
    leaf_count: usize,
}

impl Default for Octree {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn child_slot(c: &RGBA8, depth: usize) -> usize {
    let shift = 7 - depth;
    (((c.r >> shift) & 1) << 2 | ((c.g >> shift) & 1) << 1 | ((c.b >> shift) & 1)) as usize
}

impl Octree {
    pub fn new() -> Self {
        let mut reducible: [Vec<usize>; MAX_DEPTH] = Default::default();
        reducible[0].push(0);
        Self {
            nodes: vec![OctreeNode::default()],
            reducible,
            leaf_count: 0,
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Insert one color, walking its bits MSB→LSB down to depth 8.
    pub fn insert(&mut self, c: &RGBA8) {
        let mut node = 0usize;
        for depth in 0..MAX_DEPTH {
            if self.nodes[node].is_leaf {
                break;
            }
            let slot = child_slot(c, depth);
            node = match self.nodes[node].children[slot] {
                Some(child) => child,
                None => {
                    let child = self.nodes.len();
                    let is_leaf = depth + 1 == MAX_DEPTH;
                    self.nodes.push(OctreeNode {
                        is_leaf,
                        ..Default::default()
                    });
                    if is_leaf {
                        self.leaf_count += 1;
                    } else {
                        self.reducible[depth + 1].push(child);
                    }
                    self.nodes[node].children[slot] = Some(child);
                    child
                }
            };
        }

        let leaf = &mut self.nodes[node];
        leaf.red += c.r as u64;
        leaf.green += c.g as u64;
        leaf.blue += c.b as u64;
        leaf.alpha += c.a as u64;
        leaf.pixel_count += 1;
    }

    /// Fold the children of one node at the deepest non-empty level into it.
    ///
    /// Returns false when nothing is left to reduce.
    pub fn reduce(&mut self) -> bool {
        let Some(depth) = (0..MAX_DEPTH).rev().find(|&d| !self.reducible[d].is_empty()) else {
            return false;
        };
        let Some(node) = self.reducible[depth].pop() else {
            return false;
        };

        let children = std::mem::take(&mut self.nodes[node].children);
        let (mut red, mut green, mut blue) = (0u64, 0u64, 0u64);
        let (mut alpha, mut count) = (0u64, 0u64);
        let mut merged = 0usize;
        for child in children.into_iter().flatten() {
            let c = &self.nodes[child];
            red += c.red;
            green += c.green;
            blue += c.blue;
            alpha += c.alpha;
            count += c.pixel_count;
            merged += 1;
        }

        let target = &mut self.nodes[node];
        target.red += red;
        target.green += green;
        target.blue += blue;
        target.alpha += alpha;
        target.pixel_count += count;
        target.is_leaf = true;
        self.leaf_count = self.leaf_count + 1 - merged;
        true
    }

    /// Reduce until at most `max_colors` leaves remain.
    pub fn reduce_to(&mut self, max_colors: usize) {
        while self.leaf_count > max_colors {
            if !self.reduce() {
                break;
            }
        }
    }

    /// Mean color (alpha included) of every leaf, in tree order.
    pub fn palette(&self) -> Vec<RGBA8> {
        let mut out = Vec::with_capacity(self.leaf_count);
        let mut stack = vec![0usize];
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            if node.is_leaf {
                if node.pixel_count > 0 {
                    let n = node.pixel_count;
                    out.push(RGBA8::new(
                        (node.red / n) as u8,
                        (node.green / n) as u8,
                        (node.blue / n) as u8,
                        (node.alpha / n) as u8,
                    ));
                }
                continue;
            }
            for child in node.children.iter().rev().flatten() {
                stack.push(*child);
            }
        }
        out
    }
}

/// Octree quantization of `samples` to at most `max_colors` colors.
pub fn octree_quantize(samples: &[RGBA8], max_colors: usize) -> Vec<RGBA8> {
    let mut tree = Octree::new();
    for c in samples {
        tree.insert(c);
    }
    tree.reduce_to(max_colors);
    tree.palette()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_slot_bits() {
        let c = RGBA8::new(0b1000_0000, 0b0000_0000, 0b1000_0000, 255);
        assert_eq!(child_slot(&c, 0), 0b101);
        assert_eq!(child_slot(&c, 1), 0);
        let white = RGBA8::new(255, 255, 255, 255);
        for depth in 0..MAX_DEPTH {
            assert_eq!(child_slot(&white, depth), 7);
        }
    }

    #[test]
    fn test_leaf_per_distinct_color() {
        let mut tree = Octree::new();
        for c in [
            RGBA8::new(1, 2, 3, 255),
            RGBA8::new(1, 2, 3, 255),
            RGBA8::new(200, 100, 50, 255),
        ] {
            tree.insert(&c);
        }
        assert_eq!(tree.leaf_count(), 2);
        let palette = tree.palette();
        assert_eq!(palette.len(), 2);
        assert!(palette.contains(&RGBA8::new(1, 2, 3, 255)));
        assert!(palette.contains(&RGBA8::new(200, 100, 50, 255)));
    }

    #[test]
    fn test_reduce_merges_siblings() {
        let mut tree = Octree::new();
        tree.insert(&RGBA8::new(10, 10, 10, 255));
        tree.insert(&RGBA8::new(11, 10, 10, 255));
        assert_eq!(tree.leaf_count(), 2);
        assert!(tree.reduce());
        assert_eq!(tree.leaf_count(), 1);
        assert_eq!(tree.palette(), vec![RGBA8::new(10, 10, 10, 255)]);
    }

    #[test]
    fn test_never_more_than_requested() {
        let samples: Vec<RGBA8> = (0..4096u32)
            .map(|i| {
                RGBA8::new(
                    (i % 16 * 16) as u8,
                    (i / 16 % 16 * 16) as u8,
                    (i / 256 * 16) as u8,
                    255,
                )
            })
            .collect();
        for max in [2, 3, 7, 16, 64, 200] {
            let palette = octree_quantize(&samples, max);
            assert!(palette.len() <= max, "{} > {}", palette.len(), max);
            assert!(!palette.is_empty());
        }
    }

    #[test]
    fn test_reduce_on_empty_tree_bottoms_out() {
        let mut tree = Octree::new();
        assert!(tree.reduce());
        assert!(!tree.reduce());
        assert!(tree.palette().is_empty());
    }
}
