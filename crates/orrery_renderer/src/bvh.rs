//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! A binary tree over primitive bounding boxes, built once with the surface
//! area heuristic and traversed a whole batch of rays at a time. Leaves store
//! indices into the caller's primitive list, so the tree owns no geometry.

use orrery_math::{Aabb, Interval, Ray};

use crate::hittable::HitRecord;
use crate::ray::RayView;
use crate::{RenderError, RenderResult};

/// BVH node - either an interior node with two children or a leaf.
#[derive(Debug, Clone)]
pub enum BvhNode {
    /// Two children and the union of their boxes.
    Interior {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    /// One or more primitive indices and the exact union of their boxes.
    Leaf { primitives: Vec<usize>, bbox: Aabb },
    /// Tree over zero primitives.
    Empty,
}

impl BvhNode {
    pub fn bounding_box(&self) -> Aabb {
        match self {
            BvhNode::Interior { bbox, .. } | BvhNode::Leaf { bbox, .. } => *bbox,
            BvhNode::Empty => Aabb::EMPTY,
        }
    }
}

/// Shape of a built tree, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BvhStats {
    pub primitives: usize,
    pub nodes: usize,
    pub leaves: usize,
    /// Longest root-to-leaf path, counting the root as depth 1
    pub depth: usize,
    pub largest_leaf: usize,
}

/// Nearest hit of one ray: the primitive index and its record.
pub type PrimitiveHit = (usize, HitRecord);

#[derive(Debug, Clone)]
pub struct Bvh {
    root: BvhNode,
    stats: BvhStats,
}

impl Bvh {
    /// Build a tree over `boxes`, one per primitive. Nodes with at most
    /// `leaf_size` primitives become leaves.
    pub fn build(boxes: &[Aabb], leaf_size: usize) -> RenderResult<Self> {
        if leaf_size == 0 {
            return Err(RenderError::InvalidLeafSize);
        }

        let root = if boxes.is_empty() {
            BvhNode::Empty
        } else {
            let items = boxes
                .iter()
                .enumerate()
                .map(|(index, bbox)| BuildItem {
                    index,
                    bbox: *bbox,
                    centroid: bbox.centroid().to_array(),
                })
                .collect();
            build_node(items, leaf_size)
        };

        let mut stats = BvhStats {
            primitives: boxes.len(),
            ..Default::default()
        };
        collect_stats(&root, 1, &mut stats);

        log::debug!(
            "Built BVH: {} primitives, {} nodes, {} leaves, depth {}",
            stats.primitives,
            stats.nodes,
            stats.leaves,
            stats.depth
        );

        Ok(Self { root, stats })
    }

    pub fn root(&self) -> &BvhNode {
        &self.root
    }

    pub fn stats(&self) -> BvhStats {
        self.stats
    }

    pub fn bounding_box(&self) -> Aabb {
        self.root.bounding_box()
    }

    /// Nearest hit per ray of `rays`, with `t` strictly inside `ray_t`.
    ///
    /// The batch is culled against each node's box and only the surviving
    /// rays descend, so a subtree is never visited by a ray that missed its
    /// parent. `intersect(primitive, ray, window)` tests one primitive
    /// exactly; the window it receives is already narrowed to the ray's
    /// nearest hit so far.
    pub fn traverse<F>(&self, rays: RayView<'_>, ray_t: Interval, intersect: F) -> Vec<Option<PrimitiveHit>>
    where
        F: Fn(usize, &Ray, Interval) -> Option<HitRecord>,
    {
        let mut state = Traversal {
            rays,
            ray_t,
            nearest: vec![ray_t.max; rays.len()],
            hits: vec![None; rays.len()],
            intersect,
        };
        let active: Vec<usize> = (0..rays.len()).collect();
        state.visit(&self.root, &active);
        state.hits
    }
}

struct BuildItem {
    index: usize,
    bbox: Aabb,
    centroid: [f32; 3],
}

/// Best split found so far: axis, left count and its cost.
struct Split {
    axis: usize,
    count: usize,
    cost: f32,
    balance: usize,
}

fn build_node(mut items: Vec<BuildItem>, leaf_size: usize) -> BvhNode {
    let bbox = items
        .iter()
        .fold(Aabb::EMPTY, |acc, item| Aabb::surrounding(&acc, &item.bbox));

    let n = items.len();
    if n <= leaf_size {
        return BvhNode::Leaf {
            primitives: items.iter().map(|item| item.index).collect(),
            bbox,
        };
    }

    // SAH sweep: for each axis, sort by centroid and price every split
    // position using prefix and suffix box areas.
    let mut best: Option<Split> = None;
    let mut suffix = vec![0.0f32; n];
    for axis in 0..3 {
        sort_by_axis(&mut items, axis);

        let mut acc = Aabb::EMPTY;
        for i in (1..n).rev() {
            acc = Aabb::surrounding(&acc, &items[i].bbox);
            suffix[i] = acc.area();
        }

        let mut prefix = Aabb::EMPTY;
        for count in 1..n {
            prefix = Aabb::surrounding(&prefix, &items[count - 1].bbox);
            let cost = prefix.area() * count as f32 + suffix[count] * (n - count) as f32;
            // Equal costs prefer the more even split, which keeps piles of
            // coincident boxes from degenerating into a list.
            let balance = (2 * count).abs_diff(n);
            let better = match &best {
                None => true,
                Some(b) => cost < b.cost || (cost == b.cost && balance < b.balance),
            };
            if better {
                best = Some(Split {
                    axis,
                    count,
                    cost,
                    balance,
                });
            }
        }
    }

    // n > leaf_size >= 1, so at least one split position was priced
    let (axis, count) = best.map_or((0, n / 2), |s| (s.axis, s.count));
    sort_by_axis(&mut items, axis);
    let right_items = items.split_off(count);

    let left = build_node(items, leaf_size);
    let right = build_node(right_items, leaf_size);

    BvhNode::Interior {
        bbox: Aabb::surrounding(&left.bounding_box(), &right.bounding_box()),
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn sort_by_axis(items: &mut [BuildItem], axis: usize) {
    // Index breaks ties so the result is independent of the previous order
    items.sort_by(|a, b| {
        a.centroid[axis]
            .total_cmp(&b.centroid[axis])
            .then(a.index.cmp(&b.index))
    });
}

fn collect_stats(node: &BvhNode, depth: usize, stats: &mut BvhStats) {
    match node {
        BvhNode::Empty => {}
        BvhNode::Leaf { primitives, .. } => {
            stats.nodes += 1;
            stats.leaves += 1;
            stats.depth = stats.depth.max(depth);
            stats.largest_leaf = stats.largest_leaf.max(primitives.len());
        }
        BvhNode::Interior { left, right, .. } => {
            stats.nodes += 1;
            collect_stats(left, depth + 1, stats);
            collect_stats(right, depth + 1, stats);
        }
    }
}

struct Traversal<'a, F> {
    rays: RayView<'a>,
    ray_t: Interval,
    nearest: Vec<f32>,
    hits: Vec<Option<PrimitiveHit>>,
    intersect: F,
}

impl<F> Traversal<'_, F>
where
    F: Fn(usize, &Ray, Interval) -> Option<HitRecord>,
{
    fn visit(&mut self, node: &BvhNode, active: &[usize]) {
        let bbox = match node {
            BvhNode::Empty => return,
            BvhNode::Interior { bbox, .. } | BvhNode::Leaf { bbox, .. } => bbox,
        };

        let survivors: Vec<usize> = active
            .iter()
            .copied()
            .filter(|&i| bbox.hit(&self.rays.get(i), self.ray_t.with_max(self.nearest[i])))
            .collect();
        if survivors.is_empty() {
            return;
        }

        match node {
            BvhNode::Interior { left, right, .. } => {
                self.visit(left, &survivors);
                self.visit(right, &survivors);
            }
            BvhNode::Leaf { primitives, .. } => {
                for &primitive in primitives {
                    for &i in &survivors {
                        let ray = self.rays.get(i);
                        let window = self.ray_t.with_max(self.nearest[i]);
                        if let Some(rec) = (self.intersect)(primitive, &ray, window) {
                            self.nearest[i] = rec.t;
                            self.hits[i] = Some((primitive, rec));
                        }
                    }
                }
            }
            BvhNode::Empty => {}
        }
    }
}
