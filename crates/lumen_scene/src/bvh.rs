//! Bounding volume hierarchy over indexed items.
//!
//! The tree stores item indices, not the items themselves, so the same
//! structure serves group children and the triangles of a mesh. Callers
//! supply the per-item intersection test as a closure.

use lumen_math::{Aabb, Interval, Ray};

/// Maximum items per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

#[derive(Debug, Clone)]
enum BvhNode {
    /// Internal node with two children.
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    /// Leaf node with a small number of item indices.
    Leaf { items: Vec<usize>, bbox: Aabb },
}

impl BvhNode {
    fn bbox(&self) -> &Aabb {
        match self {
            BvhNode::Branch { bbox, .. } | BvhNode::Leaf { bbox, .. } => bbox,
        }
    }
}

/// Median-split BVH.
#[derive(Debug, Clone)]
pub struct Bvh {
    root: Option<BvhNode>,
    len: usize,
}

impl Bvh {
    /// Build over `boxes`; item `i` is identified by its index into the slice.
    pub fn build(boxes: &[Aabb]) -> Self {
        let indices: Vec<usize> = (0..boxes.len()).collect();
        let root = (!indices.is_empty()).then(|| Self::build_node(boxes, indices));
        Self {
            root,
            len: boxes.len(),
        }
    }

    /// Sort by centroid on the longest centroid axis, split in half, recurse.
    fn build_node(boxes: &[Aabb], mut items: Vec<usize>) -> BvhNode {
        let bounds = items
            .iter()
            .fold(Aabb::EMPTY, |acc, &i| Aabb::surrounding(&acc, &boxes[i]));

        if items.len() <= LEAF_MAX_SIZE {
            return BvhNode::Leaf { items, bbox: bounds };
        }

        let centroid_bounds = Aabb::enclosing(items.iter().map(|&i| boxes[i].centroid()));
        let axis = centroid_bounds.longest_axis();

        items.sort_unstable_by(|&a, &b| {
            let a_val = boxes[a].centroid()[axis];
            let b_val = boxes[b].centroid()[axis];
            a_val.partial_cmp(&b_val).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mid = items.len() / 2;
        let right_items = items.split_off(mid);

        BvhNode::Branch {
            left: Box::new(Self::build_node(boxes, items)),
            right: Box::new(Self::build_node(boxes, right_items)),
            bbox: bounds,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bounding_box(&self) -> Option<Aabb> {
        self.root.as_ref().map(|node| *node.bbox())
    }

    /// Closest-hit traversal.
    ///
    /// `hit_item(index, interval)` returns the hit distance when item `index`
    /// is hit inside `interval`. The interval shrinks as closer hits are found.
    pub fn nearest<F>(&self, ray: &Ray, ray_t: Interval, mut hit_item: F) -> bool
    where
        F: FnMut(usize, Interval) -> Option<f32>,
    {
        let Some(root) = &self.root else {
            return false;
        };
        let mut closest = ray_t.max;
        Self::nearest_node(root, ray, ray_t.min, &mut closest, &mut hit_item)
    }

    fn nearest_node<F>(node: &BvhNode, ray: &Ray, t_min: f32, closest: &mut f32, hit_item: &mut F) -> bool
    where
        F: FnMut(usize, Interval) -> Option<f32>,
    {
        if !node.bbox().hit(ray, Interval::new(t_min, *closest)) {
            return false;
        }

        match node {
            BvhNode::Leaf { items, .. } => {
                let mut hit_anything = false;
                for &i in items {
                    if let Some(t) = hit_item(i, Interval::new(t_min, *closest)) {
                        hit_anything = true;
                        *closest = t;
                    }
                }
                hit_anything
            }
            BvhNode::Branch { left, right, .. } => {
                let hit_left = Self::nearest_node(left, ray, t_min, closest, hit_item);
                let hit_right = Self::nearest_node(right, ray, t_min, closest, hit_item);
                hit_left || hit_right
            }
        }
    }

    /// Any-hit traversal: stops at the first item for which `hit_item` is true.
    pub fn any<F>(&self, ray: &Ray, ray_t: Interval, mut hit_item: F) -> bool
    where
        F: FnMut(usize, Interval) -> bool,
    {
        let Some(root) = &self.root else {
            return false;
        };
        Self::any_node(root, ray, ray_t, &mut hit_item)
    }

    fn any_node<F>(node: &BvhNode, ray: &Ray, ray_t: Interval, hit_item: &mut F) -> bool
    where
        F: FnMut(usize, Interval) -> bool,
    {
        if !node.bbox().hit(ray, ray_t) {
            return false;
        }
        match node {
            BvhNode::Leaf { items, .. } => items.iter().any(|&i| hit_item(i, ray_t)),
            BvhNode::Branch { left, right, .. } => {
                Self::any_node(left, ray, ray_t, hit_item) || Self::any_node(right, ray, ray_t, hit_item)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_math::Vec3;

    fn unit_boxes(n: usize) -> Vec<Aabb> {
        (0..n)
            .map(|i| {
                let c = Vec3::new(i as f32 * 2.0, 0.0, -5.0);
                Aabb::from_points(c - Vec3::splat(0.5), c + Vec3::splat(0.5))
            })
            .collect()
    }

    /// Box hit distance along -Z from the origin plane.
    fn box_hit(boxes: &[Aabb], ray: &Ray, i: usize, ray_t: Interval) -> Option<f32> {
        let t = ray.origin.z - boxes[i].z.max;
        (boxes[i].hit(ray, ray_t) && ray_t.surrounds(t)).then_some(t)
    }

    #[test]
    fn test_bvh_empty() {
        let bvh = Bvh::build(&[]);
        assert!(bvh.is_empty());
        assert_eq!(bvh.bounding_box(), None);

        let ray = Ray::new_simple(Vec3::ZERO, -Vec3::Z);
        assert!(!bvh.nearest(&ray, Interval::RAY, |_, _| Some(1.0)));
        assert!(!bvh.any(&ray, Interval::RAY, |_, _| true));
    }

    #[test]
    fn test_bvh_visits_only_candidates() {
        let boxes = unit_boxes(20);
        let bvh = Bvh::build(&boxes);
        assert_eq!(bvh.len(), 20);

        let ray = Ray::new_simple(Vec3::new(10.0, 0.0, 0.0), -Vec3::Z);
        let mut found = None;
        let hit = bvh.nearest(&ray, Interval::RAY, |i, t| {
            let t = box_hit(&boxes, &ray, i, t)?;
            found = Some(i);
            Some(t)
        });

        assert!(hit);
        assert_eq!(found, Some(5));
    }

    #[test]
    fn test_bvh_nearest_keeps_closest() {
        // Two boxes on the same line, different depths
        let boxes = vec![
            Aabb::from_points(Vec3::new(-0.5, -0.5, -10.5), Vec3::new(0.5, 0.5, -9.5)),
            Aabb::from_points(Vec3::new(-0.5, -0.5, -3.5), Vec3::new(0.5, 0.5, -2.5)),
        ];
        let bvh = Bvh::build(&boxes);
        let ray = Ray::new_simple(Vec3::ZERO, -Vec3::Z);

        let mut closest = None;
        assert!(bvh.nearest(&ray, Interval::RAY, |i, t| {
            let t = box_hit(&boxes, &ray, i, t)?;
            closest = Some(i);
            Some(t)
        }));
        assert_eq!(closest, Some(1));
    }

    #[test]
    fn test_bvh_bounds_cover_all_items() {
        let boxes = unit_boxes(9);
        let bvh = Bvh::build(&boxes);
        let bbox = bvh.bounding_box().unwrap();
        for b in &boxes {
            assert!(bbox.contains_point(b.min_point()));
            assert!(bbox.contains_point(b.max_point()));
        }
    }

    #[test]
    fn test_bvh_any_stops_early() {
        let boxes = unit_boxes(12);
        let bvh = Bvh::build(&boxes);
        let ray = Ray::new_simple(Vec3::new(4.0, 0.0, 0.0), -Vec3::Z);

        assert!(bvh.any(&ray, Interval::RAY, |i, t| box_hit(&boxes, &ray, i, t).is_some()));
        assert!(!bvh.any(&ray, Interval::new(0.001, 1.0), |i, t| box_hit(&boxes, &ray, i, t).is_some()));
    }
}
