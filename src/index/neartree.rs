//! Nearest-neighbour tree over great-circle distance.
//!
//! A Kalantari–McDonald near-tree: every node holds up to two locations and
//! routes descendants to the closer side, remembering the maximum distance
//! seen down each side so whole branches can be pruned with the triangle
//! inequality. Trees are built once per keyword during load and frozen.

use crate::location::LocationPtr;

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates in kilometres (haversine).
pub fn great_circle_km(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

#[derive(Debug, Clone)]
struct Entry {
    loc: LocationPtr,
    /// Insertion sequence; equidistant results resolve to the earlier insert.
    seq: u32,
}

#[derive(Debug, Clone, Default)]
struct Node {
    left: Option<Entry>,
    right: Option<Entry>,
    left_child: Option<usize>,
    right_child: Option<usize>,
    /// Maximum distance from the side's own entry to anything below it.
    left_radius: f64,
    right_radius: f64,
}

#[derive(Debug, Clone, Default)]
pub struct NearTree {
    nodes: Vec<Node>,
    len: usize,
}

impl NearTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn distance(entry: &Entry, lon: f64, lat: f64) -> f64 {
        great_circle_km(entry.loc.longitude, entry.loc.latitude, lon, lat)
    }

    pub fn insert(&mut self, loc: LocationPtr) {
        let entry = Entry {
            loc,
            seq: self.len as u32,
        };
        self.len += 1;

        if self.nodes.is_empty() {
            self.nodes.push(Node::default());
        }

        let mut node = 0usize;
        let item = entry;
        loop {
            if self.nodes[node].left.is_none() {
                self.nodes[node].left = Some(item);
                return;
            }
            if self.nodes[node].right.is_none() {
                self.nodes[node].right = Some(item);
                return;
            }

            let d_left = Self::distance(
                self.nodes[node].left.as_ref().unwrap(),
                item.loc.longitude,
                item.loc.latitude,
            );
            let d_right = Self::distance(
                self.nodes[node].right.as_ref().unwrap(),
                item.loc.longitude,
                item.loc.latitude,
            );

            if d_left <= d_right {
                if d_left > self.nodes[node].left_radius {
                    self.nodes[node].left_radius = d_left;
                }
                node = match self.nodes[node].left_child {
                    Some(child) => child,
                    None => {
                        self.nodes.push(Node::default());
                        let child = self.nodes.len() - 1;
                        self.nodes[node].left_child = Some(child);
                        child
                    }
                };
            } else {
                if d_right > self.nodes[node].right_radius {
                    self.nodes[node].right_radius = d_right;
                }
                node = match self.nodes[node].right_child {
                    Some(child) => child,
                    None => {
                        self.nodes.push(Node::default());
                        let child = self.nodes.len() - 1;
                        self.nodes[node].right_child = Some(child);
                        child
                    }
                };
            }
        }
    }

    /// The location nearest to the coordinate, optionally within
    /// `radius_km`. A negative radius means unbounded. Ties resolve to the
    /// earlier-inserted location.
    pub fn nearest(&self, longitude: f64, latitude: f64, radius_km: f64) -> Option<LocationPtr> {
        if self.nodes.is_empty() {
            return None;
        }

        let mut limit = if radius_km < 0.0 {
            f64::INFINITY
        } else {
            radius_km
        };
        let mut best: Option<(f64, u32, LocationPtr)> = None;
        let mut stack = vec![0usize];

        while let Some(node) = stack.pop() {
            let node = &self.nodes[node];

            for (entry, child, child_radius) in [
                (&node.left, node.left_child, node.left_radius),
                (&node.right, node.right_child, node.right_radius),
            ] {
                let Some(entry) = entry else { continue };
                let dist = Self::distance(entry, longitude, latitude);

                let better = dist <= limit
                    && match &best {
                        None => true,
                        Some((best_dist, best_seq, _)) => {
                            dist < *best_dist || (dist == *best_dist && entry.seq < *best_seq)
                        }
                    };
                if better {
                    best = Some((dist, entry.seq, entry.loc.clone()));
                    limit = dist;
                }

                if let Some(child) = child {
                    // Triangle inequality: anything below is at least
                    // dist - child_radius away from the probe.
                    if dist - child_radius <= limit {
                        stack.push(child);
                    }
                }
            }
        }

        best.map(|(_, _, loc)| loc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Location;
    use std::sync::Arc;

    fn place(geoid: i64, name: &str, lon: f64, lat: f64) -> LocationPtr {
        Arc::new(Location {
            geoid,
            name: name.into(),
            longitude: lon,
            latitude: lat,
            ..Location::default()
        })
    }

    fn finnish_tree() -> NearTree {
        let mut tree = NearTree::new();
        tree.insert(place(1, "Helsinki", 24.9354, 60.1695));
        tree.insert(place(2, "Espoo", 24.6522, 60.2052));
        tree.insert(place(3, "Imatra", 28.7667, 61.1667));
        tree.insert(place(4, "Imatrankoski", 28.7571, 61.1715));
        tree.insert(place(5, "Oulu", 25.4651, 65.0142));
        tree.insert(place(6, "Rovaniemi", 25.7167, 66.5));
        tree
    }

    #[test]
    fn finds_the_nearest_location() {
        let tree = finnish_tree();
        let hit = tree.nearest(28.76, 61.17, -1.0).unwrap();
        assert_eq!(hit.name, "Imatrankoski");
    }

    #[test]
    fn radius_bounds_the_search() {
        let tree = finnish_tree();
        // Nothing within 1 km of a point in the gulf.
        assert!(tree.nearest(24.0, 59.0, 1.0).is_none());
        // Helsinki is the closest within a generous radius.
        let hit = tree.nearest(24.95, 60.17, 50.0).unwrap();
        assert_eq!(hit.name, "Helsinki");
    }

    #[test]
    fn negative_radius_is_unbounded() {
        let tree = finnish_tree();
        assert!(tree.nearest(0.0, 0.0, -1.0).is_some());
    }

    #[test]
    fn ties_resolve_to_insertion_order() {
        let mut tree = NearTree::new();
        tree.insert(place(10, "First", 25.0, 60.0));
        tree.insert(place(11, "Second", 25.0, 60.0));
        let hit = tree.nearest(25.0, 60.0, -1.0).unwrap();
        assert_eq!(hit.name, "First");
    }

    #[test]
    fn empty_tree_returns_none() {
        let tree = NearTree::new();
        assert!(tree.nearest(25.0, 60.0, -1.0).is_none());
    }

    #[test]
    fn haversine_is_sane() {
        // Helsinki to Turku is roughly 150 km.
        let d = great_circle_km(24.9354, 60.1695, 22.2666, 60.4518);
        assert!((140.0..170.0).contains(&d), "distance was {d}");
        assert_eq!(great_circle_km(25.0, 60.0, 25.0, 60.0), 0.0);
    }
}
