// ===========================================================================
// Endpoint-graph line merging
// ===========================================================================
//
// Every input line is one atomic edge between its first and last coordinate.
// Lines are stitched only where exactly two edge ends meet (pass-through
// nodes). Dangling ends and branch points (degree >= 3) terminate paths; pure
// cycles of pass-through nodes come out as closed rings.
//
// Output order depends only on input order:
//   1. walks from every non-pass-through node, in node creation order,
//      along its incident edges in insertion order
//   2. remaining edges (pure cycles), in edge order
// ===========================================================================

use crate::error::{PipelineError, Stage};
use crate::geometry::{coords_eq, distinct_coord_count};
use ahash::AHashMap;
use geo::{Coord, LineString};
use tracing::{debug, info, warn};

/// Smallest grid cell used for endpoint snapping; keeps cell keys in range
/// for large projected coordinates when epsilon is tiny.
const MIN_SNAP_CELL: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    /// Degree 1.
    Dangling,
    /// Degree 2, merged through.
    PassThrough,
    /// Degree 3 or more, never merged through.
    Branch,
}

#[derive(Debug, Clone)]
pub struct LineNode {
    pub id: usize,
    pub pos: Coord,
    /// Incident edge ids. A closed input line shows up twice.
    pub adj_list: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct LineEdge {
    pub id: usize,
    pub from: usize,
    pub to: usize,
    pub geometry: Vec<Coord>,
}

impl LineEdge {
    pub fn get_other_nd(&self, n: usize) -> usize {
        if self.from == n { self.to } else { self.from }
    }

    /// Coordinates read starting at node `n`.
    fn oriented_from(&self, n: usize) -> Box<dyn Iterator<Item = Coord> + '_> {
        if self.from == n {
            Box::new(self.geometry.iter().copied())
        } else {
            Box::new(self.geometry.iter().rev().copied())
        }
    }
}

/// Grid-bucketed node positions for epsilon snapping.
struct NodeGeoIdx {
    cell_size: f64,
    cells: AHashMap<(i64, i64), Vec<usize>>,
}

impl NodeGeoIdx {
    fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            cells: AHashMap::new(),
        }
    }

    fn get_cell_coords(&self, x: f64, y: f64) -> (i64, i64) {
        (
            (x / self.cell_size).floor() as i64,
            (y / self.cell_size).floor() as i64,
        )
    }

    fn add(&mut self, pos: Coord, node: usize) {
        let cell = self.get_cell_coords(pos.x, pos.y);
        self.cells.entry(cell).or_default().push(node);
    }

    /// Closest node within `radius` of `pos`.
    fn find_nearest(&self, pos: Coord, radius: f64, nodes: &[LineNode]) -> Option<usize> {
        let min_c = self.get_cell_coords(pos.x - radius, pos.y - radius);
        let max_c = self.get_cell_coords(pos.x + radius, pos.y + radius);

        let mut best: Option<(usize, f64)> = None;
        for cx in min_c.0..=max_c.0 {
            for cy in min_c.1..=max_c.1 {
                let Some(bucket) = self.cells.get(&(cx, cy)) else {
                    continue;
                };
                for &id in bucket {
                    let p = nodes[id].pos;
                    if !coords_eq(p, pos, radius) {
                        continue;
                    }
                    let dist_sq = (p.x - pos.x).powi(2) + (p.y - pos.y).powi(2);
                    if best.is_none_or(|(_, d)| dist_sq < d) {
                        best = Some((id, dist_sq));
                    }
                }
            }
        }
        best.map(|(id, _)| id)
    }
}

pub struct EndpointGraph {
    pub nodes: Vec<LineNode>,
    pub edges: Vec<LineEdge>,
    epsilon: f64,
    geo_idx: NodeGeoIdx,
}

impl EndpointGraph {
    pub fn new(epsilon: f64) -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            epsilon,
            geo_idx: NodeGeoIdx::new(epsilon.max(MIN_SNAP_CELL)),
        }
    }

    /// Build the graph from whole lines. Degenerate lines (fewer than two
    /// distinct coordinates) are skipped and returned as recovered errors.
    pub fn build(lines: &[LineString], epsilon: f64) -> (Self, Vec<PipelineError>) {
        let mut graph = Self::new(epsilon);
        let mut skipped = Vec::new();

        for (index, line) in lines.iter().enumerate() {
            let distinct = distinct_coord_count(&line.0, epsilon);
            if distinct < 2 {
                skipped.push(PipelineError::DegenerateEdge {
                    stage: Stage::Merge,
                    index,
                    distinct,
                });
                continue;
            }
            graph.add_edg(line.0.clone());
        }

        (graph, skipped)
    }

    fn find_or_create_node(&mut self, pos: Coord) -> usize {
        if let Some(existing) = self.geo_idx.find_nearest(pos, self.epsilon, &self.nodes) {
            return existing;
        }
        let id = self.nodes.len();
        self.nodes.push(LineNode {
            id,
            pos,
            adj_list: Vec::new(),
        });
        self.geo_idx.add(pos, id);
        id
    }

    /// Add one atomic edge between the geometry's endpoints. Empty geometry
    /// adds nothing.
    pub fn add_edg(&mut self, geometry: Vec<Coord>) -> Option<usize> {
        let (Some(&first), Some(&last)) = (geometry.first(), geometry.last()) else {
            return None;
        };
        let from = self.find_or_create_node(first);
        let to = self.find_or_create_node(last);

        let id = self.edges.len();
        self.edges.push(LineEdge {
            id,
            from,
            to,
            geometry,
        });
        self.nodes[from].adj_list.push(id);
        self.nodes[to].adj_list.push(id);
        Some(id)
    }

    pub fn get_deg(&self, n: usize) -> usize {
        self.nodes[n].adj_list.len()
    }

    pub fn node_class(&self, n: usize) -> NodeClass {
        match self.get_deg(n) {
            0 | 1 => NodeClass::Dangling,
            2 => NodeClass::PassThrough,
            _ => NodeClass::Branch,
        }
    }

    /// Follow pass-through nodes from `start` along `first_edge` until a
    /// dangling end, a branch point, or back at `start`.
    fn walk(&self, start: usize, first_edge: usize, used: &mut [bool]) -> (LineString, usize) {
        let mut coords: Vec<Coord> = Vec::new();
        let mut current = start;
        let mut edge_id = first_edge;
        let mut joins = 0;

        loop {
            used[edge_id] = true;
            let edge = &self.edges[edge_id];
            let next = edge.get_other_nd(current);

            if coords.is_empty() {
                coords.extend(edge.oriented_from(current));
            } else {
                // shared coordinate already present
                coords.extend(edge.oriented_from(current).skip(1));
                joins += 1;
            }

            if next == start {
                // exact closure, even if the endpoints only matched within epsilon
                if let Some(&first) = coords.first() {
                    if let Some(last) = coords.last_mut() {
                        *last = first;
                    }
                }
                break;
            }
            if self.node_class(next) != NodeClass::PassThrough {
                break;
            }

            let continuation = self.nodes[next]
                .adj_list
                .iter()
                .copied()
                .find(|&e| !used[e]);
            match continuation {
                Some(e) => {
                    current = next;
                    edge_id = e;
                }
                None => break,
            }
        }

        (LineString::new(coords), joins)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub lines: Vec<LineString>,
    /// Input lines dropped as degenerate edges.
    pub degenerate: usize,
    /// Number of concatenations performed.
    pub joins: usize,
}

/// Stitch lines sharing endpoints into maximal non-branching paths.
///
/// Every non-degenerate input contributes its full coordinate run to exactly
/// one output line.
pub fn merge_lines(lines: &[LineString], epsilon: f64) -> MergeOutcome {
    let (graph, skipped) = EndpointGraph::build(lines, epsilon);
    for err in &skipped {
        warn!("{}", err);
    }

    let mut used = vec![false; graph.edges.len()];
    let mut merged = Vec::new();
    let mut joins = 0;

    for node in &graph.nodes {
        if graph.node_class(node.id) == NodeClass::PassThrough {
            continue;
        }
        for &edge_id in &node.adj_list {
            if used[edge_id] {
                continue;
            }
            let (line, n) = graph.walk(node.id, edge_id, &mut used);
            joins += n;
            merged.push(line);
        }
    }

    // whatever is left only touches pass-through nodes: isolated loops
    let mut rings = 0;
    for edge in &graph.edges {
        if used[edge.id] {
            continue;
        }
        let (line, n) = graph.walk(edge.from, edge.id, &mut used);
        joins += n;
        rings += 1;
        merged.push(line);
    }
    debug!("{} closed loop(s) without dangling ends or branches", rings);

    debug_assert!(used.iter().all(|&u| u), "every edge is consumed exactly once");
    info!(
        "Merged {} lines into {} ({} joins, {} degenerate dropped)",
        lines.len(),
        merged.len(),
        joins,
        skipped.len()
    );

    MergeOutcome {
        lines: merged,
        degenerate: skipped.len(),
        joins,
    }
}
