//! Vertex records and exact-match deduplication.

use smallvec::SmallVec;

use crate::util::{Vec2, Vec3, Vec4};

/// One unique combination of per-corner attributes.
///
/// Attributes not requested by the layout are left at zero so they never
/// distinguish otherwise identical vertices.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub normal_smooth: Vec3,
    /// One coordinate per exported UV layer, in export order.
    pub tex_coords: SmallVec<[Vec2; 2]>,
    /// One color per exported color layer, in export order.
    pub colors: SmallVec<[Vec4; 2]>,
    /// Source vertex this corner came from.
    pub source_vertex: u32,
    /// Source loop (face corner) this vertex was first built from.
    pub source_loop: u32,
}

impl Vertex {
    /// Bitwise equality of every attribute except position and source
    /// references.
    pub fn same_attributes(&self, other: &Vertex) -> bool {
        bits_eq(self.normal.to_array(), other.normal.to_array())
            && bits_eq(self.tangent.to_array(), other.tangent.to_array())
            && bits_eq(self.normal_smooth.to_array(), other.normal_smooth.to_array())
            && self.tex_coords.len() == other.tex_coords.len()
            && self
                .tex_coords
                .iter()
                .zip(&other.tex_coords)
                .all(|(a, b)| bits_eq(a.to_array(), b.to_array()))
            && self.colors.len() == other.colors.len()
            && self
                .colors
                .iter()
                .zip(&other.colors)
                .all(|(a, b)| bits_eq(a.to_array(), b.to_array()))
    }
}

#[inline]
fn bits_eq<const N: usize>(a: [f32; N], b: [f32; N]) -> bool {
    a.iter().zip(&b).all(|(x, y)| x.to_bits() == y.to_bits())
}

/// Child slot of `p` relative to a node at `origin`.
#[inline]
fn octant(p: Vec3, origin: Vec3) -> usize {
    (p.x > origin.x) as usize | ((p.y > origin.y) as usize) << 1 | ((p.z > origin.z) as usize) << 2
}

#[derive(Debug)]
struct TreeNode {
    position: Vec3,
    children: [Option<u32>; 8],
    /// Indices of vertices at exactly this position.
    vertices: SmallVec<[u32; 2]>,
}

impl TreeNode {
    fn new(position: Vec3) -> Self {
        Self {
            position,
            children: [None; 8],
            vertices: SmallVec::new(),
        }
    }
}

/// Octree keyed by exact position, assigning sequential indices to unique
/// vertices.
///
/// A vertex's index is its position in [`VertexTree::vertices`]. The tree is
/// not balanced: each node splits space at its own position, and a query
/// descends until it finds an equal position or an empty slot.
#[derive(Debug, Default)]
pub struct VertexTree {
    nodes: Vec<TreeNode>,
    vertices: Vec<Vertex>,
}

impl VertexTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of an existing identical vertex, or of `vertex` after inserting it.
    pub fn get_or_insert(&mut self, vertex: Vertex) -> u32 {
        if self.nodes.is_empty() {
            self.nodes.push(TreeNode::new(vertex.position));
            return self.push_vertex(0, vertex);
        }

        let mut current = 0usize;
        loop {
            let node = &self.nodes[current];
            if bits_eq(node.position.to_array(), vertex.position.to_array()) {
                if let Some(found) = node
                    .vertices
                    .iter()
                    .copied()
                    .find(|i| self.vertices[*i as usize].same_attributes(&vertex))
                {
                    return found;
                }
                return self.push_vertex(current, vertex);
            }

            let slot = octant(vertex.position, node.position);
            let next = node.children[slot];
            match next {
                Some(child) => current = child as usize,
                None => {
                    let child = self.nodes.len();
                    self.nodes.push(TreeNode::new(vertex.position));
                    self.nodes[current].children[slot] = Some(child as u32);
                    return self.push_vertex(child, vertex);
                }
            }
        }
    }

    fn push_vertex(&mut self, node: usize, vertex: Vertex) -> u32 {
        let index = self.vertices.len() as u32;
        self.nodes[node].vertices.push(index);
        self.vertices.push(vertex);
        index
    }

    /// Unique vertices in index order.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn into_vertices(self) -> Vec<Vertex> {
        self.vertices
    }
}
