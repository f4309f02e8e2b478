use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Vertices {
    #[serde(rename = "numVertices")]
    pub num_vertices: usize,
    pub vertex: Vec<Vertex>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Indices {
    #[serde(rename = "numTriangles")]
    pub num_triangles: usize,
    /// Three entries per triangle
    pub index: Vec<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MeshFile {
    pub vertices: Vertices,
    pub indices: Indices,
}

impl MeshFile {
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
