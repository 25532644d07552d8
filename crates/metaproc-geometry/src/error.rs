#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("failed to decode glTF: {0}")]
    Decode(#[from] gltf::Error),

    #[error("glTF document has no scenes")]
    NoScene,

    #[error("{what} {index} does not exist")]
    MissingIndex { what: &'static str, index: usize },

    #[error("node {node} is its own ancestor")]
    NodeCycle { node: usize },
}

pub type Result<T> = std::result::Result<T, GeometryError>;
