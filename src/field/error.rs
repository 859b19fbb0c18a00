use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Snapshot file could not be read
    #[error("Failed to read snapshot {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot is not valid JSON or does not match the node schema
    #[error("JSON parse error (page snapshot): {0}")]
    Json(#[from] serde_json::Error),

    /// A node points at a parent that does not precede it
    #[error("Node {node} has invalid parent index {parent}")]
    BadParent { node: usize, parent: usize },
}
