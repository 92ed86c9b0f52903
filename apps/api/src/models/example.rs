use serde::{Deserialize, Serialize};

/// Metadata of an uploaded example document. The body lives next to the
/// index as `<id><ext>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleFile {
    pub id: String,
    pub name: String,
}
