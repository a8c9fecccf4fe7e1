// Remote clients used by the operations gateway
//
// The gateway never talks to the workflow engine or the search index directly;
// it goes through the two traits defined here so the transports can be swapped.

pub mod engine;
pub mod error;
pub mod index;

// Re-export commonly used types
pub use engine::{CommandClient, EngineClientConfig, EngineRestClient};
pub use error::{ClientError, ClientResult};
pub use index::{IndexClientConfig, IndexQueryClient, SearchIndexClient};

/// Workflow variables as they are handed to the engine
pub type Variables = serde_json::Map<String, serde_json::Value>;
