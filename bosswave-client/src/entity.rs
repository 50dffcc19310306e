//! Entity key files.
//!
//! An entity file holds one leading format byte followed by the key
//! material the router expects in a `sete` request.

use crate::error::ClientError;
use bytes::Bytes;
use std::path::Path;

/// Reads an entity file and returns the key material without the
/// leading format byte.
pub async fn load_entity_file(path: impl AsRef<Path>) -> Result<Bytes, ClientError> {
    let path = path.as_ref();
    let contents = tokio::fs::read(path).await?;
    if contents.is_empty() {
        return Err(ClientError::Entity(format!("{} is empty", path.display())));
    }

    tracing::debug!(
        path = %path.display(),
        format = contents[0],
        len = contents.len() - 1,
        "loaded entity file"
    );
    Ok(Bytes::from(contents).slice(1..))
}
