use std::path::PathBuf;

/// Where the Vault token comes from.
#[derive(Clone, Default)]
pub enum Token {
    /// Requests are sent unauthenticated.
    #[default]
    None,

    Static(String),

    /// A file that is re-read before every request, so that a token rotated
    /// by an agent sidecar is picked up without a restart.
    File(PathBuf),
}

// === impl Token ===

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Static(_) => f.write_str("Static(..)"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

impl Token {
    pub(crate) async fn load(&self) -> std::io::Result<Option<String>> {
        match self {
            Self::None => Ok(None),
            Self::Static(token) => Ok(Some(token.clone())),
            Self::File(path) => {
                let token = tokio::fs::read_to_string(path).await?;
                Ok(Some(token.trim().to_string()))
            }
        }
    }
}
