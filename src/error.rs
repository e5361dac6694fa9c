#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("Credential error: {0}")]
    Credential(String),
    #[error("Key error: {0}")]
    Key(String),
}
