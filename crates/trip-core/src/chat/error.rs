use thiserror::Error;

#[derive(Error, Debug)]
pub enum TurnError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Malformed tool arguments: {0}")]
    MalformedArguments(String),

    #[error("Cancelled")]
    Cancelled,
}
