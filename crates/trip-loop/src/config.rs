use std::time::Duration;

/// Configuration for a conversation turn.
pub struct TurnConfig {
    /// Model override passed through to the LLM provider.
    pub model: Option<String>,
    /// Replaces the built-in system prompt when set.
    pub system_prompt: Option<String>,
    /// Upper bound for each capability call; a timeout is treated like a
    /// provider error.
    pub capability_timeout: Duration,
    /// Activity cap interpolated into the system prompt.
    pub max_activities: usize,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            model: None,
            system_prompt: None,
            capability_timeout: Duration::from_secs(10),
            max_activities: 10,
        }
    }
}
