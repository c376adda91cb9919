/// Why the mapping SDK never became usable.
///
/// None of these are fatal to the page: the view renders an error state with
/// `user_message()` instead of a map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The namespace did not appear within the configured window.
    Timeout { waited_ms: u64 },
    /// The loader script fired its `error` event.
    ScriptError(String),
    /// The page was bootstrapped without an API key. Detected upstream and
    /// reported through the same path as a script error.
    MissingApiKey,
}

impl LoadError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, LoadError::Timeout { .. })
    }

    /// Text suitable for the map's error placeholder.
    pub fn user_message(&self) -> String {
        match self {
            LoadError::Timeout { .. } => {
                "The map is taking too long to load. Check your connection and reload the page."
                    .to_string()
            }
            LoadError::ScriptError(_) => {
                "The map could not be loaded. Please try again later.".to_string()
            }
            LoadError::MissingApiKey => {
                "The map is not configured for this site (missing API key).".to_string()
            }
        }
    }
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Timeout { waited_ms } => {
                write!(f, "map SDK not available after {waited_ms} ms")
            }
            LoadError::ScriptError(msg) => write!(f, "map SDK loader script failed: {msg}"),
            LoadError::MissingApiKey => write!(f, "map SDK loader has no API key configured"),
        }
    }
}

impl std::error::Error for LoadError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropsError {
    Malformed(String),
}

impl std::fmt::Display for PropsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropsError::Malformed(msg) => write!(f, "malformed map props: {msg}"),
        }
    }
}

impl std::error::Error for PropsError {}
