/// Outcome of one invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// Payload bytes; empty for mutations.
    Success(Vec<u8>),
    Error(String),
}

impl Response {
    pub fn success(payload: Vec<u8>) -> Self {
        Self::Success(payload)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Self::Success(payload) => Some(payload),
            Self::Error(_) => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Error(message) => Some(message),
        }
    }
}
