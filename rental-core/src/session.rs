use rental_shared::Masked;
use serde::Serialize;

/// Caller identity passed explicitly into every collaborator call.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user_id: String,
    token: Option<Masked<String>>,
}

impl Session {
    pub fn authenticated(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: Some(Masked::new(token.into())),
        }
    }

    pub fn anonymous() -> Self {
        Self {
            user_id: String::new(),
            token: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_ref().is_some_and(|t| !t.expose().is_empty())
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.expose().as_str())
    }
}
