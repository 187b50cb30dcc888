//! Authorization data models

use serde::Serialize;
use serde_json::{Map, Value};

/// Console role derived from custom claims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Moderator,
    User,
}

impl Role {
    /// `admin: true` wins over `moderator: true`; anything else is a plain user.
    pub fn from_claims(claims: &Map<String, Value>) -> Self {
        let flag = |name: &str| matches!(claims.get(name), Some(Value::Bool(true)));
        if flag("admin") {
            Role::Admin
        } else if flag("moderator") {
            Role::Moderator
        } else {
            Role::User
        }
    }

    pub fn to_claims(self) -> Map<String, Value> {
        let mut claims = Map::new();
        match self {
            Role::Admin => {
                claims.insert("admin".to_string(), Value::Bool(true));
            }
            Role::Moderator => {
                claims.insert("moderator".to_string(), Value::Bool(true));
            }
            Role::User => {
                claims.insert("admin".to_string(), Value::Bool(false));
            }
        }
        claims
    }

    pub fn is_admin(self) -> bool {
        self == Role::Admin
    }
}

/// What the console should do with the current session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "access", rename_all = "lowercase")]
pub enum AccessDecision {
    Unauthenticated,
    Denied {
        uid: String,
        email: Option<String>,
    },
    Granted {
        uid: String,
        email: Option<String>,
        role: Role,
    },
}
