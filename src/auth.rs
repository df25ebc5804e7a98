use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Student,
    Admin,
}

/// A verified caller. Built once by the access layer and passed by value
/// into every scheduler call; never derived from request bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub email: String,
    pub role: Role,
}

impl Principal {
    pub fn student(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            role: Role::Student,
        }
    }

    pub fn admin(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            role: Role::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Emails compare case-insensitively.
    pub fn is(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct TokenParseError(String);

impl fmt::Display for TokenParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bad token entry: {}", self.0)
    }
}

impl std::error::Error for TokenParseError {}

/// Bearer token → principal table. Tokens are issued elsewhere; this only
/// resolves them.
#[derive(Debug, Default, Clone)]
pub struct TokenAuthSource {
    tokens: HashMap<String, Principal>,
}

impl TokenAuthSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `token=email[:admin],token=email,...`.
    pub fn parse(entries: &str) -> Result<Self, TokenParseError> {
        let mut source = Self::new();
        for entry in entries.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (token, who) = entry
                .split_once('=')
                .ok_or_else(|| TokenParseError(entry.to_string()))?;
            let (email, role) = match who.split_once(':') {
                Some((email, "admin")) => (email, Role::Admin),
                Some(_) => return Err(TokenParseError(entry.to_string())),
                None => (who, Role::Student),
            };
            let (token, email) = (token.trim(), email.trim());
            if token.is_empty() || !email.contains('@') {
                return Err(TokenParseError(entry.to_string()));
            }
            source.insert(
                token,
                Principal {
                    email: email.to_string(),
                    role,
                },
            );
        }
        Ok(source)
    }

    pub fn insert(&mut self, token: impl Into<String>, principal: Principal) {
        self.tokens.insert(token.into(), principal);
    }

    pub fn resolve(&self, token: &str) -> Option<Principal> {
        self.tokens.get(token).cloned()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
