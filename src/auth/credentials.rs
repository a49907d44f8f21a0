//! Parsing of `Authorization` header values

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::AuthError;

/// Credentials presented by a caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    /// HTTP Basic name and password
    Basic { name: String, password: String },
    /// JWT access token
    Bearer(String),
}

impl Credentials {
    /// Parse `Basic <base64(name:password)>` or `Bearer <token>`
    pub fn from_header(value: &str) -> Result<Self, AuthError> {
        let value = value.trim();
        let (scheme, rest) = value.split_once(' ').ok_or(AuthError::MalformedHeader)?;
        let rest = rest.trim();

        if scheme.eq_ignore_ascii_case("basic") {
            let decoded = STANDARD
                .decode(rest)
                .map_err(|_| AuthError::MalformedHeader)?;
            let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedHeader)?;
            let (name, password) = decoded.split_once(':').ok_or(AuthError::MalformedHeader)?;
            Ok(Credentials::Basic {
                name: name.to_string(),
                password: password.to_string(),
            })
        } else if scheme.eq_ignore_ascii_case("bearer") && !rest.is_empty() {
            Ok(Credentials::Bearer(rest.to_string()))
        } else {
            Err(AuthError::MalformedHeader)
        }
    }

    /// Header value for HTTP Basic
    pub fn basic_header(name: &str, password: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{}:{}", name, password)))
    }
}
