use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use subtle::ConstantTimeEq;

use crate::{error::AppError, state::AppState};

/// Who is calling: the API only distinguishes admins from everybody else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Anonymous,
    Admin,
}

/// What an operation demands of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    Public,
    Admin,
}

impl Access {
    pub fn is_admin(self) -> bool {
        self == Access::Admin
    }

    pub fn require(self, policy: Policy) -> Result<(), AppError> {
        match (policy, self) {
            (Policy::Public, _) | (Policy::Admin, Access::Admin) => Ok(()),
            (Policy::Admin, Access::Anonymous) => Err(AppError::Forbidden),
        }
    }
}

/// Accepts `Token <key>` and `Bearer <key>`.
pub(crate) fn presented_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    let known = scheme.eq_ignore_ascii_case("token") || scheme.eq_ignore_ascii_case("bearer");
    (known && !token.is_empty()).then_some(token)
}

pub fn matches_any(token: &str, admin_tokens: &[String]) -> bool {
    admin_tokens.iter().fold(false, |found, known| {
        found | bool::from(known.as_bytes().ct_eq(token.as_bytes()))
    })
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Access {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(AUTHORIZATION) else {
            return Ok(Access::Anonymous);
        };

        let token = header
            .to_str()
            .ok()
            .and_then(presented_token)
            .ok_or(AppError::Unauthorized)?;

        if state.is_admin_token(token) {
            Ok(Access::Admin)
        } else {
            tracing::warn!("rejected request with unknown token");
            Err(AppError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_schemes() {
        assert_eq!(presented_token("Token abc"), Some("abc"));
        assert_eq!(presented_token("bearer  xyz "), Some("xyz"));
        assert_eq!(presented_token("Basic abc"), None);
        assert_eq!(presented_token("Token"), None);
        assert_eq!(presented_token("Token  "), None);
    }

    #[test]
    fn compares_against_every_known_token() {
        let known = vec!["first".to_string(), "second".to_string()];
        assert!(matches_any("second", &known));
        assert!(!matches_any("secon", &known));
        assert!(!matches_any("anything", &[]));
    }

    #[test]
    fn policy_matrix() {
        assert!(Access::Anonymous.require(Policy::Public).is_ok());
        assert!(Access::Admin.require(Policy::Public).is_ok());
        assert!(Access::Admin.require(Policy::Admin).is_ok());
        assert!(matches!(
            Access::Anonymous.require(Policy::Admin),
            Err(AppError::Forbidden)
        ));
    }
}
