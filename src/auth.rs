use axum::{
    RequestPartsExt,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::{AppState, error::AppError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Use,
    ManageContent,
}

impl Capability {
    pub fn name(&self) -> &'static str {
        match self {
            Capability::Use => "local/aiassistant:use",
            Capability::ManageContent => "local/aiassistant:managecontent",
        }
    }
}

// Session token issued by the host platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub userid: i64,
    #[serde(default)]
    pub caps: Vec<Capability>,
    pub sesskey: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    pub exp: u64,
}

/// Who is calling and what they may do. Passed explicitly into every action.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user_id: i64,
    pub capabilities: Vec<Capability>,
    pub sesskey: String,
    pub age: Option<u32>,
}

impl RequestContext {
    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.has(capability) {
            Ok(())
        } else {
            Err(AppError::MissingCapability(capability.name()))
        }
    }

    pub fn verify_sesskey(&self, supplied: Option<&str>) -> Result<(), AppError> {
        match supplied {
            Some(key) if !key.is_empty() && key == self.sesskey => Ok(()),
            _ => Err(AppError::InvalidSesskey),
        }
    }
}

impl From<SessionClaims> for RequestContext {
    fn from(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.userid,
            capabilities: claims.caps,
            sesskey: claims.sesskey,
            age: claims.age,
        }
    }
}

impl Display for RequestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "User ID: {}", self.user_id)
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Unauthenticated)?;

        let claims = decode_session(bearer.token(), &state.settings.session_secret).map_err(|e| {
            tracing::warn!("Session token rejected: {}", e);
            AppError::Unauthenticated
        })?;

        Ok(claims.into())
    }
}

pub fn decode_session(token: &str, secret: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
pub(crate) fn issue_session(claims: &SessionClaims, secret: &str) -> String {
    use jsonwebtoken::{EncodingKey, Header, encode};

    encode(&Header::default(), claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

#[cfg(test)]
pub(crate) fn test_claims(userid: i64, caps: &[Capability]) -> SessionClaims {
    SessionClaims {
        userid,
        caps: caps.to_vec(),
        sesskey: format!("sess{}", userid),
        age: None,
        exp: (chrono::Utc::now().timestamp() + 3600) as u64,
    }
}
