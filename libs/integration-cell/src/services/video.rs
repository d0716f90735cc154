use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;

use shared_config::AppConfig;

use crate::models::IntegrationError;

#[derive(Debug, Serialize)]
struct VideoGrant {
    #[serde(skip_serializing_if = "Option::is_none")]
    room: Option<String>,
}

#[derive(Debug, Serialize)]
struct Grants {
    identity: String,
    video: VideoGrant,
}

#[derive(Debug, Serialize)]
struct AccessTokenClaims {
    jti: String,
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
    grants: Grants,
}

#[derive(Debug)]
pub struct IssuedVideoToken {
    pub token: String,
    pub ttl: i64,
    pub identity: String,
    pub room: Option<String>,
}

/// Issues Twilio-shaped video access tokens. The token is an HS256 JWT with
/// the `twilio-fpa;v=1` content type header, signed with the API key secret.
pub struct VideoTokenService<'a> {
    config: &'a AppConfig,
}

impl<'a> VideoTokenService<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    pub fn issue(
        &self,
        identity: &str,
        room: Option<&str>,
    ) -> Result<IssuedVideoToken, IntegrationError> {
        if !self.config.is_video_configured() {
            return Err(IntegrationError::VideoNotConfigured);
        }

        let iat = Utc::now().timestamp();
        let ttl = self.config.twilio_token_ttl_seconds;
        let claims = AccessTokenClaims {
            jti: format!("{}-{}", self.config.twilio_api_key_sid, iat),
            iss: self.config.twilio_api_key_sid.clone(),
            sub: self.config.twilio_account_sid.clone(),
            iat,
            exp: iat + ttl,
            grants: Grants {
                identity: identity.to_string(),
                video: VideoGrant {
                    room: room.map(str::to_string),
                },
            },
        };

        let mut header = Header::new(Algorithm::HS256);
        header.cty = Some("twilio-fpa;v=1".to_string());

        let token = encode(
            &header,
            &claims,
            &EncodingKey::from_secret(self.config.twilio_api_key_secret.as_bytes()),
        )
        .map_err(|e| IntegrationError::Token(e.to_string()))?;

        Ok(IssuedVideoToken {
            token,
            ttl,
            identity: identity.to_string(),
            room: room.map(str::to_string),
        })
    }
}
