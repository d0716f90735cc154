use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::{AuthUser, Claims};

type HmacSha256 = Hmac<Sha256>;

/// Issue an HS256 bearer token for the given identity.
pub fn sign_token(user: &AuthUser, jwt_secret: &str, ttl_hours: i64) -> Result<String, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let now = Utc::now();
    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role,
        iat: now.timestamp(),
        exp: (now + Duration::hours(ttl_hours)).timestamp(),
    };

    let header = serde_json::json!({ "alg": "HS256", "typ": "JWT" });
    let claims_json =
        serde_json::to_string(&claims).map_err(|e| format!("Failed to encode claims: {}", e))?;

    let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string());
    let claims_b64 = URL_SAFE_NO_PAD.encode(claims_json);
    let signing_input = format!("{}.{}", header_b64, claims_b64);

    let mut mac = HmacSha256::new_from_slice(jwt_secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(signing_input.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", signing_input, signature))
}

/// Verify signature and expiry, returning the embedded identity.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<AuthUser, String> {
    if jwt_secret.is_empty() {
        return Err("JWT secret is not set".to_string());
    }

    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let header_b64 = parts[0];
    let claims_b64 = parts[1];
    let signature_b64 = parts[2];

    let signature = match URL_SAFE_NO_PAD.decode(signature_b64) {
        Ok(sig) => sig,
        Err(e) => {
            debug!("Failed to decode signature: {}", e);
            return Err("Invalid signature encoding".to_string());
        }
    };

    let signing_input = format!("{}.{}", header_b64, claims_b64);

    let mut mac = match HmacSha256::new_from_slice(jwt_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return Err("Failed to create HMAC".to_string()),
    };

    mac.update(signing_input.as_bytes());

    if mac.verify_slice(&signature).is_err() {
        debug!("Token signature verification failed");
        return Err("Invalid token signature".to_string());
    }

    let claims_json = match URL_SAFE_NO_PAD.decode(claims_b64) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(json_str) => json_str,
            Err(_) => return Err("Invalid claims encoding".to_string()),
        },
        Err(_) => return Err("Invalid claims encoding".to_string()),
    };

    let claims: Claims = match serde_json::from_str(&claims_json) {
        Ok(c) => c,
        Err(e) => {
            debug!("Failed to parse claims: {}", e);
            return Err("Invalid claims format".to_string());
        }
    };

    let now = Utc::now().timestamp();
    if claims.exp < now {
        debug!("Token expired at {} (now: {})", claims.exp, now);
        return Err("Token expired".to_string());
    }

    let id = Uuid::parse_str(&claims.sub).map_err(|_| "Invalid subject claim".to_string())?;

    let user = AuthUser {
        id,
        username: claims.username,
        role: claims.role,
    };

    debug!("Token validated successfully for user: {}", user.id);
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::auth::Role;

    fn test_user() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            username: "+15550001".to_string(),
            role: Role::Patient,
        }
    }

    #[test]
    fn signed_token_validates() {
        let user = test_user();
        let token = sign_token(&user, "test-secret-key-long-enough", 1).unwrap();
        let validated = validate_token(&token, "test-secret-key-long-enough").unwrap();

        assert_eq!(validated.id, user.id);
        assert_eq!(validated.username, user.username);
        assert_eq!(validated.role, Role::Patient);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign_token(&test_user(), "right-secret", 1).unwrap();
        assert!(validate_token(&token, "wrong-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = sign_token(&test_user(), "secret", -1).unwrap();
        let err = validate_token(&token, "secret").unwrap_err();
        assert_eq!(err, "Token expired");
    }

    #[test]
    fn malformed_token_is_rejected() {
        assert!(validate_token("not.a-token", "secret").is_err());
        assert!(validate_token("", "secret").is_err());
    }
}
