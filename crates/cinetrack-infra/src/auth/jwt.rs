//! JWT claim decoding for tokens handed over by a federated-login callback.
//!
//! The client cannot verify the provider's signature; the backend does that on
//! every request. Claims are only read to populate the local user record.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::Deserialize;
use serde_json::{Map, Value};

use cinetrack_core::ports::{AuthError, TokenClaims, TokenDecoder};

/// Internal JWT claims structure for deserialization.
#[derive(Debug, Deserialize)]
struct Claims {
    sub: Option<String>,
    email: Option<String>,
    exp: Option<i64>,
    #[serde(default)]
    user_metadata: Map<String, Value>,
    #[serde(default)]
    app_metadata: Map<String, Value>,
}

/// Reads JWT payloads without signature verification.
pub struct JwtTokenDecoder {
    validation: Validation,
}

impl JwtTokenDecoder {
    pub fn new() -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        Self { validation }
    }
}

impl Default for JwtTokenDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenDecoder for JwtTokenDecoder {
    fn decode(&self, access_token: &str) -> Result<TokenClaims, AuthError> {
        let data = decode::<Claims>(access_token, &DecodingKey::from_secret(&[]), &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let claims = data.claims;
        Ok(TokenClaims {
            sub: claims.sub,
            email: claims.email,
            exp: claims.exp,
            user_metadata: claims.user_metadata,
            app_metadata: claims.app_metadata,
        })
    }
}
