use crate::models::{Claims, TokenType};
use jsonwebtoken::{DecodingKey, Validation, decode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("{0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),

    #[error("refresh tokens cannot be used for API calls")]
    NotAccessToken,
}

/// Decodes and validates an access token (signature and expiry).
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?
    .claims;

    if claims.token_type != TokenType::Access {
        return Err(TokenError::NotAccessToken);
    }
    Ok(claims)
}
