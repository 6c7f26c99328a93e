//! JWT token signing and verification.
//!
//! Access and refresh tokens are signed with separate Ed25519 key pairs, so
//! holding the key material for one kind grants nothing for the other.

use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Token kind for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived token presented on every protected request
    Access,
    /// Longer-lived token used only to mint new access tokens
    Refresh,
}

impl TokenKind {
    /// Key role used to sign tokens of this kind.
    pub fn private_role(self) -> KeyRole {
        match self {
            TokenKind::Access => KeyRole::AccessPrivate,
            TokenKind::Refresh => KeyRole::RefreshPrivate,
        }
    }

    /// Key role used to verify tokens of this kind.
    pub fn public_role(self) -> KeyRole {
        match self {
            TokenKind::Access => KeyRole::AccessPublic,
            TokenKind::Refresh => KeyRole::RefreshPublic,
        }
    }
}

/// The four role-tagged keys supplied at start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    AccessPrivate,
    AccessPublic,
    RefreshPrivate,
    RefreshPublic,
}

impl KeyRole {
    pub const ALL: [KeyRole; 4] = [
        KeyRole::AccessPrivate,
        KeyRole::AccessPublic,
        KeyRole::RefreshPrivate,
        KeyRole::RefreshPublic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyRole::AccessPrivate => "access-private",
            KeyRole::AccessPublic => "access-public",
            KeyRole::RefreshPrivate => "refresh-private",
            KeyRole::RefreshPublic => "refresh-public",
        }
    }

    /// File name used when keys are loaded from (or written to) a directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            KeyRole::AccessPrivate => "access_private.pem",
            KeyRole::AccessPublic => "access_public.pem",
            KeyRole::RefreshPrivate => "refresh_private.pem",
            KeyRole::RefreshPublic => "refresh_public.pem",
        }
    }

    /// Environment variable holding the base64-encoded PEM for this role.
    pub fn env_var(&self) -> &'static str {
        match self {
            KeyRole::AccessPrivate => "ACCESS_TOKEN_PRIVATE_KEY",
            KeyRole::AccessPublic => "ACCESS_TOKEN_PUBLIC_KEY",
            KeyRole::RefreshPrivate => "REFRESH_TOKEN_PRIVATE_KEY",
            KeyRole::RefreshPublic => "REFRESH_TOKEN_PUBLIC_KEY",
        }
    }
}

/// Claims carried by both token kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user id)
    pub sub: String,
    /// Session the token was minted for
    pub sid: String,
    /// Token kind
    #[serde(rename = "typ")]
    pub kind: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// Token lifetime in seconds (cookie Max-Age)
    pub max_age: u64,
}

/// PEM-encoded key material, one blob per [`KeyRole`].
#[derive(Clone)]
pub struct KeyMaterial {
    access_private: Vec<u8>,
    access_public: Vec<u8>,
    refresh_private: Vec<u8>,
    refresh_public: Vec<u8>,
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial").finish_non_exhaustive()
    }
}

impl KeyMaterial {
    pub fn new(
        access_private: Vec<u8>,
        access_public: Vec<u8>,
        refresh_private: Vec<u8>,
        refresh_public: Vec<u8>,
    ) -> Self {
        Self {
            access_private,
            access_public,
            refresh_private,
            refresh_public,
        }
    }

    /// Generate two fresh Ed25519 key pairs.
    pub fn generate() -> Result<Self, JwtError> {
        let (access_private, access_public) = generate_ed25519_pem()?;
        let (refresh_private, refresh_public) = generate_ed25519_pem()?;
        Ok(Self::new(
            access_private,
            access_public,
            refresh_private,
            refresh_public,
        ))
    }

    /// Load all four PEM files from a directory.
    pub fn from_dir(dir: &Path) -> Result<Self, JwtError> {
        let read = |role: KeyRole| {
            std::fs::read(dir.join(role.file_name()))
                .map_err(|e| JwtError::Signing(format!("{}: {}", role.as_str(), e)))
        };
        Ok(Self::new(
            read(KeyRole::AccessPrivate)?,
            read(KeyRole::AccessPublic)?,
            read(KeyRole::RefreshPrivate)?,
            read(KeyRole::RefreshPublic)?,
        ))
    }

    /// Load base64-encoded PEM blobs from the environment.
    pub fn from_env() -> Result<Self, JwtError> {
        let read = |role: KeyRole| -> Result<Vec<u8>, JwtError> {
            let encoded = std::env::var(role.env_var())
                .map_err(|_| JwtError::Signing(format!("{} is not set", role.env_var())))?;
            base64::engine::general_purpose::STANDARD
                .decode(encoded.trim())
                .map_err(|e| JwtError::Signing(format!("{}: {}", role.as_str(), e)))
        };
        Ok(Self::new(
            read(KeyRole::AccessPrivate)?,
            read(KeyRole::AccessPublic)?,
            read(KeyRole::RefreshPrivate)?,
            read(KeyRole::RefreshPublic)?,
        ))
    }

    /// Write all four PEM files into a directory.
    pub fn write_to_dir(&self, dir: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(dir)?;
        for role in KeyRole::ALL {
            std::fs::write(dir.join(role.file_name()), self.pem(role))?;
        }
        Ok(())
    }

    pub fn pem(&self, role: KeyRole) -> &[u8] {
        match role {
            KeyRole::AccessPrivate => &self.access_private,
            KeyRole::AccessPublic => &self.access_public,
            KeyRole::RefreshPrivate => &self.refresh_private,
            KeyRole::RefreshPublic => &self.refresh_public,
        }
    }
}

fn generate_ed25519_pem() -> Result<(Vec<u8>, Vec<u8>), JwtError> {
    let key = openssl::pkey::PKey::generate_ed25519().map_err(JwtError::KeyGeneration)?;
    let private = key
        .private_key_to_pem_pkcs8()
        .map_err(JwtError::KeyGeneration)?;
    let public = key.public_key_to_pem().map_err(JwtError::KeyGeneration)?;
    Ok((private, public))
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn parse(material: &KeyMaterial, kind: TokenKind) -> Result<Self, JwtError> {
        let private = kind.private_role();
        let public = kind.public_role();
        let encoding = EncodingKey::from_ed_pem(material.pem(private))
            .map_err(|e| JwtError::Signing(format!("{}: {}", private.as_str(), e)))?;
        let decoding = DecodingKey::from_ed_pem(material.pem(public))
            .map_err(|e| JwtError::Signing(format!("{}: {}", public.as_str(), e)))?;
        Ok(Self { encoding, decoding })
    }
}

/// Signs and verifies tokens with process-wide immutable key material.
pub struct TokenCodec {
    access: KeyPair,
    refresh: KeyPair,
}

impl TokenCodec {
    /// Parse the key material and check that each pair signs and verifies.
    pub fn new(material: &KeyMaterial) -> Result<Self, JwtError> {
        let codec = Self {
            access: KeyPair::parse(material, TokenKind::Access)?,
            refresh: KeyPair::parse(material, TokenKind::Refresh)?,
        };

        for kind in [TokenKind::Access, TokenKind::Refresh] {
            let probe = codec.sign("probe", "probe", kind, Duration::from_secs(60))?;
            if codec.verify(&probe.token, kind).is_none() {
                return Err(JwtError::Signing(format!(
                    "{} does not match {}",
                    kind.public_role().as_str(),
                    kind.private_role().as_str()
                )));
            }
        }

        Ok(codec)
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Sign fresh claims for `subject` with the private key of `kind`.
    pub fn sign(
        &self,
        subject: &str,
        session_id: &str,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<IssuedToken, JwtError> {
        let now = unix_now()?;
        let max_age = ttl.as_secs();
        let exp = now.saturating_add(max_age);

        let claims = TokenClaims {
            sub: subject.to_string(),
            sid: session_id.to_string(),
            kind,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::EdDSA),
            &claims,
            &self.keys(kind).encoding,
        )
        .map_err(JwtError::Encoding)?;

        Ok(IssuedToken { token, max_age })
    }

    /// Verify a token with the public key of `kind`.
    ///
    /// Bad signatures, malformed tokens, expired tokens and tokens of the other
    /// kind all yield `None`.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Option<TokenClaims> {
        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims =
            match jsonwebtoken::decode::<TokenClaims>(token, &self.keys(kind).decoding, &validation)
            {
                Ok(data) => data.claims,
                Err(e) => {
                    tracing::debug!(kind = ?kind, error = %e, "Token rejected");
                    return None;
                }
            };

        if claims.kind != kind {
            tracing::debug!(expected = ?kind, actual = ?claims.kind, "Wrong token kind");
            return None;
        }

        Some(claims)
    }
}

/// Current time as Unix seconds.
pub fn unix_now() -> Result<u64, JwtError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| JwtError::TimeError)?
        .as_secs())
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Key material missing, malformed or mismatched
    Signing(String),
    /// Error generating key material
    KeyGeneration(openssl::error::ErrorStack),
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Signing(msg) => write!(f, "Invalid signing key: {}", msg),
            JwtError::KeyGeneration(e) => write!(f, "Failed to generate key: {}", e),
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    fn codec() -> (TokenCodec, KeyMaterial) {
        let material = KeyMaterial::generate().unwrap();
        (TokenCodec::new(&material).unwrap(), material)
    }

    #[test]
    fn test_sign_and_verify_access_token() {
        let (codec, _) = codec();

        let issued = codec
            .sign("uuid-123", "sid-1", TokenKind::Access, 15 * MINUTE)
            .unwrap();
        assert_eq!(issued.max_age, 15 * 60);

        let claims = codec.verify(&issued.token, TokenKind::Access).unwrap();
        assert_eq!(claims.sub, "uuid-123");
        assert_eq!(claims.sid, "sid-1");
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.exp - claims.iat, issued.max_age);
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn test_sign_and_verify_refresh_token() {
        let (codec, _) = codec();

        let issued = codec
            .sign("uuid-123", "sid-1", TokenKind::Refresh, 60 * MINUTE)
            .unwrap();

        let claims = codec.verify(&issued.token, TokenKind::Refresh).unwrap();
        assert_eq!(claims.sub, "uuid-123");
        assert_eq!(claims.kind, TokenKind::Refresh);
    }

    #[test]
    fn test_key_roles_are_separated() {
        let (codec, _) = codec();

        let access = codec
            .sign("uuid-123", "sid", TokenKind::Access, MINUTE)
            .unwrap();
        let refresh = codec
            .sign("uuid-123", "sid", TokenKind::Refresh, MINUTE)
            .unwrap();

        assert!(codec.verify(&access.token, TokenKind::Refresh).is_none());
        assert!(codec.verify(&refresh.token, TokenKind::Access).is_none());
    }

    #[test]
    fn test_kind_claim_checked_when_pairs_are_shared() {
        // Same pair configured for both kinds: only the typ claim separates them.
        let pair = KeyMaterial::generate().unwrap();
        let shared = KeyMaterial::new(
            pair.pem(KeyRole::AccessPrivate).to_vec(),
            pair.pem(KeyRole::AccessPublic).to_vec(),
            pair.pem(KeyRole::AccessPrivate).to_vec(),
            pair.pem(KeyRole::AccessPublic).to_vec(),
        );
        let codec = TokenCodec::new(&shared).unwrap();

        let refresh = codec
            .sign("uuid-123", "sid", TokenKind::Refresh, MINUTE)
            .unwrap();
        assert!(codec.verify(&refresh.token, TokenKind::Access).is_none());
        assert!(codec.verify(&refresh.token, TokenKind::Refresh).is_some());
    }

    #[test]
    fn test_invalid_token() {
        let (codec, _) = codec();
        assert!(codec.verify("invalid-token", TokenKind::Access).is_none());
        assert!(codec.verify("", TokenKind::Refresh).is_none());
    }

    #[test]
    fn test_foreign_keys_rejected() {
        let (codec1, _) = codec();
        let (codec2, _) = codec();

        let issued = codec1
            .sign("uuid-123", "sid", TokenKind::Access, MINUTE)
            .unwrap();

        assert!(codec2.verify(&issued.token, TokenKind::Access).is_none());
    }

    #[test]
    fn test_expired_token() {
        let (codec, material) = codec();
        let encoding_key = EncodingKey::from_ed_pem(material.pem(KeyRole::AccessPrivate)).unwrap();

        let now = unix_now().unwrap();
        let claims = TokenClaims {
            sub: "uuid-123".to_string(),
            sid: "sid".to_string(),
            kind: TokenKind::Access,
            iat: now - 100,
            exp: now - 50,
        };
        let token =
            jsonwebtoken::encode(&Header::new(Algorithm::EdDSA), &claims, &encoding_key).unwrap();

        assert!(codec.verify(&token, TokenKind::Access).is_none());
    }

    #[test]
    fn test_malformed_key_is_signing_error() {
        let material = KeyMaterial::generate().unwrap();
        let broken = KeyMaterial::new(
            b"not a pem".to_vec(),
            material.pem(KeyRole::AccessPublic).to_vec(),
            material.pem(KeyRole::RefreshPrivate).to_vec(),
            material.pem(KeyRole::RefreshPublic).to_vec(),
        );

        assert!(matches!(
            TokenCodec::new(&broken),
            Err(JwtError::Signing(_))
        ));
    }

    #[test]
    fn test_mismatched_pair_is_signing_error() {
        let a = KeyMaterial::generate().unwrap();
        let b = KeyMaterial::generate().unwrap();
        let mismatched = KeyMaterial::new(
            a.pem(KeyRole::AccessPrivate).to_vec(),
            b.pem(KeyRole::AccessPublic).to_vec(),
            a.pem(KeyRole::RefreshPrivate).to_vec(),
            a.pem(KeyRole::RefreshPublic).to_vec(),
        );

        match TokenCodec::new(&mismatched) {
            Err(JwtError::Signing(msg)) => assert!(msg.contains("access-public")),
            other => panic!("expected signing error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_key_material_dir_round_trip() {
        let material = KeyMaterial::generate().unwrap();
        let dir = std::env::temp_dir().join(format!("tollgate-keys-{}", uuid::Uuid::new_v4()));

        material.write_to_dir(&dir).unwrap();
        let loaded = KeyMaterial::from_dir(&dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        for role in KeyRole::ALL {
            assert_eq!(loaded.pem(role), material.pem(role));
        }
        assert!(TokenCodec::new(&loaded).is_ok());
    }

    #[test]
    fn test_missing_key_file_is_signing_error() {
        let dir = std::env::temp_dir().join(format!("tollgate-empty-{}", uuid::Uuid::new_v4()));
        assert!(matches!(
            KeyMaterial::from_dir(&dir),
            Err(JwtError::Signing(_))
        ));
    }
}
