//! Session token signing configuration.

/// Secret used to sign and verify merchant session tokens.
#[derive(Clone)]
pub struct AuthConfig {
    session_secret: Box<[u8]>,
}

impl AuthConfig {
    pub fn new(session_secret: Box<[u8]>) -> Self {
        Self { session_secret }
    }

    pub fn secret_bytes(&self) -> &[u8] {
        &self.session_secret
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("session_secret", &"<redacted>")
            .finish()
    }
}
