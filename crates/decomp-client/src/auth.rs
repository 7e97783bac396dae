use secrecy::SecretString;

/// Wraps a personal access token with secrecy protection (zeroized on
/// drop, redacted in Debug).
#[derive(Clone)]
pub struct PatToken(pub SecretString);

impl PatToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(SecretString::from(raw.into()))
    }
}

impl std::fmt::Debug for PatToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PatToken([REDACTED])")
    }
}
