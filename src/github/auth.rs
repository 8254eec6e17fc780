use super::client::Authentication;
use crate::Secret;

/// Personal access token sent as a bearer credential.
#[derive(Clone, Debug)]
pub struct BearerToken<'a> {
    token: Secret<&'a str>,
}

impl<'a> BearerToken<'a> {
    pub const fn new(token: &'a str) -> Self {
        Self { token: Secret(token) }
    }
}

impl Authentication for BearerToken<'_> {
    fn to_authz_value(&self) -> String {
        format!("Bearer {}", self.token.0)
    }
}

#[cfg(test)]
#[test]
fn test_bearer_authz_value() {
    assert_eq!(BearerToken::new("t0k3n").to_authz_value(), "Bearer t0k3n");
}

#[cfg(test)]
#[test]
fn test_bearer_token_debug_is_redacted() {
    let token = BearerToken::new("t0k3n");
    assert!(!format!("{:?}", token).contains("t0k3n"));
}
