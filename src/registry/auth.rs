use crate::{errors::ImageError, image::Repository, registry::DefaultRegistry};
use std::fmt;

/// Short-lived bearer token for pulling from one repository
///
/// Lives only as long as the [crate::registry::Client] that requested it.
#[derive(Clone, Eq, PartialEq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(<{} bytes>)", self.0.len())
    }
}

/// Token server response. Docker's token protocol calls the value `token`,
/// OAuth2-compatible servers call it `access_token`; most send both.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    token: Option<String>,
}

impl TokenResponse {
    fn into_token(self) -> Option<AccessToken> {
        self.access_token.or(self.token).map(AccessToken)
    }
}

/// Ask the token server for anonymous pull access to a repository
///
/// Reference: <https://docs.docker.com/registry/spec/auth/token/>
pub(crate) async fn get_access_token(
    req: &reqwest::Client,
    settings: &DefaultRegistry,
    repository: &Repository,
) -> Result<AccessToken, ImageError> {
    let scope = format!("repository:{}:pull", repository);
    log::debug!("requesting token for {} from {}", scope, settings.auth_url);

    let response = req
        .get(settings.auth_url.clone())
        .query(&[("service", settings.service.as_str()), ("scope", scope.as_str())])
        .send()
        .await
        .map_err(|err| ImageError::Auth(err.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ImageError::Auth(format!(
            "token server {} returned {}",
            settings.auth_url, status
        )));
    }

    let body = response
        .bytes()
        .await
        .map_err(|err| ImageError::Auth(err.to_string()))?;
    let decoded: TokenResponse = serde_json::from_slice(&body)
        .map_err(|err| ImageError::Auth(format!("bad token response: {}", err)))?;
    match decoded.into_token() {
        Some(token) => {
            log::debug!("received token for {}", repository);
            Ok(token)
        }
        None => Err(ImageError::Auth("token response has no access_token".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Option<AccessToken> {
        serde_json::from_str::<TokenResponse>(json)
            .ok()
            .and_then(TokenResponse::into_token)
    }

    #[test]
    fn token_fields() {
        assert_eq!(decode(r#"{"access_token": "abc"}"#).unwrap().as_str(), "abc");
        assert_eq!(decode(r#"{"token": "def"}"#).unwrap().as_str(), "def");
        assert_eq!(
            decode(r#"{"token": "def", "access_token": "abc", "expires_in": 300}"#)
                .unwrap()
                .as_str(),
            "abc"
        );
        assert!(decode(r#"{"expires_in": 300}"#).is_none());
        assert!(decode(r#"{"access_token": 42}"#).is_none());
        assert!(decode(r#"[]"#).is_none());
    }

    #[test]
    fn token_debug_hides_secret() {
        let token = AccessToken("hunter2".into());
        assert!(!format!("{:?}", token).contains("hunter2"));
    }
}
