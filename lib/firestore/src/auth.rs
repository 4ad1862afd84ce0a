use std::fmt;
use std::path::Path;

use chipp_http::{HttpClient, HttpMethod, NoInterceptor};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::Error;

const SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME: i64 = 3600;
const REFRESH_MARGIN: i64 = 60;

/// Google service account key, as downloaded from the Firebase console.
#[derive(Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: Option<String>,
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccount {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let contents = std::fs::read(path)?;
        Ok(serde_json::from_slice(&contents)?)
    }
}

impl fmt::Debug for ServiceAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccount")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

fn create_assertion(account: &ServiceAccount, now: DateTime<Utc>) -> Result<String, Error> {
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

    let iat = now.timestamp();
    let claims = Claims {
        iss: account.client_email.clone(),
        scope: SCOPE.to_owned(),
        aud: account.token_uri.clone(),
        iat,
        exp: iat + ASSERTION_LIFETIME,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = account.private_key_id.clone();

    let key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())?;

    Ok(encode(&header, &claims, &key)?)
}

#[derive(Clone, Debug)]
pub(crate) struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(REFRESH_MARGIN) < self.expires_at
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    assertion: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

pub(crate) enum Authenticator {
    ServiceAccount {
        account: ServiceAccount,
        token: Mutex<Option<AccessToken>>,
    },
    Emulator,
}

impl Authenticator {
    pub(crate) fn service_account(account: ServiceAccount) -> Self {
        Self::ServiceAccount {
            account,
            token: Mutex::new(None),
        }
    }

    /// Value of the `Authorization` header, fetching a new access token when
    /// the cached one is about to expire.
    pub(crate) async fn authorization(
        &self,
        http_client: &HttpClient<NoInterceptor>,
    ) -> Result<String, Error> {
        let (account, token) = match self {
            Self::Emulator => return Ok("Bearer owner".to_string()),
            Self::ServiceAccount { account, token } => (account, token),
        };

        let mut token = token.lock().await;
        let now = Utc::now();

        if let Some(cached) = token.as_ref().filter(|cached| cached.is_fresh_at(now)) {
            return Ok(format!("Bearer {}", cached.value));
        }

        debug!("requesting access token for {}", account.client_email);

        let fresh = request_access_token(http_client, account, now).await?;
        info!(
            "got access token for {}, expires at {}",
            account.client_email, fresh.expires_at
        );

        let header = format!("Bearer {}", fresh.value);
        *token = Some(fresh);

        Ok(header)
    }
}

async fn request_access_token(
    http_client: &HttpClient<NoInterceptor>,
    account: &ServiceAccount,
    now: DateTime<Utc>,
) -> Result<AccessToken, Error> {
    let assertion = create_assertion(account, now)?;
    let body = serde_urlencoded::to_string(TokenRequest {
        grant_type: GRANT_TYPE,
        assertion: &assertion,
    })?;

    let mut request = http_client.new_request_with_url(account.token_uri.clone())?;
    request.set_method(HttpMethod::Post);
    request.add_header(
        "Content-Type",
        "application/x-www-form-urlencoded".to_string(),
    );
    request.body = Some(body.into_bytes());

    let response = http_client
        .perform_request(request, |req, res| {
            if res.status_code == 200 {
                Ok(res.body)
            } else {
                Err((req, res).into())
            }
        })
        .await?;

    let response: TokenResponse = serde_json::from_slice(&response)?;

    Ok(AccessToken {
        value: response.access_token,
        expires_at: now + Duration::seconds(response.expires_in),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};

    const PRIVATE_KEY: &str = include_str!("../testdata/private_key.pem");
    const PUBLIC_KEY: &str = include_str!("../testdata/public_key.pem");

    fn account() -> ServiceAccount {
        serde_json::from_value(serde_json::json!({
            "type": "service_account",
            "project_id": "kolam-test",
            "private_key_id": "key-1",
            "private_key": PRIVATE_KEY,
            "client_email": "bridge@kolam-test.iam.gserviceaccount.com",
            "client_id": "1234567890"
        }))
        .unwrap()
    }

    #[test]
    fn test_service_account_defaults() {
        let account = account();

        assert_eq!(account.project_id.as_deref(), Some("kolam-test"));
        assert_eq!(account.token_uri, "https://oauth2.googleapis.com/token");
        assert!(!format!("{account:?}").contains("PRIVATE KEY"));
    }

    #[test]
    fn test_assertion_claims() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let assertion = create_assertion(&account(), now).unwrap();

        let header = decode_header(&assertion).unwrap();
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("key-1"));

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = false;
        validation.set_audience(&["https://oauth2.googleapis.com/token"]);

        let claims = decode::<Claims>(
            &assertion,
            &DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap(),
            &validation,
        )
        .unwrap()
        .claims;

        assert_eq!(claims.iss, "bridge@kolam-test.iam.gserviceaccount.com");
        assert_eq!(claims.scope, SCOPE);
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp, now.timestamp() + 3600);
    }

    #[test]
    fn test_invalid_private_key() {
        let mut account = account();
        account.private_key = "not a key".to_string();

        let result = create_assertion(&account, Utc::now());
        assert!(matches!(result, Err(Error::Jwt(_))));
    }

    #[test]
    fn test_token_freshness() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let token = AccessToken {
            value: "token".to_string(),
            expires_at: now + Duration::seconds(3600),
        };

        assert!(token.is_fresh_at(now));
        assert!(token.is_fresh_at(now + Duration::seconds(3539)));
        assert!(!token.is_fresh_at(now + Duration::seconds(3540)));
    }

    #[tokio::test]
    async fn test_emulator_authorization() {
        let http_client = HttpClient::new("http://localhost:8080").unwrap();
        let header = Authenticator::Emulator
            .authorization(&http_client)
            .await
            .unwrap();

        assert_eq!(header, "Bearer owner");
    }
}
