use chipp_http::{HttpClient, HttpMethod, NoInterceptor};
use log::{debug, trace};

use crate::auth::Authenticator;
use crate::commit::{CommitRequest, CommitResponse};
use crate::{CollectionPath, Document, Error, ServiceAccount, WriteResult};

const BASE_URL: &str = "https://firestore.googleapis.com/v1";
const DEFAULT_DATABASE: &str = "(default)";

pub struct Client {
    http_client: HttpClient<NoInterceptor>,
    authenticator: Authenticator,
    base_url: String,
    database: String,
}

impl Client {
    /// Client authenticated as `account`. The project falls back to the one
    /// named in the service account key.
    pub fn new(project_id: Option<String>, account: ServiceAccount) -> Result<Self, Error> {
        let project_id = project_id
            .or_else(|| account.project_id.clone())
            .ok_or(Error::MissingProjectId)?;

        Self::with_base_url(
            BASE_URL.to_string(),
            &project_id,
            Authenticator::service_account(account),
        )
    }

    /// Client for a local Firestore emulator listening on `host` (`host:port`).
    pub fn emulator(host: &str, project_id: &str) -> Result<Self, Error> {
        Self::with_base_url(
            format!("http://{host}/v1"),
            project_id,
            Authenticator::Emulator,
        )
    }

    fn with_base_url(
        base_url: String,
        project_id: &str,
        authenticator: Authenticator,
    ) -> Result<Self, Error> {
        let http_client = HttpClient::new(base_url.as_str())?;

        Ok(Self {
            http_client,
            authenticator,
            base_url,
            database: format!("projects/{project_id}/databases/{DEFAULT_DATABASE}"),
        })
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// Fetches an access token ahead of the first write.
    pub async fn authorize(&self) -> Result<(), Error> {
        self.authenticator.authorization(&self.http_client).await?;
        Ok(())
    }

    /// Creates a new document with a random id in `collection`.
    pub async fn add(
        &self,
        collection: &CollectionPath,
        document: &Document,
    ) -> Result<WriteResult, Error> {
        let path = collection.new_doc();
        let name = format!("{}/documents/{path}", self.database);
        let body = CommitRequest::create(name, document);

        let authorization = self.authenticator.authorization(&self.http_client).await?;

        let mut request = self.http_client.new_request_with_url(self.commit_url())?;
        request.set_method(HttpMethod::Post);
        request.set_json_body(&body);
        request.add_header("Authorization", authorization);

        trace!(
            "commit request: {}",
            String::from_utf8_lossy(&request.body.clone().unwrap_or_default())
        );

        let response = self
            .http_client
            .perform_request(request, |req, res| {
                trace!("commit response: {}", String::from_utf8_lossy(&res.body));

                if res.status_code == 200 {
                    Ok(res.body)
                } else {
                    Err((req, res).into())
                }
            })
            .await?;

        let response: CommitResponse = serde_json::from_slice(&response)?;
        let result = response.into_write_result(path)?;

        debug!("created {} at {}", result.document, result.server_time);

        Ok(result)
    }

    fn commit_url(&self) -> String {
        format!("{}/{}/documents:commit", self.base_url, self.database)
    }
}
