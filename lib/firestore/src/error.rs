#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Json(serde_json::Error),
    Form(serde_urlencoded::ser::Error),
    UrlParse(chipp_http::UrlParseError),
    Http(chipp_http::Error),
    Jwt(jsonwebtoken::errors::Error),
    Timestamp(chrono::ParseError),
    MissingProjectId,
    MissingWriteResult,
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<serde_urlencoded::ser::Error> for Error {
    fn from(err: serde_urlencoded::ser::Error) -> Self {
        Self::Form(err)
    }
}

impl From<chipp_http::UrlParseError> for Error {
    fn from(err: chipp_http::UrlParseError) -> Self {
        Self::UrlParse(err)
    }
}

impl From<chipp_http::Error> for Error {
    fn from(err: chipp_http::Error) -> Self {
        Self::Http(err)
    }
}

impl From<jsonwebtoken::errors::Error> for Error {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        Self::Jwt(err)
    }
}

impl From<chrono::ParseError> for Error {
    fn from(err: chrono::ParseError) -> Self {
        Self::Timestamp(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::Json(err) => write!(f, "JSON error: {err}"),
            Self::Form(err) => write!(f, "form encoding error: {err}"),
            Self::UrlParse(err) => write!(f, "URL parse error: {err}"),
            Self::Http(err) => write!(f, "HTTP error: {err}"),
            Self::Jwt(err) => write!(f, "JWT error: {err}"),
            Self::Timestamp(err) => write!(f, "timestamp parse error: {err}"),
            Self::MissingProjectId => write!(f, "Missing project id"),
            Self::MissingWriteResult => write!(f, "Missing write result in commit response"),
        }
    }
}

impl std::error::Error for Error {}
