mod auth;
pub use auth::ServiceAccount;

mod client;
pub use client::Client;

mod commit;
pub use commit::WriteResult;

mod document;
pub use document::{CollectionPath, Document, DocumentPath, Value};

mod error;
pub use error::Error;
