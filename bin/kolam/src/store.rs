use async_trait::async_trait;
use chrono::{DateTime, Utc};
use firestore::{Client, CollectionPath, Document, ServiceAccount};
use log::info;
use transport::{PondId, SensorRecord};

use crate::{Result, StoreConfig};

const PONDS: &str = "ponds";
const SENSOR_DATA: &str = "sensor_data";
const TIMESTAMP: &str = "timestamp";

#[derive(Clone, Debug, PartialEq)]
pub struct StoredRecord {
    pub document: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Appends `record` to the sensor data of `pond`. Never deduplicates.
    async fn append(&self, pond: &PondId, record: &SensorRecord) -> Result<StoredRecord>;
}

pub fn sensor_data_collection(pond: &PondId) -> CollectionPath {
    CollectionPath::new(PONDS)
        .doc(pond.to_string())
        .collection(SENSOR_DATA)
}

fn sensor_data_document(record: &SensorRecord) -> Document {
    let mut document = Document::new();

    for (name, value) in record.fields() {
        document.set_double(name, value);
    }

    document.set_server_timestamp(TIMESTAMP);
    document
}

pub struct FirestoreStore {
    client: Client,
}

impl FirestoreStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let client = match config {
            StoreConfig::ServiceAccount {
                key_path,
                project_id,
            } => {
                let account = ServiceAccount::from_file(key_path)?;
                info!("using service account {}", account.client_email);

                Client::new(project_id.clone(), account)?
            }
            StoreConfig::Emulator { host, project_id } => {
                info!("using firestore emulator at {host}");

                Client::emulator(host, project_id)?
            }
        };

        info!("storing sensor data in {}", client.database());

        Ok(Self::new(client))
    }

    pub async fn authorize(&self) -> Result<()> {
        self.client.authorize().await?;
        Ok(())
    }
}

#[async_trait]
impl Store for FirestoreStore {
    async fn append(&self, pond: &PondId, record: &SensorRecord) -> Result<StoredRecord> {
        let collection = sensor_data_collection(pond);
        let document = sensor_data_document(record);

        let result = self.client.add(&collection, &document).await?;

        Ok(StoredRecord {
            document: result.document.to_string(),
            timestamp: result.server_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use firestore::Value;
    use serde_json::json;

    fn pond(kolam: serde_json::Value) -> PondId {
        PondId::from_kolam(Some(&kolam)).unwrap()
    }

    #[test]
    fn test_collection_path() {
        assert_eq!(
            sensor_data_collection(&pond(json!("3"))).to_string(),
            "ponds/pond_3/sensor_data"
        );
        assert_eq!(
            sensor_data_collection(&pond(json!(3))).to_string(),
            "ponds/pond_3/sensor_data"
        );
    }

    #[test]
    fn test_document_fields() {
        let record = SensorRecord {
            temperature: 28.5,
            ..SensorRecord::default()
        };

        let document = sensor_data_document(&record);

        assert_eq!(document.fields().len(), 5);
        assert_eq!(document.fields()["suhu"], Value::Double(28.5));
        assert_eq!(document.fields()["do"], Value::Double(0.0));
        assert_eq!(document.fields()["ph"], Value::Double(0.0));
        assert_eq!(document.fields()["berat_pakan"], Value::Double(0.0));
        assert_eq!(document.fields()["level_air"], Value::Double(0.0));
        assert_eq!(document.server_timestamps(), ["timestamp".to_string()]);
    }

    #[test]
    fn test_missing_key_file() {
        let config = StoreConfig::ServiceAccount {
            key_path: "/nonexistent/kolam-key.json".into(),
            project_id: None,
        };

        assert!(matches!(
            FirestoreStore::from_config(&config),
            Err(crate::Error::Firestore(firestore::Error::Io(_)))
        ));
    }

    #[test]
    fn test_emulator_store() {
        let config = StoreConfig::Emulator {
            host: "localhost:8080".to_string(),
            project_id: "demo-kolam".to_string(),
        };

        let store = FirestoreStore::from_config(&config).unwrap();
        assert_eq!(
            store.client.database(),
            "projects/demo-kolam/databases/(default)"
        );
    }
}
