use std::fmt;
use std::sync::Arc;

use log::{debug, error};
use transport::{SensorRecord, Telemetry, ValidationError};

use crate::{Dispatcher, WriteTicket};

/// Reason a message was dropped without being stored.
#[derive(Debug)]
pub enum Rejection {
    Decode(serde_json::Error),
    Validation(ValidationError),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "unable to parse telemetry: {err}"),
            Self::Validation(err) => write!(f, "invalid telemetry: {err}"),
        }
    }
}

#[derive(Debug)]
pub enum Disposition {
    Dropped(Rejection),
    Dispatched(WriteTicket),
}

impl Disposition {
    pub fn ticket(self) -> Option<WriteTicket> {
        match self {
            Self::Dispatched(ticket) => Some(ticket),
            Self::Dropped(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Dropped(rejection) => Some(rejection),
            Self::Dispatched(_) => None,
        }
    }
}

pub struct Handler {
    dispatcher: Arc<Dispatcher>,
}

impl Handler {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Turns a raw payload into a stored sensor record. Returns as soon as the
    /// write is issued; every failure is logged here and never propagated.
    pub fn handle(&self, payload: &[u8]) -> Disposition {
        let telemetry = match Telemetry::from_slice(payload) {
            Ok(telemetry) => telemetry,
            Err(err) => {
                let rejection = Rejection::Decode(err);
                error!("{rejection}");
                debug!("{}", String::from_utf8_lossy(payload));
                return Disposition::Dropped(rejection);
            }
        };

        debug!("got telemetry: {telemetry:?}");

        let pond = match telemetry.pond_id() {
            Ok(pond) => pond,
            Err(err) => {
                let rejection = Rejection::Validation(err);
                error!("{rejection}");
                return Disposition::Dropped(rejection);
            }
        };

        let record = SensorRecord::from(&telemetry);
        debug!("storing {record:?} for {pond}");

        Disposition::Dispatched(self.dispatcher.dispatch(pond, record))
    }
}
