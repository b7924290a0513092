//! Transport event pump.

use std::sync::{Arc, Weak};

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tracing::{debug, warn};

use super::ConnectionManager;
use crate::transport::TransportEvent;

/// Drive `manager` from `events` until the channel closes or the manager is dropped.
pub(crate) async fn pump(manager: Weak<ConnectionManager>, mut events: Receiver<TransportEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "transport event stream lagged");
                continue;
            },
            Err(RecvError::Closed) => break,
        };

        let Some(manager) = manager.upgrade() else {
            break;
        };
        dispatch(&manager, event);
    }
    debug!("transport event pump finished");
}

fn dispatch(manager: &Arc<ConnectionManager>, event: TransportEvent) {
    match event {
        TransportEvent::Qr(code) => {
            manager.handle_qr(code);
        },
        TransportEvent::Ready => manager.handle_ready(),
        TransportEvent::Disconnected(reason) => manager.handle_disconnected(&reason),
        TransportEvent::Error(err) => {
            manager.handle_error(err);
        },
    }
}
