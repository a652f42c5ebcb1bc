//! Outbound attendance events.
//!
//! The write paths emit events fire-and-forget; a spawned worker drains the
//! channel and hands each event to a [`NotificationSink`]. Email/WhatsApp
//! senders live behind that trait outside the attendance path, so a sender
//! failure can never fail an attendance write.

use chrono::{NaiveDate, NaiveDateTime};
use futures::channel::mpsc;
use futures::StreamExt;
use once_cell::sync::OnceCell;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub enum AttendanceEvent {
    CheckedIn {
        employee_id: u64,
        at: NaiveDateTime,
        shift_name: String,
    },
    CheckedOut {
        employee_id: u64,
        at: NaiveDateTime,
        ot_hours: f64,
    },
    AutoClosed {
        employee_id: u64,
        record_id: u64,
        closed_at: NaiveDateTime,
    },
    AbsenceMarked {
        employee_id: u64,
        date: NaiveDate,
    },
}

pub trait NotificationSink: Send + Sync {
    fn deliver(&self, event: &AttendanceEvent);
}

/// Default sink: structured log lines. Real deployments swap in an
/// email/WhatsApp sender here.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, event: &AttendanceEvent) {
        match event {
            AttendanceEvent::CheckedIn { employee_id, at, shift_name } => {
                info!(employee_id, at = %at, shift = %shift_name, "notify: checked in");
            }
            AttendanceEvent::CheckedOut { employee_id, at, ot_hours } => {
                info!(employee_id, at = %at, ot_hours, "notify: checked out");
            }
            AttendanceEvent::AutoClosed { employee_id, record_id, closed_at } => {
                info!(employee_id, record_id, closed_at = %closed_at, "notify: auto-closed");
            }
            AttendanceEvent::AbsenceMarked { employee_id, date } => {
                info!(employee_id, date = %date, "notify: marked absent");
            }
        }
    }
}

static SENDER: OnceCell<mpsc::UnboundedSender<AttendanceEvent>> = OnceCell::new();

/// Queue an event for delivery. Never blocks and never fails the caller;
/// with no worker running the event is dropped with a warning.
pub fn emit(event: AttendanceEvent) {
    match SENDER.get() {
        Some(tx) => {
            if tx.unbounded_send(event).is_err() {
                warn!("Notification worker gone; event dropped");
            }
        }
        None => warn!("Notification worker not started; event dropped"),
    }
}

/// Spawn the delivery worker on the actix runtime. Call once at startup,
/// before the server begins accepting punches.
pub fn start_worker(sink: impl NotificationSink + 'static) {
    let (tx, mut rx) = mpsc::unbounded();

    if SENDER.set(tx).is_err() {
        warn!("Notification worker already started");
        return;
    }

    actix_web::rt::spawn(async move {
        while let Some(event) = rx.next().await {
            sink.deliver(&event);
        }
    });
}
