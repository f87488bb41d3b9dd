// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Outbound notifications.
//!
//! Callers enqueue and move on. A single background thread drains the queue
//! into a [`NotificationSink`]; nothing it does can fail the caller.

use crate::base::{BookingId, TransactionId, UserId};
use crate::booking::BookingStatus;
use crate::user::Contact;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationEvent {
    Topup {
        amount: Decimal,
        new_balance: Decimal,
        payment_id: String,
    },
    Booking {
        booking_id: BookingId,
        status: BookingStatus,
        amount: Decimal,
    },
    Transfer {
        transaction_id: TransactionId,
        booking_id: BookingId,
        amount: Decimal,
        /// Recipient's balance after the transfer.
        balance: Decimal,
        user_id: UserId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub recipient: Contact,
    pub sender: Contact,
    pub event: NotificationEvent,
}

impl Notification {
    pub fn subject(&self) -> String {
        match &self.event {
            NotificationEvent::Topup { .. } => "Topup Successful".to_string(),
            NotificationEvent::Booking { status, .. } => format!("Booking {status}"),
            NotificationEvent::Transfer { .. } => "Transaction Successful".to_string(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("delivery failed: {0}")]
pub struct DeliveryError(pub String);

/// Where notifications end up.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError>;
}

/// Writes each notification to the log as JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        let payload =
            serde_json::to_string(notification).map_err(|e| DeliveryError(e.to_string()))?;
        tracing::info!(
            to = %notification.recipient.email,
            subject = %notification.subject(),
            %payload,
            "notification sent"
        );
        Ok(())
    }
}

/// Cloneable handle for enqueuing notifications.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: Sender<Notification>,
}

impl Notifier {
    /// Hands a notification to the worker without blocking.
    ///
    /// A full or closed queue drops the notification with a warning.
    pub fn enqueue(&self, notification: Notification) {
        match self.sender.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => tracing::warn!(
                to = %dropped.recipient.email,
                subject = %dropped.subject(),
                "notification queue full, dropping"
            ),
            Err(TrySendError::Disconnected(dropped)) => tracing::warn!(
                to = %dropped.recipient.email,
                subject = %dropped.subject(),
                "notification worker stopped, dropping"
            ),
        }
    }
}

/// Handle to the background delivery thread.
#[derive(Debug)]
pub struct NotificationWorker {
    handle: Option<JoinHandle<()>>,
}

impl NotificationWorker {
    /// Starts the worker. It runs until every [`Notifier`] is dropped.
    pub fn spawn(sink: Arc<dyn NotificationSink>, capacity: usize) -> (Notifier, Self) {
        let (sender, receiver) = channel::bounded(capacity.max(1));
        let handle = thread::Builder::new()
            .name("notification-worker".to_string())
            .spawn(move || run(sink, receiver));
        let handle = match handle {
            Ok(handle) => Some(handle),
            // The receiver went down with the closure, so every enqueue warns.
            Err(e) => {
                tracing::error!(error = %e, "failed to start notification worker");
                None
            }
        };
        (Notifier { sender }, Self { handle })
    }

    /// Waits for queued notifications to drain. Only returns once every
    /// [`Notifier`] has been dropped.
    pub fn join(self) {
        let Some(handle) = self.handle else {
            return;
        };
        if handle.join().is_err() {
            tracing::error!("notification worker panicked");
        }
    }
}

fn run(sink: Arc<dyn NotificationSink>, receiver: Receiver<Notification>) {
    for notification in receiver {
        if let Err(e) = sink.deliver(&notification) {
            tracing::warn!(
                to = %notification.recipient.email,
                subject = %notification.subject(),
                error = %e,
                "notification delivery failed"
            );
        }
    }
    tracing::debug!("notification worker stopped");
}
