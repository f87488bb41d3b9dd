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

//! Process configuration.
//!
//! Built once at start-up and passed by reference into the components that
//! need it. Every field can be given as a flag or read from the environment.

use clap::{Args, ValueEnum};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A credential that must never show up in logs.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

impl FromStr for Secret {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

/// Log line encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Args)]
pub struct Config {
    /// API key for the payment provider used by wallet top-ups
    #[arg(long, env = "PAYMENT_API_KEY", default_value = "", hide_env_values = true)]
    pub payment_api_key: Secret,

    /// Sender address stamped on outgoing notifications
    #[arg(long, env = "FROM_EMAIL", default_value = Config::DEFAULT_FROM_EMAIL)]
    pub from_email: String,

    /// Sender display name stamped on outgoing notifications
    #[arg(long, env = "FROM_NAME", default_value = Config::DEFAULT_FROM_NAME)]
    pub from_name: String,

    /// Notifications buffered before new ones are dropped
    #[arg(long, env = "NOTIFICATION_QUEUE_CAPACITY", default_value_t = Config::DEFAULT_QUEUE_CAPACITY)]
    pub notification_queue_capacity: usize,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Config {
    pub const DEFAULT_FROM_EMAIL: &'static str = "noreply@rental.local";
    pub const DEFAULT_FROM_NAME: &'static str = "Game Rental Service";
    pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

    /// Returns a copy with the given payment key.
    pub fn with_payment_api_key(mut self, key: impl Into<String>) -> Self {
        self.payment_api_key = Secret::new(key);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            payment_api_key: Secret::default(),
            from_email: Self::DEFAULT_FROM_EMAIL.to_string(),
            from_name: Self::DEFAULT_FROM_NAME.to_string(),
            notification_queue_capacity: Self::DEFAULT_QUEUE_CAPACITY,
            log_format: LogFormat::Text,
        }
    }
}
