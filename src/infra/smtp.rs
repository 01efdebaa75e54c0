//! Blocking SMTP delivery over STARTTLS.

use std::{fmt, time::Instant};

use lettre::{
    Message, SmtpTransport, Transport, transport::smtp::authentication::Credentials,
};
use tracing::{info, warn};

use crate::config::SmtpSettings;

use super::error::InfraError;

/// Delivers a fully assembled message.
pub trait MailTransport {
    fn deliver(&self, message: &Message) -> Result<(), InfraError>;
}

impl<T: MailTransport + ?Sized> MailTransport for &T {
    fn deliver(&self, message: &Message) -> Result<(), InfraError> {
        (**self).deliver(message)
    }
}

/// Connects, upgrades to TLS, authenticates and submits one message per call.
///
/// Each step fails the delivery outright; nothing is retried.
///
/// The configured timeout is handed to lettre, which applies it to the
/// connection and to every read and write after it. A slow but live relay can
/// therefore take longer than the timeout in total.
pub struct SmtpMailTransport {
    settings: SmtpSettings,
}

impl SmtpMailTransport {
    pub fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    fn build(&self) -> Result<SmtpTransport, InfraError> {
        let credentials = Credentials::new(
            self.settings.username.clone(),
            self.settings.password.clone(),
        );
        let transport = SmtpTransport::starttls_relay(&self.settings.server)
            .map_err(|err| {
                InfraError::delivery(format!(
                    "invalid SMTP relay `{}`: {err}",
                    self.settings.server
                ))
            })?
            .port(self.settings.port)
            .credentials(credentials)
            .timeout(Some(self.settings.timeout))
            .build();
        Ok(transport)
    }
}

impl MailTransport for SmtpMailTransport {
    fn deliver(&self, message: &Message) -> Result<(), InfraError> {
        let started_at = Instant::now();
        let transport = self.build()?;

        match transport.send(message) {
            Ok(response) => {
                info!(
                    target = "infra::smtp",
                    op = "smtp::deliver",
                    result = "ok",
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    server = %self.settings.server,
                    port = self.settings.port,
                    code = %response.code(),
                    "Invoice email delivered"
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    target = "infra::smtp",
                    op = "smtp::deliver",
                    result = "error",
                    elapsed_ms = started_at.elapsed().as_millis() as u64,
                    server = %self.settings.server,
                    port = self.settings.port,
                    error = %err,
                    "SMTP delivery failed"
                );
                Err(InfraError::delivery(format!(
                    "{}:{}: {err}",
                    self.settings.server, self.settings.port
                )))
            }
        }
    }
}

impl fmt::Debug for SmtpMailTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpMailTransport")
            .field("settings", &self.settings)
            .finish()
    }
}
