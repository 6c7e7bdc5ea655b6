use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::{
    config::SmtpConfig,
    error::{AppError, Result},
};

/// SMTP mailer for password-recovery codes. Built only when the SMTP
/// section is configured; otherwise forgot-password fails cleanly.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    pub fn new(config: &SmtpConfig) -> Result<Option<Self>> {
        let (Some(host), Some(user), Some(pass)) = (&config.host, &config.user, &config.pass)
        else {
            return Ok(None);
        };

        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .map_err(|e| AppError::Internal(format!("Invalid SMTP relay: {}", e)))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .map_err(|e| AppError::Internal(format!("Invalid SMTP relay: {}", e)))?
        };

        let transport = builder
            .port(config.port)
            .credentials(Credentials::new(user.clone(), pass.clone()))
            .build();

        let from = config
            .from
            .as_deref()
            .unwrap_or(user)
            .parse::<Mailbox>()
            .map_err(|e| AppError::Internal(format!("Invalid SMTP from address: {}", e)))?;

        Ok(Some(Self { transport, from }))
    }

    pub async fn send_reset_code(&self, to: &str, code: &str) -> Result<()> {
        let to = to
            .parse::<Mailbox>()
            .map_err(|_| AppError::BadRequest("Email inválido".to_string()))?;

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Recuperação de Senha")
            .body(format!("Olá! Seu código de recuperação é: {}", code))
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::External(format!("Erro ao enviar email: {}", e)))?;

        Ok(())
    }
}
