//! Outbound email. Credentials are optional at startup: without them the
//! mailer stays in a reported "not configured" state and send attempts fail
//! with a distinct error instead of the process refusing to boot.

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

use crate::config::EmailConfig;
use crate::store::Status;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("email is not configured")]
    NotConfigured,
    #[error("invalid email address: {0}")]
    Address(String),
    #[error("failed to build message: {0}")]
    Build(String),
    #[error("smtp send failed: {0}")]
    Transport(String),
}

pub enum Mailer {
    Disabled,
    Smtp {
        transport: AsyncSmtpTransport<Tokio1Executor>,
        from: Mailbox,
        host: String,
        user: String,
    },
}

impl Mailer {
    pub fn from_config(email: Option<&EmailConfig>) -> anyhow::Result<Self> {
        let Some(cfg) = email else {
            return Ok(Mailer::Disabled);
        };
        let from: Mailbox = cfg
            .user
            .parse()
            .map_err(|e| anyhow::anyhow!("EMAIL_USER is not a valid address: {e}"))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)?
            .credentials(Credentials::new(cfg.user.clone(), cfg.password.clone()))
            .build();
        Ok(Mailer::Smtp {
            transport,
            from,
            host: cfg.host.clone(),
            user: cfg.user.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        matches!(self, Mailer::Smtp { .. })
    }

    pub fn status(&self) -> serde_json::Value {
        match self {
            Mailer::Disabled => serde_json::json!({ "configured": false }),
            Mailer::Smtp { host, user, .. } => serde_json::json!({
                "configured": true,
                "host": host,
                "user": user,
            }),
        }
    }

    pub async fn send_html(&self, to: &str, subject: &str, html: String) -> Result<(), MailError> {
        let Mailer::Smtp {
            transport, from, ..
        } = self
        else {
            return Err(MailError::NotConfigured);
        };
        let to: Mailbox = to
            .parse()
            .map_err(|_| MailError::Address(to.to_string()))?;
        let message = Message::builder()
            .from(from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)
            .map_err(|e| MailError::Build(e.to_string()))?;
        transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| MailError::Transport(e.to_string()))
    }
}

/// Per-student attendance notice body.
pub fn attendance_notice_html(
    student_name: &str,
    class_name: &str,
    date: &str,
    status: Status,
) -> String {
    let (color, label) = match status {
        Status::Present => ("#2e7d32", "Present"),
        Status::Absent => ("#c62828", "Absent"),
    };
    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; color: #222;">
  <h2 style="margin-bottom: 4px;">Attendance Update</h2>
  <p>Hello {student_name},</p>
  <p>Your attendance for <strong>{class_name}</strong> on {date} has been recorded as:</p>
  <p style="font-size: 18px; font-weight: bold; color: {color};">{label}</p>
  <p style="color: #777; font-size: 12px;">This is an automated message from the attendance system.</p>
</body>
</html>"#
    )
}

pub fn attendance_notice_subject(class_name: &str, date: &str) -> String {
    format!("Attendance for {class_name} on {date}")
}
