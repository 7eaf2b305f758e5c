use lettre::{
    message::{header::ContentType, Mailbox, Message, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: Option<String>,
}

impl SmtpConfig {
    /// Load SMTP configuration from environment variables
    pub fn from_env() -> Option<Self> {
        let server = std::env::var("SMTP_SERVER").ok()?;
        let port = std::env::var("SMTP_PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(587);
        let username = std::env::var("SMTP_USERNAME").ok()?;
        let password = std::env::var("SMTP_PASSWORD").ok().or_else(|| {
            // Try reading from file (for secrets)
            std::env::var("SMTP_PASSWORD_FILE")
                .ok()
                .and_then(|path| std::fs::read_to_string(path).ok())
                .map(|s| s.trim().to_string())
        })?;
        let from_email = std::env::var("SMTP_FROM_EMAIL")
            .ok()
            .unwrap_or_else(|| username.clone());
        let from_name = std::env::var("SMTP_FROM_NAME").ok();

        Some(Self {
            server,
            port,
            username,
            password,
            from_email,
            from_name,
        })
    }

    /// Create SMTP transport. TLS mode follows the port: 465 implicit TLS,
    /// 587 STARTTLS.
    fn create_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.server)
            .map_err(|e| EmailError::BuildError(e.to_string()))?
            .port(self.port)
            .timeout(Some(Duration::from_secs(30)))
            .credentials(Credentials::new(
                self.username.clone(),
                self.password.clone(),
            ));

        Ok(builder.build())
    }
}

#[derive(Debug)]
pub struct EmailService {
    config: SmtpConfig,
}

impl EmailService {
    pub fn new(config: SmtpConfig) -> Self {
        Self { config }
    }

    /// Send a plain text email
    pub async fn send_text(&self, to: &str, subject: &str, body: &str) -> Result<(), EmailError> {
        let from_mailbox: Mailbox = if let Some(from_name) = &self.config.from_name {
            format!("{} <{}>", from_name, self.config.from_email)
                .parse()
                .map_err(|_| EmailError::InvalidAddress("from".to_string()))?
        } else {
            self.config
                .from_email
                .parse()
                .map_err(|_| EmailError::InvalidAddress("from".to_string()))?
        };

        let to_mailbox: Mailbox = to
            .parse()
            .map_err(|_| EmailError::InvalidAddress("to".to_string()))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .singlepart(
                SinglePart::builder()
                    .header(ContentType::TEXT_PLAIN)
                    .body(body.to_string()),
            )
            .map_err(|e| EmailError::BuildError(e.to_string()))?;

        let transport = self.config.create_transport()?;
        transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendError(e.to_string()))?;

        Ok(())
    }
}

#[derive(Debug)]
pub enum EmailError {
    InvalidAddress(String),
    BuildError(String),
    SendError(String),
}

impl std::fmt::Display for EmailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmailError::InvalidAddress(addr) => write!(f, "Invalid email address: {}", addr),
            EmailError::BuildError(msg) => write!(f, "Failed to build email: {}", msg),
            EmailError::SendError(msg) => write!(f, "Failed to send email: {}", msg),
        }
    }
}

impl std::error::Error for EmailError {}
