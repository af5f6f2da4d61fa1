use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use uuid::Uuid;

use crate::config::Config;

pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailService {
    /// Returns None if SMTP is not fully configured.
    pub fn new(config: &Config) -> Option<Self> {
        let host = config.smtp_host.as_deref()?;
        let username = config.smtp_username.clone()?;
        let password = config.smtp_password.clone()?;
        let from_addr = config.smtp_from.as_deref()?;

        let port = config.smtp_port.unwrap_or(587);
        let creds = Credentials::new(username, password);

        let transport = if port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
                .ok()?
                .credentials(creds)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                .ok()?
                .credentials(creds)
                .build()
        };

        let from: Mailbox = from_addr.parse().ok()?;

        Some(Self { transport, from })
    }

    fn new_message_id(&self) -> String {
        format!("<{}@{}>", Uuid::new_v4(), self.from.email.domain())
    }

    async fn send_email(
        &self,
        to: Mailbox,
        subject: &str,
        text: &str,
        html: &str,
    ) -> anyhow::Result<()> {
        let email = Message::builder()
            .message_id(Some(self.new_message_id()))
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html.to_string()),
                    ),
            )?;

        self.transport.send(email).await?;
        Ok(())
    }

    pub async fn send_invitation(
        &self,
        to_email: &str,
        full_name: &str,
        role: &str,
        invite_url: &str,
    ) -> anyhow::Result<()> {
        let to: Mailbox = to_email.parse()?;
        let subject = "Zaproszenie do systemu korepetycji";
        let text = format!(
            "Cześć {full_name},\n\n\
             Otrzymujesz zaproszenie do systemu zarządzania korepetycjami \
             (rola: {role}).\n\
             Dokończ rejestrację pod adresem:\n{invite_url}\n\n\
             Link wygasa po 7 dniach."
        );
        let html = format!(
            r#"<p>Cześć <strong>{full_name}</strong>,</p>
<p>Otrzymujesz zaproszenie do systemu zarządzania korepetycjami (rola: <strong>{role}</strong>).</p>
<p><a href="{invite_url}">Dokończ rejestrację</a> — link wygasa po 7 dniach.</p>"#
        );
        self.send_email(to, subject, &text, &html).await
    }

    pub async fn send_login_notification(
        &self,
        to_email: &str,
        full_name: &str,
        when: chrono::DateTime<chrono::Utc>,
    ) -> anyhow::Result<()> {
        let to: Mailbox = to_email.parse()?;
        let when = when.format("%Y-%m-%d %H:%M UTC");
        let subject = "Nowe logowanie na Twoje konto";
        let text = format!(
            "Cześć {full_name},\n\nZalogowano się na Twoje konto: {when}.\n\
             Jeśli to nie Ty, zmień hasło."
        );
        let html = format!(
            r#"<p>Cześć <strong>{full_name}</strong>,</p>
<p>Zalogowano się na Twoje konto: {when}.</p>
<p>Jeśli to nie Ty, zmień hasło.</p>"#
        );
        self.send_email(to, subject, &text, &html).await
    }
}
