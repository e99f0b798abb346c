use lettre::{
    Message, SmtpTransport, Transport,
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
};
use log::{info, error, warn};

pub struct EmailService;

impl EmailService {
    pub async fn send_welcome_email(email: &str, name: &str) -> bool {
        match Self::try_send_welcome(email, name).await {
            Ok(_) => {
                info!("Welcome email sent to {}", email);
                true
            }
            Err(e) => {
                error!("Failed to send welcome email to {}: {}", email, e);
                false
            }
        }
    }

    async fn try_send_welcome(email: &str, name: &str) -> Result<(), Box<dyn std::error::Error>> {
        let first_name = name.split_whitespace().next().unwrap_or("there");

        let email_body = format!(
            r#"
            <!DOCTYPE html>
            <html>
            <body>
                <h1>Welcome to Tourbook! 🏔️</h1>
                <p>Hi {},</p>
                <p>We're glad to have you on board. With Tourbook you can:</p>
                <ul>
                    <li>Browse and book guided tours</li>
                    <li>Manage your bookings</li>
                    <li>Review the tours you've taken</li>
                </ul>
                <p>Best regards,<br><strong>The Tourbook Team</strong></p>
            </body>
            </html>
            "#,
            first_name
        );

        Self::send_html(email, "Welcome to Tourbook! 🏔️", email_body)
    }

    pub async fn send_password_reset_email(email: &str, reset_url: &str) -> bool {
        match Self::try_send_password_reset(email, reset_url).await {
            Ok(_) => {
                info!("Password reset email sent to {}", email);
                true
            }
            Err(e) => {
                error!("Failed to send password reset email to {}: {}", email, e);
                false
            }
        }
    }

    async fn try_send_password_reset(
        email: &str,
        reset_url: &str,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let email_body = format!(
            r#"
            <!DOCTYPE html>
            <html>
            <body>
                <h1>🔐 Tourbook password reset</h1>
                <p>Forgot your password? Submit a PATCH request with your new
                   password and password confirmation to:</p>
                <p><a href="{}">{}</a></p>
                <p>This link is valid for 10 minutes.</p>
                <p>If you didn't request a password reset, please ignore this email.</p>
                <p>Best regards,<br><strong>The Tourbook Team</strong></p>
            </body>
            </html>
            "#,
            reset_url, reset_url
        );

        Self::send_html(email, "Your password reset token (valid for 10 minutes)", email_body)
    }

    fn send_html(
        to: &str,
        subject: &str,
        body: String,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mail_user = crate::config::Config::mail_user();
        let mail_password = crate::config::Config::mail_password();

        if mail_user.is_empty() || mail_password.is_empty() {
            warn!("Email credentials not configured. Skipping email send.");
            return Err("Email not configured".into());
        }

        let from_mailbox: Mailbox = crate::config::Config::mail_from().parse()?;
        let to_mailbox: Mailbox = to.parse()?;

        let email_message = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body)?;

        let creds = Credentials::new(mail_user, mail_password);
        let mailer = SmtpTransport::relay(&crate::config::Config::mail_host())?
            .credentials(creds)
            .build();

        mailer.send(&email_message)?;
        Ok(())
    }
}
