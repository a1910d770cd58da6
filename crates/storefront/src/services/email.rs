//! Order notification email.
//!
//! Uses SMTP via lettre for delivery with Askama text and HTML templates.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use modern_shop_core::Email;
use modern_shop_core::order::Order;
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// Line item as rendered in the notification.
struct LineView {
    name: String,
    quantity: u32,
    unit_price: String,
    line_total: String,
}

/// HTML template for the new-order notification.
#[derive(Template)]
#[template(path = "email/order_notification.html")]
struct OrderNotificationHtml<'a> {
    order_id: &'a str,
    customer_name: &'a str,
    customer_email: &'a str,
    customer_phone: &'a str,
    customer_address: &'a str,
    lines: &'a [LineView],
    subtotal: String,
    tax: String,
    total: String,
    payment_method: &'a str,
    notes: Option<&'a str>,
}

/// Plain text template for the new-order notification.
#[derive(Template)]
#[template(path = "email/order_notification.txt")]
struct OrderNotificationText<'a> {
    order_id: &'a str,
    customer_name: &'a str,
    customer_email: &'a str,
    customer_phone: &'a str,
    customer_address: &'a str,
    lines: &'a [LineView],
    subtotal: String,
    tax: String,
    total: String,
    payment_method: &'a str,
    notes: Option<&'a str>,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Something that tells the shop owner about new orders.
#[async_trait]
pub trait OrderNotifier: Send + Sync {
    /// Notify `recipient` that `order` was placed.
    async fn order_placed(&self, order: &Order, recipient: &Email) -> Result<(), EmailError>;
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[async_trait]
impl OrderNotifier for EmailService {
    async fn order_placed(&self, order: &Order, recipient: &Email) -> Result<(), EmailError> {
        let (text, html) = render_order_notification(order)?;
        let subject = format!("New order {} ({})", order.id, order.total);
        self.send_multipart_email(recipient.as_str(), &subject, &text, &html)
            .await
    }
}

/// Render the text and HTML bodies for a new-order notification.
fn render_order_notification(order: &Order) -> Result<(String, String), EmailError> {
    let lines: Vec<LineView> = order
        .items
        .iter()
        .map(|item| LineView {
            name: item.name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price.to_string(),
            line_total: item.line_total().to_string(),
        })
        .collect();
    let order_id = order.id.as_str();
    let customer = &order.customer;
    let payment_method = order.payment_method.label();
    let notes = order.notes.as_deref();

    let html = OrderNotificationHtml {
        order_id,
        customer_name: &customer.name,
        customer_email: customer.email.as_str(),
        customer_phone: &customer.phone,
        customer_address: &customer.address,
        lines: &lines,
        subtotal: order.subtotal.to_string(),
        tax: order.tax.to_string(),
        total: order.total.to_string(),
        payment_method,
        notes,
    }
    .render()?;

    let text = OrderNotificationText {
        order_id,
        customer_name: &customer.name,
        customer_email: customer.email.as_str(),
        customer_phone: &customer.phone,
        customer_address: &customer.address,
        lines: &lines,
        subtotal: order.subtotal.to_string(),
        tax: order.tax.to_string(),
        total: order.total.to_string(),
        payment_method,
        notes,
    }
    .render()?;

    Ok((text, html))
}
