use serde::Serialize;

/// Messages handed to the notification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    InviteEmail {
        email: String,
        invite_link: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        service_id: Option<String>,
    },
    OtpSms {
        telephone_number: String,
        code: String,
    },
}

impl Notification {
    fn kind(&self) -> &'static str {
        match self {
            Notification::InviteEmail { .. } => "invite_email",
            Notification::OtpSms { .. } => "otp_sms",
        }
    }
}

/// Delivery backend. Sending is fire-and-forget: callers never wait on it
/// and a failed delivery only produces a warning.
#[derive(Clone)]
pub enum Notifier {
    /// Development backend that only records a log event.
    Log,
    Http {
        client: reqwest::Client,
        url: String,
    },
}

impl Notifier {
    pub fn from_url(url: Option<&str>) -> Self {
        match url {
            Some(url) => Notifier::Http {
                client: reqwest::Client::new(),
                url: url.to_string(),
            },
            None => Notifier::Log,
        }
    }

    pub fn notify(&self, notification: Notification) {
        let notifier = self.clone();
        tokio::spawn(async move {
            if let Err(e) = notifier.deliver(&notification).await {
                tracing::warn!("failed to send {} notification: {e}", notification.kind());
            }
        });
    }

    async fn deliver(&self, notification: &Notification) -> Result<(), reqwest::Error> {
        match self {
            Notifier::Log => {
                tracing::info!(kind = notification.kind(), "notification not delivered (log backend)");
                tracing::debug!(?notification);
                Ok(())
            }
            Notifier::Http { client, url } => {
                client
                    .post(url)
                    .json(notification)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(())
            }
        }
    }
}
