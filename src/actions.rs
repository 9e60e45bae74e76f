//! The operations the admin surface and the scheduler trigger.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::cache::RETENTION_WINDOW;
use crate::config::{sanitize_urls, Settings, MAX_SOURCE_URLS};
use crate::digest::{self, DigestKind};
use crate::error::{Error, Result};
use crate::mail::{Mailer, OutgoingMail};
use crate::pipeline::{BatchReport, ChangelogPipeline, PipelineResult};
use crate::store::OptionStore;

/// `{success, data:{...}}`, the shape every admin action answers with.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActionResponse {
    pub success: bool,
    pub data: ActionData,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ActionData {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<PipelineResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summaries_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<SettingsView>,
}

impl ActionResponse {
    fn ok(data: ActionData) -> Self {
        Self {
            success: true,
            data,
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self::fail_with(ActionData {
            message: message.into(),
            ..Default::default()
        })
    }

    fn fail_with(data: ActionData) -> Self {
        Self {
            success: false,
            data,
        }
    }
}

impl From<Error> for ActionResponse {
    fn from(err: Error) -> Self {
        Self::fail(err.to_string())
    }
}

/// Settings as shown to the admin: the API key is never echoed back.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SettingsView {
    pub urls: Vec<String>,
    pub api_key_set: bool,
    pub notification_email: String,
    /// Where digests actually go, after falling back to the admin address.
    pub effective_recipient: String,
    pub max_urls: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsUpdate {
    pub urls: Option<Vec<String>>,
    pub api_key: Option<String>,
    pub notification_email: Option<String>,
}

/// What the weekly job ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum WeeklyOutcome {
    Skipped(String),
    NothingToSend { failed: usize },
    Sent { summaries: usize, failed: usize },
    MailRejected,
}

pub struct Actions {
    store: Arc<dyn OptionStore>,
    pipeline: Arc<ChangelogPipeline>,
    mailer: Arc<dyn Mailer>,
    admin_email: String,
}

impl Actions {
    pub fn new(
        store: Arc<dyn OptionStore>,
        pipeline: Arc<ChangelogPipeline>,
        mailer: Arc<dyn Mailer>,
        admin_email: String,
    ) -> Self {
        Self {
            store,
            pipeline,
            mailer,
            admin_email,
        }
    }

    async fn settings(&self) -> Result<Settings> {
        Settings::load(self.store.as_ref()).await
    }

    /// Settings needed before any digest run; checked before touching the network.
    fn require_digest_settings(&self, settings: &Settings) -> Result<String> {
        if settings.active_urls().iter().all(|u| u.trim().is_empty()) {
            return Err(Error::Configuration(
                "Please configure at least one changelog URL".into(),
            ));
        }
        let recipient = settings.recipient(&self.admin_email);
        if recipient.is_empty() {
            return Err(Error::Configuration(
                "Please configure notification email first".into(),
            ));
        }
        if settings.api_key.trim().is_empty() {
            return Err(Error::Configuration(
                "Please configure Gemini API key first".into(),
            ));
        }
        Ok(recipient.to_string())
    }

    async fn run_digest(&self, settings: &Settings) -> BatchReport {
        self.pipeline
            .run_all(settings.active_urls(), &settings.api_key)
            .await
    }

    /// Run the pipeline for every configured URL, or only `url` when given.
    pub async fn preview(&self, url: Option<&str>) -> ActionResponse {
        let settings = match self.settings().await {
            Ok(settings) => settings,
            Err(e) => return e.into(),
        };

        let urls = match url.filter(|u| !u.trim().is_empty()) {
            Some(url) => match sanitize_urls([url]).pop() {
                Some(url) => vec![url],
                None => return ActionResponse::fail("Invalid changelog URL"),
            },
            None => settings.active_urls().to_vec(),
        };
        if urls.is_empty() {
            return ActionResponse::fail("No URLs configured");
        }
        if settings.api_key.trim().is_empty() {
            return ActionResponse::fail("Please configure Gemini API key first");
        }

        let report = self.pipeline.run_all(&urls, &settings.api_key).await;
        info!(count = report.processed_count, "preview run complete");

        // The single-URL form also surfaces its result at the top level.
        let (ai_summary, content) = match report.results.as_slice() {
            [only] if only.success => (only.ai_summary.clone(), only.content.clone()),
            _ => (None, None),
        };

        ActionResponse::ok(ActionData {
            message: format!("Processed {} changelogs", report.results.len()),
            ai_summary,
            content,
            results: Some(report.results),
            ..Default::default()
        })
    }

    pub async fn send_test_digest(&self) -> ActionResponse {
        let settings = match self.settings().await {
            Ok(settings) => settings,
            Err(e) => return e.into(),
        };
        let recipient = match self.require_digest_settings(&settings) {
            Ok(recipient) => recipient,
            Err(e) => return e.into(),
        };

        let report = self.run_digest(&settings).await;
        let error_urls: Vec<String> = report.failures().map(|r| r.url.clone()).collect();
        let summaries = report.successes().count();

        let Some(body) = digest::render(&digest::TEST, &report) else {
            return ActionResponse::fail_with(ActionData {
                message: "No AI summaries could be generated".into(),
                error_urls: Some(error_urls),
                ..Default::default()
            });
        };

        if self.deliver(&digest::TEST, &recipient, body).await {
            ActionResponse::ok(ActionData {
                message: format!("AI summaries sent successfully to {}", recipient),
                summaries_count: Some(summaries),
                errors_count: Some(error_urls.len()),
                ..Default::default()
            })
        } else {
            Error::Mail("Failed to send email".into()).into()
        }
    }

    /// Plain transport check, no pipeline involved.
    pub async fn send_mail_check(&self) -> ActionResponse {
        let settings = match self.settings().await {
            Ok(settings) => settings,
            Err(e) => return e.into(),
        };
        let recipient = settings.recipient(&self.admin_email).to_string();
        if recipient.is_empty() {
            return ActionResponse::fail("Please configure notification email first");
        }

        let mail = OutgoingMail {
            to: recipient.clone(),
            subject: "Test Email from Changelog Checker".into(),
            html_body: "This is a test email to verify mail delivery is working.".into(),
        };
        if self.mailer.send(&mail).await {
            ActionResponse::ok(ActionData {
                message: format!("Basic test email sent successfully to {}", recipient),
                ..Default::default()
            })
        } else {
            ActionResponse::fail(
                "Failed to send test email. Please check the SMTP configuration.",
            )
        }
    }

    /// The scheduled digest. Failures are logged; whatever succeeded is mailed.
    pub async fn send_weekly_digest(&self) -> WeeklyOutcome {
        let settings = match self.settings().await {
            Ok(settings) => settings,
            Err(e) => {
                error!(error = %e, "failed to load settings for weekly digest");
                return WeeklyOutcome::Skipped(e.to_string());
            }
        };
        let recipient = match self.require_digest_settings(&settings) {
            Ok(recipient) => recipient,
            Err(e) => {
                warn!(error = %e, "missing required settings for changelog email");
                return WeeklyOutcome::Skipped(e.to_string());
            }
        };

        let report = self.run_digest(&settings).await;
        for failed in report.failures() {
            warn!(url = %failed.url, error = ?failed.error, "failed to generate AI summary");
        }
        let failed = report.failures().count();
        let summaries = report.successes().count();

        let Some(body) = digest::render(&digest::WEEKLY, &report) else {
            info!("no changelog summaries to send");
            return WeeklyOutcome::NothingToSend { failed };
        };

        if self.deliver(&digest::WEEKLY, &recipient, body).await {
            info!(summaries, failed, "weekly changelog email sent");
            WeeklyOutcome::Sent { summaries, failed }
        } else {
            error!(to = %recipient, "failed to send changelog email");
            WeeklyOutcome::MailRejected
        }
    }

    async fn deliver(&self, kind: &DigestKind, to: &str, html_body: String) -> bool {
        let mail = OutgoingMail {
            to: to.to_string(),
            subject: kind.subject.to_string(),
            html_body,
        };
        self.mailer.send(&mail).await
    }

    fn view(&self, settings: &Settings) -> SettingsView {
        SettingsView {
            urls: settings.urls.clone(),
            api_key_set: !settings.api_key.is_empty(),
            notification_email: settings.notification_email.clone(),
            effective_recipient: settings.recipient(&self.admin_email).to_string(),
            max_urls: MAX_SOURCE_URLS,
        }
    }

    pub async fn settings_view(&self) -> ActionResponse {
        match self.settings().await {
            Ok(settings) => ActionResponse::ok(ActionData {
                message: "Current settings".into(),
                settings: Some(self.view(&settings)),
                ..Default::default()
            }),
            Err(e) => e.into(),
        }
    }

    /// Apply and persist an update. A new API key must be accepted by the AI
    /// endpoint before it is stored; a rejected key leaves the old one in place
    /// while the other fields are still saved.
    pub async fn update_settings(&self, update: SettingsUpdate) -> ActionResponse {
        let mut settings = match self.settings().await {
            Ok(settings) => settings,
            Err(e) => return e.into(),
        };

        if let Some(urls) = update.urls {
            settings.urls = sanitize_urls(urls);
        }
        if let Some(email) = update.notification_email {
            settings.notification_email = email.trim().to_string();
        }
        let mut key_error = None;
        if let Some(key) = update.api_key.map(|k| k.trim().to_string()) {
            let rejected = if !key.is_empty() && key != settings.api_key {
                self.pipeline.summarizer().verify_key(&key).await.err()
            } else {
                None
            };
            match rejected {
                Some(e) => key_error = Some(e),
                None => settings.api_key = key,
            }
        }

        if let Err(e) = settings.save(self.store.as_ref()).await {
            return e.into();
        }
        info!(urls = settings.urls.len(), "settings updated");

        match key_error {
            Some(e) => {
                warn!(error = %e, "new Gemini API key rejected");
                ActionResponse::fail_with(ActionData {
                    message: format!(
                        "Invalid Gemini API key: {}. Other settings were saved.",
                        e
                    ),
                    settings: Some(self.view(&settings)),
                    ..Default::default()
                })
            }
            None => ActionResponse::ok(ActionData {
                message: "Settings saved".into(),
                settings: Some(self.view(&settings)),
                ..Default::default()
            }),
        }
    }

    /// Drop cached summaries past the retention window.
    pub async fn prune_cache(&self) -> Result<usize> {
        self.pipeline.cache().prune(RETENTION_WINDOW).await
    }

    /// Teardown: forget every cached summary.
    pub async fn clear_cache(&self) -> Result<()> {
        self.pipeline.cache().clear().await
    }
}
