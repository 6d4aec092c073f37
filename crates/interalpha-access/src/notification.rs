//! Client notifications: templates and the dispatch seam.
//!
//! The raw token reaches the client exactly once, through
//! [`NotificationDispatcher`]. Delivery is best effort: failures are logged
//! by the caller and never undo an issuance.

use std::fmt;
use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::config::NotificationConfig;
use crate::model::Client;

/// Transport failure reported by a dispatcher.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("notification failed: {0}")]
pub struct NotificationError(pub String);

/// Which message to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    /// Delivers a freshly issued key.
    AccessKey,
    /// Warns that a key expires in `{{hours}}` hours.
    ExpirationWarning,
}

/// Text of one template, with `{{var}}` placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateContent {
    pub subject: &'static str,
    pub text: &'static str,
    pub sms: &'static str,
}

impl Template {
    pub fn content(self) -> TemplateContent {
        match self {
            Self::AccessKey => TemplateContent {
                subject: "Sua chave de acesso ao portal {{companyName}}",
                text: "{{companyName}} - Portal do Cliente\n\n\
                       Olá, {{clientName}}!\n\n\
                       Sua chave de acesso: {{accessKey}}\n\n\
                       Válida até: {{expiresAt}}\n\n\
                       Acesse o portal em: {{portalUrl}}\n",
                sms: "{{companyName}}: Sua chave de acesso é {{accessKey}}. \
                      Válida até {{expiresAt}}. Acesse: {{portalUrl}}",
            },
            Self::ExpirationWarning => TemplateContent {
                subject: "Sua chave de acesso expira em {{hours}} horas",
                text: "{{companyName}} - Aviso de Expiração\n\n\
                       Olá, {{clientName}}!\n\n\
                       Sua chave de acesso expira em {{hours}} horas.\n\n\
                       Solicite uma nova chave em: {{portalUrl}}\n",
                sms: "{{companyName}}: Sua chave expira em {{hours}}h. \
                      Solicite nova chave em {{portalUrl}}",
            },
        }
    }
}

/// Values substituted into a template.
pub struct TemplateVars {
    pub client_name: String,
    access_key: Option<Zeroizing<String>>,
    pub expires_at: String,
    pub portal_url: String,
    pub company_name: String,
    pub hours: Option<u32>,
}

impl TemplateVars {
    /// Variables for delivering `token` to `client`.
    pub fn access_key(
        client: &Client,
        token: &str,
        expires_at: DateTime<Utc>,
        config: &NotificationConfig,
    ) -> Self {
        let portal = format!(
            "{}/portal/client?key={token}",
            config.portal_url.trim_end_matches('/')
        );
        Self {
            client_name: client.name.clone(),
            access_key: Some(Zeroizing::new(token.to_string())),
            expires_at: format_expiry(expires_at),
            portal_url: portal,
            company_name: config.company_name.clone(),
            hours: None,
        }
    }

    /// Variables for an expiry warning. Carries no key.
    pub fn expiration_warning(
        client: &Client,
        expires_at: DateTime<Utc>,
        hours: u32,
        config: &NotificationConfig,
    ) -> Self {
        Self {
            client_name: client.name.clone(),
            access_key: None,
            expires_at: format_expiry(expires_at),
            portal_url: format!(
                "{}/request-access",
                config.portal_url.trim_end_matches('/')
            ),
            company_name: config.company_name.clone(),
            hours: Some(hours),
        }
    }

    fn lookup(&self, name: &str) -> Option<String> {
        match name {
            "clientName" => Some(self.client_name.clone()),
            "accessKey" => self.access_key.as_ref().map(|k| k.as_str().to_string()),
            "expiresAt" => Some(self.expires_at.clone()),
            "portalUrl" => Some(self.portal_url.clone()),
            "companyName" => Some(self.company_name.clone()),
            "hours" => self.hours.map(|h| h.to_string()),
            _ => None,
        }
    }
}

impl fmt::Debug for TemplateVars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateVars")
            .field("client_name", &self.client_name)
            .field("access_key", &self.access_key.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("company_name", &self.company_name)
            .field("hours", &self.hours)
            .finish_non_exhaustive()
    }
}

fn format_expiry(at: DateTime<Utc>) -> String {
    at.format("%d/%m/%Y %H:%M UTC").to_string()
}

/// Replaces every `{{name}}` with its value. Unknown names are left as-is.
pub fn render(template: &str, vars: &TemplateVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let name = &after[..end];
                match vars.lookup(name.trim()) {
                    Some(value) => out.push_str(&value),
                    None => {
                        out.push_str("{{");
                        out.push_str(name);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Email and SMS transport.
pub trait NotificationDispatcher: Send + Sync + 'static {
    fn send_email(
        &self,
        to: &str,
        template: Template,
        vars: &TemplateVars,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;

    fn send_sms(
        &self,
        to: &str,
        template: Template,
        vars: &TemplateVars,
    ) -> impl Future<Output = Result<(), NotificationError>> + Send;
}

/// What a delivery attempt achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    pub email_sent: bool,
    pub sms_sent: bool,
    pub failures: Vec<String>,
}

impl Delivery {
    pub fn any_sent(&self) -> bool {
        self.email_sent || self.sms_sent
    }
}

/// Sends `template` to every channel the client accepts.
///
/// Email goes out when the client has an address. SMS goes out when the
/// client has a phone, opted in, and `sms_enabled` is set.
pub async fn deliver<N: NotificationDispatcher>(
    dispatcher: &N,
    client: &Client,
    template: Template,
    vars: &TemplateVars,
    sms_enabled: bool,
) -> Delivery {
    let mut delivery = Delivery::default();

    if let Some(email) = client.email.as_deref().filter(|e| !e.trim().is_empty()) {
        match dispatcher.send_email(email, template, vars).await {
            Ok(()) => delivery.email_sent = true,
            Err(e) => {
                warn!(client_id = %client.id, channel = "email", error = %e, "Notification failed");
                delivery.failures.push(format!("email: {e}"));
            }
        }
    }

    let wants_sms = sms_enabled && client.preferences.sms_notifications;
    if let Some(phone) = client.phone.as_deref().filter(|p| wants_sms && !p.trim().is_empty()) {
        match dispatcher.send_sms(phone, template, vars).await {
            Ok(()) => delivery.sms_sent = true,
            Err(e) => {
                warn!(client_id = %client.id, channel = "sms", error = %e, "Notification failed");
                delivery.failures.push(format!("sms: {e}"));
            }
        }
    }

    debug!(
        client_id = %client.id,
        template = ?template,
        email = delivery.email_sent,
        sms = delivery.sms_sent,
        "Notification delivery finished"
    );
    delivery
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> NotificationConfig {
        NotificationConfig {
            portal_url: "https://portal.example/".to_string(),
            company_name: "InterAlpha".to_string(),
            sms_enabled: true,
        }
    }

    fn client() -> Client {
        Client::new("c-1", "Maria")
    }

    #[test]
    fn renders_access_key_subject_and_url() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 14, 30, 0).unwrap();
        let vars = TemplateVars::access_key(&client(), "abc123", at, &config());

        let content = Template::AccessKey.content();
        assert_eq!(
            render(content.subject, &vars),
            "Sua chave de acesso ao portal InterAlpha"
        );

        let sms = render(content.sms, &vars);
        assert!(sms.contains("abc123"));
        assert!(sms.contains("https://portal.example/portal/client?key=abc123"));
        assert!(sms.contains("01/03/2026 14:30 UTC"));
    }

    #[test]
    fn warning_has_hours_and_no_key() {
        let vars = TemplateVars::expiration_warning(&client(), Utc::now(), 4, &config());
        let content = Template::ExpirationWarning.content();
        assert_eq!(
            render(content.subject, &vars),
            "Sua chave de acesso expira em 4 horas"
        );
        assert!(render(content.text, &vars).contains("Olá, Maria!"));
        assert_eq!(render("{{accessKey}}", &vars), "{{accessKey}}");
    }

    #[test]
    fn render_leaves_unknown_and_unterminated_placeholders() {
        let vars = TemplateVars::expiration_warning(&client(), Utc::now(), 1, &config());
        assert_eq!(render("a {{nope}} b", &vars), "a {{nope}} b");
        assert_eq!(render("x {{clientName", &vars), "x {{clientName");
        assert_eq!(render("{{ clientName }}", &vars), "Maria");
        assert_eq!(render("no vars", &vars), "no vars");
    }

    #[test]
    fn debug_redacts_key() {
        let vars = TemplateVars::access_key(&client(), "secret-token", Utc::now(), &config());
        assert!(!format!("{vars:?}").contains("secret-token"));
    }
}
