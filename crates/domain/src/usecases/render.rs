//! Rendering use case - turns a selected digest into a self-contained HTML email

use crate::model::{NewsItem, RenderedDigest, Subscriber};
use html_escape::{encode_double_quoted_attribute, encode_text};
use time::{
    OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem,
    macros::format_description,
};

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute] UTC");

/// Configuration for the digest renderer
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Email subject line
    pub subject: String,
    /// Masthead shown at the top of every digest
    pub brand: String,
    /// Base URL of the self-service preferences page, if any
    pub preferences_url: Option<String>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            subject: "Your Daily Brief from Alfred".to_string(),
            brand: "The Alfred Brief".to_string(),
            preferences_url: None,
        }
    }
}

/// Renderer for personalized digests
pub struct DigestRenderer {
    config: RenderConfig,
}

impl DigestRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Render the digest for one subscriber
    pub fn render(&self, items: &[&NewsItem], subscriber: &Subscriber) -> RenderedDigest {
        let body = if items.is_empty() {
            r#"<p style="color: #718096;">No new intelligence items today. Check back tomorrow.</p>"#
                .to_string()
        } else {
            let list: String = items.iter().map(|item| self.render_item(item)).collect();
            format!(
                concat!(
                    r#"<p style="color: #4a5568; margin-bottom: 20px;">Your daily intelligence briefing is ready.</p>"#,
                    r#"<ul style="list-style: none; padding: 0; margin: 0;">{}</ul>"#
                ),
                list
            )
        };

        let footer = self.render_footer(subscriber);
        let brand = encode_text(&self.config.brand);

        let html = format!(
            concat!(
                "<!DOCTYPE html>\n<html>\n",
                r#"<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px; background-color: #ffffff;">"#,
                r#"<h1 style="color: #1a365d; border-bottom: 2px solid #e2e8f0; padding-bottom: 10px;">{brand}</h1>"#,
                "{body}",
                r#"<hr style="border: none; border-top: 1px solid #e2e8f0; margin: 30px 0;" />"#,
                "{footer}",
                "</body>\n</html>\n"
            ),
            brand = brand,
            body = body,
            footer = footer,
        );

        RenderedDigest {
            subject: self.config.subject.clone(),
            html,
        }
    }

    fn render_item(&self, item: &NewsItem) -> String {
        let summary = item
            .summary
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                format!(
                    r#"<p style="color: #4a5568; margin: 8px 0 0 0; font-size: 14px;">{}</p>"#,
                    encode_text(s)
                )
            })
            .unwrap_or_default();

        format!(
            concat!(
                r#"<li style="margin-bottom: 20px; padding: 15px; background-color: #f7fafc; border-radius: 8px;">"#,
                r#"<a href="{url}" style="color: #2b6cb0; text-decoration: none; font-weight: bold; font-size: 16px;">{title}</a>"#,
                "{summary}",
                r#"<p style="color: #718096; margin: 8px 0 0 0; font-size: 12px;">Category: {category} | {scraped_at}</p>"#,
                "</li>"
            ),
            url = encode_double_quoted_attribute(&item.url),
            title = encode_text(&item.title),
            summary = summary,
            category = item.category.label(),
            scraped_at = format_timestamp(item.scraped_at),
        )
    }

    fn render_footer(&self, subscriber: &Subscriber) -> String {
        let brand = encode_text(&self.config.brand);
        let manage = match (&self.config.preferences_url, &subscriber.management_token) {
            (Some(base), Some(token)) => {
                let separator = if base.contains('?') { '&' } else { '?' };
                let link = format!("{}{}token={}", base, separator, token);
                format!(
                    r#" | <a href="{}" style="color: #a0aec0;">Manage preferences</a>"#,
                    encode_double_quoted_attribute(&link)
                )
            }
            _ => String::new(),
        };

        format!(
            r#"<p style="color: #a0aec0; font-size: 12px; text-align: center;">{} - Your daily intelligence digest{}</p>"#,
            brand, manage
        )
    }
}

fn format_timestamp(ts: OffsetDateTime) -> String {
    let ts = ts.to_offset(UtcOffset::UTC);
    ts.format(TIMESTAMP_FORMAT).unwrap_or_else(|_| ts.date().to_string())
}
