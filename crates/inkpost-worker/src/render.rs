//! HTML body of the weekly digest.

use std::fmt::Write;

use chrono_tz::Tz;

use inkpost_entity::category::DigestEntry;

use crate::week::WeekWindow;

/// Renders the digest email body.
#[derive(Debug, Clone)]
pub struct DigestRenderer {
    /// Heading shown above the post list.
    pub title: String,
    /// Zone the publish dates are shown in; the same one the window uses.
    pub timezone: Tz,
}

impl DigestRenderer {
    /// Renderer with the given heading and display timezone.
    pub fn new(title: impl Into<String>, timezone: Tz) -> Self {
        Self {
            title: title.into(),
            timezone,
        }
    }

    /// Render the posts of `window` as a standalone HTML document.
    ///
    /// Every interpolated value is escaped.
    pub fn render(&self, window: &WeekWindow, entries: &[DigestEntry]) -> String {
        let mut html = String::new();
        let title = escape_html(&self.title);

        // Writing into a String cannot fail.
        let _ = writeln!(html, "<!DOCTYPE html>");
        let _ = writeln!(html, "<html>\n<head><meta charset=\"utf-8\"><title>{title}</title></head>");
        let _ = writeln!(html, "<body>");
        let _ = writeln!(html, "<h1>{title}</h1>");
        let _ = writeln!(
            html,
            "<p>Posts published from {} to {} (week {} of {}).</p>",
            window.start, window.end, window.week, window.year
        );

        for entry in entries {
            let post = &entry.category;
            let _ = writeln!(html, "<div class=\"post\">");
            let _ = writeln!(html, "<h2>{}</h2>", escape_html(&post.title));
            let _ = writeln!(
                html,
                "<p class=\"meta\">by {} on {}</p>",
                escape_html(&entry.author),
                post.publish_date
                    .with_timezone(&self.timezone)
                    .format("%Y-%m-%d")
            );
            if !entry.tags.is_empty() {
                let tags: Vec<String> = entry.tags.iter().map(|t| escape_html(&t.title)).collect();
                let _ = writeln!(html, "<p class=\"tags\">{}</p>", tags.join(", "));
            }
            let _ = writeln!(html, "<div class=\"text\">{}</div>", escape_html(&post.text));
            let _ = writeln!(html, "</div>");
        }

        let _ = writeln!(html, "</body>\n</html>");
        html
    }
}

/// Escape the HTML special characters of `s`.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use inkpost_core::types::id::{CategoryId, ItemId, UserId};
    use inkpost_entity::category::{Category, Item};

    use crate::week::window_for;

    fn entry(title: &str) -> DigestEntry {
        entry_at(title, Utc.with_ymd_and_hms(2024, 6, 12, 9, 0, 0).unwrap())
    }

    fn entry_at(title: &str, publish_date: DateTime<Utc>) -> DigestEntry {
        DigestEntry {
            category: Category {
                id: CategoryId::new(),
                title: title.to_string(),
                text: "Body".to_string(),
                publish_date,
                user_id: UserId::new(),
            },
            author: "alice".to_string(),
            tags: vec![
                Item {
                    id: ItemId::new(),
                    title: "rust".to_string(),
                },
                Item {
                    id: ItemId::new(),
                    title: "async".to_string(),
                },
            ],
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_render_lists_every_post() {
        let window = window_for(2024, 24).unwrap();
        let html = DigestRenderer::new("Weekly Digest", Tz::UTC)
            .render(&window, &[entry("First"), entry("Second")]);

        assert!(html.contains("<h1>Weekly Digest</h1>"));
        assert!(html.contains("from 2024-06-10 to 2024-06-16"));
        assert!(html.contains("<h2>First</h2>"));
        assert!(html.contains("<h2>Second</h2>"));
        assert!(html.contains("by alice on 2024-06-12"));
        assert!(html.contains("rust, async"));
    }

    #[test]
    fn test_render_escapes_titles() {
        let window = window_for(2024, 24).unwrap();
        let html = DigestRenderer::new("Digest", Tz::UTC).render(&window, &[entry("<script>")]);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_render_dates_in_digest_timezone() {
        let window = window_for(2024, 24).unwrap();
        // Monday 00:30 in Paris is still Sunday in UTC.
        let monday_paris = Utc.with_ymd_and_hms(2024, 6, 9, 22, 30, 0).unwrap();
        let html = DigestRenderer::new("Digest", chrono_tz::Europe::Paris)
            .render(&window, &[entry_at("Early", monday_paris)]);
        assert!(html.contains("by alice on 2024-06-10"));
        assert!(!html.contains("2024-06-09"));
    }
}
