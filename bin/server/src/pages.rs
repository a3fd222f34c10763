//! Login page rendering.
//!
//! The page is a plain HTML template with literal `{{authorize_url}}` and
//! `{{static_url}}` placeholders. Substituted values are escaped for use
//! inside attribute values.

use std::path::Path;

const BUILTIN_LOGIN_TEMPLATE: &str = include_str!("../templates/login.html");

const AUTHORIZE_URL_PLACEHOLDER: &str = "{{authorize_url}}";
const STATIC_URL_PLACEHOLDER: &str = "{{static_url}}";

/// Login page template, loaded once at startup.
#[derive(Debug, Clone)]
pub struct LoginPage {
    template: String,
}

impl LoginPage {
    /// Uses the page shipped with the server.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            template: BUILTIN_LOGIN_TEMPLATE.to_string(),
        }
    }

    /// Reads an operator-supplied template.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        Ok(Self {
            template: std::fs::read_to_string(path)?,
        })
    }

    #[must_use]
    pub fn from_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Renders the page for one login attempt.
    #[must_use]
    pub fn render(&self, authorize_url: &str, static_url: &str) -> String {
        self.template
            .replace(AUTHORIZE_URL_PLACEHOLDER, &escape_attribute(authorize_url))
            .replace(
                STATIC_URL_PLACEHOLDER,
                &escape_attribute(static_url.trim_end_matches('/')),
            )
    }
}

impl Default for LoginPage {
    fn default() -> Self {
        Self::builtin()
    }
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn builtin_page_links_to_authorize_url() {
        let page = LoginPage::builtin().render(
            "https://provider.example/auth?state=https%3A%2F%2Fx%2Fy",
            "https://static.example/",
        );

        assert!(page.contains("href=\"https://provider.example/auth?state=https%3A%2F%2Fx%2Fy\""));
        assert!(page.contains("https://static.example/login.css"));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn substituted_values_are_escaped() {
        let page = LoginPage::from_template("<a href=\"{{authorize_url}}\">")
            .render("https://p.example/?a=1&b=\"2\"", "");

        assert_eq!(
            page,
            "<a href=\"https://p.example/?a=1&amp;b=&quot;2&quot;\">"
        );
    }

    #[test]
    fn every_placeholder_is_replaced() {
        let page = LoginPage::from_template("{{authorize_url}} {{authorize_url}}")
            .render("u", "s");
        assert_eq!(page, "u u");
    }

    #[test]
    fn reads_template_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "<p>{{{{static_url}}}}</p>").expect("write template");

        let page = LoginPage::from_file(file.path()).expect("read template");

        assert_eq!(page.render("u", "https://s.example"), "<p>https://s.example</p>");
    }
}
