//! Onboarding nudges sent a fixed number of days after signup.

use crate::delivery::OutgoingEmail;

/// Which nudge to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleNudge {
    /// Two days in, nobody has watched anything yet.
    Day2,
    /// A week in, still on the free plan.
    Day7,
}

/// Who the nudge is addressed to.
#[derive(Debug, Clone)]
pub struct NudgeRecipient<'a> {
    pub email: &'a str,
    pub name: Option<&'a str>,
}

impl LifecycleNudge {
    /// Short label for logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Day2 => "day2",
            Self::Day7 => "day7",
        }
    }

    /// Render the email for `recipient`. Links point at `base_url`.
    pub fn render(self, recipient: &NudgeRecipient<'_>, base_url: &str) -> OutgoingEmail {
        let greeting = match recipient.name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => format!("Hi {name},"),
            None => "Hi there,".to_string(),
        };
        let base_url = base_url.trim_end_matches('/');

        let (subject, body) = match self {
            Self::Day2 => (
                "Share your first recording",
                format!(
                    "{greeting}\n\n\
                     Your recordings are ready to share, but nobody has watched one yet.\n\
                     Copy a share link from your library and send it to a teammate:\n\n\
                     {base_url}/library\n"
                ),
            ),
            Self::Day7 => (
                "Get more out of your recordings",
                format!(
                    "{greeting}\n\n\
                     You have been recording for a week. Upgrading unlocks longer\n\
                     recordings, transcripts for every video, and AI summaries.\n\n\
                     {base_url}/pricing\n"
                ),
            ),
        };

        OutgoingEmail {
            to: recipient.email.to_string(),
            subject: subject.to_string(),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day2_links_to_library() {
        let email = LifecycleNudge::Day2.render(
            &NudgeRecipient {
                email: "a@example.com",
                name: Some("Ada"),
            },
            "https://app.example.com/",
        );
        assert_eq!(email.to, "a@example.com");
        assert!(email.body.starts_with("Hi Ada,"));
        assert!(email.body.contains("https://app.example.com/library"));
    }

    #[test]
    fn blank_name_falls_back_to_generic_greeting() {
        let email = LifecycleNudge::Day7.render(
            &NudgeRecipient {
                email: "b@example.com",
                name: Some("  "),
            },
            "http://localhost:3000",
        );
        assert!(email.body.starts_with("Hi there,"));
        assert!(email.body.contains("http://localhost:3000/pricing"));
    }
}
