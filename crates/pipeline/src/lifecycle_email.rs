//! Onboarding nudges, one worker per [`LifecycleNudge`].

use std::sync::Arc;

use screenreel_db::models::user::EmailCandidate;
use screenreel_events::{LifecycleNudge, Mailer, NudgeRecipient};

use crate::error::PipelineError;
use crate::schedule::{BatchJob, BatchReport};
use crate::store::UserStore;

/// Accounts emailed per tick.
pub const LIFECYCLE_EMAIL_BATCH_SIZE: i64 = 50;

pub struct LifecycleEmailWorker {
    nudge: LifecycleNudge,
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    base_url: String,
}

impl LifecycleEmailWorker {
    pub fn new(
        nudge: LifecycleNudge,
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            nudge,
            users,
            mailer,
            base_url: base_url.into(),
        }
    }

    async fn notify(&self, candidate: &EmailCandidate) -> Result<(), PipelineError> {
        let email = self.nudge.render(
            &NudgeRecipient {
                email: &candidate.email,
                name: candidate.name.as_deref(),
            },
            &self.base_url,
        );
        self.mailer.send(&email).await?;
        self.users.mark_nudge_sent(self.nudge, candidate.id).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl BatchJob for LifecycleEmailWorker {
    fn name(&self) -> &'static str {
        match self.nudge {
            LifecycleNudge::Day2 => "lifecycle_email_day2",
            LifecycleNudge::Day7 => "lifecycle_email_day7",
        }
    }

    async fn run_batch(&self) -> BatchReport {
        let candidates = match self
            .users
            .nudge_candidates(self.nudge, LIFECYCLE_EMAIL_BATCH_SIZE)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!(nudge = self.nudge.label(), error = %e, "Candidate query failed");
                return BatchReport::default();
            }
        };

        let mut report = BatchReport::default();
        for candidate in &candidates {
            report.selected += 1;
            match self.notify(candidate).await {
                Ok(()) => report.succeeded += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        user_id = candidate.id,
                        nudge = self.nudge.label(),
                        error = %e,
                        "Lifecycle email failed, will retry next tick"
                    );
                }
            }
        }
        report
    }
}
