//! End-to-end worker scenarios over the in-memory stores and mail recorder.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use inkpost_core::config::DigestConfig;
use inkpost_core::error::ErrorKind;
use inkpost_core::types::email::EmailBody;
use inkpost_core::types::id::{CategoryId, ItemId, UserId};
use inkpost_entity::category::{Category, DigestEntry, Item};
use inkpost_entity::job::{JobPayload, JobStatus};
use inkpost_entity::reminder::NewReminder;
use inkpost_mail::MemoryMailer;
use inkpost_worker::memory::{MemoryCategorySource, MemoryJobStore, MemoryReminderStore};
use inkpost_worker::scheduler::enqueue_digest;
use inkpost_worker::{
    JobCreateParams, JobExecutor, JobOutcome, JobQueue, ReminderDispatcher, ReminderService,
    RetryPolicy, WorkerRunner, build_executor,
};
use inkpost_worker::jobs::DigestJobHandler;

const SENDER: &str = "from@example.com";

/// Saturday of ISO week 24 of 2024 (Mon 10 June .. Sun 16 June).
fn saturday() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap()
}

struct Harness {
    jobs: MemoryJobStore,
    reminders: MemoryReminderStore,
    categories: MemoryCategorySource,
    mailer: MemoryMailer,
    queue: Arc<JobQueue>,
    runner: WorkerRunner,
    service: ReminderService,
}

impl Harness {
    fn new() -> Self {
        let digest = DigestConfig {
            recipients: vec!["editor@blog.test".into(), "team@blog.test".into()],
            ..DigestConfig::default()
        };
        Self::with_digest(digest)
    }

    fn with_digest(digest: DigestConfig) -> Self {
        let jobs = MemoryJobStore::new();
        let reminders = MemoryReminderStore::new();
        let categories = MemoryCategorySource::new();
        let mailer = MemoryMailer::new();

        let queue = Arc::new(JobQueue::new(
            Arc::new(jobs.clone()),
            "test-worker".into(),
            vec!["mail".into(), "default".into()],
        ));

        let mut executor: JobExecutor = build_executor(
            Arc::new(reminders.clone()),
            Arc::new(categories.clone()),
            Arc::new(mailer.clone()),
            SENDER,
            &digest,
        )
        .unwrap();
        // Pin the digest to a known week.
        executor.register(Arc::new(
            DigestJobHandler::new(
                Arc::new(categories.clone()),
                Arc::new(mailer.clone()),
                SENDER,
                &digest,
            )
            .unwrap()
            .with_clock(saturday),
        ));

        let runner = WorkerRunner::new(
            Arc::clone(&queue),
            Arc::new(executor),
            Default::default(),
            "test-worker".into(),
        );
        let service = ReminderService::new(
            Arc::new(reminders.clone()),
            ReminderDispatcher::new(Arc::clone(&queue), RetryPolicy::MAIL),
        );

        Self {
            jobs,
            reminders,
            categories,
            mailer,
            queue,
            runner,
            service,
        }
    }

    async fn publish(&self, title: &str, at: DateTime<Utc>) {
        self.categories
            .push(DigestEntry {
                category: Category {
                    id: CategoryId::new(),
                    title: title.into(),
                    text: format!("{title} body"),
                    publish_date: at,
                    user_id: UserId::new(),
                },
                author: "alice".into(),
                tags: vec![Item {
                    id: ItemId::new(),
                    title: "news".into(),
                }],
            })
            .await;
    }

    fn reminder(&self, date: DateTime<Utc>) -> NewReminder {
        NewReminder {
            text: "Water the plants".into(),
            email: "reader@blog.test".into(),
            date,
        }
    }
}

#[tokio::test]
async fn digest_with_no_posts_in_window_sends_nothing() {
    let h = Harness::new();
    // Just outside the week on both sides.
    h.publish("Previous Sunday", Utc.with_ymd_and_hms(2024, 6, 9, 23, 59, 59).unwrap())
        .await;
    h.publish("Next Monday", Utc.with_ymd_and_hms(2024, 6, 17, 0, 0, 0).unwrap())
        .await;
    enqueue_digest(&h.queue, RetryPolicy::MAIL).await.unwrap();

    let outcome = h.runner.run_once().await.unwrap().unwrap();

    assert!(matches!(outcome, JobOutcome::Completed { .. }));
    assert_eq!(h.mailer.attempts(), 0);
    assert!(h.mailer.sent().await.is_empty());
}

#[tokio::test]
async fn digest_covers_every_day_of_the_week() {
    let h = Harness::new();
    h.publish("Monday post", Utc.with_ymd_and_hms(2024, 6, 10, 0, 0, 0).unwrap())
        .await;
    h.publish("Sunday evening post", Utc.with_ymd_and_hms(2024, 6, 16, 21, 30, 0).unwrap())
        .await;
    enqueue_digest(&h.queue, RetryPolicy::MAIL).await.unwrap();

    h.runner.run_once().await.unwrap().unwrap();

    let sent = h.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    let message = &sent[0];
    assert_eq!(message.subject, "Weekly Digest");
    assert_eq!(message.from, SENDER);
    assert_eq!(message.to, vec!["editor@blog.test", "team@blog.test"]);
    let EmailBody::Html(body) = &message.body else {
        panic!("digest must be HTML");
    };
    assert!(body.contains("Monday post"));
    assert!(body.contains("Sunday evening post"));
}

#[tokio::test]
async fn digest_without_recipients_skips_send() {
    let h = Harness::with_digest(DigestConfig::default());
    h.publish("Post", Utc.with_ymd_and_hms(2024, 6, 12, 8, 0, 0).unwrap())
        .await;
    enqueue_digest(&h.queue, RetryPolicy::MAIL).await.unwrap();

    let outcome = h.runner.run_once().await.unwrap().unwrap();

    assert!(matches!(outcome, JobOutcome::Completed { .. }));
    assert_eq!(h.mailer.attempts(), 0);
}

#[tokio::test]
async fn digest_transport_failure_is_retried() {
    let h = Harness::new();
    h.publish("Post", Utc.with_ymd_and_hms(2024, 6, 12, 8, 0, 0).unwrap())
        .await;
    enqueue_digest(&h.queue, RetryPolicy::MAIL).await.unwrap();
    h.mailer.fail_next(1);
    let t0 = Utc::now();

    let first = h.runner.run_once_at(t0).await.unwrap().unwrap();
    assert!(matches!(first, JobOutcome::Rescheduled { at, .. } if at == t0 + Duration::seconds(300)));

    let second = h
        .runner
        .run_once_at(t0 + Duration::seconds(300))
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(second, JobOutcome::Completed { .. }));
    assert_eq!(h.mailer.sent().await.len(), 1);
}

#[tokio::test]
async fn reminder_send_fails_once_then_succeeds() {
    let h = Harness::new();
    let t0 = Utc::now();
    let (reminder, job) = h.service.create(h.reminder(t0)).await.unwrap();
    h.mailer.fail_next(1);

    let first = h.runner.run_once_at(t0).await.unwrap().unwrap();
    let retry_at = t0 + Duration::seconds(300);
    assert_eq!(
        first,
        JobOutcome::Rescheduled {
            job_id: job.id,
            at: retry_at,
            error: "Transient job failure: EXTERNAL_SERVICE: Memory transport refused message"
                .into(),
        }
    );

    let second = h.runner.run_once_at(retry_at).await.unwrap().unwrap();
    assert!(matches!(second, JobOutcome::Completed { job_id, .. } if job_id == job.id));

    let sent = h.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Your reminder");
    assert_eq!(sent[0].to, vec![reminder.email.clone()]);
    assert_eq!(sent[0].body, EmailBody::Plain(reminder.text.clone()));
    assert_eq!(h.mailer.attempts(), 2);

    let stored = &h.jobs.jobs().await[0];
    assert_eq!(stored.status, JobStatus::Completed);
    assert_eq!(stored.attempts, 2);
}

#[tokio::test]
async fn reminder_gives_up_after_five_retries() {
    let h = Harness::new();
    let mut now = Utc::now();
    h.service.create(h.reminder(now)).await.unwrap();
    h.mailer.fail_next(u32::MAX);

    for _ in 0..5 {
        let outcome = h.runner.run_once_at(now).await.unwrap().unwrap();
        assert!(matches!(outcome, JobOutcome::Rescheduled { .. }));
        now += Duration::seconds(300);
    }
    let last = h.runner.run_once_at(now).await.unwrap().unwrap();
    assert!(matches!(last, JobOutcome::Failed { .. }));

    assert_eq!(h.mailer.attempts(), 6);
    let stored = &h.jobs.jobs().await[0];
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.attempts, 6);
    assert!(h.runner.run_once_at(now + Duration::days(1)).await.unwrap().is_none());
}

#[tokio::test]
async fn missing_reminder_fails_without_retry() {
    let h = Harness::new();
    let date = Utc::now();
    let (reminder, job) = h.service.create(h.reminder(date)).await.unwrap();
    h.reminders.remove(reminder.id);

    let outcome = h.runner.run_once_at(date).await.unwrap().unwrap();

    assert!(matches!(outcome, JobOutcome::Failed { job_id, ref error } if job_id == job.id && error.starts_with("Not found")));
    let stored = &h.jobs.jobs().await[0];
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.attempts, 1);
    assert_eq!(stored.scheduled_at, Some(date));
    assert_eq!(h.mailer.attempts(), 0);
}

#[tokio::test]
async fn reminder_claimed_by_crashed_worker_is_redelivered() {
    let h = Harness::new();
    let now = Utc::now();
    let (_, job) = h.service.create(h.reminder(now)).await.unwrap();

    // Another worker claims the job and dies before recording anything.
    let crashed = JobQueue::new(
        Arc::new(h.jobs.clone()),
        "crashed-worker".into(),
        vec!["mail".into()],
    );
    assert_eq!(crashed.dequeue_at(now).await.unwrap().unwrap().id, job.id);

    // Still within the lease.
    assert!(h.runner.run_once_at(now + Duration::minutes(5)).await.unwrap().is_none());

    let outcome = h
        .runner
        .run_once_at(now + Duration::minutes(30))
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(outcome, JobOutcome::Completed { job_id, .. } if job_id == job.id));

    assert_eq!(h.mailer.sent().await.len(), 1);
    let stored = &h.jobs.jobs().await[0];
    assert_eq!(stored.status, JobStatus::Completed);
    assert_eq!(stored.attempts, 2);
    assert_eq!(stored.worker_id.as_deref(), Some("test-worker"));
}

#[tokio::test]
async fn dispatch_schedules_one_job_at_reminder_date() {
    let h = Harness::new();
    let date = Utc::now() + Duration::days(2);
    let (reminder, _) = h.service.create(h.reminder(date)).await.unwrap();

    let jobs = h.jobs.jobs().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].job_type, "remind");
    assert_eq!(jobs[0].queue, "mail");
    assert_eq!(jobs[0].scheduled_at, Some(date));
    assert_eq!(jobs[0].max_attempts, 6);
    assert_eq!(jobs[0].retry_delay_seconds, 300);
    assert_eq!(
        serde_json::from_value::<JobPayload>(jobs[0].payload.clone()).unwrap(),
        JobPayload::Remind {
            reminder_id: reminder.id
        }
    );

    assert!(h.runner.run_once_at(date - Duration::seconds(1)).await.unwrap().is_none());
    assert_eq!(h.mailer.attempts(), 0);

    let outcome = h.runner.run_once_at(date).await.unwrap().unwrap();
    assert!(matches!(outcome, JobOutcome::Completed { .. }));
    assert_eq!(h.mailer.sent().await.len(), 1);
}

#[tokio::test]
async fn dispatch_propagates_queue_outage() {
    let h = Harness::new();
    h.jobs.set_unavailable(true);

    let err = h.service.create(h.reminder(Utc::now())).await.unwrap_err();

    assert_eq!(err.kind, ErrorKind::ServiceUnavailable);
}

#[tokio::test]
async fn utility_jobs_return_their_results() {
    let h = Harness::new();
    for payload in [
        JobPayload::Multiply { x: 6, y: 7 },
        JobPayload::Log {
            msg: "hello".into(),
        },
    ] {
        h.queue
            .enqueue(JobCreateParams::from_payload(&payload, RetryPolicy::none()).unwrap())
            .await
            .unwrap();
    }

    let first = h.runner.run_once().await.unwrap().unwrap();
    let second = h.runner.run_once().await.unwrap().unwrap();

    let results: Vec<_> = [first, second]
        .into_iter()
        .map(|o| match o {
            JobOutcome::Completed { result, .. } => result,
            other => panic!("unexpected outcome {other:?}"),
        })
        .collect();
    assert!(results.contains(&Some(serde_json::json!(42))));
    assert!(results.contains(&Some(serde_json::json!("hello"))));
}
