//! Async quiz engine.
//!
//! One tokio task owns the [`SessionController`] and processes player
//! commands and countdown events strictly one at a time, so a submission and
//! an expiry for the same question can never both be recorded. Hosts talk to
//! the task through a cloneable [`QuizHandle`] and hear back through a
//! [`SessionReporter`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{ConfigError, QuizError};
use crate::model::QuizConfig;
use crate::report::SessionReporter;
use crate::session::{Phase, SessionController, Transition};
use crate::timer::{Countdown, TimerEvent, TokioCountdown};
use crate::traits::QuestionBankProvider;

/// Configuration for the quiz engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// How often the live countdown reports the time left. `None` disables
    /// ticks; the expiry still fires.
    pub tick_interval: Option<Duration>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tick_interval: Some(Duration::from_secs(1)),
        }
    }
}

/// Point-in-time view of the running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub phase: Phase,
    pub current_index: usize,
    pub answered: usize,
    pub question_count: usize,
    pub remaining: Option<Duration>,
}

type Reply = oneshot::Sender<Result<Transition, QuizError>>;

enum Command {
    Start(Reply),
    Submit {
        question: usize,
        option: usize,
        reply: Reply,
    },
    Abandon(Reply),
    Restart {
        refetch: bool,
        reply: Reply,
    },
    Snapshot(oneshot::Sender<SessionSnapshot>),
    Shutdown,
}

/// Cloneable handle to a running engine.
#[derive(Clone)]
pub struct QuizHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl QuizHandle {
    /// Begin the session (`Intro -> Playing`).
    pub async fn start(&self) -> Result<Transition, QuizError> {
        self.request(Command::Start).await
    }

    /// Submit `option` for the question at `question`.
    pub async fn submit(&self, question: usize, option: usize) -> Result<Transition, QuizError> {
        self.request(|reply| Command::Submit {
            question,
            option,
            reply,
        })
        .await
    }

    /// Abandon the running session without producing a result.
    pub async fn abandon(&self) -> Result<Transition, QuizError> {
        self.request(Command::Abandon).await
    }

    /// Replace the session with a fresh one in `Intro`. With `refetch`, the
    /// bank is fetched again from the provider the engine was built with.
    pub async fn restart(&self, refetch: bool) -> Result<Transition, QuizError> {
        self.request(|reply| Command::Restart { refetch, reply }).await
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, QuizError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Snapshot(tx))
            .map_err(|_| QuizError::EngineClosed)?;
        rx.await.map_err(|_| QuizError::EngineClosed)
    }

    /// Stop the engine task. Any armed countdown is cancelled.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    async fn request(&self, make: impl FnOnce(Reply) -> Command) -> Result<Transition, QuizError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .map_err(|_| QuizError::EngineClosed)?;
        rx.await.map_err(|_| QuizError::EngineClosed)?
    }
}

struct BankSource {
    provider: Arc<dyn QuestionBankProvider>,
    topic: String,
}

/// The engine task state.
pub struct QuizEngine {
    controller: SessionController<TokioCountdown>,
    timer_events: mpsc::UnboundedReceiver<TimerEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
    reporter: Arc<dyn SessionReporter>,
    source: Option<BankSource>,
}

impl QuizEngine {
    /// Spawn an engine for an already validated quiz. Must be called from
    /// within a tokio runtime.
    pub fn spawn(
        config: QuizConfig,
        reporter: Arc<dyn SessionReporter>,
        settings: EngineSettings,
    ) -> (QuizHandle, JoinHandle<()>) {
        Self::spawn_inner(config, None, reporter, settings)
    }

    /// Fetch `topic` from `provider` and spawn an engine for it. A failed
    /// fetch is reported here and no engine is started.
    pub async fn spawn_from_provider(
        provider: Arc<dyn QuestionBankProvider>,
        topic: &str,
        reporter: Arc<dyn SessionReporter>,
        settings: EngineSettings,
    ) -> Result<(QuizHandle, JoinHandle<()>), QuizError> {
        let config = fetch_quiz(provider.as_ref(), topic).await?;
        let source = BankSource {
            provider,
            topic: topic.to_string(),
        };
        Ok(Self::spawn_inner(config, Some(source), reporter, settings))
    }

    fn spawn_inner(
        config: QuizConfig,
        source: Option<BankSource>,
        reporter: Arc<dyn SessionReporter>,
        settings: EngineSettings,
    ) -> (QuizHandle, JoinHandle<()>) {
        let (timer, timer_events) = TokioCountdown::channel(settings.tick_interval);
        let (tx, commands) = mpsc::unbounded_channel();

        let engine = QuizEngine {
            controller: SessionController::new(config, timer),
            timer_events,
            commands,
            reporter,
            source,
        };
        let task = tokio::spawn(engine.run());
        (QuizHandle { commands: tx }, task)
    }

    async fn run(mut self) {
        self.reporter
            .on_phase_change(self.controller.session().id(), self.controller.phase());

        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command).await,
                },
                Some(event) = self.timer_events.recv() => self.handle_timer(event),
            }
        }

        self.controller.timer_mut().stop();
        tracing::debug!("quiz engine stopped");
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Start(reply) => {
                let outcome = self.controller.start().map_err(QuizError::from);
                self.respond(reply, outcome);
            }
            Command::Submit {
                question,
                option,
                reply,
            } => {
                let outcome = self
                    .controller
                    .submit(question, option)
                    .map_err(QuizError::from);
                if let Err(e) = &outcome {
                    tracing::debug!("submission rejected: {e}");
                }
                self.respond(reply, outcome);
            }
            Command::Abandon(reply) => {
                let outcome = self.controller.abandon().map_err(QuizError::from);
                self.respond(reply, outcome);
            }
            Command::Restart { refetch, reply } => {
                let replacement = match (&self.source, refetch) {
                    (Some(source), true) => {
                        match fetch_quiz(source.provider.as_ref(), &source.topic).await {
                            Ok(config) => Some(config),
                            Err(e) => {
                                tracing::warn!("refetch failed, keeping session: {e}");
                                let _ = reply.send(Err(e));
                                return;
                            }
                        }
                    }
                    _ => None,
                };
                let transition = self.controller.restart(replacement);
                self.respond(reply, Ok(transition));
            }
            Command::Snapshot(reply) => {
                let session = self.controller.session();
                let _ = reply.send(SessionSnapshot {
                    session_id: session.id(),
                    phase: session.phase(),
                    current_index: session.current_index(),
                    answered: session.answers().len(),
                    question_count: self.controller.config().question_count(),
                    remaining: self.controller.timer().remaining(),
                });
            }
            Command::Shutdown => {}
        }
    }

    fn handle_timer(&mut self, event: TimerEvent) {
        match event {
            TimerEvent::Tick { token, remaining } => {
                if self.controller.tick(token, remaining) {
                    self.reporter
                        .on_tick(self.controller.session().current_index(), remaining);
                }
            }
            TimerEvent::Expired { token } => {
                if let Some(transition) = self.controller.expire(token) {
                    self.report(&transition);
                }
            }
        }
    }

    /// Notify the reporter first, then answer the caller.
    fn respond(&self, reply: Reply, outcome: Result<Transition, QuizError>) {
        if let Ok(transition) = &outcome {
            self.report(transition);
        }
        let _ = reply.send(outcome);
    }

    fn report(&self, transition: &Transition) {
        let session_id = self.controller.session().id();
        let config = self.controller.config();
        match transition {
            Transition::Started { question, allotted } => {
                self.reporter.on_phase_change(session_id, Phase::Playing);
                if let Some(q) = config.question(*question) {
                    self.reporter.on_question(*question, q, *allotted);
                }
            }
            Transition::Advanced {
                answer,
                next,
                allotted,
            } => {
                self.reporter.on_answer(next - 1, answer);
                if let Some(q) = config.question(*next) {
                    self.reporter.on_question(*next, q, *allotted);
                }
            }
            Transition::Completed { answer, result } => {
                self.reporter.on_answer(result.answers.len() - 1, answer);
                self.reporter.on_phase_change(session_id, Phase::Completed);
                self.reporter.on_complete(result);
            }
            Transition::Exited { discarded } => {
                self.reporter.on_phase_change(session_id, Phase::Exited);
                self.reporter.on_exit(*discarded);
            }
            Transition::Reset { session_id } => {
                self.reporter.on_phase_change(*session_id, Phase::Intro);
            }
        }
    }
}

/// Fetch a quiz from a provider, classifying failures.
///
/// A bank that fails validation is a configuration error. Anything else the
/// provider reports means no questions are available.
pub async fn fetch_quiz(
    provider: &dyn QuestionBankProvider,
    topic: &str,
) -> Result<QuizConfig, QuizError> {
    match provider.fetch(topic).await {
        Ok(config) => Ok(config),
        Err(e) => {
            tracing::error!(provider = provider.name(), topic, "fetch failed: {e:#}");
            if let Some(config_error) = e.downcast_ref::<ConfigError>() {
                return Err(QuizError::Config(config_error.clone()));
            }
            Err(QuizError::ProviderFailure {
                topic: topic.to_string(),
                reason: format!("{e:#}"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::model::{Question, TimeLimit};
    use crate::report::{ChannelReporter, NoopReporter, SessionNotification};
    use crate::traits::TopicInfo;

    fn make_quiz(n: usize, secs: u64) -> QuizConfig {
        let questions = (0..n)
            .map(|i| {
                Question::new(
                    format!("q{i}"),
                    format!("Question {i}"),
                    vec!["right".into(), "wrong".into()],
                    0,
                )
                .unwrap()
            })
            .collect();
        QuizConfig::new("engine", "Engine Quiz", questions)
            .unwrap()
            .with_time_limit(TimeLimit::PerQuestion(Duration::from_secs(secs)))
    }

    fn no_ticks() -> EngineSettings {
        EngineSettings {
            tick_interval: None,
        }
    }

    async fn next_completed(
        rx: &mut mpsc::UnboundedReceiver<SessionNotification>,
    ) -> Option<crate::report::QuizResult> {
        while let Some(n) = rx.recv().await {
            if let SessionNotification::Completed(result) = n {
                return Some(result);
            }
        }
        None
    }

    #[tokio::test(start_paused = true)]
    async fn submissions_complete_the_quiz() {
        let (reporter, mut rx) = ChannelReporter::new();
        let (handle, _task) = QuizEngine::spawn(make_quiz(3, 30), Arc::new(reporter), no_ticks());

        handle.start().await.unwrap();
        handle.submit(0, 0).await.unwrap();
        handle.submit(1, 1).await.unwrap();
        let last = handle.submit(2, 0).await.unwrap();
        assert!(matches!(last, Transition::Completed { .. }));

        let result = next_completed(&mut rx).await.unwrap();
        assert_eq!(result.answers.len(), 3);
        assert_eq!(result.score.correct, 2);
        assert_eq!(result.score.percentage, 67);
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_complete_the_quiz() {
        let (reporter, mut rx) = ChannelReporter::new();
        let (handle, _task) = QuizEngine::spawn(make_quiz(3, 5), Arc::new(reporter), no_ticks());

        handle.start().await.unwrap();
        let result = next_completed(&mut rx).await.unwrap();

        assert_eq!(result.score.percentage, 0);
        assert!(!result.score.passed);
        assert!(result.answers.iter().all(|a| a.is_unanswered()));
        assert!(result
            .answers
            .iter()
            .all(|a| a.time_spent() == Duration::from_secs(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn late_submission_after_timeout_is_rejected() {
        let (handle, _task) =
            QuizEngine::spawn(make_quiz(2, 5), Arc::new(NoopReporter), no_ticks());
        handle.start().await.unwrap();

        tokio::time::sleep(Duration::from_secs(6)).await;
        let err = handle.submit(0, 0).await.unwrap_err();
        assert!(matches!(err, QuizError::Session(_)));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.answered, 1);
        assert_eq!(snapshot.current_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn abandon_never_completes_and_stops_timer() {
        let (reporter, mut rx) = ChannelReporter::new();
        let (handle, _task) = QuizEngine::spawn(make_quiz(2, 5), Arc::new(reporter), no_ticks());

        handle.start().await.unwrap();
        handle.submit(0, 0).await.unwrap();
        handle.abandon().await.unwrap();

        tokio::time::sleep(Duration::from_secs(60)).await;
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.phase, Phase::Exited);
        assert_eq!(snapshot.remaining, None);

        handle.shutdown();
        let mut saw_exit = false;
        while let Some(n) = rx.recv().await {
            assert!(!matches!(n, SessionNotification::Completed(_)));
            if let SessionNotification::Exited { discarded } = n {
                assert_eq!(discarded, 1);
                saw_exit = true;
            }
        }
        assert!(saw_exit);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_begins_with_empty_answers() {
        let (handle, _task) =
            QuizEngine::spawn(make_quiz(2, 30), Arc::new(NoopReporter), no_ticks());
        handle.start().await.unwrap();
        handle.submit(0, 0).await.unwrap();
        handle.submit(1, 0).await.unwrap();

        let before = handle.snapshot().await.unwrap();
        handle.restart(false).await.unwrap();
        let after = handle.snapshot().await.unwrap();

        assert_ne!(before.session_id, after.session_id);
        assert_eq!(after.phase, Phase::Intro);
        assert_eq!(after.answered, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_are_reported() {
        let (reporter, mut rx) = ChannelReporter::new();
        let settings = EngineSettings {
            tick_interval: Some(Duration::from_secs(1)),
        };
        let (handle, _task) = QuizEngine::spawn(make_quiz(1, 3), Arc::new(reporter), settings);
        handle.start().await.unwrap();

        let mut remaining = Vec::new();
        while let Some(n) = rx.recv().await {
            match n {
                SessionNotification::Tick { remaining: r, .. } => remaining.push(r),
                SessionNotification::Completed(_) => break,
                _ => {}
            }
        }
        assert_eq!(
            remaining,
            vec![Duration::from_secs(2), Duration::from_secs(1)]
        );
    }

    #[tokio::test]
    async fn handle_reports_closed_engine() {
        let (handle, task) =
            QuizEngine::spawn(make_quiz(1, 30), Arc::new(NoopReporter), no_ticks());
        handle.shutdown();
        task.await.unwrap();
        assert!(matches!(
            handle.start().await,
            Err(QuizError::EngineClosed)
        ));
    }

    struct CountingProvider {
        calls: AtomicUsize,
        fail_after: usize,
    }

    #[async_trait]
    impl QuestionBankProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        async fn fetch(&self, topic: &str) -> anyhow::Result<QuizConfig> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call >= self.fail_after {
                anyhow::bail!("bank server unavailable");
            }
            Ok(make_quiz(call + 1, 30).with_topic(topic))
        }

        async fn topics(&self) -> anyhow::Result<Vec<TopicInfo>> {
            Ok(vec![])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn restart_can_refetch_the_bank() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            fail_after: 2,
        });
        let (handle, _task) = QuizEngine::spawn_from_provider(
            provider.clone(),
            "java",
            Arc::new(NoopReporter),
            no_ticks(),
        )
        .await
        .unwrap();
        assert_eq!(handle.snapshot().await.unwrap().question_count, 1);

        handle.restart(true).await.unwrap();
        assert_eq!(handle.snapshot().await.unwrap().question_count, 2);

        let err = handle.restart(true).await.unwrap_err();
        assert!(matches!(err, QuizError::ProviderFailure { .. }));
        assert_eq!(handle.snapshot().await.unwrap().question_count, 2);
    }

    #[tokio::test]
    async fn provider_failure_refuses_to_start() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicUsize::new(0),
            fail_after: 0,
        });
        let err = QuizEngine::spawn_from_provider(
            provider,
            "sumatra",
            Arc::new(NoopReporter),
            no_ticks(),
        )
        .await
        .err()
        .unwrap();
        assert!(err.to_string().contains("no questions available for 'sumatra'"));
    }

    struct InvalidBankProvider;

    #[async_trait]
    impl QuestionBankProvider for InvalidBankProvider {
        fn name(&self) -> &str {
            "invalid"
        }

        async fn fetch(&self, _topic: &str) -> anyhow::Result<QuizConfig> {
            Ok(QuizConfig::new("empty", "Empty", vec![])?)
        }

        async fn topics(&self) -> anyhow::Result<Vec<TopicInfo>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn invalid_bank_is_a_config_error() {
        let err = fetch_quiz(&InvalidBankProvider, "empty").await.unwrap_err();
        assert!(matches!(err, QuizError::Config(ConfigError::NoQuestions)));
    }
}
