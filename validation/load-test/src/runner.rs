//! Load test orchestration: VU scheduling, threshold watching, results.

use crate::config::{target_vus_at, EnvironmentConfig, Executor, Scenario, ThresholdSet};
use crate::journey::{CourseApi, CourseCompletion, Pacer, TokioPacer};
use crate::metrics::{IterationOutcome, MetricsCollector, RunInfo, TestResults};
use crate::verdict::{self, ThresholdOutcome};
use indicatif::{ProgressBar, ProgressStyle};
use polanji_client::{ClientResult, CountingErrorSink, Gateway, ReqwestTransport, Transport};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// How often the controller adjusts the VU target.
const TICK: Duration = Duration::from_millis(100);
/// How often aborting thresholds are evaluated.
const ABORT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Everything a run needs to know.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub scenario: Scenario,
    pub environment: EnvironmentConfig,
    pub password: String,
    pub thresholds: ThresholdSet,
    /// Seed for reproducible journeys; VU `n` uses `seed + n`.
    pub seed: Option<u64>,
    pub request_timeout: Duration,
    pub show_progress: bool,
}

/// Executes a scenario with many concurrent journeys.
pub struct LoadRunner {
    config: RunnerConfig,
    transport: Arc<dyn Transport>,
    pacer: Arc<dyn Pacer>,
    errors: Arc<CountingErrorSink>,
    metrics: Arc<MetricsCollector>,
}

/// Channels shared by the controller and every VU.
#[derive(Clone)]
struct Control {
    target: watch::Receiver<u32>,
    stop: watch::Receiver<bool>,
    iterations_left: Option<Arc<AtomicU64>>,
    /// Ramping only: how long a VU over target may keep its iteration.
    ramp_down: Option<Duration>,
}

impl LoadRunner {
    /// Create a runner sending real HTTP requests.
    pub fn new(config: RunnerConfig) -> ClientResult<Self> {
        let transport = ReqwestTransport::new(config.request_timeout)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a runner on top of any transport.
    pub fn with_transport(config: RunnerConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            pacer: Arc::new(TokioPacer),
            errors: Arc::new(CountingErrorSink::new()),
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    /// Replace the pacer used for in-journey pauses.
    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Run the scenario to completion (or until a threshold aborts it).
    pub async fn run(&self) -> anyhow::Result<TestResults> {
        let scenario = &self.config.scenario;
        let executor = &scenario.executor;
        let max_vus = executor.max_vus();

        info!(
            scenario = %scenario.name,
            executor = executor.kind(),
            environment = %self.config.environment.name,
            base_url = %self.config.environment.polanji,
            max_vus,
            duration_secs = executor.duration().as_secs(),
            "Starting load test"
        );

        let gateway = Gateway::new(
            &self.config.environment.polanji,
            self.transport.clone(),
            self.errors.clone(),
        )
        .with_observer(self.metrics.clone());
        let api = CourseApi::new(gateway);
        let password: Arc<str> = Arc::from(self.config.password.as_str());

        let (initial, iterations_left, ramp_down) = match executor {
            Executor::RampingVus {
                start_vus,
                stages,
                graceful_ramp_down,
            } => (
                target_vus_at(*start_vus, stages, Duration::ZERO),
                None,
                Some(*graceful_ramp_down),
            ),
            Executor::ConstantVus { vus, .. } => (*vus, None, None),
            Executor::SharedIterations {
                vus, iterations, ..
            } => (*vus, Some(Arc::new(AtomicU64::new(*iterations))), None),
        };
        let (target_tx, target_rx) = watch::channel(initial);
        let (stop_tx, stop_rx) = watch::channel(false);
        let control = Control {
            target: target_rx,
            stop: stop_rx,
            iterations_left,
            ramp_down,
        };

        let mut handles: Vec<JoinHandle<()>> = (0..max_vus)
            .map(|vu| {
                let rng = match self.config.seed {
                    Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(vu as u64)),
                    None => StdRng::from_entropy(),
                };
                tokio::spawn(run_vu(
                    vu,
                    api.clone(),
                    password.clone(),
                    self.pacer.clone(),
                    self.metrics.clone(),
                    control.clone(),
                    rng,
                ))
            })
            .collect();

        let pb = self.progress_bar(executor.duration());
        let start = Instant::now();
        let mut ticker = interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut aborted_by: Option<ThresholdOutcome> = None;
        let mut next_abort_check = Duration::ZERO;

        loop {
            ticker.tick().await;
            let elapsed = start.elapsed();

            if elapsed >= next_abort_check {
                next_abort_check = elapsed + ABORT_CHECK_INTERVAL;
                if let Some(breach) =
                    verdict::abort_breach(&self.config.thresholds, &self.metrics, elapsed)
                {
                    warn!(
                        threshold = %breach.key,
                        rule = %breach.rule,
                        value = ?breach.value,
                        "Threshold crossed, aborting run"
                    );
                    aborted_by = Some(breach);
                    break;
                }
            }

            let done = match executor {
                Executor::RampingVus {
                    start_vus, stages, ..
                } => {
                    let target = target_vus_at(*start_vus, stages, elapsed);
                    target_tx.send_if_modified(|current| {
                        let changed = *current != target;
                        *current = target;
                        changed
                    });
                    elapsed >= executor.duration()
                }
                Executor::ConstantVus { duration, .. } => elapsed >= *duration,
                Executor::SharedIterations { max_duration, .. } => {
                    elapsed >= *max_duration || handles.iter().all(JoinHandle::is_finished)
                }
            };

            pb.set_position(elapsed.as_secs().min(executor.duration().as_secs()));
            pb.set_message(format!(
                "VUs: {}  iterations: {}",
                *target_tx.borrow(),
                self.metrics.iterations_completed()
            ));

            if done {
                break;
            }
        }

        // Stop starting new iterations and let in-flight ones finish.
        let _ = stop_tx.send(true);
        // Ramp-down grace only covers VUs leaving mid-run; see `ramped_down`.
        let grace = if aborted_by.is_some() {
            Duration::ZERO
        } else {
            scenario.graceful_stop
        };
        pb.set_message("Waiting for in-flight journeys...");
        self.drain(&mut handles, grace).await;
        pb.finish_with_message("Complete!");

        let outcomes = verdict::evaluate(&self.config.thresholds, &self.metrics);
        let run = RunInfo {
            scenario_name: scenario.name.clone(),
            environment: self.config.environment.name.to_string(),
            executor: executor.kind().to_string(),
            max_vus,
            aborted_by: aborted_by.map(|b| format!("{} {}", b.key, b.rule)),
        };
        Ok(self.metrics.results(run, self.errors.count(), outcomes))
    }

    /// Wait up to `grace` for VUs, then interrupt the rest.
    async fn drain(&self, handles: &mut [JoinHandle<()>], grace: Duration) {
        let deadline = Instant::now() + grace;
        for handle in handles.iter_mut() {
            if timeout_at(deadline, &mut *handle).await.is_err() {
                handle.abort();
                self.metrics.record_iteration(IterationOutcome::Interrupted);
            }
        }
    }

    fn progress_bar(&self, duration: Duration) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(duration.as_secs());
        let style = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len}s {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        pb.set_style(style);
        pb
    }
}

/// One virtual user: runs journeys back to back while it is wanted.
async fn run_vu(
    vu: u32,
    api: CourseApi,
    password: Arc<str>,
    pacer: Arc<dyn Pacer>,
    metrics: Arc<MetricsCollector>,
    mut control: Control,
    mut rng: StdRng,
) {
    loop {
        if *control.stop.borrow() {
            break;
        }
        if vu >= *control.target.borrow_and_update() {
            // idle until the ramp reaches this VU or the run ends
            tokio::select! {
                changed = control.target.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = control.stop.changed() => {}
            }
            continue;
        }
        if let Some(left) = &control.iterations_left {
            let claimed = left.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
            if claimed.is_err() {
                break;
            }
        }

        let journey = CourseCompletion::new(&api, &password, &*pacer);
        let outcome = tokio::select! {
            outcome = journey.run(&mut rng) => outcome,
            _ = ramped_down(vu, &mut control.target, control.ramp_down) => {
                debug!(vu, "Iteration cut off by ramp-down");
                metrics.record_iteration(IterationOutcome::Interrupted);
                continue;
            }
        };
        match outcome {
            Ok(report) => {
                debug!(vu, course_completed = report.course_completed, "Journey finished");
                metrics.record_iteration(IterationOutcome::Completed {
                    verified: report.course_completed,
                });
            }
            Err(e) => {
                warn!(vu, error = %e, "Journey stopped early");
                metrics.record_iteration(IterationOutcome::Aborted);
            }
        }
    }
}

/// Resolves once this VU has been above the target for the ramp-down grace.
/// Never resolves for executors without ramp-down.
async fn ramped_down(vu: u32, target: &mut watch::Receiver<u32>, grace: Option<Duration>) {
    let Some(grace) = grace else {
        return std::future::pending().await;
    };
    loop {
        if vu >= *target.borrow_and_update() {
            tokio::time::sleep(grace).await;
            return;
        }
        if target.changed().await.is_err() {
            return std::future::pending().await;
        }
    }
}
