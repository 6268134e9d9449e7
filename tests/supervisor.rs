use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use jobvisor::{
    DiscoveryError, Event, EventKind, HandlerFn, Job, JobError, JobId, JobReport, JobSource,
    RandomJobSource, RuntimeError, SimulatedHandler, Supervisor, SupervisorConfig,
    SupervisorState,
};

/// Replays a fixed list of discovery results, then reports no work forever.
struct Scripted {
    steps: Mutex<VecDeque<Result<Option<Job>, DiscoveryError>>>,
}

impl Scripted {
    fn new(steps: impl IntoIterator<Item = Result<Option<Job>, DiscoveryError>>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
        }
    }

    fn jobs(n: u8) -> Self {
        Self::new((1..=n).map(|i| Ok(Some(job_no(i)))))
    }
}

impl JobSource for Scripted {
    fn discover(&self, _in_flight: usize) -> Result<Option<Job>, DiscoveryError> {
        self.steps.lock().unwrap().pop_front().unwrap_or(Ok(None))
    }
}

struct PanicOnce {
    fired: Mutex<bool>,
}

impl JobSource for PanicOnce {
    fn discover(&self, _in_flight: usize) -> Result<Option<Job>, DiscoveryError> {
        let mut fired = self.fired.lock().unwrap();
        if !*fired {
            *fired = true;
            drop(fired);
            panic!("feed offline");
        }
        Ok(None)
    }
}

fn job_no(i: u8) -> Job {
    Job::new(JobId::from_entropy([i; 16]), "Scripted print job")
}

/// Handler that sleeps for `work` unless its token fires first.
fn sleeper(work: Duration) -> std::sync::Arc<impl jobvisor::JobHandler> {
    HandlerFn::arc(move |job: Job, ctx: CancellationToken| async move {
        tokio::select! {
            _ = ctx.cancelled() => Err(JobError::Canceled),
            _ = time::sleep(work) => Ok(JobReport { job, elapsed: work }),
        }
    })
}

async fn next_of(rx: &mut broadcast::Receiver<Event>, kind: EventKind) -> Event {
    time::timeout(Duration::from_secs(600), async {
        loop {
            match rx.recv().await {
                Ok(ev) if ev.kind == kind => return ev,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("bus closed before {kind:?}"),
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("no {kind:?} event"))
}

/// Collects the next `n` terminal job events, in publication order.
async fn terminals(rx: &mut broadcast::Receiver<Event>, n: usize) -> Vec<Event> {
    let mut out = Vec::with_capacity(n);
    while out.len() < n {
        let ev = time::timeout(Duration::from_secs(600), rx.recv())
            .await
            .expect("terminal event")
            .expect("bus open");
        if ev.is_job_terminal() {
            out.push(ev);
        }
    }
    out
}

fn for_job(events: &[Event], job: &Job) -> Event {
    events
        .iter()
        .find(|ev| ev.job.as_deref() == Some(job.id().as_str()))
        .cloned()
        .unwrap_or_else(|| panic!("no event for {job}"))
}

#[tokio::test(start_paused = true)]
async fn idle_supervisor_stops_quickly() {
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_source(Scripted::new([]))
        .build();
    assert_eq!(sup.state(), SupervisorState::Idle);

    sup.start().unwrap();
    assert_eq!(sup.state(), SupervisorState::Running);
    time::sleep(Duration::from_millis(2500)).await;

    let report = sup.stop().await.unwrap();
    assert!(!report.forced);
    assert_eq!(report.abandoned, 0);
    assert!(report.elapsed <= Duration::from_secs(2), "took {:?}", report.elapsed);
    assert_eq!(sup.state(), SupervisorState::Terminated);
    assert!(sup.is_shutting_down());
}

#[tokio::test(start_paused = true)]
async fn long_handler_is_cancelled_after_grace() {
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_source(Scripted::jobs(1))
        .with_handler(sleeper(Duration::from_secs(200)))
        .build();
    let mut rx = sup.subscribe();

    sup.start().unwrap();
    next_of(&mut rx, EventKind::JobStarting).await;
    assert_eq!(sup.in_flight(), 1);

    let report = sup.stop().await.unwrap();
    assert!(report.forced);
    assert_eq!(report.abandoned, 1);
    assert!(report.elapsed >= Duration::from_secs(15));
    assert!(report.elapsed < Duration::from_secs(16), "took {:?}", report.elapsed);
    assert_eq!(sup.in_flight(), 0);
    assert_eq!(sup.state(), SupervisorState::Terminated);

    let grace = next_of(&mut rx, EventKind::GraceExceeded).await;
    assert_eq!(grace.in_flight, Some(1));
    let cancelled = next_of(&mut rx, EventKind::JobCancelled).await;
    assert_eq!(cancelled.job.as_deref(), Some(job_no(1).id().as_str()));
    let stopped = next_of(&mut rx, EventKind::DispatcherStopped).await;
    assert_eq!(stopped.reason.as_deref(), Some("cancelled"));
}

#[tokio::test(start_paused = true)]
async fn short_handler_drains_within_grace() {
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_source(Scripted::jobs(1))
        .with_handler(sleeper(Duration::from_secs(2)))
        .build();
    let mut rx = sup.subscribe();

    sup.start().unwrap();
    next_of(&mut rx, EventKind::JobStarting).await;

    let report = sup.stop().await.unwrap();
    assert!(!report.forced);
    assert!(report.elapsed >= Duration::from_millis(1900));
    assert!(report.elapsed <= Duration::from_millis(2100), "took {:?}", report.elapsed);

    let done = next_of(&mut rx, EventKind::JobCompleted).await;
    assert_eq!(done.job.as_deref(), Some(job_no(1).id().as_str()));
    let within = next_of(&mut rx, EventKind::AllStoppedWithin).await;
    assert!(within.elapsed_ms.is_some());

    let snap = sup.snapshot();
    assert_eq!((snap.in_flight, snap.started, snap.completed), (0, 1, 1));
}

#[tokio::test(start_paused = true)]
async fn dispatcher_drains_while_stopping() {
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_source(Scripted::jobs(1))
        .with_handler(sleeper(Duration::from_secs(5)))
        .build();
    let mut rx = sup.subscribe();

    sup.start().unwrap();
    next_of(&mut rx, EventKind::JobStarting).await;

    let stopper = {
        let sup = sup.clone();
        tokio::spawn(async move { sup.stop().await })
    };
    time::sleep(Duration::from_secs(1)).await;
    assert_eq!(sup.state(), SupervisorState::Draining);
    assert!(sup.is_shutting_down());

    let report = stopper.await.unwrap().unwrap();
    assert!(!report.forced);
    assert_eq!(sup.state(), SupervisorState::Terminated);
}

#[tokio::test(start_paused = true)]
async fn ledger_stays_consistent_under_load() {
    let cfg = SupervisorConfig {
        max_job_duration: Duration::from_secs(3),
        ..SupervisorConfig::default()
    };
    let sup = Supervisor::builder(cfg.clone())
        .with_source(RandomJobSource::with_seed(&cfg, 7))
        .with_handler(SimulatedHandler::with_seed(&cfg, 11))
        .build();

    sup.start().unwrap();
    for _ in 0..300 {
        time::sleep(Duration::from_millis(100)).await;
        let snap = sup.snapshot();
        assert_eq!(snap.in_flight as u64, snap.started - snap.completed);
        assert_eq!(snap.jobs.len(), snap.in_flight);
        assert!(snap.in_flight <= cfg.max_in_flight);
    }
    assert!(sup.snapshot().started > 0);

    let report = sup.stop().await.unwrap();
    assert!(!report.forced);
    let snap = sup.snapshot();
    assert_eq!(snap.in_flight, 0);
    assert_eq!(snap.started, snap.completed);
}

#[tokio::test(start_paused = true)]
async fn failing_handler_does_not_stop_the_loop() {
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_source(Scripted::jobs(2))
        .with_handler(HandlerFn::arc(|job: Job, _ctx: CancellationToken| async move {
            if job.id() == job_no(1).id() {
                Err(JobError::fail("printer jammed"))
            } else {
                Ok(JobReport { job, elapsed: Duration::ZERO })
            }
        }))
        .build();
    let mut rx = sup.subscribe();

    sup.start().unwrap();
    let events = terminals(&mut rx, 2).await;
    let failed = for_job(&events, &job_no(1));
    assert_eq!(failed.kind, EventKind::JobFailed);
    assert!(failed.reason.as_deref().unwrap_or_default().contains("printer jammed"));
    assert_eq!(for_job(&events, &job_no(2)).kind, EventKind::JobCompleted);
    assert_eq!(sup.state(), SupervisorState::Running);

    sup.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn panicking_handler_is_reported_as_failure() {
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_source(Scripted::jobs(2))
        .with_handler(HandlerFn::arc(|job: Job, _ctx: CancellationToken| async move {
            if job.id() == job_no(1).id() {
                panic!("toner exploded");
            }
            Ok::<_, JobError>(JobReport { job, elapsed: Duration::ZERO })
        }))
        .build();
    let mut rx = sup.subscribe();

    sup.start().unwrap();
    let events = terminals(&mut rx, 2).await;
    let failed = for_job(&events, &job_no(1));
    assert_eq!(failed.kind, EventKind::JobFailed);
    assert!(failed.reason.as_deref().unwrap_or_default().contains("toner exploded"));
    assert_eq!(for_job(&events, &job_no(2)).kind, EventKind::JobCompleted);

    let report = sup.stop().await.unwrap();
    assert!(!report.forced);
    let snap = sup.snapshot();
    assert_eq!((snap.started, snap.completed), (2, 2));
}

#[tokio::test(start_paused = true)]
async fn discovery_error_backs_off_then_resumes() {
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_source(Scripted::new([
            Err(DiscoveryError::source("queue unreachable")),
            Ok(Some(job_no(3))),
        ]))
        .with_handler(sleeper(Duration::ZERO))
        .build();
    let mut rx = sup.subscribe();

    let t0 = Instant::now();
    sup.start().unwrap();

    let failed = next_of(&mut rx, EventKind::DiscoveryFailed).await;
    assert_eq!(failed.delay_ms, Some(5000));
    assert!(failed.reason.as_deref().unwrap_or_default().contains("queue unreachable"));

    let found = next_of(&mut rx, EventKind::JobDiscovered).await;
    assert_eq!(found.job.as_deref(), Some(job_no(3).id().as_str()));
    assert!(t0.elapsed() >= Duration::from_secs(5));
    assert_eq!(sup.state(), SupervisorState::Running);

    sup.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn discovery_panic_is_a_discovery_error() {
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_source(PanicOnce {
            fired: Mutex::new(false),
        })
        .build();
    let mut rx = sup.subscribe();

    sup.start().unwrap();
    let failed = next_of(&mut rx, EventKind::DiscoveryFailed).await;
    assert!(failed.reason.as_deref().unwrap_or_default().contains("feed offline"));
    assert_eq!(sup.state(), SupervisorState::Running);

    let report = sup.stop().await.unwrap();
    assert!(!report.forced);
    assert!(report.elapsed < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn lifecycle_misuse_is_rejected() {
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_source(Scripted::new([]))
        .build();

    assert_eq!(sup.stop().await.unwrap_err(), RuntimeError::NotRunning);

    sup.start().unwrap();
    assert_eq!(sup.start().unwrap_err(), RuntimeError::AlreadyStarted);

    sup.stop().await.unwrap();
    assert_eq!(sup.stop().await.unwrap_err(), RuntimeError::NotRunning);
    assert_eq!(sup.start().unwrap_err(), RuntimeError::ShuttingDown);
}

#[tokio::test(start_paused = true)]
async fn shutdown_events_are_ordered() {
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_source(Scripted::new([]))
        .build();
    let mut rx = sup.subscribe();

    sup.start().unwrap();
    time::sleep(Duration::from_secs(1)).await;
    sup.shutdown_and_wait().await.unwrap();

    let requested = next_of(&mut rx, EventKind::ShutdownRequested).await;
    assert_eq!(requested.in_flight, Some(0));
    let stopped = next_of(&mut rx, EventKind::DispatcherStopped).await;
    assert_eq!(stopped.reason.as_deref(), Some("drained"));
    let within = next_of(&mut rx, EventKind::AllStoppedWithin).await;
    assert!(requested.seq < stopped.seq && stopped.seq < within.seq);
}
