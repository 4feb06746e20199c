//! The cooperative scheduling loop.
//!
//! One [`ModeController`] owns the display, the metrics provider and the
//! receiving end of the button queue. Each tick it drains button presses,
//! applies them to the mode state machine, then does whatever the current
//! mode needs: rotate and redraw a status page, draw the next screensaver
//! frame, or blank the panel once.

pub mod state;

pub use state::{DisplayMode, ModeMachine, PageCursor};

use crate::config::DaemonConfig;
use crate::display::{DisplaySink, Frame, Page, ScopedDisplay, Screensaver};
use crate::error::Result;
use crate::input::ButtonReceiver;
use crate::metrics::{MetricsProvider, RouterSnapshot};
use std::future::Future;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// What a single tick did to the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A status page was sampled and drawn
    Page(Page),
    /// A screensaver frame was drawn at this phase
    Animation(u64),
    /// The panel was blanked
    Blanked,
    /// Nothing was due
    Idle,
}

/// Owns all mutable daemon state and drives the display.
pub struct ModeController<M, S: DisplaySink> {
    machine: ModeMachine,
    cursor: PageCursor,
    metrics: M,
    display: ScopedDisplay<S>,
    events: ButtonReceiver,
    screensaver: Screensaver,
    snapshot: Option<RouterSnapshot>,
    page_interval: Duration,
    frame_interval: Duration,
    display_retries: u32,
    retry_backoff: Duration,
    next_rotation: Instant,
    saver_epoch: Instant,
    just_started: bool,
}

impl<M: MetricsProvider, S: DisplaySink> ModeController<M, S> {
    /// Take ownership of `sink` for the lifetime of the controller. The panel
    /// is blanked when the controller finishes or is dropped.
    pub fn new(config: &DaemonConfig, metrics: M, sink: S, events: ButtonReceiver) -> Self {
        let now = Instant::now();
        Self {
            machine: ModeMachine::new(config.debounce),
            cursor: PageCursor::new(Page::ALL.len()),
            metrics,
            display: ScopedDisplay::new(sink),
            events,
            screensaver: Screensaver::new(config.frame_interval),
            snapshot: None,
            page_interval: config.page_interval,
            frame_interval: config.frame_interval,
            display_retries: config.display_retries.max(1),
            retry_backoff: config.retry_backoff,
            next_rotation: now,
            saver_epoch: now,
            just_started: true,
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.machine.mode()
    }

    pub fn current_page(&self) -> Page {
        Page::ALL[self.cursor.index()]
    }

    /// The snapshot behind the page currently on screen.
    pub fn last_snapshot(&self) -> Option<&RouterSnapshot> {
        self.snapshot.as_ref()
    }

    /// Run one scheduling step at time `now`.
    pub async fn tick(&mut self, now: Instant) -> Result<TickOutcome> {
        let entered = self.drain_presses() | std::mem::take(&mut self.just_started);

        match self.machine.mode() {
            DisplayMode::Pages => {
                if entered {
                    return self.show_page(now).await;
                }
                if now < self.next_rotation {
                    return Ok(TickOutcome::Idle);
                }
                self.cursor.advance();
                self.show_page(now).await
            }
            DisplayMode::Screensaver => {
                if entered {
                    self.saver_epoch = now;
                }
                let phase = self
                    .screensaver
                    .phase(now.saturating_duration_since(self.saver_epoch));
                let frame = self.screensaver.render_phase(phase);
                self.push(&frame).await?;
                Ok(TickOutcome::Animation(phase))
            }
            DisplayMode::Off => {
                if !entered {
                    return Ok(TickOutcome::Idle);
                }
                self.retrying("blank", |display| display.blank()).await?;
                Ok(TickOutcome::Blanked)
            }
        }
    }

    /// Tick every frame interval until `shutdown` resolves, then blank the
    /// panel and release it. A display failure ends the loop with an error
    /// after the panel has been blanked on a best-effort basis.
    pub async fn run<F>(mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let mut ticker = time::interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(
            mode = %self.mode(),
            pages = Page::ALL.len(),
            page_interval_ms = self.page_interval.as_millis() as u64,
            "display loop started"
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("shutdown requested, blanking display");
                    break;
                }
                _ = ticker.tick() => {
                    let outcome = self.tick(Instant::now()).await?;
                    if outcome != TickOutcome::Idle {
                        debug!(?outcome, "tick");
                    }
                }
            }
        }

        self.display.release()
    }

    /// Apply queued presses in arrival order. Returns whether the mode changed.
    fn drain_presses(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.events.try_recv() {
            match self.machine.press(event) {
                Some(mode) => {
                    info!(mode = %mode, "display mode changed");
                    changed = true;
                }
                None => debug!("button press ignored inside debounce window"),
            }
        }
        changed
    }

    async fn show_page(&mut self, now: Instant) -> Result<TickOutcome> {
        let snapshot = self.metrics.collect_snapshot().await;
        let page = self.current_page();
        let frame = page.render(&snapshot);
        self.snapshot = Some(snapshot);
        self.push(&frame).await?;
        self.next_rotation = now + self.page_interval;
        Ok(TickOutcome::Page(page))
    }

    async fn push(&mut self, frame: &Frame) -> Result<()> {
        self.retrying("show", |display| display.show(frame)).await
    }

    /// Run a display operation, retrying with exponential backoff.
    async fn retrying<F>(&mut self, operation: &'static str, mut op: F) -> Result<()>
    where
        F: FnMut(&mut ScopedDisplay<S>) -> Result<()>,
    {
        let mut backoff = self.retry_backoff;
        let mut attempt = 1;
        loop {
            match op(&mut self.display) {
                Ok(()) => return Ok(()),
                Err(err) if attempt < self.display_retries => {
                    warn!(operation, attempt, error = %err, "display write failed, retrying");
                    time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(err) => {
                    error!(operation, attempts = attempt, error = %err, "display unreachable");
                    return Err(err);
                }
            }
        }
    }
}
