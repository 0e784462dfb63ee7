//! Tokio host for [`Upload`].
//!
//! Timers and reads run as spawned tasks that only ever send events back into the
//! driver's inbox. Cancelling a timer aborts its task. Dropping the driver aborts
//! everything that is still pending.
use std::time::Duration;

use tokio::{
    sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel},
    task::JoinHandle,
    time::{interval, sleep},
};
use tracing::debug;

use super::{Command, Event, Phase, Upload, encode::read_data_url};

pub struct UploadDriver {
    upload: Upload,
    events: UnboundedSender<Event>,
    inbox: UnboundedReceiver<Event>,
    read: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
    redirect: Option<JoinHandle<()>>,
}

impl UploadDriver {
    pub fn new(upload: Upload) -> Self {
        let (events, inbox) = unbounded_channel();

        Self {
            upload,
            events,
            inbox,
            read: None,
            ticker: None,
            redirect: None,
        }
    }

    pub fn upload(&self) -> &Upload {
        &self.upload
    }

    /// Handle for feeding UI events from elsewhere.
    pub fn sender(&self) -> UnboundedSender<Event> {
        self.events.clone()
    }

    pub fn dispatch(&mut self, event: Event) {
        for command in self.upload.handle(event) {
            self.apply(command);
        }
    }

    pub fn unmount(&mut self) {
        self.dispatch(Event::Unmount);
    }

    /// Waits for one event and dispatches it.
    pub async fn step(&mut self) {
        if let Some(event) = self.inbox.recv().await {
            self.dispatch(event);
        }
    }

    /// Pumps events until the widget completes, falls back to idle or is unmounted.
    pub async fn run(&mut self, mut observe: impl FnMut(&Upload)) {
        observe(&self.upload);

        while !self.is_settled() {
            self.step().await;
            observe(&self.upload);
        }
    }

    fn is_settled(&self) -> bool {
        !self.upload.is_mounted() || self.upload.has_completed() || self.upload.phase() == Phase::Idle
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Read { generation, file } => {
                let events = self.events.clone();
                replace(
                    &mut self.read,
                    tokio::spawn(async move {
                        let result = read_data_url(&file).await;
                        let _ = events.send(Event::ReadFinished { generation, result });
                    }),
                );
            }
            Command::StartTicker { generation, period } => {
                let events = self.events.clone();
                replace(
                    &mut self.ticker,
                    tokio::spawn(async move {
                        let mut ticker = interval(period.max(Duration::from_millis(1)));
                        // first tick resolves immediately
                        ticker.tick().await;

                        loop {
                            ticker.tick().await;
                            if events.send(Event::Tick { generation }).is_err() {
                                break;
                            }
                        }
                    }),
                );
            }
            Command::StopTicker => {
                debug!("Stopping progress ticker");
                abort(&mut self.ticker);
            }
            Command::ScheduleRedirect { generation, delay } => {
                let events = self.events.clone();
                replace(
                    &mut self.redirect,
                    tokio::spawn(async move {
                        sleep(delay).await;
                        let _ = events.send(Event::RedirectDue { generation });
                    }),
                );
            }
            Command::CancelRedirect => abort(&mut self.redirect),
        }
    }
}

impl Drop for UploadDriver {
    fn drop(&mut self) {
        abort(&mut self.read);
        abort(&mut self.ticker);
        abort(&mut self.redirect);
    }
}

fn replace(slot: &mut Option<JoinHandle<()>>, task: JoinHandle<()>) {
    abort(slot);
    *slot = Some(task);
}

fn abort(slot: &mut Option<JoinHandle<()>>) {
    if let Some(task) = slot.take() {
        task.abort();
    }
}
