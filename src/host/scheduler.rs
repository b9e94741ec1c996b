use crate::error::NotecraftError;
use crate::types::Result;
use tokio::sync::{mpsc, oneshot};

pub type MainThreadTask = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks on the thread that owns world state
pub trait MainThreadExecutor: Send + Sync {
    fn execute(&self, task: MainThreadTask) -> Result<()>;
}

/// Runs `f` on the main thread and waits for its result.
pub async fn run_on_main<T, F>(executor: &dyn MainThreadExecutor, f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    executor.execute(Box::new(move || {
        // The caller may have stopped waiting
        let _ = tx.send(f());
    }))?;
    rx.await.map_err(|_| NotecraftError::MainThreadUnavailable)
}

/// Sending half of a main-thread task queue
#[derive(Debug, Clone)]
pub struct MainThreadQueue {
    sender: mpsc::UnboundedSender<MainThreadTask>,
}

/// Receiving half, drained by whoever plays the main thread
#[derive(Debug)]
pub struct MainThreadLoop {
    receiver: mpsc::UnboundedReceiver<MainThreadTask>,
}

pub fn main_thread() -> (MainThreadQueue, MainThreadLoop) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (MainThreadQueue { sender }, MainThreadLoop { receiver })
}

impl MainThreadExecutor for MainThreadQueue {
    fn execute(&self, task: MainThreadTask) -> Result<()> {
        self.sender
            .send(task)
            .map_err(|_| NotecraftError::MainThreadUnavailable)
    }
}

impl MainThreadLoop {
    /// Runs every task queued so far, like one server tick. Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Runs tasks until every queue handle is dropped.
    pub async fn run(mut self) {
        while let Some(task) = self.receiver.recv().await {
            task();
        }
    }
}
