use std::future::Future;
use tokio::task::JoinHandle;

/// DutyTasks owns the long-running background tasks of a master. Dropping it aborts them, so the
/// duties live exactly as long as the master role does.
pub(crate) struct DutyTasks {
    handles: Vec<JoinHandle<()>>,
}

impl DutyTasks {
    pub(crate) fn new() -> Self {
        DutyTasks { handles: Vec::new() }
    }

    pub(crate) fn spawn<F>(&mut self, duty: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handles.push(tokio::spawn(duty));
    }
}

impl Drop for DutyTasks {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}
