/// Background network thread.
///
/// The frame loop is synchronous, so requests are handed to a dedicated
/// thread running a current-thread tokio runtime. Jobs are executed one at a
/// time in submission order; replies come back on a std channel that the
/// frame loop drains without blocking.
///
/// The worker also tracks reachability: the first transport failure after a
/// success reports `Connectivity(false)`, the first success after a failure
/// reports `Connectivity(true)`.

use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc;

use super::api::{ApiCall, ApiClient, ApiReply};

/// Identifies which controller request a reply answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ticket {
    /// Game session the request belongs to; 0 for session-independent calls.
    pub session: u64,
    pub seq: u64,
}

#[derive(Debug)]
pub struct Outgoing {
    pub ticket: Ticket,
    pub call: ApiCall,
}

#[derive(Debug)]
pub struct Incoming {
    pub ticket: Ticket,
    pub reply: ApiReply,
}

#[derive(Debug)]
pub enum NetMessage {
    Reply(Incoming),
    Connectivity(bool),
}

pub struct NetWorker {
    jobs: Option<mpsc::UnboundedSender<Outgoing>>,
    replies: std_mpsc::Receiver<NetMessage>,
    handle: Option<JoinHandle<()>>,
}

impl NetWorker {
    pub fn spawn(client: ApiClient) -> std::io::Result<Self> {
        let (job_tx, job_rx) = mpsc::unbounded_channel::<Outgoing>();
        let (reply_tx, reply_rx) = std_mpsc::channel::<NetMessage>();

        let handle = thread::Builder::new()
            .name("sudoku-net".into())
            .spawn(move || run(client, job_rx, reply_tx))?;

        Ok(NetWorker {
            jobs: Some(job_tx),
            replies: reply_rx,
            handle: Some(handle),
        })
    }

    pub fn send(&self, job: Outgoing) {
        let Some(jobs) = &self.jobs else { return };
        if let Err(err) = jobs.send(job) {
            tracing::warn!(path = err.0.call.path(), "network worker gone, request dropped");
        }
    }

    /// Everything that has arrived since the last poll.
    pub fn poll(&self) -> Vec<NetMessage> {
        self.replies.try_iter().collect()
    }

    /// Close the job queue and wait for the in-flight request to finish.
    pub fn shutdown(mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("network worker panicked");
            }
        }
    }
}

fn run(
    client: ApiClient,
    mut jobs: mpsc::UnboundedReceiver<Outgoing>,
    replies: std_mpsc::Sender<NetMessage>,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(err) => {
            tracing::error!(error = %err, "failed to start network runtime");
            return;
        }
    };

    runtime.block_on(async move {
        let mut online = true;
        while let Some(job) = jobs.recv().await {
            let path = job.call.path();
            let reply = client.execute(job.call).await;

            let reachable = !reply.error().is_some_and(|e| e.is_connectivity());
            if let Some(err) = reply.error() {
                tracing::warn!(path, error = %err, "request failed");
            } else {
                tracing::debug!(path, "request ok");
            }
            if reachable != online {
                online = reachable;
                tracing::info!(online, "connectivity changed");
                if replies.send(NetMessage::Connectivity(online)).is_err() {
                    break;
                }
            }

            let incoming = Incoming { ticket: job.ticket, reply };
            if replies.send(NetMessage::Reply(incoming)).is_err() {
                break;
            }
        }
    });
}
