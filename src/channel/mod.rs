//! Serialized execution channel
//!
//! A single worker owns a shared resource (the transport) and runs submitted
//! operations against it one at a time, strictly in submission order. Callers
//! hold cheap cloneable handles and suspend until their operation's result is
//! delivered.

use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::core::{Error, Result};

/// A type-erased operation borrowing the resource for its whole run
type Job<R> = Box<dyn for<'a> FnOnce(&'a mut R) -> BoxFuture<'a, ()> + Send>;

fn job<R, F>(f: F) -> Job<R>
where
    F: for<'a> FnOnce(&'a mut R) -> BoxFuture<'a, ()> + Send + 'static,
{
    Box::new(f)
}

const QUEUED: u8 = 0;
const RUNNING: u8 = 1;
const ABANDONED: u8 = 2;

/// Admission state of one submission, raced between caller and worker
#[derive(Debug)]
struct Ticket(AtomicU8);

impl Ticket {
    fn new() -> Self {
        Ticket(AtomicU8::new(QUEUED))
    }

    /// Worker side: claims the operation unless its caller already left
    fn start(&self) -> bool {
        self.0
            .compare_exchange(QUEUED, RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Caller side: withdraws the operation if it has not started yet
    fn abandon(&self) -> bool {
        self.0
            .compare_exchange(QUEUED, ABANDONED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Withdraws a still-queued submission when the waiting caller is dropped
struct AbandonOnDrop(Arc<Ticket>);

impl Drop for AbandonOnDrop {
    fn drop(&mut self) {
        if self.0.abandon() {
            trace!("caller dropped while queued; operation withdrawn");
        }
    }
}

struct Submission<R> {
    ticket: Arc<Ticket>,
    job: Job<R>,
}

const PHASE_PENDING: u8 = 0;
const PHASE_RUNNING: u8 = 1;
const PHASE_STOPPED: u8 = 2;

/// Lifecycle phase of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPhase {
    /// Submissions are accepted and queued; no worker has started yet
    Pending,
    /// The worker loop is draining the queue
    Running,
    /// The worker has exited and handed the resource back
    Stopped,
}

#[derive(Debug)]
struct Shared {
    phase: AtomicU8,
    queued: AtomicUsize,
}

/// Handle for submitting operations to the channel's worker
pub struct SerialChannel<R> {
    tx: mpsc::UnboundedSender<Submission<R>>,
    shared: Arc<Shared>,
}

impl<R> Clone for SerialChannel<R> {
    fn clone(&self) -> Self {
        SerialChannel {
            tx: self.tx.clone(),
            shared: self.shared.clone(),
        }
    }
}

/// The single consumer of a channel's queue
pub struct ChannelWorker<R> {
    rx: mpsc::UnboundedReceiver<Submission<R>>,
    shared: Arc<Shared>,
}

/// Creates a channel in the pending phase
///
/// Submissions made before the worker is started wait in the queue.
pub fn serial_channel<R: Send + 'static>() -> (SerialChannel<R>, ChannelWorker<R>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared {
        phase: AtomicU8::new(PHASE_PENDING),
        queued: AtomicUsize::new(0),
    });
    (
        SerialChannel {
            tx,
            shared: shared.clone(),
        },
        ChannelWorker { rx, shared },
    )
}

impl<R: Send + 'static> SerialChannel<R> {
    /// Current lifecycle phase
    pub fn phase(&self) -> ChannelPhase {
        match self.shared.phase.load(Ordering::Acquire) {
            PHASE_PENDING => ChannelPhase::Pending,
            PHASE_RUNNING => ChannelPhase::Running,
            _ => ChannelPhase::Stopped,
        }
    }

    /// Submissions not yet picked up by the worker, withdrawn ones included
    pub fn queued(&self) -> usize {
        self.shared.queued.load(Ordering::Acquire)
    }

    fn enqueue<T, F>(&self, op: F) -> Result<(Arc<Ticket>, oneshot::Receiver<T>)>
    where
        T: Send + 'static,
        F: for<'a> FnOnce(&'a mut R) -> BoxFuture<'a, T> + Send + 'static,
    {
        let (result_tx, result_rx) = oneshot::channel();
        let ticket = Arc::new(Ticket::new());
        let submission = Submission {
            ticket: ticket.clone(),
            job: job(move |resource| {
                let operation = op(resource);
                async move {
                    let output = operation.await;
                    if result_tx.send(output).is_err() {
                        debug!("operation finished after its caller left; no response");
                    }
                }
                .boxed()
            }),
        };

        self.shared.queued.fetch_add(1, Ordering::AcqRel);
        self.tx.send(submission).map_err(|_| {
            self.shared.queued.fetch_sub(1, Ordering::AcqRel);
            Error::internal("serialized channel stopped")
        })?;
        Ok((ticket, result_rx))
    }

    /// Runs `op` once every earlier submission has finished
    ///
    /// Dropping the returned future before the operation starts withdraws it;
    /// dropping it afterwards lets the operation finish and discards its result.
    pub async fn submit<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: for<'a> FnOnce(&'a mut R) -> BoxFuture<'a, T> + Send + 'static,
    {
        let (ticket, result_rx) = self.enqueue(op)?;
        let _guard = AbandonOnDrop(ticket);
        result_rx
            .await
            .map_err(|_| Error::internal("operation dropped by the channel worker"))
    }

    /// Like [`submit`](Self::submit), but observes an explicit cancellation token
    ///
    /// Returns `Ok(None)` when cancelled while still queued; the operation never
    /// touches the resource. Returns [`Error::OperationCancelled`] when cancelled
    /// while running; the operation completes in the background.
    pub async fn submit_cancellable<T, F>(
        &self,
        op: F,
        cancel: &CancellationToken,
    ) -> Result<Option<T>>
    where
        T: Send + 'static,
        F: for<'a> FnOnce(&'a mut R) -> BoxFuture<'a, T> + Send + 'static,
    {
        let (ticket, result_rx) = self.enqueue(op)?;
        let _guard = AbandonOnDrop(ticket.clone());

        tokio::select! {
            biased;
            result = result_rx => result
                .map(Some)
                .map_err(|_| Error::internal("operation dropped by the channel worker")),
            _ = cancel.cancelled() => {
                if ticket.abandon() {
                    debug!("cancelled while queued");
                    Ok(None)
                } else {
                    debug!("cancelled while running; result will be discarded");
                    Err(Error::OperationCancelled)
                }
            }
        }
    }
}

impl<R: Send + 'static> ChannelWorker<R> {
    /// Starts the worker loop on the runtime
    ///
    /// The join handle yields the resource back once every channel handle is
    /// dropped and the queue has drained.
    pub fn spawn(self, resource: R) -> JoinHandle<R> {
        tokio::spawn(self.run(resource))
    }

    /// Drains the queue in submission order until every handle is dropped
    pub async fn run(mut self, mut resource: R) -> R {
        self.shared.phase.store(PHASE_RUNNING, Ordering::Release);
        debug!("serialized channel running");

        while let Some(submission) = self.rx.recv().await {
            self.shared.queued.fetch_sub(1, Ordering::AcqRel);
            if !submission.ticket.start() {
                trace!("skipping withdrawn operation");
                continue;
            }
            (submission.job)(&mut resource).await;
        }

        self.shared.phase.store(PHASE_STOPPED, Ordering::Release);
        debug!("serialized channel stopped");
        resource
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready};

    #[tokio::test]
    async fn test_operations_run_in_submission_order() {
        let (channel, worker) = serial_channel::<Vec<u32>>();
        let handle = worker.spawn(Vec::new());

        let mut waiters = Vec::new();
        for i in 0..5u32 {
            let channel = channel.clone();
            waiters.push(tokio::spawn(async move {
                channel
                    .submit(move |log: &mut Vec<u32>| {
                        async move {
                            log.push(i * 10);
                            tokio::task::yield_now().await;
                            log.push(i * 10 + 1);
                            i
                        }
                        .boxed()
                    })
                    .await
            }));
            // Spawned tasks must enqueue in order.
            tokio::task::yield_now().await;
        }
        for (i, waiter) in waiters.into_iter().enumerate() {
            assert_eq!(waiter.await.unwrap().unwrap(), i as u32);
        }

        drop(channel);
        let log = handle.await.unwrap();
        assert_eq!(log, vec![0, 1, 10, 11, 20, 21, 30, 31, 40, 41]);
    }

    #[tokio::test]
    async fn test_pending_phase_queues_submissions() {
        let (channel, worker) = serial_channel::<u32>();
        assert_eq!(channel.phase(), ChannelPhase::Pending);

        let mut first = tokio_test::task::spawn(channel.submit(|n: &mut u32| {
            async move {
                *n += 1;
                *n
            }
            .boxed()
        }));
        assert_pending!(first.poll());
        assert_eq!(channel.queued(), 1);

        let handle = worker.spawn(0);
        assert_eq!(first.await.unwrap(), 1);
        assert_eq!(channel.phase(), ChannelPhase::Running);
        assert_eq!(channel.queued(), 0);

        drop(channel);
        assert_eq!(handle.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cancel_while_queued_has_no_side_effects() {
        let (channel, worker) = serial_channel::<Vec<&'static str>>();
        let cancel = CancellationToken::new();

        let mut queued = tokio_test::task::spawn(channel.submit_cancellable(
            |log: &mut Vec<&'static str>| {
                async move {
                    log.push("cancelled op");
                }
                .boxed()
            },
            &cancel,
        ));
        assert_pending!(queued.poll());

        cancel.cancel();
        let outcome = assert_ready!(queued.poll());
        assert_eq!(outcome, Ok(None));
        drop(queued);

        let handle = worker.spawn(Vec::new());
        channel
            .submit(|log: &mut Vec<&'static str>| {
                async move {
                    log.push("next op");
                }
                .boxed()
            })
            .await
            .unwrap();

        drop(channel);
        assert_eq!(handle.await.unwrap(), vec!["next op"]);
    }

    #[tokio::test]
    async fn test_dropped_caller_withdraws_queued_operation() {
        let (channel, worker) = serial_channel::<u32>();
        {
            let mut queued = tokio_test::task::spawn(channel.submit(|n: &mut u32| {
                async move {
                    *n += 100;
                }
                .boxed()
            }));
            assert_pending!(queued.poll());
        }
        let handle = worker.spawn(0);
        drop(channel);
        assert_eq!(handle.await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_running_finishes_operation() {
        let (channel, worker) = serial_channel::<Vec<&'static str>>();
        let handle = worker.spawn(Vec::new());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let outcome = channel
            .submit_cancellable(
                |log: &mut Vec<&'static str>| {
                    async move {
                        log.push("started");
                        tokio::time::sleep(Duration::from_millis(200)).await;
                        log.push("finished");
                    }
                    .boxed()
                },
                &cancel,
            )
            .await;
        assert_eq!(outcome, Err(Error::OperationCancelled));
        assert!(outcome.unwrap_err().is_benign());

        drop(channel);
        assert_eq!(handle.await.unwrap(), vec!["started", "finished"]);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let (channel, worker) = serial_channel::<u32>();
        let mut waiters = Vec::new();
        for _ in 0..3 {
            let submitter = channel.clone();
            let mut waiter = tokio_test::task::spawn(async move {
                submitter
                    .submit(|n: &mut u32| {
                        async move {
                            *n += 1;
                        }
                        .boxed()
                    })
                    .await
            });
            assert_pending!(waiter.poll());
            waiters.push(waiter);
        }
        assert_eq!(channel.queued(), 3);

        drop(channel);
        let handle = worker.spawn(0);
        for waiter in waiters {
            waiter.await.unwrap();
        }
        assert_eq!(handle.await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_submit_after_worker_gone_fails() {
        let (channel, worker) = serial_channel::<u32>();
        drop(worker);
        let result = channel.submit(|n: &mut u32| async move { *n }.boxed()).await;
        assert!(matches!(result, Err(Error::Internal(_))));
    }
}
