//! Reply correlation: the FIFO queue of pending commands and the map of
//! background jobs awaiting their completion event.
//!
//! There is no correlation ID on the wire. The server answers commands in
//! the order it received them, so the head of the queue always owns the next
//! `command/reply`. A reply that never arrives blocks every later reply
//! until the connection drops and the queue is cleared; there is no
//! per-command timeout.

use std::collections::{HashMap, VecDeque};

use super::{CommandReply, ReplyCallback};
use crate::codec::Event;
use crate::protocol::Message;

/// A command written to the transport and still waiting for its reply.
pub(crate) enum PendingCommand {
    /// The `auth` command sent in answer to `auth/request`.
    Authenticate,
    /// The `exit` command.
    Exit,
    /// Any other command with its caller-supplied callback.
    Callback(ReplyCallback),
}

impl std::fmt::Debug for PendingCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authenticate => f.write_str("Authenticate"),
            Self::Exit => f.write_str("Exit"),
            Self::Callback(_) => f.write_str("Callback"),
        }
    }
}

/// What to do with a `command/reply`.
#[derive(Debug)]
pub(crate) enum Resolution {
    /// No command was waiting; the reply is dropped.
    Unmatched,
    /// The command runs in the background; its callback now waits on the job.
    Deferred(String),
    /// The command is complete.
    Ready(PendingCommand, CommandReply),
}

/// Pending command queue plus background job map.
#[derive(Debug, Default)]
pub(crate) struct Correlator {
    pending: VecDeque<PendingCommand>,
    jobs: HashMap<String, ReplyCallbackSlot>,
}

/// Wrapper so the job map can derive `Debug`.
struct ReplyCallbackSlot(ReplyCallback);

impl std::fmt::Debug for ReplyCallbackSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ReplyCallback")
    }
}

impl Correlator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a command at the tail. Call this in the same critical section
    /// as the transport write so queue order matches write order.
    pub(crate) fn push(&mut self, command: PendingCommand) {
        self.pending.push_back(command);
    }

    /// Match a `command/reply` against the head of the queue.
    ///
    /// A successful reply carrying `Job-UUID` moves a caller callback into
    /// the job map instead of completing it.
    pub(crate) fn resolve_reply(&mut self, message: &Message) -> Resolution {
        let Some(command) = self.pending.pop_front() else {
            return Resolution::Unmatched;
        };

        let reply = CommandReply::from_reply(message);

        match (command, message.job_uuid()) {
            (PendingCommand::Callback(callback), Some(job_uuid)) if reply.success => {
                self.jobs
                    .insert(job_uuid.to_string(), ReplyCallbackSlot(callback));
                Resolution::Deferred(job_uuid.to_string())
            }
            (command, _) => Resolution::Ready(command, reply),
        }
    }

    /// Take the callback for a `BACKGROUND_JOB` event, if its job is tracked.
    ///
    /// The entry is removed, so a repeated event for the same job is a no-op.
    pub(crate) fn complete_job(
        &mut self,
        message: &Message,
        event: &Event,
    ) -> Option<(ReplyCallback, CommandReply)> {
        let job_uuid = event.job_uuid()?;
        let ReplyCallbackSlot(callback) = self.jobs.remove(job_uuid)?;
        Some((callback, CommandReply::from_job(message, event)))
    }

    /// Number of commands waiting for a reply.
    pub(crate) fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of background jobs waiting for their event.
    pub(crate) fn jobs_len(&self) -> usize {
        self.jobs.len()
    }

    /// Drop every pending command and job without invoking callbacks.
    pub(crate) fn clear(&mut self) {
        self.pending.clear();
        self.jobs.clear();
    }
}
