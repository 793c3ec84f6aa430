use std::time::Duration;

/// Identifies one scheduled wake-up. Tokens from before the last
/// `schedule` or `cancel` are stale and never fire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TaskToken(u64);

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Fired {
    pub token: TaskToken,
    /// When the task was due, which may be earlier than the current time
    /// if the host's frames are coarse.
    pub due: Duration,
}

#[derive(Debug, Copy, Clone)]
struct Pending {
    token: TaskToken,
    due: Duration,
}

/// A single outstanding wake-up. Scheduling replaces whatever was pending.
#[derive(Debug, Default)]
pub struct TaskSlot {
    generation: u64,
    pending: Option<Pending>,
}

impl TaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Duration) -> TaskToken {
        self.generation += 1;
        let token = TaskToken(self.generation);
        self.pending = Some(Pending { token, due });
        token
    }

    /// Schedule a follow-up only if `token` still owns the slot.
    pub fn reschedule(&mut self, token: TaskToken, due: Duration) -> Option<TaskToken> {
        if self.is_current(token) {
            Some(self.schedule(due))
        } else {
            None
        }
    }

    pub fn cancel(&mut self) {
        self.generation += 1;
        self.pending = None;
    }

    pub fn is_current(&self, token: TaskToken) -> bool {
        token.0 == self.generation
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn due(&self) -> Option<Duration> {
        self.pending.map(|pending| pending.due)
    }

    /// Takes the pending task if it is due by `now`. The token stays
    /// current until something else is scheduled or cancelled.
    pub fn fire(&mut self, now: Duration) -> Option<Fired> {
        match self.pending {
            Some(pending) if pending.due <= now => {
                self.pending = None;
                Some(Fired {
                    token: pending.token,
                    due: pending.due,
                })
            }
            _ => None,
        }
    }
}
