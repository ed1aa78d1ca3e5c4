//! FIFO command queue, independent of routing policy

use std::collections::VecDeque;

use super::{Command, CommandEnvelope};
use crate::error::{HiveError, Result};

/// Queue of pending commands.
///
/// The dispatcher assumes nothing about command shape or routing; host code
/// pulls commands with [`pop_all`](Self::pop_all) or drains them through
/// [`process`](Self::process).
#[derive(Debug, Default)]
pub struct CommandDispatcher {
    queue: VecDeque<CommandEnvelope>,
}

impl CommandDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatch<C: Command>(&mut self, command: C) {
        self.queue.push_back(CommandEnvelope::new(command));
    }

    pub fn dispatch_envelope(&mut self, envelope: CommandEnvelope) {
        self.queue.push_back(envelope);
    }

    /// Take the whole queue, oldest first, leaving it empty.
    pub fn pop_all(&mut self) -> Vec<CommandEnvelope> {
        self.queue.drain(..).collect()
    }

    /// Remove the oldest command.
    pub fn pop(&mut self) -> Result<CommandEnvelope> {
        self.queue.pop_front().ok_or(HiveError::EmptyQueue)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Drop everything queued after the first `len` commands.
    pub fn truncate(&mut self, len: usize) {
        self.queue.truncate(len);
    }

    /// Feed queued commands to `handler` one at a time until the queue is
    /// empty, including commands the handler dispatches along the way.
    ///
    /// Stops at the first handler error; commands not yet handled stay
    /// queued. Returns the number of commands handled.
    pub fn process<F, E>(&mut self, mut handler: F) -> std::result::Result<usize, E>
    where
        F: FnMut(CommandEnvelope, &mut Self) -> std::result::Result<(), E>,
    {
        let mut handled = 0;
        while let Some(command) = self.queue.pop_front() {
            handler(command, self)?;
            handled += 1;
        }
        Ok(handled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Ping(u32);
    impl Command for Ping {}

    #[test]
    fn test_fifo_pop() {
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.dispatch(Ping(1));
        dispatcher.dispatch(Ping(2));

        let first = dispatcher.pop().unwrap();
        assert_eq!(first.downcast_ref::<Ping>(), Some(&Ping(1)));
        assert_eq!(dispatcher.len(), 1);
    }

    #[test]
    fn test_pop_empty_fails() {
        let mut dispatcher = CommandDispatcher::new();
        assert!(matches!(dispatcher.pop(), Err(HiveError::EmptyQueue)));
    }

    #[test]
    fn test_pop_all_drains_snapshot() {
        let mut dispatcher = CommandDispatcher::new();
        for n in 0..3 {
            dispatcher.dispatch(Ping(n));
        }

        let drained: Vec<u32> = dispatcher
            .pop_all()
            .into_iter()
            .filter_map(|cmd| cmd.into_inner::<Ping>().ok())
            .map(|ping| ping.0)
            .collect();
        assert_eq!(drained, vec![0, 1, 2]);
        assert!(dispatcher.is_empty());
        assert!(dispatcher.pop_all().is_empty());
    }

    #[test]
    fn test_process_drains_commands_dispatched_by_handler() {
        let mut dispatcher = CommandDispatcher::new();
        dispatcher.dispatch(Ping(3));
        dispatcher.dispatch(Ping(10));

        let mut seen = Vec::new();
        let handled = dispatcher
            .process(|cmd, queue| {
                let Ping(n) = cmd.into_inner::<Ping>().map_err(|_| "not a ping")?;
                seen.push(n);
                if n > 0 && n < 10 {
                    queue.dispatch(Ping(n - 1));
                }
                Ok::<(), &str>(())
            })
            .unwrap();

        assert_eq!(seen, vec![3, 10, 2, 1, 0]);
        assert_eq!(handled, 5);
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn test_process_stops_on_error_and_keeps_rest() {
        let mut dispatcher = CommandDispatcher::new();
        for n in 0..4 {
            dispatcher.dispatch(Ping(n));
        }

        let result = dispatcher.process(|cmd, _| match cmd.downcast_ref::<Ping>() {
            Some(Ping(1)) => Err("stop"),
            _ => Ok(()),
        });

        assert_eq!(result, Err("stop"));
        assert_eq!(dispatcher.len(), 2);
    }
}
