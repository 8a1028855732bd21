
use std::sync::mpsc;

use crate::cache::{LoadError, LoadResult};


/// Identity of one asynchronous load operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);


impl Handle {
    #[inline]
    pub fn id(self) -> u64 {
        self.0
    }
}


#[derive(Debug)]
pub struct Completion {
    pub handle: Handle,
    pub result: LoadResult,
}


/// One-shot sender for the result of the operation identified by `handle()`.
///
/// Dropping it without calling [`Completer::complete`] delivers
/// `Err(LoadError::Canceled)`, so every handle is reported exactly once.
#[derive(Debug)]
pub struct Completer {
    handle: Handle,
    sender: Option<mpsc::Sender<Completion>>,
}


impl Completer {

    #[inline]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn complete(mut self, result: LoadResult) {
        self.send(result);
    }

    fn send(&mut self, result: LoadResult) {
        if let Some(sender) = self.sender.take() {
            // the receiving scheduler may be gone already, nobody is left to tell.
            let _ = sender.send(Completion { handle: self.handle, result });
        }
    }

}

impl Drop for Completer {
    fn drop(&mut self) {
        self.send(Err(LoadError::Canceled));
    }
}



/// Cooperative completion queue.
///
/// Completers may finish on any thread, but their results only become
/// visible after `refresh_items`, which the owner calls at its yield point.
pub struct Scheduler {
    sender: mpsc::Sender<Completion>,
    receiver: mpsc::Receiver<Completion>,
    received: Vec<Completion>,
    next_handle: u64,
}


impl Scheduler {

    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            received: Vec::new(),
            next_handle: 0,
        }
    }

    pub fn completer(&mut self) -> Completer {
        let handle = Handle(self.next_handle);
        self.next_handle += 1;
        Completer {
            handle,
            sender: Some(self.sender.clone()),
        }
    }

    pub fn refresh_items(&mut self) {
        self.received.extend(self.receiver.try_iter());
    }

    pub fn iter_items(&mut self) -> impl Iterator<Item=Completion> + '_ {
        self.received.drain(..)
    }

}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}



#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Asset, Resource, TypeTag};

    struct Blob;
    impl Resource for Blob {
        const TAG: TypeTag = TypeTag::new("Blob");
    }

    fn drain(scheduler: &mut Scheduler) -> Vec<Completion> {
        scheduler.refresh_items();
        scheduler.iter_items().collect()
    }

    #[test]
    fn handles_are_unique() {
        let mut scheduler = Scheduler::new();
        let a = scheduler.completer();
        let b = scheduler.completer();
        assert_ne!(a.handle(), b.handle());
    }

    #[test]
    fn nothing_is_visible_before_refresh() {
        let mut scheduler = Scheduler::new();
        let completer = scheduler.completer();
        completer.complete(Ok(Asset::new(Blob)));

        assert_eq!(scheduler.iter_items().count(), 0);
        assert_eq!(drain(&mut scheduler).len(), 1);
        assert_eq!(drain(&mut scheduler).len(), 0);
    }

    #[test]
    fn dropped_completer_reports_canceled_once() {
        let mut scheduler = Scheduler::new();
        let completer = scheduler.completer();
        let handle = completer.handle();
        drop(completer);

        let items = drain(&mut scheduler);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].handle, handle);
        assert_eq!(items[0].result.as_ref().unwrap_err(), &LoadError::Canceled);
    }

    #[test]
    fn completions_arrive_from_other_threads_in_order() {
        let mut scheduler = Scheduler::new();
        let first = scheduler.completer();
        let second = scheduler.completer();
        let handles = [first.handle(), second.handle()];

        std::thread::spawn(move || {
            first.complete(Ok(Asset::new(Blob)));
            second.complete(Err(LoadError::Canceled));
        })
        .join()
        .unwrap();

        let items: Vec<Handle> = drain(&mut scheduler).into_iter().map(|c| c.handle).collect();
        assert_eq!(items, handles);
    }
}
