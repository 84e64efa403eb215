pub mod clock;
pub mod error;
pub mod extract;
pub mod messages;
pub mod participants;
pub mod router;
pub mod service;
pub mod status;
pub mod sweeper;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, mpsc};
    use std::thread::{self, JoinHandle};
    use std::time::Duration;

    use parlor_db::Database;

    /// Hold the connection lock from another thread for `busy`. Returns once
    /// the lock is taken.
    pub(crate) fn hold_lock(db: Arc<Database>, busy: Duration) -> JoinHandle<()> {
        let (locked_tx, locked_rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            db.with_conn(|_| {
                locked_tx.send(()).unwrap();
                thread::sleep(busy);
                Ok(())
            })
            .unwrap();
        });
        locked_rx.recv().unwrap();
        handle
    }
}
