// Actor module
//
// Long-running tasks follow the Tokio actor pattern:
// - the actor struct owns its state and the receiving end of a channel
// - a cloneable handle owns the sending end and is the only way in
// - the actor stops once every handle is gone or it is told to

use std::future::Future;

use tokio::task::JoinHandle;

pub mod owner;

pub use owner::{Operation, OwnerHandle};

/// A task that owns its state and runs until its inbox closes.
pub trait Actor: Sized + Send + 'static {
    fn run(self) -> impl Future<Output = ()> + Send;

    /// Spawn the actor onto the current tokio runtime.
    fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
