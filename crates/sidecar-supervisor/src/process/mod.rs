//! Process creation and output draining for the supervised backend.
//!
//! - `spawner`: the [`ProcessSpawner`] seam and its `std::process` backing.
//! - `output`: reader threads that classify the child's output lines.

mod output;
mod spawner;

pub(crate) use output::spawn_reader;
pub use spawner::{LaunchSpec, ProcessSpawner, SupervisedChild, SystemChild, SystemSpawner};
