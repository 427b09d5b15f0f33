//! Log output for the router binary.
//!
//! The library only emits `tracing` events; installing a subscriber is up
//! to the program embedding it.

use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Install a global subscriber printing events at `level` and above to
/// stderr. Only the first call in a process succeeds.
pub fn init(level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
}
