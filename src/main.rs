//! # Secret Generator Controller
//!
//! A Kubernetes controller that generates credentials for `CustomSecret`
//! resources and keeps them rotated.
//!
//! For every `CustomSecret` it:
//!
//! 1. Generates material for the requested `secretType` (`basic-auth` or `jwt`)
//! 2. Writes it to the Secret `<name>-secret` in the same namespace
//! 3. Records `secretName` and `lastUpdated` in the status
//! 4. Requeues itself after `rotationPeriod`, if one is set

use anyhow::Result;
use secret_generator_controller::runtime::{initialize, run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init = initialize().await?;
    run_watch_loop(init.requests, init.secrets, init.context, init.server_state).await
}
