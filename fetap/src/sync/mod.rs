//! Lock-free cells shared between the dial interrupt, the timeout timer and
//! the sampler task.
//!
//! | Cell | Written by | Read by |
//! |------|------------|---------|
//! | [`SessionAnchor`] | edge ISR (open), sampler (advance, close) | edge ISR, sampler |
//! | [`WakeSignal`] | edge ISR, timer callback | sampler |
//! | [`TimeoutFlag`] | timer callback (raise), aggregator (clear) | sampler |
//!
//! None of these take a lock. Correctness rests on the single consumer: only
//! the sampler task ever takes the wake signal.

pub mod session;
pub mod wake;

pub use session::{SessionAnchor, TimeoutFlag, NO_SESSION};
pub use wake::WakeSignal;
