//! Transaction Engine
//!
//! Assembles encoded instructions into one signed transaction, broadcasts it
//! and waits for finalization:
//! - **errors**: what a submission can end in
//! - **retry**: bounded retry with a fixed retryable-vs-fatal policy
//! - **instructions**: metadata program instructions with their account lists
//! - **engine**: sign once, rebroadcast on transient failure, poll status
//!
//! ## Outcomes
//!
//! | network behaviour                  | result                                   |
//! |------------------------------------|------------------------------------------|
//! | accepted, finalized in time        | `Ok(SubmissionResult { confirmed: true })` |
//! | accepted, not finalized in time    | `Ok(SubmissionResult { confirmed: false })` |
//! | transient errors below the ceiling | retried, then as above                   |
//! | transient errors up to the ceiling | `Err(RetriesExhausted)`                  |
//! | semantic rejection                 | `Err(SubmissionRejected)`, no retry      |
//! | rebroadcast already processed      | earlier attempt landed, polled as above  |
//! | landed with a program error        | `Err(ExecutionFailed)`                   |

pub mod engine;
pub mod errors;
pub mod instructions;
pub mod retry;

pub use engine::{ConfirmationConfig, TransactionEngine};
pub use errors::EngineError;
pub use instructions::{create_metadata_instruction, update_metadata_instruction};
pub use retry::{retry_with_backoff, RetryConfig, RetryFailure};
