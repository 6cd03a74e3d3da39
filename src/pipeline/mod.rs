//! Reply pipeline.
//!
//! Every trigger, webhook or batch, flows through:
//! 1. `ThreadGate`: one handler per thread, one reply per message
//! 2. `context`: fetch and classify the thread
//! 3. `GuardrailDetector`: was the one-time block already sent
//! 4. `build_prompt()` + `ReasoningAgent::run()`: generate the reply
//! 5. `MailboxService::reply()`: deliver it
//!
//! **At most one reply per trigger.** The agent's tools are read-only; the
//! processor is the only sender.

pub mod batch;
pub mod context;
pub mod dedup;
pub mod guardrail;
pub mod processor;
pub mod prompt;
pub mod types;

pub use batch::{BatchScanner, BatchSummary};
pub use dedup::ThreadGate;
pub use guardrail::{GUARDRAIL_MARKER, GuardrailDetector, GuardrailState};
pub use processor::ThreadProcessor;
pub use types::{InboundEvent, ReplyResult, Sent, Trigger, WebhookPayload};
