//! # bcast-dispatch — Delivery Dispatcher
//!
//! The SENDING phase machinery: a 5-level strict-priority queue, the
//! [`MessagingGateway`] trait over the provider, fixed error-code
//! classification, a persisted retry schedule, per-tier send budgets,
//! and the tick-driven dispatcher that ties them together.
//!
//! The dispatcher never sleeps. Every retry lives in the persisted
//! schedule as an absolute next-attempt instant, and each [`Dispatcher::tick`]
//! call dispatches whatever is due at the clock it is handed. Pause,
//! resume, and process restarts therefore lose nothing: a
//! [`DispatcherSnapshot`] freezes queue order, counters, and retry
//! timers verbatim.

pub mod dispatcher;
pub mod gateway;
pub mod queue;
pub mod retry;

pub use dispatcher::{
    DispatchCounters, DispatchState, Dispatcher, DispatcherSnapshot, TickReport, TierBudget,
    TIER_LIMIT_EXHAUSTED,
};
pub use gateway::{
    classify_code, DeliveryReceipt, ErrorClass, HealthReport, MessagingGateway, OutboundMessage,
    SendError, NON_RETRYABLE_CODES, RETRYABLE_CODES,
};
pub use queue::{Priority, PriorityQueue, QueuedSend};
pub use retry::{retry_offset, RetryEntry, RetrySchedule, RETRY_OFFSETS_SECS};
