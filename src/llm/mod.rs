//! SQL generation backends.
//!
//! - `backend`: the `InferenceBackend` trait
//! - `local`: T5 seq2seq model on candle with beam search
//! - `remote`: OpenAI-compatible chat-completion client
//! - `adapter`: timeout, instrumentation and output cleanup around a backend

pub mod adapter;
pub mod backend;
pub mod beam;
pub mod hub;
pub mod local;
pub mod postprocess;
pub mod remote;

pub use adapter::{GeneratedSql, InferenceAdapter};
pub use backend::{BackendKind, Completion, InferenceBackend};
pub use beam::{BeamSearch, Hypothesis};
pub use hub::{download, ModelFiles};
pub use local::LocalSeq2SeqModel;
pub use postprocess::{normalize_quotes, strip_sql_markdown};
pub use remote::RemoteChatClient;
