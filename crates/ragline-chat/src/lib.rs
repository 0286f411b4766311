//! Ragline Chat — answer synthesis over retrieved chunks.
//!
//! [`Synthesizer::answer`] grounds a free-text answer in retrieved chunks and
//! returns them as citations. [`Synthesizer::summarize`] turns a document's
//! most recent chunks into a bounded bullet list, absorbing malformed model
//! output through the [`bullets`] strategies.

pub mod bullets;
pub mod prompts;
pub mod synthesizer;
pub mod types;

pub use synthesizer::Synthesizer;
pub use types::*;
