//! numapin code generation: pinned specialization synthesis and the rewrite
//! sessions that place it into the original sources.

pub mod errors;
pub mod rewrite;
pub mod synth;

pub use errors::{RewriteError, SynthError, SynthWarning};
pub use rewrite::{PendingEdit, RewriteMark, RewriteSession, RewriteSet};
pub use synth::{Mode, Outcome, SynthDiagnostic, SynthOptions, Synthesizer};
