//! chorus-bots: an unattended conversation among generated speakers.
//!
//! A fleet of external generation workers, one per speaker, takes turns
//! posting to a chat channel. The scheduler decides who speaks next and
//! what prompt (if any) steers them; prompts are distilled from prior
//! messages by a small phrase-extraction pipeline. Worker and network
//! failures are routine: a failed turn is skipped, never fatal.

pub mod config;
pub mod extract;
pub mod fleet;
pub mod mailbox;
pub mod scheduler;
pub mod worker;
