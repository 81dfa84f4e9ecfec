#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Broadcast administration primitives shared by the libroadcast CLI.
//!
//! Layout: `model.rs` (rounds, broadcasts, patch bodies), `selector.rs`
//! (range expressions), `batch.rs` (sequential round updater), `edits.rs`
//! (per-command body builders), `validate.rs` (argument validation),
//! `schedule.rs` (time shifts), `pgn.rs` (PGN parsing and filtering).

pub mod batch;
pub mod edits;
pub mod error;
pub mod model;
pub mod pgn;
pub mod schedule;
pub mod selector;
pub mod validate;

pub use batch::{BatchRoundUpdater, EDIT_INTERVAL, RoundBatch, RoundEditor, UpdateOutcome};
pub use edits::{
    DelayEdit, MAX_GAME_IDS, MultiUrlSourceEdit, MultiUrlTemplate, UrlSourceEdit, UrlTemplate,
};
pub use error::{EditError, PgnError, ScheduleError, ValidationError};
pub use model::{Broadcast, CustomScoring, Round, RoundEdit, SideScoring, SyncSource, Tour};
pub use pgn::{PgnGame, filter_by_fide_ids, game_ids, parse_games, write_games};
pub use schedule::parse_time_shift;
pub use selector::{ROUND_SELECTOR_BOUND, RoundSelector};
