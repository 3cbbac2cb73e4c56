//! Game discovery for Matchbook.
//!
//! Two listings sit on top of the session store:
//!
//! - the **home listing**, for humans browsing games by status, name,
//!   and country;
//! - the **directory listing**, for game clients looking for a waiting
//!   opponent running the same version.
//!
//! Both return a finite, ordered `Vec` (longest idle first). The same
//! engine also answers the staleness query the reaper runs.
//!
//! # Key types
//!
//! - [`Discovery`]: the query engine
//! - [`stale_cutoff`]: the instant before which a game counts as abandoned

mod engine;

pub use engine::{Discovery, stale_cutoff};
