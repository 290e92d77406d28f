//! cabincal - Cabin availability extraction from vessel booking spreadsheets
//!
//! This crate reads the hand-authored booking calendars that vessels publish as
//! spreadsheets (color-coded calendar cells, bordered fare bands, free-text date
//! range tokens, multi-bed groupings, merged cells), normalizes them into
//! per-room availability records, and answers date-range availability queries.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use cabincal::{AvailabilityQuery, Catalog, EngineBuilder, XlsxDirectoryProvider};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Vessel catalog: links, sheet links and layout declarations
//!     let catalog = Catalog::from_file("catalog.toml")?;
//!
//!     // Workbooks exported as `<document id>.xlsx`
//!     let engine = EngineBuilder::new()
//!         .with_catalog(catalog)
//!         .with_provider(XlsxDirectoryProvider::new("calendars"))
//!         .with_season_year(2025)
//!         .build()?;
//!
//!     let query = AvailabilityQuery::parse("2025/09/01", "2025/09/30")?;
//!     for result in engine.query(&query) {
//!         println!("{} {} {}", result.start_date, result.boat_name, result.room_name);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Extracting a Single Grid
//!
//! Layout families can be used directly on a `Grid` built in memory:
//!
//! ```rust
//! use cabincal::{BoatEntry, ExtractContext, Grid, LayoutFamily, RangeRows};
//!
//! let grid = Grid::from_text_rows(
//!     "2025",
//!     &[
//!         vec!["", "", "JULY", "AUGUST"],
//!         vec!["", "", "1-4", "10-13"],
//!         vec!["", "Love", "", ""],
//!     ],
//! );
//! let boat = BoatEntry::new("El Rora");
//! let extraction = RangeRows::default()
//!     .extract(&grid, &ExtractContext::new(&boat, 2025))
//!     .unwrap();
//! assert_eq!(extraction.rooms[0].room_name, "Love");
//! assert_eq!(extraction.candidate_start_dates.len(), 2);
//! ```

mod aggregate;
mod api;
mod builder;
mod catalog;
mod classify;
mod dates;
mod error;
mod families;
mod grid;
mod layout;
mod normalize;
mod parser;
mod query;
mod registry;
mod report;
mod security;
mod source;
mod types;

// 公開API
pub use aggregate::{aggregate, umbrella_rollup, AllAvailable, AnyAvailable, ConsensusPolicy, RoomSignal};
pub use api::{EndBound, OutputFormat, QueryMode, WorksheetSelector};
pub use builder::{AvailabilityEngine, EngineBuilder, VesselOutcome, VesselReport};
pub use catalog::{BoatEntry, Catalog, RoomEntry};
pub use classify::{classify_status, ColorClassifier, TargetColor, Verdict};
pub use dates::{parse_bare_range, parse_departure, parse_two_line_range, DateRange};
pub use error::CabinError;
pub use families::{
    BandedChart, BedTable, CalendarSlot, ColorCalendar, DepartureSections, ExtractContext, Extraction, LabelMapping,
    LayoutFamily, LayoutSpec, RangeBlocks, RangeRows, RangeTable, RoomKeyword, Umbrella,
};
pub use grid::{Cell, Grid};
pub use layout::FixedBlock;
pub use normalize::{LabelAlias, RoomAvailability, RoomState};
pub use parser::XlsxSource;
pub use query::{
    available_dates_in, evaluate, find_available_start_dates, is_free_for_range, parse_query_date, sort_results,
    AvailabilityQuery, AvailabilityResult,
};
pub use registry::FamilyRegistry;
pub use report::ReportFormatter;
pub use security::SecurityConfig;
pub use source::{DocumentRef, InMemoryProvider, InMemorySource, SheetSource, SourceProvider, XlsxDirectoryProvider};
pub use types::{BorderStyle, Borders, CellCoord, Color, MergeRange};
