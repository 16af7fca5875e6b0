//! # DataTable Configuration Constants
//!
//! This module centralizes the numeric and string constants used by the table
//! engine. Constants that depend on each other are co-located and checked at
//! compile time.
//!
//! ## Dependency Graph
//!
//! ```text
//! INITIAL_ROW_CAPACITY (64)
//!       │
//!       └─> every column vector is allocated with the row pool's capacity,
//!           so a new column costs INITIAL_ROW_CAPACITY empty cells up front
//!
//! POOL_GROWTH_FACTOR (2)
//!       │
//!       └─> MIN_POOL_GROWTH (16)
//!             A pool grows by max(capacity * (factor - 1), MIN_POOL_GROWTH)
//!             slots so that small tables do not reallocate on every insert.
//!
//! MAX_RAW_INDEX_GROWTH (65536), MAX_EXPLICIT_SLOT (1M)
//!       │
//!       └─> caps on pool growth driven by caller-supplied numbers, so a
//!           huge index or slot fails instead of allocating the grid
//! ```
//!
//! ## Critical Invariants
//!
//! 1. `POOL_GROWTH_FACTOR >= 2` (growth must at least double)
//! 2. `MIN_POOL_GROWTH > 0` (a pool always grows by at least one slot)
//! 3. Reserved tag names are never valid labels for the tag index.

// ============================================================================
// HEADER POOL CONFIGURATION
// ============================================================================

/// Number of row slots allocated when the first row is created.
pub const INITIAL_ROW_CAPACITY: usize = 64;

/// Number of column slots allocated when the first column is created.
pub const INITIAL_COLUMN_CAPACITY: usize = 8;

/// Multiplier applied to the pool capacity when the free list is exhausted.
pub const POOL_GROWTH_FACTOR: usize = 2;

/// Lower bound on the number of slots added by a single growth step.
pub const MIN_POOL_GROWTH: usize = 16;

/// Most headers a single write through a raw index may append. A raw index
/// further past the end of the axis is `NotFound`.
pub const MAX_RAW_INDEX_GROWTH: usize = 1 << 16;

/// Explicit identities must use a slot below this bound.
pub const MAX_EXPLICIT_SLOT: usize = 1 << 20;

const _: () = assert!(POOL_GROWTH_FACTOR >= 2, "header pools must at least double");
const _: () = assert!(MAX_RAW_INDEX_GROWTH > 0, "raw index writes must be able to append");
const _: () = assert!(MAX_EXPLICIT_SLOT <= u32::MAX as usize, "slots are 32-bit");
const _: () = assert!(MIN_POOL_GROWTH > 0, "header pools must grow by one slot or more");

// ============================================================================
// LABELS AND TAGS
// ============================================================================

/// Prefix of auto-generated row labels (`r1`, `r2`, ...).
pub const ROW_LABEL_PREFIX: &str = "r";

/// Prefix of auto-generated column labels (`c1`, `c2`, ...).
pub const COLUMN_LABEL_PREFIX: &str = "c";

/// Tag that always denotes every header of an axis. Never stored.
pub const TAG_ALL: &str = "all";

/// Tag that always denotes the last header of an axis. Never stored.
pub const TAG_END: &str = "end";

/// All reserved tag names, checked by every tag mutation.
pub const RESERVED_TAGS: [&str; 2] = [TAG_ALL, TAG_END];

/// Empty-value string used by a client unless configured otherwise.
pub const DEFAULT_EMPTY_VALUE: &str = "";

// ============================================================================
// DUMP FORMAT
// Record letters are part of the interchange format and must never change.
// ============================================================================

/// Header record: `i <rows> <cols> <ctime> <mtime>`.
pub const DUMP_RECORD_INFO: &str = "i";

/// Column record: `c <index> <label> <type> {<tags>}`.
pub const DUMP_RECORD_COLUMN: &str = "c";

/// Row record: `r <index> <label> {<tags>}`.
pub const DUMP_RECORD_ROW: &str = "r";

/// Cell record: `d <row> <col> <value>`.
pub const DUMP_RECORD_DATA: &str = "d";
