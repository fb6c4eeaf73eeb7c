//! Global constants used throughout the stencil codebase.
//!
//! Thresholds, file naming conventions and preview markers that are shared
//! between the graph scanner, the compiler, the cache and the CLI live here so
//! the magic values stay discoverable.

/// Consecutive identical loader requests tolerated before compilation is aborted.
///
/// A template that includes itself asks the loader for the same name over and
/// over; counting only *consecutive* identical requests keeps wide graphs that
/// reuse many different partials free of false positives.
pub const DEFAULT_RECURSION_THRESHOLD: usize = 500;

/// Maximum include nesting depth accepted by the compiler.
///
/// Must stay above [`DEFAULT_RECURSION_THRESHOLD`] so that a self-include is
/// always reported by the recursion guard before the depth limit trips.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 1000;

/// Default template file suffix (without the leading dot).
pub const DEFAULT_TEMPLATE_SUFFIX: &str = "mustache";

/// Default template root, relative to the project directory.
pub const DEFAULT_TEMPLATES_DIR: &str = "src/main/resources/templates";

/// Name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = "stencil.toml";

/// Infix marking scratch artifacts (`<root>.mtf.<ext>`), "mustache temporary file".
pub const SCRATCH_FILE_INFIX: &str = ".mtf.";

/// Character substituted for path separators in scratch file names.
pub const SCRATCH_SEPARATOR_ESCAPE: char = '_';

/// Text substituted for JSON `null` values during execution.
pub const NULL_VALUE: &str = "-";

/// Number of random characters appended to mocked variables.
pub const MOCK_SUFFIX_LEN: usize = 5;

/// Opening tag of every preview marker emitted into rendered output.
pub const MARKER_OPEN: &str = "<span style=\"color: red !important;\">";

/// Closing tag of every preview marker.
pub const MARKER_CLOSE: &str = "</span>";
