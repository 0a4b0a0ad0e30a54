//! cbar-core - Colorbar Configuration Registry
//!
//! This crate loads declarative YAML colorbar records, validates them
//! against a typed schema, resolves references between them, and turns the
//! result into concrete color-mapping directives for a renderer.
//!
//! ## Pipeline
//! All lookups flow through the same path:
//! YAML Sources -> Loader -> Validator -> Resolver -> Registry -> Builder
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cbar_core::{ColorbarRegistry, PaletteTable, build};
//!
//! let mut registry = ColorbarRegistry::with_builtin();
//! let config = registry.get("precip_rate").unwrap();
//! let bundle = build(&config, &PaletteTable::builtin()).unwrap();
//! assert!(bundle.cmap.n_colors().is_some());
//! ```

// Core error handling and diagnostics
pub mod error;

// Color literals and typed record settings
pub mod color;
pub mod settings;

// Declarative source loading
pub mod loader;

// Schema validation
pub mod validator;

// Reference resolution
pub mod resolver;

// Process-wide registry with lazy resolution
pub mod registry;

// Palette vocabulary (built-in table, user YAML/CPT palettes)
pub mod palette;

// Concrete colormap and normalization construction
pub mod builder;

// Collect-all archive compliance checking
pub mod checker;

pub use builder::{build, build_colormap, build_norm, BuiltColorbar, Colormap, Normalizer};
pub use checker::{check_archive, ArchiveChecker, CheckReport};
pub use color::{ColorValue, Rgba};
pub use error::{ConfigError, ConfigResult, Diagnostic, Severity};
pub use loader::{MergePolicy, RawArchive, RawRecord, RecordLoader};
pub use palette::{Palette, PaletteProvider, PaletteTable};
pub use registry::{registry, ColorbarRegistry};
pub use resolver::{resolve_archive, ResolvedArchive};
pub use settings::{
    AuxiliaryInfo, CbarSettings, CmapSettings, ColorbarConfig, ColorbarDef, Extend, ExtendFrac,
    NormSettings,
};
pub use validator::{validate_record, Validation};
