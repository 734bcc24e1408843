#![allow(unused)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod analyzer;
pub mod config;
pub mod cst;
pub mod diff;
pub mod error;
pub mod location;
pub mod output;
pub mod planner;
pub mod project_walker;
pub mod symbol_table;
pub mod target;

pub use analyzer::{move_closure, ClosurePolicy, DependencyAnalyzer, MoveClosure, NameClass, RequiredImport};
pub use config::Config;
pub use cst::Cst;
pub use diff::{unified_diff, FileDiff, PathChange};
pub use error::{RefactorError, Result};
pub use location::{Location, Position};
pub use output::{OutputFormat, OutputFormatter};
pub use planner::{
    move_file, move_symbol, rename_file, rename_symbol, ChangedFiles, MoveOptions, RefactorOptions,
    RefactorResult, SharedDepPolicy,
};
pub use project_walker::{module_of, path_for_module, walk_source_files};
pub use symbol_table::{Definition, FileSymbols, ImportRecord, ImportedName, ProjectSymbolTable, Reference, SymbolKind};
pub use target::{parse_target, Target};
