//! Server-side processing for DataTables grids.
//!
//! A [`ParamTranslator`] takes the flat `columns[i][...]` / `order[i][...]`
//! parameters a DataTables widget sends, resolves per-column search values and
//! sort rules (optionally through per-column overrides), and narrows any
//! [`Queryable`] accordingly. Two backends ship with the crate: [`SeaQuery`] for
//! Sea-ORM entities and [`MemoryQuery`] for in-memory records.

pub mod config;
pub mod errors;
pub mod filter;
pub mod memory;
pub mod overrides;
pub mod params;
pub mod queryable;
pub mod response;
pub mod sea;
pub mod sort;
pub mod translator;

pub use config::TranslatorConfig;
pub use errors::DataTablesError;
pub use filter::{Criteria, resolve_filters};
pub use memory::MemoryQuery;
pub use overrides::{ConditionOverride, CustomConditions, CustomOrders, NoOverrides, OrderOverride};
pub use params::{ColumnDescriptor, OrderDescriptor, RawParameters, RequestModel, SearchDescriptor, normalize};
pub use queryable::Queryable;
pub use response::{DataTablesResponse, Page};
pub use sea::SeaQuery;
pub use sort::{SortDirection, SortKey, resolve_order};
pub use translator::ParamTranslator;
