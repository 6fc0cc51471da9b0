//! eoap-tools - Earth Observation Application Package tools
//!
//! Downloads Earth-observation datasets and processing assets, and packages
//! processing outputs into STAC catalogs.
//!
//! # Modules
//!
//! - `stac`: asset materialization and catalog generation
//! - `sharinghub`: dataset repositories (git + DVC)
//! - `utils`: URL classification and href resolution
//! - `config`: configuration file and environment
//! - `logging`: tracing subscriber setup
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Fetch the assets of a remote item
//! eoap-tools stac prepare-assets https://example.com/items/S2A.json -o inputs
//!
//! # Package processing outputs
//! eoap-tools stac generate-catalog results/ -o stac-catalog
//!
//! # Clone a dataset and pull its DVC data
//! eoap-tools sharinghub download-dataset https://gitlab.example.com/space/dataset.git
//! ```

pub mod cli;
pub mod config;
pub mod logging;
pub mod sharinghub;
pub mod stac;
pub mod utils;

// Re-export main types at crate root for convenience
pub use sharinghub::{DatasetCredentials, DatasetError};
pub use stac::{AssetMaterializer, CatalogGenerator, PreconditionError, StacError};
pub use utils::is_url;
