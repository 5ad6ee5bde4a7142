pub mod config;
pub mod error;
pub mod gelim;
pub mod genetics;
pub mod io;
pub mod types;

pub use config::{EliminationConfig, GeneratorOptions, RemovalPolicy};
pub use error::{GelimError, Result};
pub use gelim::{GenotypeEliminator, InconsistencyHandler, ModelBuild, PedigreeModelGenerator};
pub use genetics::{InheritanceModel, MarkerData, PedigreeGraph};
