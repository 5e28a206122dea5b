pub mod config;
pub mod error;
pub mod source;
pub mod style;
pub mod types;

pub use config::ParrotConfig;
pub use error::{ParrotError, Result};
pub use source::{DataSource, DataSourceKind};
pub use style::{Emphasis, SenderStyle, StyledText};
pub use types::*;
