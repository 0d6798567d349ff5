pub mod app;
pub mod error;
pub mod model;
pub mod normalize;

pub use app::AppSchema;
pub use error::{SchemaError, UnsupportedTypeWarning};
pub use model::{
    active_options, CategoryDisplay, CategoryOption, ContactType, DurationUnit, Field,
    FieldType, Status, TextSize, TypeSettings,
};
pub use normalize::{is_eligible, normalize};
