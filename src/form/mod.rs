pub mod input;
pub mod rule;
pub mod session;
pub mod widget;

pub use input::{is_text_entry, slot_text, slots, summarize, text_to_value, Slot};
pub use rule::{derive_rule, BaseRule, ValidationError, ValidationRule};
pub use session::{
    FieldErrors, FormEntry, FormError, FormSession, FormState, FormValues, Submission,
};
pub use widget::{
    select_widget, Choice, MultiSelectStyle, SelectStyle, WidgetDescriptor, WidgetKind,
};
