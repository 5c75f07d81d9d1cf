pub mod content;
pub mod view_state;

pub use content::{ContactInfo, ContentDocument, CvLinks, Locale, ThemeColors};
pub use view_state::{NavPhase, ViewState};
