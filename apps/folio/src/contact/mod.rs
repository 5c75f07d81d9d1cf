// Contact surface: static contact anchors and the contact form.

pub mod form;
pub mod links;

pub use form::SubmitOutcome;
