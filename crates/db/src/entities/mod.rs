//! Database entities.

pub mod case;
pub mod close;
pub mod decline_reason;
pub mod note;

pub use case::Entity as Case;
pub use close::Entity as Close;
pub use decline_reason::Entity as DeclineReason;
pub use note::Entity as Note;
