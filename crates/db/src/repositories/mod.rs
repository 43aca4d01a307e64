//! Repositories wrapping database access for each entity.

pub mod case;
pub mod close;
pub mod decline_reason;
pub mod note;

pub use case::{CaseRepository, SearchFilters};
pub use close::CloseRepository;
pub use decline_reason::DeclineReasonRepository;
pub use note::NoteRepository;
