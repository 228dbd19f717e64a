pub mod last_check;
pub mod tabs;

pub use last_check::LastCheckCell;
pub use tabs::{CheckTicket, LoadSettlement, NavigationCommit, TabStateStore};
