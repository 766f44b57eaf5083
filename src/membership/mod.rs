mod registry;
mod server_id;

pub(crate) use registry::ElectionOutcome;
pub(crate) use registry::Membership;
pub(crate) use registry::MembershipError;
pub use registry::MembershipSnapshot;
pub use server_id::ServerId;
