mod finding;
mod security_group;
mod user;
mod view;

pub use finding::{Finding, FindingStatus, Severity};
pub use security_group::{GroupStatus, SecurityGroup};
pub use user::User;
pub use view::{Overview, Tab, ViewState};
