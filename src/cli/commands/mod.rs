mod serve;
mod user;

pub use serve::cmd_serve;
pub use user::{cmd_user_create, cmd_user_delete, cmd_user_list, cmd_user_passwd, cmd_user_rename};
