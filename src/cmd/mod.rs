pub mod list;
pub mod navigation;
pub mod output;
pub mod search;
pub mod settings;
pub mod verify;

pub use list::cmd_list;
pub use navigation::{cmd_episodes, cmd_link, cmd_seasons, cmd_streams};
pub use search::{cmd_search, SearchArgs};
pub use settings::{cmd_settings_set, cmd_settings_show};
pub use verify::cmd_verify;
