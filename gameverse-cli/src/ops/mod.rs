mod account;
mod games;
mod output;
mod seed;
pub mod ui;

pub use account::{login, me, toggle};
pub use games::{list_games, GameSearch};
pub use output::{print_json, OutputFormat};
pub use seed::{cleanup_users, seed_games, seed_user};
