mod auth;
mod games;
mod health;
mod users;

pub use auth::{login, logout, register, resend_verification, status, verify_email};
pub use games::{game_filters, get_game, list_games, popular_games, random_genres};
pub use health::{handler_404, health};
pub use users::{me, toggle_library};
