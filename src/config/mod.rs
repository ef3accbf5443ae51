//! Configuration loading.
//!
//! Sources, lowest precedence first:
//! - `config/default.toml`, then `config/{RUN_ENV}.toml`
//! - `APP__`-prefixed environment variables (`.env` is read first via dotenvy)
//! - flat aliases such as `DATABASE_URL`, `JWT_SECRET` and `WOMPI_*`
//!
//! ```rust,ignore
//! use turnoya_api::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Listening on {}", settings.server_addr());
//! ```

mod settings;

pub use settings::*;
