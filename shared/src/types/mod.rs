pub mod json_error;
pub mod jwt;
pub mod login;
pub mod register;
pub mod server_config;
pub mod user;

pub use self::json_error::ErrorResponse;
pub use self::jwt::TokenClaims;
pub use self::login::{LoginData, SessionResponse};
pub use self::register::RegistrationData;
pub use self::server_config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, Environment, PasswordPolicyConfig,
    ServerConfig, SigningSecret,
};
pub use self::user::{RoleUpdate, UserInfo};
