use secrecy::SecretString;

pub mod server;

/// What the CLI resolved to run.
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        frontend_url: String,
        access_secret: SecretString,
        refresh_secret: SecretString,
        access_ttl_minutes: i64,
        refresh_ttl_days: i64,
        cloudinary_cloud_name: String,
        cloudinary_api_key: String,
        cloudinary_api_secret: SecretString,
    },
}
