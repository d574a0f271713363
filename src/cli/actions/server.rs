use crate::api;
use crate::cli::actions::Action;
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            frontend_url,
            access_secret,
            refresh_secret,
            access_ttl_minutes,
            refresh_ttl_days,
            cloudinary_cloud_name,
            cloudinary_api_key,
            cloudinary_api_secret,
        } => {
            let auth = api::AuthSettings {
                frontend_base_url: frontend_url,
                access_secret,
                refresh_secret,
                access_ttl_minutes,
                refresh_ttl_days,
            };
            let assets = api::AssetSettings {
                cloud_name: cloudinary_cloud_name,
                api_key: cloudinary_api_key,
                api_secret: cloudinary_api_secret,
            };

            api::new(port, dsn, auth, assets).await?;
        }
    }

    Ok(())
}
