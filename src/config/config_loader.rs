use anyhow::{Ok, Result};

use super::config_model::{Billing, Database, DotEnvyConfig, Gateway, Muck, Server};

const DEFAULT_RECONCILIATION_INTERVAL_SECS: u64 = 300;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let muck = Muck {
        endpoint: std::env::var("MUCK_ENDPOINT").expect("MUCK_ENDPOINT is invalid"),
        salt: std::env::var("MUCK_SALT").expect("MUCK_SALT is invalid"),
    };

    let gateway = Gateway {
        base_url: std::env::var("GATEWAY_BASE_URL").expect("GATEWAY_BASE_URL is invalid"),
        login_id: std::env::var("GATEWAY_LOGIN_ID").expect("GATEWAY_LOGIN_ID is invalid"),
        transaction_key: std::env::var("GATEWAY_TRANSACTION_KEY")
            .expect("GATEWAY_TRANSACTION_KEY is invalid"),
    };

    let billing = Billing {
        catalogue_path: std::env::var("BILLING_CATALOGUE_PATH")
            .expect("BILLING_CATALOGUE_PATH is invalid"),
        reconciliation_interval_secs: std::env::var("RECONCILIATION_INTERVAL_SECS")
            .map(|raw| raw.parse())
            .unwrap_or(core::result::Result::Ok(DEFAULT_RECONCILIATION_INTERVAL_SECS))?,
    };

    Ok(DotEnvyConfig {
        server,
        database,
        muck,
        gateway,
        billing,
    })
}

pub fn get_auth_secret() -> Result<String> {
    dotenvy::dotenv().ok();

    Ok(std::env::var("BILLING_JWT_SECRET").expect("BILLING_JWT_SECRET is invalid"))
}
