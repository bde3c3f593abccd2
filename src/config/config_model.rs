#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub muck: Muck,
    pub gateway: Gateway,
    pub billing: Billing,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Muck {
    pub endpoint: String,
    pub salt: String,
}

#[derive(Debug, Clone)]
pub struct Gateway {
    pub base_url: String,
    pub login_id: String,
    pub transaction_key: String,
}

#[derive(Debug, Clone)]
pub struct Billing {
    pub catalogue_path: String,
    pub reconciliation_interval_secs: u64,
}
